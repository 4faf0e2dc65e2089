//! Event records and calibration-event selection.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of pulse amplitudes stored per event by the digitizer.
pub const NUM_AMPLITUDES: usize = 23;

/// Trigger code of minimum-bias (calibration) events.
pub const CALIBRATION_TRIGGER: i32 = 4;

/// One record of the event stream.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// Pulse amplitude per readout column (ADC counts).
    pub amplitudes: [f64; NUM_AMPLITUDES],
    /// Trigger classification bits.
    pub trigger_code: i32,
}

impl Event {
    /// Creates a new event.
    #[inline]
    #[must_use]
    pub fn new(amplitudes: [f64; NUM_AMPLITUDES], trigger_code: i32) -> Self {
        Self {
            amplitudes,
            trigger_code,
        }
    }

    /// Amplitude of a readout column.
    ///
    /// # Panics
    /// Panics if `column >= NUM_AMPLITUDES`.
    #[inline]
    #[must_use]
    pub fn amplitude(&self, column: usize) -> f64 {
        self.amplitudes[column]
    }
}

/// Returns true for minimum-bias trigger codes.
#[inline]
#[must_use]
pub fn is_calibration_event(trigger_code: i32) -> bool {
    trigger_code == CALIBRATION_TRIGGER
}

/// Event selection by trigger code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventFilter {
    /// Accepted trigger code.
    pub trigger_code: i32,
}

impl EventFilter {
    /// Returns true if the event takes part in histogramming.
    #[inline]
    #[must_use]
    pub fn accepts(&self, event: &Event) -> bool {
        event.trigger_code == self.trigger_code
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            trigger_code: CALIBRATION_TRIGGER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_trigger() {
        assert!(is_calibration_event(4));
        for code in [-4, -1, 0, 1, 2, 3, 5, 8, 12, i32::MIN, i32::MAX] {
            assert!(!is_calibration_event(code), "code {code} accepted");
        }
    }

    #[test]
    fn test_default_filter_matches_predicate() {
        let filter = EventFilter::default();
        for code in -8..16 {
            let event = Event::new([0.0; NUM_AMPLITUDES], code);
            assert_eq!(filter.accepts(&event), is_calibration_event(code));
        }
    }
}
