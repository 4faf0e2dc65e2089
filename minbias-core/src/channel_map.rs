//! Channel wiring and diagnostic display layout.
//!
//! Two fixed tables tie PMT identity to the rest of the system:
//!
//! - [`ChannelMap`]: PMT slot (0..12) to the readout column of the
//!   digitizer amplitude array.
//! - [`DisplayLayout`]: PMT slot to a cell of the 4×3 diagnostic grid.
//!
//! Both are validated as bijections when constructed. The standard tables
//! must not change, otherwise thresholds and plots stop lining up with
//! earlier calibration runs.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of PMT channels.
pub const NUM_CHANNELS: usize = 12;

/// Rows in the diagnostic grid.
pub const GRID_ROWS: usize = 4;

/// Columns in the diagnostic grid.
pub const GRID_COLUMNS: usize = 3;

const STANDARD_WIRING: [usize; NUM_CHANNELS] = [0, 10, 7, 2, 6, 3, 8, 9, 11, 4, 5, 1];

type Grid = [[usize; GRID_COLUMNS]; GRID_ROWS];

const STANDARD_GRID: Grid =
    [[9, 3, 7], [5, 4, 8], [0, 6, 1], [10, 11, 2]];

/// Permutation from PMT slot to digitizer readout column.
///
/// Serialized as the bare table. Deserialization goes through
/// [`ChannelMap::new`], so a table that is not a permutation is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "[usize; NUM_CHANNELS]", into = "[usize; NUM_CHANNELS]")
)]
pub struct ChannelMap {
    physical: [usize; NUM_CHANNELS],
}

impl ChannelMap {
    /// Builds a channel map from an explicit table.
    ///
    /// # Errors
    /// Returns an error if the table is not a permutation of `0..12`.
    pub fn new(physical: [usize; NUM_CHANNELS]) -> Result<Self> {
        check_permutation(physical.iter().copied())?;
        Ok(Self { physical })
    }

    /// The detector's wiring: `[0, 10, 7, 2, 6, 3, 8, 9, 11, 4, 5, 1]`.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            physical: STANDARD_WIRING,
        }
    }

    /// Readout column feeding the given PMT slot.
    ///
    /// # Panics
    /// Panics if `slot >= NUM_CHANNELS`.
    #[inline]
    #[must_use]
    pub fn physical_index(&self, slot: usize) -> usize {
        assert!(
            slot < NUM_CHANNELS,
            "logical slot {slot} out of range (0..{NUM_CHANNELS})"
        );
        self.physical[slot]
    }

    /// The raw table, indexed by slot.
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.physical
    }
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<[usize; NUM_CHANNELS]> for ChannelMap {
    type Error = Error;

    fn try_from(physical: [usize; NUM_CHANNELS]) -> Result<Self> {
        Self::new(physical)
    }
}

impl From<ChannelMap> for [usize; NUM_CHANNELS] {
    fn from(map: ChannelMap) -> Self {
        map.physical
    }
}

/// Placement of PMT channels on the 4×3 diagnostic grid.
///
/// Serialized as the row-major grid only; the position index is rebuilt
/// by [`DisplayLayout::new`] on deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Grid", into = "Grid"))]
pub struct DisplayLayout {
    grid: Grid,
    positions: [(usize, usize); NUM_CHANNELS],
}

impl DisplayLayout {
    /// Builds a layout from a row-major grid of channel indices.
    ///
    /// # Errors
    /// Returns an error if the grid does not hold each channel exactly once.
    pub fn new(grid: [[usize; GRID_COLUMNS]; GRID_ROWS]) -> Result<Self> {
        check_permutation(grid.iter().flatten().copied())?;
        Ok(Self::from_grid(grid))
    }

    /// The standard diagnostic layout.
    ///
    /// ```text
    /// PMT 10  PMT 4   PMT 8
    /// PMT 6   PMT 5   PMT 9
    /// PMT 1   PMT 7   PMT 2
    /// PMT 11  PMT 12  PMT 3
    /// ```
    #[must_use]
    pub fn standard() -> Self {
        Self::from_grid(STANDARD_GRID)
    }

    fn from_grid(grid: Grid) -> Self {
        let mut positions = [(0, 0); NUM_CHANNELS];
        for (row, cells) in grid.iter().enumerate() {
            for (col, &channel) in cells.iter().enumerate() {
                positions[channel] = (row, col);
            }
        }
        Self { grid, positions }
    }

    /// Grid cell `(row, column)` of a channel.
    ///
    /// # Panics
    /// Panics if `channel >= NUM_CHANNELS`.
    #[inline]
    #[must_use]
    pub fn display_position(&self, channel: usize) -> (usize, usize) {
        assert!(
            channel < NUM_CHANNELS,
            "channel {channel} out of range (0..{NUM_CHANNELS})"
        );
        self.positions[channel]
    }

    /// 1-based pad number of a channel, counted row-major.
    #[must_use]
    pub fn pad_index(&self, channel: usize) -> usize {
        let (row, col) = self.display_position(channel);
        row * GRID_COLUMNS + col + 1
    }

    /// Channel shown at a grid cell.
    ///
    /// # Panics
    /// Panics if the cell lies outside the grid.
    #[must_use]
    pub fn channel_at(&self, row: usize, col: usize) -> usize {
        self.grid[row][col]
    }

    /// Channels in row-major display order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.grid.iter().flatten().copied()
    }
}

impl Default for DisplayLayout {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Grid> for DisplayLayout {
    type Error = Error;

    fn try_from(grid: Grid) -> Result<Self> {
        Self::new(grid)
    }
}

impl From<DisplayLayout> for Grid {
    fn from(layout: DisplayLayout) -> Self {
        layout.grid
    }
}

fn check_permutation(values: impl Iterator<Item = usize>) -> Result<()> {
    let mut seen = [false; NUM_CHANNELS];
    let mut count = 0usize;
    for value in values {
        if value >= NUM_CHANNELS {
            return Err(Error::ChannelOutOfRange {
                index: value,
                limit: NUM_CHANNELS,
            });
        }
        if seen[value] {
            return Err(Error::DuplicateChannel(value));
        }
        seen[value] = true;
        count += 1;
    }
    debug_assert_eq!(count, NUM_CHANNELS);
    Ok(())
}
