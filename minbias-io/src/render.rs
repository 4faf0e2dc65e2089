//! Combined diagnostic plot.
//!
//! One panel per PMT on the 4 × 3 display grid: the baseline histogram,
//! the fitted Gaussian and a marker at the `μ + 3σ` threshold.
//!
//! Captions, axis labels and the stat box are drawn with plotters' default
//! font backend, which loads system fonts.

use crate::{Error, Result};
use minbias_core::{BaselineReport, ChannelOutcome, FitFailure, GRID_COLUMNS, GRID_ROWS};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// Image settings for [`render_report`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlotOptions {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    pub title: String,
    /// Samples along each fitted curve.
    pub curve_points: usize,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: 4000,
            height: 3900,
            title: "Min Bias PulseH".to_string(),
            curve_points: 400,
        }
    }
}

/// Draws every channel of the report into a PNG at `path`.
///
/// # Errors
/// Returns an error if the image size is zero or drawing/encoding fails.
pub fn render_report<P: AsRef<Path>>(
    path: P,
    report: &BaselineReport,
    options: &PlotOptions,
) -> Result<()> {
    if options.width == 0 || options.height == 0 {
        return Err(Error::Plot(format!(
            "image size must be non-zero, got {}x{}",
            options.width, options.height
        )));
    }
    let path = path.as_ref();

    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;
    let title_size = f64::from(options.height) / 60.0;
    let body = root
        .titled(&options.title, ("sans-serif", title_size).into_font())
        .map_err(plot_error)?;
    let panels = body.split_evenly((GRID_ROWS, GRID_COLUMNS));

    for outcome in &report.channels {
        let (row, col) = outcome.position;
        let panel = panels.get(row * GRID_COLUMNS + col).ok_or_else(|| {
            Error::Plot(format!(
                "PMT {} placed outside the grid at ({row}, {col})",
                outcome.pmt_number()
            ))
        })?;
        draw_channel(panel, outcome, options)?;
    }

    root.present().map_err(plot_error)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

fn draw_channel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    outcome: &ChannelOutcome,
    options: &PlotOptions,
) -> Result<()> {
    let histogram = &outcome.histogram;
    let (x_min, x_max) = (histogram.min(), histogram.max());
    #[allow(clippy::cast_precision_loss)]
    let peak = histogram.max_count() as f64;
    let y_max = (peak * 1.15).max(1.0);

    let mut chart = ChartBuilder::on(area)
        .caption(format!("PMT {}", outcome.pmt_number()), ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("ADC Counts")
        .y_desc(format!("Events per {} ADC", histogram.bin_width()))
        .label_style(("sans-serif", 18))
        .draw()
        .map_err(plot_error)?;

    let half_width = histogram.bin_width() / 2.0;
    chart
        .draw_series(
            histogram
                .iter()
                .filter(|&(_, count)| count > 0)
                .map(|(center, count)| {
                    #[allow(clippy::cast_precision_loss)]
                    let height = count as f64;
                    Rectangle::new(
                        [(center - half_width, 0.0), (center + half_width, height)],
                        BLUE.mix(0.4).filled(),
                    )
                }),
        )
        .map_err(plot_error)?;

    if let Ok(fit) = &outcome.fit {
        let curve = fit
            .curve(x_min, x_max, options.curve_points)
            .into_iter()
            .map(|(x, y)| (x, y.min(y_max)));
        chart
            .draw_series(LineSeries::new(curve, RED.stroke_width(2)))
            .map_err(plot_error)?;

        let threshold = fit.threshold();
        if (x_min..=x_max).contains(&threshold) {
            chart
                .draw_series(LineSeries::new(
                    [(threshold, 0.0), (threshold, y_max)],
                    GREEN.stroke_width(2),
                ))
                .map_err(plot_error)?;
        }
    }

    let text_x = x_min + 0.6 * (x_max - x_min);
    let mut text_y = 0.95 * y_max;
    for line in stat_lines(outcome) {
        chart
            .draw_series(std::iter::once(Text::new(
                line,
                (text_x, text_y),
                ("sans-serif", 18).into_font(),
            )))
            .map_err(plot_error)?;
        text_y -= 0.08 * y_max;
    }
    Ok(())
}

fn stat_lines(outcome: &ChannelOutcome) -> Vec<String> {
    let histogram = &outcome.histogram;
    let mut lines = vec![format!("Entries {}", histogram.entries())];
    if let (Some(mean), Some(std_dev)) = (histogram.mean(), histogram.std_dev()) {
        lines.push(format!("Mean {mean:.3}"));
        lines.push(format!("Std Dev {std_dev:.3}"));
    }
    lines.push(match &outcome.fit {
        Ok(fit) => format!("μ + 3σ = {:.3}", fit.threshold()),
        Err(FitFailure::EmptyHistogram) => "no data".to_string(),
        Err(failure) => format!("fit failed: {failure}"),
    });
    lines
}

fn plot_error<E: std::fmt::Display>(err: E) -> Error {
    Error::Plot(err.to_string())
}
