/// Terminal rendering for loudex.
///
/// Plots loudness timelines with ratatui, either live in a terminal or
/// off-screen into a buffer.
pub mod plot;
pub mod ui;

pub use plot::TimeSeriesPlot;
pub use ui::ViewState;
