//! Plain-text renderers for terminal output.

pub mod chart;
pub mod report;

pub use chart::bar_chart;
pub use report::{cluster_report, scatter_plot};
