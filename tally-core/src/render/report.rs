// Cluster report and scatter plot of the 2-D projection.
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use std::fmt::Write as _;

use crate::analyze::{ClusterOutcome, ClusterReport};

const PLOT_WIDTH: usize = 60;
const PLOT_HEIGHT: usize = 20;

/// Human-readable summary of a clustering run.
pub fn cluster_report(outcome: &ClusterOutcome) -> String {
    match outcome {
        ClusterOutcome::NotEnoughData { records, required } => format!(
            "Not enough data to cluster: {records} responses, at least {required} needed.\n"
        ),
        ClusterOutcome::Clustered(report) => render_report(report),
    }
}

fn render_report(report: &ClusterReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Clustered {} responses into {} groups using {} features",
        report.records,
        report.clusters,
        report.features.len()
    );
    let _ = writeln!(
        out,
        "Iterations: {}, inertia: {:.3}",
        report.iterations, report.inertia
    );
    let _ = writeln!(
        out,
        "Explained variance: PC1 {:.1}%, PC2 {:.1}%",
        report.explained_variance[0] * 100.0,
        report.explained_variance[1] * 100.0
    );

    for profile in &report.profiles {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Cluster {}: {} responses",
            profile.cluster, profile.size
        );
        for (field, label) in &profile.dominant {
            let _ = writeln!(out, "  {field}: {label}");
        }
    }

    let _ = writeln!(out);
    out.push_str(&scatter_plot(
        &report.points,
        &report.assignments,
        PLOT_WIDTH,
        PLOT_HEIGHT,
    ));
    out
}

/// Plot `points` on a `width` x `height` character grid, marking each with
/// its cluster number. Later points overwrite earlier ones in the same cell.
pub fn scatter_plot(
    points: &[[f64; 2]],
    assignments: &[usize],
    width: usize,
    height: usize,
) -> String {
    let width = width.max(1);
    let height = height.max(1);
    let mut grid = vec![vec![' '; width]; height];

    if !points.is_empty() {
        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for [x, y] in points {
            min_x = min_x.min(*x);
            max_x = max_x.max(*x);
            min_y = min_y.min(*y);
            max_y = max_y.max(*y);
        }
        let scale = |v: f64, lo: f64, hi: f64, cells: usize| -> usize {
            if hi - lo <= f64::EPSILON {
                cells / 2
            } else {
                (((v - lo) / (hi - lo)) * (cells - 1) as f64).round() as usize
            }
        };

        for (point, cluster) in points.iter().zip(assignments) {
            let col = scale(point[0], min_x, max_x, width);
            // Row 0 is the top of the plot.
            let row = height - 1 - scale(point[1], min_y, max_y, height);
            grid[row][col] = char::from_digit(u32::try_from(*cluster).unwrap_or(u32::MAX), 10)
                .unwrap_or('*');
        }
    }

    let border = format!("+{}+\n", "-".repeat(width));
    let mut out = border.clone();
    for row in grid {
        out.push('|');
        out.extend(row);
        out.push_str("|\n");
    }
    out.push_str(&border);
    out
}
