// Clustering pipeline: label encoding, standardization, k-means and a 2-D
// projection of the cached responses.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::distribution::value_counts;
use super::encode::{feature_columns, label_encode, standardize};
use super::kmeans::kmeans;
use super::pca::project_2d;
use crate::config::AnalysisSection;
use crate::error::AnalyzeError;
use crate::types::{BASE_FIELDS, ResponseRecord};

/// Result of a clustering request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClusterOutcome {
    /// Too few responses to cluster meaningfully.
    NotEnoughData { records: usize, required: usize },
    Clustered(ClusterReport),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterReport {
    pub records: usize,
    /// Effective number of clusters, `min(configured, records)`.
    pub clusters: usize,
    pub features: Vec<String>,
    /// Cluster index per record, in view order.
    pub assignments: Vec<usize>,
    pub cluster_sizes: Vec<usize>,
    /// Each record projected on the first two principal components.
    pub points: Vec<[f64; 2]>,
    pub explained_variance: [f64; 2],
    pub inertia: f64,
    pub iterations: usize,
    pub profiles: Vec<ClusterProfile>,
}

/// Most common answer per base question within one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterProfile {
    pub cluster: usize,
    pub size: usize,
    /// `(field, label)` for every base field used as a feature.
    pub dominant: Vec<(String, String)>,
}

impl ClusterProfile {
    pub fn dominant_for(&self, field: &str) -> Option<&str> {
        self.dominant
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, label)| label.as_str())
    }
}

fn profiles(
    records: &[ResponseRecord],
    assignments: &[usize],
    sizes: &[usize],
    features: &[String],
) -> Vec<ClusterProfile> {
    sizes
        .iter()
        .enumerate()
        .map(|(cluster, &size)| {
            let members: Vec<ResponseRecord> = records
                .iter()
                .zip(assignments)
                .filter(|(_, a)| **a == cluster)
                .map(|(r, _)| r.clone())
                .collect();
            let dominant = BASE_FIELDS
                .iter()
                .filter(|f| features.iter().any(|c| c == *f))
                .filter_map(|f| {
                    value_counts(&members, f)
                        .counts
                        .into_iter()
                        .next()
                        .map(|(label, _)| ((*f).to_string(), label))
                })
                .collect();
            ClusterProfile {
                cluster,
                size,
                dominant,
            }
        })
        .collect()
}

/// Cluster `records` according to `settings`.
///
/// Returns [`ClusterOutcome::NotEnoughData`] below `settings.min_records`.
pub fn cluster_responses(
    records: &[ResponseRecord],
    settings: &AnalysisSection,
) -> Result<ClusterOutcome, AnalyzeError> {
    if records.len() < settings.min_records {
        debug!(
            records = records.len(),
            required = settings.min_records,
            "Not enough responses to cluster"
        );
        return Ok(ClusterOutcome::NotEnoughData {
            records: records.len(),
            required: settings.min_records,
        });
    }

    let features = feature_columns(records, &settings.exclude_fields);
    if features.is_empty() {
        return Err(AnalyzeError::Computation(
            "every column is excluded from clustering".into(),
        ));
    }

    let mut matrix = label_encode(records, &features);
    standardize(&mut matrix.rows);

    let km = kmeans(
        &matrix.rows,
        settings.clusters,
        settings.max_iterations,
        settings.tolerance,
    )?;
    if km.iterations >= settings.max_iterations {
        warn!(
            iterations = km.iterations,
            "k-means stopped at the iteration limit before converging"
        );
    }

    let projection = project_2d(&matrix.rows)?;
    if projection.explained_variance_ratio[0] == 0.0 {
        warn!("Responses are identical across all features, projection is degenerate");
    }

    let sizes = km.cluster_sizes();
    info!(
        records = records.len(),
        clusters = km.centroids.len(),
        features = features.len(),
        iterations = km.iterations,
        "Clustering complete"
    );

    Ok(ClusterOutcome::Clustered(ClusterReport {
        records: records.len(),
        clusters: km.centroids.len(),
        profiles: profiles(records, &km.assignments, &sizes, &features),
        features,
        assignments: km.assignments,
        cluster_sizes: sizes,
        points: projection.points,
        explained_variance: projection.explained_variance_ratio,
        inertia: km.inertia,
        iterations: km.iterations,
    }))
}
