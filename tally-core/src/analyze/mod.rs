//! Analysis over the session cache's current view.
//!
//! Everything here is read-only: consumers take `&[ResponseRecord]` and never
//! assume an optional field is present.

pub mod cluster;
pub mod distribution;
pub mod encode;
pub mod kmeans;
pub mod pca;

pub use cluster::{ClusterOutcome, ClusterProfile, ClusterReport, cluster_responses};
pub use distribution::{Distribution, distribution_for};
