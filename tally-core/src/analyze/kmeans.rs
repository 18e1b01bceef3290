// K-means clustering (Lloyd's algorithm) with deterministic farthest-point
// initialization, so repeated runs over the same responses agree.
#![allow(clippy::cast_precision_loss)]

use crate::error::AnalyzeError;

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// Cluster index per point. Clusters are numbered by first appearance.
    pub assignments: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances from each point to its centroid.
    pub inertia: f64,
    pub iterations: usize,
}

impl KMeansResult {
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &a in &self.assignments {
            sizes[a] += 1;
        }
        sizes
    }
}

fn sq_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Index of the nearest centroid; ties go to the lowest index.
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, c) in centroids.iter().enumerate() {
        let d = sq_dist(point, c);
        if d < best.1 {
            best = (idx, d);
        }
    }
    best
}

/// First centroid is the point closest to the mean; each next one is the
/// point farthest from all centroids chosen so far.
fn initial_centroids(points: &[Vec<f64>], k: usize) -> Vec<Vec<f64>> {
    let dim = points[0].len();
    let n = points.len() as f64;
    let mean: Vec<f64> = (0..dim)
        .map(|d| points.iter().map(|p| p[d]).sum::<f64>() / n)
        .collect();

    let (first, _) = nearest(&mean, points);
    let mut centroids = vec![points[first].clone()];
    let mut min_dist: Vec<f64> = points.iter().map(|p| sq_dist(p, &centroids[0])).collect();

    while centroids.len() < k {
        let mut far = 0;
        for (idx, d) in min_dist.iter().enumerate() {
            if *d > min_dist[far] {
                far = idx;
            }
        }
        let next = points[far].clone();
        for (idx, p) in points.iter().enumerate() {
            min_dist[idx] = min_dist[idx].min(sq_dist(p, &next));
        }
        centroids.push(next);
    }
    centroids
}

/// Cluster `points` into `min(k, points.len())` groups.
pub fn kmeans(
    points: &[Vec<f64>],
    k: usize,
    max_iterations: usize,
    tolerance: f64,
) -> Result<KMeansResult, AnalyzeError> {
    if points.is_empty() || k == 0 {
        return Err(AnalyzeError::Computation(
            "k-means needs at least one point and one cluster".into(),
        ));
    }
    let dim = points[0].len();
    if points.iter().any(|p| p.len() != dim) {
        return Err(AnalyzeError::Computation("ragged input matrix".into()));
    }
    if points.iter().flatten().any(|v| !v.is_finite()) {
        return Err(AnalyzeError::Computation("non-finite input value".into()));
    }

    let k = k.min(points.len());
    let mut centroids = initial_centroids(points, k);
    let mut assignments = vec![0; points.len()];
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;

        let mut distances = Vec::with_capacity(points.len());
        for (idx, p) in points.iter().enumerate() {
            let (c, d) = nearest(p, &centroids);
            assignments[idx] = c;
            distances.push(d);
        }

        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (p, &c) in points.iter().zip(&assignments) {
            counts[c] += 1;
            for (s, v) in sums[c].iter_mut().zip(p) {
                *s += v;
            }
        }

        let mut shift = 0.0;
        for c in 0..k {
            let next: Vec<f64> = if counts[c] > 0 {
                sums[c].iter().map(|s| s / counts[c] as f64).collect()
            } else {
                // Re-seed an empty cluster with the worst-served point.
                let mut far = 0;
                for (idx, d) in distances.iter().enumerate() {
                    if *d > distances[far] {
                        far = idx;
                    }
                }
                distances[far] = 0.0;
                points[far].clone()
            };
            shift += sq_dist(&centroids[c], &next);
            centroids[c] = next;
        }

        if shift <= tolerance {
            break;
        }
    }

    let mut inertia = 0.0;
    for (idx, p) in points.iter().enumerate() {
        let (c, d) = nearest(p, &centroids);
        assignments[idx] = c;
        inertia += d;
    }

    let (assignments, centroids) = renumber(&assignments, centroids);
    Ok(KMeansResult {
        assignments,
        centroids,
        inertia,
        iterations,
    })
}

/// Renumber clusters by first appearance in `assignments`; unused clusters go last.
fn renumber(assignments: &[usize], centroids: Vec<Vec<f64>>) -> (Vec<usize>, Vec<Vec<f64>>) {
    let mut order: Vec<usize> = Vec::with_capacity(centroids.len());
    for &a in assignments {
        if !order.contains(&a) {
            order.push(a);
        }
    }
    for c in 0..centroids.len() {
        if !order.contains(&c) {
            order.push(c);
        }
    }

    let mut remap = vec![0; centroids.len()];
    for (new, &old) in order.iter().enumerate() {
        remap[old] = new;
    }
    let mut slots: Vec<Option<Vec<f64>>> = centroids.into_iter().map(Some).collect();
    let centroids = order
        .iter()
        .filter_map(|&old| slots[old].take())
        .collect();
    (assignments.iter().map(|&a| remap[a]).collect(), centroids)
}
