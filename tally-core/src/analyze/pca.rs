// Two-component PCA via power iteration on the covariance matrix.
#![allow(clippy::cast_precision_loss)]

use serde::Serialize;

use crate::error::AnalyzeError;

const POWER_ITERATIONS: usize = 1000;
const CONVERGENCE: f64 = 1e-12;
const ZERO_EIGENVALUE: f64 = 1e-12;

/// Rows projected onto the two leading principal components.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub points: Vec<[f64; 2]>,
    /// Share of total variance carried by each component, in `[0, 1]`.
    pub explained_variance_ratio: [f64; 2],
}

struct Component {
    vector: Vec<f64>,
    eigenvalue: f64,
}

fn mat_vec(m: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    m.iter()
        .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
        .collect()
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Leading eigenpair of a symmetric matrix. Returns a zero component when the
/// matrix has no variance left.
fn leading_component(cov: &[Vec<f64>]) -> Component {
    let dim = cov.len();
    let mut v: Vec<f64> = (0..dim)
        .map(|i| 1.0 + ((i + 1) as f64).sqrt() / dim as f64)
        .collect();
    let n = norm(&v);
    v.iter_mut().for_each(|x| *x /= n);

    for _ in 0..POWER_ITERATIONS {
        let mut next = mat_vec(cov, &v);
        let len = norm(&next);
        if len <= ZERO_EIGENVALUE {
            return Component {
                vector: vec![0.0; dim],
                eigenvalue: 0.0,
            };
        }
        next.iter_mut().for_each(|x| *x /= len);
        let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).powi(2)).sum();
        v = next;
        if delta <= CONVERGENCE {
            break;
        }
    }

    let eigenvalue: f64 = mat_vec(cov, &v).iter().zip(&v).map(|(a, b)| a * b).sum();
    if eigenvalue <= ZERO_EIGENVALUE {
        return Component {
            vector: vec![0.0; dim],
            eigenvalue: 0.0,
        };
    }

    // Largest-magnitude entry positive, so the sign is stable across runs.
    let mut pivot = 0;
    for (idx, x) in v.iter().enumerate() {
        if x.abs() > v[pivot].abs() {
            pivot = idx;
        }
    }
    if v[pivot] < 0.0 {
        v.iter_mut().for_each(|x| *x = -*x);
    }

    Component {
        vector: v,
        eigenvalue,
    }
}

/// Project `rows` onto their first two principal components.
pub fn project_2d(rows: &[Vec<f64>]) -> Result<Projection, AnalyzeError> {
    let Some(dim) = rows.first().map(Vec::len) else {
        return Ok(Projection {
            points: Vec::new(),
            explained_variance_ratio: [0.0, 0.0],
        });
    };
    if rows.iter().any(|r| r.len() != dim) {
        return Err(AnalyzeError::Computation("ragged input matrix".into()));
    }
    if rows.iter().flatten().any(|v| !v.is_finite()) {
        return Err(AnalyzeError::Computation("non-finite input value".into()));
    }

    let n = rows.len() as f64;
    let mean: Vec<f64> = (0..dim)
        .map(|d| rows.iter().map(|r| r[d]).sum::<f64>() / n)
        .collect();
    let centered: Vec<Vec<f64>> = rows
        .iter()
        .map(|r| r.iter().zip(&mean).map(|(x, m)| x - m).collect())
        .collect();

    let denom = (n - 1.0).max(1.0);
    let mut cov = vec![vec![0.0; dim]; dim];
    for r in &centered {
        for i in 0..dim {
            for j in i..dim {
                cov[i][j] += r[i] * r[j] / denom;
            }
        }
    }
    for i in 0..dim {
        for j in 0..i {
            cov[i][j] = cov[j][i];
        }
    }
    let total: f64 = (0..dim).map(|i| cov[i][i]).sum();

    let first = leading_component(&cov);
    for i in 0..dim {
        for j in 0..dim {
            cov[i][j] -= first.eigenvalue * first.vector[i] * first.vector[j];
        }
    }
    let second = leading_component(&cov);

    let dot = |r: &[f64], v: &[f64]| r.iter().zip(v).map(|(a, b)| a * b).sum::<f64>();
    let points = centered
        .iter()
        .map(|r| [dot(r, &first.vector), dot(r, &second.vector)])
        .collect();

    let ratio = |lambda: f64| {
        if total > ZERO_EIGENVALUE {
            (lambda / total).clamp(0.0, 1.0)
        } else {
            0.0
        }
    };

    Ok(Projection {
        points,
        explained_variance_ratio: [ratio(first.eigenvalue), ratio(second.eigenvalue)],
    })
}
