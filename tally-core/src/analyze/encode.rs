// Categorical encoding and standardization of response columns.
#![allow(clippy::cast_precision_loss)]

use std::collections::BTreeSet;

use crate::types::{BASE_FIELDS, ResponseRecord, TIMESTAMP_FIELD};

/// Numeric view of a set of records: one row per record, one column per field.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedMatrix {
    pub columns: Vec<String>,
    /// Sorted distinct labels per column; a value's code is its index here.
    pub labels: Vec<Vec<String>>,
    pub rows: Vec<Vec<f64>>,
}

/// Columns present in `records`: base fields, `timestamp`, then extensions in
/// order of first appearance, minus `exclude`.
pub fn feature_columns(records: &[ResponseRecord], exclude: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = BASE_FIELDS
        .iter()
        .copied()
        .chain(std::iter::once(TIMESTAMP_FIELD))
        .map(str::to_string)
        .collect();
    for record in records {
        for (name, _) in record.extensions() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
    }
    columns.retain(|c| !exclude.contains(c));
    columns
}

/// Replace each value by the index of its label in the column's sorted label
/// set. Absent values encode as the empty label.
pub fn label_encode(records: &[ResponseRecord], columns: &[String]) -> EncodedMatrix {
    let labels: Vec<Vec<String>> = columns
        .iter()
        .map(|col| {
            records
                .iter()
                .map(|r| r.get(col).unwrap_or_default())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .collect();

    let rows = records
        .iter()
        .map(|r| {
            columns
                .iter()
                .zip(&labels)
                .map(|(col, col_labels)| {
                    let value = r.get(col).unwrap_or_default();
                    col_labels
                        .binary_search_by(|l| l.as_str().cmp(value))
                        .map_or(0.0, |code| code as f64)
                })
                .collect()
        })
        .collect();

    EncodedMatrix {
        columns: columns.to_vec(),
        labels,
        rows,
    }
}

/// Scale every column to zero mean and unit population variance in place.
/// Constant columns become all zeros.
pub fn standardize(rows: &mut [Vec<f64>]) {
    let Some(width) = rows.first().map(Vec::len) else {
        return;
    };
    let n = rows.len() as f64;

    for col in 0..width {
        let mean = rows.iter().map(|r| r[col]).sum::<f64>() / n;
        let var = rows.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        for row in rows.iter_mut() {
            row[col] = if std > f64::EPSILON {
                (row[col] - mean) / std
            } else {
                0.0
            };
        }
    }
}
