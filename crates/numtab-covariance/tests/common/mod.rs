//! Shared utilities for covariance integration tests
#![allow(dead_code)]

pub use approx::assert_relative_eq;

use numtab_core::{CpuTier, Dispatcher, HomogenNumericTable, TableExt, TableRef};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const EPSILON: f64 = 1e-9;

/// Baseline dispatch, so results do not depend on the host
pub fn baseline() -> Dispatcher {
    Dispatcher::fixed(CpuTier::Baseline)
}

/// Seeded row-major values in [-5, 5), roughly `zeros` of them zero
pub fn random_matrix(seed: u64, rows: usize, columns: usize, zeros: f64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..rows * columns)
        .map(|_| {
            if rng.gen::<f64>() < zeros {
                0.0
            } else {
                rng.gen_range(-5.0..5.0)
            }
        })
        .collect()
}

pub fn dense(rows: usize, columns: usize, values: &[f64]) -> TableRef<'static> {
    HomogenNumericTable::from_vec(rows, columns, values.to_vec())
        .unwrap()
        .into_shared()
}

/// Rows `range` of a row-major matrix as their own table
pub fn row_chunk(columns: usize, values: &[f64], range: std::ops::Range<usize>) -> TableRef<'static> {
    let chunk = &values[range.start * columns..range.end * columns];
    dense(range.len(), columns, chunk)
}

/// Textbook sample covariance, straight from the definition
pub fn naive_covariance(rows: usize, columns: usize, values: &[f64]) -> Vec<f64> {
    let mean: Vec<f64> = (0..columns)
        .map(|c| (0..rows).map(|r| values[r * columns + c]).sum::<f64>() / rows as f64)
        .collect();
    let mut cov = vec![0.0; columns * columns];
    for i in 0..columns {
        for j in 0..columns {
            let s: f64 = (0..rows)
                .map(|r| (values[r * columns + i] - mean[i]) * (values[r * columns + j] - mean[j]))
                .sum();
            cov[i * columns + j] = s / (rows as f64 - 1.0);
        }
    }
    cov
}

pub fn read(table: &TableRef<'static>) -> Vec<f64> {
    table.read_all::<f64>().unwrap().into_vec()
}

pub fn assert_vectors_close(actual: &[f64], expected: &[f64], context: &str) {
    assert_eq!(actual.len(), expected.len(), "length mismatch for {context}");
    for (&a, &e) in actual.iter().zip(expected) {
        assert_relative_eq!(a, e, epsilon = EPSILON, max_relative = 1e-9);
    }
}
