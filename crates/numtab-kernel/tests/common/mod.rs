//! Shared utilities for kernel-function integration tests
#![allow(dead_code)]

pub use approx::assert_relative_eq;

use numtab_core::{
    CpuTier, CsrNumericTable, Dispatcher, HomogenNumericTable, IndexBase, TableExt, TableRef,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const EPSILON: f64 = 1e-10;

pub fn baseline() -> Dispatcher {
    Dispatcher::fixed(CpuTier::Baseline)
}

/// Seeded row-major values in [-2, 2), roughly `zeros` of them zero
pub fn random_matrix(seed: u64, rows: usize, columns: usize, zeros: f64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..rows * columns)
        .map(|_| {
            if rng.gen::<f64>() < zeros {
                0.0
            } else {
                rng.gen_range(-2.0..2.0)
            }
        })
        .collect()
}

pub fn dense(rows: usize, columns: usize, values: &[f64]) -> TableRef<'static> {
    HomogenNumericTable::from_vec(rows, columns, values.to_vec())
        .unwrap()
        .into_shared()
}

pub fn csr(rows: usize, columns: usize, values: &[f64], base: IndexBase) -> TableRef<'static> {
    let source = HomogenNumericTable::from_vec(rows, columns, values.to_vec()).unwrap();
    CsrNumericTable::<f64>::from_dense(&source, base)
        .unwrap()
        .into_shared()
}

/// Like [`csr`] with each row's entries stored in reverse column order
pub fn csr_reversed(rows: usize, columns: usize, values: &[f64], base: IndexBase) -> TableRef<'static> {
    let source = HomogenNumericTable::from_vec(rows, columns, values.to_vec()).unwrap();
    let sorted = CsrNumericTable::<f64>::from_dense(&source, base).unwrap();
    let (mut stored, mut indices): (Vec<f64>, Vec<usize>) = (Vec::new(), Vec::new());
    for r in 0..rows {
        let (c, v) = sorted.row(r).unwrap();
        indices.extend(c.iter().rev());
        stored.extend(v.iter().rev());
    }
    let offsets = sorted.row_offsets().to_vec();
    CsrNumericTable::new(rows, columns, stored, indices, offsets, base)
        .unwrap()
        .into_shared()
}

/// `k * <x_i, y_j> + b` for every pair, from the definition
pub fn naive_linear(x: &[f64], y: &[f64], columns: usize, k: f64, b: f64) -> Vec<f64> {
    let mut out = Vec::new();
    for xi in x.chunks(columns) {
        for yj in y.chunks(columns) {
            out.push(k * xi.iter().zip(yj).map(|(a, b)| a * b).sum::<f64>() + b);
        }
    }
    out
}

pub fn naive_rbf(x: &[f64], y: &[f64], columns: usize, sigma: f64) -> Vec<f64> {
    let mut out = Vec::new();
    for xi in x.chunks(columns) {
        for yj in y.chunks(columns) {
            let d: f64 = xi.iter().zip(yj).map(|(a, b)| (a - b) * (a - b)).sum();
            out.push((-d / (2.0 * sigma * sigma)).exp());
        }
    }
    out
}

pub fn read(table: &TableRef<'static>) -> Vec<f64> {
    table.read_all::<f64>().unwrap().into_vec()
}

pub fn assert_vectors_close(actual: &[f64], expected: &[f64], context: &str) {
    assert_eq!(actual.len(), expected.len(), "length mismatch for {context}");
    for (&a, &e) in actual.iter().zip(expected) {
        assert_relative_eq!(a, e, epsilon = EPSILON, max_relative = 1e-10);
    }
}
