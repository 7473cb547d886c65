//! Shared utilities for integration tests
#![allow(dead_code)]

pub use approx::assert_relative_eq;

use numtab_core::{
    CsrNumericTable, HomogenNumericTable, IndexBase, SoaNumericTable, TableRef,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const EPSILON: f64 = 1e-10;

/// The 4 x 3 grid `[[1,2,3],[4,5,6],[7,8,9],[10,11,12]]`, row-major
pub fn grid_4x3() -> Vec<f64> {
    (1..=12).map(f64::from).collect()
}

/// Row-major values transposed into one vector per column
pub fn columns_of(rows: usize, columns: usize, values: &[f64]) -> Vec<Vec<f64>> {
    (0..columns)
        .map(|c| (0..rows).map(|r| values[r * columns + c]).collect())
        .collect()
}

/// The same logical matrix in every layout: row-major, SOA and CSR
pub fn all_layouts(rows: usize, columns: usize, values: &[f64]) -> Vec<TableRef<'static>> {
    let dense = HomogenNumericTable::from_vec(rows, columns, values.to_vec()).unwrap();
    let soa = SoaNumericTable::from_columns(rows, columns_of(rows, columns, values)).unwrap();
    let csr = CsrNumericTable::<f64>::from_dense(&dense, IndexBase::One).unwrap();
    vec![dense.into_shared(), soa.into_shared(), csr.into_shared()]
}

/// Seeded values in [-10, 10), with roughly `zeros` of them set to zero
pub fn random_matrix(seed: u64, rows: usize, columns: usize, zeros: f64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..rows * columns)
        .map(|_| {
            if rng.gen::<f64>() < zeros {
                0.0
            } else {
                rng.gen_range(-10.0..10.0)
            }
        })
        .collect()
}

/// Assert two vectors are equal within tolerance
pub fn assert_vectors_equal(actual: &[f64], expected: &[f64], context: &str) {
    assert_eq!(actual.len(), expected.len(), "length mismatch for {context}");
    for (&a, &e) in actual.iter().zip(expected) {
        assert_relative_eq!(a, e, epsilon = EPSILON);
    }
}

/// Generate array lengths that test edge cases for SIMD operations
pub fn edge_case_lengths() -> Vec<usize> {
    vec![
        0,   // Empty
        1,   // Single element
        2,   // SSE width
        3,   // SSE width + 1
        4,   // AVX2 width
        5,   // AVX2 width + 1
        7,   // AVX2 width - 1 + remainder
        8,   // f32 AVX2 width
        9,   // f32 AVX2 width + 1
        15,  // Multiple of no SIMD width
        16,  // Power of 2
        17,  // Power of 2 + 1
        31,  // Prime
        64,  // Cache line
        127, // Mersenne prime
    ]
}
