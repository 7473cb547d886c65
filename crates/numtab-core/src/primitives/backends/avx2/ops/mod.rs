//! Type-specific AVX2 kernels
//!
//! [`Avx2Ops`] routes each primitive to the `f32` or `f64` implementation at
//! compile time.

mod f32;
mod f64;

/// AVX2 entry points for one element type
///
/// # Safety
///
/// Callers must have verified AVX2 and FMA support on the running CPU. Slice
/// arguments must have equal lengths.
pub trait Avx2Ops: Sized + Copy {
    /// Elements per 256-bit register
    const LANES: usize;

    unsafe fn avx2_sum(data: &[Self]) -> Self;

    unsafe fn avx2_dot_product(a: &[Self], b: &[Self]) -> Self;

    unsafe fn avx2_axpy(alpha: Self, x: &[Self], y: &mut [Self]);

    unsafe fn avx2_squared_distance(a: &[Self], b: &[Self]) -> Self;
}

impl Avx2Ops for f32 {
    const LANES: usize = 8;

    unsafe fn avx2_sum(data: &[f32]) -> f32 {
        f32::sum(data)
    }

    unsafe fn avx2_dot_product(a: &[f32], b: &[f32]) -> f32 {
        f32::dot_product(a, b)
    }

    unsafe fn avx2_axpy(alpha: f32, x: &[f32], y: &mut [f32]) {
        f32::axpy(alpha, x, y)
    }

    unsafe fn avx2_squared_distance(a: &[f32], b: &[f32]) -> f32 {
        f32::squared_distance(a, b)
    }
}

impl Avx2Ops for f64 {
    const LANES: usize = 4;

    unsafe fn avx2_sum(data: &[f64]) -> f64 {
        f64::sum(data)
    }

    unsafe fn avx2_dot_product(a: &[f64], b: &[f64]) -> f64 {
        f64::dot_product(a, b)
    }

    unsafe fn avx2_axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
        f64::axpy(alpha, x, y)
    }

    unsafe fn avx2_squared_distance(a: &[f64], b: &[f64]) -> f64 {
        f64::squared_distance(a, b)
    }
}
