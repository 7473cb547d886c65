//! Compute primitives trait
//!
//! Kernels are generic over a backend implementing [`ComputePrimitives`];
//! the backend chosen for a kernel is fixed by the tier it is registered for.

use crate::dispatch::CpuTier;
use crate::numeric::FloatNumeric;

/// Low-level vector operations, specialized per instruction-set tier
///
/// Every method has a portable default; SIMD backends override the hot ones.
/// Slices passed together must have equal lengths.
pub trait ComputePrimitives<T: FloatNumeric = f64>: Clone + Send + Sync {
    /// Get the name of this backend
    fn backend_name(&self) -> &'static str;

    /// Tier whose instructions this backend uses
    fn tier(&self) -> CpuTier;

    /// Elements processed per instruction
    fn simd_width(&self) -> usize {
        1
    }

    /// Sum all elements in a slice
    fn sum(&self, data: &[T]) -> T {
        data.iter().fold(T::zero(), |acc, &x| acc + x)
    }

    /// Compute dot product of two vectors
    fn dot_product(&self, a: &[T], b: &[T]) -> T {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b)
            .fold(T::zero(), |acc, (&x, &y)| acc + x * y)
    }

    /// `y += alpha * x`
    fn axpy(&self, alpha: T, x: &[T], y: &mut [T]) {
        debug_assert_eq!(x.len(), y.len());
        for (yi, &xi) in y.iter_mut().zip(x) {
            *yi += alpha * xi;
        }
    }

    /// Squared euclidean distance `|a - b|^2`
    fn squared_distance(&self, a: &[T], b: &[T]) -> T {
        debug_assert_eq!(a.len(), b.len());
        a.iter().zip(b).fold(T::zero(), |acc, (&x, &y)| {
            let d = x - y;
            acc + d * d
        })
    }

    fn mean(&self, data: &[T]) -> T {
        if data.is_empty() {
            return T::zero();
        }
        self.sum(data) / T::from_f64(data.len() as f64)
    }
}
