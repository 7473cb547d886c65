//! AVX2 backend
//!
//! An [`Avx2Backend`] can only be obtained through [`Avx2Backend::detect`],
//! which checks for AVX2 and FMA at run time; holding one is the proof that
//! the `#[target_feature]` functions in `ops` are safe to call.

#[cfg(all(target_arch = "x86_64", feature = "simd"))]
mod ops;
#[cfg(all(target_arch = "x86_64", feature = "simd"))]
mod utils;

use crate::dispatch::CpuTier;
use crate::numeric::FloatNumeric;
use crate::primitives::ComputePrimitives;

/// AVX2 + FMA backend for x86_64 processors
#[derive(Clone, Copy, Debug)]
pub struct Avx2Backend {
    _detected: (),
}

impl Avx2Backend {
    /// The backend, if this build and this CPU support it
    pub fn detect() -> Option<Self> {
        #[cfg(all(target_arch = "x86_64", feature = "simd"))]
        {
            if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
                return Some(Self { _detected: () });
            }
        }
        None
    }

    pub fn is_available() -> bool {
        Self::detect().is_some()
    }
}

#[cfg(all(target_arch = "x86_64", feature = "simd"))]
impl<T> ComputePrimitives<T> for Avx2Backend
where
    T: FloatNumeric + ops::Avx2Ops,
{
    fn backend_name(&self) -> &'static str {
        "avx2"
    }

    fn tier(&self) -> CpuTier {
        CpuTier::Avx2
    }

    fn simd_width(&self) -> usize {
        T::LANES
    }

    fn sum(&self, data: &[T]) -> T {
        // SAFETY: the backend exists only if AVX2 and FMA were detected
        unsafe { T::avx2_sum(data) }
    }

    fn dot_product(&self, a: &[T], b: &[T]) -> T {
        debug_assert_eq!(a.len(), b.len());
        // SAFETY: as above
        unsafe { T::avx2_dot_product(a, b) }
    }

    fn axpy(&self, alpha: T, x: &[T], y: &mut [T]) {
        debug_assert_eq!(x.len(), y.len());
        // SAFETY: as above
        unsafe { T::avx2_axpy(alpha, x, y) }
    }

    fn squared_distance(&self, a: &[T], b: &[T]) -> T {
        debug_assert_eq!(a.len(), b.len());
        // SAFETY: as above
        unsafe { T::avx2_squared_distance(a, b) }
    }
}

// Never constructed in builds without the kernels
#[cfg(not(all(target_arch = "x86_64", feature = "simd")))]
impl<T: FloatNumeric> ComputePrimitives<T> for Avx2Backend {
    fn backend_name(&self) -> &'static str {
        "avx2 (unavailable)"
    }

    fn tier(&self) -> CpuTier {
        CpuTier::Avx2
    }
}
