//! SSE backend for the SSE4.2 tier
//!
//! 128-bit kernels; the tier guarantees SSE through SSE4.2, the kernels
//! themselves only need SSE2 and SSE3.

use crate::dispatch::CpuTier;
use crate::numeric::FloatNumeric;
use crate::primitives::ComputePrimitives;

/// 128-bit SIMD backend
#[derive(Clone, Copy, Debug)]
pub struct SseBackend {
    _detected: (),
}

impl SseBackend {
    /// The backend, if this build and this CPU support it
    pub fn detect() -> Option<Self> {
        #[cfg(all(target_arch = "x86_64", feature = "simd"))]
        {
            if is_x86_feature_detected!("sse4.2") {
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
mod kernels {
    use std::arch::x86_64::*;

    /// SSE entry points for one element type
    ///
    /// # Safety
    ///
    /// SSE3 must be available; equal slice lengths.
    pub trait SseOps: Sized + Copy {
        const LANES: usize;

        unsafe fn sse_sum(data: &[Self]) -> Self;

        unsafe fn sse_dot_product(a: &[Self], b: &[Self]) -> Self;

        unsafe fn sse_squared_distance(a: &[Self], b: &[Self]) -> Self;
    }

    #[inline]
    #[target_feature(enable = "sse3")]
    unsafe fn hsum_pd(v: __m128d) -> f64 {
        _mm_cvtsd_f64(_mm_hadd_pd(v, v))
    }

    #[inline]
    #[target_feature(enable = "sse3")]
    unsafe fn hsum_ps(v: __m128) -> f32 {
        let shuf = _mm_movehdup_ps(v);
        let sums = _mm_add_ps(v, shuf);
        _mm_cvtss_f32(_mm_add_ss(sums, _mm_movehl_ps(shuf, sums)))
    }

    #[target_feature(enable = "sse3")]
    unsafe fn sum_f64(data: &[f64]) -> f64 {
        let chunks = data.len() / 2;
        let mut acc = _mm_setzero_pd();
        for i in 0..chunks {
            acc = _mm_add_pd(acc, _mm_loadu_pd(data.as_ptr().add(i * 2)));
        }
        data[chunks * 2..].iter().fold(hsum_pd(acc), |t, &x| t + x)
    }

    #[target_feature(enable = "sse3")]
    unsafe fn dot_product_f64(a: &[f64], b: &[f64]) -> f64 {
        let n = a.len().min(b.len());
        let chunks = n / 2;
        let mut acc = _mm_setzero_pd();
        for i in 0..chunks {
            let va = _mm_loadu_pd(a.as_ptr().add(i * 2));
            let vb = _mm_loadu_pd(b.as_ptr().add(i * 2));
            acc = _mm_add_pd(acc, _mm_mul_pd(va, vb));
        }
        (chunks * 2..n).fold(hsum_pd(acc), |t, i| t + a[i] * b[i])
    }

    #[target_feature(enable = "sse3")]
    unsafe fn squared_distance_f64(a: &[f64], b: &[f64]) -> f64 {
        let n = a.len().min(b.len());
        let chunks = n / 2;
        let mut acc = _mm_setzero_pd();
        for i in 0..chunks {
            let d = _mm_sub_pd(
                _mm_loadu_pd(a.as_ptr().add(i * 2)),
                _mm_loadu_pd(b.as_ptr().add(i * 2)),
            );
            acc = _mm_add_pd(acc, _mm_mul_pd(d, d));
        }
        (chunks * 2..n).fold(hsum_pd(acc), |t, i| {
            let d = a[i] - b[i];
            t + d * d
        })
    }

    #[target_feature(enable = "sse3")]
    unsafe fn sum_f32(data: &[f32]) -> f32 {
        let chunks = data.len() / 4;
        let mut acc = _mm_setzero_ps();
        for i in 0..chunks {
            acc = _mm_add_ps(acc, _mm_loadu_ps(data.as_ptr().add(i * 4)));
        }
        data[chunks * 4..].iter().fold(hsum_ps(acc), |t, &x| t + x)
    }

    #[target_feature(enable = "sse3")]
    unsafe fn dot_product_f32(a: &[f32], b: &[f32]) -> f32 {
        let n = a.len().min(b.len());
        let chunks = n / 4;
        let mut acc = _mm_setzero_ps();
        for i in 0..chunks {
            let va = _mm_loadu_ps(a.as_ptr().add(i * 4));
            let vb = _mm_loadu_ps(b.as_ptr().add(i * 4));
            acc = _mm_add_ps(acc, _mm_mul_ps(va, vb));
        }
        (chunks * 4..n).fold(hsum_ps(acc), |t, i| t + a[i] * b[i])
    }

    #[target_feature(enable = "sse3")]
    unsafe fn squared_distance_f32(a: &[f32], b: &[f32]) -> f32 {
        let n = a.len().min(b.len());
        let chunks = n / 4;
        let mut acc = _mm_setzero_ps();
        for i in 0..chunks {
            let d = _mm_sub_ps(
                _mm_loadu_ps(a.as_ptr().add(i * 4)),
                _mm_loadu_ps(b.as_ptr().add(i * 4)),
            );
            acc = _mm_add_ps(acc, _mm_mul_ps(d, d));
        }
        (chunks * 4..n).fold(hsum_ps(acc), |t, i| {
            let d = a[i] - b[i];
            t + d * d
        })
    }

    impl SseOps for f64 {
        const LANES: usize = 2;

        unsafe fn sse_sum(data: &[f64]) -> f64 {
            sum_f64(data)
        }

        unsafe fn sse_dot_product(a: &[f64], b: &[f64]) -> f64 {
            dot_product_f64(a, b)
        }

        unsafe fn sse_squared_distance(a: &[f64], b: &[f64]) -> f64 {
            squared_distance_f64(a, b)
        }
    }

    impl SseOps for f32 {
        const LANES: usize = 4;

        unsafe fn sse_sum(data: &[f32]) -> f32 {
            sum_f32(data)
        }

        unsafe fn sse_dot_product(a: &[f32], b: &[f32]) -> f32 {
            dot_product_f32(a, b)
        }

        unsafe fn sse_squared_distance(a: &[f32], b: &[f32]) -> f32 {
            squared_distance_f32(a, b)
        }
    }
}

#[cfg(all(target_arch = "x86_64", feature = "simd"))]
impl<T> ComputePrimitives<T> for SseBackend
where
    T: FloatNumeric + kernels::SseOps,
{
    fn backend_name(&self) -> &'static str {
        "sse"
    }

    fn tier(&self) -> CpuTier {
        CpuTier::Sse42
    }

    fn simd_width(&self) -> usize {
        T::LANES
    }

    fn sum(&self, data: &[T]) -> T {
        // SAFETY: the backend exists only if SSE4.2 (and so SSE3) was detected
        unsafe { T::sse_sum(data) }
    }

    fn dot_product(&self, a: &[T], b: &[T]) -> T {
        debug_assert_eq!(a.len(), b.len());
        // SAFETY: as above
        unsafe { T::sse_dot_product(a, b) }
    }

    fn squared_distance(&self, a: &[T], b: &[T]) -> T {
        debug_assert_eq!(a.len(), b.len());
        // SAFETY: as above
        unsafe { T::sse_squared_distance(a, b) }
    }
}

#[cfg(not(all(target_arch = "x86_64", feature = "simd")))]
impl<T: FloatNumeric> ComputePrimitives<T> for SseBackend {
    fn backend_name(&self) -> &'static str {
        "sse (unavailable)"
    }

    fn tier(&self) -> CpuTier {
        CpuTier::Sse42
    }
}

#[cfg(all(test, target_arch = "x86_64", feature = "simd"))]
mod tests {
    use super::*;
    use crate::primitives::ScalarBackend;
    use approx::assert_relative_eq;

    #[test]
    fn test_matches_scalar() {
        let Some(sse) = SseBackend::detect() else {
            return;
        };
        let scalar = ScalarBackend::new();
        for n in [0, 1, 2, 3, 5, 16, 31] {
            let a: Vec<f64> = (0..n).map(|i| i as f64 * 0.5 - 3.0).collect();
            let b: Vec<f64> = (0..n).map(|i| 1.0 / (i as f64 + 1.0)).collect();
            let (a, b) = (a.as_slice(), b.as_slice());
            assert_relative_eq!(sse.sum(a), scalar.sum(a), epsilon = 1e-12);
            assert_relative_eq!(sse.dot_product(a, b), scalar.dot_product(a, b), epsilon = 1e-12);
            assert_relative_eq!(
                sse.squared_distance(a, b),
                scalar.squared_distance(a, b),
                epsilon = 1e-12
            );

            let a32: Vec<f32> = a.iter().map(|&v| v as f32).collect();
            let a32 = a32.as_slice();
            assert_relative_eq!(sse.sum(a32), scalar.sum(a32), epsilon = 1e-4);
        }
    }
}
