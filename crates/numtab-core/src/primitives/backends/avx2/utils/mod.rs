//! Shared helpers for the AVX2 kernels

use std::arch::x86_64::*;

/// Horizontal sum of a __m256d (4 f64s)
#[inline]
#[target_feature(enable = "avx2")]
pub unsafe fn horizontal_sum_pd(v: __m256d) -> f64 {
    let high = _mm256_extractf128_pd(v, 1);
    let low = _mm256_castpd256_pd128(v);
    let sum128 = _mm_add_pd(high, low);
    let sum = _mm_hadd_pd(sum128, sum128);
    _mm_cvtsd_f64(sum)
}

/// Horizontal sum of a __m256 (8 f32s)
#[inline]
#[target_feature(enable = "avx2")]
pub unsafe fn horizontal_sum_ps(v: __m256) -> f32 {
    let high = _mm256_extractf128_ps(v, 1);
    let low = _mm256_castps256_ps128(v);
    let sum128 = _mm_add_ps(high, low);
    // [a, b, c, d] -> a + b + c + d in lane 0
    let shuf = _mm_movehdup_ps(sum128);
    let sums = _mm_add_ps(sum128, shuf);
    let high_pair = _mm_movehl_ps(shuf, sums);
    _mm_cvtss_f32(_mm_add_ss(sums, high_pair))
}
