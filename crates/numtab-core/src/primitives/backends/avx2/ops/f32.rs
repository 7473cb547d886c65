//! AVX2 kernels for f32

use super::super::utils::horizontal_sum_ps;
use std::arch::x86_64::*;

const LANES: usize = 8;

#[target_feature(enable = "avx2")]
pub unsafe fn sum(data: &[f32]) -> f32 {
    let n = data.len();
    let chunks = n / LANES;
    let mut acc = _mm256_setzero_ps();
    for i in 0..chunks {
        let v = _mm256_loadu_ps(data.as_ptr().add(i * LANES));
        acc = _mm256_add_ps(acc, v);
    }
    let mut total = horizontal_sum_ps(acc);
    for &x in &data[chunks * LANES..] {
        total += x;
    }
    total
}

#[target_feature(enable = "avx2,fma")]
pub unsafe fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let chunks = n / LANES;
    let mut acc = _mm256_setzero_ps();
    for i in 0..chunks {
        let offset = i * LANES;
        let va = _mm256_loadu_ps(a.as_ptr().add(offset));
        let vb = _mm256_loadu_ps(b.as_ptr().add(offset));
        acc = _mm256_fmadd_ps(va, vb, acc);
    }
    let mut total = horizontal_sum_ps(acc);
    for i in chunks * LANES..n {
        total += a[i] * b[i];
    }
    total
}

#[target_feature(enable = "avx2,fma")]
pub unsafe fn axpy(alpha: f32, x: &[f32], y: &mut [f32]) {
    let n = x.len().min(y.len());
    let chunks = n / LANES;
    let va = _mm256_set1_ps(alpha);
    for i in 0..chunks {
        let offset = i * LANES;
        let vx = _mm256_loadu_ps(x.as_ptr().add(offset));
        let vy = _mm256_loadu_ps(y.as_ptr().add(offset));
        _mm256_storeu_ps(y.as_mut_ptr().add(offset), _mm256_fmadd_ps(va, vx, vy));
    }
    for i in chunks * LANES..n {
        y[i] += alpha * x[i];
    }
}

#[target_feature(enable = "avx2,fma")]
pub unsafe fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let chunks = n / LANES;
    let mut acc = _mm256_setzero_ps();
    for i in 0..chunks {
        let offset = i * LANES;
        let d = _mm256_sub_ps(
            _mm256_loadu_ps(a.as_ptr().add(offset)),
            _mm256_loadu_ps(b.as_ptr().add(offset)),
        );
        acc = _mm256_fmadd_ps(d, d, acc);
    }
    let mut total = horizontal_sum_ps(acc);
    for i in chunks * LANES..n {
        let d = a[i] - b[i];
        total += d * d;
    }
    total
}
