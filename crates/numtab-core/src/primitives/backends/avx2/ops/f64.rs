//! AVX2 kernels for f64

use super::super::utils::horizontal_sum_pd;
use std::arch::x86_64::*;

const LANES: usize = 4;

#[target_feature(enable = "avx2")]
pub unsafe fn sum(data: &[f64]) -> f64 {
    let n = data.len();
    let chunks = n / LANES;
    let mut acc = _mm256_setzero_pd();
    for i in 0..chunks {
        let v = _mm256_loadu_pd(data.as_ptr().add(i * LANES));
        acc = _mm256_add_pd(acc, v);
    }
    let mut total = horizontal_sum_pd(acc);
    for &x in &data[chunks * LANES..] {
        total += x;
    }
    total
}

#[target_feature(enable = "avx2,fma")]
pub unsafe fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    let chunks = n / LANES;
    let mut acc = _mm256_setzero_pd();
    for i in 0..chunks {
        let offset = i * LANES;
        let va = _mm256_loadu_pd(a.as_ptr().add(offset));
        let vb = _mm256_loadu_pd(b.as_ptr().add(offset));
        acc = _mm256_fmadd_pd(va, vb, acc);
    }
    let mut total = horizontal_sum_pd(acc);
    for i in chunks * LANES..n {
        total += a[i] * b[i];
    }
    total
}

#[target_feature(enable = "avx2,fma")]
pub unsafe fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    let n = x.len().min(y.len());
    let chunks = n / LANES;
    let va = _mm256_set1_pd(alpha);
    for i in 0..chunks {
        let offset = i * LANES;
        let vx = _mm256_loadu_pd(x.as_ptr().add(offset));
        let vy = _mm256_loadu_pd(y.as_ptr().add(offset));
        _mm256_storeu_pd(y.as_mut_ptr().add(offset), _mm256_fmadd_pd(va, vx, vy));
    }
    for i in chunks * LANES..n {
        y[i] += alpha * x[i];
    }
}

#[target_feature(enable = "avx2,fma")]
pub unsafe fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    let chunks = n / LANES;
    let mut acc = _mm256_setzero_pd();
    for i in 0..chunks {
        let offset = i * LANES;
        let d = _mm256_sub_pd(
            _mm256_loadu_pd(a.as_ptr().add(offset)),
            _mm256_loadu_pd(b.as_ptr().add(offset)),
        );
        acc = _mm256_fmadd_pd(d, d, acc);
    }
    let mut total = horizontal_sum_pd(acc);
    for i in chunks * LANES..n {
        let d = a[i] - b[i];
        total += d * d;
    }
    total
}
