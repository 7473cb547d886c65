//! Kernel registry of the kernel-function family

use crate::kernels::{CsrKernel, DenseKernel, PairwiseKernel};
use crate::types::Method;
use lazy_static::lazy_static;
use numtab_core::execution::default_engine;
use numtab_core::{
    scalar_backend, ComputePrimitives, CpuTier, FloatNumeric, KernelRegistry, Precision, Result,
};

fn dense<T, P>(primitives: P) -> Box<dyn PairwiseKernel>
where
    T: FloatNumeric,
    P: ComputePrimitives<T> + 'static,
{
    Box::new(DenseKernel::new(default_engine::<T, P>(primitives)))
}

fn dense_baseline<T: FloatNumeric>() -> Result<Box<dyn PairwiseKernel>> {
    Ok(dense::<T, _>(scalar_backend()))
}

// CSR rows are merge-walked entry by entry; only the baseline exists
fn csr_baseline<T: FloatNumeric>() -> Result<Box<dyn PairwiseKernel>> {
    Ok(Box::new(CsrKernel::new(default_engine::<T, _>(
        scalar_backend(),
    ))))
}

#[cfg(feature = "simd")]
mod simd {
    use super::*;
    use numtab_core::{avx2_backend, sse_backend, Avx2Backend, SseBackend};

    pub(super) fn dense_sse42<T: FloatNumeric>() -> Result<Box<dyn PairwiseKernel>>
    where
        SseBackend: ComputePrimitives<T>,
    {
        Ok(dense::<T, _>(sse_backend()?))
    }

    pub(super) fn dense_avx2<T: FloatNumeric>() -> Result<Box<dyn PairwiseKernel>>
    where
        Avx2Backend: ComputePrimitives<T>,
    {
        Ok(dense::<T, _>(avx2_backend()?))
    }
}

fn build_registry() -> KernelRegistry<Method, dyn PairwiseKernel> {
    let mut registry = KernelRegistry::new("kernel_function");
    registry
        .register(Precision::F64, Method::Dense, CpuTier::Baseline, dense_baseline::<f64>)
        .register(Precision::F32, Method::Dense, CpuTier::Baseline, dense_baseline::<f32>)
        .register(Precision::F64, Method::FastCsr, CpuTier::Baseline, csr_baseline::<f64>)
        .register(Precision::F32, Method::FastCsr, CpuTier::Baseline, csr_baseline::<f32>);

    #[cfg(feature = "simd")]
    registry
        .register(Precision::F64, Method::Dense, CpuTier::Sse42, simd::dense_sse42::<f64>)
        .register(Precision::F32, Method::Dense, CpuTier::Sse42, simd::dense_sse42::<f32>)
        .register(Precision::F64, Method::Dense, CpuTier::Avx2, simd::dense_avx2::<f64>)
        .register(Precision::F32, Method::Dense, CpuTier::Avx2, simd::dense_avx2::<f32>);

    registry
}

lazy_static! {
    pub(crate) static ref REGISTRY: KernelRegistry<Method, dyn PairwiseKernel> =
        build_registry();
}
