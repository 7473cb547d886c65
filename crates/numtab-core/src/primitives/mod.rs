//! Compute primitives with per-tier backends
//!
//! - Single `ComputePrimitives<T>` trait for all operations
//! - Concrete backend types: `ScalarBackend`, `SseBackend`, `Avx2Backend`
//! - SIMD backends exist only when the `simd` feature is enabled on x86_64
//!   and the CPU supports them; construction never panics
//!
//! # Usage
//!
//! ```rust
//! use numtab_core::primitives::{avx2_backend, ComputePrimitives, ScalarBackend};
//!
//! let data = [1.0f64, 2.0, 3.0, 4.0];
//! let scalar = ScalarBackend::new();
//! assert_eq!(scalar.sum(&data[..]), 10.0);
//!
//! if let Ok(avx2) = avx2_backend() {
//!     assert_eq!(avx2.sum(&data[..]), 10.0);
//! }
//! ```

pub mod backends;
pub mod traits;

pub use backends::{Avx2Backend, ScalarBackend, SseBackend};
pub use traits::ComputePrimitives;

use crate::dispatch::CpuTier;
use crate::error::{Error, ErrorKind, Result};

fn unavailable(tier: CpuTier) -> Error {
    Error::with_detail(
        ErrorKind::CpuFeatureNotAvailable,
        tier.name(),
        format!("{tier} backend not compiled in or not supported by this CPU"),
    )
}

/// Create a scalar backend (always available)
pub fn scalar_backend() -> ScalarBackend {
    ScalarBackend::new()
}

pub fn sse_backend() -> Result<SseBackend> {
    SseBackend::detect().ok_or_else(|| unavailable(CpuTier::Sse42))
}

pub fn avx2_backend() -> Result<Avx2Backend> {
    Avx2Backend::detect().ok_or_else(|| unavailable(CpuTier::Avx2))
}

/// Name of the widest backend usable in this process
pub fn best_backend_name() -> &'static str {
    if Avx2Backend::is_available() {
        "avx2"
    } else if SseBackend::is_available() {
        "sse"
    } else {
        "scalar"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_availability() {
        assert_eq!(ComputePrimitives::<f64>::tier(&scalar_backend()), CpuTier::Baseline);
        match avx2_backend() {
            Ok(backend) => {
                assert_eq!(ComputePrimitives::<f64>::tier(&backend), CpuTier::Avx2);
                assert_eq!(best_backend_name(), "avx2");
            }
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::CpuFeatureNotAvailable);
                assert_ne!(best_backend_name(), "avx2");
            }
        }
        #[cfg(not(feature = "simd"))]
        {
            assert!(sse_backend().is_err());
            assert_eq!(best_backend_name(), "scalar");
        }
    }
}
