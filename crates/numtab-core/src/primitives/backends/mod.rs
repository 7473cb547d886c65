//! Backend implementations, one per instruction-set tier
//!
//! No Box, no dyn: kernels are instantiated per backend type and the registry
//! picks the instantiation.

pub mod avx2;
pub mod scalar;
pub mod sse;

pub use avx2::Avx2Backend;
pub use scalar::ScalarBackend;
pub use sse::SseBackend;
