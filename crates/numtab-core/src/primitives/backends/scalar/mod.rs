//! Scalar backend implementation
//!
//! Portable code for the baseline tier; every operation uses the trait
//! defaults.

use crate::dispatch::CpuTier;
use crate::numeric::FloatNumeric;
use crate::primitives::ComputePrimitives;

/// Scalar backend - works on every host
#[derive(Clone, Copy, Debug, Default)]
pub struct ScalarBackend;

impl ScalarBackend {
    pub fn new() -> Self {
        Self
    }
}

impl<T: FloatNumeric> ComputePrimitives<T> for ScalarBackend {
    fn backend_name(&self) -> &'static str {
        "scalar"
    }

    fn tier(&self) -> CpuTier {
        CpuTier::Baseline
    }
}
