use super::AlgorithmDescriptor;
use crate::dispatch::{CpuTier, Dispatcher};
use crate::error::Result;
use crate::numeric::Precision;
use std::fmt;

/// Owner of the one kernel an algorithm object computes with
///
/// The kernel is resolved from the algorithm's registry at construction and
/// reused by every `compute()`; it is never shared with another container.
pub struct Container<A: AlgorithmDescriptor> {
    kernel: Box<A::Kernel>,
    precision: Precision,
    method: A::Method,
    tier: CpuTier,
    requested: CpuTier,
}

impl<A: AlgorithmDescriptor> Container<A> {
    /// Resolve against the process-wide dispatcher
    pub fn new(precision: Precision, method: A::Method) -> Result<Self> {
        Self::with_dispatcher(Dispatcher::global(), precision, method)
    }

    pub fn with_dispatcher(
        dispatcher: &Dispatcher,
        precision: Precision,
        method: A::Method,
    ) -> Result<Self> {
        let resolved = A::registry().resolve(dispatcher, precision, method)?;
        log::debug!(
            "{}: {precision}/{method:?} kernel for tier {} (requested {})",
            A::NAME,
            resolved.tier,
            resolved.requested
        );
        Ok(Self {
            kernel: resolved.kernel,
            precision,
            method,
            tier: resolved.tier,
            requested: resolved.requested,
        })
    }

    pub fn kernel(&self) -> &A::Kernel {
        &self.kernel
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn method(&self) -> A::Method {
        self.method
    }

    /// Tier of the kernel in use
    pub fn tier(&self) -> CpuTier {
        self.tier
    }

    /// Tier the dispatcher selected at construction
    pub fn requested_tier(&self) -> CpuTier {
        self.requested
    }
}

impl<A: AlgorithmDescriptor> fmt::Debug for Container<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("algorithm", &A::NAME)
            .field("precision", &self.precision)
            .field("method", &self.method)
            .field("tier", &self.tier)
            .field("requested", &self.requested)
            .finish_non_exhaustive()
    }
}
