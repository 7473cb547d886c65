//! Algorithm objects and computation modes
//!
//! An algorithm family implements [`AlgorithmDescriptor`] once, naming its
//! identifier enumerations, parameter type, kernel interface and registry,
//! plus one mode trait per supported computation mode:
//!
//! - [`BatchMode`] drives [`Batch`]: one input, one result.
//! - [`PartialMode`] drives [`Online`] (chunks folded into a partial result)
//!   and the distributed steps [`DistributedStep1Local`] and
//!   [`DistributedStep2Master`].
//!
//! Every mode validates parameters and inputs before touching a kernel and
//! builds new results and partial results off to the side, so a failed
//! `compute()` leaves the object exactly as it was.

mod batch;
mod container;
mod distributed;
mod online;

pub use batch::Batch;
pub use container::Container;
pub use distributed::{DistributedStep1Local, DistributedStep2Master};
pub use online::Online;

use crate::arguments::{ArgumentCollection, ArgumentId, Parameter};
use crate::error::{Error, ErrorKind, Result, Status};
use crate::numeric::Precision;
use crate::registry::{KernelMethod, KernelRegistry};
use serde::{Deserialize, Serialize};

/// Static description of an algorithm family
pub trait AlgorithmDescriptor: Sized + 'static {
    /// Used in logs and registry errors
    const NAME: &'static str;

    type Method: KernelMethod + Default;

    type Parameter: Parameter;

    type InputId: ArgumentId;

    type ResultId: ArgumentId;

    /// Object-safe kernel interface constructed by the registry
    type Kernel: ?Sized + Send + Sync;

    fn registry() -> &'static KernelRegistry<Self::Method, Self::Kernel>;

    /// Presence, shape and type checks of the inputs for `method`
    fn check_input(
        input: &ArgumentCollection<'_, Self::InputId>,
        parameter: &Self::Parameter,
        method: Self::Method,
    ) -> Status;
}

/// Lifecycle of an algorithm object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComputeState {
    Uninitialized,
    /// Inputs provided, nothing computed yet
    Configured,
    /// Batch result available
    Computed,
    /// At least one chunk or partial folded in
    PartiallyComputed,
    Finalized,
}

/// Single-shot computation over the whole input
pub trait BatchMode: AlgorithmDescriptor {
    /// Fresh result collection sized from the input shape, stored in the
    /// kernel's precision
    fn allocate_result(
        input: &ArgumentCollection<'_, Self::InputId>,
        parameter: &Self::Parameter,
        precision: Precision,
    ) -> Result<ArgumentCollection<'static, Self::ResultId>>;

    fn compute(
        kernel: &Self::Kernel,
        input: &ArgumentCollection<'_, Self::InputId>,
        parameter: &Self::Parameter,
        result: &mut ArgumentCollection<'static, Self::ResultId>,
    ) -> Result<()>;
}

/// Computation expressed as mergeable partial results
///
/// Merging must be associative so that online chunking and distributed
/// splitting agree with a single pass over the concatenated data.
pub trait PartialMode: AlgorithmDescriptor {
    type PartialId: ArgumentId;

    /// Partial result of one chunk of input
    fn compute_partial(
        kernel: &Self::Kernel,
        input: &ArgumentCollection<'_, Self::InputId>,
        parameter: &Self::Parameter,
    ) -> Result<ArgumentCollection<'static, Self::PartialId>>;

    /// Combine two partial results into a new one
    fn merge_partials(
        kernel: &Self::Kernel,
        accumulated: &ArgumentCollection<'static, Self::PartialId>,
        next: &ArgumentCollection<'static, Self::PartialId>,
        parameter: &Self::Parameter,
    ) -> Result<ArgumentCollection<'static, Self::PartialId>>;

    fn finalize(
        kernel: &Self::Kernel,
        partial: &ArgumentCollection<'static, Self::PartialId>,
        parameter: &Self::Parameter,
    ) -> Result<ArgumentCollection<'static, Self::ResultId>>;

    /// Validation of a partial result received from elsewhere
    fn check_partial(
        partial: &ArgumentCollection<'static, Self::PartialId>,
        parameter: &Self::Parameter,
    ) -> Status;
}

/// Reduce `partial` into a result unless a current one already exists
fn finalize_partial<A: PartialMode>(
    container: &Container<A>,
    partial: Option<&ArgumentCollection<'static, A::PartialId>>,
    parameter: &A::Parameter,
    result: &mut Option<ArgumentCollection<'static, A::ResultId>>,
    stale: &mut bool,
) -> Result<()> {
    let partial =
        partial.ok_or_else(|| Error::with_argument(ErrorKind::NullPartialResult, "partial_result"))?;
    if result.is_some() && !*stale {
        return Ok(());
    }
    (parameter.check() | A::check_partial(partial, parameter)).into_result()?;
    let finalized = A::finalize(container.kernel(), partial, parameter)?;
    *result = Some(finalized);
    *stale = false;
    Ok(())
}
