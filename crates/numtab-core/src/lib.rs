//! Numeric tables, argument collections and CPU-tier kernel dispatch
//!
//! This crate is the substrate algorithm families are written against.
//!
//! # Architecture Overview
//!
//! 1. **Tables** - [`NumericTable`] over row-major, column-major (SOA) and
//!    CSR storage, read and written through typed blocks ([`TableExt`])
//! 2. **Arguments** - identifier-keyed [`ArgumentCollection`]s for inputs,
//!    results and partial results, plus [`Parameter`] structs
//! 3. **Dispatch** - a process-wide [`Dispatcher`] picks a [`CpuTier`] once;
//!    a [`KernelRegistry`] maps (precision, method, tier) to a kernel
//!    constructor and falls back to lower tiers
//! 4. **Modes** - [`Batch`], [`Online`] and the distributed steps drive one
//!    algorithm contract through its lifecycle
//!
//! Kernels compute with the [`ComputePrimitives`] of their tier, run through
//! an [`ExecutionEngine`].
//!
//! # Example
//!
//! ```rust
//! use numtab_core::{HomogenNumericTable, TableExt};
//! use numtab_core::execution::{scalar_sequential, ExecutionEngine};
//! use numtab_core::ComputePrimitives;
//!
//! let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
//! let table = HomogenNumericTable::wrap(2, 3, &data).unwrap();
//! let row = table.read_rows::<f64>(1..2).unwrap();
//!
//! let engine = scalar_sequential::<f64>();
//! assert_eq!(engine.primitives().sum(&row), 15.0);
//! ```

pub mod algorithm;
pub mod alloc;
pub mod arguments;
pub mod dictionary;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod numeric;
pub mod primitives;
pub mod registry;
pub mod table;

// Re-export core types
pub use error::{Error, ErrorCategory, ErrorKind, ErrorRecord, Result, Status};

pub use numeric::{DataType, FloatNumeric, Numeric, Precision};

pub use dictionary::{Dictionary, FeatureInfo, FeatureKind};

pub use table::{
    AllocationState, CsrNumericTable, CsrParts, HomogenNumericTable, IndexBase,
    MergedNumericTable, NumericTable, ReadBlock, SoaNumericTable, SparseSnapshot, TableExt,
    TableFlags, TableLayout, TableRef, TableSnapshot, WriteBlock,
};

pub use arguments::{
    Argument, ArgumentCollection, ArgumentId, ArgumentRole, CollectionSnapshot, Parameter,
};

pub use dispatch::{CpuFeatures, CpuTier, Dispatcher, DispatcherConfig, CPU_TIER_ENV};

pub use registry::{KernelConstructor, KernelMethod, KernelRegistry, ResolvedKernel};

pub use algorithm::{
    AlgorithmDescriptor, Batch, BatchMode, ComputeState, Container, DistributedStep1Local,
    DistributedStep2Master, Online, PartialMode,
};

pub use execution::{
    default_engine, scalar_sequential, DefaultEngine, ExecutionEngine, SequentialEngine,
};
#[cfg(feature = "parallel")]
pub use execution::ParallelEngine;

pub use primitives::{
    avx2_backend, best_backend_name, scalar_backend, sse_backend, Avx2Backend,
    ComputePrimitives, ScalarBackend, SseBackend,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AlgorithmDescriptor, ArgumentCollection, ArgumentId, Batch, BatchMode, ComputePrimitives,
        CpuTier, Dispatcher, DistributedStep1Local, DistributedStep2Master, Error, ErrorKind,
        ExecutionEngine, FloatNumeric, HomogenNumericTable, NumericTable, Online, Parameter,
        PartialMode, Precision, Result, Status, TableExt, TableRef,
    };
}
