//! Numeric tables and CPU-dispatched algorithm kernels
//!
//! Facade over the workspace crates:
//!
//! - [`numtab_core`]: tables, argument collections, dispatch and the
//!   algorithm modes, re-exported at the root of this crate
//! - [`covariance`]: covariance and correlation matrices
//! - [`kernel_function`]: linear and RBF kernel functions

pub use numtab_core::*;

/// Covariance and correlation matrices
pub mod covariance {
    pub use numtab_covariance::*;
}

/// Linear and RBF kernel functions
pub mod kernel_function {
    pub use numtab_kernel::*;
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use numtab_core::prelude::*;
    pub use numtab_covariance::{
        CovarianceBatch, CovarianceOnline, CovarianceParameter, CovarianceStep1Local,
        CovarianceStep2Master, OutputMatrixType,
    };
    pub use numtab_kernel::{ComputationMode, KernelFunctionBatch, KernelParameter, KernelType};
}
