//! Linear and RBF kernel functions over numeric tables
//!
//! For `X` (n_x x p) and `Y` (n_y x p) the batch algorithm evaluates
//!
//! - linear: `K(x, y) = k * <x, y> + b`
//! - RBF: `K(x, y) = exp(-|x - y|^2 / (2 sigma^2))`
//!
//! over the row pairs picked by the [`ComputationMode`]: all of them, all
//! rows of `X` against one row of `Y`, or a single pair.
//!
//! # Example
//!
//! ```rust
//! use numtab_core::{HomogenNumericTable, Precision, TableExt};
//! use numtab_kernel::{InputId, KernelFunctionBatch, KernelParameter, Method, ResultId};
//!
//! let x = HomogenNumericTable::from_vec(2, 2, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
//! let y = HomogenNumericTable::from_vec(1, 2, vec![2.0, 3.0]).unwrap();
//!
//! let mut batch = KernelFunctionBatch::new(Precision::F64, Method::Dense)
//!     .unwrap()
//!     .with_parameter(KernelParameter::linear(1.0, 1.0));
//! batch.set_input(InputId::X, x.into_shared());
//! batch.set_input(InputId::Y, y.into_shared());
//! batch.compute().unwrap();
//!
//! let values = batch.result_table(ResultId::Values).unwrap();
//! assert_eq!(values.read_all::<f64>().unwrap().into_vec(), vec![3.0, 4.0]);
//! ```

pub mod algorithm;
mod factories;
pub mod kernels;
pub mod types;

pub use algorithm::{KernelFunction, KernelFunctionBatch};
pub use kernels::{
    CsrKernel, DenseKernel, Function, PairwiseKernel, SortedRows, SparseRow, ROW_BLOCK,
};
pub use types::{ComputationMode, InputId, KernelParameter, KernelType, Method, ResultId};
