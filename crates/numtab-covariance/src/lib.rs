//! Covariance and correlation matrices over numeric tables
//!
//! For `n` observations of `p` features this crate computes the `p x p`
//! sample covariance (denominator `n - 1`) or correlation matrix together
//! with the `1 x p` mean vector.
//!
//! # Methods
//!
//! | Method | Input layouts | Visits |
//! |--------|---------------|--------|
//! | [`Method::Dense`] | any | every element |
//! | [`Method::FastCsr`] | CSR only | stored entries |
//!
//! # Modes
//!
//! The same kernels drive [`CovarianceBatch`], [`CovarianceOnline`] and the
//! two distributed steps. Partial results hold the observation count, the
//! column sums and the centered cross-product matrix, so merging chunks in
//! any grouping gives the batch answer up to rounding.
//!
//! # Example
//!
//! ```rust
//! use numtab_core::{HomogenNumericTable, Precision, TableExt};
//! use numtab_covariance::{CovarianceBatch, InputId, Method, ResultId};
//!
//! let data = vec![1.0, 2.0, 2.0, 4.0, 3.0, 9.0];
//! let table = HomogenNumericTable::from_vec(3, 2, data).unwrap();
//!
//! let mut batch = CovarianceBatch::new(Precision::F64, Method::Dense).unwrap();
//! batch.set_input(InputId::Data, table.into_shared());
//! batch.compute().unwrap();
//!
//! let cov = batch.result_table(ResultId::Covariance).unwrap();
//! assert_eq!(cov.read_all::<f64>().unwrap().into_vec(), vec![1.0, 3.5, 3.5, 13.0]);
//! ```

pub mod algorithm;
mod factories;
pub mod kernels;
pub mod moments;
pub mod types;

pub use algorithm::{
    Covariance, CovarianceBatch, CovarianceOnline, CovarianceStep1Local, CovarianceStep2Master,
};
pub use kernels::{CovarianceKernel, CsrKernel, DenseKernel, MomentSource};
pub use moments::{Finalized, Moments};
pub use types::{
    CovarianceParameter, InputId, Method, OutputMatrixType, PartialId, ResultId,
    DEFAULT_BLOCK_SIZE,
};
