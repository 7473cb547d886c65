//! Identifiers, methods and parameters of the covariance family

use numtab_core::{argument_ids, ErrorKind, ErrorRecord, Parameter, Status};
use serde::{Deserialize, Serialize};

argument_ids! {
    /// Input slots
    pub enum InputId {
        Data => "data",
    }
}

argument_ids! {
    /// Result slots
    pub enum ResultId {
        /// p x p covariance or correlation matrix
        Covariance => "covariance",
        /// 1 x p mean vector
        Mean => "mean",
    }
}

argument_ids! {
    /// Partial result slots, mergeable across chunks and workers
    pub enum PartialId {
        /// 1 x 1 observation count
        NObservations => "n_observations",
        /// 1 x p column sums
        Sum => "sum",
        /// p x p cross-product of the centered data
        CrossProduct => "cross_product",
    }
}

/// Computation method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Any layout, read in dense row blocks
    #[default]
    Dense,
    /// CSR input only, visiting stored entries
    FastCsr,
}

/// What the finalized matrix holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMatrixType {
    #[default]
    Covariance,
    Correlation,
}

pub const DEFAULT_BLOCK_SIZE: usize = 512;

fn default_block_size() -> usize {
    DEFAULT_BLOCK_SIZE
}

/// Covariance parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovarianceParameter {
    #[serde(default)]
    pub output_matrix_type: OutputMatrixType,
    /// Rows per block handed to the execution engine
    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

impl Default for CovarianceParameter {
    fn default() -> Self {
        Self {
            output_matrix_type: OutputMatrixType::default(),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl CovarianceParameter {
    pub fn correlation() -> Self {
        Self::default().with_output_matrix_type(OutputMatrixType::Correlation)
    }

    pub fn with_output_matrix_type(mut self, output_matrix_type: OutputMatrixType) -> Self {
        self.output_matrix_type = output_matrix_type;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }
}

impl Parameter for CovarianceParameter {
    fn check(&self) -> Status {
        Status::ensure(self.block_size > 0, || {
            ErrorRecord::new(ErrorKind::ParameterOutOfRange)
                .with_argument("block_size")
                .with_detail("block size must be at least 1")
        })
    }
}
