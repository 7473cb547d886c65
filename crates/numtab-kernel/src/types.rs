//! Identifiers, methods and parameters of the kernel-function family

use numtab_core::{argument_ids, ErrorKind, ErrorRecord, Parameter, Status};
use serde::{Deserialize, Serialize};
use std::ops::Range;

argument_ids! {
    /// Input slots
    pub enum InputId {
        /// n_x x p left operand
        X => "x",
        /// n_y x p right operand
        Y => "y",
    }
}

argument_ids! {
    /// Result slots
    pub enum ResultId {
        /// Kernel values, shaped by the computation mode
        Values => "values",
    }
}

/// Computation method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Any layout, read in dense row blocks
    #[default]
    Dense,
    /// Both inputs CSR, visiting stored entries
    FastCsr,
}

/// Which pairs of rows are evaluated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ComputationMode {
    /// Every row of X against every row of Y: n_x x n_y
    #[default]
    MatrixMatrix,
    /// Every row of X against one row of Y: n_x x 1
    MatrixVector { row_index_y: usize },
    /// One row of X against one row of Y: 1 x 1
    VectorVector { row_index_x: usize, row_index_y: usize },
}

impl ComputationMode {
    /// Rows of X and of Y taking part, for inputs of `rows_x` and `rows_y` rows
    pub fn row_ranges(self, rows_x: usize, rows_y: usize) -> (Range<usize>, Range<usize>) {
        match self {
            Self::MatrixMatrix => (0..rows_x, 0..rows_y),
            Self::MatrixVector { row_index_y } => (0..rows_x, row_index_y..row_index_y + 1),
            Self::VectorVector {
                row_index_x,
                row_index_y,
            } => (row_index_x..row_index_x + 1, row_index_y..row_index_y + 1),
        }
    }

    /// Out-of-range row indices for inputs of the given heights
    pub fn check_rows(self, rows_x: usize, rows_y: usize) -> Status {
        let index = |name: &'static str, index: usize, rows: usize| {
            Status::ensure(index < rows, || {
                ErrorRecord::new(ErrorKind::ParameterOutOfRange)
                    .with_argument(name)
                    .with_detail(format!("row {index} outside a table of {rows} rows"))
            })
        };
        match self {
            Self::MatrixMatrix => Status::ok(),
            Self::MatrixVector { row_index_y } => index("row_index_y", row_index_y, rows_y),
            Self::VectorVector {
                row_index_x,
                row_index_y,
            } => index("row_index_x", row_index_x, rows_x) | index("row_index_y", row_index_y, rows_y),
        }
    }
}

/// Kernel function and its coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelType {
    /// `k * <x, y> + b`
    Linear {
        #[serde(default = "one")]
        k: f64,
        #[serde(default)]
        b: f64,
    },
    /// `exp(-|x - y|^2 / (2 sigma^2))`
    Rbf {
        #[serde(default = "one")]
        sigma: f64,
    },
}

fn one() -> f64 {
    1.0
}

impl Default for KernelType {
    fn default() -> Self {
        Self::Linear { k: 1.0, b: 0.0 }
    }
}

/// Kernel-function parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelParameter {
    #[serde(default)]
    pub kernel: KernelType,
    #[serde(default)]
    pub computation_mode: ComputationMode,
}

impl KernelParameter {
    pub fn linear(k: f64, b: f64) -> Self {
        Self {
            kernel: KernelType::Linear { k, b },
            ..Self::default()
        }
    }

    pub fn rbf(sigma: f64) -> Self {
        Self {
            kernel: KernelType::Rbf { sigma },
            ..Self::default()
        }
    }

    pub fn with_computation_mode(mut self, computation_mode: ComputationMode) -> Self {
        self.computation_mode = computation_mode;
        self
    }
}

impl Parameter for KernelParameter {
    fn check(&self) -> Status {
        let finite = |name: &'static str, value: f64| {
            Status::ensure(value.is_finite(), || {
                ErrorRecord::new(ErrorKind::ParameterOutOfRange)
                    .with_argument(name)
                    .with_detail(format!("{value} is not finite"))
            })
        };
        match self.kernel {
            KernelType::Linear { k, b } => finite("k", k) | finite("b", b),
            KernelType::Rbf { sigma } => Status::ensure(sigma.is_finite() && sigma > 0.0, || {
                ErrorRecord::new(ErrorKind::ParameterOutOfRange)
                    .with_argument("sigma")
                    .with_detail(format!("sigma must be positive, got {sigma}"))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_ranges_per_mode() {
        assert_eq!(ComputationMode::MatrixMatrix.row_ranges(3, 4), (0..3, 0..4));
        assert_eq!(
            ComputationMode::MatrixVector { row_index_y: 2 }.row_ranges(3, 4),
            (0..3, 2..3)
        );
        assert_eq!(
            ComputationMode::VectorVector {
                row_index_x: 1,
                row_index_y: 0
            }
            .row_ranges(3, 4),
            (1..2, 0..1)
        );
    }

    #[test]
    fn test_out_of_range_rows() {
        let status = ComputationMode::VectorVector {
            row_index_x: 3,
            row_index_y: 4,
        }
        .check_rows(3, 4);
        assert_eq!(status.len(), 2);
        assert_eq!(status.first().unwrap().argument(), Some("row_index_x"));
        assert!(ComputationMode::MatrixVector { row_index_y: 3 }
            .check_rows(1, 4)
            .is_ok());
    }

    #[test]
    fn test_sigma_must_be_positive() {
        for sigma in [0.0, -1.0, f64::NAN] {
            let status = KernelParameter::rbf(sigma).check();
            assert_eq!(status.first().unwrap().kind(), ErrorKind::ParameterOutOfRange);
            assert_eq!(status.first().unwrap().argument(), Some("sigma"));
        }
        assert!(KernelParameter::rbf(0.5).check().is_ok());
        assert!(!KernelParameter::linear(f64::INFINITY, 0.0).check().is_ok());
    }

    #[test]
    fn test_parameter_json() {
        let parameter: KernelParameter = serde_json::from_str(
            r#"{"kernel":{"type":"rbf","sigma":2.0},
                "computation_mode":{"mode":"matrix_vector","row_index_y":1}}"#,
        )
        .unwrap();
        assert_eq!(
            parameter,
            KernelParameter::rbf(2.0)
                .with_computation_mode(ComputationMode::MatrixVector { row_index_y: 1 })
        );

        let defaults: KernelParameter = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, KernelParameter::linear(1.0, 0.0));
    }
}
