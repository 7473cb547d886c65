//! Mergeable first and second moments
//!
//! A [`Moments`] holds the observation count, the column sums and the
//! cross-product of the centered data, `sum (x - mean)(x - mean)^T`. Two sets
//! combine exactly (up to rounding) with
//!
//! ```text
//! C = C_a + C_b + (n_a n_b / n) d d^T,   d = mean_b - mean_a
//! ```
//!
//! so chunked and distributed computation agree with a single pass.

use crate::types::{OutputMatrixType, PartialId, ResultId};
use numtab_core::alloc::{checked_len, try_zeroed};
use numtab_core::{
    ArgumentCollection, ArgumentRole, ComputePrimitives, Error, ErrorKind, FloatNumeric,
    HomogenNumericTable, Result, TableExt,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Moments<T: FloatNumeric> {
    pub n: usize,
    pub columns: usize,
    /// Column sums, length `columns`
    pub sum: Vec<T>,
    /// Centered cross-product, row-major `columns x columns`
    pub cross: Vec<T>,
}

/// Finalized matrix and mean vector
#[derive(Debug, Clone, PartialEq)]
pub struct Finalized<T: FloatNumeric> {
    pub columns: usize,
    pub matrix: Vec<T>,
    pub mean: Vec<T>,
}

impl<T: FloatNumeric> Moments<T> {
    /// No observations of `columns` features
    pub fn empty(columns: usize) -> Result<Self> {
        Ok(Self {
            n: 0,
            columns,
            sum: try_zeroed(columns)?,
            cross: try_zeroed(checked_len(columns, columns)?)?,
        })
    }

    pub fn mean(&self) -> Vec<T> {
        if self.n == 0 {
            return vec![T::zero(); self.columns];
        }
        let n = T::from_f64(self.n as f64);
        self.sum.iter().map(|&s| s / n).collect()
    }

    /// Two-pass moments of a dense row-major block
    pub fn from_rows<P: ComputePrimitives<T>>(
        primitives: &P,
        block: &[T],
        columns: usize,
    ) -> Result<Self> {
        let mut moments = Self::empty(columns)?;
        if columns == 0 {
            return Ok(moments);
        }
        let rows = block.len() / columns;
        for row in block.chunks_exact(columns) {
            primitives.axpy(T::one(), row, &mut moments.sum);
        }
        moments.n = rows;
        let mean = moments.mean();

        let mut centered = try_zeroed::<T>(columns)?;
        for row in block.chunks_exact(columns) {
            for ((c, &x), &m) in centered.iter_mut().zip(row).zip(&mean) {
                *c = x - m;
            }
            add_outer(primitives, &mut moments.cross, &centered, T::one());
        }
        Ok(moments)
    }

    /// Moments from sums and the raw (uncentered) cross-product
    pub fn from_raw<P: ComputePrimitives<T>>(
        primitives: &P,
        n: usize,
        sum: Vec<T>,
        mut raw: Vec<T>,
    ) -> Self {
        let columns = sum.len();
        if n > 0 {
            let scale = -T::one() / T::from_f64(n as f64);
            add_outer(primitives, &mut raw, &sum, scale);
        }
        Self {
            n,
            columns,
            sum,
            cross: raw,
        }
    }

    /// Combine with the moments of further observations
    pub fn merge<P: ComputePrimitives<T>>(&self, primitives: &P, other: &Self) -> Result<Self> {
        if self.columns != other.columns {
            return Err(Error::with_detail(
                ErrorKind::IncorrectNumberOfColumns,
                "data",
                format!(
                    "cannot merge moments of {} and {} columns",
                    self.columns, other.columns
                ),
            ));
        }
        if other.n == 0 {
            return Ok(self.clone());
        }
        if self.n == 0 {
            return Ok(other.clone());
        }

        let (na, nb) = (self.n as f64, other.n as f64);
        let delta: Vec<T> = other
            .mean()
            .iter()
            .zip(self.mean())
            .map(|(&b, a)| b - a)
            .collect();

        let mut merged = self.clone();
        merged.n = self.n + other.n;
        primitives.axpy(T::one(), &other.sum, &mut merged.sum);
        primitives.axpy(T::one(), &other.cross, &mut merged.cross);
        add_outer(primitives, &mut merged.cross, &delta, T::from_f64(na * nb / (na + nb)));
        Ok(merged)
    }

    /// Covariance (or correlation) matrix and mean
    pub fn finalize(&self, output: OutputMatrixType) -> Result<Finalized<T>> {
        if self.n < 2 {
            return Err(Error::with_detail(
                ErrorKind::NotEnoughObservations,
                "n_observations",
                format!("{} observation(s), at least 2 are required", self.n),
            ));
        }
        let p = self.columns;
        let denominator = T::from_f64((self.n - 1) as f64);
        let mut matrix: Vec<T> = self.cross.iter().map(|&c| c / denominator).collect();

        if output == OutputMatrixType::Correlation {
            let mut deviations = try_zeroed::<T>(p)?;
            for (i, d) in deviations.iter_mut().enumerate() {
                let variance = matrix[i * p + i];
                if variance <= T::zero() {
                    return Err(Error::with_detail(
                        ErrorKind::ZeroVarianceFeature,
                        "data",
                        format!("feature {i} has zero variance"),
                    ));
                }
                *d = variance.sqrt();
            }
            for i in 0..p {
                for j in 0..p {
                    matrix[i * p + j] = if i == j {
                        T::one()
                    } else {
                        matrix[i * p + j] / (deviations[i] * deviations[j])
                    };
                }
            }
        }

        if let Some(k) = matrix.iter().position(|v| !v.is_finite()) {
            return Err(Error::with_detail(
                ErrorKind::NonFiniteValue,
                "covariance",
                format!("entry ({}, {}) is not finite", k / p, k % p),
            ));
        }
        Ok(Finalized {
            columns: p,
            matrix,
            mean: self.mean(),
        })
    }

    pub fn to_partial(&self) -> Result<ArgumentCollection<'static, PartialId>> {
        let mut partial = ArgumentCollection::new(ArgumentRole::PartialResult);
        // counts stay exact beyond f32's integer range
        partial.set_table(
            PartialId::NObservations,
            HomogenNumericTable::from_vec(1, 1, vec![self.n as f64])?.into_shared(),
        );
        partial.set_table(
            PartialId::Sum,
            HomogenNumericTable::from_vec(1, self.columns, self.sum.clone())?.into_shared(),
        );
        partial.set_table(
            PartialId::CrossProduct,
            HomogenNumericTable::from_vec(self.columns, self.columns, self.cross.clone())?
                .into_shared(),
        );
        Ok(partial)
    }

    /// Read back a partial result; shapes are assumed checked
    pub fn from_partial(partial: &ArgumentCollection<'static, PartialId>) -> Result<Self> {
        let count = partial
            .table(PartialId::NObservations)?
            .read_all::<f64>()?
            .first()
            .copied()
            .unwrap_or(0.0);
        if !(count.is_finite() && count >= 0.0 && count.fract() == 0.0) {
            return Err(Error::with_detail(
                ErrorKind::IncorrectParameter,
                "n_observations",
                format!("{count} is not an observation count"),
            ));
        }
        let sum = partial.table(PartialId::Sum)?.read_all::<T>()?.into_vec();
        let cross = partial
            .table(PartialId::CrossProduct)?
            .read_all::<T>()?
            .into_vec();
        Ok(Self {
            n: count as usize,
            columns: sum.len(),
            sum,
            cross,
        })
    }
}

impl<T: FloatNumeric> Finalized<T> {
    pub fn into_result(self) -> Result<ArgumentCollection<'static, ResultId>> {
        let mut result = ArgumentCollection::new(ArgumentRole::Result);
        result.set_table(
            ResultId::Covariance,
            HomogenNumericTable::from_vec(self.columns, self.columns, self.matrix)?.into_shared(),
        );
        result.set_table(
            ResultId::Mean,
            HomogenNumericTable::from_vec(1, self.columns, self.mean)?.into_shared(),
        );
        Ok(result)
    }

    /// Overwrite pre-allocated result tables
    pub fn write_into(&self, result: &mut ArgumentCollection<'static, ResultId>) -> Result<()> {
        let p = self.columns;
        result
            .table_mut(ResultId::Covariance)?
            .write_from(0..p, 0..p, &self.matrix)?;
        result.table_mut(ResultId::Mean)?.write_from(0..1, 0..p, &self.mean)
    }
}

/// `matrix += scale * v v^T`
fn add_outer<T: FloatNumeric, P: ComputePrimitives<T>>(
    primitives: &P,
    matrix: &mut [T],
    v: &[T],
    scale: T,
) {
    let p = v.len();
    if p == 0 {
        return;
    }
    for (i, row) in matrix.chunks_exact_mut(p).enumerate() {
        let alpha = scale * v[i];
        if alpha != T::zero() {
            primitives.axpy(alpha, v, row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use numtab_core::ScalarBackend;

    const DATA: [f64; 8] = [1.0, 2.0, 2.0, 4.0, 3.0, 7.0, 4.0, 7.0];

    fn scalar() -> ScalarBackend {
        ScalarBackend::new()
    }

    #[test]
    fn test_single_block() {
        let moments = Moments::from_rows(&scalar(), &DATA[..], 2).unwrap();
        assert_eq!(moments.n, 4);
        assert_eq!(moments.sum, vec![10.0, 20.0]);
        assert_eq!(moments.mean(), vec![2.5, 5.0]);
        // centered x: -1.5 -0.5 0.5 1.5, centered y: -3 -1 2 2
        assert_relative_eq!(moments.cross[0], 5.0);
        assert_relative_eq!(moments.cross[1], 9.0);
        assert_relative_eq!(moments.cross[3], 18.0);
        assert_eq!(moments.cross[1], moments.cross[2]);
    }

    #[test]
    fn test_merge_matches_single_block() {
        let whole = Moments::from_rows(&scalar(), &DATA[..], 2).unwrap();
        let a = Moments::from_rows(&scalar(), &DATA[..2], 2).unwrap();
        let b = Moments::from_rows(&scalar(), &DATA[2..], 2).unwrap();
        let merged = a.merge(&scalar(), &b).unwrap();
        assert_eq!(merged.n, whole.n);
        for (&m, &w) in merged.cross.iter().zip(&whole.cross) {
            assert_relative_eq!(m, w, epsilon = 1e-12);
        }

        let empty = Moments::<f64>::empty(2).unwrap();
        assert_eq!(empty.merge(&scalar(), &whole).unwrap(), whole);
        assert_eq!(whole.merge(&scalar(), &empty).unwrap(), whole);

        let other = Moments::<f64>::empty(3).unwrap();
        assert_eq!(
            whole.merge(&scalar(), &other).unwrap_err().kind(),
            ErrorKind::IncorrectNumberOfColumns
        );
    }

    #[test]
    fn test_raw_cross_product_is_centered() {
        let raw: Vec<f64> = vec![30.0, 59.0, 59.0, 118.0];
        let moments = Moments::from_raw(&scalar(), 4, vec![10.0, 20.0], raw);
        assert_relative_eq!(moments.cross[0], 5.0, epsilon = 1e-12);
        assert_relative_eq!(moments.cross[1], 9.0, epsilon = 1e-12);
        assert_relative_eq!(moments.cross[3], 18.0, epsilon = 1e-12);
    }

    #[test]
    fn test_finalize() {
        let moments = Moments::from_rows(&scalar(), &DATA[..], 2).unwrap();
        let cov = moments.finalize(OutputMatrixType::Covariance).unwrap();
        assert_relative_eq!(cov.matrix[0], 5.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(cov.matrix[1], 3.0, epsilon = 1e-12);
        assert_eq!(cov.mean, vec![2.5, 5.0]);

        let corr = moments.finalize(OutputMatrixType::Correlation).unwrap();
        assert_eq!(corr.matrix[0], 1.0);
        assert_eq!(corr.matrix[3], 1.0);
        assert_relative_eq!(corr.matrix[1], 9.0 / (5.0f64 * 18.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_finalize_failures() {
        let one = Moments::from_rows(&scalar(), &DATA[..2], 2).unwrap();
        let err = one.finalize(OutputMatrixType::Covariance).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotEnoughObservations);

        let constant = Moments::from_rows(&scalar(), &[1.0, 5.0, 2.0, 5.0][..], 2).unwrap();
        assert!(constant.finalize(OutputMatrixType::Covariance).is_ok());
        let err = constant
            .finalize(OutputMatrixType::Correlation)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ZeroVarianceFeature);
        assert!(err.to_string().contains("feature 1"));
    }

    #[test]
    fn test_partial_tables() {
        let moments = Moments::from_rows(&scalar(), &DATA[..], 2).unwrap();
        let partial = moments.to_partial().unwrap();
        assert_eq!(partial.table(PartialId::CrossProduct).unwrap().rows(), 2);
        assert_eq!(Moments::<f64>::from_partial(&partial).unwrap(), moments);

        let mut broken = partial.clone();
        broken.set_table(
            PartialId::NObservations,
            HomogenNumericTable::from_vec(1, 1, vec![2.5]).unwrap().into_shared(),
        );
        assert_eq!(
            Moments::<f64>::from_partial(&broken).unwrap_err().kind(),
            ErrorKind::IncorrectParameter
        );
    }
}
