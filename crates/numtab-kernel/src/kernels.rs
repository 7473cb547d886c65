//! Kernel-function kernels using the primitives architecture
//!
//! Rows of X are processed in blocks of [`ROW_BLOCK`] through the execution
//! engine; each block yields its rows of the output, concatenated in order.

use crate::types::{KernelParameter, KernelType, ResultId};
use numtab_core::alloc::{checked_len, try_with_capacity};
use numtab_core::{
    ArgumentCollection, ComputePrimitives, CsrParts, Error, ErrorKind, ExecutionEngine,
    FloatNumeric, NumericTable, Result, TableExt,
};
use std::borrow::Cow;
use std::marker::PhantomData;
use std::ops::Range;
use tracing::debug;

/// Rows of X per engine task
pub const ROW_BLOCK: usize = 64;

/// Kernel interface stored in the kernel-function registry
pub trait PairwiseKernel: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Evaluate the kernel into the pre-allocated `Values` table
    fn compute(
        &self,
        x: &dyn NumericTable,
        y: &dyn NumericTable,
        parameter: &KernelParameter,
        result: &mut ArgumentCollection<'static, ResultId>,
    ) -> Result<()>;
}

/// Kernel function with coefficients converted to `T`
#[derive(Debug, Clone, Copy)]
pub enum Function<T> {
    Linear { k: T, b: T },
    /// `scale = -1 / (2 sigma^2)`
    Rbf { scale: T },
}

impl<T: FloatNumeric> Function<T> {
    pub fn new(kernel: KernelType) -> Self {
        match kernel {
            KernelType::Linear { k, b } => Self::Linear {
                k: T::from_f64(k),
                b: T::from_f64(b),
            },
            KernelType::Rbf { sigma } => Self::Rbf {
                scale: T::from_f64(-0.5 / (sigma * sigma)),
            },
        }
    }

    #[inline]
    pub fn dense<P: ComputePrimitives<T>>(&self, primitives: &P, x: &[T], y: &[T]) -> T {
        match *self {
            Self::Linear { k, b } => k * primitives.dot_product(x, y) + b,
            Self::Rbf { scale } => (scale * primitives.squared_distance(x, y)).exp(),
        }
    }

    #[inline]
    pub fn sparse(&self, x: SparseRow<'_, T>, y: SparseRow<'_, T>) -> T {
        match *self {
            Self::Linear { k, b } => k * x.dot(y) + b,
            Self::Rbf { scale } => (scale * x.squared_distance(y)).exp(),
        }
    }
}

/// CSR rows copied as zero-based `(column, value)` pairs
///
/// Columns are sorted within each row and repeated columns are summed, so any
/// valid CSR table can be merge-walked.
#[derive(Debug, Clone)]
pub struct SortedRows<T> {
    entries: Vec<(usize, T)>,
    offsets: Vec<usize>,
}

impl<T: FloatNumeric> SortedRows<T> {
    /// Copy rows `rows` of a CSR table whose values are `values`
    pub fn new(parts: &CsrParts<'_>, values: &[T], rows: Range<usize>) -> Result<Self> {
        let nnz = parts.row_offsets[rows.end] - parts.row_offsets[rows.start];
        let mut entries = try_with_capacity(nnz)?;
        let mut offsets = try_with_capacity(rows.len() + 1)?;
        offsets.push(0);
        for r in rows {
            let start = entries.len();
            entries.extend(parts.row_range(r).map(|k| (parts.column(k), values[k])));
            if !entries[start..].windows(2).all(|w| w[0].0 < w[1].0) {
                entries[start..].sort_unstable_by_key(|e| e.0);
                let mut kept = start;
                for k in start..entries.len() {
                    if kept > start && entries[kept - 1].0 == entries[k].0 {
                        let value = entries[k].1;
                        entries[kept - 1].1 += value;
                    } else {
                        entries[kept] = entries[k];
                        kept += 1;
                    }
                }
                entries.truncate(kept);
            }
            offsets.push(entries.len());
        }
        Ok(Self { entries, offsets })
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row `local` counted from the first copied row
    pub fn row(&self, local: usize) -> SparseRow<'_, T> {
        SparseRow {
            entries: &self.entries[self.offsets[local]..self.offsets[local + 1]],
        }
    }
}

/// One CSR row: zero-based columns in increasing order with their values
#[derive(Debug, Clone, Copy)]
pub struct SparseRow<'a, T> {
    entries: &'a [(usize, T)],
}

impl<'a, T: FloatNumeric> SparseRow<'a, T> {
    /// Sum over the columns both rows store
    pub fn dot(self, other: Self) -> T {
        let mut acc = T::zero();
        self.walk(other, |a, b| {
            if let (Some(a), Some(b)) = (a, b) {
                acc += a * b;
            }
        });
        acc
    }

    /// Sum of squared differences over the union of stored columns
    pub fn squared_distance(self, other: Self) -> T {
        let mut acc = T::zero();
        self.walk(other, |a, b| {
            let d = a.unwrap_or_else(T::zero) - b.unwrap_or_else(T::zero);
            acc += d * d;
        });
        acc
    }

    /// Visit the union of stored columns in order
    fn walk(self, other: Self, mut f: impl FnMut(Option<T>, Option<T>)) {
        let (a, b) = (self.entries, other.entries);
        let (mut i, mut j) = (0, 0);
        while i < a.len() || j < b.len() {
            match (a.get(i), b.get(j)) {
                (Some(x), Some(y)) if x.0 == y.0 => {
                    f(Some(x.1), Some(y.1));
                    i += 1;
                    j += 1;
                }
                (Some(x), Some(y)) if x.0 < y.0 => {
                    f(Some(x.1), None);
                    i += 1;
                }
                (Some(x), None) => {
                    f(Some(x.1), None);
                    i += 1;
                }
                (_, Some(y)) => {
                    f(None, Some(y.1));
                    j += 1;
                }
                (None, None) => break,
            }
        }
    }
}

fn block_ranges(rows: &Range<usize>) -> Vec<Range<usize>> {
    (rows.start..rows.end)
        .step_by(ROW_BLOCK)
        .map(|start| start..(start + ROW_BLOCK).min(rows.end))
        .collect()
}

/// Concatenate per-block outputs and write them into the `Values` table
fn write_values<T: FloatNumeric>(
    blocks: Vec<Result<Vec<T>>>,
    rows: usize,
    columns: usize,
    result: &mut ArgumentCollection<'static, ResultId>,
) -> Result<()> {
    let mut values = try_with_capacity(checked_len(rows, columns)?)?;
    for block in blocks {
        values.extend(block?);
    }
    result
        .table_mut(ResultId::Values)?
        .write_from(0..rows, 0..columns, &values)
}

/// Dense method: any layout, rows read as `T`
#[derive(Clone, Debug)]
pub struct DenseKernel<T: FloatNumeric, E: ExecutionEngine<T>> {
    engine: E,
    _phantom: PhantomData<T>,
}

impl<T: FloatNumeric, E: ExecutionEngine<T>> DenseKernel<T, E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            _phantom: PhantomData,
        }
    }
}

impl<T: FloatNumeric, E: ExecutionEngine<T>> PairwiseKernel for DenseKernel<T, E> {
    fn backend_name(&self) -> &'static str {
        self.engine.primitives().backend_name()
    }

    fn compute(
        &self,
        x: &dyn NumericTable,
        y: &dyn NumericTable,
        parameter: &KernelParameter,
        result: &mut ArgumentCollection<'static, ResultId>,
    ) -> Result<()> {
        let (rows_x, rows_y) = parameter.computation_mode.row_ranges(x.rows(), y.rows());
        let p = x.columns();
        let function = Function::<T>::new(parameter.kernel);
        let primitives = self.engine.primitives();
        debug!(
            rows_x = rows_x.len(),
            rows_y = rows_y.len(),
            columns = p,
            backend = primitives.backend_name(),
            "dense kernel function"
        );

        let y_block = y.read_rows::<T>(rows_y.clone())?;
        let n_y = rows_y.len();
        let blocks = block_ranges(&rows_x);
        let outputs = self.engine.execute_batch(blocks.len(), |b| -> Result<Vec<T>> {
            let x_block = x.read_rows::<T>(blocks[b].clone())?;
            let mut out = try_with_capacity(checked_len(blocks[b].len(), n_y)?)?;
            for x_row in x_block.chunks_exact(p.max(1)) {
                for y_row in y_block.chunks_exact(p.max(1)) {
                    out.push(function.dense(primitives, x_row, y_row));
                }
            }
            Ok(out)
        });
        write_values(outputs, rows_x.len(), n_y, result)
    }
}

/// CSR method: both operands CSR, merge-walking sorted copies of their rows
#[derive(Clone, Debug)]
pub struct CsrKernel<T: FloatNumeric, E: ExecutionEngine<T>> {
    engine: E,
    _phantom: PhantomData<T>,
}

impl<T: FloatNumeric, E: ExecutionEngine<T>> CsrKernel<T, E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            _phantom: PhantomData,
        }
    }
}

fn csr_parts<'t>(table: &'t dyn NumericTable, name: &str) -> Result<CsrParts<'t>> {
    table.csr().ok_or_else(|| {
        Error::with_detail(
            ErrorKind::IncorrectTypeOfInput,
            name,
            format!("fast CSR method needs a CSR table, got {:?}", table.layout()),
        )
    })
}

fn csr_values<'t, T: FloatNumeric>(parts: &CsrParts<'t>) -> Cow<'t, [T]> {
    match T::narrow(parts.values) {
        Some(values) => Cow::Borrowed(values),
        None => Cow::Owned(parts.values.to_vec()),
    }
}

impl<T: FloatNumeric, E: ExecutionEngine<T>> PairwiseKernel for CsrKernel<T, E> {
    fn backend_name(&self) -> &'static str {
        self.engine.primitives().backend_name()
    }

    fn compute(
        &self,
        x: &dyn NumericTable,
        y: &dyn NumericTable,
        parameter: &KernelParameter,
        result: &mut ArgumentCollection<'static, ResultId>,
    ) -> Result<()> {
        let x_parts = csr_parts(x, "x")?;
        let y_parts = csr_parts(y, "y")?;
        let x_values = csr_values::<T>(&x_parts);
        let y_values = csr_values::<T>(&y_parts);
        let (x_values, y_values) = (x_values.as_ref(), y_values.as_ref());

        let (rows_x, rows_y) = parameter.computation_mode.row_ranges(x.rows(), y.rows());
        let function = Function::<T>::new(parameter.kernel);
        debug!(
            rows_x = rows_x.len(),
            rows_y = rows_y.len(),
            nnz_x = x_parts.nnz(),
            nnz_y = y_parts.nnz(),
            "csr kernel function"
        );

        let n_y = rows_y.len();
        let y_rows = SortedRows::new(&y_parts, y_values, rows_y)?;
        let blocks = block_ranges(&rows_x);
        let outputs = self.engine.execute_batch(blocks.len(), |b| -> Result<Vec<T>> {
            let x_rows = SortedRows::new(&x_parts, x_values, blocks[b].clone())?;
            let mut out = try_with_capacity(checked_len(x_rows.len(), n_y)?)?;
            for i in 0..x_rows.len() {
                for j in 0..n_y {
                    out.push(function.sparse(x_rows.row(i), y_rows.row(j)));
                }
            }
            Ok(out)
        });
        write_values(outputs, rows_x.len(), n_y, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use numtab_core::{CsrNumericTable, HomogenNumericTable, IndexBase};

    #[test]
    fn test_sparse_row_walk() {
        let values = vec![1.0, 0.0, 2.0, 0.0, 0.0, 3.0, 4.0, 0.0];
        let dense = HomogenNumericTable::from_vec(2, 4, values).unwrap();
        let csr = CsrNumericTable::<f64>::from_dense(&dense, IndexBase::One).unwrap();
        let parts = csr.csr().unwrap();
        let stored = parts.values_as::<f64>().unwrap();
        let rows = SortedRows::new(&parts, stored, 0..2).unwrap();
        let (a, b) = (rows.row(0), rows.row(1));

        // [1 0 2 0] . [0 3 4 0]
        assert_eq!(a.dot(b), 8.0);
        assert_eq!(a.squared_distance(b), 1.0 + 9.0 + 4.0);
        assert_eq!(a.squared_distance(a), 0.0);
    }

    #[test]
    fn test_sorted_rows_from_unordered_indices() {
        // row 0: columns 3, 0, 3 (repeat adds up); row 1: columns 2, 1
        let csr = CsrNumericTable::<f64>::new(
            2,
            4,
            vec![1.0, 2.0, 4.0, 3.0, 5.0],
            vec![3, 0, 3, 2, 1],
            vec![0, 3, 5],
            IndexBase::Zero,
        )
        .unwrap();
        let parts = csr.csr().unwrap();
        let stored = parts.values_as::<f64>().unwrap();
        let rows = SortedRows::new(&parts, stored, 0..2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.row(0).entries, &[(0, 2.0), (3, 5.0)]);
        assert_eq!(rows.row(1).entries, &[(1, 5.0), (2, 3.0)]);

        // [2 0 0 5] and [0 5 3 0]
        assert_eq!(rows.row(0).dot(rows.row(1)), 0.0);
        assert_eq!(rows.row(0).squared_distance(rows.row(1)), 4.0 + 25.0 + 9.0 + 25.0);

        let tail = SortedRows::new(&parts, stored, 1..2).unwrap();
        assert_eq!(tail.row(0).entries, rows.row(1).entries);
    }

    #[test]
    fn test_function_values() {
        let backend = numtab_core::ScalarBackend::new();
        let x: &[f64] = &[1.0, 2.0];
        let y: &[f64] = &[3.0, 0.0];
        let linear = Function::<f64>::new(KernelType::Linear { k: 2.0, b: 1.0 });
        assert_eq!(linear.dense(&backend, x, y), 7.0);
        let rbf = Function::<f64>::new(KernelType::Rbf { sigma: 2.0 });
        assert_relative_eq!(rbf.dense(&backend, x, y), (-8.0f64 / 8.0).exp());
    }

    #[test]
    fn test_oversized_output_fails_cleanly() {
        let mut result = ArgumentCollection::new(numtab_core::ArgumentRole::Result);
        let err = write_values::<f64>(Vec::new(), usize::MAX, 2, &mut result).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MemoryAllocationFailed);

        let err = write_values::<f64>(Vec::new(), usize::MAX / 4, 1, &mut result).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MemoryAllocationFailed);
    }

    #[test]
    fn test_block_ranges_cover_rows() {
        let blocks = block_ranges(&(3..3 + 2 * ROW_BLOCK + 1));
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], 3..3 + ROW_BLOCK);
        assert_eq!(blocks[2].len(), 1);
        assert!(block_ranges(&(0..0)).is_empty());
    }
}
