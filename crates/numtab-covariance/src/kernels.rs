//! Covariance kernels using the primitives architecture
//!
//! Every kernel reduces a table to [`Moments`] in row blocks run through its
//! execution engine; blocks are merged in row order as they finish, so
//! results do not depend on the engine's thread count and only a window of
//! block moments is held at a time. [`CovarianceKernel`] is the object-safe
//! interface the registry hands out; it is implemented for every
//! [`MomentSource`].

use crate::moments::Moments;
use crate::types::{CovarianceParameter, PartialId, ResultId};
use numtab_core::alloc::{checked_len, try_zeroed};
use numtab_core::{
    ArgumentCollection, ComputePrimitives, Error, ErrorKind, ExecutionEngine, FloatNumeric,
    NumericTable, Result, TableExt,
};
use std::borrow::Cow;
use std::marker::PhantomData;
use std::ops::Range;
use tracing::debug;

/// Kernel interface stored in the covariance registry
pub trait CovarianceKernel: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Batch: moments of `data` finalized into pre-allocated result tables
    fn compute(
        &self,
        data: &dyn NumericTable,
        parameter: &CovarianceParameter,
        result: &mut ArgumentCollection<'static, ResultId>,
    ) -> Result<()>;

    fn compute_partial(
        &self,
        data: &dyn NumericTable,
        parameter: &CovarianceParameter,
    ) -> Result<ArgumentCollection<'static, PartialId>>;

    fn merge_partials(
        &self,
        accumulated: &ArgumentCollection<'static, PartialId>,
        next: &ArgumentCollection<'static, PartialId>,
    ) -> Result<ArgumentCollection<'static, PartialId>>;

    fn finalize(
        &self,
        partial: &ArgumentCollection<'static, PartialId>,
        parameter: &CovarianceParameter,
    ) -> Result<ArgumentCollection<'static, ResultId>>;
}

/// A way of reducing a table to moments in one precision
pub trait MomentSource: Send + Sync {
    type Float: FloatNumeric;
    type Primitives: ComputePrimitives<Self::Float>;

    fn primitives(&self) -> &Self::Primitives;

    fn moments(&self, data: &dyn NumericTable, block_size: usize)
        -> Result<Moments<Self::Float>>;
}

impl<S: MomentSource> CovarianceKernel for S {
    fn backend_name(&self) -> &'static str {
        self.primitives().backend_name()
    }

    fn compute(
        &self,
        data: &dyn NumericTable,
        parameter: &CovarianceParameter,
        result: &mut ArgumentCollection<'static, ResultId>,
    ) -> Result<()> {
        self.moments(data, parameter.block_size)?
            .finalize(parameter.output_matrix_type)?
            .write_into(result)
    }

    fn compute_partial(
        &self,
        data: &dyn NumericTable,
        parameter: &CovarianceParameter,
    ) -> Result<ArgumentCollection<'static, PartialId>> {
        self.moments(data, parameter.block_size)?.to_partial()
    }

    fn merge_partials(
        &self,
        accumulated: &ArgumentCollection<'static, PartialId>,
        next: &ArgumentCollection<'static, PartialId>,
    ) -> Result<ArgumentCollection<'static, PartialId>> {
        let a = Moments::<S::Float>::from_partial(accumulated)?;
        let b = Moments::<S::Float>::from_partial(next)?;
        a.merge(self.primitives(), &b)?.to_partial()
    }

    fn finalize(
        &self,
        partial: &ArgumentCollection<'static, PartialId>,
        parameter: &CovarianceParameter,
    ) -> Result<ArgumentCollection<'static, ResultId>> {
        Moments::<S::Float>::from_partial(partial)?
            .finalize(parameter.output_matrix_type)?
            .into_result()
    }
}

fn block_range(block: usize, block_size: usize, rows: usize) -> Range<usize> {
    let start = block * block_size;
    start..(start + block_size).min(rows)
}

/// Reduce `n_blocks` per-block moments through `engine`, merging in block order
fn fold_blocks<T, E, F>(engine: &E, columns: usize, n_blocks: usize, block: F) -> Result<Moments<T>>
where
    T: FloatNumeric,
    E: ExecutionEngine<T>,
    F: Fn(usize) -> Result<Moments<T>> + Sync + Send,
{
    let primitives = engine.primitives();
    engine.fold_batch(n_blocks, Moments::empty(columns)?, block, |total, next| {
        total.merge(primitives, &next)
    })
}

/// Dense method: any layout, read as row-major blocks of `T`
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

impl<T: FloatNumeric, E: ExecutionEngine<T>> MomentSource for DenseKernel<T, E> {
    type Float = T;
    type Primitives = E::Primitives;

    fn primitives(&self) -> &E::Primitives {
        self.engine.primitives()
    }

    fn moments(&self, data: &dyn NumericTable, block_size: usize) -> Result<Moments<T>> {
        let block_size = block_size.max(1);
        let (rows, columns) = (data.rows(), data.columns());
        let n_blocks = rows.div_ceil(block_size);
        debug!(
            rows,
            columns,
            n_blocks,
            threads = self.engine.num_threads(),
            backend = self.primitives().backend_name(),
            "dense covariance moments"
        );
        let primitives = self.engine.primitives();
        fold_blocks(&self.engine, columns, n_blocks, |b| {
            let block = data.read_rows::<T>(block_range(b, block_size, rows))?;
            Moments::from_rows(primitives, &block, columns)
        })
    }
}

/// CSR method: visits stored entries only
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

impl<T: FloatNumeric, E: ExecutionEngine<T>> MomentSource for CsrKernel<T, E> {
    type Float = T;
    type Primitives = E::Primitives;

    fn primitives(&self) -> &E::Primitives {
        self.engine.primitives()
    }

    fn moments(&self, data: &dyn NumericTable, block_size: usize) -> Result<Moments<T>> {
        let parts = data.csr().ok_or_else(|| {
            Error::with_detail(
                ErrorKind::IncorrectTypeOfInput,
                "data",
                format!("fast CSR method needs a CSR table, got {:?}", data.layout()),
            )
        })?;
        let values: Cow<'_, [T]> = match T::narrow(parts.values) {
            Some(values) => Cow::Borrowed(values),
            None => Cow::Owned(parts.values.to_vec()),
        };
        let block_size = block_size.max(1);
        let (rows, columns) = (parts.rows, parts.columns);
        let n_blocks = rows.div_ceil(block_size);
        debug!(
            rows,
            columns,
            nnz = parts.nnz(),
            n_blocks,
            threads = self.engine.num_threads(),
            "csr covariance moments"
        );

        let primitives = self.engine.primitives();
        let values = values.as_ref();
        fold_blocks(&self.engine, columns, n_blocks, |b| {
            let range = block_range(b, block_size, rows);
            let n = range.len();
            let mut sum = try_zeroed::<T>(columns)?;
            let mut raw = try_zeroed::<T>(checked_len(columns, columns)?)?;
            for r in range {
                let entries = parts.row_range(r);
                for i in entries.clone() {
                    let (ci, vi) = (parts.column(i), values[i]);
                    sum[ci] += vi;
                    for j in entries.clone() {
                        raw[ci * columns + parts.column(j)] += vi * values[j];
                    }
                }
            }
            Ok(Moments::from_raw(primitives, n, sum, raw))
        })
    }
}
