//! Execution engines for controlling computation strategy
//!
//! An engine pairs the compute primitives of one backend with an execution
//! strategy (sequential or rayon-parallel). Kernels split their work into
//! blocks and run them through [`ExecutionEngine::execute_batch`] or
//! [`ExecutionEngine::fold_batch`]. Per-block results are combined in block
//! order, so the result does not depend on the strategy or the thread count.

use crate::error::Result;
use crate::numeric::FloatNumeric;
use crate::primitives::{ComputePrimitives, ScalarBackend};
use std::marker::PhantomData;

/// Trait for execution engines that control how computations are performed
pub trait ExecutionEngine<T: FloatNumeric>: Clone + Send + Sync {
    /// The type of primitives used by this engine
    type Primitives: ComputePrimitives<T>;

    /// Get the primitives for low-level operations
    fn primitives(&self) -> &Self::Primitives;

    /// Run `f(0..count)`; results are in index order
    fn execute_batch<F, R>(&self, count: usize, f: F) -> Vec<R>
    where
        F: Fn(usize) -> R + Sync + Send,
        R: Send;

    /// Fold `f(0..count)` into `init` with `merge`, in index order
    ///
    /// At most [`num_threads`](Self::num_threads) block results are alive
    /// at once. The first error from `f` or `merge` stops the fold.
    fn fold_batch<A, F, R, M>(&self, count: usize, init: A, f: F, merge: M) -> Result<A>
    where
        F: Fn(usize) -> Result<R> + Sync + Send,
        R: Send,
        M: FnMut(A, R) -> Result<A>;

    /// Blocks this engine runs at the same time
    fn num_threads(&self) -> usize;
}

/// Sequential execution engine
///
/// Executes all operations sequentially in the current thread.
#[derive(Clone, Debug)]
pub struct SequentialEngine<T: FloatNumeric, P: ComputePrimitives<T>> {
    primitives: P,
    _phantom: PhantomData<T>,
}

impl<T: FloatNumeric, P: ComputePrimitives<T>> SequentialEngine<T, P> {
    /// Create a new sequential engine with the given primitives
    pub fn new(primitives: P) -> Self {
        Self {
            primitives,
            _phantom: PhantomData,
        }
    }
}

impl<T: FloatNumeric, P: ComputePrimitives<T>> ExecutionEngine<T> for SequentialEngine<T, P> {
    type Primitives = P;

    fn primitives(&self) -> &Self::Primitives {
        &self.primitives
    }

    fn execute_batch<F, R>(&self, count: usize, f: F) -> Vec<R>
    where
        F: Fn(usize) -> R + Sync + Send,
        R: Send,
    {
        (0..count).map(f).collect()
    }

    fn fold_batch<A, F, R, M>(&self, count: usize, init: A, f: F, mut merge: M) -> Result<A>
    where
        F: Fn(usize) -> Result<R> + Sync + Send,
        R: Send,
        M: FnMut(A, R) -> Result<A>,
    {
        (0..count).try_fold(init, |acc, i| merge(acc, f(i)?))
    }

    fn num_threads(&self) -> usize {
        1
    }
}

/// Parallel execution engine using Rayon
#[cfg(feature = "parallel")]
#[derive(Clone, Debug)]
pub struct ParallelEngine<T: FloatNumeric, P: ComputePrimitives<T>> {
    primitives: P,
    _phantom: PhantomData<T>,
}

#[cfg(feature = "parallel")]
impl<T: FloatNumeric, P: ComputePrimitives<T>> ParallelEngine<T, P> {
    /// Create a new parallel engine on the global rayon pool
    pub fn new(primitives: P) -> Self {
        Self {
            primitives,
            _phantom: PhantomData,
        }
    }
}

#[cfg(feature = "parallel")]
impl<T: FloatNumeric, P: ComputePrimitives<T>> ExecutionEngine<T> for ParallelEngine<T, P> {
    type Primitives = P;

    fn primitives(&self) -> &Self::Primitives {
        &self.primitives
    }

    fn execute_batch<F, R>(&self, count: usize, f: F) -> Vec<R>
    where
        F: Fn(usize) -> R + Sync + Send,
        R: Send,
    {
        use rayon::prelude::*;

        (0..count).into_par_iter().map(f).collect()
    }

    fn fold_batch<A, F, R, M>(&self, count: usize, init: A, f: F, mut merge: M) -> Result<A>
    where
        F: Fn(usize) -> Result<R> + Sync + Send,
        R: Send,
        M: FnMut(A, R) -> Result<A>,
    {
        use rayon::prelude::*;

        // one window of blocks per round, merged before the next starts
        let window = self.num_threads().max(1);
        let mut acc = init;
        for start in (0..count).step_by(window) {
            let end = (start + window).min(count);
            let blocks: Vec<Result<R>> = (start..end).into_par_iter().map(&f).collect();
            for block in blocks {
                acc = merge(acc, block?)?;
            }
        }
        Ok(acc)
    }

    fn num_threads(&self) -> usize {
        rayon::current_num_threads()
    }
}

/// Engine kernels use unless told otherwise: parallel when built with it
#[cfg(feature = "parallel")]
pub type DefaultEngine<T, P> = ParallelEngine<T, P>;

#[cfg(not(feature = "parallel"))]
pub type DefaultEngine<T, P> = SequentialEngine<T, P>;

pub fn default_engine<T: FloatNumeric, P: ComputePrimitives<T>>(primitives: P) -> DefaultEngine<T, P> {
    DefaultEngine::new(primitives)
}

/// Create a sequential scalar engine
pub fn scalar_sequential<T: FloatNumeric>() -> SequentialEngine<T, ScalarBackend> {
    SequentialEngine::new(ScalarBackend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use std::cell::Cell;

    #[test]
    fn test_sequential_engine() {
        let engine = scalar_sequential::<f64>();
        assert_eq!(engine.num_threads(), 1);

        let squares = engine.execute_batch(5, |i| i * i);
        assert_eq!(squares, vec![0, 1, 4, 9, 16]);

        let order = engine
            .fold_batch(4, Vec::new(), |i| Ok(i), |mut acc, i| {
                acc.push(i);
                Ok(acc)
            })
            .unwrap();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_fold_stops_at_first_error() {
        let engine = scalar_sequential::<f64>();
        let merged = Cell::new(0);
        let err = engine
            .fold_batch(
                10,
                (),
                |i| {
                    if i == 3 {
                        Err(Error::from(ErrorKind::Internal))
                    } else {
                        Ok(i)
                    }
                },
                |(), _| {
                    merged.set(merged.get() + 1);
                    Ok(())
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(merged.get(), 3);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_engine_keeps_order() {
        let engine = ParallelEngine::<f64, _>::new(ScalarBackend);
        assert!(engine.num_threads() > 0);

        let indices = engine.execute_batch(64, |i| i);
        assert_eq!(indices, (0..64).collect::<Vec<_>>());

        let order = engine
            .fold_batch(100, Vec::new(), |i| Ok(i), |mut acc, i| {
                acc.push(i);
                Ok(acc)
            })
            .unwrap();
        assert_eq!(order, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_default_engine() {
        let engine = default_engine::<f32, _>(ScalarBackend);
        let blocks = engine.execute_batch(3, |i| i as f32);
        assert_eq!(blocks, vec![0.0, 1.0, 2.0]);
    }
}
