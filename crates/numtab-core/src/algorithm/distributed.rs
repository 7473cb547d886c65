//! Distributed computation steps
//!
//! `Step1Local` runs on every worker and produces a partial result from the
//! worker's share of the data. `Step2Master` collects those partial results,
//! merges them in the order they were added and finalizes. Moving partial
//! results between processes is up to the caller, typically through
//! [`CollectionSnapshot`](crate::arguments::CollectionSnapshot).

use super::{finalize_partial, ComputeState, Container, PartialMode};
use crate::arguments::{ArgumentCollection, ArgumentRole, Parameter};
use crate::dispatch::Dispatcher;
use crate::error::{Error, ErrorKind, Result, Status};
use crate::numeric::Precision;
use crate::table::TableRef;
use std::fmt;

/// Per-worker step: local data to partial result
pub struct DistributedStep1Local<'a, A: PartialMode> {
    container: Container<A>,
    parameter: A::Parameter,
    input: ArgumentCollection<'a, A::InputId>,
    partial: Option<ArgumentCollection<'static, A::PartialId>>,
    state: ComputeState,
}

impl<'a, A: PartialMode> DistributedStep1Local<'a, A> {
    pub fn new(precision: Precision, method: A::Method) -> Result<Self> {
        Self::with_dispatcher(Dispatcher::global(), precision, method)
    }

    pub fn with_dispatcher(
        dispatcher: &Dispatcher,
        precision: Precision,
        method: A::Method,
    ) -> Result<Self> {
        Ok(Self {
            container: Container::with_dispatcher(dispatcher, precision, method)?,
            parameter: A::Parameter::default(),
            input: ArgumentCollection::new(ArgumentRole::Input),
            partial: None,
            state: ComputeState::Uninitialized,
        })
    }

    pub fn with_parameter(mut self, parameter: A::Parameter) -> Self {
        self.parameter = parameter;
        self
    }

    pub fn parameter(&self) -> &A::Parameter {
        &self.parameter
    }

    pub fn input_mut(&mut self) -> &mut ArgumentCollection<'a, A::InputId> {
        if self.state == ComputeState::Uninitialized {
            self.state = ComputeState::Configured;
        }
        &mut self.input
    }

    pub fn set_input(&mut self, id: A::InputId, table: TableRef<'a>) {
        self.input_mut().set_table(id, table);
    }

    pub fn state(&self) -> ComputeState {
        self.state
    }

    pub fn check(&self) -> Status {
        self.parameter.check()
            | A::check_input(&self.input, &self.parameter, self.container.method())
    }

    pub fn compute(&mut self) -> Result<()> {
        self.check().into_result()?;
        let partial = A::compute_partial(self.container.kernel(), &self.input, &self.parameter)?;
        self.partial = Some(partial);
        self.state = ComputeState::PartiallyComputed;
        Ok(())
    }

    pub fn partial_result(&self) -> Result<&ArgumentCollection<'static, A::PartialId>> {
        self.partial
            .as_ref()
            .ok_or_else(|| Error::with_argument(ErrorKind::NullPartialResult, A::NAME))
    }

    /// Hand the partial result over for shipping to the master
    pub fn take_partial_result(&mut self) -> Result<ArgumentCollection<'static, A::PartialId>> {
        let partial = self
            .partial
            .take()
            .ok_or_else(|| Error::with_argument(ErrorKind::NullPartialResult, A::NAME))?;
        self.state = ComputeState::Configured;
        Ok(partial)
    }
}

/// Master step: merge worker partial results, then finalize
pub struct DistributedStep2Master<A: PartialMode> {
    container: Container<A>,
    parameter: A::Parameter,
    pending: Vec<ArgumentCollection<'static, A::PartialId>>,
    partial: Option<ArgumentCollection<'static, A::PartialId>>,
    result: Option<ArgumentCollection<'static, A::ResultId>>,
    stale: bool,
    state: ComputeState,
}

impl<A: PartialMode> DistributedStep2Master<A> {
    pub fn new(precision: Precision, method: A::Method) -> Result<Self> {
        Self::with_dispatcher(Dispatcher::global(), precision, method)
    }

    pub fn with_dispatcher(
        dispatcher: &Dispatcher,
        precision: Precision,
        method: A::Method,
    ) -> Result<Self> {
        Ok(Self {
            container: Container::with_dispatcher(dispatcher, precision, method)?,
            parameter: A::Parameter::default(),
            pending: Vec::new(),
            partial: None,
            result: None,
            stale: false,
            state: ComputeState::Uninitialized,
        })
    }

    pub fn with_parameter(mut self, parameter: A::Parameter) -> Self {
        self.parameter = parameter;
        self
    }

    pub fn parameter(&self) -> &A::Parameter {
        &self.parameter
    }

    /// Queue a worker's partial result for the next `compute()`
    pub fn add_partial(&mut self, partial: ArgumentCollection<'static, A::PartialId>) {
        self.pending.push(partial);
        if self.state == ComputeState::Uninitialized {
            self.state = ComputeState::Configured;
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Validation of every queued partial result
    pub fn check(&self) -> Status {
        let mut status = self.parameter.check();
        if self.pending.is_empty() {
            status |= Status::from(Error::with_detail(
                ErrorKind::NullPartialResult,
                "partials",
                "no partial results were added",
            ));
        }
        for partial in &self.pending {
            status |= A::check_partial(partial, &self.parameter);
        }
        status
    }

    /// Merge queued partial results, in order, into the accumulated one
    pub fn compute(&mut self) -> Result<()> {
        self.check().into_result()?;
        let kernel = self.container.kernel();
        let mut accumulated = self.partial.clone();
        for next in &self.pending {
            accumulated = Some(match accumulated {
                Some(acc) => A::merge_partials(kernel, &acc, next, &self.parameter)?,
                None => next.clone(),
            });
        }
        self.partial = accumulated;
        self.pending.clear();
        self.stale = true;
        self.state = ComputeState::PartiallyComputed;
        Ok(())
    }

    pub fn finalize_compute(&mut self) -> Result<()> {
        finalize_partial(
            &self.container,
            self.partial.as_ref(),
            &self.parameter,
            &mut self.result,
            &mut self.stale,
        )?;
        self.state = ComputeState::Finalized;
        Ok(())
    }

    pub fn partial_result(&self) -> Result<&ArgumentCollection<'static, A::PartialId>> {
        self.partial
            .as_ref()
            .ok_or_else(|| Error::with_argument(ErrorKind::NullPartialResult, A::NAME))
    }

    pub fn result(&self) -> Result<&ArgumentCollection<'static, A::ResultId>> {
        self.result
            .as_ref()
            .ok_or_else(|| Error::with_argument(ErrorKind::NullResult, A::NAME))
    }

    pub fn result_table(&self, id: A::ResultId) -> Result<&TableRef<'static>> {
        self.result()?.table(id)
    }

    pub fn state(&self) -> ComputeState {
        self.state
    }
}

impl<A: PartialMode> fmt::Debug for DistributedStep1Local<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedStep1Local")
            .field("container", &self.container)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<A: PartialMode> fmt::Debug for DistributedStep2Master<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedStep2Master")
            .field("container", &self.container)
            .field("pending", &self.pending.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::testing::{
        parameter, table, ColumnSums, SumInput, SumMethod, SumPartial, SumResult,
    };
    use crate::arguments::CollectionSnapshot;
    use crate::dispatch::CpuTier;
    use crate::table::{HomogenNumericTable, TableExt};

    fn local(rows: usize, values: Vec<f64>) -> ArgumentCollection<'static, SumPartial> {
        let mut step = DistributedStep1Local::<ColumnSums>::with_dispatcher(
            &Dispatcher::fixed(CpuTier::Baseline),
            Precision::F64,
            SumMethod::Dense,
        )
        .unwrap()
        .with_parameter(parameter());
        assert!(step.partial_result().is_err());
        step.set_input(SumInput::Data, table(rows, values));
        step.compute().unwrap();
        step.take_partial_result().unwrap()
    }

    fn master() -> DistributedStep2Master<ColumnSums> {
        DistributedStep2Master::with_dispatcher(
            &Dispatcher::fixed(CpuTier::Baseline),
            Precision::F64,
            SumMethod::Dense,
        )
        .unwrap()
        .with_parameter(parameter())
    }

    #[test]
    fn test_steps_match_single_pass() {
        let mut master = master();
        for (rows, values) in [(1, vec![1.0, 2.0]), (2, vec![3.0, 4.0, 5.0, 6.0])] {
            // partial results cross a serialization boundary
            let json = local(rows, values).snapshot().unwrap().to_json().unwrap();
            let partial = CollectionSnapshot::from_json(&json)
                .unwrap()
                .restore::<SumPartial>()
                .unwrap();
            master.add_partial(partial);
        }
        assert_eq!(master.pending(), 2);
        master.compute().unwrap();
        assert_eq!(master.pending(), 0);
        master.finalize_compute().unwrap();
        let sums = master
            .result_table(SumResult::Sums)
            .unwrap()
            .read_all::<f64>()
            .unwrap()
            .into_vec();
        assert_eq!(sums, vec![9.0, 12.0]);
    }

    #[test]
    fn test_master_without_partials() {
        let mut master = master();
        let err = master.compute().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NullPartialResult);
        assert_eq!(err.argument(), Some("partials"));
        assert_eq!(
            master.finalize_compute().unwrap_err().kind(),
            ErrorKind::NullPartialResult
        );
    }

    #[test]
    fn test_bad_partial_rejected_atomically() {
        let mut master = master();
        master.add_partial(local(1, vec![1.0]));
        master.compute().unwrap();

        let mut broken = ArgumentCollection::new(ArgumentRole::PartialResult);
        broken.set_table(
            SumPartial::Sums,
            HomogenNumericTable::<f64>::allocated(2, 1).unwrap().into_shared(),
        );
        master.add_partial(local(1, vec![2.0]));
        master.add_partial(broken);
        let err = master.compute().unwrap_err();
        let status = err.status().unwrap();
        assert!(status.contains(ErrorKind::IncorrectNumberOfRows));
        assert!(status.contains(ErrorKind::NullPartialResult));
        assert_eq!(master.pending(), 2);

        let count = master
            .partial_result()
            .unwrap()
            .table(SumPartial::Count)
            .unwrap()
            .read_all::<f64>()
            .unwrap()
            .into_vec();
        assert_eq!(count, vec![1.0]);
    }
}
