use super::{finalize_partial, ComputeState, Container, PartialMode};
use crate::arguments::{ArgumentCollection, ArgumentRole, Parameter};
use crate::dispatch::Dispatcher;
use crate::error::{Error, ErrorKind, Result, Status};
use crate::numeric::Precision;
use crate::table::TableRef;
use std::fmt;

/// Online algorithm: inputs arrive in chunks
///
/// Each `compute()` folds the current input chunk into the retained partial
/// result without revisiting earlier chunks. `finalize_compute()` reduces the
/// partial result into the final result.
pub struct Online<'a, A: PartialMode> {
    container: Container<A>,
    parameter: A::Parameter,
    input: ArgumentCollection<'a, A::InputId>,
    partial: Option<ArgumentCollection<'static, A::PartialId>>,
    result: Option<ArgumentCollection<'static, A::ResultId>>,
    /// chunks were folded in after the last finalization
    stale: bool,
    chunks: usize,
    state: ComputeState,
}

impl<'a, A: PartialMode> Online<'a, A> {
    pub fn new(precision: Precision, method: A::Method) -> Result<Self> {
        Self::with_dispatcher(Dispatcher::global(), precision, method)
    }

    pub fn with_dispatcher(
        dispatcher: &Dispatcher,
        precision: Precision,
        method: A::Method,
    ) -> Result<Self> {
        let container = Container::with_dispatcher(dispatcher, precision, method)?;
        Ok(Self {
            container,
            parameter: A::Parameter::default(),
            input: ArgumentCollection::new(ArgumentRole::Input),
            partial: None,
            result: None,
            stale: false,
            chunks: 0,
            state: ComputeState::Uninitialized,
        })
    }

    pub fn with_parameter(mut self, parameter: A::Parameter) -> Self {
        self.parameter = parameter;
        self
    }

    pub fn container(&self) -> &Container<A> {
        &self.container
    }

    pub fn parameter(&self) -> &A::Parameter {
        &self.parameter
    }

    pub fn parameter_mut(&mut self) -> &mut A::Parameter {
        &mut self.parameter
    }

    pub fn input_mut(&mut self) -> &mut ArgumentCollection<'a, A::InputId> {
        if self.state == ComputeState::Uninitialized {
            self.state = ComputeState::Configured;
        }
        &mut self.input
    }

    /// Provide the next chunk
    pub fn set_input(&mut self, id: A::InputId, table: TableRef<'a>) {
        self.input_mut().set_table(id, table);
    }

    pub fn state(&self) -> ComputeState {
        self.state
    }

    /// Number of chunks folded in so far
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn check(&self) -> Status {
        self.parameter.check()
            | A::check_input(&self.input, &self.parameter, self.container.method())
    }

    /// Fold the current chunk into the partial result
    pub fn compute(&mut self) -> Result<()> {
        self.check().into_result()?;
        let kernel = self.container.kernel();
        let chunk = A::compute_partial(kernel, &self.input, &self.parameter)?;
        let partial = match &self.partial {
            Some(accumulated) => A::merge_partials(kernel, accumulated, &chunk, &self.parameter)?,
            None => chunk,
        };
        self.partial = Some(partial);
        self.chunks += 1;
        self.stale = true;
        self.state = ComputeState::PartiallyComputed;
        Ok(())
    }

    /// Reduce the partial result; repeating without new chunks is a no-op
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

    /// Drop accumulated state and start over
    pub fn reset(&mut self) {
        self.partial = None;
        self.result = None;
        self.stale = false;
        self.chunks = 0;
        self.state = ComputeState::Configured;
    }
}

impl<A: PartialMode> fmt::Debug for Online<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Online")
            .field("container", &self.container)
            .field("parameter", &self.parameter)
            .field("chunks", &self.chunks)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
