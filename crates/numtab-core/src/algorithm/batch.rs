use super::{BatchMode, ComputeState, Container};
use crate::arguments::{ArgumentCollection, ArgumentRole, Parameter};
use crate::dispatch::Dispatcher;
use crate::error::{Error, ErrorKind, Result, Status};
use crate::numeric::Precision;
use crate::table::TableRef;
use std::fmt;

/// Batch algorithm: the whole input in one `compute()`
pub struct Batch<'a, A: BatchMode> {
    container: Container<A>,
    parameter: A::Parameter,
    input: ArgumentCollection<'a, A::InputId>,
    result: Option<ArgumentCollection<'static, A::ResultId>>,
    state: ComputeState,
}

impl<'a, A: BatchMode> Batch<'a, A> {
    pub fn new(precision: Precision, method: A::Method) -> Result<Self> {
        Self::with_dispatcher(Dispatcher::global(), precision, method)
    }

    pub fn with_dispatcher(
        dispatcher: &Dispatcher,
        precision: Precision,
        method: A::Method,
    ) -> Result<Self> {
        Ok(Self::from_container(Container::with_dispatcher(
            dispatcher, precision, method,
        )?))
    }

    pub fn from_container(container: Container<A>) -> Self {
        Self {
            container,
            parameter: A::Parameter::default(),
            input: ArgumentCollection::new(ArgumentRole::Input),
            result: None,
            state: ComputeState::Uninitialized,
        }
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

    pub fn set_parameter(&mut self, parameter: A::Parameter) {
        self.parameter = parameter;
    }

    pub fn input(&self) -> &ArgumentCollection<'a, A::InputId> {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut ArgumentCollection<'a, A::InputId> {
        self.mark_configured();
        &mut self.input
    }

    pub fn set_input(&mut self, id: A::InputId, table: TableRef<'a>) {
        self.mark_configured();
        self.input.set_table(id, table);
    }

    fn mark_configured(&mut self) {
        if self.state == ComputeState::Uninitialized {
            self.state = ComputeState::Configured;
        }
    }

    pub fn state(&self) -> ComputeState {
        self.state
    }

    /// Parameter and input validation, without computing
    pub fn check(&self) -> Status {
        self.parameter.check()
            | A::check_input(&self.input, &self.parameter, self.container.method())
    }

    /// Validate, then compute a fresh result from the current inputs
    ///
    /// On failure the previous result, if any, is kept.
    pub fn compute(&mut self) -> Result<()> {
        self.check().into_result()?;
        let mut result =
            A::allocate_result(&self.input, &self.parameter, self.container.precision())?;
        A::compute(
            self.container.kernel(),
            &self.input,
            &self.parameter,
            &mut result,
        )?;
        self.result = Some(result);
        self.state = ComputeState::Computed;
        Ok(())
    }

    pub fn result(&self) -> Result<&ArgumentCollection<'static, A::ResultId>> {
        self.result
            .as_ref()
            .ok_or_else(|| Error::with_argument(ErrorKind::NullResult, A::NAME))
    }

    /// One table of the result
    pub fn result_table(&self, id: A::ResultId) -> Result<&TableRef<'static>> {
        self.result()?.table(id)
    }

    /// Hand the result over to the caller
    pub fn take_result(&mut self) -> Result<ArgumentCollection<'static, A::ResultId>> {
        let result = self
            .result
            .take()
            .ok_or_else(|| Error::with_argument(ErrorKind::NullResult, A::NAME))?;
        self.state = ComputeState::Configured;
        Ok(result)
    }
}

impl<A: BatchMode> fmt::Debug for Batch<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("container", &self.container)
            .field("parameter", &self.parameter)
            .field("input", &self.input)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
