//! Chain execution.
//!
//! Each step takes a [`Flow`] and returns one. Once a step turns the flow
//! into [`Flow::SkipRow`], every later step passes it through untouched, so a
//! skip can never be overwritten by a later success. A rejection under the
//! `raise` policy leaves the chain as an `Err`.

use crate::error::{TransformError, TransformResult};
use crate::models::{Record, Value};

use super::{Builder, OnError, Transform};

/// Intermediate state of a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Ok(Value),
    /// A step with the `skip-row` policy rejected the value.
    SkipRow(TransformError),
}

impl Flow {
    /// Turn a step's result into a flow according to its policy.
    fn from_result(result: TransformResult<Value>, on_error: OnError) -> TransformResult<Flow> {
        match result {
            Ok(value) => Ok(Flow::Ok(value)),
            Err(err) => match on_error {
                OnError::Raise => Err(err),
                OnError::SkipRow => Ok(Flow::SkipRow(err)),
            },
        }
    }
}

// =============================================================================
// Steps
// =============================================================================

/// A transform paired with its error policy.
#[derive(Debug)]
pub struct Step {
    transform: Box<dyn Transform>,
    on_error: OnError,
}

impl Step {
    pub fn new(transform: Box<dyn Transform>, on_error: OnError) -> Self {
        Self { transform, on_error }
    }

    pub fn run(&self, flow: Flow) -> TransformResult<Flow> {
        let Flow::Ok(value) = flow else {
            return Ok(flow);
        };
        Flow::from_result(self.transform.apply(value), self.on_error)
    }
}

/// A builder paired with its error policy.
#[derive(Debug)]
pub struct BuilderStep {
    builder: Box<dyn Builder>,
    on_error: OnError,
}

impl BuilderStep {
    pub fn new(builder: Box<dyn Builder>, on_error: OnError) -> Self {
        Self { builder, on_error }
    }

    pub fn run(&self, record: &Record) -> TransformResult<Flow> {
        Flow::from_result(self.builder.apply(record), self.on_error)
    }
}

// =============================================================================
// Chain
// =============================================================================

/// Ordered steps of one field.
#[derive(Debug, Default)]
pub struct Chain {
    steps: Vec<Step>,
}

impl Chain {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn run(&self, value: Value) -> TransformResult<Flow> {
        self.steps
            .iter()
            .try_fold(Flow::Ok(value), |flow, step| step.run(flow))
    }
}
