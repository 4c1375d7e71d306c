//! Binder error types
//!
//! A fill/diff call either returns a completed propagation plan or fails with
//! one aggregated [`RejectedChanges`] value carrying every problem found:
//! invalid attribute values and missing mandatory attributes are collected
//! across the whole call, never raised one by one.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A single provided value that failed validation against its schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidValue {
    /// Name of the schema the value was provided for.
    pub schema: String,
    /// The offending raw value.
    pub value: String,
    /// Why the value was rejected.
    pub reason: String,
}

impl InvalidValue {
    /// Create a new invalid-value record.
    pub fn new(
        schema: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for InvalidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.schema, self.value, self.reason)
    }
}

/// Aggregated failure of a fill/diff call.
///
/// Carries the complete list of invalid values and the complete list of
/// mandatory schemas left without a value. A caller receiving this error must
/// discard the in-memory attributable it passed in; no partial application is
/// reported.
#[derive(Debug, Clone, Default, Error, Serialize)]
#[error(
    "change set rejected: {} invalid value(s), {} missing mandatory attribute(s)",
    .invalid_values.len(),
    .missing_mandatory.len()
)]
pub struct RejectedChanges {
    /// Values that failed type/format validation, in provision order.
    pub invalid_values: Vec<InvalidValue>,
    /// Names of mandatory schemas with no value.
    pub missing_mandatory: Vec<String>,
}

impl RejectedChanges {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an invalid value.
    pub fn push_invalid(&mut self, invalid: InvalidValue) {
        self.invalid_values.push(invalid);
    }

    /// Record a mandatory schema without a value.
    pub fn push_missing(&mut self, schema: impl Into<String>) {
        self.missing_mandatory.push(schema.into());
    }

    /// True when nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.invalid_values.is_empty() && self.missing_mandatory.is_empty()
    }

    /// Convert the collector into a result: `Ok(())` when empty.
    pub fn into_result(self) -> Result<(), RejectedChanges> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Result type for fill/diff operations.
pub type BinderResult<T> = Result<T, RejectedChanges>;

/// Failure to register a schema or resource whose embedded expression does
/// not compile.
///
/// Expression validity is enforced when configuration is saved; expressions
/// that reach evaluation are assumed valid and never raise (see
/// [`ExpressionEvaluator`](crate::expression::ExpressionEvaluator)).
#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    /// A mandatory-condition expression does not compile.
    #[error("invalid mandatory condition for '{name}': {detail}")]
    InvalidMandatoryCondition { name: String, detail: String },

    /// A derived-schema formula does not compile.
    #[error("invalid formula for derived schema '{name}': {detail}")]
    InvalidFormula { name: String, detail: String },

    /// A resource mapping violates the account-id/password cardinality rules.
    #[error("invalid mapping for resource '{resource}': {detail}")]
    InvalidMapping { resource: String, detail: String },
}
