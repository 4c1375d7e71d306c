//! Condition and formula evaluation
//!
//! Mandatory conditions and derived-attribute formulas are Rhai expressions
//! evaluated against a context built by the caller from an attributable's
//! stored, derived, and virtual attribute values. Evaluation is side-effect
//! free and sandboxed: a fresh engine is created per call with hard resource
//! limits and no file system or network access.
//!
//! Expression validity is enforced when configuration is saved
//! ([`ExpressionEvaluator::validate`]); an expression that fails at use time
//! (malformed legacy configuration, or a reference to an attribute the
//! entity does not carry) evaluates to `false` rather than raising.

use rhai::{Dynamic, Engine, Scope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::attributable::Attributable;

/// Default maximum number of operations in the engine.
const DEFAULT_MAX_OPERATIONS: u64 = 100_000;

/// Default maximum call stack depth.
const DEFAULT_MAX_CALL_STACK_DEPTH: usize = 64;

/// Default maximum string size in bytes.
const DEFAULT_MAX_STRING_SIZE: usize = 65536;

/// Default maximum array size.
const DEFAULT_MAX_ARRAY_SIZE: usize = 10_000;

/// Default maximum map size.
const DEFAULT_MAX_MAP_SIZE: usize = 10_000;

/// Resource limits for expression evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Maximum number of operations before termination.
    pub max_operations: u64,
    /// Maximum call stack depth.
    pub max_call_stack_depth: usize,
    /// Maximum string size in bytes.
    pub max_string_size: usize,
    /// Maximum array size.
    pub max_array_size: usize,
    /// Maximum map size.
    pub max_map_size: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_operations: DEFAULT_MAX_OPERATIONS,
            max_call_stack_depth: DEFAULT_MAX_CALL_STACK_DEPTH,
            max_string_size: DEFAULT_MAX_STRING_SIZE,
            max_array_size: DEFAULT_MAX_ARRAY_SIZE,
            max_map_size: DEFAULT_MAX_MAP_SIZE,
        }
    }
}

/// Variable bindings an expression is evaluated against.
///
/// One variable per attribute: a single value binds as a string, multiple
/// values bind as an array of strings, no values bind as the empty string.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    vars: BTreeMap<String, Vec<String>>,
}

impl EvalContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context over an attributable's stored attribute values plus the
    /// built-in `username`. This is the context derived formulas see.
    pub fn stored_of(attributable: &Attributable) -> Self {
        let mut ctx = Self::new();
        for attr in attributable.stored_attrs() {
            ctx.set(attr.schema(), attr.values_as_strings());
        }
        if let Some(username) = attributable.username() {
            ctx.set("username", vec![username.to_string()]);
        }
        ctx
    }

    /// Bind a variable.
    pub fn set(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.vars.insert(name.into(), values);
    }

    /// Bind a variable, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.set(name, values);
        self
    }

    fn scope(&self) -> Scope<'static> {
        let mut scope = Scope::new();
        for (name, values) in &self.vars {
            let value = match values.as_slice() {
                [] => Dynamic::from(String::new()),
                [single] => Dynamic::from(single.clone()),
                many => {
                    let array: rhai::Array =
                        many.iter().map(|v| Dynamic::from(v.clone())).collect();
                    Dynamic::from(array)
                }
            };
            scope.push_dynamic(name.clone(), value);
        }
        scope
    }
}

/// Sandboxed evaluator for mandatory conditions and derived formulas.
///
/// Holds only configuration; a fresh engine is built per evaluation so no
/// state leaks between entities.
#[derive(Debug, Clone, Default)]
pub struct ExpressionEvaluator {
    config: EvaluatorConfig,
}

impl ExpressionEvaluator {
    /// Create an evaluator with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: EvaluatorConfig::default(),
        }
    }

    /// Create an evaluator with custom limits.
    #[must_use]
    pub fn with_config(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    fn engine(&self) -> Engine {
        let mut engine = Engine::new();

        engine.set_max_operations(self.config.max_operations);
        engine.set_max_call_levels(self.config.max_call_stack_depth);
        engine.set_max_string_size(self.config.max_string_size);
        engine.set_max_array_size(self.config.max_array_size);
        engine.set_max_map_size(self.config.max_map_size);

        // Expressions may reference attributes the entity does not carry;
        // those references must resolve to a runtime miss, not a compile
        // failure, so strict variables stay off.
        engine.set_strict_variables(false);

        engine
    }

    /// Syntax-check an expression. Used when schemas and mappings are saved.
    pub fn validate(&self, expression: &str) -> Result<(), String> {
        self.engine()
            .compile(expression)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    /// Whether an expression compiles.
    #[must_use]
    pub fn is_valid(&self, expression: &str) -> bool {
        self.validate(expression).is_ok()
    }

    /// Evaluate an expression and render the result to a string. Any
    /// failure yields the empty string.
    pub fn evaluate(&self, expression: &str, ctx: &EvalContext) -> String {
        let mut scope = ctx.scope();
        match self.engine().eval_with_scope::<Dynamic>(&mut scope, expression) {
            Ok(result) => result.to_string(),
            Err(e) => {
                debug!(expression, error = %e, "expression failed to evaluate, yielding empty value");
                String::new()
            }
        }
    }

    /// Evaluate a mandatory condition. An absent or empty expression is
    /// `false`; a parse or runtime failure is `false`.
    pub fn mandatory(&self, expression: Option<&str>, ctx: &EvalContext) -> bool {
        let expression = match expression {
            Some(e) if !e.trim().is_empty() => e,
            _ => return false,
        };

        let mut scope = ctx.scope();
        match self.engine().eval_with_scope::<Dynamic>(&mut scope, expression) {
            Ok(result) => result.to_string() == "true",
            Err(e) => {
                debug!(expression, error = %e, "mandatory condition failed to evaluate, treating as false");
                false
            }
        }
    }

    /// Compute a derived attribute's value from the entity's stored
    /// attributes. Any failure yields the empty string.
    pub fn derived_value(&self, formula: &str, attributable: &Attributable) -> String {
        self.evaluate(formula, &EvalContext::stored_of(attributable))
    }
}
