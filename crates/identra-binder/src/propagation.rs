//! Propagation planning
//!
//! Every fill/diff call accumulates a plan of the external resources that
//! must be re-synchronized afterwards: per resource, the operation to send,
//! and the previous account-id value when the identifying attribute itself
//! changed. A plan is ephemeral: built during one call, handed to the
//! propagation dispatcher, never persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Operation to be sent to an external resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceOperation {
    /// Create the record on the resource.
    Create,
    /// Update the existing record.
    Update,
    /// Delete the record.
    Delete,
}

impl fmt::Display for ResourceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceOperation::Create => "create",
            ResourceOperation::Update => "update",
            ResourceOperation::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

/// Per-resource instruction set produced by one fill/diff call.
///
/// A resource name maps to at most one operation. Iteration order is
/// deterministic (by resource name).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationPlan {
    operations: BTreeMap<String, ResourceOperation>,
    old_account_ids: BTreeMap<String, String>,
}

impl PropagationPlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an operation for a resource.
    ///
    /// Idempotent per resource for the same operation. An `Update` never
    /// downgrades a `Create` or `Delete` already recorded for the same
    /// resource; `Create` and `Delete` overwrite whatever is present.
    pub fn add(&mut self, operation: ResourceOperation, resource: impl Into<String>) {
        let resource = resource.into();
        if operation == ResourceOperation::Update {
            self.operations
                .entry(resource)
                .or_insert(ResourceOperation::Update);
        } else {
            self.operations.insert(resource, operation);
        }
    }

    /// Record an operation for every named resource.
    pub fn add_all<I, S>(&mut self, operation: ResourceOperation, resources: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for resource in resources {
            self.add(operation, resource);
        }
    }

    /// Operation recorded for a resource, if any.
    pub fn operation(&self, resource: &str) -> Option<ResourceOperation> {
        self.operations.get(resource).copied()
    }

    /// Resources recorded with the given operation, ordered by name.
    pub fn resources_for(&self, operation: ResourceOperation) -> Vec<&str> {
        self.operations
            .iter()
            .filter(|(_, op)| **op == operation)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// All entries, ordered by resource name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ResourceOperation)> {
        self.operations.iter().map(|(name, op)| (name.as_str(), *op))
    }

    /// Number of resources in the plan.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// True when no operation has been recorded.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Record the previous account-id value for a resource.
    ///
    /// Captured only when the attribute a resource maps as its account-id is
    /// being removed or replaced; the dispatcher uses it to locate the
    /// pre-rename record on the resource side.
    pub fn set_old_account_id(&mut self, resource: impl Into<String>, value: impl Into<String>) {
        self.old_account_ids.insert(resource.into(), value.into());
    }

    /// Previous account-id value captured for a resource, if any.
    pub fn old_account_id(&self, resource: &str) -> Option<&str> {
        self.old_account_ids.get(resource).map(String::as_str)
    }

    /// Union another plan into this one.
    ///
    /// On a resource-name collision the merged-in plan's operation wins;
    /// old account-ids union the same way. This lets later bookkeeping
    /// passes compose on top of earlier ones.
    pub fn merge(&mut self, other: PropagationPlan) {
        self.operations.extend(other.operations);
        self.old_account_ids.extend(other.old_account_ids);
    }
}
