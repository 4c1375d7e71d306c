//! Fill/diff payloads
//!
//! A [`Snapshot`] is the full-state input applied on create; a [`Delta`] is
//! the sparse add/remove/update input applied on update. Both reference
//! schemas and resources by name; unknown references are tolerated and
//! silently dropped by the engine.

use serde::{Deserialize, Serialize};

/// One attribute's raw values, keyed by schema name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrValues {
    /// Schema name.
    pub schema: String,
    /// Raw values, in wire form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl AttrValues {
    /// Create a value group for a schema.
    pub fn new<I, S>(schema: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schema: schema.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Sparse per-attribute change applied on update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrPatch {
    /// Schema name.
    pub schema: String,
    /// Raw values to add.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values_to_add: Vec<String>,
    /// Raw values to remove.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values_to_remove: Vec<String>,
}

impl AttrPatch {
    /// Create an empty patch for a schema.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            values_to_add: Vec::new(),
            values_to_remove: Vec::new(),
        }
    }

    /// Add a value.
    #[must_use]
    pub fn add(mut self, value: impl Into<String>) -> Self {
        self.values_to_add.push(value.into());
        self
    }

    /// Remove a value.
    #[must_use]
    pub fn remove(mut self, value: impl Into<String>) -> Self {
        self.values_to_remove.push(value.into());
        self
    }
}

/// Full-state input used on create, and the outbound rendering of an
/// attributable's current state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Stored attribute value groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stored: Vec<AttrValues>,

    /// Derived attributes; values are ignored on input and carry the
    /// computed value on output.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived: Vec<AttrValues>,

    /// Virtual attribute value groups (local cache content).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtuals: Vec<AttrValues>,

    /// External resource names to link.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
}

/// Sparse input used on update, applied in six ordered stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    /// Resource names to unlink.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources_to_remove: Vec<String>,

    /// Resource names to link.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources_to_add: Vec<String>,

    /// Stored attributes to delete, by schema name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stored_to_remove: Vec<String>,

    /// Stored attribute value patches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stored_to_update: Vec<AttrPatch>,

    /// Derived attributes to delete, by schema name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived_to_remove: Vec<String>,

    /// Derived attributes to add, by schema name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived_to_add: Vec<String>,

    /// Virtual attributes to delete, by schema name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_to_remove: Vec<String>,

    /// Virtual attribute cache patches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_to_update: Vec<AttrPatch>,
}

impl Delta {
    /// True when the delta carries no changes.
    pub fn is_empty(&self) -> bool {
        self.resources_to_remove.is_empty()
            && self.resources_to_add.is_empty()
            && self.stored_to_remove.is_empty()
            && self.stored_to_update.is_empty()
            && self.derived_to_remove.is_empty()
            && self.derived_to_add.is_empty()
            && self.virtual_to_remove.is_empty()
            && self.virtual_to_update.is_empty()
    }
}
