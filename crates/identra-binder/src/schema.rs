//! Attribute schema model
//!
//! Schemas are long-lived configuration describing what attributes an
//! attributable entity may carry. Three kinds exist: stored schemas hold
//! values locally, derived schemas compute their value from stored
//! attributes through a formula, and virtual schemas are materialized only
//! on external resources with a local cache.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::InvalidValue;
use crate::value::{AttrValueType, StoredValue};

/// The kind of entity a schema (or mapping) applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributableKind {
    /// A person or service identity.
    User,
    /// A role grouping users.
    Role,
    /// A user's membership in a role.
    Membership,
}

impl fmt::Display for AttributableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttributableKind::User => "user",
            AttributableKind::Role => "role",
            AttributableKind::Membership => "membership",
        };
        write!(f, "{s}")
    }
}

/// The kind of an attribute or schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrKind {
    /// Value kept locally.
    Stored,
    /// Value computed from stored attributes.
    Derived,
    /// Value authoritative on the external resource.
    Virtual,
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttrKind::Stored => "stored",
            AttrKind::Derived => "derived",
            AttrKind::Virtual => "virtual",
        };
        write!(f, "{s}")
    }
}

/// Definition of a locally stored attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSchema {
    /// Schema name, unique per attributable kind.
    pub name: String,

    /// Value type provided values are decoded against.
    #[serde(default)]
    pub value_type: AttrValueType,

    /// Whether the attribute may hold more than one value.
    #[serde(default)]
    pub multivalue: bool,

    /// Whether the single value must be unique among all attributes of this
    /// schema. Implies single-valued.
    #[serde(default)]
    pub unique_constraint: bool,

    /// Read-only schemas are never writable through the fill engine.
    #[serde(default)]
    pub readonly: bool,

    /// Condition making the attribute mandatory when it evaluates true.
    /// Absent or empty means never mandatory on its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory_condition: Option<String>,

    /// Permitted literals for [`AttrValueType::Enum`] schemas.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl StoredSchema {
    /// Create a new stored schema with the given name and value type.
    pub fn new(name: impl Into<String>, value_type: AttrValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            multivalue: false,
            unique_constraint: false,
            readonly: false,
            mandatory_condition: None,
            enum_values: Vec::new(),
        }
    }

    /// Allow multiple values.
    #[must_use]
    pub fn multivalued(mut self) -> Self {
        self.multivalue = true;
        self
    }

    /// Require the value to be unique among attributes of this schema.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique_constraint = true;
        self
    }

    /// Mark the schema read-only.
    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Set the mandatory condition.
    #[must_use]
    pub fn with_mandatory_condition(mut self, condition: impl Into<String>) -> Self {
        self.mandatory_condition = Some(condition.into());
        self
    }

    /// Set the permitted enum literals.
    #[must_use]
    pub fn with_enum_values(mut self, values: Vec<String>) -> Self {
        self.enum_values = values;
        self
    }

    /// Decode a raw provided value against this schema.
    pub fn decode(&self, raw: &str) -> Result<StoredValue, InvalidValue> {
        let decoded = self
            .value_type
            .decode(raw)
            .map_err(|reason| InvalidValue::new(&self.name, raw, reason))?;

        if let StoredValue::Enum(literal) = &decoded {
            if !self.enum_values.iter().any(|v| v == literal) {
                return Err(InvalidValue::new(
                    &self.name,
                    raw,
                    format!("not among permitted values [{}]", self.enum_values.join(", ")),
                ));
            }
        }

        Ok(decoded)
    }
}

/// Definition of a derived attribute, computed from stored attributes.
///
/// Derived attributes are implicitly read-only; they carry no values of
/// their own and no mandatory condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedSchema {
    /// Schema name, unique per attributable kind.
    pub name: String,

    /// Formula evaluated against the entity's stored attribute values.
    pub formula: String,
}

impl DerivedSchema {
    /// Create a new derived schema.
    pub fn new(name: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formula: formula.into(),
        }
    }
}

/// Definition of a virtual attribute, materialized on external resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualSchema {
    /// Schema name, unique per attributable kind.
    pub name: String,

    /// Read-only schemas are never writable through the fill engine.
    #[serde(default)]
    pub readonly: bool,

    /// Condition making the attribute mandatory when it evaluates true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory_condition: Option<String>,
}

impl VirtualSchema {
    /// Create a new virtual schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            readonly: false,
            mandatory_condition: None,
        }
    }

    /// Mark the schema read-only.
    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Set the mandatory condition.
    #[must_use]
    pub fn with_mandatory_condition(mut self, condition: impl Into<String>) -> Self {
        self.mandatory_condition = Some(condition.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_schema_builder() {
        let schema = StoredSchema::new("email", AttrValueType::String)
            .unique()
            .with_mandatory_condition("true");

        assert_eq!(schema.name, "email");
        assert!(schema.unique_constraint);
        assert!(!schema.multivalue);
        assert_eq!(schema.mandatory_condition.as_deref(), Some("true"));
    }

    #[test]
    fn test_decode_respects_value_type() {
        let schema = StoredSchema::new("age", AttrValueType::Long);
        assert_eq!(schema.decode("30").unwrap(), StoredValue::Long(30));

        let err = schema.decode("thirty").unwrap_err();
        assert_eq!(err.schema, "age");
        assert_eq!(err.value, "thirty");
    }

    #[test]
    fn test_decode_enum_membership() {
        let schema = StoredSchema::new("shift", AttrValueType::Enum)
            .with_enum_values(vec!["day".to_string(), "night".to_string()]);

        assert_eq!(
            schema.decode("day").unwrap(),
            StoredValue::Enum("day".to_string())
        );
        let err = schema.decode("evening").unwrap_err();
        assert!(err.reason.contains("permitted values"));
    }

    #[test]
    fn test_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&AttributableKind::Membership).unwrap(),
            "\"membership\""
        );
        assert_eq!(serde_json::to_string(&AttrKind::Virtual).unwrap(), "\"virtual\"");
    }
}
