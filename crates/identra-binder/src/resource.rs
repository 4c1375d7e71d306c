//! External resources and attribute mappings
//!
//! An external resource is a system (directory, database, SaaS API) that
//! mirrors part of an attributable's state. Each resource carries, per
//! attributable kind, an ordered list of mapping items binding an internal
//! attribute reference to a resource-side attribute name. Exactly one item
//! per kind is the account-id (the resource-side primary key); for user
//! mappings at most one item is the password.

use serde::{Deserialize, Serialize};

use crate::schema::{AttrKind, AttributableKind};

/// Internal attribute reference of a mapping item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttrRef {
    /// A stored schema.
    Stored {
        /// Schema name.
        name: String,
    },
    /// A derived schema.
    Derived {
        /// Schema name.
        name: String,
    },
    /// A virtual schema.
    Virtual {
        /// Schema name.
        name: String,
    },
    /// The built-in username of a user attributable.
    Username,
}

impl AttrRef {
    /// Reference a stored schema.
    pub fn stored(name: impl Into<String>) -> Self {
        AttrRef::Stored { name: name.into() }
    }

    /// Reference a derived schema.
    pub fn derived(name: impl Into<String>) -> Self {
        AttrRef::Derived { name: name.into() }
    }

    /// Reference a virtual schema.
    pub fn virtual_(name: impl Into<String>) -> Self {
        AttrRef::Virtual { name: name.into() }
    }

    /// Whether this reference points at the given schema.
    pub fn refers_to(&self, kind: AttrKind, schema: &str) -> bool {
        match (self, kind) {
            (AttrRef::Stored { name }, AttrKind::Stored)
            | (AttrRef::Derived { name }, AttrKind::Derived)
            | (AttrRef::Virtual { name }, AttrKind::Virtual) => name == schema,
            _ => false,
        }
    }
}

/// Purpose a mapping item participates in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingPurpose {
    /// Outbound propagation only.
    #[default]
    Propagation,
    /// Inbound synchronization only.
    Synchronization,
    /// Both directions.
    Both,
    /// Configured but inactive.
    None,
}

impl MappingPurpose {
    /// Whether a mapping with this purpose serves the requested one.
    pub fn covers(&self, requested: MappingPurpose) -> bool {
        match self {
            MappingPurpose::Both => !matches!(requested, MappingPurpose::None),
            other => *other == requested && !matches!(requested, MappingPurpose::None),
        }
    }
}

/// Binding of one internal attribute reference to a resource-side attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingItem {
    /// The internal attribute this item reads from.
    pub source: AttrRef,

    /// Attribute name on the external resource.
    pub target_attr: String,

    /// Whether this item is the resource-side primary key for its kind.
    #[serde(default)]
    pub account_id: bool,

    /// Whether this item carries the password (user mappings only).
    #[serde(default)]
    pub password: bool,

    /// Condition making the referenced attribute mandatory on this resource,
    /// evaluated independently of the schema-level condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory_condition: Option<String>,

    /// Purpose this item participates in.
    #[serde(default)]
    pub purpose: MappingPurpose,
}

impl MappingItem {
    /// Create a new mapping item with default flags and propagation purpose.
    pub fn new(source: AttrRef, target_attr: impl Into<String>) -> Self {
        Self {
            source,
            target_attr: target_attr.into(),
            account_id: false,
            password: false,
            mandatory_condition: None,
            purpose: MappingPurpose::default(),
        }
    }

    /// Mark this item as the account-id.
    #[must_use]
    pub fn account_id(mut self) -> Self {
        self.account_id = true;
        self
    }

    /// Mark this item as the password.
    #[must_use]
    pub fn password(mut self) -> Self {
        self.password = true;
        self
    }

    /// Set the item-level mandatory condition.
    #[must_use]
    pub fn with_mandatory_condition(mut self, condition: impl Into<String>) -> Self {
        self.mandatory_condition = Some(condition.into());
        self
    }

    /// Set the purpose.
    #[must_use]
    pub fn with_purpose(mut self, purpose: MappingPurpose) -> Self {
        self.purpose = purpose;
        self
    }
}

/// An external system mirroring part of an attributable's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalResource {
    /// Resource name, the propagation plan key.
    pub name: String,

    /// Whether mapping-level mandatory conditions on this resource are
    /// enforced by the constraint checker.
    #[serde(default)]
    pub enforce_mandatory: bool,

    /// Mapping items for user attributables, in configuration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_mapping: Vec<MappingItem>,

    /// Mapping items for role attributables.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role_mapping: Vec<MappingItem>,

    /// Mapping items for membership attributables.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub membership_mapping: Vec<MappingItem>,
}

impl ExternalResource {
    /// Create a new resource with no mappings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enforce_mandatory: false,
            user_mapping: Vec::new(),
            role_mapping: Vec::new(),
            membership_mapping: Vec::new(),
        }
    }

    /// Enforce mapping-level mandatory conditions.
    #[must_use]
    pub fn enforce_mandatory(mut self) -> Self {
        self.enforce_mandatory = true;
        self
    }

    /// Set the mapping for one attributable kind.
    #[must_use]
    pub fn with_mapping(mut self, kind: AttributableKind, items: Vec<MappingItem>) -> Self {
        match kind {
            AttributableKind::User => self.user_mapping = items,
            AttributableKind::Role => self.role_mapping = items,
            AttributableKind::Membership => self.membership_mapping = items,
        }
        self
    }

    /// Mapping items for one attributable kind, in configuration order.
    pub fn mapping(&self, kind: AttributableKind) -> &[MappingItem] {
        match kind {
            AttributableKind::User => &self.user_mapping,
            AttributableKind::Role => &self.role_mapping,
            AttributableKind::Membership => &self.membership_mapping,
        }
    }

    /// The account-id mapping item for one attributable kind, if configured.
    pub fn account_id_item(&self, kind: AttributableKind) -> Option<&MappingItem> {
        self.mapping(kind).iter().find(|item| item.account_id)
    }
}
