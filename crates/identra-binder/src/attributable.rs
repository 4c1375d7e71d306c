//! Attributable entities and attribute instances
//!
//! An attributable is a user, role, or membership carrying stored, derived,
//! and virtual attributes plus a set of linked external resource names.
//! Attribute maps are keyed by schema name: at most one attribute instance
//! exists per schema, and single-valued schemas hold at most one value.
//! All mutation goes through the fill engine.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::ids::{EntityId, RoleId};
use crate::schema::AttributableKind;
use crate::value::StoredValue;

/// A stored attribute instance: a schema name plus decoded values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAttr {
    schema: String,
    values: Vec<StoredValue>,
}

impl StoredAttr {
    /// Create an empty attribute for the given schema.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            values: Vec::new(),
        }
    }

    /// Name of the owning schema.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The decoded values, in provision order.
    pub fn values(&self) -> &[StoredValue] {
        &self.values
    }

    /// The values rendered back to wire form.
    pub fn values_as_strings(&self) -> Vec<String> {
        self.values.iter().map(StoredValue::as_string).collect()
    }

    /// First value in wire form, if any.
    pub fn first_value_as_string(&self) -> Option<String> {
        self.values.first().map(StoredValue::as_string)
    }

    /// Append a value.
    pub fn push_value(&mut self, value: StoredValue) {
        self.values.push(value);
    }

    /// Replace all values with a single one.
    pub fn set_single_value(&mut self, value: StoredValue) {
        self.values.clear();
        self.values.push(value);
    }

    /// Remove every value whose wire form equals `raw`.
    pub fn remove_value(&mut self, raw: &str) {
        self.values.retain(|v| v.as_string() != raw);
    }

    /// Remove all values.
    pub fn clear_values(&mut self) {
        self.values.clear();
    }

    /// True when the attribute holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A derived attribute instance.
///
/// Carries no values of its own; its value is computed on demand from the
/// schema formula and the owner's stored attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAttr {
    schema: String,
}

impl DerivedAttr {
    /// Create a derived attribute for the given schema.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    /// Name of the owning schema.
    pub fn schema(&self) -> &str {
        &self.schema
    }
}

/// A virtual attribute instance.
///
/// Values are authoritative on the external resource; the local list is a
/// cache maintained for memberships by the fill engine and for users and
/// roles by the propagation dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualAttr {
    schema: String,
    values: Vec<String>,
}

impl VirtualAttr {
    /// Create an empty virtual attribute for the given schema.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            values: Vec::new(),
        }
    }

    /// Name of the owning schema.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The cached values.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Replace the cached values.
    pub fn set_values(&mut self, values: Vec<String>) {
        self.values = values;
    }

    /// Append a cached value.
    pub fn push_value(&mut self, value: impl Into<String>) {
        self.values.push(value.into());
    }

    /// Remove every cached value equal to `raw`.
    pub fn remove_value(&mut self, raw: &str) {
        self.values.retain(|v| v != raw);
    }

    /// True when the cache holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A user, role, or membership carrying attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attributable {
    id: Option<EntityId>,
    kind: AttributableKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<RoleId>,
    stored: BTreeMap<String, StoredAttr>,
    derived: BTreeMap<String, DerivedAttr>,
    virtuals: BTreeMap<String, VirtualAttr>,
    resources: BTreeSet<String>,
}

impl Attributable {
    fn empty(kind: AttributableKind) -> Self {
        Self {
            id: None,
            kind,
            username: None,
            role: None,
            stored: BTreeMap::new(),
            derived: BTreeMap::new(),
            virtuals: BTreeMap::new(),
            resources: BTreeSet::new(),
        }
    }

    /// Create a not-yet-persisted user.
    pub fn new_user(username: impl Into<String>) -> Self {
        let mut user = Self::empty(AttributableKind::User);
        user.username = Some(username.into());
        user
    }

    /// Create a not-yet-persisted role.
    ///
    /// The [`RoleId`] is the role's domain identity, referenced by attribute
    /// templates and memberships.
    pub fn new_role(role: RoleId) -> Self {
        let mut r = Self::empty(AttributableKind::Role);
        r.role = Some(role);
        r
    }

    /// Create a not-yet-persisted membership of the given role.
    pub fn new_membership(owner: RoleId) -> Self {
        let mut m = Self::empty(AttributableKind::Membership);
        m.role = Some(owner);
        m
    }

    /// Set the persistence identity.
    #[must_use]
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    /// Persistence identity, absent until first save.
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// What kind of entity this is.
    pub fn kind(&self) -> AttributableKind {
        self.kind
    }

    /// The built-in username (users only).
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// The role identity: the role's own for roles, the owning role's for
    /// memberships, absent for users.
    pub fn role(&self) -> Option<RoleId> {
        self.role
    }

    // -- stored attributes

    /// Stored attribute for a schema name, if present.
    pub fn stored_attr(&self, schema: &str) -> Option<&StoredAttr> {
        self.stored.get(schema)
    }

    /// Insert a stored attribute, replacing any instance for the same schema.
    pub fn add_stored_attr(&mut self, attr: StoredAttr) {
        self.stored.insert(attr.schema.clone(), attr);
    }

    /// Remove and return the stored attribute for a schema name.
    pub fn remove_stored_attr(&mut self, schema: &str) -> Option<StoredAttr> {
        self.stored.remove(schema)
    }

    /// All stored attributes, ordered by schema name.
    pub fn stored_attrs(&self) -> impl Iterator<Item = &StoredAttr> {
        self.stored.values()
    }

    // -- derived attributes

    /// Derived attribute for a schema name, if present.
    pub fn derived_attr(&self, schema: &str) -> Option<&DerivedAttr> {
        self.derived.get(schema)
    }

    /// Insert a derived attribute.
    pub fn add_derived_attr(&mut self, attr: DerivedAttr) {
        self.derived.insert(attr.schema.clone(), attr);
    }

    /// Remove the derived attribute for a schema name.
    pub fn remove_derived_attr(&mut self, schema: &str) -> Option<DerivedAttr> {
        self.derived.remove(schema)
    }

    /// All derived attributes, ordered by schema name.
    pub fn derived_attrs(&self) -> impl Iterator<Item = &DerivedAttr> {
        self.derived.values()
    }

    // -- virtual attributes

    /// Virtual attribute for a schema name, if present.
    pub fn virtual_attr(&self, schema: &str) -> Option<&VirtualAttr> {
        self.virtuals.get(schema)
    }

    /// Mutable virtual attribute for a schema name.
    pub fn virtual_attr_mut(&mut self, schema: &str) -> Option<&mut VirtualAttr> {
        self.virtuals.get_mut(schema)
    }

    /// Insert a virtual attribute.
    pub fn add_virtual_attr(&mut self, attr: VirtualAttr) {
        self.virtuals.insert(attr.schema.clone(), attr);
    }

    /// Remove the virtual attribute for a schema name.
    pub fn remove_virtual_attr(&mut self, schema: &str) -> Option<VirtualAttr> {
        self.virtuals.remove(schema)
    }

    /// All virtual attributes, ordered by schema name.
    pub fn virtual_attrs(&self) -> impl Iterator<Item = &VirtualAttr> {
        self.virtuals.values()
    }

    // -- resources

    /// Names of linked external resources, ordered.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(String::as_str)
    }

    /// Whether the entity is linked to the named resource.
    pub fn has_resource(&self, name: &str) -> bool {
        self.resources.contains(name)
    }

    /// Link an external resource. Idempotent.
    pub fn link_resource(&mut self, name: impl Into<String>) {
        self.resources.insert(name.into());
    }

    /// Unlink an external resource; true when a link existed.
    pub fn unlink_resource(&mut self, name: &str) -> bool {
        self.resources.remove(name)
    }
}
