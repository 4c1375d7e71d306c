//! Configuration stores and the mapping resolver
//!
//! Schemas, resources, and templates are long-lived configuration, read-only
//! from the engine's perspective. The engine receives them as explicit trait
//! references at construction and assumes a stable snapshot for the duration
//! of one fill/diff call. The in-memory implementations back the integration
//! tests and are embeddable by callers that keep configuration in process.

use std::collections::BTreeMap;

use crate::error::RegistrationError;
use crate::expression::ExpressionEvaluator;
use crate::ids::RoleId;
use crate::resource::{ExternalResource, MappingItem, MappingPurpose};
use crate::schema::{AttrKind, AttributableKind, DerivedSchema, StoredSchema, VirtualSchema};
use crate::template::AttrTemplate;

/// Read-only lookup of attribute schemas, keyed per attributable kind.
pub trait SchemaStore: Send + Sync {
    /// Stored schema by name, if registered for the kind.
    fn find_stored(&self, kind: AttributableKind, name: &str) -> Option<&StoredSchema>;

    /// Derived schema by name, if registered for the kind.
    fn find_derived(&self, kind: AttributableKind, name: &str) -> Option<&DerivedSchema>;

    /// Virtual schema by name, if registered for the kind.
    fn find_virtual(&self, kind: AttributableKind, name: &str) -> Option<&VirtualSchema>;

    /// All stored schemas registered for the kind, ordered by name.
    fn stored_schemas(&self, kind: AttributableKind) -> Vec<&StoredSchema>;

    /// All derived schemas registered for the kind, ordered by name.
    fn derived_schemas(&self, kind: AttributableKind) -> Vec<&DerivedSchema>;

    /// All virtual schemas registered for the kind, ordered by name.
    fn virtual_schemas(&self, kind: AttributableKind) -> Vec<&VirtualSchema>;
}

/// Read-only lookup of external resources.
pub trait ResourceStore: Send + Sync {
    /// Resource by name.
    fn find(&self, name: &str) -> Option<&ExternalResource>;

    /// All resources, ordered by name.
    fn find_all(&self) -> Vec<&ExternalResource>;
}

/// Read-only lookup of attribute templates.
pub trait TemplateStore: Send + Sync {
    /// Template enabling a schema on a role (or its memberships).
    fn find(
        &self,
        role: RoleId,
        applies_to: AttributableKind,
        kind: AttrKind,
        schema: &str,
    ) -> Option<&AttrTemplate>;

    /// All templates carried by a role.
    fn templates_for_role(&self, role: RoleId) -> Vec<&AttrTemplate>;
}

/// Resolves the mapping items of a resource for one attributable kind and
/// purpose.
///
/// The production mapping pipeline lives in the connector framework; the
/// engine only consumes the resolved, ordered item list.
pub trait MappingResolver: Send + Sync {
    /// Mapping items serving the requested purpose, in configuration order.
    fn items<'a>(
        &self,
        resource: &'a ExternalResource,
        kind: AttributableKind,
        purpose: MappingPurpose,
    ) -> Vec<&'a MappingItem>;
}

/// Mapping resolver reading the item list the resource itself carries.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectMappingResolver;

impl DirectMappingResolver {
    /// Create a new direct resolver.
    pub fn new() -> Self {
        Self
    }
}

impl MappingResolver for DirectMappingResolver {
    fn items<'a>(
        &self,
        resource: &'a ExternalResource,
        kind: AttributableKind,
        purpose: MappingPurpose,
    ) -> Vec<&'a MappingItem> {
        resource
            .mapping(kind)
            .iter()
            .filter(|item| item.purpose.covers(purpose))
            .collect()
    }
}

/// In-memory schema store with save-time expression validation.
#[derive(Debug, Default)]
pub struct InMemorySchemaStore {
    evaluator: ExpressionEvaluator,
    stored: BTreeMap<(AttributableKind, String), StoredSchema>,
    derived: BTreeMap<(AttributableKind, String), DerivedSchema>,
    virtuals: BTreeMap<(AttributableKind, String), VirtualSchema>,
}

impl InMemorySchemaStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stored schema for a kind.
    ///
    /// Rejects schemas whose mandatory condition does not compile; a
    /// condition that reached the store before validation existed still
    /// evaluates to `false` at use time rather than raising.
    pub fn register_stored(
        &mut self,
        kind: AttributableKind,
        schema: StoredSchema,
    ) -> Result<(), RegistrationError> {
        if let Some(condition) = &schema.mandatory_condition {
            self.evaluator.validate(condition).map_err(|detail| {
                RegistrationError::InvalidMandatoryCondition {
                    name: schema.name.clone(),
                    detail,
                }
            })?;
        }
        self.stored.insert((kind, schema.name.clone()), schema);
        Ok(())
    }

    /// Register a derived schema for a kind. Rejects formulas that do not
    /// compile.
    pub fn register_derived(
        &mut self,
        kind: AttributableKind,
        schema: DerivedSchema,
    ) -> Result<(), RegistrationError> {
        self.evaluator
            .validate(&schema.formula)
            .map_err(|detail| RegistrationError::InvalidFormula {
                name: schema.name.clone(),
                detail,
            })?;
        self.derived.insert((kind, schema.name.clone()), schema);
        Ok(())
    }

    /// Register a virtual schema for a kind. Rejects mandatory conditions
    /// that do not compile.
    pub fn register_virtual(
        &mut self,
        kind: AttributableKind,
        schema: VirtualSchema,
    ) -> Result<(), RegistrationError> {
        if let Some(condition) = &schema.mandatory_condition {
            self.evaluator.validate(condition).map_err(|detail| {
                RegistrationError::InvalidMandatoryCondition {
                    name: schema.name.clone(),
                    detail,
                }
            })?;
        }
        self.virtuals.insert((kind, schema.name.clone()), schema);
        Ok(())
    }
}

impl SchemaStore for InMemorySchemaStore {
    fn find_stored(&self, kind: AttributableKind, name: &str) -> Option<&StoredSchema> {
        self.stored.get(&(kind, name.to_string()))
    }

    fn find_derived(&self, kind: AttributableKind, name: &str) -> Option<&DerivedSchema> {
        self.derived.get(&(kind, name.to_string()))
    }

    fn find_virtual(&self, kind: AttributableKind, name: &str) -> Option<&VirtualSchema> {
        self.virtuals.get(&(kind, name.to_string()))
    }

    fn stored_schemas(&self, kind: AttributableKind) -> Vec<&StoredSchema> {
        self.stored
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, schema)| schema)
            .collect()
    }

    fn derived_schemas(&self, kind: AttributableKind) -> Vec<&DerivedSchema> {
        self.derived
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, schema)| schema)
            .collect()
    }

    fn virtual_schemas(&self, kind: AttributableKind) -> Vec<&VirtualSchema> {
        self.virtuals
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, schema)| schema)
            .collect()
    }
}

/// In-memory resource store with save-time mapping validation.
#[derive(Debug, Default)]
pub struct InMemoryResourceStore {
    evaluator: ExpressionEvaluator,
    resources: BTreeMap<String, ExternalResource>,
}

impl InMemoryResourceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource.
    ///
    /// Rejects mapping-item mandatory conditions that do not compile, a
    /// non-empty per-kind mapping without exactly one account-id item, more
    /// than one password item, and password items outside the user mapping.
    pub fn register(&mut self, resource: ExternalResource) -> Result<(), RegistrationError> {
        for kind in [
            AttributableKind::User,
            AttributableKind::Role,
            AttributableKind::Membership,
        ] {
            let items = resource.mapping(kind);
            if items.is_empty() {
                continue;
            }

            for item in items {
                if let Some(condition) = &item.mandatory_condition {
                    self.evaluator.validate(condition).map_err(|detail| {
                        RegistrationError::InvalidMandatoryCondition {
                            name: format!("{}/{}", resource.name, item.target_attr),
                            detail,
                        }
                    })?;
                }
            }

            let account_ids = items.iter().filter(|item| item.account_id).count();
            if account_ids != 1 {
                return Err(RegistrationError::InvalidMapping {
                    resource: resource.name.clone(),
                    detail: format!(
                        "{kind} mapping must carry exactly one account-id item, found {account_ids}"
                    ),
                });
            }

            let passwords = items.iter().filter(|item| item.password).count();
            if passwords > 1 {
                return Err(RegistrationError::InvalidMapping {
                    resource: resource.name.clone(),
                    detail: format!("{kind} mapping carries {passwords} password items"),
                });
            }
            if passwords == 1 && kind != AttributableKind::User {
                return Err(RegistrationError::InvalidMapping {
                    resource: resource.name.clone(),
                    detail: format!("password item not allowed in {kind} mapping"),
                });
            }
        }

        self.resources.insert(resource.name.clone(), resource);
        Ok(())
    }
}

impl ResourceStore for InMemoryResourceStore {
    fn find(&self, name: &str) -> Option<&ExternalResource> {
        self.resources.get(name)
    }

    fn find_all(&self) -> Vec<&ExternalResource> {
        self.resources.values().collect()
    }
}

/// In-memory template store.
#[derive(Debug, Default)]
pub struct InMemoryTemplateStore {
    templates: Vec<AttrTemplate>,
}

impl InMemoryTemplateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template. Idempotent for identical templates.
    pub fn register(&mut self, template: AttrTemplate) {
        if !self.templates.contains(&template) {
            self.templates.push(template);
        }
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn find(
        &self,
        role: RoleId,
        applies_to: AttributableKind,
        kind: AttrKind,
        schema: &str,
    ) -> Option<&AttrTemplate> {
        self.templates.iter().find(|t| {
            t.role == role && t.applies_to == applies_to && t.kind == kind && t.schema == schema
        })
    }

    fn templates_for_role(&self, role: RoleId) -> Vec<&AttrTemplate> {
        self.templates.iter().filter(|t| t.role == role).collect()
    }
}
