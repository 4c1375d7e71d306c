//! Mandatory-attribute checking
//!
//! A schema is reported missing when the entity carries no attribute for it
//! and either the schema's own mandatory condition holds, or any linked
//! resource with mandatory enforcement maps the schema through a propagation
//! item whose condition holds. A value can therefore be optional in
//! isolation yet required the moment the entity is linked to a resource
//! that depends on it.

use tracing::{debug, error};

use crate::attributable::Attributable;
use crate::expression::{EvalContext, ExpressionEvaluator};
use crate::resource::MappingPurpose;
use crate::schema::{AttrKind, AttributableKind};
use crate::store::{MappingResolver, ResourceStore, SchemaStore, TemplateStore};

/// Read-only collaborators the check runs against.
pub(crate) struct MandatoryCheck<'a> {
    pub schemas: &'a dyn SchemaStore,
    pub resources: &'a dyn ResourceStore,
    pub templates: &'a dyn TemplateStore,
    pub mappings: &'a dyn MappingResolver,
    pub evaluator: &'a ExpressionEvaluator,
}

impl MandatoryCheck<'_> {
    /// Names of mandatory schemas the entity has no value for.
    pub(crate) fn missing(&self, attributable: &Attributable) -> Vec<String> {
        let ctx = self.eval_context(attributable);
        let mut missing = Vec::new();

        for schema in self.schemas.stored_schemas(attributable.kind()) {
            if attributable.stored_attr(&schema.name).is_some()
                || schema.readonly
                || !self.in_effective_set(attributable, AttrKind::Stored, &schema.name)
            {
                continue;
            }
            if self
                .evaluator
                .mandatory(schema.mandatory_condition.as_deref(), &ctx)
                || self.required_by_resource(attributable, AttrKind::Stored, &schema.name, &ctx)
            {
                error!(schema = %schema.name, "mandatory stored attribute has no value");
                missing.push(schema.name.clone());
            }
        }

        // Derived schemas carry no condition of their own; only a resource
        // mapping can make them mandatory. Implicitly read-only, so no
        // read-only gate either.
        for schema in self.schemas.derived_schemas(attributable.kind()) {
            if attributable.derived_attr(&schema.name).is_some()
                || !self.in_effective_set(attributable, AttrKind::Derived, &schema.name)
            {
                continue;
            }
            if self.required_by_resource(attributable, AttrKind::Derived, &schema.name, &ctx) {
                error!(schema = %schema.name, "mandatory derived attribute has no value");
                missing.push(schema.name.clone());
            }
        }

        for schema in self.schemas.virtual_schemas(attributable.kind()) {
            if attributable.virtual_attr(&schema.name).is_some()
                || schema.readonly
                || !self.in_effective_set(attributable, AttrKind::Virtual, &schema.name)
            {
                continue;
            }
            if self
                .evaluator
                .mandatory(schema.mandatory_condition.as_deref(), &ctx)
                || self.required_by_resource(attributable, AttrKind::Virtual, &schema.name, &ctx)
            {
                error!(schema = %schema.name, "mandatory virtual attribute has no value");
                missing.push(schema.name.clone());
            }
        }

        missing
    }

    /// Expression context over the entity's stored, derived, and virtual
    /// attribute values.
    pub(crate) fn eval_context(&self, attributable: &Attributable) -> EvalContext {
        let mut ctx = EvalContext::stored_of(attributable);
        for attr in attributable.derived_attrs() {
            if let Some(schema) = self
                .schemas
                .find_derived(attributable.kind(), attr.schema())
            {
                let value = self.evaluator.derived_value(&schema.formula, attributable);
                ctx.set(attr.schema(), vec![value]);
            }
        }
        for attr in attributable.virtual_attrs() {
            ctx.set(attr.schema(), attr.values().to_vec());
        }
        ctx
    }

    /// Whether the schema applies to this entity at all: users see every
    /// schema of their kind, roles and memberships only those enabled
    /// through a template on the (owning) role.
    fn in_effective_set(
        &self,
        attributable: &Attributable,
        kind: AttrKind,
        schema: &str,
    ) -> bool {
        match attributable.kind() {
            AttributableKind::User => true,
            applies_to => match attributable.role() {
                Some(role) => self
                    .templates
                    .find(role, applies_to, kind, schema)
                    .is_some(),
                None => false,
            },
        }
    }

    /// Whether any linked resource with mandatory enforcement maps the
    /// schema through a propagation item whose condition holds. Stops at
    /// the first resource that does; the report is binary.
    fn required_by_resource(
        &self,
        attributable: &Attributable,
        kind: AttrKind,
        schema: &str,
        ctx: &EvalContext,
    ) -> bool {
        for name in attributable.resources() {
            let Some(resource) = self.resources.find(name) else {
                debug!(resource = name, "ignoring unknown linked resource");
                continue;
            };
            if !resource.enforce_mandatory {
                continue;
            }
            for item in
                self.mappings
                    .items(resource, attributable.kind(), MappingPurpose::Propagation)
            {
                if item.source.refers_to(kind, schema)
                    && self
                        .evaluator
                        .mandatory(item.mandatory_condition.as_deref(), ctx)
                {
                    return true;
                }
            }
        }
        false
    }
}
