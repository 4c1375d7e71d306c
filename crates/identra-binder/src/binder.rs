//! Attribute fill/diff engine
//!
//! The [`Binder`] applies a full [`Snapshot`] (create) or a sparse [`Delta`]
//! (update) to an attributable, dispatching between stored, derived, and
//! virtual attributes, and accumulates a [`PropagationPlan`] naming every
//! external resource that must be re-synchronized afterwards. A call either
//! returns the completed plan or fails with one aggregated
//! [`RejectedChanges`](crate::error::RejectedChanges) carrying all invalid
//! values and missing mandatory attributes; on failure the caller discards
//! the in-memory entity.
//!
//! Unknown schema, resource, and template references are never errors: they
//! are dropped with a debug trace, tolerating stale configuration caches on
//! disconnected clients.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::attributable::{Attributable, DerivedAttr, StoredAttr, VirtualAttr};
use crate::error::{BinderResult, RejectedChanges};
use crate::expression::ExpressionEvaluator;
use crate::ids::RoleId;
use crate::mandatory::MandatoryCheck;
use crate::payload::{AttrValues, Delta, Snapshot};
use crate::propagation::{PropagationPlan, ResourceOperation};
use crate::resource::{AttrRef, MappingPurpose};
use crate::schema::{AttrKind, AttributableKind, DerivedSchema, StoredSchema, VirtualSchema};
use crate::store::{MappingResolver, ResourceStore, SchemaStore, TemplateStore};

/// Per-kind behavior, selected once per fill/diff call.
struct KindProfile {
    /// Attributable kind templates must apply to.
    applies_to: AttributableKind,
    /// Role whose templates gate attribute creation. Unset for users, whose
    /// schemas need no template.
    template_role: Option<RoleId>,
    /// Whether the engine maintains virtual attribute caches on update.
    /// For users and roles, virtual values require a live resource read and
    /// are left to the propagation dispatcher.
    virtual_stage: bool,
}

impl KindProfile {
    fn of(attributable: &Attributable) -> Self {
        let applies_to = attributable.kind();
        match applies_to {
            AttributableKind::User => Self {
                applies_to,
                template_role: None,
                virtual_stage: false,
            },
            AttributableKind::Role => Self {
                applies_to,
                template_role: attributable.role(),
                virtual_stage: false,
            },
            AttributableKind::Membership => Self {
                applies_to,
                template_role: attributable.role(),
                virtual_stage: true,
            },
        }
    }
}

/// The attribute binding, constraint-checking, and propagation-planning
/// engine.
///
/// Holds only read-only collaborator references; all entity state lives in
/// the [`Attributable`] passed to each call, all plan state in the returned
/// [`PropagationPlan`]. Concurrent calls for different attributables are
/// safe; calls mutating the same attributable must be serialized by the
/// caller.
pub struct Binder<'a> {
    schemas: &'a dyn SchemaStore,
    resources: &'a dyn ResourceStore,
    templates: &'a dyn TemplateStore,
    mappings: &'a dyn MappingResolver,
    evaluator: &'a ExpressionEvaluator,
}

impl<'a> Binder<'a> {
    /// Create an engine over the given configuration stores.
    pub fn new(
        schemas: &'a dyn SchemaStore,
        resources: &'a dyn ResourceStore,
        templates: &'a dyn TemplateStore,
        mappings: &'a dyn MappingResolver,
        evaluator: &'a ExpressionEvaluator,
    ) -> Self {
        Self {
            schemas,
            resources,
            templates,
            mappings,
            evaluator,
        }
    }

    /// Apply a full snapshot to a freshly created attributable.
    ///
    /// Every value group with at least one non-empty value is resolved
    /// against the schema model; role and membership attributes additionally
    /// need a matching template on the (owning) role. Resources named in the
    /// snapshot are linked and planned for `Create`.
    pub fn fill_from_snapshot(
        &self,
        attributable: &mut Attributable,
        snapshot: &Snapshot,
    ) -> BinderResult<PropagationPlan> {
        let profile = KindProfile::of(attributable);
        let kind = attributable.kind();
        let mut rejected = RejectedChanges::new();
        let mut plan = PropagationPlan::new();

        for group in &snapshot.stored {
            if group.values.iter().all(|v| v.trim().is_empty()) {
                debug!(schema = %group.schema, "ignoring attribute with no values");
                continue;
            }
            let Some(schema) = self.stored_schema_for_write(kind, &group.schema) else {
                continue;
            };
            if !self.template_allows(&profile, AttrKind::Stored, &schema.name) {
                continue;
            }
            let mut attr = StoredAttr::new(&schema.name);
            self.fill_stored_values(schema, &mut attr, &group.values, &mut rejected);
            if attr.is_empty() {
                debug!(schema = %schema.name, "no valid values decoded, dropping attribute");
            } else {
                attributable.add_stored_attr(attr);
            }
        }

        for group in &snapshot.derived {
            let Some(schema) = self.derived_schema(kind, &group.schema) else {
                continue;
            };
            if !self.template_allows(&profile, AttrKind::Derived, &schema.name) {
                continue;
            }
            attributable.add_derived_attr(DerivedAttr::new(&schema.name));
        }

        for group in &snapshot.virtuals {
            let Some(schema) = self.virtual_schema_for_write(kind, &group.schema) else {
                continue;
            };
            if !self.template_allows(&profile, AttrKind::Virtual, &schema.name) {
                continue;
            }
            let mut attr = VirtualAttr::new(&schema.name);
            attr.set_values(
                group
                    .values
                    .iter()
                    .filter(|v| !v.trim().is_empty())
                    .cloned()
                    .collect(),
            );
            attributable.add_virtual_attr(attr);
        }

        for name in &snapshot.resources {
            if self.resources.find(name).is_some() {
                attributable.link_resource(name.clone());
                plan.add(ResourceOperation::Create, name.clone());
            } else {
                debug!(resource = %name, "ignoring unknown resource");
            }
        }

        self.finish(attributable, rejected, plan)
    }

    /// Apply a sparse delta to an existing attributable.
    ///
    /// Operates in six ordered stages: resources to unlink, resources to
    /// link, stored attributes to remove, stored attributes to update,
    /// derived attributes to remove/add, virtual attributes to
    /// remove/update. Each stage plans an operation for every linked
    /// resource whose propagation mapping references the touched schema,
    /// capturing the previous account-id value before it is removed or
    /// replaced.
    pub fn fill_from_delta(
        &self,
        attributable: &mut Attributable,
        delta: &Delta,
    ) -> BinderResult<PropagationPlan> {
        let profile = KindProfile::of(attributable);
        let kind = attributable.kind();
        let mut rejected = RejectedChanges::new();
        let mut plan = PropagationPlan::new();

        // 1. resources to unlink
        for name in &delta.resources_to_remove {
            if self.resources.find(name).is_some() {
                attributable.unlink_resource(name);
                plan.add(ResourceOperation::Delete, name.clone());
            } else {
                debug!(resource = %name, "ignoring unknown resource");
            }
        }

        // 2. resources to link
        for name in &delta.resources_to_add {
            if self.resources.find(name).is_some() {
                attributable.link_resource(name.clone());
                plan.add(ResourceOperation::Create, name.clone());
            } else {
                debug!(resource = %name, "ignoring unknown resource");
            }
        }

        // 3. stored attributes to remove
        for name in &delta.stored_to_remove {
            let Some(schema) = self.stored_schema_for_write(kind, name) else {
                continue;
            };
            let current = attributable
                .stored_attr(&schema.name)
                .and_then(StoredAttr::first_value_as_string);
            self.plan_updates(
                attributable,
                AttrKind::Stored,
                &schema.name,
                current.as_deref(),
                &mut plan,
            );

            if attributable.stored_attr(&schema.name).is_none() {
                debug!(schema = %schema.name, "no attribute to remove");
                continue;
            }

            // a unique value about to be re-added unchanged survives the
            // removal, avoiding a destructive remove-then-add
            let re_added = delta
                .stored_to_update
                .iter()
                .find(|patch| patch.schema == schema.name)
                .and_then(|patch| patch.values_to_add.first());
            if schema.unique_constraint
                && current.is_some()
                && current.as_deref() == re_added.map(String::as_str)
            {
                debug!(schema = %schema.name, "unique value re-added unchanged, keeping attribute");
            } else {
                attributable.remove_stored_attr(&schema.name);
            }
        }

        // 4. stored attributes to update
        for patch in &delta.stored_to_update {
            let Some(schema) = self.stored_schema_for_write(kind, &patch.schema) else {
                continue;
            };
            if attributable.stored_attr(&schema.name).is_none()
                && !self.template_allows(&profile, AttrKind::Stored, &schema.name)
            {
                continue;
            }

            let current = attributable
                .stored_attr(&schema.name)
                .and_then(StoredAttr::first_value_as_string);
            self.plan_updates(
                attributable,
                AttrKind::Stored,
                &schema.name,
                current.as_deref(),
                &mut plan,
            );

            let mut attr = attributable
                .remove_stored_attr(&schema.name)
                .unwrap_or_else(|| StoredAttr::new(&schema.name));

            for raw in &patch.values_to_remove {
                attr.remove_value(raw);
            }

            if !patch.values_to_add.is_empty() {
                let unchanged_unique = schema.unique_constraint
                    && attr.first_value_as_string().as_deref()
                        == patch.values_to_add.first().map(String::as_str);
                if unchanged_unique {
                    debug!(schema = %schema.name, "unique value unchanged, skipping add");
                } else {
                    self.fill_stored_values(schema, &mut attr, &patch.values_to_add, &mut rejected);
                }
            }

            if attr.is_empty() {
                debug!(schema = %schema.name, "attribute left without values, removing");
            } else {
                attributable.add_stored_attr(attr);
            }
        }

        // 5. derived attributes to remove/add
        for name in &delta.derived_to_remove {
            let Some(schema) = self.derived_schema(kind, name) else {
                continue;
            };
            let current = attributable
                .derived_attr(&schema.name)
                .map(|_| self.evaluator.derived_value(&schema.formula, attributable))
                .filter(|v| !v.is_empty());
            self.plan_updates(
                attributable,
                AttrKind::Derived,
                &schema.name,
                current.as_deref(),
                &mut plan,
            );
            if attributable.remove_derived_attr(&schema.name).is_none() {
                debug!(schema = %schema.name, "no attribute to remove");
            }
        }

        for name in &delta.derived_to_add {
            let Some(schema) = self.derived_schema(kind, name) else {
                continue;
            };
            if !self.template_allows(&profile, AttrKind::Derived, &schema.name) {
                continue;
            }
            self.plan_updates(attributable, AttrKind::Derived, &schema.name, None, &mut plan);
            attributable.add_derived_attr(DerivedAttr::new(&schema.name));
        }

        // 6. virtual attributes, memberships only: user and role virtual
        // values require a live resource read performed by the dispatcher
        if profile.virtual_stage {
            for name in &delta.virtual_to_remove {
                let Some(schema) = self.virtual_schema_for_write(kind, name) else {
                    continue;
                };
                let current = attributable
                    .virtual_attr(&schema.name)
                    .and_then(|attr| attr.values().first().cloned());
                self.plan_updates(
                    attributable,
                    AttrKind::Virtual,
                    &schema.name,
                    current.as_deref(),
                    &mut plan,
                );
                if attributable.remove_virtual_attr(&schema.name).is_none() {
                    debug!(schema = %schema.name, "no attribute to remove");
                }
            }

            for patch in &delta.virtual_to_update {
                let Some(schema) = self.virtual_schema_for_write(kind, &patch.schema) else {
                    continue;
                };
                if attributable.virtual_attr(&schema.name).is_none()
                    && !self.template_allows(&profile, AttrKind::Virtual, &schema.name)
                {
                    continue;
                }
                let current = attributable
                    .virtual_attr(&schema.name)
                    .and_then(|attr| attr.values().first().cloned());
                self.plan_updates(
                    attributable,
                    AttrKind::Virtual,
                    &schema.name,
                    current.as_deref(),
                    &mut plan,
                );

                let mut attr = attributable
                    .remove_virtual_attr(&schema.name)
                    .unwrap_or_else(|| VirtualAttr::new(&schema.name));
                for raw in &patch.values_to_remove {
                    attr.remove_value(raw);
                }
                for raw in patch.values_to_add.iter().filter(|r| !r.trim().is_empty()) {
                    attr.push_value(raw.clone());
                }
                // the cache container is kept even when empty
                attributable.add_virtual_attr(attr);
            }
        } else if !delta.virtual_to_remove.is_empty() || !delta.virtual_to_update.is_empty() {
            debug!(kind = %kind, "virtual attribute changes are handled by the propagation dispatcher");
        }

        self.finish(attributable, rejected, plan)
    }

    /// Names of mandatory schemas the entity has no value for.
    pub fn check_mandatory(&self, attributable: &Attributable) -> Vec<String> {
        self.mandatory_check().missing(attributable)
    }

    /// Render an attributable's current state as a snapshot: stored values
    /// in wire form, derived attributes with their computed value, virtual
    /// attributes with their cached values, and linked resource names.
    pub fn snapshot_of(&self, attributable: &Attributable) -> Snapshot {
        Snapshot {
            stored: attributable
                .stored_attrs()
                .map(|attr| AttrValues::new(attr.schema(), attr.values_as_strings()))
                .collect(),
            derived: attributable
                .derived_attrs()
                .map(|attr| {
                    let value = self
                        .schemas
                        .find_derived(attributable.kind(), attr.schema())
                        .map(|schema| self.evaluator.derived_value(&schema.formula, attributable))
                        .unwrap_or_default();
                    AttrValues::new(attr.schema(), vec![value])
                })
                .collect(),
            virtuals: attributable
                .virtual_attrs()
                .map(|attr| AttrValues::new(attr.schema(), attr.values().to_vec()))
                .collect(),
            resources: attributable.resources().map(str::to_string).collect(),
        }
    }

    /// Current account-id value per linked resource, keyed by resource name.
    ///
    /// Resources without an account-id mapping item for the entity's kind,
    /// and account-id attributes without a value, are skipped.
    pub fn account_ids(&self, attributable: &Attributable) -> BTreeMap<String, String> {
        let mut ids = BTreeMap::new();
        for name in attributable.resources() {
            let Some(resource) = self.resources.find(name) else {
                debug!(resource = name, "ignoring unknown linked resource");
                continue;
            };
            let Some(item) = resource.account_id_item(attributable.kind()) else {
                debug!(resource = name, kind = %attributable.kind(), "resource has no account-id mapping");
                continue;
            };
            if let Some(value) = self.mapped_value(attributable, &item.source) {
                ids.insert(resource.name.clone(), value);
            }
        }
        ids
    }

    fn mandatory_check(&self) -> MandatoryCheck<'a> {
        MandatoryCheck {
            schemas: self.schemas,
            resources: self.resources,
            templates: self.templates,
            mappings: self.mappings,
            evaluator: self.evaluator,
        }
    }

    /// Run the mandatory check and fold its findings into the collected
    /// rejections; either the plan or the aggregate comes back.
    fn finish(
        &self,
        attributable: &Attributable,
        mut rejected: RejectedChanges,
        plan: PropagationPlan,
    ) -> BinderResult<PropagationPlan> {
        for name in self.mandatory_check().missing(attributable) {
            rejected.push_missing(name);
        }
        rejected.into_result().map(|()| plan)
    }

    /// Current value of the internal attribute a mapping item reads from.
    fn mapped_value(&self, attributable: &Attributable, source: &AttrRef) -> Option<String> {
        match source {
            AttrRef::Stored { name } => attributable
                .stored_attr(name)
                .and_then(StoredAttr::first_value_as_string),
            AttrRef::Derived { name } => self
                .schemas
                .find_derived(attributable.kind(), name)
                .map(|schema| self.evaluator.derived_value(&schema.formula, attributable))
                .filter(|value| !value.is_empty()),
            AttrRef::Virtual { name } => attributable
                .virtual_attr(name)
                .and_then(|attr| attr.values().first().cloned()),
            AttrRef::Username => attributable.username().map(str::to_string),
        }
    }

    /// Plan `Update` for every linked resource whose propagation mapping
    /// references the touched schema; for account-id items, capture the
    /// previous value so the dispatcher can locate the pre-rename record.
    fn plan_updates(
        &self,
        attributable: &Attributable,
        kind: AttrKind,
        schema: &str,
        old_value: Option<&str>,
        plan: &mut PropagationPlan,
    ) {
        for name in attributable.resources() {
            let Some(resource) = self.resources.find(name) else {
                debug!(resource = name, "ignoring unknown linked resource");
                continue;
            };
            for item in
                self.mappings
                    .items(resource, attributable.kind(), MappingPurpose::Propagation)
            {
                if !item.source.refers_to(kind, schema) {
                    continue;
                }
                plan.add(ResourceOperation::Update, resource.name.clone());
                if item.account_id {
                    if let Some(value) = old_value {
                        plan.set_old_account_id(resource.name.clone(), value);
                    }
                }
            }
        }
    }

    /// Decode provided values into an attribute, honoring the multivalue
    /// flag: single-valued schemas take only the first non-empty provided
    /// value, and a unique constraint implies single-valued. Decode
    /// failures are collected, never raised.
    fn fill_stored_values(
        &self,
        schema: &StoredSchema,
        attr: &mut StoredAttr,
        raws: &[String],
        rejected: &mut RejectedChanges,
    ) {
        if schema.multivalue && !schema.unique_constraint {
            for raw in raws.iter().filter(|r| !r.trim().is_empty()) {
                match schema.decode(raw) {
                    Ok(value) => attr.push_value(value),
                    Err(invalid) => {
                        warn!(schema = %schema.name, value = %invalid.value, reason = %invalid.reason, "rejecting invalid value");
                        rejected.push_invalid(invalid);
                    }
                }
            }
        } else if let Some(raw) = raws.iter().find(|r| !r.trim().is_empty()) {
            match schema.decode(raw) {
                Ok(value) => attr.set_single_value(value),
                Err(invalid) => {
                    warn!(schema = %schema.name, value = %invalid.value, reason = %invalid.reason, "rejecting invalid value");
                    rejected.push_invalid(invalid);
                }
            }
        }
    }

    /// Whether a template on the (owning) role enables the schema for this
    /// entity. Users need no template.
    fn template_allows(&self, profile: &KindProfile, kind: AttrKind, schema: &str) -> bool {
        if profile.applies_to == AttributableKind::User {
            return true;
        }
        let allowed = profile
            .template_role
            .is_some_and(|role| {
                self.templates
                    .find(role, profile.applies_to, kind, schema)
                    .is_some()
            });
        if !allowed {
            debug!(schema, kind = %kind, "ignoring attribute with no template on the role");
        }
        allowed
    }

    fn stored_schema_for_write(
        &self,
        kind: AttributableKind,
        name: &str,
    ) -> Option<&'a StoredSchema> {
        match self.schemas.find_stored(kind, name) {
            None => {
                debug!(schema = name, %kind, "ignoring unknown stored schema");
                None
            }
            Some(schema) if schema.readonly => {
                debug!(schema = name, "ignoring read-only stored schema");
                None
            }
            schema => schema,
        }
    }

    fn derived_schema(&self, kind: AttributableKind, name: &str) -> Option<&'a DerivedSchema> {
        let schema = self.schemas.find_derived(kind, name);
        if schema.is_none() {
            debug!(schema = name, %kind, "ignoring unknown derived schema");
        }
        schema
    }

    fn virtual_schema_for_write(
        &self,
        kind: AttributableKind,
        name: &str,
    ) -> Option<&'a VirtualSchema> {
        match self.schemas.find_virtual(kind, name) {
            None => {
                debug!(schema = name, %kind, "ignoring unknown virtual schema");
                None
            }
            Some(schema) if schema.readonly => {
                debug!(schema = name, "ignoring read-only virtual schema");
                None
            }
            schema => schema,
        }
    }
}
