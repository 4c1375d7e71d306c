//! Integration tests for the attribute fill/diff engine.
//!
//! Each test builds its own configuration fixture (schemas, resources,
//! templates) and drives the engine through the public snapshot/delta
//! entry points.

use identra_binder::prelude::*;

/// Configuration fixture backing one test scenario.
struct Fixture {
    schemas: InMemorySchemaStore,
    resources: InMemoryResourceStore,
    templates: InMemoryTemplateStore,
    resolver: DirectMappingResolver,
    evaluator: ExpressionEvaluator,
}

impl Fixture {
    fn new() -> Self {
        Self {
            schemas: InMemorySchemaStore::new(),
            resources: InMemoryResourceStore::new(),
            templates: InMemoryTemplateStore::new(),
            resolver: DirectMappingResolver::new(),
            evaluator: ExpressionEvaluator::new(),
        }
    }

    fn binder(&self) -> Binder<'_> {
        Binder::new(
            &self.schemas,
            &self.resources,
            &self.templates,
            &self.resolver,
            &self.evaluator,
        )
    }

    fn user_stored(&mut self, schema: StoredSchema) {
        self.schemas
            .register_stored(AttributableKind::User, schema)
            .expect("schema should register");
    }

    fn resource(&mut self, resource: ExternalResource) {
        self.resources
            .register(resource)
            .expect("resource should register");
    }
}

fn no_values() -> Vec<String> {
    Vec::new()
}

// ============================================================================
// Snapshot fill
// ============================================================================

#[test]
fn test_snapshot_creates_attributes_and_links_resources() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("email", AttrValueType::String));
    fix.user_stored(StoredSchema::new("age", AttrValueType::Long));
    fix.user_stored(StoredSchema::new("phone", AttrValueType::String).multivalued());
    fix.schemas
        .register_derived(
            AttributableKind::User,
            DerivedSchema::new("shout", "email + \"!\""),
        )
        .unwrap();
    fix.schemas
        .register_virtual(AttributableKind::User, VirtualSchema::new("mailbox"))
        .unwrap();
    fix.resource(ExternalResource::new("ldap").with_mapping(
        AttributableKind::User,
        vec![
            MappingItem::new(AttrRef::Username, "uid").account_id(),
            MappingItem::new(AttrRef::stored("email"), "mail"),
        ],
    ));

    let mut user = Attributable::new_user("alice");
    let snapshot = Snapshot {
        stored: vec![
            AttrValues::new("email", ["alice@example.com"]),
            AttrValues::new("age", ["30"]),
            AttrValues::new("phone", ["111", "222"]),
        ],
        derived: vec![AttrValues::new("shout", no_values())],
        virtuals: vec![AttrValues::new("mailbox", ["inbox"])],
        resources: vec!["ldap".to_string()],
    };

    let plan = fix
        .binder()
        .fill_from_snapshot(&mut user, &snapshot)
        .expect("snapshot should apply");

    assert_eq!(
        user.stored_attr("email").unwrap().values_as_strings(),
        vec!["alice@example.com".to_string()]
    );
    assert_eq!(
        user.stored_attr("age").unwrap().values_as_strings(),
        vec!["30".to_string()]
    );
    assert_eq!(
        user.stored_attr("phone").unwrap().values_as_strings(),
        vec!["111".to_string(), "222".to_string()]
    );
    assert!(user.derived_attr("shout").is_some());
    assert_eq!(user.virtual_attr("mailbox").unwrap().values(), ["inbox"]);
    assert!(user.has_resource("ldap"));
    assert_eq!(plan.operation("ldap"), Some(ResourceOperation::Create));
}

/// Applying the same snapshot twice yields the same attribute set, with no
/// duplicate attributes or values.
#[test]
fn test_snapshot_refill_is_idempotent() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("email", AttrValueType::String));
    fix.user_stored(StoredSchema::new("phone", AttrValueType::String).multivalued());
    fix.resource(ExternalResource::new("ldap").with_mapping(
        AttributableKind::User,
        vec![MappingItem::new(AttrRef::Username, "uid").account_id()],
    ));

    let snapshot = Snapshot {
        stored: vec![
            AttrValues::new("email", ["alice@example.com"]),
            AttrValues::new("phone", ["111", "222"]),
        ],
        resources: vec!["ldap".to_string()],
        ..Snapshot::default()
    };

    let mut user = Attributable::new_user("alice");
    let binder = fix.binder();
    binder.fill_from_snapshot(&mut user, &snapshot).unwrap();
    let after_first = binder.snapshot_of(&user);

    binder.fill_from_snapshot(&mut user, &snapshot).unwrap();
    let after_second = binder.snapshot_of(&user);

    assert_eq!(after_first, after_second);
    assert_eq!(user.stored_attrs().count(), 2);
}

#[test]
fn test_single_valued_schema_takes_first_nonempty_value() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("email", AttrValueType::String));

    let mut user = Attributable::new_user("alice");
    let snapshot = Snapshot {
        stored: vec![AttrValues::new("email", ["", "first@example.com", "second@example.com"])],
        ..Snapshot::default()
    };

    fix.binder().fill_from_snapshot(&mut user, &snapshot).unwrap();

    assert_eq!(
        user.stored_attr("email").unwrap().values_as_strings(),
        vec!["first@example.com".to_string()]
    );
}

/// Unknown schema and resource references are tolerated: the entries are
/// dropped, the rest of the snapshot applies.
#[test]
fn test_unknown_references_silently_dropped() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("email", AttrValueType::String));

    let mut user = Attributable::new_user("alice");
    let snapshot = Snapshot {
        stored: vec![
            AttrValues::new("email", ["alice@example.com"]),
            AttrValues::new("no_such_schema", ["x"]),
        ],
        resources: vec!["no_such_resource".to_string()],
        ..Snapshot::default()
    };

    let plan = fix.binder().fill_from_snapshot(&mut user, &snapshot).unwrap();

    assert!(user.stored_attr("email").is_some());
    assert!(user.stored_attr("no_such_schema").is_none());
    assert!(!user.has_resource("no_such_resource"));
    assert!(plan.is_empty());
}

#[test]
fn test_readonly_schema_not_writable() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("badge_serial", AttrValueType::String).readonly());

    let mut user = Attributable::new_user("alice");
    let snapshot = Snapshot {
        stored: vec![AttrValues::new("badge_serial", ["S-1"])],
        ..Snapshot::default()
    };

    fix.binder().fill_from_snapshot(&mut user, &snapshot).unwrap();

    assert!(user.stored_attr("badge_serial").is_none());
}

/// One invalid value fails the whole snapshot even though every other
/// attribute applied cleanly.
#[test]
fn test_invalid_value_rejects_whole_snapshot() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("email", AttrValueType::String));
    fix.user_stored(StoredSchema::new("age", AttrValueType::Long));

    let mut user = Attributable::new_user("alice");
    let snapshot = Snapshot {
        stored: vec![
            AttrValues::new("email", ["alice@example.com"]),
            AttrValues::new("age", ["thirty"]),
        ],
        ..Snapshot::default()
    };

    let err = fix
        .binder()
        .fill_from_snapshot(&mut user, &snapshot)
        .unwrap_err();

    assert_eq!(err.invalid_values.len(), 1);
    assert_eq!(err.invalid_values[0].schema, "age");
    assert!(err.missing_mandatory.is_empty());
}

#[test]
fn test_schema_mandatory_condition_enforced_on_create() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("email", AttrValueType::String));
    fix.user_stored(StoredSchema::new("surname", AttrValueType::String).with_mandatory_condition("true"));

    let mut user = Attributable::new_user("alice");
    let snapshot = Snapshot {
        stored: vec![AttrValues::new("email", ["alice@example.com"])],
        ..Snapshot::default()
    };

    let err = fix
        .binder()
        .fill_from_snapshot(&mut user, &snapshot)
        .unwrap_err();

    assert_eq!(err.missing_mandatory, vec!["surname".to_string()]);
}

// ============================================================================
// Delta: resources
// ============================================================================

/// Given a user linked to r2
/// When a delta adds r1 and removes r2
/// Then the plan is {r1: Create, r2: Delete} and the link set follows
#[test]
fn test_resource_link_unlink_plan() {
    let mut fix = Fixture::new();
    fix.resource(ExternalResource::new("r1"));
    fix.resource(ExternalResource::new("r2"));

    let mut user = Attributable::new_user("alice");
    user.link_resource("r2");

    let delta = Delta {
        resources_to_add: vec!["r1".to_string()],
        resources_to_remove: vec!["r2".to_string()],
        ..Delta::default()
    };

    let plan = fix.binder().fill_from_delta(&mut user, &delta).unwrap();

    assert_eq!(plan.operation("r1"), Some(ResourceOperation::Create));
    assert_eq!(plan.operation("r2"), Some(ResourceOperation::Delete));
    assert!(user.has_resource("r1"));
    assert!(!user.has_resource("r2"));
}

// ============================================================================
// Delta: stored attributes
// ============================================================================

#[test]
fn test_update_plans_update_for_mapped_resources() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("email", AttrValueType::String));
    fix.resource(ExternalResource::new("ldap").with_mapping(
        AttributableKind::User,
        vec![
            MappingItem::new(AttrRef::Username, "uid").account_id(),
            MappingItem::new(AttrRef::stored("email"), "mail"),
        ],
    ));
    fix.resource(ExternalResource::new("unrelated"));

    let mut user = Attributable::new_user("alice");
    let binder = fix.binder();
    binder
        .fill_from_snapshot(
            &mut user,
            &Snapshot {
                stored: vec![AttrValues::new("email", ["old@example.com"])],
                resources: vec!["ldap".to_string(), "unrelated".to_string()],
                ..Snapshot::default()
            },
        )
        .unwrap();

    let delta = Delta {
        stored_to_update: vec![AttrPatch::new("email")
            .add("new@example.com")
            .remove("old@example.com")],
        ..Delta::default()
    };
    let plan = binder.fill_from_delta(&mut user, &delta).unwrap();

    assert_eq!(plan.operation("ldap"), Some(ResourceOperation::Update));
    assert_eq!(plan.operation("unrelated"), None);
    // the account-id maps the username, not the email: nothing to capture
    assert_eq!(plan.old_account_id("ldap"), None);
    assert_eq!(
        user.stored_attr("email").unwrap().values_as_strings(),
        vec!["new@example.com".to_string()]
    );
}

/// Given resource ldap whose account-id maps the `login` schema
/// When a delta changes `login` from "alice" to "alice2"
/// Then the plan is {ldap: Update} with old account-id "alice"
#[test]
fn test_account_id_rename_captures_old_value() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("login", AttrValueType::String).unique());
    fix.resource(ExternalResource::new("ldap").with_mapping(
        AttributableKind::User,
        vec![MappingItem::new(AttrRef::stored("login"), "uid").account_id()],
    ));

    let mut user = Attributable::new_user("alice");
    let binder = fix.binder();
    binder
        .fill_from_snapshot(
            &mut user,
            &Snapshot {
                stored: vec![AttrValues::new("login", ["alice"])],
                resources: vec!["ldap".to_string()],
                ..Snapshot::default()
            },
        )
        .unwrap();

    let delta = Delta {
        stored_to_update: vec![AttrPatch::new("login").add("alice2").remove("alice")],
        ..Delta::default()
    };
    let plan = binder.fill_from_delta(&mut user, &delta).unwrap();

    assert_eq!(plan.operation("ldap"), Some(ResourceOperation::Update));
    assert_eq!(plan.old_account_id("ldap"), Some("alice"));
    assert_eq!(
        user.stored_attr("login").unwrap().values_as_strings(),
        vec!["alice2".to_string()]
    );
}

/// A whole-attribute removal paired with a re-add of the same unique value
/// must not destroy the attribute.
#[test]
fn test_remove_then_readd_unchanged_unique_value_keeps_attribute() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("badge", AttrValueType::String).unique());

    let mut user = Attributable::new_user("alice");
    let binder = fix.binder();
    binder
        .fill_from_snapshot(
            &mut user,
            &Snapshot {
                stored: vec![AttrValues::new("badge", ["b-1"])],
                ..Snapshot::default()
            },
        )
        .unwrap();

    let delta = Delta {
        stored_to_remove: vec!["badge".to_string()],
        stored_to_update: vec![AttrPatch::new("badge").add("b-1")],
        ..Delta::default()
    };
    binder.fill_from_delta(&mut user, &delta).unwrap();

    assert_eq!(
        user.stored_attr("badge").unwrap().values_as_strings(),
        vec!["b-1".to_string()]
    );
}

#[test]
fn test_unique_value_replaced_without_duplication() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("badge", AttrValueType::String).unique());

    let mut user = Attributable::new_user("alice");
    let binder = fix.binder();
    binder
        .fill_from_snapshot(
            &mut user,
            &Snapshot {
                stored: vec![AttrValues::new("badge", ["b-1"])],
                ..Snapshot::default()
            },
        )
        .unwrap();

    let delta = Delta {
        stored_to_update: vec![AttrPatch::new("badge").add("b-2")],
        ..Delta::default()
    };
    binder.fill_from_delta(&mut user, &delta).unwrap();

    assert_eq!(
        user.stored_attr("badge").unwrap().values_as_strings(),
        vec!["b-2".to_string()]
    );
}

#[test]
fn test_value_level_remove_then_add_same_unique_value() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("badge", AttrValueType::String).unique());

    let mut user = Attributable::new_user("alice");
    let binder = fix.binder();
    binder
        .fill_from_snapshot(
            &mut user,
            &Snapshot {
                stored: vec![AttrValues::new("badge", ["b-1"])],
                ..Snapshot::default()
            },
        )
        .unwrap();

    let delta = Delta {
        stored_to_update: vec![AttrPatch::new("badge").add("b-1").remove("b-1")],
        ..Delta::default()
    };
    binder.fill_from_delta(&mut user, &delta).unwrap();

    assert_eq!(
        user.stored_attr("badge").unwrap().values_as_strings(),
        vec!["b-1".to_string()]
    );
}

/// An attribute left without values after an update is not retained.
#[test]
fn test_empty_attribute_removed_after_update() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("phone", AttrValueType::String).multivalued());

    let mut user = Attributable::new_user("alice");
    let binder = fix.binder();
    binder
        .fill_from_snapshot(
            &mut user,
            &Snapshot {
                stored: vec![AttrValues::new("phone", ["111"])],
                ..Snapshot::default()
            },
        )
        .unwrap();

    let delta = Delta {
        stored_to_update: vec![AttrPatch::new("phone").remove("111")],
        ..Delta::default()
    };
    binder.fill_from_delta(&mut user, &delta).unwrap();

    assert!(user.stored_attr("phone").is_none());
}

/// A delta that both supplies an invalid value for one schema and leaves a
/// mandatory schema without a value reports both problems in one error.
#[test]
fn test_aggregates_invalid_and_missing() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("age", AttrValueType::Long));
    fix.user_stored(StoredSchema::new("surname", AttrValueType::String).with_mandatory_condition("true"));

    let mut user = Attributable::new_user("alice");
    let delta = Delta {
        stored_to_update: vec![AttrPatch::new("age").add("thirty")],
        ..Delta::default()
    };

    let err = fix.binder().fill_from_delta(&mut user, &delta).unwrap_err();

    assert_eq!(err.invalid_values.len(), 1);
    assert_eq!(err.invalid_values[0].schema, "age");
    assert_eq!(err.missing_mandatory, vec!["surname".to_string()]);
}

// ============================================================================
// Templates
// ============================================================================

/// A membership attribute whose schema is not templated on the owning role
/// is silently dropped.
#[test]
fn test_membership_attribute_without_template_dropped() {
    let mut fix = Fixture::new();
    fix.schemas
        .register_stored(
            AttributableKind::Membership,
            StoredSchema::new("seat", AttrValueType::String),
        )
        .unwrap();

    let role = RoleId::new();
    let delta = Delta {
        stored_to_update: vec![AttrPatch::new("seat").add("12A")],
        ..Delta::default()
    };

    let mut membership = Attributable::new_membership(role);
    fix.binder().fill_from_delta(&mut membership, &delta).unwrap();
    assert!(membership.stored_attr("seat").is_none());

    // the same delta applies once the role carries a template
    fix.templates
        .register(AttrTemplate::for_memberships(role, AttrKind::Stored, "seat"));
    let mut membership = Attributable::new_membership(role);
    fix.binder().fill_from_delta(&mut membership, &delta).unwrap();
    assert_eq!(
        membership.stored_attr("seat").unwrap().values_as_strings(),
        vec!["12A".to_string()]
    );
}

#[test]
fn test_role_attribute_template_gating() {
    let mut fix = Fixture::new();
    fix.schemas
        .register_stored(
            AttributableKind::Role,
            StoredSchema::new("cost_center", AttrValueType::String),
        )
        .unwrap();

    let role_id = RoleId::new();
    let snapshot = Snapshot {
        stored: vec![AttrValues::new("cost_center", ["cc-7"])],
        ..Snapshot::default()
    };

    let mut role = Attributable::new_role(role_id);
    fix.binder().fill_from_snapshot(&mut role, &snapshot).unwrap();
    assert!(role.stored_attr("cost_center").is_none());

    fix.templates
        .register(AttrTemplate::for_role(role_id, AttrKind::Stored, "cost_center"));
    let mut role = Attributable::new_role(role_id);
    fix.binder().fill_from_snapshot(&mut role, &snapshot).unwrap();
    assert_eq!(
        role.stored_attr("cost_center").unwrap().values_as_strings(),
        vec!["cc-7".to_string()]
    );
}

// ============================================================================
// Derived attributes
// ============================================================================

#[test]
fn test_derived_removal_captures_computed_account_id() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("surname", AttrValueType::String));
    fix.schemas
        .register_derived(
            AttributableKind::User,
            DerivedSchema::new("display", "surname + \"-d\""),
        )
        .unwrap();
    fix.resource(ExternalResource::new("crm").with_mapping(
        AttributableKind::User,
        vec![MappingItem::new(AttrRef::derived("display"), "cn").account_id()],
    ));

    let mut user = Attributable::new_user("alice");
    let binder = fix.binder();
    binder
        .fill_from_snapshot(
            &mut user,
            &Snapshot {
                stored: vec![AttrValues::new("surname", ["Doe"])],
                derived: vec![AttrValues::new("display", no_values())],
                resources: vec!["crm".to_string()],
                ..Snapshot::default()
            },
        )
        .unwrap();

    let delta = Delta {
        derived_to_remove: vec!["display".to_string()],
        ..Delta::default()
    };
    let plan = binder.fill_from_delta(&mut user, &delta).unwrap();

    assert!(user.derived_attr("display").is_none());
    assert_eq!(plan.operation("crm"), Some(ResourceOperation::Update));
    assert_eq!(plan.old_account_id("crm"), Some("Doe-d"));

    // re-adding the binding plans another update
    let delta = Delta {
        derived_to_add: vec!["display".to_string()],
        ..Delta::default()
    };
    let plan = binder.fill_from_delta(&mut user, &delta).unwrap();
    assert!(user.derived_attr("display").is_some());
    assert_eq!(plan.operation("crm"), Some(ResourceOperation::Update));
}

#[test]
fn test_snapshot_of_renders_derived_value() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("surname", AttrValueType::String));
    fix.schemas
        .register_derived(
            AttributableKind::User,
            DerivedSchema::new("display", "surname + \"-d\""),
        )
        .unwrap();

    let mut user = Attributable::new_user("alice");
    let binder = fix.binder();
    binder
        .fill_from_snapshot(
            &mut user,
            &Snapshot {
                stored: vec![AttrValues::new("surname", ["Doe"])],
                derived: vec![AttrValues::new("display", no_values())],
                ..Snapshot::default()
            },
        )
        .unwrap();

    let rendered = binder.snapshot_of(&user);

    assert_eq!(
        rendered.stored,
        vec![AttrValues::new("surname", ["Doe"])]
    );
    assert_eq!(
        rendered.derived,
        vec![AttrValues::new("display", ["Doe-d"])]
    );
}

// ============================================================================
// Virtual attributes
// ============================================================================

/// User virtual values come from a live resource read; the delta stage is
/// the dispatcher's job, not the engine's.
#[test]
fn test_virtual_stage_skipped_for_users() {
    let mut fix = Fixture::new();
    fix.schemas
        .register_virtual(AttributableKind::User, VirtualSchema::new("mailbox"))
        .unwrap();

    let mut user = Attributable::new_user("alice");
    let delta = Delta {
        virtual_to_update: vec![AttrPatch::new("mailbox").add("inbox")],
        ..Delta::default()
    };

    let plan = fix.binder().fill_from_delta(&mut user, &delta).unwrap();

    assert!(user.virtual_attr("mailbox").is_none());
    assert!(plan.is_empty());
}

#[test]
fn test_membership_virtual_update_maintains_cache() {
    let mut fix = Fixture::new();
    fix.schemas
        .register_virtual(AttributableKind::Membership, VirtualSchema::new("groups"))
        .unwrap();
    let role = RoleId::new();
    fix.templates
        .register(AttrTemplate::for_memberships(role, AttrKind::Virtual, "groups"));
    fix.resource(ExternalResource::new("dir").with_mapping(
        AttributableKind::Membership,
        vec![MappingItem::new(AttrRef::virtual_("groups"), "memberOf").account_id()],
    ));

    let mut membership = Attributable::new_membership(role);
    let binder = fix.binder();
    binder
        .fill_from_snapshot(
            &mut membership,
            &Snapshot {
                virtuals: vec![AttrValues::new("groups", ["g1"])],
                resources: vec!["dir".to_string()],
                ..Snapshot::default()
            },
        )
        .unwrap();

    let delta = Delta {
        virtual_to_update: vec![AttrPatch::new("groups").add("g2").remove("g1")],
        ..Delta::default()
    };
    let plan = binder.fill_from_delta(&mut membership, &delta).unwrap();

    assert_eq!(membership.virtual_attr("groups").unwrap().values(), ["g2"]);
    assert_eq!(plan.operation("dir"), Some(ResourceOperation::Update));
    assert_eq!(plan.old_account_id("dir"), Some("g1"));
}

// ============================================================================
// Conditional mandatory via resource
// ============================================================================

/// A schema optional in isolation becomes required the moment the entity is
/// linked to an enforcing resource whose mapping condition holds.
#[test]
fn test_conditional_mandatory_via_resource() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("employee_id", AttrValueType::String));
    fix.resource(
        ExternalResource::new("hr")
            .enforce_mandatory()
            .with_mapping(
                AttributableKind::User,
                vec![
                    MappingItem::new(AttrRef::Username, "uid").account_id(),
                    MappingItem::new(AttrRef::stored("employee_id"), "emp_id")
                        .with_mandatory_condition("true"),
                ],
            ),
    );

    let mut user = Attributable::new_user("alice");
    user.link_resource("hr");

    let binder = fix.binder();
    assert_eq!(binder.check_mandatory(&user), vec!["employee_id".to_string()]);

    user.unlink_resource("hr");
    assert!(binder.check_mandatory(&user).is_empty());
}

/// The mapping condition is not enforced when the resource does not ask for
/// mandatory enforcement.
#[test]
fn test_mapping_condition_inert_without_enforcement() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("employee_id", AttrValueType::String));
    fix.resource(ExternalResource::new("hr").with_mapping(
        AttributableKind::User,
        vec![
            MappingItem::new(AttrRef::Username, "uid").account_id(),
            MappingItem::new(AttrRef::stored("employee_id"), "emp_id")
                .with_mandatory_condition("true"),
        ],
    ));

    let mut user = Attributable::new_user("alice");
    user.link_resource("hr");

    assert!(fix.binder().check_mandatory(&user).is_empty());
}

// ============================================================================
// Account-id rendering
// ============================================================================

#[test]
fn test_account_ids_resolve_per_resource() {
    let mut fix = Fixture::new();
    fix.user_stored(StoredSchema::new("login", AttrValueType::String).unique());
    fix.resource(ExternalResource::new("ldap").with_mapping(
        AttributableKind::User,
        vec![MappingItem::new(AttrRef::Username, "uid").account_id()],
    ));
    fix.resource(ExternalResource::new("db").with_mapping(
        AttributableKind::User,
        vec![MappingItem::new(AttrRef::stored("login"), "username").account_id()],
    ));

    let mut user = Attributable::new_user("alice");
    let binder = fix.binder();
    binder
        .fill_from_snapshot(
            &mut user,
            &Snapshot {
                stored: vec![AttrValues::new("login", ["al"])],
                resources: vec!["ldap".to_string(), "db".to_string()],
                ..Snapshot::default()
            },
        )
        .unwrap();

    let ids = binder.account_ids(&user);

    assert_eq!(ids.get("ldap").map(String::as_str), Some("alice"));
    assert_eq!(ids.get("db").map(String::as_str), Some("al"));
}
