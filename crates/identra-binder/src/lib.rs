//! # identra-binder
//!
//! Attribute binding, constraint checking, and propagation planning for
//! identra's identity model.
//!
//! An attributable entity (user, role, or membership) carries attributes of
//! three kinds: stored values kept locally, derived values computed from
//! stored attributes through a formula, and virtual values materialized only
//! on external resources. This crate owns the logic that applies incoming
//! create/update requests to such an entity, enforces cross-resource
//! mandatory-attribute policy through a small conditional-expression
//! language, and computes, as a side effect of every mutation, the exact set
//! of external resources that must be re-synchronized.
//!
//! ## Architecture
//!
//! - [`binder::Binder`] - the fill/diff engine applying snapshots and deltas
//! - [`propagation::PropagationPlan`] - per-resource operations accumulated
//!   during a fill/diff call
//! - [`expression::ExpressionEvaluator`] - sandboxed Rhai evaluation of
//!   mandatory conditions and derived formulas
//! - [`store`] - read-only configuration traits (schemas, resources,
//!   templates, mapping resolution) with embeddable in-memory
//!   implementations
//!
//! A fill/diff call is atomic from the caller's perspective: it either
//! returns a completed plan or fails with one aggregated error listing every
//! invalid value and missing mandatory attribute, and the caller discards
//! the in-memory entity.
//!
//! ## Example
//!
//! ```ignore
//! use identra_binder::prelude::*;
//!
//! let binder = Binder::new(&schemas, &resources, &templates, &resolver, &evaluator);
//!
//! let mut user = Attributable::new_user("alice");
//! let snapshot = Snapshot {
//!     stored: vec![AttrValues::new("email", ["alice@example.com"])],
//!     resources: vec!["ldap".to_string()],
//!     ..Snapshot::default()
//! };
//!
//! let plan = binder.fill_from_snapshot(&mut user, &snapshot)?;
//! for (resource, operation) in plan.iter() {
//!     dispatch(resource, operation);
//! }
//! ```
//!
//! ## Crate Organization
//!
//! - [`ids`] - type-safe identifiers (`EntityId`, `RoleId`)
//! - [`schema`] - stored/derived/virtual schema definitions
//! - [`value`] - typed stored-value decoding and validation
//! - [`attributable`] - entities and attribute instances
//! - [`template`] - role-scoped schema enablement
//! - [`resource`] - external resources and attribute mappings
//! - [`payload`] - snapshot and delta inputs
//! - [`error`] - invalid-value and aggregated rejection types

pub mod attributable;
pub mod binder;
pub mod error;
pub mod expression;
pub mod ids;
mod mandatory;
pub mod payload;
pub mod propagation;
pub mod resource;
pub mod schema;
pub mod store;
pub mod template;
pub mod value;

/// Prelude module for convenient imports.
///
/// ```
/// use identra_binder::prelude::*;
/// ```
pub mod prelude {
    // IDs
    pub use crate::ids::{EntityId, RoleId};

    // Model
    pub use crate::attributable::{Attributable, DerivedAttr, StoredAttr, VirtualAttr};
    pub use crate::schema::{
        AttrKind, AttributableKind, DerivedSchema, StoredSchema, VirtualSchema,
    };
    pub use crate::template::AttrTemplate;
    pub use crate::value::{AttrValueType, StoredValue};

    // Resources and mappings
    pub use crate::resource::{AttrRef, ExternalResource, MappingItem, MappingPurpose};

    // Error handling
    pub use crate::error::{BinderResult, InvalidValue, RegistrationError, RejectedChanges};

    // Expressions
    pub use crate::expression::{EvalContext, EvaluatorConfig, ExpressionEvaluator};

    // Payloads and planning
    pub use crate::payload::{AttrPatch, AttrValues, Delta, Snapshot};
    pub use crate::propagation::{PropagationPlan, ResourceOperation};

    // Engine and stores
    pub use crate::binder::Binder;
    pub use crate::store::{
        DirectMappingResolver, InMemoryResourceStore, InMemorySchemaStore, InMemoryTemplateStore,
        MappingResolver, ResourceStore, SchemaStore, TemplateStore,
    };
}
