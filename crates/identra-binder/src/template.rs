//! Attribute templates
//!
//! A template associates a schema with a role, making the schema available
//! either to the role itself or to the role's memberships. Role and
//! membership attributes supplied without a matching template are silently
//! dropped by the fill engine.

use serde::{Deserialize, Serialize};

use crate::ids::RoleId;
use crate::schema::{AttrKind, AttributableKind};

/// Association of a schema to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrTemplate {
    /// The role carrying the template.
    pub role: RoleId,

    /// Which attribute kind the template enables.
    pub kind: AttrKind,

    /// Name of the enabled schema.
    pub schema: String,

    /// Whether the template enables the schema on the role itself or on the
    /// role's memberships.
    pub applies_to: AttributableKind,
}

impl AttrTemplate {
    /// Enable a schema on the role itself.
    pub fn for_role(role: RoleId, kind: AttrKind, schema: impl Into<String>) -> Self {
        Self {
            role,
            kind,
            schema: schema.into(),
            applies_to: AttributableKind::Role,
        }
    }

    /// Enable a schema on the role's memberships.
    pub fn for_memberships(role: RoleId, kind: AttrKind, schema: impl Into<String>) -> Self {
        Self {
            role,
            kind,
            schema: schema.into(),
            applies_to: AttributableKind::Membership,
        }
    }
}
