//! User roles for authorization.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages users as well as every business resource
    Superadmin,
    /// Manages customers, products, sales and subscriptions
    Admin,
    /// Authenticated account without back office access
    User,
}

/// Roles allowed on the business resources.
pub const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::Superadmin];

/// Roles allowed on user management.
pub const SUPERADMIN_ONLY: &[Role] = &[Role::Superadmin];

impl Role {
    pub fn is_allowed(&self, allowed: &[Role]) -> bool {
        allowed.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "superadmin" => Ok(Role::Superadmin),
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
