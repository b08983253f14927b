use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use time::OffsetDateTime;
use uuid::Uuid;

/// Tenant-level role carried in the JWT and reused for organization
/// memberships (both places use the same literal set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "user_role")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    Analyst,
    Viewer,
}

impl UserRole {
    pub fn can_create_organizations(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }

    pub fn can_update_organizations(&self) -> bool {
        !matches!(self, UserRole::Viewer)
    }

    pub fn can_delete_organizations(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn can_manage_members(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }
}

/// Tenant-scoped user projection. Users are owned by a collaborator
/// subsystem; this crate only ever reads them for membership checks.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
        }
    }
}
