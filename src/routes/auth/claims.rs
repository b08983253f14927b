use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserRole;

/// Access-token claims minted by the SSO gateway. `sub` is the user id and
/// `tenant_id` scopes every query the bearer can make.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub exp: usize, // expiration (as UNIX timestamp)
}
