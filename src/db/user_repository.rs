use async_trait::async_trait;
use uuid::Uuid;

use crate::models::user::User;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Tenant-scoped lookup; a user under another tenant is `None`.
    async fn find_user_in_tenant(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<User>, sqlx::Error>;
}
