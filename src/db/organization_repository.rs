use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::models::organization::{
    Organization, OrganizationMember, OrganizationSize, OrganizationStatus, OrganizationType,
    OrganizationUser,
};
use crate::models::user::UserRole;
use crate::query::{OrganizationFilter, Sort};

/// Column values for a brand-new organization. Assembled by the service
/// after boundary validation; the repository never sees raw request input.
#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub org_type: OrganizationType,
    pub status: OrganizationStatus,
    pub size: Option<OrganizationSize>,
    pub account_id: Option<String>,
    pub salesforce_id: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub settings: Value,
    pub metadata: Value,
}

/// Partial update. `None` means "leave the column untouched"; the
/// `settings`/`metadata` values here are already shallow-merged.
#[derive(Debug, Clone, Default)]
pub struct OrganizationChanges {
    pub name: Option<String>,
    pub org_type: Option<OrganizationType>,
    pub status: Option<OrganizationStatus>,
    pub size: Option<OrganizationSize>,
    pub account_id: Option<String>,
    pub salesforce_id: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub settings: Option<Value>,
    pub metadata: Option<Value>,
}

impl OrganizationChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.org_type.is_none()
            && self.status.is_none()
            && self.size.is_none()
            && self.account_id.is_none()
            && self.salesforce_id.is_none()
            && self.website.is_none()
            && self.description.is_none()
            && self.industry.is_none()
            && self.contact_email.is_none()
            && self.contact_phone.is_none()
            && self.settings.is_none()
            && self.metadata.is_none()
    }
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn count(&self, filter: &OrganizationFilter) -> Result<i64, sqlx::Error>;

    async fn list(
        &self,
        filter: &OrganizationFilter,
        sort: Sort,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Organization>, sqlx::Error>;

    /// Tenant-scoped lookup; an id under another tenant is `None`.
    async fn find_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Organization>, sqlx::Error>;

    async fn find_by_name(
        &self,
        tenant_id: Uuid,
        name: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<Option<Organization>, sqlx::Error>;

    async fn insert(
        &self,
        tenant_id: Uuid,
        new: NewOrganization,
    ) -> Result<Organization, sqlx::Error>;

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        changes: OrganizationChanges,
    ) -> Result<Option<Organization>, sqlx::Error>;

    /// Returns false when nothing matched the tenant-scoped id. Membership
    /// rows go with the organization (storage-owned cascade).
    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error>;

    async fn list_members(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationMember>, sqlx::Error>;

    async fn find_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrganizationUser>, sqlx::Error>;

    async fn insert_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<OrganizationUser, sqlx::Error>;
}
