//! In-memory implementation of the repository traits.
//!
//! Evaluates the same `query` module the Postgres repository renders to
//! SQL, so tests and local simulation exercise identical filter, sort, and
//! pagination semantics. The `(tenant_id, name)` and
//! `(organization_id, user_id)` unique constraints are emulated with a
//! SQLSTATE 23505 error so the constraint-backstop path behaves like the
//! real store.

use std::borrow::Cow;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::models::organization::{
    Organization, OrganizationMember, OrganizationUser,
};
use crate::models::user::{PublicUser, User, UserRole};
use crate::query::{OrganizationFilter, Sort};

use super::organization_repository::{
    NewOrganization, OrganizationChanges, OrganizationRepository,
};
use super::user_repository::UserRepository;

#[derive(Debug)]
struct UniqueViolation {
    message: String,
}

impl fmt::Display for UniqueViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for UniqueViolation {}

impl sqlx::error::DatabaseError for UniqueViolation {
    fn message(&self) -> &str {
        &self.message
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed("23505"))
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        sqlx::error::ErrorKind::UniqueViolation
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }
}

fn unique_violation(constraint: &str) -> sqlx::Error {
    sqlx::Error::Database(Box::new(UniqueViolation {
        message: format!("duplicate key value violates unique constraint \"{constraint}\""),
    }))
}

#[derive(Default)]
pub struct MockDb {
    orgs: Mutex<Vec<Organization>>,
    users: Mutex<Vec<User>>,
    members: Mutex<Vec<OrganizationUser>>,
    campaign_counts: Mutex<HashMap<Uuid, i64>>,
    pub should_fail: AtomicBool,
    // Keeps created_at strictly increasing across inserts.
    seq: AtomicI64,
}

impl MockDb {
    pub fn new() -> Self {
        MockDb::default()
    }

    fn check_failure(&self) -> Result<(), sqlx::Error> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(sqlx::Error::Protocol("mock storage failure".into()));
        }
        Ok(())
    }

    fn next_timestamp(&self) -> OffsetDateTime {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        OffsetDateTime::now_utc() + Duration::microseconds(seq)
    }

    fn with_counts(&self, mut org: Organization) -> Organization {
        org.campaign_count = self
            .campaign_counts
            .lock()
            .unwrap()
            .get(&org.id)
            .copied()
            .unwrap_or(0);
        org.user_count = self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.organization_id == org.id)
            .count() as i64;
        org
    }

    pub fn set_campaign_count(&self, organization_id: Uuid, count: i64) {
        self.campaign_counts
            .lock()
            .unwrap()
            .insert(organization_id, count);
    }

    pub fn seed_user(&self, tenant_id: Uuid, email: &str, role: UserRole) -> User {
        let user = User {
            id: Uuid::new_v4(),
            tenant_id,
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role,
            is_active: true,
            created_at: self.next_timestamp(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }
}

#[async_trait]
impl OrganizationRepository for MockDb {
    async fn count(&self, filter: &OrganizationFilter) -> Result<i64, sqlx::Error> {
        self.check_failure()?;
        let orgs = self.orgs.lock().unwrap();
        Ok(orgs.iter().filter(|o| filter.matches(o)).count() as i64)
    }

    async fn list(
        &self,
        filter: &OrganizationFilter,
        sort: Sort,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Organization>, sqlx::Error> {
        self.check_failure()?;
        let mut rows: Vec<Organization> = {
            let orgs = self.orgs.lock().unwrap();
            orgs.iter().filter(|o| filter.matches(o)).cloned().collect()
        };
        rows.sort_by(|a, b| sort.compare(a, b));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|o| self.with_counts(o))
            .collect())
    }

    async fn find_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Organization>, sqlx::Error> {
        self.check_failure()?;
        let found = {
            let orgs = self.orgs.lock().unwrap();
            orgs.iter()
                .find(|o| o.id == id && o.tenant_id == tenant_id)
                .cloned()
        };
        Ok(found.map(|o| self.with_counts(o)))
    }

    async fn find_by_name(
        &self,
        tenant_id: Uuid,
        name: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<Option<Organization>, sqlx::Error> {
        self.check_failure()?;
        let orgs = self.orgs.lock().unwrap();
        Ok(orgs
            .iter()
            .find(|o| {
                o.tenant_id == tenant_id && o.name == name && Some(o.id) != exclude_id
            })
            .cloned())
    }

    async fn insert(
        &self,
        tenant_id: Uuid,
        new: NewOrganization,
    ) -> Result<Organization, sqlx::Error> {
        self.check_failure()?;
        let mut orgs = self.orgs.lock().unwrap();
        if orgs
            .iter()
            .any(|o| o.tenant_id == tenant_id && o.name == new.name)
        {
            return Err(unique_violation("organizations_tenant_id_name_key"));
        }
        let now = self.next_timestamp();
        let org = Organization {
            id: Uuid::new_v4(),
            tenant_id,
            name: new.name,
            org_type: new.org_type,
            status: new.status,
            size: new.size,
            account_id: new.account_id,
            salesforce_id: new.salesforce_id,
            website: new.website,
            description: new.description,
            industry: new.industry,
            contact_email: new.contact_email,
            contact_phone: new.contact_phone,
            settings: new.settings,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
            campaign_count: 0,
            user_count: 0,
        };
        orgs.push(org.clone());
        Ok(org)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        changes: OrganizationChanges,
    ) -> Result<Option<Organization>, sqlx::Error> {
        self.check_failure()?;
        let updated = {
            let mut orgs = self.orgs.lock().unwrap();
            if let Some(name) = &changes.name {
                if orgs
                    .iter()
                    .any(|o| o.tenant_id == tenant_id && o.name == *name && o.id != id)
                {
                    return Err(unique_violation("organizations_tenant_id_name_key"));
                }
            }
            let Some(org) = orgs
                .iter_mut()
                .find(|o| o.id == id && o.tenant_id == tenant_id)
            else {
                return Ok(None);
            };
            if let Some(name) = changes.name {
                org.name = name;
            }
            if let Some(org_type) = changes.org_type {
                org.org_type = org_type;
            }
            if let Some(status) = changes.status {
                org.status = status;
            }
            if let Some(size) = changes.size {
                org.size = Some(size);
            }
            if let Some(account_id) = changes.account_id {
                org.account_id = Some(account_id);
            }
            if let Some(salesforce_id) = changes.salesforce_id {
                org.salesforce_id = Some(salesforce_id);
            }
            if let Some(website) = changes.website {
                org.website = Some(website);
            }
            if let Some(description) = changes.description {
                org.description = Some(description);
            }
            if let Some(industry) = changes.industry {
                org.industry = Some(industry);
            }
            if let Some(contact_email) = changes.contact_email {
                org.contact_email = Some(contact_email);
            }
            if let Some(contact_phone) = changes.contact_phone {
                org.contact_phone = Some(contact_phone);
            }
            if let Some(settings) = changes.settings {
                org.settings = settings;
            }
            if let Some(metadata) = changes.metadata {
                org.metadata = metadata;
            }
            org.updated_at = OffsetDateTime::now_utc();
            org.clone()
        };
        Ok(Some(self.with_counts(updated)))
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        self.check_failure()?;
        let mut orgs = self.orgs.lock().unwrap();
        let before = orgs.len();
        orgs.retain(|o| !(o.id == id && o.tenant_id == tenant_id));
        let removed = orgs.len() < before;
        if removed {
            self.members
                .lock()
                .unwrap()
                .retain(|m| m.organization_id != id);
        }
        Ok(removed)
    }

    async fn list_members(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationMember>, sqlx::Error> {
        self.check_failure()?;
        let members = self.members.lock().unwrap();
        let users = self.users.lock().unwrap();
        let mut rows: Vec<OrganizationMember> = members
            .iter()
            .filter(|m| m.organization_id == organization_id)
            .map(|m| {
                let user = users
                    .iter()
                    .find(|u| u.id == m.user_id)
                    .map(PublicUser::from)
                    .unwrap_or(PublicUser {
                        id: m.user_id,
                        email: String::new(),
                        first_name: String::new(),
                        last_name: String::new(),
                        role: m.role,
                    });
                OrganizationMember {
                    membership: m.clone(),
                    user,
                }
            })
            .collect();
        rows.sort_by(|a, b| b.membership.created_at.cmp(&a.membership.created_at));
        Ok(rows)
    }

    async fn find_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrganizationUser>, sqlx::Error> {
        self.check_failure()?;
        let members = self.members.lock().unwrap();
        Ok(members
            .iter()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
            .cloned())
    }

    async fn insert_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<OrganizationUser, sqlx::Error> {
        self.check_failure()?;
        let mut members = self.members.lock().unwrap();
        if members
            .iter()
            .any(|m| m.organization_id == organization_id && m.user_id == user_id)
        {
            return Err(unique_violation(
                "organization_users_organization_id_user_id_key",
            ));
        }
        let now = self.next_timestamp();
        let member = OrganizationUser {
            id: Uuid::new_v4(),
            organization_id,
            user_id,
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        members.push(member.clone());
        Ok(member)
    }
}

#[async_trait]
impl UserRepository for MockDb {
    async fn find_user_in_tenant(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<User>, sqlx::Error> {
        self.check_failure()?;
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.id == user_id && u.tenant_id == tenant_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::is_unique_violation;
    use crate::models::organization::{OrganizationStatus, OrganizationType};
    use serde_json::json;

    fn new_org(name: &str) -> NewOrganization {
        NewOrganization {
            name: name.to_string(),
            org_type: OrganizationType::Advertiser,
            status: OrganizationStatus::Active,
            size: None,
            account_id: None,
            salesforce_id: None,
            website: None,
            description: None,
            industry: None,
            contact_email: None,
            contact_phone: None,
            settings: json!({}),
            metadata: json!({}),
        }
    }

    #[tokio::test]
    async fn duplicate_insert_surfaces_as_unique_violation() {
        let db = MockDb::new();
        let tenant = Uuid::new_v4();
        db.insert(tenant, new_org("TechCorp")).await.unwrap();
        let err = db.insert(tenant, new_org("TechCorp")).await.unwrap_err();
        assert!(is_unique_violation(&err));

        // Same name under another tenant is fine.
        db.insert(Uuid::new_v4(), new_org("TechCorp"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delete_cascades_membership_rows() {
        let db = MockDb::new();
        let tenant = Uuid::new_v4();
        let org = db.insert(tenant, new_org("TechCorp")).await.unwrap();
        let user = db.seed_user(tenant, "a@example.com", UserRole::Viewer);
        db.insert_member(org.id, user.id, UserRole::Viewer)
            .await
            .unwrap();

        assert!(db.delete(tenant, org.id).await.unwrap());
        assert!(db.list_members(org.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_returns_live_counts() {
        let db = MockDb::new();
        let tenant = Uuid::new_v4();
        let org = db.insert(tenant, new_org("TechCorp")).await.unwrap();
        let user = db.seed_user(tenant, "a@example.com", UserRole::Viewer);
        db.insert_member(org.id, user.id, UserRole::Viewer)
            .await
            .unwrap();
        db.set_campaign_count(org.id, 2);

        let changes = OrganizationChanges {
            name: Some("TechCorp Enterprise".to_string()),
            ..OrganizationChanges::default()
        };
        let updated = db.update(tenant, org.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.name, "TechCorp Enterprise");
        assert_eq!(updated.campaign_count, 2);
        assert_eq!(updated.user_count, 1);
    }

    #[tokio::test]
    async fn counts_are_attached_on_reads() {
        let db = MockDb::new();
        let tenant = Uuid::new_v4();
        let org = db.insert(tenant, new_org("TechCorp")).await.unwrap();
        let user = db.seed_user(tenant, "a@example.com", UserRole::Viewer);
        db.insert_member(org.id, user.id, UserRole::Analyst)
            .await
            .unwrap();
        db.set_campaign_count(org.id, 3);

        let fetched = db.find_by_id(tenant, org.id).await.unwrap().unwrap();
        assert_eq!(fetched.campaign_count, 3);
        assert_eq!(fetched.user_count, 1);
    }
}
