use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::db::organization_repository::{
    NewOrganization, OrganizationChanges, OrganizationRepository,
};
use crate::db::user_repository::UserRepository;
use crate::models::organization::{
    merge_shallow, AddOrganizationUser, CreateOrganization, Organization, OrganizationMember,
    OrganizationStatus, UpdateOrganization,
};
use crate::models::user::PublicUser;
use crate::query::{ListQuery, OrganizationFilter, Pagination, Sort};

#[derive(Debug, Error)]
pub enum OrganizationError {
    #[error("Organization not found")]
    OrganizationNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Organization with this name already exists")]
    DuplicateName,
    #[error("User is already a member of this organization")]
    DuplicateMember,
    #[error("Cannot delete organization with active campaigns")]
    HasActiveCampaigns,
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct OrganizationPage {
    pub data: Vec<Organization>,
    pub pagination: Pagination,
}

/// Composition root for the query and integrity engine. Stateless per
/// request; every read and write it issues is tenant-scoped, and a miss on
/// the tenant-scoped lookup is indistinguishable from a cross-tenant id.
#[derive(Clone)]
pub struct OrganizationService {
    orgs: Arc<dyn OrganizationRepository>,
    users: Arc<dyn UserRepository>,
}

impl OrganizationService {
    pub fn new(orgs: Arc<dyn OrganizationRepository>, users: Arc<dyn UserRepository>) -> Self {
        OrganizationService { orgs, users }
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        query: &ListQuery,
    ) -> Result<OrganizationPage, OrganizationError> {
        let filter = OrganizationFilter::new(tenant_id, &query.filters);
        let sort = Sort {
            key: query.sort_by,
            order: query.sort_order,
        };

        // Count and page run against the same predicate and may be issued
        // concurrently.
        let (total, data) = tokio::join!(
            self.orgs.count(&filter),
            self.orgs.list(
                &filter,
                sort,
                query.offset() as i64,
                i64::from(query.limit)
            ),
        );

        Ok(OrganizationPage {
            data: data?,
            pagination: Pagination::compute(total? as u64, query.page, query.limit),
        })
    }

    pub async fn create(
        &self,
        tenant_id: Uuid,
        payload: CreateOrganization,
    ) -> Result<Organization, OrganizationError> {
        // Fast-path check; the unique constraint below is the backstop for
        // concurrent creates that both pass it.
        if self
            .orgs
            .find_by_name(tenant_id, &payload.name, None)
            .await?
            .is_some()
        {
            return Err(OrganizationError::DuplicateName);
        }

        let new = NewOrganization {
            name: payload.name,
            org_type: payload.org_type,
            status: payload.status.unwrap_or(OrganizationStatus::Active),
            size: payload.size,
            account_id: payload.account_id,
            salesforce_id: payload.salesforce_id,
            website: payload.website,
            description: payload.description,
            industry: payload.industry,
            contact_email: payload.contact_email,
            contact_phone: payload.contact_phone,
            settings: payload.settings.unwrap_or_else(|| json!({})),
            metadata: payload.metadata.unwrap_or_else(|| json!({})),
        };

        match self.orgs.insert(tenant_id, new).await {
            Ok(org) => Ok(org),
            Err(err) if is_unique_violation(&err) => Err(OrganizationError::DuplicateName),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Organization, OrganizationError> {
        self.orgs
            .find_by_id(tenant_id, id)
            .await?
            .ok_or(OrganizationError::OrganizationNotFound)
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        payload: UpdateOrganization,
    ) -> Result<Organization, OrganizationError> {
        let existing = self
            .orgs
            .find_by_id(tenant_id, id)
            .await?
            .ok_or(OrganizationError::OrganizationNotFound)?;

        // Only a name that actually changes is checked; the lookup excludes
        // this organization's own row.
        if let Some(name) = &payload.name {
            if *name != existing.name
                && self
                    .orgs
                    .find_by_name(tenant_id, name, Some(id))
                    .await?
                    .is_some()
            {
                return Err(OrganizationError::DuplicateName);
            }
        }

        let changes = OrganizationChanges {
            name: payload.name,
            org_type: payload.org_type,
            status: payload.status,
            size: payload.size,
            account_id: payload.account_id,
            salesforce_id: payload.salesforce_id,
            website: payload.website,
            description: payload.description,
            industry: payload.industry,
            contact_email: payload.contact_email,
            contact_phone: payload.contact_phone,
            settings: payload
                .settings
                .map(|patch| merge_shallow(&existing.settings, &patch)),
            metadata: payload
                .metadata
                .map(|patch| merge_shallow(&existing.metadata, &patch)),
        };

        match self.orgs.update(tenant_id, id, changes).await {
            Ok(Some(org)) => Ok(org),
            Ok(None) => Err(OrganizationError::OrganizationNotFound),
            Err(err) if is_unique_violation(&err) => Err(OrganizationError::DuplicateName),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), OrganizationError> {
        let existing = self
            .orgs
            .find_by_id(tenant_id, id)
            .await?
            .ok_or(OrganizationError::OrganizationNotFound)?;

        if existing.campaign_count > 0 {
            return Err(OrganizationError::HasActiveCampaigns);
        }

        if self.orgs.delete(tenant_id, id).await? {
            Ok(())
        } else {
            Err(OrganizationError::OrganizationNotFound)
        }
    }

    pub async fn list_users(
        &self,
        tenant_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationMember>, OrganizationError> {
        self.orgs
            .find_by_id(tenant_id, organization_id)
            .await?
            .ok_or(OrganizationError::OrganizationNotFound)?;
        Ok(self.orgs.list_members(organization_id).await?)
    }

    pub async fn add_user(
        &self,
        tenant_id: Uuid,
        organization_id: Uuid,
        payload: AddOrganizationUser,
    ) -> Result<OrganizationMember, OrganizationError> {
        self.orgs
            .find_by_id(tenant_id, organization_id)
            .await?
            .ok_or(OrganizationError::OrganizationNotFound)?;

        let user = self
            .users
            .find_user_in_tenant(tenant_id, payload.user_id)
            .await?
            .ok_or(OrganizationError::UserNotFound)?;

        if self
            .orgs
            .find_member(organization_id, payload.user_id)
            .await?
            .is_some()
        {
            return Err(OrganizationError::DuplicateMember);
        }

        let membership = match self
            .orgs
            .insert_member(organization_id, payload.user_id, payload.role)
            .await
        {
            Ok(membership) => membership,
            Err(err) if is_unique_violation(&err) => {
                return Err(OrganizationError::DuplicateMember)
            }
            Err(err) => return Err(err.into()),
        };

        Ok(OrganizationMember {
            membership,
            user: PublicUser::from(&user),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock_db::MockDb;
    use crate::models::organization::{OrganizationSize, OrganizationType};
    use crate::models::user::UserRole;
    use std::collections::HashMap;

    fn service() -> (OrganizationService, Arc<MockDb>) {
        let db = Arc::new(MockDb::new());
        let service = OrganizationService::new(db.clone(), db.clone());
        (service, db)
    }

    fn create_payload(value: serde_json::Value) -> CreateOrganization {
        serde_json::from_value(value).unwrap()
    }

    fn query(pairs: &[(&str, &str)]) -> ListQuery {
        let params: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ListQuery::from_params(&params)
    }

    async fn seed_org(
        service: &OrganizationService,
        tenant: Uuid,
        name: &str,
        status: &str,
    ) -> Organization {
        service
            .create(
                tenant,
                create_payload(json!({"name": name, "type": "advertiser", "status": status})),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_name_conflicts_within_tenant_only() {
        let (service, _) = service();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();

        seed_org(&service, tenant_a, "TechCorp", "active").await;
        let err = service
            .create(
                tenant_a,
                create_payload(json!({"name": "TechCorp", "type": "publisher"})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::DuplicateName));

        // The same name under a different tenant succeeds.
        seed_org(&service, tenant_b, "TechCorp", "active").await;
    }

    #[tokio::test]
    async fn name_uniqueness_is_case_sensitive() {
        let (service, _) = service();
        let tenant = Uuid::new_v4();
        seed_org(&service, tenant, "TechCorp", "active").await;
        seed_org(&service, tenant, "techcorp", "active").await;
    }

    #[tokio::test]
    async fn get_is_tenant_scoped() {
        let (service, _) = service();
        let tenant_a = Uuid::new_v4();
        let org = seed_org(&service, tenant_a, "TechCorp", "active").await;

        assert!(service.get(tenant_a, org.id).await.is_ok());
        let err = service.get(Uuid::new_v4(), org.id).await.unwrap_err();
        assert!(matches!(err, OrganizationError::OrganizationNotFound));
    }

    #[tokio::test]
    async fn list_excludes_other_tenants() {
        let (service, _) = service();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();
        seed_org(&service, tenant_a, "Mine", "active").await;
        seed_org(&service, tenant_b, "Theirs", "active").await;

        let page = service.list(tenant_a, &ListQuery::default()).await.unwrap();
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.data[0].name, "Mine");
    }

    #[tokio::test]
    async fn status_filter_returns_only_matching_rows() {
        let (service, _) = service();
        let tenant = Uuid::new_v4();
        seed_org(&service, tenant, "One", "active").await;
        seed_org(&service, tenant, "Two", "active").await;
        seed_org(&service, tenant, "Three", "suspended").await;

        let page = service
            .list(tenant, &query(&[("status", "active")]))
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 2);
        assert!(page
            .data
            .iter()
            .all(|o| o.status == OrganizationStatus::Active));
    }

    #[tokio::test]
    async fn second_page_of_one_over_two_rows() {
        let (service, _) = service();
        let tenant = Uuid::new_v4();
        seed_org(&service, tenant, "One", "active").await;
        seed_org(&service, tenant, "Two", "active").await;
        seed_org(&service, tenant, "Three", "suspended").await;

        let page = service
            .list(
                tenant,
                &query(&[("status", "active"), ("page", "2"), ("limit", "1")]),
            )
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert!(!page.pagination.has_next);
        assert!(page.pagination.has_prev);
    }

    #[tokio::test]
    async fn page_beyond_the_end_is_empty_not_an_error() {
        let (service, _) = service();
        let tenant = Uuid::new_v4();
        seed_org(&service, tenant, "Only", "active").await;

        let page = service.list(tenant, &query(&[("page", "9")])).await.unwrap();
        assert!(page.data.is_empty());
        assert!(!page.pagination.has_next);
        assert!(page.pagination.has_prev);
    }

    #[tokio::test]
    async fn search_and_filters_compose() {
        let (service, _) = service();
        let tenant = Uuid::new_v4();
        service
            .create(
                tenant,
                create_payload(json!({
                    "name": "TechCorp Enterprise",
                    "type": "advertiser",
                    "size": "large",
                    "industry": "AdTech"
                })),
            )
            .await
            .unwrap();
        service
            .create(
                tenant,
                create_payload(json!({
                    "name": "Marketing Solutions Inc",
                    "type": "agency",
                    "size": "medium"
                })),
            )
            .await
            .unwrap();

        for needle in ["TECH", "tech"] {
            let page = service
                .list(tenant, &query(&[("search", needle)]))
                .await
                .unwrap();
            assert_eq!(page.pagination.total, 1, "search {needle:?}");
            assert_eq!(page.data[0].name, "TechCorp Enterprise");
        }

        let page = service
            .list(
                tenant,
                &query(&[("type", "advertiser"), ("status", "active"), ("size", "large")]),
            )
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 1);
        let org = &page.data[0];
        assert_eq!(org.org_type, OrganizationType::Advertiser);
        assert_eq!(org.status, OrganizationStatus::Active);
        assert_eq!(org.size, Some(OrganizationSize::Large));
    }

    #[tokio::test]
    async fn sort_by_name_ascending_and_descending() {
        let (service, _) = service();
        let tenant = Uuid::new_v4();
        for name in [
            "TechCorp Enterprise",
            "Marketing Solutions Inc",
            "Brand Publishers Network",
        ] {
            seed_org(&service, tenant, name, "active").await;
        }

        let page = service
            .list(tenant, &query(&[("sortBy", "name"), ("sortOrder", "asc")]))
            .await
            .unwrap();
        let names: Vec<&str> = page.data.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Brand Publishers Network",
                "Marketing Solutions Inc",
                "TechCorp Enterprise"
            ]
        );

        let page = service
            .list(tenant, &query(&[("sortBy", "name"), ("sortOrder", "desc")]))
            .await
            .unwrap();
        let names: Vec<&str> = page.data.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "TechCorp Enterprise",
                "Marketing Solutions Inc",
                "Brand Publishers Network"
            ]
        );
    }

    #[tokio::test]
    async fn update_checks_name_conflicts_excluding_self() {
        let (service, _) = service();
        let tenant = Uuid::new_v4();
        let org = seed_org(&service, tenant, "TechCorp", "active").await;
        seed_org(&service, tenant, "Marketing Inc", "active").await;

        // Re-submitting its own name is not a conflict.
        let payload: UpdateOrganization =
            serde_json::from_value(json!({"name": "TechCorp"})).unwrap();
        service.update(tenant, org.id, payload).await.unwrap();

        let payload: UpdateOrganization =
            serde_json::from_value(json!({"name": "Marketing Inc"})).unwrap();
        let err = service.update(tenant, org.id, payload).await.unwrap_err();
        assert!(matches!(err, OrganizationError::DuplicateName));
    }

    #[tokio::test]
    async fn update_shallow_merges_settings_and_metadata() {
        let (service, _) = service();
        let tenant = Uuid::new_v4();
        let org = service
            .create(
                tenant,
                create_payload(json!({
                    "name": "TechCorp",
                    "type": "advertiser",
                    "settings": {"theme": "dark", "keep": true}
                })),
            )
            .await
            .unwrap();

        let payload: UpdateOrganization =
            serde_json::from_value(json!({"settings": {"theme": "light"}})).unwrap();
        let updated = service.update(tenant, org.id, payload).await.unwrap();
        assert_eq!(
            updated.settings,
            json!({"theme": "light", "keep": true})
        );
    }

    #[tokio::test]
    async fn update_is_tenant_scoped() {
        let (service, _) = service();
        let tenant = Uuid::new_v4();
        let org = seed_org(&service, tenant, "TechCorp", "active").await;

        let payload: UpdateOrganization =
            serde_json::from_value(json!({"name": "Renamed"})).unwrap();
        let err = service
            .update(Uuid::new_v4(), org.id, payload)
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::OrganizationNotFound));
    }

    #[tokio::test]
    async fn delete_refuses_organizations_with_campaigns() {
        let (service, db) = service();
        let tenant = Uuid::new_v4();
        let org = seed_org(&service, tenant, "TechCorp", "active").await;
        db.set_campaign_count(org.id, 2);

        let err = service.delete(tenant, org.id).await.unwrap_err();
        assert!(matches!(err, OrganizationError::HasActiveCampaigns));
        // The organization is left intact.
        assert!(service.get(tenant, org.id).await.is_ok());

        db.set_campaign_count(org.id, 0);
        service.delete(tenant, org.id).await.unwrap();
        assert!(service.get(tenant, org.id).await.is_err());
    }

    #[tokio::test]
    async fn add_user_enforces_org_user_and_membership_invariants() {
        let (service, db) = service();
        let tenant = Uuid::new_v4();
        let org = seed_org(&service, tenant, "TechCorp", "active").await;
        let user = db.seed_user(tenant, "analyst@example.com", UserRole::Analyst);

        // Organization must be in the caller's tenant.
        let payload: AddOrganizationUser =
            serde_json::from_value(json!({"userId": user.id})).unwrap();
        let err = service
            .add_user(Uuid::new_v4(), org.id, payload.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::OrganizationNotFound));

        // User must exist in the tenant.
        let missing: AddOrganizationUser =
            serde_json::from_value(json!({"userId": Uuid::new_v4()})).unwrap();
        let err = service.add_user(tenant, org.id, missing).await.unwrap_err();
        assert!(matches!(err, OrganizationError::UserNotFound));

        let member = service
            .add_user(tenant, org.id, payload.clone())
            .await
            .unwrap();
        assert_eq!(member.membership.role, UserRole::Viewer);
        assert_eq!(member.user.email, "analyst@example.com");

        // Second membership for the same pair conflicts.
        let err = service.add_user(tenant, org.id, payload).await.unwrap_err();
        assert!(matches!(err, OrganizationError::DuplicateMember));

        let members = service.list_users(tenant, org.id).await.unwrap();
        assert_eq!(members.len(), 1);
    }

    #[tokio::test]
    async fn storage_failures_surface_as_storage_errors() {
        let (service, db) = service();
        db.should_fail.store(true, std::sync::atomic::Ordering::Relaxed);
        let err = service
            .list(Uuid::new_v4(), &ListQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::Storage(_)));
    }
}
