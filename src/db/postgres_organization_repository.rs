use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::organization::{
    Organization, OrganizationMember, OrganizationUser,
};
use crate::models::user::{PublicUser, UserRole};
use crate::query::filter::escape_like;
use crate::query::{OrganizationFilter, Sort};

use super::organization_repository::{
    NewOrganization, OrganizationChanges, OrganizationRepository,
};

pub struct PostgresOrganizationRepository {
    pub pool: PgPool,
}

const ORG_SELECT: &str = r#"
SELECT o.id, o.tenant_id, o.name, o.type, o.status, o.size,
       o.account_id, o.salesforce_id, o.website, o.description, o.industry,
       o.contact_email, o.contact_phone, o.settings, o.metadata,
       o.created_at, o.updated_at,
       (SELECT count(*) FROM campaigns c WHERE c.organization_id = o.id) AS campaign_count,
       (SELECT count(*) FROM organization_users m WHERE m.organization_id = o.id) AS user_count
FROM organizations o"#;

const ORG_RETURNING: &str = r#" RETURNING id, tenant_id, name, type, status, size,
       account_id, salesforce_id, website, description, industry,
       contact_email, contact_phone, settings, metadata, created_at, updated_at"#;

/// Renders the shared predicate as SQL. Must stay equivalent to
/// `OrganizationFilter::matches`; the search pattern is LIKE-escaped so the
/// term always matches literally.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrganizationFilter) {
    qb.push(" WHERE o.tenant_id = ");
    qb.push_bind(filter.tenant_id);
    if let Some(org_type) = filter.org_type {
        qb.push(" AND o.type = ");
        qb.push_bind(org_type);
    }
    if let Some(status) = filter.status {
        qb.push(" AND o.status = ");
        qb.push_bind(status);
    }
    if let Some(size) = filter.size {
        qb.push(" AND o.size = ");
        qb.push_bind(size);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (o.name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR o.description ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR o.industry ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
}

#[derive(FromRow)]
struct MemberRow {
    id: Uuid,
    organization_id: Uuid,
    user_id: Uuid,
    role: UserRole,
    is_active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    email: String,
    first_name: String,
    last_name: String,
    user_role: UserRole,
}

impl From<MemberRow> for OrganizationMember {
    fn from(row: MemberRow) -> Self {
        OrganizationMember {
            membership: OrganizationUser {
                id: row.id,
                organization_id: row.organization_id,
                user_id: row.user_id,
                role: row.role,
                is_active: row.is_active,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            user: PublicUser {
                id: row.user_id,
                email: row.email,
                first_name: row.first_name,
                last_name: row.last_name,
                role: row.user_role,
            },
        }
    }
}

#[async_trait]
impl OrganizationRepository for PostgresOrganizationRepository {
    async fn count(&self, filter: &OrganizationFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::new("SELECT count(*) FROM organizations o");
        push_filter(&mut qb, filter);
        qb.build_query_scalar::<i64>().fetch_one(&self.pool).await
    }

    async fn list(
        &self,
        filter: &OrganizationFilter,
        sort: Sort,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Organization>, sqlx::Error> {
        let mut qb = QueryBuilder::new(ORG_SELECT);
        push_filter(&mut qb, filter);
        // Sort column comes from the allow-listed SortKey, never raw input.
        qb.push(" ORDER BY o.");
        qb.push(sort.key.column());
        qb.push(" ");
        qb.push(sort.order.sql());
        qb.push(" LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);
        qb.build_query_as::<Organization>()
            .fetch_all(&self.pool)
            .await
    }

    async fn find_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Organization>, sqlx::Error> {
        let mut qb = QueryBuilder::new(ORG_SELECT);
        qb.push(" WHERE o.id = ");
        qb.push_bind(id);
        qb.push(" AND o.tenant_id = ");
        qb.push_bind(tenant_id);
        qb.build_query_as::<Organization>()
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_by_name(
        &self,
        tenant_id: Uuid,
        name: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<Option<Organization>, sqlx::Error> {
        let mut qb = QueryBuilder::new(ORG_SELECT);
        qb.push(" WHERE o.tenant_id = ");
        qb.push_bind(tenant_id);
        qb.push(" AND o.name = ");
        qb.push_bind(name.to_string());
        if let Some(exclude_id) = exclude_id {
            qb.push(" AND o.id <> ");
            qb.push_bind(exclude_id);
        }
        qb.build_query_as::<Organization>()
            .fetch_optional(&self.pool)
            .await
    }

    async fn insert(
        &self,
        tenant_id: Uuid,
        new: NewOrganization,
    ) -> Result<Organization, sqlx::Error> {
        let sql = format!(
            r#"INSERT INTO organizations
                   (tenant_id, name, type, status, size, account_id, salesforce_id,
                    website, description, industry, contact_email, contact_phone,
                    settings, metadata, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, now(), now())
               {ORG_RETURNING}"#
        );
        sqlx::query_as::<_, Organization>(&sql)
            .bind(tenant_id)
            .bind(&new.name)
            .bind(new.org_type)
            .bind(new.status)
            .bind(new.size)
            .bind(&new.account_id)
            .bind(&new.salesforce_id)
            .bind(&new.website)
            .bind(&new.description)
            .bind(&new.industry)
            .bind(&new.contact_email)
            .bind(&new.contact_phone)
            .bind(&new.settings)
            .bind(&new.metadata)
            .fetch_one(&self.pool)
            .await
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        changes: OrganizationChanges,
    ) -> Result<Option<Organization>, sqlx::Error> {
        let mut qb = QueryBuilder::new("UPDATE organizations SET updated_at = now()");
        if let Some(name) = changes.name {
            qb.push(", name = ");
            qb.push_bind(name);
        }
        if let Some(org_type) = changes.org_type {
            qb.push(", type = ");
            qb.push_bind(org_type);
        }
        if let Some(status) = changes.status {
            qb.push(", status = ");
            qb.push_bind(status);
        }
        if let Some(size) = changes.size {
            qb.push(", size = ");
            qb.push_bind(size);
        }
        if let Some(account_id) = changes.account_id {
            qb.push(", account_id = ");
            qb.push_bind(account_id);
        }
        if let Some(salesforce_id) = changes.salesforce_id {
            qb.push(", salesforce_id = ");
            qb.push_bind(salesforce_id);
        }
        if let Some(website) = changes.website {
            qb.push(", website = ");
            qb.push_bind(website);
        }
        if let Some(description) = changes.description {
            qb.push(", description = ");
            qb.push_bind(description);
        }
        if let Some(industry) = changes.industry {
            qb.push(", industry = ");
            qb.push_bind(industry);
        }
        if let Some(contact_email) = changes.contact_email {
            qb.push(", contact_email = ");
            qb.push_bind(contact_email);
        }
        if let Some(contact_phone) = changes.contact_phone {
            qb.push(", contact_phone = ");
            qb.push_bind(contact_phone);
        }
        if let Some(settings) = changes.settings {
            qb.push(", settings = ");
            qb.push_bind(settings);
        }
        if let Some(metadata) = changes.metadata {
            qb.push(", metadata = ");
            qb.push_bind(metadata);
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(" AND tenant_id = ");
        qb.push_bind(tenant_id);
        qb.push(" RETURNING id");
        // Re-select through ORG_SELECT so the response carries the computed
        // campaign_count/user_count, matching the in-memory backend.
        if qb.build().fetch_optional(&self.pool).await?.is_none() {
            return Ok(None);
        }
        self.find_by_id(tenant_id, id).await
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_members(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationMember>, sqlx::Error> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT m.id, m.organization_id, m.user_id, m.role, m.is_active,
                   m.created_at, m.updated_at,
                   u.email, u.first_name, u.last_name, u.role AS user_role
            FROM organization_users m
            JOIN users u ON u.id = m.user_id
            WHERE m.organization_id = $1
            ORDER BY m.created_at DESC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrganizationMember::from).collect())
    }

    async fn find_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrganizationUser>, sqlx::Error> {
        sqlx::query_as::<_, OrganizationUser>(
            r#"
            SELECT id, organization_id, user_id, role, is_active, created_at, updated_at
            FROM organization_users
            WHERE organization_id = $1 AND user_id = $2
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<OrganizationUser, sqlx::Error> {
        sqlx::query_as::<_, OrganizationUser>(
            r#"
            INSERT INTO organization_users
                (organization_id, user_id, role, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, true, now(), now())
            RETURNING id, organization_id, user_id, role, is_active, created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }
}
