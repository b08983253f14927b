use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, Type};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::user::{PublicUser, UserRole};

/// Canonical type set: the union of what the write path and the display
/// layer historically accepted, so rows from either era stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "organization_type")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrganizationType {
    Advertiser,
    Publisher,
    Buyer,
    Agency,
    Brand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "organization_status")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrganizationStatus {
    Active,
    Inactive,
    Suspended,
    Draft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "organization_size")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrganizationSize {
    Startup,
    Small,
    Medium,
    Large,
    Enterprise,
}

impl OrganizationType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "advertiser" => Some(OrganizationType::Advertiser),
            "publisher" => Some(OrganizationType::Publisher),
            "buyer" => Some(OrganizationType::Buyer),
            "agency" => Some(OrganizationType::Agency),
            "brand" => Some(OrganizationType::Brand),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationType::Advertiser => "advertiser",
            OrganizationType::Publisher => "publisher",
            OrganizationType::Buyer => "buyer",
            OrganizationType::Agency => "agency",
            OrganizationType::Brand => "brand",
        }
    }
}

impl OrganizationStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(OrganizationStatus::Active),
            "inactive" => Some(OrganizationStatus::Inactive),
            "suspended" => Some(OrganizationStatus::Suspended),
            "draft" => Some(OrganizationStatus::Draft),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationStatus::Active => "active",
            OrganizationStatus::Inactive => "inactive",
            OrganizationStatus::Suspended => "suspended",
            OrganizationStatus::Draft => "draft",
        }
    }
}

impl OrganizationSize {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "startup" => Some(OrganizationSize::Startup),
            "small" => Some(OrganizationSize::Small),
            "medium" => Some(OrganizationSize::Medium),
            "large" => Some(OrganizationSize::Large),
            "enterprise" => Some(OrganizationSize::Enterprise),
            _ => None,
        }
    }
}

/// An organization row. `campaign_count` and `user_count` are computed by
/// the read queries; writes that cannot cheaply produce them leave the
/// defaults in place.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
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
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[sqlx(default)]
    pub campaign_count: i64,
    #[sqlx(default)]
    pub user_count: i64,
}

/// Membership row linking a user to an organization.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUser {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: UserRole,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Membership plus the trimmed user projection the API returns with it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationMember {
    #[serde(flatten)]
    pub membership: OrganizationUser,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganization {
    pub name: String,
    #[serde(rename = "type")]
    pub org_type: OrganizationType,
    #[serde(default)]
    pub status: Option<OrganizationStatus>,
    #[serde(default)]
    pub size: Option<OrganizationSize>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub salesforce_id: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub settings: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganization {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub org_type: Option<OrganizationType>,
    #[serde(default)]
    pub status: Option<OrganizationStatus>,
    #[serde(default)]
    pub size: Option<OrganizationSize>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub salesforce_id: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub settings: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOrganizationUser {
    pub user_id: Uuid,
    #[serde(default = "default_member_role")]
    pub role: UserRole,
}

fn default_member_role() -> UserRole {
    UserRole::Viewer
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        FieldError {
            field,
            message: message.into(),
        }
    }
}

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_DESCRIPTION_LEN: usize = 1000;
pub const MAX_INDUSTRY_LEN: usize = 100;

impl CreateOrganization {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        validate_name(Some(&self.name), &mut errors);
        validate_optional_fields(
            self.description.as_deref(),
            self.website.as_deref(),
            self.industry.as_deref(),
            self.contact_email.as_deref(),
            &mut errors,
        );
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl UpdateOrganization {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        validate_name(self.name.as_deref(), &mut errors);
        validate_optional_fields(
            self.description.as_deref(),
            self.website.as_deref(),
            self.industry.as_deref(),
            self.contact_email.as_deref(),
            &mut errors,
        );
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn validate_name(name: Option<&str>, errors: &mut Vec<FieldError>) {
    if let Some(name) = name {
        if name.is_empty() {
            errors.push(FieldError::new("name", "Organization name is required"));
        } else if name.len() > MAX_NAME_LEN {
            errors.push(FieldError::new(
                "name",
                "Name must be less than 255 characters",
            ));
        }
    }
}

fn validate_optional_fields(
    description: Option<&str>,
    website: Option<&str>,
    industry: Option<&str>,
    contact_email: Option<&str>,
    errors: &mut Vec<FieldError>,
) {
    if let Some(description) = description {
        if description.len() > MAX_DESCRIPTION_LEN {
            errors.push(FieldError::new(
                "description",
                "Description must be less than 1000 characters",
            ));
        }
    }
    if let Some(website) = website {
        if !is_http_url(website) {
            errors.push(FieldError::new("website", "Invalid website URL format"));
        }
    }
    if let Some(industry) = industry {
        if industry.len() > MAX_INDUSTRY_LEN {
            errors.push(FieldError::new(
                "industry",
                "Industry must be less than 100 characters",
            ));
        }
    }
    if let Some(email) = contact_email {
        if !is_plausible_email(email) {
            errors.push(FieldError::new(
                "contactEmail",
                "Invalid contact email format",
            ));
        }
    }
}

fn is_http_url(value: &str) -> bool {
    match value.parse::<http::Uri>() {
        Ok(uri) => matches!(uri.scheme_str(), Some("http") | Some("https")) && uri.host().is_some(),
        Err(_) => false,
    }
}

fn is_plausible_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Top-level-only merge for the opaque `settings`/`metadata` maps: keys in
/// the patch overwrite, everything else is preserved. Non-object inputs
/// resolve to the patch.
pub fn merge_shallow(existing: &Value, patch: &Value) -> Value {
    match (existing, patch) {
        (Value::Object(base), Value::Object(overlay)) => {
            let mut merged = base.clone();
            for (key, value) in overlay {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => patch.clone(),
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use serde_json::json;

    pub fn organization(name: &str) -> Organization {
        let now = OffsetDateTime::now_utc();
        Organization {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
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
            created_at: now,
            updated_at: now,
            campaign_count: 0,
            user_count: 0,
        }
    }
}
