use uuid::Uuid;

use crate::models::organization::{
    Organization, OrganizationSize, OrganizationStatus, OrganizationType,
};

use super::normalize::ListFilters;

/// Storage-agnostic row predicate: tenant equality, optional field
/// equalities combined with AND, and an optional case-insensitive substring
/// search OR-ed across name, description, and industry. Absent filters add
/// no clause at all (no implicit NULL checks).
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationFilter {
    pub tenant_id: Uuid,
    pub org_type: Option<OrganizationType>,
    pub status: Option<OrganizationStatus>,
    pub size: Option<OrganizationSize>,
    pub search: Option<String>,
}

impl OrganizationFilter {
    pub fn new(tenant_id: Uuid, filters: &ListFilters) -> Self {
        OrganizationFilter {
            tenant_id,
            org_type: filters.org_type,
            status: filters.status,
            size: filters.size,
            search: filters.search.clone(),
        }
    }

    /// Reference evaluation, used by the in-memory repository. The SQL
    /// rendering in the Postgres repository must match this exactly.
    pub fn matches(&self, org: &Organization) -> bool {
        if org.tenant_id != self.tenant_id {
            return false;
        }
        if let Some(t) = self.org_type {
            if org.org_type != t {
                return false;
            }
        }
        if let Some(s) = self.status {
            if org.status != s {
                return false;
            }
        }
        if let Some(s) = self.size {
            if org.size != Some(s) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = contains_ci(Some(&org.name), &needle)
                || contains_ci(org.description.as_deref(), &needle)
                || contains_ci(org.industry.as_deref(), &needle);
            if !hit {
                return false;
            }
        }
        true
    }
}

fn contains_ci(haystack: Option<&str>, needle_lower: &str) -> bool {
    haystack
        .map(|h| h.to_lowercase().contains(needle_lower))
        .unwrap_or(false)
}

/// Escapes LIKE metacharacters so a search term is always a literal
/// substring match when rendered as `ILIKE '%term%'`.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::organization::test_support::organization;

    fn tenant_filter(tenant_id: Uuid) -> OrganizationFilter {
        OrganizationFilter::new(tenant_id, &ListFilters::default())
    }

    #[test]
    fn tenant_mismatch_never_matches() {
        let mut org = organization("TechCorp");
        org.tenant_id = Uuid::new_v4();
        let filter = tenant_filter(Uuid::new_v4());
        assert!(!filter.matches(&org));
    }

    #[test]
    fn equality_filters_compose_with_and() {
        let tenant = Uuid::new_v4();
        let mut org = organization("TechCorp");
        org.tenant_id = tenant;
        org.org_type = OrganizationType::Advertiser;
        org.status = OrganizationStatus::Active;
        org.size = Some(OrganizationSize::Large);

        let mut filter = tenant_filter(tenant);
        filter.org_type = Some(OrganizationType::Advertiser);
        filter.status = Some(OrganizationStatus::Active);
        filter.size = Some(OrganizationSize::Large);
        assert!(filter.matches(&org));

        filter.status = Some(OrganizationStatus::Suspended);
        assert!(!filter.matches(&org));
    }

    #[test]
    fn search_is_case_insensitive_across_three_fields() {
        let tenant = Uuid::new_v4();
        let mut org = organization("TechCorp Enterprise");
        org.tenant_id = tenant;
        org.description = Some("Leading ad platform".into());
        org.industry = Some("AdTech".into());

        for needle in ["TECH", "tech", "Tech"] {
            let mut filter = tenant_filter(tenant);
            filter.search = Some(needle.into());
            assert!(filter.matches(&org), "search {needle:?} on name");
        }

        let mut filter = tenant_filter(tenant);
        filter.search = Some("PLATFORM".into());
        assert!(filter.matches(&org), "search hits description");

        filter.search = Some("adtech".into());
        assert!(filter.matches(&org), "search hits industry");

        filter.search = Some("nonexistent".into());
        assert!(!filter.matches(&org));
    }

    #[test]
    fn absent_optional_fields_do_not_match_search() {
        let tenant = Uuid::new_v4();
        let mut org = organization("Plain");
        org.tenant_id = tenant;
        org.description = None;
        org.industry = None;

        let mut filter = tenant_filter(tenant);
        filter.search = Some("tech".into());
        assert!(!filter.matches(&org));
    }

    #[test]
    fn like_escaping_keeps_terms_literal() {
        assert_eq!(escape_like("50%_off\\now"), "50\\%\\_off\\\\now");
        assert_eq!(escape_like("tech"), "tech");
    }
}
