use std::collections::HashMap;

use crate::models::organization::{OrganizationSize, OrganizationStatus, OrganizationType};

use super::sort::{SortKey, SortOrder};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;
pub const MAX_SEARCH_LEN: usize = 255;

/// Normalized list-view query. Produced by [`ListQuery::from_params`], which
/// is total over arbitrary string input: anything missing or unrecognized
/// falls back to a default instead of erroring.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub filters: ListFilters,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilters {
    pub search: Option<String>,
    pub org_type: Option<OrganizationType>,
    pub status: Option<OrganizationStatus>,
    pub size: Option<OrganizationSize>,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            filters: ListFilters::default(),
            sort_by: SortKey::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl ListQuery {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let page = match params.get("page").map(|v| v.trim().parse::<u32>()) {
            Some(Ok(n)) if n >= 1 => n,
            _ => DEFAULT_PAGE,
        };

        let limit = match params.get("limit").map(|v| v.trim().parse::<u32>()) {
            Some(Ok(n)) if (1..=MAX_LIMIT).contains(&n) => n,
            _ => DEFAULT_LIMIT,
        };

        let search = params.get("search").and_then(|raw| {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return None;
            }
            let mut s = trimmed.to_string();
            if s.len() > MAX_SEARCH_LEN {
                let mut cut = MAX_SEARCH_LEN;
                while !s.is_char_boundary(cut) {
                    cut -= 1;
                }
                s.truncate(cut);
            }
            Some(s)
        });

        // Unknown enum literals are dropped, not rejected. An unmatched
        // filter value is indistinguishable from data that does not exist.
        let org_type = params
            .get("type")
            .and_then(|v| OrganizationType::parse(v.trim()));
        let status = params
            .get("status")
            .and_then(|v| OrganizationStatus::parse(v.trim()));
        let size = params
            .get("size")
            .and_then(|v| OrganizationSize::parse(v.trim()));

        let sort_by = params
            .get("sortBy")
            .and_then(|v| SortKey::parse(v.trim()))
            .unwrap_or_default();
        let sort_order = params
            .get("sortOrder")
            .and_then(|v| SortOrder::parse(v.trim()))
            .unwrap_or_default();

        ListQuery {
            page,
            limit,
            filters: ListFilters {
                search,
                org_type,
                status,
                size,
            },
            sort_by,
            sort_order,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}
