use std::cmp::Ordering;

use crate::models::organization::Organization;

/// Allow-listed sort fields. `column` feeds the SQL `ORDER BY` (never user
/// input directly), `compare` drives the in-memory evaluation. There is no
/// secondary sort key: relative order among equal values is
/// storage-dependent and callers must not rely on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Type,
    Status,
    #[default]
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(SortKey::Name),
            "type" => Some(SortKey::Type),
            "status" => Some(SortKey::Status),
            "createdAt" => Some(SortKey::CreatedAt),
            "updatedAt" => Some(SortKey::UpdatedAt),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Type => "type",
            SortKey::Status => "status",
            SortKey::CreatedAt => "created_at",
            SortKey::UpdatedAt => "updated_at",
        }
    }

    fn compare(&self, a: &Organization, b: &Organization) -> Ordering {
        match self {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Type => a.org_type.as_str().cmp(b.org_type.as_str()),
            SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl Sort {
    pub fn compare(&self, a: &Organization, b: &Organization) -> Ordering {
        let ordering = self.key.compare(a, b);
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}
