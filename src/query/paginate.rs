use serde::Serialize;

/// Response-side pagination metadata. A page past the end is not an error:
/// it pairs with an empty row set and `has_next = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn compute(total: u64, page: u32, limit: u32) -> Self {
        debug_assert!(page >= 1 && limit >= 1);
        let total_pages = total.div_ceil(u64::from(limit)) as u32;
        Pagination {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}
