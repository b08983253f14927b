//! The query engine shared by every storage backend.
//!
//! Turning raw request parameters into a tenant-scoped, paginated result is
//! implemented once here as plain data and pure functions. The Postgres
//! repository renders [`OrganizationFilter`] and [`Sort`] to SQL; the
//! in-memory repository evaluates them directly. Both paths therefore agree
//! on filter, sort, and pagination semantics by construction.

pub mod filter;
pub mod normalize;
pub mod paginate;
pub mod sort;

pub use filter::OrganizationFilter;
pub use normalize::{ListFilters, ListQuery};
pub use paginate::Pagination;
pub use sort::{Sort, SortKey, SortOrder};
