pub mod organization_service;

pub use organization_service::{OrganizationError, OrganizationPage, OrganizationService};
