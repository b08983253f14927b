use axum::response::Response;
use uuid::Uuid;

use crate::responses::ApiError;
use crate::services::OrganizationError;

/// Path parameters arrive as strings so that a malformed id yields a 400
/// instead of axum's default rejection.
pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Invalid UUID format"))
}

pub(crate) fn error_response(err: OrganizationError) -> Response {
    match err {
        OrganizationError::OrganizationNotFound | OrganizationError::UserNotFound => {
            ApiError::not_found(&err.to_string())
        }
        OrganizationError::DuplicateName
        | OrganizationError::DuplicateMember
        | OrganizationError::HasActiveCampaigns => ApiError::conflict(&err.to_string()),
        OrganizationError::Storage(err) => {
            tracing::error!(error = %err, "organization storage error");
            ApiError::server_error()
        }
    }
}
