use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub async fn health_check() -> impl IntoResponse {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": timestamp,
        })),
    )
}
