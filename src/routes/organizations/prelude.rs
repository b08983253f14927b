pub(crate) use std::collections::HashMap;

pub(crate) use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
pub(crate) use serde_json::{json, Value};

pub(crate) use crate::{
    models::organization::{AddOrganizationUser, CreateOrganization, UpdateOrganization},
    query::ListQuery,
    responses::ApiError,
    routes::auth::session::AuthSession,
    state::AppState,
};

pub(crate) use super::helpers::{error_response, parse_uuid};
