use super::prelude::*;

pub async fn list_organizations(
    State(app_state): State<AppState>,
    AuthSession(claims): AuthSession,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let query = ListQuery::from_params(&params);
    match app_state.service.list(claims.tenant_id, &query).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn create_organization(
    State(app_state): State<AppState>,
    AuthSession(claims): AuthSession,
    Json(body): Json<Value>,
) -> Response {
    if !claims.role.can_create_organizations() {
        return ApiError::forbidden("Insufficient permissions");
    }

    let payload: CreateOrganization = match serde_json::from_value(body) {
        Ok(payload) => payload,
        Err(err) => return ApiError::bad_request(&format!("Invalid request body: {err}")),
    };
    if let Err(details) = payload.validate() {
        return ApiError::validation("Invalid request body", details);
    }

    match app_state.service.create(claims.tenant_id, payload).await {
        Ok(org) => (
            StatusCode::CREATED,
            Json(json!({
                "data": org,
                "message": "Organization created successfully"
            })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn get_organization(
    State(app_state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_uuid(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match app_state.service.get(claims.tenant_id, id).await {
        Ok(org) => (StatusCode::OK, Json(json!({ "data": org }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn update_organization(
    State(app_state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !claims.role.can_update_organizations() {
        return ApiError::forbidden("Insufficient permissions");
    }

    let id = match parse_uuid(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let payload: UpdateOrganization = match serde_json::from_value(body) {
        Ok(payload) => payload,
        Err(err) => return ApiError::bad_request(&format!("Invalid request body: {err}")),
    };
    if let Err(details) = payload.validate() {
        return ApiError::validation("Invalid request body", details);
    }

    match app_state.service.update(claims.tenant_id, id, payload).await {
        Ok(org) => (
            StatusCode::OK,
            Json(json!({
                "data": org,
                "message": "Organization updated successfully"
            })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn delete_organization(
    State(app_state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(id): Path<String>,
) -> Response {
    if !claims.role.can_delete_organizations() {
        return ApiError::forbidden("Insufficient permissions");
    }

    let id = match parse_uuid(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match app_state.service.delete(claims.tenant_id, id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Organization deleted successfully" })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}
