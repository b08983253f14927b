use super::prelude::*;

pub async fn list_organization_users(
    State(app_state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_uuid(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match app_state.service.list_users(claims.tenant_id, id).await {
        Ok(members) => (StatusCode::OK, Json(json!({ "data": members }))).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn add_organization_user(
    State(app_state): State<AppState>,
    AuthSession(claims): AuthSession,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !claims.role.can_manage_members() {
        return ApiError::forbidden("Insufficient permissions");
    }

    let id = match parse_uuid(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let payload: AddOrganizationUser = match serde_json::from_value(body) {
        Ok(payload) => payload,
        Err(err) => return ApiError::bad_request(&format!("Invalid request body: {err}")),
    };

    match app_state
        .service
        .add_user(claims.tenant_id, id, payload)
        .await
    {
        Ok(member) => (
            StatusCode::CREATED,
            Json(json!({
                "data": member,
                "message": "User added to organization successfully"
            })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::mock_db::MockDb;
    use crate::models::user::UserRole;
    use crate::ratelimit::FixedWindowLimiter;
    use crate::routes::auth::claims::Claims;
    use crate::routes::organizations::create_organization;
    use crate::services::OrganizationService;
    use crate::utils::jwt::JwtKeys;
    use std::sync::Arc;
    use uuid::Uuid;

    fn test_state() -> (AppState, Arc<MockDb>) {
        let db = Arc::new(MockDb::new());
        let state = AppState {
            service: OrganizationService::new(db.clone(), db.clone()),
            jwt: JwtKeys::from_secret("0123456789abcdef0123456789abcdef").unwrap(),
            limiter: Arc::new(FixedWindowLimiter::new(100, 900)),
            config: Arc::new(Config {
                database_url: "postgres://localhost/test".into(),
                frontend_origin: "http://localhost:5173".into(),
                port: 6501,
                rate_limit_max_requests: 100,
                rate_limit_window_secs: 900,
            }),
        };
        (state, db)
    }

    fn claims(tenant_id: Uuid, role: UserRole) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            tenant_id,
            email: "test@example.com".into(),
            role,
            exp: usize::MAX,
        }
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn member_management_requires_manager_or_admin() {
        let (state, db) = test_state();
        let tenant = Uuid::new_v4();
        let manager = claims(tenant, UserRole::Manager);

        let created = create_organization(
            State(state.clone()),
            AuthSession(manager.clone()),
            Json(json!({"name": "TechCorp", "type": "advertiser"})),
        )
        .await;
        let org_id = body_json(created).await["data"]["id"]
            .as_str()
            .unwrap()
            .to_string();
        let user = db.seed_user(tenant, "analyst@example.com", UserRole::Analyst);

        let resp = add_organization_user(
            State(state.clone()),
            AuthSession(claims(tenant, UserRole::Analyst)),
            Path(org_id.clone()),
            Json(json!({"userId": user.id})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = add_organization_user(
            State(state.clone()),
            AuthSession(manager.clone()),
            Path(org_id.clone()),
            Json(json!({"userId": user.id, "role": "analyst"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_json(resp).await;
        assert_eq!(body["data"]["role"], "analyst");
        assert_eq!(body["data"]["user"]["email"], "analyst@example.com");

        let resp =
            list_organization_users(State(state), AuthSession(manager), Path(org_id)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }
}
