use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::ratelimit::FixedWindowLimiter;
use crate::services::OrganizationService;
use crate::utils::jwt::JwtKeys;

#[derive(Clone)]
pub struct AppState {
    pub service: OrganizationService,
    pub jwt: JwtKeys,
    pub limiter: Arc<FixedWindowLimiter>,
    pub config: Arc<Config>,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}
