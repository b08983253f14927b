use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::responses::ApiError;
use crate::routes::auth::claims::Claims;
use crate::utils::jwt::{decode_jwt, JwtKeys};

/// Extracts and verifies the bearer token on every protected route. Handlers
/// receiving an `AuthSession` can rely on the claims being signed and
/// unexpired.
#[derive(Debug, PartialEq)]
pub struct AuthSession(pub Claims);

impl<S> FromRequestParts<S> for AuthSession
where
    JwtKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::unauthorized("Authentication required"))?;

        let keys = JwtKeys::from_ref(state);
        let data = decode_jwt(bearer.token(), &keys)
            .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

        Ok(AuthSession(data.claims))
    }
}
