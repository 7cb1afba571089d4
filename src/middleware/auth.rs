use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;

/// Name of the cookie carrying the session token
pub const TOKEN_COOKIE: &str = "token";

/// Authenticated caller extracted from the token cookie
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub email: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self { email: claims.email }
    }
}

impl AuthUser {
    /// Ownership rule for routes scoped to one identity: the caller may only
    /// act on the email named in the request.
    pub fn require_owner(&self, requested: Option<&str>) -> Result<(), ApiError> {
        match requested {
            Some(email) if email == self.email => Ok(()),
            _ => {
                tracing::warn!(caller = %self.email, requested = ?requested, "ownership check failed");
                Err(ApiError::forbidden("forbidden access"))
            }
        }
    }
}

/// Cookie authentication middleware that validates the token and injects `AuthUser`
pub async fn cookie_auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            tracing::debug!("token cookie missing");
            ApiError::unauthorized("unauthorized access")
        })?;

    let claims = state.tokens.verify(&token)?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}
