use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};

use crate::auth::Identity;
use crate::config::{SameSitePolicy, SecurityConfig};
use crate::error::ApiError;
use crate::middleware::TOKEN_COOKIE;
use crate::state::AppState;

/// POST /jwt - Issue a session token for `{ email, ... }` and set it as the `token` cookie
pub async fn issue(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(identity): Json<Identity>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let email = identity.email.clone();
    let token = state.tokens.issue(identity)?;
    tracing::info!(%email, "issued session token");

    let cookie = token_cookie(&state.config.security, token);
    Ok((jar.add(cookie), Json(json!({ "success": true }))))
}

/// POST /logout - Clear the `token` cookie
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    // Removal must repeat the attributes the cookie was set with. Added rather than
    // removed so the expiry is sent even when the request carried no cookie.
    let mut cookie = token_cookie(&state.config.security, String::new());
    cookie.make_removal();
    (jar.add(cookie), Json(json!({ "success": true })))
}

pub fn token_cookie(security: &SecurityConfig, value: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, value))
        .http_only(true)
        .secure(security.cookie_secure)
        .same_site(same_site(security.cookie_same_site))
        .path("/")
        .build()
}

fn same_site(policy: SameSitePolicy) -> SameSite {
    match policy {
        SameSitePolicy::Strict => SameSite::Strict,
        SameSitePolicy::Lax => SameSite::Lax,
        SameSitePolicy::None => SameSite::None,
    }
}
