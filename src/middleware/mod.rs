pub mod auth;

pub use auth::{cookie_auth_middleware, AuthUser, TOKEN_COOKIE};
