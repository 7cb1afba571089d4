// handlers/protected/mod.rs - Protected handlers (token cookie required)
//
// Security Level: Token Authentication Required
// Middleware: cookie_auth_middleware injects `AuthUser`

pub mod applications;
