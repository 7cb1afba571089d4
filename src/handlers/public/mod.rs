// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Middleware: None
//
// Application lookups and mutations by id are reachable without a token.
// Only the applicant listing in `protected` checks the caller's identity.

pub mod applications;
pub mod jobs;
pub mod session;
