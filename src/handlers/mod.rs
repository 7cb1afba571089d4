// handlers/mod.rs - HTTP handlers grouped by protection level
//
// public:    no credential required (token issuance, jobs, most application routes)
// protected: mounted behind the cookie auth middleware

pub mod protected;
pub mod public;
