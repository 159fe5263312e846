// handlers/protected/auth/mod.rs - Authenticated self-service handlers
//
// These only need a valid token; the permission guard does not apply.

pub mod change_password; // POST /auth/change-password
pub mod profile;         // GET /auth/profile

pub use change_password::change_password_post;
pub use profile::profile_get;
