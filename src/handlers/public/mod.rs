// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition and service status endpoints.
//
// Security Level: None
// Route Prefix: none (e.g., /auth/login, /health)
// Middleware: request tracing and CORS only

pub mod auth;
pub mod system;

pub use system::{health_get, root_get};
