// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Security Level: valid access token; /api/* additionally passes the
// permission guard before any handler here runs.
// Route Prefix: /auth/profile, /auth/change-password, /api/*
// Middleware: jwt_auth_middleware (+ authorize_middleware under /api)

pub mod auth;        // Self-service on the caller's own account
pub mod permissions; // /api/permissions CRUD
pub mod roles;       // /api/roles CRUD
pub mod users;       // /api/users CRUD
