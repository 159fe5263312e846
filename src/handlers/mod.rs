// handlers/mod.rs - 2-Tier Handler Architecture
//
// Public (no auth) → Protected (JWT auth, plus the permission guard under /api)
//
// Each handler lives in its own file named after the route it serves and
// is re-exported through the tier's mod.rs for routing in router.rs.
pub mod public;    // Tier 1: No authentication required (/, /health, /auth/*)
pub mod protected; // Tier 2: JWT authentication required (/auth/profile, /api/*)
