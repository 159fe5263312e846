// handlers/public/auth/mod.rs - Public authentication handlers
//
// Token acquisition endpoints. Every failure on login answers with the same
// 401 body whether the email or the password was wrong.

pub mod login;    // POST /auth/login - authenticate and get tokens
pub mod register; // POST /auth/register - create a role-less account
pub mod refresh;  // POST /auth/refresh - trade a refresh token for a new pair

pub use login::login_post;
pub use refresh::refresh_post;
pub use register::register_post;
