//! Authentication and authorization core.
//!
//! Credentials are verified against the directory, the user's roles are
//! resolved into a url-keyed permission map, and the map is signed into an
//! access token. Each protected request validates the token and runs the
//! guard against the request path before any handler executes.

pub mod claims;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod password;
pub mod resolver;
pub mod token;

pub use claims::{AuthUser, PermissionGrant, PermissionMap, PermissionView, RoleView, TokenPayload};
pub use credentials::CredentialVerifier;
pub use error::AuthError;
pub use guard::authorize;
pub use password::PasswordHasher;
pub use resolver::{GrantPrecedence, PermissionResolver};
pub use token::{Clock, IssuedToken, ManualClock, SystemClock, TokenService};
