pub mod auth;
pub mod authorize;
pub mod response;

pub use auth::jwt_auth_middleware;
pub use authorize::authorize_middleware;
pub use response::{ApiResponse, ApiResult};
