pub mod auth_service;
pub mod error;
pub mod permission_service;
pub mod role_service;
pub mod seeder;
pub mod user_service;

pub use auth_service::{AuthService, Session};
pub use error::ServiceError;
pub use permission_service::PermissionService;
pub use role_service::RoleService;
pub use seeder::{SeedReport, Seeder};
pub use user_service::{CreateUser, UserService};

use tracing::info;

use crate::database::Directory;
use crate::types::EntityKind;

/// Soft-delete by default; `permanent` removes the row and its junction rows.
pub(crate) async fn delete_entity(
    directory: &dyn Directory,
    kind: EntityKind,
    id: i32,
    permanent: bool,
) -> Result<(), ServiceError> {
    let removed = if permanent {
        directory.hard_delete(kind, id).await?
    } else {
        directory.soft_delete(kind, id).await?
    };
    if !removed {
        return Err(ServiceError::not_found(kind, id));
    }
    info!("{} {} deleted (permanent: {})", kind, id, permanent);
    Ok(())
}
