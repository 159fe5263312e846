pub mod permission;
pub mod role;
pub mod user;

pub use permission::{NewPermission, Permission, PermissionChanges, PermissionFilter};
pub use role::{NewRole, Role, RoleChanges, RoleFilter};
pub use user::{NewUser, User, UserChanges, UserFilter};
