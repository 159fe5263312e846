use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    NewPermission, NewRole, NewUser, Permission, PermissionChanges, PermissionFilter, Role,
    RoleChanges, RoleFilter, User, UserChanges, UserFilter,
};
use crate::types::{EntityKind, Page, PageRequest};

/// Persistent storage for users, roles and permissions.
///
/// Every lookup skips rows that are soft-deleted or disabled, including the
/// nested roles and permissions loaded alongside an entity. Membership lists
/// passed to `insert_*`/`update_*` replace the stored set atomically; ids that
/// no longer resolve inside the write fail it with
/// [`DatabaseError::MissingReferences`] and nothing is persisted.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_permission(&self, id: i32) -> Result<Option<Permission>, DatabaseError>;
    async fn find_permission_by_name(&self, name: &str)
        -> Result<Option<Permission>, DatabaseError>;
    /// Active permissions among `ids`, ordered by id.
    async fn find_permissions_by_ids(&self, ids: &[i32]) -> Result<Vec<Permission>, DatabaseError>;
    async fn list_permissions(
        &self,
        filter: &PermissionFilter,
        page: PageRequest,
    ) -> Result<Page<Permission>, DatabaseError>;
    async fn insert_permission(&self, new: NewPermission) -> Result<Permission, DatabaseError>;
    async fn update_permission(
        &self,
        id: i32,
        changes: PermissionChanges,
    ) -> Result<Option<Permission>, DatabaseError>;

    async fn find_role(&self, id: i32) -> Result<Option<Role>, DatabaseError>;
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, DatabaseError>;
    /// Active roles among `ids`, ordered by id.
    async fn find_roles_by_ids(&self, ids: &[i32]) -> Result<Vec<Role>, DatabaseError>;
    async fn list_roles(
        &self,
        filter: &RoleFilter,
        page: PageRequest,
    ) -> Result<Page<Role>, DatabaseError>;
    async fn insert_role(&self, new: NewRole) -> Result<Role, DatabaseError>;
    async fn update_role(&self, id: i32, changes: RoleChanges)
        -> Result<Option<Role>, DatabaseError>;

    async fn find_user(&self, id: i32) -> Result<Option<User>, DatabaseError>;
    /// Exact, case-sensitive match on email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>, DatabaseError>;
    async fn insert_user(&self, new: NewUser) -> Result<User, DatabaseError>;
    async fn update_user(&self, id: i32, changes: UserChanges)
        -> Result<Option<User>, DatabaseError>;
    async fn update_password(&self, id: i32, password_hash: &str) -> Result<bool, DatabaseError>;

    /// Mark an active row deleted. Returns false when there was nothing to delete.
    async fn soft_delete(&self, kind: EntityKind, id: i32) -> Result<bool, DatabaseError>;
    /// Physically remove a row, soft-deleted or not; junction rows cascade.
    async fn hard_delete(&self, kind: EntityKind, id: i32) -> Result<bool, DatabaseError>;
    /// Number of rows of `kind`, deleted ones included.
    async fn count(&self, kind: EntityKind) -> Result<u64, DatabaseError>;
    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// Sorted, de-duplicated copy of a requested id list.
pub fn distinct_ids(ids: &[i32]) -> Vec<i32> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Requested ids that are absent from `found`.
pub fn missing_ids(requested: &[i32], found: &[i32]) -> Vec<i32> {
    requested
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_ids_sorts_and_collapses() {
        assert_eq!(distinct_ids(&[3, 1, 3, 2, 1]), vec![1, 2, 3]);
        assert!(distinct_ids(&[]).is_empty());
    }

    #[test]
    fn missing_ids_keeps_request_order() {
        assert_eq!(missing_ids(&[1, 2, 999, 7], &[1, 2]), vec![999, 7]);
        assert!(missing_ids(&[1], &[1]).is_empty());
    }
}
