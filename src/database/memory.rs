use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::models::role::RoleRow;
use crate::database::models::user::UserRow;
use crate::database::models::{
    NewPermission, NewRole, NewUser, Permission, PermissionChanges, PermissionFilter, Role,
    RoleChanges, RoleFilter, User, UserChanges, UserFilter,
};
use crate::database::repository::{distinct_ids, missing_ids, Directory};
use crate::types::{EntityKind, Page, PageRequest};

struct StoredRole {
    row: RoleRow,
    permission_ids: Vec<i32>,
}

struct StoredUser {
    row: UserRow,
    role_ids: Vec<i32>,
}

#[derive(Default)]
struct Store {
    permissions: BTreeMap<i32, Permission>,
    roles: BTreeMap<i32, StoredRole>,
    users: BTreeMap<i32, StoredUser>,
    sequences: BTreeMap<EntityKind, i32>,
}

impl Store {
    /// One sequence per table, like a SERIAL column.
    fn allocate_id(&mut self, kind: EntityKind) -> i32 {
        let next = self.sequences.entry(kind).or_insert(0);
        *next += 1;
        *next
    }

    fn active_permission(&self, id: i32) -> Option<&Permission> {
        self.permissions.get(&id).filter(|p| p.is_active())
    }

    fn role_is_active(&self, id: i32) -> bool {
        self.roles
            .get(&id)
            .is_some_and(|r| r.row.enable && !r.row.deleted)
    }

    fn load_role(&self, stored: &StoredRole) -> Role {
        let permissions = stored
            .permission_ids
            .iter()
            .filter_map(|id| self.active_permission(*id).cloned())
            .collect();
        stored.row.clone().into_role(permissions)
    }

    fn active_role(&self, id: i32) -> Option<Role> {
        self.roles
            .get(&id)
            .filter(|r| r.row.enable && !r.row.deleted)
            .map(|r| self.load_role(r))
    }

    fn load_user(&self, stored: &StoredUser) -> User {
        let roles = stored
            .role_ids
            .iter()
            .filter_map(|id| self.active_role(*id))
            .collect();
        stored.row.clone().into_user(roles)
    }

    fn active_user(&self, id: i32) -> Option<User> {
        self.users
            .get(&id)
            .filter(|u| u.row.enable && !u.row.deleted)
            .map(|u| self.load_user(u))
    }

    /// Resolve a membership list the way the postgres backend does inside its transaction.
    fn resolve_references(
        &self,
        kind: EntityKind,
        requested: &[i32],
    ) -> Result<Vec<i32>, DatabaseError> {
        let ids = distinct_ids(requested);
        let found: Vec<i32> = ids
            .iter()
            .copied()
            .filter(|id| match kind {
                EntityKind::Permission => self.active_permission(*id).is_some(),
                EntityKind::Role => self.role_is_active(*id),
                EntityKind::User => false,
            })
            .collect();
        if found.len() != ids.len() {
            return Err(DatabaseError::MissingReferences {
                kind,
                missing: missing_ids(&ids, &found),
            });
        }
        Ok(ids)
    }

    fn ensure_unique_permission(&self, name: &str, except: Option<i32>) -> Result<(), DatabaseError> {
        let clash = self
            .permissions
            .values()
            .any(|p| !p.deleted && p.name == name && Some(p.id) != except);
        if clash {
            return Err(DatabaseError::UniqueViolation("permissions_name_active_key".into()));
        }
        Ok(())
    }

    fn ensure_unique_role(&self, name: &str, except: Option<i32>) -> Result<(), DatabaseError> {
        let clash = self
            .roles
            .values()
            .any(|r| !r.row.deleted && r.row.name == name && Some(r.row.id) != except);
        if clash {
            return Err(DatabaseError::UniqueViolation("roles_name_active_key".into()));
        }
        Ok(())
    }

    fn ensure_unique_email(&self, email: &str, except: Option<i32>) -> Result<(), DatabaseError> {
        let clash = self
            .users
            .values()
            .any(|u| !u.row.deleted && u.row.email == email && Some(u.row.id) != except);
        if clash {
            return Err(DatabaseError::UniqueViolation("users_email_active_key".into()));
        }
        Ok(())
    }
}

fn contains_ci(haystack: &str, needle: &Option<String>) -> bool {
    match needle {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

/// Newest first, then cut to the requested page.
fn paginate<T>(mut matching: Vec<T>, page: PageRequest, id: impl Fn(&T) -> i32) -> Page<T> {
    matching.sort_by_key(|item| std::cmp::Reverse(id(item)));
    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    Page::new(items, total, &page)
}

/// In-process account directory.
///
/// Each operation runs under a single lock acquisition, so membership
/// replacement is atomic with respect to concurrent readers.
#[derive(Default)]
pub struct MemoryDirectory {
    store: RwLock<Store>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the `enable` flag on a row, for tests and administrative tooling.
    pub async fn set_enabled(&self, kind: EntityKind, id: i32, enable: bool) -> bool {
        let mut store = self.store.write().await;
        let now = Utc::now();
        match kind {
            EntityKind::Permission => store.permissions.get_mut(&id).map(|p| {
                p.enable = enable;
                p.updated_at = now;
            }),
            EntityKind::Role => store.roles.get_mut(&id).map(|r| {
                r.row.enable = enable;
                r.row.updated_at = now;
            }),
            EntityKind::User => store.users.get_mut(&id).map(|u| {
                u.row.enable = enable;
                u.row.updated_at = now;
            }),
        }
        .is_some()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn find_permission(&self, id: i32) -> Result<Option<Permission>, DatabaseError> {
        Ok(self.store.read().await.active_permission(id).cloned())
    }

    async fn find_permission_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Permission>, DatabaseError> {
        let store = self.store.read().await;
        Ok(store
            .permissions
            .values()
            .find(|p| p.is_active() && p.name == name)
            .cloned())
    }

    async fn find_permissions_by_ids(&self, ids: &[i32]) -> Result<Vec<Permission>, DatabaseError> {
        let store = self.store.read().await;
        Ok(distinct_ids(ids)
            .into_iter()
            .filter_map(|id| store.active_permission(id).cloned())
            .collect())
    }

    async fn list_permissions(
        &self,
        filter: &PermissionFilter,
        page: PageRequest,
    ) -> Result<Page<Permission>, DatabaseError> {
        let store = self.store.read().await;
        let matching: Vec<Permission> = store
            .permissions
            .values()
            .filter(|p| p.is_active())
            .filter(|p| contains_ci(&p.name, &filter.name) && contains_ci(&p.url, &filter.url))
            .cloned()
            .collect();
        Ok(paginate(matching, page, |p: &Permission| p.id))
    }

    async fn insert_permission(&self, new: NewPermission) -> Result<Permission, DatabaseError> {
        let mut store = self.store.write().await;
        store.ensure_unique_permission(&new.name, None)?;

        let now = Utc::now();
        let permission = Permission {
            id: store.allocate_id(EntityKind::Permission),
            name: new.name,
            url: new.url,
            regex: new.regex,
            enable: true,
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        store.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn update_permission(
        &self,
        id: i32,
        changes: PermissionChanges,
    ) -> Result<Option<Permission>, DatabaseError> {
        let mut store = self.store.write().await;
        if store.active_permission(id).is_none() {
            return Ok(None);
        }
        if let Some(name) = &changes.name {
            store.ensure_unique_permission(name, Some(id))?;
        }

        let Some(permission) = store.permissions.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            permission.name = name;
        }
        if let Some(url) = changes.url {
            permission.url = url;
        }
        if let Some(regex) = changes.regex {
            permission.regex = regex;
        }
        permission.updated_at = Utc::now();
        Ok(Some(permission.clone()))
    }

    async fn find_role(&self, id: i32) -> Result<Option<Role>, DatabaseError> {
        Ok(self.store.read().await.active_role(id))
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, DatabaseError> {
        let store = self.store.read().await;
        Ok(store
            .roles
            .values()
            .find(|r| r.row.enable && !r.row.deleted && r.row.name == name)
            .map(|r| store.load_role(r)))
    }

    async fn find_roles_by_ids(&self, ids: &[i32]) -> Result<Vec<Role>, DatabaseError> {
        let store = self.store.read().await;
        Ok(distinct_ids(ids)
            .into_iter()
            .filter_map(|id| store.active_role(id))
            .collect())
    }

    async fn list_roles(
        &self,
        filter: &RoleFilter,
        page: PageRequest,
    ) -> Result<Page<Role>, DatabaseError> {
        let store = self.store.read().await;
        let matching: Vec<Role> = store
            .roles
            .values()
            .filter(|r| r.row.enable && !r.row.deleted)
            .filter(|r| contains_ci(&r.row.name, &filter.name))
            .map(|r| store.load_role(r))
            .collect();
        Ok(paginate(matching, page, |r: &Role| r.id))
    }

    async fn insert_role(&self, new: NewRole) -> Result<Role, DatabaseError> {
        let mut store = self.store.write().await;
        store.ensure_unique_role(&new.name, None)?;
        let permission_ids = store.resolve_references(EntityKind::Permission, &new.permission_ids)?;

        let now = Utc::now();
        let id = store.allocate_id(EntityKind::Role);
        let stored = StoredRole {
            row: RoleRow {
                id,
                name: new.name,
                enable: true,
                deleted: false,
                created_at: now,
                updated_at: now,
            },
            permission_ids,
        };
        let role = store.load_role(&stored);
        store.roles.insert(id, stored);
        Ok(role)
    }

    async fn update_role(
        &self,
        id: i32,
        changes: RoleChanges,
    ) -> Result<Option<Role>, DatabaseError> {
        let mut store = self.store.write().await;
        if !store.role_is_active(id) {
            return Ok(None);
        }
        if let Some(name) = &changes.name {
            store.ensure_unique_role(name, Some(id))?;
        }
        let permission_ids = match &changes.permission_ids {
            Some(ids) => Some(store.resolve_references(EntityKind::Permission, ids)?),
            None => None,
        };

        let Some(stored) = store.roles.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            stored.row.name = name;
        }
        if let Some(ids) = permission_ids {
            stored.permission_ids = ids;
        }
        stored.row.updated_at = Utc::now();
        Ok(store.active_role(id))
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>, DatabaseError> {
        Ok(self.store.read().await.active_user(id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let store = self.store.read().await;
        Ok(store
            .users
            .values()
            .find(|u| u.row.enable && !u.row.deleted && u.row.email == email)
            .map(|u| store.load_user(u)))
    }

    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>, DatabaseError> {
        let store = self.store.read().await;
        let matching: Vec<User> = store
            .users
            .values()
            .filter(|u| u.row.enable && !u.row.deleted)
            .filter(|u| contains_ci(&u.row.name, &filter.name))
            .filter(|u| contains_ci(&u.row.email, &filter.email))
            .filter(|u| filter.role_id.map_or(true, |role_id| u.role_ids.contains(&role_id)))
            .map(|u| store.load_user(u))
            .collect();
        Ok(paginate(matching, page, |u: &User| u.id))
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, DatabaseError> {
        let mut store = self.store.write().await;
        store.ensure_unique_email(&new.email, None)?;
        let role_ids = store.resolve_references(EntityKind::Role, &new.role_ids)?;

        let now = Utc::now();
        let id = store.allocate_id(EntityKind::User);
        let stored = StoredUser {
            row: UserRow {
                id,
                name: new.name,
                email: new.email,
                password: new.password_hash,
                enable: true,
                deleted: false,
                created_at: now,
                updated_at: now,
            },
            role_ids,
        };
        let user = store.load_user(&stored);
        store.users.insert(id, stored);
        Ok(user)
    }

    async fn update_user(
        &self,
        id: i32,
        changes: UserChanges,
    ) -> Result<Option<User>, DatabaseError> {
        let mut store = self.store.write().await;
        if store.active_user(id).is_none() {
            return Ok(None);
        }
        if let Some(email) = &changes.email {
            store.ensure_unique_email(email, Some(id))?;
        }
        let role_ids = match &changes.role_ids {
            Some(ids) => Some(store.resolve_references(EntityKind::Role, ids)?),
            None => None,
        };

        let Some(stored) = store.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            stored.row.name = name;
        }
        if let Some(email) = changes.email {
            stored.row.email = email;
        }
        if let Some(ids) = role_ids {
            stored.role_ids = ids;
        }
        stored.row.updated_at = Utc::now();
        Ok(store.active_user(id))
    }

    async fn update_password(&self, id: i32, password_hash: &str) -> Result<bool, DatabaseError> {
        let mut store = self.store.write().await;
        match store.users.get_mut(&id) {
            Some(stored) if stored.row.enable && !stored.row.deleted => {
                stored.row.password = password_hash.to_string();
                stored.row.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn soft_delete(&self, kind: EntityKind, id: i32) -> Result<bool, DatabaseError> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        let (enable, deleted, updated_at) = match kind {
            EntityKind::Permission => match store.permissions.get_mut(&id) {
                Some(p) => (p.enable, &mut p.deleted, &mut p.updated_at),
                None => return Ok(false),
            },
            EntityKind::Role => match store.roles.get_mut(&id) {
                Some(r) => (r.row.enable, &mut r.row.deleted, &mut r.row.updated_at),
                None => return Ok(false),
            },
            EntityKind::User => match store.users.get_mut(&id) {
                Some(u) => (u.row.enable, &mut u.row.deleted, &mut u.row.updated_at),
                None => return Ok(false),
            },
        };
        if !enable || *deleted {
            return Ok(false);
        }
        *deleted = true;
        *updated_at = now;
        Ok(true)
    }

    async fn hard_delete(&self, kind: EntityKind, id: i32) -> Result<bool, DatabaseError> {
        let mut store = self.store.write().await;
        let removed = match kind {
            EntityKind::Permission => {
                let removed = store.permissions.remove(&id).is_some();
                for role in store.roles.values_mut() {
                    role.permission_ids.retain(|p| *p != id);
                }
                removed
            }
            EntityKind::Role => {
                let removed = store.roles.remove(&id).is_some();
                for user in store.users.values_mut() {
                    user.role_ids.retain(|r| *r != id);
                }
                removed
            }
            EntityKind::User => store.users.remove(&id).is_some(),
        };
        Ok(removed)
    }

    async fn count(&self, kind: EntityKind) -> Result<u64, DatabaseError> {
        let store = self.store.read().await;
        let total = match kind {
            EntityKind::Permission => store.permissions.len(),
            EntityKind::Role => store.roles.len(),
            EntityKind::User => store.users.len(),
        };
        Ok(total as u64)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
