use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;

use crate::database::manager::DatabaseError;
use crate::database::models::permission::{PermissionRow, RolePermissionRow};
use crate::database::models::role::{RoleRow, UserRoleRow};
use crate::database::models::user::UserRow;
use crate::database::models::{
    NewPermission, NewRole, NewUser, Permission, PermissionChanges, PermissionFilter, Role,
    RoleChanges, RoleFilter, User, UserChanges, UserFilter,
};
use crate::database::repository::{distinct_ids, missing_ids, Directory};
use crate::types::{EntityKind, Page, PageRequest};

const PERMISSION_COLUMNS: &str = "id, name, url, regex, enable, deleted, created_at, updated_at";
const ROLE_COLUMNS: &str = "id, name, enable, deleted, created_at, updated_at";
const USER_COLUMNS: &str = "id, name, email, password, enable, deleted, created_at, updated_at";
const ACTIVE: &str = "enable = true AND deleted = false";

/// Account directory backed by postgres.
///
/// Nested relations are loaded in one batched query per level rather than
/// per row. Roles and permissions always come back ordered by id.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_permissions(&self, rows: Vec<RoleRow>) -> Result<Vec<Role>, DatabaseError> {
        let role_ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut by_role: HashMap<i32, Vec<Permission>> = HashMap::new();

        if !role_ids.is_empty() {
            let joined: Vec<RolePermissionRow> = sqlx::query_as(
                "SELECT rp.role_id, p.id, p.name, p.url, p.regex, p.enable, p.deleted, \
                        p.created_at, p.updated_at \
                 FROM role_permission rp \
                 JOIN permissions p ON p.id = rp.permission_id \
                 WHERE rp.role_id = ANY($1) AND p.enable = true AND p.deleted = false \
                 ORDER BY rp.role_id, p.id",
            )
            .bind(&role_ids[..])
            .fetch_all(&self.pool)
            .await?;

            for row in joined {
                let (role_id, permission) = row.split();
                by_role.entry(role_id).or_default().push(permission);
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let permissions = by_role.remove(&row.id).unwrap_or_default();
                row.into_role(permissions)
            })
            .collect())
    }

    async fn attach_roles(&self, rows: Vec<UserRow>) -> Result<Vec<User>, DatabaseError> {
        let user_ids: Vec<i32> = rows.iter().map(|u| u.id).collect();
        let mut by_user: HashMap<i32, Vec<i32>> = HashMap::new();
        let mut roles: HashMap<i32, Role> = HashMap::new();

        if !user_ids.is_empty() {
            let joined: Vec<UserRoleRow> = sqlx::query_as(
                "SELECT ur.user_id, r.id, r.name, r.enable, r.deleted, r.created_at, r.updated_at \
                 FROM user_roles ur \
                 JOIN roles r ON r.id = ur.role_id \
                 WHERE ur.user_id = ANY($1) AND r.enable = true AND r.deleted = false \
                 ORDER BY ur.user_id, r.id",
            )
            .bind(&user_ids[..])
            .fetch_all(&self.pool)
            .await?;

            let mut role_rows: HashMap<i32, RoleRow> = HashMap::new();
            for row in joined {
                let (user_id, role) = row.split();
                by_user.entry(user_id).or_default().push(role.id);
                role_rows.entry(role.id).or_insert(role);
            }

            for role in self.attach_permissions(role_rows.into_values().collect()).await? {
                roles.insert(role.id, role);
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let user_roles = by_user
                    .remove(&row.id)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|id| roles.get(&id).cloned())
                    .collect();
                row.into_user(user_roles)
            })
            .collect())
    }

    async fn replace_role_permissions(
        tx: &mut Transaction<'_, Postgres>,
        role_id: i32,
        permission_ids: &[i32],
    ) -> Result<(), DatabaseError> {
        let ids = distinct_ids(permission_ids);

        sqlx::query("DELETE FROM role_permission WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut **tx)
            .await?;

        if ids.is_empty() {
            return Ok(());
        }

        let inserted: Vec<i32> = sqlx::query_scalar(
            "INSERT INTO role_permission (role_id, permission_id) \
             SELECT $1, p.id FROM permissions p \
             WHERE p.id = ANY($2) AND p.enable = true AND p.deleted = false \
             RETURNING permission_id",
        )
        .bind(role_id)
        .bind(&ids[..])
        .fetch_all(&mut **tx)
        .await?;

        if inserted.len() != ids.len() {
            return Err(DatabaseError::MissingReferences {
                kind: EntityKind::Permission,
                missing: missing_ids(&ids, &inserted),
            });
        }
        debug!("Role {} now holds {} permissions", role_id, ids.len());
        Ok(())
    }

    async fn replace_user_roles(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i32,
        role_ids: &[i32],
    ) -> Result<(), DatabaseError> {
        let ids = distinct_ids(role_ids);

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        if ids.is_empty() {
            return Ok(());
        }

        let inserted: Vec<i32> = sqlx::query_scalar(
            "INSERT INTO user_roles (user_id, role_id) \
             SELECT $1, r.id FROM roles r \
             WHERE r.id = ANY($2) AND r.enable = true AND r.deleted = false \
             RETURNING role_id",
        )
        .bind(user_id)
        .bind(&ids[..])
        .fetch_all(&mut **tx)
        .await?;

        if inserted.len() != ids.len() {
            return Err(DatabaseError::MissingReferences {
                kind: EntityKind::Role,
                missing: missing_ids(&ids, &inserted),
            });
        }
        debug!("User {} now holds {} roles", user_id, ids.len());
        Ok(())
    }

    async fn count_where(
        &self,
        mut builder: QueryBuilder<'_, Postgres>,
    ) -> Result<u64, DatabaseError> {
        let total: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    fn reloaded<T>(found: Option<T>, kind: EntityKind, id: i32) -> Result<T, DatabaseError> {
        found.ok_or_else(|| DatabaseError::NotFound(format!("{} {} vanished after write", kind, id)))
    }
}

/// `%term%` for ILIKE with the wildcard characters of `term` escaped.
fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_permission_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &PermissionFilter) {
    builder.push(" WHERE ").push(ACTIVE);
    if let Some(name) = &filter.name {
        builder.push(" AND name ILIKE ").push_bind(contains_pattern(name));
    }
    if let Some(url) = &filter.url {
        builder.push(" AND url ILIKE ").push_bind(contains_pattern(url));
    }
}

fn push_role_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &RoleFilter) {
    builder.push(" WHERE ").push(ACTIVE);
    if let Some(name) = &filter.name {
        builder.push(" AND name ILIKE ").push_bind(contains_pattern(name));
    }
}

fn push_user_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    builder.push(" WHERE ").push(ACTIVE);
    if let Some(name) = &filter.name {
        builder.push(" AND name ILIKE ").push_bind(contains_pattern(name));
    }
    if let Some(email) = &filter.email {
        builder.push(" AND email ILIKE ").push_bind(contains_pattern(email));
    }
    if let Some(role_id) = filter.role_id {
        builder
            .push(" AND EXISTS (SELECT 1 FROM user_roles ur WHERE ur.user_id = users.id AND ur.role_id = ")
            .push_bind(role_id)
            .push(")");
    }
}

fn push_page(builder: &mut QueryBuilder<'_, Postgres>, page: PageRequest) {
    builder
        .push(" ORDER BY id DESC LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(page.offset() as i64);
}

#[async_trait]
impl Directory for PgDirectory {
    async fn find_permission(&self, id: i32) -> Result<Option<Permission>, DatabaseError> {
        let row: Option<PermissionRow> = sqlx::query_as(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = $1 AND {ACTIVE}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Permission::from))
    }

    async fn find_permission_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Permission>, DatabaseError> {
        let row: Option<PermissionRow> = sqlx::query_as(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE name = $1 AND {ACTIVE}"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Permission::from))
    }

    async fn find_permissions_by_ids(&self, ids: &[i32]) -> Result<Vec<Permission>, DatabaseError> {
        let ids = distinct_ids(ids);
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows: Vec<PermissionRow> = sqlx::query_as(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = ANY($1) AND {ACTIVE} ORDER BY id"
        ))
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Permission::from).collect())
    }

    async fn list_permissions(
        &self,
        filter: &PermissionFilter,
        page: PageRequest,
    ) -> Result<Page<Permission>, DatabaseError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM permissions");
        push_permission_filter(&mut count, filter);
        let total = self.count_where(count).await?;

        let mut select = QueryBuilder::new(format!("SELECT {PERMISSION_COLUMNS} FROM permissions"));
        push_permission_filter(&mut select, filter);
        push_page(&mut select, page);
        let rows: Vec<PermissionRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page::new(
            rows.into_iter().map(Permission::from).collect(),
            total,
            &page,
        ))
    }

    async fn insert_permission(&self, new: NewPermission) -> Result<Permission, DatabaseError> {
        let row: PermissionRow = sqlx::query_as(&format!(
            "INSERT INTO permissions (name, url, regex) VALUES ($1, $2, $3) \
             RETURNING {PERMISSION_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.url)
        .bind(&new.regex)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_permission(
        &self,
        id: i32,
        changes: PermissionChanges,
    ) -> Result<Option<Permission>, DatabaseError> {
        let row: Option<PermissionRow> = sqlx::query_as(&format!(
            "UPDATE permissions SET \
                name = COALESCE($2, name), \
                url = COALESCE($3, url), \
                regex = COALESCE($4, regex), \
                updated_at = now() \
             WHERE id = $1 AND {ACTIVE} \
             RETURNING {PERMISSION_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.url)
        .bind(changes.regex)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Permission::from))
    }

    async fn find_role(&self, id: i32) -> Result<Option<Role>, DatabaseError> {
        let row: Option<RoleRow> = sqlx::query_as(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1 AND {ACTIVE}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(self.attach_permissions(row.into_iter().collect()).await?.pop())
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, DatabaseError> {
        let row: Option<RoleRow> = sqlx::query_as(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1 AND {ACTIVE}"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(self.attach_permissions(row.into_iter().collect()).await?.pop())
    }

    async fn find_roles_by_ids(&self, ids: &[i32]) -> Result<Vec<Role>, DatabaseError> {
        let ids = distinct_ids(ids);
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows: Vec<RoleRow> = sqlx::query_as(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = ANY($1) AND {ACTIVE} ORDER BY id"
        ))
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?;
        self.attach_permissions(rows).await
    }

    async fn list_roles(
        &self,
        filter: &RoleFilter,
        page: PageRequest,
    ) -> Result<Page<Role>, DatabaseError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM roles");
        push_role_filter(&mut count, filter);
        let total = self.count_where(count).await?;

        let mut select = QueryBuilder::new(format!("SELECT {ROLE_COLUMNS} FROM roles"));
        push_role_filter(&mut select, filter);
        push_page(&mut select, page);
        let rows: Vec<RoleRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page::new(self.attach_permissions(rows).await?, total, &page))
    }

    async fn insert_role(&self, new: NewRole) -> Result<Role, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar("INSERT INTO roles (name) VALUES ($1) RETURNING id")
            .bind(&new.name)
            .fetch_one(&mut *tx)
            .await?;
        Self::replace_role_permissions(&mut tx, id, &new.permission_ids).await?;

        tx.commit().await?;
        let role = self.find_role(id).await?;
        Self::reloaded(role, EntityKind::Role, id)
    }

    async fn update_role(
        &self,
        id: i32,
        changes: RoleChanges,
    ) -> Result<Option<Role>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<i32> = sqlx::query_scalar(&format!(
            "UPDATE roles SET name = COALESCE($2, name), updated_at = now() \
             WHERE id = $1 AND {ACTIVE} RETURNING id"
        ))
        .bind(id)
        .bind(changes.name)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Ok(None);
        }
        if let Some(permission_ids) = &changes.permission_ids {
            Self::replace_role_permissions(&mut tx, id, permission_ids).await?;
        }

        tx.commit().await?;
        self.find_role(id).await
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>, DatabaseError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND {ACTIVE}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(self.attach_roles(row.into_iter().collect()).await?.pop())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND {ACTIVE}"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(self.attach_roles(row.into_iter().collect()).await?.pop())
    }

    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>, DatabaseError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_user_filter(&mut count, filter);
        let total = self.count_where(count).await?;

        let mut select = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_user_filter(&mut select, filter);
        push_page(&mut select, page);
        let rows: Vec<UserRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page::new(self.attach_roles(rows).await?, total, &page))
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            "INSERT INTO users (name, email, password) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .fetch_one(&mut *tx)
        .await?;
        Self::replace_user_roles(&mut tx, id, &new.role_ids).await?;

        tx.commit().await?;
        let user = self.find_user(id).await?;
        Self::reloaded(user, EntityKind::User, id)
    }

    async fn update_user(
        &self,
        id: i32,
        changes: UserChanges,
    ) -> Result<Option<User>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<i32> = sqlx::query_scalar(&format!(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                email = COALESCE($3, email), \
                updated_at = now() \
             WHERE id = $1 AND {ACTIVE} RETURNING id"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Ok(None);
        }
        if let Some(role_ids) = &changes.role_ids {
            Self::replace_user_roles(&mut tx, id, role_ids).await?;
        }

        tx.commit().await?;
        self.find_user(id).await
    }

    async fn update_password(&self, id: i32, password_hash: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(&format!(
            "UPDATE users SET password = $2, updated_at = now() WHERE id = $1 AND {ACTIVE}"
        ))
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, kind: EntityKind, id: i32) -> Result<bool, DatabaseError> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET deleted = true, updated_at = now() WHERE id = $1 AND {ACTIVE}",
            kind.table()
        ))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn hard_delete(&self, kind: EntityKind, id: i32) -> Result<bool, DatabaseError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, kind: EntityKind) -> Result<u64, DatabaseError> {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", kind.table()))
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("adm"), "%adm%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn user_filter_renders_role_subquery() {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_user_filter(
            &mut builder,
            &UserFilter {
                name: Some("ad".into()),
                email: None,
                role_id: Some(2),
            },
        );
        push_page(&mut builder, PageRequest::new(Some(2), Some(5)));
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM users WHERE enable = true AND deleted = false \
             AND name ILIKE $1 \
             AND EXISTS (SELECT 1 FROM user_roles ur WHERE ur.user_id = users.id AND ur.role_id = $2) \
             ORDER BY id DESC LIMIT $3 OFFSET $4"
        );
    }
}
