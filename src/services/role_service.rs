use std::sync::Arc;

use tracing::info;

use super::error::ServiceError;
use crate::database::models::{NewRole, Role, RoleChanges, RoleFilter};
use crate::database::repository::{distinct_ids, missing_ids};
use crate::database::Directory;
use crate::types::{EntityKind, Page, PageRequest};

const KIND: EntityKind = EntityKind::Role;

pub struct RoleService {
    directory: Arc<dyn Directory>,
}

impl RoleService {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Create a role; every referenced permission must resolve or nothing is written.
    pub async fn create(&self, new: NewRole) -> Result<Role, ServiceError> {
        self.ensure_name_free(&new.name, None).await?;
        let permission_ids = self.resolve_permissions(&new.permission_ids).await?;

        let role = self
            .directory
            .insert_role(NewRole {
                name: new.name,
                permission_ids,
            })
            .await
            .map_err(|e| ServiceError::from_write(KIND, e))?;
        info!(
            "Created role {} ({}) with {} permissions",
            role.id,
            role.name,
            role.permissions.len()
        );
        Ok(role)
    }

    pub async fn list(&self, filter: &RoleFilter, page: PageRequest) -> Result<Page<Role>, ServiceError> {
        Ok(self.directory.list_roles(filter, page).await?)
    }

    pub async fn get(&self, id: i32) -> Result<Role, ServiceError> {
        self.directory
            .find_role(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(KIND, id))
    }

    /// Apply `changes`; a supplied permission list replaces the current one.
    pub async fn update(&self, id: i32, changes: RoleChanges) -> Result<Role, ServiceError> {
        let current = self.get(id).await?;
        if let Some(name) = changes.name.as_deref() {
            if name != current.name {
                self.ensure_name_free(name, Some(id)).await?;
            }
        }
        let permission_ids = match changes.permission_ids {
            Some(ids) => Some(self.resolve_permissions(&ids).await?),
            None => None,
        };

        let role = self
            .directory
            .update_role(
                id,
                RoleChanges {
                    name: changes.name,
                    permission_ids,
                },
            )
            .await
            .map_err(|e| ServiceError::from_write(KIND, e))?
            .ok_or_else(|| ServiceError::not_found(KIND, id))?;
        info!("Updated role {}", id);
        Ok(role)
    }

    pub async fn delete(&self, id: i32, permanent: bool) -> Result<(), ServiceError> {
        super::delete_entity(self.directory.as_ref(), KIND, id, permanent).await
    }

    async fn resolve_permissions(&self, requested: &[i32]) -> Result<Vec<i32>, ServiceError> {
        let ids = distinct_ids(requested);
        if ids.is_empty() {
            return Ok(ids);
        }
        let found: Vec<i32> = self
            .directory
            .find_permissions_by_ids(&ids)
            .await?
            .iter()
            .map(|p| p.id)
            .collect();
        if found.len() < ids.len() {
            return Err(ServiceError::PartialReferenceFailure {
                kind: EntityKind::Permission,
                missing: missing_ids(&ids, &found),
            });
        }
        Ok(ids)
    }

    async fn ensure_name_free(&self, name: &str, except: Option<i32>) -> Result<(), ServiceError> {
        match self.directory.find_role_by_name(name).await? {
            Some(other) if Some(other.id) != except => Err(ServiceError::DuplicateName { kind: KIND }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewPermission;
    use crate::database::MemoryDirectory;

    async fn setup() -> (Arc<MemoryDirectory>, RoleService, Vec<i32>) {
        let directory = Arc::new(MemoryDirectory::new());
        let mut ids = Vec::new();
        for name in ["users:read", "users:write"] {
            let p = directory
                .insert_permission(NewPermission {
                    name: name.into(),
                    url: "/api/users".into(),
                    regex: "^/api/users$".into(),
                })
                .await
                .unwrap();
            ids.push(p.id);
        }
        let service = RoleService::new(directory.clone());
        (directory, service, ids)
    }

    #[tokio::test]
    async fn create_with_unknown_permission_fails_atomically() {
        let (directory, service, ids) = setup().await;
        let err = service
            .create(NewRole {
                name: "auditor".into(),
                permission_ids: vec![ids[0], ids[1], 999],
            })
            .await
            .unwrap_err();

        match err {
            ServiceError::PartialReferenceFailure { kind, missing } => {
                assert_eq!(kind, EntityKind::Permission);
                assert_eq!(missing, vec![999]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(directory.count(EntityKind::Role).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rename_to_own_name_is_allowed_but_not_to_another() {
        let (_, service, ids) = setup().await;
        let admin = service
            .create(NewRole {
                name: "admin".into(),
                permission_ids: ids.clone(),
            })
            .await
            .unwrap();
        service
            .create(NewRole {
                name: "user".into(),
                permission_ids: vec![],
            })
            .await
            .unwrap();

        let same = service
            .update(
                admin.id,
                RoleChanges {
                    name: Some("admin".into()),
                    permission_ids: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(same.permissions.len(), 2);

        let err = service
            .update(
                admin.id,
                RoleChanges {
                    name: Some("user".into()),
                    permission_ids: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateName { kind: EntityKind::Role }));
    }

    #[tokio::test]
    async fn update_replaces_membership() {
        let (_, service, ids) = setup().await;
        let role = service
            .create(NewRole {
                name: "admin".into(),
                permission_ids: vec![ids[0]],
            })
            .await
            .unwrap();

        let replaced = service
            .update(
                role.id,
                RoleChanges {
                    name: None,
                    permission_ids: Some(vec![ids[1], ids[1]]),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            replaced.permissions.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![ids[1]]
        );

        let cleared = service
            .update(
                role.id,
                RoleChanges {
                    name: None,
                    permission_ids: Some(vec![]),
                },
            )
            .await
            .unwrap();
        assert!(cleared.permissions.is_empty());
    }

    #[tokio::test]
    async fn deleted_role_is_not_found() {
        let (_, service, _) = setup().await;
        let role = service
            .create(NewRole {
                name: "temp".into(),
                permission_ids: vec![],
            })
            .await
            .unwrap();

        service.delete(role.id, false).await.unwrap();
        assert!(matches!(
            service.get(role.id).await,
            Err(ServiceError::NotFound { kind: EntityKind::Role, .. })
        ));
        assert!(matches!(
            service.delete(role.id, false).await,
            Err(ServiceError::NotFound { .. })
        ));
        service.delete(role.id, true).await.unwrap();
    }
}
