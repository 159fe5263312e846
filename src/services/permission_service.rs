use std::sync::Arc;

use tracing::info;

use super::error::ServiceError;
use crate::database::models::{NewPermission, Permission, PermissionChanges, PermissionFilter};
use crate::database::Directory;
use crate::types::{EntityKind, Page, PageRequest};

const KIND: EntityKind = EntityKind::Permission;

pub struct PermissionService {
    directory: Arc<dyn Directory>,
}

impl PermissionService {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    pub async fn create(&self, new: NewPermission) -> Result<Permission, ServiceError> {
        self.ensure_name_free(&new.name, None).await?;

        let permission = self
            .directory
            .insert_permission(new)
            .await
            .map_err(|e| ServiceError::from_write(KIND, e))?;
        info!("Created permission {} ({})", permission.id, permission.name);
        Ok(permission)
    }

    pub async fn list(
        &self,
        filter: &PermissionFilter,
        page: PageRequest,
    ) -> Result<Page<Permission>, ServiceError> {
        Ok(self.directory.list_permissions(filter, page).await?)
    }

    pub async fn get(&self, id: i32) -> Result<Permission, ServiceError> {
        self.directory
            .find_permission(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(KIND, id))
    }

    pub async fn update(
        &self,
        id: i32,
        changes: PermissionChanges,
    ) -> Result<Permission, ServiceError> {
        let current = self.get(id).await?;
        if let Some(name) = changes.name.as_deref() {
            if name != current.name {
                self.ensure_name_free(name, Some(id)).await?;
            }
        }

        let permission = self
            .directory
            .update_permission(id, changes)
            .await
            .map_err(|e| ServiceError::from_write(KIND, e))?
            .ok_or_else(|| ServiceError::not_found(KIND, id))?;
        info!("Updated permission {}", id);
        Ok(permission)
    }

    pub async fn delete(&self, id: i32, permanent: bool) -> Result<(), ServiceError> {
        super::delete_entity(self.directory.as_ref(), KIND, id, permanent).await
    }

    async fn ensure_name_free(&self, name: &str, except: Option<i32>) -> Result<(), ServiceError> {
        match self.directory.find_permission_by_name(name).await? {
            Some(other) if Some(other.id) != except => Err(ServiceError::DuplicateName { kind: KIND }),
            _ => Ok(()),
        }
    }
}
