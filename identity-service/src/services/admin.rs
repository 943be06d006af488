use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use super::resolver::AuthInfo;
use super::store::CredentialStore;
use super::ServiceError;
use crate::dtos::admin::{CreateRoleRequest, UpdateRoleRequest, UserAuthorizationResponse};
use crate::models::{Permission, Role, RoleResponse};

/// Administration of the role graph: roles, their permissions and user assignments.
#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn CredentialStore>,
}

impl AdminService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    // ==================== Users ====================

    pub async fn user_authorization(
        &self,
        user_id: Uuid,
    ) -> Result<UserAuthorizationResponse, ServiceError> {
        let loaded = self
            .store
            .find_user_with_roles(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        let user = loaded.user.sanitized();
        let info = AuthInfo::from(loaded);
        Ok(UserAuthorizationResponse {
            user,
            roles: info.roles,
            permissions: info.permissions,
        })
    }

    /// Idempotent; takes effect in tokens issued afterwards.
    pub async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), ServiceError> {
        self.store.assign_role(user_id, role_id).await?;
        tracing::info!(user_id = %user_id, role_id = %role_id, "Role assigned");
        Ok(())
    }

    pub async fn remove_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), ServiceError> {
        if self.store.find_user_by_id(user_id).await?.is_none() {
            return Err(ServiceError::UserNotFound);
        }

        if self.store.remove_role(user_id, role_id).await? {
            tracing::info!(user_id = %user_id, role_id = %role_id, "Role removed");
        }
        Ok(())
    }

    // ==================== Roles ====================

    pub async fn list_roles(&self) -> Result<Vec<RoleResponse>, ServiceError> {
        Ok(self
            .store
            .list_roles()
            .await?
            .into_iter()
            .map(RoleResponse::from)
            .collect())
    }

    pub async fn get_role(&self, role_id: Uuid) -> Result<RoleResponse, ServiceError> {
        self.store
            .find_role_by_id(role_id)
            .await?
            .map(RoleResponse::from)
            .ok_or(ServiceError::RoleNotFound)
    }

    pub async fn create_role(&self, req: CreateRoleRequest) -> Result<RoleResponse, ServiceError> {
        let role = Role::new(req.name, req.description);
        self.store.insert_role(&role).await?;

        tracing::info!(role_id = %role.role_id, role_name = %role.role_name, "Role created");
        self.get_role(role.role_id).await
    }

    pub async fn update_role(
        &self,
        role_id: Uuid,
        req: UpdateRoleRequest,
    ) -> Result<RoleResponse, ServiceError> {
        let mut role = self
            .store
            .find_role_by_id(role_id)
            .await?
            .ok_or(ServiceError::RoleNotFound)?
            .role;

        if let Some(name) = req.name {
            role.role_name = name;
        }
        if let Some(description) = req.description {
            role.description = Some(description);
        }

        if !self.store.update_role(&role).await? {
            return Err(ServiceError::RoleNotFound);
        }

        tracing::info!(role_id = %role_id, role_name = %role.role_name, "Role updated");
        self.get_role(role_id).await
    }

    /// Deletes the role and its grants; users and permissions remain.
    pub async fn delete_role(&self, role_id: Uuid) -> Result<(), ServiceError> {
        if !self.store.delete_role(role_id).await? {
            return Err(ServiceError::RoleNotFound);
        }
        tracing::info!(role_id = %role_id, "Role deleted");
        Ok(())
    }

    /// Replace the role's permissions with the named catalog entries.
    ///
    /// Unknown names reject the whole request.
    pub async fn set_role_permissions(
        &self,
        role_id: Uuid,
        names: Vec<String>,
    ) -> Result<RoleResponse, ServiceError> {
        let requested: BTreeSet<String> = names.into_iter().collect();
        let requested: Vec<String> = requested.into_iter().collect();

        let found = self.store.find_permissions_by_names(&requested).await?;
        let known: BTreeSet<&str> = found.iter().map(|p| p.permission_name.as_str()).collect();
        let unknown: Vec<&str> = requested
            .iter()
            .map(String::as_str)
            .filter(|name| !known.contains(name))
            .collect();

        if !unknown.is_empty() {
            return Err(ServiceError::Validation(format!(
                "Unknown permissions: {}",
                unknown.join(", ")
            )));
        }

        let ids: Vec<Uuid> = found.iter().map(|p| p.permission_id).collect();
        self.store.set_role_permissions(role_id, &ids).await?;

        tracing::info!(role_id = %role_id, permissions = ?requested, "Role permissions replaced");
        self.get_role(role_id).await
    }

    // ==================== Permissions ====================

    pub async fn list_permissions(&self) -> Result<Vec<Permission>, ServiceError> {
        self.store.list_permissions().await
    }
}
