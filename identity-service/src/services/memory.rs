//! In-memory credential store.
//!
//! Entities live in maps keyed by id; associations are adjacency sets of ids.
//! Used by tests and by `STORE_BACKEND=memory`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{CredentialStore, ProfileUpdate};
use super::ServiceError;
use crate::models::{Permission, Role, RoleWithPermissions, User, UserWithRoles};

#[derive(Default)]
struct Graph {
    users: HashMap<Uuid, User>,
    roles: HashMap<Uuid, Role>,
    permissions: HashMap<Uuid, Permission>,
    user_roles: HashMap<Uuid, BTreeSet<Uuid>>,
    role_permissions: HashMap<Uuid, BTreeSet<Uuid>>,
}

impl Graph {
    fn role_with_permissions(&self, role: &Role) -> RoleWithPermissions {
        let permissions = self
            .role_permissions
            .get(&role.role_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.permissions.get(id).cloned())
            .collect();

        RoleWithPermissions {
            role: role.clone(),
            permissions,
        }
    }

    fn role_name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.roles
            .values()
            .any(|r| r.role_name == name && Some(r.role_id) != except)
    }
}

#[derive(Default)]
pub struct InMemoryCredentialStore {
    graph: RwLock<Graph>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, ServiceError> {
        Ok(self.graph.read().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let email = crate::models::normalize_email(email);
        Ok(self
            .graph
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_with_roles(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserWithRoles>, ServiceError> {
        let graph = self.graph.read().await;
        let Some(user) = graph.users.get(&user_id) else {
            return Ok(None);
        };

        let roles = graph
            .user_roles
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| graph.roles.get(id))
            .map(|role| graph.role_with_permissions(role))
            .collect();

        Ok(Some(UserWithRoles {
            user: user.clone(),
            roles,
        }))
    }

    async fn insert_user(&self, user: &User) -> Result<(), ServiceError> {
        let mut graph = self.graph.write().await;
        if graph.users.values().any(|u| u.email == user.email) {
            return Err(ServiceError::EmailAlreadyRegistered);
        }
        graph.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, ServiceError> {
        let mut graph = self.graph.write().await;
        let Some(user) = graph.users.get_mut(&user_id) else {
            return Ok(None);
        };

        if let Some(first_name) = &update.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &update.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(avatar_url) = &update.avatar_url {
            user.avatar_url = Some(avatar_url.clone());
        }
        user.updated_utc = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, ServiceError> {
        let mut graph = self.graph.write().await;
        match graph.users.get_mut(&user_id) {
            Some(user) => {
                user.password_hash = Some(password_hash.to_string());
                user.updated_utc = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_roles(&self) -> Result<Vec<RoleWithPermissions>, ServiceError> {
        let graph = self.graph.read().await;
        let mut roles: Vec<RoleWithPermissions> = graph
            .roles
            .values()
            .map(|role| graph.role_with_permissions(role))
            .collect();
        roles.sort_by(|a, b| a.role.role_name.cmp(&b.role.role_name));
        Ok(roles)
    }

    async fn find_role_by_id(
        &self,
        role_id: Uuid,
    ) -> Result<Option<RoleWithPermissions>, ServiceError> {
        let graph = self.graph.read().await;
        Ok(graph
            .roles
            .get(&role_id)
            .map(|role| graph.role_with_permissions(role)))
    }

    async fn find_role_by_name(&self, role_name: &str) -> Result<Option<Role>, ServiceError> {
        Ok(self
            .graph
            .read()
            .await
            .roles
            .values()
            .find(|r| r.role_name == role_name)
            .cloned())
    }

    async fn insert_role(&self, role: &Role) -> Result<(), ServiceError> {
        let mut graph = self.graph.write().await;
        if graph.role_name_taken(&role.role_name, None) {
            return Err(ServiceError::RoleAlreadyExists);
        }
        graph.roles.insert(role.role_id, role.clone());
        Ok(())
    }

    async fn update_role(&self, role: &Role) -> Result<bool, ServiceError> {
        let mut graph = self.graph.write().await;
        if !graph.roles.contains_key(&role.role_id) {
            return Ok(false);
        }
        if graph.role_name_taken(&role.role_name, Some(role.role_id)) {
            return Err(ServiceError::RoleAlreadyExists);
        }
        graph.roles.insert(role.role_id, role.clone());
        Ok(true)
    }

    async fn delete_role(&self, role_id: Uuid) -> Result<bool, ServiceError> {
        let mut graph = self.graph.write().await;
        if graph.roles.remove(&role_id).is_none() {
            return Ok(false);
        }
        graph.role_permissions.remove(&role_id);
        for assigned in graph.user_roles.values_mut() {
            assigned.remove(&role_id);
        }
        Ok(true)
    }

    async fn set_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), ServiceError> {
        let mut graph = self.graph.write().await;
        if !graph.roles.contains_key(&role_id) {
            return Err(ServiceError::RoleNotFound);
        }
        let ids: BTreeSet<Uuid> = permission_ids
            .iter()
            .filter(|id| graph.permissions.contains_key(id))
            .copied()
            .collect();
        graph.role_permissions.insert(role_id, ids);
        Ok(())
    }

    async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), ServiceError> {
        let mut graph = self.graph.write().await;
        if !graph.users.contains_key(&user_id) {
            return Err(ServiceError::UserNotFound);
        }
        if !graph.roles.contains_key(&role_id) {
            return Err(ServiceError::RoleNotFound);
        }
        graph.user_roles.entry(user_id).or_default().insert(role_id);
        Ok(())
    }

    async fn remove_role(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, ServiceError> {
        let mut graph = self.graph.write().await;
        Ok(graph
            .user_roles
            .get_mut(&user_id)
            .map(|assigned| assigned.remove(&role_id))
            .unwrap_or(false))
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>, ServiceError> {
        let mut permissions: Vec<Permission> =
            self.graph.read().await.permissions.values().cloned().collect();
        permissions.sort_by(|a, b| a.permission_name.cmp(&b.permission_name));
        Ok(permissions)
    }

    async fn find_permissions_by_names(
        &self,
        names: &[String],
    ) -> Result<Vec<Permission>, ServiceError> {
        Ok(self
            .graph
            .read()
            .await
            .permissions
            .values()
            .filter(|p| names.contains(&p.permission_name))
            .cloned()
            .collect())
    }

    async fn ensure_permission(&self, permission: &Permission) -> Result<bool, ServiceError> {
        let mut graph = self.graph.write().await;
        if graph
            .permissions
            .values()
            .any(|p| p.permission_name == permission.permission_name)
        {
            return Ok(false);
        }
        graph
            .permissions
            .insert(permission.permission_id, permission.clone());
        Ok(true)
    }
}
