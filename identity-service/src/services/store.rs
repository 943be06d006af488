//! Credential store boundary.
//!
//! Persistence of users, roles, permissions and their associations. The
//! resolver and the administrative services only talk to this trait.

use async_trait::async_trait;
use uuid::Uuid;

use super::ServiceError;
use crate::models::{Permission, Role, RoleWithPermissions, User, UserWithRoles};

/// Profile fields a user may change about themselves.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn health_check(&self) -> Result<(), ServiceError>;

    // ==================== Users ====================

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, ServiceError>;

    /// Lookup is case-insensitive.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;

    /// Load a user with its roles and each role's permissions in one pass.
    async fn find_user_with_roles(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserWithRoles>, ServiceError>;

    /// Fails with `EmailAlreadyRegistered` when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), ServiceError>;

    /// Returns the updated user, or `None` if it does not exist.
    async fn update_user_profile(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, ServiceError>;

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, ServiceError>;

    // ==================== Roles ====================

    async fn list_roles(&self) -> Result<Vec<RoleWithPermissions>, ServiceError>;

    async fn find_role_by_id(
        &self,
        role_id: Uuid,
    ) -> Result<Option<RoleWithPermissions>, ServiceError>;

    async fn find_role_by_name(&self, role_name: &str) -> Result<Option<Role>, ServiceError>;

    /// Fails with `RoleAlreadyExists` when the name is taken.
    async fn insert_role(&self, role: &Role) -> Result<(), ServiceError>;

    /// Fails with `RoleAlreadyExists` when renaming onto a taken name.
    async fn update_role(&self, role: &Role) -> Result<bool, ServiceError>;

    /// Removes the role and every grant referencing it.
    async fn delete_role(&self, role_id: Uuid) -> Result<bool, ServiceError>;

    /// Replace the role's permission set.
    async fn set_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), ServiceError>;

    // ==================== Assignments ====================

    /// Idempotent.
    async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), ServiceError>;

    async fn remove_role(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, ServiceError>;

    // ==================== Permissions ====================

    async fn list_permissions(&self) -> Result<Vec<Permission>, ServiceError>;

    async fn find_permissions_by_names(
        &self,
        names: &[String],
    ) -> Result<Vec<Permission>, ServiceError>;

    /// Insert the permission unless one with the same name exists.
    /// Returns whether a row was created.
    async fn ensure_permission(&self, permission: &Permission) -> Result<bool, ServiceError>;
}
