//! Role resolution: from a user id to the effective role names and the
//! de-duplicated union of permissions granted through those roles.

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::store::CredentialStore;
use super::ServiceError;
use crate::models::UserWithRoles;

/// Identity and authorization data a credential is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthInfo {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub organization_id: Option<Uuid>,
    /// Sorted ascending.
    pub roles: Vec<String>,
    /// Sorted ascending, no duplicates.
    pub permissions: Vec<String>,
}

impl From<UserWithRoles> for AuthInfo {
    fn from(loaded: UserWithRoles) -> Self {
        let mut roles = BTreeSet::new();
        let mut permissions = BTreeSet::new();

        for granted in loaded.roles {
            roles.insert(granted.role.role_name);
            permissions.extend(granted.permissions.into_iter().map(|p| p.permission_name));
        }

        Self {
            user_id: loaded.user.user_id,
            display_name: loaded.user.display_name(),
            email: loaded.user.email,
            organization_id: loaded.user.organization_id,
            roles: roles.into_iter().collect(),
            permissions: permissions.into_iter().collect(),
        }
    }
}

#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<dyn CredentialStore>,
}

impl RoleResolver {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Resolve the user's roles and permissions from the store.
    ///
    /// Re-reads the role graph on every call; there is no caching.
    pub async fn resolve_auth_info(&self, user_id: Uuid) -> Result<AuthInfo, ServiceError> {
        let loaded = self
            .store
            .find_user_with_roles(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        let info = AuthInfo::from(loaded);
        tracing::debug!(
            user_id = %info.user_id,
            roles = info.roles.len(),
            permissions = info.permissions.len(),
            "Resolved authorization"
        );
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Permission, Role, RoleWithPermissions, User};
    use crate::services::memory::InMemoryCredentialStore;

    fn role(name: &str, permissions: &[&str]) -> RoleWithPermissions {
        RoleWithPermissions {
            role: Role::new(name.to_string(), None),
            permissions: permissions
                .iter()
                .map(|p| Permission::new(p.to_string(), None))
                .collect(),
        }
    }

    fn user() -> User {
        User::new_local("ada@example.com", "hash".into(), "Ada".into(), "Lovelace".into())
    }

    #[test]
    fn test_permissions_are_deduplicated_union() {
        let info = AuthInfo::from(UserWithRoles {
            user: user(),
            roles: vec![
                role("writer", &["docs:read", "docs:write"]),
                role("reader", &["docs:read"]),
            ],
        });

        assert_eq!(info.roles, vec!["reader", "writer"]);
        assert_eq!(info.permissions, vec!["docs:read", "docs:write"]);
        assert_eq!(info.display_name, "Ada Lovelace");
    }

    #[test]
    fn test_role_order_does_not_matter() {
        let u = user();
        let a = role("a", &["x:read", "y:read"]);
        let b = role("b", &["y:read", "z:read"]);

        let forward = AuthInfo::from(UserWithRoles {
            user: u.clone(),
            roles: vec![a.clone(), b.clone()],
        });
        let backward = AuthInfo::from(UserWithRoles {
            user: u,
            roles: vec![b, a],
        });

        assert_eq!(forward, backward);
        assert_eq!(forward.permissions, vec!["x:read", "y:read", "z:read"]);
    }

    #[test]
    fn test_user_without_roles_has_empty_sets() {
        let info = AuthInfo::from(UserWithRoles {
            user: user(),
            roles: vec![],
        });
        assert!(info.roles.is_empty());
        assert!(info.permissions.is_empty());
        assert_eq!(info.organization_id, None);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let resolver = RoleResolver::new(Arc::new(InMemoryCredentialStore::new()));
        let result = resolver.resolve_auth_info(Uuid::new_v4()).await;
        assert!(matches!(result, Err(ServiceError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_org_admin_and_analyst_scenario() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let mut ids = std::collections::HashMap::new();
        for name in ["users:read", "users:manage", "projects:read"] {
            let p = Permission::new(name.into(), None);
            ids.insert(name, p.permission_id);
            store.ensure_permission(&p).await.unwrap();
        }

        let org_admin = Role::new("org_admin".into(), None);
        let analyst = Role::new("analyst".into(), None);
        store.insert_role(&org_admin).await.unwrap();
        store.insert_role(&analyst).await.unwrap();
        store
            .set_role_permissions(org_admin.role_id, &[ids["users:read"], ids["users:manage"]])
            .await
            .unwrap();
        store
            .set_role_permissions(analyst.role_id, &[ids["projects:read"]])
            .await
            .unwrap();

        let u = user();
        store.insert_user(&u).await.unwrap();
        store.assign_role(u.user_id, org_admin.role_id).await.unwrap();
        store.assign_role(u.user_id, analyst.role_id).await.unwrap();

        let info = RoleResolver::new(store)
            .resolve_auth_info(u.user_id)
            .await
            .unwrap();

        assert_eq!(info.roles, vec!["analyst", "org_admin"]);
        assert_eq!(
            info.permissions,
            vec!["projects:read", "users:manage", "users:read"]
        );
    }
}
