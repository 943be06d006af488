//! Fixed permission catalog and default roles, reconciled into the store at startup.

use super::store::CredentialStore;
use super::ServiceError;
use crate::models::{Permission, Role};

pub const USERS_READ: &str = "users:read";
pub const USERS_MANAGE: &str = "users:manage";
pub const ROLES_READ: &str = "roles:read";
pub const ROLES_MANAGE: &str = "roles:manage";
pub const PERMISSIONS_READ: &str = "permissions:read";
pub const ORGANIZATIONS_READ: &str = "organizations:read";
pub const ORGANIZATIONS_MANAGE: &str = "organizations:manage";
pub const PROJECTS_READ: &str = "projects:read";
pub const PROJECTS_MANAGE: &str = "projects:manage";

/// Name and description of every known permission.
pub const PERMISSION_CATALOG: &[(&str, &str)] = &[
    (USERS_READ, "Read user profiles and authorization"),
    (USERS_MANAGE, "Assign and remove user roles"),
    (ROLES_READ, "List and inspect roles"),
    (ROLES_MANAGE, "Create, update and delete roles"),
    (PERMISSIONS_READ, "List the permission catalog"),
    (ORGANIZATIONS_READ, "Read organizations"),
    (ORGANIZATIONS_MANAGE, "Manage organizations"),
    (PROJECTS_READ, "Read projects"),
    (PROJECTS_MANAGE, "Manage projects"),
];

pub const ADMIN_ROLE: &str = "admin";

pub struct DefaultRole {
    pub name: &'static str,
    pub description: &'static str,
    /// `None` grants the whole catalog.
    pub permissions: Option<&'static [&'static str]>,
}

pub const DEFAULT_ROLES: &[DefaultRole] = &[
    DefaultRole {
        name: ADMIN_ROLE,
        description: "Full administrative access",
        permissions: None,
    },
    DefaultRole {
        name: "org_admin",
        description: "Manages users of an organization",
        permissions: Some(&[USERS_READ, USERS_MANAGE]),
    },
    DefaultRole {
        name: "analyst",
        description: "Read-only access to projects",
        permissions: Some(&[PROJECTS_READ]),
    },
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub permissions_created: usize,
    pub roles_created: usize,
}

/// Create missing catalog permissions and default roles.
///
/// Never deletes or modifies existing rows, so repeated runs are no-ops.
pub async fn reconcile_catalog(
    store: &dyn CredentialStore,
) -> Result<ReconcileReport, ServiceError> {
    let mut report = ReconcileReport::default();

    for (name, description) in PERMISSION_CATALOG {
        let permission = Permission::new(name.to_string(), Some(description.to_string()));
        if store.ensure_permission(&permission).await? {
            report.permissions_created += 1;
        }
    }

    for default in DEFAULT_ROLES {
        if store.find_role_by_name(default.name).await?.is_some() {
            continue;
        }

        let names: Vec<String> = match default.permissions {
            Some(names) => names.iter().map(|n| n.to_string()).collect(),
            None => PERMISSION_CATALOG
                .iter()
                .map(|(n, _)| n.to_string())
                .collect(),
        };
        let permission_ids: Vec<_> = store
            .find_permissions_by_names(&names)
            .await?
            .into_iter()
            .map(|p| p.permission_id)
            .collect();

        let role = Role::new(
            default.name.to_string(),
            Some(default.description.to_string()),
        );
        match store.insert_role(&role).await {
            Ok(()) => {}
            // Created concurrently by another instance.
            Err(ServiceError::RoleAlreadyExists) => continue,
            Err(e) => return Err(e),
        }
        store
            .set_role_permissions(role.role_id, &permission_ids)
            .await?;
        report.roles_created += 1;
    }

    tracing::info!(
        permissions_created = report.permissions_created,
        roles_created = report.roles_created,
        "Permission catalog reconciled"
    );
    Ok(report)
}
