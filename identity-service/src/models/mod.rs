pub mod permission;
pub mod role;
pub mod user;

pub use permission::Permission;
pub use role::{Role, RoleResponse, RoleWithPermissions};
pub use user::{normalize_email, AuthProvider, User, UserResponse};

/// A user with its role graph loaded eagerly.
#[derive(Debug, Clone)]
pub struct UserWithRoles {
    pub user: User,
    pub roles: Vec<RoleWithPermissions>,
}
