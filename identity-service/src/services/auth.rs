use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::catalog::ADMIN_ROLE;
use super::events::{publish_in_background, EventPublisher, IdentityEvent};
use super::jwt::TokenIssuer;
use super::resolver::AuthInfo;
use super::store::{CredentialStore, ProfileUpdate};
use super::ServiceError;
use crate::dtos::auth::{
    AuthResponse, ChangePasswordRequest, LoginRequest, ProfileResponse, RegisterRequest,
    UpdateProfileRequest,
};
use crate::models::{normalize_email, User, UserResponse};
use crate::utils::{hash_password, verify_password, Password};

/// Self-service account operations: registration, login, profile and password.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    issuer: TokenIssuer,
    events: Arc<dyn EventPublisher>,
    bootstrap_admin_email: Option<String>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        issuer: TokenIssuer,
        events: Arc<dyn EventPublisher>,
        bootstrap_admin_email: Option<String>,
    ) -> Self {
        Self {
            store,
            issuer,
            events,
            bootstrap_admin_email: bootstrap_admin_email.map(|e| normalize_email(&e)),
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, ServiceError> {
        let email = normalize_email(&req.email);

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::EmailAlreadyRegistered);
        }

        let password_hash = hash_password(&Password::new(req.password))?;
        let user = User::new_local(
            &email,
            password_hash,
            req.first_name.trim().to_string(),
            req.last_name.trim().to_string(),
        );
        self.store.insert_user(&user).await?;

        tracing::info!(user_id = %user.user_id, "User registered");

        if self.bootstrap_admin_email.as_deref() == Some(user.email.as_str()) {
            self.grant_bootstrap_admin(&user).await?;
        }

        publish_in_background(
            self.events.clone(),
            IdentityEvent::UserRegistered {
                user_id: user.user_id,
                email: user.email.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                occurred_at: Utc::now(),
            },
        );

        let token = self.issuer.issue_token(user.user_id).await?;
        Ok(AuthResponse {
            user: user.sanitized(),
            token,
        })
    }

    async fn grant_bootstrap_admin(&self, user: &User) -> Result<(), ServiceError> {
        match self.store.find_role_by_name(ADMIN_ROLE).await? {
            Some(role) => {
                self.store.assign_role(user.user_id, role.role_id).await?;
                tracing::warn!(user_id = %user.user_id, "Granted bootstrap admin role");
            }
            None => {
                tracing::error!(
                    user_id = %user.user_id,
                    "Bootstrap admin email registered but the admin role does not exist"
                );
            }
        }
        Ok(())
    }

    /// Unknown email, wrong password and password-less accounts fail alike.
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ServiceError> {
        let user = self
            .store
            .find_user_by_email(&req.email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let Some(password_hash) = user.password_hash.as_deref() else {
            tracing::debug!(user_id = %user.user_id, "Password login attempted for external account");
            return Err(ServiceError::InvalidCredentials);
        };

        if !verify_password(&Password::new(req.password), password_hash)? {
            tracing::info!(user_id = %user.user_id, "Failed login");
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self.issuer.issue_token(user.user_id).await?;
        tracing::info!(user_id = %user.user_id, "User logged in");

        Ok(AuthResponse {
            user: user.sanitized(),
            token,
        })
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<ProfileResponse, ServiceError> {
        let loaded = self
            .store
            .find_user_with_roles(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        let user = loaded.user.sanitized();
        let info = AuthInfo::from(loaded);
        Ok(ProfileResponse {
            user,
            roles: info.roles,
            permissions: info.permissions,
        })
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<UserResponse, ServiceError> {
        let update = ProfileUpdate {
            first_name: req.first_name.map(|n| n.trim().to_string()),
            last_name: req.last_name.map(|n| n.trim().to_string()),
            avatar_url: req.avatar_url,
        };

        let user = self
            .store
            .update_user_profile(user_id, &update)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        tracing::info!(user_id = %user_id, "Profile updated");
        Ok(user.sanitized())
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        req: ChangePasswordRequest,
    ) -> Result<(), ServiceError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        let Some(current_hash) = user.password_hash.as_deref() else {
            return Err(ServiceError::Validation(
                "Account has no local password".to_string(),
            ));
        };

        if !verify_password(&Password::new(req.current_password), current_hash)? {
            return Err(ServiceError::InvalidCredentials);
        }

        let new_hash = hash_password(&Password::new(req.new_password))?;
        if !self.store.update_password_hash(user_id, &new_hash).await? {
            return Err(ServiceError::UserNotFound);
        }

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::services::catalog::reconcile_catalog;
    use crate::services::events::RecordingEventPublisher;
    use crate::services::keys::KeyMaterial;
    use crate::services::memory::InMemoryCredentialStore;
    use crate::services::resolver::RoleResolver;

    const PRIVATE_PEM: &str = include_str!("../../tests/fixtures/signing_private.pem");
    const PUBLIC_PEM: &str = include_str!("../../tests/fixtures/signing_public.pem");

    async fn service(
        bootstrap: Option<&str>,
    ) -> (AuthService, Arc<InMemoryCredentialStore>, Arc<RecordingEventPublisher>) {
        let store = Arc::new(InMemoryCredentialStore::new());
        reconcile_catalog(store.as_ref()).await.unwrap();

        let config = JwtConfig {
            issuer: "https://identity.test".into(),
            audience: "test-api".into(),
            expires_in: "15m".into(),
            private_key_pem: Some(PRIVATE_PEM.into()),
            public_key_pem: Some(PUBLIC_PEM.into()),
        };
        let keys = KeyMaterial::from_config(&config).unwrap();
        let issuer = TokenIssuer::new(RoleResolver::new(store.clone()), keys, &config);
        let events = Arc::new(RecordingEventPublisher::default());

        let service = AuthService::new(
            store.clone(),
            issuer,
            events.clone(),
            bootstrap.map(str::to_string),
        );
        (service, store, events)
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: "password123".into(),
            first_name: " Ada ".into(),
            last_name: "Lovelace".into(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (service, _, _) = service(None).await;

        let registered = service
            .register(register_request("Ada@Example.com"))
            .await
            .unwrap();
        assert_eq!(registered.user.email, "ada@example.com");
        assert_eq!(registered.user.display_name, "Ada Lovelace");
        assert_eq!(registered.token.expires_in, 900);

        let logged_in = service
            .login(LoginRequest {
                email: "ADA@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.user.user_id, registered.user.user_id);
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let (service, _, _) = service(None).await;
        service.register(register_request("a@example.com")).await.unwrap();

        let result = service.register(register_request("A@EXAMPLE.COM")).await;
        assert!(matches!(result, Err(ServiceError::EmailAlreadyRegistered)));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (service, store, _) = service(None).await;
        service.register(register_request("a@example.com")).await.unwrap();

        let external = User::new_external("ext@example.com", "sub-1".into(), "E".into(), "X".into());
        store.insert_user(&external).await.unwrap();

        for (email, password) in [
            ("nobody@example.com", "password123"),
            ("a@example.com", "wrong-password"),
            ("ext@example.com", "password123"),
        ] {
            let result = service
                .login(LoginRequest {
                    email: email.into(),
                    password: password.into(),
                })
                .await;
            assert!(
                matches!(result, Err(ServiceError::InvalidCredentials)),
                "{}",
                email
            );
        }
    }

    #[tokio::test]
    async fn test_bootstrap_admin_gets_admin_role() {
        let (service, _, _) = service(Some("Root@Example.com")).await;

        let admin = service.register(register_request("root@example.com")).await.unwrap();
        let profile = service.profile(admin.user.user_id).await.unwrap();
        assert_eq!(profile.roles, vec![ADMIN_ROLE]);
        assert!(profile.permissions.contains(&"roles:manage".to_string()));

        let regular = service.register(register_request("user@example.com")).await.unwrap();
        let profile = service.profile(regular.user.user_id).await.unwrap();
        assert!(profile.roles.is_empty());
    }

    #[tokio::test]
    async fn test_registration_publishes_event() {
        let (service, _, events) = service(None).await;
        let registered = service.register(register_request("a@example.com")).await.unwrap();

        let mut published = Vec::new();
        for _ in 0..50 {
            published = events.events().await;
            if !published.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert!(matches!(
            published.first(),
            Some(IdentityEvent::UserRegistered { user_id, .. }) if *user_id == registered.user.user_id
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let (service, _, _) = service(None).await;
        let registered = service.register(register_request("a@example.com")).await.unwrap();
        let user_id = registered.user.user_id;

        let wrong = service
            .change_password(
                user_id,
                ChangePasswordRequest {
                    current_password: "not-it".into(),
                    new_password: "new-password-1".into(),
                },
            )
            .await;
        assert!(matches!(wrong, Err(ServiceError::InvalidCredentials)));

        service
            .change_password(
                user_id,
                ChangePasswordRequest {
                    current_password: "password123".into(),
                    new_password: "new-password-1".into(),
                },
            )
            .await
            .unwrap();

        let login = service
            .login(LoginRequest {
                email: "a@example.com".into(),
                password: "new-password-1".into(),
            })
            .await;
        assert!(login.is_ok());
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (service, _, _) = service(None).await;
        let registered = service.register(register_request("a@example.com")).await.unwrap();

        let updated = service
            .update_profile(
                registered.user.user_id,
                UpdateProfileRequest {
                    first_name: Some("Augusta".into()),
                    last_name: None,
                    avatar_url: Some("https://cdn.example.com/a.png".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.display_name, "Augusta Lovelace");
        assert_eq!(
            updated.avatar_url.as_deref(),
            Some("https://cdn.example.com/a.png")
        );

        let missing = service
            .update_profile(
                Uuid::new_v4(),
                UpdateProfileRequest {
                    first_name: None,
                    last_name: None,
                    avatar_url: None,
                },
            )
            .await;
        assert!(matches!(missing, Err(ServiceError::UserNotFound)));
    }
}
