use crate::api::error::AppError;
use crate::services::user_registry::{User, UserRepository};
use crate::utils::auth::create_jwt;
use argon2::{
    Argon2,
    password_hash::{PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthSession {
    pub user: UserProfile,
    pub token: String,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt_secret: String,
    jwt_expires_in_secs: u64,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, jwt_secret: String, jwt_expires_in_secs: u64) -> Self {
        Self {
            users,
            jwt_secret,
            jwt_expires_in_secs,
        }
    }

    /// Creates a user and signs them in. Inputs are expected to be validated.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthSession, AppError> {
        // Fast path only; insert_if_absent decides races.
        if self.users.find_by_email(email).await.is_some() {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(e.to_string()))?
            .to_string();

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash,
            name: name.to_string(),
            created_at: Utc::now(),
        };

        let session = self.session_for(&user)?;
        self.users.insert_if_absent(user).await?;

        tracing::info!("👤 Registered user {}", session.user.id);
        Ok(session)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let user = self.users.find_by_email(email).await.ok_or_else(invalid)?;

        let parsed_hash = argon2::PasswordHash::new(&user.password_hash)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| invalid())?;

        self.session_for(&user)
    }

    fn session_for(&self, user: &User) -> Result<AuthSession, AppError> {
        let token = create_jwt(&user.id, &user.email, &self.jwt_secret, self.jwt_expires_in_secs)?;
        Ok(AuthSession {
            user: UserProfile::from(user),
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::user_registry::InMemoryUserRepository;
    use crate::utils::auth::validate_jwt;

    fn service() -> (AuthService, Arc<InMemoryUserRepository>) {
        let repo = Arc::new(InMemoryUserRepository::new());
        (
            AuthService::new(repo.clone(), "test_secret".to_string(), 3600),
            repo,
        )
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (auth, _) = service();
        let session = auth.register("a@x.io", "hunter22", "Alice").await.unwrap();
        assert_eq!(session.user.email, "a@x.io");
        assert_eq!(session.user.name, "Alice");

        let claims = validate_jwt(&session.token, "test_secret").unwrap();
        assert_eq!(claims.sub, session.user.id);

        let again = auth.login("a@x.io", "hunter22").await.unwrap();
        assert_eq!(again.user.id, session.user.id);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let (auth, _) = service();
        auth.register("a@x.io", "hunter22", "Alice").await.unwrap();

        assert!(matches!(
            auth.login("a@x.io", "wrong-pass").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.login("nobody@x.io", "hunter22").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_original_hash() {
        let (auth, repo) = service();
        auth.register("a@x.io", "first-pass", "Alice").await.unwrap();
        let original = repo.find_by_email("a@x.io").await.unwrap().password_hash;

        let err = auth
            .register("a@x.io", "second-pass", "Mallory")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = repo.find_by_email("a@x.io").await.unwrap();
        assert_eq!(stored.password_hash, original);
        assert_eq!(stored.name, "Alice");
        assert!(auth.login("a@x.io", "first-pass").await.is_ok());
    }
}
