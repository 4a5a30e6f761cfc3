//! Authentication service.
//!
//! Resolves bearer tokens into an [`AuthContext`] once per request. The
//! reserved administrator from configuration has no user row; its token is
//! generated at startup and lives as long as the process.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use awards_common::{AppError, AppResult, Config, IdGenerator};
use awards_db::{
    entities::user,
    repositories::{AccessCodeRepository, UserRepository},
};
use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// User ID carried by the reserved administrator's context.
pub const RESERVED_ADMIN_ID: &str = "reserved-admin";

/// Identity of the caller, resolved once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub user_id: String,
    pub email: String,
    pub is_admin: bool,
    /// The configured administrator without a user row.
    pub is_reserved_admin: bool,
}

impl AuthContext {
    /// Context of a registered user.
    #[must_use]
    pub fn from_user(user: &user::Model) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            is_reserved_admin: false,
        }
    }

    /// Context of the reserved administrator.
    #[must_use]
    pub fn reserved_admin(email: &str) -> Self {
        Self {
            user_id: RESERVED_ADMIN_ID.to_string(),
            email: email.to_string(),
            is_admin: true,
            is_reserved_admin: true,
        }
    }

    /// Fail with `Forbidden` unless the caller is an administrator.
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Administrator access required".to_string()))
        }
    }
}

/// Input for registering a new account.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupInput {
    #[validate(email, length(max = 320))]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 64))]
    pub access_code: String,
}

/// Input for signing in.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SigninInput {
    #[validate(length(min = 1, max = 320))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// A signed-in session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: AuthContext,
}

#[derive(Clone)]
struct ReservedAdmin {
    email: String,
    password: String,
    token: String,
}

/// Authentication service for business logic.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    code_repo: AccessCodeRepository,
    reserved: Option<ReservedAdmin>,
    id_gen: IdGenerator,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub fn new(user_repo: UserRepository, code_repo: AccessCodeRepository, config: &Config) -> Self {
        let id_gen = IdGenerator::new();
        let reserved = config.reserved_admin().map(|(email, password)| ReservedAdmin {
            email: email.to_lowercase(),
            password: password.to_string(),
            token: id_gen.generate_token(),
        });

        Self {
            user_repo,
            code_repo,
            reserved,
            id_gen,
        }
    }

    /// Register a new account by redeeming an access code.
    pub async fn signup(&self, input: SignupInput) -> AppResult<Session> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        if self
            .reserved
            .as_ref()
            .is_some_and(|admin| admin.email == email)
        {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(email),
            password_hash: Set(password_hash),
            token: Set(self.id_gen.generate_token()),
            is_admin: Set(false),
            created_at: Set(Utc::now().into()),
        };

        let code = input.access_code.trim().to_uppercase();
        let created = self.code_repo.register_user(&code, model).await?;

        tracing::info!(user_id = %created.id, "User registered");

        Ok(Session {
            token: created.token.clone(),
            user: AuthContext::from_user(&created),
        })
    }

    /// Sign in with email and password.
    ///
    /// The reserved administrator credentials are checked first.
    pub async fn signin(&self, input: SigninInput) -> AppResult<Session> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();

        if let Some(admin) = &self.reserved
            && admin.email == email
        {
            if admin.password != input.password {
                return Err(AppError::Unauthorized);
            }
            tracing::info!("Reserved administrator signed in");
            return Ok(Session {
                token: admin.token.clone(),
                user: AuthContext::reserved_admin(&admin.email),
            });
        }

        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Ok(Session {
            token: user.token.clone(),
            user: AuthContext::from_user(&user),
        })
    }

    /// Resolve a bearer token.
    pub async fn authenticate(&self, token: &str) -> AppResult<AuthContext> {
        if let Some(admin) = &self.reserved
            && admin.token == token
        {
            return Ok(AuthContext::reserved_admin(&admin.email));
        }

        self.user_repo
            .find_by_token(token)
            .await?
            .map(|user| AuthContext::from_user(&user))
            .ok_or(AppError::Unauthorized)
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use awards_common::config::{DatabaseConfig, ServerConfig};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_config(admin: Option<(&str, &str)>) -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/awards".to_string(),
                max_connections: 1,
                min_connections: 1,
            },
            voting: awards_common::config::VotingConfig::default(),
            admin: awards_common::config::AdminConfig {
                email: admin.map(|(e, _)| e.to_string()),
                password: admin.map(|(_, p)| p.to_string()),
            },
            storage: awards_common::config::StorageConfig::default(),
        }
    }

    fn create_service(db: MockDatabase, config: &Config) -> AuthService {
        let db = Arc::new(db.into_connection());
        AuthService::new(
            UserRepository::new(Arc::clone(&db)),
            AccessCodeRepository::new(db),
            config,
        )
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_reserved_admin_signin_and_token() {
        let config = create_test_config(Some(("Admin@Example.com", "s3cret")));
        let service = create_service(MockDatabase::new(DatabaseBackend::Postgres), &config);

        let session = service
            .signin(SigninInput {
                email: "admin@example.com".to_string(),
                password: "s3cret".to_string(),
            })
            .await
            .unwrap();

        assert!(session.user.is_reserved_admin);
        assert!(session.user.is_admin);

        let ctx = service.authenticate(&session.token).await.unwrap();
        assert_eq!(ctx.user_id, RESERVED_ADMIN_ID);
    }

    #[tokio::test]
    async fn test_reserved_admin_wrong_password() {
        let config = create_test_config(Some(("admin@example.com", "s3cret")));
        let service = create_service(MockDatabase::new(DatabaseBackend::Postgres), &config);

        let result = service
            .signin(SigninInput {
                email: "admin@example.com".to_string(),
                password: "guess".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthorized() {
        let config = create_test_config(None);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()]);
        let service = create_service(db, &config);

        let result = service.authenticate("nope").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_signup_rejects_invalid_email() {
        let config = create_test_config(None);
        let service = create_service(MockDatabase::new(DatabaseBackend::Postgres), &config);

        let result = service
            .signup(SignupInput {
                email: "not-an-email".to_string(),
                password: "hunter22".to_string(),
                access_code: "MONGA2026_ABC123".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_require_admin() {
        let ctx = AuthContext {
            user_id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            is_admin: false,
            is_reserved_admin: false,
        };
        assert!(matches!(ctx.require_admin(), Err(AppError::Forbidden(_))));
        assert!(AuthContext::reserved_admin("a@example.com").require_admin().is_ok());
    }
}
