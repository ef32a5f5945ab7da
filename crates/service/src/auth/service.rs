use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use models::RoleName;
use rand::rngs::OsRng;
use tracing::{info, debug, instrument};
use uuid::Uuid;

use super::domain::{AuthSession, AuthUser, Claims, LoginInput, RegisterInput};
use super::errors::AuthError;
use super::repository::AuthRepository;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub password_algorithm: String,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>, token_ttl_hours: i64) -> Self {
        Self { jwt_secret: jwt_secret.into(), token_ttl_hours, password_algorithm: "argon2".into() }
    }
}

impl From<&configs::AuthConfig> for AuthConfig {
    fn from(c: &configs::AuthConfig) -> Self { AuthConfig::new(c.jwt_secret.clone(), c.token_ttl_hours) }
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository + ?Sized> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::HashError(e.to_string()))?
        .to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::HashError(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!("password too short (>={MIN_PASSWORD_LEN})")));
    }
    Ok(())
}

/// Decode and validate an HS256 token (signature and `exp`).
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::TokenError(e.to_string()))
}

impl<R: AuthRepository + ?Sized> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    pub fn config(&self) -> &AuthConfig { &self.cfg }

    /// Register a new customer with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig::new("secret", 12));
    /// let input = RegisterInput { email: "user@example.com".into(), name: "Test".into(), password: "Secret123".into(), phone: None };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.email, "user@example.com");
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        models::user::validate_email(&input.email)?;
        models::user::validate_name(&input.name)?;
        validate_password(&input.password)?;
        if let Some(existing) = self.repo.find_user_by_email(&input.email).await? {
            debug!("user exists: {}", existing.email);
            return Err(AuthError::Conflict);
        }

        let user = self.repo.create_user(&input.email, &input.name, input.phone, RoleName::Customer).await?;
        let hash = hash_password(&input.password)?;
        let _cred = self.repo.upsert_password(user.id, hash, self.cfg.password_algorithm.clone()).await?;
        info!(user_id = %user.id, email = %user.email, "user_registered");
        Ok(user)
    }

    /// Authenticate a user and issue a token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo.clone(), AuthConfig::new("secret", 12));
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { email: "u@e.com".into(), name: "N".into(), password: "Passw0rd".into(), phone: None }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(session.user.email, "u@e.com");
    /// assert!(!session.token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let user = self.repo
            .find_user_by_email(&input.email)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        if !verify_password(&input.password, &cred.password_hash)? {
            return Err(AuthError::Unauthorized);
        }
        if !user.is_active {
            return Err(AuthError::Inactive);
        }

        let (token, expires_at) = self.issue_token(&user)?;
        info!(user_id = %user.id, "user_logged_in");
        Ok(AuthSession { user, token, expires_at })
    }

    /// Sign a token for `user`; returns the token and its expiry (unix seconds).
    pub fn issue_token(&self, user: &AuthUser) -> Result<(String, i64), AuthError> {
        let now = Utc::now();
        let exp = (now + Duration::hours(self.cfg.token_ttl_hours)).timestamp();
        let claims = Claims { sub: user.email.clone(), uid: user.id, role: user.role, iat: now.timestamp(), exp };
        let token = encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(self.cfg.jwt_secret.as_bytes()))
            .map_err(|e| AuthError::TokenError(e.to_string()))?;
        Ok((token, exp))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> { decode_token(&self.cfg.jwt_secret, token) }

    pub async fn current_user(&self, user_id: Uuid) -> Result<AuthUser, AuthError> {
        self.repo.find_user_by_id(user_id).await?.ok_or(AuthError::NotFound)
    }

    /// Re-check decoded claims against the stored account. Unknown users are
    /// unauthorized, deactivated ones are rejected and the role is taken from storage.
    pub async fn resolve_claims(&self, mut claims: Claims) -> Result<Claims, AuthError> {
        let user = self.repo.find_user_by_id(claims.uid).await?.ok_or(AuthError::Unauthorized)?;
        if !user.is_active {
            return Err(AuthError::Inactive);
        }
        if user.role != claims.role {
            debug!(user_id = %user.id, token_role = %claims.role, role = %user.role, "token_role_outdated");
            claims.role = user.role;
        }
        Ok(claims)
    }

    /// Replace the password after checking the current one.
    #[instrument(skip(self, current, new_password))]
    pub async fn change_password(&self, user_id: Uuid, current: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;
        let cred = self.repo.get_credentials(user_id).await?.ok_or(AuthError::NotFound)?;
        if !verify_password(current, &cred.password_hash)? {
            return Err(AuthError::Unauthorized);
        }
        if current == new_password {
            return Err(AuthError::Validation("new password must differ from the current one".into()));
        }
        let hash = hash_password(new_password)?;
        self.repo.upsert_password(user_id, hash, self.cfg.password_algorithm.clone()).await?;
        info!(%user_id, "password_changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::mock::MockAuthRepository;

    fn svc() -> (Arc<MockAuthRepository>, AuthService<MockAuthRepository>) {
        let repo = Arc::new(MockAuthRepository::default());
        (repo.clone(), AuthService::new(repo, AuthConfig::new("test-secret", 1)))
    }

    fn reg(email: &str, password: &str) -> RegisterInput {
        RegisterInput { email: email.into(), name: "Tester".into(), password: password.into(), phone: None }
    }

    #[tokio::test]
    async fn register_defaults_to_customer_and_rejects_duplicates() {
        let (_, svc) = svc();
        let u = svc.register(reg("A@Example.com", "longenough")).await.unwrap();
        assert_eq!(u.role, RoleName::Customer);
        assert_eq!(u.email, "a@example.com");
        let dup = svc.register(reg("a@example.com", "longenough")).await;
        assert!(matches!(dup, Err(AuthError::Conflict)));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let (_, svc) = svc();
        assert!(matches!(svc.register(reg("bad", "longenough")).await, Err(AuthError::Validation(_))));
        assert!(matches!(svc.register(reg("a@b.co", "short")).await, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn login_issues_decodable_token() {
        let (_, svc) = svc();
        let u = svc.register(reg("t@example.com", "Passw0rd!")).await.unwrap();
        let session = svc.login(LoginInput { email: "t@example.com".into(), password: "Passw0rd!".into() }).await.unwrap();
        let claims = decode_token("test-secret", &session.token).unwrap();
        assert_eq!(claims.uid, u.id);
        assert_eq!(claims.role, RoleName::Customer);
        assert_eq!(claims.exp, session.expires_at);
        assert!(decode_token("other-secret", &session.token).is_err());
    }

    #[tokio::test]
    async fn wrong_password_and_inactive_user_rejected() {
        let (repo, svc) = svc();
        svc.register(reg("x@example.com", "Passw0rd!")).await.unwrap();
        let bad = svc.login(LoginInput { email: "x@example.com".into(), password: "nope-nope".into() }).await;
        assert!(matches!(bad, Err(AuthError::Unauthorized)));
        repo.set_active("x@example.com", false);
        let inactive = svc.login(LoginInput { email: "x@example.com".into(), password: "Passw0rd!".into() }).await;
        assert!(matches!(inactive, Err(AuthError::Inactive)));
    }

    #[tokio::test]
    async fn change_password_requires_current() {
        let (_, svc) = svc();
        let u = svc.register(reg("c@example.com", "Passw0rd!")).await.unwrap();
        assert!(matches!(svc.change_password(u.id, "wrong-one", "NewPassw0rd").await, Err(AuthError::Unauthorized)));
        svc.change_password(u.id, "Passw0rd!", "NewPassw0rd").await.unwrap();
        assert!(svc.login(LoginInput { email: "c@example.com".into(), password: "NewPassw0rd".into() }).await.is_ok());
    }

    #[tokio::test]
    async fn claims_follow_the_stored_account() {
        let (repo, svc) = svc();
        let u = svc.register(reg("r@example.com", "Passw0rd!")).await.unwrap();
        let (token, _) = svc.issue_token(&u).unwrap();
        let claims = svc.decode(&token).unwrap();
        assert_eq!(svc.resolve_claims(claims.clone()).await.unwrap().role, RoleName::Customer);

        repo.set_role("r@example.com", RoleName::VenueOwner);
        assert_eq!(svc.resolve_claims(claims.clone()).await.unwrap().role, RoleName::VenueOwner);

        repo.set_active("r@example.com", false);
        assert!(matches!(svc.resolve_claims(claims.clone()).await, Err(AuthError::Inactive)));

        let stranger = Claims { uid: Uuid::new_v4(), ..claims };
        assert!(matches!(svc.resolve_claims(stranger).await, Err(AuthError::Unauthorized)));
    }

    #[test]
    fn expired_token_rejected() {
        let claims = Claims { sub: "e@x.io".into(), uid: Uuid::new_v4(), role: RoleName::Admin, iat: 0, exp: 1 };
        let token = encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(b"k")).unwrap();
        assert!(matches!(decode_token("k", &token), Err(AuthError::TokenError(_))));
    }
}
