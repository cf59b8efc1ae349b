use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use chrono::Duration;
use rand::rngs::OsRng;
use tracing::{info, debug, instrument};

use super::domain::{AuthSession, AuthUser, GoogleIdentity, GoogleSession, LoginInput, RegisterInput, ResetLink};
use super::errors::AuthError;
use super::repository::AuthRepository;
use super::token;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub reset_token_ttl: Duration,
    pub password_algorithm: String,
}

impl AuthConfig {
    pub fn from_app(cfg: &configs::AuthConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            token_ttl: Duration::hours(cfg.token_ttl_hours),
            reset_token_ttl: Duration::minutes(cfg.reset_token_ttl_minutes),
            password_algorithm: "argon2".into(),
        }
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::HashError(e.to_string()))?
        .to_string())
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    fn session(&self, user: AuthUser) -> Result<AuthSession, AuthError> {
        let token = token::issue_access_token(&self.cfg.jwt_secret, &user, self.cfg.token_ttl)?;
        Ok(AuthSession { user, token })
    }

    /// Register a new user with a hashed password and issue a token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let cfg = AuthConfig { jwt_secret: "0123456789abcdef".into(), token_ttl: chrono::Duration::hours(1), reset_token_ttl: chrono::Duration::minutes(5), password_algorithm: "argon2".into() };
    /// let svc = AuthService::new(repo, cfg);
    /// let input = RegisterInput { username: "anna".into(), email: "anna@example.com".into(), password: "Secret123".into(), confirm_password: "Secret123".into() };
    /// let session = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(session.user.email, "anna@example.com");
    /// ```
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthSession, AuthError> {
        if input.username.trim().is_empty()
            || input.email.trim().is_empty()
            || input.password.is_empty()
            || input.confirm_password.is_empty()
        {
            return Err(AuthError::Validation("Todos los campos son obligatorios".into()));
        }
        if input.password != input.confirm_password {
            return Err(AuthError::Validation("Las contraseñas no coinciden".into()));
        }
        if self.repo.find_user_by_username(input.username.trim()).await?.is_some() {
            return Err(AuthError::Conflict("Este username ya esta registrado".into()));
        }
        if let Some(existing) = self.repo.find_user_by_email(input.email.trim()).await? {
            debug!("email in use by {}", existing.username);
            return Err(AuthError::Conflict("Este email ya esta registrado".into()));
        }

        let user = self.repo.create_user(input.username.trim(), input.email.trim()).await?;
        let hash = hash_password(&input.password)?;
        let _cred = self.repo.upsert_password(user.id, hash, self.cfg.password_algorithm.clone()).await?;
        info!(user_id = %user.id, username = %user.username, "user_registered");
        self.session(user)
    }

    /// Authenticate by username and password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let cfg = AuthConfig { jwt_secret: "0123456789abcdef".into(), token_ttl: chrono::Duration::hours(1), reset_token_ttl: chrono::Duration::minutes(5), password_algorithm: "argon2".into() };
    /// let svc = AuthService::new(repo.clone(), cfg);
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { username: "pau".into(), email: "pau@e.com".into(), password: "Passw0rd".into(), confirm_password: "Passw0rd".into() }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { username: "pau".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(session.user.username, "pau");
    /// ```
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let user = self.repo
            .find_user_by_username(input.username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        if Argon2::default().verify_password(input.password.as_bytes(), &parsed).is_err() {
            return Err(AuthError::InvalidCredentials);
        }
        info!(username = %user.username, "user_logged_in");
        self.session(user)
    }

    /// Find the account owning the verified email, or create one whose
    /// username is the email's local part plus a counter on collision.
    #[instrument(skip(self, identity), fields(uid = %identity.uid))]
    pub async fn google_sign_in(&self, identity: GoogleIdentity) -> Result<GoogleSession, AuthError> {
        let email = identity
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AuthError::Validation("No se pudo obtener el email".into()))?;

        if let Some(user) = self.repo.find_user_by_email(&email).await? {
            return Ok(GoogleSession { session: self.session(user)?, created: false });
        }

        let base = username_seed(&email);
        let mut username = base.clone();
        let mut counter = 1;
        while self.repo.find_user_by_username(&username).await?.is_some() {
            username = format!("{base}{counter}");
            counter += 1;
        }

        let user = self.repo.create_user(&username, &email).await?;
        // unusable random password; the account signs in through Google
        let hash = hash_password(&uuid::Uuid::new_v4().to_string())?;
        self.repo.upsert_password(user.id, hash, self.cfg.password_algorithm.clone()).await?;
        info!(username = %user.username, "google_user_created");
        Ok(GoogleSession { session: self.session(user)?, created: true })
    }

    /// Build a reset link for the account registered with `email`.
    #[instrument(skip(self))]
    pub async fn password_reset_link(&self, email: &str, frontend_base_url: &str) -> Result<ResetLink, AuthError> {
        let user = self.repo
            .find_user_by_email(email.trim())
            .await?
            .ok_or_else(|| AuthError::NotFound("No existe un usuario con este correo electronico".into()))?;
        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or_else(|| AuthError::NotFound("No existe un usuario con este correo electronico".into()))?;
        let tok = token::issue_reset_token(&self.cfg.jwt_secret, user.id, cred.updated_at, self.cfg.reset_token_ttl)?;
        let uidb64 = token::encode_uid(user.id);
        let url = format!("{}/reset-password/{}/{}", frontend_base_url.trim_end_matches('/'), uidb64, tok);
        Ok(ResetLink { uidb64, token: tok, url })
    }

    #[instrument(skip(self, token, new_password, confirm_password))]
    pub async fn reset_password(&self, uidb64: &str, token: &str, new_password: &str, confirm_password: &str) -> Result<(), AuthError> {
        if new_password != confirm_password {
            return Err(AuthError::Validation("Las contraseñas no coinciden".into()));
        }
        if new_password.is_empty() {
            return Err(AuthError::Validation("Todos los campos son obligatorios".into()));
        }
        let invalid_link = || AuthError::Validation("Enlace inválido".into());
        let uid = token::decode_uid(uidb64).ok_or_else(invalid_link)?;
        let user = self.repo.find_user_by_id(uid).await?.ok_or_else(invalid_link)?;
        let cred = self.repo.get_credentials(user.id).await?.ok_or_else(invalid_link)?;
        if !token::verify_reset_token(&self.cfg.jwt_secret, token, user.id, cred.updated_at) {
            return Err(AuthError::Validation("Token inválido o expirado".into()));
        }
        let hash = hash_password(new_password)?;
        self.repo.upsert_password(user.id, hash, self.cfg.password_algorithm.clone()).await?;
        info!(username = %user.username, "password_reset");
        Ok(())
    }
}

/// Local part of `email` reduced to the characters a username allows,
/// leaving room for a collision counter.
fn username_seed(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let seed: String = local
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '+' | '-' | '_'))
        .take(140)
        .collect();
    if seed.is_empty() { "user".to_string() } else { seed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::mock::MockAuthRepository;

    fn svc() -> AuthService<MockAuthRepository> {
        AuthService::new(
            Arc::new(MockAuthRepository::default()),
            AuthConfig {
                jwt_secret: "test-secret-0123456789".into(),
                token_ttl: Duration::hours(1),
                reset_token_ttl: Duration::minutes(10),
                password_algorithm: "argon2".into(),
            },
        )
    }

    fn reg(username: &str, email: &str, pw: &str, confirm: &str) -> RegisterInput {
        RegisterInput { username: username.into(), email: email.into(), password: pw.into(), confirm_password: confirm.into() }
    }

    #[tokio::test]
    async fn register_validates_and_rejects_duplicates() -> anyhow::Result<()> {
        let s = svc();
        let err = s.register(reg("", "a@b.cat", "x", "x")).await.unwrap_err();
        assert_eq!(err.to_string(), "Todos los campos son obligatorios");
        let err = s.register(reg("anna", "a@b.cat", "x1", "x2")).await.unwrap_err();
        assert_eq!(err.to_string(), "Las contraseñas no coinciden");

        let session = s.register(reg("anna", "a@b.cat", "pw", "pw")).await?;
        assert!(token::verify_access_token("test-secret-0123456789", &session.token).is_ok());

        let err = s.register(reg("anna", "other@b.cat", "pw", "pw")).await.unwrap_err();
        assert_eq!(err.to_string(), "Este username ya esta registrado");
        let err = s.register(reg("anna2", "a@b.cat", "pw", "pw")).await.unwrap_err();
        assert_eq!(err.to_string(), "Este email ya esta registrado");
        Ok(())
    }

    #[tokio::test]
    async fn login_checks_password() -> anyhow::Result<()> {
        let s = svc();
        s.register(reg("pau", "pau@b.cat", "secret", "secret")).await?;
        assert!(matches!(
            s.login(LoginInput { username: "pau".into(), password: "nope".into() }).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            s.login(LoginInput { username: "ghost".into(), password: "secret".into() }).await,
            Err(AuthError::InvalidCredentials)
        ));
        let ok = s.login(LoginInput { username: "pau".into(), password: "secret".into() }).await?;
        assert_eq!(ok.user.username, "pau");
        Ok(())
    }

    #[test]
    fn username_seed_strips_disallowed_characters() {
        assert_eq!(username_seed("anna.puig+cat@gmail.com"), "anna.puig+cat");
        assert_eq!(username_seed("jo an(1)@x.cat"), "joan1");
        assert_eq!(username_seed("!!!@x.cat"), "user");
        assert_eq!(username_seed(&format!("{}@x.cat", "a".repeat(200))).len(), 140);
    }

    #[tokio::test]
    async fn google_creates_then_reuses_account() -> anyhow::Result<()> {
        let s = svc();
        s.register(reg("marta", "marta@cultucat.cat", "pw", "pw")).await?;
        let id = GoogleIdentity { uid: "g1".into(), email: Some("marta@gmail.com".into()) };
        let first = s.google_sign_in(id.clone()).await?;
        assert!(first.created);
        assert_eq!(first.session.user.username, "marta1");
        let again = s.google_sign_in(id).await?;
        assert!(!again.created);
        assert_eq!(again.session.user.id, first.session.user.id);

        let odd = GoogleIdentity { uid: "g3".into(), email: Some("o'brien!#@gmail.com".into()) };
        assert_eq!(s.google_sign_in(odd).await?.session.user.username, "obrien");

        let no_email = GoogleIdentity { uid: "g2".into(), email: None };
        assert!(matches!(s.google_sign_in(no_email).await, Err(AuthError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn reset_flow_is_single_use() -> anyhow::Result<()> {
        let s = svc();
        s.register(reg("joan", "joan@b.cat", "old", "old")).await?;
        assert!(matches!(s.password_reset_link("nobody@b.cat", "http://app").await, Err(AuthError::NotFound(_))));

        let link = s.password_reset_link("joan@b.cat", "http://app/").await?;
        assert!(link.url.starts_with("http://app/reset-password/"));

        let err = s.reset_password(&link.uidb64, &link.token, "new", "other").await.unwrap_err();
        assert_eq!(err.to_string(), "Las contraseñas no coinciden");
        let err = s.reset_password("garbage", &link.token, "new", "new").await.unwrap_err();
        assert_eq!(err.to_string(), "Enlace inválido");

        // the stored stamp must move forward before reuse is detectable
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        s.reset_password(&link.uidb64, &link.token, "new", "new").await?;
        s.login(LoginInput { username: "joan".into(), password: "new".into() }).await?;

        let err = s.reset_password(&link.uidb64, &link.token, "newer", "newer").await.unwrap_err();
        assert_eq!(err.to_string(), "Token inválido o expirado");
        Ok(())
    }
}
