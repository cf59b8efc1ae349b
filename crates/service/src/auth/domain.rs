use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registration input. Every field is required; the handler passes through
/// whatever the client sent so missing fields produce the domain message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Login input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Domain user (business view)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// Domain credentials (hashed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub user_id: Uuid,
    pub password_hash: String,
    pub password_algorithm: String,
    /// Bumped on every password change; reset tokens are bound to it.
    pub updated_at: DateTime<Utc>,
}

/// Login result (session)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: AuthUser,
    pub token: String,
}

/// Identity asserted by a verified Google/Firebase ID token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleIdentity {
    pub uid: String,
    pub email: Option<String>,
}

/// Outcome of a Google sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleSession {
    pub session: AuthSession,
    pub created: bool,
}

/// Pieces of a password-reset link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetLink {
    pub uidb64: String,
    pub token: String,
    pub url: String,
}
