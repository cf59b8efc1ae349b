//! Firebase ID-token verification against Google's published signing keys.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use moka::future::Cache;
use serde::Deserialize;
use tracing::{debug, warn};

use super::domain::GoogleIdentity;
use super::errors::AuthError;

const JWKS_URL: &str = "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const JWKS_TTL: Duration = Duration::from_secs(60 * 60);

#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, AuthError>;
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    email: Option<String>,
}

/// Checks RS256 signature, `aud = project_id` and
/// `iss = https://securetoken.google.com/<project_id>`.
pub struct FirebaseVerifier {
    client: reqwest::Client,
    project_id: String,
    keys: Cache<(), Arc<JwkSet>>,
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        let keys = Cache::builder().max_capacity(1).time_to_live(JWKS_TTL).build();
        Ok(Self { client, project_id: project_id.into(), keys })
    }

    fn validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::RS256);
        v.set_audience(&[self.project_id.as_str()]);
        v.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);
        v
    }

    async fn fetch_keys(&self) -> Result<Arc<JwkSet>, String> {
        let set: JwkSet = self
            .client
            .get(JWKS_URL)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())?;
        debug!(keys = set.keys.len(), "google signing keys refreshed");
        Ok(Arc::new(set))
    }

    async fn key_set(&self) -> Result<Arc<JwkSet>, AuthError> {
        self.keys
            .try_get_with((), self.fetch_keys())
            .await
            .map_err(|e| AuthError::TokenError(format!("cannot load google keys: {e}")))
    }
}

#[async_trait]
impl IdTokenVerifier for FirebaseVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, AuthError> {
        let header = decode_header(id_token).map_err(|_| AuthError::Unauthorized)?;
        let kid = header.kid.ok_or(AuthError::Unauthorized)?;
        let mut set = self.key_set().await?;
        if set.find(&kid).is_none() {
            // key rotation: refresh once
            self.keys.invalidate(&()).await;
            set = self.key_set().await?;
        }
        let jwk = set.find(&kid).ok_or(AuthError::Unauthorized)?;
        let key = DecodingKey::from_jwk(jwk).map_err(|e| AuthError::TokenError(e.to_string()))?;
        let data = decode::<FirebaseClaims>(id_token, &key, &self.validation()).map_err(|e| {
            warn!(error = %e, "firebase id token rejected");
            AuthError::Unauthorized
        })?;
        Ok(GoogleIdentity { uid: data.claims.sub, email: data.claims.email })
    }
}

/// Accepts only the tokens it was seeded with.
pub mod mock {
    use super::*;

    #[derive(Default)]
    pub struct MockVerifier {
        tokens: HashMap<String, GoogleIdentity>,
    }

    impl MockVerifier {
        pub fn with_token(mut self, token: &str, uid: &str, email: Option<&str>) -> Self {
            self.tokens.insert(
                token.to_string(),
                GoogleIdentity { uid: uid.to_string(), email: email.map(str::to_string) },
            );
            self
        }
    }

    #[async_trait]
    impl IdTokenVerifier for MockVerifier {
        async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, AuthError> {
            self.tokens.get(id_token).cloned().ok_or(AuthError::Unauthorized)
        }
    }
}
