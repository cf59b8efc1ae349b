use std::sync::Arc;

use anyhow::Context;
use configs::AppConfig;
use sea_orm::DatabaseConnection;
use service::auth::google::{FirebaseVerifier, IdTokenVerifier};
use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::service::AuthConfig;
use service::auth::AuthService;
use service::mail::{self, Mailer};
use service::notifications::{FcmNotifier, NoopNotifier, PushNotifier};
use service::route_planner::{HttpRoutePlanner, RoutePlanner};
use tracing::info;

use crate::metrics::Metrics;

/// Shared handles every handler can reach.
#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub cfg: Arc<AppConfig>,
    pub auth: Arc<AuthService<SeaOrmAuthRepository>>,
    pub notifier: Arc<dyn PushNotifier>,
    pub mailer: Arc<dyn Mailer>,
    pub verifier: Arc<dyn IdTokenVerifier>,
    pub routes: Arc<dyn RoutePlanner>,
    pub metrics: Arc<Metrics>,
}

impl ServerState {
    /// Production wiring: FCM when enabled, mail relay when configured.
    pub fn from_config(db: DatabaseConnection, cfg: AppConfig) -> anyhow::Result<Self> {
        let notifier: Arc<dyn PushNotifier> = if cfg.notifications.enabled {
            Arc::new(FcmNotifier::from_config(&cfg.notifications).context("loading FCM credentials")?)
        } else {
            info!("push notifications disabled; messages are only logged");
            Arc::new(NoopNotifier)
        };
        let mailer: Arc<dyn Mailer> = Arc::from(mail::from_config(&cfg.mail)?);
        let verifier: Arc<dyn IdTokenVerifier> = Arc::new(FirebaseVerifier::new(cfg.google.project_id.clone())?);
        let routes: Arc<dyn RoutePlanner> = Arc::new(HttpRoutePlanner::new(&cfg.routing)?);
        Self::builder(db, cfg)
            .notifier(notifier)
            .mailer(mailer)
            .verifier(verifier)
            .routes(routes)
            .build()
    }

    pub fn builder(db: DatabaseConnection, cfg: AppConfig) -> StateBuilder {
        StateBuilder { db, cfg, notifier: None, mailer: None, verifier: None, routes: None }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.cfg.auth.jwt_secret
    }
}

/// Assembles a [`ServerState`]; collaborators left unset fall back to
/// the no-op notifier, the logging mailer and the HTTP clients.
pub struct StateBuilder {
    db: DatabaseConnection,
    cfg: AppConfig,
    notifier: Option<Arc<dyn PushNotifier>>,
    mailer: Option<Arc<dyn Mailer>>,
    verifier: Option<Arc<dyn IdTokenVerifier>>,
    routes: Option<Arc<dyn RoutePlanner>>,
}

impl StateBuilder {
    pub fn notifier(mut self, n: Arc<dyn PushNotifier>) -> Self {
        self.notifier = Some(n);
        self
    }

    pub fn mailer(mut self, m: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(m);
        self
    }

    pub fn verifier(mut self, v: Arc<dyn IdTokenVerifier>) -> Self {
        self.verifier = Some(v);
        self
    }

    pub fn routes(mut self, r: Arc<dyn RoutePlanner>) -> Self {
        self.routes = Some(r);
        self
    }

    pub fn build(self) -> anyhow::Result<ServerState> {
        let repo = Arc::new(SeaOrmAuthRepository { db: self.db.clone() });
        let auth = Arc::new(AuthService::new(repo, AuthConfig::from_app(&self.cfg.auth)));
        let verifier = match self.verifier {
            Some(v) => v,
            None => Arc::new(FirebaseVerifier::new(self.cfg.google.project_id.clone())?),
        };
        let routes = match self.routes {
            Some(r) => r,
            None => Arc::new(HttpRoutePlanner::new(&self.cfg.routing)?),
        };
        Ok(ServerState {
            db: self.db,
            auth,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(NoopNotifier)),
            mailer: self.mailer.unwrap_or_else(|| Arc::new(mail::LogMailer)),
            verifier,
            routes,
            metrics: Arc::new(Metrics::new()?),
            cfg: Arc::new(self.cfg),
        })
    }
}
