use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub agenda: AgendaConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

/// Bearer tokens and password reset links.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_reset_ttl_minutes")]
    pub reset_token_ttl_minutes: i64,
    #[serde(default = "default_frontend_base_url")]
    pub frontend_base_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_hours: default_token_ttl_hours(),
            reset_token_ttl_minutes: default_reset_ttl_minutes(),
            frontend_base_url: default_frontend_base_url(),
        }
    }
}

fn default_token_ttl_hours() -> i64 { 720 }
fn default_reset_ttl_minutes() -> i64 { 60 }
fn default_frontend_base_url() -> String { "http://localhost:8080".into() }

/// Firebase Cloud Messaging.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Path to the service-account JSON.
    #[serde(default)]
    pub credentials_path: String,
    /// Overrides the project id found in the credentials file.
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GoogleConfig {
    /// Firebase project whose ID tokens are accepted for Google sign-in.
    #[serde(default)]
    pub project_id: String,
}

/// External route planner used by `POST /api/calcular-ruta`.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_routing_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self { base_url: default_routing_url(), api_key: String::new(), timeout_secs: default_http_timeout() }
    }
}

fn default_routing_url() -> String { "https://e-movebcn-back.onrender.com/api/public/calcular".into() }
fn default_http_timeout() -> u64 { 20 }

/// Open-data cultural agenda consumed by the `import-events` binary.
#[derive(Debug, Clone, Deserialize)]
pub struct AgendaConfig {
    #[serde(default = "default_agenda_url")]
    pub base_url: String,
    #[serde(default)]
    pub app_token: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_min_year")]
    pub min_year: i32,
}

impl Default for AgendaConfig {
    fn default() -> Self {
        Self {
            base_url: default_agenda_url(),
            app_token: None,
            page_size: default_page_size(),
            min_year: default_min_year(),
        }
    }
}

fn default_agenda_url() -> String { "https://analisi.transparenciacatalunya.cat/resource/rhpv-yr4f.json".into() }
fn default_page_size() -> u32 { 1000 }
fn default_min_year() -> i32 { 2025 }

/// Outgoing mail. Without a relay, messages are only logged.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub relay_url: Option<String>,
    #[serde(default = "default_mail_from")]
    pub from: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self { relay_url: None, from: default_mail_from() }
    }
}

fn default_mail_from() -> String { "no-reply@cultucat.cat".into() }

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_media_dir")]
    pub dir: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self { dir: default_media_dir() }
    }
}

fn default_media_dir() -> String { "media".into() }

/// Load from `CONFIG_PATH` (or `config.toml`); a missing file yields defaults.
pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if std::fs::metadata(&path).is_err() {
        return Ok(AppConfig::default());
    }
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.apply_env_overrides();
        self.server.normalize()?;
        self.database.validate()?;
        self.auth.validate()?;
        self.notifications.validate()?;
        if self.agenda.page_size == 0 {
            return Err(anyhow!("agenda.page_size must be >= 1"));
        }
        Ok(())
    }

    /// Environment variables win over empty TOML values.
    fn apply_env_overrides(&mut self) {
        self.database.normalize_from_env();
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        fill_from_env(&mut self.auth.jwt_secret, "JWT_SECRET");
        fill_from_env(&mut self.notifications.credentials_path, "FCM_CREDENTIALS_PATH");
        fill_from_env(&mut self.google.project_id, "FIREBASE_PROJECT_ID");
        fill_from_env(&mut self.routing.api_key, "ROUTE_API_KEY");
        if let Ok(dir) = std::env::var("MEDIA_DIR") {
            self.media.dir = dir;
        }
    }
}

fn fill_from_env(slot: &mut String, key: &str) {
    if slot.trim().is_empty() {
        if let Ok(v) = std::env::var(key) {
            *slot = v;
        }
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(w) if w > 0 => {}
            _ => self.worker_threads = Some(4),
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().len() < 16 {
            return Err(anyhow!("auth.jwt_secret must be at least 16 characters (or set JWT_SECRET)"));
        }
        if self.token_ttl_hours <= 0 || self.reset_token_ttl_minutes <= 0 {
            return Err(anyhow!("auth token lifetimes must be positive"));
        }
        Ok(())
    }
}

impl NotificationsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.credentials_path.trim().is_empty() {
            return Err(anyhow!("notifications.enabled requires notifications.credentials_path"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [database]
        url = "postgres://u:p@localhost/cultucat"

        [auth]
        jwt_secret = "0123456789abcdef0123"

        [agenda]
        min_year = 2026
    "#;

    #[test]
    fn parses_sections_and_defaults() {
        let cfg = load_from_str(SAMPLE).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.auth.token_ttl_hours, 720);
        assert_eq!(cfg.agenda.min_year, 2026);
        assert_eq!(cfg.agenda.page_size, 1000);
        assert_eq!(cfg.media.dir, "media");
        assert!(!cfg.notifications.enabled);
    }

    #[test]
    fn validates_database_url_scheme() {
        let mut db = DatabaseConfig { url: "mysql://x".into(), ..DatabaseConfig::default() };
        assert!(db.validate().is_err());
        db.url = "postgres://x".into();
        assert!(db.validate().is_ok());
    }

    #[test]
    fn rejects_short_jwt_secret() {
        let auth = AuthConfig { jwt_secret: "short".into(), ..AuthConfig::default() };
        assert!(auth.validate().is_err());
    }

    #[test]
    fn notifications_need_credentials_when_enabled() {
        let n = NotificationsConfig { enabled: true, credentials_path: String::new(), project_id: None };
        assert!(n.validate().is_err());
        let n = NotificationsConfig { enabled: false, ..n };
        assert!(n.validate().is_ok());
    }

    #[test]
    fn zero_worker_threads_normalized() {
        let mut s = ServerConfig { host: " ".into(), port: 80, worker_threads: Some(0) };
        s.normalize().unwrap();
        assert_eq!(s.host, "127.0.0.1");
        assert_eq!(s.worker_threads, Some(4));
    }
}
