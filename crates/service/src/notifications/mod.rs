//! Push notifications: a transport-agnostic trait plus FCM, no-op and mock senders.
//!
//! Delivery failures are reported in [`PushResult`] and logged; they never
//! fail the request that triggered them.

pub mod fcm;
pub mod mock;

use std::collections::BTreeMap;

use async_trait::async_trait;
use models::user;
use sea_orm::ConnectionTrait;
use serde::Serialize;
use tracing::{debug, info, warn};

pub use fcm::FcmNotifier;
pub use mock::MockNotifier;

/// FCM data payloads are string maps.
pub type PushData = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PushResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PushResult {
    pub fn ok(response_id: impl Into<String>) -> Self {
        Self { success: true, response_id: Some(response_id.into()), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, response_id: None, error: Some(error.into()) }
    }
}

#[async_trait]
pub trait PushNotifier: Send + Sync {
    /// Visible notification with a data payload.
    async fn send_notification(&self, token: &str, title: &str, body: &str, data: PushData) -> PushResult;
    /// Data-only message, used to refresh open screens silently.
    async fn send_data_message(&self, token: &str, data: PushData) -> PushResult;
}

/// Logs instead of sending; used when notifications are disabled.
#[derive(Debug, Default, Clone)]
pub struct NoopNotifier;

#[async_trait]
impl PushNotifier for NoopNotifier {
    async fn send_notification(&self, token: &str, title: &str, _body: &str, data: PushData) -> PushResult {
        info!(token_len = token.len(), %title, kind = data.get("type").map(String::as_str).unwrap_or(""), "push disabled; notification dropped");
        PushResult::ok("noop")
    }

    async fn send_data_message(&self, token: &str, data: PushData) -> PushResult {
        info!(token_len = token.len(), kind = data.get("type").map(String::as_str).unwrap_or(""), "push disabled; data message dropped");
        PushResult::ok("noop")
    }
}

/// Build a data map from key/value pairs.
pub fn push_data<I, K, V>(pairs: I) -> PushData
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.to_string())).collect()
}

/// How a notification reaches the device.
#[derive(Debug, Clone)]
pub enum Delivery<'a> {
    Visible { title: &'a str, body: &'a str },
    DataOnly,
}

/// Notify `username` if they registered a device token. Returns `None`
/// when there is nobody to notify.
pub async fn notify_user<C: ConnectionTrait>(
    db: &C,
    notifier: &dyn PushNotifier,
    username: &str,
    delivery: Delivery<'_>,
    data: PushData,
) -> Option<PushResult> {
    let token = match user::find_by_username(db, username).await {
        Ok(Some(u)) => u.fcm_token.filter(|t| !t.is_empty()),
        Ok(None) => None,
        Err(e) => {
            warn!(%username, error = %e, "push recipient lookup failed");
            return None;
        }
    };
    let Some(token) = token else {
        debug!(%username, "no device token; push skipped");
        return None;
    };
    let result = match delivery {
        Delivery::Visible { title, body } => notifier.send_notification(&token, title, body, data).await,
        Delivery::DataOnly => notifier.send_data_message(&token, data).await,
    };
    if !result.success {
        warn!(%username, error = result.error.as_deref().unwrap_or(""), "push delivery failed");
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_values_stringified() {
        let d = push_data([("type", "new_message".to_string()), ("chat_id", 7.to_string())]);
        assert_eq!(d.get("chat_id").map(String::as_str), Some("7"));
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn result_serialization_omits_missing_fields() {
        let v = serde_json::to_value(PushResult::failed("boom")).unwrap();
        assert_eq!(v, serde_json::json!({"success": false, "error": "boom"}));
        let v = serde_json::to_value(PushResult::ok("projects/p/messages/1")).unwrap();
        assert_eq!(v["response_id"], "projects/p/messages/1");
    }

    #[tokio::test]
    async fn noop_always_succeeds() {
        let n = NoopNotifier;
        let r = n.send_data_message("tok", push_data([("type", "x")])).await;
        assert!(r.success);
    }
}
