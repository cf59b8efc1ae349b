use std::sync::Mutex;

use async_trait::async_trait;

use super::{PushData, PushNotifier, PushResult};

#[derive(Debug, Clone, PartialEq)]
pub struct SentPush {
    pub token: String,
    /// `None` for data-only messages.
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: PushData,
}

/// Records every message instead of sending it.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<SentPush>>,
}

impl MockNotifier {
    pub fn sent(&self) -> Vec<SentPush> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Messages whose `type` entry equals `kind`.
    pub fn sent_of_type(&self, kind: &str) -> Vec<SentPush> {
        self.sent()
            .into_iter()
            .filter(|p| p.data.get("type").map(String::as_str) == Some(kind))
            .collect()
    }

    fn record(&self, push: SentPush) -> PushResult {
        match self.sent.lock() {
            Ok(mut v) => {
                v.push(push);
                PushResult::ok(format!("mock-{}", v.len()))
            }
            Err(e) => PushResult::failed(e.to_string()),
        }
    }
}

#[async_trait]
impl PushNotifier for MockNotifier {
    async fn send_notification(&self, token: &str, title: &str, body: &str, data: PushData) -> PushResult {
        self.record(SentPush { token: token.into(), title: Some(title.into()), body: Some(body.into()), data })
    }

    async fn send_data_message(&self, token: &str, data: PushData) -> PushResult {
        self.record(SentPush { token: token.into(), title: None, body: None, data })
    }
}
