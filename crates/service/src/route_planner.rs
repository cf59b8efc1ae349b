//! Client for the external route-planning API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{instrument, warn};

use crate::errors::{ServiceError, ServiceResult};

/// Body accepted by the route endpoint. Values are forwarded untouched, so
/// numbers and numeric strings are both fine.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub origin_lat: Option<Value>,
    pub origin_lng: Option<Value>,
    pub destination_lat: Option<Value>,
    pub destination_lng: Option<Value>,
    pub mode: Option<Value>,
    pub preference: Option<Value>,
}

impl RouteRequest {
    pub fn validate(&self) -> ServiceResult<()> {
        let present = |v: &Option<Value>| matches!(v, Some(x) if !x.is_null());
        let all = [
            &self.origin_lat,
            &self.origin_lng,
            &self.destination_lat,
            &self.destination_lng,
            &self.mode,
            &self.preference,
        ];
        if all.iter().all(|v| present(v)) {
            Ok(())
        } else {
            Err(ServiceError::Validation("Missing parameters".into()))
        }
    }
}

#[async_trait]
pub trait RoutePlanner: Send + Sync {
    async fn plan(&self, req: &RouteRequest) -> ServiceResult<Value>;
}

/// Drop the turn-by-turn list; clients only draw the geometry and totals.
pub fn strip_instructions(mut body: Value) -> Value {
    if let Value::Object(map) = &mut body {
        map.remove("instructions");
    }
    body
}

pub struct HttpRoutePlanner {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpRoutePlanner {
    pub fn new(cfg: &configs::RoutingConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self { client, url: cfg.base_url.clone(), api_key: cfg.api_key.clone() })
    }
}

#[async_trait]
impl RoutePlanner for HttpRoutePlanner {
    #[instrument(skip(self, req))]
    async fn plan(&self, req: &RouteRequest) -> ServiceResult<Value> {
        req.validate()?;
        let resp = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .json(req)
            .send()
            .await
            .map_err(|e| ServiceError::Upstream(e.to_string()))?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let details = resp.text().await.unwrap_or_default();
            warn!(%status, "route planner rejected the request");
            return Err(ServiceError::Upstream(details));
        }
        let body: Value = resp.json().await.map_err(|e| ServiceError::Upstream(e.to_string()))?;
        Ok(strip_instructions(body))
    }
}
