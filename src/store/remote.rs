//! Read-only provider lookups used by the local store

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::adapter::AIAdapter;
use crate::config::EndpointsConfig;

use super::{HordeModel, HordeWorker, StoreError};

const USER_AGENT: &str = concat!("chat-settings/", env!("CARGO_PKG_VERSION"));

/// Network collaborator of the store
#[async_trait]
pub trait ProviderApi: Send + Sync {
    async fn horde_models(&self) -> Result<Vec<HordeModel>, StoreError>;

    async fn horde_workers(&self) -> Result<Vec<HordeWorker>, StoreError>;

    /// Resolve the account name behind a horde key
    async fn horde_user(&self, key: &str) -> Result<String, StoreError>;

    /// Succeeds when the token has an active NovelAI subscription
    async fn novel_verify(&self, key: &str) -> Result<(), StoreError>;

    /// Month-to-date usage in cents
    async fn openai_usage(&self, key: &str) -> Result<f64, StoreError>;
}

#[derive(Deserialize)]
struct HordeUser {
    username: String,
}

#[derive(Deserialize)]
struct BillingUsage {
    total_usage: f64,
}

pub struct HttpProviderApi {
    http_client: Client,
    endpoints: EndpointsConfig,
}

impl HttpProviderApi {
    pub fn new(endpoints: EndpointsConfig) -> Result<Self, StoreError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(endpoints.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(network)?;
        Ok(Self {
            http_client,
            endpoints,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        let response = request.send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Network {
                message: format!("HTTP {}: {}", status, body.trim()),
            });
        }
        response.json::<T>().await.map_err(network)
    }
}

fn network(e: reqwest::Error) -> StoreError {
    StoreError::Network {
        message: e.to_string(),
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// First day of the month and the day after `today`, as the billing endpoint expects
pub(crate) fn month_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today.with_day(1).unwrap_or(today);
    let end = today.succ_opt().unwrap_or(today);
    (start, end)
}

#[async_trait]
impl ProviderApi for HttpProviderApi {
    async fn horde_models(&self) -> Result<Vec<HordeModel>, StoreError> {
        let url = join(&self.endpoints.horde_url, "/status/models");
        let mut models: Vec<HordeModel> = self
            .get_json(self.http_client.get(url).query(&[("type", "text")]))
            .await?;
        models.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        tracing::debug!(count = models.len(), "Fetched horde models");
        Ok(models)
    }

    async fn horde_workers(&self) -> Result<Vec<HordeWorker>, StoreError> {
        let url = join(&self.endpoints.horde_url, "/workers");
        let mut workers: Vec<HordeWorker> = self
            .get_json(self.http_client.get(url).query(&[("type", "text")]))
            .await?;
        workers.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        tracing::debug!(count = workers.len(), "Fetched horde workers");
        Ok(workers)
    }

    async fn horde_user(&self, key: &str) -> Result<String, StoreError> {
        let url = join(&self.endpoints.horde_url, "/find_user");
        let user: HordeUser = self
            .get_json(self.http_client.get(url).header("apikey", key))
            .await
            .map_err(|e| StoreError::Verification {
                adapter: AIAdapter::Horde,
                message: e.to_string(),
            })?;
        Ok(user.username)
    }

    async fn novel_verify(&self, key: &str) -> Result<(), StoreError> {
        let url = join(&self.endpoints.novel_url, "/user/subscription");
        let response = self
            .http_client
            .get(url)
            .bearer_auth(key)
            .send()
            .await
            .map_err(network)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::Verification {
                adapter: AIAdapter::Novel,
                message: "Novel API key is not valid".to_string(),
            }),
            status => Err(StoreError::Verification {
                adapter: AIAdapter::Novel,
                message: format!("HTTP {}", status),
            }),
        }
    }

    async fn openai_usage(&self, key: &str) -> Result<f64, StoreError> {
        let (start, end) = month_range(Utc::now().date_naive());
        let url = join(&self.endpoints.openai_url, "/dashboard/billing/usage");
        let usage: BillingUsage = self
            .get_json(self.http_client.get(url).bearer_auth(key).query(&[
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
            ]))
            .await?;
        Ok(usage.total_usage)
    }
}
