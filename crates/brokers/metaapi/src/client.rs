use async_trait::async_trait;
use brokerlink_core::*;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::protocol::*;
use crate::retry::RetryPolicy;
use crate::transport::*;

/// Configuration for connecting to the MetaApi cloud.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaApiConfig {
    /// Provisioning API base URL.
    pub provisioning_url: String,
    /// Trading-session (client) API base URL.
    pub client_url: String,
    /// Statistics (MetaStats) API base URL.
    pub metastats_url: String,
    /// Header carrying the service credential.
    pub auth_header: String,
    /// Per-attempt HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Default attempt budget for calls answered with 202.
    pub max_attempts: u32,
}

impl Default for MetaApiConfig {
    fn default() -> Self {
        Self {
            provisioning_url: "https://mt-provisioning-api-v1.agiliumtrade.agiliumtrade.ai"
                .to_string(),
            client_url: "https://mt-client-api-v1.new-york.agiliumtrade.ai".to_string(),
            metastats_url: "https://metastats-api-v1.new-york.agiliumtrade.ai".to_string(),
            auth_header: "auth-token".to_string(),
            timeout_secs: 30,
            max_attempts: 5,
        }
    }
}

/// MetaApi client.
///
/// Every request carries the service credential and a JSON content type.
/// A 202 response means "still processing": the client waits for the
/// `Retry-After` hint (clamped by its [`RetryPolicy`]) and asks again until the
/// attempt budget runs out. Network failures are never retried here.
pub struct MetaApiClient {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    endpoints: Endpoints,
    auth_header: HeaderName,
    auth_value: HeaderValue,
    retry: RetryPolicy,
}

impl MetaApiClient {
    /// Build a client that talks HTTPS through reqwest and sleeps on the tokio timer.
    pub fn new(config: &MetaApiConfig, token: &str) -> Result<Self, RelayError> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        Self::with_transport(config, token, Arc::new(transport), Arc::new(TokioSleeper))
    }

    pub fn with_transport(
        config: &MetaApiConfig,
        token: &str,
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, RelayError> {
        let auth_header = HeaderName::from_bytes(config.auth_header.as_bytes())
            .map_err(|e| RelayError::Internal(format!("Invalid auth header name: {}", e)))?;
        let mut auth_value = HeaderValue::from_str(token)
            .map_err(|e| RelayError::Internal(format!("Invalid access token format: {}", e)))?;
        auth_value.set_sensitive(true);

        Ok(Self {
            transport,
            sleeper,
            endpoints: Endpoints::parse(
                &config.provisioning_url,
                &config.client_url,
                &config.metastats_url,
            )?,
            auth_header,
            auth_value,
            retry: RetryPolicy::default().with_max_attempts(config.max_attempts),
        })
    }

    fn outbound(&self, request: &RetryableRequest) -> OutboundRequest {
        let mut headers = HeaderMap::new();
        headers.insert(self.auth_header.clone(), self.auth_value.clone());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        OutboundRequest {
            method: request.method,
            url: request.url.clone(),
            headers,
            body: request.body.clone(),
        }
    }

    /// Perform one logical call, retrying while the service answers 202.
    pub async fn call(&self, request: RetryableRequest) -> Result<Value, RelayError> {
        let attempts = request.max_attempts.max(1);

        for attempt in 1..=attempts {
            let response = self.transport.send(self.outbound(&request)).await?;

            match response.status {
                202 => {
                    if attempt < attempts {
                        let wait = self.retry.wait_for(response.retry_after.as_deref());
                        self.sleeper.sleep(wait).await;
                    }
                }
                200..=299 => return parse_body(&response.body),
                status => return Err(error_from_response(status, &response.body)),
            }
        }

        Err(RelayError::StillProcessing)
    }

    async fn get(&self, url: reqwest::Url) -> Result<Value, RelayError> {
        self.call(RetryableRequest::new(HttpMethod::Get, url, self.retry.max_attempts))
            .await
    }
}

fn parse_body(body: &str) -> Result<Value, RelayError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body)
        .map_err(|e| RelayError::Internal(format!("Invalid upstream response: {}", e)))
}

#[async_trait]
impl UpstreamApi for MetaApiClient {
    async fn create_account(
        &self,
        credentials: &BrokerCredentials,
    ) -> Result<CreatedAccount, RelayError> {
        let body = serde_json::to_value(CreateAccountBody::cloud(credentials))
            .map_err(|e| RelayError::Internal(format!("Serialization error: {}", e)))?;
        let request =
            RetryableRequest::new(HttpMethod::Post, self.endpoints.accounts()?, self.retry.max_attempts)
                .with_body(body);

        let value = self.call(request).await?;
        serde_json::from_value::<CreatedAccount>(value)
            .map_err(|_| RelayError::Internal("Upstream did not return an account id".to_string()))
    }

    async fn get_account(
        &self,
        account_id: &str,
        max_attempts: u32,
    ) -> Result<ProvisionedAccount, RelayError> {
        let request =
            RetryableRequest::new(HttpMethod::Get, self.endpoints.account(account_id)?, max_attempts);
        let value = self.call(request).await?;
        serde_json::from_value(value)
            .map_err(|e| RelayError::Internal(format!("Invalid account payload: {}", e)))
    }

    async fn delete_account(&self, account_id: &str) -> Result<(), RelayError> {
        let request = RetryableRequest::new(
            HttpMethod::Delete,
            self.endpoints.account(account_id)?,
            self.retry.max_attempts,
        );
        self.call(request).await.map(|_| ())
    }

    async fn enable_statistics(&self, account_id: &str) -> Result<(), RelayError> {
        let request = RetryableRequest::new(
            HttpMethod::Put,
            self.endpoints.enable_metastats(account_id)?,
            self.retry.max_attempts,
        );
        self.call(request).await.map(|_| ())
    }

    async fn account_information(&self, account_id: &str) -> Result<Value, RelayError> {
        self.get(self.endpoints.account_information(account_id)?).await
    }

    async fn history_deals(&self, account_id: &str, range: DateRange) -> Result<Value, RelayError> {
        self.get(self.endpoints.history_deals(account_id, range)?).await
    }

    async fn metrics(&self, account_id: &str) -> Result<Value, RelayError> {
        self.get(self.endpoints.metrics(account_id)?).await
    }

    async fn historical_trades(
        &self,
        account_id: &str,
        range: DateRange,
    ) -> Result<Value, RelayError> {
        self.get(self.endpoints.historical_trades(account_id, range)?).await
    }

    async fn daily_growth(&self, account_id: &str) -> Result<Value, RelayError> {
        self.get(self.endpoints.daily_growth(account_id)?).await
    }
}
