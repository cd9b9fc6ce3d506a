// src/api/client.rs - reqwest client for the backtest service
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use super::lenient_json::null_non_finite;
use super::{BacktestService, RUN_BACKTEST_PATH, SYMBOLS_PATH};
use crate::config::{PanelConfig, ServiceBase};
use crate::errors::ClientError;
use crate::types::{BacktestRequest, BacktestResponse};

/// Retry budget for idempotent GETs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BacktestClient {
    client: Client,
    base: ServiceBase,
    symbol_retry: RetryPolicy,
}

impl BacktestClient {
    pub fn new(config: &PanelConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| ClientError::from_reqwest(config.base.as_url().as_str(), e))?;

        Ok(Self::with_client(
            client,
            config.base.clone(),
            RetryPolicy {
                max_attempts: config.symbol_retries.max(1),
                backoff: config.retry_backoff,
            },
        ))
    }

    pub fn with_client(client: Client, base: ServiceBase, symbol_retry: RetryPolicy) -> Self {
        Self {
            client,
            base,
            symbol_retry,
        }
    }

    async fn get_symbols_once(&self, url: &Url) -> Result<Vec<String>, ClientError> {
        debug!(%url, "GET symbols");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(url.as_str(), e))?;
        decode_json(url, response).await
    }
}

impl BacktestService for BacktestClient {
    fn base(&self) -> &ServiceBase {
        &self.base
    }

    async fn fetch_symbols(&self) -> Result<Vec<String>, ClientError> {
        let url = self.base.join([SYMBOLS_PATH]);
        let mut attempt = 1;

        loop {
            match self.get_symbols_once(&url).await {
                Ok(symbols) => {
                    info!("✅ Fetched {} symbols from {}", symbols.len(), url);
                    return Ok(symbols);
                }
                Err(err) if err.is_retryable() && attempt < self.symbol_retry.max_attempts => {
                    warn!(
                        "Symbol list attempt {}/{} failed: {}",
                        attempt, self.symbol_retry.max_attempts, err
                    );
                    tokio::time::sleep(self.symbol_retry.backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!("❌ Failed to fetch symbol list: {:?}", err);
                    return Err(err);
                }
            }
        }
    }

    async fn run_backtest(&self, request: &BacktestRequest) -> Result<BacktestResponse, ClientError> {
        let url = self.base.join([RUN_BACKTEST_PATH]);
        debug!(
            %url,
            strategy = %request.strategy,
            symbols = %request.symbols,
            timeframe = %request.timeframe,
            "POST run_backtest"
        );

        let result = match self.client.post(url.clone()).json(request).send().await {
            Ok(response) => decode_json::<BacktestResponse>(&url, response).await,
            Err(e) => Err(ClientError::from_reqwest(url.as_str(), e)),
        };

        match &result {
            Ok(response) => info!(
                "✅ Backtest {} finished with {} symbol result(s)",
                response.run_id,
                response.results.len()
            ),
            Err(err) => error!("❌ Backtest request failed: {:?}", err),
        }
        result
    }
}

async fn decode_json<T: DeserializeOwned>(url: &Url, response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ClientError::from_reqwest(url.as_str(), e))?;

    if !status.is_success() {
        return Err(status_error(status, &body));
    }

    serde_json::from_str(&null_non_finite(&body)).map_err(|e| ClientError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn status_error(status: StatusCode, body: &str) -> ClientError {
    let server_message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.trim().is_empty());

    let message = server_message.clone().unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    });

    ClientError::Status {
        status,
        server_message,
        message,
    }
}
