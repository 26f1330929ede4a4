use crate::config::PoolsConfig;
use crate::error::AppError;
use reqwest::Client;
use std::future::Future;

/// Where the raw pool list text comes from.
pub trait PoolSource: Send + Sync + 'static {
    fn fetch_pool_list(&self) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Downloads the pool list over HTTP(S).
pub struct HttpPoolSource {
    url: String,
    http: Client,
}

impl HttpPoolSource {
    pub fn new(config: &PoolsConfig) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::NetworkFailure(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(config.url.clone(), http))
    }

    fn with_client(url: String, http: Client) -> Self {
        Self { url, http }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PoolSource for HttpPoolSource {
    async fn fetch_pool_list(&self) -> Result<String, AppError> {
        let resp = self
            .http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/plain")
            .send()
            .await
            .map_err(|e| AppError::NetworkFailure(format!("Pool list request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(AppError::NetworkFailure(format!(
                "Pool list server returned {status}"
            )));
        }

        resp.text()
            .await
            .map_err(|e| AppError::NetworkFailure(format!("Failed to read pool list: {e}")))
    }
}
