//! HTTP client for the core node.

pub mod protocol;

pub use protocol::{InfoResponse, TxResponse, TxStatus};

use async_trait::async_trait;

use crate::Error;

/// Source of core node liveness and sync information.
#[async_trait]
pub trait CoreInfo: Send + Sync {
    async fn info(&self) -> Result<InfoResponse, Error>;
}

/// Client for a single core node.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    url: String,
}

impl Client {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), path)
    }

    /// Send a base64 transaction envelope to core's `/tx` endpoint.
    ///
    /// Any HTTP status is accepted as long as the body decodes; classifying
    /// the response is left to the caller.
    #[tracing::instrument(skip_all)]
    pub async fn submit_transaction(&self, envelope: &str) -> Result<TxResponse, Error> {
        let url = self.endpoint(&format!("tx?blob={}", urlencoding::encode(envelope)));
        let resp = self.http.get(&url).send().await?;
        let bytes = resp.bytes().await?;
        let body: TxResponse = serde_json::from_slice(&bytes)?;
        Ok(body)
    }

    /// Fetch core's `/info` document.
    pub async fn info(&self) -> Result<InfoResponse, Error> {
        let resp = self.http.get(self.endpoint("info")).send().await?;
        let resp = resp.error_for_status()?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl CoreInfo for Client {
    async fn info(&self) -> Result<InfoResponse, Error> {
        Client::info(self).await
    }
}
