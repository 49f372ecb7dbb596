//! `reqwest`-backed [`Fetcher`] for live deployments.

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::config::NetworkSettings;
use crate::fetch::{FetchError, FetchResponse, Fetcher};

use super::error::InfraError;

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base: Url,
}

impl HttpFetcher {
    pub fn new(network: &NetworkSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(network.user_agent.as_str())
            .timeout(network.timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        Ok(Self {
            client,
            base: network.base_url.clone(),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve a cache key to the URL it is fetched from.
    pub fn url(&self, key: &str) -> Result<Url, FetchError> {
        self.base.join(key).map_err(|err| FetchError::InvalidKey {
            key: key.to_string(),
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn request(&self, key: &str) -> Result<FetchResponse, FetchError> {
        let url = self.url(key)?;
        debug!(%url, "issuing request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        Ok(FetchResponse::new(status, body))
    }
}
