use std::time::Duration;

use reqwest::{Client, ClientBuilder};

use crate::MenuError;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking-from-the-caller's-view HTTP GET: bytes on 2xx, an error otherwise.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MenuError>;
}

pub struct RequestClient {
    client: Client,
    timeout: Duration,
}

impl RequestClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = ClientBuilder::new()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Fetch for RequestClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, MenuError> {
        let failed = |reason: String| MenuError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}")));
        }

        let body = response.bytes().await.map_err(|e| failed(e.to_string()))?;
        Ok(body.to_vec())
    }
}
