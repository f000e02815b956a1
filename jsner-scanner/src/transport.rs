use crate::error::{Result, ScanError};
use crate::result::HttpMethod;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

/// What came back from a probe that reached the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status_code: u16,
}

/// Network seam shared by the page fetcher, the quick scan and the verifier
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a document or script body as text
    async fn get_text(&self, url: &str) -> Result<String>;

    /// Issue one verification request; any HTTP response is `Ok`
    async fn probe(&self, method: HttpMethod, url: &str) -> Result<ProbeResponse>;
}

/// `reqwest`-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("jsner/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(10)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    async fn probe(&self, method: HttpMethod, url: &str) -> Result<ProbeResponse> {
        debug!("Probing {} {}", method, url);
        let response = self
            .client
            .request(method.to_reqwest(), url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| ScanError::ProbeFailure(e.to_string()))?;

        Ok(ProbeResponse {
            status_code: response.status().as_u16(),
        })
    }
}
