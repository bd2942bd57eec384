//! Production HTTP transport (reqwest + rustls).

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use uuid::Uuid;

use crate::config::Credentials;
use crate::op::{OpResponse, Operation};
use crate::transport::{AttemptFailure, RawByteStream, Transport};
use crate::{Error, Result};

const OP_PATH: &str = "/op";
const EXPORT_PATH: &str = "/export";

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    /// Build the transport from already-resolved credentials. Resolution
    /// happens once at session construction; nothing here re-reads the
    /// environment per call.
    pub fn new(credentials: &Credentials, timeout: Duration) -> Result<Self> {
        // Production-friendly pool defaults, env-overridable like the rest of
        // the HTTP knobs.
        let pool_idle = env::var("CONJURE_HTTP_POOL_MAX_IDLE_PER_HOST")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(16);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(pool_idle)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: credentials.base_url.trim_end_matches('/').to_string(),
            api_key: credentials.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        // Correlation id for log linkage; the server may ignore it.
        self.client
            .post(self.url(path))
            .header("X-API-Key", &self.api_key)
            .header("x-conjure-request-id", Uuid::new_v4().to_string())
    }

    fn send_failure(err: reqwest::Error) -> AttemptFailure {
        if err.is_timeout() {
            AttemptFailure::Timeout {
                message: err.to_string(),
            }
        } else {
            AttemptFailure::Connect {
                message: err.to_string(),
            }
        }
    }

    /// Best-effort `Retry-After` parsing; only the `<seconds>` form.
    fn retry_after(headers: &HeaderMap) -> Option<Duration> {
        let raw = headers.get("retry-after")?.to_str().ok()?;
        let secs: u64 = raw.trim().parse().ok()?;
        Some(Duration::from_secs(secs))
    }

    async fn status_failure(resp: reqwest::Response) -> AttemptFailure {
        let status = resp.status().as_u16();
        let retry_after = Self::retry_after(resp.headers());
        let body = resp.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
            .unwrap_or(body);
        AttemptFailure::Status {
            status,
            detail,
            retry_after,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, op: &Operation) -> std::result::Result<OpResponse, AttemptFailure> {
        let resp = self
            .request(OP_PATH)
            .json(&op.to_envelope())
            .send()
            .await
            .map_err(Self::send_failure)?;

        if !resp.status().is_success() {
            return Err(Self::status_failure(resp).await);
        }

        resp.json::<OpResponse>()
            .await
            .map_err(|e| AttemptFailure::Decode {
                message: e.to_string(),
            })
    }

    async fn stream(&self, op: &Operation) -> std::result::Result<RawByteStream, AttemptFailure> {
        let resp = self
            .request(EXPORT_PATH)
            .json(&op.to_envelope())
            .send()
            .await
            .map_err(Self::send_failure)?;

        if !resp.status().is_success() {
            return Err(Self::status_failure(resp).await);
        }

        let chunks = resp.bytes_stream().map(|item| {
            item.map_err(|e| AttemptFailure::StreamBroken {
                message: e.to_string(),
            })
        });
        Ok(Box::pin(chunks))
    }
}
