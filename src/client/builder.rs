//! Session construction.
//!
//! Keep this surface small and predictable: credentials, endpoint, document
//! name, retry policy, timeout, and a transport override for tests.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::client::core::{ensure_success, ClientInner, ConjureClient};
use crate::config::Credentials;
use crate::exec::{CancelToken, RequestExecutor, RetryPolicy};
use crate::graph::ObjectGraph;
use crate::materials::MaterialsCache;
use crate::op::{Operation, OperationKind};
use crate::transport::{HttpTransport, Transport};
use crate::Result;

pub struct ClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    document: String,
    timeout: Duration,
    retry: RetryPolicy,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: None,
            document: "Main".to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            transport: None,
        }
    }

    /// Explicit API key; wins over environment and config file.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Explicit service URL; wins over environment and config file.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Name of the remote document to open. Defaults to "Main".
    pub fn document(mut self, name: impl Into<String>) -> Self {
        self.document = name.into();
        self
    }

    /// Per-exchange transport timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Inject a custom transport. Primarily for tests; skips credential
    /// resolution entirely.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Resolve credentials (once), open the remote document, and return the
    /// bound session.
    pub async fn connect(self) -> Result<ConjureClient> {
        let transport = match self.transport {
            Some(t) => t,
            None => {
                let credentials = Credentials::resolve(self.api_key, self.base_url)?;
                Arc::new(HttpTransport::new(&credentials, self.timeout)?) as Arc<dyn Transport>
            }
        };
        let executor = RequestExecutor::new(transport, self.retry);

        let open = Operation::new(OperationKind::Lifecycle, "open_document")
            .param("name", self.document.as_str());
        let resp = ensure_success(executor.execute(&open, &CancelToken::never()).await?)?;
        let document_id = resp
            .result
            .get("document")
            .and_then(|v| v.as_str())
            .unwrap_or(self.document.as_str())
            .to_string();

        info!(
            document = document_id.as_str(),
            name = self.document.as_str(),
            "session opened"
        );

        Ok(ConjureClient {
            inner: Arc::new(ClientInner {
                executor,
                graph: ObjectGraph::new(),
                document_id,
                document_name: self.document,
                closed: AtomicBool::new(false),
                materials: MaterialsCache::new(),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
