// Observation of outgoing requests by decorating a Transport

use crate::error::Result;
use crate::result::{HttpMethod, OrderedSet};
use crate::transport::{ProbeResponse, Transport};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Receives every request a decorated transport is about to send
pub trait RequestObserver: Send + Sync {
    fn on_request_observed(&self, url: &str, method: HttpMethod);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservedCall {
    pub method: HttpMethod,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

/// Requests seen during one monitored session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkLog {
    /// Non-GET calls with their method
    pub api_calls: Vec<ObservedCall>,
    /// `ws://` and `wss://` targets
    pub ws_connections: OrderedSet,
    /// URLs fetched with GET
    pub fetch_urls: OrderedSet,
}

impl NetworkLog {
    pub fn record(&mut self, url: &str, method: HttpMethod) {
        let lowered = url.to_ascii_lowercase();
        if lowered.starts_with("ws://") || lowered.starts_with("wss://") {
            self.ws_connections.insert(url);
        } else if method == HttpMethod::Get {
            self.fetch_urls.insert(url);
        } else {
            self.api_calls.push(ObservedCall {
                method,
                url: url.to_string(),
                timestamp: Utc::now(),
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.api_calls.is_empty() && self.ws_connections.is_empty() && self.fetch_urls.is_empty()
    }
}

/// Accumulates a `NetworkLog` between `start` and `stop`; requests outside a session are ignored.
#[derive(Clone, Default)]
pub struct NetworkRecorder {
    session: Arc<Mutex<Option<NetworkLog>>>,
}

impl NetworkRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a fresh session, discarding anything recorded before
    pub fn start(&self) {
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        *session = Some(NetworkLog::default());
    }

    pub fn is_recording(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Copy of the current session's log
    pub fn snapshot(&self) -> Option<NetworkLog> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// End the session and hand back what it recorded
    pub fn stop(&self) -> Option<NetworkLog> {
        self.session.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

impl RequestObserver for NetworkRecorder {
    fn on_request_observed(&self, url: &str, method: HttpMethod) {
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(log) = session.as_mut() {
            log.record(url, method);
        }
    }
}

/// Transport decorator that reports each request to an observer before delegating
pub struct ObservedTransport {
    inner: Arc<dyn Transport>,
    observer: Arc<dyn RequestObserver>,
}

impl ObservedTransport {
    pub fn new(inner: Arc<dyn Transport>, observer: Arc<dyn RequestObserver>) -> Self {
        Self { inner, observer }
    }
}

#[async_trait]
impl Transport for ObservedTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        debug!("Observed GET {}", url);
        self.observer.on_request_observed(url, HttpMethod::Get);
        self.inner.get_text(url).await
    }

    async fn probe(&self, method: HttpMethod, url: &str) -> Result<ProbeResponse> {
        debug!("Observed {} {}", method, url);
        self.observer.on_request_observed(url, method);
        self.inner.probe(method, url).await
    }
}
