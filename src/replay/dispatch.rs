//! Request Dispatch
//!
//! Fires one outbound request per replay event, asynchronously relative to
//! the pacing loop, and reports the outcome through a channel. Each spawned
//! task owns its captured context; nothing here touches shared state.

use crate::replay::outcome::{DispatchReport, RequestOutcome};
use crate::replay::timeline::ReplayEvent;
use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Method};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};

/// Client-level knobs for the outbound leg.
#[derive(Debug, Clone, Default)]
pub struct DispatchConfig {
    /// Target base URL each logged path is appended to.
    pub prefix: String,
    /// Per-request timeout. No overall replay timeout exists.
    pub timeout: Option<Duration>,
    /// Accept otherwise-invalid TLS certificates.
    pub accept_invalid_certs: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Cap on concurrently in-flight requests. None reproduces the
    /// original unbounded behavior.
    pub max_in_flight: Option<usize>,
}

pub struct Dispatcher {
    client: Client,
    prefix: String,
    username: Option<String>,
    password: Option<String>,
    limiter: Option<Arc<Semaphore>>,
}

impl Dispatcher {
    pub fn new(config: &DispatchConfig) -> Result<Self> {
        let mut builder =
            Client::builder().danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            client,
            prefix: config.prefix.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            limiter: config
                .max_in_flight
                .map(|n| Arc::new(Semaphore::new(n.max(1)))),
        })
    }

    /// Fire-and-forget: the spawned task reports through `tx` exactly once.
    /// The pacing loop never awaits the response.
    pub fn spawn(&self, event: ReplayEvent, tx: mpsc::Sender<DispatchReport>) {
        let client = self.client.clone();
        let url = format!("{}{}", self.prefix, event.path);
        let username = self.username.clone();
        let password = self.password.clone();
        let limiter = self.limiter.clone();

        tokio::spawn(async move {
            // Bounding in-flight requests must not stall the pacing loop, so
            // the permit is taken here, inside the dispatch task.
            let _permit = match &limiter {
                Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
                None => None,
            };

            let dispatched_at_ms = Utc::now().timestamp_millis();
            let started = Instant::now();
            let outcome = match send(&client, &event, &url, username, password).await {
                Ok(status) => RequestOutcome::Completed {
                    status,
                    elapsed: started.elapsed(),
                },
                Err(error) => RequestOutcome::Failed { error },
            };

            let _ = tx
                .send(DispatchReport {
                    event,
                    dispatched_at_ms,
                    outcome,
                })
                .await;
        });
    }
}

/// Issue one request. Any HTTP response, error status included, is Ok; the
/// Err side is reserved for transport-level failures and unusable methods.
async fn send(
    client: &Client,
    event: &ReplayEvent,
    url: &str,
    username: Option<String>,
    password: Option<String>,
) -> std::result::Result<u16, String> {
    let method = Method::from_bytes(event.method.as_bytes())
        .map_err(|_| format!("invalid method {:?}", event.method))?;

    let mut request = client.request(method, url);
    if !event.user_agent.is_empty() {
        request = request.header(USER_AGENT, event.user_agent.as_str());
    }
    if let Some(username) = username {
        request = request.basic_auth(username, password);
    }

    match request.send().await {
        Ok(response) => Ok(response.status().as_u16()),
        Err(error) => Err(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(method: &str) -> ReplayEvent {
        ReplayEvent {
            timestamp_ms: 0,
            method: method.to_string(),
            path: "/".to_string(),
            user_agent: String::new(),
            recorded_status: "200".to_string(),
        }
    }

    #[tokio::test]
    async fn test_invalid_method_is_a_failure() {
        let client = Client::new();
        let result = send(&client, &event("NOT A METHOD"), "http://127.0.0.1:1/", None, None).await;
        assert!(result.unwrap_err().contains("invalid method"));
    }

    #[tokio::test]
    async fn test_connection_refused_reports_failure() {
        let dispatcher = Dispatcher::new(&DispatchConfig {
            // A listener bound and immediately dropped leaves a port that
            // refuses connections.
            prefix: {
                let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
                let addr = listener.local_addr().unwrap();
                drop(listener);
                format!("http://{}", addr)
            },
            ..DispatchConfig::default()
        })
        .unwrap();

        let (tx, mut rx) = mpsc::channel(1);
        dispatcher.spawn(event("GET"), tx);
        let report = rx.recv().await.expect("one report");
        assert!(matches!(report.outcome, RequestOutcome::Failed { .. }));
    }
}
