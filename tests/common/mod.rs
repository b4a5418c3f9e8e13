//! Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use mockito::{Mock, Server, ServerGuard};
use quote_ai::providers::{ProviderAdapter, ProviderOutput};
use quote_ai::{Orchestrator, OrchestratorBuilder, Provider, ProviderError, ProviderErrorKind};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted adapter does on its next call.
#[derive(Debug, Clone)]
pub enum Behavior {
    Reply(String),
    Fail(ProviderErrorKind),
    /// Never completes.
    Hang,
}

impl Behavior {
    pub fn reply(text: &str) -> Self {
        Behavior::Reply(text.to_string())
    }
}

/// In-process adapter whose behaviour tests can change while it is installed.
pub struct ScriptedAdapter {
    provider: Provider,
    behavior: Arc<Mutex<Behavior>>,
    calls: Arc<AtomicU32>,
    delay: Duration,
    cost: f64,
    ping_ok: Arc<Mutex<bool>>,
}

/// Test-side handle to a [`ScriptedAdapter`] after it moved into the orchestrator.
#[derive(Clone)]
pub struct Handle {
    behavior: Arc<Mutex<Behavior>>,
    calls: Arc<AtomicU32>,
    ping_ok: Arc<Mutex<bool>>,
}

impl Handle {
    pub fn set(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_ping(&self, ok: bool) {
        *self.ping_ok.lock().unwrap() = ok;
    }
}

impl ScriptedAdapter {
    pub fn new(provider: Provider, behavior: Behavior) -> Self {
        Self {
            provider,
            behavior: Arc::new(Mutex::new(behavior)),
            calls: Arc::new(AtomicU32::new(0)),
            delay: Duration::ZERO,
            cost: 0.00004,
            ping_ok: Arc::new(Mutex::new(true)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn handle(&self) -> Handle {
        Handle {
            behavior: Arc::clone(&self.behavior),
            calls: Arc::clone(&self.calls),
            ping_ok: Arc::clone(&self.ping_ok),
        }
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn generate(
        &self,
        _request: &quote_ai::GenerationRequest,
    ) -> Result<ProviderOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().unwrap().clone();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match behavior {
            Behavior::Reply(text) => Ok(ProviderOutput {
                text,
                model: "scripted-model".into(),
                tokens_used: 20,
                cost: self.cost,
                latency: Duration::from_millis(5),
            }),
            Behavior::Fail(kind) => Err(ProviderError::new(self.provider, kind, "scripted failure")),
            Behavior::Hang => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn ping(&self) -> Result<(), ProviderError> {
        if *self.ping_ok.lock().unwrap() {
            Ok(())
        } else {
            Err(ProviderError::network(self.provider, "ping refused"))
        }
    }
}

/// Build an orchestrator over scripted adapters, returning their handles in order.
pub fn scripted(
    adapters: Vec<ScriptedAdapter>,
    configure: impl FnOnce(OrchestratorBuilder) -> OrchestratorBuilder,
) -> (Orchestrator, Vec<Handle>) {
    let handles = adapters.iter().map(ScriptedAdapter::handle).collect();
    let mut builder = Orchestrator::builder();
    for a in adapters {
        builder = builder.with_adapter(a);
    }
    let orchestrator = configure(builder).build().expect("orchestrator builds");
    (orchestrator, handles)
}

/// Endpoint that accepts connections and never answers.
pub struct SilentServer {
    pub base_url: String,
    accepted: Arc<AtomicU32>,
    task: tokio::task::JoinHandle<()>,
}

impl SilentServer {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let accepted = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&accepted);
        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
            }
        });
        Self {
            base_url,
            accepted,
            task,
        }
    }

    pub fn connections(&self) -> u32 {
        self.accepted.load(Ordering::SeqCst)
    }
}

impl Drop for SilentServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Test fixture that manages a mock provider endpoint.
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Create a mock for a JSON response, expected exactly `hits` times.
    pub async fn mock_json(&mut self, path: &str, status: u16, body: &str, hits: usize) -> Mock {
        self.server
            .mock("POST", path)
            .with_status(status.into())
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }
}
