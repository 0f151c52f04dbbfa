use async_trait::async_trait;
use gambit::network::{ApiRequest, ClientError, HttpTransport, Result};
use gambit::storage::MemoryCredentialStore;
use gambit::{ApiError, RestClient, Session};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Handler = Box<dyn Fn(&ApiRequest) -> Result<Value> + Send + Sync>;
type Latency = Box<dyn Fn(&ApiRequest) -> Duration + Send + Sync>;

/// An `HttpTransport` that answers from a closure and records every request
pub struct FakeTransport {
    handler: Handler,
    latency: Latency,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new(handler: impl Fn(&ApiRequest) -> Result<Value> + Send + Sync + 'static) -> Arc<Self> {
        Self::with_latency(handler, |_| Duration::ZERO)
    }

    /// Like [`FakeTransport::new`], but each answer is held back by `latency`.
    /// Requests are recorded when sent, before the wait.
    pub fn with_latency(
        handler: impl Fn(&ApiRequest) -> Result<Value> + Send + Sync + 'static,
        latency: impl Fn(&ApiRequest) -> Duration + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            latency: Box::new(latency),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The `page` parameter of every request, in order
    pub fn pages_requested(&self) -> Vec<u64> {
        self.requests()
            .iter()
            .filter_map(|r| r.params.get("page").and_then(Value::as_u64))
            .collect()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request.clone());
        let latency = (self.latency)(&request);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        (self.handler)(&request)
    }
}

pub fn no_more_pages() -> ClientError {
    ApiError::new(ApiError::NO_MORE_PAGES, "No more pages").into()
}

/// A session over an in-memory store, logged in as session 42 when asked
pub fn session(logged_in: bool) -> Session {
    let session = Session::new(Arc::new(MemoryCredentialStore::new()));
    if logged_in {
        session.store(42, vec![1, 2, 3]).unwrap();
    }
    session
}

pub fn client(transport: &Arc<FakeTransport>, logged_in: bool) -> RestClient {
    RestClient::new(transport.clone(), session(logged_in))
}
