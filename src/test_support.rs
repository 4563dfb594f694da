//! Deterministic collaborators for unit tests

use crate::client::{ResourceClient, ResourceResponse};
use crate::resolver::EndpointHealthChecker;
use crate::signer::TransactionSigner;
use crate::types::{Endpoint, SignRequest, SignedPayload};
use crate::{Result, X402Error};
use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Health checker answering from a fixed table
#[derive(Debug, Clone, Default)]
pub struct FakeHealthChecker {
    healthy: HashMap<String, bool>,
    delays: HashMap<String, Duration>,
    log: Arc<Mutex<Vec<String>>>,
}

impl FakeHealthChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn healthy(mut self, id: &str) -> Self {
        self.healthy.insert(id.to_string(), true);
        self
    }

    pub fn delayed(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    /// Probe log entries of the form `start:<id>` / `end:<id>`
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn probed(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|entry| entry.strip_prefix("start:").map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl EndpointHealthChecker for FakeHealthChecker {
    async fn check(&self, endpoint: &Endpoint, timeout: Duration) -> bool {
        self.log.lock().unwrap().push(format!("start:{}", endpoint.id));
        let delay = self.delays.get(&endpoint.id).copied().unwrap_or_default();
        let healthy = if delay > timeout {
            tokio::time::sleep(timeout).await;
            false
        } else {
            tokio::time::sleep(delay).await;
            self.healthy.get(&endpoint.id).copied().unwrap_or(false)
        };
        self.log.lock().unwrap().push(format!("end:{}", endpoint.id));
        healthy
    }
}

/// A request observed by [`ScriptedClient`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
}

/// Resource client replaying scripted responses in order
#[derive(Debug, Clone, Default)]
pub struct ScriptedClient {
    responses: Arc<Mutex<VecDeque<Result<ResourceResponse>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    delay: Arc<Mutex<Duration>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(ResourceResponse::new(
            StatusCode::from_u16(status).unwrap(),
            body,
        )));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(X402Error::transport(message)));
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.set_delay(delay);
        self
    }

    /// Change the delay for subsequent calls, shared by all clones
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceClient for ScriptedClient {
    async fn call(&self, method: Method, path: &str, headers: HeaderMap) -> Result<ResourceResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path: path.to_string(),
            headers,
        });
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(X402Error::transport("no scripted response left")))
    }
}

/// Signer returning a fixed payload, optionally failing first
#[derive(Debug, Clone)]
pub struct FakeSigner {
    payload: SignedPayload,
    failures_left: Arc<AtomicUsize>,
    available: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<SignRequest>>>,
}

impl FakeSigner {
    pub fn new(payload: &[u8]) -> Self {
        Self {
            payload: SignedPayload::from_bytes(payload.to_vec()),
            failures_left: Arc::new(AtomicUsize::new(0)),
            available: Arc::new(AtomicBool::new(true)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(self, times: usize) -> Self {
        self.failures_left.store(times, Ordering::SeqCst);
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<SignRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionSigner for FakeSigner {
    async fn sign(&self, request: &SignRequest) -> Result<SignedPayload> {
        self.requests.lock().unwrap().push(request.clone());
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(X402Error::signing_failed("keystore locked"));
        }
        Ok(self.payload.clone())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}
