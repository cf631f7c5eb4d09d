//! Shared test transports

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fetchkit::{async_trait, ComposedRequest, Response, Result, StatusCode, Transport};
use serde_json::Value;

/// Records every request it is handed and answers with a canned response
/// after an optional delay
pub struct Recorder {
    delay: Duration,
    status: StatusCode,
    body: Value,
    seen: Mutex<Vec<ComposedRequest>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Self::responding(StatusCode::OK, serde_json::json!({"ok": true}))
    }

    pub fn responding(status: StatusCode, body: Value) -> Arc<Self> {
        Arc::new(Self {
            delay: Duration::ZERO,
            status,
            body,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn delayed(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            status: StatusCode::OK,
            body: serde_json::json!({"ok": true}),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ComposedRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last(&self) -> ComposedRequest {
        self.requests().pop().expect("no request was sent")
    }
}

#[async_trait]
impl Transport for Recorder {
    async fn send(&self, request: ComposedRequest) -> Result<Response> {
        let url = request.url.clone();
        self.seen.lock().unwrap().push(request);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        Ok(Response::builder(self.status)
            .url(url)
            .json(&self.body)?
            .build())
    }

    fn name(&self) -> &str {
        "recorder"
    }
}
