use std::sync::Arc;
use std::time::Duration;

use futures::future;

use crate::cancellation::Cancellation;
use crate::error::{Error, Result};
use crate::request::ComposedRequest;
use crate::response::Reply;
use crate::transform::Transformers;
use crate::transport::Transport;

/// Dispatches composed requests through an injected transport
///
/// Each request races three branches: the exchange with the transport, the
/// request timeout, and the cancellation signal. The first to settle decides
/// the outcome and the others are dropped, which aborts an exchange that is
/// still in flight.
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
}

impl Executor {
    /// Create an executor over a transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Get the transport
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Run a composed request to completion
    ///
    /// Branches are polled in a fixed order: cancellation, then the exchange,
    /// then the timer. An exchange that is ready therefore wins over a timer
    /// that elapsed during the same poll.
    pub async fn execute(
        &self,
        request: ComposedRequest,
        transformers: &Transformers,
    ) -> Result<Reply> {
        let timeout = request.timeout;
        let cancellation = request.cancellation.clone();

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            transport = self.transport.name(),
            ?timeout,
            "dispatching request"
        );

        tokio::select! {
            biased;

            cancellation = cancelled(cancellation.as_ref()) => {
                tracing::debug!(reason = cancellation.message(), "request cancelled");
                Err(Error::Cancelled(cancellation))
            }
            reply = self.exchange(request, transformers) => reply,
            duration = elapsed(timeout) => {
                tracing::debug!(?duration, "request timed out");
                Err(Error::timeout(duration))
            }
        }
    }

    async fn exchange(
        &self,
        request: ComposedRequest,
        transformers: &Transformers,
    ) -> Result<Reply> {
        let simple = request.simple;
        let resolve_with = request.resolve_with;

        let response = self.transport.send(request).await?;
        tracing::debug!(status = %response.status(), "response received");

        if simple && !response.ok() {
            return Err(Error::http_status(response.status(), response.status_text()));
        }

        let reply = match resolve_with {
            Some(mode) => {
                let data = mode.decode(&response)?;
                let response = Arc::new(response);
                Reply::Data(transformers.apply_response_data(data, &response).await?)
            }
            None => Reply::Response(response),
        };

        transformers.apply_response(reply).await
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("transport", &self.transport.name())
            .finish()
    }
}

/// Resolves with the handle once it fires; never, without a handle
async fn cancelled(cancellation: Option<&Cancellation>) -> Cancellation {
    match cancellation {
        Some(cancellation) => {
            cancellation.cancelled().await;
            cancellation.clone()
        }
        None => future::pending().await,
    }
}

/// Resolves once the timeout elapses; never, without a timeout
async fn elapsed(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(duration) => {
            tokio::time::sleep(duration).await;
            duration
        }
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::Headers;
    use crate::response::{ResolveWith, Response};
    use crate::transform::Transformer;
    use async_trait::async_trait;
    use http::{Method, StatusCode};
    use serde_json::json;

    struct Delayed {
        delay: Duration,
        status: StatusCode,
    }

    #[async_trait]
    impl Transport for Delayed {
        async fn send(&self, _request: ComposedRequest) -> Result<Response> {
            tokio::time::sleep(self.delay).await;
            Ok(Response::builder(self.status)
                .json(&json!({"ok": true}))?
                .build())
        }

        fn name(&self) -> &str {
            "delayed"
        }
    }

    fn executor(delay_ms: u64, status: StatusCode) -> Executor {
        Executor::new(Arc::new(Delayed {
            delay: Duration::from_millis(delay_ms),
            status,
        }))
    }

    fn request() -> ComposedRequest {
        ComposedRequest {
            url: "http://h/".to_string(),
            method: Method::GET,
            headers: Headers::new(),
            body: None,
            timeout: None,
            cancellation: None,
            resolve_with: None,
            simple: true,
            other: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_raw_response_passthrough() {
        let reply = executor(0, StatusCode::OK)
            .execute(request(), &Transformers::new())
            .await
            .unwrap();
        assert_eq!(reply.response().unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_timeout_wins_over_slow_transport() {
        let mut request = request();
        request.timeout = Some(Duration::from_millis(1));

        let err = executor(100, StatusCode::OK)
            .execute(request, &Transformers::new())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_exchange_beats_elapsed_timer() {
        let mut request = request();
        request.timeout = Some(Duration::from_millis(10));

        let reply = executor(10, StatusCode::OK)
            .execute(request, &Transformers::new())
            .await;
        assert!(reply.is_ok());
    }

    #[tokio::test]
    async fn test_cancellation_wins() {
        let cancellation = Cancellation::new();
        let mut request = request();
        request.cancellation = Some(cancellation.clone());
        cancellation.cancel();

        let err = executor(0, StatusCode::OK)
            .execute(request, &Transformers::new())
            .await
            .unwrap_err();
        assert!(err.cancellation().unwrap().same_signal(&cancellation));
    }

    #[tokio::test]
    async fn test_status_policy() {
        let err = executor(0, StatusCode::NOT_FOUND)
            .execute(request(), &Transformers::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));

        let mut lenient = request();
        lenient.simple = false;
        let reply = executor(0, StatusCode::NOT_FOUND)
            .execute(lenient, &Transformers::new())
            .await
            .unwrap();
        assert_eq!(reply.response().unwrap().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_decode_then_transform() {
        let mut transformers = Transformers::new();
        transformers.add(Transformer::response_data(|mut data, _| async move {
            data["parsed"] = json!(true);
            Ok(data)
        }));
        transformers.add(Transformer::response(|reply| async move {
            assert!(reply.data().is_some());
            Ok(reply)
        }));

        let mut request = request();
        request.resolve_with = Some(ResolveWith::Json);
        let reply = executor(0, StatusCode::OK)
            .execute(request, &transformers)
            .await
            .unwrap();
        assert_eq!(reply.data(), Some(&json!({"ok": true, "parsed": true})));
    }

    #[tokio::test]
    async fn test_response_data_sees_response() {
        let mut transformers = Transformers::new();
        transformers.add(Transformer::response_data(|data, response| async move {
            Ok(json!({
                "status": response.status().as_u16(),
                "type": response.content_type(),
                "body": data,
            }))
        }));

        let mut request = request();
        request.simple = false;
        request.resolve_with = Some(ResolveWith::Json);
        let reply = executor(0, StatusCode::CONFLICT)
            .execute(request, &transformers)
            .await
            .unwrap();
        assert_eq!(
            reply.data(),
            Some(&json!({
                "status": 409,
                "type": "application/json",
                "body": {"ok": true},
            }))
        );
    }
}
