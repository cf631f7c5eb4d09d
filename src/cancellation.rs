use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

const DEFAULT_MESSAGE: &str = "Request Canceled";

/// One-shot external signal that can pre-empt an in-flight request
///
/// Clones share the same underlying signal, so the caller keeps one handle and
/// passes another to the request. The signal latches: a listener that
/// subscribes after [`Cancellation::cancel`] was called still observes it.
///
/// ```rust
/// use fetchkit::Cancellation;
///
/// let cancellation = Cancellation::new();
/// let handle = cancellation.clone();
/// cancellation.cancel();
/// assert!(handle.is_cancelled());
/// ```
#[derive(Clone)]
pub struct Cancellation {
    token: CancellationToken,
    message: Arc<str>,
}

impl Cancellation {
    /// Create a pending cancellation with the default message
    pub fn new() -> Self {
        Self::with_message(DEFAULT_MESSAGE)
    }

    /// Create a pending cancellation carrying a custom message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            token: CancellationToken::new(),
            message: Arc::from(message.into()),
        }
    }

    /// Fire the signal. Calling it more than once has no further effect.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!(reason = %self.message, "cancellation fired");
        }
        self.token.cancel();
    }

    /// Check whether the signal has fired
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Message reported when the cancellation wins a race
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Wait until the signal fires
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Check whether two handles share the same signal
    pub fn same_signal(&self, other: &Cancellation) -> bool {
        Arc::ptr_eq(&self.message, &other.message)
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancellation")
            .field("message", &self.message)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
