//! Cancellation primitives and the timeout race.
//!
//! An [`AbortController`] owns a one-way flag; its [`AbortSignal`]s observe
//! it. [`create_timeout_controller`] arms a timer that trips the flag, and
//! [`send_with_timeout`] races the transport call against that signal.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::errors::RawHttpError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Owner side of a cancellation flag.
#[derive(Debug, Clone)]
pub struct AbortController {
    sender: Arc<watch::Sender<bool>>,
}

impl AbortController {
    /// Creates a controller in the non-aborted state.
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Returns a signal observing this controller.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            receiver: self.sender.subscribe(),
        }
    }

    /// Trips the flag. Idempotent.
    pub fn abort(&self) {
        self.sender.send_replace(true);
    }

    /// Returns true once [`abort`](Self::abort) has been called.
    pub fn is_aborted(&self) -> bool {
        *self.sender.borrow()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation flag.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    receiver: watch::Receiver<bool>,
}

impl AbortSignal {
    /// Returns true if the controller has aborted.
    pub fn is_aborted(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Completes when the controller aborts.
    ///
    /// Never completes if the controller is dropped without aborting.
    pub async fn aborted(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            if receiver.changed().await.is_err() {
                futures::future::pending::<()>().await;
            }
        }
    }
}

/// A controller armed with a timer.
///
/// Dropping it clears the timer, so a request that finishes first never
/// leaves a dangling timer behind.
#[derive(Debug)]
pub struct TimeoutController {
    controller: AbortController,
    timer: JoinHandle<()>,
    timeout: Duration,
}

impl TimeoutController {
    /// Returns the underlying controller.
    pub fn controller(&self) -> &AbortController {
        &self.controller
    }

    /// Returns a signal that fires when the timeout elapses.
    pub fn signal(&self) -> AbortSignal {
        self.controller.signal()
    }

    /// Returns the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cancels the pending timer. The signal will not fire afterwards
    /// unless it already has.
    pub fn clear(&self) {
        self.timer.abort();
    }
}

impl Drop for TimeoutController {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Arms a controller that aborts after `timeout`.
///
/// Returns `None` when `timeout` is absent or zero: the request then runs
/// without a deadline. Must be called from within a tokio runtime.
pub fn create_timeout_controller(timeout: Option<Duration>) -> Option<TimeoutController> {
    let timeout = timeout.filter(|t| !t.is_zero())?;

    let controller = AbortController::new();
    let trigger = controller.clone();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        trigger.abort();
    });

    Some(TimeoutController {
        controller,
        timer,
        timeout,
    })
}

/// Sends `request` through `transport`, racing it against the request's
/// timeout.
///
/// Whichever side finishes first decides the outcome. If the timer wins,
/// the transport future is dropped (cancelling the call) and the result is
/// [`RawHttpError::Aborted`]. If the call wins, the timer is cleared.
pub async fn send_with_timeout(
    transport: &dyn HttpTransport,
    request: HttpRequest,
) -> Result<HttpResponse, RawHttpError> {
    let timeout = create_timeout_controller(request.timeout);
    race_transport(transport, request, timeout.as_ref()).await
}

async fn race_transport(
    transport: &dyn HttpTransport,
    request: HttpRequest,
    timeout: Option<&TimeoutController>,
) -> Result<HttpResponse, RawHttpError> {
    let Some(timeout) = timeout else {
        return transport.send(request).await.map_err(RawHttpError::from);
    };

    let signal = timeout.signal();
    let outcome = tokio::select! {
        result = transport.send(request) => result.map_err(RawHttpError::from),
        () = signal.aborted() => {
            tracing::warn!(timeout_ms = timeout.timeout().as_millis() as u64, "Request timed out");
            Err(RawHttpError::Aborted { timeout: Some(timeout.timeout()) })
        }
    };

    timeout.clear();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockTransport;

    #[tokio::test]
    async fn test_zero_and_absent_timeouts_disable_the_controller() {
        assert!(create_timeout_controller(None).is_none());
        assert!(create_timeout_controller(Some(Duration::ZERO)).is_none());
    }

    #[tokio::test]
    async fn test_controller_aborts_after_timeout() {
        let controller = create_timeout_controller(Some(Duration::from_millis(50))).unwrap();
        let signal = controller.signal();
        assert!(!signal.is_aborted());

        tokio::time::timeout(Duration::from_secs(2), signal.aborted())
            .await
            .unwrap();
        assert!(signal.is_aborted());
    }

    #[tokio::test]
    async fn test_cleared_controller_never_aborts() {
        let controller = create_timeout_controller(Some(Duration::from_millis(20))).unwrap();
        let signal = controller.signal();
        controller.clear();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!signal.is_aborted());
    }

    #[tokio::test]
    async fn test_manual_abort() {
        let controller = AbortController::new();
        let signal = controller.signal();
        controller.abort();
        controller.abort();
        assert!(controller.is_aborted());
        signal.aborted().await;
    }

    #[tokio::test]
    async fn test_send_with_timeout_times_out_slow_transport() {
        let transport = MockTransport::new().with_latency(Duration::from_millis(500));
        transport.queue_json(&serde_json::json!({"ok": true}));

        let request = HttpRequest::get("https://api.test/slow").with_timeout(Duration::from_millis(30));
        let result = send_with_timeout(&transport, request).await;

        assert!(matches!(result, Err(RawHttpError::Aborted { .. })));
    }

    #[tokio::test]
    async fn test_fast_response_clears_the_timer() {
        let transport = MockTransport::new();
        transport.queue_json(&serde_json::json!({"ok": true}));

        let timeout = create_timeout_controller(Some(Duration::from_millis(40))).unwrap();
        let signal = timeout.signal();
        let request = HttpRequest::get("https://api.test/fast");
        let response = race_transport(&transport, request, Some(&timeout))
            .await
            .unwrap();
        assert_eq!(response.status, 200);

        // Well past the deadline: a cleared timer never trips the signal.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!signal.is_aborted());
        assert!(!timeout.controller().is_aborted());
    }

    #[tokio::test]
    async fn test_send_with_timeout_returns_fast_response() {
        let transport = MockTransport::new();
        transport.queue_json(&serde_json::json!({"ok": true}));

        let request = HttpRequest::get("https://api.test/fast").with_timeout(Duration::from_secs(5));
        let response = send_with_timeout(&transport, request).await.unwrap();

        assert_eq!(response.status, 200);
    }
}
