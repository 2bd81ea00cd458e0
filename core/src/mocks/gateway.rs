//! Mock payment gateway for development and testing.

use crate::error::{RaffleError, Result};
use crate::providers::{GatewaySession, PaymentGateway, SessionRequest};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock payment gateway.
///
/// Opens fake checkout sessions and records every request. Can be told to
/// fail or to stall, to exercise the caller's error and timeout paths.
#[derive(Clone, Debug, Default)]
pub struct MockPaymentGateway {
    should_fail: Arc<AtomicBool>,
    delay: Arc<Mutex<Option<Duration>>>,
    requests: Arc<Mutex<Vec<SessionRequest>>>,
}

impl MockPaymentGateway {
    /// Creates a mock gateway that always succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sessions fail
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Delay every response by `delay`
    pub fn set_delay(&self, delay: Duration) {
        if let Ok(mut guard) = self.delay.lock() {
            *guard = Some(delay);
        }
    }

    /// Requests received so far
    #[must_use]
    pub fn requests(&self) -> Vec<SessionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn open_session(&self, request: &SessionRequest) -> Result<GatewaySession> {
        let delay = self.delay.lock().map(|d| *d).unwrap_or_default();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.requests
            .lock()
            .map_err(|_| RaffleError::GatewayFailure("mock gateway poisoned".to_string()))?
            .push(request.clone());

        if self.should_fail.load(Ordering::SeqCst) {
            return Err(RaffleError::GatewayFailure("mock gateway declined".to_string()));
        }

        let session_id = format!("cs_mock_{}", uuid::Uuid::new_v4().simple());
        tracing::info!(
            payment_id = %request.reference,
            quantity = request.quantity,
            session_id = %session_id,
            "Mock checkout session opened"
        );

        Ok(GatewaySession {
            session_url: format!("https://checkout.mock.local/pay/{session_id}"),
            session_id,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Money, PaymentId};

    fn request() -> SessionRequest {
        SessionRequest {
            reference: PaymentId::new(),
            unit_amount: Money::from_minor(1_000),
            quantity: 2,
            currency: "COP".to_string(),
            success_url: "https://ok".to_string(),
            cancel_url: "https://ko".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mock_session_success() {
        let gateway = MockPaymentGateway::new();
        let session = gateway.open_session(&request()).await.unwrap();

        assert!(session.session_id.starts_with("cs_mock_"));
        assert!(session.session_url.ends_with(&session.session_id));
        assert_eq!(gateway.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_session_failure() {
        let gateway = MockPaymentGateway::new();
        gateway.set_should_fail(true);

        let err = gateway.open_session(&request()).await.unwrap_err();
        assert!(matches!(err, RaffleError::GatewayFailure(_)));
    }
}
