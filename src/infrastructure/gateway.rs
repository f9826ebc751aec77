use crate::domain::ports::{NotificationDispatcher, PaymentGateway};
use crate::error::{GatewayError, NotifyError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Gateway adapter for the replay CLI: every operation succeeds and is
/// traced. Authorization ids are generated locally.
#[derive(Default)]
pub struct LoggingGateway {
    next_authorization: AtomicU64,
}

impl LoggingGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentGateway for LoggingGateway {
    async fn authorize(&self, amount: i64, family: u32) -> Result<String, GatewayError> {
        let sequence = self.next_authorization.fetch_add(1, Ordering::SeqCst) + 1;
        let authorization_id = format!("auth-{family}-{sequence}");
        info!(family, amount, authorization_id, "authorized");
        Ok(authorization_id)
    }

    async fn capture(&self, authorization_id: &str, amount: i64) -> Result<(), GatewayError> {
        info!(authorization_id, amount, "captured");
        Ok(())
    }

    async fn void(&self, authorization_id: &str) -> Result<(), GatewayError> {
        info!(authorization_id, "voided");
        Ok(())
    }
}

/// Notification adapter for the replay CLI: deliveries are traced, never
/// sent anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

#[async_trait]
impl NotificationDispatcher for LoggingNotifier {
    async fn send(
        &self,
        template: &str,
        recipient: u32,
        context: serde_json::Value,
    ) -> Result<(), NotifyError> {
        info!(template, recipient, %context, "notification dispatched");
        Ok(())
    }
}
