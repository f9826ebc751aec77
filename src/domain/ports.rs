use crate::domain::appointment::{Appointment, AppointmentStatus, Party, PaymentStatus};
use crate::domain::clock::Clock;
use crate::error::{GatewayError, NotifyError, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::Arc;

pub type AppointmentStoreRef = Arc<dyn AppointmentStore>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type NotificationDispatcherRef = Arc<dyn NotificationDispatcher>;
pub type ClockRef = Arc<dyn Clock>;

/// Pre-transition fields a conditional update is predicated on.
///
/// Every mutating operation names the status it read, so two concurrent
/// requests can never both apply the same transition. PIN paths additionally
/// pin the attempt counter and the validated flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expected {
    pub status: AppointmentStatus,
    pub pin_attempts: Option<u32>,
    pub pin_validated: Option<bool>,
    pub payment_status: Option<PaymentStatus>,
}

impl Expected {
    pub fn status(status: AppointmentStatus) -> Self {
        Self {
            status,
            pin_attempts: None,
            pin_validated: None,
            payment_status: None,
        }
    }

    pub fn with_pin_attempts(mut self, attempts: u32) -> Self {
        self.pin_attempts = Some(attempts);
        self
    }

    pub fn with_pin_validated(mut self, validated: bool) -> Self {
        self.pin_validated = Some(validated);
        self
    }

    pub fn with_payment_status(mut self, payment_status: PaymentStatus) -> Self {
        self.payment_status = Some(payment_status);
        self
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        if appointment.status != self.status {
            return false;
        }
        if let Some(attempts) = self.pin_attempts
            && appointment.pin_attempts != attempts
        {
            return false;
        }
        if let Some(validated) = self.pin_validated
            && appointment.pin_validated != validated
        {
            return false;
        }
        if let Some(payment_status) = self.payment_status
            && appointment.payment_status != payment_status
        {
            return false;
        }
        true
    }
}

/// Sparse field update applied when the expected state still holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub status: Option<AppointmentStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub cancellation_fee: Option<i64>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub cancelled_by: Option<Party>,
    pub no_show_reported_at: Option<NaiveDateTime>,
    pub pin_attempts: Option<u32>,
    pub pin_validated: Option<bool>,
    pub pin_entered_at: Option<NaiveDateTime>,
    /// `Some(None)` clears an active lock.
    pub pin_locked_until: Option<Option<NaiveDateTime>>,
    pub started_at: Option<NaiveDateTime>,
}

impl Patch {
    pub fn apply(&self, appointment: &mut Appointment) {
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(payment_status) = self.payment_status {
            appointment.payment_status = payment_status;
        }
        if let Some(fee) = self.cancellation_fee {
            appointment.cancellation_fee = Some(fee);
        }
        if let Some(at) = self.cancelled_at {
            appointment.cancelled_at = Some(at);
        }
        if let Some(by) = self.cancelled_by {
            appointment.cancelled_by = Some(by);
        }
        if let Some(at) = self.no_show_reported_at {
            appointment.no_show_reported_at = Some(at);
        }
        if let Some(attempts) = self.pin_attempts {
            appointment.pin_attempts = attempts;
        }
        if let Some(validated) = self.pin_validated {
            appointment.pin_validated = validated;
        }
        if let Some(at) = self.pin_entered_at {
            appointment.pin_entered_at = Some(at);
        }
        if let Some(locked_until) = self.pin_locked_until {
            appointment.pin_locked_until = locked_until;
        }
        if let Some(at) = self.started_at {
            appointment.started_at = Some(at);
        }
    }
}

/// Transactional persistence for appointment records.
///
/// `update_if` is the single concurrency primitive: it applies `patch` only
/// while `expected` still matches and reports the affected-row count. A
/// zero return means the caller lost a race and must re-read.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn get(&self, id: u32) -> Result<Option<Appointment>>;
    async fn insert(&self, appointment: Appointment) -> Result<()>;
    async fn update_if(&self, id: u32, expected: &Expected, patch: &Patch) -> Result<u64>;
    async fn all(&self) -> Result<Vec<Appointment>>;
}

/// External payment processor operating on a pre-authorized charge.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Authorizes `amount` minor units against the family's payment method
    /// and returns the gateway's authorization id.
    async fn authorize(&self, amount: i64, family: u32) -> Result<String, GatewayError>;
    /// Captures part (or all) of a prior authorization.
    async fn capture(&self, authorization_id: &str, amount: i64) -> Result<(), GatewayError>;
    /// Releases a prior authorization in full.
    async fn void(&self, authorization_id: &str) -> Result<(), GatewayError>;
}

/// Templated email sender. Best-effort: the engine fires dispatches without
/// awaiting them and never propagates delivery failures.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(
        &self,
        template: &str,
        recipient: u32,
        context: serde_json::Value,
    ) -> Result<(), NotifyError>;
}
