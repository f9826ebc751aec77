use crate::domain::appointment::AppointmentStatus;
use thiserror::Error;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors returned by the payment gateway adapter.
///
/// Gateway failures never block a status transition (cancellations must
/// always succeed); they are logged for manual reconciliation instead.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("payment gateway declined the operation: {0}")]
    Declined(String),
    #[error("payment gateway unreachable: {0}")]
    Unavailable(String),
    #[error("payment gateway call timed out")]
    Timeout,
}

/// Errors returned by the notification dispatcher.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// The engine's error taxonomy.
///
/// Business rejections are deterministic outcomes carrying enough structured
/// context (attempts remaining, lock seconds) for a client to render a
/// precise message without the engine producing human-readable text.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("appointment {0} not found")]
    NotFound(u32),
    #[error("{operation} is not valid while the appointment is {from}")]
    InvalidStateTransition {
        from: AppointmentStatus,
        operation: &'static str,
    },
    #[error("appointment {0} was already processed by an equivalent request")]
    AlreadyProcessed(u32),
    #[error("session PIN was already validated")]
    AlreadyValidated,
    #[error("no session PIN has been issued")]
    PinNotIssued,
    #[error("session PIN has expired")]
    PinExpired,
    #[error("incorrect PIN, {attempts_left} attempt(s) left")]
    InvalidPin { attempts_left: u32 },
    #[error("too many failed PIN attempts, locked for {locked_for_secs} more second(s)")]
    TooManyAttempts { locked_for_secs: i64 },
    #[error("no-show cannot be reported before {reportable_at}")]
    NoShowTooEarly {
        reportable_at: chrono::NaiveDateTime,
    },
    #[error("concurrent update conflict on appointment {0}")]
    ConcurrencyConflict(u32),
    #[error("payment operation failed: {0}")]
    PaymentFailed(#[from] GatewayError),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl EngineError {
    /// Stable machine-readable code for the calling layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidStateTransition { .. } => "invalid_state_transition",
            Self::AlreadyProcessed(_) => "already_processed",
            Self::AlreadyValidated => "already_validated",
            Self::PinNotIssued => "pin_not_issued",
            Self::PinExpired => "pin_expired",
            Self::InvalidPin { .. } => "invalid_pin",
            Self::TooManyAttempts { .. } => "too_many_attempts",
            Self::NoShowTooEarly { .. } => "no_show_too_early",
            Self::ConcurrencyConflict(_) => "concurrency_conflict",
            Self::PaymentFailed(_) => "payment_operation_failed",
            Self::Validation(_) => "validation",
            Self::Storage(_) => "storage",
            Self::Io(_) => "io",
            Self::Csv(_) => "csv",
        }
    }
}
