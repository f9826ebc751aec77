//! Pure penalty computation for cancellations and no-shows.
//!
//! Everything here is side-effect free; the gateway and store mutations are
//! the application layer's job.

use crate::domain::appointment::{AppointmentStatus, Party, PaymentStatus};
use crate::domain::policy::BookingPolicy;
use chrono::NaiveDateTime;

/// What the payment gateway must be asked to do as part of a transition.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PaymentAction {
    /// Leave the authorization untouched.
    None,
    /// Capture part of the authorization, in minor currency units.
    Capture { amount: i64 },
    /// Release the authorization in full.
    Void,
}

/// Outcome of assessing a cancellation request against the penalty rules.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct PenaltyAssessment {
    pub late_cancellation: bool,
    pub action: PaymentAction,
}

/// Fee captured on a late cancellation or no-show, rounded to the nearest
/// minor currency unit (half away from zero).
pub fn late_fee(policy: &BookingPolicy, authorized_amount: i64) -> i64 {
    (authorized_amount * policy.late_fee_percent + 50) / 100
}

/// Informational compensation figure shown to a no-show reporter: the fee
/// minus the platform commission. Not a separate monetary operation.
pub fn reporter_share(policy: &BookingPolicy, fee: i64) -> i64 {
    (fee * policy.reporter_share_percent + 50) / 100
}

/// Assesses a cancellation.
///
/// A family cancelling an `Accepted` appointment strictly inside the late
/// window pays the late fee. Cancelling from `Pending` never carries a
/// penalty. An educator cancellation releases the authorization in full
/// regardless of timing.
pub fn assess_cancellation(
    policy: &BookingPolicy,
    from: AppointmentStatus,
    starts_at: NaiveDateTime,
    now: NaiveDateTime,
    cancelled_by: Party,
    payment_status: PaymentStatus,
    authorized_amount: i64,
) -> PenaltyAssessment {
    let late_cancellation = starts_at - now < policy.late_cancellation_window();

    let action = match cancelled_by {
        Party::Educator if payment_status == PaymentStatus::Authorized => PaymentAction::Void,
        Party::Family
            if from == AppointmentStatus::Accepted
                && late_cancellation
                && payment_status == PaymentStatus::Authorized =>
        {
            PaymentAction::Capture {
                amount: late_fee(policy, authorized_amount),
            }
        }
        _ => PaymentAction::None,
    };

    PenaltyAssessment {
        late_cancellation,
        action,
    }
}

/// Assesses a no-show report: same capture rule as a late cancellation,
/// applied unconditionally to a still-authorized payment.
pub fn assess_no_show(
    policy: &BookingPolicy,
    payment_status: PaymentStatus,
    authorized_amount: i64,
) -> PaymentAction {
    if payment_status == PaymentStatus::Authorized {
        PaymentAction::Capture {
            amount: late_fee(policy, authorized_amount),
        }
    } else {
        PaymentAction::None
    }
}
