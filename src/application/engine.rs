use crate::application::session::{SessionProtocol, SessionStart};
use crate::application::CONFLICT_RETRIES;
use crate::domain::appointment::{Appointment, AppointmentDraft, AppointmentStatus, Party, PaymentStatus};
use crate::domain::clock::has_elapsed;
use crate::domain::penalty::{assess_cancellation, assess_no_show, reporter_share, PaymentAction};
use crate::domain::policy::BookingPolicy;
use crate::domain::ports::{
    AppointmentStoreRef, ClockRef, Expected, NotificationDispatcherRef, Patch, PaymentGatewayRef,
};
use crate::error::{EngineError, GatewayError, Result};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{error, info, warn};

/// Result of a cancellation request. `amount_charged` is zero unless a late
/// cancellation fee was actually captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationOutcome {
    pub cancelled: bool,
    pub late_cancellation: bool,
    pub amount_charged: i64,
}

/// Result of a no-show report. `compensation` is the informational reporter
/// share of the captured fee, not a separate charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoShowOutcome {
    pub amount_charged: i64,
    pub compensation: i64,
}

/// Result of completing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub amount_captured: i64,
}

/// The appointment lifecycle engine.
///
/// Orchestrates every transition of the state machine: it loads the record,
/// validates state and timing, computes any financial penalty, talks to the
/// payment gateway, persists through conditional writes and fires
/// best-effort notifications. All collaborators are injected, so the engine
/// is deterministic under test with fake adapters and a fake clock.
pub struct LifecycleEngine {
    store: AppointmentStoreRef,
    gateway: PaymentGatewayRef,
    notifier: NotificationDispatcherRef,
    clock: ClockRef,
    policy: BookingPolicy,
    session: SessionProtocol,
}

impl LifecycleEngine {
    pub fn new(
        store: AppointmentStoreRef,
        gateway: PaymentGatewayRef,
        notifier: NotificationDispatcherRef,
        clock: ClockRef,
    ) -> Self {
        Self::with_policy(store, gateway, notifier, clock, BookingPolicy::default())
    }

    pub fn with_policy(
        store: AppointmentStoreRef,
        gateway: PaymentGatewayRef,
        notifier: NotificationDispatcherRef,
        clock: ClockRef,
        policy: BookingPolicy,
    ) -> Self {
        let session = SessionProtocol::new(store.clone(), clock.clone(), policy);
        Self {
            store,
            gateway,
            notifier,
            clock,
            policy,
            session,
        }
    }

    /// Creates a `Pending` appointment for a requested slot, authorizing the
    /// full amount with the gateway first. The authorization id is stored on
    /// the record.
    pub async fn request_appointment(&self, draft: AppointmentDraft) -> Result<Appointment> {
        if draft.amount <= 0 {
            return Err(EngineError::Validation(
                "authorized amount must be positive".to_string(),
            ));
        }
        if draft.start_time >= draft.end_time {
            return Err(EngineError::Validation(
                "appointment must end after it starts".to_string(),
            ));
        }
        if self.store.get(draft.id).await?.is_some() {
            return Err(EngineError::Validation(format!(
                "appointment {} already exists",
                draft.id
            )));
        }

        let authorization_id = self.authorize(draft.amount, draft.family).await?;
        let appointment = Appointment::from_draft(draft, authorization_id);
        self.store.insert(appointment.clone()).await?;
        info!(
            appointment = appointment.id,
            family = appointment.family,
            educator = appointment.educator,
            amount = appointment.authorized_amount,
            "appointment requested"
        );
        self.notify(
            "appointment_requested",
            appointment.educator,
            json!({ "appointment": appointment.id, "date": appointment.date }),
        );
        Ok(appointment)
    }

    /// Educator accepts a pending request: `Pending -> Accepted`.
    pub async fn accept_appointment(&self, id: u32) -> Result<()> {
        for _ in 0..=CONFLICT_RETRIES {
            let appointment = self.load(id).await?;
            match appointment.status {
                AppointmentStatus::Pending => {}
                AppointmentStatus::Accepted => return Err(EngineError::AlreadyProcessed(id)),
                from => {
                    return Err(EngineError::InvalidStateTransition {
                        from,
                        operation: "accept",
                    });
                }
            }

            let expected = Expected::status(AppointmentStatus::Pending);
            let patch = Patch {
                status: Some(AppointmentStatus::Accepted),
                ..Patch::default()
            };
            if self.store.update_if(id, &expected, &patch).await? == 1 {
                info!(appointment = id, "appointment accepted");
                self.notify(
                    "appointment_accepted",
                    appointment.family,
                    json!({ "appointment": id, "date": appointment.date }),
                );
                return Ok(());
            }
        }
        Err(EngineError::ConcurrencyConflict(id))
    }

    /// Cancels a `Pending` or `Accepted` appointment.
    ///
    /// The status transition always succeeds first; the penalty capture (or
    /// educator-side void) is best-effort afterwards. A gateway failure is
    /// logged for reconciliation and leaves `payment_status` untouched.
    pub async fn cancel_appointment(
        &self,
        id: u32,
        cancelled_by: Party,
    ) -> Result<CancellationOutcome> {
        for _ in 0..=CONFLICT_RETRIES {
            let appointment = self.load(id).await?;
            match appointment.status {
                AppointmentStatus::Pending | AppointmentStatus::Accepted => {}
                AppointmentStatus::Cancelled => return Err(EngineError::AlreadyProcessed(id)),
                from => {
                    return Err(EngineError::InvalidStateTransition {
                        from,
                        operation: "cancel",
                    });
                }
            }

            let now = self.clock.now();
            let assessment = assess_cancellation(
                &self.policy,
                appointment.status,
                appointment.starts_at(),
                now,
                cancelled_by,
                appointment.payment_status,
                appointment.authorized_amount,
            );

            let expected = Expected::status(appointment.status);
            let patch = Patch {
                status: Some(AppointmentStatus::Cancelled),
                cancelled_at: Some(now),
                cancelled_by: Some(cancelled_by),
                ..Patch::default()
            };
            if self.store.update_if(id, &expected, &patch).await? == 0 {
                continue;
            }

            info!(
                appointment = id,
                by = %cancelled_by,
                late = assessment.late_cancellation,
                "appointment cancelled"
            );
            let amount_charged = self
                .settle_payment(
                    &appointment,
                    AppointmentStatus::Cancelled,
                    assessment.action,
                    true,
                )
                .await;
            let recipient = match cancelled_by {
                Party::Family => appointment.educator,
                Party::Educator => appointment.family,
            };
            self.notify(
                "appointment_cancelled",
                recipient,
                json!({
                    "appointment": id,
                    "cancelled_by": cancelled_by,
                    "late_cancellation": assessment.late_cancellation,
                    "amount_charged": amount_charged,
                }),
            );
            return Ok(CancellationOutcome {
                cancelled: true,
                late_cancellation: assessment.late_cancellation,
                amount_charged,
            });
        }
        Err(EngineError::ConcurrencyConflict(id))
    }

    /// Reports a no-show on an `Accepted` appointment.
    ///
    /// A family may report an absent educator once the scheduled end has
    /// passed; an educator may report an absent family once the grace period
    /// after the scheduled start has elapsed. The winner applies the same
    /// capture rule as a late cancellation.
    pub async fn report_no_show(&self, id: u32, reported_by: Party) -> Result<NoShowOutcome> {
        for _ in 0..=CONFLICT_RETRIES {
            let appointment = self.load(id).await?;
            match appointment.status {
                AppointmentStatus::Accepted => {}
                AppointmentStatus::NoShow => return Err(EngineError::AlreadyProcessed(id)),
                from => {
                    return Err(EngineError::InvalidStateTransition {
                        from,
                        operation: "report_no_show",
                    });
                }
            }

            let now = self.clock.now();
            let too_early = match reported_by {
                Party::Family => {
                    let reportable_at = appointment.ends_at();
                    if !has_elapsed(now, reportable_at) {
                        Some(reportable_at)
                    } else {
                        None
                    }
                }
                Party::Educator => {
                    let reportable_at =
                        appointment.starts_at() + self.policy.family_no_show_grace();
                    if now < reportable_at {
                        Some(reportable_at)
                    } else {
                        None
                    }
                }
            };
            if let Some(reportable_at) = too_early {
                return Err(EngineError::NoShowTooEarly { reportable_at });
            }

            let action = assess_no_show(
                &self.policy,
                appointment.payment_status,
                appointment.authorized_amount,
            );
            let expected = Expected::status(AppointmentStatus::Accepted);
            let patch = Patch {
                status: Some(AppointmentStatus::NoShow),
                no_show_reported_at: Some(now),
                ..Patch::default()
            };
            if self.store.update_if(id, &expected, &patch).await? == 0 {
                continue;
            }

            info!(appointment = id, by = %reported_by, "no-show reported");
            let amount_charged = self
                .settle_payment(&appointment, AppointmentStatus::NoShow, action, true)
                .await;
            let compensation = if amount_charged > 0 {
                reporter_share(&self.policy, amount_charged)
            } else {
                0
            };
            let recipient = match reported_by {
                Party::Family => appointment.educator,
                Party::Educator => appointment.family,
            };
            self.notify(
                "no_show_reported",
                recipient,
                json!({
                    "appointment": id,
                    "reported_by": reported_by,
                    "amount_charged": amount_charged,
                }),
            );
            return Ok(NoShowOutcome {
                amount_charged,
                compensation,
            });
        }
        Err(EngineError::ConcurrencyConflict(id))
    }

    /// Validates the session PIN and starts the session. See
    /// [`SessionProtocol::start_session`].
    pub async fn start_session(&self, id: u32, submitted_pin: &str) -> Result<SessionStart> {
        self.session.start_session(id, submitted_pin).await
    }

    /// Completes an in-progress session: `InProgress -> Completed`, then
    /// captures the full authorized amount (best-effort).
    pub async fn complete_session(&self, id: u32) -> Result<CompletionOutcome> {
        for _ in 0..=CONFLICT_RETRIES {
            let appointment = self.load(id).await?;
            match appointment.status {
                AppointmentStatus::InProgress => {}
                AppointmentStatus::Completed => return Err(EngineError::AlreadyProcessed(id)),
                from => {
                    return Err(EngineError::InvalidStateTransition {
                        from,
                        operation: "complete",
                    });
                }
            }

            let expected = Expected::status(AppointmentStatus::InProgress);
            let patch = Patch {
                status: Some(AppointmentStatus::Completed),
                ..Patch::default()
            };
            if self.store.update_if(id, &expected, &patch).await? == 0 {
                continue;
            }

            info!(appointment = id, "session completed");
            let action = if appointment.payment_status == PaymentStatus::Authorized {
                PaymentAction::Capture {
                    amount: appointment.authorized_amount,
                }
            } else {
                PaymentAction::None
            };
            let amount_captured = self
                .settle_payment(&appointment, AppointmentStatus::Completed, action, false)
                .await;
            self.notify(
                "session_completed",
                appointment.family,
                json!({ "appointment": id, "amount_captured": amount_captured }),
            );
            return Ok(CompletionOutcome { amount_captured });
        }
        Err(EngineError::ConcurrencyConflict(id))
    }

    async fn load(&self, id: u32) -> Result<Appointment> {
        self.store.get(id).await?.ok_or(EngineError::NotFound(id))
    }

    /// Applies a payment action for an appointment whose status has just
    /// been flipped to `status_now`.
    ///
    /// Returns the amount actually captured. Gateway failures are logged
    /// with full context and swallowed: the status transition stands and the
    /// authorization is reconciled manually.
    async fn settle_payment(
        &self,
        appointment: &Appointment,
        status_now: AppointmentStatus,
        action: PaymentAction,
        record_fee: bool,
    ) -> i64 {
        let Some(authorization_id) = appointment.authorization_id.as_deref() else {
            if action != PaymentAction::None {
                warn!(
                    appointment = appointment.id,
                    "payment action skipped, no authorization on record"
                );
            }
            return 0;
        };

        match action {
            PaymentAction::None => 0,
            PaymentAction::Capture { amount } => {
                match self.capture(authorization_id, amount).await {
                    Ok(()) => {
                        let target = if amount >= appointment.authorized_amount {
                            PaymentStatus::Captured
                        } else {
                            PaymentStatus::PartiallyCaptured
                        };
                        let expected = Expected::status(status_now)
                            .with_payment_status(PaymentStatus::Authorized);
                        let patch = Patch {
                            payment_status: Some(target),
                            cancellation_fee: record_fee.then_some(amount),
                            ..Patch::default()
                        };
                        self.record_settlement(appointment.id, &expected, &patch)
                            .await;
                        info!(
                            appointment = appointment.id,
                            amount, authorization_id, "captured against authorization"
                        );
                        amount
                    }
                    Err(gateway_error) => {
                        error!(
                            appointment = appointment.id,
                            amount,
                            authorization_id,
                            error = %gateway_error,
                            "capture failed, authorization left for manual reconciliation"
                        );
                        0
                    }
                }
            }
            PaymentAction::Void => {
                match self.void(authorization_id).await {
                    Ok(()) => {
                        let expected = Expected::status(status_now)
                            .with_payment_status(PaymentStatus::Authorized);
                        let patch = Patch {
                            payment_status: Some(PaymentStatus::Cancelled),
                            ..Patch::default()
                        };
                        self.record_settlement(appointment.id, &expected, &patch)
                            .await;
                        info!(
                            appointment = appointment.id,
                            authorization_id, "authorization released"
                        );
                    }
                    Err(gateway_error) => {
                        error!(
                            appointment = appointment.id,
                            authorization_id,
                            error = %gateway_error,
                            "void failed, authorization left for manual reconciliation"
                        );
                    }
                }
                0
            }
        }
    }

    async fn record_settlement(&self, id: u32, expected: &Expected, patch: &Patch) {
        match self.store.update_if(id, expected, patch).await {
            Ok(1) => {}
            Ok(_) => warn!(
                appointment = id,
                "payment state moved underneath a settlement, needs manual reconciliation"
            ),
            Err(store_error) => error!(
                appointment = id,
                error = %store_error,
                "failed to record settlement, needs manual reconciliation"
            ),
        }
    }

    async fn authorize(&self, amount: i64, family: u32) -> Result<String, GatewayError> {
        match tokio::time::timeout(self.gateway_timeout(), self.gateway.authorize(amount, family))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }

    async fn capture(&self, authorization_id: &str, amount: i64) -> Result<(), GatewayError> {
        match tokio::time::timeout(
            self.gateway_timeout(),
            self.gateway.capture(authorization_id, amount),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }

    async fn void(&self, authorization_id: &str) -> Result<(), GatewayError> {
        match tokio::time::timeout(self.gateway_timeout(), self.gateway.void(authorization_id))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }

    fn gateway_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.policy.gateway_timeout_secs)
    }

    /// Fire-and-forget notification dispatch; delivery failures are logged
    /// and never reach the caller.
    fn notify(&self, template: &'static str, recipient: u32, context: serde_json::Value) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(notify_error) = notifier.send(template, recipient, context).await {
                warn!(template, recipient, error = %notify_error, "notification dispatch failed");
            }
        });
    }
}
