use crate::application::CONFLICT_RETRIES;
use crate::domain::appointment::AppointmentStatus;
use crate::domain::clock::{has_elapsed, remaining_seconds};
use crate::domain::policy::BookingPolicy;
use crate::domain::ports::{AppointmentStoreRef, ClockRef, Expected, Patch};
use crate::error::{EngineError, Result};
use chrono::NaiveDateTime;
use tracing::{info, warn};

/// Successful session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStart {
    pub started_at: NaiveDateTime,
}

/// PIN-based session-start protocol.
///
/// Validating the PIN is the only way an appointment enters `InProgress`.
/// The attempt counter and lock are maintained through conditional writes so
/// concurrent submissions cannot double-count or double-start.
pub struct SessionProtocol {
    store: AppointmentStoreRef,
    clock: ClockRef,
    policy: BookingPolicy,
}

impl SessionProtocol {
    pub fn new(store: AppointmentStoreRef, clock: ClockRef, policy: BookingPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// Validates `submitted_pin` and starts the session.
    ///
    /// Precondition failures are distinct, structured errors. The
    /// already-validated check runs before the status check so a repeat
    /// submission after a successful start reports `AlreadyValidated`
    /// rather than a generic status error.
    pub async fn start_session(&self, id: u32, submitted_pin: &str) -> Result<SessionStart> {
        for _ in 0..=CONFLICT_RETRIES {
            let appointment = self
                .store
                .get(id)
                .await?
                .ok_or(EngineError::NotFound(id))?;
            let now = self.clock.now();

            if appointment.pin_validated {
                return Err(EngineError::AlreadyValidated);
            }
            if appointment.status != AppointmentStatus::Accepted {
                return Err(EngineError::InvalidStateTransition {
                    from: appointment.status,
                    operation: "start_session",
                });
            }
            let Some(pin_code) = appointment.pin_code.clone() else {
                return Err(EngineError::PinNotIssued);
            };
            if let Some(expires_at) = appointment.pin_expires_at
                && has_elapsed(now, expires_at)
            {
                return Err(EngineError::PinExpired);
            }
            if let Some(locked_until) = appointment.pin_locked_until
                && now < locked_until
            {
                return Err(EngineError::TooManyAttempts {
                    locked_for_secs: remaining_seconds(now, locked_until),
                });
            }

            let expected = Expected::status(AppointmentStatus::Accepted)
                .with_pin_attempts(appointment.pin_attempts)
                .with_pin_validated(false);

            if submitted_pin == pin_code {
                // Flag, timestamps, counter reset and the status advance land
                // in one conditional write; partial application would be a
                // correctness bug.
                let patch = Patch {
                    status: Some(AppointmentStatus::InProgress),
                    pin_validated: Some(true),
                    pin_entered_at: Some(now),
                    pin_attempts: Some(0),
                    pin_locked_until: Some(None),
                    started_at: Some(now),
                    ..Patch::default()
                };
                if self.store.update_if(id, &expected, &patch).await? == 1 {
                    info!(appointment = id, "session started");
                    return Ok(SessionStart { started_at: now });
                }
                continue;
            }

            let attempts = appointment.pin_attempts + 1;
            let locked = attempts >= self.policy.pin_max_attempts;
            let patch = Patch {
                pin_attempts: Some(attempts),
                pin_locked_until: locked.then(|| Some(now + self.policy.pin_lock_duration())),
                ..Patch::default()
            };
            if self.store.update_if(id, &expected, &patch).await? == 1 {
                return Err(if locked {
                    warn!(appointment = id, attempts, "PIN entry locked");
                    EngineError::TooManyAttempts {
                        locked_for_secs: self.policy.pin_lock_duration().num_seconds(),
                    }
                } else {
                    EngineError::InvalidPin {
                        attempts_left: self.policy.pin_max_attempts - attempts,
                    }
                });
            }
        }
        Err(EngineError::ConcurrencyConflict(id))
    }
}
