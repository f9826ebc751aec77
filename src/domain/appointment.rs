use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an appointment.
///
/// `confirmed` is accepted as an input alias for [`AppointmentStatus::Accepted`];
/// the engine models a single canonical pre-session state.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    #[serde(alias = "confirmed")]
    Accepted,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }

    /// Terminal statuses admit no further transitions. Records in a terminal
    /// status are retained for invoicing and dispute history, never deleted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment lifecycle of the pre-authorized charge backing an appointment.
///
/// Moves from `Authorized` to exactly one of the other states and never
/// reverts.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Authorized,
    PartiallyCaptured,
    Captured,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorized => "authorized",
            Self::PartiallyCaptured => "partially_captured",
            Self::Captured => "captured",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the booking performed an action (cancellation or a no-show
/// report).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Family,
    Educator,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Family => "family",
            Self::Educator => "educator",
        })
    }
}

/// Inputs required to create a new appointment in `Pending` status.
#[derive(Debug, Clone)]
pub struct AppointmentDraft {
    pub id: u32,
    pub family: u32,
    pub educator: u32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Full authorized amount in minor currency units.
    pub amount: i64,
    pub pin_code: Option<String>,
    pub pin_expires_at: Option<NaiveDateTime>,
}

/// The central entity: one booked session between a family and an educator.
///
/// Schedule times are wall-clock values in the service's operating timezone;
/// the engine performs no timezone conversion. All monetary amounts are
/// integer minor currency units.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Appointment {
    pub id: u32,
    pub family: u32,
    pub educator: u32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    /// Gateway authorization backing this appointment, stored directly on
    /// the record so no search-by-metadata lookup is ever needed.
    pub authorization_id: Option<String>,
    pub authorized_amount: i64,
    pub pin_code: Option<String>,
    pub pin_expires_at: Option<NaiveDateTime>,
    pub pin_validated: bool,
    pub pin_entered_at: Option<NaiveDateTime>,
    pub pin_attempts: u32,
    pub pin_locked_until: Option<NaiveDateTime>,
    pub started_at: Option<NaiveDateTime>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub cancelled_by: Option<Party>,
    pub cancellation_fee: Option<i64>,
    pub no_show_reported_at: Option<NaiveDateTime>,
}

impl Appointment {
    /// Builds the `Pending` record for a freshly requested slot.
    pub fn from_draft(draft: AppointmentDraft, authorization_id: String) -> Self {
        Self {
            id: draft.id,
            family: draft.family,
            educator: draft.educator,
            date: draft.date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            status: AppointmentStatus::Pending,
            payment_status: PaymentStatus::Authorized,
            authorization_id: Some(authorization_id),
            authorized_amount: draft.amount,
            pin_code: draft.pin_code,
            pin_expires_at: draft.pin_expires_at,
            pin_validated: false,
            pin_entered_at: None,
            pin_attempts: 0,
            pin_locked_until: None,
            started_at: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_fee: None,
            no_show_reported_at: None,
        }
    }

    /// Scheduled start as a wall-clock instant.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    /// Scheduled end as a wall-clock instant.
    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time)
    }
}
