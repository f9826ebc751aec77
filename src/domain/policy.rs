use chrono::Duration;

/// Named business rules for the appointment lifecycle.
///
/// The source flows disagreed on the PIN lock duration (10 vs 30 minutes);
/// a single canonical value lives here.
#[derive(Debug, Clone, Copy)]
pub struct BookingPolicy {
    /// A family cancellation strictly closer to the start than this window
    /// is a late cancellation.
    pub late_cancellation_window_hours: i64,
    /// Share of the authorized amount captured on late cancellation or
    /// no-show, in percent.
    pub late_fee_percent: i64,
    /// Share of the captured fee shown to the no-show reporter as
    /// compensation, in percent (complement of the platform commission).
    pub reporter_share_percent: i64,
    pub pin_max_attempts: u32,
    pub pin_lock_minutes: i64,
    /// How long past the scheduled start an educator must wait before
    /// reporting an absent family.
    pub family_no_show_grace_minutes: i64,
    pub gateway_timeout_secs: u64,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            late_cancellation_window_hours: 48,
            late_fee_percent: 50,
            reporter_share_percent: 88,
            pin_max_attempts: 3,
            pin_lock_minutes: 10,
            family_no_show_grace_minutes: 60,
            gateway_timeout_secs: 10,
        }
    }
}

impl BookingPolicy {
    pub fn late_cancellation_window(&self) -> Duration {
        Duration::hours(self.late_cancellation_window_hours)
    }

    pub fn pin_lock_duration(&self) -> Duration {
        Duration::minutes(self.pin_lock_minutes)
    }

    pub fn family_no_show_grace(&self) -> Duration {
        Duration::minutes(self.family_no_show_grace_minutes)
    }
}
