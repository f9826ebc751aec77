use chrono::NaiveDateTime;

/// Time source injected into the engine so that window-boundary behavior is
/// deterministic under test.
///
/// All instants are wall-clock values in the service's operating timezone.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Production clock reading the host's local wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Seconds from `now` until `deadline`; negative once the deadline passed.
pub fn remaining_seconds(now: NaiveDateTime, deadline: NaiveDateTime) -> i64 {
    (deadline - now).num_seconds()
}

/// True once `now` is strictly past `deadline`.
pub fn has_elapsed(now: NaiveDateTime, deadline: NaiveDateTime) -> bool {
    now > deadline
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_remaining_seconds() {
        assert_eq!(remaining_seconds(at(14, 0), at(14, 10)), 600);
        assert_eq!(remaining_seconds(at(14, 10), at(14, 0)), -600);
        assert_eq!(remaining_seconds(at(14, 0), at(14, 0)), 0);
    }

    #[test]
    fn test_has_elapsed_is_strict() {
        assert!(!has_elapsed(at(14, 0), at(14, 0)));
        assert!(has_elapsed(at(14, 1), at(14, 0)));
        assert!(!has_elapsed(at(13, 59), at(14, 0)));
    }
}
