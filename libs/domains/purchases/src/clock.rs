//! Source of receipt times for the ingestion service.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::sync::Mutex;

/// Offset applied to receipt times unless configured otherwise.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 3;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock rendered in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

/// Whole-hour offset, or `None` when it is a day or more away from UTC.
pub fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
    hours.checked_mul(3600).and_then(FixedOffset::east_opt)
}

impl SystemClock {
    pub fn with_offset_hours(hours: i32) -> Option<Self> {
        offset_from_hours(hours).map(|offset| Self { offset })
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Clock that returns preset instants, repeating the last one when
/// exhausted. Lets tests force two requests onto the same timestamp.
#[derive(Debug)]
pub struct FixedClock {
    instants: Mutex<Vec<DateTime<FixedOffset>>>,
}

impl FixedClock {
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self::sequence(vec![at])
    }

    /// Instants are handed out in order.
    pub fn sequence(mut instants: Vec<DateTime<FixedOffset>>) -> Self {
        instants.reverse();
        Self {
            instants: Mutex::new(instants),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let mut instants = self
            .instants
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match instants.len() {
            0 => SystemClock::default().now(),
            1 => instants[0],
            _ => instants.pop().unwrap_or_else(|| SystemClock::default().now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_system_clock_uses_configured_offset() {
        let now = SystemClock::default().now();
        assert_eq!(now.offset().local_minus_utc(), 3 * 3600);

        let utc = SystemClock::with_offset_hours(0).unwrap().now();
        assert_eq!(utc.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_system_clock_rejects_out_of_range_offset() {
        assert!(SystemClock::with_offset_hours(30).is_none());
        assert!(SystemClock::with_offset_hours(-12).is_some());
    }

    #[test]
    fn test_fixed_clock_sequence_then_repeat() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let a = tz.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let b = tz.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).unwrap();
        let clock = FixedClock::sequence(vec![a, b]);

        assert_eq!(clock.now(), a);
        assert_eq!(clock.now(), b);
        assert_eq!(clock.now(), b);
    }
}
