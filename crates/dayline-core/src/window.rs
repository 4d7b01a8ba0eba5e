use std::fmt;

use chrono::{DateTime, TimeZone, Timelike};
use serde::{Serialize, Serializer};

pub const MINUTES_PER_HOUR: u32 = 60;
pub const HOURS_PER_DAY: u32 = 24;
pub const MINUTES_PER_DAY: u32 = MINUTES_PER_HOUR * HOURS_PER_DAY;

/// Wall-clock minute of the day, always in `[0, 1440)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self(0);

    /// Wraps any minute count (negative included) onto the clock face.
    pub fn from_minutes(minutes: i64) -> Self {
        Self(minutes.rem_euclid(MINUTES_PER_DAY as i64) as u16)
    }

    pub fn from_hm(hour: u32, minute: u32) -> Self {
        Self::from_minutes(hour as i64 * MINUTES_PER_HOUR as i64 + minute as i64)
    }

    pub fn of<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Self::from_hm(at.hour(), at.minute())
    }

    pub fn minutes(self) -> u32 {
        self.0 as u32
    }

    pub fn hour(self) -> u32 {
        self.minutes() / MINUTES_PER_HOUR
    }

    pub fn minute(self) -> u32 {
        self.minutes() % MINUTES_PER_HOUR
    }

    pub fn shifted(self, delta_minutes: i64) -> Self {
        Self::from_minutes(self.0 as i64 + delta_minutes)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// One recurring daily interval, bounds in UTC.
///
/// Both bounds are inclusive. When `end < start` the window crosses midnight
/// and covers `[start, 24:00) ∪ [00:00, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeWindow {
    start: TimeOfDay,
    end: TimeOfDay,
    uncertain: bool,
    weekend: bool,
}

impl TimeWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self {
            start,
            end,
            uncertain: false,
            weekend: false,
        }
    }

    pub fn with_flags(start: TimeOfDay, end: TimeOfDay, uncertain: bool, weekend: bool) -> Self {
        Self {
            start,
            end,
            uncertain,
            weekend,
        }
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    /// Best-guess window, drawn with less weight.
    pub fn is_uncertain(&self) -> bool {
        self.uncertain
    }

    /// Applies on Saturday and Sunday only, replacing the weekday set.
    pub fn is_weekend(&self) -> bool {
        self.weekend
    }

    pub fn wraps(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, instant: TimeOfDay) -> bool {
        if self.wraps() {
            self.start <= instant || instant <= self.end
        } else {
            self.start <= instant && instant <= self.end
        }
    }

    /// Four-point boundary test: true when either window holds one of the
    /// other's bounds. Intended for hour and half-hour windows, not for
    /// sub-minute precision.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.contains(other.start)
            || self.contains(other.end)
            || other.contains(self.start)
            || other.contains(self.end)
    }

    /// The same window expressed in a time base `delta_minutes` ahead.
    pub fn shifted(&self, delta_minutes: i64) -> Self {
        Self {
            start: self.start.shifted(delta_minutes),
            end: self.end.shifted(delta_minutes),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MINUTES_PER_DAY, TimeOfDay, TimeWindow};

    fn window(start: u32, end: u32) -> TimeWindow {
        TimeWindow::new(
            TimeOfDay::from_minutes(start as i64),
            TimeOfDay::from_minutes(end as i64),
        )
    }

    #[test]
    fn time_of_day_wraps_both_directions() {
        assert_eq!(TimeOfDay::from_minutes(-1).minutes(), MINUTES_PER_DAY - 1);
        assert_eq!(TimeOfDay::from_minutes(1440).minutes(), 0);
        assert_eq!(TimeOfDay::from_hm(25, 30), TimeOfDay::from_hm(1, 30));
        assert_eq!(TimeOfDay::from_hm(23, 0).shifted(120).to_string(), "01:00");
        assert_eq!(TimeOfDay::from_hm(0, 15).shifted(-30).to_string(), "23:45");
    }

    #[test]
    fn plain_window_is_inclusive() {
        let w = window(600, 720);
        assert!(!w.wraps());
        assert!(w.contains(TimeOfDay::from_minutes(600)));
        assert!(w.contains(TimeOfDay::from_minutes(660)));
        assert!(w.contains(TimeOfDay::from_minutes(720)));
        assert!(!w.contains(TimeOfDay::from_minutes(599)));
        assert!(!w.contains(TimeOfDay::from_minutes(721)));
    }

    #[test]
    fn wrapping_window_spans_midnight() {
        let w = window(1380, 360);
        assert!(w.wraps());
        assert!(w.contains(TimeOfDay::from_minutes(0)));
        assert!(w.contains(TimeOfDay::from_minutes(1439)));
        assert!(w.contains(TimeOfDay::from_minutes(1380)));
        assert!(w.contains(TimeOfDay::from_minutes(360)));
        assert!(!w.contains(TimeOfDay::from_minutes(700)));
        assert!(!w.contains(TimeOfDay::from_minutes(361)));
    }

    #[test]
    fn overlap_detects_shared_bounds_and_nesting() {
        let evening = window(1080, 1320);
        let late = window(1260, 120);
        let morning = window(360, 600);
        let inner = window(1100, 1200);

        assert!(evening.overlaps(&late));
        assert!(late.overlaps(&evening));
        assert!(!evening.overlaps(&morning));
        assert!(evening.overlaps(&inner));
        assert!(inner.overlaps(&evening));
        assert!(window(600, 660).overlaps(&window(660, 720)));
    }

    #[test]
    fn shifting_keeps_flags() {
        let w = TimeWindow::with_flags(
            TimeOfDay::from_hm(22, 0),
            TimeOfDay::from_hm(23, 0),
            true,
            true,
        )
        .shifted(180);
        assert_eq!(w.start().to_string(), "01:00");
        assert_eq!(w.end().to_string(), "02:00");
        assert!(w.is_uncertain());
        assert!(w.is_weekend());
    }

    mod props {
        use proptest::prelude::*;

        use super::window;
        use crate::window::TimeOfDay;

        proptest! {
            #[test]
            fn overlap_is_symmetric(
                a in 0u32..1440,
                b in 0u32..1440,
                c in 0u32..1440,
                d in 0u32..1440
            ) {
                let left = window(a, b);
                let right = window(c, d);
                prop_assert_eq!(left.overlaps(&right), right.overlaps(&left));
            }

            #[test]
            fn plain_window_holds_bounds_and_midpoint(start in 0u32..1440, len in 0u32..1440) {
                let end = (start + len).min(1439);
                let w = window(start, end);
                prop_assert!(w.contains(TimeOfDay::from_minutes(start as i64)));
                prop_assert!(w.contains(TimeOfDay::from_minutes(end as i64)));
                prop_assert!(w.contains(TimeOfDay::from_minutes(((start + end) / 2) as i64)));

                let before = TimeOfDay::from_minutes(start as i64 - 1);
                prop_assert_eq!(w.contains(before), before == w.end());
            }
        }
    }
}
