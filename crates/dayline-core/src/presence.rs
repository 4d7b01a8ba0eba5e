//! Per-minute presence samples and their heat overlay.
//!
//! A detailed declaration carries two arrays of 1440 per-minute counts, one
//! for weekdays and one for weekends. [`Presence::buckets`] folds an array
//! into fixed-width buckets and scales each with a cubic curve against the
//! busiest bucket of the day.

use serde::Serialize;
use tracing::trace;

use crate::error::{Result, ScheduleError};
use crate::window::{MINUTES_PER_DAY, TimeOfDay, TimeWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayKind {
    Weekday,
    Weekend,
}

impl DayKind {
    pub fn from_weekend(is_weekend: bool) -> Self {
        if is_weekend { Self::Weekend } else { Self::Weekday }
    }
}

/// Aggregation width in minutes; divides the day evenly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketWidth(u32);

impl BucketWidth {
    pub fn new(minutes: u32) -> Result<Self> {
        if minutes == 0 || minutes > MINUTES_PER_DAY || MINUTES_PER_DAY % minutes != 0 {
            return Err(ScheduleError::range(
                "bucket width must divide a day of minutes",
                MINUTES_PER_DAY as u64,
                minutes as u64,
            ));
        }
        Ok(Self(minutes))
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn count(self) -> u32 {
        MINUTES_PER_DAY / self.0
    }
}

impl Default for BucketWidth {
    fn default() -> Self {
        Self(30)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatBucket {
    pub index: u32,
    pub start: TimeOfDay,
    /// Last minute covered by the bucket.
    pub end: TimeOfDay,
    pub value: u64,
    pub intensity: f64,
}

impl HeatBucket {
    pub fn as_window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    weekday: Box<[u32]>,
    weekend: Box<[u32]>,
}

impl Presence {
    pub fn new(weekday: Vec<u32>, weekend: Vec<u32>) -> Result<Self> {
        for (label, samples) in [("weekday", &weekday), ("weekend", &weekend)] {
            if samples.len() != MINUTES_PER_DAY as usize {
                return Err(ScheduleError::range(
                    format!("{label} presence must cover every minute"),
                    MINUTES_PER_DAY as u64,
                    samples.len() as u64,
                ));
            }
        }
        Ok(Self {
            weekday: weekday.into_boxed_slice(),
            weekend: weekend.into_boxed_slice(),
        })
    }

    pub fn samples(&self, day: DayKind) -> &[u32] {
        match day {
            DayKind::Weekday => &self.weekday,
            DayKind::Weekend => &self.weekend,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.weekday.iter().chain(self.weekend.iter()).all(|&v| v == 0)
    }

    /// Heat buckets for `day`, leaving out buckets with no samples.
    #[tracing::instrument(skip(self, width), fields(width = width.minutes()))]
    pub fn buckets(&self, width: BucketWidth, day: DayKind) -> Vec<HeatBucket> {
        let span = width.minutes() as usize;
        let sums: Vec<u64> = self
            .samples(day)
            .chunks(span)
            .map(|chunk| chunk.iter().map(|&v| v as u64).sum())
            .collect();

        let max = sums.iter().copied().max().unwrap_or(0);
        if max == 0 {
            trace!("no presence recorded for this day");
            return vec![];
        }
        let max_cubed = (max as f64).powi(3);

        sums.iter()
            .enumerate()
            .filter(|(_, value)| **value > 0)
            .map(|(index, &value)| {
                let first = index as u32 * width.minutes();
                HeatBucket {
                    index: index as u32,
                    start: TimeOfDay::from_minutes(first as i64),
                    end: TimeOfDay::from_minutes((first + width.minutes() - 1) as i64),
                    value,
                    intensity: (value as f64).powi(3) / (2.0 * max_cubed),
                }
            })
            .collect()
    }
}

/// Expands one run of `[count x] value` tokens, each worth `count` buckets
/// of `bucket_size` minutes, into a full day of per-minute samples.
///
/// The run must cover the day exactly; the total is checked before any
/// slot is written.
pub fn expand_run<'a, I>(tokens: I, bucket_size: u32, label: &str) -> Result<Vec<u32>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parsed = Vec::new();
    let mut total: u64 = 0;
    for token in tokens {
        let (count, value) = parse_run_token(token)?;
        total = total.saturating_add(count as u64 * bucket_size as u64);
        parsed.push((count, value));
    }

    if total != MINUTES_PER_DAY as u64 {
        return Err(ScheduleError::range(
            format!("{label} presence run does not cover the day"),
            MINUTES_PER_DAY as u64,
            total,
        ));
    }

    let mut samples = Vec::with_capacity(MINUTES_PER_DAY as usize);
    for (count, value) in parsed {
        let slots = count as usize * bucket_size as usize;
        samples.extend(std::iter::repeat_n(value, slots));
    }
    Ok(samples)
}

fn parse_run_token(token: &str) -> Result<(u32, u32)> {
    let (count, value) = match token.split_once('x') {
        Some((count, value)) => (count.trim(), value.trim()),
        None => ("1", token.trim()),
    };
    let count = count
        .parse::<u32>()
        .map_err(|err| ScheduleError::format("presence count", format!("{token:?}: {err}")))?;
    let value = value
        .parse::<u32>()
        .map_err(|err| ScheduleError::format("presence value", format!("{token:?}: {err}")))?;
    Ok((count, value))
}

#[cfg(test)]
mod tests {
    use super::{BucketWidth, DayKind, Presence, expand_run};
    use crate::window::MINUTES_PER_DAY;

    fn day(value_at: impl Fn(usize) -> u32) -> Vec<u32> {
        (0..MINUTES_PER_DAY as usize).map(value_at).collect()
    }

    #[test]
    fn single_busy_hour_gives_half_intensity() {
        let weekday = day(|m| if m < 60 { 4 } else { 0 });
        let presence = Presence::new(weekday, day(|_| 0)).expect("valid arrays");
        let width = BucketWidth::new(60).expect("valid width");

        let buckets = presence.buckets(width, DayKind::Weekday);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].index, 0);
        assert_eq!(buckets[0].start.to_string(), "00:00");
        assert_eq!(buckets[0].end.to_string(), "00:59");
        assert_eq!(buckets[0].value, 240);
        assert!((buckets[0].intensity - 0.5).abs() < 1e-12);
    }

    #[test]
    fn intensity_follows_cubic_curve() {
        let weekday = day(|m| match m / 60 {
            2 => 2,
            5 => 4,
            _ => 0,
        });
        let presence = Presence::new(weekday, day(|_| 0)).expect("valid arrays");
        let width = BucketWidth::new(60).expect("valid width");
        let buckets = presence.buckets(width, DayKind::Weekday);

        assert_eq!(buckets.iter().map(|b| b.index).collect::<Vec<_>>(), vec![2, 5]);
        assert!((buckets[0].intensity - 8.0 / 128.0).abs() < 1e-12);
        assert!((buckets[1].intensity - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_day_emits_nothing() {
        let presence = Presence::new(day(|_| 0), day(|_| 0)).expect("valid arrays");
        assert!(presence.is_empty());
        for width in [1, 15, 30, 60, 1440] {
            let width = BucketWidth::new(width).expect("valid width");
            assert!(presence.buckets(width, DayKind::Weekday).is_empty());
            assert!(presence.buckets(width, DayKind::Weekend).is_empty());
        }
    }

    #[test]
    fn weekend_selector_reads_weekend_samples() {
        let presence = Presence::new(day(|_| 0), day(|m| if m >= 1410 { 1 } else { 0 }))
            .expect("valid arrays");
        let width = BucketWidth::new(30).expect("valid width");
        assert!(presence.buckets(width, DayKind::Weekday).is_empty());
        let weekend = presence.buckets(width, DayKind::Weekend);
        assert_eq!(weekend.len(), 1);
        assert_eq!(weekend[0].index, 47);
        assert_eq!(weekend[0].end.to_string(), "23:59");
    }

    #[test]
    fn bucket_width_must_divide_day() {
        assert!(BucketWidth::new(0).expect_err("zero").is_range());
        assert!(BucketWidth::new(7).expect_err("uneven").is_range());
        assert!(BucketWidth::new(2880).expect_err("too wide").is_range());
        assert_eq!(BucketWidth::new(45).expect("divides").count(), 32);
    }

    #[test]
    fn expand_run_fills_buckets_in_order() {
        let samples = expand_run(["2 x 3", "1", "21x0"], 60, "weekday").expect("full day");
        assert_eq!(samples.len(), MINUTES_PER_DAY as usize);
        assert_eq!(samples[0], 3);
        assert_eq!(samples[119], 3);
        assert_eq!(samples[120], 1);
        assert_eq!(samples[179], 1);
        assert_eq!(samples[180], 0);
    }

    #[test]
    fn expand_run_rejects_short_and_long_runs() {
        let short = expand_run(["23 x 1"], 60, "weekday").expect_err("short run");
        assert!(short.is_range());
        let long = expand_run(["24 x 1", "5"], 60, "weekday").expect_err("long run");
        assert!(long.is_range());
        assert!(expand_run(Vec::<&str>::new(), 60, "weekend").expect_err("empty run").is_range());
    }

    #[test]
    fn expand_run_rejects_non_numeric_tokens() {
        let err = expand_run(["24 x many"], 60, "weekday").expect_err("bad value");
        assert!(err.is_format());
        let err = expand_run(["-1 x 2"], 60, "weekday").expect_err("bad count");
        assert!(err.is_format());
    }
}
