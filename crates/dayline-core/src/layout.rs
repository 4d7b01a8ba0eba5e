//! Layout values handed to renderers.
//!
//! A [`Frame`] samples "now" once. Every ratio, highlight and heat bucket in
//! one pass is computed against that single instant, on a 24-hour timeline
//! centred on the viewer's current time of day. Ratios run from 0.0 (left
//! edge, twelve hours ago) to 1.0 (right edge, twelve hours ahead).

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::presence::{BucketWidth, DayKind, HeatBucket};
use crate::schedule::PlayerSchedule;
use crate::window::{HOURS_PER_DAY, MINUTES_PER_DAY, TimeOfDay, TimeWindow};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub start_ratio: f64,
    pub end_ratio: f64,
}

impl Segment {
    pub fn contains(&self, ratio: f64) -> bool {
        self.start_ratio <= ratio && ratio <= self.end_ratio
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourTick {
    pub hour: u32,
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowState {
    Online,
    Maybe,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowLayout {
    /// Bounds in the viewer's clock.
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub segments: Vec<Segment>,
    pub highlighted: bool,
    pub uncertain: bool,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatLayout {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub segments: Vec<Segment>,
    pub intensity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowLayout {
    pub name: String,
    pub gmt_offset: i32,
    pub gmt_label: String,
    pub weekend: bool,
    pub windows: Vec<WindowLayout>,
    pub heat: Vec<HeatLayout>,
}

impl RowLayout {
    pub fn state(&self) -> RowState {
        let mut state = RowState::Offline;
        for window in self.windows.iter().filter(|w| w.highlighted) {
            if !window.uncertain {
                return RowState::Online;
            }
            state = RowState::Maybe;
        }
        state
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameLayout {
    pub now: DateTime<Utc>,
    pub viewer_now: TimeOfDay,
    pub viewer_offset_minutes: i32,
    pub ticks: Vec<HourTick>,
    pub rows: Vec<RowLayout>,
}

#[derive(Debug, Clone, Copy)]
pub struct Frame {
    now: DateTime<Utc>,
    viewer: FixedOffset,
    viewer_now: TimeOfDay,
}

impl Frame {
    pub fn new(now: DateTime<Utc>, viewer: FixedOffset) -> Self {
        Self {
            now,
            viewer,
            viewer_now: TimeOfDay::of(&now.with_timezone(&viewer)),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn viewer_offset(&self) -> FixedOffset {
        self.viewer
    }

    pub fn viewer_now(&self) -> TimeOfDay {
        self.viewer_now
    }

    fn viewer_shift(&self) -> i64 {
        self.viewer.local_minus_utc() as i64 / 60
    }

    /// A UTC window in the viewer's clock.
    pub fn to_viewer(&self, window: &TimeWindow) -> TimeWindow {
        window.shifted(self.viewer_shift())
    }

    /// Position of a viewer-clock time on the timeline.
    pub fn ratio(&self, at: TimeOfDay) -> f64 {
        let half_day = (MINUTES_PER_DAY / 2) as i64;
        let offset = (at.minutes() as i64 + half_day - self.viewer_now.minutes() as i64)
            .rem_euclid(MINUTES_PER_DAY as i64);
        offset as f64 / MINUTES_PER_DAY as f64
    }

    /// Pieces of a viewer-clock span of `minutes` starting at `start`. A span
    /// running past the right edge continues from the left edge.
    pub fn span(&self, start: TimeOfDay, minutes: u32) -> Vec<Segment> {
        let left = self.ratio(start);
        let right = left + minutes as f64 / MINUTES_PER_DAY as f64;
        if right <= 1.0 {
            return vec![Segment {
                start_ratio: left,
                end_ratio: right,
            }];
        }
        vec![
            Segment {
                start_ratio: left,
                end_ratio: 1.0,
            },
            Segment {
                start_ratio: 0.0,
                end_ratio: right - 1.0,
            },
        ]
    }

    /// Segments of a UTC window on the viewer's timeline.
    pub fn segments(&self, window: &TimeWindow) -> Vec<Segment> {
        let local = self.to_viewer(window);
        let length = (local.end().minutes() as i64 - local.start().minutes() as i64)
            .rem_euclid(MINUTES_PER_DAY as i64) as u32;
        self.span(local.start(), length)
    }

    pub fn is_highlighted(&self, window: &TimeWindow) -> bool {
        self.to_viewer(window).contains(self.viewer_now)
    }

    pub fn hour_ticks(&self) -> Vec<HourTick> {
        (0..HOURS_PER_DAY)
            .map(|hour| HourTick {
                hour,
                ratio: self.ratio(TimeOfDay::from_hm(hour, 0)),
            })
            .collect()
    }

    /// Layout of one player's row. `observed` is the same player's sampled
    /// schedule, when there is one, and feeds the heat overlay.
    pub fn row(
        &self,
        declared: &PlayerSchedule,
        observed: Option<&PlayerSchedule>,
        width: BucketWidth,
    ) -> RowLayout {
        let weekend = declared.is_weekend_at(self.now);
        let windows = declared
            .windows_for(weekend)
            .map(|window| {
                let local = self.to_viewer(window);
                WindowLayout {
                    start: local.start(),
                    end: local.end(),
                    segments: self.segments(window),
                    highlighted: self.is_highlighted(window),
                    uncertain: window.is_uncertain(),
                    tooltip: tooltip(declared, window),
                }
            })
            .collect();

        let heat = observed
            .map(|o| self.heat_for(o, width, o.day_kind_at(self.now)))
            .unwrap_or_default();

        RowLayout {
            name: declared.name().to_string(),
            gmt_offset: declared.gmt_offset(),
            gmt_label: declared.gmt_label(),
            weekend,
            windows,
            heat,
        }
    }

    fn heat(&self, bucket: &HeatBucket, width: BucketWidth) -> HeatLayout {
        let local = self.to_viewer(&bucket.as_window());
        HeatLayout {
            start: local.start(),
            end: local.end(),
            segments: self.span(local.start(), width.minutes()),
            intensity: bucket.intensity,
        }
    }

    /// Heat buckets of one observed schedule for an explicit kind of day.
    pub fn heat_for(
        &self,
        observed: &PlayerSchedule,
        width: BucketWidth,
        day: DayKind,
    ) -> Vec<HeatLayout> {
        observed
            .presence()
            .map(|p| p.buckets(width, day))
            .unwrap_or_default()
            .iter()
            .map(|bucket| self.heat(bucket, width))
            .collect()
    }

    pub fn layout<'a, I>(&self, rows: I, width: BucketWidth) -> FrameLayout
    where
        I: IntoIterator<Item = (&'a PlayerSchedule, Option<&'a PlayerSchedule>)>,
    {
        FrameLayout {
            now: self.now,
            viewer_now: self.viewer_now,
            viewer_offset_minutes: self.viewer.local_minus_utc() / 60,
            ticks: self.hour_ticks(),
            rows: rows
                .into_iter()
                .map(|(declared, observed)| self.row(declared, observed, width))
                .collect(),
        }
    }
}

/// `Alice GMT+2: 20:00-23:30 (uncertain)`, times in the player's clock.
pub fn tooltip(player: &PlayerSchedule, window: &TimeWindow) -> String {
    let local = player.local_window(window);
    format!(
        "{} {}: {}-{}{}",
        player.name(),
        player.gmt_label(),
        local.start(),
        local.end(),
        if window.is_uncertain() { " (uncertain)" } else { "" }
    )
}
