use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, Utc, Weekday};
use regex::Regex;
use tracing::{debug, trace};

use crate::error::{Result, ScheduleError};
use crate::presence::{DayKind, Presence, expand_run};
use crate::window::{HOURS_PER_DAY, MINUTES_PER_HOUR, TimeOfDay, TimeWindow};

const GMT_PREFIX: &str = "GMT";
const WEEKEND_MARKER: &str = "we";
const MAX_OFFSET_HOURS: i32 = 14;

const WINDOW_PATTERN: &str = concat!(
    r"^(?P<uncertain>u)?(?P<weekend>we)?",
    r"(?P<sh>\d{1,2}):(?P<sm>\d{1,2})\s*-\s*(?P<eh>\d{1,2}):(?P<em>\d{1,2})$",
);

/// What a declaration provides after its offset field.
#[derive(Debug, Clone, PartialEq)]
pub enum Availability {
    /// Self-declared windows, in declaration order.
    Windows(Vec<TimeWindow>),
    /// Observed per-minute samples, originally declared in buckets of
    /// `bucket_size` minutes.
    Detailed { bucket_size: u32, presence: Presence },
}

/// One player's availability, normalized to UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSchedule {
    name: String,
    gmt_offset: i32,
    offset: FixedOffset,
    availability: Availability,
}

impl PlayerSchedule {
    /// Parses `name, GMT<offset>, ...` where the remaining fields are either
    /// windows (`[u][we]HH:MM-HH:MM`) or a bucket size followed by two
    /// run-length presence runs separated by `we`.
    #[tracing::instrument(skip(line))]
    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();

        let name = fields[0];
        if name.is_empty() {
            return Err(ScheduleError::format("name", "player name is empty"));
        }
        let raw_offset = fields
            .get(1)
            .ok_or_else(|| ScheduleError::format("offset", format!("{name}: missing GMT field")))?;
        let gmt_offset = parse_gmt(raw_offset)?;
        let offset = FixedOffset::east_opt(gmt_offset * 3600).ok_or_else(|| {
            ScheduleError::format("offset", format!("{raw_offset:?} is not a valid offset"))
        })?;

        let rest = &fields[2..];
        let availability = match rest.first().map(|f| f.parse::<i64>()) {
            Some(Ok(bucket_size)) => parse_detailed(bucket_size, &rest[1..])?,
            _ => {
                let re = Regex::new(WINDOW_PATTERN).map_err(|e| {
                    ScheduleError::format("window", format!("invalid window pattern: {e}"))
                })?;
                Availability::Windows(
                    rest.iter()
                        .map(|field| parse_window(&re, field, gmt_offset))
                        .collect::<Result<Vec<_>>>()?,
                )
            }
        };

        let schedule = Self {
            name: name.to_string(),
            gmt_offset,
            offset,
            availability,
        };
        debug!(
            name = %schedule.name,
            gmt_offset,
            windows = schedule.windows().len(),
            detailed = schedule.is_detailed(),
            "parsed player schedule"
        );
        Ok(schedule)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Home offset from UTC, in whole hours.
    pub fn gmt_offset(&self) -> i32 {
        self.gmt_offset
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// `GMT`, `GMT+5` or `GMT-3`.
    pub fn gmt_label(&self) -> String {
        match self.gmt_offset {
            0 => GMT_PREFIX.to_string(),
            o => format!("{GMT_PREFIX}{o:+}"),
        }
    }

    pub fn availability(&self) -> &Availability {
        &self.availability
    }

    pub fn is_detailed(&self) -> bool {
        matches!(self.availability, Availability::Detailed { .. })
    }

    pub fn windows(&self) -> &[TimeWindow] {
        match &self.availability {
            Availability::Windows(windows) => windows,
            Availability::Detailed { .. } => &[],
        }
    }

    pub fn presence(&self) -> Option<&Presence> {
        match &self.availability {
            Availability::Detailed { presence, .. } => Some(presence),
            Availability::Windows(_) => None,
        }
    }

    pub fn has_weekend_windows(&self) -> bool {
        self.windows().iter().any(TimeWindow::is_weekend)
    }

    /// Windows that apply on the given kind of day. Weekend windows replace
    /// the weekday set; a player without any keeps the same set every day.
    pub fn windows_for(&self, is_weekend: bool) -> impl Iterator<Item = &TimeWindow> {
        let split = self.has_weekend_windows();
        self.windows()
            .iter()
            .filter(move |w| !split || w.is_weekend() == is_weekend)
    }

    pub fn to_utc_hour(&self, local_hour: i32) -> u32 {
        shift_hour(local_hour, -self.gmt_offset)
    }

    pub fn to_local_hour(&self, utc_hour: i32) -> u32 {
        shift_hour(utc_hour, self.gmt_offset)
    }

    /// Whether `now` falls on a Saturday or Sunday at the player's home.
    pub fn is_weekend_at(&self, now: DateTime<Utc>) -> bool {
        matches!(
            now.with_timezone(&self.offset).weekday(),
            Weekday::Sat | Weekday::Sun
        )
    }

    pub fn day_kind_at(&self, now: DateTime<Utc>) -> DayKind {
        DayKind::from_weekend(self.is_weekend_at(now))
    }

    /// A window re-expressed in the player's own clock.
    pub fn local_window(&self, window: &TimeWindow) -> TimeWindow {
        window.shifted(self.gmt_offset as i64 * MINUTES_PER_HOUR as i64)
    }
}

impl FromStr for PlayerSchedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn shift_hour(hour: i32, by: i32) -> u32 {
    (hour + by).rem_euclid(HOURS_PER_DAY as i32) as u32
}

fn parse_gmt(raw: &str) -> Result<i32> {
    let digits = raw.strip_prefix(GMT_PREFIX).ok_or_else(|| {
        ScheduleError::format("offset", format!("{raw:?} lacks the {GMT_PREFIX} prefix"))
    })?;
    let digits = digits.trim();
    if digits.is_empty() {
        return Ok(0);
    }
    let hours = digits
        .parse::<i32>()
        .map_err(|err| ScheduleError::format("offset", format!("{raw:?}: {err}")))?;
    if hours.abs() > MAX_OFFSET_HOURS {
        return Err(ScheduleError::format(
            "offset",
            format!("{raw:?} is beyond {MAX_OFFSET_HOURS} hours from UTC"),
        ));
    }
    Ok(hours)
}

fn parse_window(re: &Regex, field: &str, gmt_offset: i32) -> Result<TimeWindow> {
    let captures = re.captures(field).ok_or_else(|| {
        ScheduleError::format("window", format!("{field:?} is not [u][we]HH:MM-HH:MM"))
    })?;

    let number = |group: &str| -> Result<u32> {
        captures
            .name(group)
            .map(|m| m.as_str())
            .unwrap_or_default()
            .parse::<u32>()
            .map_err(|err| ScheduleError::format("window", format!("{field:?}: {err}")))
    };
    let start = clock(field, number("sh")?, number("sm")?, gmt_offset)?;
    let end = clock(field, number("eh")?, number("em")?, gmt_offset)?;

    let uncertain = captures.name("uncertain").is_some();
    let weekend = captures.name("weekend").is_some();
    trace!(%start, %end, uncertain, weekend, "parsed window");
    Ok(TimeWindow::with_flags(start, end, uncertain, weekend))
}

fn clock(field: &str, local_hour: u32, minute: u32, gmt_offset: i32) -> Result<TimeOfDay> {
    let past_midnight = local_hour == HOURS_PER_DAY && minute > 0;
    if local_hour > HOURS_PER_DAY || minute >= MINUTES_PER_HOUR || past_midnight {
        return Err(ScheduleError::format(
            "window",
            format!("{field:?} has an out of range time {local_hour}:{minute:02}"),
        ));
    }
    let utc_hour = shift_hour(local_hour as i32, -gmt_offset);
    Ok(TimeOfDay::from_hm(utc_hour, minute))
}

fn parse_detailed(bucket_size: i64, tokens: &[&str]) -> Result<Availability> {
    let bucket_size = u32::try_from(bucket_size)
        .ok()
        .filter(|&size| size > 0)
        .ok_or_else(|| {
            let actual = bucket_size.max(0) as u64;
            ScheduleError::range("detail bucket size must be positive", 1, actual)
        })?;

    let mut runs = tokens.split(|token| *token == WEEKEND_MARKER);
    let weekday = runs.next().unwrap_or_default();
    let weekend = runs.next().unwrap_or_default();
    if runs.next().is_some() {
        return Err(ScheduleError::format(
            "presence",
            "more than one weekend marker in detailed declaration",
        ));
    }

    let presence = Presence::new(
        expand_run(weekday.iter().copied(), bucket_size, "weekday")?,
        expand_run(weekend.iter().copied(), bucket_size, "weekend")?,
    )?;
    Ok(Availability::Detailed { bucket_size, presence })
}
