use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::ScheduleError;
use crate::schedule::PlayerSchedule;
use crate::window::{HOURS_PER_DAY, TimeWindow};

/// A declaration line that failed to parse.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterIssue {
    pub line: usize,
    pub source: String,
    pub error: ScheduleError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Name,
    Gmt,
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "gmt" | "offset" => Ok(Self::Gmt),
            other => Err(anyhow!("invalid sort order: {other}")),
        }
    }
}

/// Every schedule from one source, plus the lines that were rejected.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    schedules: Vec<PlayerSchedule>,
    issues: Vec<RosterIssue>,
}

impl Roster {
    /// One declaration per line; blank lines and `#` comments are skipped.
    /// A bad line is recorded and the rest still load.
    #[tracing::instrument(skip(text))]
    pub fn parse_lines(text: &str) -> Self {
        let mut roster = Self::default();
        let mut seen = HashSet::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match PlayerSchedule::parse(line) {
                Ok(schedule) => {
                    if !seen.insert(schedule.name().to_string()) {
                        warn!(
                            line = idx + 1,
                            name = %schedule.name(),
                            "duplicate player; first entry wins"
                        );
                        continue;
                    }
                    roster.schedules.push(schedule);
                }
                Err(error) => {
                    warn!(line = idx + 1, %error, "rejected declaration");
                    roster.issues.push(RosterIssue {
                        line: idx + 1,
                        source: line.to_string(),
                        error,
                    });
                }
            }
        }

        debug!(
            players = roster.schedules.len(),
            rejected = roster.issues.len(),
            "parsed roster"
        );
        roster
    }

    #[tracing::instrument]
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read roster {}", path.display()))?;
        let roster = Self::parse_lines(&text);
        info!(
            roster = %path.display(),
            players = roster.len(),
            rejected = roster.issues.len(),
            "loaded roster"
        );
        Ok(roster)
    }

    pub fn from_schedules(schedules: Vec<PlayerSchedule>) -> Self {
        Self {
            schedules,
            issues: vec![],
        }
    }

    pub fn schedules(&self) -> &[PlayerSchedule] {
        &self.schedules
    }

    pub fn issues(&self) -> &[RosterIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&PlayerSchedule> {
        self.schedules.iter().find(|s| s.name() == name)
    }

    pub fn sorted(&self, order: SortOrder, viewer_offset_hours: i32) -> Vec<&PlayerSchedule> {
        let mut sorted: Vec<&PlayerSchedule> = self.schedules.iter().collect();
        match order {
            SortOrder::Name => sorted.sort_by(|a, b| a.name().cmp(b.name())),
            SortOrder::Gmt => sorted.sort_by(|a, b| {
                gmt_distance(a.gmt_offset(), viewer_offset_hours)
                    .cmp(&gmt_distance(b.gmt_offset(), viewer_offset_hours))
                    .then_with(|| a.name().cmp(b.name()))
            }),
        }
        sorted
    }

    /// Rows in `order`, each declared schedule paired with the observed
    /// schedule of the same name.
    pub fn rows<'a>(
        &'a self,
        observed: &'a Roster,
        order: SortOrder,
        viewer_offset_hours: i32,
    ) -> Vec<(&'a PlayerSchedule, Option<&'a PlayerSchedule>)> {
        self.sorted(order, viewer_offset_hours)
            .into_iter()
            .map(|declared| (declared, observed.find(declared.name())))
            .collect()
    }
}

/// Hours between two offsets; anything past half a day folds back by twelve.
pub fn gmt_distance(offset: i32, viewer: i32) -> i32 {
    let half_day = (HOURS_PER_DAY / 2) as i32;
    let diff = (offset - viewer).abs();
    if diff > half_day { diff - half_day } else { diff }
}

/// Window pairs, one from each player, that overlap on the day each player
/// is living through at `now`.
pub fn overlapping<'a>(
    first: &'a PlayerSchedule,
    second: &'a PlayerSchedule,
    now: DateTime<Utc>,
) -> Vec<(&'a TimeWindow, &'a TimeWindow)> {
    let theirs: Vec<&TimeWindow> = second.windows_for(second.is_weekend_at(now)).collect();
    first
        .windows_for(first.is_weekend_at(now))
        .flat_map(|a| theirs.iter().filter(move |b| a.overlaps(**b)).map(move |b| (a, *b)))
        .collect()
}
