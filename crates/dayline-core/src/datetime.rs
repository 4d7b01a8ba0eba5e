use std::fs;
use std::path::PathBuf;

use chrono::{
  DateTime,
  FixedOffset,
  Local,
  Offset,
  Utc
};
use chrono_tz::Tz;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "dayline-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "DAYLINE_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "DAYLINE_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// The clock the timeline is drawn in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerZone {
  Named(Tz),
  Host
}

impl ViewerZone {
  #[must_use]
  pub fn offset_at(
    &self,
    now: DateTime<Utc>
  ) -> FixedOffset {
    match self {
      | ViewerZone::Named(tz) => {
        now
          .with_timezone(tz)
          .offset()
          .fix()
      }
      | ViewerZone::Host => {
        now
          .with_timezone(&Local)
          .offset()
          .fix()
      }
    }
  }
}

/// Whole hours east of UTC, rounded toward zero.
#[must_use]
pub fn offset_hours(
  offset: FixedOffset
) -> i32 {
  offset.local_minus_utc() / 3600
}

/// Picks the viewer zone from, in order, the
/// environment, the rc value, the timezone
/// file and finally the host clock.
pub fn resolve_viewer_zone(
  configured: Option<&str>
) -> ViewerZone {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) = parse_timezone(
      &raw,
      TIMEZONE_ENV_VAR
    )
  {
    return ViewerZone::Named(tz);
  }

  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "rc:timezone")
  {
    return ViewerZone::Named(tz);
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return ViewerZone::Named(tz);
  }

  tracing::debug!(
    "no viewer timezone configured; \
     using host clock"
  );
  ViewerZone::Host
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured viewer timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::{
    ViewerZone,
    offset_hours,
    parse_timezone
  };

  #[test]
  fn named_zone_follows_daylight_saving()
  {
    let tz = parse_timezone(
      "Europe/Paris",
      "test"
    )
    .expect("known zone");
    let zone = ViewerZone::Named(tz);

    let winter = Utc
      .with_ymd_and_hms(
        2026, 1, 15, 12, 0, 0
      )
      .single()
      .expect("valid winter");
    let summer = Utc
      .with_ymd_and_hms(
        2026, 7, 15, 12, 0, 0
      )
      .single()
      .expect("valid summer");

    assert_eq!(
      offset_hours(
        zone.offset_at(winter)
      ),
      1
    );
    assert_eq!(
      offset_hours(
        zone.offset_at(summer)
      ),
      2
    );
  }

  #[test]
  fn rejects_unknown_zone() {
    assert!(
      parse_timezone(
        "Mars/Olympus",
        "test"
      )
      .is_none()
    );
    assert!(
      parse_timezone("  ", "test")
        .is_none()
    );
  }
}
