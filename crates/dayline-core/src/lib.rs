pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod layout;
pub mod presence;
pub mod render;
pub mod roster;
pub mod schedule;
pub mod window;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use error::ScheduleError;
pub use presence::{
  BucketWidth,
  DayKind,
  HeatBucket,
  Presence
};
pub use schedule::PlayerSchedule;
pub use window::{
  TimeOfDay,
  TimeWindow
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting dayline"
  );

  let mut cfg = config::Config::load(
    cli.rcfile.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );

  let declared_path = cli
    .declared
    .or_else(|| {
      cfg.get_path("roster.declared")
    })
    .context(
      "no declared roster; pass \
       --declared or set \
       roster.declared"
    )?;
  let declared = roster::Roster::load(
    &declared_path
  )?;

  let observed = match cli
    .observed
    .or_else(|| {
      cfg.get_path("roster.observed")
    }) {
    | Some(path) => {
      roster::Roster::load(&path)?
    }
    | None => {
      debug!(
        "no observed roster; heat \
         overlay disabled"
      );
      roster::Roster::default()
    }
  };

  let now = cli.at.unwrap_or_else(Utc::now);
  let zone = datetime::resolve_viewer_zone(
    cfg.get("timezone").as_deref()
  );
  let frame = layout::Frame::new(
    now,
    zone.offset_at(now)
  );
  debug!(%now, viewer_now = %frame.viewer_now(), "sampled frame");

  let renderer =
    render::Renderer::new(&cfg)?;
  let session = commands::Session::new(
    &cfg, declared, observed, frame
  )?;

  commands::dispatch(
    &session,
    &renderer,
    cli
      .command
      .unwrap_or(cli::Command::Board)
  )?;

  info!("done");
  Ok(())
}
