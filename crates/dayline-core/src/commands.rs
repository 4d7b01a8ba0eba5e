use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crate::cli::Command;
use crate::config::Config;
use crate::datetime::offset_hours;
use crate::layout::Frame;
use crate::presence::{BucketWidth, DayKind};
use crate::render::Renderer;
use crate::roster::{Roster, SortOrder, overlapping};

/// Everything one command needs, sampled once per invocation.
#[derive(Debug)]
pub struct Session {
    pub declared: Roster,
    pub observed: Roster,
    pub frame: Frame,
    pub width: BucketWidth,
    pub sort: SortOrder,
}

impl Session {
    pub fn new(
        cfg: &Config,
        declared: Roster,
        observed: Roster,
        frame: Frame,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            declared,
            observed,
            frame,
            width: cfg.bucket_width()?,
            sort: cfg.sort_order()?,
        })
    }

    fn now(&self) -> DateTime<Utc> {
        self.frame.now()
    }
}

#[instrument(skip(session, renderer))]
pub fn dispatch(session: &Session, renderer: &Renderer, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Board => cmd_board(session, renderer),
        Command::Heat { name, weekend, weekday } => {
            let day = if weekend {
                Some(DayKind::Weekend)
            } else if weekday {
                Some(DayKind::Weekday)
            } else {
                None
            };
            cmd_heat(session, renderer, &name, day)
        }
        Command::Overlap { first, second } => cmd_overlap(session, renderer, &first, &second),
        Command::Layout { pretty } => cmd_layout(session, pretty),
        Command::Check => cmd_check(session, renderer),
    }
}

fn layout(session: &Session) -> crate::layout::FrameLayout {
    let viewer = offset_hours(session.frame.viewer_offset());
    let rows = session.declared.rows(&session.observed, session.sort, viewer);
    session.frame.layout(rows, session.width)
}

fn cmd_board(session: &Session, renderer: &Renderer) -> anyhow::Result<()> {
    let rejected = session.declared.issues().len() + session.observed.issues().len();
    if rejected > 0 {
        warn!(rejected, "some declarations were skipped; run `dayline check` for details");
    }
    renderer.print_board(&layout(session))
}

fn cmd_heat(
    session: &Session,
    renderer: &Renderer,
    name: &str,
    day: Option<DayKind>,
) -> anyhow::Result<()> {
    let observed = session
        .observed
        .find(name)
        .ok_or_else(|| anyhow!("no observed schedule for {name}"))?;
    if !observed.is_detailed() {
        return Err(anyhow!("{name} has declared windows, not presence samples"));
    }
    let day = day.unwrap_or_else(|| observed.day_kind_at(session.now()));
    let buckets = session.frame.heat_for(observed, session.width, day);
    info!(name, ?day, buckets = buckets.len(), "computed heat");
    renderer.print_heat(name, day, &buckets)
}

fn cmd_overlap(
    session: &Session,
    renderer: &Renderer,
    first: &str,
    second: &str,
) -> anyhow::Result<()> {
    let find = |name: &str| {
        session
            .declared
            .find(name)
            .ok_or_else(|| anyhow!("no declared schedule for {name}"))
    };
    let a = find(first)?;
    let b = find(second)?;

    let pairs: Vec<_> = overlapping(a, b, session.now())
        .into_iter()
        .map(|(x, y)| (session.frame.to_viewer(x), session.frame.to_viewer(y)))
        .collect();
    renderer.print_overlaps(first, second, &pairs)
}

fn cmd_layout(session: &Session, pretty: bool) -> anyhow::Result<()> {
    let layout = layout(session);
    let json = if pretty {
        serde_json::to_string_pretty(&layout)
    } else {
        serde_json::to_string(&layout)
    }
    .context("failed to serialize layout")?;
    println!("{json}");
    Ok(())
}

fn cmd_check(session: &Session, renderer: &Renderer) -> anyhow::Result<()> {
    renderer.print_issues("declared", session.declared.issues())?;
    renderer.print_issues("observed", session.observed.issues())?;

    let rejected = session.declared.issues().len() + session.observed.issues().len();
    if rejected > 0 {
        return Err(anyhow!("{rejected} declaration(s) rejected"));
    }
    println!(
        "{} declared, {} observed, all valid",
        session.declared.len(),
        session.observed.len()
    );
    Ok(())
}
