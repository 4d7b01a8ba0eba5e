use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::layout::{FrameLayout, HeatLayout, RowLayout, RowState};
use crate::presence::DayKind;
use crate::roster::RosterIssue;
use crate::window::TimeWindow;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    timeline_width: usize,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
            timeline_width: cfg.timeline_width()?,
        })
    }

    pub fn plain(timeline_width: usize) -> Self {
        Self {
            color: false,
            timeline_width,
        }
    }

    #[tracing::instrument(skip_all)]
    pub fn print_board(&self, layout: &FrameLayout) -> anyhow::Result<()> {
        self.write_board(io::stdout().lock(), layout)
    }

    pub fn write_board<W: Write>(&self, mut out: W, layout: &FrameLayout) -> anyhow::Result<()> {
        writeln!(out, "now {} (viewer clock)", layout.viewer_now)?;

        let headers = vec![
            "Name".to_string(),
            "GMT".to_string(),
            "State".to_string(),
            "Windows".to_string(),
            "Timeline".to_string(),
        ];

        let mut rows = Vec::with_capacity(layout.rows.len());
        for row in &layout.rows {
            let state = match row.state() {
                RowState::Online => self.paint("online", "32"),
                RowState::Maybe => self.paint("maybe", "33"),
                RowState::Offline => "offline".to_string(),
            };
            let windows = row
                .windows
                .iter()
                .map(|w| {
                    let mark = if w.uncertain { "?" } else { "" };
                    let text = format!("{}-{}{}", w.start, w.end, mark);
                    if w.highlighted { self.paint(&text, "1") } else { text }
                })
                .collect::<Vec<_>>()
                .join(" ");
            let name = if row.weekend {
                format!("{} (we)", row.name)
            } else {
                row.name.clone()
            };

            rows.push(vec![
                name,
                row.gmt_label.clone(),
                state,
                windows,
                timeline_bar(row, self.timeline_width),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, buckets))]
    pub fn print_heat(
        &self,
        name: &str,
        day: DayKind,
        buckets: &[HeatLayout],
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if buckets.is_empty() {
            writeln!(out, "{name}: no presence recorded ({day:?})")?;
            return Ok(());
        }

        let headers = vec![
            "From".to_string(),
            "To".to_string(),
            "Intensity".to_string(),
            "".to_string(),
        ];
        let rows = buckets
            .iter()
            .map(|b| {
                let bar = "#".repeat((b.intensity * 40.0).round() as usize);
                vec![
                    b.start.to_string(),
                    b.end.to_string(),
                    format!("{:.3}", b.intensity),
                    bar,
                ]
            })
            .collect();
        writeln!(out, "{name} ({day:?}, viewer clock)")?;
        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, pairs))]
    pub fn print_overlaps(
        &self,
        first: &str,
        second: &str,
        pairs: &[(TimeWindow, TimeWindow)],
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if pairs.is_empty() {
            writeln!(out, "{first} and {second} share no window today")?;
            return Ok(());
        }

        let headers = vec![first.to_string(), second.to_string()];
        let rows = pairs
            .iter()
            .map(|(a, b)| vec![span_text(a), span_text(b)])
            .collect();
        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    pub fn print_issues(&self, label: &str, issues: &[RosterIssue]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        for issue in issues {
            writeln!(
                out,
                "{label}:{}: {}\n    {}",
                issue.line,
                self.paint(&issue.error.to_string(), "31"),
                issue.source
            )?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn span_text(window: &TimeWindow) -> String {
    format!(
        "{}-{}{}",
        window.start(),
        window.end(),
        if window.is_uncertain() { " (uncertain)" } else { "" }
    )
}

/// One character per cell: `#` a window, `~` an uncertain window, `.:*`
/// rising heat, `|` the viewer's now.
pub fn timeline_bar(row: &RowLayout, width: usize) -> String {
    let centre = width / 2;
    (0..width)
        .map(|cell| {
            if cell == centre {
                return '|';
            }
            let ratio = (cell as f64 + 0.5) / width as f64;
            let mut mark = ' ';
            for window in &row.windows {
                if window.segments.iter().any(|s| s.contains(ratio)) {
                    if !window.uncertain {
                        return '#';
                    }
                    mark = '~';
                }
            }
            if mark != ' ' {
                return mark;
            }
            row.heat
                .iter()
                .find(|h| h.segments.iter().any(|s| s.contains(ratio)))
                .map(|h| match h.intensity {
                    i if i < 0.15 => '.',
                    i if i < 0.35 => ':',
                    _ => '*',
                })
                .unwrap_or(' ')
        })
        .collect()
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone, Utc};

    use super::{Renderer, strip_ansi, timeline_bar};
    use crate::layout::Frame;
    use crate::presence::BucketWidth;
    use crate::schedule::PlayerSchedule;

    fn frame() -> Frame {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 18, 12, 0, 0)
            .single()
            .expect("valid now");
        Frame::new(now, FixedOffset::east_opt(0).expect("utc"))
    }

    #[test]
    fn bar_marks_windows_and_now() {
        let player = PlayerSchedule::parse("Ana, GMT, 00:00-05:59, u18:00-23:59").expect("valid");
        let row = frame().row(&player, None, BucketWidth::default());
        let bar = timeline_bar(&row, 24);

        assert_eq!(bar.chars().count(), 24);
        assert_eq!(bar.chars().nth(12), Some('|'));
        assert_eq!(bar.chars().nth(0), Some('#'));
        assert_eq!(bar.chars().nth(5), Some('#'));
        assert_eq!(bar.chars().nth(6), Some(' '));
        assert_eq!(bar.chars().nth(20), Some('~'));
    }

    #[test]
    fn board_lists_players_and_state() {
        let ana = PlayerSchedule::parse("Ana, GMT+1, 12:00-14:00").expect("valid");
        let bo = PlayerSchedule::parse("Bo, GMT-6, 20:00-22:00").expect("valid");
        let layout = frame().layout([(&ana, None), (&bo, None)], BucketWidth::default());

        let mut out = Vec::new();
        Renderer::plain(24)
            .write_board(&mut out, &layout)
            .expect("write board");
        let text = String::from_utf8(out).expect("utf8");

        assert!(text.starts_with("now 12:00"));
        let ana_line = text.lines().find(|l| l.starts_with("Ana")).expect("Ana row");
        assert!(ana_line.contains("GMT+1"));
        assert!(ana_line.contains("online"));
        assert!(ana_line.contains("11:00-13:00"));
        let bo_line = text.lines().find(|l| l.starts_with("Bo")).expect("Bo row");
        assert!(bo_line.contains("offline"));
        assert!(bo_line.contains("02:00-04:00"));
    }

    #[test]
    fn strips_colour_codes() {
        assert_eq!(strip_ansi("\x1b[32monline\x1b[0m"), "online");
    }
}
