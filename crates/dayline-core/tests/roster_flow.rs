use chrono::{FixedOffset, TimeZone, Utc};
use dayline_core::layout::{Frame, RowState};
use dayline_core::roster::{Roster, SortOrder};
use dayline_core::{BucketWidth, DayKind, PlayerSchedule, TimeOfDay};
use tempfile::tempdir;

const DECLARED: &str = "\
# name, home offset, windows
Mia, GMT+1, 19:00-23:30, u12:00-13:00
Bob, EST+5, 10:00-12:00
Kai, GMT-4, 14:00-19:00, we10:00-22:00
Zoe, GMT+9, 22:00-02:00
";

const OBSERVED: &str = "\
Mia, GMT+1, 60, 18 x 0, 2 x 5, 4 x 0, we, 24 x 0
Kai, GMT-4, 30, 40 x 0, 4 x 2, 4 x 0, we, 48 x 1
Zoe, GMT+9, 60, 24 x 0, 24 x 0
";

#[test]
fn roster_files_load_and_lay_out() {
    let temp = tempdir().expect("tempdir");
    let declared_path = temp.path().join("declared.txt");
    let observed_path = temp.path().join("observed.txt");
    std::fs::write(&declared_path, DECLARED).expect("write declared");
    std::fs::write(&observed_path, OBSERVED).expect("write observed");

    let declared = Roster::load(&declared_path).expect("load declared");
    let observed = Roster::load(&observed_path).expect("load observed");

    // Bob's missing GMT prefix is isolated; everyone else is intact.
    assert_eq!(declared.len(), 3);
    assert_eq!(declared.issues().len(), 1);
    assert!(declared.issues()[0].error.is_format());
    let mia = PlayerSchedule::parse("Mia, GMT+1, 19:00-23:30, u12:00-13:00").expect("valid");
    assert_eq!(declared.find("Mia"), Some(&mia));

    // Zoe's observed line has no weekend marker, so both runs land in the weekday array.
    assert_eq!(observed.len(), 2);
    assert!(observed.issues()[0].error.is_range());

    // Wednesday 2026-02-18, 19:00 UTC, viewer at GMT+1 (20:00 local).
    let now = Utc
        .with_ymd_and_hms(2026, 2, 18, 19, 0, 0)
        .single()
        .expect("valid now");
    let frame = Frame::new(now, FixedOffset::east_opt(3600).expect("offset"));
    assert_eq!(frame.viewer_now(), TimeOfDay::from_hm(20, 0));

    let rows = declared.rows(&observed, SortOrder::Gmt, 1);
    let layout = frame.layout(rows, BucketWidth::new(60).expect("width"));
    let names: Vec<_> = layout.rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Mia", "Kai", "Zoe"]);

    let mia = &layout.rows[0];
    assert_eq!(mia.state(), RowState::Online);
    assert_eq!(mia.windows.len(), 2);
    assert_eq!(mia.heat.len(), 2);
    assert_eq!(mia.heat[0].start.to_string(), "19:00");

    let kai = &layout.rows[1];
    assert!(!kai.weekend);
    assert_eq!(kai.windows.len(), 1);
    assert_eq!(kai.state(), RowState::Online);
    assert_eq!(kai.heat.len(), 2);

    let zoe = &layout.rows[2];
    assert_eq!(zoe.state(), RowState::Offline);
    assert!(zoe.heat.is_empty());
}

#[test]
fn weekend_heat_is_selected_per_player() {
    let observed = Roster::parse_lines("Kai, GMT-4, 30, 40 x 0, 4 x 2, 4 x 0, we, 48 x 1");
    let kai = observed.find("Kai").expect("Kai");

    // Saturday 02:00 UTC is still Friday evening at GMT-4.
    let now = Utc
        .with_ymd_and_hms(2026, 2, 21, 2, 0, 0)
        .single()
        .expect("valid now");
    assert_eq!(kai.day_kind_at(now), DayKind::Weekday);

    let presence = kai.presence().expect("detailed");
    let weekend = presence.buckets(BucketWidth::new(120).expect("width"), DayKind::Weekend);
    assert_eq!(weekend.len(), 12);
    assert!(weekend.iter().all(|b| (b.intensity - 0.5).abs() < 1e-12));
}
