//! Tests for schema types.

use chrono::Duration;

use super::*;
use crate::error::TrackingError;

const DELIVERY_YAML: &str = r#"
name: Delivery
milestones:
  - name: ANC 1
    data:
      visit: antenatal
    windows:
      earliest_start: { start: 0, end: 6w }
      due: { start: 6w, end: 8w }
      late: { start: 8w, end: 10w }
      max: { start: 10w, end: 12w }
  - name: ANC 2
    windows:
      due: { start: 0, end: 2w }
      max: { start: 2w, end: 4w }
  - name: Delivery
    windows:
      earliest_start: { start: "0", end: 1d12h }
"#;

fn delivery() -> ScheduleDefinition {
    serde_yaml::from_str(DELIVERY_YAML).unwrap()
}

fn milestones(n: usize) -> Vec<Milestone> {
    (1..=n)
        .map(|i| Milestone::contiguous_days(format!("M{}", i), 1, 2, 3, 4))
        .collect()
}

// -- Deserialization ---------------------------------------------------

#[test]
fn parse_schedule_yaml() {
    let schedule = delivery();
    assert_eq!(schedule.name(), "Delivery");
    assert_eq!(schedule.len(), 3);

    let anc1 = schedule.milestone("ANC 1").unwrap();
    assert_eq!(anc1.data.get("visit").map(String::as_str), Some("antenatal"));
    assert_eq!(
        anc1.window(WindowName::Due),
        Some(&Window::new(Duration::weeks(6), Duration::weeks(8)))
    );
    assert_eq!(anc1.last_window(), Some(WindowName::Max));

    let anc2 = schedule.milestone("ANC 2").unwrap();
    assert!(!anc2.has_window(WindowName::EarliestStart));
    assert!(!anc2.has_window(WindowName::Late));

    let last = schedule.milestone("Delivery").unwrap();
    assert_eq!(
        last.window(WindowName::EarliestStart).unwrap().end,
        Duration::days(1) + Duration::hours(12)
    );
}

#[test]
fn deserialization_runs_validation() {
    let yaml = r#"
name: Broken
milestones:
  - name: M1
    windows:
      due: { start: 2w, end: 1w }
"#;
    let err = serde_yaml::from_str::<ScheduleDefinition>(yaml).unwrap_err();
    assert!(err.to_string().contains("Invalid schedule 'Broken'"));
}

#[test]
fn rejects_unknown_window_names() {
    let yaml = r#"
name: Broken
milestones:
  - name: M1
    windows:
      overdue: { start: 0, end: 1w }
"#;
    assert!(serde_yaml::from_str::<ScheduleDefinition>(yaml).is_err());
}

#[test]
fn serializes_back_to_compact_offsets() {
    let json = serde_json::to_value(delivery()).unwrap();
    assert_eq!(json["milestones"][0]["windows"]["due"]["start"], "6w");
    assert_eq!(json["milestones"][2]["windows"]["earliest_start"]["end"], "1d12h");
}

// -- Validation --------------------------------------------------------

#[test]
fn rejects_empty_schedule() {
    let err = ScheduleDefinition::new("Empty", vec![]).unwrap_err();
    assert_eq!(
        err,
        TrackingError::InvalidSchedule {
            schedule: "Empty".to_string(),
            reason: "schedule has no milestones".to_string(),
        }
    );
}

#[test]
fn rejects_duplicate_milestone_names() {
    let err = ScheduleDefinition::new(
        "Dup",
        vec![
            Milestone::contiguous_days("Same", 1, 2, 3, 4),
            Milestone::contiguous_days("Same", 1, 2, 3, 4),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, TrackingError::InvalidSchedule { ref reason, .. } if reason.contains("duplicate")));
}

#[test]
fn rejects_milestone_without_windows() {
    let err = ScheduleDefinition::new("Bare", vec![Milestone::new("M1")]).unwrap_err();
    assert!(matches!(err, TrackingError::InvalidSchedule { ref reason, .. } if reason.contains("no windows")));
}

#[test]
fn rejects_reversed_window_with_first_violation() {
    let err = ScheduleDefinition::new(
        "Reversed",
        vec![
            Milestone::new("M1").with_window(WindowName::Due, Window::days(3, 1)),
            Milestone::new("M1").with_window(WindowName::Due, Window::days(1, 3)),
        ],
    )
    .unwrap_err();
    match err {
        TrackingError::InvalidSchedule { reason, .. } => {
            assert!(reason.contains("window 'due' of milestone 'M1'"), "{}", reason);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn windows_need_not_be_contiguous() {
    let milestone = Milestone::new("Gaps")
        .with_window(WindowName::EarliestStart, Window::days(0, 2))
        .with_window(WindowName::Late, Window::days(5, 5));
    assert!(ScheduleDefinition::new("Gaps", vec![milestone]).is_ok());
}

// -- Navigation --------------------------------------------------------

#[test]
fn next_milestone_walks_to_the_end() {
    for n in 1..=6 {
        let schedule = ScheduleDefinition::new("Walk", milestones(n)).unwrap();
        let mut current = schedule.first_milestone();
        for _ in 0..n - 1 {
            current = schedule.next_milestone(&current.name).unwrap().unwrap();
        }
        assert_eq!(current.name, schedule.last_milestone().name);
        assert!(schedule.is_last(&current.name));
        assert!(schedule.next_milestone(&current.name).unwrap().is_none());
    }
}

#[test]
fn lookup_of_unknown_milestone_fails() {
    let schedule = delivery();
    assert!(matches!(
        schedule.milestone("ANC 9"),
        Err(TrackingError::UnknownMilestone { .. })
    ));
    assert!(schedule.next_milestone("ANC 9").is_err());
    assert_eq!(schedule.position("ANC 2"), Some(1));
}

#[test]
fn window_name_parsing() {
    assert_eq!("due".parse::<WindowName>().unwrap(), WindowName::Due);
    assert_eq!("EARLIEST_START".parse::<WindowName>().unwrap(), WindowName::EarliestStart);
    assert!("soon".parse::<WindowName>().is_err());
    assert!(WindowName::Max > WindowName::Late);
    assert!(WindowName::Due > WindowName::EarliestStart);
}
