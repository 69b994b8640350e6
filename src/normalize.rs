use crate::models::{AttendanceMap, DayCounts, DayEntry};

/// Reduces one stored day to session counts. Missing and unrecognized
/// entries count for nothing.
pub fn normalize(entry: Option<&DayEntry>) -> DayCounts {
    let Some(entry) = entry else {
        return DayCounts::default();
    };

    match entry {
        DayEntry::Scalar(mark) => DayCounts::of(*mark, 1),
        DayEntry::Counted { status, count } => DayCounts::of(*status, session_count(*count)),
        DayEntry::Sessions { sessions, .. } => {
            let mut counts = DayCounts::default();
            for mark in sessions.iter().filter_map(|session| session.status) {
                counts.record(mark, 1);
            }
            counts
        }
        DayEntry::Unrecognized(_) => DayCounts::default(),
    }
}

fn session_count(count: Option<i64>) -> u64 {
    match count {
        Some(n) if n > 0 => n as u64,
        _ => 1,
    }
}

/// Counts for the entry stored under `date_key`, treating a stored `null` as absent.
pub fn counts_for(map: &AttendanceMap, date_key: &str) -> DayCounts {
    normalize(map.get(date_key).and_then(Option::as_ref))
}

/// Register cell text: `P`, `P(3)` when every session shares a mark,
/// `2P/1A` for mixed days, empty when nothing was taken.
pub fn day_label(counts: &DayCounts) -> String {
    let parts: Vec<(u64, &str)> = [
        (counts.present, "P"),
        (counts.absent, "A"),
        (counts.late, "L"),
    ]
    .into_iter()
    .filter(|(n, _)| *n > 0)
    .collect();

    match parts.as_slice() {
        [] => String::new(),
        [(1, code)] => code.to_string(),
        [(n, code)] => format!("{code}({n})"),
        _ => parts
            .iter()
            .map(|(n, code)| format!("{n}{code}"))
            .collect::<Vec<_>>()
            .join("/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{attendance_from_value, AttendanceMark, SessionSlot};
    use serde_json::json;

    fn slot(id: &str, status: Option<AttendanceMark>) -> SessionSlot {
        SessionSlot {
            id: id.to_string(),
            name: id.to_uppercase(),
            status,
        }
    }

    #[test]
    fn missing_entry_is_zero() {
        assert_eq!(normalize(None), DayCounts::default());
    }

    #[test]
    fn scalar_marks_are_one_session() {
        assert_eq!(
            normalize(Some(&DayEntry::Scalar(AttendanceMark::Present))),
            DayCounts { present: 1, absent: 0, late: 0 }
        );
        assert_eq!(
            normalize(Some(&DayEntry::Scalar(AttendanceMark::Absent))),
            DayCounts { present: 0, absent: 1, late: 0 }
        );
        assert_eq!(
            normalize(Some(&DayEntry::Scalar(AttendanceMark::Late))),
            DayCounts { present: 0, absent: 0, late: 1 }
        );
    }

    #[test]
    fn all_formats_agree_on_a_single_present() {
        let expected = DayCounts { present: 1, absent: 0, late: 0 };
        let scalar = DayEntry::Scalar(AttendanceMark::Present);
        let counted = DayEntry::counted(AttendanceMark::Present, 1);
        let sessions = DayEntry::Sessions {
            sessions: vec![slot("s1", Some(AttendanceMark::Present))],
            updated_at: None,
        };

        assert_eq!(normalize(Some(&scalar)), expected);
        assert_eq!(normalize(Some(&counted)), expected);
        assert_eq!(normalize(Some(&sessions)), expected);
    }

    #[test]
    fn counted_entries_multiply() {
        let entry = DayEntry::counted(AttendanceMark::Absent, 3);
        assert_eq!(
            normalize(Some(&entry)),
            DayCounts { present: 0, absent: 3, late: 0 }
        );
    }

    #[test]
    fn non_positive_counts_mean_one_session() {
        for count in [None, Some(0), Some(-4)] {
            let entry = DayEntry::Counted {
                status: AttendanceMark::Late,
                count,
            };
            assert_eq!(normalize(Some(&entry)).late, 1, "count {count:?}");
        }
    }

    #[test]
    fn unmarked_sessions_are_skipped() {
        let entry = DayEntry::Sessions {
            sessions: vec![
                slot("s1", Some(AttendanceMark::Present)),
                slot("s2", None),
                slot("s3", Some(AttendanceMark::Absent)),
            ],
            updated_at: None,
        };
        let counts = normalize(Some(&entry));
        assert_eq!(counts, DayCounts { present: 1, absent: 1, late: 0 });
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn unrecognized_shapes_are_zero() {
        let entry = DayEntry::Unrecognized(json!({"foo": 1}));
        assert_eq!(normalize(Some(&entry)), DayCounts::default());
    }

    #[test]
    fn stored_nulls_count_for_nothing() {
        let map = attendance_from_value(json!({"2024-03-05": null, "2024-03-06": "L"}));
        assert_eq!(counts_for(&map, "2024-03-05"), DayCounts::default());
        assert_eq!(counts_for(&map, "2024-03-06").late, 1);
        assert_eq!(counts_for(&map, "2024-03-07"), DayCounts::default());
    }

    #[test]
    fn labels_follow_register_conventions() {
        assert_eq!(day_label(&DayCounts::default()), "");
        assert_eq!(day_label(&DayCounts { present: 1, absent: 0, late: 0 }), "P");
        assert_eq!(day_label(&DayCounts { present: 3, absent: 0, late: 0 }), "P(3)");
        assert_eq!(day_label(&DayCounts { present: 0, absent: 0, late: 2 }), "L(2)");
        assert_eq!(day_label(&DayCounts { present: 2, absent: 1, late: 0 }), "2P/1A");
        assert_eq!(day_label(&DayCounts { present: 0, absent: 1, late: 1 }), "1A/1L");
    }
}
