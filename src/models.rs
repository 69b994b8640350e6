use std::collections::BTreeMap;
use std::fmt;
use std::ops::Add;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::classify::{Status, ThresholdOverrides};

/// The mark given to a student for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttendanceMark {
    Present,
    Absent,
    Late,
}

impl AttendanceMark {
    /// Accepts the stored single-letter codes and the full words, in any case.
    pub fn from_code(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "p" | "present" => Some(AttendanceMark::Present),
            "a" | "absent" => Some(AttendanceMark::Absent),
            "l" | "late" => Some(AttendanceMark::Late),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            AttendanceMark::Present => "P",
            AttendanceMark::Absent => "A",
            AttendanceMark::Late => "L",
        }
    }
}

impl fmt::Display for AttendanceMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for AttendanceMark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for AttendanceMark {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        AttendanceMark::from_code(&raw)
            .ok_or_else(|| de::Error::custom(format!("unknown attendance mark `{raw}`")))
    }
}

/// One roll-call within a day. A slot without a mark has not been taken yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSlot {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, alias = "mark", deserialize_with = "lenient_mark")]
    pub status: Option<AttendanceMark>,
}

fn lenient_mark<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<AttendanceMark>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(|value| value.as_str())
        .and_then(AttendanceMark::from_code))
}

/// Ids have been stored as numbers; anything that is not text or a number becomes empty.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(text)) => text,
        Some(serde_json::Value::Number(number)) => number.to_string(),
        _ => String::new(),
    })
}

/// The stored value for a single date. Variants follow the order the schema
/// grew in; all of them stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DayEntry {
    /// A bare mark: one session.
    Scalar(AttendanceMark),
    /// Independently marked sessions.
    Sessions {
        sessions: Vec<SessionSlot>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_at: Option<String>,
    },
    /// `count` sessions sharing one mark.
    Counted {
        #[serde(alias = "mark")]
        status: AttendanceMark,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<i64>,
    },
    /// Anything else found in storage. Contributes nothing.
    Unrecognized(serde_json::Value),
}

impl DayEntry {
    pub fn counted(mark: AttendanceMark, count: i64) -> Self {
        DayEntry::Counted {
            status: mark,
            count: Some(count),
        }
    }

    /// Builds the session form with generated ids (`s1`, `s2`, ...).
    pub fn sessions_from_marks(marks: &[Option<AttendanceMark>], updated_at: Option<String>) -> Self {
        let sessions = marks
            .iter()
            .enumerate()
            .map(|(idx, mark)| SessionSlot {
                id: format!("s{}", idx + 1),
                name: format!("Session {}", idx + 1),
                status: *mark,
            })
            .collect();
        DayEntry::Sessions {
            sessions,
            updated_at,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, DayEntry::Unrecognized(_))
    }
}

/// Date key (`YYYY-MM-DD`) to entry. `None` is a stored `null`.
pub type AttendanceMap = BTreeMap<String, Option<DayEntry>>;

/// Decodes a stored attendance object. Non-object values yield an empty map.
pub fn attendance_from_value(value: serde_json::Value) -> AttendanceMap {
    match value {
        serde_json::Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
        _ => AttendanceMap::new(),
    }
}

pub fn unrecognized_entries(map: &AttendanceMap) -> usize {
    map.values()
        .flatten()
        .filter(|entry| !entry.is_recognized())
        .count()
}

/// Session-level counts for one day or a whole window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayCounts {
    pub present: u64,
    pub absent: u64,
    pub late: u64,
}

impl DayCounts {
    pub fn of(mark: AttendanceMark, sessions: u64) -> Self {
        let mut counts = DayCounts::default();
        counts.record(mark, sessions);
        counts
    }

    pub fn record(&mut self, mark: AttendanceMark, sessions: u64) {
        match mark {
            AttendanceMark::Present => self.present = self.present.saturating_add(sessions),
            AttendanceMark::Absent => self.absent = self.absent.saturating_add(sessions),
            AttendanceMark::Late => self.late = self.late.saturating_add(sessions),
        }
    }

    /// Saturates rather than wrapping on absurd stored counts.
    pub fn total(&self) -> u64 {
        self.present
            .saturating_add(self.absent)
            .saturating_add(self.late)
    }
}

impl Add for DayCounts {
    type Output = DayCounts;

    fn add(self, other: DayCounts) -> DayCounts {
        DayCounts {
            present: self.present.saturating_add(other.present),
            absent: self.absent.saturating_add(other.absent),
            late: self.late.saturating_add(other.late),
        }
    }
}

impl std::iter::Sum for DayCounts {
    fn sum<I: Iterator<Item = DayCounts>>(iter: I) -> Self {
        iter.fold(DayCounts::default(), Add::add)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodStats {
    pub present: u64,
    pub absent: u64,
    pub late: u64,
    pub total: u64,
    pub percentage: f64,
}

impl From<DayCounts> for PeriodStats {
    fn from(counts: DayCounts) -> Self {
        let total = counts.total();
        let percentage = if total > 0 {
            counts.present.saturating_add(counts.late) as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        PeriodStats {
            present: counts.present,
            absent: counts.absent,
            late: counts.late,
            total,
            percentage,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassRecord {
    pub id: Uuid,
    pub name: String,
    pub class_code: String,
    pub thresholds: Option<ThresholdOverrides>,
}

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: Uuid,
    pub class_id: Uuid,
    pub name: String,
    pub roll_no: String,
    pub attendance: AttendanceMap,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentMonth {
    pub student_id: Uuid,
    pub name: String,
    pub roll_no: String,
    pub stats: PeriodStats,
    pub status: Status,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassSummary {
    pub total_students: usize,
    pub students_with_records: usize,
    pub average_percentage: f64,
    pub excellent: usize,
    pub good: usize,
    pub moderate: usize,
    pub at_risk: usize,
}
