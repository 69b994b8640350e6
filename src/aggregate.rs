use chrono::{Datelike, NaiveDate};

use crate::classify::{classify, Status, Thresholds};
use crate::models::{AttendanceMap, ClassSummary, DayCounts, PeriodStats, StudentMonth, StudentRecord};
use crate::normalize::counts_for;

pub fn date_key(year: i32, month_index: u32, day: u32) -> String {
    format!("{}-{:02}-{:02}", year, month_index + 1, day)
}

/// Days in a zero-based month, taken as the day before the first of the next month.
/// Returns 0 for an index past December.
pub fn days_in_month(year: i32, month_index: u32) -> u32 {
    if month_index > 11 {
        return 0;
    }
    let (next_year, next_month) = if month_index == 11 {
        match year.checked_add(1) {
            Some(next) => (next, 1),
            None => return 0,
        }
    } else {
        (year, month_index + 2)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(0)
}

/// Sums days `1..=days_in_month` of the given month. Keys outside the month
/// are never read.
pub fn aggregate(map: &AttendanceMap, days_in_month: u32, month_index: u32, year: i32) -> PeriodStats {
    let counts: DayCounts = (1..=days_in_month)
        .map(|day| counts_for(map, &date_key(year, month_index, day)))
        .sum();
    PeriodStats::from(counts)
}

pub fn aggregate_month(map: &AttendanceMap, year: i32, month_index: u32) -> PeriodStats {
    aggregate(map, days_in_month(year, month_index), month_index, year)
}

/// Inclusive window. An inverted window is empty.
pub fn aggregate_range(map: &AttendanceMap, start: NaiveDate, end: NaiveDate) -> PeriodStats {
    let counts: DayCounts = start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| counts_for(map, &day.format("%Y-%m-%d").to_string()))
        .sum();
    PeriodStats::from(counts)
}

pub fn day_stats(map: &AttendanceMap, date: NaiveDate) -> PeriodStats {
    aggregate_range(map, date, date)
}

/// One date summed across every student in a class.
pub fn class_day_stats(students: &[StudentRecord], date: NaiveDate) -> PeriodStats {
    let key = date.format("%Y-%m-%d").to_string();
    let counts: DayCounts = students
        .iter()
        .map(|student| counts_for(&student.attendance, &key))
        .sum();
    PeriodStats::from(counts)
}

pub fn student_month(
    student: &StudentRecord,
    year: i32,
    month_index: u32,
    thresholds: &Thresholds,
) -> StudentMonth {
    let stats = aggregate_month(&student.attendance, year, month_index);
    StudentMonth {
        student_id: student.id,
        name: student.name.clone(),
        roll_no: student.roll_no.clone(),
        status: classify(stats.percentage, thresholds),
        stats,
    }
}

/// Class-wide view of a month. Students with no taken sessions are counted
/// in `total_students` but neither averaged nor banded.
pub fn summarize_class(months: &[StudentMonth]) -> ClassSummary {
    let mut summary = ClassSummary {
        total_students: months.len(),
        ..ClassSummary::default()
    };
    let mut percentage_sum = 0.0;

    for month in months.iter().filter(|month| month.stats.total > 0) {
        summary.students_with_records += 1;
        percentage_sum += month.stats.percentage;
        match month.status {
            Status::Excellent => summary.excellent += 1,
            Status::Good => summary.good += 1,
            Status::Moderate => summary.moderate += 1,
            Status::Risk => summary.at_risk += 1,
        }
    }

    if summary.students_with_records > 0 {
        summary.average_percentage = percentage_sum / summary.students_with_records as f64;
    }
    summary
}
