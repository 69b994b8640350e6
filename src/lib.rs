//! Attendance aggregation for class registers: decodes stored day entries in
//! every historical shape, sums them over a month or date window and bands the
//! resulting percentage against per-class thresholds.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod db;
pub mod models;
pub mod normalize;
pub mod report;

pub use aggregate::{aggregate, aggregate_month, aggregate_range, days_in_month};
pub use classify::{classify, Status, ThresholdOverrides, Thresholds};
pub use models::{AttendanceMap, AttendanceMark, DayCounts, DayEntry, PeriodStats};
pub use normalize::normalize;
