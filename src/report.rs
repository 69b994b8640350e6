use std::fmt::Write;

use crate::aggregate::{date_key, days_in_month, student_month, summarize_class};
use crate::classify::{Status, Thresholds};
use crate::models::{ClassRecord, StudentMonth, StudentRecord};
use crate::normalize::{counts_for, day_label};

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

pub fn month_name(month_index: u32) -> &'static str {
    MONTH_NAMES.get(month_index as usize).copied().unwrap_or("Unknown")
}

pub fn student_months(
    students: &[StudentRecord],
    year: i32,
    month_index: u32,
    thresholds: &Thresholds,
) -> Vec<StudentMonth> {
    students
        .iter()
        .map(|student| student_month(student, year, month_index, thresholds))
        .collect()
}

pub fn build_report(
    class: &ClassRecord,
    students: &[StudentRecord],
    year: i32,
    month_index: u32,
    thresholds: &Thresholds,
) -> String {
    let months = student_months(students, year, month_index, thresholds);
    let summary = summarize_class(&months);

    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report: {} ({})", class.name, class.class_code);
    let _ = writeln!(output, "Generated for {} {}", month_name(month_index), year);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Summary");
    let _ = writeln!(
        output,
        "- {} students, {} with attendance recorded",
        summary.total_students, summary.students_with_records
    );
    let _ = writeln!(output, "- Average attendance {:.1}%", summary.average_percentage);
    let _ = writeln!(
        output,
        "- Excellent {} / Good {} / Moderate {} / At risk {}",
        summary.excellent, summary.good, summary.moderate, summary.at_risk
    );
    let _ = writeln!(
        output,
        "- Bands: excellent >= {}, good >= {}, moderate >= {}",
        thresholds.excellent, thresholds.good, thresholds.moderate
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students");

    if months.is_empty() {
        let _ = writeln!(output, "No students enrolled in this class.");
    } else {
        for month in months.iter() {
            if month.stats.total == 0 {
                let _ = writeln!(output, "- {} ({}): no sessions recorded", month.name, month.roll_no);
                continue;
            }
            let _ = writeln!(
                output,
                "- {} ({}): {:.1}% {} ({}P / {}A / {}L of {})",
                month.name,
                month.roll_no,
                month.stats.percentage,
                month.status,
                month.stats.present,
                month.stats.absent,
                month.stats.late,
                month.stats.total
            );
        }
    }

    let mut at_risk: Vec<&StudentMonth> = months
        .iter()
        .filter(|month| month.stats.total > 0 && month.status == Status::Risk)
        .collect();
    at_risk.sort_by(|a, b| {
        a.stats
            .percentage
            .partial_cmp(&b.stats.percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students At Risk");

    if at_risk.is_empty() {
        let _ = writeln!(output, "No students below {}% this month.", thresholds.moderate);
    } else {
        for month in at_risk {
            let _ = writeln!(
                output,
                "- {} ({}) at {:.1}%",
                month.name, month.roll_no, month.stats.percentage
            );
        }
    }

    output
}

/// Monthly register: one row per student, one column per day, then totals.
pub fn write_register<W: std::io::Write>(
    writer: W,
    students: &[StudentRecord],
    year: i32,
    month_index: u32,
    thresholds: &Thresholds,
) -> anyhow::Result<()> {
    let days = days_in_month(year, month_index);
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["Roll No".to_string(), "Name".to_string()];
    header.extend((1..=days).map(|day| day.to_string()));
    header.extend(
        ["Present", "Absent", "Late", "Total", "Percentage", "Status"]
            .iter()
            .map(|column| column.to_string()),
    );
    csv_writer.write_record(&header)?;

    for student in students {
        let month = student_month(student, year, month_index, thresholds);
        let mut record = vec![student.roll_no.clone(), student.name.clone()];
        record.extend(
            (1..=days).map(|day| day_label(&counts_for(&student.attendance, &date_key(year, month_index, day)))),
        );
        record.push(month.stats.present.to_string());
        record.push(month.stats.absent.to_string());
        record.push(month.stats.late.to_string());
        record.push(month.stats.total.to_string());
        record.push(format!("{:.1}", month.stats.percentage));
        record.push(month.status.label().to_string());
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance_from_value;
    use serde_json::json;
    use uuid::Uuid;

    fn sample_class() -> ClassRecord {
        ClassRecord {
            id: Uuid::nil(),
            name: "Physics 101".to_string(),
            class_code: "PHY101".to_string(),
            thresholds: None,
        }
    }

    fn sample_students() -> Vec<StudentRecord> {
        vec![
            StudentRecord {
                id: Uuid::new_v4(),
                class_id: Uuid::nil(),
                name: "Avery Lee".to_string(),
                roll_no: "01".to_string(),
                attendance: attendance_from_value(json!({
                    "2024-02-01": "P",
                    "2024-02-02": "A",
                    "2024-02-03": {"status": "L", "count": 2}
                })),
            },
            StudentRecord {
                id: Uuid::new_v4(),
                class_id: Uuid::nil(),
                name: "Jules Moreno".to_string(),
                roll_no: "02".to_string(),
                attendance: attendance_from_value(json!({
                    "2024-02-01": {"status": "P", "count": 3},
                    "2024-02-02": {"sessions": [
                        {"id": "s1", "name": "S1", "status": "P"},
                        {"id": "s2", "name": "S2", "status": "A"}
                    ]}
                })),
            },
            StudentRecord {
                id: Uuid::new_v4(),
                class_id: Uuid::nil(),
                name: "Kiara Patel".to_string(),
                roll_no: "03".to_string(),
                attendance: attendance_from_value(json!({})),
            },
        ]
    }

    #[test]
    fn report_lists_students_and_risk() {
        let report = build_report(&sample_class(), &sample_students(), 2024, 1, &Thresholds::default());

        assert!(report.starts_with("# Attendance Report: Physics 101 (PHY101)"));
        assert!(report.contains("Generated for February 2024"));
        assert!(report.contains("- 3 students, 2 with attendance recorded"));
        assert!(report.contains("- Avery Lee (01): 75.0% risk (1P / 1A / 2L of 4)"));
        assert!(report.contains("- Jules Moreno (02): 80.0% risk (4P / 1A / 0L of 5)"));
        assert!(report.contains("- Kiara Patel (03): no sessions recorded"));
        assert!(report.contains("- Avery Lee (01) at 75.0%"));
    }

    #[test]
    fn empty_class_report() {
        let report = build_report(&sample_class(), &[], 2024, 1, &Thresholds::default());
        assert!(report.contains("No students enrolled in this class."));
        assert!(report.contains("No students below 85% this month."));
    }

    #[test]
    fn register_uses_day_labels() {
        let mut buffer = Vec::new();
        write_register(&mut buffer, &sample_students(), 2024, 1, &Thresholds::default()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        let header: Vec<&str> = lines[0].split(',').collect();
        assert_eq!(header.len(), 2 + 29 + 6);
        assert_eq!(header[2], "1");
        assert_eq!(header[30], "29");

        let avery: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(&avery[..5], &["01", "Avery Lee", "P", "A", "L(2)"]);
        assert_eq!(&avery[31..], &["1", "1", "2", "4", "75.0", "risk"]);

        let jules: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(&jules[2..4], &["P(3)", "1P/1A"]);

        let kiara: Vec<&str> = lines[3].split(',').collect();
        assert_eq!(&kiara[31..], &["0", "0", "0", "0", "0.0", "risk"]);
    }

    #[test]
    fn month_names_cover_the_year() {
        assert_eq!(month_name(0), "January");
        assert_eq!(month_name(11), "December");
        assert_eq!(month_name(12), "Unknown");
    }
}
