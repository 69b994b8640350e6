use anyhow::Context;
use chrono::NaiveDate;
use serde_json::json;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::classify::ThresholdOverrides;
use crate::models::{
    attendance_from_value, unrecognized_entries, AttendanceMark, ClassRecord, DayEntry,
    StudentRecord,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let classes = vec![
        (
            Uuid::parse_str("5b8e2f0c-6a43-4c1e-9f6d-0d2a9e1c7b41")?,
            "Physics 101",
            "PHY101",
            json!({}),
        ),
        (
            Uuid::parse_str("a7c3d9e2-1f58-4b6a-8e0d-3c4b5a6d7e8f")?,
            "World History",
            "HIS201",
            json!({"excellent": 90, "good": 80, "moderate": 70, "atRisk": 70}),
        ),
    ];

    for (id, name, class_code, thresholds) in classes {
        sqlx::query(
            r#"
            INSERT INTO attendsheets.classes (id, name, class_code, thresholds)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (class_code) DO UPDATE
            SET name = EXCLUDED.name, thresholds = EXCLUDED.thresholds
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(class_code)
        .bind(Json(thresholds))
        .execute(pool)
        .await?;
    }

    let students = vec![
        (
            "PHY101",
            "Avery Lee",
            "01",
            json!({
                "2024-02-01": "P",
                "2024-02-02": "A",
                "2024-02-03": {"status": "L", "count": 2}
            }),
        ),
        (
            "PHY101",
            "Jules Moreno",
            "02",
            json!({
                "2024-02-01": {"status": "P", "count": 3},
                "2024-02-02": {"sessions": [
                    {"id": "s1", "name": "Morning", "status": "P"},
                    {"id": "s2", "name": "Afternoon", "status": "P"}
                ]}
            }),
        ),
        (
            "HIS201",
            "Kiara Patel",
            "01",
            json!({
                "2024-03-05": {"sessions": [
                    {"id": "s1", "name": "S1", "status": "P"},
                    {"id": "s2", "name": "S2", "status": null},
                    {"id": "s3", "name": "S3", "status": "A"}
                ]}
            }),
        ),
    ];

    for (class_code, name, roll_no, attendance) in students {
        let class_id: Uuid =
            sqlx::query("SELECT id FROM attendsheets.classes WHERE class_code = $1")
                .bind(class_code)
                .fetch_one(pool)
                .await?
                .get("id");

        sqlx::query(
            r#"
            INSERT INTO attendsheets.class_students (id, class_id, name, roll_no, attendance)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (class_id, roll_no) DO UPDATE
            SET name = EXCLUDED.name, attendance = EXCLUDED.attendance
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(class_id)
        .bind(name)
        .bind(roll_no)
        .bind(Json(attendance))
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_class(pool: &PgPool, class_code: &str) -> anyhow::Result<ClassRecord> {
    let row = sqlx::query(
        "SELECT id, name, class_code, thresholds FROM attendsheets.classes WHERE class_code = $1",
    )
    .bind(class_code)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no class with code {class_code}"))?;

    let thresholds: Json<serde_json::Value> = row.get("thresholds");
    Ok(ClassRecord {
        id: row.get("id"),
        name: row.get("name"),
        class_code: row.get("class_code"),
        thresholds: ThresholdOverrides::from_stored(&thresholds.0),
    })
}

pub async fn fetch_students(pool: &PgPool, class: &ClassRecord) -> anyhow::Result<Vec<StudentRecord>> {
    let rows = sqlx::query(
        "SELECT id, class_id, name, roll_no, attendance \
         FROM attendsheets.class_students \
         WHERE class_id = $1 \
         ORDER BY roll_no, name",
    )
    .bind(class.id)
    .fetch_all(pool)
    .await?;

    let mut students = Vec::with_capacity(rows.len());
    for row in rows {
        let attendance: Json<serde_json::Value> = row.get("attendance");
        let student = StudentRecord {
            id: row.get("id"),
            class_id: row.get("class_id"),
            name: row.get("name"),
            roll_no: row.get("roll_no"),
            attendance: attendance_from_value(attendance.0),
        };

        let skipped = unrecognized_entries(&student.attendance);
        if skipped > 0 {
            log::warn!(
                "{} ({}) has {} unrecognized attendance entries; they count as no sessions",
                student.name,
                class.class_code,
                skipped
            );
        }
        students.push(student);
    }

    log::debug!("loaded {} students for {}", students.len(), class.class_code);
    Ok(students)
}

async fn upsert_student(pool: &PgPool, class_id: Uuid, name: &str, roll_no: &str) -> anyhow::Result<Uuid> {
    let id = sqlx::query(
        r#"
        INSERT INTO attendsheets.class_students (id, class_id, name, roll_no)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (class_id, roll_no) DO UPDATE
        SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(class_id)
    .bind(name)
    .bind(roll_no)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

async fn set_day_entry(pool: &PgPool, student_id: Uuid, date: NaiveDate, entry: &DayEntry) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE attendsheets.class_students
        SET attendance = COALESCE(attendance, '{}'::jsonb) || jsonb_build_object($2::text, $3::jsonb)
        WHERE id = $1
        "#,
    )
    .bind(student_id)
    .bind(date.format("%Y-%m-%d").to_string())
    .bind(Json(entry))
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Rows of `name,roll_no,date,status[,count]`. A count above one stores the
/// counted form, otherwise a bare mark.
pub async fn import_csv(pool: &PgPool, class: &ClassRecord, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        name: String,
        roll_no: String,
        date: NaiveDate,
        status: String,
        count: Option<i64>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut written = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("bad row {}", line + 2))?;
        let mark = AttendanceMark::from_code(&row.status)
            .with_context(|| format!("row {}: unknown status `{}`", line + 2, row.status))?;
        let entry = match row.count {
            Some(count) if count > 1 => DayEntry::counted(mark, count),
            _ => DayEntry::Scalar(mark),
        };

        let student_id = upsert_student(pool, class.id, &row.name, &row.roll_no).await?;
        written += set_day_entry(pool, student_id, row.date, &entry).await? as usize;
    }

    log::info!("imported {written} attendance entries into {}", class.class_code);
    Ok(written)
}

/// Stores a day in session form, replacing whatever that date held before.
pub async fn record_sessions(
    pool: &PgPool,
    class: &ClassRecord,
    roll_no: &str,
    date: NaiveDate,
    marks: &[Option<AttendanceMark>],
) -> anyhow::Result<DayEntry> {
    let student_id: Uuid = sqlx::query(
        "SELECT id FROM attendsheets.class_students WHERE class_id = $1 AND roll_no = $2",
    )
    .bind(class.id)
    .bind(roll_no)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no student with roll number {roll_no} in {}", class.class_code))?
    .get("id");

    let entry = DayEntry::sessions_from_marks(marks, Some(chrono::Utc::now().to_rfc3339()));
    set_day_entry(pool, student_id, date, &entry).await?;
    log::debug!("recorded {} sessions for {roll_no} on {date}", marks.len());
    Ok(entry)
}
