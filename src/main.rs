use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;

use attendsheets_stats::aggregate::{class_day_stats, summarize_class};
use attendsheets_stats::classify::{ThresholdOverrides, Thresholds};
use attendsheets_stats::config::AppConfig;
use attendsheets_stats::db;
use attendsheets_stats::models::AttendanceMark;
use attendsheets_stats::normalize::{counts_for, day_label};
use attendsheets_stats::report;

#[derive(Parser)]
#[command(name = "attendsheets")]
#[command(about = "Attendance statistics and registers for Attendsheets classes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample classes and students
    Seed,
    /// Import attendance marks from a CSV file
    Import {
        #[arg(long)]
        class_code: String,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record a day of multi-session attendance for one student
    Record {
        #[arg(long)]
        class_code: String,
        #[arg(long)]
        roll_no: String,
        #[arg(long)]
        date: NaiveDate,
        /// Comma separated marks, `-` for a session not yet taken (e.g. P,A,-)
        #[arg(long)]
        sessions: String,
    },
    /// Print monthly statistics for every student in a class
    Stats {
        #[arg(long)]
        class_code: String,
        #[arg(long)]
        year: i32,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// Print one day of attendance across a class
    Day {
        #[arg(long)]
        class_code: String,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Write a monthly report
    Report {
        #[arg(long)]
        class_code: String,
        #[arg(long)]
        year: i32,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
        #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
        format: ReportFormat,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Markdown,
    Csv,
}

/// Adjusts the default bands used for classes without their own thresholds.
#[derive(Args)]
struct ThresholdArgs {
    #[arg(long)]
    excellent: Option<f64>,
    #[arg(long)]
    good: Option<f64>,
    #[arg(long)]
    moderate: Option<f64>,
}

impl ThresholdArgs {
    fn overrides(&self) -> ThresholdOverrides {
        ThresholdOverrides {
            excellent: self.excellent,
            good: self.good,
            moderate: self.moderate,
            at_risk: None,
        }
    }
}

fn parse_session_marks(raw: &str) -> anyhow::Result<Vec<Option<AttendanceMark>>> {
    raw.split(',')
        .map(str::trim)
        .map(|code| match code {
            "" | "-" => Ok(None),
            _ => AttendanceMark::from_code(code)
                .map(Some)
                .with_context(|| format!("unknown session mark `{code}`")),
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { class_code, csv } => {
            let class = db::fetch_class(&pool, &class_code).await?;
            let written = db::import_csv(&pool, &class, &csv).await?;
            println!("Wrote {written} attendance entries from {}.", csv.display());
        }
        Commands::Record {
            class_code,
            roll_no,
            date,
            sessions,
        } => {
            let marks = parse_session_marks(&sessions)?;
            let class = db::fetch_class(&pool, &class_code).await?;
            let entry = db::record_sessions(&pool, &class, &roll_no, date, &marks).await?;
            let counts = attendsheets_stats::normalize(Some(&entry));
            println!("Recorded {roll_no} on {date}: {}", day_label(&counts));
        }
        Commands::Stats {
            class_code,
            year,
            month,
            thresholds,
        } => {
            let config = config.with_overrides(&thresholds.overrides());
            let class = db::fetch_class(&pool, &class_code).await?;
            let students = db::fetch_students(&pool, &class).await?;
            let bands = Thresholds::resolve(class.thresholds.as_ref(), &config.default_thresholds);
            let months = report::student_months(&students, year, month - 1, &bands);

            if months.is_empty() {
                println!("No students enrolled in {}.", class.class_code);
                return Ok(());
            }

            println!("{} for {} {}:", class.name, report::month_name(month - 1), year);
            for entry in months.iter() {
                println!(
                    "- {} ({}) {:.1}% {} across {} sessions",
                    entry.name,
                    entry.roll_no,
                    entry.stats.percentage,
                    entry.status,
                    entry.stats.total
                );
            }

            let summary = summarize_class(&months);
            println!(
                "Average {:.1}% over {} students with records ({} at risk).",
                summary.average_percentage, summary.students_with_records, summary.at_risk
            );
        }
        Commands::Day { class_code, date } => {
            let class = db::fetch_class(&pool, &class_code).await?;
            let students = db::fetch_students(&pool, &class).await?;
            let key = date.format("%Y-%m-%d").to_string();

            for student in students.iter() {
                let label = day_label(&counts_for(&student.attendance, &key));
                println!(
                    "- {} ({}): {}",
                    student.name,
                    student.roll_no,
                    if label.is_empty() { "-" } else { label.as_str() }
                );
            }

            let stats = class_day_stats(&students, date);
            println!(
                "{} on {}: {}P / {}A / {}L, {:.1}% attending.",
                class.class_code, date, stats.present, stats.absent, stats.late, stats.percentage
            );
        }
        Commands::Report {
            class_code,
            year,
            month,
            format,
            out,
            thresholds,
        } => {
            let config = config.with_overrides(&thresholds.overrides());
            let class = db::fetch_class(&pool, &class_code).await?;
            let students = db::fetch_students(&pool, &class).await?;
            let bands = Thresholds::resolve(class.thresholds.as_ref(), &config.default_thresholds);

            match format {
                ReportFormat::Markdown => {
                    let text = report::build_report(&class, &students, year, month - 1, &bands);
                    std::fs::write(&out, text)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                }
                ReportFormat::Csv => {
                    let file = std::fs::File::create(&out)
                        .with_context(|| format!("failed to create {}", out.display()))?;
                    report::write_register(file, &students, year, month - 1, &bands)?;
                }
            }
            log::info!("{} report for {} written", class.class_code, out.display());
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
