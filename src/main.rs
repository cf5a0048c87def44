use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

mod calendar;
mod config;
mod coords;
mod db;
mod logging;
mod models;
mod report;
mod schedule;

use calendar::MonthCursor;
use models::{Course, SessionDefinition, SessionRow};

#[derive(Parser)]
#[command(name = "gym-schedule")]
#[command(about = "Course calendar and location tools for the gym admin console", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample courses, sessions and a location
    Seed,
    /// Import course sessions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List the sessions on one day
    Day {
        /// Local calendar date, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Read sessions from an admin API JSON export instead of the database
        #[arg(long)]
        sessions_json: Option<PathBuf>,
        /// Course export used for titles of untitled sessions in a JSON export
        #[arg(long, requires = "sessions_json")]
        courses_json: Option<PathBuf>,
    },
    /// Print a month view with session days marked
    Calendar {
        #[arg(long)]
        year: Option<i32>,
        /// Month number, 1-12
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        #[arg(long)]
        sessions_json: Option<PathBuf>,
    },
    /// Write a markdown month schedule
    Report {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        #[arg(long, default_value = "schedule.md")]
        out: PathBuf,
        #[arg(long)]
        sessions_json: Option<PathBuf>,
        #[arg(long, requires = "sessions_json")]
        courses_json: Option<PathBuf>,
    },
    /// Print the raw month grid cells
    Grid {
        #[arg(long)]
        year: i32,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },
    /// Convert coordinates between DMS and decimal degrees
    Coord {
        #[command(subcommand)]
        command: CoordCommand,
    },
    /// Manage gym locations
    Locations {
        #[command(subcommand)]
        command: LocationCommand,
    },
}

#[derive(Subcommand)]
enum CoordCommand {
    /// Parse DMS or decimal text into decimal degrees
    Parse { text: String },
    /// Render decimal degrees as DMS
    #[command(allow_negative_numbers = true)]
    Format { latitude: f64, longitude: f64 },
}

#[derive(Subcommand)]
enum LocationCommand {
    /// List stored locations
    List,
    /// Add a location from DMS or decimal coordinates
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        coords: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let summary = db::import_sessions_csv(&pool, &csv).await?;
            if summary.rejected > 0 {
                warn!(rejected = summary.rejected, "some rows were not imported");
            }
            println!(
                "Inserted {} sessions from {} ({} already present, {} rejected).",
                summary.inserted,
                csv.display(),
                summary.duplicates,
                summary.rejected
            );
        }
        Commands::Day {
            date,
            sessions_json,
            courses_json,
        } => {
            let (sessions, courses) =
                load_sessions(sessions_json.as_deref(), courses_json.as_deref()).await?;
            let now = Local::now();
            let (date, mut matched) = match date {
                Some(date) => (date, schedule::sessions_on_date(&sessions, date)),
                None => (now.date_naive(), schedule::sessions_at(&sessions, &now)),
            };
            schedule::sort_by_start_time(&mut matched);

            if matched.is_empty() {
                println!("No sessions on {}.", date);
                return Ok(());
            }

            println!("Sessions on {} ({}):", date, date.format("%A"));
            for session in matched {
                println!("- {}", report::session_line(session, &courses));
            }
        }
        Commands::Calendar {
            year,
            month,
            sessions_json,
        } => {
            let cursor = resolve_month(year, month)?;
            let (sessions, _) = load_sessions(sessions_json.as_deref(), None).await?;
            let agenda = schedule::month_agenda(&sessions, cursor);
            print!("{}", report::render_month_grid(cursor, &agenda));
        }
        Commands::Report {
            year,
            month,
            out,
            sessions_json,
            courses_json,
        } => {
            let cursor = resolve_month(year, month)?;
            let (sessions, courses) =
                load_sessions(sessions_json.as_deref(), courses_json.as_deref()).await?;
            let report = report::build_month_report(cursor, &sessions, &courses);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Grid { year, month } => {
            let cells = calendar::generate(year, month - 1);
            for week in calendar::weeks(&cells) {
                let row: Vec<String> = week
                    .iter()
                    .map(|cell| match cell {
                        Some(date) => date.to_string(),
                        None => format!("{:^10}", "-"),
                    })
                    .collect();
                println!("{}", row.join(" "));
            }
        }
        Commands::Coord { command } => match command {
            CoordCommand::Parse { text } => {
                let coordinate = coords::parse(&text)?;
                println!("{}, {}", coordinate.latitude, coordinate.longitude);
            }
            CoordCommand::Format {
                latitude,
                longitude,
            } => {
                println!("{}", coords::format(latitude, longitude));
            }
        },
        Commands::Locations { command } => {
            let pool = connect().await?;
            match command {
                LocationCommand::List => {
                    let locations = db::fetch_locations(&pool).await?;
                    if locations.is_empty() {
                        println!("No locations stored.");
                    }
                    for location in locations {
                        println!(
                            "- {} [{}] ({:.6}, {:.6}){}",
                            location.name,
                            location.coordinate().to_dms(),
                            location.latitude,
                            location.longitude,
                            location
                                .address
                                .as_deref()
                                .map(|a| format!(" {}", a))
                                .unwrap_or_default()
                        );
                    }
                }
                LocationCommand::Add {
                    name,
                    address,
                    coords,
                } => {
                    let location =
                        db::insert_location(&pool, &name, address.as_deref(), &coords).await?;
                    println!(
                        "Saved {} at {}.",
                        location.name,
                        location.coordinate().to_dms()
                    );
                }
            }
        }
    }

    Ok(())
}

async fn connect() -> anyhow::Result<PgPool> {
    let config = config::Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    info!("connected to Postgres");
    Ok(pool)
}

async fn load_sessions(
    sessions_json: Option<&Path>,
    courses_json: Option<&Path>,
) -> anyhow::Result<(Vec<SessionDefinition>, Vec<Course>)> {
    if let Some(path) = sessions_json {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let sessions = records_from_json::<SessionDefinition, SessionRow>(&raw)
            .with_context(|| format!("failed to parse sessions in {}", path.display()))?;
        if sessions.rejected > 0 {
            warn!(rejected = sessions.rejected, "some session records were skipped");
        }
        info!(count = sessions.records.len(), "loaded sessions from export");

        let courses = match courses_json {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let courses = records_from_json::<Course, Course>(&raw)
                    .with_context(|| format!("failed to parse courses in {}", path.display()))?;
                if courses.rejected > 0 {
                    warn!(rejected = courses.rejected, "some course records were skipped");
                }
                courses.records
            }
            None => Vec::new(),
        };
        return Ok((sessions.records, courses));
    }

    let pool = connect().await?;
    let sessions = db::fetch_sessions(&pool).await?;
    let courses = db::fetch_courses(&pool).await?;
    Ok((sessions, courses))
}

struct ExportLoad<T> {
    records: Vec<T>,
    rejected: usize,
}

/// Reads a JSON array export record by record. A record that does not fit
/// the expected shape is logged and skipped; the rest still load.
fn records_from_json<T, R>(raw: &str) -> anyhow::Result<ExportLoad<T>>
where
    R: serde::de::DeserializeOwned,
    T: From<R>,
{
    let values: Vec<serde_json::Value> = serde_json::from_str(raw)?;
    let mut load = ExportLoad {
        records: Vec::with_capacity(values.len()),
        rejected: 0,
    };

    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<R>(value) {
            Ok(record) => load.records.push(T::from(record)),
            Err(err) => {
                warn!(record = index + 1, error = %err, "skipping export record");
                load.rejected += 1;
            }
        }
    }

    Ok(load)
}

fn resolve_month(year: Option<i32>, month: Option<u32>) -> anyhow::Result<MonthCursor> {
    let current = MonthCursor::containing(Local::now().date_naive());
    let year = year.unwrap_or(current.year);
    let month0 = month.map(|m| m - 1).unwrap_or(current.month0);
    MonthCursor::new(year, month0)
        .with_context(|| format!("no such month: {year}-{:02}", month0 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Recurrence;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn month_flag_is_one_based() {
        let cli = Cli::try_parse_from(["gym-schedule", "grid", "--year", "2024", "--month", "2"])
            .unwrap();
        match cli.command {
            Commands::Grid { year, month } => {
                assert_eq!(year, 2024);
                assert_eq!(calendar::generate(year, month - 1).iter().flatten().count(), 29);
            }
            _ => panic!("expected grid command"),
        }

        assert!(Cli::try_parse_from(["gym-schedule", "grid", "--year", "2024", "--month", "13"]).is_err());
    }

    #[test]
    fn coord_format_accepts_negative_values() {
        let cli = Cli::try_parse_from(["gym-schedule", "coord", "format", "-33.8688", "151.2093"])
            .unwrap();
        match cli.command {
            Commands::Coord {
                command: CoordCommand::Format {
                    latitude,
                    longitude,
                },
            } => {
                assert_eq!(latitude, -33.8688);
                assert_eq!(longitude, 151.2093);
            }
            _ => panic!("expected coord format command"),
        }
    }

    #[test]
    fn resolve_month_uses_explicit_values() {
        let cursor = resolve_month(Some(2024), Some(12)).unwrap();
        assert_eq!(cursor, MonthCursor { year: 2024, month0: 11 });
    }

    fn load_sessions_export(raw: &str) -> ExportLoad<SessionDefinition> {
        records_from_json::<SessionDefinition, SessionRow>(raw).unwrap()
    }

    #[test]
    fn json_export_becomes_session_definitions() {
        let raw = r#"[
            {
                "_id": "6601a7c3e2f94b1d8c5a0e31",
                "courseId": "6601a7c3e2f94b1d8c5a0e2f",
                "title": "Spin",
                "startTime": "06:30",
                "endTime": "07:15",
                "isRecurring": true,
                "dayOfWeek": 2,
                "specificDate": null
            },
            {
                "id": "b3d94f62-08ae-4c71-95e2-7fa1c60d3b88",
                "courseId": "6601a7c3e2f94b1d8c5a0e2f",
                "startTime": "10:00",
                "endTime": "11:00",
                "isRecurring": false,
                "specificDate": "not a date"
            }
        ]"#;
        let load = load_sessions_export(raw);
        assert_eq!(load.rejected, 0);
        let sessions = load.records;
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, "6601a7c3e2f94b1d8c5a0e31");
        assert_eq!(sessions[0].recurrence, Recurrence::Weekly { day_of_week: 2 });
        assert_eq!(
            sessions[1].recurrence,
            Recurrence::OneTime {
                specific_date: None
            }
        );

        // 2024-03-12 is a Tuesday; the malformed one-time record is skipped.
        let tuesday = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        let matched = schedule::sessions_on_date(&sessions, tuesday);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].title.as_deref(), Some("Spin"));
    }

    #[test]
    fn json_export_skips_records_that_do_not_fit() {
        let raw = r#"[
            {
                "_id": "6601a7c3e2f94b1d8c5a0e40",
                "courseId": "6601a7c3e2f94b1d8c5a0e2f",
                "startTime": "17:00",
                "endTime": "18:00",
                "isRecurring": true,
                "dayOfWeek": 2
            },
            {
                "_id": "6601a7c3e2f94b1d8c5a0e41",
                "courseId": "6601a7c3e2f94b1d8c5a0e2f",
                "startTime": "19:00",
                "endTime": "20:00",
                "isRecurring": true,
                "dayOfWeek": "2"
            }
        ]"#;
        let load = load_sessions_export(raw);
        assert_eq!(load.rejected, 1);
        assert_eq!(load.records.len(), 1);
        assert_eq!(load.records[0].id, "6601a7c3e2f94b1d8c5a0e40");
        assert_eq!(load.records[0].start_time, "17:00");
    }

    #[test]
    fn json_export_rejects_non_list() {
        assert!(records_from_json::<SessionDefinition, SessionRow>("{\"id\": 1}").is_err());
    }

    #[test]
    fn course_export_supplies_missing_session_titles() {
        let courses = records_from_json::<Course, Course>(
            r#"[
                {"_id": "6601a7c3e2f94b1d8c5a0e2f", "title": "Kettlebell Basics"},
                {"title": "No id"}
            ]"#,
        )
        .unwrap();
        assert_eq!(courses.rejected, 1);

        let sessions = load_sessions_export(
            r#"[{
                "_id": "6601a7c3e2f94b1d8c5a0e50",
                "courseId": "6601a7c3e2f94b1d8c5a0e2f",
                "startTime": "12:00",
                "endTime": "12:45",
                "isRecurring": true,
                "dayOfWeek": 5
            }]"#,
        );
        let line = report::session_line(&sessions.records[0], &courses.records);
        assert!(line.contains("Kettlebell Basics"), "{line}");
    }

    #[test]
    fn courses_json_needs_sessions_json() {
        assert!(Cli::try_parse_from(["gym-schedule", "day", "--courses-json", "courses.json"]).is_err());
        assert!(Cli::try_parse_from([
            "gym-schedule",
            "day",
            "--sessions-json",
            "sessions.json",
            "--courses-json",
            "courses.json",
        ])
        .is_ok());
    }
}
