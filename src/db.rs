use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::coords;
use crate::models::{parse_specific_date, Course, Location, Recurrence, SessionDefinition};
use crate::schedule::validate_time;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let courses = vec![
        (
            Uuid::parse_str("9c4e2a17-d35b-4f08-a6e1-57b30c8f92d4")?,
            "Morning Yoga",
            "Slow flow and mobility for all levels",
        ),
        (
            Uuid::parse_str("2b8f61d3-4ac7-4e59-b0f2-8d6e13a7c5b9")?,
            "Boxing Fundamentals",
            "Footwork, combinations and bag work",
        ),
        (
            Uuid::parse_str("e71d05c8-9f3a-42b6-8c4d-a0b95f6e2173")?,
            "HIIT Circuit",
            "Forty minutes of intervals",
        ),
    ];

    for (id, title, description) in courses {
        upsert_course(pool, id, title, Some(description)).await?;
    }

    let sessions = vec![
        ("seed-001", "Morning Yoga", "07:00", "08:00", Recurrence::Weekly { day_of_week: 1 }),
        ("seed-002", "Morning Yoga", "07:00", "08:00", Recurrence::Weekly { day_of_week: 3 }),
        ("seed-003", "Boxing Fundamentals", "18:30", "19:30", Recurrence::Weekly { day_of_week: 2 }),
        ("seed-004", "HIIT Circuit", "12:15", "13:00", Recurrence::Weekly { day_of_week: 5 }),
        (
            "seed-005",
            "Boxing Fundamentals",
            "10:00",
            "12:00",
            Recurrence::OneTime {
                specific_date: parse_specific_date("2026-03-14"),
            },
        ),
    ];

    for (source_key, course_title, start, end, recurrence) in sessions {
        let course_id: Uuid = sqlx::query("SELECT id FROM gym_schedule.courses WHERE title = $1")
            .bind(course_title)
            .fetch_one(pool)
            .await?
            .get("id");

        insert_session(pool, course_id, None, start, end, &recurrence, source_key).await?;
    }

    let downtown = coords::parse("36°54'26.4\"N 10°10'49.0\"E")?;
    sqlx::query(
        r#"
        INSERT INTO gym_schedule.locations (id, name, address, latitude, longitude)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (name) DO NOTHING
        "#,
    )
    .bind(Uuid::parse_str("7b1c9e52-6a0f-4c55-9d0e-2f4f1f3a8c61")?)
    .bind("Downtown Club")
    .bind("12 Avenue Habib Bourguiba")
    .bind(downtown.latitude)
    .bind(downtown.longitude)
    .execute(pool)
    .await?;

    Ok(())
}

async fn upsert_course(
    pool: &PgPool,
    id: Uuid,
    title: &str,
    description: Option<&str>,
) -> anyhow::Result<Uuid> {
    let course_id: Uuid = sqlx::query(
        r#"
        INSERT INTO gym_schedule.courses (id, title, description)
        VALUES ($1, $2, $3)
        ON CONFLICT (title) DO UPDATE
        SET description = COALESCE(EXCLUDED.description, gym_schedule.courses.description)
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(description)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(course_id)
}

/// Returns whether a row was written; an existing `source_key` is left alone.
async fn insert_session(
    pool: &PgPool,
    course_id: Uuid,
    title: Option<&str>,
    start_time: &str,
    end_time: &str,
    recurrence: &Recurrence,
    source_key: &str,
) -> anyhow::Result<bool> {
    let (is_recurring, day_of_week, specific_date): (bool, Option<i32>, Option<DateTime<Utc>>) =
        match recurrence {
            Recurrence::Weekly { day_of_week } => (true, i32::try_from(*day_of_week).ok(), None),
            Recurrence::OneTime { specific_date } => (false, None, *specific_date),
        };

    let result = sqlx::query(
        r#"
        INSERT INTO gym_schedule.course_sessions
        (id, course_id, title, start_time, end_time, is_recurring, day_of_week, specific_date, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(course_id)
    .bind(title)
    .bind(start_time)
    .bind(end_time)
    .bind(is_recurring)
    .bind(day_of_week)
    .bind(specific_date)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_courses(pool: &PgPool) -> anyhow::Result<Vec<Course>> {
    let records = sqlx::query(
        "SELECT id, title, description FROM gym_schedule.courses ORDER BY title",
    )
    .fetch_all(pool)
    .await?;

    Ok(records
        .into_iter()
        .map(|row| Course {
            id: row.get::<Uuid, _>("id").to_string(),
            title: row.get("title"),
            description: row.get("description"),
        })
        .collect())
}

/// Loads every session of every course. Callers refetch the whole list after
/// any change instead of patching it.
pub async fn fetch_sessions(pool: &PgPool) -> anyhow::Result<Vec<SessionDefinition>> {
    let records = sqlx::query(
        "SELECT id, course_id, title, start_time, end_time, is_recurring, day_of_week, specific_date \
         FROM gym_schedule.course_sessions \
         ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await?;

    let mut sessions = Vec::with_capacity(records.len());
    for row in records {
        let id: Uuid = row.get("id");
        let is_recurring: bool = row.get("is_recurring");
        let recurrence = if is_recurring {
            let day_of_week: Option<i32> = row.get("day_of_week");
            Recurrence::Weekly {
                day_of_week: day_of_week.map(i64::from).unwrap_or(-1),
            }
        } else {
            let specific_date: Option<DateTime<Utc>> = row.get("specific_date");
            if specific_date.is_none() {
                debug!(session_id = %id, "one-time session has no date");
            }
            Recurrence::OneTime { specific_date }
        };

        sessions.push(SessionDefinition {
            id: id.to_string(),
            course_id: row.get::<Uuid, _>("course_id").to_string(),
            title: row.get("title"),
            start_time: row.get("start_time"),
            end_time: row.get("end_time"),
            recurrence,
        });
    }

    debug!(count = sessions.len(), "loaded sessions");
    Ok(sessions)
}

pub async fn fetch_locations(pool: &PgPool) -> anyhow::Result<Vec<Location>> {
    let records = sqlx::query(
        "SELECT id, name, address, latitude, longitude FROM gym_schedule.locations ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(records
        .into_iter()
        .map(|row| Location {
            id: row.get("id"),
            name: row.get("name"),
            address: row.get("address"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
        })
        .collect())
}

/// Parses `coordinates` before touching the database; bad input never
/// reaches an insert.
pub async fn insert_location(
    pool: &PgPool,
    name: &str,
    address: Option<&str>,
    coordinates: &str,
) -> anyhow::Result<Location> {
    let coordinate = coords::parse(coordinates)?;
    let location = Location {
        id: Uuid::new_v4(),
        name: name.to_string(),
        address: address.map(str::to_string),
        latitude: coordinate.latitude,
        longitude: coordinate.longitude,
    };

    sqlx::query(
        r#"
        INSERT INTO gym_schedule.locations (id, name, address, latitude, longitude)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(location.id)
    .bind(&location.name)
    .bind(&location.address)
    .bind(location.latitude)
    .bind(location.longitude)
    .execute(pool)
    .await
    .with_context(|| format!("failed to insert location {name:?}"))?;

    info!(location = %location.name, "location saved");
    Ok(location)
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    course_title: String,
    title: Option<String>,
    start_time: String,
    end_time: String,
    is_recurring: bool,
    day_of_week: Option<i64>,
    specific_date: Option<String>,
    source_key: Option<String>,
}

impl CsvRow {
    /// Import is stricter than display: rows that would never show on the
    /// calendar are rejected instead of stored.
    fn recurrence(&self) -> anyhow::Result<Recurrence> {
        anyhow::ensure!(
            validate_time(&self.start_time) && validate_time(&self.end_time),
            "times must be HH:MM, got {:?}-{:?}",
            self.start_time,
            self.end_time
        );

        if self.is_recurring {
            let day_of_week = self
                .day_of_week
                .context("recurring session needs day_of_week")?;
            anyhow::ensure!(
                (0..=6).contains(&day_of_week),
                "day_of_week must be 0 (Sunday) to 6 (Saturday), got {day_of_week}"
            );
            Ok(Recurrence::Weekly { day_of_week })
        } else {
            let raw = self
                .specific_date
                .as_deref()
                .context("one-time session needs specific_date")?;
            let specific_date = parse_specific_date(raw)
                .with_context(|| format!("unreadable specific_date {raw:?}"))?;
            Ok(Recurrence::OneTime {
                specific_date: Some(specific_date),
            })
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

pub async fn import_sessions_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<ImportSummary> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut summary = ImportSummary::default();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let recurrence = match row.recurrence() {
            Ok(recurrence) => recurrence,
            Err(err) => {
                warn!(row = line + 1, error = %err, "skipping session row");
                summary.rejected += 1;
                continue;
            }
        };

        let course_id = upsert_course(pool, Uuid::new_v4(), &row.course_title, None).await?;
        let source_key = row
            .source_key
            .clone()
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let inserted = insert_session(
            pool,
            course_id,
            row.title.as_deref().filter(|t| !t.trim().is_empty()),
            &row.start_time,
            &row.end_time,
            &recurrence,
            &source_key,
        )
        .await?;

        if inserted {
            summary.inserted += 1;
        } else {
            summary.duplicates += 1;
        }
    }

    Ok(summary)
}
