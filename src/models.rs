use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Record ids from the admin backend are opaque: UUIDs from this crate's
/// store, ObjectId hex strings or plain integers from the console export.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(alias = "_id", deserialize_with = "opaque_id")]
    pub id: String,
    pub title: String,
    pub description: Option<String>,
}

/// Which days a session occurs on. Only one branch is ever meaningful.
#[derive(Debug, Clone, PartialEq)]
pub enum Recurrence {
    /// Every week on `day_of_week` (0 = Sunday .. 6 = Saturday). Values
    /// outside that range are kept as stored and match nothing.
    Weekly { day_of_week: i64 },
    /// A single date. `None` when the stored value was missing or unreadable.
    OneTime { specific_date: Option<DateTime<Utc>> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionDefinition {
    pub id: String,
    pub course_id: String,
    pub title: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub recurrence: Recurrence,
}

impl SessionDefinition {
    pub fn is_recurring(&self) -> bool {
        matches!(self.recurrence, Recurrence::Weekly { .. })
    }
}

/// Session record as exported by the admin API: both branch fields are
/// optional and `isRecurring` selects the one that applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    #[serde(alias = "_id", deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(deserialize_with = "opaque_id")]
    pub course_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub day_of_week: Option<i64>,
    #[serde(default)]
    pub specific_date: Option<String>,
}

impl From<SessionRow> for SessionDefinition {
    fn from(row: SessionRow) -> Self {
        let recurrence = if row.is_recurring {
            Recurrence::Weekly {
                day_of_week: row.day_of_week.unwrap_or(-1),
            }
        } else {
            let specific_date = row.specific_date.as_deref().and_then(parse_specific_date);
            if specific_date.is_none() {
                debug!(session_id = %row.id, raw = ?row.specific_date, "one-time session has no usable date");
            }
            Recurrence::OneTime { specific_date }
        };

        SessionDefinition {
            id: row.id,
            course_id: row.course_id,
            title: row.title.filter(|t| !t.trim().is_empty()),
            start_time: row.start_time,
            end_time: row.end_time,
            recurrence,
        }
    }
}

/// Reads a stored session date. Full timestamps keep their instant (converted
/// to UTC); a bare `YYYY-MM-DD` is taken as UTC midnight.
pub fn parse_specific_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn coordinate(&self) -> GeoCoordinate {
        GeoCoordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(is_recurring: bool, day_of_week: Option<i64>, specific_date: Option<&str>) -> SessionRow {
        SessionRow {
            id: Uuid::new_v4().to_string(),
            course_id: Uuid::new_v4().to_string(),
            title: None,
            start_time: "09:00".to_string(),
            end_time: "10:00".to_string(),
            is_recurring,
            day_of_week,
            specific_date: specific_date.map(str::to_string),
        }
    }

    #[test]
    fn recurring_flag_selects_weekly_branch() {
        let session = SessionDefinition::from(row(true, Some(3), Some("2024-03-15")));
        assert_eq!(session.recurrence, Recurrence::Weekly { day_of_week: 3 });
        assert!(session.is_recurring());
    }

    #[test]
    fn recurring_without_day_never_gets_a_valid_weekday() {
        let session = SessionDefinition::from(row(true, None, None));
        assert_eq!(session.recurrence, Recurrence::Weekly { day_of_week: -1 });
    }

    #[test]
    fn one_time_branch_ignores_day_of_week() {
        let session = SessionDefinition::from(row(false, Some(1), Some("2024-03-15T00:00:00.000Z")));
        let expected = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        assert_eq!(
            session.recurrence,
            Recurrence::OneTime {
                specific_date: Some(expected)
            }
        );
    }

    #[test]
    fn specific_date_accepts_offsets_and_bare_dates() {
        let shifted = parse_specific_date("2024-03-15T22:30:00-05:00").unwrap();
        assert_eq!(shifted, Utc.with_ymd_and_hms(2024, 3, 16, 3, 30, 0).unwrap());

        let bare = parse_specific_date(" 2024-03-15 ").unwrap();
        assert_eq!(bare, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn malformed_specific_date_is_dropped() {
        assert!(parse_specific_date("15/03/2024").is_none());
        assert!(parse_specific_date("").is_none());

        let session = SessionDefinition::from(row(false, None, Some("next tuesday")));
        assert_eq!(
            session.recurrence,
            Recurrence::OneTime {
                specific_date: None
            }
        );
    }

    #[test]
    fn blank_title_falls_back_to_none() {
        let mut raw = row(true, Some(1), None);
        raw.title = Some("   ".to_string());
        assert!(SessionDefinition::from(raw).title.is_none());
    }

    #[test]
    fn session_rows_use_camel_case_fields() {
        let json = r#"{
            "id": "a41e7c09-5b2d-4f3a-9e61-c8d0b7f25e14",
            "courseId": "f0c3b8e2-71a4-4d96-8b25-3e9a6d1c4f70",
            "startTime": "18:00",
            "endTime": "19:00",
            "isRecurring": false,
            "specificDate": "2024-03-15T00:00:00.000Z"
        }"#;
        let parsed: SessionRow = serde_json::from_str(json).unwrap();
        assert!(!parsed.is_recurring);
        assert_eq!(parsed.specific_date.as_deref(), Some("2024-03-15T00:00:00.000Z"));
        assert!(parsed.title.is_none());
    }

    #[test]
    fn session_ids_are_opaque() {
        let json = r#"{
            "_id": "65f1c2e4a9b3c8d7e6f5a4b3",
            "courseId": 42,
            "startTime": "18:00",
            "endTime": "19:00",
            "isRecurring": true,
            "dayOfWeek": 4
        }"#;
        let parsed: SessionRow = serde_json::from_str(json).unwrap();
        let session = SessionDefinition::from(parsed);
        assert_eq!(session.id, "65f1c2e4a9b3c8d7e6f5a4b3");
        assert_eq!(session.course_id, "42");
    }

    #[test]
    fn courses_accept_object_ids() {
        let json = r#"{"_id": "65f1c2e4a9b3c8d7e6f5a4c0", "title": "Boxing"}"#;
        let course: Course = serde_json::from_str(json).unwrap();
        assert_eq!(course.id, "65f1c2e4a9b3c8d7e6f5a4c0");
        assert!(course.description.is_none());
    }
}
