use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

use crate::calendar::MonthCursor;
use crate::models::{Course, Recurrence, SessionDefinition};

#[derive(Debug, Clone)]
pub struct DayAgenda<'a> {
    /// `None` for the padding cells before the 1st of the month.
    pub date: Option<NaiveDate>,
    pub sessions: Vec<&'a SessionDefinition>,
}

/// Returns the sessions that occur on the local calendar day `date`, in
/// their original order.
///
/// Weekly sessions match on the local weekday. One-time sessions match when
/// the UTC calendar day of their stored date equals the local day, compared
/// as `YYYY-MM-DD` text. The mixed local/UTC comparison is inherited from
/// the admin console: a session saved as UTC midnight shows on that calendar
/// day in every timezone.
pub fn sessions_on_date(sessions: &[SessionDefinition], date: NaiveDate) -> Vec<&SessionDefinition> {
    let weekday = i64::from(date.weekday().num_days_from_sunday());
    let local_key = date_key(date);

    sessions
        .iter()
        .filter(|session| match &session.recurrence {
            Recurrence::Weekly { day_of_week } => *day_of_week == weekday,
            Recurrence::OneTime {
                specific_date: Some(specific),
            } => utc_date_key(specific) == local_key,
            Recurrence::OneTime {
                specific_date: None,
            } => false,
        })
        .collect()
}

/// Same as [`sessions_on_date`], taking the calendar day of `instant` in
/// its own timezone.
pub fn sessions_at<'a, Tz: TimeZone>(
    sessions: &'a [SessionDefinition],
    instant: &DateTime<Tz>,
) -> Vec<&'a SessionDefinition> {
    sessions_on_date(sessions, instant.date_naive())
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn utc_date_key(instant: &DateTime<Utc>) -> String {
    date_key(instant.date_naive())
}

/// Orders by `HH:MM` start time. Equal times keep their relative order.
pub fn sort_by_start_time(sessions: &mut [&SessionDefinition]) {
    sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time));
}

pub fn display_title<'a>(session: &'a SessionDefinition, courses: &'a [Course]) -> &'a str {
    if let Some(title) = session.title.as_deref() {
        return title;
    }
    courses
        .iter()
        .find(|course| course.id == session.course_id)
        .map(|course| course.title.as_str())
        .unwrap_or("Untitled session")
}

/// Zero-padded 24-hour `HH:MM`.
pub fn validate_time(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| -> Option<u32> {
        let part = &value[range];
        if part.bytes().all(|b| b.is_ascii_digit()) {
            part.parse().ok()
        } else {
            None
        }
    };
    matches!((digits(0..2), digits(3..5)), (Some(h), Some(m)) if h < 24 && m < 60)
}

/// Resolves every cell of a month view, each day's sessions sorted by start.
pub fn month_agenda(sessions: &[SessionDefinition], cursor: MonthCursor) -> Vec<DayAgenda<'_>> {
    cursor
        .cells()
        .into_iter()
        .map(|cell| {
            let mut matched = match cell {
                Some(date) => sessions_on_date(sessions, date),
                None => Vec::new(),
            };
            sort_by_start_time(&mut matched);
            DayAgenda {
                date: cell,
                sessions: matched,
            }
        })
        .collect()
}
