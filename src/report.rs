use std::fmt::Write;

use chrono::{Datelike, Weekday};

use crate::calendar::MonthCursor;
use crate::models::{Course, Recurrence, SessionDefinition};
use crate::schedule::{self, DayAgenda};

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

pub fn weekday_name(day_of_week: i64) -> Option<&'static str> {
    usize::try_from(day_of_week)
        .ok()
        .and_then(|idx| WEEKDAY_NAMES.get(idx).copied())
}

/// One line per session: `07:00-08:00 Morning Yoga`.
pub fn session_line(session: &SessionDefinition, courses: &[Course]) -> String {
    format!(
        "{}-{} {}",
        session.start_time,
        session.end_time,
        schedule::display_title(session, courses)
    )
}

/// Plain-text month view: a Sunday-first grid of day numbers, with `*`
/// marking days that have sessions.
pub fn render_month_grid(cursor: MonthCursor, agenda: &[DayAgenda<'_>]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{:^28}", cursor.label());
    let _ = writeln!(output, " Su  Mo  Tu  We  Th  Fr  Sa");

    for week in agenda.chunks(7) {
        let line: String = week
            .iter()
            .map(|day| match day.date {
                Some(date) if day.sessions.is_empty() => format!(" {:>2} ", date.day()),
                Some(date) => format!(" {:>2}*", date.day()),
                None => "    ".to_string(),
            })
            .collect();
        let _ = writeln!(output, "{}", line.trim_end());
    }

    output
}

pub fn build_month_report(
    cursor: MonthCursor,
    sessions: &[SessionDefinition],
    courses: &[Course],
) -> String {
    let agenda = schedule::month_agenda(sessions, cursor);
    let mut output = String::new();

    let _ = writeln!(output, "# Gym Schedule: {}", cursor.label());
    let _ = writeln!(
        output,
        "{} sessions on file across {} courses",
        sessions.len(),
        courses.len()
    );
    let _ = writeln!(
        output,
        "Previous: {} | Next: {}",
        cursor.prev().label(),
        cursor.next().label()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Timetable");

    let recurring: Vec<&SessionDefinition> =
        sessions.iter().filter(|s| s.is_recurring()).collect();

    if recurring.is_empty() {
        let _ = writeln!(output, "No recurring sessions.");
    } else {
        for day_of_week in 0..7 {
            let mut on_day: Vec<&SessionDefinition> = recurring
                .iter()
                .copied()
                .filter(|s| s.recurrence == Recurrence::Weekly { day_of_week })
                .collect();
            if on_day.is_empty() {
                continue;
            }
            schedule::sort_by_start_time(&mut on_day);
            let name = weekday_name(day_of_week).unwrap_or("Unknown");
            let _ = writeln!(output, "### {}", name);
            for session in on_day {
                let _ = writeln!(output, "- {}", session_line(session, courses));
            }
        }
    }

    let unscheduled = sessions
        .iter()
        .filter(|s| match s.recurrence {
            Recurrence::Weekly { day_of_week } => weekday_name(day_of_week).is_none(),
            Recurrence::OneTime { specific_date } => specific_date.is_none(),
        })
        .count();

    let _ = writeln!(output);
    let _ = writeln!(output, "## Calendar");
    let _ = writeln!(output, "```");
    let _ = write!(output, "{}", render_month_grid(cursor, &agenda));
    let _ = writeln!(output, "```");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Listing");

    let mut any_day = false;
    for day in agenda.iter() {
        let Some(date) = day.date else {
            continue;
        };
        if day.sessions.is_empty() {
            continue;
        }
        any_day = true;
        let _ = writeln!(
            output,
            "### {} ({})",
            date.format("%Y-%m-%d"),
            short_weekday(date.weekday())
        );
        for session in day.sessions.iter() {
            let marker = if session.is_recurring() { "" } else { " (one-time)" };
            let _ = writeln!(output, "- {}{}", session_line(session, courses), marker);
        }
    }

    if !any_day {
        let _ = writeln!(output, "No sessions scheduled this month.");
    }

    if !courses.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Courses");
        for course in courses {
            match course.description.as_deref() {
                Some(description) => {
                    let _ = writeln!(output, "- {}: {}", course.title, description);
                }
                None => {
                    let _ = writeln!(output, "- {}", course.title);
                }
            }
        }
    }

    if unscheduled > 0 {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "_{} session(s) skipped: missing or invalid day/date._",
            unscheduled
        );
    }

    output
}

fn short_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "Sun",
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
    }
}
