use chrono::{Datelike, Months, NaiveDate};

/// A month grid cell. `None` pads the row before the 1st of the month.
pub type CalendarCell = Option<NaiveDate>;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Builds the cells of a Sunday-first month view for a zero-based `month0`.
/// No trailing padding is added after the last day.
pub fn generate(year: i32, month0: u32) -> Vec<CalendarCell> {
    let Some(first) = first_of_month(year, month0) else {
        return Vec::new();
    };

    let padding = first.weekday().num_days_from_sunday() as usize;
    let mut cells: Vec<CalendarCell> = vec![None; padding];
    let days = days_in_month(year, month0) as usize;
    cells.extend(first.iter_days().take(days).map(Some));
    cells
}

pub fn days_in_month(year: i32, month0: u32) -> u32 {
    let Some(first) = first_of_month(year, month0) else {
        return 0;
    };
    match first.checked_add_months(Months::new(1)) {
        Some(next) => (next - first).num_days() as u32,
        // Only reachable at the very end of chrono's range.
        None => 31,
    }
}

fn first_of_month(year: i32, month0: u32) -> Option<NaiveDate> {
    if month0 > 11 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
}

/// Splits a grid into Sunday-first rows of seven; the last row may be short.
pub fn weeks(cells: &[CalendarCell]) -> Vec<&[CalendarCell]> {
    cells.chunks(7).collect()
}

/// The month currently shown, with zero-based month like the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor {
    pub year: i32,
    pub month0: u32,
}

impl MonthCursor {
    pub fn new(year: i32, month0: u32) -> Option<Self> {
        first_of_month(year, month0).map(|_| Self { year, month0 })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month0: date.month0(),
        }
    }

    pub fn next(self) -> Self {
        if self.month0 == 11 {
            Self {
                year: self.year + 1,
                month0: 0,
            }
        } else {
            Self {
                year: self.year,
                month0: self.month0 + 1,
            }
        }
    }

    pub fn prev(self) -> Self {
        if self.month0 == 0 {
            Self {
                year: self.year - 1,
                month0: 11,
            }
        } else {
            Self {
                year: self.year,
                month0: self.month0 - 1,
            }
        }
    }

    pub fn cells(self) -> Vec<CalendarCell> {
        generate(self.year, self.month0)
    }

    pub fn label(self) -> String {
        let name = MONTH_NAMES
            .get(self.month0 as usize)
            .copied()
            .unwrap_or("Unknown");
        format!("{} {}", name, self.year)
    }
}
