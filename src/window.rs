use std::fmt::{self, Display, Formatter};

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::error::PaceError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// How a requested date range is split into search windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowMode {
    /// One window per calendar day.
    Daily,
    /// One window per calendar month, first to last day.
    Monthly,
    /// A single window equal to the requested range.
    Range,
}

/// The temporal filter of a single search, as ISO date strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateWindow {
    pub start: String,
    pub end: String,
}

impl DateWindow {
    pub fn new<S: Into<String>, E: Into<String>>(start: S, end: E) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(
            start.format(DATE_FORMAT).to_string(),
            end.format(DATE_FORMAT).to_string(),
        )
    }
}

impl Display for DateWindow {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}

/// Partition `start..=end` into the ordered windows for `mode`.
///
/// Daily mode takes `YYYY-MM-DD` boundaries. Monthly mode takes `YYYY-MM` (a full date is also
/// accepted, its day is ignored). Range mode hands the raw strings through untouched, even when
/// they are inverted.
pub fn build_windows(start: &str, end: &str, mode: WindowMode) -> Result<Vec<DateWindow>, PaceError> {
    match mode {
        WindowMode::Daily => {
            let start = parse_day(start)?;
            let end = parse_day(end)?;
            Ok(daily_windows(start, end))
        }
        WindowMode::Monthly => {
            let start = parse_month(start)?;
            let end = parse_month(end)?;
            Ok(monthly_windows(start, end))
        }
        WindowMode::Range => {
            if let (Ok(s), Ok(e)) = (parse_day(start), parse_day(end)) {
                if e < s {
                    log::warn!("End before start, passing range through as given: {} {}", start, end);
                }
            }
            Ok(vec![DateWindow::new(start, end)])
        }
    }
}

fn daily_windows(start: NaiveDate, end: NaiveDate) -> Vec<DateWindow> {
    (0..)
        .map(|i| start + Duration::days(i))
        .take_while(|day| *day <= end)
        .map(|day| DateWindow::from_dates(day, day))
        .collect()
}

fn monthly_windows(start: NaiveDate, end: NaiveDate) -> Vec<DateWindow> {
    let mut windows = vec![];

    let mut first = start;
    while first <= end {
        let next = match first.checked_add_months(Months::new(1)) {
            Some(next) => next,
            None => break,
        };
        let last = next - Duration::days(1);

        windows.push(DateWindow::from_dates(first, last));
        first = next;
    }

    windows
}

fn parse_day(value: &str) -> Result<NaiveDate, PaceError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| PaceError::invalid_date(value, "YYYY-MM-DD"))
}

/// First day of the month named by `YYYY-MM` or `YYYY-MM-DD`.
fn parse_month(value: &str) -> Result<NaiveDate, PaceError> {
    let trimmed = value.trim();
    let date = if trimmed.len() == 7 {
        NaiveDate::parse_from_str(&format!("{}-01", trimmed), DATE_FORMAT)
    } else {
        NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
    };

    date.ok()
        .and_then(|d| d.with_day0(0))
        .ok_or_else(|| PaceError::invalid_date(value, "YYYY-MM"))
}
