use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use std::fmt;

/// Date format expected by the filter inputs
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Two-day filter window: previous business day through today.
///
/// Business days skip weekends only. Exchange holidays are not known here, so a
/// run on the day after a holiday asks for the holiday itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl DateRange {
    /// Range ending on the given day
    pub fn ending_on(end_date: NaiveDate) -> Self {
        Self {
            start_date: previous_business_day(end_date),
            end_date,
        }
    }

    pub fn start_param(&self) -> String {
        self.start_date.format(DATE_FORMAT).to_string()
    }

    pub fn end_param(&self) -> String {
        self.end_date.format(DATE_FORMAT).to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start_param(), self.end_param())
    }
}

/// Local calendar date
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Most recent weekday strictly before `date`
pub fn previous_business_day(date: NaiveDate) -> NaiveDate {
    let mut day = date - Duration::days(1);
    while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        day = day - Duration::days(1);
    }
    day
}
