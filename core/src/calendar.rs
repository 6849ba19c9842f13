// core/src/calendar.rs

//! Month-name parsing and the UTC date windows used by the item history and
//! sales report filters.

use crate::error::FulfillmentError;
use chrono::{DateTime, Datelike, Month, NaiveDate, TimeZone, Utc};
use serde::Serialize;

/// A half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
}

impl DateWindow {
  pub fn contains(&self, instant: DateTime<Utc>) -> bool {
    self.start <= instant && instant < self.end
  }

  /// The whole calendar year.
  pub fn year(year: i32) -> Result<Self, FulfillmentError> {
    Ok(DateWindow {
      start: midnight(year, 1)?,
      end: midnight(year + 1, 1)?,
    })
  }

  /// The whole calendar month.
  pub fn month(year: i32, month: Month) -> Result<Self, FulfillmentError> {
    let m = month.number_from_month();
    let (next_year, next_month) = if m == 12 { (year + 1, 1) } else { (year, m + 1) };
    Ok(DateWindow {
      start: midnight(year, m)?,
      end: midnight(next_year, next_month)?,
    })
  }
}

fn midnight(year: i32, month: u32) -> Result<DateTime<Utc>, FulfillmentError> {
  NaiveDate::from_ymd_opt(year, month, 1)
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|naive| Utc.from_utc_datetime(&naive))
    .ok_or_else(|| FulfillmentError::Validation(format!("Year {} is out of range", year)))
}

/// Parses an English month name or its three-letter abbreviation, ignoring case.
pub fn parse_month(name: &str) -> Result<Month, FulfillmentError> {
  name
    .trim()
    .parse::<Month>()
    .map_err(|_| FulfillmentError::Validation(format!("Invalid month format: '{}'", name)))
}

/// A `month` query value: either `all` or one month of the current year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthFilter {
  All,
  Month(Month),
}

impl MonthFilter {
  pub fn parse(raw: Option<&str>) -> Result<Self, FulfillmentError> {
    match raw.map(str::trim) {
      None | Some("") => Ok(MonthFilter::All),
      Some(value) if value.eq_ignore_ascii_case("all") => Ok(MonthFilter::All),
      Some(value) => parse_month(value).map(MonthFilter::Month),
    }
  }

  /// The window for this filter in the year of `now`; `None` means unfiltered.
  pub fn window_at(&self, now: DateTime<Utc>) -> Result<Option<DateWindow>, FulfillmentError> {
    match self {
      MonthFilter::All => Ok(None),
      MonthFilter::Month(month) => DateWindow::month(now.year(), *month).map(Some),
    }
  }
}

/// Parses a `year` query value; `all` (or nothing) means no year.
pub fn parse_year(raw: Option<&str>) -> Result<Option<i32>, FulfillmentError> {
  match raw.map(str::trim) {
    None | Some("") => Ok(None),
    Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
    Some(value) => value
      .parse::<i32>()
      .ok()
      .filter(|y| (1..=9999).contains(y))
      .map(Some)
      .ok_or_else(|| FulfillmentError::Validation(format!("Invalid year format: '{}'", value))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn month_names_parse_in_full_and_abbreviated_forms() {
    assert_eq!(parse_month("March").unwrap(), Month::March);
    assert_eq!(parse_month("mar").unwrap(), Month::March);
    assert_eq!(parse_month(" DECEMBER ").unwrap(), Month::December);
  }

  #[test]
  fn misspelled_month_is_a_validation_error() {
    let err = parse_month("Marsh").unwrap_err();
    assert!(matches!(err, FulfillmentError::Validation(_)));
  }

  #[test]
  fn month_window_covers_the_whole_month() {
    let w = DateWindow::month(2024, Month::February).unwrap();
    assert_eq!(w.start, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
    assert_eq!(w.end, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    assert!(w.contains(Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap()));
    assert!(!w.contains(w.end));
  }

  #[test]
  fn december_window_rolls_into_next_year() {
    let w = DateWindow::month(2023, Month::December).unwrap();
    assert_eq!(w.end, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
  }

  #[test]
  fn year_window_includes_the_last_day() {
    let w = DateWindow::year(2023).unwrap();
    assert!(w.contains(Utc.with_ymd_and_hms(2023, 12, 31, 18, 0, 0).unwrap()));
    assert!(!w.contains(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
  }

  #[test]
  fn month_filter_uses_the_current_year() {
    let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
    assert_eq!(MonthFilter::parse(Some("all")).unwrap().window_at(now).unwrap(), None);
    let w = MonthFilter::parse(Some("jan")).unwrap().window_at(now).unwrap().unwrap();
    assert_eq!(w.start, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
  }

  #[test]
  fn year_parsing() {
    assert_eq!(parse_year(None).unwrap(), None);
    assert_eq!(parse_year(Some("all")).unwrap(), None);
    assert_eq!(parse_year(Some("2024")).unwrap(), Some(2024));
    assert!(parse_year(Some("twenty")).is_err());
  }
}
