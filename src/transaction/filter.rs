//! Compiles date filters into parameterised SQL predicates over an owner's transactions.
//!
//! The dashboard and the report export both describe which transactions they
//! want with a [FilterSpec]. [compile_filter] turns a spec into a `WHERE`
//! clause with positional placeholders and the values bound to them, so no
//! user input is ever spliced into SQL text.

use rusqlite::types::Value;
use serde::Deserialize;
use time::{Date, Duration, Month, macros::format_description};

use crate::{Error, transaction::core::validate_owner};

/// Which date-based subset of an owner's transactions to select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterSpec {
    /// Every transaction.
    #[default]
    All,
    /// Transactions on exactly this date.
    ExactDate(Date),
    /// Transactions within a calendar month.
    Month {
        /// The calendar year.
        year: i32,
        /// The month within `year`.
        month: Month,
    },
    /// Transactions within a calendar year.
    Year(i32),
    /// Transactions on or after `today - n days`.
    LastDays(u32),
    /// Transactions on or after `today - n months`, using calendar months.
    LastMonths(u32),
    /// Transactions between `start` and `end`, inclusive.
    DateRange {
        /// The first date to include.
        start: Date,
        /// The last date to include.
        end: Date,
    },
}

impl FilterSpec {
    /// Create a [FilterSpec::DateRange].
    ///
    /// # Errors
    /// Returns [Error::InvalidArgument] if `start` is after `end`.
    pub fn date_range(start: Date, end: Date) -> Result<Self, Error> {
        check_range_order(start, end)?;

        Ok(Self::DateRange { start, end })
    }
}

/// The raw filter parameters of a dashboard or report request.
///
/// Values are kept as strings so that every validation failure is reported
/// as [Error::InvalidArgument] by [FilterSpec::try_from] rather than as an
/// opaque query rejection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FilterQuery {
    /// The filter mode, e.g. `month` or `lastDays`. Defaults to `all`.
    #[serde(alias = "filterType")]
    pub filter_type: Option<String>,
    /// The date, month (`YYYY-MM`), year (`YYYY`) or range start.
    #[serde(alias = "startDate")]
    pub start_date: Option<String>,
    /// The range end for `dateRange`.
    #[serde(alias = "endDate")]
    pub end_date: Option<String>,
    /// The number of days for `lastDays`.
    pub days: Option<String>,
    /// The number of months for `lastMonths`.
    pub months: Option<String>,
}

impl TryFrom<FilterQuery> for FilterSpec {
    type Error = Error;

    fn try_from(query: FilterQuery) -> Result<Self, Self::Error> {
        let mode = query.filter_type.as_deref().map(str::trim).unwrap_or("all");

        match mode {
            "" | "all" => Ok(FilterSpec::All),
            "exactDate" | "specificDate" => {
                let date = required(&query.start_date, "start_date", mode)?;
                Ok(FilterSpec::ExactDate(parse_date(date)?))
            }
            "month" => {
                let (year, month) = parse_month(required(&query.start_date, "start_date", mode)?)?;
                Ok(FilterSpec::Month { year, month })
            }
            "year" => Ok(FilterSpec::Year(parse_year(required(
                &query.start_date,
                "start_date",
                mode,
            )?)?)),
            "lastDays" => Ok(FilterSpec::LastDays(parse_count(
                required(&query.days, "days", mode)?,
                "days",
            )?)),
            "lastMonths" => Ok(FilterSpec::LastMonths(parse_count(
                required(&query.months, "months", mode)?,
                "months",
            )?)),
            "dateRange" => {
                let start = parse_date(required(&query.start_date, "start_date", mode)?)?;
                let end = parse_date(required(&query.end_date, "end_date", mode)?)?;
                FilterSpec::date_range(start, end)
            }
            unknown => Err(Error::InvalidArgument(format!(
                "unknown filter type \"{unknown}\""
            ))),
        }
    }
}

/// A SQL `WHERE` clause and the values bound to its positional placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// The clause without the `WHERE` keyword, using `?1`, `?2`, ... placeholders.
    pub clause: String,
    /// The values for the placeholders, in order.
    pub params: Vec<Value>,
}

impl Predicate {
    fn for_owner(owner: &str) -> Self {
        Self {
            clause: "owner = ?1".to_owned(),
            params: vec![Value::Text(owner.to_owned())],
        }
    }

    fn and_date_on(mut self, date: Date) -> Self {
        self.params.push(Value::Text(date.to_string()));
        self.clause.push_str(&format!(" AND date = ?{}", self.params.len()));
        self
    }

    fn and_date_from(mut self, start: Date) -> Self {
        self.params.push(Value::Text(start.to_string()));
        self.clause.push_str(&format!(" AND date >= ?{}", self.params.len()));
        self
    }

    fn and_date_between(mut self, start: Date, end: Date) -> Self {
        self.params.push(Value::Text(start.to_string()));
        self.params.push(Value::Text(end.to_string()));
        self.clause.push_str(&format!(
            " AND date BETWEEN ?{} AND ?{}",
            self.params.len() - 1,
            self.params.len()
        ));
        self
    }
}

/// Compile `spec` into a predicate selecting the matching transactions of `owner`.
///
/// Relative filters are resolved against `today`, so compiling the same spec
/// with the same `today` always produces the same predicate.
///
/// # Errors
/// Returns [Error::InvalidArgument] if `owner` is blank, a date range is
/// reversed, or a relative filter reaches outside the supported calendar.
pub fn compile_filter(owner: &str, spec: &FilterSpec, today: Date) -> Result<Predicate, Error> {
    validate_owner(owner)?;

    let predicate = Predicate::for_owner(owner);

    let predicate = match *spec {
        FilterSpec::All => predicate,
        FilterSpec::ExactDate(date) => predicate.and_date_on(date),
        FilterSpec::Month { year, month } => {
            let (start, end) = month_bounds(year, month)?;
            predicate.and_date_between(start, end)
        }
        FilterSpec::Year(year) => {
            let (start, end) = year_bounds(year)?;
            predicate.and_date_between(start, end)
        }
        FilterSpec::LastDays(days) => {
            let start = today
                .checked_sub(Duration::days(i64::from(days)))
                .ok_or_else(|| out_of_range(format!("last {days} days")))?;
            predicate.and_date_from(start)
        }
        FilterSpec::LastMonths(months) => {
            let start = months_before(today, months)
                .ok_or_else(|| out_of_range(format!("last {months} months")))?;
            predicate.and_date_from(start)
        }
        FilterSpec::DateRange { start, end } => {
            check_range_order(start, end)?;
            predicate.and_date_between(start, end)
        }
    };

    Ok(predicate)
}

/// The date `months` calendar months before `date`.
///
/// The day is clamped to the length of the target month, so 31 March minus
/// one month is the last day of February.
pub(crate) fn months_before(date: Date, months: u32) -> Option<Date> {
    let month_index = i64::from(date.year()) * 12 + i64::from(u8::from(date.month())) - 1
        - i64::from(months);
    let year = i32::try_from(month_index.div_euclid(12)).ok()?;
    let month = Month::try_from(u8::try_from(month_index.rem_euclid(12) + 1).ok()?).ok()?;
    let day = date.day().min(last_day_of_month(year, month));

    Date::from_calendar_date(year, month, day).ok()
}

fn month_bounds(year: i32, month: Month) -> Result<(Date, Date), Error> {
    let invalid = |_| out_of_range(format!("month {year}-{:02}", u8::from(month)));
    let start = Date::from_calendar_date(year, month, 1).map_err(invalid)?;
    let end =
        Date::from_calendar_date(year, month, last_day_of_month(year, month)).map_err(invalid)?;

    Ok((start, end))
}

fn year_bounds(year: i32) -> Result<(Date, Date), Error> {
    let invalid = |_| out_of_range(format!("year {year}"));
    let start = Date::from_calendar_date(year, Month::January, 1).map_err(invalid)?;
    let end = Date::from_calendar_date(year, Month::December, 31).map_err(invalid)?;

    Ok((start, end))
}

fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn check_range_order(start: Date, end: Date) -> Result<(), Error> {
    if start > end {
        return Err(Error::InvalidArgument(format!(
            "the start date {start} is after the end date {end}"
        )));
    }

    Ok(())
}

fn out_of_range(what: String) -> Error {
    Error::InvalidArgument(format!("{what} is outside the supported date range"))
}

fn required<'a>(value: &'a Option<String>, name: &str, mode: &str) -> Result<&'a str, Error> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::InvalidArgument(format!("the {mode} filter requires {name}")))
}

fn parse_date(text: &str) -> Result<Date, Error> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map_err(|error| Error::InvalidArgument(format!("invalid date \"{text}\": {error}")))
}

fn parse_month(text: &str) -> Result<(i32, Month), Error> {
    let invalid = || Error::InvalidArgument(format!("invalid month \"{text}\", expected YYYY-MM"));

    let (year, month) = text.split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }

    let year = parse_year(year).map_err(|_| invalid())?;
    let month = month
        .parse::<u8>()
        .ok()
        .and_then(|month| Month::try_from(month).ok())
        .ok_or_else(invalid)?;

    Ok((year, month))
}

fn parse_year(text: &str) -> Result<i32, Error> {
    match text.parse::<i32>() {
        Ok(year) if (1..=9999).contains(&year) && text.len() == 4 => Ok(year),
        _ => Err(Error::InvalidArgument(format!(
            "invalid year \"{text}\", expected YYYY"
        ))),
    }
}

/// Read the leading integer of `text`, ignoring anything after it, so "7.5"
/// and "7days" both mean 7.
fn parse_count(text: &str, name: &str) -> Result<u32, Error> {
    let digits_end = text
        .char_indices()
        .find(|&(index, c)| !(c.is_ascii_digit() || (index == 0 && (c == '-' || c == '+'))))
        .map_or(text.len(), |(index, _)| index);
    let leading = &text[..digits_end];

    let count = leading.parse::<i64>().map_err(|_| {
        Error::InvalidArgument(format!("{name} must be a whole number, got \"{text}\""))
    })?;

    if count < 0 {
        return Err(Error::InvalidArgument(format!(
            "{name} must not be negative, got {count}"
        )));
    }

    u32::try_from(count)
        .map_err(|_| Error::InvalidArgument(format!("{name} is too large, got {count}")))
}


#[cfg(test)]
mod compile_tests {
    use rusqlite::types::Value;
    use time::{Month, macros::date};

    use crate::Error;

    use super::{FilterSpec, Predicate, compile_filter, months_before};

    fn text(value: &str) -> Value {
        Value::Text(value.to_owned())
    }

    #[test]
    fn all_only_scopes_owner() {
        let got = compile_filter("u1", &FilterSpec::All, date!(2024 - 06 - 01)).unwrap();

        assert_eq!(
            got,
            Predicate {
                clause: "owner = ?1".to_owned(),
                params: vec![text("u1")],
            }
        );
    }

    #[test]
    fn month_compiles_to_calendar_bounds() {
        let spec = FilterSpec::Month {
            year: 2024,
            month: Month::February,
        };

        let got = compile_filter("u1", &spec, date!(2024 - 06 - 01)).unwrap();

        assert_eq!(got.clause, "owner = ?1 AND date BETWEEN ?2 AND ?3");
        assert_eq!(
            got.params,
            vec![text("u1"), text("2024-02-01"), text("2024-02-29")]
        );
    }

    #[test]
    fn year_compiles_to_calendar_bounds() {
        let got = compile_filter("u1", &FilterSpec::Year(2023), date!(2024 - 06 - 01)).unwrap();

        assert_eq!(
            got.params,
            vec![text("u1"), text("2023-01-01"), text("2023-12-31")]
        );
    }

    #[test]
    fn exact_date_compiles_to_equality() {
        let got = compile_filter(
            "u1",
            &FilterSpec::ExactDate(date!(2024 - 03 - 01)),
            date!(2024 - 06 - 01),
        )
        .unwrap();

        assert_eq!(got.clause, "owner = ?1 AND date = ?2");
        assert_eq!(got.params, vec![text("u1"), text("2024-03-01")]);
    }

    #[test]
    fn last_days_is_relative_to_today() {
        let got = compile_filter("u1", &FilterSpec::LastDays(10), date!(2024 - 03 - 05)).unwrap();

        assert_eq!(got.clause, "owner = ?1 AND date >= ?2");
        assert_eq!(got.params, vec![text("u1"), text("2024-02-24")]);
    }

    #[test]
    fn last_months_uses_calendar_months() {
        let got =
            compile_filter("u1", &FilterSpec::LastMonths(1), date!(2024 - 03 - 31)).unwrap();

        assert_eq!(got.params, vec![text("u1"), text("2024-02-29")]);
    }

    #[test]
    fn months_before_crosses_years() {
        assert_eq!(
            months_before(date!(2024 - 01 - 15), 1),
            Some(date!(2023 - 12 - 15))
        );
        assert_eq!(
            months_before(date!(2024 - 05 - 31), 15),
            Some(date!(2023 - 02 - 28))
        );
        assert_eq!(
            months_before(date!(2024 - 05 - 31), 0),
            Some(date!(2024 - 05 - 31))
        );
    }

    #[test]
    fn reversed_range_is_rejected() {
        let spec = FilterSpec::DateRange {
            start: date!(2024 - 05 - 01),
            end: date!(2024 - 04 - 01),
        };

        let result = compile_filter("u1", &spec, date!(2024 - 06 - 01));

        assert!(
            matches!(result, Err(Error::InvalidArgument(_))),
            "want InvalidArgument, got {result:?}"
        );
    }

    #[test]
    fn huge_relative_windows_are_rejected() {
        let result = compile_filter("u1", &FilterSpec::LastDays(u32::MAX), date!(2024 - 06 - 01));

        assert!(
            matches!(result, Err(Error::InvalidArgument(_))),
            "want InvalidArgument, got {result:?}"
        );
    }

    #[test]
    fn compiling_is_deterministic() {
        let spec = FilterSpec::LastMonths(6);
        let today = date!(2024 - 08 - 31);

        assert_eq!(
            compile_filter("u1", &spec, today),
            compile_filter("u1", &spec, today)
        );
    }
}
