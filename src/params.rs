//! Query-string parsing for the HTTP routes.
//!
//! Every field arrives as an optional string so that missing and
//! non-numeric values are reported with the parameter name instead of a
//! generic extractor rejection.

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::batch::{self, BatchError};
use crate::calendar::{self, CalendarError, WeekStart};
use crate::leaderboard::LeaderboardQuery;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("missing required parameter `{0}`")]
    Missing(&'static str),
    #[error("parameter `{name}` must be a number, got {value:?}")]
    NotNumeric { name: &'static str, value: String },
    #[error("parameter `weekStart` must be `sunday` or `monday`, got {0:?}")]
    InvalidWeekStart(String),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Batch(#[from] BatchError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMonthQuery {
    pub year: Option<String>,
    pub month: Option<String>,
    pub week_start: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthQuery {
    pub year: i32,
    pub month: u32,
    pub week_start: WeekStart,
    /// First day of the month.
    pub start: NaiveDate,
    /// First day of the following month.
    pub end: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawLeaderboardQuery {
    pub batch: Option<String>,
    pub subject: Option<String>,
    pub limit: Option<String>,
}

fn required<'a>(name: &'static str, value: &'a Option<String>) -> Result<&'a str, ParamError> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ParamError::Missing(name)),
    }
}

fn numeric<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ParamError> {
    value.parse().map_err(|_| ParamError::NotNumeric {
        name,
        value: value.to_string(),
    })
}

impl TryFrom<RawMonthQuery> for MonthQuery {
    type Error = ParamError;

    fn try_from(raw: RawMonthQuery) -> Result<Self, Self::Error> {
        let year = numeric("year", required("year", &raw.year)?)?;
        let month = numeric("month", required("month", &raw.month)?)?;
        let (start, end) = calendar::month_bounds(year, month)?;

        let week_start = match raw.week_start.as_deref().map(str::trim) {
            None | Some("") => WeekStart::default(),
            Some(value) if value.eq_ignore_ascii_case("sunday") => WeekStart::Sunday,
            Some(value) if value.eq_ignore_ascii_case("monday") => WeekStart::Monday,
            Some(value) => return Err(ParamError::InvalidWeekStart(value.to_string())),
        };

        Ok(Self {
            year,
            month,
            week_start,
            start,
            end,
        })
    }
}

impl TryFrom<RawLeaderboardQuery> for LeaderboardQuery {
    type Error = ParamError;

    fn try_from(raw: RawLeaderboardQuery) -> Result<Self, Self::Error> {
        let batch = batch::validate_batch(required("batch", &raw.batch)?)?;
        let subject = raw
            .subject
            .map(|subject| subject.trim().to_string())
            .filter(|subject| !subject.is_empty());
        let limit = match raw.limit.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(numeric("limit", value)?),
        };

        Ok(Self {
            batch,
            subject,
            limit,
        })
    }
}
