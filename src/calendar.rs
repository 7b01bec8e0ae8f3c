use chrono::{Datelike, Days, NaiveDate};
use thiserror::Error;

use crate::aggregate;
use crate::models::{DailyAttendance, DayCell};

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),
    #[error("year {0} is out of range")]
    InvalidYear(i32),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

/// Years accepted for calendar queries.
pub const YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// Half-open range `[start of month, start of next month)`.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), CalendarError> {
    if !(1..=12).contains(&month) {
        return Err(CalendarError::InvalidMonth(month));
    }
    if !YEARS.contains(&year) {
        return Err(CalendarError::InvalidYear(year));
    }

    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or(CalendarError::InvalidYear(year))?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or(CalendarError::InvalidYear(year))?;

    Ok((start, end))
}

fn days_since_week_start(date: NaiveDate, week_start: WeekStart) -> u64 {
    let offset = match week_start {
        WeekStart::Sunday => date.weekday().num_days_from_sunday(),
        WeekStart::Monday => date.weekday().num_days_from_monday(),
    };
    u64::from(offset)
}

/// Lays out a month on a 7-column grid, padded to whole weeks.
///
/// Records are matched to cells by date; when two records share a date
/// the first one in `records` is used.
pub fn build_month_grid(
    year: i32,
    month: u32,
    records: &[DailyAttendance],
    week_start: WeekStart,
) -> Result<Vec<DayCell>, CalendarError> {
    let (start, end) = month_bounds(year, month)?;
    let out_of_range = CalendarError::InvalidYear(year);
    let last = end.checked_sub_days(Days::new(1)).ok_or(out_of_range)?;

    let grid_start = start
        .checked_sub_days(Days::new(days_since_week_start(start, week_start)))
        .ok_or(out_of_range)?;
    let grid_end = last
        .checked_add_days(Days::new(6 - days_since_week_start(last, week_start)))
        .ok_or(out_of_range)?;

    let cells = grid_start
        .iter_days()
        .take_while(|date| *date <= grid_end)
        .map(|date| {
            let attendance = records.iter().find(|record| record.date == date).cloned();
            let summary = attendance.as_ref().map(aggregate::summarize_day);
            DayCell {
                date,
                is_current_month: date >= start && date < end,
                attendance,
                summary,
            }
        })
        .collect();

    Ok(cells)
}
