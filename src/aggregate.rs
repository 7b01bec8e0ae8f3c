use std::collections::BTreeMap;

use uuid::Uuid;

use crate::models::{
    DailyAttendance, DayStatus, DaySummary, MonthSummary, OverallAttendance, SubjectRecord,
    SubjectSummary,
};

/// Percentage of attended classes, or `None` when nothing was scheduled.
pub fn percentage(attended: u64, total: u64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(100.0 * attended as f64 / total as f64)
    }
}

/// Sums attended and scheduled classes, widened to `u64`.
pub fn totals(subjects: &[SubjectRecord]) -> (u64, u64) {
    subjects.iter().fold((0, 0), |(attended, total), subject| {
        (
            attended + u64::from(subject.attended_classes),
            total + u64::from(subject.total_classes),
        )
    })
}

pub fn status_from_totals(attended: u64, total: u64) -> DayStatus {
    if total == 0 {
        DayStatus::None
    } else if attended >= total {
        DayStatus::Full
    } else if attended > 0 {
        DayStatus::Partial
    } else {
        DayStatus::Absent
    }
}

/// Status of a single day. A missing record means no classes were recorded.
pub fn day_status(record: Option<&DailyAttendance>) -> DayStatus {
    match record {
        Some(record) => {
            let (attended, total) = totals(&record.subjects);
            status_from_totals(attended, total)
        }
        None => DayStatus::None,
    }
}

pub fn summarize_day(record: &DailyAttendance) -> DaySummary {
    let (total_attended, total_classes) = totals(&record.subjects);
    DaySummary {
        total_attended,
        total_classes,
        percentage: percentage(total_attended, total_classes),
        status: status_from_totals(total_attended, total_classes),
    }
}

pub fn overall_percentage(subjects: &[SubjectRecord]) -> f64 {
    let (attended, total) = totals(subjects);
    percentage(attended, total).unwrap_or(0.0)
}

pub fn accumulate_overall(user_id: Uuid, subjects: Vec<SubjectRecord>) -> OverallAttendance {
    let overall_percentage = overall_percentage(&subjects);
    OverallAttendance {
        user_id,
        subjects,
        overall_percentage,
    }
}

/// Sums each subject code across the given days, ordered by code.
///
/// Name and faculty are taken from the first day the subject appears.
pub fn subject_breakdown(records: &[DailyAttendance]) -> Vec<SubjectSummary> {
    let mut by_code: BTreeMap<&str, (&SubjectRecord, u64, u64)> = BTreeMap::new();

    for subject in records.iter().flat_map(|record| record.subjects.iter()) {
        let entry = by_code
            .entry(subject.subject_code.as_str())
            .or_insert((subject, 0, 0));
        entry.1 += u64::from(subject.attended_classes);
        entry.2 += u64::from(subject.total_classes);
    }

    by_code
        .into_values()
        .map(|(first, attended, total)| SubjectSummary {
            subject_code: first.subject_code.clone(),
            subject_name: first.subject_name.clone(),
            faculty_name: first.faculty_name.clone(),
            attended_classes: attended,
            total_classes: total,
            percentage: percentage(attended, total),
        })
        .collect()
}

pub fn summarize_month(year: i32, month: u32, records: &[DailyAttendance]) -> MonthSummary {
    let mut summary = MonthSummary {
        year,
        month,
        full_days: 0,
        partial_days: 0,
        absent_days: 0,
        no_class_days: 0,
        total_attended: 0,
        total_classes: 0,
        percentage: None,
        subjects: subject_breakdown(records),
    };

    for record in records {
        let day = summarize_day(record);
        match day.status {
            DayStatus::Full => summary.full_days += 1,
            DayStatus::Partial => summary.partial_days += 1,
            DayStatus::Absent => summary.absent_days += 1,
            DayStatus::None => summary.no_class_days += 1,
        }
        summary.total_attended += day.total_attended;
        summary.total_classes += day.total_classes;
    }

    summary.percentage = percentage(summary.total_attended, summary.total_classes);
    summary
}
