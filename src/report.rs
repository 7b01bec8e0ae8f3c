use std::fmt::Write;

use crate::models::{DayCell, DayStatus, MonthSummary};

fn glyph(cell: &DayCell) -> &'static str {
    if !cell.is_current_month {
        return " ";
    }
    match cell.summary.as_ref().map(|summary| summary.status) {
        Some(DayStatus::Full) => "F",
        Some(DayStatus::Partial) => "P",
        Some(DayStatus::Absent) => "A",
        Some(DayStatus::None) | None => "-",
    }
}

fn format_percentage(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.1}%"),
        None => "n/a".to_string(),
    }
}

pub fn build_report(username: &str, summary: &MonthSummary, cells: &[DayCell]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}-{:02})",
        username, summary.year, summary.month
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Month Totals");
    let _ = writeln!(
        output,
        "- Attended {} of {} classes ({})",
        summary.total_attended,
        summary.total_classes,
        format_percentage(summary.percentage)
    );
    let _ = writeln!(
        output,
        "- Full days: {}, partial days: {}, absent days: {}, no-class days: {}",
        summary.full_days, summary.partial_days, summary.absent_days, summary.no_class_days
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");

    if summary.subjects.is_empty() {
        let _ = writeln!(output, "No attendance recorded for this month.");
    } else {
        let _ = writeln!(output, "| Code | Subject | Faculty | Attended | Total | % |");
        let _ = writeln!(output, "|---|---|---|---|---|---|");
        for subject in &summary.subjects {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} |",
                subject.subject_code,
                subject.subject_name,
                subject.faculty_name,
                subject.attended_classes,
                subject.total_classes,
                format_percentage(subject.percentage)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Calendar");
    let _ = writeln!(
        output,
        "F = full, P = partial, A = absent, - = no classes"
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "```");
    for week in cells.chunks(7) {
        let days: Vec<String> = week
            .iter()
            .map(|cell| format!("{:>2}{}", cell.date.format("%d"), glyph(cell)))
            .collect();
        let _ = writeln!(output, "{}", days.join(" "));
    }
    let _ = writeln!(output, "```");

    output
}
