use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("subject {code}: attended {attended} exceeds total {total}")]
    AttendedExceedsTotal {
        code: String,
        attended: u32,
        total: u32,
    },
    #[error("subject {code}: class count {value} is negative or too large")]
    InvalidCount { code: String, value: i64 },
}

/// Attended and scheduled class counts for one subject.
///
/// The same shape carries a single day's counts or cumulative counts,
/// depending on where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRecord {
    pub subject_code: String,
    pub subject_name: String,
    pub faculty_name: String,
    pub attended_classes: u32,
    pub total_classes: u32,
}

impl SubjectRecord {
    pub fn new(
        subject_code: impl Into<String>,
        subject_name: impl Into<String>,
        faculty_name: impl Into<String>,
        attended_classes: u32,
        total_classes: u32,
    ) -> Result<Self, RecordError> {
        let subject_code = subject_code.into();
        if attended_classes > total_classes {
            return Err(RecordError::AttendedExceedsTotal {
                code: subject_code,
                attended: attended_classes,
                total: total_classes,
            });
        }

        Ok(Self {
            subject_code,
            subject_name: subject_name.into(),
            faculty_name: faculty_name.into(),
            attended_classes,
            total_classes,
        })
    }

    /// Builds a record from signed store counts.
    pub fn from_counts(
        subject_code: String,
        subject_name: String,
        faculty_name: String,
        attended: i64,
        total: i64,
    ) -> Result<Self, RecordError> {
        let attended_classes = count(&subject_code, attended)?;
        let total_classes = count(&subject_code, total)?;
        Self::new(
            subject_code,
            subject_name,
            faculty_name,
            attended_classes,
            total_classes,
        )
    }
}

fn count(code: &str, value: i64) -> Result<u32, RecordError> {
    u32::try_from(value).map_err(|_| RecordError::InvalidCount {
        code: code.to_string(),
        value,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAttendance {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub subjects: Vec<SubjectRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallAttendance {
    pub user_id: Uuid,
    pub subjects: Vec<SubjectRecord>,
    pub overall_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub batch: String,
    pub overall_percentage: f64,
}

/// A batch member as loaded for ranking: the user plus cumulative subjects.
#[derive(Debug, Clone)]
pub struct CohortMember {
    pub user: User,
    pub subjects: Vec<SubjectRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Full,
    Partial,
    Absent,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub total_attended: u64,
    pub total_classes: u64,
    pub percentage: Option<f64>,
    pub status: DayStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCell {
    pub date: NaiveDate,
    pub is_current_month: bool,
    pub attendance: Option<DailyAttendance>,
    pub summary: Option<DaySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub subject_code: String,
    pub subject_name: String,
    pub faculty_name: String,
    pub attended_classes: u64,
    pub total_classes: u64,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    pub full_days: usize,
    pub partial_days: usize,
    pub absent_days: usize,
    pub no_class_days: usize,
    pub total_attended: u64,
    pub total_classes: u64,
    pub percentage: Option<f64>,
    pub subjects: Vec<SubjectSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedUser {
    pub rank: usize,
    #[serde(flatten)]
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_attended_above_total() {
        let err = SubjectRecord::new("CS1201", "Data Structures", "Dr. Rao", 3, 2).unwrap_err();
        assert_eq!(
            err,
            RecordError::AttendedExceedsTotal {
                code: "CS1201".to_string(),
                attended: 3,
                total: 2,
            }
        );
    }

    #[test]
    fn rejects_negative_store_counts() {
        let err = SubjectRecord::from_counts(
            "CS1201".to_string(),
            "Data Structures".to_string(),
            "Dr. Rao".to_string(),
            -1,
            2,
        )
        .unwrap_err();
        assert!(matches!(err, RecordError::InvalidCount { value: -1, .. }));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let record = SubjectRecord::new("CS1201", "Data Structures", "Dr. Rao", 1, 2).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["subjectCode"], "CS1201");
        assert_eq!(value["attendedClasses"], 1);
        assert_eq!(value["totalClasses"], 2);
        assert_eq!(serde_json::to_value(DayStatus::None).unwrap(), "none");
    }

    #[test]
    fn ranked_user_flattens_user_fields() {
        let ranked = RankedUser {
            rank: 1,
            user: User {
                id: Uuid::nil(),
                username: "2023UGCS041".to_string(),
                batch: "2023UGCS".to_string(),
                overall_percentage: 95.0,
            },
        };
        let value = serde_json::to_value(&ranked).unwrap();
        assert_eq!(value["rank"], 1);
        assert_eq!(value["username"], "2023UGCS041");
        assert_eq!(value["overallPercentage"], 95.0);
    }
}
