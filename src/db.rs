use anyhow::Context;
use chrono::{Duration, NaiveDate};
use sqlx::{PgConnection, PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregate;
use crate::batch;
use crate::models::{
    CohortMember, DailyAttendance, OverallAttendance, RecordError, SubjectRecord, User,
};

/// One subject's counts for one user on one day, as ingested.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AttendanceRow {
    pub email: String,
    pub date: NaiveDate,
    pub subject_code: String,
    pub subject_name: String,
    pub faculty_name: String,
    pub attended_classes: u32,
    pub total_classes: u32,
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub batch: String,
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let students = [
        "2023ugcs041@nitjsr.ac.in",
        "2023ugcs057@nitjsr.ac.in",
        "2023ugcs063@nitjsr.ac.in",
        "2022ugme012@nitjsr.ac.in",
    ];
    let subjects = [
        ("CS1201", "Data Structures", "Dr. Meera Rao"),
        ("MA1202", "Discrete Mathematics", "Dr. Arun Sen"),
        ("EC1203", "Digital Electronics", "Prof. Kavya Iyer"),
    ];
    let first_day = NaiveDate::from_ymd_opt(2026, 2, 2).context("invalid date")?;

    let mut tx = pool.begin().await?;
    let mut written = 0usize;

    for (student_index, email) in students.iter().enumerate() {
        for offset in 0..5u32 {
            let date = first_day + Duration::days(i64::from(offset));
            for (subject_index, (code, name, faculty)) in subjects.iter().enumerate() {
                let total_classes = 1 + (offset + subject_index as u32) % 2;
                let skipped = (student_index as u32 + offset + subject_index as u32) % 4 == 0;
                let row = AttendanceRow {
                    email: email.to_string(),
                    date,
                    subject_code: code.to_string(),
                    subject_name: name.to_string(),
                    faculty_name: faculty.to_string(),
                    attended_classes: if skipped { 0 } else { total_classes },
                    total_classes,
                };
                upsert_attendance(&mut *tx, &validate_row(&row)?).await?;
                written += 1;
            }
        }
    }

    tx.commit().await?;
    info!(rows = written, "seeded attendance");
    Ok(written)
}

/// An ingested row that passed validation and is ready to write.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRow {
    pub email: String,
    pub username: String,
    pub batch: String,
    pub date: NaiveDate,
    pub record: SubjectRecord,
    pub attended: i32,
    pub total: i32,
}

/// Checks the counts and derives username and batch from the email.
pub fn validate_row(row: &AttendanceRow) -> anyhow::Result<ValidatedRow> {
    let record = SubjectRecord::new(
        row.subject_code.trim(),
        row.subject_name.trim(),
        row.faculty_name.trim(),
        row.attended_classes,
        row.total_classes,
    )?;
    let username = batch::username_from_email(&row.email)?;
    let batch_code = batch::derive_batch(&row.email)?;
    let attended = i32::try_from(record.attended_classes).context("attended count too large")?;
    let total = i32::try_from(record.total_classes).context("total count too large")?;

    Ok(ValidatedRow {
        email: row.email.trim().to_ascii_lowercase(),
        username,
        batch: batch_code,
        date: row.date,
        record,
        attended,
        total,
    })
}

/// Parses and validates every CSV row before anything is written. Errors
/// name the line the offending record starts on.
pub fn read_rows<R: std::io::Read>(input: R) -> anyhow::Result<Vec<ValidatedRow>> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers().context("failed to read CSV header")?.clone();
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result.context("malformed CSV record")?;
        let line = record.position().map_or(0, |position| position.line());
        let row: AttendanceRow = record
            .deserialize(Some(&headers))
            .with_context(|| format!("malformed row at line {line}"))?;
        rows.push(validate_row(&row).with_context(|| format!("rejected row at line {line}"))?);
    }

    Ok(rows)
}

/// Writes one validated row: user, day and subject counts. Re-ingesting the
/// same user, day and subject replaces the stored counts.
pub async fn upsert_attendance(conn: &mut PgConnection, row: &ValidatedRow) -> anyhow::Result<()> {
    let user_id: Uuid = sqlx::query(
        r#"
        INSERT INTO attendance_board.users (id, username, email, batch)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE
        SET username = EXCLUDED.username, batch = EXCLUDED.batch
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&row.username)
    .bind(&row.email)
    .bind(&row.batch)
    .fetch_one(&mut *conn)
    .await?
    .try_get("id")?;

    let daily_id: Uuid = sqlx::query(
        r#"
        INSERT INTO attendance_board.daily_attendance (id, user_id, date)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, date) DO UPDATE SET date = EXCLUDED.date
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(row.date)
    .fetch_one(&mut *conn)
    .await?
    .try_get("id")?;

    sqlx::query(
        r#"
        INSERT INTO attendance_board.daily_subjects
        (daily_id, subject_code, subject_name, faculty_name, attended_classes, total_classes)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (daily_id, subject_code) DO UPDATE
        SET subject_name = EXCLUDED.subject_name,
            faculty_name = EXCLUDED.faculty_name,
            attended_classes = EXCLUDED.attended_classes,
            total_classes = EXCLUDED.total_classes
        "#,
    )
    .bind(daily_id)
    .bind(&row.record.subject_code)
    .bind(&row.record.subject_name)
    .bind(&row.record.faculty_name)
    .bind(row.attended)
    .bind(row.total)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let rows = read_rows(file)?;

    let mut tx = pool.begin().await?;
    for row in &rows {
        upsert_attendance(&mut *tx, row).await?;
    }
    tx.commit().await?;

    info!(rows = rows.len(), path = %csv_path.display(), "imported attendance");
    Ok(rows.len())
}

/// Subject columns of a joined row: code, name, faculty, attended, total.
pub type SubjectColumns = (String, String, String, i64, i64);

fn subject_from_columns(columns: SubjectColumns) -> Result<SubjectRecord, RecordError> {
    let (code, name, faculty, attended, total) = columns;
    SubjectRecord::from_counts(code, name, faculty, attended, total)
}

/// Folds date-ordered join rows into one record per day. A day whose
/// subject columns are NULL is kept with no subjects.
pub fn group_daily(
    user_id: Uuid,
    rows: Vec<(NaiveDate, Option<SubjectColumns>)>,
) -> Result<Vec<DailyAttendance>, RecordError> {
    let mut days: Vec<DailyAttendance> = Vec::new();

    for (date, subject) in rows {
        if days.last().map(|day| day.date) != Some(date) {
            days.push(DailyAttendance {
                user_id,
                date,
                subjects: Vec::new(),
            });
        }

        if let (Some(columns), Some(day)) = (subject, days.last_mut()) {
            day.subjects.push(subject_from_columns(columns)?);
        }
    }

    Ok(days)
}

/// Folds user-ordered join rows (id, username, batch, subject) into batch
/// members and sets each member's overall percentage.
pub fn group_members(
    rows: Vec<(Uuid, String, String, Option<SubjectColumns>)>,
) -> Result<Vec<CohortMember>, RecordError> {
    let mut members: Vec<CohortMember> = Vec::new();

    for (id, username, batch, subject) in rows {
        if members.last().map(|member| member.user.id) != Some(id) {
            members.push(CohortMember {
                user: User {
                    id,
                    username,
                    batch,
                    overall_percentage: 0.0,
                },
                subjects: Vec::new(),
            });
        }

        if let (Some(columns), Some(member)) = (subject, members.last_mut()) {
            member.subjects.push(subject_from_columns(columns)?);
        }
    }

    for member in &mut members {
        member.user.overall_percentage = aggregate::overall_percentage(&member.subjects);
    }

    Ok(members)
}

pub async fn fetch_user(pool: &PgPool, username: &str) -> anyhow::Result<Option<UserRow>> {
    let row = sqlx::query(
        "SELECT id, username, batch FROM attendance_board.users WHERE username = $1",
    )
    .bind(username.trim().to_ascii_uppercase())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(UserRow {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        batch: row.try_get("batch")?,
    }))
}

/// Days in `[start, end)` for one user, ordered by date.
pub async fn fetch_daily(
    pool: &PgPool,
    user_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<DailyAttendance>> {
    let rows = sqlx::query(
        r#"
        SELECT d.date, s.subject_code, s.subject_name, s.faculty_name,
               s.attended_classes, s.total_classes
        FROM attendance_board.daily_attendance d
        LEFT JOIN attendance_board.daily_subjects s ON s.daily_id = d.id
        WHERE d.user_id = $1 AND d.date >= $2 AND d.date < $3
        ORDER BY d.date, s.subject_code
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    let mut joined: Vec<(NaiveDate, Option<SubjectColumns>)> = Vec::with_capacity(rows.len());
    for row in rows {
        let code: Option<String> = row.try_get("subject_code")?;
        let subject: Option<SubjectColumns> = match code {
            Some(code) => {
                let attended: i32 = row.try_get("attended_classes")?;
                let total: i32 = row.try_get("total_classes")?;
                Some((
                    code,
                    row.try_get("subject_name")?,
                    row.try_get("faculty_name")?,
                    i64::from(attended),
                    i64::from(total),
                ))
            }
            None => None,
        };
        joined.push((row.try_get("date")?, subject));
    }

    let days = group_daily(user_id, joined)?;
    debug!(%user_id, %start, %end, days = days.len(), "fetched daily attendance");
    Ok(days)
}

pub async fn fetch_overall(pool: &PgPool, user_id: Uuid) -> anyhow::Result<OverallAttendance> {
    let rows = sqlx::query(
        r#"
        SELECT s.subject_code, MAX(s.subject_name) AS subject_name,
               MAX(s.faculty_name) AS faculty_name,
               SUM(s.attended_classes)::BIGINT AS attended,
               SUM(s.total_classes)::BIGINT AS total
        FROM attendance_board.daily_subjects s
        JOIN attendance_board.daily_attendance d ON d.id = s.daily_id
        WHERE d.user_id = $1
        GROUP BY s.subject_code
        ORDER BY s.subject_code
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut subjects = Vec::with_capacity(rows.len());
    for row in rows {
        subjects.push(SubjectRecord::from_counts(
            row.try_get("subject_code")?,
            row.try_get("subject_name")?,
            row.try_get("faculty_name")?,
            row.try_get("attended")?,
            row.try_get("total")?,
        )?);
    }

    Ok(aggregate::accumulate_overall(user_id, subjects))
}

/// Users whose username starts with `batch`, ordered by username, each with
/// cumulative subject counts. `batch` must already be validated.
pub async fn fetch_batch_members(pool: &PgPool, batch: &str) -> anyhow::Result<Vec<CohortMember>> {
    let rows = sqlx::query(
        r#"
        SELECT u.id, u.username, u.batch, s.subject_code,
               MAX(s.subject_name) AS subject_name,
               MAX(s.faculty_name) AS faculty_name,
               SUM(s.attended_classes)::BIGINT AS attended,
               SUM(s.total_classes)::BIGINT AS total
        FROM attendance_board.users u
        LEFT JOIN attendance_board.daily_attendance d ON d.user_id = u.id
        LEFT JOIN attendance_board.daily_subjects s ON s.daily_id = d.id
        WHERE u.username LIKE $1
        GROUP BY u.id, u.username, u.batch, s.subject_code
        ORDER BY u.username, s.subject_code
        "#,
    )
    .bind(format!("{batch}%"))
    .fetch_all(pool)
    .await?;

    let mut joined: Vec<(Uuid, String, String, Option<SubjectColumns>)> =
        Vec::with_capacity(rows.len());
    for row in rows {
        let code: Option<String> = row.try_get("subject_code")?;
        let subject: Option<SubjectColumns> = match code {
            Some(code) => {
                let attended: Option<i64> = row.try_get("attended")?;
                let total: Option<i64> = row.try_get("total")?;
                Some((
                    code,
                    row.try_get("subject_name")?,
                    row.try_get("faculty_name")?,
                    attended.unwrap_or(0),
                    total.unwrap_or(0),
                ))
            }
            None => None,
        };
        joined.push((
            row.try_get("id")?,
            row.try_get("username")?,
            row.try_get("batch")?,
            subject,
        ));
    }

    let members = group_members(joined)?;
    debug!(batch, members = members.len(), "fetched batch members");
    Ok(members)
}
