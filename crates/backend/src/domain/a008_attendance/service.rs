use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use contracts::domain::a008_attendance::aggregate::{
    AttendanceListQuery, AttendanceRecord, AttendanceSummaryQuery, AttendanceSummaryRow,
    CheckInDto, MarkAttendanceDto,
};
use sea_orm::{ConnectionTrait, DatabaseConnection};

use super::repository;
use crate::shared::config;
use crate::shared::error::{AppError, AppResult};
use crate::system::users::repository as users;

pub async fn check_in(db: &DatabaseConnection, user_id: &str, dto: CheckInDto) -> AppResult<AttendanceRecord> {
    let offset = config::current().dealership.local_offset();
    check_in_at(db, user_id, Utc::now(), offset, dto.note).await
}

/// One row per user per local day; a second check-in is a conflict
pub(crate) async fn check_in_at<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    at: DateTime<Utc>,
    offset: FixedOffset,
    note: Option<String>,
) -> AppResult<AttendanceRecord> {
    let work_date = at.with_timezone(&offset).date_naive();
    if let Some(existing) = repository::find_by_user_date(conn, user_id, work_date).await? {
        return Err(AppError::Conflict(format!(
            "Attendance for {} is already recorded ({})",
            existing.work_date, existing.status
        )));
    }
    let record = AttendanceRecord::check_in(user_id, work_date, at, note);
    repository::insert(conn, &record).await?;
    tracing::info!("User {} checked in for {}", user_id, record.work_date);
    Ok(record)
}

pub async fn check_out(db: &DatabaseConnection, user_id: &str) -> AppResult<AttendanceRecord> {
    let offset = config::current().dealership.local_offset();
    check_out_at(db, user_id, Utc::now(), offset).await
}

pub(crate) async fn check_out_at<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    at: DateTime<Utc>,
    offset: FixedOffset,
) -> AppResult<AttendanceRecord> {
    let work_date = at.with_timezone(&offset).date_naive();
    let mut record = repository::find_by_user_date(conn, user_id, work_date)
        .await?
        .ok_or_else(|| AppError::Conflict(format!("No check-in recorded for {}", work_date)))?;
    record.check_out(at).map_err(AppError::Conflict)?;
    repository::update(conn, &record).await?;
    tracing::info!(
        "User {} checked out after {:.2}h ({})",
        user_id,
        record.hours_worked(),
        record.status
    );
    Ok(record)
}

/// Manager override: set the day's status for any user, keeping punch times
pub async fn mark(db: &DatabaseConnection, dto: MarkAttendanceDto) -> AppResult<AttendanceRecord> {
    if users::get_by_id(db, &dto.user_id).await?.is_none() {
        return Err(AppError::Validation(format!("Unknown user '{}'", dto.user_id)));
    }
    match repository::find_by_user_date(db, &dto.user_id, dto.work_date).await? {
        Some(mut record) => {
            record.status = dto.status;
            if dto.note.is_some() {
                record.note = dto.note;
            }
            record.updated_at = Utc::now();
            repository::update(db, &record).await?;
            Ok(record)
        }
        None => {
            let record = AttendanceRecord::marked(&dto.user_id, dto.work_date, dto.status, dto.note);
            repository::insert(db, &record).await?;
            Ok(record)
        }
    }
}

pub async fn list(db: &DatabaseConnection, query: &AttendanceListQuery) -> AppResult<Vec<AttendanceRecord>> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::Validation("'from' must not be after 'to'".into()));
        }
    }
    Ok(repository::list(db, query).await?)
}

fn month_bounds(year: i32, month: u32) -> AppResult<(NaiveDate, NaiveDate)> {
    let invalid = || AppError::Validation(format!("Invalid month {}-{}", year, month));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    let last = next.pred_opt().ok_or_else(invalid)?;
    Ok((first, last))
}

/// Per-user counts by status and total hours for one calendar month
pub async fn monthly_summary(
    db: &DatabaseConnection,
    query: AttendanceSummaryQuery,
) -> AppResult<Vec<AttendanceSummaryRow>> {
    let (from, to) = month_bounds(query.year, query.month)?;
    let records = repository::list(
        db,
        &AttendanceListQuery {
            user_id: query.user_id.clone(),
            from: Some(from),
            to: Some(to),
        },
    )
    .await?;

    let usernames: BTreeMap<String, String> = users::list_all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    let mut rows: BTreeMap<String, AttendanceSummaryRow> = BTreeMap::new();
    for record in &records {
        rows.entry(record.user_id.clone())
            .or_insert_with(|| AttendanceSummaryRow {
                user_id: record.user_id.clone(),
                username: usernames.get(&record.user_id).cloned().unwrap_or_default(),
                ..Default::default()
            })
            .add(record);
    }

    let mut rows: Vec<AttendanceSummaryRow> = rows.into_values().collect();
    rows.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(rows)
}
