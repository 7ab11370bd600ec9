use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Worked time below this threshold turns a check-out into a half day
pub const HALF_DAY_THRESHOLD_HOURS: f64 = 4.0;

crate::string_enum! {
    pub enum AttendanceStatus {
        Present => "PRESENT",
        HalfDay => "HALF_DAY",
        Absent => "ABSENT",
        Leave => "LEAVE",
    }
}

/// One row per user per working day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub user_id: String,
    pub work_date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// `work_date` is the dealership's local date of the punch, which can
    /// differ from the UTC date of `at`
    pub fn check_in(user_id: &str, work_date: NaiveDate, at: DateTime<Utc>, note: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            work_date,
            check_in: Some(at),
            check_out: None,
            status: AttendanceStatus::Present,
            note,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn marked(user_id: &str, work_date: NaiveDate, status: AttendanceStatus, note: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            work_date,
            check_in: None,
            check_out: None,
            status,
            note,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn check_out(&mut self, at: DateTime<Utc>) -> Result<(), String> {
        let check_in = self
            .check_in
            .ok_or_else(|| "Cannot check out without checking in".to_string())?;
        if self.check_out.is_some() {
            return Err(format!("Already checked out for {}", self.work_date));
        }
        if at < check_in {
            return Err("Check-out cannot be earlier than check-in".into());
        }
        self.check_out = Some(at);
        self.status = if self.hours_worked() < HALF_DAY_THRESHOLD_HOURS {
            AttendanceStatus::HalfDay
        } else {
            AttendanceStatus::Present
        };
        self.updated_at = at;
        Ok(())
    }

    pub fn hours_worked(&self) -> f64 {
        match (self.check_in, self.check_out) {
            (Some(start), Some(end)) => (end - start).num_minutes() as f64 / 60.0,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CheckInDto {
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAttendanceDto {
    pub user_id: String,
    pub work_date: NaiveDate,
    pub status: AttendanceStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AttendanceListQuery {
    pub user_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceSummaryQuery {
    pub year: i32,
    pub month: u32,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AttendanceSummaryRow {
    pub user_id: String,
    pub username: String,
    pub present: i64,
    pub half_day: i64,
    pub absent: i64,
    pub leave: i64,
    pub hours: f64,
}

impl AttendanceSummaryRow {
    pub fn add(&mut self, record: &AttendanceRecord) {
        match record.status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::HalfDay => self.half_day += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Leave => self.leave += 1,
        }
        self.hours = crate::domain::common::money::round2(self.hours + record.hours_worked());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 3, 30, 0).unwrap()
    }

    #[test]
    fn full_day_is_present() {
        let mut record = AttendanceRecord::check_in("u1", morning().date_naive(), morning(), None);
        record.check_out(morning() + Duration::hours(8)).unwrap();
        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(record.hours_worked(), 8.0);
    }

    #[test]
    fn short_day_is_half_day() {
        let mut record = AttendanceRecord::check_in("u1", morning().date_naive(), morning(), None);
        record
            .check_out(morning() + Duration::minutes(150))
            .unwrap();
        assert_eq!(record.status, AttendanceStatus::HalfDay);
        assert_eq!(record.hours_worked(), 2.5);
    }

    #[test]
    fn double_check_out_is_rejected() {
        let mut record = AttendanceRecord::check_in("u1", morning().date_naive(), morning(), None);
        record.check_out(morning() + Duration::hours(5)).unwrap();
        assert!(record.check_out(morning() + Duration::hours(6)).is_err());
    }

    #[test]
    fn marked_leave_has_no_check_in() {
        let mut record = AttendanceRecord::marked(
            "u1",
            morning().date_naive(),
            AttendanceStatus::Leave,
            None,
        );
        assert!(record.check_out(morning()).is_err());
    }

    #[test]
    fn summary_counts_statuses_and_hours() {
        let mut a = AttendanceRecord::check_in("u1", morning().date_naive(), morning(), None);
        a.check_out(morning() + Duration::hours(9)).unwrap();
        let b = AttendanceRecord::marked("u1", morning().date_naive(), AttendanceStatus::Leave, None);
        let mut row = AttendanceSummaryRow::default();
        row.add(&a);
        row.add(&b);
        assert_eq!(row.present, 1);
        assert_eq!(row.leave, 1);
        assert_eq!(row.hours, 9.0);
    }
}
