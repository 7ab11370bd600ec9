use axum::{extract::Query, Json};
use contracts::domain::a008_attendance::aggregate::{
    AttendanceListQuery, AttendanceRecord, AttendanceSummaryQuery, AttendanceSummaryRow,
    CheckInDto, MarkAttendanceDto,
};
use contracts::system::auth::TokenClaims;
use contracts::system::roles::Permission;

use crate::domain::a008_attendance;
use crate::shared::data::db::get_connection;
use crate::shared::error::AppResult;
use crate::system::auth::extractor::{CurrentUser, RequirePermission};

/// Without AttendanceManage a user only sees their own rows
fn scoped_user(claims: &TokenClaims, requested: Option<String>) -> AppResult<Option<String>> {
    if claims.has(Permission::AttendanceManage) {
        return Ok(requested);
    }
    claims.require(Permission::AttendanceSelf)?;
    Ok(Some(claims.sub.clone()))
}

/// GET /api/attendance
pub async fn list(
    CurrentUser(claims): CurrentUser,
    Query(mut query): Query<AttendanceListQuery>,
) -> AppResult<Json<Vec<AttendanceRecord>>> {
    query.user_id = scoped_user(&claims, query.user_id.take())?;
    Ok(Json(a008_attendance::service::list(get_connection(), &query).await?))
}

/// POST /api/attendance/check-in
pub async fn check_in(
    CurrentUser(claims): CurrentUser,
    Json(dto): Json<CheckInDto>,
) -> AppResult<Json<AttendanceRecord>> {
    claims.require(Permission::AttendanceSelf)?;
    Ok(Json(
        a008_attendance::service::check_in(get_connection(), &claims.sub, dto).await?,
    ))
}

/// POST /api/attendance/check-out
pub async fn check_out(CurrentUser(claims): CurrentUser) -> AppResult<Json<AttendanceRecord>> {
    claims.require(Permission::AttendanceSelf)?;
    Ok(Json(
        a008_attendance::service::check_out(get_connection(), &claims.sub).await?,
    ))
}

/// POST /api/attendance/mark
pub async fn mark(
    CurrentUser(claims): CurrentUser,
    Json(dto): Json<MarkAttendanceDto>,
) -> AppResult<Json<AttendanceRecord>> {
    claims.require(Permission::AttendanceManage)?;
    Ok(Json(a008_attendance::service::mark(get_connection(), dto).await?))
}

/// GET /api/attendance/summary?year&month
pub async fn summary(
    CurrentUser(claims): CurrentUser,
    Query(mut query): Query<AttendanceSummaryQuery>,
) -> AppResult<Json<Vec<AttendanceSummaryRow>>> {
    query.user_id = scoped_user(&claims, query.user_id.take())?;
    Ok(Json(
        a008_attendance::service::monthly_summary(get_connection(), query).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::system::roles::Role;

    fn claims(role: Role) -> TokenClaims {
        TokenClaims {
            sub: "me".into(),
            username: "me".into(),
            role,
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn test_staff_are_scoped_to_themselves() {
        let scoped = scoped_user(&claims(Role::Sales), Some("someone".into())).unwrap();
        assert_eq!(scoped.as_deref(), Some("me"));
    }

    #[test]
    fn test_managers_see_anyone() {
        assert_eq!(scoped_user(&claims(Role::Manager), None).unwrap(), None);
        let scoped = scoped_user(&claims(Role::Manager), Some("someone".into())).unwrap();
        assert_eq!(scoped.as_deref(), Some("someone"));
    }
}
