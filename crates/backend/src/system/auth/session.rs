//! Login sessions: access tokens plus stored refresh tokens.

use chrono::Utc;
use contracts::system::auth::{LoginRequest, LoginResponse, RefreshResponse, UserInfo};
use contracts::system::users::User;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};

use super::jwt;
use crate::shared::error::{AppError, AppResult};
use crate::system::users::service as user_service;

fn user_info(user: User) -> UserInfo {
    UserInfo {
        id: user.id,
        username: user.username,
        full_name: user.full_name,
        email: user.email,
        role: user.role,
    }
}

pub async fn login(db: &DatabaseConnection, request: LoginRequest) -> AppResult<LoginResponse> {
    let user = user_service::verify_credentials(db, &request.username, &request.password)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Failed login for '{}'", request.username);
            AppError::Unauthorized
        })?;

    let access_token = jwt::generate_access_token(db, &user.id, &user.username, user.role).await?;
    let refresh_token = jwt::generate_refresh_token();
    store_refresh_token(db, &user.id, &refresh_token).await?;
    tracing::info!("User {} logged in", user.username);

    Ok(LoginResponse {
        access_token,
        refresh_token,
        user: user_info(user),
    })
}

pub async fn refresh(db: &DatabaseConnection, refresh_token: &str) -> AppResult<RefreshResponse> {
    let user_id = validate_refresh_token(db, refresh_token)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let user = match user_service::get_by_id(db, &user_id).await {
        Ok(user) if user.is_active => user,
        Ok(_) | Err(AppError::NotFound(_)) => return Err(AppError::Unauthorized),
        Err(e) => return Err(e),
    };
    let access_token = jwt::generate_access_token(db, &user.id, &user.username, user.role).await?;
    Ok(RefreshResponse { access_token })
}

pub async fn logout(db: &DatabaseConnection, refresh_token: &str) -> AppResult<()> {
    revoke_refresh_token(db, refresh_token).await?;
    Ok(())
}

pub async fn current_user(db: &DatabaseConnection, user_id: &str) -> AppResult<UserInfo> {
    Ok(user_info(user_service::get_by_id(db, user_id).await?))
}

async fn store_refresh_token<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    token: &str,
) -> anyhow::Result<()> {
    conn.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "INSERT INTO sys_refresh_tokens (id, user_id, token_hash, expires_at, created_at)
         VALUES (?, ?, ?, ?, ?)",
        [
            uuid::Uuid::new_v4().to_string().into(),
            user_id.into(),
            hash_token(token).into(),
            jwt::calculate_refresh_token_expiration().into(),
            Utc::now().to_rfc3339().into(),
        ],
    ))
    .await?;
    Ok(())
}

async fn validate_refresh_token<C: ConnectionTrait>(
    conn: &C,
    token: &str,
) -> anyhow::Result<Option<String>> {
    let row = conn
        .query_one(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "SELECT user_id FROM sys_refresh_tokens
             WHERE token_hash = ? AND expires_at > ? AND revoked_at IS NULL",
            [hash_token(token).into(), Utc::now().to_rfc3339().into()],
        ))
        .await?;
    match row {
        Some(row) => Ok(Some(row.try_get("", "user_id")?)),
        None => Ok(None),
    }
}

async fn revoke_refresh_token<C: ConnectionTrait>(conn: &C, token: &str) -> anyhow::Result<()> {
    conn.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "UPDATE sys_refresh_tokens SET revoked_at = ? WHERE token_hash = ? AND revoked_at IS NULL",
        [Utc::now().to_rfc3339().into(), hash_token(token).into()],
    ))
    .await?;
    Ok(())
}

fn hash_token(token: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::connect_in_memory;
    use crate::system::users::service::tests::create_user;
    use contracts::system::roles::Role;

    #[tokio::test]
    async fn login_refresh_logout_cycle() {
        let db = connect_in_memory().await.unwrap();
        create_user(&db, "meera", Role::Accounts).await;

        let response = login(
            &db,
            LoginRequest {
                username: "meera".into(),
                password: "pass1234".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(response.user.role, Role::Accounts);

        let claims = jwt::validate_token(&db, &response.access_token).await.unwrap();
        assert_eq!(claims.username, "meera");

        refresh(&db, &response.refresh_token).await.unwrap();
        logout(&db, &response.refresh_token).await.unwrap();
        assert!(matches!(
            refresh(&db, &response.refresh_token).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let db = connect_in_memory().await.unwrap();
        create_user(&db, "meera", Role::Accounts).await;
        let result = login(
            &db,
            LoginRequest {
                username: "meera".into(),
                password: "bad".into(),
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn token_hash_is_hex_sha256() {
        assert_eq!(hash_token("abc").len(), 64);
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }
}
