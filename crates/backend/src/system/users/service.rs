use chrono::Utc;
use contracts::system::roles::Role;
use contracts::system::users::{ChangePasswordDto, CreateUserDto, UpdateUserDto, User};
use sea_orm::DatabaseConnection;

use super::repository;
use crate::shared::error::{AppError, AppResult};
use crate::system::auth::password;

fn validate_email(email: &Option<String>) -> AppResult<()> {
    if let Some(email) = email {
        if !email.trim().is_empty() && !email.contains('@') {
            return Err(AppError::Validation("Invalid email format".into()));
        }
    }
    Ok(())
}

pub async fn create(
    db: &DatabaseConnection,
    dto: CreateUserDto,
    created_by: Option<String>,
) -> AppResult<String> {
    let username = dto.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::Validation("Username cannot be empty".into()));
    }
    if repository::get_by_username(db, &username).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Username '{}' already exists",
            username
        )));
    }
    validate_email(&dto.email)?;
    password::validate_password_strength(&dto.password).map_err(AppError::Validation)?;

    let password_hash = password::hash_password(&dto.password)?;
    let now = Utc::now().to_rfc3339();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username,
        email: dto.email,
        full_name: dto.full_name,
        is_active: true,
        role: dto.role,
        created_at: now.clone(),
        updated_at: now,
        last_login_at: None,
        created_by,
    };
    repository::create_with_password(db, &user, &password_hash).await?;
    tracing::info!("User {} created with role {}", user.username, user.role);
    Ok(user.id)
}

pub async fn update(db: &DatabaseConnection, dto: UpdateUserDto) -> AppResult<()> {
    let mut user = repository::get_by_id(db, &dto.id)
        .await?
        .ok_or_else(|| AppError::not_found("User", &dto.id))?;
    validate_email(&dto.email)?;

    // The last active admin cannot lock everybody out
    if user.role == Role::Admin && (dto.role != Role::Admin || !dto.is_active) {
        let admins = repository::list_active_by_role(db, Role::Admin).await?;
        if admins.len() <= 1 && user.is_active {
            return Err(AppError::Conflict(
                "Cannot demote or deactivate the last active admin".into(),
            ));
        }
    }

    user.email = dto.email;
    user.full_name = dto.full_name;
    user.is_active = dto.is_active;
    user.role = dto.role;
    user.updated_at = Utc::now().to_rfc3339();
    repository::update(db, &user).await?;
    Ok(())
}

pub async fn delete(db: &DatabaseConnection, id: &str, requester_id: &str) -> AppResult<()> {
    if id == requester_id {
        return Err(AppError::Conflict("You cannot delete your own account".into()));
    }
    if !repository::delete(db, id).await? {
        return Err(AppError::not_found("User", id));
    }
    Ok(())
}

pub async fn get_by_id(db: &DatabaseConnection, id: &str) -> AppResult<User> {
    repository::get_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))
}

pub async fn list_all(db: &DatabaseConnection) -> AppResult<Vec<User>> {
    Ok(repository::list_all(db).await?)
}

/// Own password requires the old one; an admin may reset anyone's
pub async fn change_password(
    db: &DatabaseConnection,
    dto: ChangePasswordDto,
    requester_id: &str,
) -> AppResult<()> {
    let user = get_by_id(db, &dto.user_id).await?;
    let requester = get_by_id(db, requester_id).await?;

    if user.id != requester.id {
        if requester.role != Role::Admin {
            return Err(AppError::Forbidden);
        }
    } else if requester.role != Role::Admin || dto.old_password.is_some() {
        let old_password = dto
            .old_password
            .as_deref()
            .ok_or_else(|| AppError::Validation("Old password is required".into()))?;
        let current_hash = repository::get_password_hash(db, &user.id)
            .await?
            .ok_or_else(|| AppError::not_found("User", &user.id))?;
        if !password::verify_password(old_password, &current_hash)? {
            return Err(AppError::Validation("Invalid old password".into()));
        }
    }

    password::validate_password_strength(&dto.new_password).map_err(AppError::Validation)?;
    let new_hash = password::hash_password(&dto.new_password)?;
    repository::update_password(db, &user.id, &new_hash).await?;
    tracing::info!("Password changed for user {}", user.username);
    Ok(())
}

/// `Ok(None)` for unknown user, wrong password or inactive account
pub async fn verify_credentials(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> AppResult<Option<User>> {
    let user = match repository::get_by_username(db, username.trim()).await? {
        Some(u) => u,
        None => return Ok(None),
    };
    if !user.is_active {
        tracing::warn!("Login attempt for inactive user {}", user.username);
        return Ok(None);
    }
    let password_hash = match repository::get_password_hash(db, &user.id).await? {
        Some(hash) => hash,
        None => return Ok(None),
    };
    if !password::verify_password(password, &password_hash)? {
        return Ok(None);
    }
    if let Err(e) = repository::update_last_login(db, &user.id).await {
        tracing::warn!("Failed to record last login for {}: {}", user.username, e);
    }
    Ok(Some(user))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::shared::data::db::connect_in_memory;

    pub(crate) async fn create_user(db: &DatabaseConnection, username: &str, role: Role) -> String {
        create(
            db,
            CreateUserDto {
                username: username.into(),
                password: "pass1234".into(),
                email: None,
                full_name: Some(username.to_uppercase()),
                role,
            },
            None,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_username_is_conflict() {
        let db = connect_in_memory().await.unwrap();
        create_user(&db, "asha", Role::Sales).await;
        let err = create(
            &db,
            CreateUserDto {
                username: "asha".into(),
                password: "pass1234".into(),
                email: None,
                full_name: None,
                role: Role::Sales,
            },
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn credentials_are_checked_and_inactive_users_rejected() {
        let db = connect_in_memory().await.unwrap();
        let id = create_user(&db, "vikram", Role::Technician).await;

        let user = verify_credentials(&db, "vikram", "pass1234").await.unwrap();
        assert_eq!(user.unwrap().role, Role::Technician);
        assert!(verify_credentials(&db, "vikram", "nope").await.unwrap().is_none());

        update(
            &db,
            UpdateUserDto {
                id,
                email: None,
                full_name: None,
                is_active: false,
                role: Role::Technician,
            },
        )
        .await
        .unwrap();
        assert!(verify_credentials(&db, "vikram", "pass1234").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn password_change_rules() {
        let db = connect_in_memory().await.unwrap();
        let admin = create_user(&db, "root", Role::Admin).await;
        let clerk = create_user(&db, "clerk", Role::Accounts).await;
        let other = create_user(&db, "other", Role::Sales).await;

        let own_without_old = ChangePasswordDto {
            user_id: clerk.clone(),
            old_password: None,
            new_password: "newpass".into(),
        };
        assert!(matches!(
            change_password(&db, own_without_old, &clerk).await,
            Err(AppError::Validation(_))
        ));

        let someone_else = ChangePasswordDto {
            user_id: other.clone(),
            old_password: None,
            new_password: "newpass".into(),
        };
        assert!(matches!(
            change_password(&db, someone_else.clone(), &clerk).await,
            Err(AppError::Forbidden)
        ));
        change_password(&db, someone_else, &admin).await.unwrap();
        assert!(verify_credentials(&db, "other", "newpass").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn last_admin_cannot_be_demoted() {
        let db = connect_in_memory().await.unwrap();
        let admin = create_user(&db, "root", Role::Admin).await;
        let err = update(
            &db,
            UpdateUserDto {
                id: admin,
                email: None,
                full_name: None,
                is_active: true,
                role: Role::Manager,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
