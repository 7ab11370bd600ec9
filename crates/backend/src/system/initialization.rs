use anyhow::Result;
use contracts::system::roles::Role;
use contracts::system::users::CreateUserDto;
use sea_orm::DatabaseConnection;

use crate::shared::config;
use crate::system::users::{repository, service};

/// Create the configured admin account when `sys_users` is empty
pub async fn ensure_admin_user_exists(db: &DatabaseConnection) -> Result<()> {
    if repository::count_users(db).await? > 0 {
        return Ok(());
    }

    let auth = &config::current().auth;
    tracing::info!("No users found. Creating default admin user...");
    let admin_dto = CreateUserDto {
        username: auth.admin_username.clone(),
        password: auth.admin_password.clone(),
        email: None,
        full_name: Some("Administrator".to_string()),
        role: Role::Admin,
    };
    let admin_id = service::create(db, admin_dto, None)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create default admin: {}", e))?;

    tracing::warn!("Default admin user '{}' created (id {})", auth.admin_username, admin_id);
    tracing::warn!("Change the default admin password before going live");
    Ok(())
}
