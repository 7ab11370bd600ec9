use anyhow::Context;
use contracts::system::roles::Role;
use contracts::system::users::User;
use sea_orm::entity::prelude::*;
use sea_orm::{DatabaseBackend, PaginatorTrait, QueryOrder, Set, Statement};

use crate::domain::parse_column;

/// Staff account. The password hash never leaves this module except through
/// [`get_password_hash`].
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sys_users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub role: String,
    pub created_at: String,
    pub updated_at: String,
    pub last_login_at: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for User {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        Ok(User {
            role: parse_column::<Role>(&m.role)?,
            id: m.id,
            username: m.username,
            email: m.email,
            full_name: m.full_name,
            is_active: m.is_active,
            created_at: m.created_at,
            updated_at: m.updated_at,
            last_login_at: m.last_login_at,
            created_by: m.created_by,
        })
    }
}

fn into_users(models: Vec<Model>) -> anyhow::Result<Vec<User>> {
    models.into_iter().map(User::try_from).collect()
}

pub async fn create_with_password<C: ConnectionTrait>(
    conn: &C,
    user: &User,
    password_hash: &str,
) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(user.id.clone()),
        username: Set(user.username.clone()),
        email: Set(user.email.clone()),
        password_hash: Set(password_hash.to_string()),
        full_name: Set(user.full_name.clone()),
        is_active: Set(user.is_active),
        role: Set(user.role.as_str().to_string()),
        created_at: Set(user.created_at.clone()),
        updated_at: Set(user.updated_at.clone()),
        last_login_at: Set(user.last_login_at.clone()),
        created_by: Set(user.created_by.clone()),
    };
    Entity::insert(active)
        .exec(conn)
        .await
        .with_context(|| format!("Failed to insert user {}", user.username))?;
    Ok(())
}

pub async fn get_by_id<C: ConnectionTrait>(conn: &C, id: &str) -> anyhow::Result<Option<User>> {
    Entity::find_by_id(id.to_string())
        .one(conn)
        .await?
        .map(User::try_from)
        .transpose()
}

pub async fn get_by_username<C: ConnectionTrait>(conn: &C, username: &str) -> anyhow::Result<Option<User>> {
    Entity::find()
        .filter(Column::Username.eq(username))
        .one(conn)
        .await?
        .map(User::try_from)
        .transpose()
}

pub async fn get_password_hash<C: ConnectionTrait>(conn: &C, user_id: &str) -> anyhow::Result<Option<String>> {
    Ok(Entity::find_by_id(user_id.to_string())
        .one(conn)
        .await?
        .map(|m| m.password_hash))
}

pub async fn list_all<C: ConnectionTrait>(conn: &C) -> anyhow::Result<Vec<User>> {
    into_users(Entity::find().order_by_asc(Column::Username).all(conn).await?)
}

/// Active users holding `role`, ordered by username. Ticket round robin
/// depends on this order being stable.
pub async fn list_active_by_role<C: ConnectionTrait>(conn: &C, role: Role) -> anyhow::Result<Vec<User>> {
    into_users(
        Entity::find()
            .filter(Column::Role.eq(role.as_str()))
            .filter(Column::IsActive.eq(true))
            .order_by_asc(Column::Username)
            .all(conn)
            .await?,
    )
}

/// Profile fields only; username, password and audit columns stay put
pub async fn update<C: ConnectionTrait>(conn: &C, user: &User) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(user.id.clone()),
        email: Set(user.email.clone()),
        full_name: Set(user.full_name.clone()),
        is_active: Set(user.is_active),
        role: Set(user.role.as_str().to_string()),
        updated_at: Set(user.updated_at.clone()),
        ..Default::default()
    };
    active
        .update(conn)
        .await
        .with_context(|| format!("Failed to update user {}", user.username))?;
    Ok(())
}

/// Hard delete; refresh tokens of the user go with it
pub async fn delete<C: ConnectionTrait>(conn: &C, id: &str) -> anyhow::Result<bool> {
    conn.execute(Statement::from_sql_and_values(
        DatabaseBackend::Sqlite,
        "DELETE FROM sys_refresh_tokens WHERE user_id = ?",
        [id.into()],
    ))
    .await?;
    let result = Entity::delete_by_id(id.to_string()).exec(conn).await?;
    Ok(result.rows_affected > 0)
}

pub async fn update_last_login<C: ConnectionTrait>(conn: &C, id: &str) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(id.to_string()),
        last_login_at: Set(Some(chrono::Utc::now().to_rfc3339())),
        ..Default::default()
    };
    active.update(conn).await?;
    Ok(())
}

pub async fn count_users<C: ConnectionTrait>(conn: &C) -> anyhow::Result<usize> {
    Ok(Entity::find().count(conn).await? as usize)
}

pub async fn update_password<C: ConnectionTrait>(conn: &C, id: &str, password_hash: &str) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(id.to_string()),
        password_hash: Set(password_hash.to_string()),
        updated_at: Set(chrono::Utc::now().to_rfc3339()),
        ..Default::default()
    };
    active
        .update(conn)
        .await
        .context("Failed to update password")?;
    Ok(())
}
