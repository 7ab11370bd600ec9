use anyhow::{Context, Result};
use chrono::Utc;
use contracts::system::auth::TokenClaims;
use contracts::system::roles::Role;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use sea_orm::ConnectionTrait;

use crate::shared::config;
use crate::shared::data::settings;

const JWT_SECRET_KEY: &str = "jwt_secret";

/// Generate JWT access token; lifetime comes from `[auth] access_token_hours`
pub async fn generate_access_token<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    username: &str,
    role: Role,
) -> Result<String> {
    let now = Utc::now();
    let lifetime = chrono::Duration::hours(config::current().auth.access_token_hours);
    let claims = TokenClaims {
        sub: user_id.to_string(),
        username: username.to_string(),
        role,
        exp: (now + lifetime).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    let secret = get_jwt_secret(conn).await?;
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to encode JWT token")
}

/// Validate JWT token and extract claims
pub async fn validate_token<C: ConnectionTrait>(conn: &C, token: &str) -> Result<TokenClaims> {
    let secret = get_jwt_secret(conn).await?;
    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .context("Failed to decode JWT token")?;
    Ok(token_data.claims)
}

/// Opaque refresh token; only its hash is stored
pub fn generate_refresh_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Read the signing secret from `sys_settings`, creating it on first use
pub async fn get_jwt_secret<C: ConnectionTrait>(conn: &C) -> Result<String> {
    if let Some(secret) = settings::get(conn, JWT_SECRET_KEY).await? {
        return Ok(secret);
    }
    let secret = generate_jwt_secret();
    settings::set(conn, JWT_SECRET_KEY, &secret).await?;
    tracing::info!("Generated new JWT signing secret");
    Ok(secret)
}

/// 256 random bits, base64 encoded
fn generate_jwt_secret() -> String {
    use base64::{engine::general_purpose, Engine as _};
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen::<u8>()).collect();
    general_purpose::STANDARD.encode(&random_bytes)
}

pub fn calculate_refresh_token_expiration() -> String {
    let days = config::current().auth.refresh_token_days;
    (Utc::now() + chrono::Duration::days(days)).to_rfc3339()
}
