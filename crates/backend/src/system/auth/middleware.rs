use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use contracts::system::auth::TokenClaims;
use contracts::system::roles::Permission;

use crate::shared::data::db::get_connection;

/// Bearer token of the request, copied out so no request borrow is held
/// across an await
fn bearer_token(req: &Request<Body>) -> Result<String, StatusCode> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
        .ok_or(StatusCode::UNAUTHORIZED)
}

async fn claims_for_token(token: String) -> Result<TokenClaims, StatusCode> {
    super::jwt::validate_token(get_connection(), &token)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)
}

/// Middleware that requires valid JWT authentication
pub async fn require_auth(mut req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let token = bearer_token(&req)?;
    let claims = claims_for_token(token).await?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Middleware that requires the user-management permission
pub async fn require_admin(mut req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let token = bearer_token(&req)?;
    let claims = claims_for_token(token).await?;
    if !claims.has(Permission::UsersManage) {
        return Err(StatusCode::FORBIDDEN);
    }
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
