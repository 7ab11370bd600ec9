use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use contracts::system::auth::TokenClaims;
use contracts::system::roles::Permission;

use crate::shared::error::{AppError, AppResult};

/// Extractor for getting current user from JWT token
/// Usage in handlers: `async fn handler(CurrentUser(claims): CurrentUser) -> Response`
pub struct CurrentUser(pub TokenClaims);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by require_auth
        parts
            .extensions
            .get::<TokenClaims>()
            .cloned()
            .map(CurrentUser)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

pub trait RequirePermission {
    fn require(&self, permission: Permission) -> AppResult<()>;
}

impl RequirePermission for TokenClaims {
    fn require(&self, permission: Permission) -> AppResult<()> {
        if self.has(permission) {
            Ok(())
        } else {
            tracing::warn!(
                "User {} ({}) lacks {:?}",
                self.username,
                self.role,
                permission
            );
            Err(AppError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::system::roles::Role;

    fn claims(role: Role) -> TokenClaims {
        TokenClaims {
            sub: "u".into(),
            username: "u".into(),
            role,
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn test_require_maps_to_forbidden() {
        assert!(claims(Role::Sales).require(Permission::SalesCreate).is_ok());
        assert!(matches!(
            claims(Role::Technician).require(Permission::SalesCreate),
            Err(AppError::Forbidden)
        ));
    }
}
