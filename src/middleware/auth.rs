use axum::{extract::FromRequestParts, http::header};

use crate::{
    error::AppError,
    security::{ADMIN_ROLES, Identity, Role, SUPERADMIN_ONLY},
    state::AppState,
};

/// Caller identity extracted from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl AuthUser {
    pub fn identity(&self) -> &Identity {
        &self.0
    }

    pub fn role(&self) -> Role {
        self.0.role
    }
}

pub fn ensure_role(user: &AuthUser, allowed: &[Role]) -> Result<(), AppError> {
    if !user.role().is_allowed(allowed) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, ADMIN_ROLES)
}

pub fn ensure_superadmin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, SUPERADMIN_ONLY)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let identity = state.tokens.validate(auth_str)?;
        Ok(AuthUser(identity))
    }
}
