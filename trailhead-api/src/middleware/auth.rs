use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

/// Operator identity carried by admin bearer tokens (HS256, `exp` required)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

impl AdminClaims {
    pub fn is_admin(&self) -> bool {
        ADMIN_ROLES.contains(&self.role.as_str())
    }
}

const ADMIN_ROLES: [&str; 2] = ["ADMIN", "SUPER_ADMIN"];

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn admin_claims(headers: &HeaderMap, secret: &str) -> Result<AdminClaims, AppError> {
    let token = bearer_token(headers)
        .ok_or_else(|| AppError::AuthenticationError("missing bearer token".to_string()))?;

    let claims = decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(format!("invalid token: {}", e)))?
    .claims;

    if !claims.is_admin() {
        tracing::warn!("Admin route refused for {} with role {}", claims.sub, claims.role);
        return Err(AppError::AuthorizationError("admin role required".to_string()));
    }
    Ok(claims)
}

// ============================================================================
// Admin Authentication Middleware
// ============================================================================

/// Guards `/v1/admin/*`; handlers can read the caller via `Extension<AdminClaims>`
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = admin_claims(req.headers(), &state.auth.secret)?;
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
