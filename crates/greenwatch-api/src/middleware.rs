use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use greenwatch_types::models::AccessRole;

use crate::error::ApiError;
use crate::state::{AppState, with_db};

pub const MANAGER_ONLY: &[AccessRole] = &[AccessRole::Manager];
pub const FIELD_STAFF: &[AccessRole] = &[AccessRole::Manager, AccessRole::Farmer];
pub const SENSOR_CREW: &[AccessRole] = &[AccessRole::Manager, AccessRole::Technician];
pub const ANY_ROLE: &[AccessRole] = &[AccessRole::Manager, AccessRole::Farmer, AccessRole::Technician];

/// Subject used for tokens issued by the manager PIN.
pub const MANAGER_SUBJECT: &str = "manager";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: AccessRole,
    pub exp: usize,
}

impl Claims {
    pub fn is_manager(&self) -> bool {
        self.role == AccessRole::Manager && self.sub == MANAGER_SUBJECT
    }

    pub fn require(&self, allowed: &[AccessRole]) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            warn!("{} ({:?}) denied: needs one of {:?}", self.username, self.role, allowed);
            Err(ApiError::Forbidden)
        }
    }

    /// Managers may act on any user; everyone else only on themselves.
    pub fn require_self_or_manager(&self, user_id: &str) -> Result<(), ApiError> {
        if self.role == AccessRole::Manager || self.sub == user_id {
            Ok(())
        } else {
            warn!("{} denied access to user {}", self.username, user_id);
            Err(ApiError::Forbidden)
        }
    }
}

pub fn create_token(secret: &str, sub: &str, username: &str, role: AccessRole) -> anyhow::Result<String> {
    let claims = Claims {
        sub: sub.to_string(),
        username: username.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> anyhow::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Extract and validate JWT from Authorization header.
///
/// Manager tokens stand on their own. User tokens are checked against the
/// store on every request: a deleted user is rejected and the stored role
/// replaces the one the token was issued with.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = decode_token(&state.jwt_secret, token).map_err(|_| ApiError::Unauthorized)?;
    let claims = if claims.is_manager() {
        claims
    } else {
        current_claims(&state, claims).await?
    };

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

async fn current_claims(state: &AppState, claims: Claims) -> Result<Claims, ApiError> {
    let user_id = claims.sub.clone();
    let Some(user) = with_db(state, move |db| db.get_user_by_id(&user_id)).await? else {
        warn!("Token for removed user {} rejected", claims.sub);
        return Err(ApiError::Unauthorized);
    };

    let user = user.into_model();
    Ok(Claims {
        username: user.username,
        role: user.role.into(),
        ..claims
    })
}
