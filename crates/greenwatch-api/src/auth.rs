use std::sync::OnceLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State};
use rand::Rng;
use tracing::{info, warn};

use greenwatch_db::Database;
use greenwatch_types::api::{
    ExploreUserRequest, ExploreUserResponse, VerifyPinRequest, VerifyPinResponse,
};
use greenwatch_types::models::AccessRole;

use crate::error::ApiResult;
use crate::middleware::{MANAGER_SUBJECT, create_token};
use crate::state::{AppState, blocking, with_db};

/// Hash a password or PIN with Argon2id.
pub fn hash_secret(secret: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn verify_secret(secret: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored credential hash is unreadable: {}", e);
            false
        }
    }
}

/// Hash checked when a login names no known user, so a miss costs the same
/// Argon2 work as a wrong password.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_secret("greenwatch-no-such-user").ok())
        .as_deref()
}

/// Make sure a manager PIN exists. A configured PIN always overwrites the
/// stored one. With nothing configured and nothing stored, a random six digit
/// PIN is generated and returned so the caller can show it once.
pub fn ensure_manager_pin(db: &Database, configured: Option<&str>) -> anyhow::Result<Option<String>> {
    if let Some(pin) = configured.map(str::trim).filter(|p| !p.is_empty()) {
        db.set_manager_pin_hash(&hash_secret(pin)?)?;
        info!("Manager PIN set from configuration");
        return Ok(None);
    }

    if db.manager_pin_hash()?.is_some() {
        return Ok(None);
    }

    let pin = format!("{:06}", rand::rng().random_range(0..1_000_000u32));
    db.set_manager_pin_hash(&hash_secret(&pin)?)?;
    Ok(Some(pin))
}

/// POST /exploreUser. Exact username match plus password verification.
/// Any mismatch is reported as `exists: false`.
pub async fn explore_user(
    State(state): State<AppState>,
    Json(req): Json<ExploreUserRequest>,
) -> ApiResult<Json<ExploreUserResponse>> {
    let username = req.username.trim().to_string();
    if username.is_empty() || req.password.is_empty() {
        return Ok(Json(ExploreUserResponse::not_found()));
    }

    let lookup = username.clone();
    let found = with_db(&state, move |db| db.get_user_by_username(&lookup)).await?;

    let password = req.password;
    let stored = found.as_ref().map(|user| user.password.clone());
    let verified = blocking(move || {
        Ok(match stored.as_deref().or_else(|| dummy_hash()) {
            Some(hash) => verify_secret(&password, hash) && stored.is_some(),
            None => false,
        })
    })
    .await?;

    let Some(user) = found else {
        info!("Login attempt for unknown user {}", username);
        return Ok(Json(ExploreUserResponse::not_found()));
    };
    if !verified {
        warn!("Wrong password for user {}", username);
        return Ok(Json(ExploreUserResponse::not_found()));
    }

    let user = user.into_model();
    let token = create_token(&state.jwt_secret, &user.id, &user.username, user.role.into())?;

    info!("User {} signed in as {}", user.username, user.role.as_str());
    Ok(Json(ExploreUserResponse {
        exists: true,
        role: Some(user.role),
        user_id: Some(user.id),
        token: Some(token),
    }))
}

/// POST /verifyManagerPin
pub async fn verify_manager_pin(
    State(state): State<AppState>,
    Json(req): Json<VerifyPinRequest>,
) -> ApiResult<Json<VerifyPinResponse>> {
    let pin = req.pin.trim().to_string();
    let Some(stored) = with_db(&state, |db| db.manager_pin_hash()).await? else {
        warn!("Manager PIN checked but none is configured");
        return Ok(Json(VerifyPinResponse { verified: false, token: None }));
    };

    let verified = !pin.is_empty() && blocking(move || Ok(verify_secret(&pin, &stored))).await?;
    if !verified {
        warn!("Wrong manager PIN");
        return Ok(Json(VerifyPinResponse { verified: false, token: None }));
    }

    let token = create_token(&state.jwt_secret, MANAGER_SUBJECT, MANAGER_SUBJECT, AccessRole::Manager)?;
    info!("Manager PIN verified");
    Ok(Json(VerifyPinResponse { verified: true, token: Some(token) }))
}
