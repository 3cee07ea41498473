use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use greenwatch_db::models::UserWrite;
use greenwatch_types::api::{DeleteRequest, DeleteResponse, UserPayload};
use greenwatch_types::models::User;

use crate::auth::hash_secret;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{Claims, MANAGER_ONLY};
use crate::state::{AppState, blocking, with_db};

fn taken(username: &str) -> ApiError {
    ApiError::Conflict(format!("username '{}' is taken", username))
}

pub async fn get_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<User>>> {
    claims.require(MANAGER_ONLY)?;
    let rows = with_db(&state, |db| db.list_users()).await?;
    Ok(Json(rows.into_iter().map(|r| r.into_model()).collect()))
}

/// GET /PersonalData/{id}
pub async fn personal_data(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<User>> {
    claims.require_self_or_manager(&user_id)?;
    let row = with_db(&state, move |db| db.get_user_by_id(&user_id))
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(row.into_model()))
}

pub async fn add_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UserPayload>,
) -> ApiResult<impl IntoResponse> {
    claims.require(MANAGER_ONLY)?;
    let role = req.validate()?;

    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();
    let password = req.password;
    let password_hash = blocking(move || hash_secret(&password)).await?;
    let user_id = Uuid::new_v4().to_string();

    let id = user_id.clone();
    let created = with_db(&state, move |db| {
        if db.create_user(&id, &username, &email, &password_hash, role)? == UserWrite::UsernameTaken {
            return Ok(None);
        }
        db.get_user_by_id(&id)
    })
    .await?
    .ok_or_else(|| taken(req.username.trim()))?;

    let user = created.into_model();
    info!("User {} created with role {}", user.username, role.as_str());
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /updateUser/{id}. Replaces every field, including the password.
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UserPayload>,
) -> ApiResult<Json<User>> {
    claims.require(MANAGER_ONLY)?;
    let role = req.validate()?;

    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();
    let password = req.password;
    let password_hash = blocking(move || hash_secret(&password)).await?;

    let id = user_id.clone();
    let outcome = with_db(&state, move |db| {
        match db.update_user(&id, &username, &email, &password_hash, role)? {
            UserWrite::Written => {}
            UserWrite::UsernameTaken => return Ok(Err(taken(&username))),
            UserWrite::Missing => return Ok(Err(ApiError::NotFound("user"))),
        }
        Ok(db.get_user_by_id(&id)?.ok_or(ApiError::NotFound("user")))
    })
    .await??;

    info!("User {} updated", user_id);
    Ok(Json(outcome.into_model()))
}

/// POST /deleteUser. Unconditional, succeeds whether or not the user existed.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DeleteRequest>,
) -> ApiResult<Json<DeleteResponse>> {
    claims.require(MANAGER_ONLY)?;
    let id = req.id.clone();
    with_db(&state, move |db| db.delete_user(&id)).await?;
    info!("User {} deleted", req.id);
    Ok(Json(DeleteResponse { deleted: true, id: req.id }))
}
