use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use greenwatch_types::api::{DeleteRequest, DeleteResponse, GreenhouseDraft};
use greenwatch_types::models::Greenhouse;

use crate::error::{ApiError, ApiResult};
use crate::form::{ImageChange, read_form};
use crate::middleware::{ANY_ROLE, Claims, FIELD_STAFF};
use crate::state::{AppState, with_db};

pub async fn get_greenhouses(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Greenhouse>>> {
    claims.require(ANY_ROLE)?;
    let rows = with_db(&state, |db| db.list_greenhouses()).await?;
    Ok(Json(rows.into_iter().map(|r| r.into_model()).collect()))
}

/// POST /AddGreenhouse. Multipart form with `name`, `location`, optional `image`.
pub async fn add_greenhouse(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    claims.require(FIELD_STAFF)?;
    let (draft, change) = read_form::<GreenhouseDraft>(multipart).await?;
    draft.validate()?;

    let image = change.resolve(&state.images, None).await?;
    let greenhouse_id = Uuid::new_v4().to_string();

    let id = greenhouse_id.clone();
    let stored_image = image.clone();
    let created = with_db(&state, move |db| {
        db.insert_greenhouse(&id, &draft.name, &draft.location, stored_image.as_deref())?;
        db.get_greenhouse(&id)
    })
    .await;

    let row = match created {
        Ok(Some(row)) => row,
        Ok(None) => return Err(anyhow::anyhow!("greenhouse {} missing after insert", greenhouse_id).into()),
        Err(e) => {
            if let Some(uploaded) = &image {
                state.images.remove(uploaded).await;
            }
            return Err(e);
        }
    };

    info!("Greenhouse {} created by {}", greenhouse_id, claims.username);
    Ok((StatusCode::CREATED, Json(row.into_model())))
}

/// PUT /updateGreenhouse/{id}. Replaces name and location; the image is
/// replaced only when the form carries an `image` part.
pub async fn update_greenhouse(
    State(state): State<AppState>,
    Path(greenhouse_id): Path<String>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> ApiResult<Json<Greenhouse>> {
    claims.require(FIELD_STAFF)?;
    let (draft, change) = read_form::<GreenhouseDraft>(multipart).await?;
    draft.validate()?;

    let id = greenhouse_id.clone();
    let previous = with_db(&state, move |db| db.get_greenhouse(&id))
        .await?
        .ok_or(ApiError::NotFound("greenhouse"))?
        .image;

    let uploaded = matches!(change, ImageChange::Upload(_));
    let image = change.resolve(&state.images, previous.clone()).await?;

    let id = greenhouse_id.clone();
    let stored_image = image.clone();
    let updated = with_db(&state, move |db| {
        if !db.update_greenhouse(&id, &draft.name, &draft.location, stored_image.as_deref())? {
            return Ok(None);
        }
        db.get_greenhouse(&id)
    })
    .await;

    let row = match updated {
        Ok(Some(row)) => row,
        outcome => {
            if let (true, Some(new_image)) = (uploaded, &image) {
                state.images.remove(new_image).await;
            }
            return Err(outcome.err().unwrap_or(ApiError::NotFound("greenhouse")));
        }
    };

    if let Some(old) = previous.filter(|old| Some(old) != row.image.as_ref()) {
        state.images.remove(&old).await;
    }

    info!("Greenhouse {} updated by {}", greenhouse_id, claims.username);
    Ok(Json(row.into_model()))
}

/// POST /DeleteGreenhouse. Unconditional. Plants that reference the
/// greenhouse are left in place.
pub async fn delete_greenhouse(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DeleteRequest>,
) -> ApiResult<Json<DeleteResponse>> {
    claims.require(FIELD_STAFF)?;
    let id = req.id.clone();
    if let Some(image) = with_db(&state, move |db| db.delete_greenhouse(&id)).await? {
        state.images.remove(&image).await;
    }
    info!("Greenhouse {} deleted by {}", req.id, claims.username);
    Ok(Json(DeleteResponse { deleted: true, id: req.id }))
}
