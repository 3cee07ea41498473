use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use greenwatch_db::models::PlantFields;
use greenwatch_types::api::{DeleteRequest, DeleteResponse, PlantDraft};
use greenwatch_types::models::{DEFAULT_PLANT_STATUS, Plant};

use crate::error::{ApiError, ApiResult};
use crate::form::{ImageChange, read_form};
use crate::middleware::{ANY_ROLE, Claims, FIELD_STAFF};
use crate::state::{AppState, with_db};

fn fields_from(draft: PlantDraft, image: Option<String>) -> PlantFields {
    PlantFields {
        name: draft.name,
        greenhouse_id: draft.greenhouse_id,
        status: draft.status.unwrap_or_else(|| DEFAULT_PLANT_STATUS.to_string()),
        image,
        last_checked: draft.last_checked,
        watering_interval: draft.watering_interval,
        fertilizer_interval: draft.fertilizer_interval,
    }
}

pub async fn get_plants(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Plant>>> {
    claims.require(ANY_ROLE)?;
    let rows = with_db(&state, |db| db.list_plants()).await?;
    Ok(Json(rows.into_iter().map(|r| r.into_model()).collect()))
}

/// GET /GetPlantsByGreenhouse/{id}. An unknown greenhouse yields an empty list.
pub async fn get_plants_by_greenhouse(
    State(state): State<AppState>,
    Path(greenhouse_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Plant>>> {
    claims.require(ANY_ROLE)?;
    let rows = with_db(&state, move |db| db.list_plants_by_greenhouse(&greenhouse_id)).await?;
    Ok(Json(rows.into_iter().map(|r| r.into_model()).collect()))
}

pub async fn get_plant(
    State(state): State<AppState>,
    Path(plant_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Plant>> {
    claims.require(ANY_ROLE)?;
    let row = with_db(&state, move |db| db.get_plant(&plant_id))
        .await?
        .ok_or(ApiError::NotFound("plant"))?;
    Ok(Json(row.into_model()))
}

/// POST /AddPlant. Multipart form; `image` is optional.
pub async fn add_plant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    claims.require(FIELD_STAFF)?;
    let (draft, change) = read_form::<PlantDraft>(multipart).await?;
    draft.validate()?;

    let image = change.resolve(&state.images, None).await?;
    let plant_id = Uuid::new_v4().to_string();

    let id = plant_id.clone();
    let fields = fields_from(draft, image.clone());
    let created = with_db(&state, move |db| {
        db.insert_plant(&id, &fields)?;
        db.get_plant(&id)
    })
    .await;

    let row = match created {
        Ok(Some(row)) => row,
        Ok(None) => return Err(anyhow::anyhow!("plant {} missing after insert", plant_id).into()),
        Err(e) => {
            if let Some(uploaded) = &image {
                state.images.remove(uploaded).await;
            }
            return Err(e);
        }
    };

    info!("Plant {} created in greenhouse {} by {}", plant_id, row.greenhouse_id, claims.username);
    Ok((StatusCode::CREATED, Json(row.into_model())))
}

/// PUT /updatePlant/{id}. Every text field is overwritten. A new image
/// replaces the previous reference and the old upload is removed.
pub async fn update_plant(
    State(state): State<AppState>,
    Path(plant_id): Path<String>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> ApiResult<Json<Plant>> {
    claims.require(FIELD_STAFF)?;
    let (draft, change) = read_form::<PlantDraft>(multipart).await?;
    draft.validate()?;

    let id = plant_id.clone();
    let previous = with_db(&state, move |db| db.get_plant(&id))
        .await?
        .ok_or(ApiError::NotFound("plant"))?
        .image;

    let uploaded = matches!(change, ImageChange::Upload(_));
    let image = change.resolve(&state.images, previous.clone()).await?;

    let id = plant_id.clone();
    let fields = fields_from(draft, image.clone());
    let updated = with_db(&state, move |db| {
        if !db.update_plant(&id, &fields)? {
            return Ok(None);
        }
        db.get_plant(&id)
    })
    .await;

    let row = match updated {
        Ok(Some(row)) => row,
        outcome => {
            if let (true, Some(new_image)) = (uploaded, &image) {
                state.images.remove(new_image).await;
            }
            return Err(outcome.err().unwrap_or(ApiError::NotFound("plant")));
        }
    };

    if let Some(old) = previous.filter(|old| Some(old) != row.image.as_ref()) {
        state.images.remove(&old).await;
    }

    info!("Plant {} updated by {}", plant_id, claims.username);
    Ok(Json(row.into_model()))
}

/// POST /DeletePlant. Unconditional.
pub async fn delete_plant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DeleteRequest>,
) -> ApiResult<Json<DeleteResponse>> {
    claims.require(FIELD_STAFF)?;
    let id = req.id.clone();
    if let Some(image) = with_db(&state, move |db| db.delete_plant(&id)).await? {
        state.images.remove(&image).await;
    }
    info!("Plant {} deleted by {}", req.id, claims.username);
    Ok(Json(DeleteResponse { deleted: true, id: req.id }))
}
