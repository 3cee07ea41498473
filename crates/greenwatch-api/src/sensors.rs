use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{SecondsFormat, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use greenwatch_db::models::Measurements;
use greenwatch_types::api::{
    DeleteRequest, DeleteResponse, ReadingPayload, ReadingsQuery, SensorDraft,
};
use greenwatch_types::models::{SensorBoard, SensorReading};

use crate::error::{ApiError, ApiResult};
use crate::middleware::{Claims, SENSOR_CREW};
use crate::state::{AppState, with_db};

const DEFAULT_BOARD_TYPE: &str = "generic";
const DEFAULT_READINGS_LIMIT: u32 = 50;
const MAX_READINGS_LIMIT: u32 = 500;

pub async fn get_sensors(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<SensorBoard>>> {
    claims.require(SENSOR_CREW)?;
    let rows = with_db(&state, |db| db.list_sensors()).await?;
    Ok(Json(rows.into_iter().map(|r| r.into_model()).collect()))
}

pub async fn get_sensors_by_greenhouse(
    State(state): State<AppState>,
    Path(greenhouse_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<SensorBoard>>> {
    claims.require(SENSOR_CREW)?;
    let rows = with_db(&state, move |db| db.list_sensors_by_greenhouse(&greenhouse_id)).await?;
    Ok(Json(rows.into_iter().map(|r| r.into_model()).collect()))
}

pub async fn add_sensor(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SensorDraft>,
) -> ApiResult<impl IntoResponse> {
    claims.require(SENSOR_CREW)?;
    req.validate()?;

    let sensor_id = Uuid::new_v4().to_string();
    let name = req.name.trim().to_string();
    let greenhouse_id = req.greenhouse_id.trim().to_string();
    let board_type = req
        .board_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_BOARD_TYPE)
        .to_string();

    let id = sensor_id.clone();
    let row = with_db(&state, move |db| {
        db.insert_sensor(&id, &name, &greenhouse_id, &board_type)?;
        db.get_sensor(&id)
    })
    .await?
    .ok_or_else(|| anyhow::anyhow!("sensor {} missing after insert", sensor_id))?;

    info!("Sensor board {} registered by {}", sensor_id, claims.username);
    Ok((StatusCode::CREATED, Json(row.into_model())))
}

/// POST /DeleteSensor. Unconditional; the board's readings go with it.
pub async fn delete_sensor(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DeleteRequest>,
) -> ApiResult<Json<DeleteResponse>> {
    claims.require(SENSOR_CREW)?;
    let id = req.id.clone();
    with_db(&state, move |db| db.delete_sensor(&id)).await?;
    info!("Sensor board {} deleted by {}", req.id, claims.username);
    Ok(Json(DeleteResponse { deleted: true, id: req.id }))
}

/// POST /PushReading
pub async fn push_reading(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReadingPayload>,
) -> ApiResult<impl IntoResponse> {
    claims.require(SENSOR_CREW)?;
    req.validate()?;

    let sensor_id = req.sensor_id.trim().to_string();
    let values = Measurements {
        temperature: req.temperature,
        humidity: req.humidity,
        soil_moisture: req.soil_moisture,
        light: req.light,
    };
    let now = Utc::now();
    let recorded_at = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    let id = sensor_id.clone();
    let stored = with_db(&state, move |db| db.insert_reading(&id, &values, &recorded_at)).await?;
    if !stored {
        return Err(ApiError::NotFound("sensor"));
    }

    debug!("Reading stored for sensor {}", sensor_id);
    Ok((
        StatusCode::CREATED,
        Json(SensorReading {
            sensor_id,
            temperature: values.temperature,
            humidity: values.humidity,
            soil_moisture: values.soil_moisture,
            light: values.light,
            recorded_at: now,
        }),
    ))
}

/// GET /GetSensorReadings/{id}?limit=N. Newest first.
pub async fn get_sensor_readings(
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
    Query(query): Query<ReadingsQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<SensorReading>>> {
    claims.require(SENSOR_CREW)?;
    let limit = query.limit.unwrap_or(DEFAULT_READINGS_LIMIT).clamp(1, MAX_READINGS_LIMIT);
    let rows = with_db(&state, move |db| db.list_readings(&sensor_id, limit)).await?;
    Ok(Json(rows.into_iter().map(|r| r.into_model()).collect()))
}
