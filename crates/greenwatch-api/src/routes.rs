use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::images::{MAX_IMAGE_BYTES, UPLOAD_ROUTE};
use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, greenhouses, plants, sensors, users, weather};

/// Headroom on top of the image for the text fields of a form.
const MAX_FORM_BYTES: usize = MAX_IMAGE_BYTES + 256 * 1024;

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/exploreUser", post(auth::explore_user))
        .route("/verifyManagerPin", post(auth::verify_manager_pin))
        .route("/weather", get(weather::get_weather))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        // Users
        .route("/GetUsers", get(users::get_users))
        .route("/PersonalData/{id}", get(users::personal_data))
        .route("/AddUser", post(users::add_user))
        .route("/updateUser/{id}", put(users::update_user))
        .route("/deleteUser", post(users::delete_user))
        // Greenhouses
        .route("/GetGreenhouses", get(greenhouses::get_greenhouses))
        .route("/AddGreenhouse", post(greenhouses::add_greenhouse))
        .route("/updateGreenhouse/{id}", put(greenhouses::update_greenhouse))
        .route("/DeleteGreenhouse", post(greenhouses::delete_greenhouse))
        // Plants
        .route("/GetPlants", get(plants::get_plants))
        .route("/GetPlantsByGreenhouse/{id}", get(plants::get_plants_by_greenhouse))
        .route("/GetPlant/{id}", get(plants::get_plant))
        .route("/AddPlant", post(plants::add_plant))
        .route("/updatePlant/{id}", put(plants::update_plant))
        .route("/DeletePlant", post(plants::delete_plant))
        // Sensor boards
        .route("/GetSensors", get(sensors::get_sensors))
        .route("/GetSensorsByGreenhouse/{id}", get(sensors::get_sensors_by_greenhouse))
        .route("/AddSensor", post(sensors::add_sensor))
        .route("/DeleteSensor", post(sensors::delete_sensor))
        .route("/PushReading", post(sensors::push_reading))
        .route("/GetSensorReadings/{id}", get(sensors::get_sensor_readings))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(DefaultBodyLimit::max(MAX_FORM_BYTES))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service(UPLOAD_ROUTE, ServeDir::new(state.images.dir()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
