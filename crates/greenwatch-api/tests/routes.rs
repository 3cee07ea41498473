use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
    routing::get,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use greenwatch_api::auth::{ensure_manager_pin, hash_secret};
use greenwatch_api::images::ImageStore;
use greenwatch_api::middleware::{MANAGER_SUBJECT, create_token, decode_token};
use greenwatch_api::routes::router;
use greenwatch_api::state::{AppState, AppStateInner};
use greenwatch_api::weather::WeatherClient;
use greenwatch_db::Database;
use greenwatch_db::models::PlantFields;
use greenwatch_types::models::{AccessRole, UserRole};

const SECRET: &str = "integration-test-secret";
const BOUNDARY: &str = "greenwatch-test-boundary";

struct TestApp {
    app: Router,
    state: AppState,
    _uploads: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_weather("http://127.0.0.1:9", "").await
    }

    async fn with_weather(base_url: &str, api_key: &str) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: SECRET.to_string(),
            images: ImageStore::new(uploads.path().to_path_buf()).await.unwrap(),
            weather: WeatherClient::new(base_url, api_key).unwrap(),
        });
        Self { app: router(state.clone()), state, _uploads: uploads }
    }

    /// Create a user with the given id and role and sign a token for it.
    fn user_token(&self, role: UserRole, id: &str) -> String {
        let email = format!("{id}@farm.test");
        self.state.db.create_user(id, id, &email, "not-a-login", role).unwrap();
        create_token(SECRET, id, id, role.into()).unwrap()
    }

    fn manager(&self) -> String {
        create_token(SECRET, MANAGER_SUBJECT, MANAGER_SUBJECT, AccessRole::Manager).unwrap()
    }

    async fn send(&self, req: Request<Body>) -> Response {
        self.app.clone().oneshot(req).await.unwrap()
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        let mut req = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    async fn post_json(&self, method: Method, uri: &str, token: Option<&str>, body: Value) -> Response {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(req.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn post_form(&self, method: Method, uri: &str, token: &str, body: Vec<u8>) -> Response {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }
}

async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn multipart(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    if let Some((content_type, data)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"leaf\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn seed_user(app: &TestApp, id: &str, username: &str, password: &str, role: UserRole) {
    let hash = hash_secret(password).unwrap();
    app.state
        .db
        .create_user(id, username, &format!("{username}@farm.test"), &hash, role)
        .unwrap();
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let resp = app.get("/health", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = TestApp::new().await;

    assert_eq!(app.get("/GetPlants", None).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.get("/GetPlants", Some("garbage")).await.status(), StatusCode::UNAUTHORIZED);

    let forged = create_token("another-secret", "u1", "ana", AccessRole::Manager).unwrap();
    assert_eq!(app.get("/GetUsers", Some(&forged)).await.status(), StatusCode::UNAUTHORIZED);

    // Unknown paths are not hidden behind the auth layer.
    assert_eq!(app.get("/NoSuchRoute", None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn explore_user_reports_mismatches_as_missing() {
    let app = TestApp::new().await;
    seed_user(&app, "u1", "ana", "correct-horse", UserRole::Technician);

    for (username, password) in [("ana", "wrong"), ("Ana", "correct-horse"), ("bob", "correct-horse"), ("", "")] {
        let resp = app
            .post_json(Method::POST, "/exploreUser", None, json!({ "UserName": username, "Password": password }))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await, json!({ "exists": false, "role": null }));
    }

    let resp = app
        .post_json(Method::POST, "/exploreUser", None, json!({ "UserName": "ana", "Password": "correct-horse" }))
        .await;
    let body = json_body(resp).await;
    assert_eq!(body["exists"], true);
    assert_eq!(body["role"], "technician");
    assert_eq!(body["userId"], "u1");

    let claims = decode_token(SECRET, body["token"].as_str().unwrap()).unwrap();
    assert_eq!(claims.sub, "u1");
    assert_eq!(claims.role, AccessRole::Technician);
}

#[tokio::test]
async fn manager_pin_grants_a_manager_token() {
    let app = TestApp::new().await;
    ensure_manager_pin(&app.state.db, Some("2468")).unwrap();

    let resp = app.post_json(Method::POST, "/verifyManagerPin", None, json!({ "pin": "1357" })).await;
    assert_eq!(json_body(resp).await, json!({ "verified": false }));

    let resp = app.post_json(Method::POST, "/verifyManagerPin", None, json!({ "pin": "2468" })).await;
    let body = json_body(resp).await;
    assert_eq!(body["verified"], true);

    let token = body["token"].as_str().unwrap();
    let resp = app.get("/GetUsers", Some(token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!([]));
}

#[tokio::test]
async fn roles_are_enforced_per_route() {
    let app = TestApp::new().await;
    let farmer = app.user_token(UserRole::Farmer, "f1");
    let technician = app.user_token(UserRole::Technician, "t1");

    assert_eq!(app.get("/GetUsers", Some(&farmer)).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.get("/GetSensors", Some(&farmer)).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.get("/GetSensors", Some(&technician)).await.status(), StatusCode::OK);
    assert_eq!(app.get("/GetPlants", Some(&technician)).await.status(), StatusCode::OK);

    let form = multipart(&[("name", "Basil"), ("greenhouseId", "g1")], None);
    let resp = app.post_form(Method::POST, "/AddPlant", &technician, form).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(resp).await["error"], "not permitted for this role");

    // Personal data is visible to its owner and to the manager only.
    assert_eq!(app.get("/PersonalData/f1", Some(&farmer)).await.status(), StatusCode::OK);
    assert_eq!(app.get("/PersonalData/f1", Some(&technician)).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.get("/PersonalData/f1", Some(&app.manager())).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn manager_manages_users() {
    let app = TestApp::new().await;
    let manager = app.manager();
    let payload = json!({ "username": "fern", "email": "fern@farm.test", "password": "pw" });

    let resp = app.post_json(Method::POST, "/AddUser", Some(&manager), payload.clone()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = json_body(resp).await;
    assert_eq!(created["role"], "farmer");
    assert!(created.get("password").is_none());
    let id = created["id"].as_str().unwrap().to_string();

    let resp = app.post_json(Method::POST, "/AddUser", Some(&manager), payload).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let bad_role = json!({ "username": "x", "email": "x@farm.test", "password": "pw", "role": "manager" });
    let resp = app.post_json(Method::POST, "/AddUser", Some(&manager), bad_role).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let update = json!({ "username": "fern", "email": "fern@new.test", "password": "pw2", "role": "technician" });
    let resp = app.post_json(Method::PUT, &format!("/updateUser/{id}"), Some(&manager), update).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = json_body(resp).await;
    assert_eq!(updated["email"], "fern@new.test");
    assert_eq!(updated["role"], "technician");

    let resp = app
        .post_json(Method::POST, "/exploreUser", None, json!({ "UserName": "fern", "Password": "pw2" }))
        .await;
    assert_eq!(json_body(resp).await["exists"], true);

    let resp = app.post_json(Method::POST, "/deleteUser", Some(&manager), json!({ "id": id })).await;
    assert_eq!(json_body(resp).await, json!({ "deleted": true, "id": id }));
    let resp = app.get("/GetUsers", Some(&manager)).await;
    assert_eq!(json_body(resp).await, json!([]));
}

#[tokio::test]
async fn orphaned_plants_show_unknown_greenhouse() {
    let app = TestApp::new().await;
    let fields = PlantFields {
        name: "Tomato".into(),
        greenhouse_id: "long-gone".into(),
        status: "Healthy".into(),
        ..Default::default()
    };
    app.state.db.insert_plant("p1", &fields).unwrap();

    let farmer = app.user_token(UserRole::Farmer, "f1");
    let plants = json_body(app.get("/GetPlants", Some(&farmer)).await).await;
    assert_eq!(plants[0]["greenhouseName"], "Unknown Greenhouse");

    let plant = json_body(app.get("/GetPlant/p1", Some(&farmer)).await).await;
    assert_eq!(plant["greenhouseId"], "long-gone");

    assert_eq!(app.get("/GetPlant/p2", Some(&farmer)).await.status(), StatusCode::NOT_FOUND);

    let none = json_body(app.get("/GetPlantsByGreenhouse/nowhere", Some(&farmer)).await).await;
    assert_eq!(none, json!([]));
}

#[tokio::test]
async fn plant_images_are_stored_replaced_and_served() {
    let app = TestApp::new().await;
    let farmer = app.user_token(UserRole::Farmer, "f1");

    let form = multipart(&[("name", "North"), ("location", "45.1,-122.6")], None);
    let resp = app.post_form(Method::POST, "/AddGreenhouse", &farmer, form).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let greenhouse = json_body(resp).await;
    let greenhouse_id = greenhouse["id"].as_str().unwrap().to_string();
    assert_eq!(greenhouse["image"], Value::Null);

    let form = multipart(
        &[("name", "Basil"), ("greenhouseId", greenhouse_id.as_str()), ("wateringInterval", "1 12")],
        Some(("image/png", &b"first-image"[..])),
    );
    let resp = app.post_form(Method::POST, "/AddPlant", &farmer, form).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let plant = json_body(resp).await;
    assert_eq!(plant["greenhouseName"], "North");
    assert_eq!(plant["status"], "Healthy");
    let plant_id = plant["id"].as_str().unwrap().to_string();
    let first = plant["image"].as_str().unwrap().to_string();
    assert!(first.starts_with("/uploads/"));

    let form = multipart(
        &[("name", "Basil"), ("greenhouseId", greenhouse_id.as_str()), ("status", "Needs water")],
        Some(("image/jpeg", &b"second-image"[..])),
    );
    let resp = app.post_form(Method::PUT, &format!("/updatePlant/{plant_id}"), &farmer, form).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = json_body(resp).await;
    let second = updated["image"].as_str().unwrap().to_string();
    assert_ne!(first, second);
    assert!(second.ends_with(".jpg"));
    assert_eq!(updated["status"], "Needs water");
    assert_eq!(updated["wateringInterval"], Value::Null);

    let first_name = first.trim_start_matches("/uploads/");
    assert!(!app.state.images.dir().join(first_name).exists());

    let resp = app.get(&second, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"second-image");

    // Updating without an image part keeps the current one.
    let form = multipart(&[("name", "Thai Basil"), ("greenhouseId", greenhouse_id.as_str())], None);
    let resp = app.post_form(Method::PUT, &format!("/updatePlant/{plant_id}"), &farmer, form).await;
    assert_eq!(json_body(resp).await["image"], second.as_str());

    let resp = app.post_json(Method::POST, "/DeletePlant", Some(&farmer), json!({ "id": plant_id })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second_name = second.trim_start_matches("/uploads/");
    assert!(!app.state.images.dir().join(second_name).exists());
}

#[tokio::test]
async fn invalid_plant_forms_are_rejected() {
    let app = TestApp::new().await;
    let farmer = app.user_token(UserRole::Farmer, "f1");

    let form = multipart(&[("name", "Basil"), ("greenhouseId", "g1"), ("wateringInterval", "1 30")], None);
    let resp = app.post_form(Method::POST, "/AddPlant", &farmer, form).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(resp).await["error"].as_str().unwrap().contains("watering"));

    let form = multipart(&[("name", "Basil"), ("greenhouseId", "g1")], Some(("application/pdf", &b"%PDF"[..])));
    let resp = app.post_form(Method::POST, "/AddPlant", &farmer, form).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let form = multipart(&[("name", "Basil"), ("greenhouseId", "g1")], None);
    let resp = app.post_form(Method::PUT, "/updatePlant/missing", &farmer, form).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sensor_readings_flow() {
    let app = TestApp::new().await;
    let technician = app.user_token(UserRole::Technician, "t1");

    let resp = app
        .post_json(Method::POST, "/AddSensor", Some(&technician), json!({ "name": "Bed 3", "greenhouseId": "g1" }))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let sensor = json_body(resp).await;
    assert_eq!(sensor["boardType"], "generic");
    assert_eq!(sensor["greenhouseName"], "Unknown Greenhouse");
    let sensor_id = sensor["id"].as_str().unwrap().to_string();

    for temperature in [18.0, 19.5, 21.0] {
        let reading = json!({ "sensorId": sensor_id, "temperature": temperature, "humidity": 60.0 });
        let resp = app.post_json(Method::POST, "/PushReading", Some(&technician), reading).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let readings = json_body(app.get(&format!("/GetSensorReadings/{sensor_id}?limit=2"), Some(&technician)).await).await;
    let temps: Vec<f64> = readings.as_array().unwrap().iter().map(|r| r["temperature"].as_f64().unwrap()).collect();
    assert_eq!(temps, vec![21.0, 19.5]);

    let boards = json_body(app.get("/GetSensorsByGreenhouse/g1", Some(&technician)).await).await;
    assert_eq!(boards[0]["lastReading"]["temperature"], 21.0);

    let resp = app
        .post_json(Method::POST, "/PushReading", Some(&technician), json!({ "sensorId": "ghost", "light": 300.0 }))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .post_json(Method::POST, "/PushReading", Some(&technician), json!({ "sensorId": sensor_id }))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.post_json(Method::POST, "/DeleteSensor", Some(&technician), json!({ "id": sensor_id })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let readings = json_body(app.get(&format!("/GetSensorReadings/{sensor_id}"), Some(&technician)).await).await;
    assert_eq!(readings, json!([]));
}

const PROVIDER_SAMPLE: &str = r#"{
    "location": {"name": "Salinas", "region": "California", "country": "USA"},
    "current": {"temp_c": 17.2, "humidity": 64, "wind_kph": 13.0,
        "condition": {"text": "Partly cloudy", "icon": "//cdn.weatherapi.com/116.png"}},
    "forecast": {"forecastday": [
        {"date": "2026-10-18", "day": {"maxtemp_c": 21.0, "mintemp_c": 9.5, "daily_chance_of_rain": 10,
            "condition": {"text": "Sunny", "icon": "//cdn.weatherapi.com/113.png"}}}
    ]}
}"#;

async fn fake_provider() -> String {
    let provider = Router::new()
        .route(
            "/v1/forecast.json",
            get(|| async { Json(serde_json::from_str::<Value>(PROVIDER_SAMPLE).unwrap()) }),
        )
        .route("/broken/forecast.json", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, provider).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn weather_is_proxied_and_normalized() {
    let provider = fake_provider().await;
    let app = TestApp::with_weather(&format!("{provider}/v1"), "test-key").await;

    let resp = app.get("/weather?location=Salinas", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let report = json_body(resp).await;
    assert_eq!(report["location"]["name"], "Salinas");
    assert_eq!(report["current"]["temperatureC"], 17.2);
    assert_eq!(report["current"]["icon"], "https://cdn.weatherapi.com/116.png");
    assert_eq!(report["days"][0]["maxTemperatureC"], 21.0);

    assert_eq!(app.get("/weather?location=%20", None).await.status(), StatusCode::BAD_REQUEST);

    let broken = TestApp::with_weather(&format!("{provider}/broken"), "test-key").await;
    let resp = broken.get("/weather?location=Salinas", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(resp).await["error"], "weather provider unavailable");
}

#[tokio::test]
async fn deleting_a_greenhouse_orphans_its_plants() {
    let app = TestApp::new().await;
    let farmer = app.user_token(UserRole::Farmer, "f1");

    app.state.db.insert_greenhouse("g1", "South", "45.0,-122.0", None).unwrap();
    let fields = PlantFields {
        name: "Pepper".into(),
        greenhouse_id: "g1".into(),
        status: "Healthy".into(),
        ..Default::default()
    };
    app.state.db.insert_plant("p1", &fields).unwrap();

    let plant = json_body(app.get("/GetPlant/p1", Some(&farmer)).await).await;
    assert_eq!(plant["greenhouseName"], "South");

    let resp = app.post_json(Method::POST, "/DeleteGreenhouse", Some(&farmer), json!({ "id": "g1" })).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let plant = json_body(app.get("/GetPlant/p1", Some(&farmer)).await).await;
    assert_eq!(plant["greenhouseName"], "Unknown Greenhouse");
    assert_eq!(plant["greenhouseId"], "g1");

    let listed = json_body(app.get("/GetPlantsByGreenhouse/g1", Some(&farmer)).await).await;
    assert_eq!(listed[0]["id"], "p1");
}

fn upload_name(reference: &str) -> &str {
    reference.trim_start_matches("/uploads/")
}

#[tokio::test]
async fn tokens_follow_the_stored_user() {
    let app = TestApp::new().await;
    let manager = app.manager();

    let payload = json!({ "username": "fern", "email": "fern@farm.test", "password": "pw" });
    let created = json_body(app.post_json(Method::POST, "/AddUser", Some(&manager), payload).await).await;
    let id = created["id"].as_str().unwrap().to_string();

    let login = app
        .post_json(Method::POST, "/exploreUser", None, json!({ "UserName": "fern", "Password": "pw" }))
        .await;
    let token = json_body(login).await["token"].as_str().unwrap().to_string();

    let form = || multipart(&[("name", "North"), ("location", "45.1,-122.6")], None);
    let resp = app.post_form(Method::POST, "/AddGreenhouse", &token, form()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(app.get("/GetSensors", Some(&token)).await.status(), StatusCode::FORBIDDEN);

    // Moved to technician: the old farmer token now carries the stored role.
    let update = json!({ "username": "fern", "email": "fern@farm.test", "password": "pw", "role": "technician" });
    let resp = app.post_json(Method::PUT, &format!("/updateUser/{id}"), Some(&manager), update).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.post_form(Method::POST, "/AddGreenhouse", &token, form()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.get("/GetSensors", Some(&token)).await.status(), StatusCode::OK);

    // Deleted: the token stops working altogether.
    app.post_json(Method::POST, "/deleteUser", Some(&manager), json!({ "id": id })).await;
    assert_eq!(app.get("/GetPlants", Some(&token)).await.status(), StatusCode::UNAUTHORIZED);
    let resp = app.post_form(Method::POST, "/AddGreenhouse", &token, form()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_manager_role_on_a_user_token_is_ignored() {
    let app = TestApp::new().await;
    app.user_token(UserRole::Farmer, "f1");
    let elevated = create_token(SECRET, "f1", "f1", AccessRole::Manager).unwrap();
    assert_eq!(app.get("/GetUsers", Some(&elevated)).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn greenhouse_update_replaces_keeps_and_clears_images() {
    let app = TestApp::new().await;
    let farmer = app.user_token(UserRole::Farmer, "f1");

    let form = multipart(&[("name", "North"), ("location", "45.1,-122.6")], Some(("image/png", &b"one"[..])));
    let created = json_body(app.post_form(Method::POST, "/AddGreenhouse", &farmer, form).await).await;
    let id = created["id"].as_str().unwrap().to_string();
    let first = created["image"].as_str().unwrap().to_string();
    let uri = format!("/updateGreenhouse/{id}");

    // New upload replaces the image and removes the old file.
    let form = multipart(&[("name", "North"), ("location", "45.2,-122.6")], Some(("image/webp", &b"two"[..])));
    let resp = app.post_form(Method::PUT, &uri, &farmer, form).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = json_body(resp).await;
    let second = updated["image"].as_str().unwrap().to_string();
    assert_ne!(first, second);
    assert_eq!(updated["location"], "45.2,-122.6");
    assert!(!app.state.images.dir().join(upload_name(&first)).exists());
    assert!(app.state.images.dir().join(upload_name(&second)).exists());

    // No image part keeps it; resending the current reference as text does too.
    let form = multipart(&[("name", "North House"), ("location", "45.2,-122.6")], None);
    let updated = json_body(app.post_form(Method::PUT, &uri, &farmer, form).await).await;
    assert_eq!(updated["name"], "North House");
    assert_eq!(updated["image"], second.as_str());

    let form = multipart(&[("name", "North House"), ("location", "45.2,-122.6"), ("image", second.as_str())], None);
    let updated = json_body(app.post_form(Method::PUT, &uri, &farmer, form).await).await;
    assert_eq!(updated["image"], second.as_str());
    assert!(app.state.images.dir().join(upload_name(&second)).exists());

    // Empty text image clears it and removes the file.
    let form = multipart(&[("name", "North House"), ("location", "45.2,-122.6"), ("image", "")], None);
    let resp = app.post_form(Method::PUT, &uri, &farmer, form).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["image"], Value::Null);
    assert!(!app.state.images.dir().join(upload_name(&second)).exists());

    let form = multipart(&[("name", "Ghost"), ("location", "0,0")], Some(("image/png", &b"x"[..])));
    let resp = app.post_form(Method::PUT, "/updateGreenhouse/missing", &farmer, form).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let stray = std::fs::read_dir(app.state.images.dir()).unwrap().count();
    assert_eq!(stray, 0);
}

#[tokio::test]
async fn text_references_are_stored_verbatim() {
    let app = TestApp::new().await;
    let farmer = app.user_token(UserRole::Farmer, "f1");

    let form = multipart(
        &[("name", "South"), ("location", "44.9,-123.0"), ("image", "https://cdn.example/south.jpg")],
        None,
    );
    let resp = app.post_form(Method::POST, "/AddGreenhouse", &farmer, form).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let greenhouse = json_body(resp).await;
    assert_eq!(greenhouse["image"], "https://cdn.example/south.jpg");

    let resp = app
        .post_json(Method::POST, "/DeleteGreenhouse", Some(&farmer), json!({ "id": greenhouse["id"] }))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn records_cannot_claim_another_records_upload() {
    let app = TestApp::new().await;
    let farmer = app.user_token(UserRole::Farmer, "f1");

    let form = multipart(&[("name", "North"), ("location", "45.1,-122.6")], Some(("image/png", &b"glass"[..])));
    let greenhouse = json_body(app.post_form(Method::POST, "/AddGreenhouse", &farmer, form).await).await;
    let greenhouse_id = greenhouse["id"].as_str().unwrap().to_string();
    let shared = greenhouse["image"].as_str().unwrap().to_string();

    let form = multipart(
        &[("name", "Basil"), ("greenhouseId", greenhouse_id.as_str()), ("image", shared.as_str())],
        None,
    );
    let resp = app.post_form(Method::POST, "/AddPlant", &farmer, form).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // A plant that points elsewhere cannot switch to the greenhouse's upload either.
    let form = multipart(&[("name", "Basil"), ("greenhouseId", greenhouse_id.as_str())], None);
    let plant = json_body(app.post_form(Method::POST, "/AddPlant", &farmer, form).await).await;
    let plant_id = plant["id"].as_str().unwrap().to_string();
    let form = multipart(
        &[("name", "Basil"), ("greenhouseId", greenhouse_id.as_str()), ("image", shared.as_str())],
        None,
    );
    let resp = app.post_form(Method::PUT, &format!("/updatePlant/{plant_id}"), &farmer, form).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    app.post_json(Method::POST, "/DeletePlant", Some(&farmer), json!({ "id": plant_id })).await;
    assert_eq!(app.get(&shared, None).await.status(), StatusCode::OK);
}
