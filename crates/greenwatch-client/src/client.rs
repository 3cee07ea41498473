use std::time::Duration;

use reqwest::{Method, RequestBuilder, multipart};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use greenwatch_types::api::{
    DeleteResponse, ErrorBody, ExploreUserRequest, ExploreUserResponse, GreenhouseDraft, PlantDraft,
    ReadingPayload, SensorDraft, UserPayload, VerifyPinRequest, VerifyPinResponse, WeatherReport,
};
use greenwatch_types::models::{Greenhouse, Plant, SensorBoard, SensorReading, User};
use greenwatch_types::session::Session;

use crate::error::ClientError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which backend the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub const DEVELOPMENT_URL: &'static str = "http://localhost:3000";
    pub const PRODUCTION_URL: &'static str = "https://api.greenwatch.farm";

    pub fn base_url(self) -> &'static str {
        match self {
            Self::Development => Self::DEVELOPMENT_URL,
            Self::Production => Self::PRODUCTION_URL,
        }
    }
}

/// An image picked on the device, sent as the `image` part of a form.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// What a greenhouse or plant form should do with the record's image.
#[derive(Debug, Clone, Default)]
pub enum ImageInput {
    /// Send no `image` part; updates keep the current image.
    #[default]
    Keep,
    /// Send an empty `image` text part, removing the image.
    Clear,
    /// Send a reference as text: an external URL, or the record's own current image.
    Reference(String),
    File(ImageFile),
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(env: Environment) -> Result<Self, ClientError> {
        Self::with_base_url(env.base_url())
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ClientError::Network)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: Session::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Resolve an image reference from a record into a fetchable URL.
    pub fn image_url(&self, reference: &str) -> String {
        if reference.starts_with('/') {
            format!("{}{}", self.base_url, reference)
        } else {
            reference.to_string()
        }
    }

    // -- Session --

    /// Sign in with a username and password. Returns false when the
    /// credentials do not match; the session is left untouched in that case.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<bool, ClientError> {
        let body = ExploreUserRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let resp: ExploreUserResponse = self.send_json(Method::POST, "/exploreUser", &body).await?;

        match (resp.exists, resp.role) {
            (true, Some(role)) => {
                self.session.sign_in(role.as_str(), resp.user_id, resp.token);
                debug!("Signed in as {}", role.as_str());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Check the manager PIN. On success the session becomes a manager session.
    pub async fn unlock_manager(&mut self, pin: &str) -> Result<bool, ClientError> {
        let body = VerifyPinRequest { pin: pin.to_string() };
        let resp: VerifyPinResponse = self.send_json(Method::POST, "/verifyManagerPin", &body).await?;

        match (resp.verified, resp.token) {
            (true, Some(token)) => {
                self.session.elevate_manager(token);
                Ok(true)
            }
            (true, None) => {
                warn!("Manager PIN verified but no token was issued");
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    pub fn logout(&mut self) {
        self.session.logout();
    }

    // -- Users --

    pub async fn get_users(&self) -> Result<Vec<User>, ClientError> {
        self.fetch("/GetUsers").await
    }

    pub async fn personal_data(&self, user_id: &str) -> Result<User, ClientError> {
        self.fetch(&format!("/PersonalData/{user_id}")).await
    }

    pub async fn add_user(&self, user: &UserPayload) -> Result<User, ClientError> {
        self.send_json(Method::POST, "/AddUser", user).await
    }

    pub async fn update_user(&self, user_id: &str, user: &UserPayload) -> Result<User, ClientError> {
        self.send_json(Method::PUT, &format!("/updateUser/{user_id}"), user).await
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<DeleteResponse, ClientError> {
        self.send_json(Method::POST, "/deleteUser", &json!({ "id": user_id })).await
    }

    // -- Greenhouses --

    pub async fn get_greenhouses(&self) -> Result<Vec<Greenhouse>, ClientError> {
        self.fetch("/GetGreenhouses").await
    }

    pub async fn add_greenhouse(
        &self,
        draft: &GreenhouseDraft,
        image: ImageInput,
    ) -> Result<Greenhouse, ClientError> {
        let form = build_form(draft.form_fields(), image)?;
        self.send_form(Method::POST, "/AddGreenhouse", form).await
    }

    /// With [`ImageInput::Keep`] the greenhouse keeps its current image.
    pub async fn update_greenhouse(
        &self,
        greenhouse_id: &str,
        draft: &GreenhouseDraft,
        image: ImageInput,
    ) -> Result<Greenhouse, ClientError> {
        let form = build_form(draft.form_fields(), image)?;
        self.send_form(Method::PUT, &format!("/updateGreenhouse/{greenhouse_id}"), form).await
    }

    pub async fn delete_greenhouse(&self, greenhouse_id: &str) -> Result<DeleteResponse, ClientError> {
        self.send_json(Method::POST, "/DeleteGreenhouse", &json!({ "id": greenhouse_id })).await
    }

    // -- Plants --

    pub async fn get_plants(&self) -> Result<Vec<Plant>, ClientError> {
        self.fetch("/GetPlants").await
    }

    pub async fn get_plants_by_greenhouse(&self, greenhouse_id: &str) -> Result<Vec<Plant>, ClientError> {
        self.fetch(&format!("/GetPlantsByGreenhouse/{greenhouse_id}")).await
    }

    pub async fn get_plant(&self, plant_id: &str) -> Result<Plant, ClientError> {
        self.fetch(&format!("/GetPlant/{plant_id}")).await
    }

    pub async fn add_plant(&self, draft: &PlantDraft, image: ImageInput) -> Result<Plant, ClientError> {
        let form = build_form(draft.form_fields(), image)?;
        self.send_form(Method::POST, "/AddPlant", form).await
    }

    pub async fn update_plant(
        &self,
        plant_id: &str,
        draft: &PlantDraft,
        image: ImageInput,
    ) -> Result<Plant, ClientError> {
        let form = build_form(draft.form_fields(), image)?;
        self.send_form(Method::PUT, &format!("/updatePlant/{plant_id}"), form).await
    }

    pub async fn delete_plant(&self, plant_id: &str) -> Result<DeleteResponse, ClientError> {
        self.send_json(Method::POST, "/DeletePlant", &json!({ "id": plant_id })).await
    }

    // -- Sensor boards --

    pub async fn get_sensors(&self) -> Result<Vec<SensorBoard>, ClientError> {
        self.fetch("/GetSensors").await
    }

    pub async fn get_sensors_by_greenhouse(&self, greenhouse_id: &str) -> Result<Vec<SensorBoard>, ClientError> {
        self.fetch(&format!("/GetSensorsByGreenhouse/{greenhouse_id}")).await
    }

    pub async fn add_sensor(&self, sensor: &SensorDraft) -> Result<SensorBoard, ClientError> {
        self.send_json(Method::POST, "/AddSensor", sensor).await
    }

    pub async fn delete_sensor(&self, sensor_id: &str) -> Result<DeleteResponse, ClientError> {
        self.send_json(Method::POST, "/DeleteSensor", &json!({ "id": sensor_id })).await
    }

    pub async fn push_reading(&self, reading: &ReadingPayload) -> Result<SensorReading, ClientError> {
        self.send_json(Method::POST, "/PushReading", reading).await
    }

    pub async fn get_sensor_readings(
        &self,
        sensor_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<SensorReading>, ClientError> {
        let mut req = self.request(Method::GET, &format!("/GetSensorReadings/{sensor_id}"));
        if let Some(limit) = limit {
            req = req.query(&[("limit", limit)]);
        }
        execute(req).await
    }

    // -- Weather --

    pub async fn weather(&self, location: &str) -> Result<WeatherReport, ClientError> {
        let req = self.request(Method::GET, "/weather").query(&[("location", location)]);
        execute(req).await
    }

    // -- Plumbing --

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match self.session.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        execute(self.request(Method::GET, path)).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        execute(self.request(method, path).json(body)).await
    }

    async fn send_form<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: multipart::Form,
    ) -> Result<T, ClientError> {
        execute(self.request(method, path).multipart(form)).await
    }
}

fn build_form(fields: Vec<(&'static str, String)>, image: ImageInput) -> Result<multipart::Form, ClientError> {
    let mut form = multipart::Form::new();
    for (name, value) in fields {
        form = form.text(name, value);
    }
    match image {
        ImageInput::Keep => {}
        ImageInput::Clear => form = form.text("image", ""),
        ImageInput::Reference(reference) => form = form.text("image", reference),
        ImageInput::File(image) => {
            let part = multipart::Part::bytes(image.data)
                .file_name(image.file_name)
                .mime_str(&image.content_type)
                .map_err(|_| ClientError::Rejected {
                    status: reqwest::StatusCode::BAD_REQUEST,
                    message: format!("invalid image type '{}'", image.content_type),
                })?;
            form = form.part("image", part);
        }
    }
    Ok(form)
}

async fn execute<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ClientError> {
    let resp = req.send().await.map_err(ClientError::Network)?;
    let status = resp.status();

    if status.is_success() {
        return resp.json().await.map_err(ClientError::Decode);
    }

    let message = match resp.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
    };
    debug!("Request failed with {}: {}", status, message);
    Err(ClientError::from_status(status, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environments_pick_their_base_url() {
        let client = ApiClient::new(Environment::Development).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(Environment::Production.base_url(), Environment::PRODUCTION_URL);
    }

    #[test]
    fn image_references_resolve_against_the_backend() {
        let client = ApiClient::with_base_url("http://farm.local:3000/").unwrap();
        assert_eq!(client.image_url("/uploads/a.jpg"), "http://farm.local:3000/uploads/a.jpg");
        assert_eq!(client.image_url("https://cdn.test/b.png"), "https://cdn.test/b.png");
    }

    #[test]
    fn bad_image_types_are_rejected_before_sending() {
        let image = ImageFile {
            file_name: "leaf.png".into(),
            content_type: "not a mime".into(),
            data: vec![1, 2, 3],
        };
        let err = build_form(vec![("name", "Basil".into())], ImageInput::File(image)).unwrap_err();
        assert!(matches!(err, ClientError::Rejected { .. }));

        assert!(build_form(vec![], ImageInput::Clear).is_ok());
        assert!(build_form(vec![], ImageInput::Reference("https://cdn.test/a.jpg".into())).is_ok());
    }
}
