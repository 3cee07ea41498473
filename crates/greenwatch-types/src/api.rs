use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::care::{self, CareFieldError, FertilizerInterval, WateringInterval};
use crate::models::UserRole;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("unknown role '{0}', expected farmer or technician")]
    UnknownRole(String),
    #[error(transparent)]
    Care(#[from] CareFieldError),
    #[error("a reading needs at least one measurement")]
    NoMeasurement,
    #[error("{0} must be a finite number")]
    NotFinite(&'static str),
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(())
}

/// Empty form values mean "not provided" for optional fields.
fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

// -- Auth --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploreUserRequest {
    #[serde(rename = "UserName")]
    pub username: String,
    #[serde(rename = "Password")]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreUserResponse {
    pub exists: bool,
    pub role: Option<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ExploreUserResponse {
    pub fn not_found() -> Self {
        Self { exists: false, role: None, user_id: None, token: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPinRequest {
    pub pin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyPinResponse {
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

// -- Users --

/// Body of `AddUser` and `updateUser`. Updates replace every field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl UserPayload {
    /// Checks required fields and returns the role to store (farmer when omitted).
    pub fn validate(&self) -> Result<UserRole, ValidationError> {
        require("username", &self.username)?;
        require("email", &self.email)?;
        require("password", &self.password)?;
        match self.role.as_deref().map(str::trim) {
            None | Some("") => Ok(UserRole::Farmer),
            Some(role) => UserRole::parse(role).ok_or_else(|| ValidationError::UnknownRole(role.to_string())),
        }
    }
}

// -- Greenhouses --

/// Text fields of the greenhouse form. The image travels separately.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GreenhouseDraft {
    pub name: String,
    pub location: String,
}

impl GreenhouseDraft {
    /// Returns false for field names the form does not know.
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        match name {
            "name" => self.name = value.trim().to_string(),
            "location" => self.location = value.trim().to_string(),
            _ => return false,
        }
        true
    }

    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name.clone()), ("location", self.location.clone())]
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("location", &self.location)
    }
}

// -- Plants --

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantDraft {
    pub name: String,
    pub greenhouse_id: String,
    pub status: Option<String>,
    pub last_checked: Option<String>,
    pub watering_interval: Option<String>,
    pub fertilizer_interval: Option<String>,
}

impl PlantDraft {
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        match name {
            "name" => self.name = value.trim().to_string(),
            "greenhouseId" => self.greenhouse_id = value.trim().to_string(),
            "status" => self.status = optional(value),
            "lastChecked" => self.last_checked = optional(value),
            "wateringInterval" => self.watering_interval = optional(value),
            "fertilizerInterval" => self.fertilizer_interval = optional(value),
            _ => return false,
        }
        true
    }

    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("greenhouseId", self.greenhouse_id.clone()),
        ];
        let optional = [
            ("status", &self.status),
            ("lastChecked", &self.last_checked),
            ("wateringInterval", &self.watering_interval),
            ("fertilizerInterval", &self.fertilizer_interval),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                fields.push((name, value.clone()));
            }
        }
        fields
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("greenhouseId", &self.greenhouse_id)?;
        if let Some(clock) = &self.last_checked {
            care::parse_last_checked(clock)?;
        }
        if let Some(interval) = &self.watering_interval {
            WateringInterval::parse(interval)?;
        }
        if let Some(interval) = &self.fertilizer_interval {
            FertilizerInterval::parse(interval)?;
        }
        Ok(())
    }
}

// -- Sensors --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub greenhouse_id: String,
    #[serde(default)]
    pub board_type: Option<String>,
}

impl SensorDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("greenhouseId", &self.greenhouse_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingPayload {
    #[serde(default)]
    pub sensor_id: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub light: Option<f64>,
}

impl ReadingPayload {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("sensorId", &self.sensor_id)?;
        let measurements = [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("soilMoisture", self.soil_moisture),
            ("light", self.light),
        ];
        if measurements.iter().all(|(_, v)| v.is_none()) {
            return Err(ValidationError::NoMeasurement);
        }
        for (field, value) in measurements {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(ValidationError::NotFinite(field));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadingsQuery {
    pub limit: Option<u32>,
}

// -- Shared --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -- Weather --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub location: WeatherLocation,
    pub current: CurrentWeather,
    pub days: Vec<ForecastDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherLocation {
    pub name: String,
    pub region: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    pub temperature_c: f64,
    pub condition: String,
    pub icon: String,
    pub humidity: f64,
    pub wind_kph: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub date: String,
    pub max_temperature_c: f64,
    pub min_temperature_c: f64,
    pub condition: String,
    pub icon: String,
    pub chance_of_rain: f64,
}
