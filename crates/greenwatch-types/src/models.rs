use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shown in place of a greenhouse name when a record points at a greenhouse
/// that no longer exists.
pub const UNKNOWN_GREENHOUSE: &str = "Unknown Greenhouse";

pub const DEFAULT_PLANT_STATUS: &str = "Healthy";

/// Role stored on a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Farmer,
    Technician,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Farmer => "farmer",
            Self::Technician => "technician",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "farmer" => Some(Self::Farmer),
            "technician" => Some(Self::Technician),
            _ => None,
        }
    }
}

/// Role carried by an issued access token. `Manager` is never stored on a
/// user row; it is granted by the manager PIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRole {
    Manager,
    Farmer,
    Technician,
}

impl From<UserRole> for AccessRole {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Farmer => Self::Farmer,
            UserRole::Technician => Self::Technician,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Greenhouse {
    pub id: String,
    pub name: String,
    /// Either `"lat,lng"` or free text.
    pub location: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: String,
    pub name: String,
    pub greenhouse_id: String,
    pub greenhouse_name: String,
    pub status: String,
    pub image: Option<String>,
    pub last_checked: Option<String>,
    pub watering_interval: Option<String>,
    pub fertilizer_interval: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorBoard {
    pub id: String,
    pub name: String,
    pub greenhouse_id: String,
    pub greenhouse_name: String,
    pub board_type: String,
    pub last_reading: Option<SensorReading>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub sensor_id: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub light: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// Resolve the display name for a greenhouse reference.
pub fn greenhouse_display_name(name: Option<String>) -> String {
    name.unwrap_or_else(|| UNKNOWN_GREENHOUSE.to_string())
}
