//! Database row types. These map directly to SQLite rows.
//! Conversion into the wire models lives here too.
use chrono::{DateTime, Utc};
use tracing::warn;

use greenwatch_types::models::{
    Greenhouse, Plant, SensorBoard, SensorReading, User, UserRole, greenhouse_display_name,
};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

pub struct GreenhouseRow {
    pub id: String,
    pub name: String,
    pub location: String,
    pub image: Option<String>,
    pub created_at: String,
}

pub struct PlantRow {
    pub id: String,
    pub name: String,
    pub greenhouse_id: String,
    /// `None` when the referenced greenhouse does not exist.
    pub greenhouse_name: Option<String>,
    pub status: String,
    pub image: Option<String>,
    pub last_checked: Option<String>,
    pub watering_interval: Option<String>,
    pub fertilizer_interval: Option<String>,
    pub created_at: String,
}

pub struct SensorRow {
    pub id: String,
    pub name: String,
    pub greenhouse_id: String,
    pub greenhouse_name: Option<String>,
    pub board_type: String,
    pub created_at: String,
    pub latest: Option<ReadingRow>,
}

pub struct ReadingRow {
    pub sensor_id: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub light: Option<f64>,
    pub recorded_at: String,
}

/// Outcome of writing a user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserWrite {
    Written,
    /// Another user already holds the username.
    UsernameTaken,
    /// Update only: no user has the given id.
    Missing,
}

/// Writable plant columns, shared by insert and full-replace update.
#[derive(Debug, Clone, Default)]
pub struct PlantFields {
    pub name: String,
    pub greenhouse_id: String,
    pub status: String,
    pub image: Option<String>,
    pub last_checked: Option<String>,
    pub watering_interval: Option<String>,
    pub fertilizer_interval: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Measurements {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub light: Option<f64>,
}

/// Parse a stored timestamp. Rows written by SQLite defaults use
/// "YYYY-MM-DD HH:MM:SS" without a zone; rows written by the server use RFC 3339.
pub fn parse_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}

impl UserRow {
    pub fn into_model(self) -> User {
        let role = UserRole::parse(&self.role).unwrap_or_else(|| {
            warn!("Corrupt role '{}' on user '{}', treating as farmer", self.role, self.id);
            UserRole::Farmer
        });
        let created_at = parse_timestamp(&self.created_at, &self.id);
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            role,
            created_at,
        }
    }
}

impl GreenhouseRow {
    pub fn into_model(self) -> Greenhouse {
        let created_at = parse_timestamp(&self.created_at, &self.id);
        Greenhouse {
            id: self.id,
            name: self.name,
            location: self.location,
            image: self.image,
            created_at,
        }
    }
}

impl PlantRow {
    pub fn into_model(self) -> Plant {
        let created_at = parse_timestamp(&self.created_at, &self.id);
        Plant {
            id: self.id,
            name: self.name,
            greenhouse_id: self.greenhouse_id,
            greenhouse_name: greenhouse_display_name(self.greenhouse_name),
            status: self.status,
            image: self.image,
            last_checked: self.last_checked,
            watering_interval: self.watering_interval,
            fertilizer_interval: self.fertilizer_interval,
            created_at,
        }
    }
}

impl SensorRow {
    pub fn into_model(self) -> SensorBoard {
        let created_at = parse_timestamp(&self.created_at, &self.id);
        SensorBoard {
            id: self.id,
            name: self.name,
            greenhouse_id: self.greenhouse_id,
            greenhouse_name: greenhouse_display_name(self.greenhouse_name),
            board_type: self.board_type,
            last_reading: self.latest.map(ReadingRow::into_model),
            created_at,
        }
    }
}

impl ReadingRow {
    pub fn into_model(self) -> SensorReading {
        let recorded_at = parse_timestamp(&self.recorded_at, &self.sensor_id);
        SensorReading {
            sensor_id: self.sensor_id,
            temperature: self.temperature,
            humidity: self.humidity,
            soil_moisture: self.soil_moisture,
            light: self.light,
            recorded_at,
        }
    }
}
