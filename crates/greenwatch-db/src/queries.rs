use crate::Database;
use crate::models::{
    GreenhouseRow, Measurements, PlantFields, PlantRow, ReadingRow, SensorRow, UserRow, UserWrite,
};
use anyhow::Result;
use greenwatch_types::models::UserRole;
use rusqlite::{Connection, Row};

const MANAGER_PIN_KEY: &str = "manager_pin";

const PLANT_SELECT: &str = "SELECT p.id, p.name, p.greenhouse_id, g.name, p.status, p.image,
            p.last_checked, p.watering_interval, p.fertilizer_interval, p.created_at
     FROM plants p
     LEFT JOIN greenhouses g ON g.id = p.greenhouse_id";

const SENSOR_SELECT: &str = "SELECT s.id, s.name, s.greenhouse_id, g.name, s.board_type, s.created_at,
            r.temperature, r.humidity, r.soil_moisture, r.light, r.recorded_at
     FROM sensors s
     LEFT JOIN greenhouses g ON g.id = s.greenhouse_id
     LEFT JOIN sensor_readings r
         ON r.id = (SELECT MAX(id) FROM sensor_readings WHERE sensor_id = s.id)";

impl Database {
    // -- Users --

    /// Insert a user. A username collision is reported, not raised, so racing
    /// writers get the same answer as a sequential duplicate.
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<UserWrite> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, email, password, role) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, username, email, password_hash, role.as_str()),
            );
            match inserted {
                Ok(_) => Ok(UserWrite::Written),
                Err(e) if is_unique_violation(&e) => Ok(UserWrite::UsernameTaken),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, email, password, role, created_at FROM users
                 ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Replace every field of a user.
    pub fn update_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<UserWrite> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET username = ?2, email = ?3, password = ?4, role = ?5 WHERE id = ?1",
                (id, username, email, password_hash, role.as_str()),
            );
            match updated {
                Ok(0) => Ok(UserWrite::Missing),
                Ok(_) => Ok(UserWrite::Written),
                Err(e) if is_unique_violation(&e) => Ok(UserWrite::UsernameTaken),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn delete_user(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Greenhouses --

    pub fn insert_greenhouse(
        &self,
        id: &str,
        name: &str,
        location: &str,
        image: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO greenhouses (id, name, location, image) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, name, location, image],
            )?;
            Ok(())
        })
    }

    pub fn get_greenhouse(&self, id: &str) -> Result<Option<GreenhouseRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, location, image, created_at FROM greenhouses WHERE id = ?1",
                [id],
                greenhouse_from_row,
            )
            .optional()
        })
    }

    pub fn list_greenhouses(&self) -> Result<Vec<GreenhouseRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, location, image, created_at FROM greenhouses
                 ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map([], greenhouse_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_greenhouse(
        &self,
        id: &str,
        name: &str,
        location: &str,
        image: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE greenhouses SET name = ?2, location = ?3, image = ?4 WHERE id = ?1",
                rusqlite::params![id, name, location, image],
            )?;
            Ok(changed > 0)
        })
    }

    /// Delete a greenhouse, leaving its plants and sensors untouched.
    /// Returns the image reference the removed row held, if any.
    pub fn delete_greenhouse(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| take_image_and_delete(conn, "greenhouses", id))
    }

    // -- Plants --

    pub fn insert_plant(&self, id: &str, fields: &PlantFields) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO plants (id, name, greenhouse_id, status, image, last_checked,
                                     watering_interval, fertilizer_interval)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    id,
                    fields.name,
                    fields.greenhouse_id,
                    fields.status,
                    fields.image,
                    fields.last_checked,
                    fields.watering_interval,
                    fields.fertilizer_interval,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_plant(&self, id: &str) -> Result<Option<PlantRow>> {
        self.with_conn(|conn| {
            conn.query_row(&format!("{PLANT_SELECT} WHERE p.id = ?1"), [id], plant_from_row)
                .optional()
        })
    }

    pub fn list_plants(&self) -> Result<Vec<PlantRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{PLANT_SELECT} ORDER BY p.created_at, p.rowid"))?;
            let rows = stmt
                .query_map([], plant_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_plants_by_greenhouse(&self, greenhouse_id: &str) -> Result<Vec<PlantRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{PLANT_SELECT} WHERE p.greenhouse_id = ?1 ORDER BY p.created_at, p.rowid"
            ))?;
            let rows = stmt
                .query_map([greenhouse_id], plant_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Overwrite every writable column of a plant. Returns false when no row matched.
    pub fn update_plant(&self, id: &str, fields: &PlantFields) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE plants SET name = ?2, greenhouse_id = ?3, status = ?4, image = ?5,
                        last_checked = ?6, watering_interval = ?7, fertilizer_interval = ?8
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    fields.name,
                    fields.greenhouse_id,
                    fields.status,
                    fields.image,
                    fields.last_checked,
                    fields.watering_interval,
                    fields.fertilizer_interval,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_plant(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| take_image_and_delete(conn, "plants", id))
    }

    // -- Sensors --

    pub fn insert_sensor(
        &self,
        id: &str,
        name: &str,
        greenhouse_id: &str,
        board_type: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sensors (id, name, greenhouse_id, board_type) VALUES (?1, ?2, ?3, ?4)",
                (id, name, greenhouse_id, board_type),
            )?;
            Ok(())
        })
    }

    pub fn get_sensor(&self, id: &str) -> Result<Option<SensorRow>> {
        self.with_conn(|conn| {
            conn.query_row(&format!("{SENSOR_SELECT} WHERE s.id = ?1"), [id], sensor_from_row)
                .optional()
        })
    }

    pub fn list_sensors(&self) -> Result<Vec<SensorRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{SENSOR_SELECT} ORDER BY s.created_at, s.rowid"))?;
            let rows = stmt
                .query_map([], sensor_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_sensors_by_greenhouse(&self, greenhouse_id: &str) -> Result<Vec<SensorRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SENSOR_SELECT} WHERE s.greenhouse_id = ?1 ORDER BY s.created_at, s.rowid"
            ))?;
            let rows = stmt
                .query_map([greenhouse_id], sensor_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete a sensor board together with its readings.
    pub fn delete_sensor(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sensors WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Append a reading. Returns false when the sensor does not exist.
    pub fn insert_reading(
        &self,
        sensor_id: &str,
        values: &Measurements,
        recorded_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let known: Option<String> = conn
                .query_row("SELECT id FROM sensors WHERE id = ?1", [sensor_id], |row| row.get(0))
                .optional()?;
            if known.is_none() {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO sensor_readings (sensor_id, temperature, humidity, soil_moisture, light, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    sensor_id,
                    values.temperature,
                    values.humidity,
                    values.soil_moisture,
                    values.light,
                    recorded_at,
                ],
            )?;
            Ok(true)
        })
    }

    /// Newest readings first.
    pub fn list_readings(&self, sensor_id: &str, limit: u32) -> Result<Vec<ReadingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT sensor_id, temperature, humidity, soil_moisture, light, recorded_at
                 FROM sensor_readings WHERE sensor_id = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![sensor_id, limit], |row| {
                    Ok(ReadingRow {
                        sensor_id: row.get(0)?,
                        temperature: row.get(1)?,
                        humidity: row.get(2)?,
                        soil_moisture: row.get(3)?,
                        light: row.get(4)?,
                        recorded_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Settings --

    pub fn manager_pin_hash(&self) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [MANAGER_PIN_KEY],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn set_manager_pin_hash(&self, hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                (MANAGER_PIN_KEY, hash),
            )?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    conn.query_row(
        &format!(
            "SELECT id, username, email, password, role, created_at FROM users WHERE {column} = ?1"
        ),
        [value],
        user_from_row,
    )
    .optional()
}

/// `table` is always one of this module's literals, never caller input.
fn take_image_and_delete(conn: &Connection, table: &str, id: &str) -> Result<Option<String>> {
    let image: Option<Option<String>> = conn
        .query_row(&format!("SELECT image FROM {table} WHERE id = ?1"), [id], |row| row.get(0))
        .optional()?;
    conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?;
    Ok(image.flatten())
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn greenhouse_from_row(row: &Row<'_>) -> rusqlite::Result<GreenhouseRow> {
    Ok(GreenhouseRow {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        image: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn plant_from_row(row: &Row<'_>) -> rusqlite::Result<PlantRow> {
    Ok(PlantRow {
        id: row.get(0)?,
        name: row.get(1)?,
        greenhouse_id: row.get(2)?,
        greenhouse_name: row.get(3)?,
        status: row.get(4)?,
        image: row.get(5)?,
        last_checked: row.get(6)?,
        watering_interval: row.get(7)?,
        fertilizer_interval: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn sensor_from_row(row: &Row<'_>) -> rusqlite::Result<SensorRow> {
    let id: String = row.get(0)?;
    let recorded_at: Option<String> = row.get(10)?;
    let latest = match recorded_at {
        Some(recorded_at) => Some(ReadingRow {
            sensor_id: id.clone(),
            temperature: row.get(6)?,
            humidity: row.get(7)?,
            soil_moisture: row.get(8)?,
            light: row.get(9)?,
            recorded_at,
        }),
        None => None,
    };
    Ok(SensorRow {
        id,
        name: row.get(1)?,
        greenhouse_id: row.get(2)?,
        greenhouse_name: row.get(3)?,
        board_type: row.get(4)?,
        created_at: row.get(5)?,
        latest,
    })
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
