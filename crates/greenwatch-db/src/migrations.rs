use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Apply schema changes newer than the recorded version.
pub fn run(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, greenhouses, plants)");
        // No foreign key from plants to greenhouses: deleting a greenhouse
        // leaves its plants in place.
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE greenhouses (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                location    TEXT NOT NULL,
                image       TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE plants (
                id                  TEXT PRIMARY KEY,
                name                TEXT NOT NULL,
                greenhouse_id       TEXT NOT NULL,
                status              TEXT NOT NULL,
                image               TEXT,
                last_checked        TEXT,
                watering_interval   TEXT,
                fertilizer_interval TEXT,
                created_at          TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_plants_greenhouse ON plants(greenhouse_id);

            CREATE TABLE settings (
                key     TEXT PRIMARY KEY,
                value   TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (sensor boards)");
        conn.execute_batch(
            "
            CREATE TABLE sensors (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                greenhouse_id   TEXT NOT NULL,
                board_type      TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_sensors_greenhouse ON sensors(greenhouse_id);

            CREATE TABLE sensor_readings (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                sensor_id       TEXT NOT NULL REFERENCES sensors(id) ON DELETE CASCADE,
                temperature     REAL,
                humidity        REAL,
                soil_moisture   REAL,
                light           REAL,
                recorded_at     TEXT NOT NULL
            );

            CREATE INDEX idx_readings_sensor ON sensor_readings(sensor_id, id);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
