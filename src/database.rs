// SQLite storage handle
// All statements run on tokio-rusqlite's single background thread. A closure passed
// to `call` executes without interleaving with any other closure on the same handle.

use std::path::Path;

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{map_call_err, BookingError};

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS room_types (
    name         TEXT PRIMARY KEY,
    description  TEXT NOT NULL DEFAULT '',
    price        REAL NOT NULL,
    max_person   INTEGER NOT NULL,
    pets_allowed INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS rooms (
    room_num  INTEGER PRIMARY KEY,
    floor     INTEGER NOT NULL,
    room_type TEXT NOT NULL REFERENCES room_types(name)
);

CREATE TABLE IF NOT EXISTS guests (
    guest_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name  TEXT NOT NULL,
    address    TEXT NOT NULL,
    city       TEXT NOT NULL,
    dob        TEXT NOT NULL,
    phone      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reservations (
    res_id           TEXT PRIMARY KEY,
    user_email       TEXT NOT NULL,
    guest_id         INTEGER NOT NULL REFERENCES guests(guest_id),
    room_num         INTEGER NOT NULL REFERENCES rooms(room_num),
    guests           INTEGER NOT NULL,
    arrival          TEXT NOT NULL,
    departure        TEXT NOT NULL,
    total_price      REAL NOT NULL,
    transaction_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reservations_room
    ON reservations (room_num, arrival, departure);

CREATE TABLE IF NOT EXISTS reservation_services (
    service_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    res_id       TEXT NOT NULL REFERENCES reservations(res_id),
    service_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reservation_events (
    event_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    res_id     TEXT NOT NULL REFERENCES reservations(res_id),
    user_email TEXT NOT NULL,
    status     TEXT NOT NULL,
    details    TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reservation_events_latest
    ON reservation_events (res_id, created_at, event_id);
";

#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    pub async fn open(path: impl AsRef<Path>, config: &EngineConfig) -> Result<Self, BookingError> {
        let path = path.as_ref().to_path_buf();
        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(|e| BookingError::StorageUnavailable(e.to_string()))?;
        debug!(path = %path.display(), "opened reservation database");
        Self::from_connection(conn, config).await
    }

    pub async fn open_in_memory(config: &EngineConfig) -> Result<Self, BookingError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| BookingError::StorageUnavailable(e.to_string()))?;
        Self::from_connection(conn, config).await
    }

    // Takes over an already opened connection and makes sure the schema exists
    pub async fn from_connection(
        conn: tokio_rusqlite::Connection,
        config: &EngineConfig,
    ) -> Result<Self, BookingError> {
        let db = Self { conn };
        let busy_timeout = config.busy_timeout();
        db.call(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;
        Ok(db)
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub async fn call<F, R>(&self, function: F) -> Result<R, BookingError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, BookingError> + Send + 'static,
        R: Send + 'static,
    {
        self.conn.call(function).await.map_err(map_call_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motel.db");
        let config = EngineConfig::default();

        Database::open(&path, &config).await.unwrap();
        let db = Database::open(&path, &config).await.unwrap();

        let tables: Vec<String> = db
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .unwrap();

        assert_eq!(
            tables,
            vec![
                "guests",
                "reservation_events",
                "reservation_services",
                "reservations",
                "room_types",
                "rooms"
            ]
        );
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let db = Database::open_in_memory(&EngineConfig::default())
            .await
            .unwrap();

        let result = db
            .call(|conn| {
                conn.execute(
                    "INSERT INTO rooms (room_num, floor, room_type) VALUES (1, 1, 'Missing')",
                    [],
                )?;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(BookingError::DatabaseError(_))));
    }
}
