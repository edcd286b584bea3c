// Room catalog: reference data for room types and the numbered rooms that belong to them

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database::Database;
use crate::error::BookingError;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RoomType {
    pub name: String,
    pub description: String,
    // Nightly price
    pub price: f64,
    pub max_occupancy: u32,
    pub pets_allowed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Room {
    pub room_num: i64,
    pub floor: i64,
    pub room_type: String,
}

impl RoomType {
    fn validate(&self) -> Result<(), BookingError> {
        if self.name.trim().is_empty() {
            return Err(BookingError::ValidationError(
                "room type name must not be empty".to_string(),
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(BookingError::ValidationError(format!(
                "room type {} has invalid price {}",
                self.name, self.price
            )));
        }
        if self.max_occupancy == 0 {
            return Err(BookingError::ValidationError(format!(
                "room type {} must hold at least one person",
                self.name
            )));
        }
        Ok(())
    }
}

fn insert_room_type(conn: &rusqlite::Connection, room_type: &RoomType) -> Result<(), BookingError> {
    room_type.validate()?;
    conn.execute(
        "INSERT INTO room_types (name, description, price, max_person, pets_allowed)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            room_type.name,
            room_type.description,
            room_type.price,
            room_type.max_occupancy,
            room_type.pets_allowed,
        ],
    )?;
    Ok(())
}

fn insert_room(conn: &rusqlite::Connection, room: &Room) -> Result<(), BookingError> {
    conn.execute(
        "INSERT INTO rooms (room_num, floor, room_type) VALUES (?1, ?2, ?3)",
        params![room.room_num, room.floor, room.room_type],
    )?;
    Ok(())
}

fn room_type_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoomType> {
    Ok(RoomType {
        name: row.get(0)?,
        description: row.get(1)?,
        price: row.get(2)?,
        max_occupancy: row.get(3)?,
        pets_allowed: row.get(4)?,
    })
}

#[derive(Clone)]
pub struct RoomCatalog {
    db: Database,
}

impl RoomCatalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn add_room_type(&self, room_type: RoomType) -> Result<(), BookingError> {
        self.db
            .call(move |conn| insert_room_type(conn, &room_type))
            .await
    }

    pub async fn add_room(&self, room: Room) -> Result<(), BookingError> {
        self.db.call(move |conn| insert_room(conn, &room)).await
    }

    // Loads a whole catalog at once; nothing is stored if any entry is rejected
    pub async fn seed(&self, room_types: Vec<RoomType>, rooms: Vec<Room>) -> Result<(), BookingError> {
        let (type_count, room_count) = (room_types.len(), rooms.len());
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                for room_type in &room_types {
                    insert_room_type(&tx, room_type)?;
                }
                for room in &rooms {
                    insert_room(&tx, room)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        debug!(type_count, room_count, "room catalog seeded");
        Ok(())
    }

    pub async fn room_types(&self) -> Result<Vec<RoomType>, BookingError> {
        self.db
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name, description, price, max_person, pets_allowed
                     FROM room_types ORDER BY name",
                )?;
                let room_types = stmt
                    .query_map([], room_type_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(room_types)
            })
            .await
    }

    pub async fn room_type(&self, name: &str) -> Result<Option<RoomType>, BookingError> {
        let name = name.to_string();
        self.db
            .call(move |conn| {
                let room_type = conn
                    .query_row(
                        "SELECT name, description, price, max_person, pets_allowed
                         FROM room_types WHERE name = ?1",
                        params![name],
                        room_type_from_row,
                    )
                    .optional()?;
                Ok(room_type)
            })
            .await
    }

    pub async fn rooms(&self) -> Result<Vec<Room>, BookingError> {
        self.db
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT room_num, floor, room_type FROM rooms ORDER BY room_num")?;
                let rooms = stmt
                    .query_map([], |row| {
                        Ok(Room {
                            room_num: row.get(0)?,
                            floor: row.get(1)?,
                            room_type: row.get(2)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rooms)
            })
            .await
    }
}
