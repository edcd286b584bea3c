// Shared fixtures for the in-crate tests

use std::collections::VecDeque;

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rusqlite::params;

use crate::booking::{BookingDraft, GuestInput};
use crate::catalog::{Room, RoomCatalog, RoomType};
use crate::config::{EngineConfig, OverlapPolicy};
use crate::database::Database;
use crate::id_generator::IdGenerator;

pub fn test_config(policy: OverlapPolicy) -> EngineConfig {
    EngineConfig {
        overlap_policy: policy,
        ..EngineConfig::default()
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn room_type(name: &str, price: f64, max_occupancy: u32, pets_allowed: bool) -> RoomType {
    RoomType {
        name: name.to_string(),
        description: format!("{} room", name),
        price,
        max_occupancy,
        pets_allowed,
    }
}

pub fn sample_catalog() -> Vec<RoomType> {
    vec![
        room_type("Single", 50.0, 1, false),
        room_type("Double", 80.0, 2, true),
        room_type("Suite", 200.0, 4, false),
    ]
}

fn room(room_num: i64, floor: i64, room_type: &str) -> Room {
    Room {
        room_num,
        floor,
        room_type: room_type.to_string(),
    }
}

// Inserted out of order so allocation has to sort by room number
pub fn sample_rooms() -> Vec<Room> {
    vec![
        room(101, 1, "Double"),
        room(103, 1, "Double"),
        room(102, 1, "Double"),
        room(201, 2, "Single"),
        room(301, 3, "Suite"),
    ]
}

pub async fn seed(db: &Database) {
    RoomCatalog::new(db.clone())
        .seed(sample_catalog(), sample_rooms())
        .await
        .unwrap();
}

pub async fn seeded_database(policy: OverlapPolicy) -> Database {
    let db = Database::open_in_memory(&test_config(policy)).await.unwrap();
    seed(&db).await;
    db
}

pub fn sample_guest() -> GuestInput {
    GuestInput {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        address: "12 Marine Parade".to_string(),
        city: "Brighton".to_string(),
        dob: date(1985, 12, 10),
        phone: "+44 1273 000000".to_string(),
    }
}

// Priced from the sample catalog, plus 15 per service
pub fn draft(
    room_type: &str,
    arrival: NaiveDate,
    departure: NaiveDate,
    party_size: u32,
    services: &[&str],
) -> BookingDraft {
    let nightly = sample_catalog()
        .into_iter()
        .find(|rt| rt.name == room_type)
        .map(|rt| rt.price)
        .unwrap_or(0.0);
    let nights = (departure - arrival).num_days().max(0) as f64;

    BookingDraft {
        room_type: room_type.to_string(),
        arrival,
        departure,
        party_size,
        services: services.iter().map(|s| s.to_string()).collect(),
        total_price: nightly * nights + 15.0 * services.len() as f64,
    }
}

pub async fn count_rows(db: &Database, table: &'static str) -> i64 {
    db.call(move |conn| {
        let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })?;
        Ok(count)
    })
    .await
    .unwrap()
}

// Writes a reservation directly, bypassing allocation
pub async fn insert_reservation(
    db: &Database,
    res_id: &str,
    room_num: i64,
    arrival: NaiveDate,
    departure: NaiveDate,
) {
    let res_id = res_id.to_string();
    db.call(move |conn| {
        let guest = sample_guest();
        conn.execute(
            "INSERT INTO guests (first_name, last_name, address, city, dob, phone)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                guest.first_name,
                guest.last_name,
                guest.address,
                guest.city,
                guest.dob,
                guest.phone
            ],
        )?;
        let guest_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO reservations
                 (res_id, user_email, guest_id, room_num, guests, arrival, departure, total_price, transaction_date)
             VALUES (?1, 'fixture@motel.test', ?2, ?3, 1, ?4, ?5, 0.0, ?6)",
            params![res_id, guest_id, room_num, arrival, departure, Utc::now()],
        )?;
        conn.execute(
            "INSERT INTO reservation_events (res_id, user_email, status, details, created_at)
             VALUES (?1, 'fixture@motel.test', 'new', '', ?2)",
            params![res_id, Utc::now()],
        )?;
        Ok(())
    })
    .await
    .unwrap();
}

// Hands out a fixed sequence of ids, then random ones
pub struct ScriptedIdGenerator {
    ids: Mutex<VecDeque<String>>,
}

impl ScriptedIdGenerator {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            ids: Mutex::new(ids.iter().map(|id| id.to_string()).collect()),
        }
    }
}

impl IdGenerator for ScriptedIdGenerator {
    fn generate(&self, length: usize) -> String {
        self.ids
            .lock()
            .pop_front()
            .unwrap_or_else(|| crate::id_generator::RandomIdGenerator.generate(length))
    }
}
