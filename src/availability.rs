// Availability search and room allocation
// Both paths share one "is this room blocked" predicate over the reservations table.

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, OptionalExtension, Transaction};
use serde::Serialize;
use tracing::debug;

use crate::config::OverlapPolicy;
use crate::database::Database;
use crate::error::BookingError;
use crate::filter::{FilterSet, FilterStatement, FilterStatementBuilder};

// One row per room type that still has at least one free room
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableRoomType {
    pub room_type: String,
    pub description: String,
    // nightly price x nights
    pub computed_cost: f64,
    pub pets_allowed: bool,
}

pub fn nights_between(arrival: NaiveDate, departure: NaiveDate) -> i64 {
    (departure - arrival).num_days()
}

pub(crate) fn validate_stay(
    arrival: NaiveDate,
    departure: NaiveDate,
    party_size: u32,
) -> Result<(), BookingError> {
    if arrival >= departure {
        return Err(BookingError::ValidationError(format!(
            "arrival {} must be before departure {}",
            arrival, departure
        )));
    }
    if party_size == 0 {
        return Err(BookingError::ValidationError(
            "party size must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn date_value(date: NaiveDate) -> Value {
    Value::Text(date.format("%Y-%m-%d").to_string())
}

// Condition over reservations aliased `res` that is true when the reservation blocks the stay
fn overlap_predicate(
    policy: OverlapPolicy,
    arrival: NaiveDate,
    departure: NaiveDate,
) -> (&'static str, Vec<Value>) {
    match policy {
        OverlapPolicy::Endpoints => (
            "((res.arrival BETWEEN ? AND ?) OR (res.departure BETWEEN ? AND ?))",
            vec![
                date_value(arrival),
                date_value(departure),
                date_value(arrival),
                date_value(departure),
            ],
        ),
        OverlapPolicy::Interval => (
            "(res.arrival < ? AND res.departure > ?)",
            vec![date_value(departure), date_value(arrival)],
        ),
    }
}

// Availability query before grouping; filters land after the capacity condition
pub fn available_room_types_statement(
    policy: OverlapPolicy,
    arrival: NaiveDate,
    departure: NaiveDate,
    party_size: u32,
    filters: &FilterSet,
) -> FilterStatement {
    let (overlap, overlap_args) = overlap_predicate(policy, arrival, departure);
    let query = format!(
        "SELECT room_type, description, price * ? AS cost, pets_allowed \
         FROM rooms JOIN room_types rt ON rt.name = rooms.room_type \
         WHERE room_num NOT IN (SELECT res.room_num FROM reservations res WHERE {overlap}) \
         AND rt.max_person >= ?"
    );

    let mut args = Vec::with_capacity(overlap_args.len() + 2);
    args.push(Value::Integer(nights_between(arrival, departure)));
    args.extend(overlap_args);
    args.push(Value::Integer(i64::from(party_size)));

    FilterStatementBuilder::new(query, args).build(filters)
}

fn free_room_number(
    conn: &rusqlite::Connection,
    policy: OverlapPolicy,
    room_type: &str,
    arrival: NaiveDate,
    departure: NaiveDate,
) -> Result<Option<i64>, BookingError> {
    let (overlap, overlap_args) = overlap_predicate(policy, arrival, departure);
    let query = format!(
        "SELECT room_num FROM rooms \
         WHERE room_type = ? \
         AND room_num NOT IN (SELECT res.room_num FROM reservations res WHERE {overlap}) \
         ORDER BY room_num \
         LIMIT 1"
    );

    let mut args = vec![Value::Text(room_type.to_string())];
    args.extend(overlap_args);

    let room_num = conn
        .query_row(&query, params_from_iter(args.iter()), |row| row.get(0))
        .optional()?;
    Ok(room_num)
}

// Picks the lowest free room number of the type and must run inside the immediate
// transaction that also inserts the reservation. Holding the write lock across both
// steps is what keeps two bookings from claiming the same room.
pub fn allocate_room(
    tx: &Transaction<'_>,
    policy: OverlapPolicy,
    room_type: &str,
    arrival: NaiveDate,
    departure: NaiveDate,
) -> Result<i64, BookingError> {
    match free_room_number(tx, policy, room_type, arrival, departure)? {
        Some(room_num) => {
            debug!(room_type, room_num, %arrival, %departure, "room allocated");
            Ok(room_num)
        }
        None => Err(BookingError::NoRoomAvailable {
            room_type: room_type.to_string(),
            arrival,
            departure,
        }),
    }
}

#[derive(Clone)]
pub struct AvailabilityEngine {
    db: Database,
    policy: OverlapPolicy,
}

impl AvailabilityEngine {
    pub fn new(db: Database, policy: OverlapPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub async fn find_available_room_types(
        &self,
        arrival: NaiveDate,
        departure: NaiveDate,
        party_size: u32,
        filters: &FilterSet,
    ) -> Result<Vec<AvailableRoomType>, BookingError> {
        validate_stay(arrival, departure, party_size)?;

        let (query, args) =
            available_room_types_statement(self.policy, arrival, departure, party_size, filters)
                .into_parts();
        let query = format!("{query} GROUP BY room_type ORDER BY room_type");

        let results = self
            .db
            .call(move |conn| {
                let mut stmt = conn.prepare(&query)?;
                let rows = stmt
                    .query_map(params_from_iter(args.iter()), |row| {
                        Ok(AvailableRoomType {
                            room_type: row.get(0)?,
                            description: row.get(1)?,
                            computed_cost: row.get(2)?,
                            pets_allowed: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        debug!(
            %arrival,
            %departure,
            party_size,
            matches = results.len(),
            "availability search finished"
        );
        Ok(results)
    }

    // Informational lookup; booking goes through `allocate_room` instead
    pub async fn find_free_room_number(
        &self,
        room_type: &str,
        arrival: NaiveDate,
        departure: NaiveDate,
    ) -> Result<i64, BookingError> {
        validate_stay(arrival, departure, 1)?;

        let policy = self.policy;
        let room_type_owned = room_type.to_string();
        let room_num = self
            .db
            .call(move |conn| free_room_number(conn, policy, &room_type_owned, arrival, departure))
            .await?;

        room_num.ok_or_else(|| BookingError::NoRoomAvailable {
            room_type: room_type.to_string(),
            arrival,
            departure,
        })
    }
}
