// Read-side projections for dashboards
// Every row carries the reservation's current status and its attached service names.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use crate::database::Database;
use crate::error::BookingError;
use crate::events::CURRENT_EVENT_JOIN;

// ASCII unit separator, never part of a service name
const SERVICE_SEPARATOR: char = '\u{1f}';

const SUMMARY_COLUMNS: &str = "r.res_id, r.user_email, g.first_name, g.last_name, g.address, g.city, g.phone,
    r.room_num, r.guests, r.arrival, r.departure, r.transaction_date, re.status, r.total_price,
    (SELECT group_concat(rs.service_name, char(31))
     FROM reservation_services rs WHERE rs.res_id = r.res_id) AS services";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationSummary {
    pub booking_id: String,
    pub user_email: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub room_num: i64,
    pub party_size: u32,
    pub arrival: NaiveDate,
    pub departure: NaiveDate,
    pub transaction_date: DateTime<Utc>,
    pub status: String,
    pub total_price: f64,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationDetail {
    #[serde(flatten)]
    pub summary: ReservationSummary,
    pub room_type: String,
    pub floor: i64,
    // nightly price x nights, independent of the total charged
    pub room_price: f64,
    pub nights: i64,
}

fn split_services(services: Option<String>) -> Vec<String> {
    let mut names: Vec<String> = services
        .map(|joined| {
            joined
                .split(SERVICE_SEPARATOR)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn summary_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReservationSummary> {
    Ok(ReservationSummary {
        booking_id: row.get(0)?,
        user_email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        address: row.get(4)?,
        city: row.get(5)?,
        phone: row.get(6)?,
        room_num: row.get(7)?,
        party_size: row.get(8)?,
        arrival: row.get(9)?,
        departure: row.get(10)?,
        transaction_date: row.get(11)?,
        status: row.get(12)?,
        total_price: row.get(13)?,
        services: split_services(row.get(14)?),
    })
}

fn query_summaries(
    conn: &rusqlite::Connection,
    query: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<ReservationSummary>, BookingError> {
    let mut stmt = conn.prepare(query)?;
    let rows = stmt
        .query_map(params, summary_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[derive(Clone)]
pub struct ReservationQueryService {
    db: Database,
}

impl ReservationQueryService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn fetch_single(&self, booking_id: &str) -> Result<Option<ReservationDetail>, BookingError> {
        let booking_id = booking_id.to_string();
        let query = format!(
            "SELECT {SUMMARY_COLUMNS},
                    rt.name,
                    rooms.floor,
                    rt.price * CAST(julianday(r.departure) - julianday(r.arrival) AS INTEGER) AS room_price,
                    CAST(julianday(r.departure) - julianday(r.arrival) AS INTEGER) AS nights
             FROM reservations r
             JOIN guests g ON g.guest_id = r.guest_id
             {CURRENT_EVENT_JOIN}
             JOIN rooms ON rooms.room_num = r.room_num
             JOIN room_types rt ON rt.name = rooms.room_type
             WHERE r.res_id = ?1"
        );

        self.db
            .call(move |conn| {
                let detail = conn
                    .query_row(&query, params![booking_id], |row| {
                        Ok(ReservationDetail {
                            summary: summary_from_row(row)?,
                            room_type: row.get(15)?,
                            floor: row.get(16)?,
                            room_price: row.get(17)?,
                            nights: row.get(18)?,
                        })
                    })
                    .optional()?;
                Ok(detail)
            })
            .await
    }

    // Newest transaction first
    pub async fn fetch_all(&self) -> Result<Vec<ReservationSummary>, BookingError> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS}
             FROM reservations r
             JOIN guests g ON g.guest_id = r.guest_id
             {CURRENT_EVENT_JOIN}
             ORDER BY r.transaction_date DESC, r.rowid DESC"
        );
        self.db
            .call(move |conn| query_summaries(conn, &query, []))
            .await
    }

    // Oldest transaction first, unlike fetch_all
    pub async fn filter_by_status(&self, status: &str) -> Result<Vec<ReservationSummary>, BookingError> {
        let status = status.to_string();
        let query = format!(
            "SELECT {SUMMARY_COLUMNS}
             FROM reservations r
             JOIN guests g ON g.guest_id = r.guest_id
             {CURRENT_EVENT_JOIN}
             WHERE re.status = ?1
             ORDER BY r.transaction_date ASC, r.rowid ASC"
        );
        self.db
            .call(move |conn| query_summaries(conn, &query, params![status]))
            .await
    }
}
