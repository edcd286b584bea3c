// Reservation status history
// Events are append-only. The current status of a reservation is its event with the
// latest created_at; equal timestamps fall back to the higher event_id.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use crate::database::Database;
use crate::error::BookingError;

pub const STATUS_NEW: &str = "new";

// Join condition selecting the current event `re` of reservation `r`
pub(crate) const CURRENT_EVENT_JOIN: &str = "JOIN reservation_events re ON re.event_id = (
    SELECT re2.event_id FROM reservation_events re2
    WHERE re2.res_id = r.res_id
    ORDER BY re2.created_at DESC, re2.event_id DESC
    LIMIT 1)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationEvent {
    pub event_id: i64,
    pub booking_id: String,
    pub actor_email: String,
    pub status: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

pub fn new_booking_detail(actor_email: &str) -> String {
    format!("New booking created by user {}", actor_email)
}

pub(crate) fn append_event(
    conn: &rusqlite::Connection,
    booking_id: &str,
    actor_email: &str,
    status: &str,
    detail: &str,
) -> Result<i64, BookingError> {
    let persist_error = |reason: String| BookingError::EventPersistError {
        booking_id: booking_id.to_string(),
        reason,
    };

    if status.trim().is_empty() {
        return Err(persist_error("status must not be empty".to_string()));
    }

    let affected = conn
        .execute(
            "INSERT INTO reservation_events (res_id, user_email, status, details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![booking_id, actor_email, status, detail, Utc::now()],
        )
        .map_err(|e| persist_error(e.to_string()))?;

    if affected == 0 {
        return Err(persist_error("no row inserted".to_string()));
    }
    Ok(conn.last_insert_rowid())
}

#[derive(Clone)]
pub struct ReservationEventLog {
    db: Database,
}

impl ReservationEventLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // Oldest first
    pub async fn fetch_events(&self, booking_id: &str) -> Result<Vec<ReservationEvent>, BookingError> {
        let booking_id = booking_id.to_string();
        self.db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT event_id, res_id, user_email, status, details, created_at
                     FROM reservation_events
                     WHERE res_id = ?1
                     ORDER BY created_at, event_id",
                )?;
                let events = stmt
                    .query_map(params![booking_id], |row| {
                        Ok(ReservationEvent {
                            event_id: row.get(0)?,
                            booking_id: row.get(1)?,
                            actor_email: row.get(2)?,
                            status: row.get(3)?,
                            detail: row.get(4)?,
                            created_at: row.get(5)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(events)
            })
            .await
    }

    pub async fn current_status(&self, booking_id: &str) -> Result<Option<String>, BookingError> {
        let booking_id = booking_id.to_string();
        self.db
            .call(move |conn| {
                let status = conn
                    .query_row(
                        &format!(
                            "SELECT re.status FROM reservations r {CURRENT_EVENT_JOIN} WHERE r.res_id = ?1"
                        ),
                        params![booking_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(status)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverlapPolicy;
    use crate::test_support::{date, insert_reservation, seeded_database};

    #[tokio::test]
    async fn test_history_and_current_status() {
        let db = seeded_database(OverlapPolicy::Endpoints).await;
        insert_reservation(&db, "RES0000001", 101, date(2024, 6, 1), date(2024, 6, 3)).await;

        db.call(|conn| {
            append_event(conn, "RES0000001", "admin@motel.test", "confirmed", "")?;
            append_event(conn, "RES0000001", "admin@motel.test", "checked-in", "")?;
            Ok(())
        })
        .await
        .unwrap();

        let log = ReservationEventLog::new(db);
        let history: Vec<String> = log
            .fetch_events("RES0000001")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.status)
            .collect();
        assert_eq!(history, vec!["new", "confirmed", "checked-in"]);

        assert_eq!(
            log.current_status("RES0000001").await.unwrap().as_deref(),
            Some("checked-in")
        );
        assert_eq!(log.current_status("UNKNOWN").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_explicit_timestamps_decide_current_status() {
        let db = seeded_database(OverlapPolicy::Endpoints).await;
        insert_reservation(&db, "RES0000001", 101, date(2024, 6, 1), date(2024, 6, 3)).await;

        // Later event_id but earlier timestamp must not win
        db.call(|conn| {
            conn.execute(
                "INSERT INTO reservation_events (res_id, user_email, status, details, created_at)
                 VALUES ('RES0000001', 'a@motel.test', 'checked-in', '', '2999-01-01 00:00:03+00:00'),
                        ('RES0000001', 'a@motel.test', 'confirmed', '', '2999-01-01 00:00:02+00:00')",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let log = ReservationEventLog::new(db);
        assert_eq!(
            log.current_status("RES0000001").await.unwrap().as_deref(),
            Some("checked-in")
        );
    }

    #[tokio::test]
    async fn test_event_for_unknown_reservation_fails() {
        let db = seeded_database(OverlapPolicy::Endpoints).await;

        let result = db
            .call(|conn| append_event(conn, "MISSING", "a@motel.test", "confirmed", "").map(|_| ()))
            .await;
        assert!(matches!(result, Err(BookingError::EventPersistError { .. })));
    }
}
