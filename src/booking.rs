// Booking workflow: guest, room allocation, reservation, services and the initial
// "new" event are written in one immediate transaction. Any failing step rolls back
// every row written before it.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rusqlite::{params, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::availability::{allocate_room, nights_between, validate_stay};
use crate::config::{EngineConfig, OverlapPolicy};
use crate::database::Database;
use crate::error::BookingError;
use crate::events::{append_event, new_booking_detail, STATUS_NEW};
use crate::id_generator::IdGenerator;

// Request-scoped booking draft assembled by the caller from the guest's selection
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BookingDraft {
    pub room_type: String,
    pub arrival: NaiveDate,
    pub departure: NaiveDate,
    pub party_size: u32,
    pub services: BTreeSet<String>,
    pub total_price: f64,
}

impl BookingDraft {
    pub fn nights(&self) -> i64 {
        nights_between(self.arrival, self.departure)
    }

    pub fn validate(&self) -> Result<(), BookingError> {
        validate_stay(self.arrival, self.departure, self.party_size)?;
        if self.room_type.trim().is_empty() {
            return Err(BookingError::ValidationError(
                "room type must be selected".to_string(),
            ));
        }
        if !self.total_price.is_finite() || self.total_price < 0.0 {
            return Err(BookingError::ValidationError(format!(
                "invalid total price {}",
                self.total_price
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GuestInput {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub dob: NaiveDate,
    pub phone: String,
}

impl GuestInput {
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(BookingError::ValidationError(
                "guest first and last name are required".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_actor(actor_email: &str) -> Result<(), BookingError> {
    if actor_email.trim().is_empty() {
        return Err(BookingError::ValidationError(
            "actor email is required".to_string(),
        ));
    }
    Ok(())
}

fn insert_guest(conn: &rusqlite::Connection, guest: &GuestInput) -> Result<i64, BookingError> {
    let affected = conn
        .execute(
            "INSERT INTO guests (first_name, last_name, address, city, dob, phone)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                guest.first_name,
                guest.last_name,
                guest.address,
                guest.city,
                guest.dob,
                guest.phone,
            ],
        )
        .map_err(|e| BookingError::GuestPersistError(e.to_string()))?;

    if affected == 0 {
        return Err(BookingError::GuestPersistError("no row inserted".to_string()));
    }
    Ok(conn.last_insert_rowid())
}

fn is_booking_id_collision(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, message) => {
            err.code == rusqlite::ErrorCode::ConstraintViolation
                && message
                    .as_deref()
                    .is_some_and(|m| m.contains("reservations.res_id"))
        }
        _ => false,
    }
}

struct ReservationRow<'a> {
    actor_email: &'a str,
    guest_id: i64,
    room_num: i64,
    draft: &'a BookingDraft,
}

struct IdPolicy {
    generator: Arc<dyn IdGenerator>,
    length: usize,
    max_attempts: u32,
}

// Inserts the reservation under a fresh id, regenerating on business id collisions
fn insert_reservation(
    conn: &rusqlite::Connection,
    ids: &IdPolicy,
    row: &ReservationRow<'_>,
) -> Result<String, BookingError> {
    for attempt in 1..=ids.max_attempts {
        let booking_id = ids.generator.generate(ids.length);
        let result = conn.execute(
            "INSERT INTO reservations
                 (res_id, user_email, guest_id, room_num, guests, arrival, departure, total_price, transaction_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                booking_id,
                row.actor_email,
                row.guest_id,
                row.room_num,
                row.draft.party_size,
                row.draft.arrival,
                row.draft.departure,
                row.draft.total_price,
                Utc::now(),
            ],
        );

        match result {
            Ok(0) => {
                return Err(BookingError::ReservationPersistError(
                    "no row inserted".to_string(),
                ))
            }
            Ok(_) => return Ok(booking_id),
            Err(e) if is_booking_id_collision(&e) => {
                warn!(attempt, booking_id = %booking_id, "booking id collision, regenerating");
            }
            Err(e) => return Err(BookingError::ReservationPersistError(e.to_string())),
        }
    }

    Err(BookingError::DuplicateBookingId {
        attempts: ids.max_attempts,
    })
}

fn insert_services(
    conn: &rusqlite::Connection,
    booking_id: &str,
    services: &BTreeSet<String>,
) -> Result<(), BookingError> {
    for service in services {
        let persist_error = |reason: String| BookingError::ServicePersistError {
            booking_id: booking_id.to_string(),
            service: service.clone(),
            reason,
        };

        let affected = conn
            .execute(
                "INSERT INTO reservation_services (res_id, service_name) VALUES (?1, ?2)",
                params![booking_id, service],
            )
            .map_err(|e| persist_error(e.to_string()))?;
        if affected == 0 {
            return Err(persist_error("no row inserted".to_string()));
        }
    }
    Ok(())
}

pub struct BookingWorkflow {
    db: Database,
    policy: OverlapPolicy,
    id_length: usize,
    max_id_attempts: u32,
    generator: Arc<dyn IdGenerator>,
}

impl BookingWorkflow {
    pub fn new(
        db: Database,
        config: &EngineConfig,
        generator: Arc<dyn IdGenerator>,
    ) -> Result<Self, BookingError> {
        config.validate()?;
        Ok(Self {
            db,
            policy: config.overlap_policy,
            id_length: config.booking_id_length,
            max_id_attempts: config.max_booking_id_attempts,
            generator,
        })
    }

    // Returns the booking id once every row is committed. On error nothing is
    // stored and the caller should keep its draft so the guest can retry.
    pub async fn create_booking(
        &self,
        draft: &BookingDraft,
        guest: &GuestInput,
        actor_email: &str,
    ) -> Result<String, BookingError> {
        draft.validate()?;
        guest.validate()?;
        validate_actor(actor_email)?;

        let policy = self.policy;
        let ids = IdPolicy {
            generator: Arc::clone(&self.generator),
            length: self.id_length,
            max_attempts: self.max_id_attempts,
        };
        let owned_draft = draft.clone();
        let owned_guest = guest.clone();
        let actor = actor_email.to_string();

        let result = self
            .db
            .call(move |conn| {
                // BEGIN IMMEDIATE takes the write lock before the room is chosen
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let guest_id = insert_guest(&tx, &owned_guest)?;
                let room_num = allocate_room(
                    &tx,
                    policy,
                    &owned_draft.room_type,
                    owned_draft.arrival,
                    owned_draft.departure,
                )?;
                let row = ReservationRow {
                    actor_email: &actor,
                    guest_id,
                    room_num,
                    draft: &owned_draft,
                };
                let booking_id = insert_reservation(&tx, &ids, &row)?;
                insert_services(&tx, &booking_id, &owned_draft.services)?;
                append_event(&tx, &booking_id, &actor, STATUS_NEW, &new_booking_detail(&actor))?;

                tx.commit()?;
                Ok((booking_id, room_num))
            })
            .await;

        match result {
            Ok((booking_id, room_num)) => {
                info!(
                    booking_id = %booking_id,
                    room_num,
                    room_type = %draft.room_type,
                    arrival = %draft.arrival,
                    departure = %draft.departure,
                    "booking created"
                );
                Ok(booking_id)
            }
            Err(e @ BookingError::NoRoomAvailable { .. }) => {
                warn!(room_type = %draft.room_type, error = %e, "booking rejected");
                Err(e)
            }
            Err(e) => {
                warn!(room_type = %draft.room_type, error = %e, "booking failed");
                Err(e)
            }
        }
    }

    // All services are attached or none are
    pub async fn add_services(
        &self,
        booking_id: &str,
        services: &BTreeSet<String>,
    ) -> Result<(), BookingError> {
        if services.is_empty() {
            return Ok(());
        }

        let booking_id = booking_id.to_string();
        let services = services.clone();
        self.db
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                insert_services(&tx, &booking_id, &services)?;
                tx.commit()?;
                Ok(())
            })
            .await
    }

    pub async fn add_event(
        &self,
        booking_id: &str,
        status: &str,
        detail: &str,
        actor_email: &str,
    ) -> Result<(), BookingError> {
        validate_actor(actor_email)?;

        let booking_id = booking_id.to_string();
        let status = status.to_string();
        let detail = detail.to_string();
        let actor = actor_email.to_string();
        self.db
            .call(move |conn| {
                append_event(conn, &booking_id, &actor, &status, &detail)?;
                Ok(())
            })
            .await
    }

    // Status transition recorded by an administrator
    pub async fn change_status(
        &self,
        booking_id: &str,
        status: &str,
        actor_email: &str,
    ) -> Result<(), BookingError> {
        self.add_event(booking_id, status, "", actor_email).await?;
        info!(booking_id, status, actor = actor_email, "reservation status changed");
        Ok(())
    }
}
