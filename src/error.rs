// Error types for availability search, booking and read paths

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("No {room_type} room available from {arrival} to {departure}")]
    NoRoomAvailable {
        room_type: String,
        arrival: NaiveDate,
        departure: NaiveDate,
    },

    #[error("Guest could not be persisted: {0}")]
    GuestPersistError(String),

    #[error("Reservation could not be persisted: {0}")]
    ReservationPersistError(String),

    #[error("Service {service} could not be attached to {booking_id}: {reason}")]
    ServicePersistError {
        booking_id: String,
        service: String,
        reason: String,
    },

    #[error("Status event could not be appended to {booking_id}: {reason}")]
    EventPersistError { booking_id: String, reason: String },

    #[error("Booking id collided on {attempts} consecutive attempts")]
    DuplicateBookingId { attempts: u32 },

    // The outcome of the in-flight write is unknown; callers must not blindly retry
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl BookingError {
    // True when the guest can fix the request (other dates, other room type)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BookingError::ValidationError(_) | BookingError::NoRoomAvailable { .. }
        )
    }
}

// Flattens errors coming back from the connection thread
pub(crate) fn map_call_err(e: tokio_rusqlite::Error<BookingError>) -> BookingError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => BookingError::StorageUnavailable(other.to_string()),
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    ParseError(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
