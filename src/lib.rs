// Motel reservation engine: room catalog, availability search, transactional
// booking workflow and the reservation status history behind it

pub mod availability;
pub mod booking;
pub mod catalog;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod events;
pub mod filter;
pub mod id_generator;
pub mod query;
pub mod search_cache;

#[cfg(test)]
mod test_support;

// Re-export key types for convenience
pub use availability::{AvailabilityEngine, AvailableRoomType};
pub use booking::{BookingDraft, BookingWorkflow, GuestInput};
pub use catalog::{Room, RoomCatalog, RoomType};
pub use config::{EngineConfig, OverlapPolicy, SearchCacheConfig};
pub use database::Database;
pub use engine::{BookingApi, BookingEngine, EngineStats, SearchRequest};
pub use error::{BookingError, ConfigError};
pub use events::{ReservationEvent, ReservationEventLog};
pub use filter::{FilterSet, FilterStatement, FilterStatementBuilder};
pub use id_generator::{IdGenerator, RandomIdGenerator};
pub use query::{ReservationDetail, ReservationQueryService, ReservationSummary};
pub use search_cache::{SearchCache, SearchCacheStatsReport};
