// Booking engine facade
// Wires catalog, availability, booking workflow, event log and read models over one
// database handle, and keeps a search cache plus request statistics in front of them.
// Every write that can change availability goes through the engine so the cache is
// cleared with it. The cache only sees writes made by this engine: leave it disabled
// when other processes or engines book against the same database file.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use tracing::debug;

use crate::availability::{AvailabilityEngine, AvailableRoomType};
use crate::booking::{BookingDraft, BookingWorkflow, GuestInput};
use crate::catalog::{Room, RoomCatalog, RoomType};
use crate::config::EngineConfig;
use crate::database::Database;
use crate::error::BookingError;
use crate::events::{ReservationEvent, ReservationEventLog};
use crate::filter::FilterSet;
use crate::id_generator::{IdGenerator, RandomIdGenerator};
use crate::query::{ReservationDetail, ReservationQueryService, ReservationSummary};
use crate::search_cache::{create_cache_key, SearchCache, SearchCacheStatsReport};

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub arrival: NaiveDate,
    pub departure: NaiveDate,
    pub party_size: u32,
    pub filters: FilterSet,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub searches: usize,
    pub cache_hits: usize,
    pub bookings_created: usize,
    pub bookings_failed: usize,
    pub no_room_failures: usize,
    pub status_changes: usize,
}

#[async_trait]
pub trait BookingApi: Send + Sync + 'static {
    // Room types free for the stay, with the cost of the whole stay
    async fn search(&self, request: SearchRequest) -> Result<Vec<AvailableRoomType>, BookingError>;

    // Persists the draft; on Ok the caller can discard its draft
    async fn book(
        &self,
        draft: &BookingDraft,
        guest: &GuestInput,
        actor_email: &str,
    ) -> Result<String, BookingError>;

    async fn booking(&self, booking_id: &str) -> Result<Option<ReservationDetail>, BookingError>;

    async fn bookings(&self) -> Result<Vec<ReservationSummary>, BookingError>;

    async fn bookings_with_status(&self, status: &str) -> Result<Vec<ReservationSummary>, BookingError>;

    async fn history(&self, booking_id: &str) -> Result<Vec<ReservationEvent>, BookingError>;

    async fn change_status(
        &self,
        booking_id: &str,
        status: &str,
        actor_email: &str,
    ) -> Result<(), BookingError>;

    fn stats(&self) -> EngineStats;
}

pub struct BookingEngine {
    catalog: RoomCatalog,
    availability: AvailabilityEngine,
    workflow: BookingWorkflow,
    events: ReservationEventLog,
    queries: ReservationQueryService,
    cache: Option<SearchCache>,
    stats: Mutex<EngineStats>,
}

impl BookingEngine {
    pub fn new(
        db: Database,
        config: &EngineConfig,
        generator: Arc<dyn IdGenerator>,
    ) -> Result<Self, BookingError> {
        let workflow = BookingWorkflow::new(db.clone(), config, generator)?;
        let cache = config
            .search_cache
            .enabled
            .then(|| SearchCache::new(config.search_cache.clone()));

        Ok(Self {
            catalog: RoomCatalog::new(db.clone()),
            availability: AvailabilityEngine::new(db.clone(), config.overlap_policy),
            workflow,
            events: ReservationEventLog::new(db.clone()),
            queries: ReservationQueryService::new(db),
            cache,
            stats: Mutex::new(EngineStats::default()),
        })
    }

    pub async fn open(path: impl AsRef<Path>, config: &EngineConfig) -> Result<Self, BookingError> {
        config.validate()?;
        let db = Database::open(path, config).await?;
        Self::new(db, config, Arc::new(RandomIdGenerator))
    }

    pub async fn open_in_memory(config: &EngineConfig) -> Result<Self, BookingError> {
        config.validate()?;
        let db = Database::open_in_memory(config).await?;
        Self::new(db, config, Arc::new(RandomIdGenerator))
    }

    fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            let removed = cache.invalidate_all();
            debug!(removed, "search cache cleared");
        }
    }

    pub async fn seed_catalog(
        &self,
        room_types: Vec<RoomType>,
        rooms: Vec<Room>,
    ) -> Result<(), BookingError> {
        let result = self.catalog.seed(room_types, rooms).await;
        self.invalidate_cache();
        result
    }

    pub async fn add_room_type(&self, room_type: RoomType) -> Result<(), BookingError> {
        let result = self.catalog.add_room_type(room_type).await;
        self.invalidate_cache();
        result
    }

    pub async fn add_room(&self, room: Room) -> Result<(), BookingError> {
        let result = self.catalog.add_room(room).await;
        self.invalidate_cache();
        result
    }

    pub async fn room_types(&self) -> Result<Vec<RoomType>, BookingError> {
        self.catalog.room_types().await
    }

    pub async fn rooms(&self) -> Result<Vec<Room>, BookingError> {
        self.catalog.rooms().await
    }

    // Services and events never change which rooms are free
    pub async fn add_services(
        &self,
        booking_id: &str,
        services: &BTreeSet<String>,
    ) -> Result<(), BookingError> {
        self.workflow.add_services(booking_id, services).await
    }

    pub async fn add_event(
        &self,
        booking_id: &str,
        status: &str,
        detail: &str,
        actor_email: &str,
    ) -> Result<(), BookingError> {
        self.workflow
            .add_event(booking_id, status, detail, actor_email)
            .await
    }

    pub fn availability(&self) -> &AvailabilityEngine {
        &self.availability
    }

    pub fn events(&self) -> &ReservationEventLog {
        &self.events
    }

    pub fn queries(&self) -> &ReservationQueryService {
        &self.queries
    }

    pub fn cache_stats(&self) -> Option<SearchCacheStatsReport> {
        self.cache.as_ref().map(SearchCache::stats)
    }
}

#[async_trait]
impl BookingApi for BookingEngine {
    async fn search(&self, request: SearchRequest) -> Result<Vec<AvailableRoomType>, BookingError> {
        self.stats.lock().searches += 1;

        let key = create_cache_key(
            request.arrival,
            request.departure,
            request.party_size,
            &request.filters,
        );
        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            self.stats.lock().cache_hits += 1;
            debug!(key = %key, "availability served from cache");
            return Ok(cached);
        }

        let generation = self.cache.as_ref().map(SearchCache::generation);
        let results = self
            .availability
            .find_available_room_types(
                request.arrival,
                request.departure,
                request.party_size,
                &request.filters,
            )
            .await?;

        if let (Some(cache), Some(generation)) = (&self.cache, generation) {
            cache.store_if_current(key, results.clone(), generation);
        }
        Ok(results)
    }

    async fn book(
        &self,
        draft: &BookingDraft,
        guest: &GuestInput,
        actor_email: &str,
    ) -> Result<String, BookingError> {
        let result = self.workflow.create_booking(draft, guest, actor_email).await;

        let mut stats = self.stats.lock();
        match &result {
            Ok(_) => {
                stats.bookings_created += 1;
                self.invalidate_cache();
            }
            Err(BookingError::NoRoomAvailable { .. }) => {
                stats.bookings_failed += 1;
                stats.no_room_failures += 1;
            }
            Err(_) => stats.bookings_failed += 1,
        }
        result
    }

    async fn booking(&self, booking_id: &str) -> Result<Option<ReservationDetail>, BookingError> {
        self.queries.fetch_single(booking_id).await
    }

    async fn bookings(&self) -> Result<Vec<ReservationSummary>, BookingError> {
        self.queries.fetch_all().await
    }

    async fn bookings_with_status(&self, status: &str) -> Result<Vec<ReservationSummary>, BookingError> {
        self.queries.filter_by_status(status).await
    }

    async fn history(&self, booking_id: &str) -> Result<Vec<ReservationEvent>, BookingError> {
        self.events.fetch_events(booking_id).await
    }

    async fn change_status(
        &self,
        booking_id: &str,
        status: &str,
        actor_email: &str,
    ) -> Result<(), BookingError> {
        self.workflow
            .change_status(booking_id, status, actor_email)
            .await?;
        self.stats.lock().status_changes += 1;
        Ok(())
    }

    fn stats(&self) -> EngineStats {
        self.stats.lock().clone()
    }
}
