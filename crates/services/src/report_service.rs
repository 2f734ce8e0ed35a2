use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use indexmap::IndexMap;
use tracing::{debug, error, info};

use progress_core::model::{CollectionDetails, CollectionId, Entity, EntityId, Group};
use progress_core::{EntityFailure, EntityRows, ReportSnapshot, SortOrder, flatten_entity};
use storage::{CacheEntry, FailureRecord, ReportRepository};

use crate::Clock;
use crate::config::ReportConfig;
use crate::error::{EntityFetchError, FetchError, MalformedResponseError, ReportError};
use crate::fan_out::fan_out;
use crate::lms::wire::{CourseDto, EnrollmentDto, ModuleDto};
use crate::lms::{LmsTransport, collect_all};

type SharedRun = Shared<BoxFuture<'static, Result<Arc<ReportSnapshot>, ReportError>>>;

/// Where a collection stands in its report lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    Uncached,
    Fetching,
    Ready,
    Failed,
}

/// Named outputs handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportView {
    Summary,
    Detail,
    Csv,
}

impl ReportView {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReportView::Summary => "summary",
            ReportView::Detail => "detail",
            ReportView::Csv => "csv",
        }
    }
}

impl fmt::Display for ReportView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportView {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(ReportView::Summary),
            "detail" => Ok(ReportView::Detail),
            "csv" => Ok(ReportView::Csv),
            other => Err(format!("unknown report view: {other}")),
        }
    }
}

/// A rendered view, ready to be written out or served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportPayload {
    Json(String),
    Csv(String),
}

impl ReportPayload {
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            ReportPayload::Json(_) => "application/json",
            ReportPayload::Csv(_) => "text/csv; charset=utf-8",
        }
    }

    #[must_use]
    pub fn body(&self) -> &str {
        match self {
            ReportPayload::Json(body) | ReportPayload::Csv(body) => body,
        }
    }

    #[must_use]
    pub fn into_body(self) -> String {
        match self {
            ReportPayload::Json(body) | ReportPayload::Csv(body) => body,
        }
    }
}

/// Builds per-collection progress reports and caches them.
///
/// Concurrent requests for the same collection share one run. A finished
/// snapshot stays cached until [`ReportService::invalidate`] is called; a
/// failed run never replaces it.
#[derive(Clone)]
pub struct ReportService {
    clock: Clock,
    transport: Arc<dyn LmsTransport>,
    reports: Arc<dyn ReportRepository>,
    config: Arc<ReportConfig>,
    in_flight: Arc<Mutex<HashMap<CollectionId, SharedRun>>>,
}

impl ReportService {
    #[must_use]
    pub fn new(
        transport: Arc<dyn LmsTransport>,
        reports: Arc<dyn ReportRepository>,
        config: ReportConfig,
        clock: Clock,
    ) -> Self {
        Self {
            clock,
            transport,
            reports,
            config: Arc::new(config),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    // ─── Driver ────────────────────────────────────────────────────────────────

    /// Return the cached report, joining or starting a run when there is none.
    ///
    /// A `Failed` collection keeps answering with its recorded failure until
    /// it is refreshed or invalidated.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Roster` when the roster cannot be fetched,
    /// `ReportError::Failed` for a collection whose last run failed, and
    /// `ReportError::Storage` if the cache fails.
    pub async fn report(
        &self,
        collection: &CollectionId,
    ) -> Result<Arc<ReportSnapshot>, ReportError> {
        if let Some(entry) = self.reports.get_entry(collection).await? {
            debug!(collection = %collection, "serving cached report");
            return settled_entry(entry);
        }
        self.join_or_start(collection, false)?.await
    }

    /// Rebuild the report even when one is cached.
    ///
    /// Joins a run that is already in flight instead of starting a second one.
    ///
    /// # Errors
    ///
    /// Same as [`ReportService::report`]. On error a previously cached report
    /// remains readable.
    pub async fn refresh(
        &self,
        collection: &CollectionId,
    ) -> Result<Arc<ReportSnapshot>, ReportError> {
        self.join_or_start(collection, true)?.await
    }

    /// Drop whatever is cached for a collection. Returns whether anything was.
    ///
    /// A run already in flight is not cancelled and still stores its result.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Storage` if the cache fails.
    pub async fn invalidate(&self, collection: &CollectionId) -> Result<bool, ReportError> {
        let removed = self.reports.invalidate(collection).await?;
        info!(collection = %collection, removed, "report cache invalidated");
        Ok(removed)
    }

    /// # Errors
    ///
    /// Returns `ReportError::Storage` if the cache fails.
    pub async fn state(&self, collection: &CollectionId) -> Result<CollectionState, ReportError> {
        if self.is_in_flight(collection)? {
            return Ok(CollectionState::Fetching);
        }
        let state = match self.reports.get_entry(collection).await? {
            None => CollectionState::Uncached,
            Some(CacheEntry::Ready(_)) => CollectionState::Ready,
            Some(CacheEntry::Failed(_)) => CollectionState::Failed,
        };
        Ok(state)
    }

    /// Cached snapshot without triggering any fetch.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Storage` if the cache fails.
    pub async fn cached(
        &self,
        collection: &CollectionId,
    ) -> Result<Option<Arc<ReportSnapshot>>, ReportError> {
        match self.reports.get_entry(collection).await? {
            Some(CacheEntry::Ready(snapshot)) => Ok(Some(snapshot)),
            _ => Ok(None),
        }
    }

    /// Reason recorded by the last failed run, if the collection is `Failed`.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Storage` if the cache fails.
    pub async fn last_failure(
        &self,
        collection: &CollectionId,
    ) -> Result<Option<FailureRecord>, ReportError> {
        match self.reports.get_entry(collection).await? {
            Some(CacheEntry::Failed(record)) => Ok(Some(record)),
            _ => Ok(None),
        }
    }

    /// Render one view of the cached report. `None` until the collection is ready.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Serialize` or `ReportError::Export` if rendering
    /// fails, and `ReportError::Storage` if the cache fails.
    pub async fn view(
        &self,
        collection: &CollectionId,
        view: ReportView,
        order: SortOrder,
    ) -> Result<Option<ReportPayload>, ReportError> {
        let Some(snapshot) = self.cached(collection).await? else {
            return Ok(None);
        };
        let payload = match view {
            ReportView::Summary => {
                ReportPayload::Json(serde_json::to_string_pretty(snapshot.summary())?)
            }
            ReportView::Detail => {
                ReportPayload::Json(serde_json::to_string_pretty(snapshot.detail())?)
            }
            ReportView::Csv => ReportPayload::Csv(snapshot.csv(order)?),
        };
        Ok(Some(payload))
    }

    fn is_in_flight(&self, collection: &CollectionId) -> Result<bool, ReportError> {
        let guard = self
            .in_flight
            .lock()
            .map_err(|e| ReportError::Poisoned(e.to_string()))?;
        Ok(guard.contains_key(collection))
    }

    /// Join the collection's in-flight run or spawn a new one.
    ///
    /// The run is a detached task, so it settles and fills the cache even when
    /// every caller awaiting it has gone away.
    fn join_or_start(
        &self,
        collection: &CollectionId,
        force: bool,
    ) -> Result<SharedRun, ReportError> {
        let mut guard = self
            .in_flight
            .lock()
            .map_err(|e| ReportError::Poisoned(e.to_string()))?;
        if let Some(run) = guard.get(collection) {
            debug!(collection = %collection, "joining in-flight report run");
            return Ok(run.clone());
        }

        let task = tokio::spawn(self.clone().run(collection.clone(), force));
        let in_flight = Arc::clone(&self.in_flight);
        let key = collection.clone();
        let run = task
            .map(move |joined| match joined {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(collection = %key, error = %err, "report task did not finish");
                    if let Ok(mut guard) = in_flight.lock() {
                        guard.remove(&key);
                    }
                    Err(ReportError::Aborted(err.to_string()))
                }
            })
            .boxed()
            .shared();
        guard.insert(collection.clone(), run.clone());
        Ok(run)
    }

    async fn run(
        self,
        collection: CollectionId,
        force: bool,
    ) -> Result<Arc<ReportSnapshot>, ReportError> {
        let outcome = self.settle(&collection, force).await;
        if let Ok(mut guard) = self.in_flight.lock() {
            guard.remove(&collection);
        }
        outcome
    }

    async fn settle(
        &self,
        collection: &CollectionId,
        force: bool,
    ) -> Result<Arc<ReportSnapshot>, ReportError> {
        // A caller may have missed a run that finished between its cache
        // read and its registration.
        if !force && let Some(entry) = self.reports.get_entry(collection).await? {
            return settled_entry(entry);
        }

        match self.aggregate(collection).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.reports.store_ready(Arc::clone(&snapshot)).await?;
                Ok(snapshot)
            }
            Err(err) => {
                error!(collection = %collection, error = %err, "report run failed");
                let record = FailureRecord {
                    reason: err.to_string(),
                    failed_at: self.clock.now(),
                };
                self.reports.store_failure(collection, record).await?;
                Err(err)
            }
        }
    }

    async fn aggregate(&self, collection: &CollectionId) -> Result<ReportSnapshot, ReportError> {
        let started = Instant::now();

        let entities = self
            .list_entities(collection)
            .await
            .map_err(|e| ReportError::Roster(Arc::new(e)))?;
        info!(
            collection = %collection,
            entities = entities.len(),
            elapsed_ms = elapsed_ms(started),
            "roster fetched"
        );

        let phase = Instant::now();
        let outcome = fan_out(
            entities.iter().cloned(),
            self.config.concurrency,
            |entity| async move {
                self.fetch_groups(collection, entity.id())
                    .await
                    .map_err(|source| EntityFetchError {
                        entity_id: entity.id().clone(),
                        display_name: entity.display_name().to_owned(),
                        source,
                    })
            },
        )
        .await;
        info!(
            collection = %collection,
            failed = outcome.failures.len(),
            concurrency = self.config.concurrency.get(),
            elapsed_ms = elapsed_ms(phase),
            "groups fetched"
        );

        let phase = Instant::now();
        let mut rows = EntityRows::default();
        for (entity, groups) in entities.iter().zip(&outcome.results) {
            rows.append(flatten_entity(entity, groups, &self.config.exclusion));
        }
        let failures = outcome
            .failures
            .into_iter()
            .map(|err| EntityFailure {
                entity_id: err.entity_id,
                display_name: err.display_name,
                reason: err.source.to_string(),
            })
            .collect();
        let snapshot = ReportSnapshot::assemble(
            collection.clone(),
            self.clock.now(),
            entities.len(),
            rows,
            failures,
            &self.config.labeler,
        );
        info!(
            collection = %collection,
            summary_rows = snapshot.summary().len(),
            detail_rows = snapshot.detail().len(),
            columns = snapshot.pivot().column_count(),
            duplicates_ignored = snapshot.pivot().duplicates_ignored(),
            elapsed_ms = elapsed_ms(phase),
            total_ms = elapsed_ms(started),
            "report assembled"
        );
        Ok(snapshot)
    }

    // ─── Diagnostics ───────────────────────────────────────────────────────────

    /// The collection's roster, one entry per entity in first-seen order.
    ///
    /// The platform lists one enrollment per section, so a student enrolled
    /// in several sections shows up more than once; the first listing wins.
    ///
    /// # Errors
    ///
    /// Returns the first `FetchError` of any roster page.
    pub async fn list_entities(
        &self,
        collection: &CollectionId,
    ) -> Result<Vec<Entity>, FetchError> {
        let request = self.config.layout.roster_request(collection);
        let enrollments: Vec<EnrollmentDto> = collect_all(self.transport.as_ref(), request).await?;

        let listed = enrollments.len();
        let mut roster: IndexMap<EntityId, Entity> = IndexMap::with_capacity(listed);
        for entity in enrollments.into_iter().map(Entity::from) {
            roster.entry(entity.id().clone()).or_insert(entity);
        }
        if roster.len() < listed {
            debug!(
                collection = %collection,
                listed,
                unique = roster.len(),
                "repeated enrollments folded"
            );
        }
        Ok(roster.into_values().collect())
    }

    /// One entity's groups, unfiltered.
    ///
    /// # Errors
    ///
    /// Returns the first `FetchError` of any groups page.
    pub async fn fetch_groups(
        &self,
        collection: &CollectionId,
        entity: &EntityId,
    ) -> Result<Vec<Group>, FetchError> {
        let request = self.config.layout.groups_request(collection, entity);
        let modules: Vec<ModuleDto> = collect_all(self.transport.as_ref(), request).await?;
        Ok(modules.into_iter().map(Group::from).collect())
    }

    /// # Errors
    ///
    /// Returns `FetchError` if the request fails or the body is not a course.
    pub async fn collection_details(
        &self,
        collection: &CollectionId,
    ) -> Result<CollectionDetails, FetchError> {
        let page = self
            .transport
            .get(&self.config.layout.details_request(collection))
            .await?;
        let course: CourseDto =
            serde_json::from_slice(&page.body).map_err(MalformedResponseError::Body)?;
        Ok(CollectionDetails::from(course))
    }
}

fn settled_entry(entry: CacheEntry) -> Result<Arc<ReportSnapshot>, ReportError> {
    match entry {
        CacheEntry::Ready(snapshot) => Ok(snapshot),
        CacheEntry::Failed(record) => Err(ReportError::Failed {
            reason: record.reason,
            failed_at: record.failed_at,
        }),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
