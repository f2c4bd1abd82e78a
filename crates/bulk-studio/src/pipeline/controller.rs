use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, info_span, warn, Instrument};

use crate::broadcast::{BatchEventKind, BatchProgressBroadcaster};
use crate::config::{validate_config, BatchConfig};
use crate::delivery::{self, DeliveryMode, StudioArchive};
use crate::error::{DeliveryError, IngestError, RunError, StudioError};
use crate::ingest::{self, IngestSource, SourceKind};
use crate::item::{Item, ItemStatus};
use crate::transform::{self, Transform};
use crate::worker::WorkerPool;

use super::{AppStatus, BatchSummary, CredentialSelector, Notice, NoticeKind, RunSummary};

/// Shown on an item whose failure carried no message.
const FALLBACK_ERROR: &str = "Operation failed";

struct RunState {
    status: AppStatus,
    /// Replaced wholesale on every change, never mutated in place.
    items: Arc<Vec<Item>>,
    /// Bumped on reset and on every new ingestion.
    generation: u64,
    notice: Option<Notice>,
    source_kind: Option<SourceKind>,
}

enum ItemOutcome {
    Completed,
    Errored,
    Discarded,
}

/// Owns one batch of items and drives runs over it.
///
/// All methods take `&self`; share the controller behind an `Arc` so the
/// host can read state or call [`reset`](Self::reset) while a run is in
/// flight.
pub struct BatchController {
    state: Mutex<RunState>,
    has_credential: AtomicBool,
    broadcaster: BatchProgressBroadcaster,
}

impl BatchController {
    pub fn new() -> Self {
        Self::with_broadcaster(BatchProgressBroadcaster::default())
    }

    pub fn with_broadcaster(broadcaster: BatchProgressBroadcaster) -> Self {
        Self {
            state: Mutex::new(RunState {
                status: AppStatus::Idle,
                items: Arc::new(Vec::new()),
                generation: 0,
                notice: None,
                source_kind: None,
            }),
            has_credential: AtomicBool::new(false),
            broadcaster,
        }
    }

    pub fn broadcaster(&self) -> &BatchProgressBroadcaster {
        &self.broadcaster
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- Pull-style state --

    pub fn status(&self) -> AppStatus {
        self.lock().status
    }

    /// Immutable snapshot of the current batch.
    pub fn items(&self) -> Arc<Vec<Item>> {
        Arc::clone(&self.lock().items)
    }

    pub fn notice(&self) -> Option<Notice> {
        self.lock().notice.clone()
    }

    pub fn dismiss_notice(&self) {
        self.lock().notice = None;
    }

    pub fn has_credential(&self) -> bool {
        self.has_credential.load(Ordering::SeqCst)
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        match self.lock().source_kind {
            Some(SourceKind::Live) => DeliveryMode::DirectWrite,
            _ => DeliveryMode::ZipReconstruction,
        }
    }

    pub fn summary(&self) -> BatchSummary {
        let items = self.items();
        let mut summary = BatchSummary {
            total: items.len(),
            ..Default::default()
        };
        for item in items.iter() {
            match item.status() {
                ItemStatus::Pending => summary.pending += 1,
                ItemStatus::Processing => summary.processing += 1,
                ItemStatus::Completed => summary.completed += 1,
                ItemStatus::Error => summary.errored += 1,
            }
        }
        if summary.total > 0 {
            let percent = (summary.completed as f64 / summary.total as f64 * 100.0).round();
            summary.progress_percent = percent as u8;
        }
        summary
    }

    // -- Credentials --

    /// Re-reads the host's key selection, e.g. after the model changed.
    pub async fn refresh_credential(&self, selector: &dyn CredentialSelector) -> bool {
        let selected = selector.has_selected_key().await;
        self.has_credential.store(selected, Ordering::SeqCst);
        selected
    }

    async fn ensure_credential(
        &self,
        config: &BatchConfig,
        selector: Option<&dyn CredentialSelector>,
    ) -> Result<(), RunError> {
        if !config.requires_credential_selection() || self.has_credential() {
            return Ok(());
        }

        let selector = selector.ok_or_else(|| {
            RunError::CredentialSelection(format!(
                "model '{}' requires an interactive key selection",
                config.model
            ))
        })?;

        if !selector.has_selected_key().await {
            info!(model = %config.model, "Requesting interactive key selection");
            selector
                .select_key()
                .await
                .map_err(RunError::CredentialSelection)?;
        }
        self.has_credential.store(true, Ordering::SeqCst);
        Ok(())
    }

    // -- Operations --

    /// Replaces the batch with the images found in `source`.
    ///
    /// Returns the installed batch. An empty flat selection is ignored.
    pub async fn ingest(&self, source: IngestSource) -> Result<Arc<Vec<Item>>, StudioError> {
        if matches!(&source, IngestSource::FileList(files) if files.is_empty()) {
            return Ok(self.items());
        }

        let generation = {
            let mut state = self.lock();
            if state.status == AppStatus::Processing {
                return Err(RunError::Busy.into());
            }
            state.generation += 1;
            state.status = AppStatus::Scanning;
            state.notice = None;
            state.generation
        };
        self.broadcaster.status_changed(AppStatus::Scanning);

        let is_live = matches!(source, IngestSource::Live(_));
        let result = ingest::ingest(source).await;

        let mut state = self.lock();
        if state.generation != generation {
            debug!("Discarding ingestion superseded by reset");
            return Ok(Arc::clone(&state.items));
        }

        let ingestion = match result {
            Ok(ingestion) => ingestion,
            Err(e) => {
                let notice = ingestion_failure_notice(&e, is_live);
                state.status = AppStatus::Idle;
                state.items = Arc::new(Vec::new());
                state.source_kind = None;
                state.notice = Some(notice.clone());
                drop(state);
                self.broadcaster.status_changed(AppStatus::Idle);
                self.broadcaster.send(BatchEventKind::Notice { notice });
                return Err(e.into());
            }
        };

        let count = ingestion.items.len();
        let status = if count > 0 {
            AppStatus::Ready
        } else {
            AppStatus::Idle
        };
        let notice = Notice::for_ingestion(ingestion.kind, count);

        state.items = Arc::new(ingestion.items);
        state.status = status;
        state.source_kind = Some(ingestion.kind);
        state.notice = Some(notice.clone());
        let items = Arc::clone(&state.items);
        drop(state);

        info!(count, kind = ?ingestion.kind, "Batch ingested");
        self.broadcaster.status_changed(status);
        self.broadcaster.send(BatchEventKind::Notice { notice });
        Ok(items)
    }

    /// Runs the configured transform over every non-completed item.
    pub async fn start_run(
        &self,
        config: &BatchConfig,
        selector: Option<&dyn CredentialSelector>,
    ) -> Result<RunSummary, StudioError> {
        validate_config(config)?;
        self.ensure_credential(config, selector).await?;
        let transform = transform::for_config(config)?;
        self.run_with(config, transform).await
    }

    /// Like [`start_run`](Self::start_run), with a caller-supplied transform.
    pub async fn start_run_with_transform(
        &self,
        config: &BatchConfig,
        transform: Arc<dyn Transform>,
        selector: Option<&dyn CredentialSelector>,
    ) -> Result<RunSummary, StudioError> {
        self.ensure_credential(config, selector).await?;
        self.run_with(config, transform).await
    }

    async fn run_with(
        &self,
        config: &BatchConfig,
        transform: Arc<dyn Transform>,
    ) -> Result<RunSummary, StudioError> {
        let (generation, queue) = {
            let mut state = self.lock();
            if !state.status.can_start_run() {
                return Err(RunError::NotStartable(state.status).into());
            }
            state.status = AppStatus::Processing;
            let queue: Vec<String> = state
                .items
                .iter()
                .filter(|item| item.status() != ItemStatus::Completed)
                .map(|item| item.id.clone())
                .collect();
            (state.generation, queue)
        };
        self.broadcaster.status_changed(AppStatus::Processing);

        let started = tokio::time::Instant::now();
        let queued = queue.len();
        let pool = WorkerPool::new(queue, config.worker_count(queued));
        let span = info_span!(
            "run",
            generation,
            mode = %config.mode,
            queued,
            workers = pool.worker_count()
        );

        let completed = AtomicUsize::new(0);
        let errored = AtomicUsize::new(0);
        let discarded = AtomicUsize::new(0);

        async {
            info!("Run started");
            pool.run(|_, item_id| {
                let transform = Arc::clone(&transform);
                let (completed, errored, discarded) = (&completed, &errored, &discarded);
                async move {
                    let counter = match self
                        .process_item(generation, &item_id, config, transform.as_ref())
                        .await
                    {
                        ItemOutcome::Completed => completed,
                        ItemOutcome::Errored => errored,
                        ItemOutcome::Discarded => discarded,
                    };
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await;
        }
        .instrument(span.clone())
        .await;

        let completed = completed.into_inner();
        let errored = errored.into_inner();
        let summary = RunSummary {
            processed: completed + errored,
            completed,
            errored,
            discarded: discarded.into_inner(),
            duration: started.elapsed(),
        };

        let finished = {
            let mut state = self.lock();
            if state.generation == generation {
                state.status = AppStatus::Done;
                true
            } else {
                false
            }
        };

        let _entered = span.enter();
        if finished {
            info!(
                completed = summary.completed,
                errored = summary.errored,
                duration_ms = summary.duration.as_millis() as u64,
                "Run finished"
            );
            self.broadcaster.status_changed(AppStatus::Done);
        } else {
            debug!(discarded = summary.discarded, "Run superseded by reset");
        }
        self.broadcaster.send(BatchEventKind::RunFinished { summary });
        Ok(summary)
    }

    async fn process_item(
        &self,
        generation: u64,
        item_id: &str,
        config: &BatchConfig,
        transform: &dyn Transform,
    ) -> ItemOutcome {
        let Some(item) = self.update_item(generation, item_id, Item::claimed) else {
            debug!(item_id, "Skipping item no longer in this batch");
            return ItemOutcome::Discarded;
        };

        let span = info_span!("item", item_id = %item.id, filename = %item.source.name);
        async {
            match transform.apply(&item.source, config).await {
                Ok(result) => {
                    // A reset landing while the write is in flight still
                    // leaves the file on disk; only the state update is dropped.
                    if !self.is_current(generation) {
                        debug!("Discarding result of superseded run");
                        return ItemOutcome::Discarded;
                    }
                    if let Err(e) = delivery::deliver(&item, &result).await {
                        warn!("Write-back failed, result stays available for the archive: {}", e);
                    }
                    match self.update_item(generation, item_id, |i| i.completed(result)) {
                        Some(_) => ItemOutcome::Completed,
                        None => ItemOutcome::Discarded,
                    }
                }
                Err(e) => {
                    if e.invalidates_credential() {
                        warn!("Credential rejected, key selection required before next run");
                        self.has_credential.store(false, Ordering::SeqCst);
                    }
                    let message = match e.to_string() {
                        m if m.is_empty() => FALLBACK_ERROR.to_string(),
                        m => m,
                    };
                    warn!(error = %message, "Item failed");
                    match self.update_item(generation, item_id, |i| i.failed(message)) {
                        Some(_) => ItemOutcome::Errored,
                        None => ItemOutcome::Discarded,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Rebuilds the collection with `item_id` replaced by `transition(item)`.
    ///
    /// Returns `None` without touching state when the generation moved on,
    /// the item is gone, or the transition is not allowed.
    fn update_item<F>(&self, generation: u64, item_id: &str, transition: F) -> Option<Item>
    where
        F: FnOnce(&Item) -> Option<Item>,
    {
        let updated = {
            let mut state = self.lock();
            if state.generation != generation {
                return None;
            }
            let current = state.items.iter().find(|i| i.id == item_id)?;
            let updated = transition(current)?;
            let items: Vec<Item> = state
                .items
                .iter()
                .map(|i| {
                    if i.id == item_id {
                        updated.clone()
                    } else {
                        i.clone()
                    }
                })
                .collect();
            state.items = Arc::new(items);
            updated
        };

        self.broadcaster.item_updated(
            &updated.id,
            &updated.source.name,
            updated.status(),
            updated.error(),
        );
        Some(updated)
    }

    /// Puts every item, including completed ones, back into the queue.
    pub fn requeue_all(&self) -> Result<(), RunError> {
        let mut state = self.lock();
        if !state.status.can_start_run() {
            return Err(RunError::NotStartable(state.status));
        }
        state.items = Arc::new(state.items.iter().map(Item::requeued).collect());
        state.status = AppStatus::Ready;
        drop(state);

        self.broadcaster.status_changed(AppStatus::Ready);
        Ok(())
    }

    /// Packs every completed result into one archive.
    pub fn assemble_archive(&self) -> Result<Option<StudioArchive>, DeliveryError> {
        delivery::assemble_archive(&self.items())
    }

    /// Drops the batch and returns to `idle`.
    ///
    /// In-flight work of a running batch is not aborted; it notices the new
    /// generation and discards its results.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.items = Arc::new(Vec::new());
        state.status = AppStatus::Idle;
        state.notice = None;
        state.source_kind = None;
        let generation = state.generation;
        drop(state);

        info!(generation, "Batch reset");
        self.broadcaster.status_changed(AppStatus::Idle);
    }
}

impl Default for BatchController {
    fn default() -> Self {
        Self::new()
    }
}

fn ingestion_failure_notice(error: &IngestError, is_live: bool) -> Notice {
    match error {
        IngestError::RootNotFound(_)
        | IngestError::RootNotDirectory(_)
        | IngestError::Walk { .. }
            if is_live =>
        {
            Notice::new(
                NoticeKind::Security,
                format!("Folder access failed: {}", error),
            )
        }
        _ => Notice::error(error.to_string()),
    }
}
