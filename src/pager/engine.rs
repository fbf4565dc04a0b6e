//! Pagination engine
//!
//! [`Pager`] owns the session configuration, issues one fetch at a time
//! against a [`DataSource`], folds completed pages into the accumulated
//! sequence and publishes every state change on `watch` channels.

use super::types::{Accumulator, FetchFailure, FetchHandle, FetchOutcome, Snapshot};
use crate::config::{QueryConfig, QueryOptions};
use crate::error::{Error, Result};
use crate::source::{DataSource, PageRequest};
use crate::types::{Cursor, MergeDirection, Page, ScrollEvent};
use futures::stream::{self, BoxStream};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// State of the current session
struct Session<T> {
    config: QueryConfig,
    loading: bool,
    done: bool,
    /// Latest non-empty page; the next cursor comes from here
    page: Snapshot<T>,
    accumulated: Accumulator<T>,
}

impl<T> Session<T> {
    fn new(config: QueryConfig) -> Self {
        let accumulated = Accumulator::new(config.merge_direction());
        Self {
            config,
            loading: false,
            done: false,
            page: Arc::new(Vec::new()),
            accumulated,
        }
    }

    /// Cursor at the merge-relevant end of the latest page
    fn next_cursor(&self) -> Option<Cursor> {
        let record = match self.config.merge_direction() {
            MergeDirection::Append => self.page.last(),
            MergeDirection::Prepend => self.page.first(),
        };
        record.map(|r| r.cursor.clone())
    }
}

struct Inner<T> {
    /// Incremented by every `init`; fetches carry the epoch they were issued in
    epoch: u64,
    session: Option<Session<T>>,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    accumulated_tx: watch::Sender<Snapshot<T>>,
    page_tx: watch::Sender<Snapshot<T>>,
    loading_tx: watch::Sender<bool>,
    done_tx: watch::Sender<bool>,
    error_tx: watch::Sender<Option<FetchFailure>>,
}

impl<T: Clone + Send + Sync + 'static> Shared<T> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                epoch: 0,
                session: None,
            }),
            accumulated_tx: watch::Sender::new(Arc::new(Vec::new())),
            page_tx: watch::Sender::new(Arc::new(Vec::new())),
            loading_tx: watch::Sender::new(false),
            done_tx: watch::Sender::new(false),
            error_tx: watch::Sender::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a finished fetch to the session it was issued for
    fn complete(
        &self,
        epoch: u64,
        request: &PageRequest,
        result: Result<Page<T>>,
    ) -> Result<FetchOutcome> {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            debug!(
                epoch,
                current = inner.epoch,
                path = %request.path,
                "Discarding completion from a replaced session"
            );
            return Ok(FetchOutcome::Stale);
        }
        let Some(session) = inner.session.as_mut() else {
            return Ok(FetchOutcome::Stale);
        };

        let page = match result {
            Ok(page) => page,
            Err(error) => {
                session.loading = false;
                self.loading_tx.send_replace(false);
                warn!(path = %request.path, "Page fetch failed: {}", error);
                self.error_tx
                    .send_replace(Some(FetchFailure::new(epoch, &request.path, &error)));
                return Err(error);
            }
        };

        if page.is_empty() {
            session.loading = false;
            session.done = true;
            self.loading_tx.send_replace(false);
            self.done_tx.send_replace(true);
            info!(
                path = %request.path,
                total = session.accumulated.len(),
                "Source exhausted"
            );
            return Ok(FetchOutcome::Exhausted);
        }

        let records = page.into_records();
        let fetched = records.len();
        session.page = Arc::new(records.clone());
        session.accumulated.merge(records);
        let total = session.accumulated.len();

        self.page_tx.send_replace(Arc::clone(&session.page));
        self.accumulated_tx.send_replace(session.accumulated.snapshot());
        self.error_tx.send_replace(None);
        session.loading = false;
        self.loading_tx.send_replace(false);

        debug!(path = %request.path, fetched, total, "Merged page");
        Ok(FetchOutcome::Merged { fetched, total })
    }
}

/// Cursor-based pagination engine with an observable accumulated sequence.
///
/// `init` starts a session and issues the first fetch; `more` fetches the
/// next page. At most one fetch is in flight at a time, and no fetch is
/// issued once the source has returned an empty page. Fetches run as tokio
/// tasks, so `init`, `more` and `on_scroll` must be called from within a
/// tokio runtime.
///
/// Cloning a `Pager` yields another handle to the same engine.
///
/// ```rust,ignore
/// let pager = Pager::new(source);
/// pager.init("cats", "name", QueryOptions::new().reverse(true))?;
///
/// let mut items = pager.accumulated_stream();
/// while let Some(snapshot) = items.next().await {
///     render(&snapshot);
/// }
/// ```
pub struct Pager<S: DataSource> {
    source: Arc<S>,
    shared: Arc<Shared<S::Item>>,
}

impl<S: DataSource> Clone for Pager<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: DataSource> std::fmt::Debug for Pager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("Pager")
            .field("session", &inner.epoch)
            .field("config", &inner.session.as_ref().map(|s| &s.config))
            .field("loading", &inner.session.as_ref().is_some_and(|s| s.loading))
            .field("done", &inner.session.as_ref().is_some_and(|s| s.done))
            .finish_non_exhaustive()
    }
}

impl<S: DataSource> Pager<S> {
    /// Create a pager reading from `source`. No session is started.
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            shared: Arc::new(Shared::new()),
        }
    }

    /// Get the data source
    pub fn source(&self) -> &S {
        &self.source
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Start a new session and issue its first fetch.
    ///
    /// Builds the query from `options` merged onto the defaults. A rejected
    /// configuration is returned before any state changes. Any previous
    /// session is replaced: its accumulation is discarded and results of
    /// its in-flight fetch are dropped when they arrive.
    pub fn init(
        &self,
        path: impl Into<String>,
        field: impl Into<String>,
        options: QueryOptions,
    ) -> Result<FetchHandle> {
        let config = QueryConfig::build(path, field, options)?;
        Ok(self.start(config))
    }

    /// Start a new session from an already validated config
    pub fn start(&self, config: QueryConfig) -> FetchHandle {
        let (epoch, request) = {
            let mut inner = self.shared.lock();
            inner.epoch += 1;
            info!(
                session = inner.epoch,
                path = config.path(),
                field = config.field(),
                limit = config.limit(),
                direction = %config.sort_direction(),
                prepend = config.prepend(),
                "Starting pagination session"
            );

            let mut session = Session::new(config);
            self.shared.page_tx.send_replace(Arc::new(Vec::new()));
            self.shared.accumulated_tx.send_replace(Arc::new(Vec::new()));
            self.shared.done_tx.send_replace(false);
            self.shared.error_tx.send_replace(None);

            let request = self.begin_fetch(inner.epoch, &mut session);
            inner.session = Some(session);
            (inner.epoch, request)
        };
        self.spawn_fetch(epoch, request)
    }

    /// Fetch the next page.
    ///
    /// Returns `None` without touching any state when no session has been
    /// started, a fetch is already in flight, or the source is exhausted.
    pub fn more(&self) -> Option<FetchHandle> {
        let (epoch, request) = {
            let mut inner = self.shared.lock();
            let epoch = inner.epoch;
            let Some(session) = inner.session.as_mut() else {
                debug!("more() called before init, ignoring");
                return None;
            };
            if session.done {
                debug!(session = epoch, "Source exhausted, ignoring more()");
                return None;
            }
            if session.loading {
                debug!(session = epoch, "Fetch in flight, ignoring more()");
                return None;
            }
            (epoch, self.begin_fetch(epoch, session))
        };
        Some(self.spawn_fetch(epoch, request))
    }

    /// React to a scroll signal; only [`ScrollEvent::Bottom`] fetches more
    pub fn on_scroll(&self, event: ScrollEvent) -> Option<FetchHandle> {
        match event {
            ScrollEvent::Bottom => self.more(),
            ScrollEvent::Top => None,
        }
    }

    /// Mark the session loading and build the request for its next page
    fn begin_fetch(&self, epoch: u64, session: &mut Session<S::Item>) -> PageRequest {
        let cursor = session.next_cursor();
        debug!(
            session = epoch,
            path = session.config.path(),
            cursor = cursor.as_ref().map(Cursor::as_str),
            "Fetching page"
        );
        session.loading = true;
        self.shared.loading_tx.send_replace(true);
        PageRequest::from_config(&session.config, cursor)
    }

    fn spawn_fetch(&self, epoch: u64, request: PageRequest) -> FetchHandle {
        let source = Arc::clone(&self.source);
        let shared = Arc::clone(&self.shared);

        let handle = tokio::spawn(async move {
            // A panicking source must still release the loading flag
            let result = AssertUnwindSafe(source.fetch_page(&request))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(Error::source_fetch(&request.path, "data source panicked"))
                });
            shared.complete(epoch, &request, result)
        });

        FetchHandle::new(epoch, handle)
    }

    // ========================================================================
    // Observed State
    // ========================================================================

    /// Identifier of the current session (0 before the first `init`)
    pub fn session_id(&self) -> u64 {
        self.shared.lock().epoch
    }

    /// Configuration of the current session
    pub fn config(&self) -> Option<QueryConfig> {
        self.shared.lock().session.as_ref().map(|s| s.config.clone())
    }

    /// Records accumulated so far in this session
    pub fn accumulated(&self) -> Snapshot<S::Item> {
        self.shared.accumulated_tx.borrow().clone()
    }

    /// Most recently fetched non-empty page
    pub fn page(&self) -> Snapshot<S::Item> {
        self.shared.page_tx.borrow().clone()
    }

    /// Whether a fetch is in flight
    pub fn is_loading(&self) -> bool {
        *self.shared.loading_tx.borrow()
    }

    /// Whether the source has been exhausted this session
    pub fn is_done(&self) -> bool {
        *self.shared.done_tx.borrow()
    }

    /// Failure of the most recent fetch, cleared by the next merged page
    pub fn last_error(&self) -> Option<FetchFailure> {
        self.shared.error_tx.borrow().clone()
    }

    /// Watch the accumulated sequence
    pub fn subscribe_accumulated(&self) -> watch::Receiver<Snapshot<S::Item>> {
        self.shared.accumulated_tx.subscribe()
    }

    /// Watch the latest page
    pub fn subscribe_page(&self) -> watch::Receiver<Snapshot<S::Item>> {
        self.shared.page_tx.subscribe()
    }

    /// Watch the loading flag
    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.shared.loading_tx.subscribe()
    }

    /// Watch the exhausted flag
    pub fn subscribe_done(&self) -> watch::Receiver<bool> {
        self.shared.done_tx.subscribe()
    }

    /// Watch fetch failures
    pub fn subscribe_errors(&self) -> watch::Receiver<Option<FetchFailure>> {
        self.shared.error_tx.subscribe()
    }

    /// Stream of accumulated snapshots.
    ///
    /// Yields the current snapshot first, then one per change. A slow
    /// consumer only sees the latest snapshot. Ends when every pager handle
    /// and in-flight fetch has been dropped.
    pub fn accumulated_stream(&self) -> BoxStream<'static, Snapshot<S::Item>> {
        let rx = self.subscribe_accumulated();
        Box::pin(stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let snapshot = rx.borrow_and_update().clone();
            Some((snapshot, (rx, false)))
        }))
    }

    /// Payloads of the accumulated records, in accumulated order
    pub fn items(&self) -> Vec<S::Item> {
        self.accumulated().iter().map(|r| r.data.clone()).collect()
    }
}
