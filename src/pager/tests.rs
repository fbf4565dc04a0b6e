//! Tests for pager module

use super::*;
use crate::config::QueryOptions;
use crate::error::{Error, Result};
use crate::source::{DataSource, Document, MemorySource, PageRequest};
use crate::types::{Cursor, MergeDirection, Page, Record, ScrollEvent, SortDirection};
use async_trait::async_trait;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Barrier, Semaphore};
use test_case::test_case;
use tokio_test::{assert_err, assert_ok};

// ============================================================================
// Test Sources
// ============================================================================

/// Serves pre-scripted pages in order and records every request
struct ScriptedSource {
    pages: Mutex<VecDeque<Result<Vec<&'static str>>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedSource {
    fn new(pages: Vec<Result<Vec<&'static str>>>) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(pages.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn cursors(&self) -> Vec<Option<String>> {
        self.requests()
            .into_iter()
            .map(|r| r.after.map(Cursor::into_inner))
            .collect()
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    type Item = String;

    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<String>> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.pages.lock().unwrap().pop_front();
        match next {
            Some(Ok(items)) => Ok(Page::new(
                items
                    .into_iter()
                    .map(|item| Record::new(Cursor::new(item), item.to_string()))
                    .collect(),
            )),
            Some(Err(e)) => Err(e),
            None => Ok(Page::empty()),
        }
    }
}

struct PanickingSource;

#[async_trait]
impl DataSource for PanickingSource {
    type Item = String;

    async fn fetch_page(&self, _request: &PageRequest) -> Result<Page<String>> {
        panic!("backend exploded");
    }
}

/// Holds every fetch until a permit is released
struct GatedSource {
    gate: Semaphore,
    issued: AtomicUsize,
}

impl GatedSource {
    fn new(permits: usize) -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(permits),
            issued: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl DataSource for GatedSource {
    type Item = String;

    async fn fetch_page(&self, _request: &PageRequest) -> Result<Page<String>> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.gate
            .acquire()
            .await
            .map_err(|e| Error::task(e.to_string()))?
            .forget();
        let item = n.to_string();
        Ok(Page::new(vec![Record::new(Cursor::new(item.clone()), item)]))
    }
}

fn letters(source: &[&str]) -> MemorySource {
    MemorySource::new().with_collection(
        "letters",
        source
            .iter()
            .map(|l| Document::new(*l, json!({ "value": l })))
            .collect(),
    )
}

fn items<S: DataSource<Item = String>>(pager: &Pager<S>) -> Vec<String> {
    pager.items()
}

fn values(pager: &Pager<MemorySource>) -> Vec<String> {
    pager
        .items()
        .iter()
        .map(|v| v["value"].as_str().unwrap_or_default().to_string())
        .collect()
}

// ============================================================================
// Accumulator Tests
// ============================================================================

fn record(id: &str) -> Record<String> {
    Record::new(Cursor::new(id), id.to_string())
}

#[test_case(MergeDirection::Append, &["a", "b", "c", "d", "e"] ; "append keeps arrival order at the tail")]
#[test_case(MergeDirection::Prepend, &["e", "c", "d", "a", "b"] ; "prepend puts newest page first")]
fn test_accumulator_merge(direction: MergeDirection, expected: &[&str]) {
    let mut acc = Accumulator::new(direction);
    assert!(acc.is_empty());

    acc.merge(vec![record("a"), record("b")]);
    acc.merge(vec![record("c"), record("d")]);
    acc.merge(vec![record("e")]);

    let merged: Vec<&str> = acc.iter().map(|r| r.data.as_str()).collect();
    assert_eq!(merged, expected);
    assert_eq!(acc.len(), 5);
    assert_eq!(acc.direction(), direction);
    assert_eq!(acc.snapshot().len(), 5);
}

#[test]
fn test_fetch_outcome_predicates() {
    let merged = FetchOutcome::Merged {
        fetched: 2,
        total: 4,
    };
    assert!(merged.is_merged());
    assert!(!merged.is_exhausted());
    assert!(FetchOutcome::Exhausted.is_exhausted());
    assert!(FetchOutcome::Stale.is_stale());
}

// ============================================================================
// Session Start
// ============================================================================

#[tokio::test]
async fn test_more_before_init_is_noop() {
    let pager = Pager::new(ScriptedSource::new(vec![]));
    assert!(pager.more().is_none());
    assert_eq!(pager.session_id(), 0);
    assert!(pager.config().is_none());
    assert!(!pager.is_loading());
    assert!(pager.source().requests().is_empty());
}

#[tokio::test]
async fn test_init_issues_first_fetch_without_cursor() {
    let source = ScriptedSource::new(vec![Ok(vec!["a", "b"])]);
    let pager = Pager::new(Arc::clone(&source));

    let handle = assert_ok!(pager.init("cats", "name", QueryOptions::default()));
    assert!(pager.is_loading());
    assert_eq!(handle.session(), 1);

    let outcome = assert_ok!(handle.wait().await);
    assert_eq!(outcome, FetchOutcome::Merged { fetched: 2, total: 2 });

    let requests = source.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "cats");
    assert_eq!(requests[0].field, "name");
    assert_eq!(requests[0].limit, crate::config::DEFAULT_LIMIT);
    assert_eq!(requests[0].direction, SortDirection::Descending);
    assert!(requests[0].after.is_none());

    assert_eq!(items(&pager), vec!["a", "b"]);
    assert!(!pager.is_loading());
    assert!(!pager.is_done());
}

#[tokio::test]
async fn test_init_with_prepend_first_fetch_has_no_cursor() {
    let source = ScriptedSource::new(vec![Ok(vec!["a", "b"])]);
    let pager = Pager::new(Arc::clone(&source));

    let handle = pager
        .init("cats", "name", QueryOptions::new().prepend(true))
        .unwrap();
    handle.wait().await.unwrap();

    assert_eq!(source.cursors(), vec![None]);
}

#[tokio::test]
async fn test_init_applies_overrides() {
    let source = ScriptedSource::new(vec![]);
    let pager = Pager::new(Arc::clone(&source));

    pager
        .init(
            "cats",
            "name",
            QueryOptions::new().reverse(true).prepend(false),
        )
        .unwrap()
        .wait()
        .await
        .unwrap();

    let config = pager.config().unwrap();
    assert!(config.reverse());
    assert!(!config.prepend());
    assert_eq!(config.limit(), crate::config::DEFAULT_LIMIT);
    assert_eq!(source.requests()[0].direction, SortDirection::Ascending);
}

#[tokio::test]
async fn test_invalid_config_leaves_session_untouched() {
    let source = ScriptedSource::new(vec![Ok(vec!["a", "b"])]);
    let pager = Pager::new(Arc::clone(&source));
    pager
        .init("cats", "name", QueryOptions::default())
        .unwrap()
        .wait()
        .await
        .unwrap();

    let err = assert_err!(pager.init("dogs", "name", QueryOptions::new().limit(0)));
    assert!(err.is_config());
    let err = assert_err!(pager.init("", "name", QueryOptions::default()));
    assert!(matches!(err, Error::MissingConfigField { .. }));

    assert_eq!(pager.session_id(), 1);
    assert_eq!(pager.config().unwrap().path(), "cats");
    assert_eq!(items(&pager), vec!["a", "b"]);
    assert_eq!(source.requests().len(), 1);
}

// ============================================================================
// Concurrency Guard
// ============================================================================

#[tokio::test]
async fn test_more_while_loading_is_noop() {
    let source = ScriptedSource::new(vec![Ok(vec!["a", "b"]), Ok(vec!["c"])]);
    let pager = Pager::new(Arc::clone(&source));

    let handle = pager.init("cats", "name", QueryOptions::default()).unwrap();
    assert!(pager.more().is_none());
    assert!(pager.more().is_none());
    handle.wait().await.unwrap();

    assert_eq!(source.requests().len(), 1);
    assert_eq!(items(&pager), vec!["a", "b"]);
}

#[tokio::test]
async fn test_two_immediate_more_calls_issue_one_fetch() {
    let source = ScriptedSource::new(vec![Ok(vec!["a", "b"]), Ok(vec!["c", "d"])]);
    let pager = Pager::new(Arc::clone(&source));
    pager
        .init("cats", "name", QueryOptions::default())
        .unwrap()
        .wait()
        .await
        .unwrap();

    let first = pager.more();
    let second = pager.more();
    assert!(first.is_some());
    assert!(second.is_none());
    first.unwrap().wait().await.unwrap();

    assert_eq!(source.requests().len(), 2);
    assert_eq!(items(&pager), vec!["a", "b", "c", "d"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_more_calls_issue_one_fetch() {
    const CALLERS: usize = 32;

    let source = GatedSource::new(1);
    let pager = Pager::new(Arc::clone(&source));
    pager
        .init("cats", "name", QueryOptions::default())
        .unwrap()
        .wait()
        .await
        .unwrap();

    let barrier = Arc::new(Barrier::new(CALLERS));
    let callers: Vec<_> = (0..CALLERS)
        .map(|_| {
            let pager = pager.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                pager.more()
            })
        })
        .collect();

    let mut handles = Vec::new();
    for caller in callers {
        handles.extend(caller.await.unwrap());
    }
    assert_eq!(handles.len(), 1);
    assert!(pager.is_loading());

    source.gate.add_permits(1);
    assert_ok!(handles.pop().unwrap().wait().await);
    assert_eq!(source.issued.load(Ordering::SeqCst), 2);
    assert_eq!(items(&pager), vec!["1", "2"]);
    assert!(!pager.is_loading());
}

// ============================================================================
// Merge Order and Cursor Selection
// ============================================================================

#[tokio::test]
async fn test_append_merge_order_and_cursor() {
    let source = ScriptedSource::new(vec![Ok(vec!["a", "b"]), Ok(vec!["c", "d"])]);
    let pager = Pager::new(Arc::clone(&source));

    pager
        .init("cats", "name", QueryOptions::new().prepend(false))
        .unwrap()
        .wait()
        .await
        .unwrap();
    pager.more().unwrap().wait().await.unwrap();

    assert_eq!(items(&pager), vec!["a", "b", "c", "d"]);
    assert_eq!(source.cursors(), vec![None, Some("b".to_string())]);

    let page: Vec<String> = pager.page().iter().map(|r| r.data.clone()).collect();
    assert_eq!(page, vec!["c", "d"]);
}

#[tokio::test]
async fn test_prepend_merge_order_and_cursor() {
    let source = ScriptedSource::new(vec![Ok(vec!["a", "b"]), Ok(vec!["c", "d"])]);
    let pager = Pager::new(Arc::clone(&source));

    pager
        .init("cats", "name", QueryOptions::new().prepend(true))
        .unwrap()
        .wait()
        .await
        .unwrap();
    pager.more().unwrap().wait().await.unwrap();

    assert_eq!(items(&pager), vec!["c", "d", "a", "b"]);
    assert_eq!(source.cursors(), vec![None, Some("a".to_string())]);
}

// ============================================================================
// Exhaustion
// ============================================================================

#[tokio::test]
async fn test_exhaustion_is_monotonic() {
    let source = ScriptedSource::new(vec![Ok(vec!["a"]), Ok(vec![]), Ok(vec!["late"])]);
    let pager = Pager::new(Arc::clone(&source));

    pager
        .init("cats", "name", QueryOptions::default())
        .unwrap()
        .wait()
        .await
        .unwrap();
    let outcome = pager.more().unwrap().wait().await.unwrap();
    assert!(outcome.is_exhausted());
    assert!(pager.is_done());

    for _ in 0..5 {
        assert!(pager.more().is_none());
        assert!(pager.on_scroll(ScrollEvent::Bottom).is_none());
    }

    assert!(pager.is_done());
    assert!(!pager.is_loading());
    assert_eq!(source.requests().len(), 2);
    assert_eq!(items(&pager), vec!["a"]);
    // The empty page is not merged into the buffer
    assert_eq!(pager.page().len(), 1);
}

#[tokio::test]
async fn test_reinit_resets_done() {
    let source = ScriptedSource::new(vec![Ok(vec![]), Ok(vec!["x"])]);
    let pager = Pager::new(Arc::clone(&source));

    pager
        .init("cats", "name", QueryOptions::default())
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert!(pager.is_done());

    pager
        .init("cats", "name", QueryOptions::default())
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert!(!pager.is_done());
    assert_eq!(items(&pager), vec!["x"]);
    assert_eq!(source.cursors(), vec![None, None]);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_fetch_error_clears_loading_and_keeps_state() {
    let source = ScriptedSource::new(vec![
        Ok(vec!["a", "b"]),
        Err(Error::source_fetch("cats", "permission denied")),
        Ok(vec!["c"]),
    ]);
    let pager = Pager::new(Arc::clone(&source));
    pager
        .init("cats", "name", QueryOptions::default())
        .unwrap()
        .wait()
        .await
        .unwrap();

    let err = pager.more().unwrap().wait().await.unwrap_err();
    assert!(matches!(err, Error::SourceFetch { .. }));
    assert!(!pager.is_loading());
    assert!(!pager.is_done());
    assert_eq!(items(&pager), vec!["a", "b"]);

    let failure = pager.last_error().unwrap();
    assert_eq!(failure.session, 1);
    assert_eq!(failure.path, "cats");
    assert!(failure.message.contains("permission denied"));
    assert!(failure.retryable);

    // No automatic retry; the caller asks again and resumes after "b"
    assert_eq!(source.requests().len(), 2);
    pager.more().unwrap().wait().await.unwrap();
    assert_eq!(items(&pager), vec!["a", "b", "c"]);
    assert_eq!(
        source.cursors(),
        vec![None, Some("b".to_string()), Some("b".to_string())]
    );
    assert!(pager.last_error().is_none());
}

#[tokio::test]
async fn test_panicking_source_releases_loading() {
    let pager = Pager::new(PanickingSource);

    let err = pager
        .init("cats", "name", QueryOptions::default())
        .unwrap()
        .wait()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SourceFetch { .. }));
    assert!(!pager.is_loading());
    assert!(pager.last_error().is_some());
    assert!(pager.more().is_some());
}

// ============================================================================
// Session Replacement
// ============================================================================

#[tokio::test]
async fn test_reinit_discards_in_flight_fetch() {
    let source = letters(&["a", "b", "c"]).with_collection(
        "other",
        vec![Document::new("z", json!({"value": "z"}))],
    );
    let pager = Pager::new(source);

    let old = pager
        .init("letters", "value", QueryOptions::new().reverse(true))
        .unwrap();
    let new = pager
        .init("other", "value", QueryOptions::new().reverse(true))
        .unwrap();
    assert_eq!(old.session(), 1);
    assert_eq!(new.session(), 2);

    assert_eq!(old.wait().await.unwrap(), FetchOutcome::Stale);
    assert!(new.wait().await.unwrap().is_merged());
    assert_eq!(values(&pager), vec!["z"]);
    assert!(!pager.is_loading());
}

// ============================================================================
// Scroll Signal
// ============================================================================

#[tokio::test]
async fn test_on_scroll_only_bottom_fetches() {
    let source = ScriptedSource::new(vec![Ok(vec!["a"]), Ok(vec!["b"])]);
    let pager = Pager::new(Arc::clone(&source));
    pager
        .init("cats", "name", QueryOptions::default())
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(pager.on_scroll(ScrollEvent::Top).is_none());
    let handle = pager.on_scroll(ScrollEvent::Bottom).unwrap();
    handle.wait().await.unwrap();

    assert_eq!(items(&pager), vec!["a", "b"]);
}

// ============================================================================
// Observables
// ============================================================================

#[tokio::test]
async fn test_loading_and_done_notifications() {
    let source = ScriptedSource::new(vec![Ok(vec!["a"])]);
    let pager = Pager::new(Arc::clone(&source));
    let mut loading = pager.subscribe_loading();
    let mut done = pager.subscribe_done();

    let handle = pager.init("cats", "name", QueryOptions::default()).unwrap();
    assert!(loading.has_changed().unwrap());
    assert!(*loading.borrow_and_update());

    handle.wait().await.unwrap();
    assert!(loading.has_changed().unwrap());
    assert!(!*loading.borrow_and_update());

    pager.more().unwrap().wait().await.unwrap();
    assert!(done.has_changed().unwrap());
    assert!(*done.borrow_and_update());
}

#[tokio::test]
async fn test_accumulated_stream_yields_snapshots() {
    let pager = Pager::new(letters(&["a", "b", "c", "d", "e"]));
    let mut stream = pager.accumulated_stream();

    let initial = stream.next().await.unwrap();
    assert!(initial.is_empty());

    pager
        .init("letters", "value", QueryOptions::new().reverse(true))
        .unwrap()
        .wait()
        .await
        .unwrap();
    let snapshot = stream.next().await.unwrap();
    assert_eq!(snapshot.len(), 2);

    pager.more().unwrap().wait().await.unwrap();
    let snapshot = stream.next().await.unwrap();
    let ids: Vec<&str> = snapshot
        .iter()
        .map(|r| r.data["value"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn test_accumulated_stream_ends_when_pager_dropped() {
    let pager = Pager::new(letters(&["a"]));
    let mut stream = pager.accumulated_stream();
    assert!(stream.next().await.is_some());

    drop(pager);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_error_channel_notification() {
    let source = ScriptedSource::new(vec![Err(Error::http_status(403, "forbidden"))]);
    let pager = Pager::new(Arc::clone(&source));
    let mut errors = pager.subscribe_errors();

    let err = pager
        .init("cats", "name", QueryOptions::default())
        .unwrap()
        .wait()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 403, .. }));

    errors.changed().await.unwrap();
    let failure = errors.borrow().clone().unwrap();
    assert!(!failure.retryable);
    assert!(failure.message.contains("403"));
}

// ============================================================================
// End to End
// ============================================================================

#[tokio::test]
async fn test_five_records_limit_two() {
    let pager = Pager::new(letters(&["c", "a", "e", "b", "d"]));

    pager
        .init("letters", "value", QueryOptions::new().reverse(true).limit(2))
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(values(&pager), vec!["a", "b"]);
    assert!(!pager.is_done());

    pager.more().unwrap().wait().await.unwrap();
    assert_eq!(values(&pager), vec!["a", "b", "c", "d"]);
    assert!(!pager.is_done());

    pager.more().unwrap().wait().await.unwrap();
    assert_eq!(values(&pager), vec!["a", "b", "c", "d", "e"]);
    assert_eq!(pager.page().len(), 1);
    assert!(!pager.is_done());

    let outcome = pager.more().unwrap().wait().await.unwrap();
    assert_eq!(outcome, FetchOutcome::Exhausted);
    assert_eq!(values(&pager), vec!["a", "b", "c", "d", "e"]);
    assert!(pager.is_done());

    assert!(pager.more().is_none());
    assert!(pager.more().is_none());
}
