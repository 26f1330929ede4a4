use crate::config::PoolsConfig;
use crate::error::AppError;
use crate::pools::entry::{parse_pool_list, PoolEntry};
use crate::pools::source::{HttpPoolSource, PoolSource};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Lifecycle of the pool list download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail")]
pub enum FetchState {
    Idle,
    InFlight,
    Succeeded(Vec<PoolEntry>),
    Failed(String),
}

struct RequestTracker {
    /// Bumped for every issued request; responses from older requests are dropped.
    generation: u64,
    last_request: Option<Instant>,
}

/// Downloads the pool list and keeps the latest result.
///
/// Requests run as tokio tasks, so the request methods must be called from
/// within a runtime. State changes are published on a watch channel.
pub struct PoolListFetcher<S> {
    source: Arc<S>,
    cooldown: Duration,
    tracker: Arc<Mutex<RequestTracker>>,
    state_tx: Arc<watch::Sender<FetchState>>,
}

impl PoolListFetcher<HttpPoolSource> {
    pub fn new(config: &PoolsConfig) -> Result<Self, AppError> {
        let source = HttpPoolSource::new(config)?;
        Ok(Self::with_source(Arc::new(source), config.retry_cooldown()))
    }
}

impl<S: PoolSource> PoolListFetcher<S> {
    pub fn with_source(source: Arc<S>, cooldown: Duration) -> Self {
        let (state_tx, _) = watch::channel(FetchState::Idle);
        Self {
            source,
            cooldown,
            tracker: Arc::new(Mutex::new(RequestTracker {
                generation: 0,
                last_request: None,
            })),
            state_tx: Arc::new(state_tx),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Starts a download unless one is already in flight.
    /// Returns whether a request was issued.
    pub fn request_fetch(&self) -> bool {
        let mut tracker = lock(&self.tracker);
        if matches!(*self.state_tx.borrow(), FetchState::InFlight) {
            tracing::debug!("Pool list fetch already in flight");
            return false;
        }
        self.issue(&mut tracker);
        true
    }

    /// Re-downloads the list once the cooldown since the last request has elapsed.
    /// A request still in flight is superseded and its response ignored.
    pub fn request_retry(&self) -> Result<(), AppError> {
        let mut tracker = lock(&self.tracker);
        let remaining = remaining_cooldown(&tracker, self.cooldown);
        if !remaining.is_zero() {
            let remaining_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX).max(1);
            tracing::debug!("Pool list retry throttled for {remaining_ms} ms");
            return Err(AppError::RetryThrottled { remaining_ms });
        }
        if matches!(*self.state_tx.borrow(), FetchState::InFlight) {
            tracing::info!("Superseding pool list request {}", tracker.generation);
        }
        self.issue(&mut tracker);
        Ok(())
    }

    /// Time left before `request_retry` is allowed.
    pub fn cooldown_remaining(&self) -> Duration {
        remaining_cooldown(&lock(&self.tracker), self.cooldown)
    }

    pub fn state(&self) -> FetchState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.state_tx.subscribe()
    }

    /// Waits until no request is in flight and returns the resulting state.
    pub async fn wait_settled(&self) -> FetchState {
        let mut rx = self.state_tx.subscribe();
        let settled = rx
            .wait_for(|state| !matches!(state, FetchState::InFlight))
            .await
            .map(|state| (*state).clone());
        settled.unwrap_or_else(|_| self.state())
    }

    /// Picks one entry from the last successful download.
    pub fn select(&self, index: usize) -> Result<PoolEntry, AppError> {
        match &*self.state_tx.borrow() {
            FetchState::Succeeded(entries) => {
                entries.get(index).cloned().ok_or(AppError::NoSelection)
            }
            _ => Err(AppError::NoSelection),
        }
    }

    fn issue(&self, tracker: &mut RequestTracker) {
        tracker.generation += 1;
        tracker.last_request = Some(Instant::now());
        let generation = tracker.generation;
        self.state_tx.send_replace(FetchState::InFlight);
        tracing::info!("Requesting pool list (request {generation})");

        let source = Arc::clone(&self.source);
        let tracker = Arc::clone(&self.tracker);
        let state_tx = Arc::clone(&self.state_tx);
        tokio::spawn(async move {
            let result = source.fetch_pool_list().await;

            let tracker = lock(&tracker);
            if tracker.generation != generation {
                tracing::debug!("Discarding stale pool list response (request {generation})");
                return;
            }
            let state = match result {
                Ok(body) => {
                    let entries = parse_pool_list(&body);
                    tracing::info!("Received {} pool(s)", entries.len());
                    FetchState::Succeeded(entries)
                }
                Err(e) => {
                    tracing::warn!("Pool list fetch failed: {e}");
                    FetchState::Failed(e.to_string())
                }
            };
            state_tx.send_replace(state);
        });
    }
}

fn remaining_cooldown(tracker: &RequestTracker, cooldown: Duration) -> Duration {
    match tracker.last_request {
        Some(last) => cooldown.saturating_sub(last.elapsed()),
        None => Duration::ZERO,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
