//! Concurrent fetch orchestration for one subject at a time.
//!
//! Selecting a username starts the analysis fetch and the three secondary
//! fetches side by side. Every result is tagged with the generation of the
//! query that started it; results from a superseded query are dropped.
//! Only the analysis fetch is retried, and only on transient errors.

use crate::analysis::merge::{merge, FetchSlot, FetchSlots, ViewState};
use crate::api::services::{validate_username, AnalysisSource};
use crate::config::ApiConfig;
use crate::error::ApiError;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

/// Retry and timeout settings for fetches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts of the analysis fetch after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each one after.
    pub base_delay: Duration,
    /// Upper bound on a single attempt.
    pub fetch_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ApiConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            max_retries: config.retries,
            base_delay: config.retry_backoff(),
            fetch_timeout: config.timeout(),
        }
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

struct ActiveQuery {
    generation: u64,
    username: String,
    slots: FetchSlots,
    tasks: Vec<AbortHandle>,
}

impl ActiveQuery {
    fn cancel(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

struct Shared<S> {
    source: Arc<S>,
    policy: RetryPolicy,
    generation: AtomicU64,
    active: Mutex<Option<ActiveQuery>>,
    state: watch::Sender<ViewState>,
}

impl<S> Shared<S> {
    fn active(&self) -> MutexGuard<'_, Option<ActiveQuery>> {
        // The guarded data stays consistent even if a holder panicked.
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record one fetch outcome and republish the merged state, unless the
    /// query it belongs to has been superseded.
    fn settle(&self, generation: u64, apply: impl FnOnce(&mut FetchSlots)) {
        let mut active = self.active();
        let Some(query) = active.as_mut().filter(|q| q.generation == generation) else {
            debug!("Discarding result of superseded query (generation {})", generation);
            return;
        };

        apply(&mut query.slots);
        self.state.send_replace(merge(&query.username, &query.slots));
    }
}

/// Owns the active query and publishes its `ViewState`.
pub struct Aggregator<S> {
    shared: Arc<Shared<S>>,
}

impl<S: AnalysisSource + 'static> Aggregator<S> {
    pub fn new(source: Arc<S>, policy: RetryPolicy) -> Self {
        let (state, _) = watch::channel(ViewState::Idle);
        Self {
            shared: Arc::new(Shared {
                source,
                policy,
                generation: AtomicU64::new(0),
                active: Mutex::new(None),
                state,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.shared.state.subscribe()
    }

    /// Snapshot of the published state.
    pub fn current(&self) -> ViewState {
        self.shared.state.borrow().clone()
    }

    /// Make `username` the active subject.
    ///
    /// Re-selecting the subject that is already active shares its in-flight
    /// or finished result instead of fetching again, unless that query
    /// failed. Selecting a different subject cancels the previous query.
    pub fn select(&self, username: &str) -> Result<watch::Receiver<ViewState>, ApiError> {
        let username = validate_username(username)?.to_string();
        let mut active = self.shared.active();

        if let Some(query) = active.as_ref() {
            let failed = matches!(query.slots.analysis, FetchSlot::Failure(_));
            // GitHub logins are case-insensitive.
            if query.username.eq_ignore_ascii_case(&username) && !failed {
                debug!("Sharing active query for {}", username);
                return Ok(self.subscribe());
            }
        }

        if let Some(previous) = active.take() {
            previous.cancel();
            debug!(
                "Cancelled query for {} (generation {})",
                previous.username, previous.generation
            );
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let slots = FetchSlots::default();
        self.shared.state.send_replace(merge(&username, &slots));
        info!("Analyzing {} (generation {})", username, generation);

        // Tasks block on the lock held here until the query is registered.
        let tasks = self.spawn_fetches(generation, &username);
        *active = Some(ActiveQuery {
            generation,
            username,
            slots,
            tasks,
        });

        Ok(self.subscribe())
    }

    /// Select `username` and wait for the analysis fetch to settle.
    pub async fn load(&self, username: &str) -> Result<ViewState, ApiError> {
        let mut rx = self.select(username)?;
        Ok(wait_until(&mut rx, ViewState::is_settled).await)
    }

    /// Drop the active query. Late results are discarded.
    pub fn leave(&self) {
        let mut active = self.shared.active();
        if let Some(previous) = active.take() {
            previous.cancel();
            debug!("Left query for {}", previous.username);
        }
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.state.send_replace(ViewState::Idle);
    }

    fn spawn_fetches(&self, generation: u64, username: &str) -> Vec<AbortHandle> {
        let policy = self.shared.policy;

        vec![
            self.spawn_fetch(
                generation,
                username,
                move |source, user| async move {
                    with_retry(&policy, &user, || source.fetch_analysis(&user)).await
                },
                |slots, result| slots.analysis = result.into(),
            ),
            self.spawn_fetch(
                generation,
                username,
                move |source, user| async move {
                    secondary(&policy, "report", &user, source.fetch_report(&user)).await
                },
                |slots, result| slots.report = result.into(),
            ),
            self.spawn_fetch(
                generation,
                username,
                move |source, user| async move {
                    let fetch = source.fetch_recommendations(&user);
                    secondary(&policy, "recommendations", &user, fetch).await
                },
                |slots, result| slots.recommendations = result.into(),
            ),
            self.spawn_fetch(
                generation,
                username,
                move |source, user| async move {
                    secondary(&policy, "trends", &user, source.fetch_trends(&user)).await
                },
                |slots, result| slots.trends = result.into(),
            ),
        ]
    }

    fn spawn_fetch<T, F, Fut>(
        &self,
        generation: u64,
        username: &str,
        fetch: F,
        apply: fn(&mut FetchSlots, Result<T, ApiError>),
    ) -> AbortHandle
    where
        T: Send + 'static,
        F: FnOnce(Arc<S>, String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let source = Arc::clone(&self.shared.source);
        let username = username.to_string();

        tokio::spawn(async move {
            let result = fetch(source, username).await;
            shared.settle(generation, |slots| apply(slots, result));
        })
        .abort_handle()
    }
}

impl<S> Drop for Aggregator<S> {
    fn drop(&mut self) {
        if let Some(query) = self.shared.active().take() {
            query.cancel();
        }
    }
}

/// Wait until the published state satisfies `ready`, then return it.
pub async fn wait_until(
    rx: &mut watch::Receiver<ViewState>,
    mut ready: impl FnMut(&ViewState) -> bool,
) -> ViewState {
    let reached = match rx.wait_for(|state| ready(state)).await {
        Ok(state) => Some(state.clone()),
        // Sender gone: nothing will change any more.
        Err(_) => None,
    };
    reached.unwrap_or_else(|| rx.borrow().clone())
}

/// Wait up to `grace` for the secondary fetches, then return whatever is
/// published.
pub async fn wait_for_secondaries(
    rx: &mut watch::Receiver<ViewState>,
    grace: Duration,
) -> ViewState {
    if tokio::time::timeout(grace, wait_until(rx, ViewState::is_complete))
        .await
        .is_err()
    {
        debug!("Secondary data still pending after {}ms", grace.as_millis());
    }
    rx.borrow().clone()
}

async fn with_timeout<T>(
    policy: &RetryPolicy,
    fetch: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    match tokio::time::timeout(policy.fetch_timeout, fetch).await {
        Ok(result) => result,
        Err(_) => Err(ApiError::Timeout {
            seconds: policy.fetch_timeout.as_secs(),
        }),
    }
}

/// Run `op` with exponential backoff on transient failures.
async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    username: &str,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match with_timeout(policy, op()).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                attempt += 1;
                warn!(
                    "Analysis of {} failed (attempt {}/{}), retrying in {}ms: {}",
                    username,
                    attempt,
                    policy.max_retries + 1,
                    delay.as_millis(),
                    e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if attempt > 0 {
                    warn!("Analysis of {} failed after {} attempts", username, attempt + 1);
                }
                return Err(e);
            }
        }
    }
}

/// Single timed attempt; failures only mean defaults in the view.
async fn secondary<T>(
    policy: &RetryPolicy,
    label: &str,
    username: &str,
    fetch: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    let result = with_timeout(policy, fetch).await;
    if let Err(ref e) = result {
        warn!("{} for {} unavailable, using defaults: {}", label, username, e);
    }
    result
}
