//! Orchestrates one `/cotacao` request: upstream fetch, then persistence,
//! each under its own deadline nested inside the request deadline.

use std::fmt;

use tracing::{debug, error, info};

use crate::deadline::Deadline;
use crate::errors::AppError;
use crate::models::Quotation;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Received,
    FetchingUpstream,
    FetchFailed,
    Persisting,
    PersistFailed,
    Completed,
}

impl RequestStage {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStage::FetchFailed | RequestStage::PersistFailed | RequestStage::Completed
        )
    }

    pub fn can_advance_to(self, next: RequestStage) -> bool {
        use RequestStage::*;
        matches!(
            (self, next),
            (Received, FetchingUpstream)
                | (FetchingUpstream, FetchFailed)
                | (FetchingUpstream, Persisting)
                | (Persisting, PersistFailed)
                | (Persisting, Completed)
        )
    }
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestStage::Received => "received",
            RequestStage::FetchingUpstream => "fetching_upstream",
            RequestStage::FetchFailed => "fetch_failed",
            RequestStage::Persisting => "persisting",
            RequestStage::PersistFailed => "persist_failed",
            RequestStage::Completed => "completed",
        };
        f.write_str(name)
    }
}

struct StageTracker {
    stage: RequestStage,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            stage: RequestStage::Received,
        }
    }

    fn advance(&mut self, next: RequestStage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "invalid request transition {} -> {}",
            self.stage,
            next
        );
        debug!(from = %self.stage, to = %next, "Request stage transition");
        self.stage = next;
    }
}

/// Runs the full request under a fresh `request_timeout` deadline.
pub async fn fetch_and_store(state: &AppState) -> Result<Quotation, AppError> {
    let request = Deadline::root("request", state.config.request_timeout);
    fetch_and_store_within(state, &request).await
}

/// Runs the request under an existing request deadline.
///
/// The upstream deadline and the database deadline are siblings under
/// `request`: a timed-out fetch does not shrink the database budget, but time
/// spent fetching is gone from the request budget, so a slow fetch can leave
/// the database step with nothing.
pub async fn fetch_and_store_within(
    state: &AppState,
    request: &Deadline,
) -> Result<Quotation, AppError> {
    let mut tracker = StageTracker::new();
    tracker.advance(RequestStage::FetchingUpstream);

    let quotation = {
        let upstream = request.child("upstream", state.config.upstream_timeout);
        match state.quote_provider.fetch_latest(&upstream).await {
            Ok(quotation) => quotation,
            Err(e) => {
                tracker.advance(RequestStage::FetchFailed);
                error!("Failed to fetch quotation data: {}", e);
                return Err(AppError::Fetch(e));
            }
        }
    };

    tracker.advance(RequestStage::Persisting);
    let database = request.child("database", state.config.db_timeout);

    match state.store.save(&database, &quotation).await {
        Ok(id) => {
            tracker.advance(RequestStage::Completed);
            info!(id, bid = %quotation.bid, "Quotation created successfully");
            Ok(quotation)
        }
        Err(e) => {
            tracker.advance(RequestStage::PersistFailed);
            error!("Failed to save quotation to DB: {}", e);
            Err(AppError::Persist(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::config::ServerConfig;
    use crate::external::quote_provider::{QuoteProvider, QuoteProviderError};
    use crate::models::QuotationRecord;
    use crate::store::{QuotationStore, StoreError};

    struct FakeProvider {
        delay: Duration,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl QuoteProvider for FakeProvider {
        async fn fetch_latest(&self, deadline: &Deadline) -> Result<Quotation, QuoteProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            deadline.run(tokio::time::sleep(self.delay)).await?;
            if self.fail {
                return Err(QuoteProviderError::UpstreamStatus("502 Bad Gateway".into()));
            }
            Ok(Quotation {
                code: "USD".into(),
                bid: "5.42".into(),
                ..Default::default()
            })
        }
    }

    #[derive(Default)]
    struct FakeStore {
        delay: Duration,
        saved: std::sync::Mutex<Vec<Quotation>>,
    }

    #[async_trait]
    impl QuotationStore for FakeStore {
        async fn ensure_schema(&self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn save(&self, deadline: &Deadline, quotation: &Quotation) -> Result<i64, StoreError> {
            deadline.run(tokio::time::sleep(self.delay)).await?;
            let mut saved = self.saved.lock().unwrap();
            saved.push(quotation.clone());
            Ok(saved.len() as i64)
        }

        async fn fetch_all(&self) -> Result<Vec<QuotationRecord>, StoreError> {
            Ok(Vec::new())
        }

        async fn count(&self) -> Result<i64, StoreError> {
            Ok(self.saved.lock().unwrap().len() as i64)
        }

        fn backend(&self) -> &'static str {
            "fake"
        }
    }

    fn state(
        config: ServerConfig,
        provider: FakeProvider,
        store: Arc<FakeStore>,
    ) -> (AppState, Arc<FakeProvider>) {
        let provider = Arc::new(provider);
        let state = AppState {
            config: Arc::new(config),
            quote_provider: provider.clone(),
            store,
        };
        (state, provider)
    }

    fn provider(delay_ms: u64, fail: bool) -> FakeProvider {
        FakeProvider {
            delay: Duration::from_millis(delay_ms),
            calls: AtomicUsize::new(0),
            fail,
        }
    }

    #[test]
    fn test_stage_transitions() {
        use RequestStage::*;
        assert!(Received.can_advance_to(FetchingUpstream));
        assert!(FetchingUpstream.can_advance_to(Persisting));
        assert!(FetchingUpstream.can_advance_to(FetchFailed));
        assert!(Persisting.can_advance_to(Completed));
        assert!(Persisting.can_advance_to(PersistFailed));

        assert!(!Received.can_advance_to(Persisting));
        assert!(!FetchFailed.can_advance_to(Persisting));
        assert!(!Completed.can_advance_to(FetchingUpstream));
        assert!(!Persisting.can_advance_to(FetchingUpstream));
    }

    #[test]
    fn test_terminal_stages() {
        assert!(RequestStage::FetchFailed.is_terminal());
        assert!(RequestStage::PersistFailed.is_terminal());
        assert!(RequestStage::Completed.is_terminal());
        assert!(!RequestStage::Persisting.is_terminal());
    }

    #[tokio::test]
    async fn test_success_persists_and_returns_quotation() {
        let store = Arc::new(FakeStore::default());
        let (state, provider) = state(ServerConfig::default(), provider(5, false), store.clone());

        let q = fetch_and_store(&state).await.unwrap();
        assert_eq!(q.bid, "5.42");
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_never_reaches_store() {
        let store = Arc::new(FakeStore::default());
        let (state, _) = state(ServerConfig::default(), provider(5, true), store.clone());

        let err = fetch_and_store(&state).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch(QuoteProviderError::UpstreamStatus(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upstream_slower_than_api_budget_fails_once() {
        let store = Arc::new(FakeStore::default());
        let (state, provider) = state(ServerConfig::default(), provider(500, false), store.clone());

        let started = std::time::Instant::now();
        let err = fetch_and_store(&state).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch(QuoteProviderError::DeadlineExceeded)));
        assert!(started.elapsed() < Duration::from_millis(450));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_slow_fetch_starves_database_step() {
        let config = ServerConfig {
            request_timeout: Duration::from_millis(200),
            upstream_timeout: Duration::from_secs(1),
            db_timeout: Duration::from_secs(10),
            ..ServerConfig::default()
        };
        let store = Arc::new(FakeStore {
            delay: Duration::from_millis(100),
            ..Default::default()
        });
        let (state, _) = state(config, provider(150, false), store.clone());

        let err = fetch_and_store(&state).await.unwrap_err();
        assert!(matches!(err, AppError::Persist(StoreError::DeadlineExceeded)), "got {:?}", err);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_slow_store_exceeds_db_budget() {
        let config = ServerConfig {
            db_timeout: Duration::from_millis(50),
            ..ServerConfig::default()
        };
        let store = Arc::new(FakeStore {
            delay: Duration::from_millis(300),
            ..Default::default()
        });
        let (state, _) = state(config, provider(5, false), store.clone());

        let err = fetch_and_store(&state).await.unwrap_err();
        assert!(matches!(err, AppError::Persist(StoreError::DeadlineExceeded)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_request_aborts_fetch() {
        let store = Arc::new(FakeStore::default());
        let (state, _) = state(ServerConfig::default(), provider(100, false), store.clone());

        let request = Deadline::root("request", Duration::from_secs(1));
        request.cancel();
        let err = fetch_and_store_within(&state, &request).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch(QuoteProviderError::Cancelled)));
    }
}
