use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, warn};

use rally_db::Database;

use crate::error::LedgerError;

/// Raw balance storage. Implementations are plain blocking calls; the
/// [`Ledger`] adds the retry discipline on top.
pub trait BalanceStore: Send + Sync {
    fn ensure(&self, user_id: &str) -> Result<()>;
    fn load(&self, user_id: &str) -> Result<Option<i64>>;
    fn store(&self, user_id: &str, points: i64) -> Result<()>;
    fn all(&self) -> Result<Vec<(String, i64)>>;
    fn top(&self, limit: u32) -> Result<Vec<(String, i64)>>;

    /// Whether `err` is transient lock contention worth retrying.
    fn is_contention(&self, err: &anyhow::Error) -> bool {
        rally_db::is_contention(err)
    }
}

impl BalanceStore for Database {
    fn ensure(&self, user_id: &str) -> Result<()> {
        self.ensure_balance(user_id)
    }

    fn load(&self, user_id: &str) -> Result<Option<i64>> {
        self.get_balance(user_id)
    }

    fn store(&self, user_id: &str, points: i64) -> Result<()> {
        self.set_balance(user_id, points)
    }

    fn all(&self) -> Result<Vec<(String, i64)>> {
        Ok(self
            .all_balances()?
            .into_iter()
            .map(|row| (row.user_id, row.points))
            .collect())
    }

    fn top(&self, limit: u32) -> Result<Vec<(String, i64)>> {
        Ok(self
            .top_balances(limit)?
            .into_iter()
            .map(|row| (row.user_id, row.points))
            .collect())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

/// Durable per-user point balances.
///
/// There is no transaction spanning [`Ledger::get`] and [`Ledger::set`]:
/// two callers doing read-add-write on the same user at the same time can
/// lose one of the updates. Callers that need exact accounting under
/// concurrent load must serialise per user themselves.
pub struct Ledger {
    store: Arc<dyn BalanceStore>,
    retry: RetryPolicy,
}

impl Ledger {
    pub fn new(store: Arc<dyn BalanceStore>) -> Self {
        Self::with_retry(store, RetryPolicy::default())
    }

    pub fn with_retry(store: Arc<dyn BalanceStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Create a zero balance if the user has none. Idempotent.
    pub async fn ensure(&self, user_id: &str) -> Result<(), LedgerError> {
        self.retrying("ensure", user_id, |store| store.ensure(user_id)).await
    }

    /// Stored balance, or 0 when the user has never been referenced.
    pub async fn get(&self, user_id: &str) -> Result<i64, LedgerError> {
        let points = self.retrying("get", user_id, |store| store.load(user_id)).await?;
        Ok(points.unwrap_or(0))
    }

    /// Overwrite a balance. Returns false (after logging) when the write
    /// could not be persisted.
    pub async fn set(&self, user_id: &str, points: i64) -> bool {
        match self.try_set(user_id, points).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to set balance of {} to {}: {}", user_id, points, e);
                false
            }
        }
    }

    pub async fn try_set(&self, user_id: &str, points: i64) -> Result<(), LedgerError> {
        self.retrying("set", user_id, |store| store.store(user_id, points)).await
    }

    pub async fn all(&self) -> Result<Vec<(String, i64)>, LedgerError> {
        self.retrying("scan", "*", |store| store.all()).await
    }

    pub async fn top(&self, limit: u32) -> Result<Vec<(String, i64)>, LedgerError> {
        self.retrying("top", "*", |store| store.top(limit)).await
    }

    async fn retrying<T, F>(&self, op: &'static str, user_id: &str, f: F) -> Result<T, LedgerError>
    where
        F: Fn(&dyn BalanceStore) -> Result<T>,
    {
        let attempts = self.retry.attempts.max(1);
        for attempt in 1..=attempts {
            match f(self.store.as_ref()) {
                Ok(value) => return Ok(value),
                Err(e) if self.store.is_contention(&e) => {
                    warn!(
                        "Ledger {} for {} contended (attempt {}/{}): {}",
                        op, user_id, attempt, attempts, e
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
                Err(e) => return Err(LedgerError::Storage(e)),
            }
        }

        Err(LedgerError::RetriesExhausted {
            op,
            user_id: user_id.to_string(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FlakyStore;

    fn ledger(store: Arc<dyn BalanceStore>) -> Ledger {
        Ledger::new(store)
    }

    #[tokio::test]
    async fn set_then_get_round_trips_any_value() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let ledger = ledger(db);

        for value in [0, 1, 250, -250, i64::MAX, i64::MIN] {
            assert!(ledger.set("alice", value).await);
            assert_eq!(ledger.get("alice").await.unwrap(), value);
        }
    }

    #[tokio::test]
    async fn unknown_user_reads_zero() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let ledger = ledger(db.clone());

        assert_eq!(ledger.get("ghost").await.unwrap(), 0);
        // get never creates a record
        assert_eq!(db.get_balance("ghost").unwrap(), None);

        ledger.ensure("ghost").await.unwrap();
        ledger.ensure("ghost").await.unwrap();
        assert_eq!(db.get_balance("ghost").unwrap(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn set_survives_fewer_than_five_contended_attempts() {
        for k in 0..5 {
            let store = Arc::new(FlakyStore::failing_writes(k));
            let ledger = ledger(store.clone());

            assert!(ledger.set("bob", 700 + k as i64).await, "k = {k}");
            assert_eq!(ledger.get("bob").await.unwrap(), 700 + k as i64);
            assert_eq!(store.write_attempts(), k + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn set_reports_failure_after_five_contended_attempts() {
        let store = Arc::new(FlakyStore::failing_writes(5));
        let ledger = ledger(store.clone());

        let started = tokio::time::Instant::now();
        assert!(!ledger.set("bob", 10).await);
        assert_eq!(store.write_attempts(), 5);
        // four fixed one-second pauses between five attempts
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert_eq!(ledger.get("bob").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn non_contention_errors_are_not_retried() {
        let store = Arc::new(FlakyStore::broken_writes());
        let ledger = ledger(store.clone());

        let err = ledger.try_set("bob", 10).await.unwrap_err();
        assert!(matches!(err, LedgerError::Storage(_)));
        assert_eq!(store.write_attempts(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sets_on_distinct_users_all_land() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let ledger = Arc::new(ledger(db.clone()));

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..64i64 {
            let ledger = ledger.clone();
            tasks.spawn(async move {
                let user = format!("user-{i}");
                ledger.ensure(&user).await.unwrap();
                assert!(ledger.set(&user, i * 10 - 200).await);
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap();
        }

        for i in 0..64i64 {
            assert_eq!(ledger.get(&format!("user-{i}")).await.unwrap(), i * 10 - 200);
        }
        assert_eq!(ledger.all().await.unwrap().len(), 64);
    }
}
