//! Collision-checked generation of transaction references and account keys.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use vaultline_shared::types::OwnerId;

use super::error::LedgerError;
use super::store::{AccountStore, TransactionStore};

/// Upper bound on regeneration attempts before giving up.
pub const MAX_ATTEMPTS: usize = 64;

/// Produces reference candidates; uniqueness is checked by the generator.
pub trait ReferenceSource: Send + Sync {
    /// Next transaction-reference candidate.
    fn transaction_reference(&self, now: DateTime<Utc>) -> String;

    /// Next account-key candidate for `owner_id`.
    fn account_key(&self, owner_id: OwnerId, now: DateTime<Utc>) -> String;
}

/// `TXN-<yyyymmddHHMMSS>-<8 hex>` and `ACC-<yyyymmddHHMMSS>-<6 hex of owner>-<6 hex>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampedSource;

fn random_hex(len: usize) -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(len);
    hex.to_uppercase()
}

impl ReferenceSource for TimestampedSource {
    fn transaction_reference(&self, now: DateTime<Utc>) -> String {
        format!("TXN-{}-{}", now.format("%Y%m%d%H%M%S"), random_hex(8))
    }

    fn account_key(&self, owner_id: OwnerId, now: DateTime<Utc>) -> String {
        let mut owner = owner_id.into_inner().simple().to_string();
        owner.truncate(6);
        format!(
            "ACC-{}-{}-{}",
            now.format("%Y%m%d%H%M%S"),
            owner.to_uppercase(),
            random_hex(6)
        )
    }
}

/// Retries a candidate source until the store reports no collision.
#[derive(Clone)]
pub struct ReferenceGenerator {
    source: Arc<dyn ReferenceSource>,
}

impl std::fmt::Debug for ReferenceGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceGenerator").finish_non_exhaustive()
    }
}

impl Default for ReferenceGenerator {
    fn default() -> Self {
        Self::new(Arc::new(TimestampedSource))
    }
}

impl ReferenceGenerator {
    /// Creates a generator over `source`.
    #[must_use]
    pub fn new(source: Arc<dyn ReferenceSource>) -> Self {
        Self { source }
    }

    /// A transaction reference not yet used by any leg.
    ///
    /// # Errors
    ///
    /// `Persistence` if the store fails or every attempt collided.
    pub async fn transaction_reference<S: TransactionStore>(
        &self,
        store: &S,
        now: DateTime<Utc>,
    ) -> Result<String, LedgerError> {
        unique(
            || self.source.transaction_reference(now),
            |candidate| async move { store.reference_exists(&candidate).await },
        )
        .await
    }

    /// An account key not yet taken.
    ///
    /// # Errors
    ///
    /// `Persistence` if the store fails or every attempt collided.
    pub async fn account_key<S: AccountStore>(
        &self,
        store: &S,
        owner_id: OwnerId,
        now: DateTime<Utc>,
    ) -> Result<String, LedgerError> {
        unique(
            || self.source.account_key(owner_id, now),
            |candidate| async move { store.account_key_exists(&candidate).await },
        )
        .await
    }
}

async fn unique<C, E, Fut>(mut candidate: C, exists: E) -> Result<String, LedgerError>
where
    C: FnMut() -> String,
    E: Fn(String) -> Fut,
    Fut: Future<Output = Result<bool, LedgerError>>,
{
    for _ in 0..MAX_ATTEMPTS {
        let next = candidate();
        if !exists(next.clone()).await? {
            return Ok(next);
        }
        tracing::debug!(candidate = %next, "reference collision, regenerating");
    }
    Err(LedgerError::persistence(format!(
        "no unique reference after {MAX_ATTEMPTS} attempts"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::store::{LedgerStore, TransactionStore};
    use crate::ledger::types::{TransactionRecord, TransactionType};
    use crate::testing::MemoryStore;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;
    use vaultline_shared::types::AccountId;

    /// Replays a fixed list of candidates, then falls back to a counter.
    struct ScriptedSource {
        script: Mutex<Vec<String>>,
        counter: Mutex<u32>,
    }

    impl ScriptedSource {
        fn new(script: Vec<String>) -> Self {
            let mut script = script;
            script.reverse();
            Self {
                script: Mutex::new(script),
                counter: Mutex::new(0),
            }
        }
    }

    impl ReferenceSource for ScriptedSource {
        fn transaction_reference(&self, _now: DateTime<Utc>) -> String {
            if let Some(next) = self.script.lock().unwrap().pop() {
                return next;
            }
            let mut counter = self.counter.lock().unwrap();
            *counter += 1;
            format!("TXN-FRESH-{counter}")
        }

        fn account_key(&self, _owner_id: OwnerId, now: DateTime<Utc>) -> String {
            self.transaction_reference(now).replace("TXN", "ACC")
        }
    }

    #[test]
    fn test_timestamped_formats() {
        let now = DateTime::parse_from_rfc3339("2026-03-04T05:06:07Z")
            .unwrap()
            .with_timezone(&Utc);
        let reference = TimestampedSource.transaction_reference(now);
        assert!(reference.starts_with("TXN-20260304050607-"));
        let suffix = reference.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));

        let owner = OwnerId::from_uuid(Uuid::parse_str("abcdef01-0000-7000-8000-000000000000").unwrap());
        let key = TimestampedSource.account_key(owner, now);
        assert!(key.starts_with("ACC-20260304050607-ABCDEF-"));
        assert_eq!(key.len(), "ACC-20260304050607-ABCDEF-".len() + 6);
    }

    #[tokio::test]
    async fn test_skips_colliding_candidates() {
        let store = MemoryStore::default();
        let uow = store.begin().await.unwrap();
        let taken: Vec<String> = (0..10).map(|i| format!("TXN-TAKEN-{i}")).collect();
        for reference in &taken {
            let record = TransactionRecord::pending(
                AccountId::new(),
                TransactionType::Credit,
                dec!(1),
                reference.clone(),
                Utc::now(),
            );
            uow.insert_transaction(&record).await.unwrap();
        }

        let generator = ReferenceGenerator::new(Arc::new(ScriptedSource::new(taken.clone())));
        let reference = generator.transaction_reference(&uow, Utc::now()).await.unwrap();

        assert!(!taken.contains(&reference));
        assert!(!uow.reference_exists(&reference).await.unwrap());
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let store = MemoryStore::default();
        let uow = store.begin().await.unwrap();
        let record = TransactionRecord::pending(
            AccountId::new(),
            TransactionType::Credit,
            dec!(1),
            "TXN-SAME",
            Utc::now(),
        );
        uow.insert_transaction(&record).await.unwrap();

        let script = vec!["TXN-SAME".to_string(); MAX_ATTEMPTS];
        let generator = ReferenceGenerator::new(Arc::new(ScriptedSource::new(script)));
        let err = generator.transaction_reference(&uow, Utc::now()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Persistence(_)));
    }
}
