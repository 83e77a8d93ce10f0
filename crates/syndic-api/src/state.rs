//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! - **Users** — the directory consulted for display names and legacy
//!   name resolution.
//! - **Accounts** — trading accounts and their current (`v2`) distribution
//!   configuration.
//! - **Ledgers** — distribution records, balances, and the growth fund.
//! - **Withdrawals** — client withdrawal requests.
//! - **Locks** — per-account and per-user async mutexes that serialize
//!   profit recording and withdrawal requests.
//!
//! In-memory stores use `parking_lot` locks and are never held across
//! `.await`. When a database pool is configured, every write is also
//! persisted and the stores are hydrated from it on startup.

use std::collections::HashMap;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use syndic_core::{AccountId, Role, UserId, ValidationError};
use syndic_distribution::{
    persist_distribution, AccountDistributionConfig, PoolFallback, UserDirectory,
};
use syndic_ledger::{debit_withdrawal, BalanceLedger, GrowthFundLedger, Withdrawal, WithdrawalStatus};
use utoipa::ToSchema;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
#[derive(Debug)]
pub struct Store<K, T> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Copy + Eq + Hash, T: Clone> Store<K, T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: K, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &K) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &K, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        let entry = guard.get_mut(id)?;
        f(entry);
        Some(entry.clone())
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure runs under a single write lock. Returns `None` if the
    /// record doesn't exist, or `Some(result)` with the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        id: &K,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Run a read-only closure over every record.
    pub fn with_all<R>(&self, f: impl FnOnce(&HashMap<K, T>) -> R) -> R {
        f(&self.data.read())
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Copy + Eq + Hash, T: Clone> Default for Store<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Keyed Async Locks --------------------------------------------------------

/// One async mutex per key, created on first use.
///
/// The map itself is behind a `parking_lot` mutex held only long enough to
/// fetch or create the entry; the returned guard is a `tokio` owned guard
/// that may be held across `.await`.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    locks: Arc<Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>>,
}

impl<K> Clone for KeyedLocks<K> {
    fn clone(&self) -> Self {
        Self {
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<K: Copy + Eq + Hash> KeyedLocks<K> {
    /// Empty lock table.
    pub fn new() -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: K) -> tokio::sync::OwnedMutexGuard<()> {
        let mutex = Arc::clone(self.locks.lock().entry(key).or_default());
        mutex.lock_owned().await
    }
}

impl<K: Copy + Eq + Hash> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes profit recording per account.
pub type AccountLocks = KeyedLocks<AccountId>;

// -- Records ------------------------------------------------------------------

/// A registered dashboard user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserRecord {
    #[schema(value_type = String, format = Uuid)]
    pub id: UserId,
    pub display_name: String,
    #[schema(value_type = String, example = "client")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A trading account and its distribution configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AccountRecord {
    #[schema(value_type = String, format = Uuid)]
    pub id: AccountId,
    pub name: String,
    /// Current-schema configuration. `None` until one is saved; profits
    /// cannot be recorded before then.
    #[schema(value_type = Option<Object>)]
    pub distribution: Option<AccountDistributionConfig>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Directory view over the user store.
impl UserDirectory for Store<UserId, UserRecord> {
    fn display_name(&self, user: &UserId) -> Option<String> {
        self.get(user).map(|u| u.display_name)
    }

    fn find_by_name(&self, name: &str) -> Option<UserId> {
        self.with_all(|users| {
            let mut matches = users
                .values()
                .filter(|u| u.display_name.trim().eq_ignore_ascii_case(name.trim()))
                .map(|u| u.id);
            let first = matches.next()?;
            matches.next().is_none().then_some(first)
        })
    }
}

// -- Application State --------------------------------------------------------

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer secret. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// What to do with an unfunded contributor pool.
    pub pool_fallback: PoolFallback,
}

impl AppConfig {
    /// Read `PORT`, `AUTH_TOKEN`, and `POOL_FALLBACK` from the environment.
    pub fn from_env() -> Result<Self, ValidationError> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let auth_token = std::env::var("AUTH_TOKEN").ok().filter(|t| !t.is_empty());
        let pool_fallback = match std::env::var("POOL_FALLBACK") {
            Ok(value) => PoolFallback::from_str(&value)?,
            Err(_) => PoolFallback::default(),
        };
        Ok(Self {
            port,
            auth_token,
            pool_fallback,
        })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("pool_fallback", &self.pool_fallback)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            pool_fallback: PoolFallback::default(),
        }
    }
}

/// Shared application state accessible to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub users: Store<UserId, UserRecord>,
    pub accounts: Store<AccountId, AccountRecord>,
    pub withdrawals: Store<syndic_core::WithdrawalId, Withdrawal>,

    /// Distribution records and per-user balances.
    pub ledger: Arc<BalanceLedger>,
    /// Growth-fund inflows.
    pub growth_fund: Arc<GrowthFundLedger>,

    /// Serializes profit recording per account.
    pub account_locks: AccountLocks,
    /// Serializes withdrawal requests per user so two concurrent requests
    /// cannot both reserve the same balance.
    pub user_locks: KeyedLocks<UserId>,

    /// PostgreSQL pool. `None` runs in-memory only.
    pub db_pool: Option<PgPool>,

    pub config: AppConfig,
}

impl AppState {
    /// In-memory state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// State with the given configuration and optional database pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            users: Store::new(),
            accounts: Store::new(),
            withdrawals: Store::new(),
            ledger: Arc::new(BalanceLedger::new()),
            growth_fund: Arc::new(GrowthFundLedger::new()),
            account_locks: AccountLocks::new(),
            user_locks: KeyedLocks::new(),
            db_pool,
            config,
        }
    }

    /// Withdrawals belonging to one user.
    pub fn withdrawals_for(&self, user: &UserId) -> Vec<Withdrawal> {
        self.withdrawals.with_all(|all| {
            let mut out: Vec<Withdrawal> =
                all.values().filter(|w| &w.user_id == user).cloned().collect();
            out.sort_by_key(|w| w.requested_at);
            out
        })
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Balances and the growth fund are not stored as totals: they are
    /// rebuilt by replaying every distribution record and every completed
    /// withdrawal through the ledgers. Idempotency keys make the replay
    /// safe to run on a non-empty ledger.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let users = crate::db::users::load_all(pool)
            .await
            .map_err(|e| format!("failed to load users: {e}"))?;
        let user_count = users.len();
        for record in users {
            self.users.insert(record.id, record);
        }

        let accounts = crate::db::accounts::load_all(pool)
            .await
            .map_err(|e| format!("failed to load accounts: {e}"))?;
        let account_count = accounts.len();
        for record in accounts {
            self.accounts.insert(record.id, record);
        }

        let records = crate::db::distributions::load_all(pool)
            .await
            .map_err(|e| format!("failed to load distributions: {e}"))?;
        let record_count = records.len();
        for record in &records {
            persist_distribution(record, self.ledger.as_ref(), self.growth_fund.as_ref())
                .map_err(|e| format!("failed to replay distribution {}: {e}", record.id))?;
        }

        let withdrawals = crate::db::withdrawals::load_all(pool)
            .await
            .map_err(|e| format!("failed to load withdrawals: {e}"))?;
        let withdrawal_count = withdrawals.len();
        for withdrawal in withdrawals {
            if withdrawal.status == WithdrawalStatus::Completed {
                debit_withdrawal(&withdrawal, self.ledger.as_ref())
                    .map_err(|e| format!("failed to replay withdrawal {}: {e}", withdrawal.id))?;
            }
            self.withdrawals.insert(withdrawal.id, withdrawal);
        }

        tracing::info!(
            users = user_count,
            accounts = account_count,
            distributions = record_count,
            withdrawals = withdrawal_count,
            "Hydrated in-memory stores from database"
        );

        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> UserRecord {
        UserRecord {
            id: UserId::new(),
            display_name: name.to_string(),
            role: Role::Client,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn store_insert_get_update() {
        let store: Store<UserId, UserRecord> = Store::new();
        assert!(store.is_empty());
        let alice = user("Alice");
        assert!(store.insert(alice.id, alice.clone()).is_none());
        assert_eq!(store.get(&alice.id), Some(alice.clone()));

        let updated = store
            .update(&alice.id, |u| u.display_name = "Alicia".into())
            .unwrap();
        assert_eq!(updated.display_name, "Alicia");
        assert!(store.update(&UserId::new(), |_| {}).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_try_update_propagates_closure_result() {
        let store: Store<UserId, UserRecord> = Store::new();
        let bob = user("Bob");
        store.insert(bob.id, bob.clone());
        let result: Option<Result<(), &str>> = store.try_update(&bob.id, |_| Err("nope"));
        assert_eq!(result, Some(Err("nope")));
    }

    #[test]
    fn user_store_is_a_directory() {
        let store: Store<UserId, UserRecord> = Store::new();
        let alice = user("Alice");
        store.insert(alice.id, alice.clone());
        assert_eq!(store.display_name(&alice.id).as_deref(), Some("Alice"));
        assert_eq!(store.find_by_name(" alice "), Some(alice.id));

        let twin = user("ALICE");
        store.insert(twin.id, twin);
        assert_eq!(store.find_by_name("alice"), None);
    }

    #[tokio::test]
    async fn keyed_locks_serialize_same_key() {
        let locks: AccountLocks = AccountLocks::new();
        let account = AccountId::new();
        let guard = locks.lock(account).await;
        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.lock(account).await;
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn keyed_locks_do_not_block_other_keys() {
        let locks: AccountLocks = AccountLocks::new();
        let _a = locks.lock(AccountId::new()).await;
        let _b = locks.lock(AccountId::new()).await;
    }

    #[test]
    fn config_debug_redacts_token() {
        let config = AppConfig {
            auth_token: Some("super-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
