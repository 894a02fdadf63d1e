//! Repository implementations for SQLite
//!
//! Queries for withdrawals, wallets, the ledger, deductions and history.
//! Writes take a `&mut SqliteConnection` so callers can group them in a
//! transaction (`&mut *tx`); reads take the pool.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::*;
use chrono::{DateTime, Utc};
use rewards_core::{WithdrawalRequest, WithdrawalStatus};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::str::FromStr;
use std::time::Duration;

/// How long a writer waits for another connection's write lock
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Withdrawal Repository
// ============================================================================

/// Filter for listing withdrawals
#[derive(Debug, Clone, Default)]
pub struct WithdrawalFilter {
    pub user_id: Option<String>,
    pub status: Option<WithdrawalStatus>,
    pub limit: Option<i64>,
}

impl WithdrawalFilter {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: WithdrawalStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Repository for the withdrawal_requests table
pub struct WithdrawalRepo;

impl WithdrawalRepo {
    /// Insert a new request
    pub async fn insert(
        conn: &mut SqliteConnection,
        request: &WithdrawalRequest,
    ) -> PersistenceResult<()> {
        let row = WithdrawalRow::from(request);
        sqlx::query(
            r#"
            INSERT INTO withdrawal_requests (
                id, user_id, amount, payout_method, bank_name, account_number, owner_name,
                account_type, branch_code, status, admin_notes, notes, processed_by,
                processed_at, needs_reconciliation, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.user_id)
        .bind(&row.amount)
        .bind(&row.payout_method)
        .bind(&row.bank_name)
        .bind(&row.account_number)
        .bind(&row.owner_name)
        .bind(&row.account_type)
        .bind(&row.branch_code)
        .bind(&row.status)
        .bind(&row.admin_notes)
        .bind(&row.notes)
        .bind(&row.processed_by)
        .bind(row.processed_at)
        .bind(row.needs_reconciliation)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Get a request by ID
    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> PersistenceResult<WithdrawalRequest> {
        let mut conn = pool.acquire().await?;
        Self::find(&mut conn, id)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Withdrawal", id))
    }

    /// Look up a request by ID on an open connection
    pub async fn find(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> PersistenceResult<Option<WithdrawalRequest>> {
        let row = sqlx::query_as::<_, WithdrawalRow>(
            "SELECT * FROM withdrawal_requests WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;
        row.map(WithdrawalRequest::try_from).transpose()
    }

    /// List requests, newest first
    pub async fn list(
        pool: &SqlitePool,
        filter: &WithdrawalFilter,
    ) -> PersistenceResult<Vec<WithdrawalRequest>> {
        let rows = sqlx::query_as::<_, WithdrawalRow>(
            r#"
            SELECT * FROM withdrawal_requests
            WHERE (?1 IS NULL OR user_id = ?1)
              AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC
            LIMIT ?3
            "#,
        )
        .bind(&filter.user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.limit.unwrap_or(-1))
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(WithdrawalRequest::try_from).collect()
    }

    /// Count requests per status
    pub async fn count_by_status(
        pool: &SqlitePool,
    ) -> PersistenceResult<Vec<(WithdrawalStatus, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM withdrawal_requests GROUP BY status ORDER BY status",
        )
        .fetch_all(pool)
        .await?;

        rows.into_iter()
            .map(|(status, count)| {
                WithdrawalStatus::from_str(&status)
                    .map(|s| (s, count))
                    .map_err(|_| PersistenceError::invalid_enum("status", &status))
            })
            .collect()
    }

    /// Compare-and-set status update.
    ///
    /// Returns `false` when the row is missing or no longer in `update.from`.
    pub async fn transition(
        conn: &mut SqliteConnection,
        update: &StatusUpdate,
    ) -> PersistenceResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE withdrawal_requests SET
                status = ?,
                processed_by = COALESCE(?, processed_by),
                processed_at = COALESCE(?, processed_at),
                admin_notes = COALESCE(?, admin_notes),
                updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(update.to.as_str())
        .bind(&update.processed_by)
        .bind(update.processed_at)
        .bind(&update.admin_notes)
        .bind(update.updated_at)
        .bind(&update.id)
        .bind(update.from.as_str())
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Mark a request for manual reconciliation
    pub async fn flag_reconciliation(conn: &mut SqliteConnection, id: &str) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE withdrawal_requests SET needs_reconciliation = 1 WHERE id = ?",
        )
        .bind(id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Withdrawal", id));
        }
        Ok(())
    }
}

// ============================================================================
// Wallet Repository
// ============================================================================

/// Repository for the wallets table (the balance source)
pub struct WalletRepo;

impl WalletRepo {
    /// Get a user's wallet
    pub async fn get(pool: &SqlitePool, user_id: &str) -> PersistenceResult<Option<WalletRow>> {
        let row = sqlx::query_as::<_, WalletRow>("SELECT * FROM wallets WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    /// Current balance, `None` when the user has no wallet
    pub async fn balance(pool: &SqlitePool, user_id: &str) -> PersistenceResult<Option<Decimal>> {
        Self::get(pool, user_id)
            .await?
            .map(|row| row.balance())
            .transpose()
    }

    /// Upsert balance
    pub async fn set_balance(
        pool: &SqlitePool,
        user_id: &str,
        balance: Decimal,
    ) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wallets (user_id, balance, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                balance = excluded.balance,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(balance.to_string())
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Subtract `amount` from the balance.
    ///
    /// Returns the new balance, or `None` when the user has no wallet.
    /// The result may be negative; callers decide what that means.
    pub async fn debit(
        conn: &mut SqliteConnection,
        user_id: &str,
        amount: Decimal,
    ) -> PersistenceResult<Option<Decimal>> {
        let current = sqlx::query_as::<_, WalletRow>("SELECT * FROM wallets WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;

        let Some(current) = current else {
            return Ok(None);
        };

        let new_balance = current.balance()? - amount;
        sqlx::query("UPDATE wallets SET balance = ?, updated_at = ? WHERE user_id = ?")
            .bind(new_balance.to_string())
            .bind(Utc::now())
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        Ok(Some(new_balance))
    }
}

// ============================================================================
// Ledger Repository
// ============================================================================

/// Repository for the wallet_transactions table
pub struct LedgerRepo;

impl LedgerRepo {
    /// Append a ledger entry
    pub async fn insert(conn: &mut SqliteConnection, entry: &LedgerEntryRow) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wallet_transactions (id, user_id, tx_type, amount, reference_id, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(&entry.tx_type)
        .bind(&entry.amount)
        .bind(&entry.reference_id)
        .bind(&entry.description)
        .bind(entry.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Entries referencing a withdrawal, oldest first
    pub async fn get_by_reference(
        pool: &SqlitePool,
        reference_id: &str,
    ) -> PersistenceResult<Vec<LedgerEntryRow>> {
        let rows = sqlx::query_as::<_, LedgerEntryRow>(
            "SELECT * FROM wallet_transactions WHERE reference_id = ? ORDER BY created_at ASC",
        )
        .bind(reference_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Entries for a user, newest first
    pub async fn get_by_user(
        pool: &SqlitePool,
        user_id: &str,
    ) -> PersistenceResult<Vec<LedgerEntryRow>> {
        let rows = sqlx::query_as::<_, LedgerEntryRow>(
            "SELECT * FROM wallet_transactions WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}

// ============================================================================
// Deduction Repository
// ============================================================================

/// Repository for the withdrawal_deductions table
pub struct DeductionRepo;

impl DeductionRepo {
    /// Record the deduction for a withdrawal.
    ///
    /// Returns `false` if one was already recorded, in which case the
    /// balance must not be touched again.
    pub async fn record(
        conn: &mut SqliteConnection,
        withdrawal_id: &str,
        user_id: &str,
        amount: Decimal,
    ) -> PersistenceResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO withdrawal_deductions (withdrawal_id, user_id, amount, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(withdrawal_id)
        .bind(user_id)
        .bind(amount.to_string())
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get(
        pool: &SqlitePool,
        withdrawal_id: &str,
    ) -> PersistenceResult<Option<DeductionRow>> {
        let row = sqlx::query_as::<_, DeductionRow>(
            "SELECT * FROM withdrawal_deductions WHERE withdrawal_id = ?",
        )
        .bind(withdrawal_id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Number of deductions recorded for a withdrawal (0 or 1)
    pub async fn count(pool: &SqlitePool, withdrawal_id: &str) -> PersistenceResult<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM withdrawal_deductions WHERE withdrawal_id = ?")
                .bind(withdrawal_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Status History Repository
// ============================================================================

/// Repository for the withdrawal_status_history table
pub struct HistoryRepo;

impl HistoryRepo {
    pub async fn append(conn: &mut SqliteConnection, change: &StatusChange) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO withdrawal_status_history (withdrawal_id, from_status, to_status, actor, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&change.withdrawal_id)
        .bind(change.from.map(|s| s.as_str()))
        .bind(change.to.as_str())
        .bind(&change.actor)
        .bind(&change.notes)
        .bind(change.at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Full trail for a withdrawal, in the order it happened
    pub async fn list(
        pool: &SqlitePool,
        withdrawal_id: &str,
    ) -> PersistenceResult<Vec<StatusHistoryRow>> {
        let rows = sqlx::query_as::<_, StatusHistoryRow>(
            "SELECT * FROM withdrawal_status_history WHERE withdrawal_id = ? ORDER BY id ASC",
        )
        .bind(withdrawal_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}

impl StatusChange {
    pub fn created(request: &WithdrawalRequest) -> Self {
        Self {
            withdrawal_id: request.id.clone(),
            from: None,
            to: request.status,
            actor: Some(request.user_id.clone()),
            notes: request.notes.clone(),
            at: request.created_at,
        }
    }

    pub fn transition(update: &StatusUpdate, actor: &str, notes: Option<String>) -> Self {
        Self {
            withdrawal_id: update.id.clone(),
            from: Some(update.from),
            to: update.to,
            actor: Some(actor.to_string()),
            notes,
            at: update.updated_at,
        }
    }
}

impl LedgerEntryRow {
    pub fn new(
        user_id: &str,
        tx_type: &str,
        amount: Decimal,
        reference_id: &str,
        description: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            tx_type: tx_type.to_string(),
            amount: amount.to_string(),
            reference_id: Some(reference_id.to_string()),
            description: Some(description),
            created_at,
        }
    }
}

// ============================================================================
// Database initialization
// ============================================================================

/// Create a connection pool
pub async fn create_pool(database_url: &str) -> PersistenceResult<SqlitePool> {
    let pool = SqlitePool::connect(database_url).await?;
    Ok(pool)
}

/// Begin a transaction that takes the write lock up front.
///
/// A deferred transaction that reads before writing cannot upgrade its lock
/// while another connection is writing and fails with `SQLITE_BUSY` without
/// waiting. `BEGIN IMMEDIATE` waits on the busy timeout instead.
pub async fn begin_write(pool: &SqlitePool) -> PersistenceResult<Transaction<'static, Sqlite>> {
    let tx = pool.begin_with("BEGIN IMMEDIATE").await?;
    Ok(tx)
}

/// Run migrations
pub async fn run_migrations(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Open (creating if needed) a database and bring its schema up to date
pub async fn init_database(database_url: &str) -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePool::connect_with(options).await?;

    run_migrations(&pool).await?;
    tracing::debug!(url = database_url, "database ready");

    Ok(pool)
}

/// Migrated in-memory database on a single long-lived connection.
///
/// SQLite gives every connection its own `:memory:` database, so the pool
/// must never open a second one.
pub async fn memory_pool() -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewards_core::{NewWithdrawal, PayoutMethod};
    use rust_decimal_macros::dec;

    async fn insert_pending(pool: &SqlitePool, user: &str, amount: Decimal) -> WithdrawalRequest {
        let input = NewWithdrawal::new(user, amount, PayoutMethod::Cash);
        let request = WithdrawalRequest::pending(&input, amount, false);
        let mut conn = pool.acquire().await.unwrap();
        WithdrawalRepo::insert(&mut conn, &request).await.unwrap();
        request
    }

    fn update(id: &str, from: WithdrawalStatus, to: WithdrawalStatus) -> StatusUpdate {
        StatusUpdate {
            id: id.to_string(),
            from,
            to,
            processed_by: Some("admin-1".to_string()),
            processed_at: Some(Utc::now()),
            admin_notes: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let pool = memory_pool().await.unwrap();
        let request = insert_pending(&pool, "user-1", dec!(75.00)).await;

        let loaded = WithdrawalRepo::get_by_id(&pool, &request.id).await.unwrap();
        assert_eq!(loaded.amount, dec!(75.00));
        assert_eq!(loaded.status, WithdrawalStatus::Pending);
        assert_eq!(loaded.owner_name, "Cash Payment");

        let missing = WithdrawalRepo::get_by_id(&pool, "nope").await;
        assert!(matches!(missing, Err(e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_set() {
        let pool = memory_pool().await.unwrap();
        let request = insert_pending(&pool, "user-1", dec!(80)).await;
        let mut conn = pool.acquire().await.unwrap();

        let approve = update(&request.id, WithdrawalStatus::Pending, WithdrawalStatus::Approved);
        assert!(WithdrawalRepo::transition(&mut conn, &approve).await.unwrap());
        // Same write again: row is no longer pending
        assert!(!WithdrawalRepo::transition(&mut conn, &approve).await.unwrap());

        let loaded = WithdrawalRepo::find(&mut conn, &request.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, WithdrawalStatus::Approved);
        assert_eq!(loaded.processed_by.as_deref(), Some("admin-1"));
        assert!(loaded.processed_at.is_some());
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let pool = memory_pool().await.unwrap();
        let a = insert_pending(&pool, "user-1", dec!(60)).await;
        insert_pending(&pool, "user-1", dec!(70)).await;
        insert_pending(&pool, "user-2", dec!(90)).await;

        let mut conn = pool.acquire().await.unwrap();
        let cancel = update(&a.id, WithdrawalStatus::Pending, WithdrawalStatus::Cancelled);
        WithdrawalRepo::transition(&mut conn, &cancel).await.unwrap();
        drop(conn);

        let user1 = WithdrawalRepo::list(&pool, &WithdrawalFilter::for_user("user-1"))
            .await
            .unwrap();
        assert_eq!(user1.len(), 2);

        let pending = WithdrawalRepo::list(
            &pool,
            &WithdrawalFilter::default().with_status(WithdrawalStatus::Pending),
        )
        .await
        .unwrap();
        assert_eq!(pending.len(), 2);

        let limited = WithdrawalRepo::list(&pool, &WithdrawalFilter::default().with_limit(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);

        let counts = WithdrawalRepo::count_by_status(&pool).await.unwrap();
        assert!(counts.contains(&(WithdrawalStatus::Pending, 2)));
        assert!(counts.contains(&(WithdrawalStatus::Cancelled, 1)));
    }

    #[tokio::test]
    async fn test_wallet_debit() {
        let pool = memory_pool().await.unwrap();
        WalletRepo::set_balance(&pool, "user-1", dec!(100)).await.unwrap();
        assert_eq!(WalletRepo::balance(&pool, "user-1").await.unwrap(), Some(dec!(100)));
        assert_eq!(WalletRepo::balance(&pool, "ghost").await.unwrap(), None);

        let mut conn = pool.acquire().await.unwrap();
        let after = WalletRepo::debit(&mut conn, "user-1", dec!(75)).await.unwrap();
        assert_eq!(after, Some(dec!(25)));
        assert_eq!(WalletRepo::debit(&mut conn, "ghost", dec!(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_deduction_recorded_once() {
        let pool = memory_pool().await.unwrap();
        let request = insert_pending(&pool, "user-1", dec!(75)).await;
        let mut conn = pool.acquire().await.unwrap();

        assert!(DeductionRepo::record(&mut conn, &request.id, "user-1", dec!(75)).await.unwrap());
        assert!(!DeductionRepo::record(&mut conn, &request.id, "user-1", dec!(75)).await.unwrap());
        drop(conn);

        assert_eq!(DeductionRepo::count(&pool, &request.id).await.unwrap(), 1);
        let row = DeductionRepo::get(&pool, &request.id).await.unwrap().unwrap();
        assert_eq!(row.amount().unwrap(), dec!(75));
    }

    #[tokio::test]
    async fn test_history_in_order() {
        let pool = memory_pool().await.unwrap();
        let request = insert_pending(&pool, "user-1", dec!(75)).await;
        let mut conn = pool.acquire().await.unwrap();

        HistoryRepo::append(&mut conn, &StatusChange::created(&request)).await.unwrap();
        let approve = update(&request.id, WithdrawalStatus::Pending, WithdrawalStatus::Approved);
        HistoryRepo::append(&mut conn, &StatusChange::transition(&approve, "admin-1", None))
            .await
            .unwrap();
        drop(conn);

        let history = HistoryRepo::list(&pool, &request.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].from_status, None);
        assert_eq!(history[0].to_status, "pending");
        assert_eq!(history[1].from_status.as_deref(), Some("pending"));
        assert_eq!(history[1].actor.as_deref(), Some("admin-1"));
    }

    #[tokio::test]
    async fn test_ledger_by_reference() {
        let pool = memory_pool().await.unwrap();
        let request = insert_pending(&pool, "user-1", dec!(75)).await;
        let entry = LedgerEntryRow::new(
            "user-1",
            "withdrawal_request",
            Decimal::ZERO,
            &request.id,
            "Withdrawal requested".to_string(),
            Utc::now(),
        );
        let mut conn = pool.acquire().await.unwrap();
        LedgerRepo::insert(&mut conn, &entry).await.unwrap();
        drop(conn);

        let entries = LedgerRepo::get_by_reference(&pool, &request.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount().unwrap(), Decimal::ZERO);
        assert_eq!(LedgerRepo::get_by_user(&pool, "user-1").await.unwrap().len(), 1);
    }
}
