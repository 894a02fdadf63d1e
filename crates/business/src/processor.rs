//! Withdrawal processor - approve, reject, process, complete, cancel
//!
//! Each transition is one `BEGIN IMMEDIATE` transaction: read the row,
//! check the move against the status machine, compare-and-set the new
//! status, append history, and for `complete` settle the balance. The
//! status-changed notification goes out only after commit.

use crate::error::{WithdrawalError, WithdrawalResult};
use crate::services::ServiceContext;
use chrono::{DateTime, Utc};
use rewards_core::{NotificationEvent, WithdrawalAction, WithdrawalRequest, WithdrawalStatus};
use rewards_persistence::{
    begin_write, DeductionRepo, HistoryRepo, LedgerEntryRow, LedgerRepo, StatusChange,
    StatusHistoryRow, StatusUpdate, WalletRepo, WithdrawalFilter, WithdrawalRepo,
};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;

/// Ledger type of the entry written when a withdrawal is paid out
pub const SETTLEMENT_TX_TYPE: &str = "withdrawal";

/// Withdrawal Processor - drives requests through the status machine
pub struct WithdrawalProcessor<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> WithdrawalProcessor<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// pending → approved
    pub async fn approve(
        &self,
        id: &str,
        actor: &str,
        notes: Option<&str>,
    ) -> WithdrawalResult<WithdrawalRequest> {
        self.apply(id, WithdrawalAction::Approve, actor, notes).await
    }

    /// pending → rejected, `reason` lands in `admin_notes`
    pub async fn reject(
        &self,
        id: &str,
        actor: &str,
        reason: &str,
    ) -> WithdrawalResult<WithdrawalRequest> {
        if reason.trim().is_empty() {
            return Err(WithdrawalError::InvalidRequest(
                "a rejection reason is required".to_string(),
            ));
        }
        self.apply(id, WithdrawalAction::Reject, actor, Some(reason)).await
    }

    /// approved → processing
    pub async fn begin_processing(
        &self,
        id: &str,
        actor: &str,
    ) -> WithdrawalResult<WithdrawalRequest> {
        self.apply(id, WithdrawalAction::BeginProcessing, actor, None).await
    }

    /// processing → completed, deducting the amount from the wallet once
    pub async fn complete(&self, id: &str, actor: &str) -> WithdrawalResult<WithdrawalRequest> {
        self.apply(id, WithdrawalAction::Complete, actor, None).await
    }

    /// pending | approved | processing → cancelled
    pub async fn cancel(
        &self,
        id: &str,
        actor: &str,
        reason: Option<&str>,
    ) -> WithdrawalResult<WithdrawalRequest> {
        self.apply(id, WithdrawalAction::Cancel, actor, reason).await
    }

    /// Apply `action` to withdrawal `id` on behalf of `actor`
    pub async fn apply(
        &self,
        id: &str,
        action: WithdrawalAction,
        actor: &str,
        notes: Option<&str>,
    ) -> WithdrawalResult<WithdrawalRequest> {
        if actor.trim().is_empty() {
            return Err(WithdrawalError::InvalidRequest("actor is required".to_string()));
        }
        let notes = notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);

        let mut tx = begin_write(self.ctx.pool()).await?;

        let current = WithdrawalRepo::find(&mut *tx, id)
            .await?
            .ok_or_else(|| WithdrawalError::NotFound(id.to_string()))?;
        let next = current
            .status
            .apply(action)
            .map_err(|e| WithdrawalError::from_core(id, e))?;

        let now = Utc::now();
        let stamp = action.records_processor();
        let update = StatusUpdate {
            id: id.to_string(),
            from: current.status,
            to: next,
            processed_by: stamp.then(|| actor.to_string()),
            processed_at: stamp.then_some(now),
            admin_notes: notes.clone(),
            updated_at: now,
        };

        if !WithdrawalRepo::transition(&mut *tx, &update).await? {
            // Someone else moved the row between our read and write
            let latest = WithdrawalRepo::find(&mut *tx, id)
                .await?
                .ok_or_else(|| WithdrawalError::NotFound(id.to_string()))?;
            return Err(WithdrawalError::InvalidTransition {
                id: id.to_string(),
                from: latest.status,
                action,
            });
        }

        HistoryRepo::append(&mut *tx, &StatusChange::transition(&update, actor, notes)).await?;

        if next == WithdrawalStatus::Completed {
            settle(&mut *tx, &current, now).await?;
        }

        let updated = WithdrawalRepo::find(&mut *tx, id)
            .await?
            .ok_or_else(|| WithdrawalError::NotFound(id.to_string()))?;
        tx.commit().await?;

        tracing::info!(
            withdrawal_id = %id,
            actor,
            action = action.as_str(),
            from = current.status.as_str(),
            to = next.as_str(),
            "withdrawal status changed"
        );

        self.ctx
            .notify(NotificationEvent::status_changed(&updated, current.status));

        Ok(updated)
    }

    /// Get a withdrawal by ID
    pub async fn get(&self, id: &str) -> WithdrawalResult<WithdrawalRequest> {
        Ok(WithdrawalRepo::get_by_id(self.ctx.pool(), id).await?)
    }

    /// List withdrawals, newest first
    pub async fn list(&self, filter: &WithdrawalFilter) -> WithdrawalResult<Vec<WithdrawalRequest>> {
        Ok(WithdrawalRepo::list(self.ctx.pool(), filter).await?)
    }

    /// Status trail of a withdrawal, oldest first
    pub async fn history(&self, id: &str) -> WithdrawalResult<Vec<StatusHistoryRow>> {
        // Surface NotFound rather than an empty trail
        WithdrawalRepo::get_by_id(self.ctx.pool(), id).await?;
        Ok(HistoryRepo::list(self.ctx.pool(), id).await?)
    }
}

/// Deduct the withdrawal amount from the user's wallet, at most once per
/// withdrawal id.
async fn settle(
    conn: &mut SqliteConnection,
    request: &WithdrawalRequest,
    at: DateTime<Utc>,
) -> WithdrawalResult<()> {
    let first = DeductionRepo::record(&mut *conn, &request.id, &request.user_id, request.amount).await?;
    if !first {
        tracing::warn!(withdrawal_id = %request.id, "deduction already recorded, balance left untouched");
        return Ok(());
    }

    match WalletRepo::debit(&mut *conn, &request.user_id, request.amount).await? {
        Some(balance) if balance < Decimal::ZERO => {
            tracing::warn!(
                withdrawal_id = %request.id,
                user_id = %request.user_id,
                balance = %balance,
                "wallet overdrawn by withdrawal, flagged for reconciliation"
            );
            WithdrawalRepo::flag_reconciliation(&mut *conn, &request.id).await?;
        }
        Some(balance) => {
            tracing::debug!(withdrawal_id = %request.id, balance = %balance, "wallet debited");
        }
        None => {
            tracing::warn!(
                withdrawal_id = %request.id,
                user_id = %request.user_id,
                "no wallet to debit, flagged for reconciliation"
            );
            WithdrawalRepo::flag_reconciliation(&mut *conn, &request.id).await?;
        }
    }

    let entry = LedgerEntryRow::new(
        &request.user_id,
        SETTLEMENT_TX_TYPE,
        request.amount,
        &request.id,
        format!("Withdrawal paid out via {}", request.payout_method),
        at,
    );
    LedgerRepo::insert(&mut *conn, &entry).await?;

    Ok(())
}
