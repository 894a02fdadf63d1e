//! Withdrawal intake - validate a request and persist it as `pending`

use crate::error::{WithdrawalError, WithdrawalResult};
use crate::services::ServiceContext;
use rewards_core::{NewWithdrawal, NotificationEvent, WithdrawalRequest};
use rewards_persistence::{
    begin_write, HistoryRepo, LedgerEntryRow, LedgerRepo, StatusChange, WalletRepo,
    WithdrawalRepo,
};
use rust_decimal::Decimal;

/// Ledger type of the zero-amount entry written at intake
pub const ADVISORY_TX_TYPE: &str = "withdrawal_request";

/// Outcome of the pre-insert balance check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceCheck {
    Sufficient(Decimal),
    /// Lookup failed or the user has no wallet row
    Unknown,
}

/// Withdrawal Intake - handles new withdrawal requests
pub struct WithdrawalIntake<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> WithdrawalIntake<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Validate and persist a withdrawal request.
    ///
    /// Checks run fail-fast: required fields, bank details, minimum, then
    /// balance. A balance that cannot be read lets the request through
    /// flagged for reconciliation; only a balance known to be short
    /// rejects it.
    pub async fn submit(&self, input: NewWithdrawal) -> WithdrawalResult<WithdrawalRequest> {
        let amount = input.validate(self.ctx.config())?;

        let needs_reconciliation = match self.check_balance(&input.user_id, amount).await? {
            BalanceCheck::Sufficient(_) => false,
            BalanceCheck::Unknown => true,
        };

        let request = WithdrawalRequest::pending(&input, amount, needs_reconciliation);

        let mut tx = begin_write(self.ctx.pool()).await?;
        WithdrawalRepo::insert(&mut *tx, &request).await?;
        HistoryRepo::append(&mut *tx, &StatusChange::created(&request)).await?;
        let advisory = LedgerEntryRow::new(
            &request.user_id,
            ADVISORY_TX_TYPE,
            Decimal::ZERO,
            &request.id,
            format!("Withdrawal request {} via {}", request.amount, request.payout_method),
            request.created_at,
        );
        LedgerRepo::insert(&mut *tx, &advisory).await?;
        tx.commit().await?;

        tracing::info!(
            withdrawal_id = %request.id,
            user_id = %request.user_id,
            amount = %request.amount,
            payout_method = %request.payout_method,
            needs_reconciliation,
            "withdrawal request created"
        );

        self.ctx.notify(NotificationEvent::created(&request));

        Ok(request)
    }

    /// Best-effort balance check.
    ///
    /// Errors from the balance source are downgraded to `Unknown`; only a
    /// successful read below `amount` is an error.
    pub async fn check_balance(
        &self,
        user_id: &str,
        amount: Decimal,
    ) -> WithdrawalResult<BalanceCheck> {
        match WalletRepo::balance(self.ctx.pool(), user_id.trim()).await {
            Ok(Some(available)) if available < amount => {
                Err(WithdrawalError::insufficient_balance(amount, available))
            }
            Ok(Some(available)) => Ok(BalanceCheck::Sufficient(available)),
            Ok(None) => {
                tracing::warn!(user_id, "no wallet found, accepting withdrawal for manual reconciliation");
                Ok(BalanceCheck::Unknown)
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "balance lookup failed, accepting withdrawal for manual reconciliation");
                Ok(BalanceCheck::Unknown)
            }
        }
    }
}
