//! Wallet balance commands

use anyhow::{bail, Result};
use rewards_persistence::{Database, LedgerRepo, WalletRepo};
use rust_decimal::Decimal;
use std::path::Path;

use crate::db;
use crate::WalletAction;

/// Handle wallet subcommands
pub async fn handle(db_path: &Path, action: &WalletAction) -> Result<()> {
    let db = db::connect(db_path).await?;

    let result = match action {
        WalletAction::Set { user_id, balance } => set_balance(&db, user_id, *balance).await,
        WalletAction::Show { user_id } => show_wallet(&db, user_id).await,
    };

    db.close().await;
    result
}

async fn set_balance(db: &Database, user_id: &str, balance: Decimal) -> Result<()> {
    if user_id.trim().is_empty() {
        bail!("user id is required");
    }
    WalletRepo::set_balance(db.pool(), user_id, balance).await?;
    tracing::info!(user_id, balance = %balance, "wallet balance set");
    println!("✅ Balance for {} set to {}", user_id, balance);
    Ok(())
}

async fn show_wallet(db: &Database, user_id: &str) -> Result<()> {
    let Some(wallet) = WalletRepo::get(db.pool(), user_id).await? else {
        println!("❌ No wallet for {}", user_id);
        return Ok(());
    };

    println!("💰 Wallet {}", user_id);
    println!("   Balance: {}", wallet.balance()?);
    println!("   Updated: {}", wallet.updated_at.format("%Y-%m-%d %H:%M:%S"));

    let entries = LedgerRepo::get_by_user(db.pool(), user_id).await?;
    if !entries.is_empty() {
        println!();
        println!("   {:<20} {:>12}  {:<38} {}", "TYPE", "AMOUNT", "REFERENCE", "WHEN");
        for entry in entries {
            println!(
                "   {:<20} {:>12}  {:<38} {}",
                entry.tx_type,
                entry.amount()?,
                entry.reference_id.as_deref().unwrap_or("-"),
                entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            );
        }
    }
    Ok(())
}
