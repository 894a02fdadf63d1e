//! Database initialization and status

use anyhow::{bail, Context, Result};
use rewards_persistence::{Database, WithdrawalRepo};
use std::path::Path;

fn database_url(db_path: &Path) -> String {
    format!("sqlite:{}", db_path.display())
}

/// Initialize the database with schema
pub async fn init_database(db_path: &Path, force: bool) -> Result<()> {
    if force && db_path.exists() {
        std::fs::remove_file(db_path).context("Failed to remove existing database")?;
        println!("🗑️  Removed existing database");
    }

    let db = Database::init(&database_url(db_path))
        .await
        .context("Failed to initialize database")?;
    db.close().await;
    Ok(())
}

/// Open an initialized database
pub async fn connect(db_path: &Path) -> Result<Database> {
    if !db_path.exists() {
        bail!(
            "Database not found at {:?}. Run 'rewards init' first.",
            db_path
        );
    }
    // Picks up migrations added since the last `init`
    Database::init(&database_url(db_path))
        .await
        .context("Failed to connect to database")
}

/// Show database status
pub async fn show_status(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        println!("❌ Database not found at {:?}", db_path);
        println!("   Run 'rewards init' to create the database");
        return Ok(());
    }

    let db = connect(db_path).await?;

    println!("📊 Database Status");
    println!("   Path: {:?}", db_path);
    println!();

    let wallets: (i64,) = count_rows(&db, "SELECT COUNT(*) FROM wallets").await?;
    let ledger: (i64,) = count_rows(&db, "SELECT COUNT(*) FROM wallet_transactions").await?;
    println!("   Wallets:      {}", wallets.0);
    println!("   Ledger rows:  {}", ledger.0);
    println!();

    let counts = WithdrawalRepo::count_by_status(db.pool()).await?;
    if counts.is_empty() {
        println!("   No withdrawal requests yet");
    } else {
        println!("   Withdrawals by status:");
        for (status, count) in counts {
            println!("     {:<12} {}", status.as_str(), count);
        }
    }

    db.close().await;
    Ok(())
}

async fn count_rows(db: &Database, sql: &'static str) -> Result<(i64,)> {
    let row = sqlx::query_as(sql).fetch_one(db.pool()).await?;
    Ok(row)
}
