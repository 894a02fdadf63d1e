//! Withdrawal request commands

use anyhow::{Context, Result};
use rewards_business::{ServiceContext, WithdrawalIntake, WithdrawalProcessor};
use rewards_core::{BankDetails, NewWithdrawal, WithdrawalConfig, WithdrawalRequest};
use rewards_persistence::WithdrawalFilter;
use std::path::Path;
use std::time::Duration;

use crate::db;
use crate::WithdrawAction;

/// How long to wait for office notifications before exiting
const NOTIFY_GRACE: Duration = Duration::from_secs(5);

/// Handle withdraw subcommands
pub async fn handle(db_path: &Path, config: WithdrawalConfig, action: &WithdrawAction) -> Result<()> {
    let db = db::connect(db_path).await?;
    let ctx = ServiceContext::new(&db, config).context("Invalid notifier configuration")?;

    let result = run(&ctx, action).await;

    ctx.drain_notifications(NOTIFY_GRACE).await;
    db.close().await;
    result
}

async fn run(ctx: &ServiceContext, action: &WithdrawAction) -> Result<()> {
    let intake = WithdrawalIntake::new(ctx);
    let processor = WithdrawalProcessor::new(ctx);

    match action {
        WithdrawAction::Request {
            user,
            amount,
            method,
            bank_name,
            account_number,
            owner_name,
            account_type,
            branch_code,
            notes,
        } => {
            let mut input = NewWithdrawal::new(user, *amount, method.to_core_type());
            if bank_name.is_some() || account_number.is_some() || owner_name.is_some() {
                let mut details = BankDetails::new(
                    bank_name.as_deref().unwrap_or_default(),
                    account_number.as_deref().unwrap_or_default(),
                    owner_name.as_deref().unwrap_or_default(),
                );
                if let Some(account_type) = account_type {
                    details = details.with_account_type(account_type);
                }
                if let Some(branch_code) = branch_code {
                    details = details.with_branch_code(branch_code);
                }
                input = input.with_bank_details(details);
            }
            if let Some(notes) = notes {
                input = input.with_notes(notes);
            }

            let request = intake.submit(input).await?;
            println!("✅ Withdrawal request created");
            print_summary(&request);
            if request.needs_reconciliation {
                println!("   ⚠️  Balance could not be confirmed; flagged for reconciliation");
            }
        }

        WithdrawAction::Approve { id, by, notes } => {
            let request = processor.approve(id, by, notes.as_deref()).await?;
            println!("✅ Approved");
            print_summary(&request);
        }

        WithdrawAction::Reject { id, by, reason } => {
            let request = processor.reject(id, by, reason).await?;
            println!("🚫 Rejected");
            print_summary(&request);
        }

        WithdrawAction::Begin { id, by } => {
            let request = processor.begin_processing(id, by).await?;
            println!("⏳ Processing");
            print_summary(&request);
        }

        WithdrawAction::Complete { id, by } => {
            let request = processor.complete(id, by).await?;
            println!("✅ Completed");
            print_summary(&request);
            if request.needs_reconciliation {
                println!("   ⚠️  Wallet could not cover the payout; flagged for reconciliation");
            }
        }

        WithdrawAction::Cancel { id, by, reason } => {
            let request = processor.cancel(id, by, reason.as_deref()).await?;
            println!("🛑 Cancelled");
            print_summary(&request);
        }

        WithdrawAction::Show { id } => {
            let request = processor.get(id).await?;
            println!("{}", serde_json::to_string_pretty(&request)?);
        }

        WithdrawAction::List {
            user,
            status,
            limit,
        } => {
            let filter = WithdrawalFilter {
                user_id: user.clone(),
                status: status.map(|s| s.to_core_type()),
                limit: *limit,
            };
            let requests = processor.list(&filter).await?;
            list_requests(&requests);
        }

        WithdrawAction::History { id } => {
            let trail = processor.history(id).await?;
            println!("📜 History for {}", id);
            for entry in trail {
                println!(
                    "   {}  {:<10} → {:<10} by {:<16} {}",
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.from_status.as_deref().unwrap_or("-"),
                    entry.to_status,
                    entry.actor.as_deref().unwrap_or("-"),
                    entry.notes.as_deref().unwrap_or(""),
                );
            }
        }
    }

    Ok(())
}

fn print_summary(request: &WithdrawalRequest) {
    println!("   ID:     {}", request.id);
    println!("   User:   {}", request.user_id);
    println!("   Amount: {}", request.amount);
    println!("   Method: {}", request.payout_method);
    println!("   Status: {}", request.status);
    if let Some(notes) = &request.admin_notes {
        println!("   Notes:  {}", notes);
    }
}

fn list_requests(requests: &[WithdrawalRequest]) {
    if requests.is_empty() {
        println!("No withdrawal requests found");
        return;
    }

    println!(
        "{:<38} {:<16} {:>12} {:<14} {:<11} {}",
        "ID", "USER", "AMOUNT", "METHOD", "STATUS", "CREATED"
    );
    for r in requests {
        println!(
            "{:<38} {:<16} {:>12} {:<14} {:<11} {}{}",
            r.id,
            r.user_id,
            r.amount,
            r.payout_method.as_str(),
            r.status.as_str(),
            r.created_at.format("%Y-%m-%d %H:%M"),
            if r.needs_reconciliation { " ⚠️" } else { "" },
        );
    }
    println!();
    println!("{} request(s)", requests.len());
}
