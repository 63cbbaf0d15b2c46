//! `sync` command.

use anyhow::Result;
use clap::Subcommand;
use serde_json::json;

use twinsync::config::TwinConfig;
use twinsync::sync::{NotifyLevel, TwinSync};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Leave a message for the twin; parsed as JSON when possible
    Send { message: String },
    /// Read the twin's unread message, if any
    Receive,
    /// Add an owner notification
    Notify {
        message: String,
        #[arg(long, default_value = "info")]
        level: NotifyLevel,
    },
    /// git add, commit, and push the workspace
    Git,
    /// Send status, receive, push, and notify
    Daily,
    /// Show the sync log
    Log {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

pub async fn run(config: &TwinConfig, action: SyncAction) -> Result<()> {
    let sync = TwinSync::from_config(config);

    match action {
        SyncAction::Send { message } => {
            let value = serde_json::from_str(&message).unwrap_or(serde_json::Value::String(message));
            sync.send_to_twin(value)?;
            println!("Message left for {}", config.identity.twin_id);
        }
        SyncAction::Receive => match sync.receive_from_twin()? {
            Some(m) => println!("From {} at {}:\n{}", m.from, m.timestamp, m.message),
            None => println!("No unread message."),
        },
        SyncAction::Notify { message, level } => {
            sync.notify_owner(&message, level)?;
            println!("Notified ({level}).");
        }
        SyncAction::Git => print_git(&sync.git_sync().await?),
        SyncAction::Daily => {
            println!("Daily Sync");
            println!("{}", "=".repeat(40));
            let status = json!({
                "type": "daily_status",
                "date": chrono::Local::now().date_naive().to_string(),
            });
            let report = sync.daily_sync(status).await?;
            println!("  Sent to:    {}", report.sent.to);
            match &report.received {
                Some(m) => println!("  Received:   {}", m.message),
                None => println!("  Received:   nothing new"),
            }
            print_git(&report.git);
            println!("  Notified:   {}", report.notified.message);
        }
        SyncAction::Log { limit } => {
            let events = sync.events();
            let skip = events.len().saturating_sub(limit);
            for e in events.iter().skip(skip) {
                println!("  {}  {:<18} {}", e.timestamp, e.kind, e.data);
            }
        }
    }
    Ok(())
}

fn print_git(outcome: &twinsync::sync::GitSyncOutcome) {
    match &outcome.error {
        None => println!("  Git:        pushed (committed: {})", outcome.committed),
        Some(e) => println!("  Git:        FAILED: {e}"),
    }
}
