//! `notify`, `inbox`, and `feishu` commands.

use anyhow::{bail, Result};
use clap::Subcommand;

use twinsync::config::TwinConfig;
use twinsync::relay::feishu::FeishuApp;
use twinsync::relay::github::{issue_label, GitHub};
use twinsync::relay::offline::OfflineExchange;
use twinsync::relay::{self, MessageKind, Notice, Relay};

/// Send a notice to one platform, every configured platform (`all`), or the offline outbox.
pub async fn notify(config: &TwinConfig, platform: &str, notice: Notice) -> Result<()> {
    if platform == "offline" {
        let msg = offline_exchange(config).send(&notice)?;
        println!("Queued {} in outbox", msg.id);
        return Ok(());
    }

    let relay = Relay::from_config(config)?;
    let targets: Vec<_> = if platform == "all" {
        relay::platforms(config)
            .into_iter()
            .filter(|p| p.is_configured())
            .collect()
    } else {
        match relay::platform(config, platform) {
            Some(p) => vec![p],
            None => bail!("unknown platform {platform:?} (telegram, discord, feishu, github, qq, offline, all)"),
        }
    };
    if targets.is_empty() {
        println!("No platforms configured.");
        return Ok(());
    }

    let mut failures = 0;
    for p in &targets {
        match relay.send(p.as_ref(), &notice).await {
            Ok(d) => {
                let id = d.url.or(d.message_id).unwrap_or_default();
                println!("  {:<10} sent {}", p.name(), id);
            }
            Err(e) => {
                failures += 1;
                println!("  {:<10} FAILED: {e}", p.name());
            }
        }
    }
    if failures == targets.len() {
        bail!("all sends failed");
    }
    Ok(())
}

/// Read the offline inbox, or GitHub issues for a message kind.
pub async fn inbox(config: &TwinConfig, github: Option<MessageKind>) -> Result<()> {
    if let Some(kind) = github {
        let relay = Relay::from_config(config)?;
        let messages = GitHub::from_config(config)
            .fetch_messages(&relay, issue_label(kind))
            .await?;
        if messages.is_empty() {
            println!("No messages.");
        }
        for m in messages {
            println!("  #{:<5} {:<7} {}  {}", m.id, m.state, m.created_at, m.title);
        }
        return Ok(());
    }

    let messages = offline_exchange(config).check_inbox()?;
    if messages.is_empty() {
        println!("Inbox empty.");
    }
    for m in messages {
        println!("[{}] {} -> {} ({})", m.timestamp, m.from, m.to, m.kind);
        println!("  {}", m.title);
        println!("  {}", m.body);
    }
    Ok(())
}

fn offline_exchange(config: &TwinConfig) -> OfflineExchange {
    OfflineExchange::new(
        config.sync_dir().join("offline"),
        &config.identity.my_id,
        &config.identity.twin_id,
    )
}

#[derive(Subcommand)]
pub enum FeishuAction {
    /// Chats the app has joined
    Chats,
    /// Send text to a chat as the app
    Send { chat_id: String, text: String },
}

pub async fn feishu(config: &TwinConfig, action: FeishuAction) -> Result<()> {
    let app = FeishuApp::from_config(config);
    if !app.is_configured() {
        bail!("feishu app_id/app_secret are not configured");
    }
    let relay = Relay::from_config(config)?;

    match action {
        FeishuAction::Chats => {
            for chat in app.list_chats(&relay).await? {
                println!("  {:<40} {}", chat.chat_id, chat.name);
            }
        }
        FeishuAction::Send { chat_id, text } => {
            let d = app.send_text(&relay, &chat_id, &text).await?;
            println!("Sent {}", d.message_id.unwrap_or_default());
        }
    }
    Ok(())
}
