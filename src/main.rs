mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use twinsync::config::TwinConfig;
use twinsync::relay::{MessageKind, Notice};

#[derive(Parser)]
#[command(name = "twinsync", version, about = "Knowledge, tasks, and messaging for a pair of twin agents")]
struct Cli {
    /// Config file (default: ~/.twinsync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Knowledge base
    Kb {
        #[command(subcommand)]
        action: cli::kb::KbAction,
    },
    /// Analyze an image or document
    Analyze { path: PathBuf },
    /// Extract text from an image with tesseract
    Ocr { path: PathBuf },
    /// Compare two images
    Compare { a: PathBuf, b: PathBuf },
    /// Thoughts, memories, goals, and preferences
    Brain {
        #[command(subcommand)]
        action: cli::brain::BrainAction,
    },
    /// Execute a natural-language command
    Exec {
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Task list and daily plan
    Tasks {
        #[command(subcommand)]
        action: cli::tasks::TasksAction,
    },
    /// Job scheduler
    Schedule {
        #[command(subcommand)]
        action: cli::schedule::ScheduleAction,
    },
    /// Skill installer
    Skills {
        #[command(subcommand)]
        action: cli::schedule::SkillsAction,
    },
    /// Send a notice (telegram, discord, feishu, github, qq, offline, or all)
    Notify {
        platform: String,
        #[arg(short, long, default_value = "general")]
        kind: MessageKind,
        #[arg(short, long, default_value = "")]
        title: String,
        /// Alert priority (`high` escalates where the platform supports it)
        #[arg(short, long)]
        priority: Option<String>,
        body: String,
    },
    /// Read incoming messages from the offline inbox, or GitHub with --github
    Inbox {
        /// Message kind whose GitHub label to read
        #[arg(long)]
        github: Option<MessageKind>,
    },
    /// Feishu app bot
    Feishu {
        #[command(subcommand)]
        action: cli::relay::FeishuAction,
    },
    /// Start the QQ bridge listener
    Bridge,
    /// Twin sync
    Sync {
        #[command(subcommand)]
        action: cli::sync::SyncAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TwinConfig::load_from(path)?,
        None => TwinConfig::load()?,
    };

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Kb { action } => cli::kb::run(&config, action)?,
        Command::Analyze { path } => cli::kb::analyze(&config, &path)?,
        Command::Ocr { path } => cli::kb::ocr(&config, &path).await?,
        Command::Compare { a, b } => cli::kb::compare(&a, &b)?,
        Command::Brain { action } => cli::brain::run(&config, action)?,
        Command::Exec { message } => cli::brain::exec(&config, &message.join(" "))?,
        Command::Tasks { action } => cli::tasks::run(&config, action)?,
        Command::Schedule { action } => cli::schedule::schedule(&config, action).await?,
        Command::Skills { action } => cli::schedule::skills(&config, action).await?,
        Command::Notify {
            platform,
            kind,
            title,
            priority,
            body,
        } => {
            let mut notice = Notice::new(kind, title, body);
            notice.priority = priority;
            cli::relay::notify(&config, &platform, notice).await?
        }
        Command::Inbox { github } => cli::relay::inbox(&config, github).await?,
        Command::Feishu { action } => cli::relay::feishu(&config, action).await?,
        Command::Bridge => twinsync::bridge::serve(config).await?,
        Command::Sync { action } => cli::sync::run(&config, action).await?,
    }

    Ok(())
}
