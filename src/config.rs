use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::scheduler::trigger::Trigger;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TwinConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub identity: IdentityConfig,
    pub knowledge: KnowledgeConfig,
    pub relay: RelayConfig,
    pub telegram: TelegramConfig,
    pub discord: DiscordConfig,
    pub feishu: FeishuConfig,
    pub github: GitHubConfig,
    pub qq: QqConfig,
    pub scheduler: SchedulerConfig,
    pub skills: SkillsConfig,
    pub executor: ExecutorConfig,
}

/// Logging plus the bind address of the QQ bridge listener.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Workspace root. Every store lives in a subdirectory of it.
    pub home: String,
}

/// Who we are, who the twin is, and who the human owner is.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IdentityConfig {
    pub my_id: String,
    pub twin_id: String,
    pub owner: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub preview_chars: usize,
    pub summary_chars: usize,
    pub pdf_page_limit: usize,
    /// Directories walked by `kb auto-learn`.
    pub learn_paths: Vec<String>,
    /// A learned file gets tag `t` when its path contains `t`.
    pub path_tags: Vec<String>,
    pub ocr_command: String,
    pub ocr_languages: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RelayConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DiscordConfig {
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeishuConfig {
    pub webhook_url: Option<String>,
    pub api_base: String,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_base: String,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QqConfig {
    /// Base URL of the go-cqhttp HTTP API.
    pub api_url: String,
    /// Group messages are only answered when they contain one of these.
    pub mention_aliases: Vec<String>,
    pub user_id: Option<i64>,
    pub group_id: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    pub poll_interval_secs: u64,
    pub task_timeout_secs: u64,
    pub output_preview_chars: usize,
    pub jobs: Vec<JobConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JobConfig {
    pub name: String,
    pub trigger: Trigger,
    #[serde(default)]
    pub run_on_start: bool,
    #[serde(default)]
    pub tasks: Vec<TaskCommand>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TaskCommand {
    pub name: String,
    pub cmd: Vec<String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SkillsConfig {
    /// Install order. The first skill that is neither installed nor failed goes next.
    pub skills: Vec<String>,
    /// Command template; `{skill}` is replaced by the skill name.
    pub install_command: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExecutorConfig {
    pub scan_dir: String,
    pub scan_limit: usize,
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            identity: IdentityConfig::default(),
            knowledge: KnowledgeConfig::default(),
            relay: RelayConfig::default(),
            telegram: TelegramConfig::default(),
            discord: DiscordConfig::default(),
            feishu: FeishuConfig::default(),
            github: GitHubConfig::default(),
            qq: QqConfig::default(),
            scheduler: SchedulerConfig::default(),
            skills: SkillsConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            home: default_twinsync_dir().to_string_lossy().into_owned(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            my_id: "twin_local".into(),
            twin_id: "twin_cloud".into(),
            owner: "owner".into(),
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            preview_chars: 1000,
            summary_chars: 500,
            pdf_page_limit: 20,
            learn_paths: vec!["~/.twinsync/inbox".into()],
            path_tags: vec!["trading".into(), "brain".into(), "sync".into()],
            ocr_command: "tesseract".into(),
            ocr_languages: "chi_sim+eng".into(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".into(),
            bot_token: None,
            chat_id: None,
        }
    }
}

impl Default for FeishuConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            api_base: "https://open.feishu.cn/open-apis".into(),
            app_id: None,
            app_secret: None,
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".into(),
            owner: None,
            repo: None,
            token: None,
        }
    }
}

impl Default for QqConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5700".into(),
            mention_aliases: vec!["@twin".into()],
            user_id: None,
            group_id: None,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            task_timeout_secs: 300,
            output_preview_chars: 200,
            jobs: default_jobs(),
        }
    }
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            skills: [
                "skill-creator",
                "coding-agent",
                "clawhub",
                "healthcheck",
                "gh-issues",
                "discord",
                "slack",
                "himalaya",
                "notion",
                "obsidian",
                "openai-image-gen",
                "openai-whisper",
                "xurl",
                "mcporter",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            install_command: ["npx", "clawhub", "install", "{skill}", "--force"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout_secs: 120,
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            scan_dir: "~/Downloads".into(),
            scan_limit: 20,
        }
    }
}

/// Hourly skill install, a morning learning run, and an evening summary.
fn default_jobs() -> Vec<JobConfig> {
    let cmd = |parts: &[&str]| parts.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    vec![
        JobConfig {
            name: "hourly".into(),
            trigger: Trigger::Hourly,
            run_on_start: true,
            tasks: vec![TaskCommand {
                name: "skill install".into(),
                cmd: cmd(&["twinsync", "skills", "install-next"]),
                cwd: None,
            }],
        },
        JobConfig {
            name: "morning".into(),
            trigger: Trigger::DailyAt(chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default()),
            run_on_start: false,
            tasks: vec![
                TaskCommand {
                    name: "auto learn".into(),
                    cmd: cmd(&["twinsync", "kb", "auto-learn"]),
                    cwd: None,
                },
                TaskCommand {
                    name: "daily plan".into(),
                    cmd: cmd(&["twinsync", "tasks", "plan", "--save"]),
                    cwd: None,
                },
            ],
        },
        JobConfig {
            name: "evening".into(),
            trigger: Trigger::DailyAt(chrono::NaiveTime::from_hms_opt(21, 0, 0).unwrap_or_default()),
            run_on_start: false,
            tasks: vec![TaskCommand {
                name: "learning summary".into(),
                cmd: cmd(&["echo", "daily learning summary"]),
                cwd: None,
            }],
        },
    ]
}

/// Returns `~/.twinsync/`
pub fn default_twinsync_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".twinsync")
}

/// Returns the default config file path: `~/.twinsync/config.toml`
pub fn default_config_path() -> PathBuf {
    default_twinsync_dir().join("config.toml")
}

impl TwinConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            TwinConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Secrets and the workspace root can come from the environment instead of the file.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TWINSYNC_HOME") {
            self.storage.home = val;
        }
        if let Ok(val) = std::env::var("TWINSYNC_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("TWINSYNC_TELEGRAM_TOKEN") {
            self.telegram.bot_token = Some(val);
        }
        if let Ok(val) = std::env::var("TWINSYNC_DISCORD_WEBHOOK") {
            self.discord.webhook_url = Some(val);
        }
        if let Ok(val) = std::env::var("TWINSYNC_FEISHU_WEBHOOK") {
            self.feishu.webhook_url = Some(val);
        }
        if let Ok(val) = std::env::var("TWINSYNC_GITHUB_TOKEN") {
            self.github.token = Some(val);
        }
        if let Ok(val) = std::env::var("TWINSYNC_QQ_API") {
            self.qq.api_url = val;
        }
    }

    /// Resolve the workspace root, expanding `~` if needed.
    pub fn resolved_home(&self) -> PathBuf {
        expand_tilde(&self.storage.home)
    }

    pub fn knowledge_dir(&self) -> PathBuf {
        self.resolved_home().join("knowledge")
    }

    pub fn brain_dir(&self) -> PathBuf {
        self.resolved_home().join("brain")
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.resolved_home().join("tasks")
    }

    pub fn sync_dir(&self) -> PathBuf {
        self.resolved_home().join("sync")
    }

    pub fn skills_progress_path(&self) -> PathBuf {
        self.resolved_home().join("skill_install_log.json")
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
