//! One-skill-per-run installer.
//!
//! Each call takes the first configured skill that is neither installed nor
//! failed, runs the install command for it, and records the outcome in
//! `skill_install_log.json`. Rate-limited attempts are not recorded, so the
//! same skill is retried next time.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::SkillsConfig;
use crate::scheduler::runner::run_with_timeout;
use crate::store;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallProgress {
    #[serde(default)]
    pub installed: Vec<String>,
    #[serde(default)]
    pub failed: Vec<String>,
    #[serde(default)]
    pub last_attempt: Option<String>,
}

impl InstallProgress {
    pub fn load(path: &Path) -> Self {
        store::load_json_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        store::save_json(path, self)
    }

    /// Skills still to try, in configured order.
    pub fn pending<'a>(&self, skills: &'a [String]) -> Vec<&'a str> {
        skills
            .iter()
            .filter(|s| !self.installed.contains(s) && !self.failed.contains(s))
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum InstallOutcome {
    Installed,
    RateLimited,
    Failed(String),
}

#[derive(Debug, Serialize)]
pub struct InstallReport {
    /// `None` when nothing was pending.
    pub skill: Option<String>,
    pub outcome: Option<InstallOutcome>,
    pub installed: usize,
    pub total: usize,
}

/// `OK` or `installed` on stdout wins; `Rate limit` on stderr is a soft failure.
pub fn classify_install_output(stdout: &str, stderr: &str) -> InstallOutcome {
    if stdout.contains("OK") || stdout.contains("installed") {
        InstallOutcome::Installed
    } else if stderr.contains("Rate limit") {
        InstallOutcome::RateLimited
    } else {
        InstallOutcome::Failed(stderr.trim().chars().take(100).collect())
    }
}

/// The install command with `{skill}` substituted.
pub fn install_command(template: &[String], skill: &str) -> Vec<String> {
    template.iter().map(|part| part.replace("{skill}", skill)).collect()
}

/// Attempt the next pending skill and persist progress.
pub async fn install_next(config: &SkillsConfig, progress_path: &Path) -> Result<InstallReport> {
    let mut progress = InstallProgress::load(progress_path);
    let total = config.skills.len();

    let Some(skill) = progress.pending(&config.skills).first().map(|s| s.to_string()) else {
        info!("all skills installed");
        return Ok(InstallReport {
            skill: None,
            outcome: None,
            installed: progress.installed.len(),
            total,
        });
    };

    info!(skill = %skill, "installing skill");
    let argv = install_command(&config.install_command, &skill);
    let outcome = match run_with_timeout(&argv, None, Duration::from_secs(config.timeout_secs)).await {
        Ok(out) => classify_install_output(&out.stdout, &out.stderr),
        Err(e) => InstallOutcome::Failed(format!("{e:#}")),
    };

    match &outcome {
        InstallOutcome::Installed => {
            info!(skill = %skill, "skill installed");
            progress.installed.push(skill.clone());
            progress.last_attempt = Some(chrono::Utc::now().to_rfc3339());
        }
        InstallOutcome::Failed(reason) => {
            warn!(skill = %skill, reason = %reason, "skill install failed");
            progress.failed.push(skill.clone());
            progress.last_attempt = Some(chrono::Utc::now().to_rfc3339());
        }
        InstallOutcome::RateLimited => {
            warn!(skill = %skill, "rate limited, will retry next run");
        }
    }
    progress.save(progress_path)?;

    Ok(InstallReport {
        skill: Some(skill),
        outcome: Some(outcome),
        installed: progress.installed.len(),
        total,
    })
}
