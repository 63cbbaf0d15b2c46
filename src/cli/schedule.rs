//! `schedule` and `skills` commands.

use anyhow::Result;
use clap::Subcommand;

use twinsync::config::TwinConfig;
use twinsync::scheduler::Scheduler;
use twinsync::skills::{self, InstallOutcome, InstallProgress};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Run the scheduler until Ctrl-C
    Run,
    /// Show each job's next run
    List,
}

pub async fn schedule(config: &TwinConfig, action: ScheduleAction) -> Result<()> {
    let now = chrono::Local::now().naive_local();
    let scheduler = Scheduler::new(&config.scheduler, now);

    match action {
        ScheduleAction::List => {
            println!("{:<12} {:<14} Next run", "Job", "Trigger");
            println!("{}", "=".repeat(48));
            for (name, trigger, next) in scheduler.schedule() {
                println!("{:<12} {:<14} {}", name, trigger.to_string(), next.format("%Y-%m-%d %H:%M"));
            }
        }
        ScheduleAction::Run => {
            tracing::info!(jobs = config.scheduler.jobs.len(), "scheduler started");
            scheduler.run().await;
        }
    }
    Ok(())
}

#[derive(Subcommand)]
pub enum SkillsAction {
    /// Try to install the next pending skill
    InstallNext,
    /// Installed, failed, and pending skills
    Status,
}

pub async fn skills(config: &TwinConfig, action: SkillsAction) -> Result<()> {
    let progress_path = config.skills_progress_path();

    match action {
        SkillsAction::InstallNext => {
            let report = skills::install_next(&config.skills, &progress_path).await?;
            match (&report.skill, &report.outcome) {
                (Some(skill), Some(InstallOutcome::Installed)) => println!("Installed {skill}"),
                (Some(skill), Some(InstallOutcome::RateLimited)) => {
                    println!("Rate limited on {skill}, will retry next run")
                }
                (Some(skill), Some(InstallOutcome::Failed(reason))) => {
                    println!("Failed {skill}: {reason}")
                }
                _ => println!("All skills installed."),
            }
            println!("Progress: {}/{}", report.installed, report.total);
        }
        SkillsAction::Status => {
            let progress = InstallProgress::load(&progress_path);
            println!("Skills");
            println!("{}", "=".repeat(40));
            println!("  Installed:   {}", progress.installed.join(", "));
            println!("  Failed:      {}", progress.failed.join(", "));
            println!("  Pending:     {}", progress.pending(&config.skills.skills).join(", "));
            if let Some(t) = &progress.last_attempt {
                println!("  Last:        {t}");
            }
        }
    }
    Ok(())
}
