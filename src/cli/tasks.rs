//! `tasks` command.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Subcommand;

use twinsync::config::TwinConfig;
use twinsync::tasks::{NewTask, Task, TaskManager};

#[derive(Subcommand)]
pub enum TasksAction {
    /// Add a pending task
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// 1 (low) to 5 (high)
        #[arg(short, long, default_value_t = 3)]
        priority: u8,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(short, long, default_value = "general")]
        category: String,
    },
    /// Mark a task completed
    Done { id: String },
    /// Pending tasks, highest priority first
    List {
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Pending tasks due today or undated
    Today,
    /// Completion statistics
    Stats,
    /// Print today's markdown plan
    Plan {
        /// Also write it to the tasks directory
        #[arg(long)]
        save: bool,
    },
}

pub fn run(config: &TwinConfig, action: TasksAction) -> Result<()> {
    let mut manager = TaskManager::open(config.tasks_dir())?;

    match action {
        TasksAction::Add {
            title,
            description,
            priority,
            due,
            category,
        } => {
            let task = manager.add_task(NewTask {
                title,
                description,
                priority,
                due_date: due,
                category,
            })?;
            println!("Added {}", task.id);
        }
        TasksAction::Done { id } => {
            if manager.complete_task(&id)? {
                println!("Completed {id}");
            } else {
                println!("No task {id}");
            }
        }
        TasksAction::List { category } => print_tasks(&manager.pending_tasks(category.as_deref())),
        TasksAction::Today => print_tasks(&manager.todays_tasks()),
        TasksAction::Stats => {
            let s = manager.stats();
            println!("Task Statistics");
            println!("{}", "=".repeat(40));
            println!("  Total:               {}", s.total);
            println!("  Completed:           {}", s.completed);
            println!("  Pending:             {}", s.pending);
            println!("  Completion rate:     {}%", s.completion_rate);
        }
        TasksAction::Plan { save } => {
            let plan = manager.daily_plan();
            println!("{plan}");
            if save {
                let path = config
                    .tasks_dir()
                    .join(format!("plan_{}.md", chrono::Local::now().format("%Y%m%d")));
                std::fs::write(&path, &plan)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Saved to {}", path.display());
            }
        }
    }
    Ok(())
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    for t in tasks {
        let due = t.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
        println!("  [{}] {:<10} {:<12} {}  ({})", t.priority, due, t.category, t.title, t.id);
    }
}
