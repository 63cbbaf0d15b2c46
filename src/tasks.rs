//! Task list stored as a JSON array in `tasks.json`.

use anyhow::{ensure, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// 1 to 5, 5 is highest.
    pub priority: u8,
    pub category: String,
    pub status: TaskStatus,
    pub created_at: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: u8,
    pub due_date: Option<NaiveDate>,
    pub category: String,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority: 3,
            due_date: None,
            category: "general".into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Percentage, one decimal.
    pub completion_rate: f64,
}

pub struct TaskManager {
    path: PathBuf,
    tasks: Vec<Task>,
}

impl TaskManager {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join("tasks.json");
        Ok(Self {
            tasks: store::load_json_or_default(&path),
            path,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn add_task(&mut self, new: NewTask) -> Result<Task> {
        ensure!(!new.title.trim().is_empty(), "task title must not be empty");
        ensure!(
            (1..=5).contains(&new.priority),
            "priority must be between 1 and 5, got {}",
            new.priority
        );

        let now = chrono::Local::now();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let task = Task {
            id: format!("task_{}_{}", now.format("%Y%m%d_%H%M%S"), &suffix[..8]),
            title: new.title,
            description: new.description.filter(|d| !d.is_empty()),
            priority: new.priority,
            category: new.category,
            status: TaskStatus::Pending,
            created_at: chrono::Utc::now().to_rfc3339(),
            due_date: new.due_date,
            completed_at: None,
        };
        self.tasks.push(task.clone());
        store::save_json(&self.path, &self.tasks)?;
        debug!(id = %task.id, priority = task.priority, "task added");
        Ok(task)
    }

    /// Returns `false` when no task has this id.
    pub fn complete_task(&mut self, id: &str) -> Result<bool> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        task.status = TaskStatus::Completed;
        task.completed_at = Some(chrono::Utc::now().to_rfc3339());
        store::save_json(&self.path, &self.tasks)?;
        Ok(true)
    }

    /// Pending tasks, highest priority first. Equal priorities keep insertion order.
    pub fn pending_tasks(&self, category: Option<&str>) -> Vec<Task> {
        let mut pending: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .filter(|t| category.map_or(true, |c| t.category == c))
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.priority.cmp(&a.priority));
        pending
    }

    pub fn todays_tasks(&self) -> Vec<Task> {
        self.tasks_due_on(chrono::Local::now().date_naive())
    }

    /// Pending tasks due on `day` or with no due date.
    pub fn tasks_due_on(&self, day: NaiveDate) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .filter(|t| t.due_date.map_or(true, |d| d == day))
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> TaskStats {
        let total = self.tasks.len();
        let completed = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        let completion_rate = if total == 0 {
            0.0
        } else {
            (completed as f64 / total as f64 * 1000.0).round() / 10.0
        };
        TaskStats {
            total,
            completed,
            pending: total - completed,
            completion_rate,
        }
    }

    pub fn daily_plan(&self) -> String {
        self.plan_for(chrono::Local::now().date_naive())
    }

    /// Markdown plan: stats, the day's tasks (`[!]` at priority 4+), and up to five high-priority pending tasks.
    pub fn plan_for(&self, day: NaiveDate) -> String {
        let stats = self.stats();
        let mut plan = format!(
            "# Daily Plan - {day}\n\n## Task Statistics\n- Total: {}\n- Completed: {}\n- Pending: {}\n- Completion Rate: {}%\n\n## Today's Tasks\n",
            stats.total, stats.completed, stats.pending, stats.completion_rate
        );

        let today = self.tasks_due_on(day);
        if today.is_empty() {
            plan.push_str("No tasks scheduled for today.\n");
        }
        for (i, task) in today.iter().enumerate() {
            let marker = if task.priority >= 4 { "[!]" } else { "[ ]" };
            plan.push_str(&format!("{}. {marker} {}\n", i + 1, task.title));
            if let Some(desc) = &task.description {
                plan.push_str(&format!("   {desc}\n"));
            }
        }

        plan.push_str("\n## High Priority Pending\n");
        for task in self
            .pending_tasks(None)
            .into_iter()
            .filter(|t| t.priority >= 4)
            .take(5)
        {
            plan.push_str(&format!("- [P{}] {}\n", task.priority, task.title));
        }
        plan
    }
}
