//! `brain` and `exec` commands.

use anyhow::Result;
use clap::Subcommand;

use twinsync::brain::Brain;
use twinsync::config::TwinConfig;
use twinsync::executor::Executor;

#[derive(Subcommand)]
pub enum BrainAction {
    /// Record a thought
    Think {
        content: String,
        #[arg(long, default_value = "general")]
        kind: String,
        #[arg(long, default_value_t = 1.0)]
        confidence: f64,
    },
    /// Show recent thoughts
    Thoughts {
        #[arg(short, default_value_t = 10)]
        n: usize,
        #[arg(long)]
        kind: Option<String>,
    },
    /// Link two thoughts both ways
    Link { a: String, b: String },
    /// Store a memory
    Remember {
        content: String,
        #[arg(long, default_value = "fact")]
        kind: String,
        #[arg(long, default_value_t = 5)]
        importance: u8,
        #[arg(long)]
        source: Option<String>,
    },
    /// Recall memories containing a keyword
    Recall {
        keyword: String,
        #[arg(long)]
        kind: Option<String>,
    },
    /// Memories at or above an importance level
    Important {
        #[arg(long, default_value_t = 7)]
        min: u8,
    },
    /// Create or replace a goal
    Goal {
        id: String,
        description: String,
        #[arg(long)]
        target_date: Option<String>,
        #[arg(long, default_value_t = 3)]
        priority: u8,
        #[arg(long = "metric")]
        metrics: Vec<String>,
    },
    /// Set a goal's progress (0-100)
    Progress { id: String, progress: i64 },
    /// List active goals
    Goals,
    /// Learn a preference; the value is parsed as JSON when possible
    Prefer {
        category: String,
        key: String,
        value: String,
    },
    /// Look up a preference
    Pref { category: String, key: String },
    /// Recall around keywords and record an analysis thought
    Analyze { keywords: Vec<String> },
    /// Counts of thoughts, memories, and goals
    Stats,
}

pub fn run(config: &TwinConfig, action: BrainAction) -> Result<()> {
    let mut brain = Brain::open(config.brain_dir())?;

    match action {
        BrainAction::Think {
            content,
            kind,
            confidence,
        } => {
            let t = brain.think(&content, &kind, serde_json::Value::Null, confidence)?;
            println!("Recorded {} [{}]", t.id, t.kind);
        }
        BrainAction::Thoughts { n, kind } => {
            for t in brain.recent_thoughts(n, kind.as_deref()) {
                println!("  {} [{}] {:.2}  {}", t.id, t.kind, t.confidence, t.content);
            }
        }
        BrainAction::Link { a, b } => {
            if brain.link_thoughts(&a, &b)? {
                println!("Linked {a} <-> {b}");
            } else {
                println!("Both thoughts must exist.");
            }
        }
        BrainAction::Remember {
            content,
            kind,
            importance,
            source,
        } => {
            let m = brain.remember(&content, &kind, importance, source.as_deref())?;
            println!("Remembered {} [{}] importance {}", m.id, m.kind, m.importance);
        }
        BrainAction::Recall { keyword, kind } => {
            let hits = brain.recall(&keyword, kind.as_deref())?;
            if hits.is_empty() {
                println!("Nothing recalled.");
            }
            for m in hits {
                println!("  {} [{}] imp {} x{}  {}", m.id, m.kind, m.importance, m.access_count, m.content);
            }
        }
        BrainAction::Important { min } => {
            for m in brain.important_memories(min) {
                println!("  {} [{}] imp {}  {}", m.id, m.kind, m.importance, m.content);
            }
        }
        BrainAction::Goal {
            id,
            description,
            target_date,
            priority,
            metrics,
        } => {
            brain.set_goal(&id, &description, target_date.as_deref(), priority, metrics)?;
            println!("Goal {id} set.");
        }
        BrainAction::Progress { id, progress } => match brain.update_goal_progress(&id, progress)? {
            Some(goal) => println!("Goal {id}: {}% ({:?})", goal.progress, goal.status),
            None => println!("No goal {id}."),
        },
        BrainAction::Goals => {
            for (id, goal) in brain.active_goals() {
                println!("  {:<16} {:>3}%  p{}  {}", id, goal.progress, goal.priority, goal.description);
            }
        }
        BrainAction::Prefer {
            category,
            key,
            value,
        } => {
            let value = serde_json::from_str(&value).unwrap_or(serde_json::Value::String(value));
            brain.learn_preference(&category, &key, value)?;
            println!("Preference {category}.{key} saved.");
        }
        BrainAction::Pref { category, key } => match brain.get_preference(&category, &key) {
            Some(v) => println!("{v}"),
            None => println!("(not set)"),
        },
        BrainAction::Analyze { keywords } => match brain.analyze_situation(&keywords)? {
            Some(t) => println!("{}", t.content),
            None => println!("No relevant memories."),
        },
        BrainAction::Stats => {
            let s = brain.stats();
            println!("Brain Statistics");
            println!("{}", "=".repeat(40));
            println!("  Thoughts:            {}", s.total_thoughts);
            println!("  Memories:            {}", s.total_memories);
            println!("  Goals:               {} ({} active)", s.total_goals, s.active_goals);
            println!();
            println!("Thought Types:");
            for (k, v) in &s.thought_types {
                println!("  {:<12} {}", k, v);
            }
            println!();
            println!("Memory Types:");
            for (k, v) in &s.memory_types {
                println!("  {:<12} {}", k, v);
            }
        }
    }
    Ok(())
}

pub fn exec(config: &TwinConfig, message: &str) -> Result<()> {
    let mut brain = Brain::open(config.brain_dir())?;
    let reply = Executor::new(&mut brain, &config.executor).execute(message)?;
    println!("{reply}");
    Ok(())
}
