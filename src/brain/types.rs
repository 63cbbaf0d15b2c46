use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `<prefix>_` followed by 8 hex chars of a fresh v4 UUID.
pub fn short_id(prefix: &str) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &hex[..8])
}

/// One line of `thoughts.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thought {
    pub id: String,
    pub content: String,
    /// Free-text label: general, analysis, decision, question, insight, ...
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub context: serde_json::Value,
    /// 0.0 to 1.0
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    pub created_at: String,
    #[serde(default)]
    pub related_thoughts: Vec<String>,
}

/// One line of `memories.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    /// Free-text label: fact, experience, lesson, goal, preference, action, ...
    #[serde(rename = "type")]
    pub kind: String,
    /// 1 to 10
    #[serde(default = "default_importance")]
    pub importance: u8,
    #[serde(default)]
    pub source: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub access_count: u32,
    #[serde(default)]
    pub last_accessed: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
}

/// A value in `goals.json`, keyed by goal id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub description: String,
    #[serde(default)]
    pub target_date: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub metrics: Vec<String>,
    pub status: GoalStatus,
    pub created_at: String,
    /// 0 to 100
    #[serde(default)]
    pub progress: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    pub value: serde_json::Value,
    pub learned_at: String,
}

/// category → key → preference
pub type Preferences = BTreeMap<String, BTreeMap<String, Preference>>;

#[derive(Debug, Serialize)]
pub struct BrainStats {
    pub total_thoughts: usize,
    pub total_memories: usize,
    pub total_goals: usize,
    pub active_goals: usize,
    pub thought_types: BTreeMap<String, usize>,
    pub memory_types: BTreeMap<String, usize>,
}

fn default_confidence() -> f64 {
    1.0
}

fn default_importance() -> u8 {
    5
}

fn default_priority() -> u8 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_shape() {
        let id = short_id("thought");
        assert!(id.starts_with("thought_"));
        assert_eq!(id.len(), "thought_".len() + 8);
        assert!(id["thought_".len()..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, short_id("thought"));
    }

    #[test]
    fn sparse_memory_line_gets_defaults() {
        let m: Memory = serde_json::from_str(
            r#"{"id":"memory_1","content":"c","type":"fact","created_at":"t"}"#,
        )
        .unwrap();
        assert_eq!(m.importance, 5);
        assert_eq!(m.access_count, 0);
        assert!(m.last_accessed.is_none());
    }
}
