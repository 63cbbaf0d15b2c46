//! Persistent thoughts, memories, goals, and preferences.
//!
//! Thoughts and memories are JSON Lines and only ever grow. Recall rewrites
//! `memories.jsonl` in place to persist access counts; linking rewrites
//! `thoughts.jsonl`. Goals and preferences are plain JSON objects.

pub mod goals;
pub mod types;

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub use types::{BrainStats, Goal, GoalStatus, Memory, Preference, Preferences, Thought};

use crate::store;

pub struct Brain {
    dir: PathBuf,
    thoughts: Vec<Thought>,
    memories: Vec<Memory>,
    pub(crate) goals: BTreeMap<String, Goal>,
    preferences: Preferences,
}

impl Brain {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            thoughts: store::read_jsonl(&dir.join("thoughts.jsonl"))?,
            memories: store::read_jsonl(&dir.join("memories.jsonl"))?,
            goals: store::load_json_or_default(&dir.join("goals.json")),
            preferences: store::load_json_or_default(&dir.join("preferences.json")),
            dir,
        })
    }

    fn thoughts_path(&self) -> PathBuf {
        self.dir.join("thoughts.jsonl")
    }

    fn memories_path(&self) -> PathBuf {
        self.dir.join("memories.jsonl")
    }

    pub(crate) fn goals_path(&self) -> PathBuf {
        self.dir.join("goals.json")
    }

    fn preferences_path(&self) -> PathBuf {
        self.dir.join("preferences.json")
    }

    // ── Thoughts ──────────────────────────────────────────────────────────────

    pub fn think(
        &mut self,
        content: &str,
        kind: &str,
        context: serde_json::Value,
        confidence: f64,
    ) -> Result<Thought> {
        let thought = Thought {
            id: types::short_id("thought"),
            content: content.to_string(),
            kind: kind.to_string(),
            context,
            confidence: confidence.clamp(0.0, 1.0),
            created_at: chrono::Utc::now().to_rfc3339(),
            related_thoughts: Vec::new(),
        };
        store::append_jsonl(&self.thoughts_path(), &thought)?;
        debug!(id = %thought.id, kind, "thought recorded");
        self.thoughts.push(thought.clone());
        Ok(thought)
    }

    /// The last `n` thoughts, oldest first, optionally of one type.
    pub fn recent_thoughts(&self, n: usize, kind: Option<&str>) -> Vec<Thought> {
        let matching: Vec<&Thought> = self
            .thoughts
            .iter()
            .filter(|t| kind.map_or(true, |k| t.kind == k))
            .collect();
        let skip = matching.len().saturating_sub(n);
        matching.into_iter().skip(skip).cloned().collect()
    }

    /// Link two thoughts both ways. Returns `false` (and changes nothing) unless both exist.
    pub fn link_thoughts(&mut self, a: &str, b: &str) -> Result<bool> {
        let has = |id: &str| self.thoughts.iter().any(|t| t.id == id);
        if a == b || !has(a) || !has(b) {
            return Ok(false);
        }

        for t in &mut self.thoughts {
            let other = if t.id == a {
                b
            } else if t.id == b {
                a
            } else {
                continue;
            };
            if !t.related_thoughts.iter().any(|r| r == other) {
                t.related_thoughts.push(other.to_string());
            }
        }
        store::write_jsonl(&self.thoughts_path(), &self.thoughts)?;
        Ok(true)
    }

    // ── Memories ──────────────────────────────────────────────────────────────

    pub fn remember(
        &mut self,
        content: &str,
        kind: &str,
        importance: u8,
        source: Option<&str>,
    ) -> Result<Memory> {
        let memory = Memory {
            id: types::short_id("memory"),
            content: content.to_string(),
            kind: kind.to_string(),
            importance: importance.clamp(1, 10),
            source: source.map(str::to_string),
            created_at: chrono::Utc::now().to_rfc3339(),
            access_count: 0,
            last_accessed: None,
        };
        store::append_jsonl(&self.memories_path(), &memory)?;
        debug!(id = %memory.id, kind, importance = memory.importance, "memory recorded");
        self.memories.push(memory.clone());
        Ok(memory)
    }

    /// Case-insensitive substring recall. Every hit is marked accessed and the
    /// counts are persisted. Sorted by (importance, access_count), descending.
    pub fn recall(&mut self, keyword: &str, kind: Option<&str>) -> Result<Vec<Memory>> {
        let needle = keyword.to_lowercase();
        let now = chrono::Utc::now().to_rfc3339();

        let mut hits = Vec::new();
        for m in &mut self.memories {
            if kind.is_some_and(|k| m.kind != k) {
                continue;
            }
            if m.content.to_lowercase().contains(&needle) {
                m.access_count += 1;
                m.last_accessed = Some(now.clone());
                hits.push(m.clone());
            }
        }

        if !hits.is_empty() {
            store::write_jsonl(&self.memories_path(), &self.memories)?;
        }

        hits.sort_by(|a, b| {
            (b.importance, b.access_count).cmp(&(a.importance, a.access_count))
        });
        Ok(hits)
    }

    pub fn important_memories(&self, min_importance: u8) -> Vec<Memory> {
        self.memories
            .iter()
            .filter(|m| m.importance >= min_importance)
            .cloned()
            .collect()
    }

    // ── Preferences ───────────────────────────────────────────────────────────

    pub fn learn_preference(
        &mut self,
        category: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<()> {
        self.preferences.entry(category.to_string()).or_default().insert(
            key.to_string(),
            Preference {
                value,
                learned_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        store::save_json(&self.preferences_path(), &self.preferences)
    }

    pub fn get_preference(&self, category: &str, key: &str) -> Option<&serde_json::Value> {
        self.preferences
            .get(category)
            .and_then(|c| c.get(key))
            .map(|p| &p.value)
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    // ── Reasoning ─────────────────────────────────────────────────────────────

    /// Recall memories for each keyword and, if any turn up, record an
    /// `analysis` thought naming the top three.
    pub fn analyze_situation(&mut self, keywords: &[String]) -> Result<Option<Thought>> {
        let mut relevant = Vec::new();
        for k in keywords {
            relevant.extend(self.recall(k, None)?);
        }
        if relevant.is_empty() {
            return Ok(None);
        }

        let top: Vec<&str> = relevant.iter().take(3).map(|m| m.content.as_str()).collect();
        let analysis = format!("Based on past memories: {}", top.join(", "));
        let thought = self.think(
            &analysis,
            "analysis",
            serde_json::json!({ "keywords": keywords }),
            0.8,
        )?;
        Ok(Some(thought))
    }

    pub fn stats(&self) -> BrainStats {
        let mut thought_types = BTreeMap::new();
        for t in &self.thoughts {
            *thought_types.entry(t.kind.clone()).or_insert(0) += 1;
        }
        let mut memory_types = BTreeMap::new();
        for m in &self.memories {
            *memory_types.entry(m.kind.clone()).or_insert(0) += 1;
        }

        BrainStats {
            total_thoughts: self.thoughts.len(),
            total_memories: self.memories.len(),
            total_goals: self.goals.len(),
            active_goals: self.active_goals().len(),
            thought_types,
            memory_types,
        }
    }
}
