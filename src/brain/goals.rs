use anyhow::{bail, Result};
use std::collections::BTreeMap;

use super::{Brain, Goal, GoalStatus};
use crate::store;

impl Brain {
    /// Create or replace a goal. Progress starts at 0.
    pub fn set_goal(
        &mut self,
        goal_id: &str,
        description: &str,
        target_date: Option<&str>,
        priority: u8,
        metrics: Vec<String>,
    ) -> Result<Goal> {
        if goal_id.trim().is_empty() {
            bail!("goal id must not be empty");
        }
        let goal = Goal {
            description: description.to_string(),
            target_date: target_date.map(str::to_string),
            priority,
            metrics,
            status: GoalStatus::Active,
            created_at: chrono::Utc::now().to_rfc3339(),
            progress: 0,
        };
        self.goals.insert(goal_id.to_string(), goal.clone());
        store::save_json(&self.goals_path(), &self.goals)?;
        Ok(goal)
    }

    /// Clamp to 0..=100; reaching 100 completes the goal. Returns `None` for an unknown id.
    pub fn update_goal_progress(&mut self, goal_id: &str, progress: i64) -> Result<Option<Goal>> {
        let Some(goal) = self.goals.get_mut(goal_id) else {
            return Ok(None);
        };
        goal.progress = progress.clamp(0, 100) as u8;
        if goal.progress == 100 {
            goal.status = GoalStatus::Completed;
        }
        let updated = goal.clone();
        store::save_json(&self.goals_path(), &self.goals)?;
        Ok(Some(updated))
    }

    pub fn active_goals(&self) -> BTreeMap<String, Goal> {
        self.goals
            .iter()
            .filter(|(_, g)| g.status == GoalStatus::Active)
            .map(|(k, g)| (k.clone(), g.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_clamps_and_completes() {
        let dir = tempfile::tempdir().unwrap();
        let mut brain = Brain::open(dir.path()).unwrap();
        brain.set_goal("freedom", "financial freedom", None, 10, vec![]).unwrap();

        let g = brain.update_goal_progress("freedom", -5).unwrap().unwrap();
        assert_eq!(g.progress, 0);
        assert_eq!(g.status, GoalStatus::Active);

        let g = brain.update_goal_progress("freedom", 250).unwrap().unwrap();
        assert_eq!(g.progress, 100);
        assert_eq!(g.status, GoalStatus::Completed);
        assert!(brain.active_goals().is_empty());

        assert!(brain.update_goal_progress("nope", 10).unwrap().is_none());

        let reopened = Brain::open(dir.path()).unwrap();
        assert_eq!(reopened.stats().total_goals, 1);
        assert_eq!(reopened.stats().active_goals, 0);
    }
}
