//! Task record and partial updates

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A user-created to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque unique id, fixed at creation
    pub id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
    /// Unix epoch milliseconds, fixed at creation
    pub created_at: i64,
    /// Unix epoch milliseconds, refreshed on every mutation
    pub updated_at: i64,
}

impl Task {
    /// Build a new, not-yet-persisted task
    pub fn new(id: String, title: &str, description: &str, now: i64) -> Self {
        Self {
            id,
            title: title.to_string(),
            description: description.to_string(),
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge `patch` over this task.
    ///
    /// `id` and `created_at` are kept; `updated_at` never goes backwards and
    /// always moves forward by at least one millisecond.
    pub fn merged(&self, patch: &TaskPatch, now: i64) -> Task {
        Task {
            id: self.id.clone(),
            title: patch.title.clone().unwrap_or_else(|| self.title.clone()),
            description: patch
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            completed: patch.completed.unwrap_or(self.completed),
            created_at: self.created_at,
            updated_at: now.max(self.updated_at + 1),
        }
    }
}

/// Fields a caller may replace on an existing task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }
}

/// Current time in Unix epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Generate a fresh task id: `task-<millis>-<uuid>`
pub fn generate_id() -> String {
    format!("task-{}-{}", now_millis(), uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_defaults() {
        let task = Task::new("t1".to_string(), "Buy milk", "", 1_000);
        assert!(!task.completed);
        assert_eq!(task.created_at, task.updated_at);
        assert_eq!(task.description, "");
    }

    #[test]
    fn test_merge_keeps_identity() {
        let task = Task::new("t1".to_string(), "Buy milk", "2l", 1_000);
        let merged = task.merged(&TaskPatch::completed(true), 5_000);

        assert_eq!(merged.id, "t1");
        assert_eq!(merged.created_at, 1_000);
        assert_eq!(merged.title, "Buy milk");
        assert_eq!(merged.description, "2l");
        assert!(merged.completed);
        assert_eq!(merged.updated_at, 5_000);
    }

    #[test]
    fn test_merge_updated_at_strictly_increases_on_clock_tie() {
        let task = Task::new("t1".to_string(), "a", "", 1_000);
        let merged = task.merged(&TaskPatch::default(), 1_000);
        assert_eq!(merged.updated_at, 1_001);

        // Clock went backwards
        let again = merged.merged(&TaskPatch::default(), 900);
        assert_eq!(again.updated_at, 1_002);
    }

    #[test]
    fn test_patch_deserializes_partial_json() {
        let patch: TaskPatch = serde_json::from_str(r#"{"completed": true}"#).unwrap();
        assert_eq!(patch, TaskPatch::completed(true));
        assert!(!patch.is_empty());
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn test_task_serializes_camel_case() {
        let task = Task::new("t1".to_string(), "a", "", 7);
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["createdAt"], 7);
        assert_eq!(json["updatedAt"], 7);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_id();
        let b = generate_id();
        assert!(a.starts_with("task-"));
        assert_ne!(a, b);
    }
}
