//! Core types for the task list.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A task record as persisted in the durable collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    /// Calendar date in `YYYY-MM-DD` form, no time component.
    pub due_date: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Milliseconds since the Unix epoch. Never less than `created_at`.
    pub updated_at: i64,
}

impl Task {
    /// Merge a patch over this record, returning the merged copy.
    ///
    /// `id` and `created_at` are never touched; `updated_at` is left for the
    /// caller to stamp.
    pub fn merged(&self, patch: &TaskPatch) -> Task {
        let mut next = self.clone();
        if let Some(ref title) = patch.title {
            next.title = title.clone();
        }
        if let Some(ref description) = patch.description {
            next.description = Some(description.clone());
        }
        if let Some(completed) = patch.completed {
            next.completed = completed;
        }
        if let Some(ref due_date) = patch.due_date {
            next.due_date = due_date.clone();
        }
        next
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskData {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub due_date: String,
}

impl TaskData {
    pub fn new(title: impl Into<String>, due_date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date: due_date.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update. Absent fields are preserved on the stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn due_date(due_date: impl Into<String>) -> Self {
        Self {
            due_date: Some(due_date.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.due_date.is_none()
    }
}

/// Date bucket a task falls into relative to the current day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Today,
    Tomorrow,
    Other,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Today, Category::Tomorrow, Category::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Today => "today",
            Category::Tomorrow => "tomorrow",
            Category::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "today" => Some(Category::Today),
            "tomorrow" => Some(Category::Tomorrow),
            "other" => Some(Category::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tasks partitioned into the three date buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasksByCategory {
    pub today: Vec<Task>,
    pub tomorrow: Vec<Task>,
    pub other: Vec<Task>,
}

impl TasksByCategory {
    pub fn bucket(&self, category: Category) -> &[Task] {
        match category {
            Category::Today => &self.today,
            Category::Tomorrow => &self.tomorrow,
            Category::Other => &self.other,
        }
    }

    pub fn bucket_mut(&mut self, category: Category) -> &mut Vec<Task> {
        match category {
            Category::Today => &mut self.today,
            Category::Tomorrow => &mut self.tomorrow,
            Category::Other => &mut self.other,
        }
    }

    pub fn into_bucket(self, category: Category) -> Vec<Task> {
        match category {
            Category::Today => self.today,
            Category::Tomorrow => self.tomorrow,
            Category::Other => self.other,
        }
    }

    pub fn len(&self) -> usize {
        self.today.len() + self.tomorrow.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Task {
        Task {
            id: "1".to_string(),
            title: "Original".to_string(),
            description: Some("notes".to_string()),
            completed: false,
            due_date: "2026-01-13".to_string(),
            created_at: 100,
            updated_at: 100,
        }
    }

    #[test]
    fn test_merged_only_touches_patched_fields() {
        let task = sample();
        let merged = task.merged(&TaskPatch::title("Updated"));

        assert_eq!(merged.title, "Updated");
        assert_eq!(merged.id, task.id);
        assert_eq!(merged.description, task.description);
        assert_eq!(merged.due_date, task.due_date);
        assert_eq!(merged.created_at, task.created_at);
        assert_eq!(merged.updated_at, task.updated_at);
    }

    #[test]
    fn test_task_uses_camel_case_on_the_wire() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["dueDate"], "2026-01-13");
        assert_eq!(json["createdAt"], 100);
        assert!(json.get("due_date").is_none());
    }

    #[test]
    fn test_absent_description_is_omitted() {
        let mut task = sample();
        task.description = None;
        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("description").is_none());

        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back.description, None);
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!(Category::from_str("Today"), Some(Category::Today));
        assert_eq!(Category::from_str("tomorrow"), Some(Category::Tomorrow));
        assert_eq!(Category::from_str("other"), Some(Category::Other));
        assert_eq!(Category::from_str("someday"), None);
    }

    #[test]
    fn test_empty_patch() {
        assert!(TaskPatch::default().is_empty());
        assert!(!TaskPatch::completed(true).is_empty());
    }
}
