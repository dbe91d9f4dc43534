//! Output formatting for text and JSON.

use crate::types::{Category, Task, TasksByCategory};
use serde::Serialize;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn checkbox(task: &Task) -> &'static str {
    if task.completed { "[x]" } else { "[ ]" }
}

/// One line per task: checkbox, due date, title, id.
pub fn format_task_line(task: &Task) -> String {
    format!(
        "{} {}  {}  ({})",
        checkbox(task),
        task.due_date,
        task.title,
        task.id
    )
}

/// Full detail for a single task.
pub fn format_task_text(task: &Task) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", checkbox(task), task.title));
    out.push_str(&format!("  id:       {}\n", task.id));
    out.push_str(&format!("  due:      {}\n", task.due_date));
    out.push_str(&format!("  created:  {}\n", format_millis(task.created_at)));
    out.push_str(&format!("  updated:  {}\n", format_millis(task.updated_at)));
    if let Some(ref desc) = task.description {
        out.push('\n');
        out.push_str(desc);
        out.push('\n');
    }
    out
}

/// A flat list under a heading.
pub fn format_tasks_text(heading: &str, tasks: &[Task]) -> String {
    let mut out = format!("{} ({})\n", heading, tasks.len());
    for task in tasks {
        out.push_str("  ");
        out.push_str(&format_task_line(task));
        out.push('\n');
    }
    out
}

/// Sections for today, tomorrow and everything else. Empty sections are
/// still printed so the layout is stable.
pub fn format_categorized_text(buckets: &TasksByCategory) -> String {
    if buckets.is_empty() {
        return "No tasks.\n".to_string();
    }
    let mut out = String::new();
    for category in Category::ALL {
        out.push_str(&format_tasks_text(section_title(category), buckets.bucket(category)));
    }
    out
}

fn section_title(category: Category) -> &'static str {
    match category {
        Category::Today => "Today",
        Category::Tomorrow => "Tomorrow",
        Category::Other => "Other",
    }
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// Pretty JSON for any serializable result.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, due: &str, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            title: format!("Task {}", id),
            description: None,
            completed,
            due_date: due.to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_task_line() {
        assert_eq!(
            format_task_line(&task("1", "2026-01-13", true)),
            "[x] 2026-01-13  Task 1  (1)"
        );
    }

    #[test]
    fn test_categorized_sections() {
        let buckets = TasksByCategory {
            today: vec![task("1", "2026-01-13", false)],
            tomorrow: vec![],
            other: vec![task("2", "2026-03-01", false)],
        };
        let text = format_categorized_text(&buckets);
        assert!(text.starts_with("Today (1)\n"));
        assert!(text.contains("Tomorrow (0)\n"));
        assert!(text.contains("Other (1)\n  [ ] 2026-03-01  Task 2  (2)\n"));
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(format_categorized_text(&TasksByCategory::default()), "No tasks.\n");
    }
}
