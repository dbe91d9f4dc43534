//! Date categorization and list ordering.
//!
//! Pure functions; "today" is always passed in so categories are computed
//! fresh on every read instead of being cached across midnight.

use crate::types::{Category, Task, TasksByCategory};
use crate::validation::DATE_FORMAT;
use chrono::{Days, NaiveDate};
use std::cmp::Ordering;

/// Category for a `YYYY-MM-DD` due date relative to `today`.
///
/// Malformed dates land in `Other`.
pub fn category_of(due_date: &str, today: NaiveDate) -> Category {
    let Ok(date) = NaiveDate::parse_from_str(due_date, DATE_FORMAT) else {
        return Category::Other;
    };
    if date == today {
        Category::Today
    } else if Some(date) == today.checked_add_days(Days::new(1)) {
        Category::Tomorrow
    } else {
        Category::Other
    }
}

/// Total order: due date ascending, then creation time, then id.
pub fn sort_order(a: &Task, b: &Task) -> Ordering {
    compare_due_dates(&a.due_date, &b.due_date)
        .then(a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

fn compare_due_dates(a: &str, b: &str) -> Ordering {
    match (
        NaiveDate::parse_from_str(a, DATE_FORMAT),
        NaiveDate::parse_from_str(b, DATE_FORMAT),
    ) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// Sort in place with [`sort_order`].
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(sort_order);
}

/// Partition into buckets, keeping input order inside each bucket.
pub fn categorize<I>(tasks: I, today: NaiveDate) -> TasksByCategory
where
    I: IntoIterator<Item = Task>,
{
    let mut buckets = TasksByCategory::default();
    for task in tasks {
        let category = category_of(&task.due_date, today);
        buckets.bucket_mut(category).push(task);
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(id: &str, due: &str, created_at: i64) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {}", id),
            description: None,
            completed: false,
            due_date: due.to_string(),
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_category_of() {
        let today = day(2026, 1, 13);
        assert_eq!(category_of("2026-01-13", today), Category::Today);
        assert_eq!(category_of("2026-01-14", today), Category::Tomorrow);
        assert_eq!(category_of("2026-01-15", today), Category::Other);
        assert_eq!(category_of("2026-01-12", today), Category::Other);
        assert_eq!(category_of("not-a-date", today), Category::Other);
    }

    #[test]
    fn test_tomorrow_crosses_month_and_year() {
        assert_eq!(
            category_of("2027-01-01", day(2026, 12, 31)),
            Category::Tomorrow
        );
        assert_eq!(category_of("2028-02-29", day(2028, 2, 28)), Category::Tomorrow);
        assert_eq!(category_of("2028-03-01", day(2028, 2, 28)), Category::Other);
    }

    #[test]
    fn test_earlier_due_date_wins_regardless_of_created_at() {
        let a = task("a", "2026-01-13", 500);
        let b = task("b", "2026-01-15", 1);
        assert_eq!(sort_order(&a, &b), Ordering::Less);
        assert_eq!(sort_order(&b, &a), Ordering::Greater);
    }

    #[test]
    fn test_same_due_date_falls_back_to_created_at() {
        let first = task("z", "2026-01-13", 1);
        let second = task("a", "2026-01-13", 2);
        assert_eq!(sort_order(&first, &second), Ordering::Less);
    }

    #[test]
    fn test_order_is_total_for_distinct_tasks() {
        let a = task("a", "2026-01-13", 1);
        let b = task("b", "2026-01-13", 1);
        assert_eq!(sort_order(&a, &b), Ordering::Less);
        assert_eq!(sort_order(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_sort_tasks_scenario() {
        let mut tasks = vec![task("2", "2026-01-15", 1), task("1", "2026-01-13", 2)];
        sort_tasks(&mut tasks);
        let ids: Vec<_> = tasks.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_categorize_partitions_every_task_once() {
        let today = day(2026, 1, 13);
        let tasks = vec![
            task("1", "2026-01-13", 1),
            task("2", "2026-01-14", 2),
            task("3", "2026-02-01", 3),
            task("4", "2026-01-13", 4),
            task("5", "2025-12-31", 5),
        ];
        let buckets = categorize(tasks.clone(), today);

        assert_eq!(buckets.len(), tasks.len());
        let ids = |v: &[Task]| v.iter().map(|t| t.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&buckets.today), vec!["1", "4"]);
        assert_eq!(ids(&buckets.tomorrow), vec!["2"]);
        assert_eq!(ids(&buckets.other), vec!["3", "5"]);
    }

    #[test]
    fn test_categorize_preserves_input_order() {
        let today = day(2026, 1, 13);
        let tasks = vec![task("late", "2026-01-13", 9), task("early", "2026-01-13", 1)];
        let buckets = categorize(tasks, today);
        assert_eq!(buckets.today[0].id, "late");
        assert_eq!(buckets.today[1].id, "early");
    }
}
