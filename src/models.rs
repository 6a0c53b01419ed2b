// Data models for TodoStore

use chrono::{DateTime, NaiveDate, Utc};
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};

/// A unit of work tracked by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Incomplete and the due day has already started
    ///
    /// A due date means the start of that day, so a task due today is overdue.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due <= today)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| eyre!("Invalid priority: {} (expected high, medium or low)", s))
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    General,
    Personal,
    Developers,
    Design,
    Marketing,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::General,
        Category::Personal,
        Category::Developers,
        Category::Design,
        Category::Marketing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Personal => "personal",
            Category::Developers => "developers",
            Category::Design => "design",
            Category::Marketing => "marketing",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| eyre!("Invalid category: {}", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating a task. Only `title` is required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Partial update applied over an existing task
///
/// `description` and `due_date` are doubly optional: `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
    pub due_date: Option<Option<NaiveDate>>,
    pub tags: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Apply the set fields to `task`; timestamps are the caller's concern
    pub(crate) fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description.unwrap_or_default();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(tags) = self.tags {
            task.tags = tags;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_task() -> Task {
        let ts = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        Task {
            id: "task-1".to_string(),
            title: "Write report".to_string(),
            description: String::new(),
            completed: false,
            priority: Priority::High,
            category: Category::Design,
            due_date: NaiveDate::from_ymd_opt(2025, 3, 12),
            tags: vec!["work".to_string()],
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_priority_serialization() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        assert_eq!(serde_json::to_string(&Category::Developers).unwrap(), "\"developers\"");
    }

    #[test]
    fn test_priority_and_category_parse() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" low ".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!("Marketing".parse::<Category>().unwrap(), Category::Marketing);
        assert!("finance".parse::<Category>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(Category::default(), Category::General);
    }

    #[test]
    fn test_task_serializes_camel_case() {
        let json = serde_json::to_value(sample_task()).unwrap();
        assert_eq!(json["dueDate"], "2025-03-12");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert_eq!(json["priority"], "high");
    }

    #[test]
    fn test_task_missing_optional_fields_use_defaults() {
        let json = r#"{"id":"a","title":"T","createdAt":"2025-01-01T00:00:00Z","updatedAt":"2025-01-01T00:00:00Z"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.category, Category::General);
        assert!(task.tags.is_empty());
        assert!(task.due_date.is_none());
        assert!(!task.completed);
    }

    #[test]
    fn test_is_overdue() {
        let task = sample_task();
        assert!(!task.is_overdue(NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()));
        assert!(task.is_overdue(NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()));
        assert!(task.is_overdue(NaiveDate::from_ymd_opt(2025, 3, 13).unwrap()));

        let done = Task {
            completed: true,
            ..sample_task()
        };
        assert!(!done.is_overdue(NaiveDate::from_ymd_opt(2025, 3, 13).unwrap()));
    }

    #[test]
    fn test_patch_apply_and_clear() {
        let mut task = sample_task();
        let patch = TaskPatch {
            title: Some("Renamed".to_string()),
            due_date: Some(None),
            tags: Some(vec![]),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply(&mut task);

        assert_eq!(task.title, "Renamed");
        assert!(task.due_date.is_none());
        assert!(task.tags.is_empty());
        assert_eq!(task.priority, Priority::High);
        assert!(TaskPatch::default().is_empty());
    }
}
