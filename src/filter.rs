// View filtering for tasks

use crate::models::{Category, Priority, Task};
use chrono::{Datelike, Days, NaiveDate};
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};

/// The active view predicate
///
/// Every non-`all` / non-empty field must hold for a task to be shown (AND);
/// within `tags` any single match is enough (OR).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub status: StatusFilter,
    pub priority: PriorityFilter,
    pub category: CategoryFilter,
    pub search_query: String,
    pub tags: Vec<String>,
    pub date_range: DateRange,
}

impl FilterCriteria {
    pub fn is_default(&self) -> bool {
        *self == FilterCriteria::default()
    }

    /// Evaluate every criterion against `task`, with `today` as the reference day
    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        self.status.matches(task, today)
            && self.priority.admits(task.priority)
            && self.category.admits(task.category)
            && self.matches_search(task)
            && self.matches_tags(task)
            && self.date_range.matches(task, today)
    }

    fn matches_search(&self, task: &Task) -> bool {
        if self.search_query.is_empty() {
            return true;
        }
        let query = self.search_query.to_lowercase();
        task.title.to_lowercase().contains(&query) || task.description.to_lowercase().contains(&query)
    }

    fn matches_tags(&self, task: &Task) -> bool {
        self.tags.is_empty() || self.tags.iter().any(|tag| task.has_tag(tag))
    }

    /// Returns false if the tag was already present
    pub(crate) fn add_tag(&mut self, tag: &str) -> bool {
        if self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Returns false if the tag was not present
    pub(crate) fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
    Overdue,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Active,
        StatusFilter::Completed,
        StatusFilter::Overdue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Completed => "completed",
            StatusFilter::Overdue => "overdue",
        }
    }

    fn matches(self, task: &Task, today: NaiveDate) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
            StatusFilter::Overdue => task.is_overdue(today),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityFilter {
    #[default]
    All,
    High,
    Medium,
    Low,
}

impl PriorityFilter {
    pub const ALL: [PriorityFilter; 4] = [
        PriorityFilter::All,
        PriorityFilter::High,
        PriorityFilter::Medium,
        PriorityFilter::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityFilter::All => "all",
            PriorityFilter::High => "high",
            PriorityFilter::Medium => "medium",
            PriorityFilter::Low => "low",
        }
    }

    pub fn admits(self, priority: Priority) -> bool {
        self == PriorityFilter::All || self == PriorityFilter::from(priority)
    }
}

impl From<Priority> for PriorityFilter {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::High => PriorityFilter::High,
            Priority::Medium => PriorityFilter::Medium,
            Priority::Low => PriorityFilter::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryFilter {
    #[default]
    All,
    General,
    Personal,
    Developers,
    Design,
    Marketing,
}

impl CategoryFilter {
    pub const ALL: [CategoryFilter; 6] = [
        CategoryFilter::All,
        CategoryFilter::General,
        CategoryFilter::Personal,
        CategoryFilter::Developers,
        CategoryFilter::Design,
        CategoryFilter::Marketing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CategoryFilter::All => "all",
            CategoryFilter::General => "general",
            CategoryFilter::Personal => "personal",
            CategoryFilter::Developers => "developers",
            CategoryFilter::Design => "design",
            CategoryFilter::Marketing => "marketing",
        }
    }

    pub fn admits(self, category: Category) -> bool {
        self == CategoryFilter::All || self == CategoryFilter::from(category)
    }
}

impl From<Category> for CategoryFilter {
    fn from(category: Category) -> Self {
        match category {
            Category::General => CategoryFilter::General,
            Category::Personal => CategoryFilter::Personal,
            Category::Developers => CategoryFilter::Developers,
            Category::Design => CategoryFilter::Design,
            Category::Marketing => CategoryFilter::Marketing,
        }
    }
}

/// Due-date window. Tasks without a due date always pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateRange {
    #[default]
    All,
    Today,
    Tomorrow,
    ThisWeek,
    NextWeek,
    Overdue,
}

impl DateRange {
    pub const ALL: [DateRange; 6] = [
        DateRange::All,
        DateRange::Today,
        DateRange::Tomorrow,
        DateRange::ThisWeek,
        DateRange::NextWeek,
        DateRange::Overdue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DateRange::All => "all",
            DateRange::Today => "today",
            DateRange::Tomorrow => "tomorrow",
            DateRange::ThisWeek => "this-week",
            DateRange::NextWeek => "next-week",
            DateRange::Overdue => "overdue",
        }
    }

    fn matches(self, task: &Task, today: NaiveDate) -> bool {
        let Some(due) = task.due_date else {
            return true;
        };

        match self {
            DateRange::All => true,
            DateRange::Today => due == today,
            DateRange::Tomorrow => today.checked_add_days(Days::new(1)) == Some(due),
            DateRange::ThisWeek => in_week(due, week_start(today)),
            DateRange::NextWeek => week_start(today)
                .checked_add_days(Days::new(7))
                .is_some_and(|start| in_week(due, start)),
            DateRange::Overdue => task.is_overdue(today),
        }
    }
}

/// Sunday on or before `day`
pub fn week_start(day: NaiveDate) -> NaiveDate {
    let offset = day.weekday().num_days_from_sunday();
    day.checked_sub_days(Days::new(offset.into())).unwrap_or(day)
}

fn in_week(day: NaiveDate, sunday: NaiveDate) -> bool {
    let saturday = sunday.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
    sunday <= day && day <= saturday
}

macro_rules! impl_wire_str {
    ($ty:ty, $label:literal) => {
        impl std::str::FromStr for $ty {
            type Err = eyre::Report;

            fn from_str(s: &str) -> Result<Self> {
                <$ty>::ALL
                    .into_iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| eyre!("Invalid {} filter: {}", $label, s))
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_wire_str!(StatusFilter, "status");
impl_wire_str!(PriorityFilter, "priority");
impl_wire_str!(CategoryFilter, "category");
impl_wire_str!(DateRange, "date range");
