// Input validation in front of the store
//
// The store trusts what it is given; callers build tasks through `TaskForm`
// so that titles, descriptions, dates and tags are checked first.

use crate::models::{Category, NewTask, Priority};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

pub const MIN_TITLE_LEN: usize = 3;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_TAGS: usize = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    #[error("Tag is empty")]
    Empty,

    #[error("Tag already added: {0}")]
    Duplicate(String),

    #[error("At most {} tags are allowed", MAX_TAGS)]
    TooMany,
}

/// Field name to message, one entry per invalid field
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("Invalid task: {}", summarize(.fields))]
pub struct ValidationErrors {
    pub fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.insert(field, message.into());
    }

    fn single(field: &'static str, message: String) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }
}

fn summarize(fields: &BTreeMap<&'static str, String>) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Raw, unvalidated task input as typed by a user
#[derive(Debug, Clone, Default)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category: Category,
    /// Empty, or `YYYY-MM-DD`
    pub due_date: String,
    tags: Vec<String>,
}

impl TaskForm {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Add a tag, normalised to trimmed lowercase
    pub fn add_tag(&mut self, tag: &str) -> Result<(), TagError> {
        let tag = normalize_tag(tag);
        if tag.is_empty() {
            return Err(TagError::Empty);
        }
        if self.tags.contains(&tag) {
            return Err(TagError::Duplicate(tag));
        }
        if self.tags.len() >= MAX_TAGS {
            return Err(TagError::TooMany);
        }
        self.tags.push(tag);
        Ok(())
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let tag = normalize_tag(tag);
        let before = self.tags.len();
        self.tags.retain(|t| *t != tag);
        self.tags.len() != before
    }

    /// Check every field and produce store input, or all field errors at once
    pub fn validate(&self) -> Result<NewTask, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = check_title(&self.title).unwrap_or_else(|e| {
            errors.add("title", e);
            ""
        });
        let description = check_description(&self.description).unwrap_or_else(|e| {
            errors.add("description", e);
            None
        });
        let due_date = check_due_date(&self.due_date).unwrap_or_else(|e| {
            errors.add("dueDate", e);
            None
        });

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewTask {
            title: title.to_string(),
            description: description.map(str::to_string),
            priority: Some(self.priority),
            category: Some(self.category),
            due_date,
            tags: self.tags.clone(),
        })
    }

    // ========================================================================
    // Single-field checks, for edits that replace one field at a time
    // ========================================================================

    pub fn validate_title(raw: &str) -> Result<String, ValidationErrors> {
        check_title(raw)
            .map(str::to_string)
            .map_err(|e| ValidationErrors::single("title", e))
    }

    /// Trimmed description; `None` when blank
    pub fn validate_description(raw: &str) -> Result<Option<String>, ValidationErrors> {
        check_description(raw)
            .map(|d| d.map(str::to_string))
            .map_err(|e| ValidationErrors::single("description", e))
    }

    /// `YYYY-MM-DD`; `None` when blank
    pub fn validate_due_date(raw: &str) -> Result<Option<NaiveDate>, ValidationErrors> {
        check_due_date(raw).map_err(|e| ValidationErrors::single("dueDate", e))
    }
}

fn check_title(raw: &str) -> Result<&str, String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err("Title is required".to_string());
    }
    if title.chars().count() < MIN_TITLE_LEN {
        return Err(format!("Title must be at least {} characters", MIN_TITLE_LEN));
    }
    Ok(title)
}

fn check_description(raw: &str) -> Result<Option<&str>, String> {
    let description = raw.trim();
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(format!("Description must be less than {} characters", MAX_DESCRIPTION_LEN));
    }
    Ok((!description.is_empty()).then_some(description))
}

fn check_due_date(raw: &str) -> Result<Option<NaiveDate>, String> {
    match raw.trim() {
        "" => Ok(None),
        raw => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("Invalid date: {} (expected YYYY-MM-DD)", raw)),
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}
