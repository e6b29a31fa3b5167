use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Unit of repetition for a recurring task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    Monthly,
}

/// Describes how a task repeats.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    #[serde(rename = "type")]
    pub kind: RecurrenceKind,
    /// Every N units. Must be at least 1.
    pub interval: u32,
    /// Weekday indices (0 = Sunday .. 6 = Saturday), only used by weekly rules.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub days_of_week: BTreeSet<u8>,
    /// Generation stops once the next occurrence would fall on or after this date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl RecurrenceRule {
    pub fn new(kind: RecurrenceKind, interval: u32) -> Self {
        RecurrenceRule { kind, interval, days_of_week: BTreeSet::new(), end_date: None }
    }

    pub fn weekly_on(days: impl IntoIterator<Item = u8>) -> Self {
        RecurrenceRule {
            kind: RecurrenceKind::Weekly,
            interval: 1,
            days_of_week: days.into_iter().collect(),
            end_date: None,
        }
    }

    pub fn until(mut self, end: NaiveDate) -> Self {
        self.end_date = Some(end);
        self
    }

    /// Checks the rule invariants.
    ///
    /// Weekday lists only combine with an interval of 1; "every second
    /// Wednesday" is not expressible.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval < 1 {
            return Err(ValidationError::NonPositiveInterval(self.interval));
        }
        if let Some(&bad) = self.days_of_week.iter().find(|d| **d > 6) {
            return Err(ValidationError::InvalidWeekday(bad));
        }
        let weekly_days = self.kind == RecurrenceKind::Weekly && !self.days_of_week.is_empty();
        if weekly_days && self.interval > 1 {
            return Err(ValidationError::WeekdaysWithInterval(self.interval));
        }
        Ok(())
    }
}

impl FromStr for RecurrenceRule {
    type Err = ValidationError;

    /// Parses `daily`, `daily/2`, `weekly:1,3,5`, `monthly/3` with an optional
    /// trailing `until:YYYY-MM-DD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidRecurrence(s.to_string());
        let lower = s.trim().to_lowercase();
        let mut parts = lower.split_whitespace();
        let head = parts.next().ok_or_else(invalid)?;

        let (head, days) = match head.split_once(':') {
            Some((h, list)) => {
                let days = list
                    .split(',')
                    .map(|d| d.trim().parse::<u8>().map_err(|_| invalid()))
                    .collect::<Result<BTreeSet<u8>, _>>()?;
                (h, days)
            }
            None => (head, BTreeSet::new()),
        };
        let (name, interval) = match head.split_once('/') {
            Some((n, i)) => (n, i.parse::<u32>().map_err(|_| invalid())?),
            None => (head, 1),
        };
        let kind = match name {
            "daily" => RecurrenceKind::Daily,
            "weekly" => RecurrenceKind::Weekly,
            "monthly" => RecurrenceKind::Monthly,
            _ => return Err(invalid()),
        };
        if !days.is_empty() && kind != RecurrenceKind::Weekly {
            return Err(invalid());
        }

        let mut end_date = None;
        for part in parts {
            let date = part.strip_prefix("until:").ok_or_else(invalid)?;
            end_date = Some(
                NaiveDate::parse_from_str(date, "%Y-%m-%d")
                    .map_err(|_| ValidationError::InvalidDate(date.to_string()))?,
            );
        }

        let rule = RecurrenceRule { kind, interval, days_of_week: days, end_date };
        rule.validate()?;
        Ok(rule)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.kind {
            RecurrenceKind::Daily => "daily",
            RecurrenceKind::Weekly => "weekly",
            RecurrenceKind::Monthly => "monthly",
        };
        write!(f, "{name}")?;
        if self.interval != 1 {
            write!(f, "/{}", self.interval)?;
        }
        if !self.days_of_week.is_empty() {
            let days: Vec<String> = self.days_of_week.iter().map(|d| d.to_string()).collect();
            write!(f, ":{}", days.join(","))?;
        }
        if let Some(end) = self.end_date {
            write!(f, " until:{end}")?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[default]
    Task,
    Habit,
}

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Todo,
    Done,
}

/// Represents a single task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier, assigned by the store on insert.
    pub id: u64,
    /// Owner of the row.
    pub owner: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub task_type: TaskType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Idempotency token of a generated occurrence: `<source id>:<base date>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl Task {
    pub fn new(owner: impl Into<String>, title: impl Into<String>) -> Self {
        Task {
            id: 0,
            owner: owner.into(),
            title: title.into(),
            description: None,
            task_type: TaskType::Task,
            priority: Priority::Medium,
            category: None,
            project: None,
            status: Status::Todo,
            due_date: None,
            recurrence: None,
            created_at: Utc::now(),
            completed_at: None,
            origin: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }
}

/// A trackable daily habit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Habit {
    pub id: u64,
    pub owner: String,
    pub title: String,
    #[serde(default = "default_true")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// One day's completion mark for a tracked item.
///
/// Unmarking a day stores `done = false` rather than deleting the row.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DailyLogEntry {
    #[serde(default)]
    pub id: u64,
    pub item_id: u64,
    pub date: NaiveDate,
    pub done: bool,
}

impl DailyLogEntry {
    pub fn new(item_id: u64, date: NaiveDate, done: bool) -> Self {
        DailyLogEntry { id: 0, item_id, date, done }
    }
}

/// A checklist item under a task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Subtask {
    pub id: u64,
    pub task_id: u64,
    pub title: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

/// A named project. Tasks refer to it by title through `Task::project`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Project {
    pub id: u64,
    pub owner: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Note {
    pub id: u64,
    pub owner: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskDue,
    HabitReminder,
    ProjectDeadline,
    Achievement,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub owner: String,
    pub title: String,
    #[serde(default)]
    pub message: String,
    pub kind: NotificationKind,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Derived streak numbers for one tracked item. Never persisted.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct StreakResult {
    pub current_streak: u32,
    pub adherence_percent: Option<f64>,
}
