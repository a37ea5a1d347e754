//! Job entity - a construction project and its timeline

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::entity::{default_revision, Entity};
use crate::core::identity::{EntityId, EntityPrefix};

/// Job lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Planning,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Planning => write!(f, "planning"),
            JobStatus::Active => write!(f, "active"),
            JobStatus::OnHold => write!(f, "on_hold"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "planning" => Ok(JobStatus::Planning),
            "active" => Ok(JobStatus::Active),
            "on_hold" => Ok(JobStatus::OnHold),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(format!(
                "Invalid status: {}. Use planning, active, on_hold, completed, or cancelled",
                s
            )),
        }
    }
}

/// A timeline task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTask {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,

    /// Percent complete, 0-100
    #[serde(default)]
    pub progress: u8,
}

impl JobTask {
    /// Duration in days, inclusive of both ends
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TaskError {
    #[error("task '{name}' ends ({end}) before it starts ({start})")]
    EndsBeforeStart {
        name: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("progress must be between 0 and 100 (got {0})")]
    ProgressOutOfRange(u8),
}

/// Job entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier (JOB-...)
    pub id: EntityId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default)]
    pub status: JobStatus,

    /// Template the bill of quantities is derived from (TMPL-...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<EntityId>,

    /// How many times the template is built (e.g. units in a row of houses)
    #[serde(default = "default_multiplier")]
    pub quantity: f64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<JobTask>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "default_revision")]
    pub entity_revision: u32,
}

fn default_multiplier() -> f64 {
    1.0
}

impl Entity for Job {
    const PREFIX: EntityPrefix = EntityPrefix::Job;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl Job {
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Job),
            name: name.into(),
            client: None,
            location: None,
            status: JobStatus::default(),
            template_id: None,
            quantity: 1.0,
            tasks: Vec::new(),
            created: Utc::now(),
            author: author.into(),
            entity_revision: 1,
        }
    }

    /// Add a timeline task, keeping tasks ordered by start date
    pub fn add_task(&mut self, task: JobTask) -> Result<(), TaskError> {
        if task.end < task.start {
            return Err(TaskError::EndsBeforeStart {
                name: task.name,
                start: task.start,
                end: task.end,
            });
        }
        if task.progress > 100 {
            return Err(TaskError::ProgressOutOfRange(task.progress));
        }
        self.tasks.push(task);
        self.tasks.sort_by_key(|t| (t.start, t.end));
        Ok(())
    }

    /// First start and last end across all tasks
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.tasks.iter().map(|t| t.start).min()?;
        let end = self.tasks.iter().map(|t| t.end).max()?;
        Some((start, end))
    }

    /// Duration-weighted completion across all tasks
    pub fn progress(&self) -> f64 {
        let total: i64 = self.tasks.iter().map(|t| t.duration_days().max(0)).sum();
        if total == 0 {
            return 0.0;
        }
        let done: f64 = self
            .tasks
            .iter()
            .map(|t| t.duration_days().max(0) as f64 * f64::from(t.progress.min(100)) / 100.0)
            .sum();
        done / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn task(name: &str, start: &str, end: &str, progress: u8) -> JobTask {
        JobTask {
            name: name.to_string(),
            start: date(start),
            end: date(end),
            progress,
        }
    }

    #[test]
    fn test_tasks_sorted_and_span() {
        let mut job = Job::new("Riverside duplex", "a");
        job.add_task(task("Roofing", "2026-03-10", "2026-03-20", 0)).unwrap();
        job.add_task(task("Foundations", "2026-02-01", "2026-02-10", 100)).unwrap();

        assert_eq!(job.tasks[0].name, "Foundations");
        assert_eq!(job.span(), Some((date("2026-02-01"), date("2026-03-20"))));
    }

    #[test]
    fn test_task_validation() {
        let mut job = Job::new("Shed", "a");
        let err = job
            .add_task(task("Backwards", "2026-02-10", "2026-02-01", 0))
            .unwrap_err();
        assert!(matches!(err, TaskError::EndsBeforeStart { .. }));
        assert_eq!(
            job.add_task(task("Over", "2026-02-01", "2026-02-02", 150)),
            Err(TaskError::ProgressOutOfRange(150))
        );
        assert!(job.tasks.is_empty());
    }

    #[test]
    fn test_progress_is_duration_weighted() {
        let mut job = Job::new("Shed", "a");
        job.add_task(task("Slab", "2026-01-01", "2026-01-03", 100)).unwrap();
        job.add_task(task("Frame", "2026-01-04", "2026-01-04", 0)).unwrap();
        assert_eq!(job.progress(), 75.0);
        assert_eq!(Job::new("Empty", "a").progress(), 0.0);
    }

    #[test]
    fn test_progress_ignores_out_of_range_tasks_from_disk() {
        let mut job = Job::new("Shed", "a");
        // Pushed directly, as a hand-edited file would load
        job.tasks.push(task("Slab", "2026-01-01", "2026-01-02", 150));
        job.tasks.push(task("Frame", "2026-01-05", "2026-01-01", 50));
        assert_eq!(job.progress(), 100.0);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("on-hold".parse::<JobStatus>().unwrap(), JobStatus::OnHold);
        assert_eq!(JobStatus::OnHold.to_string(), "on_hold");
        assert!("done".parse::<JobStatus>().is_err());
    }
}
