use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use super::Category;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Succeeded,
    Failed,
}

/// The persisted progress document of one task.
///
/// `task_complete` is kept next to `status` so readers that only know the
/// boolean still see the gate.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub selected_option: Option<Category>,
    #[serde(default = "default_task_complete")]
    pub task_complete: bool,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results_found: Option<bool>,
    #[serde(default)]
    pub artifact: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_task_complete() -> bool {
    true
}

impl Default for ProgressRecord {
    // What a key with no document reads as: nothing in flight.
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            selected_option: None,
            task_complete: true,
            status: None,
            submitted_at: None,
            completed_at: None,
            results_found: None,
            artifact: None,
            error: None,
        }
    }
}

impl ProgressRecord {
    pub fn running(keywords: Vec<String>, category: Category) -> Self {
        Self {
            keywords,
            selected_option: Some(category),
            task_complete: false,
            status: Some(TaskStatus::Running),
            submitted_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task_complete
    }

    pub fn mark_running(&mut self) {
        self.task_complete = false;
        self.status = Some(TaskStatus::Running);
    }

    pub fn finish(&mut self, status: TaskStatus) {
        self.task_complete = true;
        self.status = Some(status);
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_document_reads_as_complete() {
        let record: ProgressRecord = serde_json::from_str("{}").unwrap();
        assert!(!record.is_running());
        assert_eq!(record, ProgressRecord::default());
    }

    #[test]
    fn legacy_document_is_understood() {
        let record: ProgressRecord = serde_json::from_str(
            r#"{"keywords": ["pipes"], "selected_option": "المقاولات", "task_complete": false}"#,
        )
        .unwrap();
        assert!(record.is_running());
        assert_eq!(record.selected_option, Some(Category::Contracting));
        assert_eq!(record.status, None);
    }

    #[test]
    fn finish_closes_the_gate() {
        let mut record = ProgressRecord::running(vec!["a".into()], Category::Trade);
        assert!(record.is_running());
        record.finish(TaskStatus::Failed);
        assert!(!record.is_running());
        assert_eq!(record.status, Some(TaskStatus::Failed));
        assert!(record.completed_at.is_some());
    }
}
