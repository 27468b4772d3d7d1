//! Table rows for tasks and snapshot entries

use tabled::Tabled;

use super::formatters::{format_millis_local, format_size, truncate};
use crate::offline::snapshot::EntrySummary;
use crate::store::Task;

/// One task in table output
#[derive(Debug, Tabled)]
pub struct TaskRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "DONE")]
    pub done: String,
    #[tabled(rename = "TITLE")]
    pub title: String,
    #[tabled(rename = "DESCRIPTION")]
    pub description: String,
    #[tabled(rename = "CREATED")]
    pub created: String,
    #[tabled(rename = "UPDATED")]
    pub updated: String,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            done: if task.completed { "x" } else { " " }.to_string(),
            title: truncate(&task.title, 40),
            description: truncate(&task.description, 40),
            created: format_millis_local(task.created_at),
            updated: format_millis_local(task.updated_at),
        }
    }
}

/// One cached response in table output
#[derive(Debug, Tabled)]
pub struct EntryRow {
    #[tabled(rename = "URL")]
    pub url: String,
    #[tabled(rename = "STATUS")]
    pub status: u16,
    #[tabled(rename = "SIZE")]
    pub size: String,
    #[tabled(rename = "STORED")]
    pub stored: String,
}

impl From<&EntrySummary> for EntryRow {
    fn from(entry: &EntrySummary) -> Self {
        Self {
            url: truncate(&entry.url, 60),
            status: entry.status,
            size: format_size(entry.size_bytes),
            stored: format_millis_local(entry.stored_at),
        }
    }
}
