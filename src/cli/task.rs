//! Task commands

use colored::Colorize;
use dialoguer::{Confirm, theme::ColorfulTheme};

use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::error::{Error, Result, StoreError};
use crate::output::display::TaskRow;
use crate::output::formatters::format_millis_local;
use crate::output::{format_table, print_json};
use crate::store::{Task, TaskPatch};

/// Longest accepted title, in characters
pub const MAX_TITLE_CHARS: usize = 100;

/// Longest accepted description, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Trim and check a title; returns the trimmed value
pub fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::Invalid("title must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(Error::Invalid(format!(
            "title is longer than {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_description(description: &str) -> Result<String> {
    let trimmed = description.trim();
    if trimmed.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(Error::Invalid(format!(
            "description is longer than {} characters",
            MAX_DESCRIPTION_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

fn print_tasks(tasks: &[Task], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(tasks)?,
        OutputFormat::Table => {
            let rows: Vec<TaskRow> = tasks.iter().map(TaskRow::from).collect();
            println!("{}", format_table(&rows, "No tasks."));
        }
        OutputFormat::Pretty => {
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for task in tasks {
                print_task_line(task);
            }
        }
    }
    Ok(())
}

fn print_task_line(task: &Task) {
    let mark = if task.completed {
        "✓".green()
    } else {
        "○".normal()
    };
    let title = if task.completed {
        task.title.dimmed().strikethrough()
    } else {
        task.title.bold()
    };
    println!("{} {}  {}", mark, title, task.id.dimmed());
    if !task.description.is_empty() {
        println!("    {}", task.description);
    }
}

fn print_task(task: &Task, verb: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(task)?,
        _ => {
            println!("{} {} task {}", "✓".green(), verb, task.id.bold());
            print_task_line(task);
        }
    }
    Ok(())
}

/// List tasks, newest first, optionally filtered by completion
pub async fn list(opts: &GlobalOptions, completed: bool, pending: bool) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let store = ctx.task_store().await?;

    if completed || pending {
        let tasks = store.list_by_completion(completed).await?;
        return print_tasks(&tasks, ctx.format);
    }

    let loaded = store.list().await;
    let view = store.view().await;
    if let Err(e) = loaded {
        log::debug!(
            "Task view after failed load: loading={}, error={:?}",
            view.loading,
            view.error
        );
        return Err(e.into());
    }
    print_tasks(&view.tasks, ctx.format)
}

pub async fn show(opts: &GlobalOptions, id: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let store = ctx.task_store().await?;
    let task = store
        .get(id)
        .await?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

    match ctx.format {
        OutputFormat::Json => print_json(&task)?,
        _ => {
            print_task_line(&task);
            println!(
                "    created {}, updated {}",
                format_millis_local(task.created_at),
                format_millis_local(task.updated_at)
            );
        }
    }
    Ok(())
}

pub async fn add(opts: &GlobalOptions, title: &str, description: &str) -> Result<()> {
    let title = validate_title(title)?;
    let description = validate_description(description)?;

    let ctx = CommandContext::new(opts)?;
    let store = ctx.task_store().await?;
    let task = store.add(&title, &description).await?;

    print_task(&task, "Added", ctx.format)
}

/// Replace the given fields of a task
pub async fn update(
    opts: &GlobalOptions,
    id: &str,
    title: Option<&str>,
    description: Option<&str>,
    completed: Option<bool>,
) -> Result<()> {
    let patch = TaskPatch {
        title: title.map(validate_title).transpose()?,
        description: description.map(validate_description).transpose()?,
        completed,
    };
    if patch.is_empty() {
        return Err(Error::Invalid(
            "nothing to update; pass --title, --description or --completed".to_string(),
        ));
    }

    let ctx = CommandContext::new(opts)?;
    let store = ctx.task_store().await?;
    let task = store.update(id, patch).await?;

    print_task(&task, "Updated", ctx.format)
}

pub async fn done(opts: &GlobalOptions, id: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let store = ctx.task_store().await?;
    let task = store.update(id, TaskPatch::completed(true)).await?;

    print_task(&task, "Completed", ctx.format)
}

pub async fn delete(opts: &GlobalOptions, id: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let store = ctx.task_store().await?;
    store.delete(id).await?;

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "deleted": id }))?,
        _ => println!("{} Deleted task {}", "✓".green(), id),
    }
    Ok(())
}

/// Delete every task after confirmation
pub async fn clear(opts: &GlobalOptions, yes: bool) -> Result<()> {
    let ctx = CommandContext::new(opts)?;

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Delete all tasks?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let store = ctx.task_store().await?;
    let removed = store.clear_all().await?;

    match ctx.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "removed": removed }))?,
        _ => println!("{} Removed {} tasks", "✓".green(), removed),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title_trims() {
        assert_eq!(validate_title("  Buy milk ").unwrap(), "Buy milk");
    }

    #[test]
    fn test_validate_title_rejects_blank() {
        assert!(matches!(validate_title("   "), Err(Error::Invalid(_))));
    }

    #[test]
    fn test_validate_title_length_limit() {
        let exact = "a".repeat(MAX_TITLE_CHARS);
        assert!(validate_title(&exact).is_ok());

        let over = "a".repeat(MAX_TITLE_CHARS + 1);
        assert!(validate_title(&over).is_err());
    }

    #[test]
    fn test_validate_title_counts_chars_not_bytes() {
        let title = "é".repeat(MAX_TITLE_CHARS);
        assert!(validate_title(&title).is_ok());
    }

    #[test]
    fn test_validate_description() {
        assert_eq!(validate_description("").unwrap(), "");
        assert!(validate_description(&"d".repeat(MAX_DESCRIPTION_CHARS)).is_ok());
        assert!(validate_description(&"d".repeat(MAX_DESCRIPTION_CHARS + 1)).is_err());
    }
}
