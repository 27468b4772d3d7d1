//! Table output formatting

use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Rows},
};

/// Format rows as a rounded table, or `empty` when there are none
pub fn format_table<T: Tabled>(rows: &[T], empty: &str) -> String {
    if rows.is_empty() {
        return empty.to_string();
    }

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::display::TaskRow;
    use crate::store::Task;

    #[test]
    fn test_empty_uses_message() {
        let rows: Vec<TaskRow> = vec![];
        assert_eq!(format_table(&rows, "No tasks yet."), "No tasks yet.");
    }

    #[test]
    fn test_task_rows() {
        let mut done = Task::new("t2".to_string(), "Walk dog", "", 2_000);
        done.completed = true;
        let rows: Vec<TaskRow> = [Task::new("t1".to_string(), "Buy milk", "2%", 1_000), done]
            .iter()
            .map(TaskRow::from)
            .collect();

        let result = format_table(&rows, "");

        assert!(result.contains("ID"));
        assert!(result.contains("TITLE"));
        assert!(result.contains("Buy milk"));
        assert!(result.contains("Walk dog"));
        // Rounded style corners
        assert!(result.contains("╭"));
        assert!(result.contains("╰"));
    }
}
