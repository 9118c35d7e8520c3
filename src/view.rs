//! Turns tasks into display rows. Nothing here touches storage or the terminal
//! directly; callers pass in "today" and a writer.

use crate::models::{Task, TaskId};
use chrono::NaiveDate;
use std::io::{self, Write};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub category: &'static str,
    pub priority: &'static str,
    pub status: &'static str,
    pub due: String,
    pub overdue: bool,
}

impl TaskView {
    pub fn new(task: &Task, today: NaiveDate) -> Self {
        Self {
            id: task.id,
            text: task.text.clone(),
            completed: task.completed,
            category: task.category.label(),
            priority: task.priority.label(),
            status: if task.completed { "Completed" } else { "Pending" },
            due: due_label(task.due_date, today),
            overdue: task.is_overdue(today),
        }
    }
}

pub fn render(tasks: &[Task], today: NaiveDate) -> Vec<TaskView> {
    tasks.iter().map(|task| TaskView::new(task, today)).collect()
}

/// "Today", "Tomorrow", "Mar 5, 2026" or "No due date".
pub fn due_label(due: Option<NaiveDate>, today: NaiveDate) -> String {
    let Some(date) = due else {
        return "No due date".to_string();
    };

    if date == today {
        "Today".to_string()
    } else if today.succ_opt() == Some(date) {
        "Tomorrow".to_string()
    } else {
        date.format("%b %-d, %Y").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Completed share in percent, rounded half up.
    pub progress: u8,
}

impl Stats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        let progress = if total == 0 {
            0
        } else {
            ((completed * 200 + total) / (total * 2)) as u8
        };

        Self {
            total,
            completed,
            pending: total - completed,
            progress,
        }
    }
}

/// Writes an aligned table of `views`, or a single line when there are none.
pub fn write_table<W: Write>(out: &mut W, views: &[TaskView]) -> io::Result<()> {
    if views.is_empty() {
        writeln!(out, "No tasks found")?;
        return Ok(());
    }

    let headers = ["ID", "Done", "Task", "Category", "Priority", "Due", "Status"];
    let rows: Vec<[String; 7]> = views
        .iter()
        .map(|v| {
            let due = if v.overdue {
                format!("{} (overdue)", v.due)
            } else {
                v.due.clone()
            };
            [
                v.id.to_string(),
                if v.completed { "[x]" } else { "[ ]" }.to_string(),
                v.text.clone(),
                v.category.to_string(),
                v.priority.to_string(),
                due,
                v.status.to_string(),
            ]
        })
        .collect();

    let mut widths = headers.map(|h| UnicodeWidthStr::width(h));
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(UnicodeWidthStr::width(cell.as_str()));
        }
    }

    write_row(out, &headers.map(str::to_string), &widths)?;
    for row in &rows {
        write_row(out, row, &widths)?;
    }
    Ok(())
}

fn write_row<W: Write>(out: &mut W, cells: &[String; 7], widths: &[usize; 7]) -> io::Result<()> {
    let line = cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| {
            let padding = width.saturating_sub(UnicodeWidthStr::width(cell.as_str()));
            format!("{}{}", cell, " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(out, "{}", line.trim_end())
}
