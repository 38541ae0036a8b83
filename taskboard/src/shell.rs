//! Line commands for the interactive shell and their output.

use std::fmt::Write as _;

use taskboard_proto::task::{Category, Task, TaskId};

use crate::api::TaskApi;
use crate::board::{Board, BoardStats, CategoryAvailability};
use crate::undo::UndoStack;

pub const HELP: &str = "\
commands:
  ls                     list tasks (respecting the filter)
  cats                   list categories
  add <title> [#cat]     add a task, optionally in a category
  done <id>              toggle completion
  rm <id>                delete a task
  mv <id> <target-id>    move a task to the position of another
  undo                   undo the most recent delete or move
  history                show the undo history
  filter <cat|all>       show only one category
  help                   show this help
  quit                   exit";

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Categories,
    Add {
        title: String,
        category: Option<String>,
    },
    Toggle(TaskId),
    Remove(TaskId),
    Move {
        dragged: TaskId,
        target: TaskId,
    },
    Undo,
    History,
    /// `None` clears the filter.
    Filter(Option<String>),
    Help,
    Quit,
}

/// Why a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("not a task id: {0}")]
    BadId(String),
}

impl Command {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] for unknown commands or malformed arguments.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        let Some(word) = line.split_whitespace().next() else {
            return Ok(None);
        };
        let rest = line[word.len()..].trim();
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match word {
            "ls" | "list" => Self::List,
            "cats" | "categories" => Self::Categories,
            "add" => parse_add(rest)?,
            "done" | "toggle" => Self::Toggle(one_id(&args, "done <id>")?),
            "rm" | "delete" => Self::Remove(one_id(&args, "rm <id>")?),
            "mv" | "move" => match args.as_slice() {
                [dragged, target] => Self::Move {
                    dragged: parse_id(dragged)?,
                    target: parse_id(target)?,
                },
                _ => return Err(ParseError::Usage("mv <id> <target-id>")),
            },
            "undo" => Self::Undo,
            "history" => Self::History,
            "filter" => match args.as_slice() {
                ["all"] => Self::Filter(None),
                [] => return Err(ParseError::Usage("filter <category|all>")),
                _ => Self::Filter(Some(rest.trim_start_matches('#').to_string())),
            },
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// `add <title> [#category]`: a trailing `#word` names the category.
fn parse_add(rest: &str) -> Result<Command, ParseError> {
    let (title, category) = match rest.rsplit_once(" #") {
        Some((title, cat)) if !cat.trim().is_empty() && !cat.contains(' ') => {
            (title.trim(), Some(cat.trim().to_string()))
        }
        _ => (rest, None),
    };
    if title.is_empty() {
        return Err(ParseError::Usage("add <title> [#category]"));
    }
    Ok(Command::Add {
        title: title.to_string(),
        category,
    })
}

fn one_id(args: &[&str], usage: &'static str) -> Result<TaskId, ParseError> {
    match args {
        [id] => parse_id(id),
        _ => Err(ParseError::Usage(usage)),
    }
}

fn parse_id(raw: &str) -> Result<TaskId, ParseError> {
    raw.trim_start_matches('#')
        .parse()
        .map_err(|_| ParseError::BadId(raw.to_string()))
}

/// Renders the visible tasks followed by the stats line.
#[must_use]
pub fn render_tasks<A: TaskApi>(board: &Board<A>, timestamp_format: &str) -> String {
    let mut out = String::new();
    let visible = board.visible_tasks();
    if visible.is_empty() {
        out.push_str("no tasks\n");
    }
    for task in visible {
        render_task(&mut out, task, timestamp_format);
    }
    out.push_str(&render_stats(board.stats()));
    out
}

fn render_task(out: &mut String, task: &Task, timestamp_format: &str) {
    let mark = if task.completed { 'x' } else { ' ' };
    let category = task
        .category
        .as_ref()
        .map(|c| format!(" #{}", c.name))
        .unwrap_or_default();
    let _ = writeln!(
        out,
        "[{mark}] {:>4}  {}{category}  (p{}, {})",
        task.id,
        task.title,
        task.priority,
        task.created_at.format(timestamp_format)
    );
}

#[must_use]
pub fn render_stats(stats: BoardStats) -> String {
    format!(
        "{} tasks, {} done, {} remaining\n",
        stats.total,
        stats.completed,
        stats.remaining()
    )
}

#[must_use]
pub fn render_categories(categories: &[Category], availability: CategoryAvailability) -> String {
    if availability == CategoryAvailability::Unavailable {
        return "categories unavailable; tasks will be created without one\n".to_string();
    }
    categories
        .iter()
        .fold(String::new(), |mut out, c| {
            let _ = writeln!(out, "{:>4}  {}", c.id, c.name);
            out
        })
}

#[must_use]
pub fn render_history(stack: &UndoStack) -> String {
    if stack.is_empty() {
        return "nothing to undo\n".to_string();
    }
    stack
        .iter()
        .enumerate()
        .fold(String::new(), |mut out, (i, action)| {
            let marker = if i == 0 { "->" } else { "  " };
            let _ = writeln!(out, "{marker} {}", action.describe());
            out
        })
}
