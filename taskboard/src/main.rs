//! `taskboard` — interactive terminal client for the task server.
//!
//! ```bash
//! # Connect to a local server
//! cargo run --bin taskboard
//!
//! # Another server, via flag or environment
//! cargo run --bin taskboard -- --server-url http://tasks.local:8080/api
//! TASKBOARD_URL=http://tasks.local:8080/api cargo run --bin taskboard
//! ```
//!
//! Ctrl-C cancels the request in flight; at the prompt it exits.

use std::io::Write as _;
use std::path::Path;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::api::TaskApi;
use taskboard::board::{Board, BoardError, CategoryAvailability};
use taskboard::config::{CliArgs, ClientConfig};
use taskboard::http::HttpTaskApi;
use taskboard::shell::{self, Command};
use taskboard::undo::UndoOutcome;

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file; stdout belongs to the shell.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let api = match HttpTaskApi::new(&config.server_url, config.request_timeout) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(server = %api.base_url(), "taskboard starting");

    let mut board = Board::new(api);
    if let Err(e) = board.refresh().await {
        println!("could not load tasks: {e}");
    }
    if board.load_categories().await == CategoryAvailability::Unavailable {
        println!("categories unavailable; tasks will be created without one");
    }
    print!("{}", shell::render_tasks(&board, &config.timestamp_format));

    run_shell(&mut board, &config).await;
    tracing::info!("taskboard exiting");
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown so buffered
/// entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run_shell<A: TaskApi>(board: &mut Board<A>, config: &ClientConfig) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt();
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => break,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "failed to read stdin");
                break;
            }
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }

        // Dropping the request future on Ctrl-C abandons the request.
        let output = tokio::select! {
            output = execute(board, command, config) => output,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("request cancelled");
                "cancelled\n".to_string()
            }
        };
        print!("{output}");
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

async fn execute<A: TaskApi>(
    board: &mut Board<A>,
    command: Command,
    config: &ClientConfig,
) -> String {
    let format = config.timestamp_format.as_str();
    let result = match command {
        Command::List => board.refresh().await.map(|()| shell::render_tasks(board, format)),
        Command::Categories => {
            let availability = board.load_categories().await;
            Ok(shell::render_categories(board.categories(), availability))
        }
        Command::Add { title, category } => {
            let category_id = match category {
                Some(name) => match board.category_named(&name) {
                    Some(c) => Some(c.id),
                    None => return format!("unknown category: {name}\n"),
                },
                None => None,
            };
            board
                .add_task(&title, category_id)
                .await
                .map(|task| format!("added {} \"{}\"\n", task.id, task.title))
        }
        Command::Toggle(id) => board.toggle_completed(id).await.map(|task| {
            let state = if task.completed { "done" } else { "not done" };
            format!("{} is {state}\n", task.id)
        }),
        Command::Remove(id) => board
            .remove(id)
            .await
            .map(|()| format!("deleted {id} (undo to restore)\n")),
        Command::Move { dragged, target } => board
            .move_task(dragged, target)
            .await
            .map(|()| shell::render_tasks(board, format)),
        Command::Undo => board.undo().await.map(|outcome| match outcome {
            None => "nothing to undo\n".to_string(),
            Some(UndoOutcome::Restored(task)) => {
                format!("restored \"{}\" as {}\n", task.title, task.id)
            }
            Some(UndoOutcome::Reordered(_)) => shell::render_tasks(board, format),
        }),
        Command::History => Ok(shell::render_history(board.undo_stack())),
        Command::Filter(None) => {
            board.set_filter(None);
            Ok(shell::render_tasks(board, format))
        }
        Command::Filter(Some(name)) => match board.category_named(&name).map(|c| c.id) {
            Some(id) => {
                board.set_filter(Some(id));
                Ok(shell::render_tasks(board, format))
            }
            None => Ok(format!("unknown category: {name}\n")),
        },
        Command::Help => Ok(format!("{}\n", shell::HELP)),
        Command::Quit => Ok(String::new()),
    };

    result.unwrap_or_else(|e: BoardError| format!("error: {e}\n"))
}
