//! Taskboard client library: API access, undo history and board state.

pub mod api;
pub mod board;
pub mod config;
pub mod http;
pub mod shell;
pub mod undo;

#[cfg(test)]
mod testing;
