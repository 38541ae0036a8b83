//! Taskboard task server library.
//!
//! Exposes the storage, reorder engine, service and HTTP router for use in
//! tests and embedding. The server persists tasks and categories in `SQLite`
//! and serves them over a JSON HTTP API.

pub mod config;
pub mod engine;
pub mod http;
pub mod service;
pub mod store;
