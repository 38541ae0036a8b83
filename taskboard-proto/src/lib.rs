//! Shared data model and JSON request/response contract for `Taskboard`.

pub mod api;
pub mod task;
