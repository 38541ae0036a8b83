//! Integration tests for the client undo history against a live server.
//!
//! Drives a `Board` over `HttpTaskApi`: deletes and moves are recorded,
//! undone in most-recent-first order, and the history stays bounded.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use taskboard::board::{Board, RequestState};
use taskboard::http::HttpTaskApi;
use taskboard::undo::{UndoAction, UndoOutcome};
use taskboard_proto::task::{TaskId, UNDO_HISTORY_LIMIT};
use taskboard_server::http::start_server;
use taskboard_server::service::TaskService;
use taskboard_server::store::SqliteStore;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn board_with(titles: &[&str]) -> Board<HttpTaskApi> {
    let store = SqliteStore::open_in_memory().unwrap();
    let (addr, _handle) = start_server("127.0.0.1:0", TaskService::new(Arc::new(store)))
        .await
        .expect("failed to start server");
    let api = HttpTaskApi::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();

    let mut board = Board::new(api);
    for title in titles {
        board.add_task(title, None).await.unwrap();
    }
    board
}

fn titles(board: &Board<HttpTaskApi>) -> Vec<&str> {
    board.tasks().iter().map(|t| t.title.as_str()).collect()
}

fn id_of(board: &Board<HttpTaskApi>, title: &str) -> TaskId {
    board.tasks().iter().find(|t| t.title == title).unwrap().id
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn undo_delete_restores_task_at_original_position() {
    let mut board = board_with(&["A", "B", "C"]).await;
    let b = id_of(&board, "B");

    board.remove(b).await.unwrap();
    assert_eq!(titles(&board), vec!["A", "C"]);

    let outcome = board.undo().await.unwrap();
    let Some(UndoOutcome::Restored(task)) = outcome else {
        panic!("expected a restore, got {outcome:?}");
    };
    assert_ne!(task.id, b);
    assert_eq!(task.priority, 1);

    board.refresh().await.unwrap();
    assert_eq!(titles(&board), vec!["A", "B", "C"]);
    assert!(board.undo_stack().is_empty());
}

#[tokio::test]
async fn undo_move_restores_previous_order() {
    let mut board = board_with(&["A", "B", "C"]).await;
    let (a, c) = (id_of(&board, "A"), id_of(&board, "C"));

    board.move_task(c, a).await.unwrap();
    board.refresh().await.unwrap();
    assert_eq!(titles(&board), vec!["C", "A", "B"]);

    board.undo().await.unwrap();
    board.refresh().await.unwrap();
    assert_eq!(titles(&board), vec!["A", "B", "C"]);
    assert_eq!(board.state(), &RequestState::Ready);
}

#[tokio::test]
async fn undo_runs_most_recent_first() {
    let mut board = board_with(&["A", "B", "C", "D"]).await;
    let (a, d) = (id_of(&board, "A"), id_of(&board, "D"));

    board.move_task(d, a).await.unwrap();
    assert_eq!(titles(&board), vec!["D", "A", "B", "C"]);
    board.remove(id_of(&board, "B")).await.unwrap();
    assert!(matches!(
        board.undo_stack().peek(),
        Some(UndoAction::Delete { .. })
    ));

    // Undo the delete: B comes back at its post-move priority.
    board.undo().await.unwrap();
    board.refresh().await.unwrap();
    assert_eq!(titles(&board), vec!["D", "A", "B", "C"]);

    // Undo the move. The restored B has a new id, so the recorded
    // priority for the original B no longer applies to anything.
    board.undo().await.unwrap();
    board.refresh().await.unwrap();
    let priority = |title: &str| {
        board
            .tasks()
            .iter()
            .find(|t| t.title == title)
            .unwrap()
            .priority
    };
    assert_eq!(priority("A"), 0);
    assert_eq!(priority("C"), 2);
    assert_eq!(priority("D"), 3);
    assert!(board.undo_stack().is_empty());
}

#[tokio::test]
async fn history_holds_at_most_five_entries() {
    let mut board = board_with(&["1", "2", "3", "4", "5", "6", "7"]).await;
    for title in ["1", "2", "3", "4", "5", "6"] {
        board.remove(id_of(&board, title)).await.unwrap();
    }
    assert_eq!(board.undo_stack().len(), UNDO_HISTORY_LIMIT);

    let kept: Vec<String> = board
        .undo_stack()
        .iter()
        .filter_map(|entry| match entry {
            UndoAction::Delete { deleted_task } => Some(deleted_task.task.title.clone()),
            UndoAction::Reorder { .. } => None,
        })
        .collect();
    assert_eq!(kept, vec!["6", "5", "4", "3", "2"]);

    for _ in 0..UNDO_HISTORY_LIMIT {
        board.undo().await.unwrap();
    }
    assert_eq!(board.undo().await.unwrap(), None);
    board.refresh().await.unwrap();
    assert_eq!(board.tasks().len(), 6);
    assert!(board.tasks().iter().all(|t| t.title != "1"));
}
