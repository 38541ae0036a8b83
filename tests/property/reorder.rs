//! Property-based tests for task ordering.
//!
//! Uses proptest to verify, over an in-memory store:
//! 1. Creates are numbered 0..N-1 in creation order.
//! 2. A reorder assigns exactly 0..K-1 to the K listed tasks.
//! 3. Re-applying the same order yields identical priorities.
//! 4. Reorder followed by undo restores every priority exactly.
//! 5. Delete followed by restore keeps the deleted task's priority.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;
use taskboard_proto::api::{CreateTaskRequest, ReorderItem, UpdateTaskRequest};
use taskboard_proto::task::{Task, TaskId};
use taskboard_server::service::TaskService;
use taskboard_server::store::SqliteStore;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

fn service() -> TaskService<SqliteStore> {
    TaskService::new(Arc::new(SqliteStore::open_in_memory().unwrap()))
}

async fn create_n(service: &TaskService<SqliteStore>, n: usize) -> Vec<Task> {
    let mut tasks = Vec::with_capacity(n);
    for i in 0..n {
        let task = service
            .create_task(CreateTaskRequest::new(format!("task {i}"), None))
            .await
            .unwrap();
        tasks.push(task);
    }
    tasks
}

fn priorities(tasks: &[Task]) -> HashMap<TaskId, u32> {
    tasks.iter().map(|t| (t.id, t.priority)).collect()
}

/// A task count and a shuffled subset of indices into it.
fn arb_order() -> impl Strategy<Value = (usize, Vec<usize>)> {
    (1usize..12).prop_flat_map(|n| {
        let indices: Vec<usize> = (0..n).collect();
        (
            Just(n),
            prop::sample::subsequence(indices, 0..=n).prop_shuffle(),
        )
    })
}

/// Random priorities to scatter tasks before reordering.
fn arb_scattered() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..50, 1..10)
}

fn items_for(tasks: &[Task], order: &[usize]) -> Vec<ReorderItem> {
    order
        .iter()
        .map(|&i| ReorderItem::from(tasks[i].id))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn creates_are_numbered_in_order(n in 1usize..20) {
        runtime().block_on(async {
            let service = service();
            let created = create_n(&service, n).await;
            let got: Vec<u32> = created.iter().map(|t| t.priority).collect();
            let want: Vec<u32> = (0..).take(n).collect();
            prop_assert_eq!(got, want);
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn reorder_assigns_dense_priorities((n, order) in arb_order()) {
        runtime().block_on(async {
            let service = service();
            let tasks = create_n(&service, n).await;
            let before = priorities(&tasks);

            let outcome = service.reorder(&items_for(&tasks, &order)).await.unwrap();
            let after = priorities(&outcome.tasks);

            for (position, &i) in (0u32..).zip(&order) {
                prop_assert_eq!(after[&tasks[i].id], position);
            }
            for (i, task) in tasks.iter().enumerate() {
                if !order.contains(&i) {
                    prop_assert_eq!(after[&task.id], before[&task.id]);
                }
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn reorder_is_idempotent((n, order) in arb_order()) {
        runtime().block_on(async {
            let service = service();
            let tasks = create_n(&service, n).await;
            let items = items_for(&tasks, &order);

            let first = service.reorder(&items).await.unwrap();
            let second = service.reorder(&items).await.unwrap();
            prop_assert_eq!(priorities(&first.tasks), priorities(&second.tasks));
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn undo_restores_scattered_priorities(
        scattered in arb_scattered(),
        seed in any::<prop::sample::Index>(),
    ) {
        runtime().block_on(async {
            let service = service();
            let tasks = create_n(&service, scattered.len()).await;
            for (task, &priority) in tasks.iter().zip(&scattered) {
                service
                    .update_task(UpdateTaskRequest::for_task(task.id).priority(priority))
                    .await
                    .unwrap();
            }
            let before = priorities(&service.list_tasks().await.unwrap());

            // Rotate the full list by a random amount.
            let mut ids: Vec<TaskId> = tasks.iter().map(|t| t.id).collect();
            let shift = seed.index(ids.len());
            ids.rotate_left(shift);
            let items: Vec<ReorderItem> = ids.into_iter().map(ReorderItem::from).collect();

            let outcome = service.reorder(&items).await.unwrap();
            let restored = service.undo_reorder(&outcome.previous_order).await.unwrap();
            prop_assert_eq!(priorities(&restored), before);
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn restore_keeps_deleted_priority(n in 1usize..10, pick in any::<prop::sample::Index>()) {
        runtime().block_on(async {
            let service = service();
            let tasks = create_n(&service, n).await;
            let victim = &tasks[pick.index(n)];

            let snapshot = service.delete_task(victim.id).await.unwrap();
            let restored = service.restore_task(snapshot).await.unwrap();
            prop_assert_ne!(restored.id, victim.id);
            prop_assert_eq!(&restored.title, &victim.title);
            prop_assert_eq!(restored.priority, victim.priority);
            Ok::<(), TestCaseError>(())
        })?;
    }
}
