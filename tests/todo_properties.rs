//! Behavioural tests for the todo store and tools.
//!
//! These tests drive the tools the way a client would and check the
//! invariants that must hold after every operation.

use serde_json::{json, Value};
use todo_widget_mcp::mcp::{TodoTool, ToolCallResult};
use todo_widget_mcp::todo::{TodoStats, TodoStore};

fn call(store: &TodoStore, name: &str, arguments: Value) -> ToolCallResult {
    TodoTool::parse(name, arguments)
        .expect("Tool arguments should be valid")
        .call(store)
}

fn assert_stats_reconcile(store: &TodoStore) {
    let stats = store.stats();
    assert_eq!(stats.pending + stats.completed, stats.total);
    assert_eq!(stats, TodoStats::of(&store.list()));
}

fn ids(store: &TodoStore) -> Vec<String> {
    store.list().into_iter().map(|t| t.id).collect()
}

// =============================================================================
// Scenario
// =============================================================================

#[test]
fn test_milk_and_dog_scenario() {
    let store = TodoStore::new();

    let added = call(&store, "add_todo", json!({ "title": "Buy milk" }));
    let s = added.structured_content.as_ref().unwrap();
    assert_eq!(s["addedTodo"]["id"], "1");
    assert_eq!(store.stats().total, 1);

    let added = call(&store, "add_todo", json!({ "title": "Walk dog" }));
    let s = added.structured_content.as_ref().unwrap();
    assert_eq!(s["addedTodo"]["id"], "2");
    assert_eq!(store.stats().total, 2);

    let toggled = call(&store, "toggle_todo", json!({ "id": "1" }));
    let s = toggled.structured_content.as_ref().unwrap();
    assert_eq!(s["toggledTodo"]["id"], "1");
    assert_eq!(s["toggledTodo"]["completed"], true);
    let stats = store.stats();
    assert_eq!((stats.pending, stats.completed), (1, 1));

    let cleared = call(&store, "clear_completed", json!({}));
    let s = cleared.structured_content.as_ref().unwrap();
    assert_eq!(s["clearedCount"], 1);
    assert_eq!(ids(&store), ["2"]);

    let deleted = call(&store, "delete_todo", json!({ "id": "2" }));
    assert!(!deleted.is_error);
    assert_eq!(store.stats().total, 0);

    let again = call(&store, "delete_todo", json!({ "id": "2" }));
    assert!(again.is_error);
    assert_eq!(again.first_text(), Some("Todo with id \"2\" not found"));
}

// =============================================================================
// Invariants
// =============================================================================

#[test]
fn test_ids_strictly_increase_from_one() {
    let store = TodoStore::new();
    let ids: Vec<u64> = (0..25)
        .map(|i| store.add(format!("task {i}")).id.parse().unwrap())
        .collect();

    assert_eq!(ids.first(), Some(&1));
    assert!(ids.windows(2).all(|w| w[1] == w[0] + 1));
}

#[test]
fn test_stats_reconcile_after_every_operation() {
    let store = TodoStore::new();
    assert_stats_reconcile(&store);

    for i in 0..6 {
        call(&store, "add_todo", json!({ "title": format!("t{i}") }));
        assert_stats_reconcile(&store);
    }
    for id in ["2", "4", "5", "99"] {
        call(&store, "toggle_todo", json!({ "id": id }));
        assert_stats_reconcile(&store);
    }
    call(&store, "delete_todo", json!({ "id": "1" }));
    assert_stats_reconcile(&store);
    call(&store, "clear_completed", json!({}));
    assert_stats_reconcile(&store);

    let listed = call(&store, "get_todos", json!({}));
    let stats = &listed.meta.as_ref().unwrap()["stats"];
    assert_eq!(
        stats["pending"].as_u64().unwrap() + stats["completed"].as_u64().unwrap(),
        stats["total"].as_u64().unwrap()
    );
}

#[test]
fn test_toggle_twice_restores_state() {
    let store = TodoStore::new();
    store.add("a");
    store.add("b");
    store.toggle("2").unwrap();

    for id in ["1", "2"] {
        let before = store.list();
        store.toggle(id).unwrap();
        store.toggle(id).unwrap();
        assert_eq!(store.list(), before);
    }
}

#[test]
fn test_delete_then_toggle_or_delete_is_not_found() {
    let store = TodoStore::new();
    for title in ["a", "b", "c"] {
        store.add(title);
    }

    store.delete("2").unwrap();
    let survivors = store.list();

    assert!(call(&store, "toggle_todo", json!({ "id": "2" })).is_error);
    assert!(call(&store, "delete_todo", json!({ "id": "2" })).is_error);
    assert_eq!(store.list(), survivors);
    assert_eq!(ids(&store), ["1", "3"]);
}

#[test]
fn test_clear_completed_removes_exactly_completed() {
    let store = TodoStore::new();
    for i in 0..8 {
        store.add(format!("t{i}"));
    }
    for id in ["1", "4", "8"] {
        store.toggle(id).unwrap();
    }

    let expected: Vec<String> = store
        .list()
        .into_iter()
        .filter(|t| !t.completed)
        .map(|t| t.id)
        .collect();

    assert_eq!(store.clear_completed(), 3);
    assert_eq!(ids(&store), expected);
    assert_eq!(store.clear_completed(), 0);
    assert_eq!(ids(&store), expected);
}

#[test]
fn test_concurrent_adds_get_unique_ids() {
    let store = std::sync::Arc::new(TodoStore::new());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = std::sync::Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..50 {
                    store.add(format!("thread {t} item {i}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let mut ids: Vec<u64> = store
        .list()
        .into_iter()
        .map(|t| t.id.parse().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=400).collect::<Vec<u64>>());
}

#[test]
fn test_toggle_result_matches_returned_list_under_contention() {
    let store = std::sync::Arc::new(TodoStore::new());
    for i in 0..4 {
        store.add(format!("t{i}"));
    }

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = std::sync::Arc::clone(&store);
            std::thread::spawn(move || {
                let id = (t % 4 + 1).to_string();
                for _ in 0..200 {
                    let result = call(&store, "toggle_todo", json!({ "id": id }));
                    let toggled = &result.structured_content.as_ref().unwrap()["toggledTodo"];
                    let listed = result.meta.as_ref().unwrap()["todos"]
                        .as_array()
                        .unwrap()
                        .iter()
                        .find(|todo| todo["id"] == id)
                        .cloned()
                        .unwrap();
                    assert_eq!(&listed, toggled);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }
}
