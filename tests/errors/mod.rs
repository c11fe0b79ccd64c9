//! Failure propagation and gating

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use memotask::{Task, TaskRef};
use test_case::test_case;

use crate::common::{counted, failing};

#[test]
fn test_direct_failure_is_wrapped_with_name() {
    let task = failing("leaf", "disk full", vec![]);
    task.trigger();

    let err = task.wait().unwrap_err();
    assert_eq!(err.to_string(), "task leaf failed: disk full");
    assert_eq!(err.task(), "leaf");
    assert_eq!(err.root_cause().to_string(), "disk full");
}

#[test]
fn test_dependency_failure_gates_dependent() {
    let calls = Arc::new(AtomicUsize::new(0));
    let dep = failing("dep", "boom", vec![]);
    let dependent = counted("dependent", &calls, vec![dep]);

    dependent.trigger();
    let err = dependent.wait().unwrap_err();

    let message = err.to_string();
    assert!(message.contains("dependent"));
    assert!(message.contains("dep"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failure_chain_nests_toward_root() {
    let calls = Arc::new(AtomicUsize::new(0));
    let a = failing("a", "boom", vec![]);
    let b = counted("b", &calls, vec![a]);
    let c = counted("c", &calls, vec![b]);

    c.trigger();
    let err = c.wait().unwrap_err();

    assert_eq!(
        err.to_string(),
        "task c failed: task b failed: task a failed: boom"
    );
    assert_eq!(err.chain(), vec!["c", "b", "a"]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test_case(0 ; "first dependency fails")]
#[test_case(1 ; "middle dependency fails")]
#[test_case(2 ; "last dependency fails")]
fn test_any_failing_dependency_blocks_function(failing_index: usize) {
    let calls = Arc::new(AtomicUsize::new(0));
    let deps: Vec<TaskRef> = (0..3)
        .map(|i| {
            let name = format!("dep{i}");
            if i == failing_index {
                failing(&name, "bad", vec![])
            } else {
                counted(&name, &calls, vec![])
            }
        })
        .collect();

    let root_calls = Arc::new(AtomicUsize::new(0));
    let root = counted("root", &root_calls, deps);

    root.trigger();
    let err = root.wait().unwrap_err();

    assert_eq!(err.chain(), vec!["root".to_string(), format!("dep{failing_index}")]);
    assert_eq!(root_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_first_failure_in_list_order_is_reported() {
    // Both fail; the dependent checks dependencies in list order.
    let first = failing("first", "one", vec![]);
    let second = failing("second", "two", vec![]);
    let root = counted("root", &Arc::new(AtomicUsize::new(0)), vec![second, first]);

    root.trigger();
    let err = root.wait().unwrap_err();
    assert_eq!(err.to_string(), "task root failed: task second failed: two");
}

#[test]
fn test_failure_is_not_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = Arc::clone(&attempts);
    let task = memotask::new(
        "flaky",
        move |_: ()| -> Result<(), String> {
            attempts_clone.fetch_add(1, Ordering::SeqCst);
            Err("transient".to_string())
        },
        None,
        (),
    );

    task.trigger();
    assert!(task.wait().is_err());
    task.trigger();
    assert!(task.wait().is_err());

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_shared_failing_dependency_fails_every_dependent() {
    let calls = Arc::new(AtomicUsize::new(0));
    let base = failing("base", "broken", vec![]);
    let left = counted("left", &calls, vec![base.clone()]);
    let right = counted("right", &calls, vec![base.clone()]);
    let top = counted("top", &calls, vec![left.clone(), right.clone()]);

    top.trigger();
    assert!(top.wait().is_err());

    // `right` was triggered by the fan-out; it completes on its own.
    assert!(right.wait().is_err());
    assert!(left.wait().is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_io_error_as_task_error() {
    let task = memotask::new(
        "read",
        |path: &'static str| std::fs::read(path).map(|_| ()),
        None,
        "/definitely/not/a/real/path/memotask",
    );

    task.trigger();
    let err = task.wait().unwrap_err();
    assert!(err.root_cause().downcast_ref::<std::io::Error>().is_some());
    assert!(err.to_string().starts_with("task read failed: "));
}
