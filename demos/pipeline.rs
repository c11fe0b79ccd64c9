//! A small build pipeline: fetch sources, compile two components in parallel, link, package.
//!
//! Run with `cargo run --example pipeline`, or with tracing output:
//! `RUST_LOG=memotask=trace cargo run --example pipeline --features tracing`.
//!
//! Pass `--fail` to make one compile step fail and watch the error propagate.

use std::thread;
use std::time::{Duration, Instant};

use memotask::{BoxError, Task, TaskRef};

struct Step {
    label: String,
    duration: Duration,
    fail: bool,
}

fn run_step(step: Step) -> Result<(), BoxError> {
    println!("  -> {} ({:?})", step.label, step.duration);
    thread::sleep(step.duration);
    if step.fail {
        return Err(format!("{} exited with status 1", step.label).into());
    }
    Ok(())
}

fn step(name: &str, millis: u64, fail: bool, deps: Vec<TaskRef>) -> TaskRef {
    memotask::new(
        name,
        run_step,
        deps,
        Step {
            label: name.to_string(),
            duration: Duration::from_millis(millis),
            fail,
        },
    )
}

fn main() {
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let fail = std::env::args().any(|arg| arg == "--fail");

    let fetch = step("fetch", 50, false, vec![]);
    let core = step("compile-core", 200, false, vec![fetch.clone()]);
    let ui = step("compile-ui", 120, fail, vec![fetch.clone()]);
    let link = step("link", 40, false, vec![core, ui]);
    let package = step("package", 30, false, vec![link.clone()]);

    println!("graph:");
    for task in [&fetch, &link, &package] {
        println!("  {task}");
    }

    let started = Instant::now();
    println!("running:");
    package.trigger();
    let outcome = package.wait();

    println!("finished in {:?}", started.elapsed());
    for task in [&fetch, &link, &package] {
        println!("  {task}");
    }

    match outcome {
        Ok(()) => println!("pipeline succeeded"),
        Err(err) => {
            println!("pipeline failed: {err}");
            println!("failure path: {}", err.chain().join(" <- "));
            std::process::exit(1);
        }
    }
}
