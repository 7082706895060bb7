//! Behavioural tests for the engine bootstrap sequence.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::{self, ClusterEvent, TestWorld};

#[fixture]
fn world() -> RefCell<TestWorld> {
    support::world()
}

#[given("a healthy configuration loader")]
fn given_healthy_loader(world: &RefCell<TestWorld>) {
    world.borrow_mut().use_successful_loader(1);
}

#[given("a healthy configuration loader with {workers} reconcile workers")]
fn given_loader_with_workers(world: &RefCell<TestWorld>, workers: usize) {
    world.borrow_mut().use_successful_loader(workers);
}

#[given("a failing configuration loader")]
fn given_failing_loader(world: &RefCell<TestWorld>) {
    world.borrow_mut().use_failing_loader();
}

#[when("the engine bootstrap runs")]
fn when_bootstrap_runs(world: &RefCell<TestWorld>) {
    world.borrow_mut().bootstrap();
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<TestWorld>) {
    let state = world.borrow();
    assert!(
        state.bootstrap_error().is_none(),
        "bootstrap error: {:?}",
        state.bootstrap_error()
    );
    assert!(state.engine().is_some(), "engine should have been assembled");
}

#[then("bootstrap fails")]
fn then_bootstrap_fails(world: &RefCell<TestWorld>) {
    assert!(
        world.borrow().bootstrap_error().is_some(),
        "bootstrap succeeded unexpectedly"
    );
}

#[then("no cluster command was issued")]
fn then_no_commands(world: &RefCell<TestWorld>) {
    let commands = world.borrow().cluster.commands();
    assert!(commands.is_empty(), "unexpected commands: {commands:?}");
}

#[then("the engine uses {workers} reconcile workers")]
fn then_engine_workers(world: &RefCell<TestWorld>, workers: usize) {
    let state = world.borrow();
    let engine = state.engine().expect("engine missing");
    assert_eq!(engine.settings().reconcile_workers, workers);
}

#[then("the reporter recorded bootstrap start")]
fn then_reporter_start(world: &RefCell<TestWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&ClusterEvent::BootstrapStarting),
        "bootstrap start event missing"
    );
}

#[then("the reporter recorded bootstrap success")]
fn then_reporter_success(world: &RefCell<TestWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&ClusterEvent::BootstrapSucceeded),
        "bootstrap success event missing"
    );
}

#[then("the reporter recorded bootstrap failure")]
fn then_reporter_failure(world: &RefCell<TestWorld>) {
    let events = world.borrow().reporter.events();
    let failed = events
        .iter()
        .any(|event| matches!(event, ClusterEvent::BootstrapFailed(_)));
    assert!(failed, "bootstrap failure event missing: {events:?}");
}

#[scenario(
    path = "tests/features/engine_bootstrap.feature",
    name = "Successful bootstrap assembles the engine"
)]
fn successful_bootstrap(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/engine_bootstrap.feature",
    name = "Configuration failure aborts bootstrap"
)]
fn failing_bootstrap(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/engine_bootstrap.feature",
    name = "Bootstrapped engine honours the configured worker count"
)]
fn bootstrap_worker_count(world: RefCell<TestWorld>) {
    let _ = world;
}
