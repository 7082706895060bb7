//! Behavioural tests for the reconciliation pass over an in-memory cluster.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use warden_types::ServiceState;

use crate::errors::{Action, SyncError, Target};

use super::support::{
    self, ClusterEvent, ClusterWorld, parse_host, parse_process, parse_service,
};

type StepResult = Result<(), String>;

#[fixture]
fn world() -> RefCell<ClusterWorld> {
    support::cluster_world()
}

fn parse_state(text: &str) -> Result<ServiceState, String> {
    text.parse()
        .map_err(|error| format!("invalid service state '{text}': {error}"))
}

#[given("the reconciler runs {workers} workers")]
fn given_workers(world: &RefCell<ClusterWorld>, workers: usize) {
    world.borrow_mut().settings.reconcile_workers = workers;
}

#[given("a running service \"{id}\" in state {state}")]
fn given_running_service(world: &RefCell<ClusterWorld>, id: String, state: String) -> StepResult {
    let service = parse_service(&id)?;
    world.borrow().cluster.run_service(&service, parse_state(&state)?);
    Ok(())
}

#[given("a declared service \"{id}\"")]
fn given_declared_service(world: &RefCell<ClusterWorld>, id: String) -> StepResult {
    let service = parse_service(&id)?;
    world.borrow().cluster.declare_service(&service);
    Ok(())
}

#[given("a declared host \"{host}\"")]
fn given_declared_host(world: &RefCell<ClusterWorld>, host: String) -> StepResult {
    world.borrow().cluster.declare_host(parse_host(&host)?.as_str());
    Ok(())
}

#[given("an undeclared running host \"{host}\"")]
fn given_undeclared_host(world: &RefCell<ClusterWorld>, host: String) -> StepResult {
    world.borrow().cluster.register_host(parse_host(&host)?.as_str());
    Ok(())
}

#[given("an undeclared running process \"{key}\"")]
fn given_undeclared_process(world: &RefCell<ClusterWorld>, key: String) -> StepResult {
    let process = parse_process(&key)?;
    world.borrow().cluster.register_process(&process);
    Ok(())
}

#[given("an undeclared running service \"{id}\" in state {state}")]
fn given_undeclared_service(
    world: &RefCell<ClusterWorld>,
    id: String,
    state: String,
) -> StepResult {
    let service = parse_service(&id)?;
    world
        .borrow()
        .cluster
        .register_service(&service, parse_state(&state)?);
    Ok(())
}

#[given("starting service \"{id}\" fails")]
fn given_start_fails(world: &RefCell<ClusterWorld>, id: String) -> StepResult {
    let service = parse_service(&id)?;
    world
        .borrow()
        .cluster
        .fail_command(service, Action::StartService);
    Ok(())
}

#[given("starting host \"{host}\" fails")]
fn given_host_start_fails(world: &RefCell<ClusterWorld>, host: String) -> StepResult {
    let name = parse_host(&host)?;
    world.borrow().cluster.fail_command(name, Action::StartHost);
    Ok(())
}

#[given("starting process \"{key}\" fails")]
fn given_process_start_fails(world: &RefCell<ClusterWorld>, key: String) -> StepResult {
    let process = parse_process(&key)?;
    world
        .borrow()
        .cluster
        .fail_command(process, Action::StartProcess);
    Ok(())
}

#[given("killing process \"{key}\" fails")]
fn given_process_kill_fails(world: &RefCell<ClusterWorld>, key: String) -> StepResult {
    let process = parse_process(&key)?;
    world
        .borrow()
        .cluster
        .fail_command(process, Action::KillProcess);
    Ok(())
}

#[given("the control handle of process \"{key}\" is unavailable")]
fn given_handle_unavailable(world: &RefCell<ClusterWorld>, key: String) -> StepResult {
    let process = parse_process(&key)?;
    world.borrow().cluster.drop_handle(&process);
    Ok(())
}

#[given("the registry cannot list processes on host \"{host}\"")]
fn given_process_listing_fails(world: &RefCell<ClusterWorld>, host: String) -> StepResult {
    world
        .borrow()
        .cluster
        .fail_registered_processes(parse_host(&host)?.as_str());
    Ok(())
}

#[given("the configuration source is unavailable")]
fn given_configuration_unavailable(world: &RefCell<ClusterWorld>) {
    world.borrow().cluster.fail_configuration();
}

#[when("a reconciliation pass runs")]
fn when_pass_runs(world: &RefCell<ClusterWorld>) {
    world.borrow_mut().synchronize();
}

#[then("the pass succeeds")]
fn then_pass_succeeds(world: &RefCell<ClusterWorld>) {
    let state = world.borrow();
    match &state.sync_result {
        Some(Ok(())) => {}
        other => panic!("expected a clean pass, got {other:?}"),
    }
}

#[then("the pass fails with {count} failures")]
fn then_pass_fails_plural(world: &RefCell<ClusterWorld>, count: usize) {
    assert_aggregated(world, count);
}

#[then("the pass fails with {count} failure")]
fn then_pass_fails_singular(world: &RefCell<ClusterWorld>, count: usize) {
    assert_aggregated(world, count);
}

fn assert_aggregated(world: &RefCell<ClusterWorld>, count: usize) {
    let state = world.borrow();
    match &state.sync_result {
        Some(Err(SyncError::Aggregated(aggregate))) => {
            assert_eq!(aggregate.len(), count, "failures: {aggregate}");
        }
        other => panic!("expected {count} aggregated failures, got {other:?}"),
    }
}

#[then("the pass fails before building a snapshot")]
fn then_pass_fails_on_snapshot(world: &RefCell<ClusterWorld>) {
    let state = world.borrow();
    assert!(
        matches!(state.sync_result, Some(Err(SyncError::Snapshot(_)))),
        "expected a snapshot failure, got {:?}",
        state.sync_result
    );
}

#[then("no commands were issued")]
fn then_no_commands(world: &RefCell<ClusterWorld>) {
    let commands = world.borrow().described_commands();
    assert!(commands.is_empty(), "unexpected commands: {commands:?}");
}

#[then("exactly the commands \"{expected}\" were issued")]
fn then_exact_commands(world: &RefCell<ClusterWorld>, expected: String) {
    let wanted: Vec<&str> = expected.split(", ").collect();
    assert_eq!(world.borrow().described_commands(), wanted);
}

#[then("the commands include \"{expected}\"")]
fn then_commands_include(world: &RefCell<ClusterWorld>, expected: String) {
    let commands = world.borrow().described_commands();
    assert!(
        commands.iter().any(|command| *command == expected),
        "missing {expected}: {commands:?}"
    );
}

#[then("no command addressed service \"{id}\"")]
fn then_service_untouched(world: &RefCell<ClusterWorld>, id: String) {
    let commands = world.borrow().described_commands();
    let definition = format!("def-{}", id.rsplit('/').next().unwrap_or_default());
    assert!(
        commands
            .iter()
            .all(|command| !command.contains(&id) && !command.contains(&definition)),
        "service {id} was addressed: {commands:?}"
    );
}

#[then("a second reconciliation pass issues no commands")]
fn then_second_pass_idle(world: &RefCell<ClusterWorld>) {
    let mut state = world.borrow_mut();
    state.cluster.clear_commands();
    state.synchronize();
    assert!(
        matches!(state.sync_result, Some(Ok(()))),
        "second pass failed: {:?}",
        state.sync_result
    );
    let commands = state.described_commands();
    assert!(commands.is_empty(), "second pass issued {commands:?}");
}

#[then("service \"{id}\" is in state {expected}")]
fn then_service_state(world: &RefCell<ClusterWorld>, id: String, expected: String) -> StepResult {
    let service = parse_service(&id)?;
    let wanted = parse_state(&expected)?;
    let actual = world.borrow().cluster.service_state(&service);
    if actual == Some(wanted) {
        Ok(())
    } else {
        Err(format!("service {id} is {actual:?}, expected {wanted}"))
    }
}

fn failure_targets(world: &RefCell<ClusterWorld>) -> Vec<Option<Target>> {
    world
        .borrow()
        .sync_failures()
        .iter()
        .map(|failure| failure.target().cloned())
        .collect()
}

#[then("a failure names service \"{id}\"")]
fn then_failure_names_service(world: &RefCell<ClusterWorld>, id: String) -> StepResult {
    let target = Target::Service(parse_service(&id)?);
    let targets = failure_targets(world);
    assert!(targets.contains(&Some(target)), "targets: {targets:?}");
    Ok(())
}

#[then("a failure names process \"{key}\"")]
fn then_failure_names_process(world: &RefCell<ClusterWorld>, key: String) -> StepResult {
    let target = Target::Process(parse_process(&key)?);
    let targets = failure_targets(world);
    assert!(targets.contains(&Some(target)), "targets: {targets:?}");
    Ok(())
}

#[then("a failure names host \"{host}\"")]
fn then_failure_names_host(world: &RefCell<ClusterWorld>, host: String) -> StepResult {
    let target = Target::Host(parse_host(&host)?);
    let targets = failure_targets(world);
    assert!(targets.contains(&Some(target)), "targets: {targets:?}");
    Ok(())
}

#[then("failure {position} names service \"{id}\"")]
fn then_failure_at_names_service(
    world: &RefCell<ClusterWorld>,
    position: usize,
    id: String,
) -> StepResult {
    let target = Target::Service(parse_service(&id)?);
    let targets = failure_targets(world);
    let actual = position
        .checked_sub(1)
        .and_then(|index| targets.get(index))
        .cloned()
        .flatten();
    assert_eq!(actual, Some(target), "targets: {targets:?}");
    Ok(())
}

#[then("the snapshot recorded {count} diagnostic")]
fn then_snapshot_diagnostics(world: &RefCell<ClusterWorld>, count: usize) {
    let events = world.borrow().reporter.events();
    let recorded = events.iter().find_map(|event| match event {
        ClusterEvent::SnapshotBuilt { diagnostics, .. } => Some(*diagnostics),
        _ => None,
    });
    assert_eq!(recorded, Some(count), "events: {events:?}");
}

#[scenario(
    path = "tests/features/cluster_reconciliation.feature",
    name = "A converged cluster needs no commands"
)]
fn converged_cluster(world: RefCell<ClusterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/cluster_reconciliation.feature",
    name = "A declared host that is down is started as a unit"
)]
fn host_started_as_unit(world: RefCell<ClusterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/cluster_reconciliation.feature",
    name = "A declared process that is down is started without touching its services"
)]
fn process_started_without_services(world: RefCell<ClusterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/cluster_reconciliation.feature",
    name = "A service with its data source down is re-checked, not restarted"
)]
fn data_source_unavailable_is_checked(world: RefCell<ClusterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/cluster_reconciliation.feature",
    name = "Stopped and crashed services are started"
)]
fn stopped_services_started(world: RefCell<ClusterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/cluster_reconciliation.feature",
    name = "A declared service without a live binding is instantiated"
)]
fn declared_service_instantiated(world: RefCell<ClusterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/cluster_reconciliation.feature",
    name = "Undeclared processes and services are removed, never started"
)]
fn undeclared_nodes_removed(world: RefCell<ClusterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/cluster_reconciliation.feature",
    name = "Independent service failures are all reported"
)]
fn independent_failures_reported(world: RefCell<ClusterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/cluster_reconciliation.feature",
    name = "A process without a control handle is reported and its services skipped"
)]
fn missing_handle_reported(world: RefCell<ClusterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/cluster_reconciliation.feature",
    name = "A host whose processes cannot be listed is reported and skipped"
)]
fn degraded_host_skipped(world: RefCell<ClusterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/cluster_reconciliation.feature",
    name = "An unreadable configuration source stops the pass before any command"
)]
fn unreadable_configuration(world: RefCell<ClusterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/cluster_reconciliation.feature",
    name = "Parallel workers report the same failures as a sequential pass"
)]
fn parallel_workers(world: RefCell<ClusterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/cluster_reconciliation.feature",
    name = "Host and process command failures do not stop the walk"
)]
fn host_and_process_failures_collected(world: RefCell<ClusterWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/cluster_reconciliation.feature",
    name = "An undeclared host loses its processes but is never started"
)]
fn undeclared_host_emptied(world: RefCell<ClusterWorld>) {
    let _ = world;
}
