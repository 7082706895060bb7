//! Test suites for the warden engine.

mod behaviour;
mod reconcile_behaviour;
mod support;
