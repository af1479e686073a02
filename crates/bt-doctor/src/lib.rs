//! Self-healing diagnostics for the boomtown daemon.
//!
//! The doctor runs a fixed set of checks over a town: each check diagnoses
//! one failure mode read-only (`run`) and, where meaningful, remediates it
//! idempotently (`fix`). The two shipped checks verify that the daemon has
//! an active patrol wiring and that no rig holds wisps stuck in progress
//! past the staleness threshold.
//!
//! A surrounding runner (CLI or daemon) builds a [`check::CheckContext`],
//! invokes checks through the instrumented [`check::run_check`] /
//! [`check::fix_check`] helpers, and renders the returned
//! [`check::CheckResult`]s to the operator.

pub mod check;
pub mod patrol_hooks;
pub mod patrol_stuck;
pub mod wisp_source;
