use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use bt_telemetry::recorder::{status_str, Recorder};

// ---------------------------------------------------------------------------
// Context & result
// ---------------------------------------------------------------------------

/// Ephemeral per-run context handed to every check. Constructed fresh for
/// each diagnostic pass.
#[derive(Debug, Clone)]
pub struct CheckContext {
    /// Town deployment root containing the mayor directory and all rigs.
    pub town_root: PathBuf,
}

impl CheckContext {
    pub fn new(town_root: impl Into<PathBuf>) -> Self {
        Self {
            town_root: town_root.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Outcome of a single check run, rendered to the operator by the runner.
///
/// `fix_hint` is non-empty and actionable whenever `status` is not Ok.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub details: Vec<String>,
    pub fix_hint: String,
}

impl CheckResult {
    pub fn ok() -> Self {
        Self {
            status: CheckStatus::Ok,
            details: Vec::new(),
            fix_hint: String::new(),
        }
    }

    pub fn warning(fix_hint: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Warning,
            details: Vec::new(),
            fix_hint: fix_hint.into(),
        }
    }

    pub fn error(fix_hint: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Error,
            details: Vec::new(),
            fix_hint: fix_hint.into(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Check protocol
// ---------------------------------------------------------------------------

/// A single diagnostic: read-only diagnosis plus optional remediation.
///
/// `run` must never mutate persisted state and never fails outright;
/// recoverable conditions are encoded in the returned status. `fix` must be
/// idempotent (repeated calls converge to the same state) and must never
/// discard state it did not itself introduce.
pub trait Check {
    /// Stable identifier, e.g. `patrol-hooks-wired`.
    fn name(&self) -> &str;

    /// Whether `fix` is meaningful for this check.
    fn can_fix(&self) -> bool;

    fn run(&self, ctx: &CheckContext) -> CheckResult;

    fn fix(&self, _ctx: &CheckContext) -> anyhow::Result<()> {
        anyhow::bail!("check '{}' has no automated fix", self.name())
    }
}

/// The registered checks, in the order a runner should execute them. The
/// list is fixed and explicit; there is no reflective discovery.
pub fn all_checks() -> Vec<Box<dyn Check>> {
    vec![
        Box::new(crate::patrol_hooks::PatrolHooksWiredCheck::new()),
        Box::new(crate::patrol_stuck::PatrolNotStuckCheck::new()),
    ]
}

// ---------------------------------------------------------------------------
// Instrumented invocation
// ---------------------------------------------------------------------------

/// Run a check and report one telemetry event pair for the call-site.
pub fn run_check(check: &dyn Check, ctx: &CheckContext, recorder: &Recorder) -> CheckResult {
    let result = check.run(ctx);
    recorder.record_check_run(check.name(), result.status.as_str());
    result
}

/// Fix a check and report one telemetry event pair for the call-site.
pub fn fix_check(
    check: &dyn Check,
    ctx: &CheckContext,
    recorder: &Recorder,
) -> anyhow::Result<()> {
    let outcome = check.fix(ctx);
    recorder.record_check_fix(check.name(), status_str(&outcome));
    outcome
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
