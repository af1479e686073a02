use tracing::info;

use bt_core::config::{default_patrols, DaemonPatrolConfig};
use bt_core::town;

use crate::check::{Check, CheckContext, CheckResult};

/// Verifies the daemon has an active patrol wiring.
///
/// Without either patrol entries or an enabled heartbeat the daemon starts,
/// idles, and never runs a patrol; this check catches that silent no-op
/// state and can install the built-in patrol set.
#[derive(Debug, Default)]
pub struct PatrolHooksWiredCheck;

impl PatrolHooksWiredCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Check for PatrolHooksWiredCheck {
    fn name(&self) -> &str {
        "patrol-hooks-wired"
    }

    fn can_fix(&self) -> bool {
        true
    }

    fn run(&self, ctx: &CheckContext) -> CheckResult {
        let path = town::daemon_patrol_config_path(&ctx.town_root);
        if !path.exists() {
            return CheckResult::warning("run the fix to install the default patrol set")
                .with_detail(format!(
                    "daemon patrol config not found at {}",
                    path.display()
                ));
        }

        let cfg = match DaemonPatrolConfig::load(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                return CheckResult::error(
                    "repair or remove the config file by hand; the fix will not overwrite it",
                )
                .with_detail(format!(
                    "daemon patrol config at {} is unreadable: {}",
                    path.display(),
                    e
                ));
            }
        };

        if !cfg.can_trigger_patrols() {
            return CheckResult::warning(
                "run the fix to install the default patrol set, or enable the heartbeat",
            )
            .with_detail("nothing configured to trigger patrols: no entries and heartbeat off");
        }

        CheckResult::ok()
    }

    fn fix(&self, ctx: &CheckContext) -> anyhow::Result<()> {
        let path = town::daemon_patrol_config_path(&ctx.town_root);

        // A config that exists but fails to parse is operator state and is
        // never overwritten; the parse error propagates instead.
        let mut cfg = if path.exists() {
            DaemonPatrolConfig::load(&path)?
        } else {
            DaemonPatrolConfig::new()
        };

        let before = cfg.patrols.len();
        cfg.merge_defaults(&default_patrols());
        cfg.save(&path)?;

        info!(
            path = %path.display(),
            added = cfg.patrols.len() - before,
            "patrol config reconciled"
        );
        Ok(())
    }
}
