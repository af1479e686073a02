use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use bt_core::config::RigsConfig;
use bt_core::town;
use bt_core::types::{format_age, Wisp};

use crate::check::{Check, CheckContext, CheckResult};
use crate::wisp_source::{BridgeWispSource, LogWispSource, WispSource};

/// Detects wisps left in progress past the staleness threshold, the
/// signature of an agent that died without releasing its task.
///
/// Each rig is scanned independently: the structured bridge is asked first,
/// and the append-only wisp log is scanned only when the bridge errors. A
/// rig with no usable backend contributes zero results and never aborts the
/// scan of the others.
pub struct PatrolNotStuckCheck {
    staleness: Duration,
    bridge_bin: Option<String>,
}

impl PatrolNotStuckCheck {
    pub fn new() -> Self {
        Self {
            staleness: Duration::hours(1),
            bridge_bin: None,
        }
    }

    /// Override the staleness threshold (default one hour).
    pub fn with_staleness_threshold(mut self, threshold: Duration) -> Self {
        self.staleness = threshold;
        self
    }

    /// Override the wisp bridge binary (tests substitute a stub).
    pub fn with_bridge_bin(mut self, bin: impl Into<String>) -> Self {
        self.bridge_bin = Some(bin.into());
        self
    }

    /// Stuck-wisp descriptors for one rig. Fallback to the log happens only
    /// on a bridge error; a double failure degrades to zero results.
    fn scan_rig(&self, ctx: &CheckContext, rig: &str, now: DateTime<Utc>) -> Vec<String> {
        let mut bridge = BridgeWispSource::new(town::rig_workdir(&ctx.town_root, rig));
        if let Some(bin) = &self.bridge_bin {
            bridge = bridge.with_bridge_bin(bin.clone());
        }

        let in_progress = match bridge.in_progress() {
            Ok(wisps) => wisps,
            Err(e) => {
                debug!(rig, error = %e, "wisp bridge unavailable, falling back to log scan");
                let log = LogWispSource::new(town::wisp_log_path(&ctx.town_root, rig));
                match log.in_progress() {
                    Ok(wisps) => wisps,
                    Err(e) => {
                        warn!(rig, error = %e, "wisp log scan failed, skipping rig");
                        return Vec::new();
                    }
                }
            }
        };

        in_progress
            .iter()
            .filter(|w| w.age(now) > self.staleness)
            .map(|w| {
                info!(
                    rig,
                    wisp_id = %w.id,
                    age_mins = w.age(now).num_minutes(),
                    "stuck wisp detected"
                );
                describe_stuck(rig, w, now)
            })
            .collect()
    }
}

impl Default for PatrolNotStuckCheck {
    fn default() -> Self {
        Self::new()
    }
}

fn describe_stuck(rig: &str, wisp: &Wisp, now: DateTime<Utc>) -> String {
    format!(
        "[{}] {} \"{}\": in progress for {}",
        rig,
        wisp.id,
        wisp.title,
        format_age(wisp.age(now))
    )
}

impl Check for PatrolNotStuckCheck {
    fn name(&self) -> &str {
        "patrol-not-stuck"
    }

    fn can_fix(&self) -> bool {
        // Stuck wisps need an operator or the daemon to intervene on the
        // owning agent; there is no config patch to apply.
        false
    }

    fn run(&self, ctx: &CheckContext) -> CheckResult {
        let rigs_path = town::rigs_config_path(&ctx.town_root);
        let rigs = match RigsConfig::load(&rigs_path) {
            Ok(rigs) => rigs,
            Err(e) => {
                warn!(path = %rigs_path.display(), error = %e, "rig registry unreadable, nothing to scan");
                return CheckResult::ok();
            }
        };

        let now = Utc::now();
        let mut result = CheckResult::ok();
        for rig in rigs.names() {
            for detail in self.scan_rig(ctx, rig, now) {
                result = result.with_detail(detail);
            }
        }

        if !result.details.is_empty() {
            result.status = crate::check::CheckStatus::Warning;
            result.fix_hint =
                "inspect the listed wisps; restart or reassign the owning agents, or close out finished work"
                    .to_string();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    // The bridge binary is pointed at a name that cannot resolve, so every
    // unit scenario exercises the log fallback deterministically.
    fn check() -> PatrolNotStuckCheck {
        PatrolNotStuckCheck::new().with_bridge_bin("wisp-bridge-not-installed")
    }

    fn write_rigs(town_root: &Path, names: &[&str]) {
        let rigs: serde_json::Map<String, serde_json::Value> = names
            .iter()
            .map(|n| (n.to_string(), serde_json::json!({})))
            .collect();
        let path = town::rigs_config_path(town_root);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            path,
            serde_json::to_string(&serde_json::json!({ "rigs": rigs })).unwrap(),
        )
        .unwrap();
    }

    fn write_wisp_log(town_root: &Path, rig: &str, lines: &[serde_json::Value]) {
        let path = town::wisp_log_path(town_root, rig);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let body: String = lines.iter().map(|l| format!("{}\n", l)).collect();
        std::fs::write(path, body).unwrap();
    }

    fn wisp_line(id: &str, age: Duration) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": format!("wisp {id}"),
            "status": "in_progress",
            "updated_at": (Utc::now() - age).to_rfc3339(),
        })
    }

    #[test]
    fn identity() {
        let check = PatrolNotStuckCheck::new();
        assert_eq!(check.name(), "patrol-not-stuck");
        assert!(!check.can_fix());
    }

    #[test]
    fn no_registry_means_nothing_to_scan() {
        let dir = tempfile::tempdir().unwrap();
        let result = check().run(&CheckContext::new(dir.path()));
        assert_eq!(result.status, crate::check::CheckStatus::Ok);
    }

    #[test]
    fn stale_wisp_yields_one_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        write_rigs(dir.path(), &["testrig"]);
        write_wisp_log(
            dir.path(),
            "testrig",
            &[wisp_line("tr-stuck1", Duration::hours(2))],
        );

        let result = check().run(&CheckContext::new(dir.path()));
        assert_eq!(result.status, crate::check::CheckStatus::Warning);
        assert_eq!(result.details.len(), 1);
        assert!(result.details[0].contains("tr-stuck1"));
        assert!(!result.fix_hint.is_empty());
    }

    #[test]
    fn fresh_wisp_is_not_stuck() {
        let dir = tempfile::tempdir().unwrap();
        write_rigs(dir.path(), &["testrig"]);
        write_wisp_log(
            dir.path(),
            "testrig",
            &[wisp_line("tr-fresh", Duration::minutes(5))],
        );

        let result = check().run(&CheckContext::new(dir.path()));
        assert_eq!(result.status, crate::check::CheckStatus::Ok);
        assert!(result.details.is_empty());
    }

    #[test]
    fn threshold_is_configurable() {
        let dir = tempfile::tempdir().unwrap();
        write_rigs(dir.path(), &["testrig"]);
        write_wisp_log(
            dir.path(),
            "testrig",
            &[wisp_line("tr-slow", Duration::minutes(10))],
        );

        let tight = check().with_staleness_threshold(Duration::minutes(1));
        let result = tight.run(&CheckContext::new(dir.path()));
        assert_eq!(result.status, crate::check::CheckStatus::Warning);
        assert_eq!(result.details.len(), 1);
    }

    #[test]
    fn one_dead_rig_never_hides_another() {
        let dir = tempfile::tempdir().unwrap();
        // "ghost" has no workdir at all: bridge errors, log is absent.
        write_rigs(dir.path(), &["ghost", "testrig"]);
        write_wisp_log(
            dir.path(),
            "testrig",
            &[wisp_line("tr-stuck1", Duration::hours(3))],
        );

        let result = check().run(&CheckContext::new(dir.path()));
        assert_eq!(result.status, crate::check::CheckStatus::Warning);
        assert_eq!(result.details.len(), 1);
        assert!(result.details[0].contains("testrig"));
    }

    #[cfg(unix)]
    #[test]
    fn bridge_answer_is_preferred_over_the_log() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        write_rigs(dir.path(), &["testrig"]);
        std::fs::create_dir_all(town::rig_workdir(dir.path(), "testrig")).unwrap();
        // The log names a different stale wisp; it must not be consulted.
        write_wisp_log(
            dir.path(),
            "testrig",
            &[wisp_line("from-log", Duration::hours(4))],
        );

        let stale = (Utc::now() - Duration::hours(2)).to_rfc3339();
        let stub = dir.path().join("bridge-stub.sh");
        std::fs::write(
            &stub,
            format!(
                "#!/bin/sh\necho '[{{\"id\":\"from-bridge\",\"title\":\"t\",\"status\":\"in_progress\",\"updated_at\":\"{stale}\"}}]'\n"
            ),
        )
        .unwrap();
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();

        let result = PatrolNotStuckCheck::new()
            .with_bridge_bin(stub.display().to_string())
            .run(&CheckContext::new(dir.path()));
        assert_eq!(result.details.len(), 1);
        assert!(result.details[0].contains("from-bridge"));
    }
}
