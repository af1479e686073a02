//! Town layout conventions.
//!
//! A town is the top-level deployment root. The mayor directory holds the
//! daemon-owned configuration; each rig lives in its own subdirectory with
//! an append-only wisp log under `.wisps/`.

use std::path::{Path, PathBuf};

/// Coordination directory holding daemon-owned configuration.
pub const MAYOR_DIR: &str = "mayor";
/// Patrol configuration file name inside the mayor directory.
pub const PATROL_CONFIG_FILE: &str = "daemon-patrol.json";
/// Rig registry file name inside the mayor directory.
pub const RIGS_FILE: &str = "rigs.json";
/// Per-rig directory holding the wisp log.
pub const WISP_LOG_DIR: &str = ".wisps";
/// Append-only newline-delimited JSON wisp log.
pub const WISP_LOG_FILE: &str = "wisps.jsonl";

pub fn mayor_dir(town_root: &Path) -> PathBuf {
    town_root.join(MAYOR_DIR)
}

pub fn daemon_patrol_config_path(town_root: &Path) -> PathBuf {
    mayor_dir(town_root).join(PATROL_CONFIG_FILE)
}

pub fn rigs_config_path(town_root: &Path) -> PathBuf {
    mayor_dir(town_root).join(RIGS_FILE)
}

/// Working directory of a named rig.
pub fn rig_workdir(town_root: &Path, rig: &str) -> PathBuf {
    town_root.join(rig)
}

/// Path of a rig's append-only wisp log.
pub fn wisp_log_path(town_root: &Path, rig: &str) -> PathBuf {
    rig_workdir(town_root, rig)
        .join(WISP_LOG_DIR)
        .join(WISP_LOG_FILE)
}

/// Default town root: `~/boomtown`.
pub fn default_town_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("boomtown")
}
