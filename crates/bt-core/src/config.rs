use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// Daemon patrol config
// ---------------------------------------------------------------------------

/// Discriminator tag written into every persisted patrol config.
pub const DAEMON_PATROL_CONFIG_TYPE: &str = "daemon-patrol-config";

/// Current on-disk schema version.
pub const DAEMON_PATROL_CONFIG_VERSION: u32 = 1;

/// Heartbeat wiring: when enabled, the daemon fires a patrol pass on a fixed
/// interval even if no individual patrol entries exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_heartbeat_interval")]
    pub interval: String,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_heartbeat_interval(),
        }
    }
}

fn default_heartbeat_interval() -> String {
    "3m".into()
}

/// A single named patrol entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatrolConfig {
    pub enabled: bool,
    /// Agent role the patrol is dispatched to (e.g. `deacon`).
    pub agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
}

/// Persisted patrol configuration for one town's daemon.
///
/// Invariant: `kind` and `version` are always set on any persisted instance;
/// the patrol map may be empty. Patrol names are unique keys and insertion
/// order is irrelevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonPatrolConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat: Option<HeartbeatConfig>,
    #[serde(default)]
    pub patrols: BTreeMap<String, PatrolConfig>,
}

impl DaemonPatrolConfig {
    /// Structural default: tag and version set, everything else empty.
    /// This is what [`DaemonPatrolConfig::load`] returns for an absent file.
    pub fn empty() -> Self {
        Self {
            kind: DAEMON_PATROL_CONFIG_TYPE.to_string(),
            version: DAEMON_PATROL_CONFIG_VERSION,
            heartbeat: None,
            patrols: BTreeMap::new(),
        }
    }

    /// Fresh-install skeleton: heartbeat enabled at the default interval,
    /// no patrol entries yet.
    pub fn new() -> Self {
        Self {
            heartbeat: Some(HeartbeatConfig::default()),
            ..Self::empty()
        }
    }

    /// Whether the heartbeat is present and switched on.
    pub fn heartbeat_enabled(&self) -> bool {
        self.heartbeat.as_ref().is_some_and(|h| h.enabled)
    }

    /// Whether anything can trigger a patrol pass: at least one patrol
    /// entry, or the heartbeat alone. Neither condition subsumes the other.
    pub fn can_trigger_patrols(&self) -> bool {
        !self.patrols.is_empty() || self.heartbeat_enabled()
    }

    /// Load the config from `path`.
    ///
    /// An absent file is not a failure and yields [`DaemonPatrolConfig::empty`].
    /// A file that exists but fails to parse is a hard error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::empty());
        }
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Persist the config at `path`, creating the parent directory if needed.
    ///
    /// The document is written to a same-directory temp file and renamed into
    /// place, so a concurrent reader always observes a fully valid file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
        std::fs::write(&tmp, json)?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        tracing::debug!(
            path = %path.display(),
            patrols = self.patrols.len(),
            "daemon patrol config saved"
        );
        Ok(())
    }

    /// Additive merge: insert each default patrol whose name is not already
    /// a key. Existing entries are never removed or overwritten, so
    /// operator-defined patrols survive unchanged.
    pub fn merge_defaults(&mut self, defaults: &BTreeMap<String, PatrolConfig>) {
        for (name, patrol) in defaults {
            self.patrols
                .entry(name.clone())
                .or_insert_with(|| patrol.clone());
        }
    }
}

impl Default for DaemonPatrolConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The built-in patrol set installed on a fresh town. All three belong to
/// the deacon maintenance agent.
pub fn default_patrols() -> BTreeMap<String, PatrolConfig> {
    let deacon = |interval: &str| PatrolConfig {
        enabled: true,
        agent: "deacon".to_string(),
        interval: Some(interval.to_string()),
    };
    BTreeMap::from([
        ("rig-health".to_string(), deacon("10m")),
        ("wisp-triage".to_string(), deacon("15m")),
        ("session-reap".to_string(), deacon("30m")),
    ])
}

// ---------------------------------------------------------------------------
// Rig registry
// ---------------------------------------------------------------------------

/// Metadata for a single registered rig. Owned by the surrounding town
/// tooling; this crate only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RigEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Read-only registry of the rigs a town contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RigsConfig {
    #[serde(default)]
    pub rigs: BTreeMap<String, RigEntry>,
}

impl RigsConfig {
    /// Load the registry from `path`. An absent file yields an empty
    /// registry; a present-but-unparseable file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Registered rig names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rigs.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
