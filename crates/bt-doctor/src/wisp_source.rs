use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use bt_core::types::Wisp;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WispSourceError {
    /// The bridge binary could not be invoked or reported failure.
    #[error("wisp bridge failed: {0}")]
    Bridge(String),

    /// Reading the wisp log failed for a reason other than absence.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The bridge answered with something that is not a wisp row array.
    #[error("malformed bridge response: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// Source protocol
// ---------------------------------------------------------------------------

/// A queryable source of one rig's in-progress wisps.
///
/// Two implementations exist: the authoritative structured bridge and the
/// append-only log scan. Callers try the bridge first and fall back to the
/// log only when the bridge returns an error, so the bridge is preferred
/// whenever it answers. An `Ok(vec![])` from either source means "nothing
/// in progress", which is distinct from a failure to ask.
pub trait WispSource {
    fn in_progress(&self) -> Result<Vec<Wisp>, WispSourceError>;
}

// ---------------------------------------------------------------------------
// Bridge source
// ---------------------------------------------------------------------------

/// Default bridge binary name, resolved via PATH.
pub const BRIDGE_BIN: &str = "wisp";

const IN_PROGRESS_QUERY: &str =
    "SELECT id, title, status, updated_at FROM wisps WHERE status = 'in_progress'";

/// Queries a rig's structured wisp store through the external `wisp` CLI,
/// scoped to the rig's working directory.
///
/// Every failure mode (missing tool, bad rig path, non-zero exit,
/// unparseable output) surfaces as an explicit error, never as an empty
/// row set.
pub struct BridgeWispSource {
    rig_path: PathBuf,
    bridge_bin: String,
}

impl BridgeWispSource {
    pub fn new(rig_path: impl Into<PathBuf>) -> Self {
        Self {
            rig_path: rig_path.into(),
            bridge_bin: BRIDGE_BIN.to_string(),
        }
    }

    /// Override the bridge binary (tests substitute a stub).
    pub fn with_bridge_bin(mut self, bin: impl Into<String>) -> Self {
        self.bridge_bin = bin.into();
        self
    }
}

impl WispSource for BridgeWispSource {
    fn in_progress(&self) -> Result<Vec<Wisp>, WispSourceError> {
        if !self.rig_path.is_dir() {
            return Err(WispSourceError::Bridge(format!(
                "rig path does not exist: {}",
                self.rig_path.display()
            )));
        }

        let output = Command::new(&self.bridge_bin)
            .args(["sql", "--json", "-q", IN_PROGRESS_QUERY])
            .current_dir(&self.rig_path)
            .output()
            .map_err(|e| {
                WispSourceError::Bridge(format!("spawn {}: {}", self.bridge_bin, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WispSourceError::Bridge(format!(
                "{} exited with {}: {}",
                self.bridge_bin,
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| WispSourceError::Parse(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Log source
// ---------------------------------------------------------------------------

/// Scans a rig's append-only newline-delimited JSON wisp log.
///
/// A missing log file yields an empty result with no error: "nothing to
/// report" is not a scan failure. Malformed individual lines are skipped.
pub struct LogWispSource {
    log_path: PathBuf,
}

impl LogWispSource {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }
}

impl WispSource for LogWispSource {
    fn in_progress(&self) -> Result<Vec<Wisp>, WispSourceError> {
        let data = match std::fs::read_to_string(&self.log_path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut wisps = Vec::new();
        for (idx, line) in data.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Wisp>(line) {
                Ok(wisp) if wisp.is_in_progress() => wisps.push(wisp),
                Ok(_) => {}
                Err(e) => debug!(
                    path = %self.log_path.display(),
                    line = idx + 1,
                    error = %e,
                    "skipping malformed wisp log line"
                ),
            }
        }
        Ok(wisps)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn log_scan_missing_file_is_empty_not_an_error() {
        let source = LogWispSource::new("/nonexistent/path/wisps.jsonl");
        assert!(source.in_progress().unwrap().is_empty());
    }

    #[test]
    fn log_scan_skips_malformed_lines_and_other_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wisps.jsonl");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, r#"{{"id":"bt-1","title":"a","status":"in_progress","updated_at":"2026-02-22T10:00:00Z"}}"#).unwrap();
        writeln!(f, "this is not json").unwrap();
        writeln!(f, r#"{{"id":"bt-2","title":"b","status":"done","updated_at":"2026-02-22T10:00:00Z"}}"#).unwrap();
        writeln!(f).unwrap();
        writeln!(f, r#"{{"id":"bt-3","status":"in_progress","updated_at":"2026-02-22T11:00:00Z"}}"#).unwrap();

        let wisps = LogWispSource::new(&path).in_progress().unwrap();
        let ids: Vec<&str> = wisps.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["bt-1", "bt-3"]);
    }

    #[test]
    fn bridge_nonexistent_rig_path_is_an_explicit_error() {
        let source = BridgeWispSource::new("/nonexistent/rig/path");
        let err = source.in_progress().unwrap_err();
        assert!(matches!(err, WispSourceError::Bridge(_)));
    }

    #[test]
    fn bridge_missing_binary_is_an_explicit_error() {
        let dir = tempfile::tempdir().unwrap();
        let source =
            BridgeWispSource::new(dir.path()).with_bridge_bin("wisp-bridge-not-installed");
        let err = source.in_progress().unwrap_err();
        assert!(matches!(err, WispSourceError::Bridge(_)));
    }

    #[cfg(unix)]
    #[test]
    fn bridge_parses_row_array_from_stub() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let stub = dir.path().join("wisp-stub.sh");
        std::fs::write(
            &stub,
            "#!/bin/sh\necho '[{\"id\":\"bt-9\",\"title\":\"from bridge\",\"status\":\"in_progress\",\"updated_at\":\"2026-02-22T10:00:00Z\"}]'\n",
        )
        .unwrap();
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();

        let source = BridgeWispSource::new(dir.path())
            .with_bridge_bin(stub.display().to_string());
        let wisps = source.in_progress().unwrap();
        assert_eq!(wisps.len(), 1);
        assert_eq!(wisps[0].id, "bt-9");
    }

    #[cfg(unix)]
    #[test]
    fn bridge_garbage_stdout_is_a_parse_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let stub = dir.path().join("wisp-stub.sh");
        std::fs::write(&stub, "#!/bin/sh\necho 'rows: none'\n").unwrap();
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();

        let source = BridgeWispSource::new(dir.path())
            .with_bridge_bin(stub.display().to_string());
        assert!(matches!(
            source.in_progress().unwrap_err(),
            WispSourceError::Parse(_)
        ));
    }
}
