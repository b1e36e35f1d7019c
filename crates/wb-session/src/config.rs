// config.rs — On-disk layout for a weighbridge deployment.
//
// `for_project()` places all state under `<root>/.weighbridge/`:
//
//   .weighbridge/
//     sessions/       one JSON file per session
//     audit.jsonl     hash-chained audit trail
//     daemon.toml     HTTP daemon settings (read by wb-daemon)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use wb_audit::JsonlAuditLog;

use crate::error::SessionError;
use crate::lifecycle::SessionLifecycle;
use crate::store::JsonFileSessionStore;

/// Where the session store and audit log live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeighbridgeConfig {
    /// The `.weighbridge/` directory itself.
    pub data_dir: PathBuf,

    /// Directory for JsonFileSessionStore.
    pub sessions_dir: PathBuf,

    /// Path to the append-only audit log.
    pub audit_log: PathBuf,

    /// Path to the daemon settings file.
    pub daemon_config: PathBuf,
}

impl WeighbridgeConfig {
    /// Standard `.weighbridge/` layout under a project root.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let data_dir = project_root.as_ref().join(".weighbridge");
        Self {
            sessions_dir: data_dir.join("sessions"),
            audit_log: data_dir.join("audit.jsonl"),
            daemon_config: data_dir.join("daemon.toml"),
            data_dir,
        }
    }

    /// Build a lifecycle over the file-backed store and audit log.
    pub fn open_lifecycle(&self) -> Result<SessionLifecycle, SessionError> {
        let store = JsonFileSessionStore::new(&self.sessions_dir)?;
        let audit = JsonlAuditLog::open(&self.audit_log)?;
        tracing::debug!(
            sessions_dir = %self.sessions_dir.display(),
            audit_log = %self.audit_log.display(),
            "opened weighbridge stores"
        );
        Ok(SessionLifecycle::new(Arc::new(store), Arc::new(audit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn layout_lives_under_dot_weighbridge() {
        let config = WeighbridgeConfig::for_project("/srv/yard");
        assert_eq!(config.data_dir, PathBuf::from("/srv/yard/.weighbridge"));
        assert_eq!(
            config.sessions_dir,
            PathBuf::from("/srv/yard/.weighbridge/sessions")
        );
        assert_eq!(
            config.audit_log,
            PathBuf::from("/srv/yard/.weighbridge/audit.jsonl")
        );
    }

    #[test]
    fn open_lifecycle_creates_stores() {
        let dir = tempdir().unwrap();
        let config = WeighbridgeConfig::for_project(dir.path());
        let lifecycle = config.open_lifecycle().unwrap();
        lifecycle.start("T1").unwrap();

        assert!(config.sessions_dir.is_dir());
        assert!(config.audit_log.is_file());
    }
}
