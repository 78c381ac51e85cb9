//! Offline run directories
//!
//! Each opened session gets its own directory under the opener's root:
//!
//! ```text
//! <root>/offline-run-<YYYYmmdd_HHMMSS>-<id>/
//!     wandb-metadata.json   session parameters, written on open
//!     wandb-history.jsonl   one JSON object per log call, `_step` included
//!     config.json           merged run configuration, rewritten on update
//! ```
//!
//! Every call goes straight to disk.

use serde_json::{Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{SessionInit, SessionOpener, TrackingSession};
use crate::config::generate_id;
use crate::error::{SessionError, SessionResult};

pub const METADATA_FILE: &str = "wandb-metadata.json";
pub const HISTORY_FILE: &str = "wandb-history.jsonl";
pub const CONFIG_FILE: &str = "config.json";

/// Key holding the step in each history row
pub const STEP_KEY: &str = "_step";

/// Opens offline sessions under a root directory
#[derive(Debug, Clone)]
pub struct OfflineOpener {
    root: PathBuf,
}

impl OfflineOpener {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for OfflineOpener {
    fn default() -> Self {
        Self::new("wandb")
    }
}

impl SessionOpener for OfflineOpener {
    type Session = OfflineSession;

    fn open(&self, init: &SessionInit) -> SessionResult<Self::Session> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let run_dir = self
            .root
            .join(format!("offline-run-{}-{}", stamp, generate_id()));
        fs::create_dir_all(&run_dir)?;

        fs::write(
            run_dir.join(METADATA_FILE),
            serde_json::to_string_pretty(init)?,
        )?;

        let history = OpenOptions::new()
            .create(true)
            .append(true)
            .open(run_dir.join(HISTORY_FILE))?;

        tracing::info!(
            run_dir = %run_dir.display(),
            project = %init.project,
            group = %init.group,
            "Opened offline run"
        );

        Ok(OfflineSession {
            run_dir,
            history,
            config: Map::new(),
        })
    }
}

/// Session writing to a local run directory
#[derive(Debug)]
pub struct OfflineSession {
    run_dir: PathBuf,
    history: File,
    config: Map<String, Value>,
}

impl OfflineSession {
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Read back every history row of a run directory
    pub fn read_history(run_dir: &Path) -> SessionResult<Vec<Map<String, Value>>> {
        let contents = fs::read_to_string(run_dir.join(HISTORY_FILE))?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str::<Map<String, Value>>(line).map_err(SessionError::from)
            })
            .collect()
    }
}

impl TrackingSession for OfflineSession {
    fn log(&mut self, step: u64, payload: Map<String, Value>) -> SessionResult<()> {
        if payload.contains_key(STEP_KEY) {
            tracing::warn!(step, "Metric named {} is shadowed by the step", STEP_KEY);
        }

        let mut row = Map::with_capacity(payload.len() + 1);
        row.extend(payload);
        row.insert(STEP_KEY.to_string(), Value::from(step));

        let mut line = serde_json::to_string(&row)?;
        line.push('\n');
        self.history.write_all(line.as_bytes())?;

        tracing::trace!(step, "Appended history row");
        Ok(())
    }

    fn update_config(&mut self, entries: Map<String, Value>) -> SessionResult<()> {
        self.config.extend(entries);
        fs::write(
            self.run_dir.join(CONFIG_FILE),
            serde_json::to_string_pretty(&self.config)?,
        )?;
        Ok(())
    }
}
