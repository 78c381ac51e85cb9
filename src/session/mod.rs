//! Tracking session seam
//!
//! A writer owns exactly one session handle and forwards every write to it.
//! Sessions are produced by a [`SessionOpener`], which lets the hosted client,
//! an offline run directory, or an in-memory recorder stand behind the same
//! writer.
//!
//! - [`RecordingSession`]: in-memory record of every call
//! - [`OfflineSession`]: run directory on local disk

pub mod offline;
pub mod recording;

pub use offline::{OfflineOpener, OfflineSession};
pub use recording::{LogCall, RecordingOpener, RecordingSession};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SessionResult;

/// Parameters a session is opened with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInit {
    pub project: String,
    pub group: String,
    /// Display name for the run
    #[serde(default)]
    pub name: Option<String>,
    /// Owning team / entity
    #[serde(default)]
    pub entity: Option<String>,
    /// Snapshot the launching code alongside the run
    #[serde(default)]
    pub save_code: bool,
    /// Fail instead of continuing when the service is unreachable
    #[serde(default)]
    pub force: bool,
}

/// An open run that accepts step-keyed metrics and configuration updates
pub trait TrackingSession: Send {
    /// Record `payload` at `step`
    fn log(&mut self, step: u64, payload: Map<String, Value>) -> SessionResult<()>;

    /// Merge `entries` into the run configuration, replacing existing keys
    fn update_config(&mut self, entries: Map<String, Value>) -> SessionResult<()>;
}

impl TrackingSession for Box<dyn TrackingSession> {
    fn log(&mut self, step: u64, payload: Map<String, Value>) -> SessionResult<()> {
        (**self).log(step, payload)
    }

    fn update_config(&mut self, entries: Map<String, Value>) -> SessionResult<()> {
        (**self).update_config(entries)
    }
}

/// Opens sessions
pub trait SessionOpener {
    type Session: TrackingSession;

    fn open(&self, init: &SessionInit) -> SessionResult<Self::Session>;
}

/// Build a single-entry JSON object
pub(crate) fn single_entry(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}
