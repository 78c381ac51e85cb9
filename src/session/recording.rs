//! In-memory session that records every call
//!
//! Handles are cheap clones of shared state, so a test can keep one handle
//! while the writer owns another.

use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{SessionInit, SessionOpener, TrackingSession};
use crate::error::{SessionError, SessionResult};

/// A single `log` call as received by the session
#[derive(Debug, Clone, PartialEq)]
pub struct LogCall {
    pub step: u64,
    pub payload: Map<String, Value>,
}

#[derive(Debug, Default)]
struct RecordedRun {
    init: Option<SessionInit>,
    logs: Vec<LogCall>,
    config: Map<String, Value>,
    config_updates: usize,
}

/// Shared in-memory session
#[derive(Debug, Clone, Default)]
pub struct RecordingSession {
    state: Arc<Mutex<RecordedRun>>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RecordedRun> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parameters the session was opened with, if it went through an opener
    pub fn init(&self) -> Option<SessionInit> {
        self.state().init.clone()
    }

    /// All log calls in arrival order
    pub fn logs(&self) -> Vec<LogCall> {
        self.state().logs.clone()
    }

    /// Merged run configuration
    pub fn config(&self) -> Map<String, Value> {
        self.state().config.clone()
    }

    /// Number of `update_config` calls received
    pub fn config_updates(&self) -> usize {
        self.state().config_updates
    }
}

impl TrackingSession for RecordingSession {
    fn log(&mut self, step: u64, payload: Map<String, Value>) -> SessionResult<()> {
        self.state().logs.push(LogCall { step, payload });
        Ok(())
    }

    fn update_config(&mut self, entries: Map<String, Value>) -> SessionResult<()> {
        let mut state = self.state();
        state.config.extend(entries);
        state.config_updates += 1;
        Ok(())
    }
}

/// Opener handing out one shared [`RecordingSession`]
#[derive(Debug, Clone, Default)]
pub struct RecordingOpener {
    session: RecordingSession,
    opens: Arc<Mutex<usize>>,
    fail_with: Option<String>,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opener whose `open` always fails with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            fail_with: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Handle to the session this opener hands out
    pub fn session(&self) -> RecordingSession {
        self.session.clone()
    }

    /// Number of `open` calls received
    pub fn open_count(&self) -> usize {
        *self.opens.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionOpener for RecordingOpener {
    type Session = RecordingSession;

    fn open(&self, init: &SessionInit) -> SessionResult<Self::Session> {
        *self.opens.lock().unwrap_or_else(PoisonError::into_inner) += 1;

        if let Some(reason) = &self.fail_with {
            return Err(SessionError::OpenFailed {
                project: init.project.clone(),
                reason: reason.clone(),
            });
        }

        self.session.state().init = Some(init.clone());
        Ok(self.session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::single_entry;
    use serde_json::json;

    fn init() -> SessionInit {
        SessionInit {
            project: "demo".to_string(),
            group: "g_1234abcd".to_string(),
            name: None,
            entity: None,
            save_code: false,
            force: false,
        }
    }

    #[test]
    fn test_records_logs_in_order() {
        let mut session = RecordingSession::new();
        session.log(2, single_entry("a", json!(1.0))).unwrap();
        session.log(1, single_entry("b", json!(2.0))).unwrap();

        let logs = session.logs();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].step, 2);
        assert_eq!(logs[1].step, 1);
        assert_eq!(logs[1].payload, single_entry("b", json!(2.0)));
    }

    #[test]
    fn test_config_last_write_wins() {
        let mut session = RecordingSession::new();
        session.update_config(single_entry("lr", json!(0.1))).unwrap();
        session.update_config(single_entry("lr", json!(0.2))).unwrap();

        assert_eq!(session.config().get("lr"), Some(&json!(0.2)));
        assert_eq!(session.config_updates(), 2);
    }

    #[test]
    fn test_opener_shares_state() {
        let opener = RecordingOpener::new();
        let mut opened = opener.open(&init()).unwrap();
        opened.log(0, single_entry("x", json!(1))).unwrap();

        let handle = opener.session();
        assert_eq!(handle.logs().len(), 1);
        assert_eq!(handle.init(), Some(init()));
        assert_eq!(opener.open_count(), 1);
    }

    #[test]
    fn test_failing_opener() {
        let opener = RecordingOpener::failing("unreachable");
        let err = opener.open(&init()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to open session for project 'demo': unreachable"
        );
        assert_eq!(opener.open_count(), 1);
        assert!(opener.session().init().is_none());
    }
}
