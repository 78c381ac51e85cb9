//! MetricWriter backed by an experiment-tracking session
//!
//! Scalars, summaries and hyperparameters are forwarded one entry per call.
//! Images, audio, text and histograms are rejected; videos are tolerated with
//! a single warning.

use serde_json::Value;
use std::path::Path;
use std::sync::Once;

use crate::config::{resolve_group, RunConfig};
use crate::error::{WriterError, WriterResult};
use crate::session::{single_entry, SessionInit, SessionOpener, TrackingSession};
use crate::writer::{Array, DataKind, Mapping, MetricWriter, Scalar};

/// Writer forwarding metrics to a tracking session
pub struct WandbWriter<S: TrackingSession> {
    /// `None` when no credential was configured
    session: Option<S>,
    group: String,
    video_warning: Once,
}

impl<S: TrackingSession> WandbWriter<S> {
    /// Create a writer, opening a session through `opener` if `config` carries
    /// an API key.
    ///
    /// `logdir` is accepted for parity with file-based writers and is not used.
    pub fn new<O>(logdir: impl AsRef<Path>, config: &RunConfig, opener: &O) -> WriterResult<Self>
    where
        O: SessionOpener<Session = S>,
    {
        tracing::debug!(
            logdir = %logdir.as_ref().display(),
            "WandbWriter ignores logdir"
        );

        let group = resolve_group(config.group.as_deref());

        let session = if config.has_credential() {
            config.validate()?;

            let init = SessionInit {
                project: config.project.clone(),
                group: group.clone(),
                name: config.name.clone(),
                entity: config.team.clone(),
                save_code: false,
                force: false,
            };

            tracing::info!(
                project = %init.project,
                group = %init.group,
                entity = ?init.entity,
                "Opening tracking session"
            );
            Some(opener.open(&init)?)
        } else {
            tracing::debug!(group = %group, "No API key configured, session not opened");
            None
        };

        Ok(Self {
            session,
            group,
            video_warning: Once::new(),
        })
    }

    /// Wrap an already opened session
    pub fn with_session(session: S, group: impl Into<String>) -> Self {
        Self {
            session: Some(session),
            group: group.into(),
            video_warning: Once::new(),
        }
    }

    /// Resolved group the run is logged under
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Whether a session was opened
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&S> {
        self.session.as_ref()
    }

    fn session_mut(&mut self) -> WriterResult<&mut S> {
        self.session.as_mut().ok_or(WriterError::NoActiveSession)
    }

    fn log_each<V>(
        &mut self,
        step: u64,
        values: &Mapping<V>,
        to_json: impl Fn(&V) -> Value,
    ) -> WriterResult<()> {
        for (key, value) in values {
            let payload = single_entry(key, to_json(value));
            self.session_mut()?.log(step, payload)?;
        }
        Ok(())
    }
}

impl<S: TrackingSession> MetricWriter for WandbWriter<S> {
    fn write_summaries(
        &mut self,
        step: u64,
        values: &Mapping<Array>,
        metadata: Option<&Mapping<Value>>,
    ) -> WriterResult<()> {
        if let Some(metadata) = metadata {
            tracing::debug!(
                entries = metadata.len(),
                "Summary metadata is not forwarded"
            );
        }
        self.log_each(step, values, Array::to_json)
    }

    fn write_scalars(&mut self, step: u64, scalars: &Mapping<Scalar>) -> WriterResult<()> {
        self.log_each(step, scalars, |value| Value::from(*value))
    }

    fn write_images(&mut self, _step: u64, _images: &Mapping<Array>) -> WriterResult<()> {
        Err(WriterError::unsupported(DataKind::Images))
    }

    fn write_videos(&mut self, _step: u64, _videos: &Mapping<Array>) -> WriterResult<()> {
        self.video_warning.call_once(|| {
            tracing::warn!("WandbWriter does not support writing videos.");
        });
        Ok(())
    }

    fn write_audios(
        &mut self,
        _step: u64,
        _audios: &Mapping<Array>,
        _sample_rate: u32,
    ) -> WriterResult<()> {
        Err(WriterError::unsupported(DataKind::Audio))
    }

    fn write_texts(&mut self, _step: u64, _texts: &Mapping<String>) -> WriterResult<()> {
        Err(WriterError::unsupported(DataKind::Text))
    }

    fn write_histograms(
        &mut self,
        _step: u64,
        _arrays: &Mapping<Array>,
        _num_buckets: Option<&Mapping<usize>>,
    ) -> WriterResult<()> {
        Err(WriterError::unsupported(DataKind::Histograms))
    }

    fn write_hparams(&mut self, hparams: &Mapping<Value>) -> WriterResult<()> {
        for (key, value) in hparams {
            let entry = single_entry(key, value.clone());
            self.session_mut()?.update_config(entry)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> WriterResult<()> {
        Ok(())
    }

    fn close(&mut self) -> WriterResult<()> {
        Ok(())
    }
}
