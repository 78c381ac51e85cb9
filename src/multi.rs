//! Writers that compose with [`WandbWriter`](crate::wandb::WandbWriter)
//!
//! - [`MultiWriter`]: fan a single stream of writes out to several writers
//! - [`LoggingWriter`]: human-readable tracing output

use serde_json::Value;
use std::fmt::Display;

use crate::error::WriterResult;
use crate::writer::{Array, DataKind, Mapping, MetricWriter, Scalar};

/// Forwards every call to each wrapped writer in order.
///
/// All writers see every call even if an earlier one fails; the first error is
/// returned.
#[derive(Default)]
pub struct MultiWriter {
    writers: Vec<Box<dyn MetricWriter>>,
}

impl MultiWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a writer
    pub fn add<W: MetricWriter + 'static>(mut self, writer: W) -> Self {
        self.writers.push(Box::new(writer));
        self
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    fn each<F>(&mut self, mut call: F) -> WriterResult<()>
    where
        F: FnMut(&mut dyn MetricWriter) -> WriterResult<()>,
    {
        let mut first_error = None;
        for writer in &mut self.writers {
            if let Err(e) = call(writer.as_mut()) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl MetricWriter for MultiWriter {
    fn write_summaries(
        &mut self,
        step: u64,
        values: &Mapping<Array>,
        metadata: Option<&Mapping<Value>>,
    ) -> WriterResult<()> {
        self.each(|w| w.write_summaries(step, values, metadata))
    }

    fn write_scalars(&mut self, step: u64, scalars: &Mapping<Scalar>) -> WriterResult<()> {
        self.each(|w| w.write_scalars(step, scalars))
    }

    fn write_images(&mut self, step: u64, images: &Mapping<Array>) -> WriterResult<()> {
        self.each(|w| w.write_images(step, images))
    }

    fn write_videos(&mut self, step: u64, videos: &Mapping<Array>) -> WriterResult<()> {
        self.each(|w| w.write_videos(step, videos))
    }

    fn write_audios(
        &mut self,
        step: u64,
        audios: &Mapping<Array>,
        sample_rate: u32,
    ) -> WriterResult<()> {
        self.each(|w| w.write_audios(step, audios, sample_rate))
    }

    fn write_texts(&mut self, step: u64, texts: &Mapping<String>) -> WriterResult<()> {
        self.each(|w| w.write_texts(step, texts))
    }

    fn write_histograms(
        &mut self,
        step: u64,
        arrays: &Mapping<Array>,
        num_buckets: Option<&Mapping<usize>>,
    ) -> WriterResult<()> {
        self.each(|w| w.write_histograms(step, arrays, num_buckets))
    }

    fn write_hparams(&mut self, hparams: &Mapping<Value>) -> WriterResult<()> {
        self.each(|w| w.write_hparams(hparams))
    }

    fn flush(&mut self) -> WriterResult<()> {
        self.each(|w| w.flush())
    }

    fn close(&mut self) -> WriterResult<()> {
        self.each(|w| w.close())
    }
}

/// Writes scalars, summaries, texts and hyperparameters as `INFO` events.
///
/// Media kinds are skipped with a debug event.
#[derive(Debug, Clone, Default)]
pub struct LoggingWriter {
    prefix: Option<String>,
}

impl LoggingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix every metric name, e.g. `"train"` gives `train/loss`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn join<V, F>(&self, values: &Mapping<V>, render: F) -> String
    where
        F: Fn(&V) -> String,
    {
        values
            .iter()
            .map(|(key, value)| match &self.prefix {
                Some(prefix) => format!("{}/{} = {}", prefix, key, render(value)),
                None => format!("{} = {}", key, render(value)),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn skip(&self, kind: DataKind, step: u64, count: usize) -> WriterResult<()> {
        tracing::debug!(step, count, "LoggingWriter skips {}", kind);
        Ok(())
    }
}

fn render<V: Display>(value: &V) -> String {
    value.to_string()
}

impl MetricWriter for LoggingWriter {
    fn write_summaries(
        &mut self,
        step: u64,
        values: &Mapping<Array>,
        _metadata: Option<&Mapping<Value>>,
    ) -> WriterResult<()> {
        if !values.is_empty() {
            let line = self.join(values, |array| array.to_json().to_string());
            tracing::info!(step, "[{}] {}", step, line);
        }
        Ok(())
    }

    fn write_scalars(&mut self, step: u64, scalars: &Mapping<Scalar>) -> WriterResult<()> {
        if !scalars.is_empty() {
            let line = self.join(scalars, render);
            tracing::info!(step, "[{}] {}", step, line);
        }
        Ok(())
    }

    fn write_images(&mut self, step: u64, images: &Mapping<Array>) -> WriterResult<()> {
        self.skip(DataKind::Images, step, images.len())
    }

    fn write_videos(&mut self, step: u64, videos: &Mapping<Array>) -> WriterResult<()> {
        self.skip(DataKind::Videos, step, videos.len())
    }

    fn write_audios(
        &mut self,
        step: u64,
        audios: &Mapping<Array>,
        _sample_rate: u32,
    ) -> WriterResult<()> {
        self.skip(DataKind::Audio, step, audios.len())
    }

    fn write_texts(&mut self, step: u64, texts: &Mapping<String>) -> WriterResult<()> {
        for (key, text) in texts {
            tracing::info!(step, "[{}] {}: {}", step, key, text);
        }
        Ok(())
    }

    fn write_histograms(
        &mut self,
        step: u64,
        arrays: &Mapping<Array>,
        _num_buckets: Option<&Mapping<usize>>,
    ) -> WriterResult<()> {
        self.skip(DataKind::Histograms, step, arrays.len())
    }

    fn write_hparams(&mut self, hparams: &Mapping<Value>) -> WriterResult<()> {
        if !hparams.is_empty() {
            let line = self.join(hparams, render);
            tracing::info!("[Hyperparameters] {}", line);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WriterError;
    use crate::logging::LogBufferLayer;
    use crate::session::RecordingSession;
    use crate::wandb::WandbWriter;
    use serde_json::json;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    fn scalars(entries: &[(&str, f64)]) -> Mapping<Scalar> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_multi_writer_fans_out() {
        let first = RecordingSession::new();
        let second = RecordingSession::new();
        let mut multi = MultiWriter::new()
            .add(WandbWriter::with_session(first.clone(), "a"))
            .add(WandbWriter::with_session(second.clone(), "b"));

        assert_eq!(multi.len(), 2);
        multi.write_scalars(3, &scalars(&[("loss", 0.1)])).unwrap();

        assert_eq!(first.logs().len(), 1);
        assert_eq!(second.logs().len(), 1);
    }

    #[test]
    fn test_multi_writer_reports_first_error_after_all_writers() {
        let session = RecordingSession::new();
        let mut multi = MultiWriter::new()
            .add(WandbWriter::with_session(session.clone(), "a"))
            .add(LoggingWriter::new());

        let mut images = Mapping::new();
        images.insert("frame".to_string(), Array::scalar(0.0));
        let err = multi.write_images(0, &images).unwrap_err();
        assert!(matches!(err, WriterError::Unsupported { .. }));

        multi.flush().unwrap();
        multi.close().unwrap();
    }

    #[test]
    fn test_empty_multi_writer() {
        let mut multi = MultiWriter::new();
        assert!(multi.is_empty());
        multi.write_scalars(0, &scalars(&[("x", 1.0)])).unwrap();
    }

    #[test]
    fn test_logging_writer_formats_scalars() {
        let (layer, buffer) = LogBufferLayer::new(16);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let mut writer = LoggingWriter::with_prefix("train");
            writer
                .write_scalars(4, &scalars(&[("loss", 0.5), ("accuracy", 0.75)]))
                .unwrap();

            let mut hparams = Mapping::new();
            hparams.insert("lr".to_string(), json!(0.1));
            writer.write_hparams(&hparams).unwrap();

            writer.write_images(4, &Mapping::new()).unwrap();
        });

        let info = buffer.filter_by_level(Level::INFO);
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].message, "[4] train/accuracy = 0.75, train/loss = 0.5");
        assert_eq!(info[0].field("step"), Some("4"));
        assert_eq!(info[1].message, "[Hyperparameters] train/lr = 0.1");
        assert_eq!(buffer.len(), 3);
    }
}
