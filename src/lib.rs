//! wandb-writer
//!
//! This library adapts the generic `MetricWriter` interface to an
//! experiment-tracking session:
//! - `WandbWriter` forwarding scalars, summaries and hyperparameters
//! - Pluggable sessions (in-memory recorder, offline run directory)
//! - Run configuration with environment resolution and group ids
//! - Fan-out and tracing-backed writers

pub mod config;
pub mod error;
pub mod logging;
pub mod multi;
pub mod session;
pub mod wandb;
pub mod writer;

pub use config::RunConfig;
pub use error::{ConfigError, SessionError, WriterError, WriterResult};
pub use multi::{LoggingWriter, MultiWriter};
pub use session::{OfflineOpener, RecordingOpener, SessionInit, SessionOpener, TrackingSession};
pub use wandb::WandbWriter;
pub use writer::{Array, DataKind, Mapping, MetricWriter, Scalar};
