//! MetricWriter capability set
//!
//! Every writer in this crate realizes the same fixed set of write
//! operations. Callers compute metrics elsewhere and hand the finished
//! values to a writer keyed by a step counter.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::WriterResult;

/// A single scalar metric value
pub type Scalar = f64;

/// Name to value mapping handed to a single write call.
///
/// Keys are unique within a call and iterate in key order.
pub type Mapping<V> = BTreeMap<String, V>;

/// Kind of data a write call carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Summaries,
    Scalars,
    Images,
    Videos,
    Audio,
    Text,
    Histograms,
    Hparams,
}

impl DataKind {
    /// Lowercase human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summaries => "summaries",
            Self::Scalars => "scalars",
            Self::Images => "images",
            Self::Videos => "videos",
            Self::Audio => "audio",
            Self::Text => "text",
            Self::Histograms => "histograms",
            Self::Hparams => "hparams",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dense row-major numeric array
///
/// A 0-d array (empty shape) holds exactly one value and behaves as a scalar.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Array {
    /// Create an array, returning `None` if `data` does not fill `shape` or
    /// the element count overflows `usize`
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Option<Self> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, dim| acc.checked_mul(*dim))?;
        if expected != data.len() {
            return None;
        }
        Some(Self { shape, data })
    }

    /// Create a 0-d array
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Convert to JSON: a number for 0-d arrays, nested lists otherwise.
    ///
    /// Non-finite values become `null`, with a warning.
    pub fn to_json(&self) -> Value {
        let non_finite = self.data.iter().filter(|v| !v.is_finite()).count();
        if non_finite > 0 {
            tracing::warn!(
                non_finite,
                len = self.data.len(),
                "Non-finite array values written as null"
            );
        }
        if self.shape.is_empty() {
            return Value::from(self.data[0]);
        }
        nest(&self.shape, &self.data)
    }
}

fn nest(shape: &[usize], data: &[f64]) -> Value {
    if shape.len() == 1 {
        return Value::Array(data.iter().map(|v| Value::from(*v)).collect());
    }
    let chunk: usize = shape[1..].iter().product();
    Value::Array(
        (0..shape[0])
            .map(|i| nest(&shape[1..], &data[i * chunk..(i + 1) * chunk]))
            .collect(),
    )
}

impl From<f64> for Array {
    fn from(value: f64) -> Self {
        Self::scalar(value)
    }
}

impl From<Vec<f64>> for Array {
    fn from(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }
}

/// The writer capability set.
///
/// Operations a writer cannot honor return
/// [`WriterError::Unsupported`](crate::error::WriterError::Unsupported)
/// instead of silently dropping data.
pub trait MetricWriter: Send {
    /// Write array-valued summaries. `metadata` is optional per-summary context.
    fn write_summaries(
        &mut self,
        step: u64,
        values: &Mapping<Array>,
        metadata: Option<&Mapping<Value>>,
    ) -> WriterResult<()>;

    fn write_scalars(&mut self, step: u64, scalars: &Mapping<Scalar>) -> WriterResult<()>;

    fn write_images(&mut self, step: u64, images: &Mapping<Array>) -> WriterResult<()>;

    fn write_videos(&mut self, step: u64, videos: &Mapping<Array>) -> WriterResult<()>;

    fn write_audios(
        &mut self,
        step: u64,
        audios: &Mapping<Array>,
        sample_rate: u32,
    ) -> WriterResult<()>;

    fn write_texts(&mut self, step: u64, texts: &Mapping<String>) -> WriterResult<()>;

    fn write_histograms(
        &mut self,
        step: u64,
        arrays: &Mapping<Array>,
        num_buckets: Option<&Mapping<usize>>,
    ) -> WriterResult<()>;

    /// Record hyperparameters. Later values for the same key replace earlier ones.
    fn write_hparams(&mut self, hparams: &Mapping<Value>) -> WriterResult<()>;

    fn flush(&mut self) -> WriterResult<()>;

    fn close(&mut self) -> WriterResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogBufferLayer;
    use serde_json::json;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_array_shape_validation() {
        assert!(Array::new(vec![2, 3], vec![0.0; 6]).is_some());
        assert!(Array::new(vec![2, 3], vec![0.0; 5]).is_none());
        assert!(Array::new(vec![0], Vec::new()).is_some());
        assert!(Array::new(vec![usize::MAX, 2], Vec::new()).is_none());
        assert!(Array::new(vec![2, usize::MAX, 0], Vec::new()).is_none());
    }

    #[test]
    fn test_scalar_array_to_json() {
        let array = Array::scalar(0.25);
        assert_eq!(array.ndim(), 0);
        assert_eq!(array.to_json(), json!(0.25));
    }

    #[test]
    fn test_nested_array_to_json() {
        let array = Array::new(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(array.to_json(), json!([[1.0, 2.0], [3.0, 4.0]]));

        let array = Array::new(vec![2, 0], Vec::new()).unwrap();
        assert_eq!(array.to_json(), json!([[], []]));
    }

    #[test]
    fn test_non_finite_becomes_null_with_warning() {
        let (layer, buffer) = LogBufferLayer::new(8);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            let array = Array::from(vec![1.0, f64::NAN, f64::INFINITY]);
            assert_eq!(array.to_json(), json!([1.0, null, null]));

            assert_eq!(Array::from(vec![1.0, 2.0]).to_json(), json!([1.0, 2.0]));
        });

        let warnings = buffer.filter_by_level(Level::WARN);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field("non_finite"), Some("2"));
        assert_eq!(warnings[0].field("len"), Some("3"));
    }

    #[test]
    fn test_data_kind_display() {
        assert_eq!(DataKind::Images.to_string(), "images");
        assert_eq!(DataKind::Audio.to_string(), "audio");
        assert_eq!(DataKind::Text.to_string(), "text");
    }
}
