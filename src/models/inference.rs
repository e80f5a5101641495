//! Prediction invoker: runs one ordered feature row through the regression model.

use crate::models::loader::{LoadedModel, ModelLoader};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};

/// Per-request inference failures
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model expects {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("model produced a non-finite prediction ({0})")]
    NonFinite(f64),

    #[error("model inference failed: {0:#}")]
    Model(#[from] anyhow::Error),
}

/// A single-output regression model taking one row of features
pub trait Regressor: Send + Sync {
    /// Human-readable model name
    fn name(&self) -> &str;

    /// Predict one value for a `1 x row.len()` input
    fn predict_row(&self, row: &[f32]) -> Result<f64>;
}

/// Regressor backed by an ONNX Runtime session
pub struct OnnxRegressor {
    name: String,
    /// `Session::run` needs `&mut`, so concurrent requests take turns here.
    model: Mutex<LoadedModel>,
}

impl OnnxRegressor {
    pub fn new(model: LoadedModel) -> Self {
        Self {
            name: model.name.clone(),
            model: Mutex::new(model),
        }
    }

    /// Load the artifact at `path` with the given intra-op thread count
    pub fn load<P: AsRef<Path>>(path: P, onnx_threads: usize) -> Result<Self> {
        let loader = ModelLoader::with_threads(onnx_threads)?;
        Ok(Self::new(loader.load_model(path)?))
    }
}

impl Regressor for OnnxRegressor {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_row(&self, row: &[f32]) -> Result<f64> {
        use ort::value::Tensor;

        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, row.len() as i64];
        let input_tensor =
            Tensor::from_array((shape, row.to_vec())).context("Failed to create input tensor")?;

        let mut model = self
            .model
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let LoadedModel {
            session,
            input_name,
            output_name,
            ..
        } = &mut *model;

        let outputs = session.run(ort::inputs![input_name.as_str() => input_tensor])?;
        let output = outputs
            .get(output_name.as_str())
            .with_context(|| format!("Model output {output_name:?} missing"))?;

        // Regressors exported from scikit-learn emit f32; some toolchains keep f64.
        if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
            return data
                .first()
                .map(|&v| v as f64)
                .context("Model returned an empty tensor");
        }
        let (_, data) = output
            .try_extract_tensor::<f64>()
            .context("Model output is neither an f32 nor an f64 tensor")?;
        data.first().copied().context("Model returned an empty tensor")
    }
}

/// Wraps the shared model and enforces the input width.
pub struct InferenceEngine {
    regressor: Box<dyn Regressor>,
    feature_count: usize,
}

impl InferenceEngine {
    pub fn new(regressor: Box<dyn Regressor>, feature_count: usize) -> Self {
        info!(
            model = %regressor.name(),
            features = feature_count,
            "Inference engine initialized"
        );
        Self {
            regressor,
            feature_count,
        }
    }

    /// Load the ONNX artifact and build an engine expecting `feature_count` columns
    pub fn from_artifact<P: AsRef<Path>>(
        path: P,
        feature_count: usize,
        onnx_threads: usize,
    ) -> Result<Self> {
        let regressor = OnnxRegressor::load(path, onnx_threads)?;
        Ok(Self::new(Box::new(regressor), feature_count))
    }

    pub fn model_name(&self) -> &str {
        self.regressor.name()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Predict a price for one ordered feature vector
    pub fn predict(&self, vector: &[f64]) -> Result<f64, InferenceError> {
        if vector.len() != self.feature_count {
            return Err(InferenceError::ShapeMismatch {
                expected: self.feature_count,
                actual: vector.len(),
            });
        }

        let row: Vec<f32> = vector.iter().map(|&v| v as f32).collect();
        let prediction = self.regressor.predict_row(&row)?;

        if !prediction.is_finite() {
            return Err(InferenceError::NonFinite(prediction));
        }

        debug!(model = %self.regressor.name(), prediction = prediction, "Inference complete");
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    /// ReduceSum graphs over a `[1, n]` float input; one emits f32, the other f64.
    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    /// Sums the row and remembers what it was given.
    struct RecordingRegressor {
        seen: Arc<Mutex<Vec<Vec<f32>>>>,
        result: Option<f64>,
    }

    impl Regressor for RecordingRegressor {
        fn name(&self) -> &str {
            "recording"
        }

        fn predict_row(&self, row: &[f32]) -> Result<f64> {
            self.seen.lock().unwrap().push(row.to_vec());
            match self.result {
                Some(value) => Ok(value),
                None => Ok(row.iter().map(|&v| v as f64).sum()),
            }
        }
    }

    struct FailingRegressor;

    impl Regressor for FailingRegressor {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict_row(&self, _row: &[f32]) -> Result<f64> {
            anyhow::bail!("tensor shape mismatch")
        }
    }

    fn engine(result: Option<f64>, feature_count: usize) -> (InferenceEngine, Arc<Mutex<Vec<Vec<f32>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let regressor = RecordingRegressor {
            seen: seen.clone(),
            result,
        };
        (InferenceEngine::new(Box::new(regressor), feature_count), seen)
    }

    #[test]
    fn test_predict_passes_ordered_row() {
        let (engine, seen) = engine(None, 3);

        let prediction = engine.predict(&[1.0, 80.0, 3.0]).unwrap();
        assert_eq!(prediction, 84.0);
        assert_eq!(seen.lock().unwrap().as_slice(), &[vec![1.0_f32, 80.0, 3.0]]);
        assert_eq!(engine.model_name(), "recording");
        assert_eq!(engine.feature_count(), 3);
    }

    #[test]
    fn test_shape_mismatch_rejected_before_model() {
        let (engine, seen) = engine(None, 3);

        let err = engine.predict(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::ShapeMismatch { expected: 3, actual: 2 }
        ));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_model_error_surfaced() {
        let engine = InferenceEngine::new(Box::new(FailingRegressor), 2);

        let err = engine.predict(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, InferenceError::Model(_)));
        assert!(err.to_string().contains("tensor shape mismatch"));
    }

    #[test]
    fn test_non_finite_prediction_rejected() {
        let (engine, _) = engine(Some(f64::NAN), 1);
        assert!(matches!(engine.predict(&[1.0]), Err(InferenceError::NonFinite(_))));
    }

    #[test]
    fn test_engine_shared_across_threads() {
        let (engine, seen) = engine(None, 2);
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = engine.clone();
                std::thread::spawn(move || engine.predict(&[i as f64, 1.0]).unwrap())
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), i as f64 + 1.0);
        }
        assert_eq!(seen.lock().unwrap().len(), 8);
    }

    #[test]
    fn test_onnx_regressor_f32_output() {
        let regressor = OnnxRegressor::load(fixture("sum_f32.onnx"), 1).unwrap();
        assert_eq!(regressor.name(), "sum_f32");

        let prediction = regressor.predict_row(&[1.0, 80.0, 3.0]).unwrap();
        assert_eq!(prediction, 84.0);
    }

    #[test]
    fn test_onnx_regressor_f64_output() {
        let regressor = OnnxRegressor::load(fixture("sum_f64.onnx"), 1).unwrap();

        let prediction = regressor.predict_row(&[2.5, 4.0]).unwrap();
        assert_eq!(prediction, 6.5);
    }

    #[test]
    fn test_engine_from_artifact_runs_onnx_model() {
        let engine = InferenceEngine::from_artifact(fixture("sum_f32.onnx"), 4, 1).unwrap();
        assert_eq!(engine.model_name(), "sum_f32");
        assert_eq!(engine.predict(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 10.0);
        assert!(matches!(
            engine.predict(&[1.0, 2.0]),
            Err(InferenceError::ShapeMismatch { expected: 4, actual: 2 })
        ));
    }
}
