//! ML model loading and inference components

pub mod inference;
pub mod loader;

pub use inference::{InferenceEngine, InferenceError, OnnxRegressor, Regressor};
pub use loader::ModelLoader;
