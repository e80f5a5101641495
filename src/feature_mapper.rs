//! Request validation and positional mapping.
//!
//! Turns a named, unordered feature set into the numeric vector the model
//! was trained on. Position `i` of the output always holds the value of
//! `feature_order()[i]`.

use crate::feature_schema::FeatureSchema;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// A submitted feature set keyed by canonical name
pub type FeatureSet = Map<String, Value>;

/// Client-side validation failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("missing required features: {}", .names.join(", "))]
    MissingFeature { names: Vec<String> },

    #[error("features must be numeric: {}", .names.join(", "))]
    InvalidFeatureType { names: Vec<String> },
}

impl FeatureError {
    /// Names of the offending features, in schema order
    pub fn names(&self) -> &[String] {
        match self {
            FeatureError::MissingFeature { names } | FeatureError::InvalidFeatureType { names } => names,
        }
    }
}

/// Maps named feature sets onto the schema's positional order.
pub struct FeatureMapper {
    schema: Arc<FeatureSchema>,
}

impl FeatureMapper {
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Validate `input` and return its values in schema order.
    ///
    /// Every missing name is reported, not just the first; missing features
    /// take precedence over type errors. Keys outside the schema are ignored.
    pub fn map(&self, input: &FeatureSet) -> Result<Vec<f64>, FeatureError> {
        let order = self.schema.feature_order();
        let mut values = Vec::with_capacity(order.len());
        let mut missing = Vec::new();
        let mut invalid = Vec::new();

        for name in order {
            match input.get(name) {
                None => missing.push(name.clone()),
                Some(value) => match value.as_f64() {
                    Some(number) => values.push(number),
                    None => invalid.push(name.clone()),
                },
            }
        }

        if !missing.is_empty() {
            return Err(FeatureError::MissingFeature { names: missing });
        }
        if !invalid.is_empty() {
            return Err(FeatureError::InvalidFeatureType { names: invalid });
        }

        for key in input.keys().filter(|key| !self.schema.contains(key)) {
            debug!(feature = %key, "Ignoring feature not present in schema");
        }

        Ok(values)
    }
}
