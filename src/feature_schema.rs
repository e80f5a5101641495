//! Feature schema registry.
//!
//! Holds the ordered list of canonical feature names the model was trained
//! against. The model only sees positions, so this order is the contract
//! every request is mapped onto.

use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors raised while loading the feature descriptor
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("feature descriptor not found at {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to read feature descriptor {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("feature descriptor is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("feature descriptor must be a JSON object or an array of names, found {0}")]
    InvalidShape(&'static str),

    #[error("feature descriptor lists no features")]
    Empty,

    #[error("feature name at position {0} is blank")]
    BlankName(usize),

    #[error("feature {0:?} appears more than once in the descriptor")]
    Duplicate(String),
}

/// Immutable, ordered list of canonical feature names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Load the schema from a descriptor file.
    ///
    /// The descriptor is either a JSON object whose keys (in document order)
    /// are the feature names, or a JSON array of names.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SchemaError::Missing(path.to_path_buf()));
        }

        let raw = std::fs::read_to_string(path).map_err(|source| SchemaError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let schema = Self::from_descriptor(&serde_json::from_str(&raw)?)?;

        info!(
            path = %path.display(),
            features = schema.len(),
            "Feature schema loaded"
        );

        Ok(schema)
    }

    /// Build the schema from an already parsed descriptor
    pub fn from_descriptor(descriptor: &Value) -> Result<Self, SchemaError> {
        let names: Vec<String> = match descriptor {
            Value::Object(map) => map.keys().cloned().collect(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(name) => Ok(name.clone()),
                    _ => Err(SchemaError::InvalidShape("an array with non-string entries")),
                })
                .collect::<Result<_, _>>()?,
            Value::Null => return Err(SchemaError::InvalidShape("null")),
            Value::Bool(_) => return Err(SchemaError::InvalidShape("a boolean")),
            Value::Number(_) => return Err(SchemaError::InvalidShape("a number")),
            Value::String(_) => return Err(SchemaError::InvalidShape("a string")),
        };

        Self::from_names(names)
    }

    /// Build the schema from names given in training order
    pub fn from_names<I, S>(names: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(SchemaError::BlankName(position));
            }
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::Duplicate(name.clone()));
            }
        }

        Ok(Self { names })
    }

    /// Feature names in the exact order the model expects them
    pub fn feature_order(&self) -> &[String] {
        &self.names
    }

    /// Number of features (columns of the model input)
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false; an empty schema cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a canonical name in the model input
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_descriptor(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_object_descriptor_keeps_document_order() {
        let file = write_descriptor(
            r#"{"Ward_Code": "Ward_Code", "City_Code": "City_Code", "Area": "Area", "Access Road": "Access Road"}"#,
        );

        let schema = FeatureSchema::load(file.path()).unwrap();
        assert_eq!(
            schema.feature_order(),
            &["Ward_Code", "City_Code", "Area", "Access Road"]
        );
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.position("Area"), Some(2));
        assert!(schema.contains("Access Road"));
        assert!(!schema.contains("Bedrooms"));
    }

    #[test]
    fn test_array_descriptor() {
        let schema = FeatureSchema::from_descriptor(&json!(["City_Code", "Area", "Bedrooms"])).unwrap();
        assert_eq!(schema.feature_order(), &["City_Code", "Area", "Bedrooms"]);
    }

    #[test]
    fn test_missing_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let err = FeatureSchema::load(dir.path().join("feature_columns.json")).unwrap_err();
        assert!(matches!(err, SchemaError::Missing(_)));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_descriptor("{ not json");
        let err = FeatureSchema::load(file.path()).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidJson(_)));
    }

    #[test]
    fn test_empty_descriptor_rejected() {
        assert!(matches!(
            FeatureSchema::from_descriptor(&json!({})),
            Err(SchemaError::Empty)
        ));
        assert!(matches!(
            FeatureSchema::from_descriptor(&json!([])),
            Err(SchemaError::Empty)
        ));
    }

    #[test]
    fn test_wrong_shape_rejected() {
        assert!(matches!(
            FeatureSchema::from_descriptor(&json!("City_Code")),
            Err(SchemaError::InvalidShape(_))
        ));
        assert!(matches!(
            FeatureSchema::from_descriptor(&json!(["City_Code", 3])),
            Err(SchemaError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_duplicate_and_blank_names_rejected() {
        assert!(matches!(
            FeatureSchema::from_names(["Area", "Floors", "Area"]),
            Err(SchemaError::Duplicate(name)) if name == "Area"
        ));
        assert!(matches!(
            FeatureSchema::from_names(["Area", " "]),
            Err(SchemaError::BlankName(1))
        ));
    }
}
