//! Class index to name lookup

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::InferenceError;

/// Class-index to class-name table shared by every result of one model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassNames(Arc<BTreeMap<usize, String>>);

impl ClassNames {
    /// Build from names ordered by class index
    pub fn from_list<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Arc::new(
            names.into_iter().map(Into::into).enumerate().collect(),
        ))
    }

    /// Build from explicit (index, name) pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, S)>,
        S: Into<String>,
    {
        Self(Arc::new(
            pairs.into_iter().map(|(id, name)| (id, name.into())).collect(),
        ))
    }

    /// Look up the name of a class
    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.0.get(&class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Load a labels file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| InferenceError::Labels(format!("{}: {}", path.display(), e)))?;
        let names = Self::parse(&contents)?;
        info!("Loaded {} class names from {}", names.len(), path.display());
        Ok(names)
    }

    /// Parse a JSON array, a JSON object keyed by index, or plain text with one name per line
    pub fn parse(contents: &str) -> Result<Self, InferenceError> {
        let trimmed = contents.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            let value: Value = serde_json::from_str(trimmed)
                .map_err(|e| InferenceError::Labels(e.to_string()))?;
            return Self::from_json(value);
        }

        Ok(Self::from_list(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        ))
    }

    fn from_json(value: Value) -> Result<Self, InferenceError> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(name) => Ok(name),
                    other => Err(InferenceError::Labels(format!(
                        "expected a string, got {}",
                        other
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::from_list),
            Value::Object(map) => map
                .into_iter()
                .map(|(key, item)| {
                    let id = key
                        .parse::<usize>()
                        .map_err(|_| InferenceError::Labels(format!("invalid class index {:?}", key)))?;
                    match item {
                        Value::String(name) => Ok((id, name)),
                        other => Err(InferenceError::Labels(format!(
                            "expected a string for class {}, got {}",
                            id, other
                        ))),
                    }
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::from_pairs),
            other => Err(InferenceError::Labels(format!(
                "expected an array or object, got {}",
                other
            ))),
        }
    }
}
