
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

use crate::{QaError, Result};

/// Ordered document texts. Position in the list is the ordinal the vector index returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentStore {
    texts: Vec<String>,
}

impl DocumentStore {
    #[inline]
    pub fn new(texts: Vec<String>) -> Self {
        Self { texts }
    }

    /// Load a JSON array of strings
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => QaError::ResourceNotFound(path.display().to_string()),
            _ => QaError::Resource(format!("Failed to read {}: {}", path.display(), e)),
        })?;

        let texts: Vec<String> = serde_json::from_str(&content).map_err(|e| {
            QaError::Resource(format!(
                "{} is not a JSON array of strings: {}",
                path.display(),
                e
            ))
        })?;

        debug!("Loaded {} documents from {}", texts.len(), path.display());
        Ok(Self { texts })
    }

    /// Look up a document by the ordinal a vector index returned. Negative or out-of-range
    /// ordinals yield `None`.
    #[inline]
    pub fn get(&self, ordinal: i64) -> Option<&str> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| self.texts.get(i))
            .map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}
