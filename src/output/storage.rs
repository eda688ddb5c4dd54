//! Backend output storage.
//!
//! Entries are externalized field by field as stack outputs when registered;
//! the index of what was registered is written as one metadata record on flush.

use crate::backend::SynthesisBackend;
use crate::error::{TransformError, TransformResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata key the stack output index is stored under.
pub const AMPLIFY_STACK_METADATA_KEY: &str = "AWS::Amplify::Output";

/// A versioned set of named string outputs, kept in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendOutputEntry {
    pub version: String,
    pub payload: Vec<(String, String)>,
}

impl BackendOutputEntry {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            payload: Vec::new(),
        }
    }

    /// Add a field, or replace its value in place if the key is already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.payload.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.payload.push((key, value)),
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.payload.iter().map(|(k, _)| k.as_str())
    }
}

/// What the metadata record remembers about one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendOutputEntryStackMetadata {
    pub version: String,
    pub stack_outputs: Vec<String>,
}

pub type BackendOutputStackMetadata = BTreeMap<String, BackendOutputEntryStackMetadata>;

pub trait BackendOutputStorageStrategy {
    /// Register `entry` under `name`, replacing any earlier entry of that name.
    /// A field already registered by a different name is rejected.
    fn add_backend_output_entry(&mut self, name: &str, entry: BackendOutputEntry) -> TransformResult<()>;

    /// Persist everything registered so far. Each call overwrites the previous record.
    fn flush(&mut self) -> TransformResult<()>;
}

/// Stores outputs on a synthesis backend and the index as stack metadata.
pub struct StackMetadataBackendOutputStorageStrategy<'b> {
    backend: &'b mut dyn SynthesisBackend,
    metadata: BackendOutputStackMetadata,
}

impl<'b> StackMetadataBackendOutputStorageStrategy<'b> {
    pub fn new(backend: &'b mut dyn SynthesisBackend) -> Self {
        Self {
            backend,
            metadata: BackendOutputStackMetadata::new(),
        }
    }

    pub fn metadata(&self) -> &BackendOutputStackMetadata {
        &self.metadata
    }
}

impl BackendOutputStorageStrategy for StackMetadataBackendOutputStorageStrategy<'_> {
    fn add_backend_output_entry(&mut self, name: &str, entry: BackendOutputEntry) -> TransformResult<()> {
        for key in entry.keys() {
            let owner = self
                .metadata
                .iter()
                .find(|(other, meta)| other.as_str() != name && meta.stack_outputs.iter().any(|f| f == key));
            if let Some((owner, _)) = owner {
                return Err(TransformError::Backend(format!(
                    "output '{}' of entry '{}' is already registered by entry '{}'",
                    key, name, owner
                )));
            }
        }
        for (key, value) in &entry.payload {
            self.backend.add_output(key, value)?;
        }
        let previous = self.metadata.insert(
            name.to_string(),
            BackendOutputEntryStackMetadata {
                version: entry.version,
                stack_outputs: entry.payload.into_iter().map(|(key, _)| key).collect(),
            },
        );
        if previous.is_some() {
            tracing::debug!("[OUTPUT] Entry '{}' replaced", name);
        }
        Ok(())
    }

    fn flush(&mut self) -> TransformResult<()> {
        let record = serde_json::to_value(&self.metadata)?;
        self.backend.add_metadata(AMPLIFY_STACK_METADATA_KEY, record)?;
        tracing::info!("[OUTPUT] Flushed {} output entr(ies)", self.metadata.len());
        Ok(())
    }
}
