//! # Resource-Synthesis Backend
//!
//! Capabilities the pipeline consumes from the system that turns the abstract
//! resource graph into deployable artifacts, plus in-memory implementations.

use crate::context::Resource;
use crate::error::{TransformError, TransformResult};
use std::collections::{BTreeMap, HashMap};

/// Handle to a deployment unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StackRef {
    Root,
    Nested(String),
}

impl StackRef {
    pub fn name(&self) -> &str {
        match self {
            Self::Root => crate::context::ROOT_STACK,
            Self::Nested(name) => name,
        }
    }
}

/// Reference to a stored asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub name: String,
    pub s3_uri: String,
}

pub trait SynthesisBackend {
    /// Externalize a named output value on the root stack.
    fn add_output(&mut self, name: &str, value: &str) -> TransformResult<()>;

    /// Create the nested stack, or return it if it already exists.
    fn nested_stack(&mut self, name: &str) -> TransformResult<StackRef>;

    fn add_resource(&mut self, stack: &StackRef, resource: &Resource) -> TransformResult<()>;

    /// Attach an opaque metadata record to the root stack, replacing any prior
    /// record under the same key.
    fn add_metadata(&mut self, key: &str, value: serde_json::Value) -> TransformResult<()>;
}

pub trait ParameterProvider {
    fn provide(&self, name: &str) -> Option<String>;
}

pub trait AssetProvider {
    fn provide(&mut self, name: &str, contents: &str) -> TransformResult<AssetRef>;
}

/// Parameters resolved from a fixed map.
#[derive(Debug, Clone, Default)]
pub struct StaticParameterProvider {
    values: HashMap<String, String>,
}

impl StaticParameterProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }
}

impl ParameterProvider for StaticParameterProvider {
    fn provide(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Keeps assets in memory under a fake bucket.
#[derive(Debug, Clone)]
pub struct InMemoryAssetProvider {
    bucket: String,
    assets: BTreeMap<String, String>,
}

impl InMemoryAssetProvider {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            assets: BTreeMap::new(),
        }
    }

    pub fn contents(&self, name: &str) -> Option<&str> {
        self.assets.get(name).map(String::as_str)
    }
}

impl AssetProvider for InMemoryAssetProvider {
    fn provide(&mut self, name: &str, contents: &str) -> TransformResult<AssetRef> {
        if name.is_empty() {
            return Err(TransformError::Backend("asset name must not be empty".into()));
        }
        self.assets.insert(name.to_string(), contents.to_string());
        Ok(AssetRef {
            name: name.to_string(),
            s3_uri: format!("s3://{}/{}", self.bucket, name),
        })
    }
}

/// Backend that records everything it is asked to synthesize.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    pub outputs: BTreeMap<String, String>,
    pub stacks: BTreeMap<StackRef, Vec<Resource>>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Number of `add_metadata` calls, including overwrites.
    pub metadata_writes: usize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resources_in(&self, stack: &StackRef) -> &[Resource] {
        self.stacks.get(stack).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl SynthesisBackend for InMemoryBackend {
    fn add_output(&mut self, name: &str, value: &str) -> TransformResult<()> {
        if name.is_empty() {
            return Err(TransformError::Backend("output name must not be empty".into()));
        }
        if self.outputs.insert(name.to_string(), value.to_string()).is_some() {
            tracing::debug!("[SYNTH] Output '{}' replaced", name);
        }
        Ok(())
    }

    fn nested_stack(&mut self, name: &str) -> TransformResult<StackRef> {
        let stack = StackRef::Nested(name.to_string());
        self.stacks.entry(stack.clone()).or_default();
        Ok(stack)
    }

    fn add_resource(&mut self, stack: &StackRef, resource: &Resource) -> TransformResult<()> {
        let resources = self.stacks.entry(stack.clone()).or_default();
        if resources.iter().any(|r| r.id == resource.id) {
            return Err(TransformError::Backend(format!(
                "resource '{}' already exists in stack '{}'",
                resource.id,
                stack.name()
            )));
        }
        resources.push(resource.clone());
        Ok(())
    }

    fn add_metadata(&mut self, key: &str, value: serde_json::Value) -> TransformResult<()> {
        self.metadata.insert(key.to_string(), value);
        self.metadata_writes += 1;
        Ok(())
    }
}
