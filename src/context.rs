//! # Transform Context
//!
//! The single mutable structure threaded through every pass of one run.

use crate::backend::ParameterProvider;
use crate::config::{
    AppSyncAuthConfiguration, DatasourceType, ResolverConfig, SqlConnectionSecrets, SynthParameters,
    TransformParameters, UserDefinedSlot, VpcConfig,
};
use crate::log::{LogEntry, LogLevel};
use crate::schema::SchemaDocument;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Stack that receives resources without a nested stack.
pub const ROOT_STACK: &str = "root";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    GraphqlApi,
    Schema,
    ApiKey,
    Table,
    DataSource,
    Resolver,
    Function,
    SearchDomain,
    Policy,
    Asset,
}

/// One node of the abstract resource graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub kind: ResourceKind,
    pub properties: serde_json::Map<String, serde_json::Value>,
    /// Nested stack, `None` for the root stack.
    pub stack: Option<String>,
}

impl Resource {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            properties: serde_json::Map::new(),
            stack: None,
        }
    }

    pub fn in_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_property(mut self, key: &str, value: serde_json::Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn set_property(&mut self, key: &str, value: serde_json::Value) {
        self.properties.insert(key.to_string(), value);
    }

    /// Push onto an array property, creating it if needed.
    pub fn push_property(&mut self, key: &str, value: serde_json::Value) {
        let entry = self
            .properties
            .entry(key.to_string())
            .or_insert_with(|| serde_json::Value::Array(Vec::new()));
        match entry {
            serde_json::Value::Array(items) => items.push(value),
            other => *other = serde_json::Value::Array(vec![value]),
        }
    }
}

/// Resources accumulated by passes, ordered by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceGraph {
    resources: BTreeMap<String, Resource>,
}

impl ResourceGraph {
    /// Insert or replace a resource.
    pub fn add(&mut self, resource: Resource) {
        self.resources.insert(resource.id.clone(), resource);
    }

    /// Existing resource with the same id, or `resource` newly inserted.
    pub fn get_or_insert(&mut self, resource: Resource) -> &mut Resource {
        self.resources.entry(resource.id.clone()).or_insert(resource)
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Resource> {
        self.resources.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.values().filter(move |r| r.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Id of the table resource backing a model.
pub fn table_id(model: &str) -> String {
    format!("{}Table", model)
}

/// Id of the datasource resource backing a model.
pub fn datasource_id(model: &str) -> String {
    format!("{}DataSource", model)
}

/// Id of the resolver resource for `Type.field`.
pub fn resolver_id(type_name: &str, field_name: &str) -> String {
    format!("{}.{}Resolver", type_name, field_name)
}

/// Shared state for one transform run.
///
/// Owned by the orchestrator; each pass gets `&mut` access in turn.
pub struct TransformContext<'a> {
    pub schema: SchemaDocument,
    pub resources: ResourceGraph,
    pub model_datasources: HashMap<String, DatasourceType>,
    pub datasource_secrets: HashMap<String, SqlConnectionSecrets>,
    pub auth_config: AppSyncAuthConfiguration,
    pub resolver_config: Option<ResolverConfig>,
    pub user_defined_slots: BTreeMap<String, Vec<UserDefinedSlot>>,
    pub transform_parameters: TransformParameters,
    pub vpc_config: Option<VpcConfig>,
    pub synth_parameters: SynthParameters,
    parameter_provider: Option<&'a dyn ParameterProvider>,
    logs: Vec<LogEntry>,
}

impl<'a> TransformContext<'a> {
    pub fn new(schema: SchemaDocument) -> Self {
        Self {
            schema,
            resources: ResourceGraph::default(),
            model_datasources: HashMap::new(),
            datasource_secrets: HashMap::new(),
            auth_config: AppSyncAuthConfiguration::default(),
            resolver_config: None,
            user_defined_slots: BTreeMap::new(),
            transform_parameters: TransformParameters::default(),
            vpc_config: None,
            synth_parameters: SynthParameters::default(),
            parameter_provider: None,
            logs: Vec::new(),
        }
    }

    pub fn with_parameter_provider(mut self, provider: Option<&'a dyn ParameterProvider>) -> Self {
        self.parameter_provider = provider;
        self
    }

    /// Resolve a synthesis-time parameter; `env` falls back to the environment name.
    pub fn resolve_parameter(&self, name: &str) -> Option<String> {
        self.parameter_provider
            .and_then(|p| p.provide(name))
            .or_else(|| {
                (name == "env" && !self.synth_parameters.amplify_environment_name.is_empty())
                    .then(|| self.synth_parameters.amplify_environment_name.clone())
            })
    }

    /// Datasource bound to a model; unbound models use DynamoDB.
    pub fn datasource_for(&self, model: &str) -> DatasourceType {
        self.model_datasources
            .get(model)
            .cloned()
            .unwrap_or_else(DatasourceType::dynamodb)
    }

    pub fn is_model(&self, type_name: &str) -> bool {
        self.resources.contains(&table_id(type_name))
            || self.resources.contains(&datasource_id(type_name))
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.logs.push(LogEntry::new(level, message));
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Remove and return every accumulated entry.
    pub fn take_logs(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.logs)
    }
}
