//! # GraphQL Transform
//!
//! Compiles a directive-annotated GraphQL schema into backend resources for a
//! hosted GraphQL API, and records a versioned description of the result for
//! downstream tooling.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gql_transform::{
//!     execute_transform, ExecuteTransformConfig, InMemoryAssetProvider, InMemoryBackend,
//!     TransformConfig,
//! };
//!
//! let mut backend = InMemoryBackend::new();
//! let mut assets = InMemoryAssetProvider::new("deployment-bucket");
//! let summary = execute_transform(ExecuteTransformConfig {
//!     config: TransformConfig::default(),
//!     schema: "type Post @model { title: String! }",
//!     model_datasources: Default::default(),
//!     datasource_secrets: Default::default(),
//!     print_transformer_log: None,
//!     backend: &mut backend,
//!     parameter_provider: None,
//!     asset_provider: &mut assets,
//!     synth_parameters: Default::default(),
//! })?;
//! println!("{}", summary.schema);
//! # Ok::<(), gql_transform::TransformError>(())
//! ```
//!
//! ## Architecture
//!
//! A transform runs in four phases over one shared [`TransformContext`]:
//!
//! 1. **Parse** - Read the schema into a [`SchemaDocument`]
//! 2. **Passes** - Apply every pass of the canonical chain, in order
//! 3. **Export** - Print the transformed schema and store it as an asset
//! 4. **Synthesis** - Hand the resource graph to a [`SynthesisBackend`]
//!
//! Diagnostics collected by passes are drained to a [`LogSink`] exactly once
//! per run, including when a pass fails.

pub mod backend;
pub mod chain;
pub mod compiler;
pub mod config;
pub mod context;
pub mod directives;
pub mod error;
pub mod log;
pub mod output;
pub mod passes;
pub mod schema;
pub mod synth;

// Re-export the main transform API
pub use compiler::{
    construct_transform, default_print_transformer_log, execute_transform, ExecuteTransformConfig,
    GraphqlTransform, TransformInput, TransformSummary,
};
pub use chain::{build_transformer_chain, construct_transformer_chain, validate_chain, ChainHandles};

pub use backend::{
    AssetProvider, AssetRef, InMemoryAssetProvider, InMemoryBackend, ParameterProvider, StackRef,
    StaticParameterProvider, SynthesisBackend,
};
pub use config::{TransformConfig, TransformParameters, TransformerFactoryArgs};
pub use context::{Resource, ResourceGraph, ResourceKind, TransformContext};
pub use error::{ErrorKind, TransformError, TransformResult};
pub use log::{LogEntry, LogLevel, LogSink, TracingLogSink};
pub use output::{
    store_graphql_output, validate_graphql_output, AuthenticationType, BackendOutputEntry,
    BackendOutputStorageStrategy, GraphqlApiOutputs, StackMetadataBackendOutputStorageStrategy,
    VersionedGraphqlOutput,
};
pub use passes::{shared_pass, PassHandle, SharedPass, TransformPass};
pub use schema::{parse_schema, SchemaDocument};
