//! # Transform Orchestrator
//!
//! Main entry points for turning an annotated schema into synthesized
//! resources.

use crate::backend::{AssetProvider, ParameterProvider, SynthesisBackend};
use crate::chain::{construct_transformer_chain, pass_names, validate_chain};
use crate::config::{
    AppSyncAuthConfiguration, DatasourceType, RdsLayerMapping, ResolverConfig, SqlConnectionSecrets,
    SynthParameters, TransformConfig, TransformParameters, UserDefinedSlot, VpcConfig,
};
use crate::context::{Resource, ResourceGraph, ResourceKind, TransformContext};
use crate::directives::API_CATEGORY;
use crate::error::{TransformError, TransformResult};
use crate::log::{LogEntry, LogLevel, LogSink, TracingLogSink};
use crate::passes::SharedPass;
use crate::schema::{parse_schema, SchemaDocument};
use crate::synth::{Synthesizer, GRAPHQL_API_ID, GRAPHQL_SCHEMA_ID};
use std::collections::{BTreeMap, HashMap};

/// Asset name the transformed schema is stored under.
pub const SCHEMA_ASSET_NAME: &str = "schema.graphql";

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSummary {
    /// Passes applied, in order.
    pub passes: Vec<String>,
    /// The transformed schema as SDL.
    pub schema: String,
    pub model_schema_uri: String,
    pub resources: ResourceGraph,
    pub nested_stacks: Vec<String>,
}

/// Per-run inputs of [`GraphqlTransform::transform`].
pub struct TransformInput<'a> {
    pub schema: &'a str,
    pub model_datasources: HashMap<String, DatasourceType>,
    pub datasource_secrets: HashMap<String, SqlConnectionSecrets>,
    pub backend: &'a mut dyn SynthesisBackend,
    pub parameter_provider: Option<&'a dyn ParameterProvider>,
    pub asset_provider: &'a mut dyn AssetProvider,
    pub synth_parameters: SynthParameters,
}

/// A validated pass chain plus the configuration every run shares.
///
/// Passes keep state across `apply`, so a transform is meant to run once.
pub struct GraphqlTransform {
    chain: Vec<SharedPass>,
    auth_config: AppSyncAuthConfiguration,
    resolver_config: Option<ResolverConfig>,
    user_defined_slots: BTreeMap<String, Vec<UserDefinedSlot>>,
    stack_mapping: BTreeMap<String, String>,
    transform_parameters: TransformParameters,
    vpc_config: Option<VpcConfig>,
    rds_layer_mapping: Option<RdsLayerMapping>,
}

/// Drains the context's diagnostics into the sink when dropped, so every exit
/// path flushes exactly once.
struct LogFlushGuard<'s, 'c> {
    ctx: TransformContext<'c>,
    sink: &'s mut dyn LogSink,
}

impl Drop for LogFlushGuard<'_, '_> {
    fn drop(&mut self) {
        let logs = self.ctx.take_logs();
        self.sink.drain(&logs);
    }
}

/// Validate the configuration and build the canonical chain.
pub fn construct_transform(config: &TransformConfig) -> TransformResult<GraphqlTransform> {
    config.validate()?;
    let chain = construct_transformer_chain(&config.transformers_factory_args);
    validate_chain(&chain)?;
    tracing::info!("[TRANSFORM] Chain ready: {}", pass_names(&chain)?.join(" -> "));

    Ok(GraphqlTransform {
        chain,
        auth_config: config.auth_config.clone().unwrap_or_default(),
        resolver_config: config.resolver_config.clone(),
        user_defined_slots: config.user_defined_slots.clone(),
        stack_mapping: config.stack_mapping.clone(),
        transform_parameters: config.transform_parameters.clone(),
        vpc_config: config.sql_lambda_vpc_config.clone(),
        rds_layer_mapping: config.rds_layer_mapping.clone(),
    })
}

impl GraphqlTransform {
    pub fn chain(&self) -> &[SharedPass] {
        &self.chain
    }

    /// Run every pass in order, then export the schema and synthesize.
    ///
    /// Diagnostics are drained to `sink` exactly once whether the run succeeds
    /// or fails; a failure is returned after the drain.
    pub fn transform(&self, input: TransformInput<'_>, sink: &mut dyn LogSink) -> TransformResult<TransformSummary> {
        tracing::info!("[TRANSFORM] Starting transform ({} passes)", self.chain.len());

        let TransformInput {
            schema,
            model_datasources,
            datasource_secrets,
            backend,
            parameter_provider,
            asset_provider,
            synth_parameters,
        } = input;

        let mut ctx = TransformContext::new(SchemaDocument::default()).with_parameter_provider(parameter_provider);
        ctx.model_datasources = model_datasources;
        ctx.datasource_secrets = datasource_secrets;
        ctx.auth_config = self.auth_config.clone();
        ctx.resolver_config = self.resolver_config.clone();
        ctx.user_defined_slots = self.user_defined_slots.clone();
        ctx.transform_parameters = self.transform_parameters.clone();
        ctx.vpc_config = self.vpc_config.clone();
        ctx.synth_parameters = synth_parameters;

        let mut guard = LogFlushGuard { ctx, sink };
        let result = self.run(&mut guard.ctx, schema, backend, asset_provider);
        match &result {
            Ok(summary) => tracing::info!(
                "[TRANSFORM] Transform successful ({} resources)",
                summary.resources.len()
            ),
            Err(e) => {
                tracing::warn!("[TRANSFORM] Transform failed: {}", e);
                guard.ctx.log(LogLevel::Error, e.to_string());
            }
        }
        result
    }

    fn run(
        &self,
        ctx: &mut TransformContext<'_>,
        schema: &str,
        backend: &mut dyn SynthesisBackend,
        asset_provider: &mut dyn AssetProvider,
    ) -> TransformResult<TransformSummary> {
        // Phase 1: parse
        tracing::info!("[TRANSFORM] Phase 1: Parsing schema...");
        ctx.schema = parse_schema(schema)?;
        tracing::info!("[TRANSFORM] Parsed {} type definitions", ctx.schema.definitions.len());

        // Phase 2: passes, strictly in chain order
        tracing::info!("[TRANSFORM] Phase 2: Applying passes...");
        let mut applied = Vec::with_capacity(self.chain.len());
        for pass in &self.chain {
            let mut pass = pass
                .try_borrow_mut()
                .map_err(|_| TransformError::PassBusy("<chain entry>".to_string()))?;
            let name = pass.name().to_string();
            tracing::debug!("[TRANSFORM] Applying pass '{}'", name);
            pass.apply(ctx)?;
            applied.push(name);
        }

        // Phase 3: export the transformed schema
        tracing::info!("[TRANSFORM] Phase 3: Exporting schema...");
        let printed = ctx.schema.to_string();
        let asset = asset_provider.provide(SCHEMA_ASSET_NAME, &printed)?;
        self.add_api_resources(ctx, &asset.s3_uri)?;

        // Phase 4: synthesize
        tracing::info!("[TRANSFORM] Phase 4: Synthesizing resources...");
        let report = Synthesizer::new(&ctx.resources, &self.stack_mapping)
            .with_cfn_outputs(ctx.transform_parameters.enable_transformer_cfn_outputs)
            .synthesize(backend)?;

        Ok(TransformSummary {
            passes: applied,
            schema: printed,
            model_schema_uri: asset.s3_uri,
            resources: std::mem::take(&mut ctx.resources),
            nested_stacks: report.nested_stacks,
        })
    }

    fn add_api_resources(&self, ctx: &mut TransformContext<'_>, schema_uri: &str) -> TransformResult<()> {
        let additional: Vec<String> = ctx
            .auth_config
            .additional_authentication_providers
            .iter()
            .map(|m| m.authentication_type.to_string())
            .collect();
        let api_name = if ctx.synth_parameters.api_name.is_empty() {
            GRAPHQL_API_ID.to_string()
        } else {
            ctx.synth_parameters.api_name.clone()
        };
        ctx.resources.add(
            Resource::new(GRAPHQL_API_ID, ResourceKind::GraphqlApi)
                .with_property("name", api_name.into())
                .with_property("category", API_CATEGORY.into())
                .with_property(
                    "authenticationType",
                    ctx.auth_config.default_authentication.authentication_type.to_string().into(),
                )
                .with_property("additionalAuthenticationProviders", serde_json::to_value(additional)?),
        );
        ctx.resources.add(
            Resource::new(GRAPHQL_SCHEMA_ID, ResourceKind::Schema)
                .with_property("apiId", GRAPHQL_API_ID.into())
                .with_property("definitionS3Location", schema_uri.into()),
        );

        if let (Some(mapping), Some(region)) = (&self.rds_layer_mapping, &ctx.synth_parameters.region) {
            if let Some(layer) = mapping.get(region) {
                let sql_datasources: Vec<String> = ctx
                    .resources
                    .of_kind(ResourceKind::DataSource)
                    .filter(|r| r.properties.get("type").and_then(|t| t.as_str()) == Some("RELATIONAL_DATABASE"))
                    .map(|r| r.id.clone())
                    .collect();
                for id in sql_datasources {
                    if let Some(datasource) = ctx.resources.get_mut(&id) {
                        datasource.set_property("layerRegion", layer.layer_region.clone().into());
                    }
                }
            }
        }
        Ok(())
    }
}

/// Everything [`execute_transform`] needs for one run.
pub struct ExecuteTransformConfig<'a> {
    pub config: TransformConfig,
    pub schema: &'a str,
    pub model_datasources: HashMap<String, DatasourceType>,
    pub datasource_secrets: HashMap<String, SqlConnectionSecrets>,
    /// Receives the run's diagnostics; `None` routes them to `tracing`.
    pub print_transformer_log: Option<&'a mut dyn LogSink>,
    pub backend: &'a mut dyn SynthesisBackend,
    pub parameter_provider: Option<&'a dyn ParameterProvider>,
    pub asset_provider: &'a mut dyn AssetProvider,
    pub synth_parameters: SynthParameters,
}

/// Construct the transform, run it and drain its diagnostics.
pub fn execute_transform(config: ExecuteTransformConfig<'_>) -> TransformResult<TransformSummary> {
    let ExecuteTransformConfig {
        config,
        schema,
        model_datasources,
        datasource_secrets,
        print_transformer_log,
        backend,
        parameter_provider,
        asset_provider,
        synth_parameters,
    } = config;

    let transform = construct_transform(&config)?;
    let mut default_sink = TracingLogSink;
    let sink: &mut dyn LogSink = match print_transformer_log {
        Some(sink) => sink,
        None => &mut default_sink,
    };
    transform.transform(
        TransformInput {
            schema,
            model_datasources,
            datasource_secrets,
            backend,
            parameter_provider,
            asset_provider,
            synth_parameters,
        },
        sink,
    )
}

/// Default transformer log printer: routes each entry to `tracing` by level.
pub fn default_print_transformer_log(entry: &LogEntry) {
    TracingLogSink.print(entry);
}
