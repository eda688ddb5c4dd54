//! Producer for the GraphQL API output entry.

use super::schema::{validate_graphql_output, AuthenticationType, GraphqlOutputPayloadV1, VersionedGraphqlOutput};
use super::storage::{BackendOutputEntry, BackendOutputStorageStrategy};
use crate::error::TransformResult;

/// Entry name the API output is registered under.
pub const GRAPHQL_OUTPUT_KEY: &str = "graphqlOutput";

/// Facts about a synthesized API, as known after deployment planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphqlApiOutputs {
    pub region: String,
    pub endpoint: String,
    pub authentication_type: AuthenticationType,
    pub api_key: Option<String>,
    pub api_id: String,
    pub model_schema_s3_uri: String,
}

impl GraphqlApiOutputs {
    fn to_versioned(&self) -> VersionedGraphqlOutput {
        VersionedGraphqlOutput::V1 {
            payload: GraphqlOutputPayloadV1 {
                aws_appsync_region: self.region.clone(),
                aws_appsync_api_endpoint: self.endpoint.clone(),
                aws_appsync_authentication_type: self.authentication_type,
                aws_appsync_api_key: self.api_key.clone(),
                aws_appsync_api_id: self.api_id.clone(),
                amplify_api_model_schema_s3_uri: self.model_schema_s3_uri.clone(),
            },
        }
    }
}

/// Flatten a validated output document into a storage entry, fields in
/// payload declaration order.
fn to_entry(output: &VersionedGraphqlOutput) -> BackendOutputEntry {
    let VersionedGraphqlOutput::V1 { payload } = output;
    let mut entry = BackendOutputEntry::new(output.version())
        .with("awsAppsyncRegion", &payload.aws_appsync_region)
        .with("awsAppsyncApiEndpoint", &payload.aws_appsync_api_endpoint)
        .with(
            "awsAppsyncAuthenticationType",
            payload.aws_appsync_authentication_type.as_str(),
        );
    if let Some(api_key) = &payload.aws_appsync_api_key {
        entry.insert("awsAppsyncApiKey", api_key.as_str());
    }
    entry
        .with("awsAppsyncApiId", &payload.aws_appsync_api_id)
        .with("amplifyApiModelSchemaS3Uri", &payload.amplify_api_model_schema_s3_uri)
}

/// Validate and register the API output on `strategy`. Does not flush.
pub fn store_graphql_output(
    strategy: &mut dyn BackendOutputStorageStrategy,
    outputs: &GraphqlApiOutputs,
) -> TransformResult<()> {
    let document = serde_json::to_value(outputs.to_versioned())?;
    let validated = validate_graphql_output(&document)?;
    strategy.add_backend_output_entry(GRAPHQL_OUTPUT_KEY, to_entry(&validated))
}
