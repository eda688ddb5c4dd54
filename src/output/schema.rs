//! Versioned description of a deployed GraphQL API.
//!
//! Each version is a variant of one internally tagged union keyed on
//! `version`, so a validator built against today's variants keeps rejecting
//! unknown tags instead of misreading them.

use crate::error::{TransformError, TransformResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthenticationType {
    ApiKey,
    AwsLambda,
    AwsIam,
    OpenidConnect,
    AmazonCognitoUserPools,
}

impl AuthenticationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApiKey => "API_KEY",
            Self::AwsLambda => "AWS_LAMBDA",
            Self::AwsIam => "AWS_IAM",
            Self::OpenidConnect => "OPENID_CONNECT",
            Self::AmazonCognitoUserPools => "AMAZON_COGNITO_USER_POOLS",
        }
    }
}

impl fmt::Display for AuthenticationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlOutputPayloadV1 {
    pub aws_appsync_region: String,
    pub aws_appsync_api_endpoint: String,
    pub aws_appsync_authentication_type: AuthenticationType,
    /// Only meaningful with `API_KEY` authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_appsync_api_key: Option<String>,
    pub aws_appsync_api_id: String,
    pub amplify_api_model_schema_s3_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum VersionedGraphqlOutput {
    #[serde(rename = "1")]
    V1 { payload: GraphqlOutputPayloadV1 },
}

impl VersionedGraphqlOutput {
    pub fn version(&self) -> &'static str {
        match self {
            Self::V1 { .. } => "1",
        }
    }
}

/// Structurally validate a candidate output document.
pub fn validate_graphql_output(value: &serde_json::Value) -> TransformResult<VersionedGraphqlOutput> {
    VersionedGraphqlOutput::deserialize(value)
        .map_err(|e| TransformError::Validation(format!("invalid graphql output: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn authentication_type_wire_names() {
        assert_eq!(
            serde_json::to_value(AuthenticationType::AmazonCognitoUserPools).unwrap(),
            json!("AMAZON_COGNITO_USER_POOLS")
        );
        assert_eq!(AuthenticationType::OpenidConnect.to_string(), "OPENID_CONNECT");
    }

    #[test]
    fn unknown_version_is_rejected() {
        let doc = json!({
            "version": "2",
            "payload": {
                "awsAppsyncRegion": "us-east-1",
                "awsAppsyncApiEndpoint": "https://example.com/graphql",
                "awsAppsyncAuthenticationType": "AWS_IAM",
                "awsAppsyncApiId": "abc",
                "amplifyApiModelSchemaS3Uri": "s3://bucket/schema.graphql"
            }
        });
        assert!(validate_graphql_output(&doc).is_err());
    }
}
