//! # Transform Configuration
//!
//! Immutable inputs for one transform invocation. Everything except live pass
//! instances can be loaded from JSON.

use crate::error::{TransformError, TransformResult};
use crate::output::AuthenticationType;
use crate::passes::SharedPass;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A deployed function that `@function` directives may bind to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionHandle {
    pub function_name: String,
    pub function_arn: String,
}

/// Arguments used to build the pass chain.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformerFactoryArgs {
    pub storage_config: Option<serde_json::Value>,
    pub admin_roles: Vec<String>,
    pub identity_pool_id: Option<String>,
    #[serde(skip)]
    pub custom_transformers: Vec<SharedPass>,
    pub function_name_map: HashMap<String, FunctionHandle>,
}

impl fmt::Debug for TransformerFactoryArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let custom: Vec<String> = self
            .custom_transformers
            .iter()
            .map(|pass| {
                pass.try_borrow()
                    .map(|p| p.name().to_string())
                    .unwrap_or_else(|_| "<busy>".to_string())
            })
            .collect();
        f.debug_struct("TransformerFactoryArgs")
            .field("storage_config", &self.storage_config)
            .field("admin_roles", &self.admin_roles)
            .field("identity_pool_id", &self.identity_pool_id)
            .field("custom_transformers", &custom)
            .field("function_name_map", &self.function_name_map)
            .finish()
    }
}

/// One authorization mode of the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthMode {
    pub authentication_type: AuthenticationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_expiration_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_pool_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_id_issuer_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda_function: Option<String>,
}

impl AuthMode {
    pub fn new(authentication_type: AuthenticationType) -> Self {
        Self {
            authentication_type,
            api_key_expiration_days: None,
            user_pool_id: None,
            open_id_issuer_url: None,
            lambda_function: None,
        }
    }
}

/// Authorization modes configured on the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSyncAuthConfiguration {
    pub default_authentication: AuthMode,
    #[serde(default)]
    pub additional_authentication_providers: Vec<AuthMode>,
}

impl AppSyncAuthConfiguration {
    /// All configured modes, default first.
    pub fn modes(&self) -> impl Iterator<Item = &AuthMode> {
        std::iter::once(&self.default_authentication)
            .chain(self.additional_authentication_providers.iter())
    }

    pub fn supports(&self, auth_type: AuthenticationType) -> bool {
        self.modes().any(|m| m.authentication_type == auth_type)
    }
}

impl Default for AppSyncAuthConfiguration {
    fn default() -> Self {
        Self {
            default_authentication: AuthMode::new(AuthenticationType::ApiKey),
            additional_authentication_providers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictHandler {
    Optimistic,
    Automerge,
    Lambda,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDetection {
    pub conflict_handler: ConflictHandler,
    #[serde(default)]
    pub lambda_conflict_handler: Option<String>,
}

/// Conflict detection for the whole project and per model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverConfig {
    pub project: Option<ConflictDetection>,
    pub models: BTreeMap<String, ConflictDetection>,
}

impl ResolverConfig {
    pub fn for_model(&self, model: &str) -> Option<&ConflictDetection> {
        self.models.get(model).or(self.project.as_ref())
    }
}

/// A user-supplied resolver slot override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDefinedSlot {
    pub resolver_type_name: String,
    pub resolver_field_name: String,
    pub slot_name: String,
    #[serde(default)]
    pub request_resolver: Option<String>,
    #[serde(default)]
    pub response_resolver: Option<String>,
}

/// Feature flags that alter pass behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformParameters {
    pub should_deep_merge_directive_config_defaults: bool,
    pub disable_resolver_deduping: bool,
    pub sandbox_mode_enabled: bool,
    pub use_sub_username_for_default_identity_claim: bool,
    pub populate_owner_field_for_static_group_auth: bool,
    pub suppress_api_key_generation: bool,
    #[serde(rename = "secondaryKeyAsGSI")]
    pub secondary_key_as_gsi: bool,
    pub enable_auto_index_query_names: bool,
    pub respect_primary_key_attributes_on_connection_field: bool,
    pub enable_search_node_to_node_encryption: bool,
    pub enable_transformer_cfn_outputs: bool,
    pub allow_destructive_graphql_schema_updates: bool,
    pub replace_table_upon_gsi_update: bool,
    pub subscriptions_inherit_primary_auth: bool,
}

impl Default for TransformParameters {
    fn default() -> Self {
        Self {
            should_deep_merge_directive_config_defaults: true,
            disable_resolver_deduping: true,
            sandbox_mode_enabled: false,
            use_sub_username_for_default_identity_claim: true,
            populate_owner_field_for_static_group_auth: true,
            suppress_api_key_generation: false,
            secondary_key_as_gsi: true,
            enable_auto_index_query_names: true,
            respect_primary_key_attributes_on_connection_field: true,
            enable_search_node_to_node_encryption: false,
            enable_transformer_cfn_outputs: false,
            allow_destructive_graphql_schema_updates: false,
            replace_table_upon_gsi_update: false,
            subscriptions_inherit_primary_auth: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetAvailabilityZone {
    pub subnet_id: String,
    pub availability_zone: String,
}

/// Network placement for SQL resolver functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpcConfig {
    pub vpc_id: String,
    pub security_group_ids: Vec<String>,
    pub subnet_availability_zone_config: Vec<SubnetAvailabilityZone>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerVersion {
    pub layer_region: String,
}

/// Region name to SQL layer version.
pub type RdsLayerMapping = BTreeMap<String, LayerVersion>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DbType {
    #[serde(rename = "DDB")]
    DynamoDb,
    Mysql,
    Postgres,
}

impl DbType {
    pub fn is_sql(self) -> bool {
        matches!(self, Self::Mysql | Self::Postgres)
    }
}

/// Backing store bound to a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceType {
    pub db_type: DbType,
    pub provision_db: bool,
}

impl DatasourceType {
    pub fn dynamodb() -> Self {
        Self {
            db_type: DbType::DynamoDb,
            provision_db: true,
        }
    }
}

/// Parameter store paths of a SQL connection's secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlConnectionSecrets {
    pub username: String,
    pub password: String,
    pub host: String,
    pub database: String,
    pub port: String,
}

/// Values known only at synthesis time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SynthParameters {
    pub amplify_environment_name: String,
    pub api_name: String,
    pub account_id: Option<String>,
    pub region: Option<String>,
    pub authenticated_user_role_name: Option<String>,
    pub unauthenticated_user_role_name: Option<String>,
    pub admin_roles: Vec<String>,
    pub identity_pool_id: Option<String>,
    pub enable_iam_access: bool,
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformConfig {
    pub transformers_factory_args: TransformerFactoryArgs,
    pub resolver_config: Option<ResolverConfig>,
    pub auth_config: Option<AppSyncAuthConfiguration>,
    /// Keyed by `Type.field`.
    pub user_defined_slots: BTreeMap<String, Vec<UserDefinedSlot>>,
    /// Resource id to nested stack name.
    pub stack_mapping: BTreeMap<String, String>,
    pub transform_parameters: TransformParameters,
    pub sql_lambda_vpc_config: Option<VpcConfig>,
    pub rds_layer_mapping: Option<RdsLayerMapping>,
}

impl TransformConfig {
    pub fn from_json_str(json: &str) -> TransformResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TransformError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configuration that no chain could run against.
    pub fn validate(&self) -> TransformResult<()> {
        if let Some(role) = self
            .transformers_factory_args
            .admin_roles
            .iter()
            .find(|r| r.trim().is_empty())
        {
            return Err(TransformError::InvalidConfig(format!(
                "admin role names must not be empty (got {:?})",
                role
            )));
        }

        if let Some(vpc) = &self.sql_lambda_vpc_config {
            if vpc.vpc_id.trim().is_empty() {
                return Err(TransformError::InvalidConfig("vpcId must not be empty".into()));
            }
            if vpc.subnet_availability_zone_config.is_empty() {
                return Err(TransformError::InvalidConfig(
                    "vpc config requires at least one subnet".into(),
                ));
            }
        }

        for (key, slots) in &self.user_defined_slots {
            let (type_name, field_name) = key.split_once('.').ok_or_else(|| {
                TransformError::InvalidConfig(format!(
                    "user defined slot key '{}' is not of the form Type.field",
                    key
                ))
            })?;
            for slot in slots {
                if slot.resolver_type_name != type_name || slot.resolver_field_name != field_name {
                    return Err(TransformError::InvalidConfig(format!(
                        "slot '{}' targets {}.{} but is registered under '{}'",
                        slot.slot_name, slot.resolver_type_name, slot.resolver_field_name, key
                    )));
                }
            }
        }

        Ok(())
    }
}
