//! `@auth`: per-model authorization rules.
//!
//! Rules are collected from the schema and from other passes (join models
//! inherit the rules of the types they connect), checked against the
//! authorization modes configured on the API, and attached to every resolver
//! that reads or writes the model.

use super::{names, TransformPass};
use crate::context::{datasource_id, Resource, ResourceKind, TransformContext};
use crate::error::{TransformError, TransformResult};
use crate::output::AuthenticationType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ADMIN_ROLE_POLICY: &str = "AdminRolePolicy";
pub const DEFAULT_API_KEY: &str = "GraphQLAPIDefaultApiKey";
const DEFAULT_API_KEY_EXPIRATION_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthStrategy {
    Owner,
    Groups,
    Public,
    Private,
    Custom,
}

/// One entry of an `@auth(rules: [...])` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRule {
    pub allow: AuthStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_field: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<String>,
}

impl AuthRule {
    pub fn new(allow: AuthStrategy) -> Self {
        Self {
            allow,
            provider: None,
            groups: Vec::new(),
            owner_field: None,
            operations: Vec::new(),
        }
    }

    /// Authorization mode this rule needs on the API.
    pub fn authentication_type(&self) -> TransformResult<AuthenticationType> {
        match self.provider.as_deref() {
            Some("apiKey") => Ok(AuthenticationType::ApiKey),
            Some("iam") => Ok(AuthenticationType::AwsIam),
            Some("userPools") => Ok(AuthenticationType::AmazonCognitoUserPools),
            Some("oidc") => Ok(AuthenticationType::OpenidConnect),
            Some("function") => Ok(AuthenticationType::AwsLambda),
            Some(other) => Err(TransformError::directive(
                names::AUTH,
                format!("unknown auth provider '{}'", other),
            )),
            None => Ok(match self.allow {
                AuthStrategy::Public => AuthenticationType::ApiKey,
                AuthStrategy::Owner | AuthStrategy::Groups | AuthStrategy::Private => {
                    AuthenticationType::AmazonCognitoUserPools
                }
                AuthStrategy::Custom => AuthenticationType::AwsLambda,
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct AuthPass {
    admin_roles: Vec<String>,
    identity_pool_id: Option<String>,
    rules: BTreeMap<String, Vec<AuthRule>>,
    join_models: BTreeMap<String, Vec<String>>,
}

impl AuthPass {
    pub fn new(admin_roles: Vec<String>, identity_pool_id: Option<String>) -> Self {
        Self {
            admin_roles,
            identity_pool_id,
            ..Self::default()
        }
    }

    pub fn rules_for(&self, model: &str) -> &[AuthRule] {
        self.rules.get(model).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Add rules for `model`; duplicates are ignored.
    pub fn extend_rules(&mut self, model: &str, rules: impl IntoIterator<Item = AuthRule>) {
        let existing = self.rules.entry(model.to_string()).or_default();
        for rule in rules {
            if !existing.contains(&rule) {
                existing.push(rule);
            }
        }
    }

    /// Make `join` inherit the rules of each of `sources` when this pass runs.
    pub fn register_join_model(&mut self, join: &str, sources: Vec<String>) {
        self.join_models.insert(join.to_string(), sources);
    }

    pub fn join_models(&self) -> &BTreeMap<String, Vec<String>> {
        &self.join_models
    }

    fn collect_schema_rules(&mut self, ctx: &TransformContext<'_>) -> TransformResult<()> {
        for definition in ctx.schema.types_with_directive(names::AUTH) {
            if !ctx.is_model(&definition.name) {
                return Err(TransformError::directive(
                    names::AUTH,
                    format!("@auth on '{}' requires the type to be a @model", definition.name),
                ));
            }
            let rules_json = definition
                .directive(names::AUTH)
                .and_then(|d| d.argument("rules"))
                .map(|v| v.to_json())
                .ok_or_else(|| {
                    TransformError::directive(
                        names::AUTH,
                        format!("@auth on '{}' requires a 'rules' list", definition.name),
                    )
                })?;
            let rules: Vec<AuthRule> = serde_json::from_value(rules_json).map_err(|e| {
                TransformError::directive(
                    names::AUTH,
                    format!("invalid @auth rules on '{}': {}", definition.name, e),
                )
            })?;
            if rules
                .iter()
                .any(|r| r.allow == AuthStrategy::Groups && r.groups.is_empty())
            {
                return Err(TransformError::directive(
                    names::AUTH,
                    format!("@auth groups rule on '{}' must list at least one group", definition.name),
                ));
            }
            self.extend_rules(&definition.name, rules);
        }
        Ok(())
    }

    fn apply_join_models(&mut self) {
        let joins: Vec<(String, Vec<AuthRule>)> = self
            .join_models
            .iter()
            .map(|(join, sources)| {
                let inherited = sources
                    .iter()
                    .flat_map(|s| self.rules_for(s).iter().cloned())
                    .collect();
                (join.clone(), inherited)
            })
            .collect();
        for (join, rules) in joins {
            self.extend_rules(&join, rules);
        }
    }

    fn check_modes(&self, ctx: &TransformContext<'_>) -> TransformResult<()> {
        for (model, rules) in &self.rules {
            for rule in rules {
                let auth_type = rule.authentication_type()?;
                if !ctx.auth_config.supports(auth_type) {
                    return Err(TransformError::directive(
                        names::AUTH,
                        format!(
                            "@auth rule on '{}' requires {} but the API does not enable it",
                            model, auth_type
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl TransformPass for AuthPass {
    fn name(&self) -> &str {
        names::AUTH
    }

    fn depends_on(&self) -> &[&'static str] {
        &[names::MODEL]
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        self.collect_schema_rules(ctx)?;
        self.apply_join_models();

        let sandbox_public = ctx.transform_parameters.sandbox_mode_enabled
            && ctx.auth_config.default_authentication.authentication_type == AuthenticationType::ApiKey;
        let models: Vec<String> = ctx
            .schema
            .types_with_directive(names::MODEL)
            .map(|t| t.name.clone())
            .collect();
        for model in &models {
            if !self.rules_for(model).is_empty() {
                continue;
            }
            if sandbox_public {
                self.extend_rules(model, [AuthRule::new(AuthStrategy::Public)]);
            } else {
                ctx.warn(format!(
                    "Model '{}' has no @auth rules; access falls back to the default authorization mode",
                    model
                ));
            }
        }
        self.check_modes(ctx)?;

        for model in &models {
            let rules = serde_json::to_value(self.rules_for(model))?;
            let datasource = serde_json::Value::String(datasource_id(model));
            let resolvers: Vec<String> = ctx
                .resources
                .of_kind(ResourceKind::Resolver)
                .filter(|r| r.properties.get("dataSource") == Some(&datasource))
                .map(|r| r.id.clone())
                .collect();
            for id in resolvers {
                if let Some(resolver) = ctx.resources.get_mut(&id) {
                    resolver.set_property("authRules", rules.clone());
                }
            }
        }

        if !self.admin_roles.is_empty() {
            let mut policy = Resource::new(ADMIN_ROLE_POLICY, ResourceKind::Policy)
                .with_property("roles", serde_json::to_value(&self.admin_roles)?);
            if let Some(pool) = &self.identity_pool_id {
                policy.set_property("identityPoolId", pool.clone().into());
            }
            ctx.resources.add(policy);
        }

        let default_mode = &ctx.auth_config.default_authentication;
        if default_mode.authentication_type == AuthenticationType::ApiKey
            && !ctx.transform_parameters.suppress_api_key_generation
        {
            let expiration = default_mode
                .api_key_expiration_days
                .unwrap_or(DEFAULT_API_KEY_EXPIRATION_DAYS);
            ctx.resources.add(
                Resource::new(DEFAULT_API_KEY, ResourceKind::ApiKey)
                    .with_property("expirationDays", expiration.into()),
            );
        }

        let rule_count: usize = self.rules.values().map(Vec::len).sum();
        ctx.info(format!(
            "@auth applied {} rule(s) across {} model(s)",
            rule_count,
            self.rules.len()
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_map_to_authentication_types() {
        let mut rule = AuthRule::new(AuthStrategy::Owner);
        assert_eq!(rule.authentication_type().ok(), Some(AuthenticationType::AmazonCognitoUserPools));
        rule.provider = Some("oidc".into());
        assert_eq!(rule.authentication_type().ok(), Some(AuthenticationType::OpenidConnect));
        rule.provider = Some("carrier-pigeon".into());
        assert!(rule.authentication_type().is_err());
        assert_eq!(
            AuthRule::new(AuthStrategy::Public).authentication_type().ok(),
            Some(AuthenticationType::ApiKey)
        );
    }

    #[test]
    fn extend_rules_ignores_duplicates() {
        let mut pass = AuthPass::new(Vec::new(), None);
        pass.extend_rules("Post", [AuthRule::new(AuthStrategy::Private)]);
        pass.extend_rules("Post", [AuthRule::new(AuthStrategy::Private)]);
        assert_eq!(pass.rules_for("Post").len(), 1);
        assert!(pass.rules_for("Tag").is_empty());
    }
}
