//! # Directive Utilities
//!
//! Helpers shared by passes: directive collection and stripping, typed
//! argument extraction, and a few naming conventions.

use crate::context::Resource;
use crate::error::{TransformError, TransformResult};
use crate::schema::{Directive, SchemaDocument};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

pub const API_CATEGORY: &str = "api";

/// Property under which a resource's logical name is recorded.
pub const RESOURCE_NAME_KEY: &str = "amplify:resource-name";

pub const DEFAULT_SCHEMA_DEFINITION: &str = "schema {\n  query: Query\n  mutation: Mutation\n  subscription: Subscription\n}\n";

/// Every directive in the document, types before their fields.
pub fn collect_directives(doc: &SchemaDocument) -> Vec<&Directive> {
    let mut directives = Vec::new();
    for definition in &doc.definitions {
        directives.extend(definition.directives.iter());
        for field in &definition.fields {
            directives.extend(field.directives.iter());
        }
    }
    directives
}

/// Directives grouped by the type they appear on (including field directives).
pub fn collect_directives_by_type_names(doc: &SchemaDocument) -> BTreeMap<String, Vec<&Directive>> {
    let mut by_type: BTreeMap<String, Vec<&Directive>> = BTreeMap::new();
    for definition in &doc.definitions {
        let entry = by_type.entry(definition.name.clone()).or_default();
        entry.extend(definition.directives.iter());
        for field in &definition.fields {
            entry.extend(field.directives.iter());
        }
    }
    by_type
}

/// Copy of `doc` with every directive not named in `keep` removed.
pub fn strip_directives(doc: &SchemaDocument, keep: &[&str]) -> SchemaDocument {
    let mut stripped = doc.clone();
    for definition in &mut stripped.definitions {
        definition.directives.retain(|d| keep.contains(&d.name.as_str()));
        for field in &mut definition.fields {
            field.directives.retain(|d| keep.contains(&d.name.as_str()));
        }
    }
    stripped
}

/// Typed view over one directive's arguments.
pub struct DirectiveWrapper<'a> {
    directive: &'a Directive,
}

impl<'a> DirectiveWrapper<'a> {
    pub fn new(directive: &'a Directive) -> Self {
        Self { directive }
    }

    pub fn name(&self) -> &str {
        &self.directive.name
    }

    /// Arguments as a JSON object.
    pub fn arguments_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.directive
            .arguments
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }

    /// Deserialize the arguments into `T`, layered over `defaults`.
    ///
    /// With `deep_merge`, nested objects are merged key by key; otherwise a
    /// supplied argument replaces the default wholesale.
    pub fn get_arguments<T>(&self, defaults: &T, deep_merge: bool) -> TransformResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut merged = serde_json::to_value(defaults)?;
        let supplied = serde_json::Value::Object(self.arguments_json());
        if deep_merge {
            merge_json(&mut merged, supplied);
        } else if let (Some(target), serde_json::Value::Object(source)) = (merged.as_object_mut(), supplied) {
            target.extend(source);
        }
        serde_json::from_value(merged).map_err(|e| {
            TransformError::directive(&self.directive.name, format!("invalid arguments: {}", e))
        })
    }
}

fn merge_json(target: &mut serde_json::Value, source: serde_json::Value) {
    match (target, source) {
        (serde_json::Value::Object(target), serde_json::Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => merge_json(existing, value),
                    _ => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

/// Parameter store path for a SQL connection secret.
pub fn parameter_store_secret_path(
    secret: &str,
    secrets_key: &str,
    api_name: &str,
    environment_name: &str,
    app_id: &str,
) -> TransformResult<String> {
    if app_id.trim().is_empty() {
        return Err(TransformError::InvalidConfig("unable to read the app id".into()));
    }
    Ok(format!(
        "/amplify/{}/{}/AMPLIFY_{}{}_{}",
        app_id, environment_name, api_name, secrets_key, secret
    ))
}

pub fn set_resource_name(resource: &mut Resource, name: &str) {
    resource.properties.insert(
        RESOURCE_NAME_KEY.to_string(),
        serde_json::Value::String(name.to_string()),
    );
}

pub fn resource_name(resource: &Resource) -> Option<&str> {
    resource.properties.get(RESOURCE_NAME_KEY).and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{parse_schema, Value};
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct IndexArgs {
        name: Option<String>,
        sort_key_fields: Vec<String>,
        options: serde_json::Value,
    }

    #[test]
    fn arguments_merge_over_defaults() {
        let directive = Directive::new("index")
            .with_argument("name", Value::String("byOwner".into()))
            .with_argument(
                "options",
                Value::Object(vec![("projection".into(), Value::Enum("ALL".into()))]),
            );
        let defaults = IndexArgs {
            name: None,
            sort_key_fields: vec![],
            options: serde_json::json!({ "ttl": 5 }),
        };

        let deep = DirectiveWrapper::new(&directive).get_arguments(&defaults, true).unwrap();
        assert_eq!(deep.name.as_deref(), Some("byOwner"));
        assert_eq!(deep.options, serde_json::json!({ "ttl": 5, "projection": "ALL" }));

        let shallow = DirectiveWrapper::new(&directive).get_arguments(&defaults, false).unwrap();
        assert_eq!(shallow.options, serde_json::json!({ "projection": "ALL" }));
    }

    #[test]
    fn strip_keeps_only_named_directives() {
        let doc = parse_schema("type A @model @auth(rules: []) { id: ID! @primaryKey }").unwrap();
        let stripped = strip_directives(&doc, &["model"]);
        assert_eq!(collect_directives(&stripped).len(), 1);
        assert_eq!(collect_directives(&doc).len(), 3);
        assert_eq!(collect_directives_by_type_names(&doc)["A"].len(), 3);
    }

    #[test]
    fn secret_path_requires_app_id() {
        assert_eq!(
            parameter_store_secret_path("password", "sql", "blog", "dev", "app1").unwrap(),
            "/amplify/app1/dev/AMPLIFY_blogsql_password"
        );
        assert!(parameter_store_secret_path("password", "sql", "blog", "dev", "").is_err());
    }
}
