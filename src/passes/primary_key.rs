//! `@primaryKey`: overrides the key schema of a materialized model.

use super::{names, TransformPass};
use crate::context::{datasource_id, table_id, TransformContext};
use crate::error::{TransformError, TransformResult};
use serde_json::json;

#[derive(Debug, Default)]
pub struct PrimaryKeyPass;

impl PrimaryKeyPass {
    pub fn new() -> Self {
        Self
    }
}

struct KeySpec {
    model: String,
    partition_key: String,
    sort_keys: Vec<String>,
}

impl TransformPass for PrimaryKeyPass {
    fn name(&self) -> &str {
        names::PRIMARY_KEY
    }

    fn depends_on(&self) -> &[&'static str] {
        &[names::MODEL]
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        let mut keys: Vec<KeySpec> = Vec::new();
        for (definition, field) in ctx.schema.fields_with_directive(names::PRIMARY_KEY) {
            let location = format!("{}.{}", definition.name, field.name);
            if !ctx.is_model(&definition.name) {
                return Err(TransformError::directive(
                    names::PRIMARY_KEY,
                    format!("@primaryKey on {} requires '{}' to be a @model", location, definition.name),
                ));
            }
            if keys.iter().any(|k| k.model == definition.name) {
                return Err(TransformError::directive(
                    names::PRIMARY_KEY,
                    format!("type '{}' declares more than one @primaryKey", definition.name),
                ));
            }
            if !field.ty.is_non_null() || field.ty.is_list() {
                return Err(TransformError::directive(
                    names::PRIMARY_KEY,
                    format!("@primaryKey field {} must be a non-null scalar", location),
                ));
            }

            let sort_keys: Vec<String> = field
                .directive(names::PRIMARY_KEY)
                .and_then(|d| d.argument("sortKeyFields"))
                .and_then(|v| v.as_list())
                .map(|items| items.iter().filter_map(|v| v.as_str()).map(str::to_string).collect())
                .unwrap_or_default();
            if let Some(missing) = sort_keys.iter().find(|k| definition.field(k).is_none()) {
                return Err(TransformError::directive(
                    names::PRIMARY_KEY,
                    format!("sort key field '{}' does not exist on '{}'", missing, definition.name),
                ));
            }

            keys.push(KeySpec {
                model: definition.name.clone(),
                partition_key: field.name.clone(),
                sort_keys,
            });
        }

        for key in keys {
            let id = if ctx.resources.contains(&table_id(&key.model)) {
                table_id(&key.model)
            } else {
                datasource_id(&key.model)
            };
            let target = match ctx.resources.get_mut(&id) {
                Some(target) => target,
                None => continue,
            };
            target.set_property("hashKey", key.partition_key.clone().into());
            target.set_property("sortKeys", json!(key.sort_keys));
            ctx.debug(format!(
                "Primary key of {} set to {}",
                key.model, key.partition_key
            ));
        }
        Ok(())
    }
}
