//! `@index`: secondary indexes on model tables.

use super::{add_resolver, capitalize, names, plural, TransformPass};
use crate::context::{datasource_id, table_id, TransformContext};
use crate::directives::DirectiveWrapper;
use crate::error::{TransformError, TransformResult};
use crate::schema::{FieldDefinition, TypeRef};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// One secondary index registered on a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub model: String,
    pub name: String,
    pub partition_key: String,
    pub sort_keys: Vec<String>,
    pub query_field: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexArguments {
    name: Option<String>,
    sort_key_fields: Vec<String>,
    query_field: Option<String>,
}

#[derive(Debug, Default)]
pub struct IndexPass {
    indexes: Vec<IndexRecord>,
}

impl IndexPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indexes(&self) -> &[IndexRecord] {
        &self.indexes
    }

    pub fn indexes_on<'a>(&'a self, model: &'a str) -> impl Iterator<Item = &'a IndexRecord> {
        self.indexes.iter().filter(move |i| i.model == model)
    }

    /// Register an index and attach it to the model's table.
    pub fn add_index(&mut self, ctx: &mut TransformContext<'_>, record: IndexRecord) -> TransformResult<()> {
        if !ctx.is_model(&record.model) {
            return Err(TransformError::directive(
                names::INDEX,
                format!("index '{}' targets '{}', which is not a @model", record.name, record.model),
            ));
        }
        if self.indexes_on(&record.model).any(|i| i.name == record.name) {
            return Err(TransformError::directive(
                names::INDEX,
                format!("duplicate index '{}' on '{}'", record.name, record.model),
            ));
        }

        let kind = if ctx.transform_parameters.secondary_key_as_gsi {
            "globalSecondaryIndexes"
        } else {
            "localSecondaryIndexes"
        };
        if let Some(table) = ctx.resources.get_mut(&table_id(&record.model)) {
            table.push_property(
                kind,
                json!({
                    "indexName": record.name,
                    "partitionKey": record.partition_key,
                    "sortKeys": record.sort_keys,
                }),
            );
        }

        if let Some(query_field) = &record.query_field {
            add_resolver(ctx, "Query", query_field, &datasource_id(&record.model), Some(record.model.as_str()))
                .set_property("index", record.name.clone().into());
            let field = FieldDefinition::new(
                query_field.clone(),
                TypeRef::named(format!("Model{}Connection", record.model)),
            );
            ctx.schema.ensure_object_type("Query").ensure_field(field);
        }

        ctx.debug(format!("Registered index {} on {}", record.name, record.model));
        self.indexes.push(record);
        Ok(())
    }
}

impl TransformPass for IndexPass {
    fn name(&self) -> &str {
        names::INDEX
    }

    fn depends_on(&self) -> &[&'static str] {
        &[names::MODEL]
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        let deep_merge = ctx.transform_parameters.should_deep_merge_directive_config_defaults;
        let auto_query_names = ctx.transform_parameters.enable_auto_index_query_names;

        let mut records = Vec::new();
        for (definition, field) in ctx.schema.fields_with_directive(names::INDEX) {
            for directive in field.directives.iter().filter(|d| d.name == names::INDEX) {
                let args = DirectiveWrapper::new(directive).get_arguments(&IndexArguments::default(), deep_merge)?;
                if let Some(missing) = args.sort_key_fields.iter().find(|k| definition.field(k).is_none()) {
                    return Err(TransformError::directive(
                        names::INDEX,
                        format!("sort key field '{}' does not exist on '{}'", missing, definition.name),
                    ));
                }

                let name = args.name.unwrap_or_else(|| {
                    let mut name = format!("by{}", capitalize(&field.name));
                    for key in &args.sort_key_fields {
                        name.push_str("And");
                        name.push_str(&capitalize(key));
                    }
                    name
                });
                let query_field = args.query_field.or_else(|| {
                    auto_query_names.then(|| {
                        format!("{}By{}", super::lower_first(&plural(&definition.name)), capitalize(&field.name))
                    })
                });
                records.push(IndexRecord {
                    model: definition.name.clone(),
                    name,
                    partition_key: field.name.clone(),
                    sort_keys: args.sort_key_fields,
                    query_field,
                });
            }
        }

        for record in records {
            self.add_index(ctx, record)?;
        }
        Ok(())
    }
}
