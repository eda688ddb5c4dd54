//! `@searchable`: streams model tables into a shared search domain.

use super::{add_resolver, names, plural, TransformPass};
use crate::context::{table_id, Resource, ResourceKind, TransformContext};
use crate::error::{TransformError, TransformResult};
use crate::schema::{FieldDefinition, TypeRef};

pub const SEARCH_DOMAIN: &str = "OpenSearchDomain";
pub const SEARCH_DATASOURCE: &str = "OpenSearchDataSource";
pub const STREAMING_FUNCTION: &str = "OpenSearchStreamingLambdaFunction";
const STACK: &str = "SearchableStack";

#[derive(Debug, Default)]
pub struct SearchablePass;

impl SearchablePass {
    pub fn new() -> Self {
        Self
    }
}

impl TransformPass for SearchablePass {
    fn name(&self) -> &str {
        names::SEARCHABLE
    }

    fn depends_on(&self) -> &[&'static str] {
        &[names::MODEL]
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        let mut models = Vec::new();
        for definition in ctx.schema.types_with_directive(names::SEARCHABLE) {
            if !ctx.resources.contains(&table_id(&definition.name)) {
                return Err(TransformError::directive(
                    names::SEARCHABLE,
                    format!(
                        "@searchable on '{}' requires a DynamoDB-backed @model",
                        definition.name
                    ),
                ));
            }
            models.push(definition.name.clone());
        }
        if models.is_empty() {
            return Ok(());
        }

        ctx.warn(
            "@searchable provisions a search domain billed per instance hour; \
             review its sizing before deploying to production",
        );
        let encryption = ctx.transform_parameters.enable_search_node_to_node_encryption;
        ctx.resources.add(
            Resource::new(SEARCH_DOMAIN, ResourceKind::SearchDomain)
                .in_stack(STACK)
                .with_property("nodeToNodeEncryption", encryption.into()),
        );
        ctx.resources.add(
            Resource::new(SEARCH_DATASOURCE, ResourceKind::DataSource)
                .in_stack(STACK)
                .with_property("type", "AMAZON_OPENSEARCH_SERVICE".into())
                .with_property("domain", SEARCH_DOMAIN.into()),
        );
        let mut streaming = Resource::new(STREAMING_FUNCTION, ResourceKind::Function).in_stack(STACK);
        for model in &models {
            streaming.push_property("sourceTables", table_id(model).into());
        }
        ctx.resources.add(streaming);

        for model in &models {
            if let Some(table) = ctx.resources.get_mut(&table_id(model)) {
                table.set_property("streamViewType", "NEW_AND_OLD_IMAGES".into());
            }
            let query_field = format!("search{}", plural(model));
            add_resolver(ctx, "Query", &query_field, SEARCH_DATASOURCE, Some(STACK))
                .set_property("index", model.to_lowercase().into());
            ctx.schema.ensure_object_type("Query").ensure_field(FieldDefinition::new(
                query_field,
                TypeRef::named(format!("Searchable{}Connection", model)),
            ));
        }
        Ok(())
    }
}
