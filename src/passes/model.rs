//! `@model`: materializes types into tables, datasources and CRUD operations.

use super::{add_resolver, names, plural, TransformPass};
use crate::config::DatasourceType;
use crate::context::{datasource_id, table_id, Resource, ResourceKind, TransformContext};
use crate::error::{TransformError, TransformResult};
use crate::schema::{Directive, FieldDefinition, InputValueDefinition, TypeRef};
use serde_json::json;
use std::collections::BTreeMap;

/// What the model pass knows about one materialized type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRecord {
    pub datasource: DatasourceType,
    /// Created on behalf of another pass rather than declared in the schema.
    pub synthesized: bool,
}

#[derive(Debug, Default)]
pub struct ModelPass {
    models: BTreeMap<String, ModelRecord>,
}

impl ModelPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_model(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn models(&self) -> &BTreeMap<String, ModelRecord> {
        &self.models
    }

    /// Declare and materialize a model that the schema does not contain.
    pub fn add_synthesized_model(
        &mut self,
        ctx: &mut TransformContext<'_>,
        name: &str,
        fields: Vec<FieldDefinition>,
    ) -> TransformResult<()> {
        if self.is_model(name) {
            return Err(TransformError::directive(
                names::MODEL,
                format!("model '{}' already exists", name),
            ));
        }
        let definition = ctx.schema.ensure_object_type(name);
        if !definition.has_directive(names::MODEL) {
            definition.directives.push(Directive::new(names::MODEL));
        }
        for field in fields {
            definition.ensure_field(field);
        }
        self.materialize(ctx, name, true)
    }

    fn materialize(
        &mut self,
        ctx: &mut TransformContext<'_>,
        name: &str,
        synthesized: bool,
    ) -> TransformResult<()> {
        let datasource = ctx.datasource_for(name);

        if datasource.db_type.is_sql() {
            let secrets = ctx.datasource_secrets.get(name).cloned().ok_or_else(|| {
                TransformError::UnresolvedDatasource {
                    pass: names::MODEL.to_string(),
                    model: name.to_string(),
                    reason: "SQL datasource has no connection secrets".to_string(),
                }
            })?;
            let mut resource = Resource::new(datasource_id(name), ResourceKind::DataSource)
                .in_stack(name)
                .with_property("type", "RELATIONAL_DATABASE".into())
                .with_property("engine", serde_json::to_value(datasource.db_type)?)
                .with_property("secrets", serde_json::to_value(&secrets)?);
            if let Some(vpc) = &ctx.vpc_config {
                resource.set_property("vpc", serde_json::to_value(vpc)?);
            }
            ctx.resources.add(resource);
        } else {
            let mut table = Resource::new(table_id(name), ResourceKind::Table)
                .in_stack(name)
                .with_property("tableName", name.into())
                .with_property("hashKey", "id".into())
                .with_property("billingMode", "PAY_PER_REQUEST".into())
                .with_property("globalSecondaryIndexes", json!([]));
            if let Some(conflict) = ctx.resolver_config.as_ref().and_then(|r| r.for_model(name)) {
                table.set_property("conflictDetection", serde_json::to_value(conflict)?);
            }
            ctx.resources.add(table);
            ctx.resources.add(
                Resource::new(datasource_id(name), ResourceKind::DataSource)
                    .in_stack(name)
                    .with_property("type", "AMAZON_DYNAMODB".into())
                    .with_property("table", table_id(name).into()),
            );
        }

        self.materialize_fields(ctx, name)?;
        self.materialize_operations(ctx, name);

        self.models.insert(
            name.to_string(),
            ModelRecord {
                datasource,
                synthesized,
            },
        );
        ctx.debug(format!("Materialized model {}", name));
        Ok(())
    }

    fn materialize_fields(&self, ctx: &mut TransformContext<'_>, name: &str) -> TransformResult<()> {
        let versioned = ctx
            .resolver_config
            .as_ref()
            .and_then(|r| r.for_model(name))
            .is_some();
        let definition = ctx.schema.get_type_mut(name).ok_or_else(|| {
            TransformError::directive(names::MODEL, format!("type '{}' is not defined", name))
        })?;

        let required = |ty: &str| TypeRef::non_null(TypeRef::named(ty));
        if definition.fields.iter().all(|f| !f.has_directive(names::PRIMARY_KEY)) {
            definition.ensure_field(FieldDefinition::new("id", required("ID")));
        }
        definition.ensure_field(FieldDefinition::new("createdAt", required("AWSDateTime")));
        definition.ensure_field(FieldDefinition::new("updatedAt", required("AWSDateTime")));
        if versioned {
            definition.ensure_field(FieldDefinition::new("_version", required("Int")));
            definition.ensure_field(FieldDefinition::new("_deleted", TypeRef::named("Boolean")));
            definition.ensure_field(FieldDefinition::new("_lastChangedAt", required("AWSTimestamp")));
        }

        let connection = ctx.schema.ensure_object_type(&format!("Model{}Connection", name));
        connection.ensure_field(FieldDefinition::new(
            "items",
            TypeRef::non_null(TypeRef::List(Box::new(TypeRef::named(name)))),
        ));
        connection.ensure_field(FieldDefinition::new("nextToken", TypeRef::named("String")));
        Ok(())
    }

    fn materialize_operations(&self, ctx: &mut TransformContext<'_>, name: &str) {
        let datasource = datasource_id(name);
        let id_argument = InputValueDefinition {
            name: "id".to_string(),
            ty: TypeRef::non_null(TypeRef::named("ID")),
            default_value: None,
        };

        let mut get = FieldDefinition::new(format!("get{}", name), TypeRef::named(name));
        get.arguments.push(id_argument.clone());
        let list = FieldDefinition::new(
            format!("list{}", plural(name)),
            TypeRef::named(format!("Model{}Connection", name)),
        );
        let query_fields = [get, list];

        let mutation_fields: Vec<FieldDefinition> = ["create", "update", "delete"]
            .iter()
            .map(|op| FieldDefinition::new(format!("{}{}", op, name), TypeRef::named(name)))
            .collect();

        for field in query_fields {
            add_resolver(ctx, "Query", &field.name, &datasource, Some(name));
            ctx.schema.ensure_object_type("Query").ensure_field(field);
        }
        for field in mutation_fields {
            add_resolver(ctx, "Mutation", &field.name, &datasource, Some(name));
            ctx.schema.ensure_object_type("Mutation").ensure_field(field);
        }
    }
}

impl TransformPass for ModelPass {
    fn name(&self) -> &str {
        names::MODEL
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        let declared: Vec<String> = ctx
            .schema
            .types_with_directive(names::MODEL)
            .map(|t| t.name.clone())
            .collect();

        for name in &declared {
            if !self.is_model(name) {
                self.materialize(ctx, name, false)?;
            }
        }
        ctx.info(format!("@model materialized {} model(s)", declared.len()));
        Ok(())
    }
}
