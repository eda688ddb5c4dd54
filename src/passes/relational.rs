//! Relational directives: `@hasMany`, `@hasOne`, `@belongsTo`, `@manyToMany`.

use super::{
    add_resolver, capitalize, lower_first, names, required_str_arg, AuthPass, IndexPass, IndexRecord,
    ModelPass, PassHandle, TransformPass,
};
use crate::context::{datasource_id, table_id, TransformContext};
use crate::error::{TransformError, TransformResult};
use crate::schema::{FieldDefinition, TypeRef};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

/// A directed one-to-one link from `source.field` to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub source: String,
    pub field: String,
    pub target: String,
    pub required: bool,
}

struct RelationalField {
    source: String,
    field: String,
    target: String,
    is_list: bool,
    required: bool,
}

/// Fields carrying `directive`, with both ends checked to be models.
fn relational_fields(ctx: &TransformContext<'_>, directive: &str) -> TransformResult<Vec<RelationalField>> {
    let mut fields = Vec::new();
    for (definition, field) in ctx.schema.fields_with_directive(directive) {
        let target = field.ty.base_name();
        for type_name in [definition.name.as_str(), target] {
            if !ctx.is_model(type_name) {
                return Err(TransformError::directive(
                    directive,
                    format!(
                        "@{} on {}.{} requires '{}' to be a @model",
                        directive, definition.name, field.name, type_name
                    ),
                ));
            }
        }
        fields.push(RelationalField {
            source: definition.name.clone(),
            field: field.name.clone(),
            target: target.to_string(),
            is_list: field.ty.is_list(),
            required: field.ty.is_non_null(),
        });
    }
    Ok(fields)
}

fn ensure_foreign_key(ctx: &mut TransformContext<'_>, type_name: &str, key: &str) {
    if let Some(definition) = ctx.schema.get_type_mut(type_name) {
        definition.ensure_field(FieldDefinition::new(key, TypeRef::named("ID")));
    }
}

fn connection_type(model: &str) -> TypeRef {
    TypeRef::named(format!("Model{}Connection", model))
}

// ============================================================================
// @hasMany
// ============================================================================

#[derive(Debug, Default)]
pub struct HasManyPass;

impl HasManyPass {
    pub fn new() -> Self {
        Self
    }
}

impl TransformPass for HasManyPass {
    fn name(&self) -> &str {
        names::HAS_MANY
    }

    fn depends_on(&self) -> &[&'static str] {
        &[names::MODEL, names::INDEX]
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        for rel in relational_fields(ctx, names::HAS_MANY)? {
            if !rel.is_list {
                return Err(TransformError::directive(
                    names::HAS_MANY,
                    format!("@hasMany field {}.{} must be a list", rel.source, rel.field),
                ));
            }

            let foreign_key = format!("{}{}Id", lower_first(&rel.source), capitalize(&rel.field));
            let index_name = format!("gsi-{}.{}", rel.source, rel.field);
            ensure_foreign_key(ctx, &rel.target, &foreign_key);
            if let Some(table) = ctx.resources.get_mut(&table_id(&rel.target)) {
                table.push_property(
                    "globalSecondaryIndexes",
                    json!({ "indexName": index_name, "partitionKey": foreign_key, "sortKeys": [] }),
                );
            }
            if let Some(field) = ctx
                .schema
                .get_type_mut(&rel.source)
                .and_then(|t| t.field_mut(&rel.field))
            {
                field.ty = connection_type(&rel.target);
            }

            let resolver = add_resolver(ctx, &rel.source, &rel.field, &datasource_id(&rel.target), Some(&rel.target));
            resolver.set_property("relation", "hasMany".into());
            resolver.set_property("index", index_name.into());
        }
        Ok(())
    }
}

// ============================================================================
// @hasOne
// ============================================================================

#[derive(Debug, Default)]
pub struct HasOnePass {
    relations: Vec<Relation>,
}

impl HasOnePass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn add_relation(&mut self, relation: Relation) {
        if !self.relations.contains(&relation) {
            self.relations.push(relation);
        }
    }
}

/// First cycle among required relations, closed (`[A, B, A]`).
fn find_required_cycle(relations: &[Relation]) -> Option<Vec<String>> {
    let mut edges: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for relation in relations.iter().filter(|r| r.required) {
        edges
            .entry(relation.source.as_str())
            .or_default()
            .push(relation.target.as_str());
    }

    fn visit<'a>(
        node: &'a str,
        edges: &BTreeMap<&'a str, Vec<&'a str>>,
        path: &mut Vec<&'a str>,
        done: &mut BTreeSet<&'a str>,
    ) -> Option<Vec<String>> {
        if let Some(pos) = path.iter().position(|n| *n == node) {
            let mut cycle: Vec<String> = path[pos..].iter().map(|n| n.to_string()).collect();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        if done.contains(node) {
            return None;
        }
        path.push(node);
        for next in edges.get(node).into_iter().flatten() {
            if let Some(cycle) = visit(next, edges, path, done) {
                return Some(cycle);
            }
        }
        path.pop();
        done.insert(node);
        None
    }

    let mut done = BTreeSet::new();
    for node in edges.keys() {
        let mut path = Vec::new();
        if let Some(cycle) = visit(node, &edges, &mut path, &mut done) {
            return Some(cycle);
        }
    }
    None
}

impl TransformPass for HasOnePass {
    fn name(&self) -> &str {
        names::HAS_ONE
    }

    fn depends_on(&self) -> &[&'static str] {
        &[names::MODEL]
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        for rel in relational_fields(ctx, names::HAS_ONE)? {
            if rel.is_list {
                return Err(TransformError::directive(
                    names::HAS_ONE,
                    format!("@hasOne field {}.{} must not be a list", rel.source, rel.field),
                ));
            }
            let foreign_key = format!("{}{}Id", lower_first(&rel.source), capitalize(&rel.field));
            ensure_foreign_key(ctx, &rel.source, &foreign_key);
            let resolver = add_resolver(ctx, &rel.source, &rel.field, &datasource_id(&rel.target), Some(&rel.target));
            resolver.set_property("relation", "hasOne".into());
            resolver.set_property("foreignKey", foreign_key.into());

            self.add_relation(Relation {
                source: rel.source,
                field: rel.field,
                target: rel.target,
                required: rel.required,
            });
        }

        if let Some(cycle) = find_required_cycle(&self.relations) {
            return Err(TransformError::CyclicRelation {
                pass: names::HAS_ONE.to_string(),
                cycle,
            });
        }
        Ok(())
    }
}

// ============================================================================
// @belongsTo
// ============================================================================

#[derive(Debug, Default)]
pub struct BelongsToPass;

impl BelongsToPass {
    pub fn new() -> Self {
        Self
    }
}

impl TransformPass for BelongsToPass {
    fn name(&self) -> &str {
        names::BELONGS_TO
    }

    fn depends_on(&self) -> &[&'static str] {
        &[names::HAS_MANY, names::HAS_ONE]
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        for rel in relational_fields(ctx, names::BELONGS_TO)? {
            if rel.is_list {
                return Err(TransformError::directive(
                    names::BELONGS_TO,
                    format!("@belongsTo field {}.{} must not be a list", rel.source, rel.field),
                ));
            }
            // A @hasMany inverse has already been rewritten to its connection type.
            let connection = format!("Model{}Connection", rel.source);
            let has_inverse = ctx
                .schema
                .get_type(&rel.target)
                .map(|t| {
                    t.fields.iter().any(|f| {
                        (f.ty.base_name() == rel.source || f.ty.base_name() == connection)
                            && (f.has_directive(names::HAS_ONE) || f.has_directive(names::HAS_MANY))
                    })
                })
                .unwrap_or(false);
            if !has_inverse {
                return Err(TransformError::directive(
                    names::BELONGS_TO,
                    format!(
                        "@belongsTo on {}.{} has no matching @hasOne or @hasMany on '{}'",
                        rel.source, rel.field, rel.target
                    ),
                ));
            }

            let foreign_key = format!("{}Id", rel.field);
            ensure_foreign_key(ctx, &rel.source, &foreign_key);
            let resolver = add_resolver(ctx, &rel.source, &rel.field, &datasource_id(&rel.target), Some(&rel.target));
            resolver.set_property("relation", "belongsTo".into());
            resolver.set_property("foreignKey", foreign_key.into());
        }
        Ok(())
    }
}

// ============================================================================
// @manyToMany
// ============================================================================

/// Builds a join model between two types through live handles to the model,
/// index, hasOne and auth passes of the same chain.
pub struct ManyToManyPass {
    model: PassHandle<ModelPass>,
    index: PassHandle<IndexPass>,
    has_one: PassHandle<HasOnePass>,
    auth: PassHandle<AuthPass>,
}

struct ManyToManyField {
    type_name: String,
    field: String,
    target: String,
}

impl ManyToManyPass {
    pub fn new(
        model: PassHandle<ModelPass>,
        index: PassHandle<IndexPass>,
        has_one: PassHandle<HasOnePass>,
        auth: PassHandle<AuthPass>,
    ) -> Self {
        Self {
            model,
            index,
            has_one,
            auth,
        }
    }

    pub fn model_handle(&self) -> &PassHandle<ModelPass> {
        &self.model
    }

    pub fn index_handle(&self) -> &PassHandle<IndexPass> {
        &self.index
    }

    pub fn has_one_handle(&self) -> &PassHandle<HasOnePass> {
        &self.has_one
    }

    pub fn auth_handle(&self) -> &PassHandle<AuthPass> {
        &self.auth
    }

    fn build_join(
        &self,
        ctx: &mut TransformContext<'_>,
        join: &str,
        a: &ManyToManyField,
        b: &ManyToManyField,
    ) -> TransformResult<()> {
        let a_key = format!("{}Id", lower_first(&a.type_name));
        let b_key = format!("{}Id", lower_first(&b.type_name));
        let required = |ty: &str| TypeRef::non_null(TypeRef::named(ty));
        let fields = vec![
            FieldDefinition::new("id", required("ID")),
            FieldDefinition::new(a_key.clone(), required("ID")),
            FieldDefinition::new(b_key.clone(), required("ID")),
            FieldDefinition::new(lower_first(&a.type_name), required(&a.type_name)),
            FieldDefinition::new(lower_first(&b.type_name), required(&b.type_name)),
        ];

        self.model
            .with_mut(|model| model.add_synthesized_model(ctx, join, fields))??;
        for (member, key) in [(a, a_key), (b, b_key)] {
            let record = IndexRecord {
                model: join.to_string(),
                name: format!("by{}", member.type_name),
                partition_key: key,
                sort_keys: Vec::new(),
                query_field: None,
            };
            self.index.with_mut(|index| index.add_index(ctx, record))??;
        }
        self.has_one.with_mut(|has_one| {
            for member in [a, b] {
                has_one.add_relation(Relation {
                    source: join.to_string(),
                    field: lower_first(&member.type_name),
                    target: member.type_name.clone(),
                    required: true,
                });
            }
        })?;
        self.auth.with_mut(|auth| {
            auth.register_join_model(join, vec![a.type_name.clone(), b.type_name.clone()])
        })?;

        for member in [a, b] {
            if let Some(field) = ctx
                .schema
                .get_type_mut(&member.type_name)
                .and_then(|t| t.field_mut(&member.field))
            {
                field.ty = connection_type(join);
            }
            add_resolver(ctx, &member.type_name, &member.field, &datasource_id(join), Some(join))
                .set_property("relation", "manyToMany".into());
        }
        ctx.debug(format!(
            "Joined {} and {} through {}",
            a.type_name, b.type_name, join
        ));
        Ok(())
    }
}

impl TransformPass for ManyToManyPass {
    fn name(&self) -> &str {
        names::MANY_TO_MANY
    }

    fn depends_on(&self) -> &[&'static str] {
        &[names::MODEL, names::INDEX, names::HAS_ONE]
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        let mut groups: BTreeMap<String, Vec<ManyToManyField>> = BTreeMap::new();
        for (definition, field) in ctx.schema.fields_with_directive(names::MANY_TO_MANY) {
            let location = format!("{}.{}", definition.name, field.name);
            let directive = match field.directive(names::MANY_TO_MANY) {
                Some(d) => d,
                None => continue,
            };
            let relation_name = required_str_arg(names::MANY_TO_MANY, directive, "relationName", &location)?;
            if !field.ty.is_list() {
                return Err(TransformError::directive(
                    names::MANY_TO_MANY,
                    format!("@manyToMany field {} must be a list", location),
                ));
            }
            groups
                .entry(capitalize(relation_name))
                .or_default()
                .push(ManyToManyField {
                    type_name: definition.name.clone(),
                    field: field.name.clone(),
                    target: field.ty.base_name().to_string(),
                });
        }

        for (join, members) in &groups {
            if members.len() != 2 {
                return Err(TransformError::directive(
                    names::MANY_TO_MANY,
                    format!(
                        "relationName '{}' must be used on exactly two fields, found {}",
                        join,
                        members.len()
                    ),
                ));
            }
            let (a, b) = (&members[0], &members[1]);
            if a.type_name == b.type_name {
                return Err(TransformError::directive(
                    names::MANY_TO_MANY,
                    format!("relationName '{}' cannot join '{}' to itself", join, a.type_name),
                ));
            }
            if a.target != b.type_name || b.target != a.type_name {
                return Err(TransformError::directive(
                    names::MANY_TO_MANY,
                    format!(
                        "fields sharing relationName '{}' must reference each other's types",
                        join
                    ),
                ));
            }
            for member in [a, b] {
                if !self.model.with(|model| model.is_model(&member.type_name))? {
                    return Err(TransformError::directive(
                        names::MANY_TO_MANY,
                        format!("@manyToMany requires '{}' to be a @model", member.type_name),
                    ));
                }
            }
            self.build_join(ctx, join, a, b)?;
        }
        Ok(())
    }
}
