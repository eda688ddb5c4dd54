//! `@default`: creation-time default values for model fields.

use super::{add_resolver, names, required_str_arg, TransformPass};
use crate::context::{datasource_id, TransformContext};
use crate::error::{TransformError, TransformResult};
use crate::schema::{SchemaDocument, TypeKind};
use serde_json::json;

#[derive(Debug, Default)]
pub struct DefaultValuePass;

impl DefaultValuePass {
    pub fn new() -> Self {
        Self
    }
}

/// Check `value` against the named field type and return its JSON form.
fn coerce(schema: &SchemaDocument, type_name: &str, value: &str) -> Result<serde_json::Value, String> {
    match type_name {
        "Int" => value
            .parse::<i64>()
            .map(serde_json::Value::from)
            .map_err(|_| format!("'{}' is not a valid Int", value)),
        "Float" => value
            .parse::<f64>()
            .map(serde_json::Value::from)
            .map_err(|_| format!("'{}' is not a valid Float", value)),
        "Boolean" => value
            .parse::<bool>()
            .map(serde_json::Value::from)
            .map_err(|_| format!("'{}' is not a valid Boolean", value)),
        "ID" | "String" | "AWSDate" | "AWSTime" | "AWSDateTime" | "AWSEmail" | "AWSURL" | "AWSPhone"
        | "AWSIPAddress" | "AWSJSON" => Ok(value.into()),
        other => match schema.get_type(other).map(|t| (t.kind, t)) {
            Some((TypeKind::Enum, definition)) => {
                if definition.members.iter().any(|m| m == value) {
                    Ok(value.into())
                } else {
                    Err(format!("'{}' is not a member of enum {}", value, other))
                }
            }
            Some((TypeKind::Scalar, _)) => Ok(value.into()),
            _ => Err(format!("type {} cannot carry a default value", other)),
        },
    }
}

impl TransformPass for DefaultValuePass {
    fn name(&self) -> &str {
        names::DEFAULT_VALUE
    }

    fn depends_on(&self) -> &[&'static str] {
        &[names::MODEL]
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        let mut defaults = Vec::new();
        for (definition, field) in ctx.schema.fields_with_directive(names::DEFAULT_VALUE) {
            let location = format!("{}.{}", definition.name, field.name);
            if !ctx.is_model(&definition.name) {
                return Err(TransformError::directive(
                    names::DEFAULT_VALUE,
                    format!("@default on {} requires '{}' to be a @model", location, definition.name),
                ));
            }
            if field.ty.is_list() {
                return Err(TransformError::directive(
                    names::DEFAULT_VALUE,
                    format!("@default on {} cannot be used on a list field", location),
                ));
            }
            let directive = match field.directive(names::DEFAULT_VALUE) {
                Some(d) => d,
                None => continue,
            };
            let raw = required_str_arg(names::DEFAULT_VALUE, directive, "value", &location)?;
            let value = coerce(&ctx.schema, field.ty.base_name(), raw).map_err(|reason| {
                TransformError::directive(names::DEFAULT_VALUE, format!("@default on {}: {}", location, reason))
            })?;
            defaults.push((definition.name.clone(), field.name.clone(), value));
        }

        for (model, field, value) in defaults {
            let create = format!("create{}", model);
            let resolver = add_resolver(ctx, "Mutation", &create, &datasource_id(&model), Some(model.as_str()));
            let entry = resolver
                .properties
                .entry("defaults".to_string())
                .or_insert_with(|| json!({}));
            if let Some(existing) = entry.as_object_mut() {
                existing.insert(field, value);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::coerce;
    use crate::schema::parse_schema;

    #[test]
    fn coerces_scalars_and_enum_members() {
        let schema = parse_schema("enum Status { DRAFT PUBLISHED }").unwrap();
        assert_eq!(coerce(&schema, "Int", "42"), Ok(serde_json::json!(42)));
        assert!(coerce(&schema, "Int", "forty-two").is_err());
        assert_eq!(coerce(&schema, "Boolean", "true"), Ok(serde_json::json!(true)));
        assert_eq!(coerce(&schema, "Status", "DRAFT"), Ok(serde_json::json!("DRAFT")));
        assert!(coerce(&schema, "Status", "ARCHIVED").is_err());
    }
}
