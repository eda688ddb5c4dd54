//! `@mapsTo`: keep a renamed model bound to its original table.

use super::{names, required_str_arg, TransformPass};
use crate::context::{datasource_id, table_id, TransformContext};
use crate::directives::set_resource_name;
use crate::error::{TransformError, TransformResult};

#[derive(Debug, Default)]
pub struct MapsToPass;

impl MapsToPass {
    pub fn new() -> Self {
        Self
    }
}

impl TransformPass for MapsToPass {
    fn name(&self) -> &str {
        names::MAPS_TO
    }

    fn depends_on(&self) -> &[&'static str] {
        &[names::MODEL]
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        let mut mappings = Vec::new();
        for definition in ctx.schema.types_with_directive(names::MAPS_TO) {
            let directive = match definition.directive(names::MAPS_TO) {
                Some(d) => d,
                None => continue,
            };
            let original = required_str_arg(names::MAPS_TO, directive, "name", &definition.name)?;
            if !ctx.is_model(&definition.name) {
                return Err(TransformError::directive(
                    names::MAPS_TO,
                    format!("@mapsTo on '{}' requires the type to be a @model", definition.name),
                ));
            }
            if original == definition.name {
                return Err(TransformError::directive(
                    names::MAPS_TO,
                    format!("@mapsTo on '{}' maps the type to itself", definition.name),
                ));
            }
            mappings.push((definition.name.clone(), original.to_string()));
        }

        for (model, original) in mappings {
            if let Some(table) = ctx.resources.get_mut(&table_id(&model)) {
                table.set_property("tableName", original.clone().into());
                set_resource_name(table, &original);
            }
            if let Some(datasource) = ctx.resources.get_mut(&datasource_id(&model)) {
                set_resource_name(datasource, &original);
            }
            ctx.debug(format!("Model {} mapped to existing table {}", model, original));
        }
        Ok(())
    }
}
