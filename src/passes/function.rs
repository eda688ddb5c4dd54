//! `@function`: binds fields to deployed functions.

use super::{add_resolver, names, required_str_arg, TransformPass};
use crate::config::FunctionHandle;
use crate::context::{Resource, ResourceKind, TransformContext};
use crate::error::TransformResult;
use std::collections::HashMap;

const ENV_PLACEHOLDER: &str = "${env}";

pub struct FunctionPass {
    function_name_map: HashMap<String, FunctionHandle>,
}

impl FunctionPass {
    pub fn new(function_name_map: HashMap<String, FunctionHandle>) -> Self {
        Self { function_name_map }
    }

    fn function_arn(&self, ctx: &TransformContext<'_>, function_name: &str) -> String {
        if let Some(handle) = self.function_name_map.get(function_name) {
            return handle.function_arn.clone();
        }
        let region = ctx
            .synth_parameters
            .region
            .clone()
            .unwrap_or_else(|| "${AWS::Region}".to_string());
        let account = ctx
            .synth_parameters
            .account_id
            .clone()
            .unwrap_or_else(|| "${AWS::AccountId}".to_string());
        format!("arn:aws:lambda:{}:{}:function:{}", region, account, function_name)
    }
}

impl TransformPass for FunctionPass {
    fn name(&self) -> &str {
        names::FUNCTION
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        let mut bindings = Vec::new();
        for (definition, field) in ctx.schema.fields_with_directive(names::FUNCTION) {
            let location = format!("{}.{}", definition.name, field.name);
            for directive in field.directives.iter().filter(|d| d.name == names::FUNCTION) {
                let function_name = required_str_arg(names::FUNCTION, directive, "name", &location)?;
                bindings.push((definition.name.clone(), field.name.clone(), function_name.to_string()));
            }
        }

        for (type_name, field_name, raw_name) in bindings {
            let function_name = if raw_name.contains(ENV_PLACEHOLDER) {
                let env = ctx.resolve_parameter("env").unwrap_or_else(|| "NONE".to_string());
                if env == "NONE" {
                    ctx.warn(format!(
                        "@function on {}.{} references {} but no environment is set",
                        type_name, field_name, ENV_PLACEHOLDER
                    ));
                }
                raw_name.replace(ENV_PLACEHOLDER, &env)
            } else {
                raw_name
            };

            let datasource = format!("{}LambdaDataSource", super::capitalize(&function_name.replace('-', "")));
            let arn = self.function_arn(ctx, &function_name);
            ctx.resources.add(
                Resource::new(datasource.clone(), ResourceKind::DataSource)
                    .in_stack("FunctionDirectiveStack")
                    .with_property("type", "AWS_LAMBDA".into())
                    .with_property("functionArn", arn.into()),
            );

            let resolver = add_resolver(ctx, &type_name, &field_name, &datasource, Some("FunctionDirectiveStack"));
            resolver.push_property("pipelineFunctions", function_name.clone().into());
            ctx.debug(format!("Bound {}.{} to function {}", type_name, field_name, function_name));
        }
        Ok(())
    }
}
