//! `@predictions`: AI/ML actions backed by a storage bucket.

use super::{add_resolver, names, TransformPass};
use crate::context::{Resource, ResourceKind, TransformContext};
use crate::error::{TransformError, TransformResult};

const ACTIONS: [&str; 4] = [
    "identifyText",
    "identifyLabels",
    "convertTextToSpeech",
    "translateText",
];
const STACK: &str = "PredictionsDirectiveStack";

pub struct PredictionsPass {
    storage_config: Option<serde_json::Value>,
}

impl PredictionsPass {
    pub fn new(storage_config: Option<serde_json::Value>) -> Self {
        Self { storage_config }
    }

    fn bucket_name(&self) -> Option<&str> {
        self.storage_config
            .as_ref()
            .and_then(|c| c.get("bucketName"))
            .and_then(|v| v.as_str())
    }
}

impl TransformPass for PredictionsPass {
    fn name(&self) -> &str {
        names::PREDICTIONS
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        let mut usages = Vec::new();
        for (definition, field) in ctx.schema.fields_with_directive(names::PREDICTIONS) {
            let location = format!("{}.{}", definition.name, field.name);
            if definition.name != "Query" {
                return Err(TransformError::directive(
                    names::PREDICTIONS,
                    format!("@predictions on {} is only supported on Query fields", location),
                ));
            }
            let actions: Vec<String> = field
                .directive(names::PREDICTIONS)
                .and_then(|d| d.argument("actions"))
                .and_then(|v| v.as_list())
                .map(|items| items.iter().filter_map(|v| v.as_str()).map(str::to_string).collect())
                .unwrap_or_default();
            if actions.is_empty() {
                return Err(TransformError::directive(
                    names::PREDICTIONS,
                    format!("@predictions on {} requires at least one action", location),
                ));
            }
            if let Some(unknown) = actions.iter().find(|a| !ACTIONS.contains(&a.as_str())) {
                return Err(TransformError::directive(
                    names::PREDICTIONS,
                    format!("@predictions on {} uses unknown action '{}'", location, unknown),
                ));
            }
            usages.push((field.name.clone(), actions));
        }

        if usages.is_empty() {
            return Ok(());
        }
        let bucket = self.bucket_name().ok_or_else(|| {
            TransformError::directive(
                names::PREDICTIONS,
                "@predictions requires a storage bucket (storageConfig.bucketName)",
            )
        })?;

        ctx.resources.add(
            Resource::new("PredictionsStorageAccess", ResourceKind::Policy)
                .in_stack(STACK)
                .with_property("bucket", bucket.into()),
        );
        ctx.resources.add(
            Resource::new("PredictionsDataSource", ResourceKind::DataSource)
                .in_stack(STACK)
                .with_property("type", "NONE".into()),
        );
        for (field_name, actions) in usages {
            let resolver = add_resolver(ctx, "Query", &field_name, "PredictionsDataSource", Some(STACK));
            resolver.set_property("actions", serde_json::to_value(&actions)?);
        }
        Ok(())
    }
}
