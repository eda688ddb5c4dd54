//! # Resource Synthesis
//!
//! Walks the resource graph in id order and hands every resource to the
//! synthesis backend, resolving each nested stack once.

use crate::backend::{StackRef, SynthesisBackend};
use crate::context::{Resource, ResourceGraph, ROOT_STACK};
use crate::error::TransformResult;
use std::collections::BTreeMap;

/// Id of the API resource the orchestrator adds before synthesis.
pub const GRAPHQL_API_ID: &str = "GraphQLAPI";
pub const GRAPHQL_SCHEMA_ID: &str = "GraphQLSchema";
pub const API_ID_OUTPUT: &str = "GraphQLAPIIdOutput";
pub const API_ENDPOINT_OUTPUT: &str = "GraphQLAPIEndpointOutput";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisReport {
    pub resource_count: usize,
    /// Nested stacks that received resources, by name.
    pub nested_stacks: Vec<String>,
}

pub struct Synthesizer<'a> {
    resources: &'a ResourceGraph,
    stack_mapping: &'a BTreeMap<String, String>,
    cfn_outputs: bool,
    stacks: BTreeMap<String, StackRef>,
}

/// Stack a resource lands in: an explicit mapping wins over the pass's choice.
pub fn stack_name<'r>(stack_mapping: &'r BTreeMap<String, String>, resource: &'r Resource) -> Option<&'r str> {
    stack_mapping
        .get(&resource.id)
        .map(String::as_str)
        .or(resource.stack.as_deref())
}

impl<'a> Synthesizer<'a> {
    pub fn new(resources: &'a ResourceGraph, stack_mapping: &'a BTreeMap<String, String>) -> Self {
        Self {
            resources,
            stack_mapping,
            cfn_outputs: false,
            stacks: BTreeMap::new(),
        }
    }

    /// Externalize the API id and endpoint as named outputs.
    pub fn with_cfn_outputs(mut self, enabled: bool) -> Self {
        self.cfn_outputs = enabled;
        self
    }

    fn resolve_stack(&mut self, backend: &mut dyn SynthesisBackend, name: Option<&str>) -> TransformResult<StackRef> {
        let name = match name {
            None | Some(ROOT_STACK) => return Ok(StackRef::Root),
            Some(name) => name,
        };
        if let Some(stack) = self.stacks.get(name) {
            return Ok(stack.clone());
        }
        let stack = backend.nested_stack(name)?;
        tracing::debug!("[SYNTH] Nested stack '{}'", name);
        self.stacks.insert(name.to_string(), stack.clone());
        Ok(stack)
    }

    pub fn synthesize(mut self, backend: &mut dyn SynthesisBackend) -> TransformResult<SynthesisReport> {
        tracing::info!("[SYNTH] Synthesizing {} resources", self.resources.len());

        let resources = self.resources;
        let mapping = self.stack_mapping;
        for resource in resources.iter() {
            let stack = self.resolve_stack(backend, stack_name(mapping, resource))?;
            backend.add_resource(&stack, resource)?;
        }

        if self.cfn_outputs && resources.contains(GRAPHQL_API_ID) {
            backend.add_output(API_ID_OUTPUT, &format!("${{{}.ApiId}}", GRAPHQL_API_ID))?;
            backend.add_output(API_ENDPOINT_OUTPUT, &format!("${{{}.GraphQLUrl}}", GRAPHQL_API_ID))?;
        }

        let report = SynthesisReport {
            resource_count: resources.len(),
            nested_stacks: self.stacks.into_keys().collect(),
        };
        tracing::info!(
            "[SYNTH] Done ({} resources across {} nested stacks)",
            report.resource_count,
            report.nested_stacks.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::context::ResourceKind;

    #[test]
    fn stack_mapping_overrides_pass_choice() {
        let mut graph = ResourceGraph::default();
        graph.add(Resource::new("PostTable", ResourceKind::Table).in_stack("Post"));
        graph.add(Resource::new("Query.getPostResolver", ResourceKind::Resolver).in_stack("Post"));
        graph.add(Resource::new("GraphQLAPI", ResourceKind::GraphqlApi));
        let mut mapping = BTreeMap::new();
        mapping.insert("Query.getPostResolver".to_string(), "CustomResolvers".to_string());

        let mut backend = InMemoryBackend::new();
        let report = Synthesizer::new(&graph, &mapping)
            .with_cfn_outputs(true)
            .synthesize(&mut backend)
            .unwrap();

        assert_eq!(report.resource_count, 3);
        assert_eq!(report.nested_stacks, vec!["CustomResolvers".to_string(), "Post".to_string()]);
        assert_eq!(backend.resources_in(&StackRef::Root).len(), 1);
        assert_eq!(backend.resources_in(&StackRef::Nested("CustomResolvers".into()))[0].id, "Query.getPostResolver");
        assert!(backend.outputs.contains_key(API_ID_OUTPUT));
        assert!(backend.outputs.contains_key(API_ENDPOINT_OUTPUT));
    }
}
