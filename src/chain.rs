//! # Pass Chain
//!
//! Builds the canonical, totally ordered pass list and checks that a chain is
//! runnable.

use crate::config::TransformerFactoryArgs;
use crate::error::{TransformError, TransformResult};
use crate::passes::{
    shared_pass, AuthPass, BelongsToPass, DefaultValuePass, FunctionPass, HasManyPass, HasOnePass, HttpPass,
    IndexPass, ManyToManyPass, MapsToPass, ModelPass, PassHandle, PredictionsPass, PrimaryKeyPass,
    SearchablePass, SharedPass,
};
use std::collections::HashSet;

/// Live handles to the chain entries other passes are wired to.
#[derive(Clone)]
pub struct ChainHandles {
    pub model: PassHandle<ModelPass>,
    pub index: PassHandle<IndexPass>,
    pub has_one: PassHandle<HasOnePass>,
    pub auth: PassHandle<AuthPass>,
    pub many_to_many: PassHandle<ManyToManyPass>,
}

/// Instantiate every built-in pass in canonical order, then append the
/// caller's custom passes.
///
/// The model, index, hasOne and auth instances are shared with the
/// manyToMany pass; it observes and extends their live state.
pub fn construct_transformer_chain(args: &TransformerFactoryArgs) -> Vec<SharedPass> {
    build_transformer_chain(args).0
}

/// Same as [`construct_transformer_chain`], also returning the handles
/// threaded between passes.
pub fn build_transformer_chain(args: &TransformerFactoryArgs) -> (Vec<SharedPass>, ChainHandles) {
    let model = PassHandle::new(ModelPass::new());
    let index = PassHandle::new(IndexPass::new());
    let has_one = PassHandle::new(HasOnePass::new());
    let auth = PassHandle::new(AuthPass::new(
        args.admin_roles.clone(),
        args.identity_pool_id.clone(),
    ));
    let many_to_many = PassHandle::new(ManyToManyPass::new(
        model.clone(),
        index.clone(),
        has_one.clone(),
        auth.clone(),
    ));

    let mut chain: Vec<SharedPass> = vec![
        model.shared(),
        shared_pass(FunctionPass::new(args.function_name_map.clone())),
        shared_pass(HttpPass::new()),
        shared_pass(PredictionsPass::new(args.storage_config.clone())),
        shared_pass(PrimaryKeyPass::new()),
        index.shared(),
        shared_pass(HasManyPass::new()),
        has_one.shared(),
        many_to_many.shared(),
        shared_pass(BelongsToPass::new()),
        shared_pass(DefaultValuePass::new()),
        auth.shared(),
        shared_pass(MapsToPass::new()),
        shared_pass(SearchablePass::new()),
    ];
    chain.extend(args.custom_transformers.iter().cloned());

    tracing::debug!(
        "[CHAIN] Built {} passes ({} custom)",
        chain.len(),
        args.custom_transformers.len()
    );
    let handles = ChainHandles {
        model,
        index,
        has_one,
        auth,
        many_to_many,
    };
    (chain, handles)
}

/// Names of the passes in `chain`, in order.
pub fn pass_names(chain: &[SharedPass]) -> TransformResult<Vec<String>> {
    chain
        .iter()
        .map(|pass| {
            pass.try_borrow()
                .map(|p| p.name().to_string())
                .map_err(|_| TransformError::PassBusy("<chain entry>".to_string()))
        })
        .collect()
}

/// Every pass name is unique and every declared dependency appears earlier.
pub fn validate_chain(chain: &[SharedPass]) -> TransformResult<()> {
    let mut seen: HashSet<String> = HashSet::new();
    for pass in chain {
        let pass = pass
            .try_borrow()
            .map_err(|_| TransformError::PassBusy("<chain entry>".to_string()))?;
        let name = pass.name().to_string();
        if let Some(missing) = pass.depends_on().iter().find(|d| !seen.contains(**d)) {
            return Err(TransformError::UnsatisfiedDependency {
                pass: name,
                dependency: missing.to_string(),
            });
        }
        if !seen.insert(name.clone()) {
            return Err(TransformError::DuplicatePass(name));
        }
    }
    Ok(())
}
