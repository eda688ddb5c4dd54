mod common;

use common::ScriptedPass;
use gql_transform::chain::pass_names;
use gql_transform::{
    build_transformer_chain, construct_transformer_chain, shared_pass, validate_chain, ErrorKind, PassHandle,
    TransformError, TransformPass, TransformResult, TransformerFactoryArgs,
};
use gql_transform::context::TransformContext;
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

const CANONICAL: [&str; 14] = [
    "model",
    "function",
    "http",
    "predictions",
    "primaryKey",
    "index",
    "hasMany",
    "hasOne",
    "manyToMany",
    "belongsTo",
    "default",
    "auth",
    "mapsTo",
    "searchable",
];

#[test]
fn empty_args_build_the_canonical_chain() {
    let chain = construct_transformer_chain(&TransformerFactoryArgs::default());
    assert_eq!(pass_names(&chain).unwrap(), CANONICAL.to_vec());
    assert!(validate_chain(&chain).is_ok());
}

#[test]
fn custom_passes_are_appended_in_order() {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let args = TransformerFactoryArgs {
        custom_transformers: vec![
            shared_pass(ScriptedPass::new("first", "one", trace.clone())),
            shared_pass(ScriptedPass::new("second", "two", trace)),
        ],
        ..Default::default()
    };
    let names = pass_names(&construct_transformer_chain(&args)).unwrap();
    assert_eq!(names.len(), CANONICAL.len() + 2);
    assert_eq!(&names[..CANONICAL.len()], &CANONICAL[..]);
    assert_eq!(&names[CANONICAL.len()..], &["first".to_string(), "second".to_string()]);
}

#[test]
fn handles_point_at_the_shared_instances() {
    let (chain, handles) = build_transformer_chain(&TransformerFactoryArgs::default());
    let position = |name: &str| CANONICAL.iter().position(|n| *n == name).unwrap();

    assert!(handles.model.is_same(&chain[position("model")]));
    assert!(handles.index.is_same(&chain[position("index")]));
    assert!(handles.has_one.is_same(&chain[position("hasOne")]));
    assert!(handles.auth.is_same(&chain[position("auth")]));
    assert!(handles.many_to_many.is_same(&chain[position("manyToMany")]));

    // manyToMany was wired with the very instances that sit in the chain.
    let wired = handles
        .many_to_many
        .with(|pass| {
            (
                pass.model_handle().is_same(&chain[position("model")]),
                pass.index_handle().is_same(&chain[position("index")]),
                pass.has_one_handle().is_same(&chain[position("hasOne")]),
                pass.auth_handle().is_same(&chain[position("auth")]),
                pass.model_handle().is_same(&chain[position("index")]),
            )
        })
        .unwrap();
    assert_eq!(wired, (true, true, true, true, false));
}

#[test]
fn shared_state_is_visible_through_every_handle() {
    let auth = PassHandle::new(gql_transform::passes::AuthPass::new(Vec::new(), None));
    let other = auth.clone();
    auth.with_mut(|a| a.register_join_model("PostTags", vec!["Post".into(), "Tag".into()]))
        .unwrap();
    let joins = other.with(|a| a.join_models().len()).unwrap();
    assert_eq!(joins, 1);
}

#[test]
fn busy_handle_is_reported() {
    let model = PassHandle::new(gql_transform::passes::ModelPass::new());
    let chain_entry = model.shared();
    let _held = chain_entry.borrow_mut();
    let err = model.with(|m| m.models().len()).unwrap_err();
    assert!(matches!(err, TransformError::PassBusy(ref name) if name == "model"));
}

struct NeedsSearch;

impl TransformPass for NeedsSearch {
    fn name(&self) -> &str {
        "needsSearch"
    }

    fn depends_on(&self) -> &[&'static str] {
        &["searchable", "geo"]
    }

    fn apply(&mut self, _ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        Ok(())
    }
}

#[test]
fn unsatisfied_dependency_is_a_construction_error() {
    let args = TransformerFactoryArgs {
        custom_transformers: vec![shared_pass(NeedsSearch)],
        ..Default::default()
    };
    let err = validate_chain(&construct_transformer_chain(&args)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Construction);
    assert_eq!(
        err.to_string(),
        "pass 'needsSearch' depends on 'geo', which does not run before it"
    );
}

#[test]
fn duplicate_names_are_rejected() {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let args = TransformerFactoryArgs {
        custom_transformers: vec![shared_pass(ScriptedPass::new("auth", "again", trace))],
        ..Default::default()
    };
    let err = validate_chain(&construct_transformer_chain(&args)).unwrap_err();
    assert!(matches!(err, TransformError::DuplicatePass(ref name) if name == "auth"));
}
