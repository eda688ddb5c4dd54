mod common;

use common::{run, CapturingSink, ScriptedPass, BLOG_SCHEMA};
use gql_transform::config::{AuthMode, DatasourceType, DbType, SqlConnectionSecrets};
use gql_transform::synth::{API_ENDPOINT_OUTPUT, API_ID_OUTPUT};
use gql_transform::{
    execute_transform, shared_pass, AuthenticationType, ErrorKind, ExecuteTransformConfig, InMemoryAssetProvider,
    InMemoryBackend, LogEntry, LogLevel, parse_schema, ResourceKind, StackRef, StaticParameterProvider, TransformConfig,
    TransformError,
};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

fn config_with_custom(passes: Vec<ScriptedPass>) -> TransformConfig {
    let mut config = TransformConfig::default();
    config.transformers_factory_args.custom_transformers = passes.into_iter().map(shared_pass).collect();
    config
}

#[test]
fn successful_run_drains_once_in_order() {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let config = config_with_custom(vec![
        ScriptedPass::new("audit", "audit ran", trace.clone()),
        ScriptedPass::new("lint", "lint ran", trace.clone()),
    ]);
    let mut sink = CapturingSink::default();
    let (result, backend, assets) = run(&config, "type Note @model { body: String }", &mut sink);

    let summary = result.unwrap();
    assert_eq!(sink.drains, 1);
    assert_eq!(*trace.borrow(), vec!["audit".to_string(), "lint".to_string()]);
    let messages = sink.messages();
    let audit = messages.iter().position(|m| m == "audit ran").unwrap();
    let lint = messages.iter().position(|m| m == "lint ran").unwrap();
    assert!(audit < lint);
    assert_eq!(summary.passes.last().map(String::as_str), Some("lint"));
    assert_eq!(summary.model_schema_uri, "s3://test-bucket/schema.graphql");
    assert!(assets.contents("schema.graphql").unwrap().contains("type Note @model"));
    assert!(!backend.resources_in(&StackRef::Nested("Note".into())).is_empty());
}

#[test]
fn failing_pass_aborts_flushes_and_reraises() {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let config = config_with_custom(vec![
        ScriptedPass::new("first", "first ran", trace.clone()),
        ScriptedPass::new("second", "second ran", trace.clone()).failing(),
        ScriptedPass::new("third", "third ran", trace.clone()),
    ]);
    let mut sink = CapturingSink::default();
    let (result, backend, _) = run(&config, "type Note @model { body: String }", &mut sink);

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "output validation failed: second refused");
    assert_eq!(sink.drains, 1);
    assert_eq!(*trace.borrow(), vec!["first".to_string(), "second".to_string()]);

    let messages = sink.messages();
    assert!(messages.contains(&"first ran".to_string()));
    assert!(messages.contains(&"second ran".to_string()));
    assert!(!messages.contains(&"third ran".to_string()));
    let last = sink.entries.last().unwrap();
    assert_eq!(last.level, LogLevel::Error);
    assert_eq!(last.message, err.to_string());

    // Nothing is synthesized after an aborted run.
    assert!(backend.stacks.is_empty());
}

#[test]
fn parse_failure_is_flushed_and_returned() {
    let mut sink = CapturingSink::default();
    let (result, _, _) = run(&TransformConfig::default(), "type Broken @model {", &mut sink);
    let err = result.unwrap_err();
    assert!(matches!(err, TransformError::SchemaParse(_)));
    assert_eq!(sink.drains, 1);
    assert_eq!(sink.at_level(LogLevel::Error).len(), 1);
}

#[test]
fn primary_key_sees_models_from_the_model_pass() {
    let schema = r#"
        type Order @model {
          orderId: ID! @primaryKey(sortKeyFields: ["placedAt"])
          placedAt: AWSDateTime!
        }
    "#;
    let mut sink = CapturingSink::default();
    let summary = run(&TransformConfig::default(), schema, &mut sink).0.unwrap();
    let table = summary.resources.get("OrderTable").unwrap();
    assert_eq!(table.properties["hashKey"], "orderId");
    assert_eq!(table.properties["sortKeys"], serde_json::json!(["placedAt"]));
    // The model pass leaves out `id` when a primary key is declared.
    let printed = parse_schema(&summary.schema).unwrap();
    assert!(printed.get_type("Order").unwrap().field("id").is_none());
}

#[test]
fn many_to_many_extends_model_index_and_auth_state() {
    let mut config = TransformConfig::default();
    config.auth_config = Some(gql_transform::config::AppSyncAuthConfiguration {
        default_authentication: AuthMode::new(AuthenticationType::AmazonCognitoUserPools),
        additional_authentication_providers: vec![AuthMode::new(AuthenticationType::ApiKey)],
    });
    let schema = BLOG_SCHEMA
        .replace("type Post @model {", "type Post @model @auth(rules: [{allow: owner}]) {")
        .replace("type Tag @model {", "type Tag @model @auth(rules: [{allow: public}]) {");
    let mut sink = CapturingSink::default();
    let summary = run(&config, &schema, &mut sink).0.unwrap();

    // Join model materialized by the shared model pass.
    assert!(summary.resources.get("PostTagsTable").is_some());
    assert!(summary.schema.contains("type PostTags @model"));

    // Indexes registered through the shared index pass.
    let indexes = &summary.resources.get("PostTagsTable").unwrap().properties["globalSecondaryIndexes"];
    let names: Vec<&str> = indexes
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["indexName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["byPost", "byTag"]);

    // Join resolvers carry the union of Post and Tag rules from the shared auth pass.
    let resolver = summary.resources.get("Query.getPostTagsResolver").unwrap();
    let rules = resolver.properties["authRules"].as_array().unwrap();
    assert_eq!(rules.len(), 2);

    // Blog has no rules and gets a warning.
    let warnings = sink.at_level(LogLevel::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("'Blog'"));
}

#[test]
fn required_has_one_cycle_is_rejected() {
    let schema = r#"
        type Husk @model { seed: Seed! @hasOne }
        type Seed @model { husk: Husk! @hasOne }
    "#;
    let mut sink = CapturingSink::default();
    let err = run(&TransformConfig::default(), schema, &mut sink).0.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Pass);
    match err {
        TransformError::CyclicRelation { pass, cycle } => {
            assert_eq!(pass, "hasOne");
            assert_eq!(cycle, vec!["Husk", "Seed", "Husk"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sink.drains, 1);
}

#[test]
fn sql_model_without_secrets_is_unresolved() {
    let mut backend = InMemoryBackend::new();
    let mut assets = InMemoryAssetProvider::new("bucket");
    let mut entries: Vec<LogEntry> = Vec::new();
    let mut printer = |entry: &LogEntry| entries.push(entry.clone());
    let mut datasources = HashMap::new();
    datasources.insert(
        "Invoice".to_string(),
        DatasourceType {
            db_type: DbType::Postgres,
            provision_db: false,
        },
    );

    let err = execute_transform(ExecuteTransformConfig {
        config: TransformConfig::default(),
        schema: "type Invoice @model { total: Float }",
        model_datasources: datasources,
        datasource_secrets: HashMap::new(),
        print_transformer_log: Some(&mut printer),
        backend: &mut backend,
        parameter_provider: None,
        asset_provider: &mut assets,
        synth_parameters: Default::default(),
    })
    .unwrap_err();

    assert!(matches!(
        err,
        TransformError::UnresolvedDatasource { ref model, .. } if model == "Invoice"
    ));
    assert_eq!(entries.last().map(|e| e.level), Some(LogLevel::Error));
}

#[test]
fn sql_model_with_secrets_gets_a_relational_datasource() {
    let mut backend = InMemoryBackend::new();
    let mut assets = InMemoryAssetProvider::new("bucket");
    let mut datasources = HashMap::new();
    datasources.insert(
        "Invoice".to_string(),
        DatasourceType {
            db_type: DbType::Mysql,
            provision_db: false,
        },
    );
    let mut secrets = HashMap::new();
    secrets.insert(
        "Invoice".to_string(),
        SqlConnectionSecrets {
            username: "/app/username".into(),
            password: "/app/password".into(),
            host: "/app/host".into(),
            database: "/app/database".into(),
            port: "/app/port".into(),
        },
    );

    let summary = execute_transform(ExecuteTransformConfig {
        config: TransformConfig::default(),
        schema: "type Invoice @model { total: Float }",
        model_datasources: datasources,
        datasource_secrets: secrets,
        print_transformer_log: None,
        backend: &mut backend,
        parameter_provider: None,
        asset_provider: &mut assets,
        synth_parameters: Default::default(),
    })
    .unwrap();

    let datasource = summary.resources.get("InvoiceDataSource").unwrap();
    assert_eq!(datasource.properties["type"], "RELATIONAL_DATABASE");
    assert_eq!(datasource.properties["engine"], "MYSQL");
    assert!(summary.resources.get("InvoiceTable").is_none());
}

#[test]
fn function_env_comes_from_the_parameter_provider() {
    let schema = r#"
        type Query {
          echo(msg: String): String @function(name: "echo-${env}")
        }
    "#;
    let provider = StaticParameterProvider::new().with("env", "staging");
    let mut backend = InMemoryBackend::new();
    let mut assets = InMemoryAssetProvider::new("bucket");
    let summary = execute_transform(ExecuteTransformConfig {
        config: TransformConfig::default(),
        schema,
        model_datasources: HashMap::new(),
        datasource_secrets: HashMap::new(),
        print_transformer_log: None,
        backend: &mut backend,
        parameter_provider: Some(&provider),
        asset_provider: &mut assets,
        synth_parameters: Default::default(),
    })
    .unwrap();

    let resolver = summary.resources.get("Query.echoResolver").unwrap();
    assert_eq!(resolver.properties["pipelineFunctions"], serde_json::json!(["echo-staging"]));
    assert_eq!(resolver.properties["dataSource"], "EchostagingLambdaDataSource");
}

#[test]
fn cfn_outputs_and_stack_mapping_reach_the_backend() {
    let mut config = TransformConfig::default();
    config.transform_parameters.enable_transformer_cfn_outputs = true;
    config
        .stack_mapping
        .insert("Query.getNoteResolver".to_string(), "CustomResolvers".to_string());
    let mut sink = CapturingSink::default();
    let (result, backend, _) = run(&config, "type Note @model { body: String }", &mut sink);
    let summary = result.unwrap();

    assert!(backend.outputs.contains_key(API_ID_OUTPUT));
    assert!(backend.outputs.contains_key(API_ENDPOINT_OUTPUT));
    assert!(summary.nested_stacks.contains(&"CustomResolvers".to_string()));
    let custom = backend.resources_in(&StackRef::Nested("CustomResolvers".into()));
    assert_eq!(custom.len(), 1);
    assert_eq!(custom[0].kind, ResourceKind::Resolver);
    let root: Vec<&str> = backend
        .resources_in(&StackRef::Root)
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(root, vec!["GraphQLAPI", "GraphQLAPIDefaultApiKey", "GraphQLSchema"]);
}
