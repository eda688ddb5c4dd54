use gql_transform::backend::SynthesisBackend;
use gql_transform::output::{
    BackendOutputEntryStackMetadata, GraphqlOutputPayloadV1, AMPLIFY_STACK_METADATA_KEY, GRAPHQL_OUTPUT_KEY,
};
use gql_transform::{
    store_graphql_output, validate_graphql_output, AuthenticationType, BackendOutputEntry,
    BackendOutputStorageStrategy, ErrorKind, GraphqlApiOutputs, InMemoryBackend,
    StackMetadataBackendOutputStorageStrategy, VersionedGraphqlOutput,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn api_key_payload() -> serde_json::Value {
    json!({
        "version": "1",
        "payload": {
            "awsAppsyncRegion": "us-west-2",
            "awsAppsyncApiEndpoint": "https://abc.appsync-api.us-west-2.amazonaws.com/graphql",
            "awsAppsyncAuthenticationType": "API_KEY",
            "awsAppsyncApiKey": "da2-secret",
            "awsAppsyncApiId": "abc123",
            "amplifyApiModelSchemaS3Uri": "s3://bucket/schema.graphql"
        }
    })
}

#[test]
fn version_one_with_api_key_validates() {
    let output = validate_graphql_output(&api_key_payload()).unwrap();
    let VersionedGraphqlOutput::V1 { payload } = output;
    assert_eq!(payload.aws_appsync_authentication_type, AuthenticationType::ApiKey);
    assert_eq!(payload.aws_appsync_api_key.as_deref(), Some("da2-secret"));
}

#[test]
fn missing_version_fails() {
    let mut doc = api_key_payload();
    doc.as_object_mut().unwrap().remove("version");
    let err = validate_graphql_output(&doc).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn unknown_authentication_type_fails() {
    let mut doc = api_key_payload();
    doc["payload"]["awsAppsyncAuthenticationType"] = json!("FOO");
    assert!(validate_graphql_output(&doc).is_err());
}

#[test]
fn missing_required_field_fails() {
    let mut doc = api_key_payload();
    doc["payload"].as_object_mut().unwrap().remove("awsAppsyncApiId");
    assert!(validate_graphql_output(&doc).is_err());
}

#[test]
fn api_key_is_optional() {
    let mut doc = api_key_payload();
    doc["payload"].as_object_mut().unwrap().remove("awsAppsyncApiKey");
    doc["payload"]["awsAppsyncAuthenticationType"] = json!("AWS_IAM");
    let VersionedGraphqlOutput::V1 { payload } = validate_graphql_output(&doc).unwrap();
    assert_eq!(payload.aws_appsync_api_key, None);
}

#[test]
fn serialized_payload_omits_absent_api_key() {
    let output = VersionedGraphqlOutput::V1 {
        payload: GraphqlOutputPayloadV1 {
            aws_appsync_region: "eu-central-1".into(),
            aws_appsync_api_endpoint: "https://example/graphql".into(),
            aws_appsync_authentication_type: AuthenticationType::AmazonCognitoUserPools,
            aws_appsync_api_key: None,
            aws_appsync_api_id: "id".into(),
            amplify_api_model_schema_s3_uri: "s3://b/s".into(),
        },
    };
    let value = serde_json::to_value(&output).unwrap();
    assert_eq!(value["version"], "1");
    assert!(value["payload"].get("awsAppsyncApiKey").is_none());
}

#[test]
fn entries_are_indexed_on_flush() {
    let mut backend = InMemoryBackend::new();
    {
        let mut strategy = StackMetadataBackendOutputStorageStrategy::new(&mut backend);
        strategy
            .add_backend_output_entry("authOutput", BackendOutputEntry::new("1").with("a", "x"))
            .unwrap();
        strategy
            .add_backend_output_entry(
                "apiOutput",
                BackendOutputEntry::new("1").with("b", "y").with("c", "z"),
            )
            .unwrap();
        strategy.flush().unwrap();
    }

    assert_eq!(
        backend.metadata[AMPLIFY_STACK_METADATA_KEY],
        json!({
            "authOutput": { "version": "1", "stackOutputs": ["a"] },
            "apiOutput": { "version": "1", "stackOutputs": ["b", "c"] }
        })
    );
    assert_eq!(backend.outputs.get("a").map(String::as_str), Some("x"));
    assert_eq!(backend.outputs.get("c").map(String::as_str), Some("z"));
}

#[test]
fn re_registering_a_name_overwrites() {
    let mut backend = InMemoryBackend::new();
    let mut strategy = StackMetadataBackendOutputStorageStrategy::new(&mut backend);
    strategy
        .add_backend_output_entry("authOutput", BackendOutputEntry::new("1").with("a", "x"))
        .unwrap();
    strategy
        .add_backend_output_entry("authOutput", BackendOutputEntry::new("2").with("d", "w"))
        .unwrap();
    assert_eq!(
        strategy.metadata()["authOutput"],
        BackendOutputEntryStackMetadata {
            version: "2".into(),
            stack_outputs: vec!["d".into()],
        }
    );
    assert_eq!(strategy.metadata().len(), 1);
}

#[test]
fn second_flush_overwrites_with_current_state() {
    let mut backend = InMemoryBackend::new();
    let first = {
        let mut strategy = StackMetadataBackendOutputStorageStrategy::new(&mut backend);
        strategy
            .add_backend_output_entry("authOutput", BackendOutputEntry::new("1").with("a", "x"))
            .unwrap();
        strategy.flush().unwrap();
        strategy.flush().unwrap();
        strategy.metadata().clone()
    };
    assert_eq!(backend.metadata_writes, 2);
    assert_eq!(backend.metadata.len(), 1);
    assert_eq!(
        backend.metadata[AMPLIFY_STACK_METADATA_KEY],
        json!({ "authOutput": { "version": "1", "stackOutputs": ["a"] } })
    );
    assert_eq!(backend.metadata[AMPLIFY_STACK_METADATA_KEY], serde_json::to_value(&first).unwrap());
}

#[test]
fn back_to_back_flushes_persist_identical_metadata() {
    let mut backend = InMemoryBackend::new();
    let mut strategy = StackMetadataBackendOutputStorageStrategy::new(&mut backend);
    strategy
        .add_backend_output_entry("apiOutput", BackendOutputEntry::new("1").with("b", "y").with("c", "z"))
        .unwrap();
    strategy.flush().unwrap();
    drop(strategy);
    let after_first = backend.metadata[AMPLIFY_STACK_METADATA_KEY].clone();

    let mut strategy = StackMetadataBackendOutputStorageStrategy::new(&mut backend);
    strategy
        .add_backend_output_entry("apiOutput", BackendOutputEntry::new("1").with("b", "y").with("c", "z"))
        .unwrap();
    strategy.flush().unwrap();
    strategy.flush().unwrap();
    drop(strategy);

    assert_eq!(backend.metadata_writes, 3);
    assert_eq!(backend.metadata[AMPLIFY_STACK_METADATA_KEY], after_first);
}

#[test]
fn stack_outputs_keep_registration_order() {
    let mut backend = InMemoryBackend::new();
    {
        let mut strategy = StackMetadataBackendOutputStorageStrategy::new(&mut backend);
        strategy
            .add_backend_output_entry(
                "siteOutput",
                BackendOutputEntry::new("1")
                    .with("region", "r")
                    .with("endpoint", "e")
                    .with("bucket", "b")
                    .with("endpoint", "e2"),
            )
            .unwrap();
        strategy.flush().unwrap();
    }
    assert_eq!(
        backend.metadata[AMPLIFY_STACK_METADATA_KEY]["siteOutput"]["stackOutputs"],
        json!(["region", "endpoint", "bucket"])
    );
    assert_eq!(backend.outputs.get("endpoint").map(String::as_str), Some("e2"));
}

#[test]
fn field_owned_by_another_entry_is_rejected() {
    let mut backend = InMemoryBackend::new();
    {
        let mut strategy = StackMetadataBackendOutputStorageStrategy::new(&mut backend);
        strategy
            .add_backend_output_entry("authOutput", BackendOutputEntry::new("1").with("region", "us-east-1"))
            .unwrap();
        let err = strategy
            .add_backend_output_entry(
                "apiOutput",
                BackendOutputEntry::new("1").with("endpoint", "e").with("region", "eu-west-1"),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert!(err.to_string().contains("authOutput"));
        assert!(!strategy.metadata().contains_key("apiOutput"));

        // The owning entry may still re-register the field.
        strategy
            .add_backend_output_entry("authOutput", BackendOutputEntry::new("1").with("region", "us-west-2"))
            .unwrap();
    }
    assert_eq!(backend.outputs.get("region").map(String::as_str), Some("us-west-2"));
    assert!(backend.outputs.get("endpoint").is_none());
}

#[test]
fn graphql_output_is_stored_under_its_key() {
    let mut backend = InMemoryBackend::new();
    {
        let mut strategy = StackMetadataBackendOutputStorageStrategy::new(&mut backend);
        store_graphql_output(
            &mut strategy,
            &GraphqlApiOutputs {
                region: "us-east-1".into(),
                endpoint: "https://api/graphql".into(),
                authentication_type: AuthenticationType::AwsIam,
                api_key: None,
                api_id: "api-1".into(),
                model_schema_s3_uri: "s3://bucket/schema.graphql".into(),
            },
        )
        .unwrap();
        strategy.flush().unwrap();
    }

    let record = &backend.metadata[AMPLIFY_STACK_METADATA_KEY][GRAPHQL_OUTPUT_KEY];
    assert_eq!(record["version"], "1");
    assert_eq!(
        record["stackOutputs"],
        json!([
            "awsAppsyncRegion",
            "awsAppsyncApiEndpoint",
            "awsAppsyncAuthenticationType",
            "awsAppsyncApiId",
            "amplifyApiModelSchemaS3Uri"
        ])
    );
    assert_eq!(
        backend.outputs.get("awsAppsyncAuthenticationType").map(String::as_str),
        Some("AWS_IAM")
    );
}

#[test]
fn backend_rejects_unnamed_outputs() {
    let mut backend = InMemoryBackend::new();
    let err = backend.add_output("", "value").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
}
