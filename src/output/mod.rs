//! # Backend Outputs
//!
//! The versioned API output contract and how outputs are recorded on a
//! synthesis backend.

mod graphql;
mod schema;
mod storage;

pub use graphql::{store_graphql_output, GraphqlApiOutputs, GRAPHQL_OUTPUT_KEY};
pub use schema::{validate_graphql_output, AuthenticationType, GraphqlOutputPayloadV1, VersionedGraphqlOutput};
pub use storage::{
    BackendOutputEntry, BackendOutputEntryStackMetadata, BackendOutputStackMetadata,
    BackendOutputStorageStrategy, StackMetadataBackendOutputStorageStrategy, AMPLIFY_STACK_METADATA_KEY,
};
