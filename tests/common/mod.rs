//! Shared test helpers for transform tests.

#![allow(dead_code)]

use gql_transform::context::TransformContext;
use gql_transform::{
    construct_transform, InMemoryAssetProvider, InMemoryBackend, LogEntry, LogLevel, LogSink, TransformConfig,
    TransformInput, TransformPass, TransformResult, TransformSummary,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Route internal `tracing` output to the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Sink that keeps every entry and counts `drain` calls.
#[derive(Debug, Default)]
pub struct CapturingSink {
    pub entries: Vec<LogEntry>,
    pub drains: usize,
}

impl CapturingSink {
    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.message.clone()).collect()
    }

    pub fn at_level(&self, level: LogLevel) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.level == level).collect()
    }
}

impl LogSink for CapturingSink {
    fn print(&mut self, entry: &LogEntry) {
        self.entries.push(entry.clone());
    }

    fn drain(&mut self, entries: &[LogEntry]) {
        self.drains += 1;
        for entry in entries {
            self.print(entry);
        }
    }
}

/// Custom pass that logs a fixed message and optionally fails.
pub struct ScriptedPass {
    pub name: &'static str,
    pub message: &'static str,
    pub fail: bool,
    pub trace: Rc<RefCell<Vec<String>>>,
}

impl ScriptedPass {
    pub fn new(name: &'static str, message: &'static str, trace: Rc<RefCell<Vec<String>>>) -> Self {
        Self {
            name,
            message,
            fail: false,
            trace,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl TransformPass for ScriptedPass {
    fn name(&self) -> &str {
        self.name
    }

    fn apply(&mut self, ctx: &mut TransformContext<'_>) -> TransformResult<()> {
        self.trace.borrow_mut().push(self.name.to_string());
        ctx.info(self.message);
        if self.fail {
            return Err(gql_transform::TransformError::Validation(format!("{} refused", self.name)));
        }
        Ok(())
    }
}

pub const BLOG_SCHEMA: &str = r#"
type Blog @model {
  id: ID!
  name: String!
  posts: [Post] @hasMany
}

type Post @model {
  id: ID!
  title: String!
  blog: Blog @belongsTo
  tags: [Tag] @manyToMany(relationName: "PostTags")
}

type Tag @model {
  id: ID!
  label: String!
  posts: [Post] @manyToMany(relationName: "PostTags")
}
"#;

/// Run `schema` through a transform built from `config`.
pub fn run(
    config: &TransformConfig,
    schema: &str,
    sink: &mut CapturingSink,
) -> (TransformResult<TransformSummary>, InMemoryBackend, InMemoryAssetProvider) {
    init_tracing();
    let mut backend = InMemoryBackend::new();
    let mut assets = InMemoryAssetProvider::new("test-bucket");
    let result = construct_transform(config).and_then(|transform| {
        transform.transform(
            TransformInput {
                schema,
                model_datasources: Default::default(),
                datasource_secrets: Default::default(),
                backend: &mut backend,
                parameter_provider: None,
                asset_provider: &mut assets,
                synth_parameters: Default::default(),
            },
            sink,
        )
    });
    (result, backend, assets)
}
