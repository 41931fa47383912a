//! Typed error handling for the executor
//!
//! Two families of errors live here:
//!
//! - [`GraphQLError`]: a response-format error that ends up in the `errors`
//!   list of an [`ExecutionResult`](crate::core::response::ExecutionResult).
//!   Field-level failures never abort sibling fields; they are recorded in the
//!   shared [`ErrorSink`] and the field becomes `null`.
//! - [`ExecutorError`] / [`SchemaError`]: errors that reject a whole execution
//!   or a whole schema before anything runs.
//!
//! # Example
//!
//! ```rust,ignore
//! match QueryExecutor::create(schema).query("{ hello }").execute() {
//!     Ok(result) => println!("{}", result.to_json()),
//!     Err(ExecutorError::Validation(errors)) => {
//!         for error in errors {
//!             eprintln!("{}", error.message);
//!         }
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use parking_lot::Mutex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

// =============================================================================
// Response errors
// =============================================================================

/// Classification of a response error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Query does not match the schema (detected before execution)
    Validation,

    /// A field resolver failed
    Resolution,

    /// A resolved value did not match the declared output type
    Coercion,

    /// A nested selection exceeded the configured maximum depth
    DepthLimit,

    /// The field was skipped because execution was cancelled
    Cancelled,
}

impl ErrorKind {
    /// Classification string exposed under `extensions.classification`
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Resolution => "ResolutionError",
            ErrorKind::Coercion => "CoercionError",
            ErrorKind::DepthLimit => "DepthLimitError",
            ErrorKind::Cancelled => "CancelledError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One segment of a response path: a field response key or a list index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        PathSegment::Field(value.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        PathSegment::Index(value)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => f.write_str(name),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Source location in the query document (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl From<graphql_parser::Pos> for Location {
    fn from(pos: graphql_parser::Pos) -> Self {
        Self {
            line: pos.line,
            column: pos.column,
        }
    }
}

/// An error as reported in the `errors` list of a result bundle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphQLError {
    /// Human-readable message
    pub message: String,

    /// Path from the root of `data` to the failing field; empty for
    /// validation errors
    pub path: Vec<PathSegment>,

    /// Locations in the query document related to the error
    pub locations: Vec<Location>,

    /// Error classification
    pub kind: ErrorKind,
}

impl GraphQLError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            locations: Vec::new(),
            kind,
        }
    }

    /// Validation error, optionally pointing at a position in the query
    pub fn validation(message: impl Into<String>, pos: Option<graphql_parser::Pos>) -> Self {
        let mut error = Self::new(ErrorKind::Validation, message);
        error.locations.extend(pos.map(Location::from));
        error
    }

    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = path;
        self
    }

    pub fn at(mut self, pos: graphql_parser::Pos) -> Self {
        self.locations.push(pos.into());
        self
    }
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            let path: Vec<String> = self.path.iter().map(|s| s.to_string()).collect();
            write!(f, "{} (at {})", self.message, path.join("."))
        }
    }
}

impl std::error::Error for GraphQLError {}

impl Serialize for GraphQLError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("message", &self.message)?;
        if !self.locations.is_empty() {
            map.serialize_entry("locations", &self.locations)?;
        }
        map.serialize_entry("path", &self.path)?;
        map.serialize_entry(
            "extensions",
            &serde_json::json!({ "classification": self.kind.as_str() }),
        )?;
        map.end()
    }
}

/// Append-only error list shared by every context of one execution
#[derive(Debug, Default)]
pub struct ErrorSink {
    errors: Mutex<Vec<GraphQLError>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, error: GraphQLError) {
        self.errors.lock().push(error);
    }

    /// Snapshot of the errors recorded so far, in append order
    pub fn snapshot(&self) -> Vec<GraphQLError> {
        self.errors.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Executor Errors
// =============================================================================

/// Errors that reject an execution as a whole
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The executor was configured with invalid settings
    #[error("Invalid executor configuration: {0}")]
    Configuration(String),

    /// The query failed to parse or validate; nothing was executed
    #[error("Query validation failed: {}", join_messages(.0))]
    Validation(Vec<GraphQLError>),

    /// The worker pool backing a parallel strategy could not be started
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// The background task running an async execution failed
    #[error("Background execution failed: {0}")]
    Join(String),
}

fn join_messages(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ExecutorError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ExecutorError::Configuration(_) => "CONFIGURATION_ERROR",
            ExecutorError::Validation(_) => "VALIDATION_ERROR",
            ExecutorError::WorkerPool(_) => "WORKER_POOL_ERROR",
            ExecutorError::Join(_) => "EXECUTION_ERROR",
        }
    }

    /// Errors to report in a result bundle for this rejection
    pub fn to_graphql_errors(&self) -> Vec<GraphQLError> {
        match self {
            ExecutorError::Validation(errors) => errors.clone(),
            other => vec![GraphQLError::new(ErrorKind::Validation, other.to_string())],
        }
    }
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors raised while assembling a [`Schema`](crate::schema::Schema)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("Type '{type_name}' referenced by {referenced_by} is not defined")]
    UnknownType {
        type_name: String,
        referenced_by: String,
    },

    #[error("Type '{0}' is defined more than once")]
    DuplicateType(String),

    #[error("Type '{type_name}' used by {used_by} is not an output type")]
    NotOutputType { type_name: String, used_by: String },

    #[error("Type '{type_name}' used by {used_by} is not an input type")]
    NotInputType { type_name: String, used_by: String },

    #[error("Union '{union_name}' member '{member}' is not an object type")]
    InvalidUnionMember { union_name: String, member: String },

    #[error("Type '{type_name}' cannot implement '{interface}': {reason}")]
    InvalidInterface {
        type_name: String,
        interface: String,
        reason: String,
    },

    #[error("Type '{0}' must define at least one field")]
    EmptyType(String),

    #[error("Root {0} type is not defined")]
    MissingRootType(String),

    #[error("Invalid schema definition: {0}")]
    Sdl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_with_classification() {
        let error = GraphQLError::new(ErrorKind::Resolution, "boom")
            .with_path(vec!["todos".into(), 1.into(), "text".into()]);

        let json = serde_json::to_value(&error).expect("should serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "message": "boom",
                "path": ["todos", 1, "text"],
                "extensions": { "classification": "ResolutionError" }
            })
        );
    }

    #[test]
    fn test_error_locations_are_serialized_when_present() {
        let error = GraphQLError::validation(
            "Unknown fragment 'F'",
            Some(graphql_parser::Pos { line: 2, column: 5 }),
        );

        let json = serde_json::to_value(&error).expect("should serialize");
        assert_eq!(json["locations"], serde_json::json!([{ "line": 2, "column": 5 }]));
        assert_eq!(json["path"], serde_json::json!([]));
    }

    #[test]
    fn test_error_display_includes_path() {
        let error = GraphQLError::new(ErrorKind::Coercion, "bad value")
            .with_path(vec!["a".into(), 0.into()]);
        assert_eq!(error.to_string(), "bad value (at a.0)");
    }

    #[test]
    fn test_sink_preserves_append_order() {
        let sink = ErrorSink::new();
        sink.push(GraphQLError::new(ErrorKind::Resolution, "first"));
        sink.push(GraphQLError::new(ErrorKind::Resolution, "second"));

        let messages: Vec<_> = sink.snapshot().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_sink_concurrent_push_loses_nothing() {
        let sink = ErrorSink::new();
        rayon::scope(|s| {
            for i in 0..64 {
                let sink = &sink;
                s.spawn(move |_| sink.push(GraphQLError::new(ErrorKind::Resolution, i.to_string())));
            }
        });
        assert_eq!(sink.len(), 64);
    }

    #[test]
    fn test_validation_error_display_joins_messages() {
        let err = ExecutorError::Validation(vec![
            GraphQLError::validation("first", None),
            GraphQLError::validation("second", None),
        ]);
        assert_eq!(err.to_string(), "Query validation failed: first; second");
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_configuration_error_maps_to_single_response_error() {
        let err = ExecutorError::Configuration("parallelism must be positive".to_string());
        let errors = err.to_graphql_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("parallelism must be positive"));
    }
}
