//! Core module containing the execution context, error and result types

pub mod context;
pub mod error;
pub mod response;

pub use context::{CancellationToken, DepthContext, ExecutionContext, FragmentTable, RootContext};
pub use error::{ErrorKind, ExecutorError, GraphQLError, Location, PathSegment, SchemaError};
pub use response::{ExecutionResult, ResultNode};
