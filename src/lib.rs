//! # Moon GraphQL
//!
//! A concurrent GraphQL query executor with pluggable execution strategies.
//!
//! ## Features
//!
//! - **Explicit Schemas**: Describe types and resolvers with builders, or load SDL
//! - **Pluggable Concurrency**: Serial, fixed thread pool or fork-join execution
//! - **Deterministic Output**: Data keeps request order whatever the strategy
//! - **Partial Results**: A failing field becomes null with a located error
//! - **Complexity Scoring**: Every resolved field adds its declared weight
//! - **Introspection**: `__schema`, `__type` and `__typename` out of the box
//! - **Configuration-Based**: Choose the backing via YAML configuration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use moon_graphql::prelude::*;
//!
//! let query = ObjectType::new("Query").with_field(
//!     FieldDef::new("hello", TypeRef::named("String"))
//!         .with_resolver(|_parent, _args, _ctx| Ok(json!("world"))),
//! );
//! let schema = Arc::new(Schema::builder(query).build()?);
//!
//! let result = QueryExecutor::create(schema)
//!     .fork_join_executor_service(4)
//!     .query("{ hello }")
//!     .execute()?;
//!
//! assert_eq!(result.data_json(), json!({ "hello": "world" }));
//! ```

pub mod config;
pub mod core;
pub mod executor;
pub mod schema;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        context::{CancellationToken, DepthContext, ExecutionContext},
        error::{ErrorKind, ExecutorError, GraphQLError, PathSegment, SchemaError},
        response::{ExecutionResult, ResultNode},
    };

    // === Executor ===
    pub use crate::executor::{ExecutionStrategy, QueryExecutor};

    // === Schema ===
    pub use crate::schema::{
        ArgumentDef, DateTimeScalar, EnumType, FieldDef, FieldResolver, InputObjectType,
        InterfaceType, ObjectType, ResolverRegistry, ScalarCoercer, ScalarType, Schema,
        SchemaBuilder, TypeDef, TypeRef, TypeResolver, UnionType,
    };

    // === Config ===
    pub use crate::config::{ExecutorBacking, ExecutorConfig};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use serde_json::{Map, Value, json};
    pub use std::sync::Arc;
}
