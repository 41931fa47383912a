//! Query executor orchestration

use graphql_parser::query::parse_query;
use rayon::ThreadPool;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use super::strategy::ExecutionStrategy;
use super::utils::{self, OperationKind};
use super::validation;
use crate::config::{ExecutorBacking, ExecutorConfig};
use crate::core::context::{CancellationToken, DepthContext, ExecutionContext, RootContext};
use crate::core::error::{ExecutorError, GraphQLError};
use crate::core::response::{ExecutionResult, ResultNode};
use crate::schema::Schema;

/// Executes GraphQL queries against a [`Schema`]
///
/// Configured with a builder; the schema and any supplied worker pool are
/// shared, so cloning an executor is cheap.
///
/// ```rust,ignore
/// let result = QueryExecutor::create(schema)
///     .fork_join_executor_service(4)
///     .query("{ todos { id text } }")
///     .execute()?;
/// ```
#[derive(Clone)]
pub struct QueryExecutor {
    schema: Arc<Schema>,
    config: ExecutorConfig,
    pool: Option<Arc<ThreadPool>>,
    query: Option<String>,
    operation_name: Option<String>,
    variables: Map<String, Value>,
    root_value: Value,
    cancellation: CancellationToken,
}

impl QueryExecutor {
    /// Create a serial executor for `schema`
    pub fn create(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            config: ExecutorConfig::default(),
            pool: None,
            query: None,
            operation_name: None,
            variables: Map::new(),
            root_value: Value::Object(Map::new()),
            cancellation: CancellationToken::new(),
        }
    }

    /// Resolve every field on the calling thread
    pub fn serial_executor(mut self) -> Self {
        self.pool = None;
        self.config.backing = ExecutorBacking::Serial;
        self
    }

    /// Run fields on a caller-owned pool, one task per field
    pub fn executor_service(mut self, pool: Arc<ThreadPool>) -> Self {
        self.config.backing = ExecutorBacking::FixedThreadPool {
            size: pool.current_num_threads(),
        };
        self.pool = Some(pool);
        self
    }

    /// Run fields on a bounded pool of `size` workers, one task per field
    pub fn fixed_thread_pool(mut self, size: usize) -> Self {
        self.pool = None;
        self.config.backing = ExecutorBacking::FixedThreadPool { size };
        self
    }

    /// Split field lists in halves on a work-stealing pool
    pub fn fork_join_executor_service(mut self, parallelism: usize) -> Self {
        self.pool = None;
        self.config.backing = ExecutorBacking::ForkJoin { parallelism };
        self
    }

    /// Replace the whole configuration (backing and depth limit)
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.pool = None;
        self.config = config;
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Operation to run when the document defines several
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    /// Parent value of the root fields (defaults to `{}`)
    pub fn root_value(mut self, root_value: Value) -> Self {
        self.root_value = root_value;
        self
    }

    /// Token the caller can use to stop dispatching further fields
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    fn strategy(&self) -> Result<ExecutionStrategy, ExecutorError> {
        match (&self.pool, &self.config.backing) {
            (Some(pool), ExecutorBacking::FixedThreadPool { .. }) => {
                Ok(ExecutionStrategy::FixedThreadPool(pool.clone()))
            }
            (_, backing) => ExecutionStrategy::from_backing(backing),
        }
    }

    /// Parse, validate and execute the query, blocking until every field
    /// has resolved
    ///
    /// Returns `Err` when nothing could be executed (invalid configuration,
    /// parse or validation failure). Field failures are reported in the
    /// result's `errors` alongside partial data.
    pub fn execute(&self) -> Result<ExecutionResult, ExecutorError> {
        let execution_id = Uuid::new_v4();
        let strategy = self.strategy()?;
        let query = self
            .query
            .as_deref()
            .ok_or_else(|| ExecutorError::Configuration("no query was provided".to_string()))?;

        let document = parse_query::<String>(query)
            .map_err(|e| {
                ExecutorError::Validation(vec![GraphQLError::validation(
                    format!("Failed to parse query: {}", e),
                    None,
                )])
            })?
            .into_static();

        let prepared = validation::prepare(
            &self.schema,
            document,
            self.operation_name.as_deref(),
            &self.variables,
        )
        .map_err(|errors| {
            tracing::warn!(
                execution_id = %execution_id,
                errors = errors.len(),
                "GraphQL query rejected by validation"
            );
            ExecutorError::Validation(errors)
        })?;

        let root_type = self.schema.object_type(&prepared.root_type).ok_or_else(|| {
            ExecutorError::Configuration(format!(
                "root type '{}' is not an object type",
                prepared.root_type
            ))
        })?;

        // Mutation roots run one after another; nested fields use the
        // configured strategy
        let root_strategy = match prepared.kind {
            OperationKind::Mutation => ExecutionStrategy::Serial,
            _ => strategy.clone(),
        };

        tracing::debug!(
            execution_id = %execution_id,
            strategy = strategy.name(),
            parallelism = strategy.parallelism(),
            operation = ?prepared.kind,
            "Executing GraphQL operation"
        );

        let root: Arc<dyn ExecutionContext> = Arc::new(
            RootContext::new(
                self.schema.clone(),
                Arc::new(prepared.operation),
                Arc::new(prepared.fragments),
                Arc::new(prepared.variables),
                Arc::new(self.root_value.clone()),
                strategy,
            )
            .with_cancellation(self.cancellation.clone())
            .with_max_depth(self.config.max_depth),
        );
        let ctx = DepthContext::new(root.clone(), 0);

        let started = Instant::now();
        let selection_set = utils::operation_parts(root.operation()).selection_set;
        let data = root_strategy.execute(&ctx, root_type, root.root_value(), &[selection_set], &[]);

        let result = ExecutionResult {
            data: Some(ResultNode::Object(data)),
            errors: root.errors(),
            complexity: root.complexity(),
        };

        tracing::info!(
            execution_id = %execution_id,
            complexity = result.complexity,
            errors = result.errors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "GraphQL operation executed"
        );
        Ok(result)
    }

    /// [`execute`](Self::execute) on tokio's blocking pool
    pub async fn execute_async(&self) -> Result<ExecutionResult, ExecutorError> {
        let executor = self.clone();
        tokio::task::spawn_blocking(move || executor.execute())
            .await
            .map_err(|e| ExecutorError::Join(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::schema::{FieldDef, ObjectType, TypeRef};
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        let query = ObjectType::new("Query")
            .with_field(
                FieldDef::new("hello", TypeRef::named("String"))
                    .with_resolver(|_, _, _| Ok(json!("world"))),
            )
            .with_field(
                FieldDef::new("greet", TypeRef::named("String"))
                    .with_argument(crate::schema::ArgumentDef::new("name", TypeRef::named_non_null("String")))
                    .with_resolver(|_, args, _| Ok(json!(format!("hi {}", args["name"].as_str().unwrap_or("")))))
                    .with_complexity(5),
            );
        let mutation = ObjectType::new("Mutation").with_field(
            FieldDef::new("touch", TypeRef::named("Int")).with_resolver(|_, _, _| Ok(json!(1))),
        );
        Arc::new(
            Schema::builder(query)
                .with_mutation(mutation)
                .build()
                .expect("schema should build"),
        )
    }

    #[test]
    fn test_execute_returns_data_errors_and_complexity() {
        let result = QueryExecutor::create(schema())
            .query("{ hello greet(name: \"bob\") }")
            .execute()
            .expect("execute should succeed");

        assert!(result.is_ok());
        assert_eq!(result.data_json(), json!({ "hello": "world", "greet": "hi bob" }));
        assert_eq!(result.complexity, 6);
    }

    #[test]
    fn test_execute_parse_error_is_validation_error() {
        let err = QueryExecutor::create(schema())
            .query("not valid graphql {{{{")
            .execute()
            .expect_err("parse error should be rejected");

        let ExecutorError::Validation(errors) = err else {
            panic!("expected a validation error");
        };
        assert!(errors[0].message.starts_with("Failed to parse query"));
        assert_eq!(errors[0].kind, ErrorKind::Validation);
    }

    #[test]
    fn test_missing_query_is_a_configuration_error() {
        let err = QueryExecutor::create(schema()).execute().expect_err("no query");
        assert!(matches!(err, ExecutorError::Configuration(_)));
    }

    #[test]
    fn test_invalid_parallelism_is_rejected_before_parsing() {
        let err = QueryExecutor::create(schema())
            .fixed_thread_pool(0)
            .query("{{{")
            .execute()
            .expect_err("should be rejected");
        assert!(matches!(err, ExecutorError::Configuration(_)));
    }

    #[test]
    fn test_variables_and_operation_name() {
        let mut variables = Map::new();
        variables.insert("who".to_string(), json!("ann"));

        let result = QueryExecutor::create(schema())
            .query("query A { hello } query B($who: String!) { greet(name: $who) }")
            .operation_name("B")
            .variables(variables)
            .execute()
            .expect("execute should succeed");

        assert_eq!(result.data_json(), json!({ "greet": "hi ann" }));
    }

    #[test]
    fn test_mutation_runs_on_mutation_root() {
        let result = QueryExecutor::create(schema())
            .fork_join_executor_service(2)
            .query("mutation { first: touch second: touch }")
            .execute()
            .expect("execute should succeed");

        assert_eq!(result.data_json(), json!({ "first": 1, "second": 1 }));
        assert_eq!(result.complexity, 2);
    }

    #[test]
    fn test_caller_supplied_pool_is_used() {
        let pool = Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(2)
                .build()
                .expect("pool should start"),
        );
        let executor = QueryExecutor::create(schema()).executor_service(pool);
        assert_eq!(
            executor.config().backing,
            ExecutorBacking::FixedThreadPool { size: 2 }
        );

        let result = executor.query("{ hello }").execute().expect("execute should succeed");
        assert_eq!(result.data_json(), json!({ "hello": "world" }));
    }

    #[test]
    fn test_cancelled_execution_nulls_fields() {
        let token = CancellationToken::new();
        token.cancel();

        let result = QueryExecutor::create(schema())
            .cancellation_token(token)
            .query("{ hello }")
            .execute()
            .expect("execute should succeed");

        assert_eq!(result.data_json(), json!({ "hello": null }));
        assert_eq!(result.errors[0].kind, ErrorKind::Cancelled);
        assert_eq!(result.complexity, 0);
    }

    #[tokio::test]
    async fn test_execute_async() {
        let result = QueryExecutor::create(schema())
            .fixed_thread_pool(2)
            .query("{ hello }")
            .execute_async()
            .await
            .expect("execute should succeed");

        assert_eq!(result.data_json(), json!({ "hello": "world" }));
    }
}
