//! Execution context
//!
//! [`ExecutionContext`] is the capability every resolver and strategy sees.
//! One [`RootContext`] is created per execution and owns the shared state:
//! schema, operation, fragment table, variables and root value (all behind
//! `Arc`, never copied), plus the error sink and complexity counter that
//! concurrent workers append to.
//!
//! Nested selection sets run under a [`DepthContext`], a decorator that adds
//! the current depth and forwards everything else to the root context.

use graphql_parser::query::{FragmentDefinition, OperationDefinition};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::error::{ErrorSink, GraphQLError};
use crate::executor::ExecutionStrategy;
use crate::schema::Schema;

/// Fragment definitions of one document, by name
pub type FragmentTable = HashMap<String, FragmentDefinition<'static, String>>;

/// Read access to everything an execution shares, plus the error sink
pub trait ExecutionContext: Send + Sync {
    fn schema(&self) -> &Schema;

    fn fragments(&self) -> &FragmentTable;

    fn fragment(&self, name: &str) -> Option<&FragmentDefinition<'static, String>> {
        self.fragments().get(name)
    }

    fn operation(&self) -> &OperationDefinition<'static, String>;

    /// Coerced variable values
    fn variables(&self) -> &Map<String, Value>;

    fn root_value(&self) -> &Value;

    /// Strategy used for queries (mutation roots always run serially)
    fn query_strategy(&self) -> &ExecutionStrategy;

    /// Record a field error; safe to call from concurrent workers
    fn add_error(&self, error: GraphQLError);

    /// Errors recorded so far, in append order
    fn errors(&self) -> Vec<GraphQLError>;

    fn add_complexity(&self, weight: u64);

    fn complexity(&self) -> u64;

    fn is_cancelled(&self) -> bool;

    /// Deepest selection-set nesting allowed, if limited
    fn max_depth(&self) -> Option<usize>;

    /// Nesting depth of the selection set being executed (root is 0)
    fn current_depth(&self) -> usize {
        0
    }
}

/// Cooperative cancellation flag shared between a caller and an execution
///
/// Checked before each field is dispatched; resolvers already running are not
/// interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Depth-0 context owning the state of one execution
pub struct RootContext {
    schema: Arc<Schema>,
    operation: Arc<OperationDefinition<'static, String>>,
    fragments: Arc<FragmentTable>,
    variables: Arc<Map<String, Value>>,
    root_value: Arc<Value>,
    strategy: ExecutionStrategy,
    errors: ErrorSink,
    complexity: AtomicU64,
    cancellation: CancellationToken,
    max_depth: Option<usize>,
}

impl RootContext {
    pub fn new(
        schema: Arc<Schema>,
        operation: Arc<OperationDefinition<'static, String>>,
        fragments: Arc<FragmentTable>,
        variables: Arc<Map<String, Value>>,
        root_value: Arc<Value>,
        strategy: ExecutionStrategy,
    ) -> Self {
        Self {
            schema,
            operation,
            fragments,
            variables,
            root_value,
            strategy,
            errors: ErrorSink::new(),
            complexity: AtomicU64::new(0),
            cancellation: CancellationToken::new(),
            max_depth: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl ExecutionContext for RootContext {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn fragments(&self) -> &FragmentTable {
        &self.fragments
    }

    fn operation(&self) -> &OperationDefinition<'static, String> {
        &self.operation
    }

    fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    fn root_value(&self) -> &Value {
        &self.root_value
    }

    fn query_strategy(&self) -> &ExecutionStrategy {
        &self.strategy
    }

    fn add_error(&self, error: GraphQLError) {
        self.errors.push(error);
    }

    fn errors(&self) -> Vec<GraphQLError> {
        self.errors.snapshot()
    }

    fn add_complexity(&self, weight: u64) {
        self.complexity.fetch_add(weight, Ordering::Relaxed);
    }

    fn complexity(&self) -> u64 {
        self.complexity.load(Ordering::Relaxed)
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }
}

/// A context at a given nesting depth, delegating to a base context
///
/// Only the depth is new state; the base is shared, so a child sees exactly
/// the schema, operation, fragments, variables and error sink of its parent.
#[derive(Clone)]
pub struct DepthContext {
    delegate: Arc<dyn ExecutionContext>,
    current_depth: usize,
}

impl DepthContext {
    pub fn new(delegate: Arc<dyn ExecutionContext>, current_depth: usize) -> Self {
        Self {
            delegate,
            current_depth,
        }
    }

    /// Context for a nested selection set, one level deeper
    pub fn child(&self) -> Self {
        Self::new(self.delegate.clone(), self.current_depth + 1)
    }

    pub fn delegate(&self) -> &Arc<dyn ExecutionContext> {
        &self.delegate
    }
}

impl ExecutionContext for DepthContext {
    fn schema(&self) -> &Schema {
        self.delegate.schema()
    }

    fn fragments(&self) -> &FragmentTable {
        self.delegate.fragments()
    }

    fn fragment(&self, name: &str) -> Option<&FragmentDefinition<'static, String>> {
        self.delegate.fragment(name)
    }

    fn operation(&self) -> &OperationDefinition<'static, String> {
        self.delegate.operation()
    }

    fn variables(&self) -> &Map<String, Value> {
        self.delegate.variables()
    }

    fn root_value(&self) -> &Value {
        self.delegate.root_value()
    }

    fn query_strategy(&self) -> &ExecutionStrategy {
        self.delegate.query_strategy()
    }

    fn add_error(&self, error: GraphQLError) {
        self.delegate.add_error(error);
    }

    fn errors(&self) -> Vec<GraphQLError> {
        self.delegate.errors()
    }

    fn add_complexity(&self, weight: u64) {
        self.delegate.add_complexity(weight);
    }

    fn complexity(&self) -> u64 {
        self.delegate.complexity()
    }

    fn is_cancelled(&self) -> bool {
        self.delegate.is_cancelled()
    }

    fn max_depth(&self) -> Option<usize> {
        self.delegate.max_depth()
    }

    fn current_depth(&self) -> usize {
        self.current_depth
    }
}
