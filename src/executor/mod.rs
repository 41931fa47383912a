//! GraphQL executor module
//!
//! The executor is split into several sub-modules:
//! - `core`: the [`QueryExecutor`] builder and orchestration
//! - `strategy`: serial, fixed-pool and fork-join scheduling
//! - `field_resolver`: resolution and completion of a single field
//! - `validation`: operation selection and document validation
//! - `utils`: input coercion, field collection and helpers

mod core;
mod field_resolver;
mod strategy;
pub(crate) mod utils;
mod validation;

pub use self::core::QueryExecutor;
pub use strategy::ExecutionStrategy;
pub use utils::OperationKind;
