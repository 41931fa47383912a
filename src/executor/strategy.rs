//! Execution strategies
//!
//! A strategy decides how the fields of a selection set (and the elements of
//! a list) are dispatched. Whatever the dispatch order, results are merged
//! back in request order, so every strategy produces the same data.

use graphql_parser::query::SelectionSet;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rayon::ThreadPool;
use serde_json::Value;
use std::sync::Arc;

use super::field_resolver;
use super::utils::{self, CollectedField};
use crate::config::ExecutorBacking;
use crate::core::context::DepthContext;
use crate::core::error::{ExecutorError, PathSegment};
use crate::core::response::ResultNode;
use crate::schema::ObjectType;

/// How field resolution units are scheduled
#[derive(Debug, Clone)]
pub enum ExecutionStrategy {
    /// Synchronously, in selection order, on the calling thread
    Serial,

    /// One task per field (or list element) on a bounded worker pool
    FixedThreadPool(Arc<ThreadPool>),

    /// Recursive halving of the field list, joined on a work-stealing pool
    ForkJoin(Arc<ThreadPool>),
}

impl ExecutionStrategy {
    /// Build the strategy described by a configuration, starting its pool
    pub fn from_backing(backing: &ExecutorBacking) -> Result<Self, ExecutorError> {
        backing.validate()?;
        Ok(match backing {
            ExecutorBacking::Serial => ExecutionStrategy::Serial,
            ExecutorBacking::FixedThreadPool { size } => {
                ExecutionStrategy::FixedThreadPool(Arc::new(Self::build_pool(*size, "gql-pool")?))
            }
            ExecutorBacking::ForkJoin { parallelism } => ExecutionStrategy::ForkJoin(Arc::new(
                Self::build_pool(*parallelism, "gql-forkjoin")?,
            )),
        })
    }

    fn build_pool(threads: usize, prefix: &'static str) -> Result<ThreadPool, ExecutorError> {
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |index| format!("{}-{}", prefix, index))
            .build()?)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExecutionStrategy::Serial => "serial",
            ExecutionStrategy::FixedThreadPool(_) => "fixed_thread_pool",
            ExecutionStrategy::ForkJoin(_) => "fork_join",
        }
    }

    /// Worker threads available to this strategy
    pub fn parallelism(&self) -> usize {
        match self {
            ExecutionStrategy::Serial => 1,
            ExecutionStrategy::FixedThreadPool(pool) | ExecutionStrategy::ForkJoin(pool) => {
                pool.current_num_threads()
            }
        }
    }

    /// Execute a selection set against `parent`, returning response key →
    /// node in the order the keys were requested
    pub fn execute(
        &self,
        ctx: &DepthContext,
        object_type: &ObjectType,
        parent: &Value,
        selection_sets: &[&SelectionSet<'static, String>],
        path: &[PathSegment],
    ) -> IndexMap<String, ResultNode> {
        let collected = utils::collect_fields(ctx, object_type, selection_sets);
        let nodes = self.map_ordered(&collected, |_, entry: &CollectedField<'_>| {
            let mut field_path = path.to_vec();
            field_path.push(PathSegment::Field(entry.response_key.clone()));
            field_resolver::resolve_field(ctx, object_type, parent, &entry.fields, field_path)
        });

        collected
            .into_iter()
            .map(|entry| entry.response_key)
            .zip(nodes)
            .collect()
    }

    /// Apply `f` to every item, returning results in item order
    pub(crate) fn map_ordered<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(usize, &T) -> R + Sync,
    {
        match self {
            ExecutionStrategy::Serial => items
                .iter()
                .enumerate()
                .map(|(index, item)| f(index, item))
                .collect(),
            // a single item gains nothing from a hop onto the pool
            _ if items.len() <= 1 => items
                .iter()
                .enumerate()
                .map(|(index, item)| f(index, item))
                .collect(),
            ExecutionStrategy::FixedThreadPool(pool) => {
                let completed: Mutex<Vec<(usize, R)>> = Mutex::new(Vec::with_capacity(items.len()));
                pool.scope(|scope| {
                    for (index, item) in items.iter().enumerate() {
                        let f = &f;
                        let completed = &completed;
                        scope.spawn(move |_| {
                            let result = f(index, item);
                            completed.lock().push((index, result));
                        });
                    }
                });
                let mut completed = completed.into_inner();
                completed.sort_by_key(|(index, _)| *index);
                completed.into_iter().map(|(_, result)| result).collect()
            }
            ExecutionStrategy::ForkJoin(pool) => pool.install(|| fork_join(items, 0, &f)),
        }
    }
}

/// Split `items` in halves until single items remain, resolving both halves
/// with `rayon::join`
fn fork_join<T, R, F>(items: &[T], offset: usize, f: &F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync,
{
    match items {
        [] => Vec::new(),
        [item] => vec![f(offset, item)],
        _ => {
            let mid = items.len() / 2;
            let (left, right) = items.split_at(mid);
            let (mut head, tail) = rayon::join(
                || fork_join(left, offset, f),
                || fork_join(right, offset + mid, f),
            );
            head.extend(tail);
            head
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn strategies() -> Vec<ExecutionStrategy> {
        vec![
            ExecutionStrategy::Serial,
            ExecutionStrategy::from_backing(&ExecutorBacking::FixedThreadPool { size: 3 })
                .expect("pool should start"),
            ExecutionStrategy::from_backing(&ExecutorBacking::ForkJoin { parallelism: 3 })
                .expect("pool should start"),
        ]
    }

    #[test]
    fn test_map_ordered_preserves_order_under_uneven_latency() {
        let items: Vec<u64> = (0..12).collect();
        for strategy in strategies() {
            let results = strategy.map_ordered(&items, |index, item| {
                // later items finish first
                thread::sleep(Duration::from_millis(12 - *item));
                (index, item * 10)
            });
            let expected: Vec<(usize, u64)> = (0..12).map(|i| (i as usize, i * 10)).collect();
            assert_eq!(results, expected, "strategy {} reordered results", strategy.name());
        }
    }

    #[test]
    fn test_map_ordered_handles_empty_and_single_inputs() {
        for strategy in strategies() {
            let empty: Vec<u8> = Vec::new();
            assert!(strategy.map_ordered(&empty, |_, x| *x).is_empty());
            assert_eq!(strategy.map_ordered(&[7u8], |i, x| (i, *x)), vec![(0, 7)]);
        }
    }

    #[test]
    fn test_fork_join_indexes_match_positions() {
        let items: Vec<char> = "abcdefg".chars().collect();
        let indexed = fork_join(&items, 0, &|index, c: &char| format!("{}{}", index, c));
        assert_eq!(indexed, vec!["0a", "1b", "2c", "3d", "4e", "5f", "6g"]);
    }

    #[test]
    fn test_nested_map_ordered_does_not_deadlock_on_small_pool() {
        let strategy = ExecutionStrategy::from_backing(&ExecutorBacking::FixedThreadPool { size: 1 })
            .expect("pool should start");
        let outer: Vec<u32> = (0..4).collect();
        let results = strategy.map_ordered(&outer, |_, o| {
            let inner: Vec<u32> = (0..3).collect();
            strategy.map_ordered(&inner, |_, i| o * 10 + i).iter().sum::<u32>()
        });
        assert_eq!(results, vec![3, 33, 63, 93]);
    }

    #[test]
    fn test_zero_parallelism_is_a_configuration_error() {
        let err = ExecutionStrategy::from_backing(&ExecutorBacking::ForkJoin { parallelism: 0 })
            .expect_err("should be rejected");
        assert!(matches!(err, ExecutorError::Configuration(_)));

        let err = ExecutionStrategy::from_backing(&ExecutorBacking::FixedThreadPool { size: 0 })
            .expect_err("should be rejected");
        assert!(matches!(err, ExecutorError::Configuration(_)));
    }

    #[test]
    fn test_parallelism_reports_pool_size() {
        let strategies = strategies();
        assert_eq!(strategies[0].parallelism(), 1);
        assert_eq!(strategies[1].parallelism(), 3);
        assert_eq!(strategies[2].parallelism(), 3);
    }
}
