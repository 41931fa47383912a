//! Timing and concurrency behaviour of the pooled strategies

mod common;

use common::*;
use moon_graphql::prelude::*;
use std::time::{Duration, Instant};

#[test]
fn test_slow_and_fast_fields_on_two_workers() {
    init_tracing();
    for (name, executor) in executors(delay_schema(), 2) {
        let result = executor
            .query("{ slowField fastField }")
            .execute()
            .expect("execute should succeed");

        assert!(result.is_ok(), "strategy {}: {:?}", name, result.errors);
        assert_eq!(
            result.data_json(),
            json!({ "slowField": 42, "fastField": "ok" }),
            "strategy {}",
            name
        );
        assert_eq!(result.complexity, 2);
    }
}

#[test]
fn test_serial_execution_sums_resolver_latency() {
    let started = Instant::now();
    let result = QueryExecutor::create(delay_schema())
        .serial_executor()
        .query("{ slowField otherSlowField }")
        .execute()
        .expect("execute should succeed");

    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(result.data_json(), json!({ "slowField": 42, "otherSlowField": 7 }));
}

#[test]
fn test_pooled_execution_overlaps_resolver_latency() {
    for (name, executor) in executors(delay_schema(), 2).into_iter().skip(1) {
        let executor = executor.query("{ slowField otherSlowField }");
        let started = Instant::now();
        let result = executor.execute().expect("execute should succeed");
        let elapsed = started.elapsed();

        assert!(
            elapsed < Duration::from_millis(100),
            "strategy {} took {:?}",
            name,
            elapsed
        );
        assert_eq!(result.data_json(), json!({ "slowField": 42, "otherSlowField": 7 }));
    }
}

#[test]
fn test_single_worker_pool_handles_nested_lists() {
    // every level of nesting dispatches onto the same single worker
    let result = QueryExecutor::create(todo_schema())
        .fixed_thread_pool(1)
        .query("{ viewer { todos { id status } } search(text: \"a\") { __typename } }")
        .execute()
        .expect("execute should succeed");

    assert!(result.is_ok(), "{:?}", result.errors);
    assert_eq!(result.data_json()["viewer"]["todos"][3], json!({ "id": "4", "status": "OPEN" }));
}

#[test]
fn test_cancellation_stops_remaining_fields() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let query = ObjectType::new("Query")
        .with_field(FieldDef::new("first", TypeRef::named("Int")).with_resolver(move |_, _, _| {
            trigger.cancel();
            Ok(json!(1))
        }))
        .with_field(FieldDef::new("second", TypeRef::named("Int")).with_resolver(|_, _, _| Ok(json!(2))));
    let schema = Arc::new(Schema::builder(query).build().expect("schema should build"));

    let result = QueryExecutor::create(schema)
        .cancellation_token(token)
        .query("{ first second }")
        .execute()
        .expect("execute should succeed");

    assert_eq!(result.data_json(), json!({ "first": 1, "second": null }));
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ErrorKind::Cancelled);
    assert_eq!(result.errors[0].path, vec![PathSegment::from("second")]);
    assert_eq!(result.complexity, 1);
}

#[tokio::test]
async fn test_execute_async_runs_off_the_runtime() {
    let result = QueryExecutor::create(delay_schema())
        .fork_join_executor_service(2)
        .query("{ slowField fastField }")
        .execute_async()
        .await
        .expect("execute should succeed");

    assert_eq!(result.data_json(), json!({ "slowField": 42, "fastField": "ok" }));
    assert_eq!(result.complexity, 2);
}
