//! Shared fixtures for executor integration tests
//!
//! A small todo-list schema: a viewer with todos, a `Node` interface, a
//! `SearchResult` union, list fields with failing elements and a mutation
//! root.

#![allow(dead_code)]

use moon_graphql::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn todos() -> Value {
    json!([
        { "__typename": "Todo", "id": 1, "text": "Write the parser", "complete": true, "updated": "2024-03-01T10:00:00Z" },
        { "__typename": "Todo", "id": 2, "text": "Write the executor", "complete": false, "updated": 1709287200000i64 },
        { "__typename": "Todo", "id": 3, "text": "Write the tests", "complete": false, "updated": null },
        { "__typename": "Todo", "id": 4, "text": "Release", "complete": false, "updated": null },
    ])
}

pub fn viewer() -> Value {
    json!({ "__typename": "User", "id": "u1", "name": "Ada", "todos": todos() })
}

fn sleep_then<T>(millis: u64, value: T) -> T {
    thread::sleep(Duration::from_millis(millis));
    value
}

/// The todo schema; `delay_ms` is added to every todo's `title` resolver to
/// shake out ordering bugs under parallel strategies
pub fn todo_schema_with_delay(delay_ms: u64) -> Arc<Schema> {
    let node = InterfaceType::new("Node")
        .with_description("An object with an ID")
        .with_field(FieldDef::new("id", TypeRef::named_non_null("ID")));

    let status = EnumType::new("Status").with_value("OPEN").with_value("DONE");

    let todo = ObjectType::new("Todo")
        .implements("Node")
        .with_field(FieldDef::new("id", TypeRef::named_non_null("ID")))
        .with_field(FieldDef::new("text", TypeRef::named_non_null("String")))
        .with_field(FieldDef::new("complete", TypeRef::named_non_null("Boolean")))
        .with_field(FieldDef::new("updated", TypeRef::named("DateTime")))
        .with_field(
            FieldDef::new("status", TypeRef::named_non_null("Status")).with_resolver(|parent, _, _| {
                Ok(json!(if parent["complete"].as_bool().unwrap_or(false) { "DONE" } else { "OPEN" }))
            }),
        )
        .with_field(
            // fails for todo 3 only
            FieldDef::new("title", TypeRef::named("String"))
                .with_complexity(2)
                .with_resolver(move |parent, _, _| {
                    let id = parent["id"].as_i64().unwrap_or_default();
                    let reversed = 10 - id.min(10) as u64;
                    sleep_then(delay_ms * reversed, ());
                    if id == 3 {
                        anyhow::bail!("title service unavailable for todo {}", id);
                    }
                    Ok(json!(format!("#{} {}", id, parent["text"].as_str().unwrap_or(""))))
                }),
        );

    let user = ObjectType::new("User")
        .implements("Node")
        .with_field(FieldDef::new("id", TypeRef::named_non_null("ID")))
        .with_field(FieldDef::new("name", TypeRef::named("String")))
        .with_field(
            FieldDef::new("todos", TypeRef::non_null(TypeRef::list(TypeRef::named_non_null("Todo"))))
                .with_argument(ArgumentDef::new("first", TypeRef::named("Int")).with_default(json!(10)))
                .with_argument(ArgumentDef::new("status", TypeRef::named("Status")))
                .with_resolver(|parent, args, _| {
                    let first = args["first"].as_u64().unwrap_or(10) as usize;
                    let wanted = args.get("status").and_then(Value::as_str).map(|s| s == "DONE");
                    let todos = parent["todos"].as_array().cloned().unwrap_or_default();
                    Ok(Value::Array(
                        todos
                            .into_iter()
                            .filter(|t| wanted.is_none_or(|done| t["complete"].as_bool() == Some(done)))
                            .take(first)
                            .collect(),
                    ))
                }),
        );

    let search_result = UnionType::new("SearchResult").with_member("User").with_member("Todo");

    let query = ObjectType::new("Query")
        .with_field(FieldDef::new("viewer", TypeRef::named("User")).with_resolver(|_, _, _| Ok(viewer())))
        .with_field(
            FieldDef::new("node", TypeRef::named("Node"))
                .with_argument(ArgumentDef::new("id", TypeRef::named_non_null("ID")))
                .with_resolver(|_, args, _| {
                    let id = args["id"].as_str().unwrap_or_default();
                    if id == "u1" {
                        return Ok(viewer());
                    }
                    Ok(todos()
                        .as_array()
                        .and_then(|all| all.iter().find(|t| t["id"].to_string() == id).cloned())
                        .unwrap_or(Value::Null))
                }),
        )
        .with_field(
            FieldDef::new("search", TypeRef::non_null(TypeRef::list(TypeRef::named_non_null("SearchResult"))))
                .with_argument(ArgumentDef::new("text", TypeRef::named_non_null("String")))
                .with_resolver(|_, args, _| {
                    let text = args["text"].as_str().unwrap_or_default().to_lowercase();
                    let mut hits = Vec::new();
                    if "ada".contains(&text) {
                        hits.push(viewer());
                    }
                    if let Some(all) = todos().as_array() {
                        hits.extend(
                            all.iter()
                                .filter(|t| t["text"].as_str().unwrap_or_default().to_lowercase().contains(&text))
                                .cloned(),
                        );
                    }
                    Ok(Value::Array(hits))
                }),
        )
        .with_field(
            FieldDef::new("numbers", TypeRef::list(TypeRef::named("Int")))
                .with_resolver(|_, _, _| Ok(json!([1, 2, "three", 4]))),
        )
        .with_field(
            FieldDef::new("failing", TypeRef::named("String"))
                .with_resolver(|_, _, _| Err(anyhow::anyhow!("failing resolver"))),
        )
        .with_field(FieldDef::new("greeting", TypeRef::named("String")).with_resolver(|_, _, _| Ok(json!("hello"))))
        .with_field(FieldDef::new("answer", TypeRef::named("Int")).with_resolver(|_, _, _| Ok(json!(42))));

    let next_id = Arc::new(AtomicU64::new(100));
    let mutation = ObjectType::new("Mutation").with_field(
        FieldDef::new("addTodo", TypeRef::named_non_null("Todo"))
            .with_argument(ArgumentDef::new("text", TypeRef::named_non_null("String")))
            .with_resolver(move |_, args, _| {
                let id = next_id.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "id": id, "text": args["text"], "complete": false }))
            }),
    );

    Arc::new(
        Schema::builder(query)
            .with_mutation(mutation)
            .register(node)
            .register(status)
            .register(todo)
            .register(user)
            .register(search_result)
            .register(ScalarType::date_time())
            .build()
            .expect("todo schema should build"),
    )
}

pub fn todo_schema() -> Arc<Schema> {
    todo_schema_with_delay(0)
}

/// Schema with one 50 ms field and one immediate field
pub fn delay_schema() -> Arc<Schema> {
    let query = ObjectType::new("Query")
        .with_field(
            FieldDef::new("slowField", TypeRef::named("Int"))
                .with_resolver(|_, _, _| Ok(sleep_then(50, json!(42)))),
        )
        .with_field(
            FieldDef::new("otherSlowField", TypeRef::named("Int"))
                .with_resolver(|_, _, _| Ok(sleep_then(50, json!(7)))),
        )
        .with_field(FieldDef::new("fastField", TypeRef::named("String")).with_resolver(|_, _, _| Ok(json!("ok"))));
    Arc::new(Schema::builder(query).build().expect("delay schema should build"))
}

/// One executor per strategy, each with a given parallelism
pub fn executors(schema: Arc<Schema>, parallelism: usize) -> Vec<(&'static str, QueryExecutor)> {
    vec![
        ("serial", QueryExecutor::create(schema.clone()).serial_executor()),
        ("fixed_thread_pool", QueryExecutor::create(schema.clone()).fixed_thread_pool(parallelism)),
        ("fork_join", QueryExecutor::create(schema).fork_join_executor_service(parallelism)),
    ]
}

/// Error messages and paths, order-insensitive
pub fn error_set(result: &ExecutionResult) -> Vec<(String, Vec<PathSegment>)> {
    let mut errors: Vec<_> = result
        .errors
        .iter()
        .map(|e| (e.message.clone(), e.path.clone()))
        .collect();
    errors.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| format!("{:?}", a.1).cmp(&format!("{:?}", b.1))));
    errors
}
