//! Introspection types
//!
//! `__schema` and `__type` are ordinary fields on the query root whose
//! resolvers read the schema through the execution context, so an
//! introspection query runs through the same strategies, error handling and
//! complexity accounting as any other query. `__Type` values are small JSON
//! objects (`kind`, `name`, `ofType`); everything else about a type is looked
//! up by name when selected.

use serde_json::{Map, Value, json};

use super::{
    ArgumentDef, EnumType, FieldDef, ObjectType, Schema, TypeDef, TypeRef,
};
use crate::core::context::ExecutionContext;

pub(super) fn meta_fields() -> Vec<FieldDef> {
    vec![
        FieldDef::new("__schema", TypeRef::named_non_null("__Schema"))
            .with_description("Access the current type schema of this server")
            .with_resolver(|_, _, _| Ok(json!({}))),
        FieldDef::new("__type", TypeRef::named("__Type"))
            .with_description("Request the type information of a single type")
            .with_argument(ArgumentDef::new("name", TypeRef::named_non_null("String")))
            .with_resolver(|_, args, ctx| {
                let schema = ctx.schema();
                Ok(args
                    .get("name")
                    .and_then(Value::as_str)
                    .and_then(|name| schema.get_type(name))
                    .map(named_type_json)
                    .unwrap_or(Value::Null))
            }),
    ]
}

pub(super) fn introspection_types() -> Vec<TypeDef> {
    vec![
        schema_type().into(),
        type_type().into(),
        ObjectType::new("__Field")
            .with_field(FieldDef::new("name", TypeRef::named_non_null("String")))
            .with_field(FieldDef::new("description", TypeRef::named("String")))
            .with_field(FieldDef::new("args", list_of("__InputValue")))
            .with_field(FieldDef::new("type", TypeRef::named_non_null("__Type")))
            .with_field(FieldDef::new("isDeprecated", TypeRef::named_non_null("Boolean")))
            .with_field(FieldDef::new("deprecationReason", TypeRef::named("String")))
            .into(),
        ObjectType::new("__InputValue")
            .with_field(FieldDef::new("name", TypeRef::named_non_null("String")))
            .with_field(FieldDef::new("description", TypeRef::named("String")))
            .with_field(FieldDef::new("type", TypeRef::named_non_null("__Type")))
            .with_field(FieldDef::new("defaultValue", TypeRef::named("String")))
            .into(),
        ObjectType::new("__EnumValue")
            .with_field(FieldDef::new("name", TypeRef::named_non_null("String")))
            .with_field(FieldDef::new("description", TypeRef::named("String")))
            .with_field(FieldDef::new("isDeprecated", TypeRef::named_non_null("Boolean")))
            .with_field(FieldDef::new("deprecationReason", TypeRef::named("String")))
            .into(),
        ObjectType::new("__Directive")
            .with_field(FieldDef::new("name", TypeRef::named_non_null("String")))
            .with_field(FieldDef::new("description", TypeRef::named("String")))
            .with_field(FieldDef::new("locations", list_of("__DirectiveLocation")))
            .with_field(FieldDef::new("args", list_of("__InputValue")))
            .with_field(FieldDef::new("isRepeatable", TypeRef::named_non_null("Boolean")))
            .into(),
        ["SCALAR", "OBJECT", "INTERFACE", "UNION", "ENUM", "INPUT_OBJECT", "LIST", "NON_NULL"]
            .into_iter()
            .fold(EnumType::new("__TypeKind"), EnumType::with_value)
            .into(),
        [
            "QUERY",
            "MUTATION",
            "SUBSCRIPTION",
            "FIELD",
            "FRAGMENT_DEFINITION",
            "FRAGMENT_SPREAD",
            "INLINE_FRAGMENT",
        ]
        .into_iter()
        .fold(EnumType::new("__DirectiveLocation"), EnumType::with_value)
        .into(),
    ]
}

/// `[name!]!`
fn list_of(name: &str) -> TypeRef {
    TypeRef::non_null(TypeRef::list(TypeRef::named_non_null(name)))
}

/// `[name!]`
fn nullable_list_of(name: &str) -> TypeRef {
    TypeRef::list(TypeRef::named_non_null(name))
}

fn schema_type() -> ObjectType {
    ObjectType::new("__Schema")
        .with_field(
            FieldDef::new("description", TypeRef::named("String")).with_resolver(|_, _, _| Ok(Value::Null)),
        )
        .with_field(FieldDef::new("types", list_of("__Type")).with_resolver(|_, _, ctx| {
            Ok(Value::Array(ctx.schema().types().map(named_type_json).collect()))
        }))
        .with_field(
            FieldDef::new("queryType", TypeRef::named_non_null("__Type")).with_resolver(|_, _, ctx| {
                let schema = ctx.schema();
                Ok(type_json_by_name(schema, schema.query_type_name()))
            }),
        )
        .with_field(FieldDef::new("mutationType", TypeRef::named("__Type")).with_resolver(
            |_, _, ctx| {
                let schema = ctx.schema();
                Ok(schema
                    .mutation_type_name()
                    .map(|name| type_json_by_name(schema, name))
                    .unwrap_or(Value::Null))
            },
        ))
        .with_field(
            FieldDef::new("subscriptionType", TypeRef::named("__Type"))
                .with_resolver(|_, _, _| Ok(Value::Null)),
        )
        .with_field(
            FieldDef::new("directives", list_of("__Directive"))
                .with_resolver(|_, _, ctx| Ok(directives_json(ctx.schema()))),
        )
}

fn include_deprecated_arg() -> ArgumentDef {
    ArgumentDef::new("includeDeprecated", TypeRef::named("Boolean")).with_default(json!(false))
}

fn include_deprecated(args: &Map<String, Value>) -> bool {
    args.get("includeDeprecated")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Named type described by a `__Type` parent value; `None` for wrappers
fn described_type<'s>(ctx: &'s dyn ExecutionContext, parent: &Value) -> Option<&'s TypeDef> {
    let name = parent.get("name").and_then(Value::as_str)?;
    ctx.schema().get_type(name)
}

fn type_type() -> ObjectType {
    ObjectType::new("__Type")
        .with_field(FieldDef::new("kind", TypeRef::named_non_null("__TypeKind")))
        .with_field(FieldDef::new("name", TypeRef::named("String")))
        .with_field(
            FieldDef::new("description", TypeRef::named("String")).with_resolver(|parent, _, ctx| {
                Ok(described_type(ctx, parent)
                    .and_then(TypeDef::description)
                    .map(Value::from)
                    .unwrap_or(Value::Null))
            }),
        )
        .with_field(
            FieldDef::new("fields", nullable_list_of("__Field"))
                .with_argument(include_deprecated_arg())
                .with_resolver(|parent, args, ctx| {
                    let schema = ctx.schema();
                    let Some(fields) = described_type(ctx, parent).and_then(TypeDef::fields) else {
                        return Ok(Value::Null);
                    };
                    let include_deprecated = include_deprecated(args);
                    Ok(Value::Array(
                        fields
                            .values()
                            .filter(|f| !f.name.starts_with("__"))
                            .filter(|f| include_deprecated || f.deprecation_reason.is_none())
                            .map(|f| field_json(schema, f))
                            .collect(),
                    ))
                }),
        )
        .with_field(
            FieldDef::new("interfaces", nullable_list_of("__Type")).with_resolver(|parent, _, ctx| {
                let schema = ctx.schema();
                Ok(match described_type(ctx, parent) {
                    Some(TypeDef::Object(object)) => Value::Array(
                        object
                            .interfaces
                            .iter()
                            .map(|name| type_json_by_name(schema, name))
                            .collect(),
                    ),
                    Some(TypeDef::Interface(_)) => Value::Array(Vec::new()),
                    _ => Value::Null,
                })
            }),
        )
        .with_field(
            FieldDef::new("possibleTypes", nullable_list_of("__Type")).with_resolver(
                |parent, _, ctx| {
                    let schema = ctx.schema();
                    Ok(match described_type(ctx, parent) {
                        Some(ty) if ty.is_abstract() => Value::Array(
                            schema
                                .possible_types(ty.name())
                                .into_iter()
                                .map(|object| type_json_by_name(schema, &object.name))
                                .collect(),
                        ),
                        _ => Value::Null,
                    })
                },
            ),
        )
        .with_field(
            FieldDef::new("enumValues", nullable_list_of("__EnumValue"))
                .with_argument(include_deprecated_arg())
                .with_resolver(|parent, args, ctx| {
                    let Some(TypeDef::Enum(enum_type)) = described_type(ctx, parent) else {
                        return Ok(Value::Null);
                    };
                    let include_deprecated = include_deprecated(args);
                    Ok(Value::Array(
                        enum_type
                            .values
                            .iter()
                            .filter(|v| include_deprecated || v.deprecation_reason.is_none())
                            .map(|v| {
                                json!({
                                    "name": v.name,
                                    "description": v.description,
                                    "isDeprecated": v.deprecation_reason.is_some(),
                                    "deprecationReason": v.deprecation_reason,
                                })
                            })
                            .collect(),
                    ))
                }),
        )
        .with_field(
            FieldDef::new("inputFields", nullable_list_of("__InputValue")).with_resolver(
                |parent, _, ctx| {
                    let schema = ctx.schema();
                    Ok(match described_type(ctx, parent) {
                        Some(TypeDef::InputObject(input)) => Value::Array(
                            input
                                .fields
                                .values()
                                .map(|f| input_value_json(schema, f))
                                .collect(),
                        ),
                        _ => Value::Null,
                    })
                },
            ),
        )
        .with_field(FieldDef::new("ofType", TypeRef::named("__Type")))
}

fn named_type_json(ty: &TypeDef) -> Value {
    json!({ "kind": ty.kind().as_str(), "name": ty.name() })
}

fn type_json_by_name(schema: &Schema, name: &str) -> Value {
    schema
        .get_type(name)
        .map(named_type_json)
        .unwrap_or(Value::Null)
}

fn type_ref_json(schema: &Schema, ty: &TypeRef) -> Value {
    match ty {
        TypeRef::Named(name) => type_json_by_name(schema, name),
        TypeRef::List(inner) => {
            json!({ "kind": "LIST", "name": null, "ofType": type_ref_json(schema, inner) })
        }
        TypeRef::NonNull(inner) => {
            json!({ "kind": "NON_NULL", "name": null, "ofType": type_ref_json(schema, inner) })
        }
    }
}

fn field_json(schema: &Schema, field: &FieldDef) -> Value {
    json!({
        "name": field.name,
        "description": field.description,
        "args": field
            .arguments
            .iter()
            .map(|arg| input_value_json(schema, arg))
            .collect::<Vec<_>>(),
        "type": type_ref_json(schema, &field.ty),
        "isDeprecated": field.deprecation_reason.is_some(),
        "deprecationReason": field.deprecation_reason,
    })
}

fn input_value_json(schema: &Schema, arg: &ArgumentDef) -> Value {
    json!({
        "name": arg.name,
        "description": arg.description,
        "type": type_ref_json(schema, &arg.ty),
        "defaultValue": arg
            .default_value
            .as_ref()
            .map(|value| graphql_literal(schema, Some(&arg.ty), value)),
    })
}

/// Render a JSON value as a GraphQL input literal
/// Render a default value as a GraphQL literal; enum values are unquoted
fn graphql_literal(schema: &Schema, ty: Option<&TypeRef>, value: &Value) -> String {
    let named = match ty {
        Some(TypeRef::NonNull(inner)) => return graphql_literal(schema, Some(inner.as_ref()), value),
        Some(TypeRef::Named(name)) => schema.get_type(name),
        _ => None,
    };
    match value {
        Value::String(s) if matches!(named, Some(TypeDef::Enum(_))) => s.clone(),
        Value::Array(items) => {
            let inner = match ty {
                Some(TypeRef::List(inner)) => Some(inner.as_ref()),
                _ => None,
            };
            let items: Vec<String> = items
                .iter()
                .map(|item| graphql_literal(schema, inner, item))
                .collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(fields) => {
            let input = match named {
                Some(TypeDef::InputObject(input)) => Some(input),
                _ => None,
            };
            let fields: Vec<String> = fields
                .iter()
                .map(|(key, value)| {
                    let field_ty = input.and_then(|t| t.fields.get(key)).map(|f| &f.ty);
                    format!("{}: {}", key, graphql_literal(schema, field_ty, value))
                })
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
        other => other.to_string(),
    }
}

fn directives_json(schema: &Schema) -> Value {
    let condition = ArgumentDef::new("if", TypeRef::named_non_null("Boolean"));
    let locations = ["FIELD", "FRAGMENT_SPREAD", "INLINE_FRAGMENT"];
    json!([
        {
            "name": "include",
            "description": "Directs the executor to include this field or fragment only when the `if` argument is true",
            "locations": locations,
            "args": [input_value_json(schema, &condition)],
            "isRepeatable": false,
        },
        {
            "name": "skip",
            "description": "Directs the executor to skip this field or fragment when the `if` argument is true",
            "locations": locations,
            "args": [input_value_json(schema, &condition)],
            "isRepeatable": false,
        }
    ])
}
