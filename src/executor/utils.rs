//! Utility functions for GraphQL execution

use graphql_parser::Pos;
use graphql_parser::query::{
    Directive, Field, OperationDefinition, Selection, SelectionSet, TypeCondition,
    Value as GqlValue, VariableDefinition,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::core::context::ExecutionContext;
use crate::schema::{FieldDef, ObjectType, Schema, TypeDef, TypeRef, scalar};

/// Convert a GraphQL value to JSON, substituting variables
///
/// Variables missing from `variables` become `null`.
pub fn value_to_json(value: &GqlValue<'_, String>, variables: &Map<String, Value>) -> Value {
    match value {
        GqlValue::Null => Value::Null,
        GqlValue::Int(i) => i.as_i64().map(Value::from).unwrap_or(Value::Null),
        GqlValue::Float(f) => Value::from(*f),
        GqlValue::String(s) => Value::String(s.clone()),
        GqlValue::Boolean(b) => Value::Bool(*b),
        GqlValue::Enum(e) => Value::String(e.clone()),
        GqlValue::List(list) => Value::Array(list.iter().map(|v| value_to_json(v, variables)).collect()),
        GqlValue::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v, variables)))
                .collect(),
        ),
        GqlValue::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
    }
}

/// Whether a value literal references any variable
pub fn contains_variable(value: &GqlValue<'_, String>) -> bool {
    match value {
        GqlValue::Variable(_) => true,
        GqlValue::List(list) => list.iter().any(contains_variable),
        GqlValue::Object(obj) => obj.values().any(contains_variable),
        _ => false,
    }
}

/// Convert camelCase to snake_case
pub fn camel_to_snake(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(ch.to_ascii_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

/// Resolver used by fields without one: read the property of the same name,
/// falling back to its snake_case spelling
pub fn default_resolve(parent: &Value, field_name: &str) -> Value {
    let Some(object) = parent.as_object() else {
        return Value::Null;
    };
    object
        .get(field_name)
        .or_else(|| object.get(&camel_to_snake(field_name)))
        .cloned()
        .unwrap_or(Value::Null)
}

// -----------------------------------------------------------------------------
// Operations
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

/// The parts of an operation the executor needs, whatever its form
pub struct OperationParts<'o> {
    pub kind: OperationKind,
    pub name: Option<&'o str>,
    pub variable_definitions: &'o [VariableDefinition<'static, String>],
    pub selection_set: &'o SelectionSet<'static, String>,
    pub position: Pos,
}

pub fn operation_parts<'o>(operation: &'o OperationDefinition<'static, String>) -> OperationParts<'o> {
    match operation {
        OperationDefinition::SelectionSet(set) => OperationParts {
            kind: OperationKind::Query,
            name: None,
            variable_definitions: &[],
            selection_set: set,
            position: set.span.0,
        },
        OperationDefinition::Query(query) => OperationParts {
            kind: OperationKind::Query,
            name: query.name.as_deref(),
            variable_definitions: &query.variable_definitions,
            selection_set: &query.selection_set,
            position: query.position,
        },
        OperationDefinition::Mutation(mutation) => OperationParts {
            kind: OperationKind::Mutation,
            name: mutation.name.as_deref(),
            variable_definitions: &mutation.variable_definitions,
            selection_set: &mutation.selection_set,
            position: mutation.position,
        },
        OperationDefinition::Subscription(subscription) => OperationParts {
            kind: OperationKind::Subscription,
            name: subscription.name.as_deref(),
            variable_definitions: &subscription.variable_definitions,
            selection_set: &subscription.selection_set,
            position: subscription.position,
        },
    }
}

// -----------------------------------------------------------------------------
// Input coercion
// -----------------------------------------------------------------------------

/// Coerce an input value (argument, variable, input field) to `ty`
pub fn coerce_input(schema: &Schema, ty: &TypeRef, value: &Value) -> Result<Value, String> {
    match ty {
        TypeRef::NonNull(inner) => {
            if value.is_null() {
                return Err(format!("Expected non-null value of type '{}'", ty));
            }
            coerce_input(schema, inner, value)
        }
        _ if value.is_null() => Ok(Value::Null),
        TypeRef::List(inner) => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| coerce_input(schema, inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            single => Ok(Value::Array(vec![coerce_input(schema, inner, single)?])),
        },
        TypeRef::Named(name) => match schema.get_type(name) {
            Some(TypeDef::Scalar(s)) => scalar::parse_input(s, value),
            Some(TypeDef::Enum(e)) => match value.as_str() {
                Some(v) if e.has_value(v) => Ok(value.clone()),
                _ => Err(format!("Enum '{}' has no value {}", name, value)),
            },
            Some(TypeDef::InputObject(input)) => {
                let Value::Object(provided) = value else {
                    return Err(format!("Expected an object for input type '{}'", name));
                };
                if let Some(unknown) = provided.keys().find(|k| !input.fields.contains_key(*k)) {
                    return Err(format!("Field '{}' is not defined by type '{}'", unknown, name));
                }
                let mut coerced = Map::new();
                for field in input.fields.values() {
                    match provided.get(&field.name).or(field.default_value.as_ref()) {
                        Some(v) => {
                            let v = coerce_input(schema, &field.ty, v)
                                .map_err(|e| format!("In field '{}': {}", field.name, e))?;
                            coerced.insert(field.name.clone(), v);
                        }
                        None if field.ty.is_non_null() => {
                            return Err(format!(
                                "Field '{}.{}' of required type '{}' was not provided",
                                name, field.name, field.ty
                            ));
                        }
                        None => {}
                    }
                }
                Ok(Value::Object(coerced))
            }
            Some(_) => Err(format!("Type '{}' is not an input type", name)),
            None => Err(format!("Unknown type '{}'", name)),
        },
    }
}

/// Resolve a field's arguments: substitute variables, apply defaults,
/// coerce to the declared types
pub fn coerce_arguments(
    schema: &Schema,
    field_def: &FieldDef,
    field: &Field<'_, String>,
    variables: &Map<String, Value>,
) -> Result<Map<String, Value>, String> {
    let mut args = Map::new();
    for arg_def in &field_def.arguments {
        let provided = field
            .arguments
            .iter()
            .find(|(name, _)| *name == arg_def.name)
            .and_then(|(_, value)| match value {
                GqlValue::Variable(var) if !variables.contains_key(var) => None,
                value => Some(value_to_json(value, variables)),
            });

        match provided.or_else(|| arg_def.default_value.clone()) {
            Some(value) => {
                let value = coerce_input(schema, &arg_def.ty, &value).map_err(|e| {
                    format!("Argument '{}' has an invalid value: {}", arg_def.name, e)
                })?;
                args.insert(arg_def.name.clone(), value);
            }
            None if arg_def.ty.is_non_null() => {
                return Err(format!(
                    "Argument '{}' of required type '{}' was not provided",
                    arg_def.name, arg_def.ty
                ));
            }
            None => {}
        }
    }
    Ok(args)
}

// -----------------------------------------------------------------------------
// Field collection
// -----------------------------------------------------------------------------

/// Evaluate `@skip(if:)` and `@include(if:)`
pub fn should_include(directives: &[Directive<'_, String>], variables: &Map<String, Value>) -> bool {
    let condition = |name: &str| {
        directives
            .iter()
            .find(|d| d.name == name)
            .and_then(|d| d.arguments.iter().find(|(arg, _)| arg == "if"))
            .map(|(_, value)| value_to_json(value, variables).as_bool().unwrap_or(false))
    };
    if condition("skip") == Some(true) {
        return false;
    }
    condition("include") != Some(false)
}

/// Fields sharing one response key, merged
#[derive(Debug)]
pub struct CollectedField<'a> {
    pub response_key: String,
    pub fields: Vec<&'a Field<'static, String>>,
}

/// Flatten selection sets (spreads, inline fragments, directives) into the
/// fields to resolve on `object_type`, grouped by response key in request
/// order
pub fn collect_fields<'a>(
    ctx: &'a dyn ExecutionContext,
    object_type: &ObjectType,
    selection_sets: &[&'a SelectionSet<'static, String>],
) -> Vec<CollectedField<'a>> {
    let mut grouped: IndexMap<String, Vec<&'a Field<'static, String>>> = IndexMap::new();
    let mut visited_fragments = HashSet::new();
    for set in selection_sets {
        collect_into(ctx, object_type, set, &mut grouped, &mut visited_fragments);
    }
    grouped
        .into_iter()
        .map(|(response_key, fields)| CollectedField {
            response_key,
            fields,
        })
        .collect()
}

fn collect_into<'a>(
    ctx: &'a dyn ExecutionContext,
    object_type: &ObjectType,
    set: &'a SelectionSet<'static, String>,
    grouped: &mut IndexMap<String, Vec<&'a Field<'static, String>>>,
    visited_fragments: &mut HashSet<&'a str>,
) {
    let variables = ctx.variables();
    for selection in &set.items {
        match selection {
            Selection::Field(field) => {
                if !should_include(&field.directives, variables) {
                    continue;
                }
                let key = field.alias.as_ref().unwrap_or(&field.name).clone();
                grouped.entry(key).or_default().push(field);
            }
            Selection::FragmentSpread(spread) => {
                if !should_include(&spread.directives, variables)
                    || !visited_fragments.insert(spread.fragment_name.as_str())
                {
                    continue;
                }
                let Some(fragment) = ctx.fragment(&spread.fragment_name) else {
                    continue;
                };
                if !type_condition_applies(ctx.schema(), object_type, Some(&fragment.type_condition)) {
                    continue;
                }
                collect_into(ctx, object_type, &fragment.selection_set, grouped, visited_fragments);
            }
            Selection::InlineFragment(inline) => {
                if !should_include(&inline.directives, variables)
                    || !type_condition_applies(ctx.schema(), object_type, inline.type_condition.as_ref())
                {
                    continue;
                }
                collect_into(ctx, object_type, &inline.selection_set, grouped, visited_fragments);
            }
        }
    }
}

fn type_condition_applies(
    schema: &Schema,
    object_type: &ObjectType,
    condition: Option<&TypeCondition<'_, String>>,
) -> bool {
    match condition {
        None => true,
        Some(TypeCondition::On(name)) => schema.is_possible_type(name, &object_type.name),
    }
}
