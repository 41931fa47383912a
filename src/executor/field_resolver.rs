//! Field resolution
//!
//! [`resolve_field`] is the unit of work every strategy schedules: resolve one
//! response key of one parent value, then complete the result against the
//! field's declared type, recursing into nested selection sets through the
//! context's strategy. Failures are recorded in the shared error sink and the
//! field becomes null; they never abort sibling fields.

use graphql_parser::query::{Field, SelectionSet};
use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};

use super::utils;
use crate::core::context::{DepthContext, ExecutionContext};
use crate::core::error::{ErrorKind, GraphQLError, PathSegment};
use crate::core::response::ResultNode;
use crate::schema::{ObjectType, TypeDef, TypeRef, scalar};

/// Resolve one response key of `parent`
///
/// `fields` are all selections merged under that key; the first one supplies
/// the arguments and the error location.
pub fn resolve_field(
    ctx: &DepthContext,
    parent_type: &ObjectType,
    parent: &Value,
    fields: &[&Field<'static, String>],
    path: Vec<PathSegment>,
) -> ResultNode {
    let Some(field) = fields.first() else {
        return ResultNode::Null;
    };

    if field.name == "__typename" {
        return ResultNode::Scalar(Value::String(parent_type.name.clone()));
    }

    let Some(field_def) = parent_type.field(&field.name) else {
        return record(
            ctx,
            field,
            path,
            ErrorKind::Validation,
            format!(
                "Field '{}' in type '{}' is undefined",
                field.name, parent_type.name
            ),
        );
    };

    if ctx.is_cancelled() {
        return record(ctx, field, path, ErrorKind::Cancelled, "Execution was cancelled");
    }

    let is_composite = ctx
        .schema()
        .get_type(field_def.ty.base_name())
        .is_some_and(TypeDef::is_composite);
    if is_composite
        && let Some(max_depth) = ctx.max_depth()
        && ctx.current_depth() + 1 > max_depth
    {
        return record(
            ctx,
            field,
            path,
            ErrorKind::DepthLimit,
            format!("Query exceeds the maximum depth of {}", max_depth),
        );
    }
    if parent.is_null() && is_composite {
        return ResultNode::Null;
    }

    let args = match utils::coerce_arguments(ctx.schema(), field_def, field, ctx.variables()) {
        Ok(args) => args,
        Err(message) => return record(ctx, field, path, ErrorKind::Validation, message),
    };

    let resolved = match &field_def.resolver {
        Some(resolver) => {
            match catch_unwind(AssertUnwindSafe(|| resolver.resolve(parent, &args, ctx))) {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!(
                    "Resolver for '{}.{}' panicked",
                    parent_type.name,
                    field_def.name
                )),
            }
        }
        None => Ok(utils::default_resolve(parent, &field.name)),
    };
    ctx.add_complexity(field_def.complexity);

    match resolved {
        Ok(value) => complete_value(ctx, &field_def.ty, fields, value, path),
        Err(e) => {
            tracing::debug!(
                field = %field.name,
                parent_type = %parent_type.name,
                depth = ctx.current_depth(),
                error = %e,
                "Field resolver failed"
            );
            record(ctx, field, path, ErrorKind::Resolution, e.to_string())
        }
    }
}

/// Coerce a resolved value to `ty`, resolving nested selections
fn complete_value(
    ctx: &DepthContext,
    ty: &TypeRef,
    fields: &[&Field<'static, String>],
    value: Value,
    path: Vec<PathSegment>,
) -> ResultNode {
    let field = fields[0];
    match ty {
        TypeRef::NonNull(inner) => {
            if value.is_null() {
                return record(
                    ctx,
                    field,
                    path,
                    ErrorKind::Coercion,
                    format!("Cannot return null for non-nullable field of type '{}'", ty),
                );
            }
            complete_value(ctx, inner, fields, value, path)
        }
        _ if value.is_null() => ResultNode::Null,
        TypeRef::List(inner) => {
            let Value::Array(items) = value else {
                return record(
                    ctx,
                    field,
                    path,
                    ErrorKind::Coercion,
                    format!("Expected a list for type '{}'", ty),
                );
            };
            let nodes = ctx.query_strategy().map_ordered(&items, |index, item| {
                let mut item_path = path.clone();
                item_path.push(PathSegment::Index(index));
                complete_value(ctx, inner, fields, item.clone(), item_path)
            });
            ResultNode::List(nodes)
        }
        TypeRef::Named(name) => match ctx.schema().get_type(name) {
            Some(TypeDef::Scalar(scalar_type)) => match scalar::serialize(scalar_type, &value) {
                Ok(coerced) => ResultNode::Scalar(coerced),
                Err(message) => record(ctx, field, path, ErrorKind::Coercion, message),
            },
            Some(TypeDef::Enum(enum_type)) => match value.as_str() {
                Some(v) if enum_type.has_value(v) => ResultNode::Scalar(value),
                _ => record(
                    ctx,
                    field,
                    path,
                    ErrorKind::Coercion,
                    format!("Enum '{}' cannot represent value {}", name, value),
                ),
            },
            Some(TypeDef::Object(object_type)) => {
                complete_object(ctx, object_type, fields, &value, path)
            }
            Some(abstract_type @ (TypeDef::Interface(_) | TypeDef::Union(_))) => {
                match ctx.schema().resolve_abstract_type(abstract_type, &value) {
                    Some(object_type) => complete_object(ctx, object_type, fields, &value, path),
                    None => record(
                        ctx,
                        field,
                        path,
                        ErrorKind::Coercion,
                        format!("Could not determine the runtime type of '{}'", name),
                    ),
                }
            }
            Some(TypeDef::InputObject(_)) | None => record(
                ctx,
                field,
                path,
                ErrorKind::Coercion,
                format!("Type '{}' is not an output type", name),
            ),
        },
    }
}

/// Execute the merged sub-selections of `fields` one level deeper
fn complete_object(
    ctx: &DepthContext,
    object_type: &ObjectType,
    fields: &[&Field<'static, String>],
    value: &Value,
    path: Vec<PathSegment>,
) -> ResultNode {
    let child = ctx.child();
    let selection_sets: Vec<&SelectionSet<'static, String>> =
        fields.iter().map(|f| &f.selection_set).collect();
    let data = ctx
        .query_strategy()
        .execute(&child, object_type, value, &selection_sets, &path);
    ResultNode::Object(data)
}

fn record(
    ctx: &DepthContext,
    field: &Field<'static, String>,
    path: Vec<PathSegment>,
    kind: ErrorKind,
    message: impl Into<String>,
) -> ResultNode {
    ctx.add_error(
        GraphQLError::new(kind, message)
            .with_path(path)
            .at(field.position),
    );
    ResultNode::Error
}
