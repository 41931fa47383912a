//! Schema loading from SDL
//!
//! Type definitions come from an SDL document, resolvers from a
//! [`ResolverRegistry`]. Field weights are declared with
//! `@complexity(weight: N)`; `@deprecated(reason: "...")` is honoured on
//! fields and enum values. A `DateTime` scalar without a registered coercer
//! gets [`DateTimeScalar`](super::DateTimeScalar).
//!
//! ```rust,ignore
//! let schema = Schema::from_sdl(
//!     "type Query { answer: Int @complexity(weight: 3) }",
//!     ResolverRegistry::new().field("Query", "answer", |_, _, _| Ok(json!(42))),
//! )?;
//! ```

use graphql_parser::schema::{self, Definition, Directive, TypeDefinition};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::{
    ArgumentDef, EnumType, EnumValueDef, FieldDef, FieldResolver, InputObjectType, InterfaceType,
    ObjectType, ScalarCoercer, ScalarType, Schema, SchemaBuilder, TypeDef, TypeRef, TypeResolver,
    UnionType,
};
use crate::core::context::ExecutionContext;
use crate::core::error::SchemaError;
use crate::executor::utils::value_to_json;

/// Resolvers, type resolvers and scalar coercers to attach to SDL types
#[derive(Default)]
pub struct ResolverRegistry {
    fields: HashMap<(String, String), Arc<dyn FieldResolver>>,
    type_resolvers: HashMap<String, Arc<dyn TypeResolver>>,
    scalars: HashMap<String, Arc<dyn ScalarCoercer>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the resolver of `type_name.field_name`
    pub fn field<F>(mut self, type_name: &str, field_name: &str, resolver: F) -> Self
    where
        F: Fn(&Value, &Map<String, Value>, &dyn ExecutionContext) -> anyhow::Result<Value>
            + Send
            + Sync
            + 'static,
    {
        self.fields.insert(
            (type_name.to_string(), field_name.to_string()),
            Arc::new(resolver),
        );
        self
    }

    /// Register the runtime type resolver of an interface or union
    pub fn type_resolver(mut self, type_name: &str, resolver: impl TypeResolver + 'static) -> Self {
        self.type_resolvers
            .insert(type_name.to_string(), Arc::new(resolver));
        self
    }

    pub fn scalar(mut self, type_name: &str, coercer: impl ScalarCoercer + 'static) -> Self {
        self.scalars.insert(type_name.to_string(), Arc::new(coercer));
        self
    }
}

impl Schema {
    /// Build a schema from SDL type definitions and a resolver registry
    pub fn from_sdl(sdl: &str, registry: ResolverRegistry) -> Result<Schema, SchemaError> {
        let document = schema::parse_schema::<String>(sdl)
            .map_err(|e| SchemaError::Sdl(e.to_string()))?;

        let mut query_name = "Query".to_string();
        let mut mutation_name: Option<String> = None;
        let mut types: Vec<TypeDef> = Vec::new();

        for definition in &document.definitions {
            match definition {
                Definition::SchemaDefinition(def) => {
                    if let Some(query) = &def.query {
                        query_name = query.clone();
                    }
                    mutation_name = def.mutation.clone();
                }
                Definition::TypeDefinition(def) => types.push(convert_type(def, &registry)),
                Definition::TypeExtension(_) => {
                    return Err(SchemaError::Sdl(
                        "type extensions are not supported".to_string(),
                    ));
                }
                Definition::DirectiveDefinition(_) => {}
            }
        }

        let mutation_name = mutation_name.or_else(|| {
            types
                .iter()
                .any(|t| matches!(t, TypeDef::Object(o) if o.name == "Mutation"))
                .then(|| "Mutation".to_string())
        });

        let query = take_object(&mut types, &query_name)
            .ok_or_else(|| SchemaError::MissingRootType("query".to_string()))?;
        let mut builder = SchemaBuilder::new(query);
        if let Some(name) = mutation_name {
            let mutation = take_object(&mut types, &name)
                .ok_or_else(|| SchemaError::MissingRootType("mutation".to_string()))?;
            builder = builder.with_mutation(mutation);
        }
        types
            .into_iter()
            .fold(builder, SchemaBuilder::register)
            .build()
    }
}

fn take_object(types: &mut Vec<TypeDef>, name: &str) -> Option<ObjectType> {
    let index = types
        .iter()
        .position(|t| matches!(t, TypeDef::Object(o) if o.name == name))?;
    match types.remove(index) {
        TypeDef::Object(object) => Some(object),
        _ => None,
    }
}

fn convert_type(def: &TypeDefinition<'_, String>, registry: &ResolverRegistry) -> TypeDef {
    match def {
        TypeDefinition::Scalar(scalar) => {
            let mut ty = match registry.scalars.get(&scalar.name) {
                Some(coercer) => ScalarType {
                    coercer: Some(coercer.clone()),
                    ..ScalarType::new(scalar.name.clone())
                },
                None if scalar.name == "DateTime" => ScalarType::date_time(),
                None => ScalarType::new(scalar.name.clone()),
            };
            if let Some(description) = &scalar.description {
                ty.description = Some(description.clone());
            }
            ty.into()
        }
        TypeDefinition::Object(object) => {
            let mut ty = ObjectType::new(object.name.clone());
            ty.description = object.description.clone();
            ty.interfaces = object.implements_interfaces.clone();
            object
                .fields
                .iter()
                .map(|f| convert_field(&object.name, f, registry))
                .fold(ty, ObjectType::with_field)
                .into()
        }
        TypeDefinition::Interface(interface) => {
            let mut ty = InterfaceType::new(interface.name.clone());
            ty.description = interface.description.clone();
            ty.type_resolver = registry.type_resolvers.get(&interface.name).cloned();
            interface
                .fields
                .iter()
                .map(|f| convert_field(&interface.name, f, registry))
                .fold(ty, InterfaceType::with_field)
                .into()
        }
        TypeDefinition::Union(union) => {
            let mut ty = UnionType::new(union.name.clone());
            ty.description = union.description.clone();
            ty.members = union.types.clone();
            ty.type_resolver = registry.type_resolvers.get(&union.name).cloned();
            ty.into()
        }
        TypeDefinition::Enum(enum_type) => {
            let mut ty = EnumType::new(enum_type.name.clone());
            ty.description = enum_type.description.clone();
            enum_type
                .values
                .iter()
                .map(|v| EnumValueDef {
                    name: v.name.clone(),
                    description: v.description.clone(),
                    deprecation_reason: deprecation_reason(&v.directives),
                })
                .fold(ty, EnumType::with_value_def)
                .into()
        }
        TypeDefinition::InputObject(input) => {
            let mut ty = InputObjectType::new(input.name.clone());
            ty.description = input.description.clone();
            input
                .fields
                .iter()
                .map(convert_input_value)
                .fold(ty, InputObjectType::with_field)
                .into()
        }
    }
}

fn convert_field(
    type_name: &str,
    field: &schema::Field<'_, String>,
    registry: &ResolverRegistry,
) -> FieldDef {
    let mut def = FieldDef::new(field.name.clone(), TypeRef::from_ast(&field.field_type));
    def.description = field.description.clone();
    def.arguments = field.arguments.iter().map(convert_input_value).collect();
    def.resolver = registry
        .fields
        .get(&(type_name.to_string(), field.name.clone()))
        .cloned();
    def.deprecation_reason = deprecation_reason(&field.directives);
    if let Some(weight) = directive_argument(&field.directives, "complexity", "weight")
        .and_then(|v| v.as_u64())
    {
        def.complexity = weight;
    }
    def
}

fn convert_input_value(value: &schema::InputValue<'_, String>) -> ArgumentDef {
    ArgumentDef {
        name: value.name.clone(),
        description: value.description.clone(),
        ty: TypeRef::from_ast(&value.value_type),
        default_value: value
            .default_value
            .as_ref()
            .map(|v| value_to_json(v, &Map::new())),
    }
}

fn directive_argument(
    directives: &[Directive<'_, String>],
    directive: &str,
    argument: &str,
) -> Option<Value> {
    directives
        .iter()
        .find(|d| d.name == directive)?
        .arguments
        .iter()
        .find(|(name, _)| name == argument)
        .map(|(_, value)| value_to_json(value, &Map::new()))
}

fn deprecation_reason(directives: &[Directive<'_, String>]) -> Option<String> {
    directives.iter().find(|d| d.name == "deprecated")?;
    Some(
        directive_argument(directives, "deprecated", "reason")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "No longer supported".to_string()),
    )
}
