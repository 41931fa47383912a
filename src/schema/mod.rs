//! Schema descriptors
//!
//! A [`Schema`] is an explicit description of the types a query can select:
//! object types with their fields, each field carrying its output type,
//! arguments, an optional resolver and a declared complexity weight. It is
//! assembled once (by [`SchemaBuilder`] or [`Schema::from_sdl`]) and then
//! shared read-only across every execution.
//!
//! # Example
//!
//! ```rust,ignore
//! let query = ObjectType::new("Query").with_field(
//!     FieldDef::new("hello", TypeRef::named("String"))
//!         .with_resolver(|_parent, _args, _ctx| Ok(json!("world"))),
//! );
//! let schema = Schema::builder(query).build()?;
//! ```

mod introspection;
pub mod scalar;
mod sdl;

pub use scalar::{DateTimeScalar, ScalarCoercer};
pub use sdl::ResolverRegistry;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::core::context::ExecutionContext;
use crate::core::error::SchemaError;

/// Weight a field contributes to the complexity score unless configured
pub const DEFAULT_FIELD_COMPLEXITY: u64 = 1;

// =============================================================================
// Resolver capabilities
// =============================================================================

/// Computes a field's value from its parent value and resolved arguments
///
/// Implemented for any closure with the matching signature, so resolvers are
/// usually written inline:
///
/// ```rust,ignore
/// FieldDef::new("double", TypeRef::named("Int"))
///     .with_resolver(|parent, _args, _ctx| Ok(json!(parent["n"].as_i64().unwrap_or(0) * 2)))
/// ```
pub trait FieldResolver: Send + Sync {
    fn resolve(
        &self,
        parent: &Value,
        args: &Map<String, Value>,
        ctx: &dyn ExecutionContext,
    ) -> anyhow::Result<Value>;
}

impl<F> FieldResolver for F
where
    F: Fn(&Value, &Map<String, Value>, &dyn ExecutionContext) -> anyhow::Result<Value>
        + Send
        + Sync,
{
    fn resolve(
        &self,
        parent: &Value,
        args: &Map<String, Value>,
        ctx: &dyn ExecutionContext,
    ) -> anyhow::Result<Value> {
        self(parent, args, ctx)
    }
}

/// Picks the concrete object type of a value returned for an interface or
/// union field
///
/// Without one, the value's `__typename` key is used.
pub trait TypeResolver: Send + Sync {
    fn resolve_type(&self, value: &Value) -> Option<String>;
}

impl<F> TypeResolver for F
where
    F: Fn(&Value) -> Option<String> + Send + Sync,
{
    fn resolve_type(&self, value: &Value) -> Option<String> {
        self(value)
    }
}

// =============================================================================
// Type references
// =============================================================================

/// A possibly wrapped reference to a named type: `T`, `[T]`, `T!`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    /// `name!`
    pub fn named_non_null(name: impl Into<String>) -> Self {
        Self::non_null(Self::named(name))
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeRef) -> Self {
        TypeRef::NonNull(Box::new(inner))
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// Name of the innermost named type
    pub fn base_name(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.base_name(),
        }
    }

    pub fn from_ast(ty: &graphql_parser::query::Type<'_, String>) -> Self {
        use graphql_parser::query::Type;
        match ty {
            Type::NamedType(name) => TypeRef::Named(name.clone()),
            Type::ListType(inner) => TypeRef::list(Self::from_ast(inner)),
            Type::NonNullType(inner) => TypeRef::non_null(Self::from_ast(inner)),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

// =============================================================================
// Fields and arguments
// =============================================================================

/// An argument of a field, or a field of an input object
#[derive(Debug, Clone)]
pub struct ArgumentDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub default_value: Option<Value>,
}

impl ArgumentDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            default_value: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// A field of an object or interface type
#[derive(Clone)]
pub struct FieldDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub arguments: Vec<ArgumentDef>,

    /// `None` reads the property of the same name from the parent value
    pub resolver: Option<Arc<dyn FieldResolver>>,

    /// Weight added to the complexity score each time the field resolves
    pub complexity: u64,

    pub deprecation_reason: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            arguments: Vec::new(),
            resolver: None,
            complexity: DEFAULT_FIELD_COMPLEXITY,
            deprecation_reason: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_argument(mut self, argument: ArgumentDef) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_resolver<F>(self, resolver: F) -> Self
    where
        F: Fn(&Value, &Map<String, Value>, &dyn ExecutionContext) -> anyhow::Result<Value>
            + Send
            + Sync
            + 'static,
    {
        self.with_resolver_arc(Arc::new(resolver))
    }

    pub fn with_resolver_arc(mut self, resolver: Arc<dyn FieldResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_complexity(mut self, weight: u64) -> Self {
        self.complexity = weight;
        self
    }

    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.deprecation_reason = Some(reason.into());
        self
    }

    pub fn argument(&self, name: &str) -> Option<&ArgumentDef> {
        self.arguments.iter().find(|arg| arg.name == name)
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("arguments", &self.arguments)
            .field("has_resolver", &self.resolver.is_some())
            .field("complexity", &self.complexity)
            .finish()
    }
}

// =============================================================================
// Named types
// =============================================================================

#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDef>,
    pub interfaces: Vec<String>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
            interfaces: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }
}

#[derive(Clone)]
pub struct InterfaceType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDef>,
    pub type_resolver: Option<Arc<dyn TypeResolver>>,
}

impl InterfaceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
            type_resolver: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn with_type_resolver(mut self, resolver: impl TypeResolver + 'static) -> Self {
        self.type_resolver = Some(Arc::new(resolver));
        self
    }
}

impl fmt::Debug for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceType")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

#[derive(Clone)]
pub struct UnionType {
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<String>,
    pub type_resolver: Option<Arc<dyn TypeResolver>>,
}

impl UnionType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            members: Vec::new(),
            type_resolver: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.members.push(member.into());
        self
    }

    pub fn with_type_resolver(mut self, resolver: impl TypeResolver + 'static) -> Self {
        self.type_resolver = Some(Arc::new(resolver));
        self
    }
}

impl fmt::Debug for UnionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionType")
            .field("name", &self.name)
            .field("members", &self.members)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct EnumValueDef {
    pub name: String,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
}

impl EnumValueDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            deprecation_reason: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<EnumValueDef>,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            values: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_value(self, name: impl Into<String>) -> Self {
        self.with_value_def(EnumValueDef::new(name))
    }

    pub fn with_value_def(mut self, value: EnumValueDef) -> Self {
        self.values.push(value);
        self
    }

    pub fn has_value(&self, name: &str) -> bool {
        self.values.iter().any(|v| v.name == name)
    }
}

#[derive(Clone)]
pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,

    /// Custom coercion; built-in scalars and scalars without one use the
    /// rules in [`scalar`]
    pub coercer: Option<Arc<dyn ScalarCoercer>>,
}

impl ScalarType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            coercer: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_coercer(mut self, coercer: impl ScalarCoercer + 'static) -> Self {
        self.coercer = Some(Arc::new(coercer));
        self
    }

    /// RFC 3339 `DateTime` scalar
    pub fn date_time() -> Self {
        Self::new("DateTime")
            .with_description("An RFC 3339 date-time in UTC")
            .with_coercer(DateTimeScalar)
    }
}

impl fmt::Debug for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarType")
            .field("name", &self.name)
            .field("custom", &self.coercer.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct InputObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, ArgumentDef>,
}

impl InputObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, field: ArgumentDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }
}

/// Introspection kind of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Scalar => "SCALAR",
            TypeKind::Object => "OBJECT",
            TypeKind::Interface => "INTERFACE",
            TypeKind::Union => "UNION",
            TypeKind::Enum => "ENUM",
            TypeKind::InputObject => "INPUT_OBJECT",
        }
    }
}

/// Any named type in a schema
#[derive(Debug, Clone)]
pub enum TypeDef {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Scalar(t) => &t.name,
            TypeDef::Object(t) => &t.name,
            TypeDef::Interface(t) => &t.name,
            TypeDef::Union(t) => &t.name,
            TypeDef::Enum(t) => &t.name,
            TypeDef::InputObject(t) => &t.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            TypeDef::Scalar(t) => t.description.as_deref(),
            TypeDef::Object(t) => t.description.as_deref(),
            TypeDef::Interface(t) => t.description.as_deref(),
            TypeDef::Union(t) => t.description.as_deref(),
            TypeDef::Enum(t) => t.description.as_deref(),
            TypeDef::InputObject(t) => t.description.as_deref(),
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDef::Scalar(_) => TypeKind::Scalar,
            TypeDef::Object(_) => TypeKind::Object,
            TypeDef::Interface(_) => TypeKind::Interface,
            TypeDef::Union(_) => TypeKind::Union,
            TypeDef::Enum(_) => TypeKind::Enum,
            TypeDef::InputObject(_) => TypeKind::InputObject,
        }
    }

    /// Selectable fields (objects and interfaces only)
    pub fn fields(&self) -> Option<&IndexMap<String, FieldDef>> {
        match self {
            TypeDef::Object(t) => Some(&t.fields),
            TypeDef::Interface(t) => Some(&t.fields),
            _ => None,
        }
    }

    /// Scalars and enums
    pub fn is_leaf(&self) -> bool {
        matches!(self, TypeDef::Scalar(_) | TypeDef::Enum(_))
    }

    /// Objects, interfaces and unions
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            TypeDef::Object(_) | TypeDef::Interface(_) | TypeDef::Union(_)
        )
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, TypeDef::Interface(_) | TypeDef::Union(_))
    }

    pub fn is_input(&self) -> bool {
        matches!(
            self,
            TypeDef::Scalar(_) | TypeDef::Enum(_) | TypeDef::InputObject(_)
        )
    }

    pub fn is_output(&self) -> bool {
        !matches!(self, TypeDef::InputObject(_))
    }
}

impl From<ScalarType> for TypeDef {
    fn from(t: ScalarType) -> Self {
        TypeDef::Scalar(t)
    }
}

impl From<ObjectType> for TypeDef {
    fn from(t: ObjectType) -> Self {
        TypeDef::Object(t)
    }
}

impl From<InterfaceType> for TypeDef {
    fn from(t: InterfaceType) -> Self {
        TypeDef::Interface(t)
    }
}

impl From<UnionType> for TypeDef {
    fn from(t: UnionType) -> Self {
        TypeDef::Union(t)
    }
}

impl From<EnumType> for TypeDef {
    fn from(t: EnumType) -> Self {
        TypeDef::Enum(t)
    }
}

impl From<InputObjectType> for TypeDef {
    fn from(t: InputObjectType) -> Self {
        TypeDef::InputObject(t)
    }
}

// =============================================================================
// Schema
// =============================================================================

/// An immutable, validated set of types with a query root and an optional
/// mutation root
#[derive(Debug)]
pub struct Schema {
    types: IndexMap<String, TypeDef>,
    query_type: String,
    mutation_type: Option<String>,
}

impl Schema {
    /// Start a schema whose query root is `query`
    pub fn builder(query: ObjectType) -> SchemaBuilder {
        SchemaBuilder::new(query)
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn object_type(&self, name: &str) -> Option<&ObjectType> {
        match self.types.get(name) {
            Some(TypeDef::Object(object)) => Some(object),
            _ => None,
        }
    }

    /// Every type, in registration order
    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }

    pub fn query_type_name(&self) -> &str {
        &self.query_type
    }

    pub fn mutation_type_name(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    /// Whether `object_name` can be the runtime type of `type_name`
    pub fn is_possible_type(&self, type_name: &str, object_name: &str) -> bool {
        match self.types.get(type_name) {
            Some(TypeDef::Object(object)) => object.name == object_name,
            Some(TypeDef::Union(union)) => union.members.iter().any(|m| m == object_name),
            Some(TypeDef::Interface(_)) => self
                .object_type(object_name)
                .is_some_and(|object| object.interfaces.iter().any(|i| i == type_name)),
            _ => false,
        }
    }

    /// Object types an interface or union can resolve to
    pub fn possible_types(&self, type_name: &str) -> Vec<&ObjectType> {
        self.types
            .values()
            .filter_map(|t| match t {
                TypeDef::Object(object) if self.is_possible_type(type_name, &object.name) => {
                    Some(object)
                }
                _ => None,
            })
            .collect()
    }

    /// Concrete object type of a value returned for an abstract type
    pub fn resolve_abstract_type(&self, abstract_type: &TypeDef, value: &Value) -> Option<&ObjectType> {
        let resolver = match abstract_type {
            TypeDef::Interface(t) => t.type_resolver.as_ref(),
            TypeDef::Union(t) => t.type_resolver.as_ref(),
            _ => return None,
        };
        let type_name = match resolver {
            Some(resolver) => resolver.resolve_type(value),
            None => value
                .get("__typename")
                .and_then(Value::as_str)
                .map(str::to_string),
        }?;
        let object = self.object_type(&type_name)?;
        self.is_possible_type(abstract_type.name(), &object.name)
            .then_some(object)
    }
}

/// Assembles and validates a [`Schema`]
///
/// Built-in scalars (`Int`, `Float`, `String`, `Boolean`, `ID`) and the
/// introspection types are added automatically.
pub struct SchemaBuilder {
    query: ObjectType,
    mutation: Option<ObjectType>,
    types: Vec<TypeDef>,
}

impl SchemaBuilder {
    pub fn new(query: ObjectType) -> Self {
        Self {
            query,
            mutation: None,
            types: Vec::new(),
        }
    }

    pub fn with_mutation(mut self, mutation: ObjectType) -> Self {
        self.mutation = Some(mutation);
        self
    }

    /// Register an additional named type
    pub fn register(mut self, ty: impl Into<TypeDef>) -> Self {
        self.types.push(ty.into());
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let query_type = self.query.name.clone();
        let mutation_type = self.mutation.as_ref().map(|m| m.name.clone());

        let mut query = self.query;
        for field in introspection::meta_fields() {
            query.fields.insert(field.name.clone(), field);
        }

        let mut types: IndexMap<String, TypeDef> = IndexMap::new();
        let declared = std::iter::once(TypeDef::Object(query))
            .chain(self.mutation.map(TypeDef::Object))
            .chain(self.types);
        for ty in declared {
            let name = ty.name().to_string();
            if types.insert(name.clone(), ty).is_some() {
                return Err(SchemaError::DuplicateType(name));
            }
        }

        for scalar in scalar::builtin_scalars() {
            if !types.contains_key(&scalar.name) {
                types.insert(scalar.name.clone(), TypeDef::Scalar(scalar));
            }
        }
        for ty in introspection::introspection_types() {
            let name = ty.name().to_string();
            if types.insert(name.clone(), ty).is_some() {
                return Err(SchemaError::DuplicateType(name));
            }
        }

        let schema = Schema {
            types,
            query_type,
            mutation_type,
        };
        schema.validate()?;

        tracing::debug!(
            types = schema.types.len(),
            query = %schema.query_type,
            "GraphQL schema built"
        );
        Ok(schema)
    }
}

impl Schema {
    fn validate(&self) -> Result<(), SchemaError> {
        for (root, kind) in [
            (Some(self.query_type.as_str()), "query"),
            (self.mutation_type.as_deref(), "mutation"),
        ] {
            if let Some(name) = root
                && self.object_type(name).is_none()
            {
                return Err(SchemaError::MissingRootType(kind.to_string()));
            }
        }

        for ty in self.types.values() {
            match ty {
                TypeDef::Object(object) => {
                    self.validate_fields(&object.name, &object.fields)?;
                    for interface_name in &object.interfaces {
                        self.validate_implementation(object, interface_name)?;
                    }
                }
                TypeDef::Interface(interface) => {
                    self.validate_fields(&interface.name, &interface.fields)?;
                }
                TypeDef::Union(union) => {
                    if union.members.is_empty() {
                        return Err(SchemaError::EmptyType(union.name.clone()));
                    }
                    for member in &union.members {
                        match self.types.get(member) {
                            Some(TypeDef::Object(_)) => {}
                            Some(_) => {
                                return Err(SchemaError::InvalidUnionMember {
                                    union_name: union.name.clone(),
                                    member: member.clone(),
                                });
                            }
                            None => {
                                return Err(SchemaError::UnknownType {
                                    type_name: member.clone(),
                                    referenced_by: format!("union '{}'", union.name),
                                });
                            }
                        }
                    }
                }
                TypeDef::Enum(enum_type) => {
                    if enum_type.values.is_empty() {
                        return Err(SchemaError::EmptyType(enum_type.name.clone()));
                    }
                }
                TypeDef::InputObject(input) => {
                    if input.fields.is_empty() {
                        return Err(SchemaError::EmptyType(input.name.clone()));
                    }
                    for field in input.fields.values() {
                        let used_by = format!("input field '{}.{}'", input.name, field.name);
                        self.validate_input_ref(&field.ty, used_by)?;
                    }
                }
                TypeDef::Scalar(_) => {}
            }
        }
        Ok(())
    }

    fn validate_fields(
        &self,
        type_name: &str,
        fields: &IndexMap<String, FieldDef>,
    ) -> Result<(), SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::EmptyType(type_name.to_string()));
        }
        for field in fields.values() {
            let used_by = format!("field '{}.{}'", type_name, field.name);
            match self.types.get(field.ty.base_name()) {
                None => {
                    return Err(SchemaError::UnknownType {
                        type_name: field.ty.base_name().to_string(),
                        referenced_by: used_by,
                    });
                }
                Some(ty) if !ty.is_output() => {
                    return Err(SchemaError::NotOutputType {
                        type_name: ty.name().to_string(),
                        used_by,
                    });
                }
                Some(_) => {}
            }
            for argument in &field.arguments {
                let used_by = format!(
                    "argument '{}' of field '{}.{}'",
                    argument.name, type_name, field.name
                );
                self.validate_input_ref(&argument.ty, used_by)?;
            }
        }
        Ok(())
    }

    fn validate_input_ref(&self, ty: &TypeRef, used_by: String) -> Result<(), SchemaError> {
        match self.types.get(ty.base_name()) {
            None => Err(SchemaError::UnknownType {
                type_name: ty.base_name().to_string(),
                referenced_by: used_by,
            }),
            Some(def) if !def.is_input() => Err(SchemaError::NotInputType {
                type_name: def.name().to_string(),
                used_by,
            }),
            Some(_) => Ok(()),
        }
    }

    fn validate_implementation(
        &self,
        object: &ObjectType,
        interface_name: &str,
    ) -> Result<(), SchemaError> {
        let interface = match self.types.get(interface_name) {
            Some(TypeDef::Interface(interface)) => interface,
            Some(_) => {
                return Err(SchemaError::InvalidInterface {
                    type_name: object.name.clone(),
                    interface: interface_name.to_string(),
                    reason: "not an interface type".to_string(),
                });
            }
            None => {
                return Err(SchemaError::UnknownType {
                    type_name: interface_name.to_string(),
                    referenced_by: format!("type '{}'", object.name),
                });
            }
        };
        for field in interface.fields.values() {
            let Some(own) = object.field(&field.name) else {
                return Err(SchemaError::InvalidInterface {
                    type_name: object.name.clone(),
                    interface: interface.name.clone(),
                    reason: format!("missing field '{}'", field.name),
                });
            };
            if own.ty.base_name() != field.ty.base_name()
                && !self.is_possible_type(field.ty.base_name(), own.ty.base_name())
            {
                return Err(SchemaError::InvalidInterface {
                    type_name: object.name.clone(),
                    interface: interface.name.clone(),
                    reason: format!(
                        "field '{}' has type '{}' but the interface declares '{}'",
                        field.name, own.ty, field.ty
                    ),
                });
            }
        }
        Ok(())
    }
}
