//! Document validation
//!
//! Everything that can be rejected without running a resolver is rejected
//! here: operation selection, variable coercion, unknown fields, arguments,
//! fragments and types, leaf/composite selection shape, fragments that can
//! never apply, and response keys that would merge different fields. Any
//! error aborts the execution before it starts.

use graphql_parser::Pos;
use graphql_parser::query::{
    Definition, Directive, Document, Field, OperationDefinition, Selection, SelectionSet,
    TypeCondition, Value as GqlValue,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashSet;

use super::utils::{self, OperationKind};
use crate::core::context::FragmentTable;
use crate::core::error::GraphQLError;
use crate::schema::{Schema, TypeDef, TypeRef};

/// An operation that passed validation, ready to execute
#[derive(Debug)]
pub struct PreparedOperation {
    pub operation: OperationDefinition<'static, String>,
    pub fragments: FragmentTable,

    /// Coerced variable values, defaults applied
    pub variables: Map<String, Value>,

    pub kind: OperationKind,

    /// Name of the root object type the operation selects from
    pub root_type: String,
}

/// Select, validate and prepare the operation to run from a parsed document
pub fn prepare(
    schema: &Schema,
    document: Document<'static, String>,
    operation_name: Option<&str>,
    variables: &Map<String, Value>,
) -> Result<PreparedOperation, Vec<GraphQLError>> {
    let mut errors = Vec::new();
    let mut operations = Vec::new();
    let mut fragments = FragmentTable::new();

    for definition in document.definitions {
        match definition {
            Definition::Operation(operation) => operations.push(operation),
            Definition::Fragment(fragment) => {
                if fragments.contains_key(&fragment.name) {
                    errors.push(GraphQLError::validation(
                        format!("There can be only one fragment named '{}'", fragment.name),
                        Some(fragment.position),
                    ));
                    continue;
                }
                fragments.insert(fragment.name.clone(), fragment);
            }
        }
    }

    let operation = select_operation(operations, operation_name).map_err(|e| vec![e])?;
    let parts = utils::operation_parts(&operation);

    let root_type = match parts.kind {
        OperationKind::Query => schema.query_type_name().to_string(),
        OperationKind::Mutation => match schema.mutation_type_name() {
            Some(name) => name.to_string(),
            None => {
                return Err(vec![GraphQLError::validation(
                    "Schema is not configured for mutations",
                    Some(parts.position),
                )]);
            }
        },
        OperationKind::Subscription => {
            return Err(vec![GraphQLError::validation(
                "Subscriptions are not supported",
                Some(parts.position),
            )]);
        }
    };

    let coerced = coerce_variables(schema, &parts, variables, &mut errors);

    let mut validator = Validator {
        schema,
        fragments: &fragments,
        defined_variables: parts
            .variable_definitions
            .iter()
            .map(|def| def.name.as_str())
            .collect(),
        validated_fragments: HashSet::new(),
        fragment_stack: Vec::new(),
        errors: &mut errors,
    };
    if let Some(root) = schema.get_type(&root_type) {
        validator.validate_selection_set(parts.selection_set, root);
        validator.check_field_merging(&[parts.selection_set], root);
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let kind = parts.kind;
    Ok(PreparedOperation {
        operation,
        fragments,
        variables: coerced,
        kind,
        root_type,
    })
}

fn select_operation(
    mut operations: Vec<OperationDefinition<'static, String>>,
    operation_name: Option<&str>,
) -> Result<OperationDefinition<'static, String>, GraphQLError> {
    match operation_name {
        Some(name) => {
            let index = operations
                .iter()
                .position(|op| utils::operation_parts(op).name == Some(name))
                .ok_or_else(|| {
                    GraphQLError::validation(format!("Unknown operation named '{}'", name), None)
                })?;
            Ok(operations.swap_remove(index))
        }
        None => match operations.len() {
            0 => Err(GraphQLError::validation("No operation found in query", None)),
            1 => Ok(operations.remove(0)),
            _ => Err(GraphQLError::validation(
                "Must provide operation name if query contains multiple operations",
                None,
            )),
        },
    }
}

fn coerce_variables(
    schema: &Schema,
    parts: &utils::OperationParts<'_>,
    provided: &Map<String, Value>,
    errors: &mut Vec<GraphQLError>,
) -> Map<String, Value> {
    let mut coerced = Map::new();
    for definition in parts.variable_definitions {
        let ty = TypeRef::from_ast(&definition.var_type);
        match schema.get_type(ty.base_name()) {
            Some(def) if def.is_input() => {}
            Some(_) => {
                errors.push(GraphQLError::validation(
                    format!(
                        "Variable '${}' cannot be of non-input type '{}'",
                        definition.name, ty
                    ),
                    Some(definition.position),
                ));
                continue;
            }
            None => {
                errors.push(GraphQLError::validation(
                    format!("Unknown type '{}'", ty.base_name()),
                    Some(definition.position),
                ));
                continue;
            }
        }

        let value = provided.get(&definition.name).cloned().or_else(|| {
            definition
                .default_value
                .as_ref()
                .map(|v| utils::value_to_json(v, &Map::new()))
        });
        match value {
            Some(value) => match utils::coerce_input(schema, &ty, &value) {
                Ok(value) => {
                    coerced.insert(definition.name.clone(), value);
                }
                Err(message) => errors.push(GraphQLError::validation(
                    format!(
                        "Variable '${}' got invalid value {}; {}",
                        definition.name, value, message
                    ),
                    Some(definition.position),
                )),
            },
            None if ty.is_non_null() => errors.push(GraphQLError::validation(
                format!(
                    "Variable '${}' of required type '{}' was not provided",
                    definition.name, ty
                ),
                Some(definition.position),
            )),
            None => {}
        }
    }
    coerced
}

/// Fields selected under one response key, with the type each was selected on
type FieldGroups<'a> = IndexMap<&'a str, Vec<(&'a TypeDef, &'a Field<'static, String>)>>;

struct Validator<'a> {
    schema: &'a Schema,
    fragments: &'a FragmentTable,
    defined_variables: HashSet<&'a str>,
    validated_fragments: HashSet<&'a str>,
    fragment_stack: Vec<&'a str>,
    errors: &'a mut Vec<GraphQLError>,
}

impl<'a> Validator<'a> {
    fn error(&mut self, message: String, pos: Pos) {
        self.errors.push(GraphQLError::validation(message, Some(pos)));
    }

    fn validate_selection_set(&mut self, set: &'a SelectionSet<'static, String>, parent: &'a TypeDef) {
        for selection in &set.items {
            match selection {
                Selection::Field(field) => {
                    self.validate_directives(&field.directives);
                    if field.name == "__typename" {
                        if !field.selection_set.items.is_empty() {
                            self.error(
                                "Field '__typename' must not have a selection since type 'String!' has no subfields".to_string(),
                                field.position,
                            );
                        }
                        continue;
                    }

                    let Some(field_def) = parent.fields().and_then(|fields| fields.get(&field.name))
                    else {
                        self.error(
                            format!("Field '{}' in type '{}' is undefined", field.name, parent.name()),
                            field.position,
                        );
                        continue;
                    };

                    for (name, value) in &field.arguments {
                        self.validate_variable_uses(value, field.position);
                        let Some(arg_def) = field_def.argument(name) else {
                            self.error(
                                format!(
                                    "Unknown argument '{}' on field '{}.{}'",
                                    name,
                                    parent.name(),
                                    field.name
                                ),
                                field.position,
                            );
                            continue;
                        };
                        if !utils::contains_variable(value) {
                            let literal = utils::value_to_json(value, &Map::new());
                            if let Err(message) = utils::coerce_input(self.schema, &arg_def.ty, &literal) {
                                self.error(
                                    format!(
                                        "Argument '{}' on field '{}.{}' has an invalid value: {}",
                                        name,
                                        parent.name(),
                                        field.name,
                                        message
                                    ),
                                    field.position,
                                );
                            }
                        }
                    }
                    for arg_def in &field_def.arguments {
                        let provided = field.arguments.iter().any(|(name, _)| *name == arg_def.name);
                        if !provided && arg_def.ty.is_non_null() && arg_def.default_value.is_none() {
                            self.error(
                                format!(
                                    "Field '{}.{}' argument '{}' of type '{}' is required but not provided",
                                    parent.name(),
                                    field.name,
                                    arg_def.name,
                                    arg_def.ty
                                ),
                                field.position,
                            );
                        }
                    }

                    let Some(field_type) = self.schema.get_type(field_def.ty.base_name()) else {
                        continue;
                    };
                    let has_selection = !field.selection_set.items.is_empty();
                    if field_type.is_leaf() && has_selection {
                        self.error(
                            format!(
                                "Field '{}' must not have a selection since type '{}' has no subfields",
                                field.name, field_def.ty
                            ),
                            field.position,
                        );
                    } else if field_type.is_composite() && !has_selection {
                        self.error(
                            format!(
                                "Field '{}' of type '{}' must have a selection of subfields",
                                field.name, field_def.ty
                            ),
                            field.position,
                        );
                    } else if field_type.is_composite() {
                        self.validate_selection_set(&field.selection_set, field_type);
                    }
                }
                Selection::FragmentSpread(spread) => {
                    self.validate_directives(&spread.directives);
                    let name = spread.fragment_name.as_str();
                    let Some(fragment) = self.fragments.get(name) else {
                        self.error(format!("Unknown fragment '{}'", name), spread.position);
                        continue;
                    };
                    let TypeCondition::On(condition) = &fragment.type_condition;
                    if !self.can_spread(parent, condition) {
                        self.error(
                            format!(
                                "Fragment '{}' cannot be spread here as objects of type '{}' can never be of type '{}'",
                                name,
                                parent.name(),
                                condition
                            ),
                            spread.position,
                        );
                        continue;
                    }
                    if self.fragment_stack.contains(&name) {
                        self.error(
                            format!("Cannot spread fragment '{}' within itself", name),
                            spread.position,
                        );
                        continue;
                    }
                    if !self.validated_fragments.insert(name) {
                        continue;
                    }
                    if let Some(condition_type) =
                        self.condition_type(&fragment.type_condition, fragment.position)
                    {
                        self.fragment_stack.push(name);
                        self.validate_selection_set(&fragment.selection_set, condition_type);
                        self.fragment_stack.pop();
                    }
                }
                Selection::InlineFragment(inline) => {
                    self.validate_directives(&inline.directives);
                    let target = match &inline.type_condition {
                        Some(condition) => self.condition_type(condition, inline.position),
                        None => Some(parent),
                    };
                    let Some(target) = target else {
                        continue;
                    };
                    if !self.can_spread(parent, target.name()) {
                        self.error(
                            format!(
                                "Fragment cannot be spread here as objects of type '{}' can never be of type '{}'",
                                parent.name(),
                                target.name()
                            ),
                            inline.position,
                        );
                        continue;
                    }
                    self.validate_selection_set(&inline.selection_set, target);
                }
            }
        }
    }

    fn condition_type(
        &mut self,
        condition: &TypeCondition<'static, String>,
        pos: Pos,
    ) -> Option<&'a TypeDef> {
        let TypeCondition::On(name) = condition;
        match self.schema.get_type(name) {
            Some(ty) if ty.is_composite() => Some(ty),
            Some(_) => {
                self.error(
                    format!("Fragment cannot condition on non composite type '{}'", name),
                    pos,
                );
                None
            }
            None => {
                self.error(format!("Unknown type '{}'", name), pos);
                None
            }
        }
    }

    /// Whether a fragment on `condition` can ever apply inside `parent`;
    /// unknown and non-composite conditions are reported elsewhere
    fn can_spread(&self, parent: &TypeDef, condition: &str) -> bool {
        if parent.name() == condition
            || !self.schema.get_type(condition).is_some_and(TypeDef::is_composite)
        {
            return true;
        }
        self.schema
            .possible_types(parent.name())
            .iter()
            .any(|object| self.schema.is_possible_type(condition, &object.name))
    }

    /// Reject response keys shared by different fields, or by the same field
    /// with different arguments, on types that can apply together
    fn check_field_merging(&mut self, sets: &[&'a SelectionSet<'static, String>], parent: &'a TypeDef) {
        let mut groups = FieldGroups::new();
        let mut visited = HashSet::new();
        for set in sets {
            self.gather_fields(set, parent, &mut groups, &mut visited);
        }

        for (key, fields) in groups {
            if let Some((first, second)) = find_conflict(&fields) {
                let reason = if first.name != second.name {
                    format!("'{}' and '{}' are different fields", first.name, second.name)
                } else {
                    "they have differing arguments".to_string()
                };
                self.error(
                    format!(
                        "Fields '{}' conflict because {}. Use different aliases on the fields to fetch both if this was intentional",
                        key, reason
                    ),
                    second.position,
                );
                continue;
            }

            let (first_parent, first) = fields[0];
            let Some(field_def) = first_parent.fields().and_then(|defs| defs.get(&first.name)) else {
                continue;
            };
            let Some(field_type) = self.schema.get_type(field_def.ty.base_name()) else {
                continue;
            };
            if !field_type.is_composite() {
                continue;
            }
            let sub_sets: Vec<&'a SelectionSet<'static, String>> = fields
                .iter()
                .filter(|(parent, field)| {
                    parent
                        .fields()
                        .and_then(|defs| defs.get(&field.name))
                        .is_some_and(|def| def.ty.base_name() == field_type.name())
                })
                .map(|&(_, field)| &field.selection_set)
                .collect();
            self.check_field_merging(&sub_sets, field_type);
        }
    }

    fn gather_fields(
        &self,
        set: &'a SelectionSet<'static, String>,
        parent: &'a TypeDef,
        groups: &mut FieldGroups<'a>,
        visited: &mut HashSet<&'a str>,
    ) {
        for selection in &set.items {
            match selection {
                Selection::Field(field) => {
                    let key = field.alias.as_deref().unwrap_or(field.name.as_str());
                    groups.entry(key).or_default().push((parent, field));
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.fragment_name.as_str();
                    if !visited.insert(name) {
                        continue;
                    }
                    if let Some(fragment) = self.fragments.get(name)
                        && let Some(target) = self.composite_type(&fragment.type_condition)
                    {
                        self.gather_fields(&fragment.selection_set, target, groups, visited);
                    }
                }
                Selection::InlineFragment(inline) => {
                    let target = match &inline.type_condition {
                        Some(condition) => self.composite_type(condition),
                        None => Some(parent),
                    };
                    if let Some(target) = target {
                        self.gather_fields(&inline.selection_set, target, groups, visited);
                    }
                }
            }
        }
    }

    fn composite_type(&self, condition: &TypeCondition<'static, String>) -> Option<&'a TypeDef> {
        let TypeCondition::On(name) = condition;
        self.schema.get_type(name).filter(|ty| ty.is_composite())
    }

    fn validate_directives(&mut self, directives: &[Directive<'static, String>]) {
        for directive in directives {
            for (_, value) in &directive.arguments {
                self.validate_variable_uses(value, directive.position);
            }
        }
    }

    fn validate_variable_uses(&mut self, value: &GqlValue<'static, String>, pos: Pos) {
        match value {
            GqlValue::Variable(name) if !self.defined_variables.contains(name.as_str()) => {
                self.error(format!("Variable '${}' is not defined", name), pos);
            }
            GqlValue::List(items) => {
                for item in items {
                    self.validate_variable_uses(item, pos);
                }
            }
            GqlValue::Object(fields) => {
                for item in fields.values() {
                    self.validate_variable_uses(item, pos);
                }
            }
            _ => {}
        }
    }
}

/// First pair of fields under one key that cannot be merged. Fields selected
/// on two different object types never apply together and may differ.
fn find_conflict<'f>(
    fields: &[(&TypeDef, &'f Field<'static, String>)],
) -> Option<(&'f Field<'static, String>, &'f Field<'static, String>)> {
    for (index, (parent, field)) in fields.iter().enumerate() {
        for (other_parent, other) in &fields[index + 1..] {
            let exclusive = parent.name() != other_parent.name()
                && matches!(parent, TypeDef::Object(_))
                && matches!(other_parent, TypeDef::Object(_));
            if !exclusive && (field.name != other.name || !same_arguments(field, other)) {
                return Some((*field, *other));
            }
        }
    }
    None
}

fn same_arguments(a: &Field<'static, String>, b: &Field<'static, String>) -> bool {
    a.arguments.len() == b.arguments.len()
        && a
            .arguments
            .iter()
            .all(|(name, value)| b.arguments.iter().any(|(other, v)| other == name && v == value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ArgumentDef, FieldDef, ObjectType};
    use graphql_parser::query::parse_query;
    use serde_json::json;

    fn schema() -> Schema {
        let todo = ObjectType::new("Todo")
            .with_field(FieldDef::new("id", TypeRef::named_non_null("ID")))
            .with_field(FieldDef::new("text", TypeRef::named("String")));
        let query = ObjectType::new("Query")
            .with_field(
                FieldDef::new("todo", TypeRef::named("Todo"))
                    .with_argument(ArgumentDef::new("id", TypeRef::named_non_null("ID"))),
            )
            .with_field(
                FieldDef::new("todos", TypeRef::list(TypeRef::named("Todo")))
                    .with_argument(ArgumentDef::new("first", TypeRef::named("Int")).with_default(json!(10))),
            );
        Schema::builder(query).register(todo).build().expect("schema should build")
    }

    fn messages(query: &str, operation_name: Option<&str>, variables: Map<String, Value>) -> Vec<String> {
        let document = parse_query::<String>(query).expect("query should parse").into_static();
        match prepare(&schema(), document, operation_name, &variables) {
            Ok(_) => Vec::new(),
            Err(errors) => errors.into_iter().map(|e| e.message).collect(),
        }
    }

    #[test]
    fn test_valid_query_is_prepared() {
        let document = parse_query::<String>(
            "query Q($id: ID!) { todo(id: $id) { ...F } } fragment F on Todo { id text }",
        )
        .expect("query should parse")
        .into_static();
        let mut variables = Map::new();
        variables.insert("id".to_string(), json!(7));

        let prepared = prepare(&schema(), document, None, &variables).expect("should validate");
        assert_eq!(prepared.kind, OperationKind::Query);
        assert_eq!(prepared.root_type, "Query");
        assert_eq!(prepared.variables.get("id"), Some(&json!("7")));
        assert!(prepared.fragments.contains_key("F"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let errors = messages("{ todos { id title } }", None, Map::new());
        assert_eq!(errors, vec!["Field 'title' in type 'Todo' is undefined"]);
    }

    #[test]
    fn test_selection_shape_is_checked() {
        let errors = messages("{ todos todo(id: 1) { id { x } } }", None, Map::new());
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("must have a selection of subfields"));
        assert!(errors[1].contains("must not have a selection"));
    }

    #[test]
    fn test_arguments_are_checked() {
        let errors = messages("{ todo { id } todos(first: \"x\", last: 2) { id } }", None, Map::new());
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("argument 'id' of type 'ID!' is required"));
        assert!(errors[1].contains("Argument 'first'"));
        assert!(errors[2].contains("Unknown argument 'last'"));
    }

    #[test]
    fn test_operation_selection() {
        let query = "query A { todos { id } } query B { todos { text } }";
        assert_eq!(
            messages(query, None, Map::new()),
            vec!["Must provide operation name if query contains multiple operations"]
        );
        assert!(messages(query, Some("B"), Map::new()).is_empty());
        assert_eq!(messages(query, Some("C"), Map::new()), vec!["Unknown operation named 'C'"]);
        assert_eq!(
            messages("fragment F on Todo { id }", None, Map::new()),
            vec!["No operation found in query"]
        );
    }

    #[test]
    fn test_mutations_and_subscriptions_are_rejected_when_unsupported() {
        assert_eq!(
            messages("mutation { todos { id } }", None, Map::new()),
            vec!["Schema is not configured for mutations"]
        );
        assert_eq!(
            messages("subscription { todos { id } }", None, Map::new()),
            vec!["Subscriptions are not supported"]
        );
    }

    #[test]
    fn test_variables_are_checked() {
        assert_eq!(
            messages("query Q($id: ID!) { todo(id: $id) { id } }", None, Map::new()),
            vec!["Variable '$id' of required type 'ID!' was not provided"]
        );
        assert_eq!(
            messages("{ todo(id: $id) { id } }", None, Map::new()),
            vec!["Variable '$id' is not defined"]
        );

        let mut variables = Map::new();
        variables.insert("n".to_string(), json!("ten"));
        let errors = messages("query Q($n: Int) { todos(first: $n) { id } }", None, variables);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Variable '$n' got invalid value"));
    }

    #[test]
    fn test_fragment_errors() {
        assert_eq!(
            messages("{ todos { ...Missing } }", None, Map::new()),
            vec!["Unknown fragment 'Missing'"]
        );
        let errors = messages(
            "{ todos { ...A } } fragment A on Todo { ...B } fragment B on Todo { ...A }",
            None,
            Map::new(),
        );
        assert_eq!(errors, vec!["Cannot spread fragment 'A' within itself"]);
        assert_eq!(
            messages("{ todos { ... on Ghost { id } } }", None, Map::new()),
            vec!["Unknown type 'Ghost'"]
        );
    }

    #[test]
    fn test_overlapping_fields_must_merge() {
        assert!(messages("{ todos { id } todos { id text } }", None, Map::new()).is_empty());
        assert!(
            messages("{ todos(first: 1) { id } ...F } fragment F on Query { todos(first: 1) { text } }", None, Map::new())
                .is_empty()
        );

        let errors = messages("{ todos { a: id a: text } }", None, Map::new());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Fields 'a' conflict because 'id' and 'text' are different fields"));

        let errors = messages("{ todo(id: 1) { id } todo(id: 2) { id } }", None, Map::new());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("differing arguments"));
    }

    #[test]
    fn test_fragments_must_be_applicable() {
        assert_eq!(
            messages("{ todos { ...Q } } fragment Q on Query { todos { id } }", None, Map::new()),
            vec!["Fragment 'Q' cannot be spread here as objects of type 'Todo' can never be of type 'Query'"]
        );
        assert!(messages("{ todos { ... on Todo { id } } }", None, Map::new()).is_empty());
    }

    #[test]
    fn test_errors_carry_locations() {
        let document = parse_query::<String>("{\n  todos { nope }\n}")
            .expect("query should parse")
            .into_static();
        let errors = prepare(&schema(), document, None, &Map::new()).expect_err("should fail");
        assert_eq!(errors[0].locations.len(), 1);
        assert_eq!(errors[0].locations[0].line, 2);
    }
}
