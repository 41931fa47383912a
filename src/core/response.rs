//! Result nodes and the result bundle returned by an execution

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::error::{ExecutorError, GraphQLError};

/// The value produced for one field, merged bottom-up into the data graph
#[derive(Debug, Clone, PartialEq)]
pub enum ResultNode {
    /// A coerced leaf value
    Scalar(Value),

    /// List elements in source order
    List(Vec<ResultNode>),

    /// Response key → node, in the order the query requested them
    Object(IndexMap<String, ResultNode>),

    Null,

    /// The field failed; an error carrying its path was recorded
    Error,
}

impl ResultNode {
    /// `null` or an error marker
    pub fn is_null(&self) -> bool {
        matches!(self, ResultNode::Null | ResultNode::Error)
    }

    /// Look up a response key on an object node
    pub fn get(&self, key: &str) -> Option<&ResultNode> {
        match self {
            ResultNode::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Convert to JSON; error markers become `null`
    pub fn to_json(&self) -> Value {
        match self {
            ResultNode::Scalar(value) => value.clone(),
            ResultNode::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            ResultNode::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, node)| (key.clone(), node.to_json()))
                    .collect(),
            ),
            ResultNode::Null | ResultNode::Error => Value::Null,
        }
    }
}

impl Serialize for ResultNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResultNode::Scalar(value) => value.serialize(serializer),
            ResultNode::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ResultNode::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, node) in fields {
                    map.serialize_entry(key, node)?;
                }
                map.end()
            }
            ResultNode::Null | ResultNode::Error => serializer.serialize_unit(),
        }
    }
}

/// Result bundle of one execution: `{ data, errors, complexity }`
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// `None` when the query was rejected before execution
    pub data: Option<ResultNode>,

    pub errors: Vec<GraphQLError>,

    /// Sum of the declared weights of every resolved field
    pub complexity: u64,
}

impl ExecutionResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The `data` member as JSON (`null` when absent)
    pub fn data_json(&self) -> Value {
        self.data.as_ref().map(ResultNode::to_json).unwrap_or(Value::Null)
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "data": self.data_json(),
            "errors": self.errors,
            "complexity": self.complexity,
        })
    }
}

impl From<ExecutorError> for ExecutionResult {
    fn from(error: ExecutorError) -> Self {
        Self {
            data: None,
            errors: error.to_graphql_errors(),
            complexity: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ResultNode {
        let mut inner = IndexMap::new();
        inner.insert("zeta".to_string(), ResultNode::Scalar(json!(1)));
        inner.insert("alpha".to_string(), ResultNode::Error);

        let mut root = IndexMap::new();
        root.insert("b".to_string(), ResultNode::Object(inner));
        root.insert(
            "a".to_string(),
            ResultNode::List(vec![ResultNode::Scalar(json!("x")), ResultNode::Null]),
        );
        ResultNode::Object(root)
    }

    #[test]
    fn test_to_json_keeps_requested_key_order() {
        let text = serde_json::to_string(&sample().to_json()).expect("should serialize");
        assert_eq!(text, r#"{"b":{"zeta":1,"alpha":null},"a":["x",null]}"#);
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let node = sample();
        let direct = serde_json::to_string(&node).expect("should serialize");
        let via_value = serde_json::to_string(&node.to_json()).expect("should serialize");
        assert_eq!(direct, via_value);
    }

    #[test]
    fn test_error_marker_is_null() {
        assert!(ResultNode::Error.is_null());
        assert!(ResultNode::Null.is_null());
        assert!(!ResultNode::Scalar(json!(0)).is_null());
    }

    #[test]
    fn test_rejected_execution_has_no_data() {
        let result: ExecutionResult = ExecutorError::Configuration("bad".to_string()).into();
        assert!(result.data.is_none());
        assert_eq!(result.to_json()["data"], Value::Null);
        assert_eq!(result.errors.len(), 1);
    }
}
