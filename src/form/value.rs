use std::collections::BTreeMap;
use std::sync::Arc;

use super::schema::{ParamKind, ParamSchema, ScalarKind};

/// Raw user input for a leaf. Booleans are kept apart from text so a bool field never
/// holds a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarValue {
    Bool(bool),
    Text(String),
}

impl ScalarValue {
    pub fn fits(&self, kind: ScalarKind) -> bool {
        match self {
            Self::Bool(_) => kind == ScalarKind::Bool,
            Self::Text(_) => kind != ScalarKind::Bool,
        }
    }

    pub fn raw(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for ScalarValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// A value tree node shaped like the `ParamSchema` at the same position.
///
/// Children sit behind `Arc` so an edit can rebuild the path to the edited node and share
/// every untouched sibling with the previous tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueNode {
    Scalar(ScalarValue),
    Array(Vec<Arc<ValueNode>>),
    Tuple(BTreeMap<String, Arc<ValueNode>>),
}

impl ValueNode {
    /// Zero value for `schema`: `false`, `""`, an empty array, or a tuple of defaults.
    pub fn default_for(schema: &ParamSchema) -> Self {
        match &schema.kind {
            ParamKind::Scalar(ScalarKind::Bool) => Self::Scalar(ScalarValue::Bool(false)),
            ParamKind::Scalar(_) => Self::Scalar(ScalarValue::Text(String::new())),
            ParamKind::Array { .. } => Self::Array(Vec::new()),
            ParamKind::Tuple(fields) => Self::Tuple(
                fields
                    .iter()
                    .enumerate()
                    .map(|(i, field)| (field.field_key(i), Arc::new(Self::default_for(field))))
                    .collect(),
            ),
        }
    }

    /// Whether this node has the shape `schema` describes, all the way down.
    pub fn matches(&self, schema: &ParamSchema) -> bool {
        match (&schema.kind, self) {
            (ParamKind::Scalar(kind), Self::Scalar(value)) => value.fits(*kind),
            (ParamKind::Array { element, .. }, Self::Array(items)) => {
                items.iter().all(|item| item.matches(element))
            }
            (ParamKind::Tuple(fields), Self::Tuple(entries)) => {
                entries.len() == fields.len()
                    && fields.iter().enumerate().all(|(i, field)| {
                        entries
                            .get(&field.field_key(i))
                            .is_some_and(|entry| entry.matches(field))
                    })
            }
            _ => false,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Arc<ValueNode>]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&BTreeMap<String, Arc<ValueNode>>> {
        match self {
            Self::Tuple(entries) => Some(entries),
            _ => None,
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Array(_) => "array",
            Self::Tuple(_) => "tuple",
        }
    }
}

/// JSON view of a value tree, used when showing form state to a client.
impl From<&ValueNode> for serde_json::Value {
    fn from(node: &ValueNode) -> Self {
        match node {
            ValueNode::Scalar(ScalarValue::Bool(b)) => Self::Bool(*b),
            ValueNode::Scalar(ScalarValue::Text(text)) => Self::String(text.clone()),
            ValueNode::Array(items) => {
                Self::Array(items.iter().map(|item| item.as_ref().into()).collect())
            }
            ValueNode::Tuple(entries) => Self::Object(
                entries
                    .iter()
                    .map(|(key, entry)| (key.clone(), entry.as_ref().into()))
                    .collect(),
            ),
        }
    }
}

/// Builds a value tree from client JSON. Numbers keep their decimal text; `null` is rejected.
impl TryFrom<&serde_json::Value> for ValueNode {
    type Error = String;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        match value {
            Value::Bool(b) => Ok(Self::Scalar(ScalarValue::Bool(*b))),
            Value::Number(n) => Ok(Self::Scalar(ScalarValue::Text(n.to_string()))),
            Value::String(s) => Ok(Self::Scalar(ScalarValue::Text(s.clone()))),
            Value::Array(items) => items
                .iter()
                .map(|item| Self::try_from(item).map(Arc::new))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Array),
            Value::Object(entries) => entries
                .iter()
                .map(|(key, entry)| Ok((key.clone(), Arc::new(Self::try_from(entry)?))))
                .collect::<Result<BTreeMap<_, _>, String>>()
                .map(Self::Tuple),
            Value::Null => Err("null is not a parameter value".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_schema() -> ParamSchema {
        ParamSchema::tuple(
            Some("order"),
            vec![
                ParamSchema::scalar(Some("maker"), ScalarKind::Address),
                ParamSchema::scalar(None, ScalarKind::Bool),
                ParamSchema::array(
                    Some("fills"),
                    ParamSchema::tuple(
                        None,
                        vec![
                            ParamSchema::scalar(None, ScalarKind::Uint(256)),
                            ParamSchema::scalar(None, ScalarKind::Bytes),
                        ],
                    ),
                    None,
                ),
            ],
        )
    }

    #[test]
    fn test_default_matches_schema_shape() {
        let schema = order_schema();
        let node = ValueNode::default_for(&schema);
        assert!(node.matches(&schema));

        let entries = node.as_tuple().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries["maker"].as_scalar(),
            Some(&ScalarValue::Text(String::new()))
        );
        // unnamed field is keyed by its position
        assert_eq!(entries["1"].as_scalar(), Some(&ScalarValue::Bool(false)));
        assert_eq!(entries["fills"].as_array().map(<[_]>::len), Some(0));
    }

    #[test]
    fn test_matches_rejects_wrong_shapes() {
        let schema = order_schema();
        assert!(!ValueNode::Scalar("x".into()).matches(&schema));

        let bool_schema = ParamSchema::scalar(None, ScalarKind::Bool);
        assert!(!ValueNode::Scalar("true".into()).matches(&bool_schema));
        assert!(ValueNode::Scalar(true.into()).matches(&bool_schema));

        let uint = ParamSchema::scalar(None, ScalarKind::Uint(8));
        assert!(!ValueNode::Scalar(true.into()).matches(&uint));
    }

    #[test]
    fn test_json_view() {
        let node = ValueNode::default_for(&order_schema());
        let json = serde_json::Value::from(&node);
        assert_eq!(
            json,
            serde_json::json!({ "maker": "", "1": false, "fills": [] })
        );
    }

    #[test]
    fn test_json_builds_matching_tree() {
        let json = serde_json::json!({
            "maker": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            "1": true,
            "fills": [{"0": 7, "1": "0xdead"}]
        });
        let node = ValueNode::try_from(&json).unwrap();
        assert!(node.matches(&order_schema()));

        let fill = &node.as_tuple().unwrap()["fills"].as_array().unwrap()[0];
        assert_eq!(
            fill.as_tuple().unwrap()["0"].as_scalar(),
            Some(&ScalarValue::Text("7".into()))
        );
        assert_eq!(serde_json::Value::from(&node)["1"], serde_json::json!(true));

        assert!(ValueNode::try_from(&serde_json::json!([1, null])).is_err());
    }
}
