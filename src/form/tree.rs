use std::sync::Arc;

use alloy::dyn_abi::DynSolValue;

use super::convert;
use super::error::FormError;
use super::path::{ParamPath, PathKey};
use super::render::{self, CommandContext};
use super::schema::{FunctionDescriptor, ParamKind, ParamSchema};
use super::value::{ScalarValue, ValueNode};

/// The editable argument values for one selected function.
///
/// Edits take `&self` and return a new form. Only the nodes on the path from the
/// argument root to the edited node are rebuilt; every other subtree is the same `Arc`
/// as in the previous form, so comparing node identity shows exactly what changed.
#[derive(Debug, Clone)]
pub struct ArgumentForm {
    function: Arc<FunctionDescriptor>,
    roots: Vec<Arc<ValueNode>>,
}

impl ArgumentForm {
    /// Fresh form with every argument at its default value.
    pub fn new(function: FunctionDescriptor) -> Self {
        let roots = function
            .inputs
            .iter()
            .map(|input| Arc::new(ValueNode::default_for(input)))
            .collect();
        Self {
            function: Arc::new(function),
            roots,
        }
    }

    pub fn function(&self) -> &FunctionDescriptor {
        &self.function
    }

    pub fn roots(&self) -> &[Arc<ValueNode>] {
        &self.roots
    }

    /// Node at `path`.
    pub fn get(&self, path: &ParamPath) -> Result<&Arc<ValueNode>, FormError> {
        let (index, rest, mut walked) = self.resolve_argument(path)?;
        let mut schema = &self.function.inputs[index];
        let mut node = &self.roots[index];

        for key in rest {
            let (child_schema, child, step) = descend(schema, node, key, &walked)?;
            walked = walked.child(step);
            schema = child_schema;
            node = child;
        }
        Ok(node)
    }

    /// Replace the scalar at `path`. Boolean schemas only accept `ScalarValue::Bool`.
    pub fn set_scalar(
        &self,
        path: &ParamPath,
        value: impl Into<ScalarValue>,
    ) -> Result<Self, FormError> {
        let value = value.into();
        self.edit_at(path, &mut |schema, _node, at| match &schema.kind {
            ParamKind::Scalar(kind) if value.fits(*kind) => Ok(ValueNode::Scalar(value.clone())),
            ParamKind::Scalar(kind) => Err(FormError::mismatch(
                at,
                format!("{:?} is not valid input for {}", value.raw(), kind.type_name()),
            )),
            _ => Err(FormError::mismatch(
                at,
                format!("expected a scalar, found {}", schema.type_string()),
            )),
        })
    }

    /// Append one defaulted element to the array at `path`.
    pub fn insert_array_element(&self, path: &ParamPath) -> Result<Self, FormError> {
        self.edit_at(path, &mut |schema, node, at| match (&schema.kind, node) {
            (ParamKind::Array { element, .. }, ValueNode::Array(items)) => {
                let mut items = items.clone();
                items.push(Arc::new(ValueNode::default_for(element)));
                Ok(ValueNode::Array(items))
            }
            _ => Err(FormError::mismatch(
                at,
                format!("expected an array, found {}", schema.type_string()),
            )),
        })
    }

    /// Remove the element at `index` from the array at `path`.
    pub fn remove_array_element(&self, path: &ParamPath, index: usize) -> Result<Self, FormError> {
        self.edit_at(path, &mut |schema, node, at| match (&schema.kind, node) {
            (ParamKind::Array { .. }, ValueNode::Array(items)) => {
                if index >= items.len() {
                    return Err(FormError::IndexOutOfRange {
                        path: at.clone(),
                        index,
                        len: items.len(),
                    });
                }
                let mut items = items.clone();
                items.remove(index);
                Ok(ValueNode::Array(items))
            }
            _ => Err(FormError::mismatch(
                at,
                format!("expected an array, found {}", schema.type_string()),
            )),
        })
    }

    /// Replace the whole subtree of field `key` in the tuple at `path`.
    pub fn set_tuple_field(
        &self,
        path: &ParamPath,
        key: impl Into<PathKey>,
        value: ValueNode,
    ) -> Result<Self, FormError> {
        let key = key.into();
        let value = Arc::new(value);
        self.edit_at(path, &mut |schema, node, at| match (&schema.kind, node) {
            (ParamKind::Tuple(fields), ValueNode::Tuple(entries)) => {
                let (field_key, field) = resolve_field(fields, &key, at)?;
                if !value.matches(field) {
                    return Err(FormError::mismatch(
                        &at.child(PathKey::Field(field_key)),
                        format!("value does not have the shape of {}", field.type_string()),
                    ));
                }
                let mut entries = entries.clone();
                entries.insert(field_key, Arc::clone(&value));
                Ok(ValueNode::Tuple(entries))
            }
            _ => Err(FormError::mismatch(
                at,
                format!("expected a tuple, found {}", schema.type_string()),
            )),
        })
    }

    /// Call arguments in parameter order, ready for ABI encoding.
    pub fn to_call_args(&self) -> Result<Vec<DynSolValue>, FormError> {
        convert::to_call_args(&self.function.inputs, &self.roots)
    }

    /// `cast` invocation equivalent to calling the function with the current values.
    pub fn render_command(&self, context: &CommandContext) -> String {
        render::render_command(&self.function, &self.roots, context)
    }

    /// Form values as JSON, one entry per argument.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.roots.iter().map(|root| root.as_ref().into()).collect())
    }

    fn resolve_argument<'p>(
        &self,
        path: &'p ParamPath,
    ) -> Result<(usize, &'p [PathKey], ParamPath), FormError> {
        let Some((first, rest)) = path.keys().split_first() else {
            return Err(FormError::mismatch(path, "path must start with an argument"));
        };
        let index = match first {
            PathKey::Index(index) => {
                if *index >= self.roots.len() {
                    return Err(FormError::IndexOutOfRange {
                        path: ParamPath::root(),
                        index: *index,
                        len: self.roots.len(),
                    });
                }
                *index
            }
            PathKey::Field(name) => self
                .function
                .inputs
                .iter()
                .position(|input| input.name.as_deref() == Some(name.as_str()))
                .ok_or_else(|| {
                    FormError::mismatch(
                        &ParamPath::root(),
                        format!("{} has no argument named '{name}'", self.function.signature),
                    )
                })?,
        };
        Ok((index, rest, ParamPath::root().child(index)))
    }

    fn edit_at(
        &self,
        path: &ParamPath,
        edit: &mut dyn FnMut(&ParamSchema, &ValueNode, &ParamPath) -> Result<ValueNode, FormError>,
    ) -> Result<Self, FormError> {
        let (index, rest, walked) = self.resolve_argument(path)?;
        let updated = rebuild(
            &self.roots[index],
            &self.function.inputs[index],
            rest,
            walked,
            edit,
        )?;

        let mut roots = self.roots.clone();
        roots[index] = updated;
        Ok(Self {
            function: Arc::clone(&self.function),
            roots,
        })
    }
}

/// Apply `edit` at the end of `rest`, rebuilding each ancestor on the way back up.
fn rebuild(
    node: &Arc<ValueNode>,
    schema: &ParamSchema,
    rest: &[PathKey],
    walked: ParamPath,
    edit: &mut dyn FnMut(&ParamSchema, &ValueNode, &ParamPath) -> Result<ValueNode, FormError>,
) -> Result<Arc<ValueNode>, FormError> {
    let Some((key, rest)) = rest.split_first() else {
        return edit(schema, node, &walked).map(Arc::new);
    };

    let (child_schema, child, step) = descend(schema, node, key, &walked)?;
    let updated = rebuild(child, child_schema, rest, walked.child(step.clone()), edit)?;

    let rebuilt = match (node.as_ref(), step) {
        (ValueNode::Array(items), PathKey::Index(index)) => {
            let mut items = items.clone();
            items[index] = updated;
            ValueNode::Array(items)
        }
        (ValueNode::Tuple(entries), PathKey::Field(field_key)) => {
            let mut entries = entries.clone();
            entries.insert(field_key, updated);
            ValueNode::Tuple(entries)
        }
        (other, step) => {
            return Err(FormError::mismatch(
                &walked,
                format!("cannot step into {} with '{step}'", other.kind_name()),
            ))
        }
    };
    Ok(Arc::new(rebuilt))
}

/// One step down from `node`. Returns the child and the normalized key used to reach it.
fn descend<'a>(
    schema: &'a ParamSchema,
    node: &'a Arc<ValueNode>,
    key: &PathKey,
    walked: &ParamPath,
) -> Result<(&'a ParamSchema, &'a Arc<ValueNode>, PathKey), FormError> {
    match (&schema.kind, node.as_ref()) {
        (ParamKind::Array { element, .. }, ValueNode::Array(items)) => {
            let PathKey::Index(index) = key else {
                return Err(FormError::mismatch(
                    walked,
                    format!("expected an array index, found '{key}'"),
                ));
            };
            let child = items.get(*index).ok_or(FormError::IndexOutOfRange {
                path: walked.clone(),
                index: *index,
                len: items.len(),
            })?;
            Ok((element, child, PathKey::Index(*index)))
        }
        (ParamKind::Tuple(fields), ValueNode::Tuple(entries)) => {
            let (field_key, field) = resolve_field(fields, key, walked)?;
            let child = entries.get(&field_key).ok_or_else(|| {
                FormError::mismatch(walked, format!("tuple is missing field '{field_key}'"))
            })?;
            Ok((field, child, PathKey::Field(field_key)))
        }
        (ParamKind::Scalar(kind), _) => Err(FormError::mismatch(
            walked,
            format!("cannot descend into {} with '{key}'", kind.type_name()),
        )),
        _ => Err(FormError::mismatch(
            walked,
            format!(
                "{} node does not match {}",
                node.kind_name(),
                schema.type_string()
            ),
        )),
    }
}

/// Tuple fields are addressed by key, or by position for either named or unnamed fields.
fn resolve_field<'a>(
    fields: &'a [ParamSchema],
    key: &PathKey,
    walked: &ParamPath,
) -> Result<(String, &'a ParamSchema), FormError> {
    let found = match key {
        PathKey::Index(index) => fields.get(*index).map(|field| (*index, field)),
        PathKey::Field(name) => fields
            .iter()
            .enumerate()
            .find(|(i, field)| field.field_key(*i) == *name),
    };
    found
        .map(|(i, field)| (field.field_key(i), field))
        .ok_or_else(|| FormError::mismatch(walked, format!("tuple has no field '{key}'")))
}
