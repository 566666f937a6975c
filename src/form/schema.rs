use alloy::json_abi::{Function, Param, StateMutability};

use super::error::FormError;

/// Leaf parameter kinds, with the bit or byte width where the ABI type carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Uint(usize),
    Int(usize),
    Address,
    String,
    Bytes,
    FixedBytes(usize),
}

impl ScalarKind {
    fn parse(ty: &str) -> Option<Self> {
        let kind = match ty {
            "bool" => Self::Bool,
            "address" => Self::Address,
            "string" => Self::String,
            "bytes" => Self::Bytes,
            "uint" => Self::Uint(256),
            "int" => Self::Int(256),
            _ => {
                if let Some(bits) = ty.strip_prefix("uint") {
                    Self::Uint(parse_width(bits, 8, 256, 8)?)
                } else if let Some(bits) = ty.strip_prefix("int") {
                    Self::Int(parse_width(bits, 8, 256, 8)?)
                } else if let Some(size) = ty.strip_prefix("bytes") {
                    Self::FixedBytes(parse_width(size, 1, 32, 1)?)
                } else {
                    return None;
                }
            }
        };
        Some(kind)
    }

    pub fn type_name(&self) -> String {
        match self {
            Self::Bool => "bool".to_string(),
            Self::Uint(bits) => format!("uint{bits}"),
            Self::Int(bits) => format!("int{bits}"),
            Self::Address => "address".to_string(),
            Self::String => "string".to_string(),
            Self::Bytes => "bytes".to_string(),
            Self::FixedBytes(size) => format!("bytes{size}"),
        }
    }
}

fn parse_width(digits: &str, min: usize, max: usize, step: usize) -> Option<usize> {
    let width: usize = digits.parse().ok()?;
    (width >= min && width <= max && width % step == 0).then_some(width)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    Scalar(ScalarKind),
    /// `size` is `Some(n)` for `T[n]`, `None` for `T[]`.
    Array {
        element: Box<ParamSchema>,
        size: Option<usize>,
    },
    Tuple(Vec<ParamSchema>),
}

/// Immutable description of one function parameter or nested field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSchema {
    pub name: Option<String>,
    pub kind: ParamKind,
}

impl ParamSchema {
    pub fn scalar(name: Option<&str>, kind: ScalarKind) -> Self {
        Self {
            name: name.map(str::to_string),
            kind: ParamKind::Scalar(kind),
        }
    }

    pub fn array(name: Option<&str>, element: ParamSchema, size: Option<usize>) -> Self {
        Self {
            name: name.map(str::to_string),
            kind: ParamKind::Array {
                element: Box::new(element),
                size,
            },
        }
    }

    pub fn tuple(name: Option<&str>, fields: Vec<ParamSchema>) -> Self {
        Self {
            name: name.map(str::to_string),
            kind: ParamKind::Tuple(fields),
        }
    }

    /// Build a schema from an ABI JSON parameter, following `components` for tuples.
    pub fn from_param(param: &Param) -> Result<Self, FormError> {
        let name = (!param.name.is_empty()).then(|| param.name.clone());
        let kind = Self::parse_kind(&param.ty, &param.components)?;
        Ok(Self { name, kind })
    }

    fn parse_kind(ty: &str, components: &[Param]) -> Result<ParamKind, FormError> {
        let ty = ty.trim();

        // The outermost dimension is the last bracket group: `uint8[2][]` is a
        // dynamic array of `uint8[2]`.
        if let Some(inner) = ty.strip_suffix(']') {
            let open = inner.rfind('[').ok_or_else(|| unsupported(ty))?;
            let size = match &inner[open + 1..] {
                "" => None,
                digits => Some(digits.parse::<usize>().map_err(|_| unsupported(ty))?),
            };
            let element = ParamSchema {
                name: None,
                kind: Self::parse_kind(&inner[..open], components)?,
            };
            return Ok(ParamKind::Array {
                element: Box::new(element),
                size,
            });
        }

        if ty == "tuple" || ty.starts_with('(') {
            let fields = components
                .iter()
                .map(Self::from_param)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(ParamKind::Tuple(fields));
        }

        ScalarKind::parse(ty)
            .map(ParamKind::Scalar)
            .ok_or_else(|| unsupported(ty))
    }

    /// Canonical ABI type string, tuples expanded: `(uint256,address)[]`.
    pub fn type_string(&self) -> String {
        match &self.kind {
            ParamKind::Scalar(kind) => kind.type_name(),
            ParamKind::Array { element, size } => match size {
                Some(n) => format!("{}[{n}]", element.type_string()),
                None => format!("{}[]", element.type_string()),
            },
            ParamKind::Tuple(fields) => {
                let inner: Vec<String> = fields.iter().map(Self::type_string).collect();
                format!("({})", inner.join(","))
            }
        }
    }

    /// Key under which the field at `index` of a tuple is stored.
    pub fn field_key(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => index.to_string(),
        }
    }

    pub fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("param {index}"),
        }
    }
}

fn unsupported(ty: &str) -> FormError {
    FormError::UnsupportedType(ty.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Read,
    Write,
}

/// A callable contract function with its schema and identity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub name: String,
    pub inputs: Vec<ParamSchema>,
    pub mutability: Mutability,
    pub signature: String,
}

impl FunctionDescriptor {
    pub fn new(name: &str, inputs: Vec<ParamSchema>, mutability: Mutability) -> Self {
        let types: Vec<String> = inputs.iter().map(ParamSchema::type_string).collect();
        let signature = format!("{name}({})", types.join(","));
        Self {
            name: name.to_string(),
            inputs,
            mutability,
            signature,
        }
    }

    pub fn from_function(function: &Function) -> Result<Self, FormError> {
        let inputs = function
            .inputs
            .iter()
            .map(ParamSchema::from_param)
            .collect::<Result<Vec<_>, _>>()?;
        let mutability = match function.state_mutability {
            StateMutability::View | StateMutability::Pure => Mutability::Read,
            StateMutability::NonPayable | StateMutability::Payable => Mutability::Write,
        };
        Ok(Self::new(&function.name, inputs, mutability))
    }

    pub fn is_write(&self) -> bool {
        self.mutability == Mutability::Write
    }
}
