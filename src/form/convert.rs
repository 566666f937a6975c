use std::str::FromStr;
use std::sync::Arc;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, B256, I256, U256};

use super::error::FormError;
use super::path::{ParamPath, PathKey};
use super::schema::{ParamKind, ParamSchema, ScalarKind};
use super::value::{ScalarValue, ValueNode};

/// Convert argument value trees into call arguments, in parameter order.
///
/// Tuples come out in schema field order whatever order their entries were filled in.
/// Numeric leaves must parse; an empty or malformed number is a `ConversionError`.
pub fn to_call_args(
    inputs: &[ParamSchema],
    roots: &[Arc<ValueNode>],
) -> Result<Vec<DynSolValue>, FormError> {
    if inputs.len() != roots.len() {
        return Err(FormError::mismatch(
            &ParamPath::root(),
            format!("expected {} arguments, found {}", inputs.len(), roots.len()),
        ));
    }

    inputs
        .iter()
        .zip(roots)
        .enumerate()
        .map(|(i, (schema, root))| convert_node(schema, root, &ParamPath::root().child(i)))
        .collect()
}

fn convert_node(
    schema: &ParamSchema,
    node: &ValueNode,
    path: &ParamPath,
) -> Result<DynSolValue, FormError> {
    match (&schema.kind, node) {
        (ParamKind::Scalar(kind), ValueNode::Scalar(value)) => convert_scalar(*kind, value, path),
        (ParamKind::Array { element, size }, ValueNode::Array(items)) => {
            if let Some(size) = size {
                if items.len() != *size {
                    return Err(FormError::ConversionError {
                        path: path.clone(),
                        value: format!("{} elements", items.len()),
                        ty: schema.type_string(),
                        reason: format!("fixed array needs exactly {size} elements"),
                    });
                }
            }
            let values = items
                .iter()
                .enumerate()
                .map(|(i, item)| convert_node(element, item, &path.child(i)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match size {
                Some(_) => DynSolValue::FixedArray(values),
                None => DynSolValue::Array(values),
            })
        }
        (ParamKind::Tuple(fields), ValueNode::Tuple(entries)) => {
            let values = fields
                .iter()
                .enumerate()
                .map(|(i, field)| {
                    let key = field.field_key(i);
                    let entry = entries.get(&key).ok_or_else(|| {
                        FormError::mismatch(path, format!("tuple is missing field '{key}'"))
                    })?;
                    convert_node(field, entry, &path.child(PathKey::Field(key)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynSolValue::Tuple(values))
        }
        _ => Err(FormError::mismatch(
            path,
            format!(
                "{} node does not match {}",
                node.kind_name(),
                schema.type_string()
            ),
        )),
    }
}

fn convert_scalar(
    kind: ScalarKind,
    value: &ScalarValue,
    path: &ParamPath,
) -> Result<DynSolValue, FormError> {
    let fail = |reason: String| FormError::ConversionError {
        path: path.clone(),
        value: value.raw(),
        ty: kind.type_name(),
        reason,
    };

    let text = match (kind, value) {
        (ScalarKind::Bool, ScalarValue::Bool(b)) => return Ok(DynSolValue::Bool(*b)),
        (_, ScalarValue::Bool(_)) => return Err(fail("expected text input".to_string())),
        (_, ScalarValue::Text(text)) => text,
    };

    match kind {
        ScalarKind::Bool => Err(fail("expected true or false".to_string())),
        ScalarKind::Uint(bits) => parse_uint(text, bits)
            .map(|v| DynSolValue::Uint(v, bits))
            .map_err(fail),
        ScalarKind::Int(bits) => parse_int(text, bits)
            .map(|v| DynSolValue::Int(v, bits))
            .map_err(fail),
        ScalarKind::Address => {
            let text = text.trim();
            if text.is_empty() {
                return Err(fail("address is empty".to_string()));
            }
            Address::from_str(text)
                .map(DynSolValue::Address)
                .map_err(|e| fail(format!("invalid address: {e}")))
        }
        ScalarKind::String => Ok(DynSolValue::String(text.clone())),
        ScalarKind::Bytes => decode_hex(text).map(DynSolValue::Bytes).map_err(fail),
        ScalarKind::FixedBytes(size) => {
            let bytes = decode_hex(text).map_err(fail)?;
            if bytes.len() > size {
                return Err(fail(format!(
                    "{} bytes do not fit in bytes{size}",
                    bytes.len()
                )));
            }
            let mut word = [0u8; 32];
            word[..bytes.len()].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(B256::from(word), size))
        }
    }
}

/// Decimal or `0x`-prefixed hex, at most `bits` wide.
fn parse_uint(text: &str, bits: usize) -> Result<U256, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("numeric input is empty".to_string());
    }

    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some("") => return Err("hex input has no digits".to_string()),
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(text, 10),
    }
    .map_err(|e| format!("not an integer: {e}"))?;

    if parsed.bit_len() > bits {
        return Err(format!("value does not fit in uint{bits}"));
    }
    Ok(parsed)
}

/// Optional sign followed by a decimal or hex magnitude, within the two's complement range.
fn parse_int(text: &str, bits: usize) -> Result<I256, String> {
    let text = text.trim();
    let (negative, magnitude) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude = parse_uint(magnitude, 256)?;

    let limit = U256::from(1u8) << (bits - 1);
    let in_range = if negative {
        magnitude <= limit
    } else {
        magnitude < limit
    };
    if !in_range {
        return Err(format!("value does not fit in int{bits}"));
    }

    let value = I256::from_raw(magnitude);
    Ok(if negative { value.wrapping_neg() } else { value })
}

fn decode_hex(text: &str) -> Result<Vec<u8>, String> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    hex::decode(digits).map_err(|e| format!("invalid hex: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::schema::{FunctionDescriptor, Mutability};
    use crate::form::tree::ArgumentForm;

    fn path(s: &str) -> ParamPath {
        s.parse().unwrap()
    }

    fn transfer() -> FunctionDescriptor {
        FunctionDescriptor::new(
            "transfer",
            vec![
                ParamSchema::scalar(Some("to"), ScalarKind::Address),
                ParamSchema::scalar(Some("amount"), ScalarKind::Uint(256)),
            ],
            Mutability::Write,
        )
    }

    fn set_pair() -> FunctionDescriptor {
        FunctionDescriptor::new(
            "setPair",
            vec![ParamSchema::tuple(
                Some("p"),
                vec![
                    ParamSchema::scalar(None, ScalarKind::Uint(256)),
                    ParamSchema::scalar(None, ScalarKind::Uint(256)),
                ],
            )],
            Mutability::Write,
        )
    }

    #[test]
    fn test_empty_amount_is_conversion_error() {
        let form = ArgumentForm::new(transfer())
            .set_scalar(&path("to"), "0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e")
            .unwrap();

        match form.to_call_args() {
            Err(FormError::ConversionError { path: at, value, ty, .. }) => {
                assert_eq!(at, path("1"));
                assert_eq!(value, "");
                assert_eq!(ty, "uint256");
            }
            other => panic!("expected conversion error, got {other:?}"),
        }
    }

    #[test]
    fn test_tuple_order_follows_schema() {
        // fill the second field first
        let form = ArgumentForm::new(set_pair())
            .set_scalar(&path("p.1"), "4")
            .unwrap()
            .set_scalar(&path("p.0"), "3")
            .unwrap();

        let args = form.to_call_args().unwrap();
        assert_eq!(
            args,
            vec![DynSolValue::Tuple(vec![
                DynSolValue::Uint(U256::from(3), 256),
                DynSolValue::Uint(U256::from(4), 256),
            ])]
        );
    }

    #[test]
    fn test_named_tuple_order_with_unsorted_keys() {
        // BTreeMap would iterate "amount" before "to"; schema order must win
        let schema = ParamSchema::tuple(
            Some("t"),
            vec![
                ParamSchema::scalar(Some("to"), ScalarKind::Address),
                ParamSchema::scalar(Some("amount"), ScalarKind::Uint(64)),
            ],
        );
        let function = FunctionDescriptor::new("send", vec![schema], Mutability::Write);
        let form = ArgumentForm::new(function)
            .set_scalar(&path("t.amount"), "0x10")
            .unwrap()
            .set_scalar(&path("t.to"), "0x0000000000000000000000000000000000000001")
            .unwrap();

        let args = form.to_call_args().unwrap();
        let DynSolValue::Tuple(fields) = &args[0] else {
            panic!("expected tuple");
        };
        assert!(matches!(fields[0], DynSolValue::Address(_)));
        assert_eq!(fields[1], DynSolValue::Uint(U256::from(16), 64));
    }

    #[test]
    fn test_arrays_convert_in_order() {
        let function = FunctionDescriptor::new(
            "batch",
            vec![
                ParamSchema::array(
                    Some("ids"),
                    ParamSchema::scalar(None, ScalarKind::Uint(256)),
                    None,
                ),
                ParamSchema::array(Some("flags"), ParamSchema::scalar(None, ScalarKind::Bool), Some(2)),
            ],
            Mutability::Write,
        );
        let form = ArgumentForm::new(function)
            .insert_array_element(&path("ids"))
            .unwrap()
            .insert_array_element(&path("ids"))
            .unwrap()
            .set_scalar(&path("ids.0"), "5")
            .unwrap()
            .set_scalar(&path("ids.1"), "6")
            .unwrap()
            .insert_array_element(&path("flags"))
            .unwrap();

        // fixed array with the wrong length
        assert!(matches!(
            form.to_call_args(),
            Err(FormError::ConversionError { .. })
        ));

        let form = form
            .insert_array_element(&path("flags"))
            .unwrap()
            .set_scalar(&path("flags.1"), true)
            .unwrap();
        let args = form.to_call_args().unwrap();
        assert_eq!(
            args[0],
            DynSolValue::Array(vec![
                DynSolValue::Uint(U256::from(5), 256),
                DynSolValue::Uint(U256::from(6), 256),
            ])
        );
        assert_eq!(
            args[1],
            DynSolValue::FixedArray(vec![DynSolValue::Bool(false), DynSolValue::Bool(true)])
        );
    }

    #[test]
    fn test_conversion_does_not_touch_tree() {
        let form = ArgumentForm::new(transfer());
        let before = form.to_json();
        let _ = form.to_call_args();
        assert_eq!(form.to_json(), before);
    }

    #[test]
    fn test_parse_uint() {
        assert_eq!(parse_uint("42", 8).unwrap(), U256::from(42));
        assert_eq!(parse_uint(" 0xff ", 8).unwrap(), U256::from(255));
        assert!(parse_uint("256", 8).is_err());
        assert!(parse_uint("", 256).is_err());
        assert!(parse_uint("0x", 256).is_err());
        assert!(parse_uint("-1", 256).is_err());
        assert!(parse_uint("12abc", 256).is_err());
        assert_eq!(
            parse_uint(
                "115792089237316195423570985008687907853269984665640564039457584007913129639935",
                256
            )
            .unwrap(),
            U256::MAX
        );
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("-128", 8).unwrap(), I256::try_from(-128i64).unwrap());
        assert_eq!(parse_int("127", 8).unwrap(), I256::try_from(127i64).unwrap());
        assert!(parse_int("128", 8).is_err());
        assert!(parse_int("-129", 8).is_err());
        assert_eq!(parse_int("+5", 256).unwrap(), I256::try_from(5i64).unwrap());
        assert!(parse_int("-", 256).is_err());
    }

    #[test]
    fn test_bytes_and_address() {
        let path = path("0");
        assert_eq!(
            convert_scalar(ScalarKind::Bytes, &"0xdead".into(), &path).unwrap(),
            DynSolValue::Bytes(vec![0xde, 0xad])
        );
        assert_eq!(
            convert_scalar(ScalarKind::Bytes, &"".into(), &path).unwrap(),
            DynSolValue::Bytes(vec![])
        );
        assert!(convert_scalar(ScalarKind::Bytes, &"0xabc".into(), &path).is_err());

        let DynSolValue::FixedBytes(word, 4) =
            convert_scalar(ScalarKind::FixedBytes(4), &"0x0102".into(), &path).unwrap()
        else {
            panic!("expected bytes4");
        };
        assert_eq!(&word[..4], &[1, 2, 0, 0]);
        assert!(convert_scalar(ScalarKind::FixedBytes(1), &"0x0102".into(), &path).is_err());

        assert!(convert_scalar(ScalarKind::Address, &"".into(), &path).is_err());
        assert!(convert_scalar(ScalarKind::Address, &"0x123".into(), &path).is_err());
        assert_eq!(
            convert_scalar(ScalarKind::String, &" keep spaces ".into(), &path).unwrap(),
            DynSolValue::String(" keep spaces ".to_string())
        );
    }
}
