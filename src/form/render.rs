use std::sync::Arc;

use super::schema::{FunctionDescriptor, ParamKind, ParamSchema, ScalarKind};
use super::value::{ScalarValue, ValueNode};

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
pub const ADDRESS_PLACEHOLDER: &str = "<CONTRACT_ADDRESS>";

/// Call-site details appended to a rendered command when known.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    pub address: Option<String>,
    pub rpc_url: Option<String>,
    /// Only used for write calls.
    pub signer: Option<String>,
}

/// Render the `cast call` / `cast send` line for `function` with the given values.
///
/// Never fails: missing, empty or mis-shaped values render as placeholders.
pub fn render_command(
    function: &FunctionDescriptor,
    roots: &[Arc<ValueNode>],
    context: &CommandContext,
) -> String {
    let subcommand = if function.is_write() { "send" } else { "call" };
    let address = non_empty(&context.address).unwrap_or(ADDRESS_PLACEHOLDER);

    let mut parts = vec![
        "cast".to_string(),
        subcommand.to_string(),
        address.to_string(),
        format!("\"{}\"", function.signature),
    ];
    parts.extend(
        function
            .inputs
            .iter()
            .enumerate()
            .map(|(i, input)| render_arg(input, roots.get(i).map(Arc::as_ref))),
    );

    if let Some(rpc_url) = non_empty(&context.rpc_url) {
        parts.push(format!("--rpc-url {rpc_url}"));
    }
    if function.is_write() {
        if let Some(signer) = non_empty(&context.signer) {
            parts.push(format!("--from {signer}"));
        }
    }
    parts.join(" ")
}

/// Render one argument the way `cast` parses it: `(a,b)` for tuples, `[a,b]` for arrays.
pub fn render_arg(schema: &ParamSchema, node: Option<&ValueNode>) -> String {
    match (&schema.kind, node) {
        (ParamKind::Scalar(kind), Some(ValueNode::Scalar(value))) => render_scalar(*kind, value),
        (ParamKind::Array { element, .. }, Some(ValueNode::Array(items))) => {
            let items: Vec<String> = items
                .iter()
                .map(|item| render_arg(element, Some(item.as_ref())))
                .collect();
            format!("[{}]", items.join(","))
        }
        (ParamKind::Tuple(fields), Some(ValueNode::Tuple(entries))) => {
            let values: Vec<String> = fields
                .iter()
                .enumerate()
                .map(|(i, field)| {
                    render_arg(field, entries.get(&field.field_key(i)).map(Arc::as_ref))
                })
                .collect();
            format!("({})", values.join(","))
        }
        (ParamKind::Scalar(kind), _) => placeholder(*kind).to_string(),
        _ => render_arg(schema, Some(&ValueNode::default_for(schema))),
    }
}

fn render_scalar(kind: ScalarKind, value: &ScalarValue) -> String {
    match (kind, value) {
        (ScalarKind::Bool, ScalarValue::Bool(b)) => b.to_string(),
        (ScalarKind::Bool, ScalarValue::Text(_)) | (_, ScalarValue::Bool(_)) => {
            placeholder(kind).to_string()
        }
        (ScalarKind::String, ScalarValue::Text(text)) if text.is_empty() => {
            placeholder(kind).to_string()
        }
        (ScalarKind::String, ScalarValue::Text(text)) => quote(text),
        // other kinds are trimmed before conversion, so render them the same way
        (_, ScalarValue::Text(text)) if text.trim().is_empty() => placeholder(kind).to_string(),
        (ScalarKind::Bytes, ScalarValue::Text(text)) => quote(text.trim()),
        (_, ScalarValue::Text(text)) => text.trim().to_string(),
    }
}

/// Double-quoted and kept on one line.
fn quote(text: &str) -> String {
    let escaped = text
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    format!("\"{escaped}\"")
}

fn placeholder(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Uint(_) | ScalarKind::Int(_) => "0",
        ScalarKind::Bool => "false",
        ScalarKind::Address => ZERO_ADDRESS,
        ScalarKind::String | ScalarKind::Bytes | ScalarKind::FixedBytes(_) => "\"\"",
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::schema::Mutability;
    use crate::form::tree::ArgumentForm;

    fn path(s: &str) -> crate::form::ParamPath {
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

    #[test]
    fn test_empty_transfer_renders_placeholders() {
        let form = ArgumentForm::new(transfer());
        let command = form.render_command(&CommandContext::default());
        assert_eq!(
            command,
            "cast send <CONTRACT_ADDRESS> \"transfer(address,uint256)\" \
             0x0000000000000000000000000000000000000000 0"
        );
    }

    #[test]
    fn test_context_suffixes() {
        let form = ArgumentForm::new(transfer())
            .set_scalar(&path("amount"), "1000")
            .unwrap();
        let context = CommandContext {
            address: Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".into()),
            rpc_url: Some("http://127.0.0.1:8545".into()),
            signer: Some("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".into()),
        };
        assert_eq!(
            form.render_command(&context),
            "cast send 0x5FbDB2315678afecb367f032d93F642f64180aa3 \"transfer(address,uint256)\" \
             0x0000000000000000000000000000000000000000 1000 --rpc-url http://127.0.0.1:8545 \
             --from 0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn test_read_call_omits_signer() {
        let function = FunctionDescriptor::new(
            "balanceOf",
            vec![ParamSchema::scalar(Some("owner"), ScalarKind::Address)],
            Mutability::Read,
        );
        let context = CommandContext {
            address: Some(String::new()),
            rpc_url: None,
            signer: Some("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".into()),
        };
        let command = ArgumentForm::new(function).render_command(&context);
        assert_eq!(
            command,
            "cast call <CONTRACT_ADDRESS> \"balanceOf(address)\" \
             0x0000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_nested_rendering_and_quoting() {
        let item = ParamSchema::tuple(
            None,
            vec![
                ParamSchema::scalar(Some("label"), ScalarKind::String),
                ParamSchema::scalar(Some("data"), ScalarKind::Bytes),
                ParamSchema::scalar(Some("ok"), ScalarKind::Bool),
                ParamSchema::scalar(Some("tag"), ScalarKind::FixedBytes(4)),
            ],
        );
        let function = FunctionDescriptor::new(
            "store",
            vec![ParamSchema::array(Some("items"), item, None)],
            Mutability::Write,
        );
        let form = ArgumentForm::new(function)
            .insert_array_element(&path("items"))
            .unwrap()
            .insert_array_element(&path("items"))
            .unwrap()
            .set_scalar(&path("items.0.label"), "say \"hi\"")
            .unwrap()
            .set_scalar(&path("items.0.data"), "0xbeef")
            .unwrap()
            .set_scalar(&path("items.0.tag"), "0x01020304")
            .unwrap()
            .set_scalar(&path("items.1.ok"), true)
            .unwrap();

        let arg = render_arg(&form.function().inputs[0], Some(form.roots()[0].as_ref()));
        assert_eq!(
            arg,
            r#"[("say \"hi\"","0xbeef",false,0x01020304),("","",true,"")]"#
        );
    }

    #[test]
    fn test_blank_and_multiline_leaves_stay_on_one_line() {
        let function = FunctionDescriptor::new(
            "post",
            vec![
                ParamSchema::scalar(Some("to"), ScalarKind::Address),
                ParamSchema::scalar(Some("amount"), ScalarKind::Uint(256)),
                ParamSchema::scalar(Some("memo"), ScalarKind::String),
                ParamSchema::scalar(Some("pad"), ScalarKind::String),
            ],
            Mutability::Write,
        );
        let form = ArgumentForm::new(function)
            .set_scalar(&path("to"), "   ")
            .unwrap()
            .set_scalar(&path("amount"), " 42\t")
            .unwrap()
            .set_scalar(&path("memo"), "line one\nline two\r")
            .unwrap()
            .set_scalar(&path("pad"), " ")
            .unwrap();

        let command = form.render_command(&CommandContext::default());
        assert!(!command.contains('\n'));
        assert_eq!(
            command,
            "cast send <CONTRACT_ADDRESS> \"post(address,uint256,string,string)\" \
             0x0000000000000000000000000000000000000000 42 \
             \"line one\\nline two\\r\" \" \""
        );
    }

    #[test]
    fn test_mis_shaped_values_degrade() {
        let tuple = ParamSchema::tuple(
            None,
            vec![
                ParamSchema::scalar(None, ScalarKind::Int(8)),
                ParamSchema::array(None, ParamSchema::scalar(None, ScalarKind::Bool), None),
            ],
        );
        assert_eq!(render_arg(&tuple, None), "(0,[])");
        assert_eq!(
            render_arg(&tuple, Some(&ValueNode::Scalar("x".into()))),
            "(0,[])"
        );
        let flag = ParamSchema::scalar(None, ScalarKind::Bool);
        assert_eq!(render_arg(&flag, Some(&ValueNode::Scalar("yes".into()))), "false");
        assert_eq!(render_arg(&flag, Some(&ValueNode::Array(vec![]))), "false");
    }
}
