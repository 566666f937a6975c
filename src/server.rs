use anyhow::{anyhow, Result};
use rmcp::{
    model::{ServerCapabilities, ServerInfo},
    tool,
    transport::stdio,
    ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    config::Config,
    ethereum::contract::ContractExplorer,
    form::{ArgumentForm, FormError, Mutability, ParamPath, PathKey, ScalarValue, ValueNode},
    session::SessionStore,
};

#[derive(Debug, Clone)]
pub struct ExplorerServer {
    explorer: Arc<tokio::sync::Mutex<ContractExplorer>>,
}

/// Which of the two forms a request targets.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
enum FormKind {
    Read,
    Write,
}

impl From<FormKind> for Mutability {
    fn from(kind: FormKind) -> Self {
        match kind {
            FormKind::Read => Mutability::Read,
            FormKind::Write => Mutability::Write,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ConfigureContractRequest {
    /// JSON-RPC endpoint
    rpc_url: Option<String>,
    contract_address: Option<String>,
    /// Contract ABI as JSON text
    abi: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct SelectFunctionRequest {
    /// Function signature such as `transfer(address,uint256)`, or a unique name
    function: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct FormRequest {
    form: FormKind,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct GetFormRequest {
    form: FormKind,
    /// Optional dotted path to show only that part of the arguments
    path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct SetArgumentRequest {
    form: FormKind,
    /// Dotted path: argument name or index, then field names or indices
    path: String,
    /// Boolean, number or string
    value: Value,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct SetTupleFieldRequest {
    form: FormKind,
    /// Path to the tuple
    path: String,
    /// Field name or position
    field: String,
    /// Whole replacement value: objects for tuples, arrays for arrays
    value: Value,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ArrayRequest {
    form: FormKind,
    /// Path to the array
    path: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct RemoveElementRequest {
    form: FormKind,
    path: String,
    index: usize,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ConnectWalletRequest {
    /// Hex private key; falls back to the configured key
    private_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct ViewTransactionRequest {
    hash: String,
}

impl ExplorerServer {
    pub async fn new(config: Config) -> Result<Self> {
        let store = if config.session.persist {
            Some(SessionStore::new(config.session_path()?))
        } else {
            None
        };
        let explorer = ContractExplorer::new(config, store).await;

        Ok(Self {
            explorer: Arc::new(tokio::sync::Mutex::new(explorer)),
        })
    }

    /// Seed session inputs from the command line. Any value given replaces the saved one.
    pub async fn preload(
        &self,
        rpc_url: Option<String>,
        contract_address: Option<String>,
        abi: Option<String>,
    ) -> Result<()> {
        if rpc_url.is_none() && contract_address.is_none() && abi.is_none() {
            return Ok(());
        }
        let mut explorer = self.explorer.lock().await;
        explorer.update_inputs(rpc_url, contract_address, abi).await
    }

    pub async fn run(&self) -> Result<()> {
        info!("Starting Contract Explorer Server");

        let service = self.clone().serve(stdio()).await?;

        info!("Contract Explorer Server started successfully");
        let _ = service.waiting().await;
        Ok(())
    }

    /// Apply an edit to a form and reply with the new form state.
    async fn edit<F>(&self, kind: FormKind, action: &str, edit: F) -> String
    where
        F: FnOnce(&ArgumentForm) -> Result<ArgumentForm, FormError>,
    {
        let mut explorer = self.explorer.lock().await;
        match explorer.edit_form(kind.into(), edit) {
            Ok(form) => pretty(&form_view(form)),
            Err(e) => {
                match e.downcast_ref::<FormError>().and_then(FormError::path) {
                    Some(path) => error!("Failed to {} at {}: {}", action, path, e),
                    None => error!("Failed to {}: {}", action, e),
                }
                format!("Error: {}", e)
            }
        }
    }
}

fn parse_path(path: &str) -> Result<ParamPath> {
    path.parse().map_err(|e: String| anyhow!(e))
}

fn scalar_from_json(value: &Value) -> Result<ScalarValue> {
    match value {
        Value::Bool(b) => Ok(ScalarValue::Bool(*b)),
        Value::Number(n) => Ok(ScalarValue::Text(n.to_string())),
        Value::String(s) => Ok(ScalarValue::Text(s.clone())),
        other => Err(anyhow!("Expected a boolean, number or string, got {}", other)),
    }
}

fn form_view(form: &ArgumentForm) -> Value {
    let function = form.function();
    serde_json::json!({
        "function": function.signature,
        "mutability": if function.is_write() { "write" } else { "read" },
        "inputs": function
            .inputs
            .iter()
            .enumerate()
            .map(|(i, input)| serde_json::json!({
                "name": input.label(i),
                "type": input.type_string(),
            }))
            .collect::<Vec<_>>(),
        "values": form.to_json(),
    })
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "Failed to serialize result".to_string())
}

#[tool(tool_box)]
impl ExplorerServer {
    #[tool(description = "Show the session: endpoint, contract, connection and validation status, wallet")]
    async fn get_session(&self) -> String {
        let explorer = self.explorer.lock().await;
        pretty(&explorer.snapshot())
    }

    #[tool(description = "Set the RPC endpoint, contract address and/or ABI JSON; inputs are saved for the next session")]
    async fn configure_contract(
        &self,
        #[tool(aggr)] request: ConfigureContractRequest,
    ) -> String {
        let mut explorer = self.explorer.lock().await;

        match explorer
            .update_inputs(request.rpc_url, request.contract_address, request.abi)
            .await
        {
            Ok(()) => pretty(&explorer.snapshot()),
            Err(e) => {
                error!("Failed to save contract inputs: {}", e);
                format!("Error: {}", e)
            }
        }
    }

    #[tool(description = "Parse the ABI and connect to the contract; selects the first read and write functions")]
    async fn connect_contract(&self) -> String {
        let mut explorer = self.explorer.lock().await;

        match explorer.connect() {
            Ok(summary) => pretty(&summary),
            Err(e) => {
                error!("Failed to connect to contract: {}", e);
                format!("Error: {}", e)
            }
        }
    }

    #[tool(description = "List the read and write functions of the connected contract")]
    async fn list_functions(&self) -> String {
        let explorer = self.explorer.lock().await;

        match explorer.functions() {
            Ok(summary) => pretty(&summary),
            Err(e) => format!("Error: {}", e),
        }
    }

    #[tool(description = "Select a function by signature or name; starts a fresh argument form")]
    async fn select_function(&self, #[tool(aggr)] request: SelectFunctionRequest) -> String {
        let mut explorer = self.explorer.lock().await;

        match explorer.select_function(&request.function) {
            Ok(form) => pretty(&form_view(form)),
            Err(e) => {
                error!("Failed to select function: {}", e);
                format!("Error: {}", e)
            }
        }
    }

    #[tool(description = "Show the current argument form for the read or write function, or one part of it by path")]
    async fn get_form(&self, #[tool(aggr)] request: GetFormRequest) -> String {
        let explorer = self.explorer.lock().await;

        let form = match explorer.form(request.form.into()) {
            Ok(form) => form,
            Err(e) => return format!("Error: {}", e),
        };
        let Some(path) = request.path else {
            return pretty(&form_view(form));
        };

        match parse_path(&path).and_then(|path| Ok(form.get(&path)?)) {
            Ok(node) => pretty(&Value::from(node.as_ref())),
            Err(e) => format!("Error: {}", e),
        }
    }

    #[tool(description = "Set a leaf argument value at a dotted path, e.g. `order.fills.0.amount`")]
    async fn set_argument(&self, #[tool(aggr)] request: SetArgumentRequest) -> String {
        let (path, value) = match parse_path(&request.path)
            .and_then(|path| Ok((path, scalar_from_json(&request.value)?)))
        {
            Ok(parsed) => parsed,
            Err(e) => return format!("Error: {}", e),
        };

        self.edit(request.form, "set argument", |form| {
            form.set_scalar(&path, value)
        })
        .await
    }

    #[tool(description = "Replace a whole field of a tuple argument with a JSON value")]
    async fn set_tuple_field(&self, #[tool(aggr)] request: SetTupleFieldRequest) -> String {
        let path = match parse_path(&request.path) {
            Ok(path) => path,
            Err(e) => return format!("Error: {}", e),
        };
        let node = match ValueNode::try_from(&request.value) {
            Ok(node) => node,
            Err(e) => return format!("Error: {}", e),
        };
        let field = match request.field.parse::<usize>() {
            Ok(index) => PathKey::Index(index),
            Err(_) => PathKey::Field(request.field),
        };

        self.edit(request.form, "set tuple field", |form| {
            form.set_tuple_field(&path, field, node)
        })
        .await
    }

    #[tool(description = "Append a default element to an array argument")]
    async fn add_array_element(&self, #[tool(aggr)] request: ArrayRequest) -> String {
        let path = match parse_path(&request.path) {
            Ok(path) => path,
            Err(e) => return format!("Error: {}", e),
        };

        self.edit(request.form, "add array element", |form| {
            form.insert_array_element(&path)
        })
        .await
    }

    #[tool(description = "Remove the element at an index from an array argument")]
    async fn remove_array_element(&self, #[tool(aggr)] request: RemoveElementRequest) -> String {
        let path = match parse_path(&request.path) {
            Ok(path) => path,
            Err(e) => return format!("Error: {}", e),
        };

        self.edit(request.form, "remove array element", |form| {
            form.remove_array_element(&path, request.index)
        })
        .await
    }

    #[tool(description = "Render the equivalent Foundry `cast` command for a form")]
    async fn preview_command(&self, #[tool(aggr)] request: FormRequest) -> String {
        let explorer = self.explorer.lock().await;

        match explorer.render_command(request.form.into()) {
            Ok(command) => command,
            Err(e) => format!("Error: {}", e),
        }
    }

    #[tool(description = "Execute the selected function: eth_call for reads, a signed transaction for writes")]
    async fn execute_function(&self, #[tool(aggr)] request: FormRequest) -> String {
        let mut explorer = self.explorer.lock().await;

        match explorer.execute(request.form.into()).await {
            Ok(result) => pretty(&result),
            Err(e) => {
                error!("Failed to execute function: {}", e);
                format!("Error: {}", e)
            }
        }
    }

    #[tool(description = "Check that the contract address has deployed bytecode")]
    async fn validate_bytecode(&self) -> String {
        let mut explorer = self.explorer.lock().await;

        match explorer.validate_bytecode().await {
            Ok(bytecode) => pretty(&serde_json::json!({
                "status": "success",
                "bytecode": bytecode,
            })),
            Err(e) => {
                error!("Bytecode validation failed: {}", e);
                format!("Error: {}", e)
            }
        }
    }

    #[tool(description = "Connect a signing wallet from a private key or the configured key")]
    async fn connect_wallet(&self, #[tool(aggr)] request: ConnectWalletRequest) -> String {
        let mut explorer = self.explorer.lock().await;

        match explorer.connect_wallet(request.private_key.as_deref()) {
            Ok(address) => format!("Wallet connected: {}", address),
            Err(e) => {
                error!("Failed to connect wallet: {}", e);
                format!("Error: {}", e)
            }
        }
    }

    #[tool(description = "Disconnect the signing wallet")]
    async fn disconnect_wallet(&self) -> String {
        let mut explorer = self.explorer.lock().await;
        explorer.disconnect_wallet();
        "Wallet disconnected".to_string()
    }

    #[tool(description = "List transactions sent in this session, newest first")]
    async fn transaction_history(&self) -> String {
        let explorer = self.explorer.lock().await;
        pretty(&explorer.history())
    }

    #[tool(description = "Fetch a transaction and its receipt by hash")]
    async fn view_transaction(&self, #[tool(aggr)] request: ViewTransactionRequest) -> String {
        let explorer = self.explorer.lock().await;

        match explorer.view_transaction(&request.hash).await {
            Ok(details) => pretty(&details),
            Err(e) => {
                error!("Failed to fetch transaction: {}", e);
                format!("Error: {}", e)
            }
        }
    }

    #[tool(description = "Clear saved inputs, connection, forms and history")]
    async fn reset_session(&self) -> String {
        let mut explorer = self.explorer.lock().await;

        match explorer.reset().await {
            Ok(()) => "Session reset".to_string(),
            Err(e) => {
                error!("Failed to reset session: {}", e);
                format!("Error: {}", e)
            }
        }
    }
}

#[tool(tool_box)]
impl ServerHandler for ExplorerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Interactive explorer for an Ethereum contract. Configure an endpoint, address and ABI, connect, select a function, fill its arguments by dotted path, then preview the equivalent cast command or execute it.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
