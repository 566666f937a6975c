use alloy::{
    dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt},
    json_abi::Function,
    network::TransactionBuilder,
    primitives::{Address, Bytes},
    providers::{Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
};
use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use super::{CallResult, PastTransaction, Status};
use crate::config::Config;
use crate::ethereum::{abi::ContractAbi, provider::RpcProvider, utils, wallet::Wallet};
use crate::form::{ArgumentForm, CommandContext, FormError, Mutability};
use crate::session::{SavedSession, SessionStore};

/// A contract the session is connected to.
#[derive(Debug)]
struct Connection {
    provider: RpcProvider,
    address: Address,
    abi: ContractAbi,
}

impl Connection {
    fn summary(&self) -> ConnectionSummary {
        ConnectionSummary {
            address: self.address.to_checksum(None),
            rpc_url: self.provider.rpc_url().to_string(),
            read_functions: signatures(self.abi.read_functions()),
            write_functions: signatures(self.abi.write_functions()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSummary {
    pub address: String,
    pub rpc_url: String,
    pub read_functions: Vec<String>,
    pub write_functions: Vec<String>,
}

/// Everything a client needs to redraw the explorer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub rpc_url: String,
    pub contract_address: String,
    pub abi_loaded: bool,
    pub connection_status: Status,
    pub connection_error: Option<String>,
    pub validation_status: Status,
    pub validation_error: Option<String>,
    /// Size in bytes of the deployed code found by the last validation.
    pub bytecode_size: Option<usize>,
    pub wallet: Option<String>,
    pub selected_read: Option<String>,
    pub selected_write: Option<String>,
    pub transactions: usize,
}

/// Explorer state for one user: inputs, connection, the selected read and write forms,
/// the wallet and the transaction history.
#[derive(Debug)]
pub struct ContractExplorer {
    config: Config,
    store: Option<SessionStore>,
    inputs: SavedSession,
    connection: Option<Connection>,
    connection_status: Status,
    connection_error: Option<String>,
    validation_status: Status,
    validation_error: Option<String>,
    bytecode: Option<Bytes>,
    read_form: Option<ArgumentForm>,
    write_form: Option<ArgumentForm>,
    wallet: Option<Wallet>,
    history: Vec<PastTransaction>,
}

impl ContractExplorer {
    /// Start a session, restoring saved inputs from `store` when present.
    pub async fn new(config: Config, store: Option<SessionStore>) -> Self {
        let mut inputs = SavedSession {
            rpc_url: config.rpc_url.clone(),
            ..SavedSession::default()
        };

        if let Some(store) = &store {
            match store.load().await {
                Ok(Some(saved)) => {
                    info!("Restored previous session from {:?}", store.path());
                    inputs = saved;
                    if inputs.rpc_url.trim().is_empty() {
                        inputs.rpc_url = config.rpc_url.clone();
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Ignoring saved session: {}", e),
            }
        }

        let wallet = config
            .wallet
            .private_key
            .as_deref()
            .and_then(|key| match Wallet::from_private_key(key) {
                Ok(wallet) => Some(wallet),
                Err(e) => {
                    warn!("Configured wallet key rejected: {}", e);
                    None
                }
            });

        Self {
            config,
            store,
            inputs,
            connection: None,
            connection_status: Status::Idle,
            connection_error: None,
            validation_status: Status::Idle,
            validation_error: None,
            bytecode: None,
            read_form: None,
            write_form: None,
            wallet,
            history: Vec::new(),
        }
    }

    pub fn inputs(&self) -> &SavedSession {
        &self.inputs
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            rpc_url: self.inputs.rpc_url.clone(),
            contract_address: self.inputs.contract_address.clone(),
            abi_loaded: !self.inputs.abi.trim().is_empty(),
            connection_status: self.connection_status,
            connection_error: self.connection_error.clone(),
            validation_status: self.validation_status,
            validation_error: self.validation_error.clone(),
            bytecode_size: self.bytecode.as_ref().map(|code| code.len()),
            wallet: self.wallet_address(),
            selected_read: self.read_form.as_ref().map(|f| f.function().signature.clone()),
            selected_write: self
                .write_form
                .as_ref()
                .map(|f| f.function().signature.clone()),
            transactions: self.history.len(),
        }
    }

    /// Change any of the endpoint, contract address or ABI text, and persist them.
    ///
    /// Any edit drops the current connection and forms. Editing the endpoint or address
    /// also clears the bytecode check.
    pub async fn update_inputs(
        &mut self,
        rpc_url: Option<String>,
        contract_address: Option<String>,
        abi: Option<String>,
    ) -> Result<()> {
        if let Some(rpc_url) = rpc_url {
            self.inputs.rpc_url = rpc_url;
            self.invalidate_target();
        }
        if let Some(contract_address) = contract_address {
            self.inputs.contract_address = contract_address;
            self.invalidate_target();
        }
        if let Some(abi) = abi {
            self.inputs.abi = abi;
            self.drop_connection();
        }
        self.persist().await
    }

    fn invalidate_target(&mut self) {
        self.validation_status = Status::Idle;
        self.bytecode = None;
        self.drop_connection();
    }

    /// Drop the bound contract and both forms; nothing executes until `connect` runs again.
    fn drop_connection(&mut self) {
        if self.connection.take().is_some() {
            debug!("Inputs changed, contract connection dropped");
        }
        self.read_form = None;
        self.write_form = None;
        self.connection_status = Status::Idle;
        self.connection_error = None;
    }

    async fn persist(&self) -> Result<()> {
        match &self.store {
            Some(store) => store.save(&self.inputs).await,
            None => Ok(()),
        }
    }

    /// Parse the ABI and bind it to the endpoint and address. Selects the first read and
    /// first write function.
    pub fn connect(&mut self) -> Result<ConnectionSummary> {
        self.drop_connection();

        let connection = match self.open_connection() {
            Ok(connection) => connection,
            Err(e) => {
                warn!("Failed to connect to contract: {}", e);
                self.connection_status = Status::Error;
                self.connection_error = Some(e.to_string());
                return Err(e);
            }
        };

        self.read_form = connection
            .abi
            .read_functions()
            .first()
            .cloned()
            .map(ArgumentForm::new);
        self.write_form = connection
            .abi
            .write_functions()
            .first()
            .cloned()
            .map(ArgumentForm::new);

        let summary = connection.summary();
        info!(
            "Connected to {} with {} read and {} write functions",
            summary.address,
            summary.read_functions.len(),
            summary.write_functions.len()
        );

        self.connection = Some(connection);
        self.connection_status = Status::Success;
        Ok(summary)
    }

    fn open_connection(&self) -> Result<Connection> {
        let provider = RpcProvider::new(&self.inputs.rpc_url)?;
        let address = utils::validate_address(&self.inputs.contract_address)
            .map_err(|e| anyhow!("Invalid contract address: {}", e))?;
        let abi = ContractAbi::parse(&self.inputs.abi)?;
        Ok(Connection {
            provider,
            address,
            abi,
        })
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| anyhow!("Not connected. Connect to a contract first."))
    }

    pub fn functions(&self) -> Result<ConnectionSummary> {
        Ok(self.connection()?.summary())
    }

    /// Select a function by signature or unique name. Always starts from a fresh form.
    pub fn select_function(&mut self, key: &str) -> Result<&ArgumentForm> {
        let descriptor = self.connection()?.abi.find(key)?.clone();
        debug!("Selected {}", descriptor.signature);
        let form = ArgumentForm::new(descriptor);
        let slot = self.slot_mut(form.function().mutability);
        Ok(&*slot.insert(form))
    }

    pub fn form(&self, kind: Mutability) -> Result<&ArgumentForm> {
        let slot = match kind {
            Mutability::Read => &self.read_form,
            Mutability::Write => &self.write_form,
        };
        slot.as_ref()
            .ok_or_else(|| anyhow!("No {} function selected", kind_label(kind)))
    }

    fn slot_mut(&mut self, kind: Mutability) -> &mut Option<ArgumentForm> {
        match kind {
            Mutability::Read => &mut self.read_form,
            Mutability::Write => &mut self.write_form,
        }
    }

    /// Apply an edit to the selected form. On failure the form is left as it was.
    pub fn edit_form<F>(&mut self, kind: Mutability, edit: F) -> Result<&ArgumentForm>
    where
        F: FnOnce(&ArgumentForm) -> Result<ArgumentForm, FormError>,
    {
        let updated = edit(self.form(kind)?)?;
        Ok(&*self.slot_mut(kind).insert(updated))
    }

    pub fn command_context(&self) -> CommandContext {
        CommandContext {
            address: Some(self.inputs.contract_address.clone()),
            rpc_url: Some(self.inputs.rpc_url.clone()),
            signer: self.wallet_address(),
        }
    }

    /// Equivalent `cast` command for the selected form.
    pub fn render_command(&self, kind: Mutability) -> Result<String> {
        Ok(self.form(kind)?.render_command(&self.command_context()))
    }

    /// Run the selected function: `eth_call` for reads, a signed transaction for writes.
    pub async fn execute(&mut self, kind: Mutability) -> Result<CallResult> {
        let connection = self.connection()?;
        let form = self.form(kind)?.clone();
        let function = connection.abi.function(form.function())?.clone();

        let args = match form.to_call_args() {
            Ok(args) => args,
            Err(e) => return Ok(CallResult::failure(e.to_string())),
        };
        let calldata = match encode_input(&function, &args) {
            Ok(data) => data,
            Err(e) => {
                return Ok(CallResult::failure(format!(
                    "Failed to encode function call: {}",
                    e
                )))
            }
        };

        if form.function().is_write() {
            self.send_transaction(&function, calldata).await
        } else {
            Ok(self.call_function(&function, calldata).await)
        }
    }

    async fn call_function(&self, function: &Function, calldata: Bytes) -> CallResult {
        let Some(connection) = &self.connection else {
            return CallResult::failure("Not connected. Connect to a contract first.");
        };

        match connection.provider.call(connection.address, calldata).await {
            Ok(result_bytes) => match decode_output(function, &result_bytes) {
                Ok(decoded) => CallResult {
                    success: true,
                    result: Some(decoded),
                    error: None,
                    transaction_hash: None,
                },
                Err(e) => CallResult {
                    success: false,
                    result: Some(serde_json::json!({
                        "raw_result": format!("0x{}", hex::encode(&result_bytes)),
                        "decode_error": e.to_string()
                    })),
                    error: Some(format!("Failed to decode result: {}", e)),
                    transaction_hash: None,
                },
            },
            Err(e) => CallResult::failure(e.to_string()),
        }
    }

    async fn send_transaction(&mut self, function: &Function, calldata: Bytes) -> Result<CallResult> {
        if !self.config.security.allow_write_operations {
            return Ok(CallResult::failure(
                "Write operations are disabled. Use --allow-writes flag to enable transaction sending.",
            ));
        }
        let connection = self
            .connection
            .as_ref()
            .ok_or_else(|| anyhow!("Not connected. Connect to a contract first."))?;
        let Some(wallet) = self.wallet.as_mut() else {
            return Ok(CallResult::failure(
                "Wallet not connected. Please connect your wallet before sending transactions.",
            ));
        };

        let chain_id = match connection.provider.get_chain_id().await {
            Ok(chain_id) => chain_id,
            Err(e) => return Ok(CallResult::failure(e.to_string())),
        };
        wallet.switch_chain(chain_id);
        let from_address = wallet.address();

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet.ethereum_wallet())
            .on_http(connection.provider.rpc_url().clone());

        let mut tx_request = TransactionRequest::default()
            .with_from(from_address)
            .with_to(connection.address)
            .with_input(calldata)
            .with_chain_id(chain_id);

        match provider.estimate_gas(&tx_request).await {
            Ok(estimated_gas) => {
                tx_request = tx_request.with_gas_limit(estimated_gas);
            }
            Err(e) => {
                warn!("Gas estimation failed, using default: {}", e);
                tx_request = tx_request.with_gas_limit(self.config.gas.default_gas_limit);
            }
        }

        info!(
            "Sending {} to {:?} from {:?}",
            function.name, connection.address, from_address
        );

        match provider.send_transaction(tx_request).await {
            Ok(pending_tx) => {
                let hash = format!("0x{:x}", pending_tx.tx_hash());
                info!("Transaction sent with hash: {}", hash);

                self.history.insert(
                    0,
                    PastTransaction {
                        hash: hash.clone(),
                        method: function.name.clone(),
                        timestamp: now_millis(),
                    },
                );
                Ok(CallResult {
                    success: true,
                    result: Some(Value::String(format!("Transaction sent! Hash: {}", hash))),
                    error: None,
                    transaction_hash: Some(hash),
                })
            }
            Err(e) => Ok(CallResult::failure(format!(
                "Failed to send transaction: {}",
                utils::interpret_rpc_error(&e.to_string())
            ))),
        }
    }

    /// Fetch deployed bytecode at the contract address and record the outcome.
    pub async fn validate_bytecode(&mut self) -> Result<String> {
        self.validation_status = Status::Idle;
        self.validation_error = None;
        self.bytecode = None;

        match self.fetch_bytecode().await {
            Ok(code) => {
                let hex_code = format!("0x{}", hex::encode(&code));
                self.bytecode = Some(code);
                self.validation_status = Status::Success;
                Ok(hex_code)
            }
            Err(e) => {
                self.validation_status = Status::Error;
                self.validation_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch_bytecode(&self) -> Result<Bytes> {
        let provider = RpcProvider::new(&self.inputs.rpc_url)?;
        let address = utils::validate_address(&self.inputs.contract_address)
            .map_err(|e| anyhow!("Invalid contract address: {}", e))?;
        if !provider.check_connection().await? {
            return Err(anyhow!("Could not reach RPC endpoint {}", provider.rpc_url()));
        }
        let code = provider.get_code(address).await?;
        if code.is_empty() {
            return Err(anyhow!(
                "Address is not a contract or does not have bytecode."
            ));
        }
        Ok(code)
    }

    pub fn history(&self) -> &[PastTransaction] {
        &self.history
    }

    /// Transaction and receipt for a hash, fetched from the connected endpoint.
    pub async fn view_transaction(&self, hash: &str) -> Result<Value> {
        let hash = utils::validate_tx_hash(hash)?;
        self.connection()?.provider.get_transaction(hash).await
    }

    /// Load a signing key, from `private_key` or else the configured one.
    pub fn connect_wallet(&mut self, private_key: Option<&str>) -> Result<String> {
        let key = private_key
            .or(self.config.wallet.private_key.as_deref())
            .ok_or_else(|| {
                anyhow!("Wallet not found. Provide a private key or set EXPLORER_PRIVATE_KEY.")
            })?;
        let wallet = Wallet::from_private_key(key)?;
        let address = wallet.address().to_checksum(None);
        self.wallet = Some(wallet);
        Ok(address)
    }

    pub fn disconnect_wallet(&mut self) {
        if self.wallet.take().is_some() {
            info!("Wallet disconnected");
        }
    }

    pub fn wallet_address(&self) -> Option<String> {
        self.wallet.as_ref().map(|w| w.address().to_checksum(None))
    }

    /// Forget saved inputs and every derived state. The wallet stays connected.
    pub async fn reset(&mut self) -> Result<()> {
        if let Some(store) = &self.store {
            store.clear().await?;
        }

        self.inputs = SavedSession {
            rpc_url: self.config.rpc_url.clone(),
            ..SavedSession::default()
        };
        self.connection = None;
        self.connection_status = Status::Idle;
        self.connection_error = None;
        self.validation_status = Status::Idle;
        self.validation_error = None;
        self.bytecode = None;
        self.read_form = None;
        self.write_form = None;
        self.history.clear();

        info!("Session reset");
        Ok(())
    }
}

fn signatures(functions: &[crate::form::FunctionDescriptor]) -> Vec<String> {
    functions.iter().map(|f| f.signature.clone()).collect()
}

fn kind_label(kind: Mutability) -> &'static str {
    match kind {
        Mutability::Read => "read",
        Mutability::Write => "write",
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Selector followed by the ABI-encoded arguments.
fn encode_input(function: &Function, args: &[DynSolValue]) -> Result<Bytes> {
    let encoded = function
        .abi_encode_input(args)
        .map_err(|e| anyhow!("Failed to encode function inputs: {}", e))?;
    Ok(encoded.into())
}

/// Decode call output to JSON. A single return value is unwrapped.
fn decode_output(function: &Function, result_bytes: &Bytes) -> Result<Value> {
    if result_bytes.is_empty() {
        return Ok(Value::Null);
    }

    let decoded = function
        .abi_decode_output(result_bytes, false)
        .map_err(|e| anyhow!("Failed to decode output: {}", e))?;

    if decoded.len() == 1 {
        value_to_json(&decoded[0])
    } else {
        decoded
            .iter()
            .map(value_to_json)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }
}

/// Large integers become decimal strings so no precision is lost in JSON.
fn value_to_json(value: &DynSolValue) -> Result<Value> {
    match value {
        DynSolValue::Address(addr) => Ok(Value::String(addr.to_checksum(None))),
        DynSolValue::Uint(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Int(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Bool(b) => Ok(Value::Bool(*b)),
        DynSolValue::String(s) => Ok(Value::String(s.clone())),
        DynSolValue::Bytes(bytes) => Ok(Value::String(format!("0x{}", hex::encode(bytes)))),
        DynSolValue::FixedBytes(word, size) => {
            Ok(Value::String(format!("0x{}", hex::encode(&word[..*size]))))
        }
        DynSolValue::Function(function) => {
            Ok(Value::String(format!("0x{}", hex::encode(function))))
        }
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            items
                .iter()
                .map(value_to_json)
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        #[allow(unreachable_patterns)]
        _ => Err(anyhow!("Unsupported DynSolValue type: {:?}", value)),
    }
}
