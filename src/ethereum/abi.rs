use alloy::json_abi::{Function, JsonAbi};
use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::form::{FunctionDescriptor, Mutability};

/// A parsed contract ABI with its functions split into read and write lists.
#[derive(Debug, Clone)]
pub struct ContractAbi {
    abi: JsonAbi,
    reads: Vec<FunctionDescriptor>,
    writes: Vec<FunctionDescriptor>,
}

impl ContractAbi {
    /// Parse ABI JSON text. The top level must be a JSON array of ABI items.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| anyhow!("Failed to parse ABI JSON: {}", e))?;
        if !value.is_array() {
            return Err(anyhow!("ABI must be a JSON array."));
        }
        let abi: JsonAbi =
            serde_json::from_value(value).map_err(|e| anyhow!("Invalid ABI: {}", e))?;

        let mut reads = Vec::new();
        let mut writes = Vec::new();
        for function in abi.functions() {
            match FunctionDescriptor::from_function(function) {
                Ok(descriptor) => match descriptor.mutability {
                    Mutability::Read => reads.push(descriptor),
                    Mutability::Write => writes.push(descriptor),
                },
                Err(e) => warn!("Skipping function '{}': {}", function.name, e),
            }
        }
        reads.sort_by(|a, b| a.signature.cmp(&b.signature));
        writes.sort_by(|a, b| a.signature.cmp(&b.signature));

        debug!(
            "Parsed ABI with {} read and {} write functions",
            reads.len(),
            writes.len()
        );
        Ok(Self { abi, reads, writes })
    }

    pub fn read_functions(&self) -> &[FunctionDescriptor] {
        &self.reads
    }

    pub fn write_functions(&self) -> &[FunctionDescriptor] {
        &self.writes
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.reads.iter().chain(self.writes.iter())
    }

    /// Look up a function by full signature, or by bare name when it is not overloaded.
    pub fn find(&self, key: &str) -> Result<&FunctionDescriptor> {
        let key: String = key.chars().filter(|c| !c.is_whitespace()).collect();

        if let Some(found) = self.functions().find(|f| f.signature == key) {
            return Ok(found);
        }

        let by_name: Vec<&FunctionDescriptor> =
            self.functions().filter(|f| f.name == key).collect();
        match by_name.as_slice() {
            [single] => Ok(*single),
            [] => {
                let available: Vec<&str> =
                    self.functions().map(|f| f.signature.as_str()).collect();
                if available.is_empty() {
                    Err(anyhow!(
                        "Function '{}' not found. The contract ABI contains no functions.",
                        key
                    ))
                } else {
                    Err(anyhow!(
                        "Function '{}' not found in contract ABI. Available functions: {}",
                        key,
                        available.join(", ")
                    ))
                }
            }
            overloads => {
                let candidates: Vec<&str> =
                    overloads.iter().map(|f| f.signature.as_str()).collect();
                Err(anyhow!(
                    "Function '{}' is overloaded. Use one of: {}",
                    key,
                    candidates.join(", ")
                ))
            }
        }
    }

    /// The ABI entry behind a descriptor, used for calldata encoding and output decoding.
    pub fn function(&self, descriptor: &FunctionDescriptor) -> Result<&Function> {
        self.abi
            .function(&descriptor.name)
            .into_iter()
            .flatten()
            .find(|f| f.signature() == descriptor.signature)
            .ok_or_else(|| anyhow!("Function '{}' not found in ABI", descriptor.signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN_ABI: &str = r#"[
        {"type":"constructor","inputs":[{"name":"supply","type":"uint256"}],"stateMutability":"nonpayable"},
        {"type":"function","name":"balanceOf","stateMutability":"view",
         "inputs":[{"name":"owner","type":"address"}],"outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"transfer","stateMutability":"nonpayable",
         "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
         "outputs":[{"name":"","type":"bool"}]},
        {"type":"function","name":"safeTransferFrom","stateMutability":"nonpayable",
         "inputs":[{"name":"from","type":"address"},{"name":"to","type":"address"},{"name":"id","type":"uint256"}],
         "outputs":[]},
        {"type":"function","name":"safeTransferFrom","stateMutability":"nonpayable",
         "inputs":[{"name":"from","type":"address"},{"name":"to","type":"address"},{"name":"id","type":"uint256"},{"name":"data","type":"bytes"}],
         "outputs":[]},
        {"type":"function","name":"name","stateMutability":"pure","inputs":[],"outputs":[{"name":"","type":"string"}]},
        {"type":"event","name":"Transfer","anonymous":false,"inputs":[
         {"name":"from","type":"address","indexed":true},{"name":"to","type":"address","indexed":true},
         {"name":"value","type":"uint256","indexed":false}]}
    ]"#;

    #[test]
    fn test_split_read_write() {
        let abi = ContractAbi::parse(TOKEN_ABI).unwrap();
        let reads: Vec<&str> = abi
            .read_functions()
            .iter()
            .map(|f| f.signature.as_str())
            .collect();
        assert_eq!(reads, vec!["balanceOf(address)", "name()"]);
        assert_eq!(abi.write_functions().len(), 3);
    }

    #[test]
    fn test_rejects_non_array() {
        let err = ContractAbi::parse(r#"{"abi": []}"#).unwrap_err();
        assert_eq!(err.to_string(), "ABI must be a JSON array.");
        assert!(ContractAbi::parse("not json").is_err());
    }

    #[test]
    fn test_find_by_signature_and_name() {
        let abi = ContractAbi::parse(TOKEN_ABI).unwrap();
        assert_eq!(abi.find("transfer").unwrap().signature, "transfer(address,uint256)");
        assert_eq!(
            abi.find("safeTransferFrom(address, address, uint256)")
                .unwrap()
                .inputs
                .len(),
            3
        );

        let err = abi.find("safeTransferFrom").unwrap_err().to_string();
        assert!(err.contains("overloaded"));
        assert!(abi.find("mint").is_err());
    }

    #[test]
    fn test_function_for_descriptor() {
        let abi = ContractAbi::parse(TOKEN_ABI).unwrap();
        let descriptor = abi
            .find("safeTransferFrom(address,address,uint256,bytes)")
            .unwrap();
        let function = abi.function(descriptor).unwrap();
        assert_eq!(function.inputs.len(), 4);
    }
}
