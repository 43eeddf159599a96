//! The ledger oracle: the external source of truth for license ownership.
//!
//! The ledger records lifetime licenses only; expiry semantics live in
//! local grants. The oracle exposes a single read-only query.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tiny_keccak::{Hasher, Keccak};

use vaultstream_core::WalletAddress;

use crate::error::{LedgerError, Result};

/// The single query the delivery pipeline needs from the ledger.
#[async_trait]
pub trait LedgerOracle: Send + Sync {
    /// Does `wallet` hold a license for the asset minted as
    /// `registration_id`?
    async fn has_license(&self, wallet: &WalletAddress, registration_id: &str) -> Result<bool>;
}

/// Production oracle: queries the licensing contract via JSON-RPC
/// `eth_call`.
///
/// The call data is ABI-encoded by hand: the 4-byte Keccak selector of
/// `checkLicense(address,uint256)` followed by the padded wallet address
/// and token id. The contract returns one 32-byte word; non-zero means
/// the license exists.
pub struct JsonRpcLedger {
    http: reqwest::Client,
    rpc_url: String,
    contract: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    message: String,
}

impl JsonRpcLedger {
    /// Create an oracle for the licensing contract at `contract`,
    /// reachable through the JSON-RPC endpoint at `rpc_url`.
    pub fn new(rpc_url: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            rpc_url: rpc_url.into(),
            contract: contract.into(),
        }
    }

    /// ABI-encode the `checkLicense(address,uint256)` call.
    pub fn encode_call(wallet: &WalletAddress, registration_id: &str) -> Result<Vec<u8>> {
        let token_id: u128 = registration_id
            .parse()
            .map_err(|_| LedgerError::InvalidRegistrationId(registration_id.to_string()))?;

        let mut data = Vec::with_capacity(4 + 32 + 32);
        data.extend_from_slice(&selector(b"checkLicense(address,uint256)"));

        // address: left-padded to 32 bytes
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(wallet.as_bytes());

        // uint256: left-padded big-endian
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(&token_id.to_be_bytes());

        Ok(data)
    }
}

/// First four bytes of the Keccak-256 hash of a function signature.
fn selector(signature: &[u8]) -> [u8; 4] {
    let mut hasher = Keccak::v256();
    hasher.update(signature);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    [out[0], out[1], out[2], out[3]]
}

#[async_trait]
impl LedgerOracle for JsonRpcLedger {
    async fn has_license(&self, wallet: &WalletAddress, registration_id: &str) -> Result<bool> {
        let data = Self::encode_call(wallet, registration_id)?;

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                { "to": self.contract, "data": format!("0x{}", hex::encode(data)) },
                "latest"
            ],
        });

        let response: RpcResponse = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(LedgerError::Rpc(err.message));
        }
        let result = response
            .result
            .ok_or_else(|| LedgerError::InvalidResponse("missing result".into()))?;

        let word = result.strip_prefix("0x").unwrap_or(&result);
        let bytes = hex::decode(word)
            .map_err(|_| LedgerError::InvalidResponse(format!("non-hex result: {result}")))?;
        Ok(bytes.iter().any(|&b| b != 0))
    }
}

/// In-memory oracle for tests: a set of `(wallet, registration_id)`
/// pairs, plus a switch to simulate an unreachable endpoint.
#[derive(Default)]
pub struct StaticLedger {
    licenses: RwLock<HashSet<(WalletAddress, String)>>,
    unreachable: RwLock<bool>,
}

impl StaticLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a lifetime license.
    pub fn grant(&self, wallet: WalletAddress, registration_id: impl Into<String>) {
        self.licenses
            .write()
            .expect("ledger lock poisoned")
            .insert((wallet, registration_id.into()));
    }

    /// Make every query fail, simulating an unreachable oracle.
    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.write().expect("ledger lock poisoned") = unreachable;
    }
}

#[async_trait]
impl LedgerOracle for StaticLedger {
    async fn has_license(&self, wallet: &WalletAddress, registration_id: &str) -> Result<bool> {
        if *self.unreachable.read().expect("ledger lock poisoned") {
            return Err(LedgerError::InvalidResponse("oracle unreachable".into()));
        }
        Ok(self
            .licenses
            .read()
            .expect("ledger lock poisoned")
            .contains(&(*wallet, registration_id.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_call_layout() {
        let wallet = WalletAddress::from_bytes([0x11; 20]);
        let data = JsonRpcLedger::encode_call(&wallet, "7").unwrap();

        assert_eq!(data.len(), 4 + 32 + 32);
        // Selector of checkLicense(address,uint256).
        assert_eq!(&data[..4], &selector(b"checkLicense(address,uint256)"));
        // Address word: 12 zero bytes then the address.
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], wallet.as_bytes());
        // Token id word: big-endian 7.
        assert_eq!(&data[36..67], &[0u8; 31]);
        assert_eq!(data[67], 7);
    }

    #[test]
    fn test_encode_call_rejects_non_numeric_id() {
        let wallet = WalletAddress::from_bytes([0x22; 20]);
        assert!(matches!(
            JsonRpcLedger::encode_call(&wallet, "not-a-token").unwrap_err(),
            LedgerError::InvalidRegistrationId(_)
        ));
    }

    #[test]
    fn test_selector_is_stable() {
        // Keccak of the signature must be deterministic across runs.
        assert_eq!(
            selector(b"checkLicense(address,uint256)"),
            selector(b"checkLicense(address,uint256)")
        );
        assert_ne!(
            selector(b"checkLicense(address,uint256)"),
            selector(b"balanceOf(address)")
        );
    }

    #[tokio::test]
    async fn test_static_ledger() {
        let ledger = StaticLedger::new();
        let wallet = WalletAddress::from_bytes([0x33; 20]);

        assert!(!ledger.has_license(&wallet, "1").await.unwrap());
        ledger.grant(wallet, "1");
        assert!(ledger.has_license(&wallet, "1").await.unwrap());
        assert!(!ledger.has_license(&wallet, "2").await.unwrap());

        ledger.set_unreachable(true);
        assert!(ledger.has_license(&wallet, "1").await.is_err());
    }
}
