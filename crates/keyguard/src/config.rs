//! Key manager configuration.

use keyguard_core::Address;
use serde::{Deserialize, Serialize};

/// Configuration for a [`KeyManager`](crate::KeyManager).
///
/// Missing fields take their defaults when read from JSON:
///
/// ```
/// use keyguard::KeyManagerConfig;
///
/// let config = KeyManagerConfig::from_json(r#"{ "chain_id": 42 }"#).unwrap();
/// assert_eq!(config.chain_id, 42);
/// assert!(config.reentrancy_enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyManagerConfig {
    /// Chain id bound into relay signatures.
    pub chain_id: u64,
    /// This engine's own address, bound into relay signatures.
    pub engine_address: Address,
    /// Require REENTRANCY from principals calling back in while a request is
    /// being forwarded. When off, nested calls are evaluated like top-level
    /// ones.
    pub reentrancy_enabled: bool,
}

impl Default for KeyManagerConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            engine_address: Address::ZERO,
            reentrancy_enabled: true,
        }
    }
}

impl KeyManagerConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KeyManagerConfig::default();
        assert_eq!(config.chain_id, 1);
        assert_eq!(config.engine_address, Address::ZERO);
        assert!(config.reentrancy_enabled);
    }

    #[test]
    fn test_from_json() {
        let json = format!(
            r#"{{ "chain_id": 4201, "engine_address": "0x{}", "reentrancy_enabled": false }}"#,
            "ee".repeat(20)
        );
        let config = KeyManagerConfig::from_json(&json).unwrap();
        assert_eq!(config.chain_id, 4201);
        assert_eq!(config.engine_address, Address::from_bytes([0xee; 20]));
        assert!(!config.reentrancy_enabled);
    }

    #[test]
    fn test_rejects_malformed_address() {
        assert!(KeyManagerConfig::from_json(r#"{ "engine_address": "0x1234" }"#).is_err());
    }
}
