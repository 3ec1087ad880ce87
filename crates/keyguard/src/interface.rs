//! Interface ids the key manager answers to in
//! [`KeyManager::supports_interface`](crate::KeyManager::supports_interface).

/// Interface detection itself.
pub const INTERFACE_ID_ERC165: [u8; 4] = [0x01, 0xff, 0xc9, 0xa7];

/// Signature validation on behalf of the resource.
pub const INTERFACE_ID_ERC1271: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// The key manager.
pub const INTERFACE_ID_LSP6: [u8; 4] = [0x23, 0xf3, 0x4c, 0x62];

/// Verification of calls made directly on the resource.
pub const INTERFACE_ID_LSP20_CALL_VERIFIER: [u8; 4] = [0x1a, 0x0e, 0xb6, 0xa5];

/// Relay execution.
pub const INTERFACE_ID_LSP25_EXECUTE_RELAY_CALL: [u8; 4] = [0x5a, 0xc7, 0x99, 0x08];

pub(crate) const SUPPORTED_INTERFACES: [[u8; 4]; 5] = [
    INTERFACE_ID_ERC165,
    INTERFACE_ID_ERC1271,
    INTERFACE_ID_LSP6,
    INTERFACE_ID_LSP20_CALL_VERIFIER,
    INTERFACE_ID_LSP25_EXECUTE_RELAY_CALL,
];
