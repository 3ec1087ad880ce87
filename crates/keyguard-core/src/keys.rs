//! Data key layout for permission data stored in the resource.
//!
//! Per-controller keys are `prefix(10) || 0x0000 || address(20)`. The
//! controller list is an array: a length key plus one key per index.

use crate::types::{Address, DataKey};

/// `AddressPermissions[]`: holds the number of controllers (16 bytes).
pub const ADDRESS_PERMISSIONS_ARRAY: [u8; 32] = [
    0xdf, 0x30, 0xdb, 0xa0, 0x6d, 0xb6, 0xa3, 0x0e, 0x65, 0x35, 0x4d, 0x9a, 0x64, 0xc6, 0x09,
    0x86, 0x1f, 0x08, 0x95, 0x45, 0xca, 0x58, 0xc6, 0xb4, 0xdb, 0xe3, 0x1a, 0x5f, 0x33, 0x8c,
    0xb0, 0xe3,
];

/// First half of `AddressPermissions[]`, completed by a u128 index.
pub const ADDRESS_PERMISSIONS_ARRAY_PREFIX: [u8; 16] = [
    0xdf, 0x30, 0xdb, 0xa0, 0x6d, 0xb6, 0xa3, 0x0e, 0x65, 0x35, 0x4d, 0x9a, 0x64, 0xc6, 0x09,
    0x86,
];

/// Shared prefix of every `AddressPermissions:*` key.
pub const ADDRESS_PERMISSIONS_PREFIX: [u8; 6] = [0x4b, 0x80, 0x74, 0x2d, 0xe2, 0xbf];

/// `AddressPermissions:Permissions:<address>`.
pub const PERMISSIONS_PREFIX: [u8; 12] = [
    0x4b, 0x80, 0x74, 0x2d, 0xe2, 0xbf, 0x82, 0xac, 0xb3, 0x63, 0x00, 0x00,
];

/// `AddressPermissions:AllowedCalls:<address>`.
pub const ALLOWED_CALLS_PREFIX: [u8; 12] = [
    0x4b, 0x80, 0x74, 0x2d, 0xe2, 0xbf, 0x39, 0x3a, 0x64, 0xc7, 0x00, 0x00,
];

/// `AddressPermissions:AllowedERC725YDataKeys:<address>`.
pub const ALLOWED_DATA_KEYS_PREFIX: [u8; 12] = [
    0x4b, 0x80, 0x74, 0x2d, 0xe2, 0xbf, 0x86, 0x6c, 0x29, 0x11, 0x00, 0x00,
];

/// The default universal receiver delegate.
pub const UNIVERSAL_RECEIVER_DELEGATE: [u8; 32] = [
    0x0c, 0xfc, 0x51, 0xae, 0xc3, 0x7c, 0x55, 0xa4, 0xd0, 0xb1, 0xa6, 0x5c, 0x62, 0x55, 0xc4,
    0xbf, 0x2f, 0xbd, 0xf6, 0x27, 0x7f, 0x3c, 0xc0, 0x73, 0x0c, 0x45, 0xb8, 0x28, 0xb6, 0xdb,
    0x8b, 0x47,
];

/// `LSP1UniversalReceiverDelegate:<typeId>` mapping.
pub const UNIVERSAL_RECEIVER_DELEGATE_PREFIX: [u8; 12] = [
    0x0c, 0xfc, 0x51, 0xae, 0xc3, 0x7c, 0x55, 0xa4, 0xd0, 0xb1, 0x00, 0x00,
];

/// `LSP17Extension:<selector>` mapping.
pub const EXTENSION_PREFIX: [u8; 12] = [
    0xce, 0xe7, 0x8b, 0x40, 0x94, 0xda, 0x86, 0x01, 0x10, 0x96, 0x00, 0x00,
];

fn mapping(prefix: &[u8; 12], tail: &[u8; 20]) -> DataKey {
    let mut key = [0u8; 32];
    key[..12].copy_from_slice(prefix);
    key[12..].copy_from_slice(tail);
    DataKey(key)
}

/// Key holding a controller's permission bitmask.
pub fn permissions_key(controller: &Address) -> DataKey {
    mapping(&PERMISSIONS_PREFIX, &controller.0)
}

/// Key holding a controller's AllowedCalls list.
pub fn allowed_calls_key(controller: &Address) -> DataKey {
    mapping(&ALLOWED_CALLS_PREFIX, &controller.0)
}

/// Key holding a controller's AllowedERC725YDataKeys list.
pub fn allowed_data_keys_key(controller: &Address) -> DataKey {
    mapping(&ALLOWED_DATA_KEYS_PREFIX, &controller.0)
}

/// Key of the controller stored at `index` in `AddressPermissions[]`.
pub fn address_permissions_index_key(index: u128) -> DataKey {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(&ADDRESS_PERMISSIONS_ARRAY_PREFIX);
    key[16..].copy_from_slice(&index.to_be_bytes());
    DataKey(key)
}

/// Key of an extension handler for a function selector.
pub fn extension_key(selector: [u8; 4]) -> DataKey {
    let mut tail = [0u8; 20];
    tail[..4].copy_from_slice(&selector);
    mapping(&EXTENSION_PREFIX, &tail)
}

/// Key of a type-specific universal receiver delegate.
pub fn universal_receiver_delegate_key(type_id: [u8; 20]) -> DataKey {
    mapping(&UNIVERSAL_RECEIVER_DELEGATE_PREFIX, &type_id)
}

/// What a data key means to the permission engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// `AddressPermissions[]` length.
    ControllerCount,
    /// `AddressPermissions[index]`.
    ControllerAt(u128),
    /// Permission bitmask of a controller.
    Permissions(Address),
    /// AllowedCalls of a controller.
    AllowedCalls(Address),
    /// AllowedERC725YDataKeys of a controller.
    AllowedDataKeys(Address),
    /// Inside the `AddressPermissions:` namespace but not a known key.
    UnrecognisedPermissionKey,
    /// Default or type-specific universal receiver delegate.
    UniversalReceiverDelegate,
    /// Extension handler mapping.
    Extension,
    /// Any other application data.
    Generic,
}

fn tail_address(key: &DataKey) -> Address {
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&key.0[12..]);
    Address(addr)
}

/// Classify a data key.
pub fn classify(key: &DataKey) -> KeyKind {
    if key.0 == ADDRESS_PERMISSIONS_ARRAY {
        return KeyKind::ControllerCount;
    }
    if key.starts_with(&ADDRESS_PERMISSIONS_ARRAY_PREFIX) {
        let mut index = [0u8; 16];
        index.copy_from_slice(&key.0[16..]);
        return KeyKind::ControllerAt(u128::from_be_bytes(index));
    }
    if key.starts_with(&ADDRESS_PERMISSIONS_PREFIX) {
        return if key.starts_with(&PERMISSIONS_PREFIX) {
            KeyKind::Permissions(tail_address(key))
        } else if key.starts_with(&ALLOWED_CALLS_PREFIX) {
            KeyKind::AllowedCalls(tail_address(key))
        } else if key.starts_with(&ALLOWED_DATA_KEYS_PREFIX) {
            KeyKind::AllowedDataKeys(tail_address(key))
        } else {
            KeyKind::UnrecognisedPermissionKey
        };
    }
    if key.0 == UNIVERSAL_RECEIVER_DELEGATE || key.starts_with(&UNIVERSAL_RECEIVER_DELEGATE_PREFIX) {
        return KeyKind::UniversalReceiverDelegate;
    }
    if key.starts_with(&EXTENSION_PREFIX) {
        return KeyKind::Extension;
    }
    KeyKind::Generic
}
