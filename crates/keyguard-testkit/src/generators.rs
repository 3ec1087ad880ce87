//! Proptest generators for property-based testing.

use proptest::prelude::*;

use keyguard_core::{
    Address, AllowedCall, AllowedDataKey, CallTypes, DataKey, ExecuteCall, Keypair, Permissions,
    Selector,
};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from_bytes)
}

/// Generate a random data key.
pub fn data_key() -> impl Strategy<Value = DataKey> {
    any::<[u8; 32]>().prop_map(DataKey::from_bytes)
}

/// Generate a random function selector.
pub fn selector() -> impl Strategy<Value = Selector> {
    any::<[u8; 4]>().prop_map(Selector)
}

/// Generate any combination of named permission flags.
pub fn permissions() -> impl Strategy<Value = Permissions> {
    any::<u64>().prop_map(Permissions::from_bits_truncate)
}

/// Generate permissions that never include any of `excluded`.
pub fn permissions_without(excluded: Permissions) -> impl Strategy<Value = Permissions> {
    permissions().prop_map(move |p| p.difference(excluded))
}

/// Generate a non-empty set of call types.
pub fn call_types() -> impl Strategy<Value = CallTypes> {
    (1u32..16).prop_map(CallTypes::from_bits_truncate)
}

/// Generate calldata carrying at least a selector.
pub fn calldata(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 4..=max_len.max(4))
}

/// Generate a plain CALL with calldata and no value.
pub fn call() -> impl Strategy<Value = ExecuteCall> {
    (address(), calldata(68)).prop_map(|(target, data)| ExecuteCall::call(target, data))
}

/// Generate an AllowedCalls entry, optionally pinned to a target and selector.
pub fn allowed_call() -> impl Strategy<Value = AllowedCall> {
    (
        call_types(),
        proptest::option::of(address()),
        proptest::option::of(selector()),
    )
        .prop_map(|(types, target, selector)| {
            let entry = match target {
                Some(target) => AllowedCall::to_target(types, target),
                None => AllowedCall::any(types),
            };
            match selector {
                Some(selector) => entry.with_selector(selector),
                None => entry,
            }
        })
}

/// Generate an AllowedERC725YDataKeys entry.
pub fn allowed_data_key() -> impl Strategy<Value = AllowedDataKey> {
    prop_oneof![
        data_key().prop_map(AllowedDataKey::Exact),
        prop::collection::vec(any::<u8>(), 1..32).prop_map(AllowedDataKey::Prefix),
    ]
}

/// Generate a relay channel.
pub fn channel() -> impl Strategy<Value = u128> {
    any::<u128>()
}
