//! Permission bitmask held by each controller.
//!
//! Stored in the resource as a 32-byte big-endian word. Only the low 64 bits
//! carry named flags. Higher bits are ignored on read and written as zero.
//!
//! ```
//! use keyguard_core::Permissions;
//!
//! let perms = Permissions::from_names(&["CALL", "SETDATA"]).unwrap();
//! assert!(perms.has(Permissions::CALL));
//! assert!(!perms.has(Permissions::SUPER_CALL));
//! assert_eq!(perms.names(), vec!["CALL", "SETDATA"]);
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

bitflags! {
    /// Named permission bits, in their persisted bit positions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Permissions: u64 {
        const CHANGEOWNER = 0x1;
        const ADDCONTROLLER = 0x2;
        const EDITPERMISSIONS = 0x4;
        const ADDEXTENSIONS = 0x8;
        const CHANGEEXTENSIONS = 0x10;
        const ADDUNIVERSALRECEIVERDELEGATE = 0x20;
        const CHANGEUNIVERSALRECEIVERDELEGATE = 0x40;
        const REENTRANCY = 0x80;
        const SUPER_TRANSFERVALUE = 0x100;
        const TRANSFERVALUE = 0x200;
        const SUPER_CALL = 0x400;
        const CALL = 0x800;
        const SUPER_STATICCALL = 0x1000;
        const STATICCALL = 0x2000;
        const SUPER_DELEGATECALL = 0x4000;
        const DELEGATECALL = 0x8000;
        const DEPLOY = 0x10000;
        const SUPER_SETDATA = 0x20000;
        const SETDATA = 0x40000;
        const ENCRYPT = 0x80000;
        const DECRYPT = 0x100000;
        const SIGN = 0x200000;
        const EXECUTE_RELAY_CALL = 0x400000;
    }
}

impl Permissions {
    /// Every permission except REENTRANCY and the two DELEGATECALL flags.
    pub const ALL_PERMISSIONS: Self = Self::all()
        .difference(Self::REENTRANCY)
        .difference(Self::DELEGATECALL)
        .difference(Self::SUPER_DELEGATECALL);

    /// Containment check for one or more flags.
    pub fn has(self, flag: Self) -> bool {
        self.contains(flag)
    }

    /// Encode a sequence of flag names into a bitmask.
    pub fn from_names(names: &[&str]) -> Result<Self> {
        names.iter().try_fold(Self::empty(), |acc, name| {
            Self::from_name(name)
                .map(|flag| acc | flag)
                .ok_or_else(|| CoreError::UnknownPermission((*name).to_string()))
        })
    }

    /// Decode the bitmask into flag names, in bit order.
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }

    /// The SUPER_ flag that bypasses the allow-list for a base flag.
    pub fn super_variant(self) -> Option<Self> {
        match self {
            f if f == Self::CALL => Some(Self::SUPER_CALL),
            f if f == Self::STATICCALL => Some(Self::SUPER_STATICCALL),
            f if f == Self::DELEGATECALL => Some(Self::SUPER_DELEGATECALL),
            f if f == Self::TRANSFERVALUE => Some(Self::SUPER_TRANSFERVALUE),
            f if f == Self::SETDATA => Some(Self::SUPER_SETDATA),
            _ => None,
        }
    }

    /// Whether `self` holds `base` either directly or through its SUPER_ flag.
    pub fn has_base_or_super(self, base: Self) -> bool {
        self.contains(base) || base.super_variant().is_some_and(|s| self.contains(s))
    }

    /// Persisted 32-byte big-endian encoding.
    pub fn to_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[24..].copy_from_slice(&self.bits().to_be_bytes());
        out
    }

    /// Decode a stored value. Empty or all-zero means "no permissions set".
    pub fn from_stored(value: &[u8]) -> Result<Option<Self>> {
        if value.is_empty() {
            return Ok(None);
        }
        if value.len() != 32 {
            return Err(CoreError::InvalidLength {
                expected: 32,
                actual: value.len(),
            });
        }
        let mut low = [0u8; 8];
        low.copy_from_slice(&value[24..]);
        let bits = u64::from_be_bytes(low);
        if bits == 0 && value[..24].iter().all(|b| *b == 0) {
            return Ok(None);
        }
        Ok(Some(Self::from_bits_retain(bits)))
    }
}
