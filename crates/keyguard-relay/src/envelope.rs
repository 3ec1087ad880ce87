//! Relay request envelope and the message its signature covers.
//!
//! ```text
//! signed message = Blake3(
//!     "keyguard-relay-v25:" || chain_id(8) || engine(20) || nonce(32)
//!     || valid_from(8) || valid_until(8) || cbor(payload)
//! )
//! ```
//!
//! Binding the chain id and engine address keeps a signature from being
//! replayed against another deployment.

use std::fmt;

use keyguard_core::{Address, Blake3Hash, Keypair, Payload, PrincipalSignature};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Domain separator for relay signatures.
pub const RELAY_DOMAIN: &[u8] = b"keyguard-relay-v25:";

/// A nonce: `index` within an independent `channel`.
///
/// Packs into one 256-bit word as `channel << 128 | index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelayNonce {
    pub channel: u128,
    pub index: u128,
}

impl RelayNonce {
    pub const fn new(channel: u128, index: u128) -> Self {
        Self { channel, index }
    }

    /// Big-endian packed form.
    pub fn to_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[..16].copy_from_slice(&self.channel.to_be_bytes());
        out[16..].copy_from_slice(&self.index.to_be_bytes());
        out
    }

    /// Unpack from the big-endian packed form.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        let mut channel = [0u8; 16];
        let mut index = [0u8; 16];
        channel.copy_from_slice(&bytes[..16]);
        index.copy_from_slice(&bytes[16..]);
        Self {
            channel: u128::from_be_bytes(channel),
            index: u128::from_be_bytes(index),
        }
    }
}

impl fmt::Display for RelayNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.index)
    }
}

/// What a relay signature is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayDomain {
    pub chain_id: u64,
    pub engine: Address,
}

/// Validity window in seconds. `valid_until == 0` means no upper bound;
/// both zero means no window at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub valid_from: u64,
    pub valid_until: u64,
}

impl ValidityWindow {
    /// No time restriction.
    pub const UNBOUNDED: Self = Self {
        valid_from: 0,
        valid_until: 0,
    };

    pub const fn new(valid_from: u64, valid_until: u64) -> Self {
        Self {
            valid_from,
            valid_until,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.valid_from == 0 && self.valid_until == 0
    }
}

/// Digest a relay signature covers.
pub fn signed_message(
    domain: &RelayDomain,
    nonce: RelayNonce,
    window: ValidityWindow,
    payload: &Payload,
) -> Result<Blake3Hash> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(RELAY_DOMAIN);
    hasher.update(&domain.chain_id.to_be_bytes());
    hasher.update(&domain.engine.0);
    hasher.update(&nonce.to_bytes());
    hasher.update(&window.valid_from.to_be_bytes());
    hasher.update(&window.valid_until.to_be_bytes());
    hasher.update(&payload.to_cbor()?);
    Ok(Blake3Hash(*hasher.finalize().as_bytes()))
}

/// A payload signed off-chain and submitted by anyone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    pub nonce: RelayNonce,
    pub window: ValidityWindow,
    pub payload: Payload,
    pub signature: PrincipalSignature,
}

impl RelayRequest {
    /// Sign `payload` for submission to the engine identified by `domain`.
    pub fn sign(
        keypair: &Keypair,
        domain: &RelayDomain,
        nonce: RelayNonce,
        window: ValidityWindow,
        payload: Payload,
    ) -> Result<Self> {
        let digest = signed_message(domain, nonce, window, &payload)?;
        Ok(Self {
            nonce,
            window,
            payload,
            signature: keypair.sign_as_principal(digest.as_bytes()),
        })
    }

    /// The digest this request's signature must cover under `domain`.
    pub fn digest(&self, domain: &RelayDomain) -> Result<Blake3Hash> {
        signed_message(domain, self.nonce, self.window, &self.payload)
    }
}
