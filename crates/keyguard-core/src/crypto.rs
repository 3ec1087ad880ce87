//! Cryptographic primitives for KeyGuard.
//!
//! Wraps Ed25519 signing and Blake3 hashing with strong types. Principals
//! controlled by a key are addressed by a Blake3-derived 20-byte address, so
//! verifying a signature "recovers" the signing principal.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::types::Address;

/// Domain separator for address derivation.
const ADDRESS_DOMAIN: &[u8] = b"keyguard-address-v0:";

/// Hex display, `AsRef<[u8]>` and array conversion for a fixed-size byte
/// newtype. `Debug` shows the first eight bytes.
macro_rules! byte_newtype {
    ($name:ident, $len:literal, $tag:literal) => {
        impl $name {
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "({}..)"), hex::encode(&self.0[..8]))
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }
    };
}

/// Blake3 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Blake3Hash(pub [u8; 32]);

byte_newtype!(Blake3Hash, 32, "Blake3");

impl Blake3Hash {
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Ed25519 verifying key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

byte_newtype!(Ed25519PublicKey, 32, "Ed25519Pub");

impl Ed25519PublicKey {
    /// The address of the principal controlled by this key:
    /// `last20(Blake3("keyguard-address-v0:" || key))`.
    pub fn to_address(&self) -> Address {
        let digest = blake3::Hasher::new()
            .update(ADDRESS_DOMAIN)
            .update(&self.0)
            .finalize();
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&digest.as_bytes()[12..]);
        Address(addr)
    }

    /// Check `signature` over `message`.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CoreError> {
        VerifyingKey::from_bytes(&self.0)
            .map_err(|_| CoreError::InvalidPublicKey)?
            .verify(message, &Signature::from_bytes(&signature.0))
            .map_err(|_| CoreError::InvalidSignature)
    }
}

/// Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

byte_newtype!(Ed25519Signature, 64, "Ed25519Sig");

/// A signature bundled with the key that produced it.
///
/// Ed25519 has no public key recovery, so the signer travels with the
/// signature. [`PrincipalSignature::recover`] verifies and yields the
/// signer's address, or fails.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PrincipalSignature {
    pub signer: Ed25519PublicKey,
    pub signature: Ed25519Signature,
}

impl PrincipalSignature {
    /// Length of the wire encoding: `signer(32) || signature(64)`.
    pub const LEN: usize = 96;

    /// Verify over `message` and return the signing principal.
    pub fn recover(&self, message: &[u8]) -> Result<Address, CoreError> {
        self.signer.verify(message, &self.signature)?;
        Ok(self.signer.to_address())
    }

    /// Encode as `signer || signature`.
    pub fn to_bytes(&self) -> [u8; 96] {
        let mut out = [0u8; 96];
        out[..32].copy_from_slice(&self.signer.0);
        out[32..].copy_from_slice(&self.signature.0);
        out
    }

    /// Decode from `signer || signature`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() != Self::LEN {
            return Err(CoreError::InvalidLength {
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        let mut signer = [0u8; 32];
        signer.copy_from_slice(&bytes[..32]);
        let mut signature = [0u8; 64];
        signature.copy_from_slice(&bytes[32..]);
        Ok(Self {
            signer: Ed25519PublicKey(signer),
            signature: Ed25519Signature(signature),
        })
    }
}

/// Signing key of a principal.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    /// Deterministic keypair from a 32-byte secret.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// The address of the principal this keypair controls.
    pub fn address(&self) -> Address {
        self.public_key().to_address()
    }

    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Sign a message and bundle the signer's key.
    pub fn sign_as_principal(&self, message: &[u8]) -> PrincipalSignature {
        PrincipalSignature {
            signer: self.public_key(),
            signature: self.sign(message),
        }
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_binds_message_and_key() {
        let keypair = Keypair::generate();
        let signature = keypair.sign(b"set data");
        let public = keypair.public_key();

        assert!(public.verify(b"set data", &signature).is_ok());
        assert!(matches!(
            public.verify(b"set datA", &signature),
            Err(CoreError::InvalidSignature)
        ));
        assert!(Keypair::generate()
            .public_key()
            .verify(b"set data", &signature)
            .is_err());
    }

    #[test]
    fn test_debug_is_truncated() {
        let hash = Blake3Hash::hash(b"x");
        assert_eq!(format!("{hash:?}"), format!("Blake3({}..)", &hash.to_hex()[..16]));
    }

    #[test]
    fn test_address_is_deterministic_per_key() {
        let kp1 = Keypair::from_seed(&[0x42; 32]);
        let kp2 = Keypair::from_seed(&[0x42; 32]);
        let kp3 = Keypair::from_seed(&[0x43; 32]);
        assert_eq!(kp1.address(), kp2.address());
        assert_ne!(kp1.address(), kp3.address());
    }

    #[test]
    fn test_principal_signature_recovers_signer() {
        let keypair = Keypair::from_seed(&[7; 32]);
        let sig = keypair.sign_as_principal(b"payload");

        assert_eq!(sig.recover(b"payload").unwrap(), keypair.address());
        assert!(matches!(
            sig.recover(b"other"),
            Err(CoreError::InvalidSignature)
        ));
    }

    #[test]
    fn test_principal_signature_bytes_roundtrip() {
        let keypair = Keypair::from_seed(&[9; 32]);
        let sig = keypair.sign_as_principal(b"m");
        let decoded = PrincipalSignature::from_bytes(&sig.to_bytes()).unwrap();
        assert_eq!(sig, decoded);
        assert!(PrincipalSignature::from_bytes(&[0u8; 95]).is_err());
    }
}
