//! # KeyGuard Relay
//!
//! Relay requests: a principal signs a payload off-chain and anyone submits
//! it. The key manager then authorises the payload as if the signer had
//! called directly.
//!
//! ## Key Properties
//!
//! - **Domain bound**: Signatures cover the chain id and engine address
//! - **Replay protected**: Each (signer, channel) accepts nonces strictly in order
//! - **Time bounded**: An optional `[valid_from, valid_until)` window
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use keyguard_core::{Address, Keypair, Payload};
//! use keyguard_relay::{
//!     NonceRegistry, RelayDomain, RelayNonce, RelayRequest, RelayVerifier, ValidityWindow,
//! };
//! use keyguard_store::MemoryNonceStore;
//!
//! let domain = RelayDomain { chain_id: 1, engine: Address::from_bytes([0xee; 20]) };
//! let nonces = NonceRegistry::new(Arc::new(MemoryNonceStore::new()));
//! let verifier = RelayVerifier::new(domain, nonces);
//!
//! let signer = Keypair::generate();
//! let request = RelayRequest::sign(
//!     &signer,
//!     &domain,
//!     RelayNonce::new(0, 0),
//!     ValidityWindow::UNBOUNDED,
//!     Payload::AcceptOwnership,
//! ).unwrap();
//!
//! let auth = verifier.verify(&request, 0).unwrap();
//! assert_eq!(auth.signer, signer.address());
//! assert!(verifier.verify(&request, 0).is_err());
//! ```

pub mod envelope;
pub mod error;
pub mod nonce;
pub mod verifier;

pub use envelope::{signed_message, RelayDomain, RelayNonce, RelayRequest, ValidityWindow};
pub use error::{RelayError, Result};
pub use nonce::NonceRegistry;
pub use verifier::{AuthenticatedRequest, RelayVerifier};
