//! Relay request verification.
//!
//! A request is authenticated in this order:
//!
//! 1. The signature recovers a signer over the signed message.
//! 2. The nonce is the signer's next one on its channel.
//! 3. `now` lies inside the validity window, if one is set.
//! 4. The nonce is consumed.
//!
//! Consumption happens here, before the payload is authorised, so a request
//! whose payload is later denied still uses up its nonce.

use keyguard_core::{Address, Payload};

use crate::envelope::{RelayDomain, RelayNonce, RelayRequest, ValidityWindow};
use crate::error::{RelayError, Result};
use crate::nonce::NonceRegistry;

/// A relay request whose signer, nonce and window have been accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedRequest {
    pub signer: Address,
    pub nonce: RelayNonce,
    pub payload: Payload,
}

/// Authenticates relay requests for one engine.
#[derive(Debug, Clone)]
pub struct RelayVerifier {
    domain: RelayDomain,
    nonces: NonceRegistry,
}

impl RelayVerifier {
    pub fn new(domain: RelayDomain, nonces: NonceRegistry) -> Self {
        Self { domain, nonces }
    }

    pub fn domain(&self) -> &RelayDomain {
        &self.domain
    }

    pub fn nonces(&self) -> &NonceRegistry {
        &self.nonces
    }

    /// Authenticate `request` at time `now` and consume its nonce.
    pub fn verify(&self, request: &RelayRequest, now: u64) -> Result<AuthenticatedRequest> {
        let result = self.authenticate(request, now);
        if let Err(e) = &result {
            tracing::warn!(nonce = %request.nonce, error = %e, "relay request rejected");
        }
        result
    }

    fn authenticate(&self, request: &RelayRequest, now: u64) -> Result<AuthenticatedRequest> {
        let digest = request.digest(&self.domain)?;
        let signer = request
            .signature
            .recover(digest.as_bytes())
            .map_err(|_| RelayError::InvalidRelaySignature)?;

        self.nonces.check(&signer, request.nonce)?;
        check_window(request.window, now)?;
        self.nonces.consume(&signer, request.nonce)?;

        Ok(AuthenticatedRequest {
            signer,
            nonce: request.nonce,
            payload: request.payload.clone(),
        })
    }
}

fn check_window(window: ValidityWindow, now: u64) -> Result<()> {
    if window.is_unbounded() {
        return Ok(());
    }
    if now < window.valid_from {
        return Err(RelayError::RelayRequestNotYetValid {
            valid_from: window.valid_from,
            now,
        });
    }
    if window.valid_until != 0 && now >= window.valid_until {
        return Err(RelayError::RelayRequestExpired {
            valid_until: window.valid_until,
            now,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyguard_core::{ExecuteCall, Keypair};
    use keyguard_store::MemoryNonceStore;
    use std::sync::Arc;

    fn domain() -> RelayDomain {
        RelayDomain {
            chain_id: 7,
            engine: Address::from_bytes([0xee; 20]),
        }
    }

    fn verifier() -> RelayVerifier {
        RelayVerifier::new(domain(), NonceRegistry::new(Arc::new(MemoryNonceStore::new())))
    }

    fn request(keypair: &Keypair, nonce: RelayNonce, window: ValidityWindow) -> RelayRequest {
        let payload = Payload::Execute(ExecuteCall::call(Address::from_bytes([9; 20]), vec![1]));
        RelayRequest::sign(keypair, &domain(), nonce, window, payload).unwrap()
    }

    #[test]
    fn test_valid_request_is_authenticated() {
        let keypair = Keypair::from_seed(&[1; 32]);
        let v = verifier();

        let auth = v
            .verify(&request(&keypair, RelayNonce::new(0, 0), ValidityWindow::UNBOUNDED), 100)
            .unwrap();
        assert_eq!(auth.signer, keypair.address());
        assert_eq!(
            v.nonces().current(&keypair.address(), 0).unwrap(),
            RelayNonce::new(0, 1)
        );
    }

    #[test]
    fn test_replay_is_rejected() {
        let keypair = Keypair::from_seed(&[1; 32]);
        let v = verifier();
        let req = request(&keypair, RelayNonce::new(0, 0), ValidityWindow::UNBOUNDED);

        v.verify(&req, 0).unwrap();
        assert!(matches!(
            v.verify(&req, 0),
            Err(RelayError::InvalidRelayNonce { .. })
        ));
    }

    #[test]
    fn test_tampered_payload_fails_signature() {
        let keypair = Keypair::from_seed(&[1; 32]);
        let v = verifier();
        let mut req = request(&keypair, RelayNonce::new(0, 0), ValidityWindow::UNBOUNDED);
        req.payload = Payload::RenounceOwnership;

        assert!(matches!(
            v.verify(&req, 0),
            Err(RelayError::InvalidRelaySignature)
        ));
    }

    #[test]
    fn test_other_engine_signature_fails() {
        let keypair = Keypair::from_seed(&[1; 32]);
        let other = RelayDomain {
            engine: Address::from_bytes([0xdd; 20]),
            ..domain()
        };
        let req = RelayRequest::sign(
            &keypair,
            &other,
            RelayNonce::new(0, 0),
            ValidityWindow::UNBOUNDED,
            Payload::AcceptOwnership,
        )
        .unwrap();

        assert!(matches!(
            verifier().verify(&req, 0),
            Err(RelayError::InvalidRelaySignature)
        ));
    }

    #[test]
    fn test_window_bounds() {
        let keypair = Keypair::from_seed(&[1; 32]);
        let v = verifier();
        let window = ValidityWindow::new(100, 200);

        assert!(matches!(
            v.verify(&request(&keypair, RelayNonce::new(0, 0), window), 99),
            Err(RelayError::RelayRequestNotYetValid { valid_from: 100, now: 99 })
        ));
        assert!(matches!(
            v.verify(&request(&keypair, RelayNonce::new(0, 0), window), 200),
            Err(RelayError::RelayRequestExpired { valid_until: 200, now: 200 })
        ));
        assert!(v
            .verify(&request(&keypair, RelayNonce::new(0, 0), window), 100)
            .is_ok());
    }

    #[test]
    fn test_rejected_window_does_not_consume_nonce() {
        let keypair = Keypair::from_seed(&[1; 32]);
        let v = verifier();

        let early = request(&keypair, RelayNonce::new(0, 0), ValidityWindow::new(50, 0));
        assert!(v.verify(&early, 10).is_err());
        assert_eq!(
            v.nonces().current(&keypair.address(), 0).unwrap(),
            RelayNonce::new(0, 0)
        );
        assert!(v.verify(&early, 50).is_ok());
    }

    #[test]
    fn test_open_ended_window() {
        let keypair = Keypair::from_seed(&[1; 32]);
        let v = verifier();
        let req = request(&keypair, RelayNonce::new(0, 0), ValidityWindow::new(10, 0));
        assert!(v.verify(&req, u64::MAX).is_ok());
    }
}
