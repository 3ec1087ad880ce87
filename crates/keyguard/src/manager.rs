//! The key manager: the only way in to a controlled resource.
//!
//! Every request runs the same pipeline:
//!
//! 1. Relay requests are authenticated and their nonce consumed.
//! 2. A nested request needs REENTRANCY from the principal calling back in.
//! 3. The principal's permissions are evaluated against the payload.
//! 4. The payload is forwarded and the resource's output returned as is.
//!
//! Forwarding runs inside a resource savepoint, so a request that fails
//! part-way leaves no changes behind. Consumed relay nonces are kept.

use std::sync::Arc;

use bytes::Bytes;
use keyguard_core::{
    Address, Clock, CoreError, ExecuteCall, Payload, Permissions, PrincipalSignature, SystemClock,
};
use keyguard_perms::{actions_for, Action, MasterOverrideResolver, PermissionEvaluator};
use keyguard_relay::{NonceRegistry, RelayDomain, RelayNonce, RelayRequest, RelayVerifier};
use keyguard_store::{NonceStore, Resource};

use crate::config::KeyManagerConfig;
use crate::error::{KeyGuardError, Result};
use crate::guard::{Depth, DepthGuard};
use crate::interface::SUPPORTED_INTERFACES;

/// Returned by [`KeyManager::is_valid_signature`] for an accepted signature.
pub const MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// Returned by [`KeyManager::is_valid_signature`] otherwise.
pub const FAIL_VALUE: [u8; 4] = [0xff; 4];

/// A direct call on the resource admitted by [`KeyManager::verify_call`].
///
/// Holds one dispatch level until it is passed to
/// [`KeyManager::verify_call_result`] or dropped, so the callee cannot
/// re-enter without REENTRANCY.
#[must_use = "the dispatch level is released when this is dropped"]
pub struct VerifiedCall<'a> {
    caller: Address,
    _guard: DepthGuard<'a>,
}

impl VerifiedCall<'_> {
    /// The principal that made the call.
    pub fn caller(&self) -> &Address {
        &self.caller
    }
}

impl std::fmt::Debug for VerifiedCall<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifiedCall")
            .field("caller", &self.caller)
            .finish_non_exhaustive()
    }
}

/// Authorises requests against one resource and forwards the allowed ones.
///
/// The dispatch depth is tracked per manager, so a manager serves one
/// logical request (and whatever it re-enters with) at a time.
pub struct KeyManager {
    config: KeyManagerConfig,
    resource: Arc<dyn Resource>,
    master: MasterOverrideResolver,
    relay: RelayVerifier,
    clock: Arc<dyn Clock>,
    depth: Depth,
}

impl KeyManager {
    /// Create a key manager for `resource`.
    pub fn new(
        config: KeyManagerConfig,
        resource: Arc<dyn Resource>,
        master: MasterOverrideResolver,
        nonces: Arc<dyn NonceStore>,
    ) -> Self {
        let domain = RelayDomain {
            chain_id: config.chain_id,
            engine: config.engine_address,
        };
        Self {
            config,
            resource,
            master,
            relay: RelayVerifier::new(domain, NonceRegistry::new(nonces)),
            clock: Arc::new(SystemClock),
            depth: Depth::default(),
        }
    }

    /// Use `clock` for relay validity windows.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &KeyManagerConfig {
        &self.config
    }

    /// The resource this manager controls.
    pub fn target(&self) -> Address {
        self.resource.address()
    }

    pub fn master(&self) -> &MasterOverrideResolver {
        &self.master
    }

    /// What relay signatures for this manager must be bound to.
    pub fn relay_domain(&self) -> &RelayDomain {
        self.relay.domain()
    }

    /// Number of requests currently being dispatched.
    pub fn depth(&self) -> usize {
        self.depth.current()
    }

    /// Authorise `payload` for `caller` and forward it.
    pub fn execute(&self, caller: &Address, payload: Payload) -> Result<Bytes> {
        let _guard = self.enter(caller)?;
        self.evaluator().evaluate_payload(caller, &payload)?;
        self.atomically(|| self.forward(&payload))
    }

    /// Authorise every payload, then forward them in order.
    ///
    /// Nothing is forwarded unless all payloads are allowed. The first
    /// resource failure rolls back the payloads already forwarded.
    pub fn execute_batch(&self, caller: &Address, payloads: Vec<Payload>) -> Result<Vec<Bytes>> {
        let _guard = self.enter(caller)?;
        let actions: Vec<Action> = payloads.iter().flat_map(actions_for).collect();
        self.evaluator().evaluate_all(caller, &actions)?;
        self.atomically(|| payloads.iter().map(|payload| self.forward(payload)).collect())
    }

    /// Authenticate a relay request, then authorise and forward its payload
    /// on behalf of the signer.
    ///
    /// The nonce is consumed once the signature, nonce and window check out,
    /// even if the payload is then denied.
    pub fn execute_relay_call(&self, request: &RelayRequest) -> Result<Bytes> {
        let auth = self.relay.verify(request, self.clock.now())?;
        let _guard = self.enter(&auth.signer)?;

        let mut actions = vec![Action::ExecuteRelayCall];
        actions.extend(actions_for(&auth.payload));
        self.evaluator().evaluate_all(&auth.signer, &actions)?;
        self.atomically(|| self.forward(&auth.payload))
    }

    /// Run relay requests in order, stopping at the first failure.
    ///
    /// A failure rolls back what earlier requests forwarded. Their nonces
    /// stay consumed.
    pub fn execute_relay_call_batch(&self, requests: &[RelayRequest]) -> Result<Vec<Bytes>> {
        self.atomically(|| {
            requests
                .iter()
                .map(|request| self.execute_relay_call(request))
                .collect()
        })
    }

    /// Admit a call made directly on the resource, before the resource runs
    /// it. Nothing is forwarded.
    ///
    /// The returned [`VerifiedCall`] keeps the call's dispatch level open
    /// until it is handed to [`verify_call_result`](Self::verify_call_result).
    pub fn verify_call(&self, caller: &Address, payload: &Payload) -> Result<VerifiedCall<'_>> {
        let guard = self.enter(caller)?;
        self.evaluator().evaluate_payload(caller, payload)?;
        Ok(VerifiedCall {
            caller: *caller,
            _guard: guard,
        })
    }

    /// Close a direct call once the resource has run it.
    pub fn verify_call_result(&self, call: VerifiedCall<'_>, output: &[u8]) {
        tracing::debug!(
            resource = %self.resource.address(),
            caller = %call.caller,
            output = output.len(),
            "direct call completed"
        );
    }

    /// Whether this manager implements the interface `interface_id`.
    pub fn supports_interface(&self, interface_id: [u8; 4]) -> bool {
        SUPPORTED_INTERFACES.contains(&interface_id)
    }

    /// Whether `signature` over `hash` is accepted on behalf of the resource.
    ///
    /// Accepted when the signer holds the master credential or SIGN.
    pub fn is_valid_signature(&self, hash: &[u8; 32], signature: &[u8]) -> [u8; 4] {
        let signer = match PrincipalSignature::from_bytes(signature)
            .and_then(|signature| signature.recover(hash))
        {
            Ok(signer) => signer,
            Err(_) => return FAIL_VALUE,
        };
        match self.evaluator().evaluate(&signer, &Action::Sign) {
            Ok(()) => MAGIC_VALUE,
            Err(_) => FAIL_VALUE,
        }
    }

    /// The nonce the next relay request from `principal` on `channel` must
    /// carry.
    pub fn get_nonce(&self, principal: &Address, channel: u128) -> Result<RelayNonce> {
        Ok(self.relay.nonces().current(principal, channel)?)
    }

    fn evaluator(&self) -> PermissionEvaluator<'_> {
        PermissionEvaluator::new(self.resource.as_ref(), &self.master)
    }

    fn enter(&self, principal: &Address) -> Result<DepthGuard<'_>> {
        self.check_reentrancy(principal)?;
        Ok(self.depth.enter())
    }

    fn check_reentrancy(&self, principal: &Address) -> Result<()> {
        if !self.config.reentrancy_enabled || self.depth.current() == 0 {
            return Ok(());
        }
        if self.master.is_master_holder(principal) {
            return Ok(());
        }
        let permissions = self.evaluator().store().permissions_of(principal)?;
        if permissions.is_some_and(|p| p.has(Permissions::REENTRANCY)) {
            return Ok(());
        }
        tracing::warn!(%principal, depth = self.depth.current(), "reentrant call denied");
        Err(KeyGuardError::ReentrancyDenied(*principal))
    }

    /// Run `f` inside a resource savepoint, keeping its changes only if it
    /// succeeds.
    fn atomically<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.resource.begin()?;
        match f() {
            Ok(value) => {
                self.resource.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.resource.rollback() {
                    tracing::warn!(error = %rollback, "rollback after failed request failed");
                }
                Err(e)
            }
        }
    }

    fn forward(&self, payload: &Payload) -> Result<Bytes> {
        tracing::debug!(
            resource = %self.resource.address(),
            kind = payload.kind(),
            "forwarding payload"
        );
        match payload {
            Payload::SetData { key, value } => {
                self.resource.write(*key, value.clone())?;
                Ok(Bytes::new())
            }
            Payload::SetDataBatch { keys, values } => {
                self.resource.write_batch(keys, values)?;
                Ok(Bytes::new())
            }
            Payload::Execute(call) => self.forward_call(call),
            Payload::ExecuteBatch(calls) => {
                let outputs = calls
                    .iter()
                    .map(|call| self.forward_call(call))
                    .collect::<Result<Vec<_>>>()?;
                encode_batch_output(&outputs)
            }
            Payload::TransferOwnership(new_owner) => {
                self.resource.transfer_ownership(*new_owner)?;
                Ok(Bytes::new())
            }
            Payload::AcceptOwnership => {
                self.resource.accept_ownership()?;
                Ok(Bytes::new())
            }
            Payload::RenounceOwnership => {
                self.resource.renounce_ownership()?;
                Ok(Bytes::new())
            }
        }
    }

    fn forward_call(&self, call: &ExecuteCall) -> Result<Bytes> {
        let output = if call.operation.is_create() {
            self.resource.deploy(call.operation, &call.data, call.value)?
        } else {
            self.resource
                .forward_call(call.operation, call.target, call.value, &call.data)?
        };
        Ok(output)
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("config", &self.config)
            .field("target", &self.resource.address())
            .field("depth", &self.depth.current())
            .finish_non_exhaustive()
    }
}

/// Outputs of an `ExecuteBatch` payload, one per call, as a CBOR array of
/// byte strings.
fn encode_batch_output(outputs: &[Bytes]) -> Result<Bytes> {
    let mut buf = Vec::new();
    ciborium::into_writer(outputs, &mut buf)
        .map_err(|e| CoreError::EncodingError(e.to_string()))?;
    Ok(Bytes::from(buf))
}

/// Split the output of an `ExecuteBatch` payload into per-call outputs.
pub fn decode_batch_output(output: &[u8]) -> Result<Vec<Bytes>> {
    ciborium::from_reader(output)
        .map_err(|e| KeyGuardError::Encoding(CoreError::DecodingError(e.to_string())))
}
