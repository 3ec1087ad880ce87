//! Relay requests through the key manager.

use std::sync::Arc;

use keyguard::perms::MasterOverrideResolver;
use keyguard::relay::RelayError;
use keyguard::store::SqliteNonceStore;
use keyguard::{
    Denial, ExecuteCall, KeyGuardError, KeyManager, Keypair, Payload, Permissions, RelayNonce,
    RelayRequest, ValidityWindow,
};
use keyguard_testkit::fixtures::{address, MASTER_CREDENTIAL, START_TIME};
use keyguard_testkit::{generators, keypair, TestFixture};
use proptest::prelude::*;

fn call() -> Payload {
    Payload::Execute(ExecuteCall::call(address(9), vec![0xca, 0xfe, 0xba, 0xbe]))
}

/// A call signed by `signer` with no validity window.
fn relay(fixture: &TestFixture, signer: &Keypair, nonce: RelayNonce) -> RelayRequest {
    fixture.sign_relay(signer, nonce, ValidityWindow::UNBOUNDED, call())
}

#[test]
fn test_relay_call_is_forwarded_for_signer() {
    let fixture = TestFixture::new();
    let signer = keypair(1);
    fixture.register_controller(
        &signer.address(),
        Permissions::EXECUTE_RELAY_CALL | Permissions::SUPER_CALL,
    );
    let km = fixture.manager();

    let request = relay(&fixture, &signer, RelayNonce::new(0, 0));
    km.execute_relay_call(&request).unwrap();

    assert_eq!(fixture.account.calls().len(), 1);
    assert_eq!(km.get_nonce(&signer.address(), 0).unwrap(), RelayNonce::new(0, 1));
}

#[test]
fn test_nonce_replay_and_channels() {
    let fixture = TestFixture::new();
    let signer = keypair(1);
    fixture.register_controller(
        &signer.address(),
        Permissions::EXECUTE_RELAY_CALL | Permissions::SUPER_CALL,
    );
    let km = fixture.manager();
    let sign = |nonce| relay(&fixture, &signer, nonce);

    let first = sign(RelayNonce::new(3, 0));
    km.execute_relay_call(&first).unwrap();

    let err = km.execute_relay_call(&first).unwrap_err();
    assert!(matches!(
        err,
        KeyGuardError::Relay(RelayError::InvalidRelayNonce { expected, got, .. })
            if expected == RelayNonce::new(3, 1) && got == RelayNonce::new(3, 0)
    ));

    km.execute_relay_call(&sign(RelayNonce::new(3, 1))).unwrap();
    km.execute_relay_call(&sign(RelayNonce::new(4, 0))).unwrap();
    assert_eq!(fixture.account.calls().len(), 3);
}

#[test]
fn test_nonce_consumed_when_payload_denied() {
    let fixture = TestFixture::new();
    let signer = keypair(1);
    fixture.register_controller(&signer.address(), Permissions::EXECUTE_RELAY_CALL);
    let km = fixture.manager();

    let request = relay(&fixture, &signer, RelayNonce::new(0, 0));
    let err = km.execute_relay_call(&request).unwrap_err();
    assert!(matches!(err, KeyGuardError::Denied(Denial::NotAllowedCall { .. })));

    assert_eq!(km.get_nonce(&signer.address(), 0).unwrap(), RelayNonce::new(0, 1));
    assert!(fixture.account.calls().is_empty());
}

#[test]
fn test_relay_requires_execute_relay_call() {
    let fixture = TestFixture::new();
    let signer = keypair(1);
    fixture.register_controller(&signer.address(), Permissions::SUPER_CALL);
    let km = fixture.manager();

    let request = relay(&fixture, &signer, RelayNonce::new(0, 0));
    let err = km.execute_relay_call(&request).unwrap_err();
    assert!(matches!(
        err,
        KeyGuardError::Denied(Denial::NotAuthorised { permission, .. })
            if permission == Permissions::EXECUTE_RELAY_CALL
    ));
}

#[test]
fn test_master_holder_relays_without_permissions() {
    let fixture = TestFixture::new();
    let signer = keypair(1);
    fixture.give_master(signer.address());
    let km = fixture.manager();

    let request = relay(&fixture, &signer, RelayNonce::new(0, 0));
    km.execute_relay_call(&request).unwrap();
    assert_eq!(fixture.account.calls().len(), 1);
}

#[test]
fn test_validity_window_uses_clock() {
    let fixture = TestFixture::new();
    let signer = keypair(1);
    fixture.register_controller(
        &signer.address(),
        Permissions::EXECUTE_RELAY_CALL | Permissions::SUPER_CALL,
    );
    let km = fixture.manager();
    let window = ValidityWindow::new(START_TIME + 100, START_TIME + 200);
    let request = fixture.sign_relay(&signer, RelayNonce::new(0, 0), window, call());

    assert!(matches!(
        km.execute_relay_call(&request),
        Err(KeyGuardError::Relay(RelayError::RelayRequestNotYetValid { .. }))
    ));
    assert_eq!(km.get_nonce(&signer.address(), 0).unwrap(), RelayNonce::new(0, 0));

    fixture.clock.advance(150);
    km.execute_relay_call(&request).unwrap();

    fixture.clock.advance(100);
    let late = fixture.sign_relay(&signer, RelayNonce::new(0, 1), window, call());
    assert!(matches!(
        km.execute_relay_call(&late),
        Err(KeyGuardError::Relay(RelayError::RelayRequestExpired { .. }))
    ));
}

#[test]
fn test_request_for_other_engine_is_rejected() {
    let fixture = TestFixture::new();
    let signer = keypair(1);
    fixture.give_master(signer.address());

    let mut other = TestFixture::new();
    other.config.chain_id += 1;
    let request = relay(&other, &signer, RelayNonce::new(0, 0));

    assert!(matches!(
        fixture.manager().execute_relay_call(&request),
        Err(KeyGuardError::Relay(RelayError::InvalidRelaySignature))
    ));
}

#[test]
fn test_relay_batch_stops_at_first_failure() {
    let fixture = TestFixture::new();
    let signer = keypair(1);
    fixture.register_controller(
        &signer.address(),
        Permissions::EXECUTE_RELAY_CALL | Permissions::SUPER_CALL,
    );
    let km = fixture.manager();
    let sign = |index| relay(&fixture, &signer, RelayNonce::new(0, index));

    let err = km.execute_relay_call_batch(&[sign(0), sign(2), sign(1)]).unwrap_err();
    assert!(matches!(err, KeyGuardError::Relay(RelayError::InvalidRelayNonce { .. })));
    assert_eq!(fixture.account.calls().len(), 1);
    assert_eq!(km.get_nonce(&signer.address(), 0).unwrap(), RelayNonce::new(0, 1));

    let outputs = km.execute_relay_call_batch(&[sign(1), sign(2)]).unwrap();
    assert_eq!(outputs.len(), 2);
}

#[test]
fn test_nonces_survive_restart_with_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nonces.db");
    let fixture = TestFixture::new();
    let signer = keypair(1);
    fixture.give_master(signer.address());

    let manager = || {
        let store = SqliteNonceStore::open(&path).unwrap();
        KeyManager::new(
            fixture.config.clone(),
            fixture.account.clone(),
            MasterOverrideResolver::new(MASTER_CREDENTIAL, fixture.ownership.clone()),
            Arc::new(store),
        )
    };

    let request = relay(&fixture, &signer, RelayNonce::new(7, 0));
    manager().execute_relay_call(&request).unwrap();

    let restarted = manager();
    assert_eq!(restarted.get_nonce(&signer.address(), 7).unwrap(), RelayNonce::new(7, 1));
    assert!(matches!(
        restarted.execute_relay_call(&request),
        Err(KeyGuardError::Relay(RelayError::InvalidRelayNonce { .. }))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_fresh_channel_accepts_index_zero(
        used in generators::channel(),
        fresh in generators::channel(),
    ) {
        prop_assume!(used != fresh);
        let fixture = TestFixture::new();
        let signer = keypair(1);
        fixture.give_master(signer.address());
        let km = fixture.manager();

        let first = relay(&fixture, &signer, RelayNonce::new(used, 0));
        prop_assert!(km.execute_relay_call(&first).is_ok());
        prop_assert!(km.execute_relay_call(&first).is_err());

        let other = relay(&fixture, &signer, RelayNonce::new(fresh, 0));
        prop_assert!(km.execute_relay_call(&other).is_ok());
    }
}
