//! # KeyGuard Testkit
//!
//! Testing utilities for KeyGuard.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: An in-memory account, credential collection, nonce store
//!   and clock wired into a key manager, plus helpers to provision
//!   controllers and allow-lists
//! - **Generators**: Proptest strategies for addresses, permissions, calls
//!   and allow-list entries
//!
//! ## Test Fixtures
//!
//! ```rust
//! use keyguard_testkit::fixtures::{address, TestFixture};
//! use keyguard::core::{ExecuteCall, Payload, Permissions};
//!
//! let fixture = TestFixture::new();
//! fixture.register_controller(&address(1), Permissions::SUPER_CALL);
//!
//! let km = fixture.manager();
//! km.execute(&address(1), Payload::Execute(ExecuteCall::call(address(9), vec![1, 2, 3, 4])))
//!     .unwrap();
//! assert_eq!(fixture.controllers(), vec![address(1)]);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use keyguard_testkit::generators;
//!
//! proptest! {
//!     #[test]
//!     fn call_without_allow_list_is_denied(target in generators::address()) {
//!         // ...
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{address, keypair, TestFixture};
