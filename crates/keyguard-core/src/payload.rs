//! Payloads forwarded to the resource once authorised.
//!
//! The canonical byte form is CBOR. Relay signatures commit to these bytes,
//! so a payload must decode back to an identical value.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::allowed::CallTypes;
use crate::error::{CoreError, Result};
use crate::types::{Address, DataKey, Selector};

/// How the resource performs an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Call,
    Create,
    Create2,
    StaticCall,
    DelegateCall,
}

impl Operation {
    /// Whether this operation deploys new code.
    pub fn is_create(self) -> bool {
        matches!(self, Operation::Create | Operation::Create2)
    }

    /// Allow-list call type matching this operation, if it targets a callee.
    pub fn call_type(self) -> Option<CallTypes> {
        match self {
            Operation::Call => Some(CallTypes::CALL),
            Operation::StaticCall => Some(CallTypes::STATICCALL),
            Operation::DelegateCall => Some(CallTypes::DELEGATECALL),
            Operation::Create | Operation::Create2 => None,
        }
    }
}

/// A single execution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteCall {
    pub operation: Operation,
    pub target: Address,
    pub value: u128,
    pub data: Bytes,
}

impl ExecuteCall {
    /// A plain call with calldata and no value.
    pub fn call(target: Address, data: impl Into<Bytes>) -> Self {
        Self {
            operation: Operation::Call,
            target,
            value: 0,
            data: data.into(),
        }
    }

    /// A value transfer with no calldata.
    pub fn transfer(target: Address, value: u128) -> Self {
        Self {
            operation: Operation::Call,
            target,
            value,
            data: Bytes::new(),
        }
    }

    /// A read-only call.
    pub fn static_call(target: Address, data: impl Into<Bytes>) -> Self {
        Self {
            operation: Operation::StaticCall,
            ..Self::call(target, data)
        }
    }

    /// A call executed in the resource's own context.
    pub fn delegate_call(target: Address, data: impl Into<Bytes>) -> Self {
        Self {
            operation: Operation::DelegateCall,
            ..Self::call(target, data)
        }
    }

    /// A contract deployment. `data` is the creation bytecode.
    pub fn create(bytecode: impl Into<Bytes>) -> Self {
        Self {
            operation: Operation::Create,
            ..Self::call(Address::ZERO, bytecode)
        }
    }

    /// Attach a value to the call.
    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }

    /// Function selector checked against allow-lists.
    ///
    /// `None` for a pure value transfer, which has no function to filter.
    pub fn selector(&self) -> Option<Selector> {
        if self.data.is_empty() && self.value > 0 {
            None
        } else {
            Some(Selector::from_calldata(&self.data))
        }
    }
}

/// A request forwarded to the resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    SetData { key: DataKey, value: Bytes },
    SetDataBatch { keys: Vec<DataKey>, values: Vec<Bytes> },
    Execute(ExecuteCall),
    ExecuteBatch(Vec<ExecuteCall>),
    TransferOwnership(Address),
    AcceptOwnership,
    RenounceOwnership,
}

impl Payload {
    /// Single key write.
    pub fn set_data(key: DataKey, value: impl Into<Bytes>) -> Self {
        Payload::SetData {
            key,
            value: value.into(),
        }
    }

    /// Canonical CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Decode from CBOR bytes.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::SetData { .. } => "set_data",
            Payload::SetDataBatch { .. } => "set_data_batch",
            Payload::Execute(_) => "execute",
            Payload::ExecuteBatch(_) => "execute_batch",
            Payload::TransferOwnership(_) => "transfer_ownership",
            Payload::AcceptOwnership => "accept_ownership",
            Payload::RenounceOwnership => "renounce_ownership",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cbor_roundtrip_preserves_large_value() {
        let payload = Payload::Execute(
            ExecuteCall::call(Address::from_bytes([3; 20]), vec![0xaa, 0xbb, 0xcc, 0xdd, 0x01])
                .with_value(u128::MAX),
        );
        let bytes = payload.to_cbor().unwrap();
        assert_eq!(Payload::from_cbor(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_cbor_is_deterministic() {
        let payload = Payload::SetDataBatch {
            keys: vec![DataKey([1; 32]), DataKey([2; 32])],
            values: vec![Bytes::from_static(b"a"), Bytes::new()],
        };
        assert_eq!(payload.to_cbor().unwrap(), payload.clone().to_cbor().unwrap());
    }

    #[test]
    fn test_from_cbor_rejects_garbage() {
        assert!(matches!(
            Payload::from_cbor(&[0xff, 0x00]),
            Err(CoreError::DecodingError(_))
        ));
    }

    #[test]
    fn test_selector_for_transfer_is_none() {
        let target = Address::from_bytes([1; 20]);
        assert_eq!(ExecuteCall::transfer(target, 5).selector(), None);
        assert_eq!(
            ExecuteCall::call(target, Vec::new()).selector(),
            Some(Selector([0; 4]))
        );
        assert_eq!(
            ExecuteCall::call(target, vec![1, 2, 3, 4, 5]).selector(),
            Some(Selector([1, 2, 3, 4]))
        );
    }

    #[test]
    fn test_operation_call_types() {
        assert!(Operation::Create2.is_create());
        assert_eq!(Operation::Create.call_type(), None);
        assert_eq!(Operation::DelegateCall.call_type(), Some(CallTypes::DELEGATECALL));
        assert_eq!(ExecuteCall::create(vec![0x60]).target, Address::ZERO);
    }
}
