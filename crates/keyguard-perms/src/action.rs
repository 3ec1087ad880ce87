//! Actions a principal can request, and how payloads map onto them.

use bytes::Bytes;
use keyguard_core::{DataKey, ExecuteCall, Payload, Permissions};

/// Something a principal asks to do through the key manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Transfer, accept or renounce ownership of the resource.
    ChangeOwner,
    /// Register a new controller.
    AddController,
    /// Change an existing controller's permissions.
    EditPermissions,
    /// Set an extension handler; `existing` when one is already set.
    AddOrChangeExtension { existing: bool },
    /// Set a universal receiver delegate; `existing` when one is already set.
    AddOrChangeUrd { existing: bool },
    /// Write data keys. Each key is classified against the stored layout.
    SetData { keys: Vec<DataKey>, values: Vec<Bytes> },
    /// Call, static call, delegate call or deployment.
    Execute(ExecuteCall),
    /// Have a signature accepted on behalf of the resource.
    Sign,
    /// Submit relay requests.
    ExecuteRelayCall,
}

impl Action {
    /// The single flag this action needs, when it needs exactly one and no
    /// allow-list.
    pub fn fixed_permission(&self) -> Option<Permissions> {
        match self {
            Action::ChangeOwner => Some(Permissions::CHANGEOWNER),
            Action::AddController => Some(Permissions::ADDCONTROLLER),
            Action::EditPermissions => Some(Permissions::EDITPERMISSIONS),
            Action::AddOrChangeExtension { existing: false } => Some(Permissions::ADDEXTENSIONS),
            Action::AddOrChangeExtension { existing: true } => Some(Permissions::CHANGEEXTENSIONS),
            Action::AddOrChangeUrd { existing: false } => {
                Some(Permissions::ADDUNIVERSALRECEIVERDELEGATE)
            }
            Action::AddOrChangeUrd { existing: true } => {
                Some(Permissions::CHANGEUNIVERSALRECEIVERDELEGATE)
            }
            Action::Sign => Some(Permissions::SIGN),
            Action::ExecuteRelayCall => Some(Permissions::EXECUTE_RELAY_CALL),
            Action::SetData { .. } | Action::Execute(_) => None,
        }
    }
}

/// The actions a payload performs, in forwarding order.
pub fn actions_for(payload: &Payload) -> Vec<Action> {
    match payload {
        Payload::SetData { key, value } => vec![Action::SetData {
            keys: vec![*key],
            values: vec![value.clone()],
        }],
        Payload::SetDataBatch { keys, values } => vec![Action::SetData {
            keys: keys.clone(),
            values: values.clone(),
        }],
        Payload::Execute(call) => vec![Action::Execute(call.clone())],
        Payload::ExecuteBatch(calls) => calls.iter().cloned().map(Action::Execute).collect(),
        Payload::TransferOwnership(_) | Payload::AcceptOwnership | Payload::RenounceOwnership => {
            vec![Action::ChangeOwner]
        }
    }
}
