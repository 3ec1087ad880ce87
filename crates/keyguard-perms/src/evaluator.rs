//! Permission evaluation.
//!
//! Order of checks for a principal and a list of actions:
//!
//! 1. The master credential holder is allowed outright.
//! 2. The principal's permissions are loaded once; unset means denied.
//! 3. Each action is checked against that snapshot, first denial wins.
//!
//! Calls without the matching SUPER_ flag must match an AllowedCalls entry;
//! an empty list admits nothing. Writes to ordinary data keys without
//! SUPER_SETDATA must match an AllowedERC725YDataKeys entry. Writes to the
//! permission layout itself need ADDCONTROLLER or EDITPERMISSIONS depending on
//! whether they add or modify a controller.

use bytes::Bytes;
use keyguard_core::allowed::{decode_allowed_calls, decode_allowed_data_keys};
use keyguard_core::keys::{self, KeyKind};
use keyguard_core::{
    Address, CallTypes, DataKey, ExecuteCall, Operation, Payload, Permissions,
};
use keyguard_store::Resource;

use crate::action::{actions_for, Action};
use crate::error::{Denial, Result};
use crate::master::MasterOverrideResolver;
use crate::store::{PermissionSnapshot, PermissionStore};

/// Decides whether a principal may perform actions on a resource.
pub struct PermissionEvaluator<'a> {
    resource: &'a dyn Resource,
    master: &'a MasterOverrideResolver,
}

impl<'a> PermissionEvaluator<'a> {
    pub fn new(resource: &'a dyn Resource, master: &'a MasterOverrideResolver) -> Self {
        Self { resource, master }
    }

    /// Read adapter over the same resource.
    pub fn store(&self) -> PermissionStore<'a> {
        PermissionStore::new(self.resource)
    }

    /// Evaluate a single action.
    pub fn evaluate(&self, principal: &Address, action: &Action) -> Result<()> {
        self.evaluate_all(principal, std::slice::from_ref(action))
    }

    /// Evaluate everything a payload does.
    pub fn evaluate_payload(&self, principal: &Address, payload: &Payload) -> Result<()> {
        self.evaluate_all(principal, &actions_for(payload))
    }

    /// Evaluate a batch of actions against one permission snapshot.
    pub fn evaluate_all(&self, principal: &Address, actions: &[Action]) -> Result<()> {
        if self.master.is_master_holder(principal) {
            tracing::debug!(
                %principal,
                actions = actions.len(),
                "master credential holder authorised"
            );
            return Ok(());
        }

        let result = self.check_all(principal, actions);
        match &result {
            Ok(()) => tracing::debug!(%principal, actions = actions.len(), "authorised"),
            Err(denial) => tracing::warn!(%principal, %denial, "denied"),
        }
        result
    }

    fn check_all(&self, principal: &Address, actions: &[Action]) -> Result<()> {
        let snapshot = self
            .store()
            .snapshot(principal)?
            .ok_or(Denial::NoPermissionsSet(*principal))?;

        actions
            .iter()
            .try_for_each(|action| self.check(&snapshot, action))
    }

    /// Check one action against an already loaded snapshot.
    pub fn check(&self, snapshot: &PermissionSnapshot, action: &Action) -> Result<()> {
        match action {
            Action::Execute(call) => self.check_execute(snapshot, call),
            Action::SetData { keys, values } => self.check_set_data(snapshot, keys, values),
            other => match other.fixed_permission() {
                Some(flag) => require(snapshot, flag),
                None => Ok(()),
            },
        }
    }

    fn check_execute(&self, snapshot: &PermissionSnapshot, call: &ExecuteCall) -> Result<()> {
        match call.operation {
            Operation::Create | Operation::Create2 => check_deploy(snapshot, call),
            Operation::Call => {
                let mut required = Vec::with_capacity(2);
                if call.value > 0 {
                    required.push((Permissions::TRANSFERVALUE, CallTypes::TRANSFERVALUE));
                }
                if !call.data.is_empty() || call.value == 0 {
                    required.push((Permissions::CALL, CallTypes::CALL));
                }
                self.check_call(snapshot, call, &required)
            }
            Operation::StaticCall => {
                reject_value(call)?;
                self.check_call(
                    snapshot,
                    call,
                    &[(Permissions::STATICCALL, CallTypes::STATICCALL)],
                )
            }
            Operation::DelegateCall => {
                reject_value(call)?;
                self.check_call(
                    snapshot,
                    call,
                    &[(Permissions::DELEGATECALL, CallTypes::DELEGATECALL)],
                )
            }
        }
    }

    fn check_call(
        &self,
        snapshot: &PermissionSnapshot,
        call: &ExecuteCall,
        required: &[(Permissions, CallTypes)],
    ) -> Result<()> {
        let perms = snapshot.permissions;
        for (flag, _) in required {
            if !perms.has_base_or_super(*flag) {
                return Err(not_authorised(snapshot, *flag));
            }
        }

        let restricted = required
            .iter()
            .any(|(flag, _)| !flag.super_variant().is_some_and(|s| perms.has(s)));
        if !restricted {
            return Ok(());
        }

        let call_types = required
            .iter()
            .fold(CallTypes::empty(), |acc, (_, types)| acc | *types);
        let target = call.target;
        let selector = call.selector();

        let admitted = snapshot.allowed_calls()?.iter().any(|entry| {
            entry.permits(call_types, &target, selector, |id| {
                self.resource.supports_standard(&target, id)
            })
        });

        if admitted {
            Ok(())
        } else {
            Err(Denial::NotAllowedCall {
                principal: snapshot.principal,
                target,
                selector,
            })
        }
    }

    fn check_set_data(
        &self,
        snapshot: &PermissionSnapshot,
        keys: &[DataKey],
        values: &[Bytes],
    ) -> Result<()> {
        if keys.len() != values.len() {
            return Err(Denial::InvalidPayload(format!(
                "{} data keys but {} values",
                keys.len(),
                values.len()
            )));
        }
        if keys.is_empty() {
            return Err(Denial::InvalidPayload("no data keys".into()));
        }

        let perms = snapshot.permissions;
        let mut allowed_keys = None;

        for (key, value) in keys.iter().zip(values) {
            if let Some(action) = self.classify_write(key, value)? {
                self.check(snapshot, &action)?;
                continue;
            }

            if perms.has(Permissions::SUPER_SETDATA) {
                continue;
            }
            require(snapshot, Permissions::SETDATA)?;

            if allowed_keys.is_none() {
                allowed_keys = Some(snapshot.allowed_data_keys()?);
            }
            if !allowed_keys.iter().flatten().any(|entry| entry.matches(key)) {
                return Err(Denial::NotAllowedERC725YKey {
                    principal: snapshot.principal,
                    key: *key,
                });
            }
        }
        Ok(())
    }

    /// The permission-management action a key write amounts to.
    ///
    /// `None` for ordinary application data, which falls under SETDATA.
    pub fn classify_write(&self, key: &DataKey, value: &[u8]) -> Result<Option<Action>> {
        let invalid = |reason: String| Denial::InvalidDataValuesForDataKeys { key: *key, reason };

        let action = match keys::classify(key) {
            KeyKind::ControllerCount => {
                let new_count = parse_u128(value)
                    .ok_or_else(|| invalid(format!("controller count of {} bytes", value.len())))?;
                if new_count > self.controller_count()? {
                    Action::AddController
                } else {
                    Action::EditPermissions
                }
            }
            KeyKind::ControllerAt(index) => {
                if !value.is_empty() && value.len() != 20 {
                    return Err(invalid(format!("controller address of {} bytes", value.len())));
                }
                let count = self.controller_count()?;
                if index < count {
                    Action::EditPermissions
                } else if index == count {
                    Action::AddController
                } else {
                    return Err(invalid(format!(
                        "index {} beyond controller count {}",
                        index, count
                    )));
                }
            }
            KeyKind::Permissions(controller) => {
                if !value.is_empty() && value.len() != 32 {
                    return Err(invalid(format!("permissions of {} bytes", value.len())));
                }
                self.controller_action(&controller)?
            }
            KeyKind::AllowedCalls(controller) => {
                decode_allowed_calls(value)?;
                self.controller_action(&controller)?
            }
            KeyKind::AllowedDataKeys(controller) => {
                decode_allowed_data_keys(value)?;
                self.controller_action(&controller)?
            }
            KeyKind::UnrecognisedPermissionKey => {
                return Err(Denial::NotRecognisedPermissionKey(*key))
            }
            KeyKind::UniversalReceiverDelegate => Action::AddOrChangeUrd {
                existing: !self.resource.read(key)?.is_empty(),
            },
            KeyKind::Extension => Action::AddOrChangeExtension {
                existing: !self.resource.read(key)?.is_empty(),
            },
            KeyKind::Generic => return Ok(None),
        };
        Ok(Some(action))
    }

    /// Adding a controller when it has no permissions yet, editing otherwise.
    fn controller_action(&self, controller: &Address) -> Result<Action> {
        Ok(match self.store().permissions_of(controller)? {
            Some(_) => Action::EditPermissions,
            None => Action::AddController,
        })
    }

    fn controller_count(&self) -> Result<u128> {
        let raw = self
            .resource
            .read(&DataKey::from_bytes(keys::ADDRESS_PERMISSIONS_ARRAY))?;
        if raw.is_empty() {
            return Ok(0);
        }
        parse_u128(&raw).ok_or_else(|| {
            Denial::InvalidStoredData(format!("controller count of {} bytes", raw.len()))
        })
    }
}

fn check_deploy(snapshot: &PermissionSnapshot, call: &ExecuteCall) -> Result<()> {
    if !call.target.is_zero() {
        return Err(Denial::InvalidPayload(
            "deployment target must be the zero address".into(),
        ));
    }
    require(snapshot, Permissions::DEPLOY)?;
    if call.value > 0 && !snapshot.permissions.has_base_or_super(Permissions::TRANSFERVALUE) {
        return Err(not_authorised(snapshot, Permissions::TRANSFERVALUE));
    }
    Ok(())
}

fn reject_value(call: &ExecuteCall) -> Result<()> {
    if call.value != 0 {
        return Err(Denial::InvalidPayload(format!(
            "{:?} cannot transfer value",
            call.operation
        )));
    }
    Ok(())
}

fn require(snapshot: &PermissionSnapshot, flag: Permissions) -> Result<()> {
    if snapshot.permissions.has(flag) {
        Ok(())
    } else {
        Err(not_authorised(snapshot, flag))
    }
}

fn not_authorised(snapshot: &PermissionSnapshot, flag: Permissions) -> Denial {
    Denial::NotAuthorised {
        principal: snapshot.principal,
        permission: flag,
    }
}

fn parse_u128(value: &[u8]) -> Option<u128> {
    let arr: [u8; 16] = value.try_into().ok()?;
    Some(u128::from_be_bytes(arr))
}
