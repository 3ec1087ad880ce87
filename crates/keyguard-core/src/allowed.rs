//! Allow-list entries: which calls and which data keys a controller may use
//! without the matching SUPER_ permission.
//!
//! ## AllowedCalls element layouts
//!
//! Fixed form, exactly 32 bytes:
//!
//! ```text
//! call_types(4) || target(20) || standard(4) || selector(4)
//! ```
//!
//! where a field of all `0xff` bytes is a wildcard.
//!
//! Tagged form, used when a filter cannot be expressed in the fixed form:
//!
//! ```text
//! 0x80 || call_types(4) || filter(target) || filter(standard) || filter(selector)
//! filter = 0x00                      wildcard
//!        | 0x01 || value(width)      exact
//!        | 0x02 || len(1) || bytes   prefix, 1 <= len < width
//! ```
//!
//! Standards are resolved by asking the target, so they only admit wildcard
//! or exact filters.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::compact;
use crate::error::{CoreError, Result};
use crate::types::{Address, DataKey, Selector};

const FIXED_LEN: usize = 32;
const TAGGED_MARKER: u8 = 0x80;

const TAG_WILDCARD: u8 = 0x00;
const TAG_EXACT: u8 = 0x01;
const TAG_PREFIX: u8 = 0x02;

const TARGET_WIDTH: usize = 20;
const STANDARD_WIDTH: usize = 4;
const SELECTOR_WIDTH: usize = 4;

bitflags! {
    /// Call types an AllowedCalls entry applies to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CallTypes: u32 {
        const TRANSFERVALUE = 0x1;
        const CALL = 0x2;
        const STATICCALL = 0x4;
        const DELEGATECALL = 0x8;
    }
}

/// Pattern applied to one field of a requested call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Filter {
    /// Accepts anything.
    Wildcard,
    /// Accepts only this exact value.
    Exact(Vec<u8>),
    /// Accepts any value starting with these bytes.
    Prefix(Vec<u8>),
}

impl Filter {
    /// Check a candidate value against this filter.
    pub fn accepts(&self, candidate: &[u8]) -> bool {
        match self {
            Filter::Wildcard => true,
            Filter::Exact(value) => value.as_slice() == candidate,
            Filter::Prefix(prefix) => candidate.starts_with(prefix),
        }
    }

    fn from_fixed(field: &[u8]) -> Self {
        if field.iter().all(|b| *b == 0xff) {
            Filter::Wildcard
        } else {
            Filter::Exact(field.to_vec())
        }
    }

    /// Fixed-form bytes, if this filter has one.
    fn to_fixed(&self, width: usize) -> Option<Vec<u8>> {
        match self {
            Filter::Wildcard => Some(vec![0xff; width]),
            Filter::Exact(v) if v.len() == width && v.iter().any(|b| *b != 0xff) => Some(v.clone()),
            _ => None,
        }
    }

    /// Reject filters the tagged form cannot carry for a field of `width`.
    fn check(&self, field: &str, width: usize, allow_prefix: bool) -> Result<()> {
        match self {
            Filter::Wildcard => Ok(()),
            Filter::Exact(v) if v.len() != width => Err(invalid_calls(&format!(
                "{} value of {} bytes, expected {}",
                field,
                v.len(),
                width
            ))),
            Filter::Exact(_) => Ok(()),
            Filter::Prefix(_) if !allow_prefix => {
                Err(invalid_calls(&format!("prefix filter not allowed for {}", field)))
            }
            Filter::Prefix(p) if p.is_empty() || p.len() >= width => Err(invalid_calls(&format!(
                "{} prefix length {} outside 1..{}",
                field,
                p.len(),
                width
            ))),
            Filter::Prefix(_) => Ok(()),
        }
    }

    fn encode_tagged(&self, out: &mut Vec<u8>) {
        match self {
            Filter::Wildcard => out.push(TAG_WILDCARD),
            Filter::Exact(v) => {
                out.push(TAG_EXACT);
                out.extend_from_slice(v);
            }
            Filter::Prefix(p) => {
                out.push(TAG_PREFIX);
                out.push(p.len() as u8);
                out.extend_from_slice(p);
            }
        }
    }

    fn decode_tagged(input: &[u8], cursor: &mut usize, width: usize, allow_prefix: bool) -> Result<Self> {
        let tag = *input
            .get(*cursor)
            .ok_or_else(|| invalid_calls("missing filter tag"))?;
        *cursor += 1;

        match tag {
            TAG_WILDCARD => Ok(Filter::Wildcard),
            TAG_EXACT => {
                let value = take(input, cursor, width)?;
                Ok(Filter::Exact(value.to_vec()))
            }
            TAG_PREFIX if allow_prefix => {
                let len = *input
                    .get(*cursor)
                    .ok_or_else(|| invalid_calls("missing prefix length"))? as usize;
                *cursor += 1;
                if len == 0 || len >= width {
                    return Err(invalid_calls(&format!(
                        "prefix length {} outside 1..{}",
                        len, width
                    )));
                }
                let value = take(input, cursor, len)?;
                Ok(Filter::Prefix(value.to_vec()))
            }
            TAG_PREFIX => Err(invalid_calls("prefix filter not allowed for standards")),
            other => Err(invalid_calls(&format!("unknown filter tag {:#04x}", other))),
        }
    }
}

fn take<'a>(input: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = *cursor + len;
    let slice = input
        .get(*cursor..end)
        .ok_or_else(|| invalid_calls("filter value truncated"))?;
    *cursor = end;
    Ok(slice)
}

fn invalid_calls(msg: &str) -> CoreError {
    CoreError::InvalidEncodedAllowedCalls(msg.to_string())
}

/// One AllowedCalls entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllowedCall {
    pub call_types: CallTypes,
    pub target: Filter,
    pub standard: Filter,
    pub selector: Filter,
}

impl AllowedCall {
    /// Entry allowing the given call types to any target, standard and function.
    pub fn any(call_types: CallTypes) -> Self {
        Self {
            call_types,
            target: Filter::Wildcard,
            standard: Filter::Wildcard,
            selector: Filter::Wildcard,
        }
    }

    /// Entry allowing the given call types to one target.
    pub fn to_target(call_types: CallTypes, target: Address) -> Self {
        Self {
            target: Filter::Exact(target.0.to_vec()),
            ..Self::any(call_types)
        }
    }

    /// Restrict the entry to one function selector.
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = Filter::Exact(selector.0.to_vec());
        self
    }

    /// Restrict the entry to targets supporting one standard.
    pub fn with_standard(mut self, standard: [u8; 4]) -> Self {
        self.standard = Filter::Exact(standard.to_vec());
        self
    }

    /// Check whether this entry admits a call.
    ///
    /// `selector` is `None` for a pure value transfer, which skips the
    /// function filter. `supports_standard` answers whether the target
    /// implements a given standard id.
    pub fn permits<F>(
        &self,
        required: CallTypes,
        target: &Address,
        selector: Option<Selector>,
        supports_standard: F,
    ) -> bool
    where
        F: Fn(&[u8]) -> bool,
    {
        if required.is_empty() || !self.call_types.contains(required) {
            return false;
        }
        if !self.target.accepts(&target.0) {
            return false;
        }
        let standard_ok = match &self.standard {
            Filter::Wildcard => true,
            Filter::Exact(id) => supports_standard(id.as_slice()),
            Filter::Prefix(_) => false,
        };
        if !standard_ok {
            return false;
        }
        match selector {
            Some(sel) => self.selector.accepts(&sel.0),
            None => true,
        }
    }

    /// Encode one entry, preferring the fixed 32-byte form.
    ///
    /// Fails for filters [`decode`](Self::decode) would not accept back.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.target.check("target", TARGET_WIDTH, true)?;
        self.standard.check("standard", STANDARD_WIDTH, false)?;
        self.selector.check("selector", SELECTOR_WIDTH, true)?;

        let fixed = (
            self.target.to_fixed(TARGET_WIDTH),
            self.standard.to_fixed(STANDARD_WIDTH),
            self.selector.to_fixed(SELECTOR_WIDTH),
        );
        if let (Some(target), Some(standard), Some(selector)) = fixed {
            let mut out = Vec::with_capacity(FIXED_LEN);
            out.extend_from_slice(&self.call_types.bits().to_be_bytes());
            out.extend_from_slice(&target);
            out.extend_from_slice(&standard);
            out.extend_from_slice(&selector);
            return Ok(out);
        }

        let mut out = vec![TAGGED_MARKER];
        out.extend_from_slice(&self.call_types.bits().to_be_bytes());
        self.target.encode_tagged(&mut out);
        self.standard.encode_tagged(&mut out);
        self.selector.encode_tagged(&mut out);
        Ok(out)
    }

    /// Decode one entry in either layout.
    pub fn decode(element: &[u8]) -> Result<Self> {
        match element.first() {
            Some(b) if b & TAGGED_MARKER != 0 => Self::decode_tagged(element),
            Some(_) if element.len() == FIXED_LEN => Ok(Self::decode_fixed(element)),
            _ => Err(invalid_calls(&format!(
                "entry of {} bytes is neither fixed nor tagged",
                element.len()
            ))),
        }
    }

    fn decode_fixed(element: &[u8]) -> Self {
        let call_types = u32::from_be_bytes([element[0], element[1], element[2], element[3]]);
        Self {
            call_types: CallTypes::from_bits_retain(call_types),
            target: Filter::from_fixed(&element[4..24]),
            standard: Filter::from_fixed(&element[24..28]),
            selector: Filter::from_fixed(&element[28..32]),
        }
    }

    fn decode_tagged(element: &[u8]) -> Result<Self> {
        let mut cursor = 1usize;
        let types = take(element, &mut cursor, 4)?;
        let call_types = u32::from_be_bytes([types[0], types[1], types[2], types[3]]);

        let target = Filter::decode_tagged(element, &mut cursor, TARGET_WIDTH, true)?;
        let standard = Filter::decode_tagged(element, &mut cursor, STANDARD_WIDTH, false)?;
        let selector = Filter::decode_tagged(element, &mut cursor, SELECTOR_WIDTH, true)?;

        if cursor != element.len() {
            return Err(invalid_calls("trailing bytes after selector filter"));
        }

        Ok(Self {
            call_types: CallTypes::from_bits_retain(call_types),
            target,
            standard,
            selector,
        })
    }
}

/// Decode a stored AllowedCalls value. Empty means no entries.
pub fn decode_allowed_calls(value: &[u8]) -> Result<Vec<AllowedCall>> {
    compact::decode(value)
        .map_err(|e| CoreError::InvalidEncodedAllowedCalls(e.to_string()))?
        .into_iter()
        .map(AllowedCall::decode)
        .collect()
}

/// Encode an AllowedCalls list for storage.
pub fn encode_allowed_calls(entries: &[AllowedCall]) -> Result<Vec<u8>> {
    let elements = entries
        .iter()
        .map(AllowedCall::encode)
        .collect::<Result<Vec<_>>>()?;
    compact::encode(&elements)
}

/// One AllowedERC725YDataKeys entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllowedDataKey {
    /// Only this exact key.
    Exact(DataKey),
    /// Any key starting with these bytes (1 to 31 bytes).
    Prefix(Vec<u8>),
}

impl AllowedDataKey {
    /// Check whether this entry admits a key.
    pub fn matches(&self, key: &DataKey) -> bool {
        match self {
            AllowedDataKey::Exact(k) => k == key,
            AllowedDataKey::Prefix(p) => key.starts_with(p),
        }
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            AllowedDataKey::Exact(k) => &k.0,
            AllowedDataKey::Prefix(p) => p,
        }
    }

    fn decode(element: &[u8]) -> Result<Self> {
        match element.len() {
            32 => Ok(AllowedDataKey::Exact(DataKey::try_from(element)?)),
            1..=31 => Ok(AllowedDataKey::Prefix(element.to_vec())),
            n => Err(CoreError::InvalidEncodedAllowedDataKeys(format!(
                "entry of {} bytes, expected 1..=32",
                n
            ))),
        }
    }
}

/// Decode a stored AllowedERC725YDataKeys value. Empty means no entries.
pub fn decode_allowed_data_keys(value: &[u8]) -> Result<Vec<AllowedDataKey>> {
    compact::decode(value)
        .map_err(|e| CoreError::InvalidEncodedAllowedDataKeys(e.to_string()))?
        .into_iter()
        .map(AllowedDataKey::decode)
        .collect()
}

/// Encode an AllowedERC725YDataKeys list for storage.
pub fn encode_allowed_data_keys(entries: &[AllowedDataKey]) -> Result<Vec<u8>> {
    if let Some(AllowedDataKey::Prefix(p)) = entries
        .iter()
        .find(|e| matches!(e, AllowedDataKey::Prefix(p) if p.is_empty() || p.len() >= 32))
    {
        return Err(CoreError::InvalidEncodedAllowedDataKeys(format!(
            "prefix of {} bytes, expected 1..=31",
            p.len()
        )));
    }
    let elements: Vec<&[u8]> = entries.iter().map(AllowedDataKey::as_bytes).collect();
    compact::encode(&elements)
}
