use std::collections::BTreeMap;

/// Attribute holding the encoded snapshot.
pub const PAYLOAD_KEY: &str = "packed-contents";
/// Payload attribute written by older releases. Still read, never written.
pub const LEGACY_PAYLOAD_KEY: &str = "tent-contents";
pub const SOLID_COUNT_KEY: &str = "solid-block-count";

/// A value in an item's attribute bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Bytes(Vec<u8>),
    Int(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Empty,
    Packed,
}

/// The carried container item.
///
/// Presence of a payload, not `state`, decides whether the next use packs or
/// unpacks; a packed item without a readable payload packs again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarriedItem {
    pub state: ItemState,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl CarriedItem {
    pub fn empty() -> Self {
        Self {
            state: ItemState::Empty,
            attributes: BTreeMap::new(),
        }
    }

    pub fn packed(payload: Vec<u8>, solid_block_count: u32) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(PAYLOAD_KEY.to_string(), AttrValue::Bytes(payload));
        attributes.insert(
            SOLID_COUNT_KEY.to_string(),
            AttrValue::Int(i64::from(solid_block_count)),
        );
        Self {
            state: ItemState::Packed,
            attributes,
        }
    }

    /// Encoded snapshot, checking the legacy key first.
    pub fn payload(&self) -> Option<&[u8]> {
        [LEGACY_PAYLOAD_KEY, PAYLOAD_KEY]
            .iter()
            .find_map(|key| match self.attributes.get(*key) {
                Some(AttrValue::Bytes(bytes)) => Some(bytes.as_slice()),
                _ => None,
            })
    }

    /// Recorded solid count; missing or out-of-range values read as 0.
    pub fn solid_block_count(&self) -> u32 {
        match self.attributes.get(SOLID_COUNT_KEY) {
            Some(AttrValue::Int(n)) => u32::try_from(*n).unwrap_or(0),
            _ => 0,
        }
    }
}

impl Default for CarriedItem {
    fn default() -> Self {
        Self::empty()
    }
}
