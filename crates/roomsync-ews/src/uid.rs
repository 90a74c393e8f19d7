//! UID ↔ GlobalObjectId conversion.
//!
//! The calendar UID is a hex string. Searching a mailbox for a meeting
//! goes through the GlobalObjectId extended MAPI property, whose
//! restriction value must be the base64 encoding of the UID's raw
//! bytes. The property lives in PSETID_Meeting
//! (`6ED8DA90-450B-101B-98DA-00AA003F1305`), PropertyId 3, Binary.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::EwsResult;

/// Property set of the GlobalObjectId extended property.
pub(crate) const GLOBAL_OBJECT_ID_PROPERTY_SET: &str = "6ED8DA90-450B-101B-98DA-00AA003F1305";

/// Property id of the GlobalObjectId extended property.
pub(crate) const GLOBAL_OBJECT_ID_PROPERTY_ID: u32 = 3;

/// Convert a hex UID into the base64 GlobalObjectId restriction value.
///
/// # Errors
///
/// Returns [`EwsError::InvalidUid`](crate::EwsError::InvalidUid) when
/// the UID is not valid hex.
pub fn global_object_id(uid: &str) -> EwsResult<String> {
    let bytes = hex::decode(uid)?;
    Ok(STANDARD.encode(bytes))
}
