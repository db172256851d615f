// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! RMI payload construction and decoding: the byte-level half of the
//! RMI/PDO layer. [`ventilation`] builds on these pure functions with the
//! high-level typed operations that actually talk to a bridge.

pub mod ventilation;

use crate::{error::BridgeError, util, vocab::PdoType};

/// GET a single property's value.
pub const VERB_GET_SINGLE: u8 = 0x01;
/// GET multiple properties' values in one round trip.
pub const VERB_GET_MULTIPLE: u8 = 0x02;
/// SET a property's value (untyped single byte, or typed via a pdo type).
pub const VERB_SET_PROPERTY: u8 = 0x03;
/// Clear the unit's error state.
pub const VERB_CLEAR_ERRORS: u8 = 0x82;
/// GET the current schedule-mode selector value.
pub const VERB_GET_SCHEDULE_MODE: u8 = 0x83;
/// SET the schedule-mode selector value, with a timeout before it reverts.
pub const VERB_SET_SCHEDULE_MODE: u8 = 0x84;
/// Re-enable (return to) automatic schedule mode for a selector.
pub const VERB_ENABLE_SCHEDULE: u8 = 0x85;

/// `[VERB_GET_SCHEDULE_MODE, unit, subunit, selector]`.
pub fn get_schedule_mode(unit: u8, subunit: u8, selector: u8) -> Vec<u8> {
    vec![VERB_GET_SCHEDULE_MODE, unit, subunit, selector]
}

/// `[VERB_SET_SCHEDULE_MODE, unit, subunit, selector, 0,0,0,0, timeout_le(4), value]`.
pub fn set_schedule_mode(unit: u8, subunit: u8, selector: u8, timeout: i32, value: u8) -> Vec<u8> {
    let mut out = vec![VERB_SET_SCHEDULE_MODE, unit, subunit, selector, 0x00, 0x00, 0x00, 0x00];
    out.extend_from_slice(&timeout.to_le_bytes());
    out.push(value);
    out
}

/// `[VERB_ENABLE_SCHEDULE, unit, subunit, selector]`.
pub fn enable_schedule_mode(unit: u8, subunit: u8, selector: u8) -> Vec<u8> {
    vec![VERB_ENABLE_SCHEDULE, unit, subunit, selector]
}

/// `[VERB_CLEAR_ERRORS, UNIT_ERROR, SUBUNIT_01]`.
pub fn clear_errors_payload() -> Vec<u8> {
    vec![VERB_CLEAR_ERRORS, crate::vocab::UNIT_ERROR, crate::vocab::SUBUNIT_01]
}

/// `[VERB_GET_SINGLE, unit, subunit, 0x10, property_id]`.
pub fn get_single_property_payload(unit: u8, subunit: u8, property_id: u8) -> Vec<u8> {
    vec![VERB_GET_SINGLE, unit, subunit, 0x10, property_id]
}

/// `[VERB_GET_MULTIPLE, unit, subunit, 0x01, 0x10|len, ...property_ids]`.
pub fn get_multiple_properties_payload(unit: u8, subunit: u8, property_ids: &[u8]) -> Vec<u8> {
    let len_byte = 0x10 | u8::try_from(property_ids.len()).unwrap_or(u8::MAX);
    let mut out = vec![VERB_GET_MULTIPLE, unit, subunit, 0x01, len_byte];
    out.extend_from_slice(property_ids);
    out
}

/// `[VERB_SET_PROPERTY, unit, subunit, property_id, value]` (untyped, one byte).
pub fn set_property_payload(unit: u8, subunit: u8, property_id: u8, value: u8) -> Vec<u8> {
    vec![VERB_SET_PROPERTY, unit, subunit, property_id, value]
}

/// `[VERB_SET_PROPERTY, unit, subunit, property_id, ...encode_pdo_value(value, pdo_type)]`.
pub fn set_property_typed_payload(
    unit: u8,
    subunit: u8,
    property_id: u8,
    value: i64,
    pdo_type: PdoType,
) -> Result<Vec<u8>, BridgeError> {
    let mut out = vec![VERB_SET_PROPERTY, unit, subunit, property_id];
    out.extend(util::encode_pdo_value(value, pdo_type)?);
    Ok(out)
}

/// Decodes a GET-schedule-mode reply from its first byte.
pub fn decode_mode_first_byte(payload: &[u8]) -> Result<u8, BridgeError> {
    payload.first().copied().ok_or(BridgeError::InvalidValue {
        context: "rmi response: expected at least one byte",
        value: 0,
    })
}

/// Decodes a GET-schedule-mode reply from its last byte.
pub fn decode_mode_last_byte(payload: &[u8]) -> Result<u8, BridgeError> {
    payload.last().copied().ok_or(BridgeError::InvalidValue {
        context: "rmi response: expected at least one byte",
        value: 0,
    })
}

/// Decodes a GET-property reply per its declared [`PdoType`].
pub fn decode_property_value(payload: &[u8], property_type: PdoType) -> crate::sensors::SensorValue {
    use crate::sensors::SensorValue;

    match property_type {
        PdoType::String => {
            let text = String::from_utf8_lossy(payload);
            SensorValue::Str(text.trim_end_matches('\0').to_string())
        },
        PdoType::Bool => SensorValue::Bool(payload.first().copied() == Some(1)),
        PdoType::Int8 | PdoType::Int16 | PdoType::Int64 => SensorValue::Int(util::decode_signed_le(payload)),
        PdoType::Uint8 | PdoType::Uint16 | PdoType::Uint32 => {
            SensorValue::Int(payload.iter().rev().fold(0i64, |acc, b| (acc << 8) | i64::from(*b)))
        },
        PdoType::Time | PdoType::Version => SensorValue::Int(util::decode_signed_le(payload)),
    }
}
