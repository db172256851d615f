// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Bit manipulation, version decoding, CAN/PDO conversions, airflow
//! constraint calculation, and PDO value encoding.

use crate::{error::BridgeError, vocab::PdoType};

const CAN_ID_OFFSET: u32 = 0x40;
const PDO_SHIFT: u32 = 14;
const UINT64_BITS: u32 = 64;

/// Returns the indices of every set bit in `data`, LSB-first within each
/// byte, bytes in input order.
///
/// ```
/// # use comfoconnect_rs::util::bytearray_to_bits;
/// assert_eq!(bytearray_to_bits(&[0b0000_0001, 0b0000_0010]), vec![0, 9]);
/// assert_eq!(bytearray_to_bits(&[]), Vec::<usize>::new());
/// ```
pub fn bytearray_to_bits(data: &[u8]) -> Vec<usize> {
    let mut bits = Vec::new();
    let mut j = 0usize;
    for byte in data {
        for i in 0..8 {
            if byte & (1 << i) != 0 {
                bits.push(j);
            }
            j += 1;
        }
    }
    bits
}

/// Returns the positions of every set bit in `value`, scanning the low
/// [`UINT64_BITS`] bits.
pub fn uint_to_bits(value: u64) -> Vec<u32> {
    (0..UINT64_BITS).filter(|i| value & (1 << i) != 0).collect()
}

/// Decodes a packed firmware version into `<type><major>.<minor>.<patch>`,
/// e.g. `R1.2.3`.
pub fn version_decode(version: u32) -> String {
    let v1 = (version >> 30) & 0b11;
    let v2 = (version >> 20) & 0x3ff;
    let v3 = (version >> 10) & 0x3ff;
    let v4 = version & 0x3ff;
    let prefix = match v1 {
        0 => "U".to_string(),
        1 => "D".to_string(),
        2 => "P".to_string(),
        3 => "R".to_string(),
        other => other.to_string(),
    };
    format!("{prefix}{v2}.{v3}.{v4}")
}

/// Converts a PDO-ID to its CAN-ID, for a given node.
pub fn pdo_to_can(pdo: u32, node_id: u32) -> u32 {
    (pdo << PDO_SHIFT) + CAN_ID_OFFSET + node_id
}

/// Converts a CAN-ID back to its PDO-ID, for a given node.
pub fn can_to_pdo(can: u32, node_id: u32) -> u32 {
    (can - CAN_ID_OFFSET - node_id) >> PDO_SHIFT
}

/// Bit positions of the airflow-constraint bitmap (`PDID 219`).
const CONSTRAINT_BITS: &[(u32, &str)] = &[
    (2, "Resistance"),
    (3, "Resistance"),
    (4, "PreheaterNegative"),
    (5, "NoiseGuard"),
    (6, "ResistanceGuard"),
    (7, "NoiseGuard"),
    (8, "ResistanceGuard"),
    (9, "FrostProtection"),
    (10, "Bypass"),
    (12, "AnalogInput1"),
    (13, "AnalogInput2"),
    (14, "AnalogInput3"),
    (15, "AnalogInput4"),
    (16, "Hood"),
    (18, "AnalogPreset"),
    (19, "ComfoCool"),
    (22, "PreheaterPositive"),
    (23, "RFSensorFlowPreset"),
    (24, "RFSensorFlowProportional"),
    (25, "TemperatureComfort"),
    (26, "HumidityComfort"),
    (27, "HumidityProtection"),
    (47, "CO2ZoneX1"),
    (48, "CO2ZoneX2"),
    (49, "CO2ZoneX3"),
    (50, "CO2ZoneX4"),
    (51, "CO2ZoneX5"),
    (52, "CO2ZoneX6"),
    (53, "CO2ZoneX7"),
    (54, "CO2ZoneX8"),
];

/// Decodes the airflow-constraints bitmap. Returns `None` when bit 45 (the
/// "constraints present" flag) is unset.
pub fn calculate_airflow_constraints(value: u64) -> Option<Vec<&'static str>> {
    let bits = uint_to_bits(value);
    if !bits.contains(&45) {
        return None;
    }
    let mut out = Vec::new();
    for (bit, name) in CONSTRAINT_BITS {
        if bits.contains(bit) && !out.contains(name) {
            out.push(*name);
        }
    }
    Some(out)
}

/// Encodes an integer as the little-endian raw bytes for a given
/// [`PdoType`], matching the wire representation `set_property_typed` /
/// `decode_pdo_value` expect.
pub fn encode_pdo_value(value: i64, pdo_type: PdoType) -> Result<Vec<u8>, BridgeError> {
    match pdo_type {
        PdoType::Bool => Ok(vec![if value != 0 { 1 } else { 0 }]),
        PdoType::Uint8 => Ok((value as u8).to_le_bytes().to_vec()),
        PdoType::Uint16 => Ok((value as u16).to_le_bytes().to_vec()),
        PdoType::Uint32 => Ok((value as u32).to_le_bytes().to_vec()),
        PdoType::Int8 => Ok((value as i8).to_le_bytes().to_vec()),
        PdoType::Int16 => Ok((value as i16).to_le_bytes().to_vec()),
        PdoType::Int64 => Ok(value.to_le_bytes().to_vec()),
        other => Err(BridgeError::InvalidValue {
            context: "encode_pdo_value: unsupported pdo type",
            value: other as i64,
        }),
    }
}

/// Decodes arbitrary-length little-endian bytes as a signed integer,
/// sign-extending from the highest bit of the last byte. The companion
/// decode for [`encode_pdo_value`], but not restricted to the 1/2/4/8-byte
/// widths that function produces: RMI responses can come back at odd
/// lengths.
pub fn decode_signed_le(data: &[u8]) -> i64 {
    if data.is_empty() {
        return 0;
    }
    let len = data.len().min(8);
    let sign_bit = data[len - 1] & 0x80 != 0;
    let mut buf = if sign_bit { [0xffu8; 8] } else { [0u8; 8] };
    buf[..len].copy_from_slice(&data[..len]);
    i64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytearray_to_bits_empty() {
        assert!(bytearray_to_bits(&[]).is_empty());
    }

    #[test]
    fn bytearray_to_bits_known() {
        assert_eq!(bytearray_to_bits(&[0b0000_0001, 0b0000_0010]), vec![0, 9]);
    }

    #[test]
    fn version_decode_release() {
        // v1=3 (R), v2=1, v3=2, v4=3: (3<<30)|(1<<20)|(2<<10)|3
        let version = (3u32 << 30) | (1 << 20) | (2 << 10) | 3;
        assert_eq!(version_decode(version), "R1.2.3");
    }

    #[test]
    fn pdo_can_roundtrip() {
        for node_id in 1..128u32 {
            for pdo in [0u32, 1, 255, 65535, (1 << 18) - 1] {
                let can = pdo_to_can(pdo, node_id);
                assert_eq!(can_to_pdo(can, node_id), pdo);
            }
        }
    }

    #[test]
    fn encode_pdo_value_widths() {
        assert_eq!(encode_pdo_value(1, PdoType::Bool).unwrap(), vec![1]);
        assert_eq!(encode_pdo_value(0, PdoType::Bool).unwrap(), vec![0]);
        assert_eq!(
            encode_pdo_value(-1, PdoType::Int16).unwrap(),
            (-1i16).to_le_bytes().to_vec()
        );
        assert_eq!(
            encode_pdo_value(300, PdoType::Uint16).unwrap(),
            300u16.to_le_bytes().to_vec()
        );
    }

    #[test]
    fn airflow_constraints_requires_bit_45() {
        assert_eq!(calculate_airflow_constraints(0), None);
        let value = (1u64 << 45) | (1u64 << 10);
        assert_eq!(calculate_airflow_constraints(value), Some(vec!["Bypass"]));
    }

    #[test]
    fn decode_signed_le_empty_is_zero() {
        assert_eq!(decode_signed_le(&[]), 0);
    }

    #[test]
    fn decode_signed_le_matches_encode_roundtrip() {
        for (value, pdo_type) in [
            (-1i64, PdoType::Int16),
            (12345, PdoType::Uint16),
            (-100, PdoType::Int8),
            (70000, PdoType::Uint32),
        ] {
            let encoded = encode_pdo_value(value, pdo_type).expect("encode");
            assert_eq!(decode_signed_le(&encoded), value);
        }
    }

    #[test]
    fn decode_signed_le_odd_length() {
        // single positive byte
        assert_eq!(decode_signed_le(&[0x05]), 5);
        // single byte with sign bit set
        assert_eq!(decode_signed_le(&[0xff]), -1);
        // three bytes, little-endian, positive
        assert_eq!(decode_signed_le(&[0x00, 0x01, 0x00]), 256);
    }
}
