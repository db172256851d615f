// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! High-level typed ventilation operations, built on the pure payload
//! encoders in [`super`] and [`BridgeConnection::rmi_request`].
//!
//! Every operation here is a GET/SET pair addressing one fixed
//! `(unit, subunit, selector)` triple, decoded per the byte offset that
//! triple's RMI response actually uses — first byte, last byte, or the
//! whole payload as a little-endian integer, depending on the operation.
//! These offsets were confirmed against captured device traffic and do not
//! generalize cleanly across subunits; see the per-function doc comments.

use super::{
    clear_errors_payload, decode_mode_first_byte, decode_mode_last_byte, get_multiple_properties_payload,
    get_schedule_mode, get_single_property_payload, set_property_payload, set_property_typed_payload,
    set_schedule_mode,
};
use crate::{
    client::client::BridgeConnection,
    error::{BridgeError, Result},
    sensors::SensorValue,
    util,
    vocab::{
        BypassMode, ComfoCoolMode, Property, SUBUNIT_01, SUBUNIT_02, SUBUNIT_03, SUBUNIT_05, SUBUNIT_06,
        SUBUNIT_07, SUBUNIT_08, UNIT_SCHEDULE, VentilationBalance, VentilationMode, VentilationSetting,
        VentilationSpeed, VentilationTemperatureProfile, flow_property_for_speed,
    },
};

async fn rmi(conn: &BridgeConnection, payload: Vec<u8>) -> Result<Vec<u8>> {
    conn.rmi_request(payload, 1).await
}

/// Reads the first byte of subunit 08's schedule-mode selector.
///
/// Unlike the other selector-0x01 reads below, mode decodes from the
/// *first* byte, not the last — confirmed against captured traffic; do not
/// "fix" this to match the others.
pub async fn get_mode(conn: &BridgeConnection) -> Result<VentilationMode> {
    let reply = rmi(conn, get_schedule_mode(UNIT_SCHEDULE, SUBUNIT_08, 0x01)).await?;
    let mode = decode_mode_first_byte(&reply)?;
    Ok(if mode == 1 { VentilationMode::Manual } else { VentilationMode::Auto })
}

pub async fn set_mode(conn: &BridgeConnection, mode: VentilationMode) -> Result<()> {
    let payload = match mode {
        VentilationMode::Auto => super::enable_schedule_mode(UNIT_SCHEDULE, SUBUNIT_08, 0x01),
        VentilationMode::Manual => set_schedule_mode(UNIT_SCHEDULE, SUBUNIT_08, 0x01, 1, 0x01),
    };
    rmi(conn, payload).await?;
    Ok(())
}

pub async fn get_speed(conn: &BridgeConnection) -> Result<VentilationSpeed> {
    let reply = rmi(conn, get_schedule_mode(UNIT_SCHEDULE, SUBUNIT_01, 0x01)).await?;
    match decode_mode_last_byte(&reply)? {
        0 => Ok(VentilationSpeed::Away),
        1 => Ok(VentilationSpeed::Low),
        2 => Ok(VentilationSpeed::Medium),
        3 => Ok(VentilationSpeed::High),
        other => Err(BridgeError::InvalidValue { context: "get_speed", value: i64::from(other) }),
    }
}

pub async fn set_speed(conn: &BridgeConnection, speed: VentilationSpeed) -> Result<()> {
    let value = speed as u8;
    let payload = set_schedule_mode(UNIT_SCHEDULE, SUBUNIT_01, 0x01, 1, value);
    rmi(conn, payload).await?;
    Ok(())
}

pub async fn get_flow_for_speed(conn: &BridgeConnection, speed: VentilationSpeed) -> Result<i64> {
    get_single_property(conn, &flow_property_for_speed(speed)).await.map(sensor_value_to_int)
}

pub async fn set_flow_for_speed(conn: &BridgeConnection, speed: VentilationSpeed, value: i64) -> Result<()> {
    set_property_typed(conn, &flow_property_for_speed(speed), value).await
}

pub async fn get_bypass(conn: &BridgeConnection) -> Result<BypassMode> {
    let reply = rmi(conn, get_schedule_mode(UNIT_SCHEDULE, SUBUNIT_02, 0x01)).await?;
    match decode_mode_last_byte(&reply)? {
        0 => Ok(BypassMode::Auto),
        1 => Ok(BypassMode::Open),
        2 => Ok(BypassMode::Closed),
        other => Err(BridgeError::InvalidValue { context: "get_bypass", value: i64::from(other) }),
    }
}

pub async fn set_bypass(conn: &BridgeConnection, mode: BypassMode, timeout: i32) -> Result<()> {
    let payload = match mode {
        BypassMode::Auto => super::enable_schedule_mode(UNIT_SCHEDULE, SUBUNIT_02, 0x01),
        BypassMode::Open => set_schedule_mode(UNIT_SCHEDULE, SUBUNIT_02, 0x01, timeout, 0x01),
        BypassMode::Closed => set_schedule_mode(UNIT_SCHEDULE, SUBUNIT_02, 0x01, timeout, 0x02),
    };
    rmi(conn, payload).await?;
    Ok(())
}

/// Deprecated alias for [`set_bypass`] with `BypassMode::Open`, kept for
/// compatibility with call sites that speak of bypass "on"/"off".
pub async fn set_bypass_on(conn: &BridgeConnection, timeout: i32) -> Result<()> {
    tracing::warn!("set_bypass_on is deprecated, use set_bypass(BypassMode::Open)");
    set_bypass(conn, BypassMode::Open, timeout).await
}

/// Deprecated alias for [`set_bypass`] with `BypassMode::Closed`.
pub async fn set_bypass_off(conn: &BridgeConnection, timeout: i32) -> Result<()> {
    tracing::warn!("set_bypass_off is deprecated, use set_bypass(BypassMode::Closed)");
    set_bypass(conn, BypassMode::Closed, timeout).await
}

pub async fn get_balance_mode(conn: &BridgeConnection) -> Result<VentilationBalance> {
    let reply_06 = rmi(conn, get_schedule_mode(UNIT_SCHEDULE, SUBUNIT_06, 0x01)).await?;
    let reply_07 = rmi(conn, get_schedule_mode(UNIT_SCHEDULE, SUBUNIT_07, 0x01)).await?;
    let mode_06 = decode_mode_first_byte(&reply_06)?;
    let mode_07 = decode_mode_first_byte(&reply_07)?;
    VentilationBalance::from_subunits(mode_06, mode_07)
        .ok_or(BridgeError::InvalidValue { context: "get_balance_mode", value: i64::from(mode_06) << 8 | i64::from(mode_07) })
}

pub async fn set_balance_mode(conn: &BridgeConnection, mode: VentilationBalance) -> Result<()> {
    match mode {
        VentilationBalance::Balance => {
            rmi(conn, super::enable_schedule_mode(UNIT_SCHEDULE, SUBUNIT_06, 0x01)).await?;
            rmi(conn, super::enable_schedule_mode(UNIT_SCHEDULE, SUBUNIT_07, 0x01)).await?;
        },
        VentilationBalance::SupplyOnly => {
            rmi(conn, set_schedule_mode(UNIT_SCHEDULE, SUBUNIT_06, 0x01, -1, 0x01)).await?;
            rmi(conn, super::enable_schedule_mode(UNIT_SCHEDULE, SUBUNIT_07, 0x01)).await?;
        },
        VentilationBalance::ExhaustOnly => {
            rmi(conn, super::enable_schedule_mode(UNIT_SCHEDULE, SUBUNIT_06, 0x01)).await?;
            rmi(conn, set_schedule_mode(UNIT_SCHEDULE, SUBUNIT_07, 0x01, -1, 0x01)).await?;
        },
    }
    Ok(())
}

pub async fn get_boost(conn: &BridgeConnection) -> Result<bool> {
    let reply = rmi(conn, get_schedule_mode(UNIT_SCHEDULE, SUBUNIT_01, 0x06)).await?;
    Ok(decode_mode_first_byte(&reply)? == 1)
}

pub async fn set_boost(conn: &BridgeConnection, active: bool, timeout: i32) -> Result<()> {
    let payload = if active {
        set_schedule_mode(UNIT_SCHEDULE, SUBUNIT_01, 0x06, timeout, 0x03)
    } else {
        super::enable_schedule_mode(UNIT_SCHEDULE, SUBUNIT_01, 0x06)
    };
    rmi(conn, payload).await?;
    Ok(())
}

/// Default hold duration for [`set_boost`]/[`set_away`] when the caller has
/// no preference.
pub const DEFAULT_TIMED_OVERRIDE_SECS: i32 = 3600;

pub async fn get_away(conn: &BridgeConnection) -> Result<bool> {
    let reply = rmi(conn, get_schedule_mode(UNIT_SCHEDULE, SUBUNIT_01, 0x0B)).await?;
    Ok(decode_mode_first_byte(&reply)? == 1)
}

pub async fn set_away(conn: &BridgeConnection, active: bool, timeout: i32) -> Result<()> {
    let payload = if active {
        set_schedule_mode(UNIT_SCHEDULE, SUBUNIT_01, 0x0B, timeout, 0x00)
    } else {
        super::enable_schedule_mode(UNIT_SCHEDULE, SUBUNIT_01, 0x0B)
    };
    rmi(conn, payload).await?;
    Ok(())
}

/// The GET-path encoding for subunit 05 is the inverse of its SET-path
/// encoding (`0` means auto on read, but `0x85 ENABLE` means auto on
/// write) so it gets its own decode rather than reusing
/// `ComfoCoolMode`'s repr values.
pub async fn get_comfocool_mode(conn: &BridgeConnection) -> Result<ComfoCoolMode> {
    let reply = rmi(conn, get_schedule_mode(UNIT_SCHEDULE, SUBUNIT_05, 0x01)).await?;
    let mode = decode_mode_first_byte(&reply)?;
    Ok(if mode == 0 { ComfoCoolMode::Auto } else { ComfoCoolMode::Off })
}

pub async fn set_comfocool_mode(conn: &BridgeConnection, mode: ComfoCoolMode, timeout: i32) -> Result<()> {
    let payload = match mode {
        ComfoCoolMode::Auto => super::enable_schedule_mode(UNIT_SCHEDULE, SUBUNIT_05, 0x01),
        ComfoCoolMode::Off => set_schedule_mode(UNIT_SCHEDULE, SUBUNIT_05, 0x01, timeout, 0x00),
    };
    rmi(conn, payload).await?;
    Ok(())
}

/// Default hold for [`set_comfocool_mode`]/[`set_temperature_profile`]:
/// indefinite, until explicitly returned to auto.
pub const INDEFINITE_OVERRIDE: i32 = -1;

pub async fn get_temperature_profile(conn: &BridgeConnection) -> Result<VentilationTemperatureProfile> {
    let reply = rmi(conn, get_schedule_mode(UNIT_SCHEDULE, SUBUNIT_03, 0x01)).await?;
    match decode_mode_last_byte(&reply)? {
        0 => Ok(VentilationTemperatureProfile::Normal),
        1 => Ok(VentilationTemperatureProfile::Cool),
        2 => Ok(VentilationTemperatureProfile::Warm),
        other => Err(BridgeError::InvalidValue { context: "get_temperature_profile", value: i64::from(other) }),
    }
}

pub async fn set_temperature_profile(
    conn: &BridgeConnection,
    profile: VentilationTemperatureProfile,
    timeout: i32,
) -> Result<()> {
    let value = match profile {
        VentilationTemperatureProfile::Warm => 0x02,
        VentilationTemperatureProfile::Normal => 0x00,
        VentilationTemperatureProfile::Cool => 0x01,
    };
    let payload = set_schedule_mode(UNIT_SCHEDULE, SUBUNIT_03, 0x01, timeout, value);
    rmi(conn, payload).await?;
    Ok(())
}

/// Decodes a sensor-ventmode GET reply: the whole payload as a
/// little-endian unsigned int, not a fixed byte offset.
fn decode_sensor_ventmode(payload: &[u8]) -> Result<VentilationSetting> {
    match util::decode_signed_le(payload) {
        0 => Ok(VentilationSetting::Off),
        1 => Ok(VentilationSetting::Auto),
        2 => Ok(VentilationSetting::On),
        other => Err(BridgeError::InvalidValue { context: "sensor ventmode", value: other }),
    }
}

fn sensor_ventmode_value(setting: VentilationSetting) -> u8 {
    match setting {
        VentilationSetting::Auto => 0x01,
        VentilationSetting::On => 0x02,
        VentilationSetting::Off => 0x00,
    }
}

pub async fn get_sensor_ventmode_temperature_passive(conn: &BridgeConnection) -> Result<VentilationSetting> {
    let reply = rmi(conn, get_single_property_payload(
        crate::vocab::UNIT_TEMPHUMCONTROL,
        SUBUNIT_01,
        crate::vocab::PROP_ID_VENT_TEMP_PASSIVE,
    ))
    .await?;
    decode_sensor_ventmode(&reply)
}

pub async fn set_sensor_ventmode_temperature_passive(conn: &BridgeConnection, setting: VentilationSetting) -> Result<()> {
    let payload = set_property_payload(
        crate::vocab::UNIT_TEMPHUMCONTROL,
        SUBUNIT_01,
        crate::vocab::PROP_ID_VENT_TEMP_PASSIVE,
        sensor_ventmode_value(setting),
    );
    rmi(conn, payload).await?;
    Ok(())
}

pub async fn get_sensor_ventmode_humidity_comfort(conn: &BridgeConnection) -> Result<VentilationSetting> {
    let reply = rmi(conn, get_single_property_payload(
        crate::vocab::UNIT_TEMPHUMCONTROL,
        SUBUNIT_01,
        crate::vocab::PROP_ID_VENT_HUMI_COMFORT,
    ))
    .await?;
    decode_sensor_ventmode(&reply)
}

pub async fn set_sensor_ventmode_humidity_comfort(conn: &BridgeConnection, setting: VentilationSetting) -> Result<()> {
    let payload = set_property_payload(
        crate::vocab::UNIT_TEMPHUMCONTROL,
        SUBUNIT_01,
        crate::vocab::PROP_ID_VENT_HUMI_COMFORT,
        sensor_ventmode_value(setting),
    );
    rmi(conn, payload).await?;
    Ok(())
}

pub async fn get_sensor_ventmode_humidity_protection(conn: &BridgeConnection) -> Result<VentilationSetting> {
    let reply = rmi(conn, get_single_property_payload(
        crate::vocab::UNIT_TEMPHUMCONTROL,
        SUBUNIT_01,
        crate::vocab::PROP_ID_VENT_HUMI_PROTECT,
    ))
    .await?;
    decode_sensor_ventmode(&reply)
}

pub async fn set_sensor_ventmode_humidity_protection(
    conn: &BridgeConnection,
    setting: VentilationSetting,
) -> Result<()> {
    let payload = set_property_payload(
        crate::vocab::UNIT_TEMPHUMCONTROL,
        SUBUNIT_01,
        crate::vocab::PROP_ID_VENT_HUMI_PROTECT,
        sensor_ventmode_value(setting),
    );
    rmi(conn, payload).await?;
    Ok(())
}

fn sensor_value_to_int(value: SensorValue) -> i64 {
    match value {
        SensorValue::Int(i) => i,
        SensorValue::Float(f) => f as i64,
        SensorValue::Bool(b) => i64::from(b),
        SensorValue::Str(_) => 0,
    }
}

/// Reads `property` and decodes its reply per `property.property_type`.
pub async fn get_property(conn: &BridgeConnection, property: &Property) -> Result<SensorValue> {
    get_single_property(conn, property).await
}

pub async fn get_single_property(conn: &BridgeConnection, property: &Property) -> Result<SensorValue> {
    let payload = get_single_property_payload(property.unit, property.subunit, property.property_id);
    let reply = rmi(conn, payload).await?;
    Ok(super::decode_property_value(&reply, property.property_type))
}

/// Returns the raw reply bytes for several properties at once; multi-property
/// replies are not type-decoded.
pub async fn get_multiple_properties(
    conn: &BridgeConnection,
    unit: u8,
    subunit: u8,
    property_ids: &[u8],
) -> Result<Vec<u8>> {
    rmi(conn, get_multiple_properties_payload(unit, subunit, property_ids)).await
}

pub async fn set_property(conn: &BridgeConnection, unit: u8, subunit: u8, property_id: u8, value: u8) -> Result<()> {
    rmi(conn, set_property_payload(unit, subunit, property_id, value)).await?;
    Ok(())
}

pub async fn set_property_typed(conn: &BridgeConnection, property: &Property, value: i64) -> Result<()> {
    let payload = set_property_typed_payload(
        property.unit,
        property.subunit,
        property.property_id,
        value,
        property.property_type,
    )?;
    rmi(conn, payload).await?;
    Ok(())
}

pub async fn clear_errors(conn: &BridgeConnection) -> Result<()> {
    rmi(conn, clear_errors_payload()).await?;
    Ok(())
}
