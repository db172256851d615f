// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::utils::generate_local_uuid;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Bridge connection parameters.
    pub bridge: BridgeConfig,
    /// Local app identity used to register with the bridge.
    pub app: AppConfig,
    /// PDOs to subscribe to on session start.
    #[serde(default)]
    pub sensors: Vec<SensorSubscription>,
    /// Implementation/runtime parameters that live outside the wire protocol.
    pub runtime: RuntimeConfig,
}

/// Bridge identity and address.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BridgeConfig {
    #[serde(rename = "Host")]
    /// IP address or hostname of the ComfoConnect LAN C gateway.
    pub host: String,

    #[serde(default, rename = "Uuid")]
    /// Bridge UUID as a 32-char hex string. Resolved via discovery if absent.
    pub uuid: Option<String>,
}

/// Identity this client registers itself under.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AppConfig {
    #[serde(default, rename = "LocalUuid")]
    /// Local app UUID as a 32-char hex string. Generated once and persisted
    /// by the caller if absent.
    pub local_uuid: Option<String>,

    #[serde(rename = "DeviceName")]
    /// Human-readable device name, at most 32 characters.
    pub device_name: String,

    #[serde(rename = "Pin")]
    /// Registration PIN, 0..9999. Not a cryptographic secret.
    pub pin: u32,
}

/// One PDO subscription, installed on every (re)connect.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSubscription {
    #[serde(rename = "Pdid")]
    pub pdid: u32,
    #[serde(rename = "PdoType")]
    pub pdo_type: u8,
}

/// Runtime-only settings that do not map to wire fields.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RuntimeConfig {
    #[serde(rename = "ConnectTimeout", with = "serde_secs")]
    /// Bound on opening the TCP socket to the bridge.
    pub connect_timeout: Duration,

    #[serde(rename = "RequestTimeout", with = "serde_secs")]
    /// Bound on awaiting a reply for a request with `expect_reply=true`.
    pub request_timeout: Duration,

    #[serde(rename = "DiscoveryTimeout", with = "serde_secs")]
    /// Bound on the UDP discovery probe when no target host is given.
    pub discovery_timeout: Duration,

    #[serde(rename = "SensorHoldTimeout", with = "serde_secs")]
    /// Startup window during which PDO notifications are cached but not
    /// dispatched to the sensor callback.
    pub sensor_hold_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            discovery_timeout: Duration::from_secs(1),
            sensor_hold_timeout: Duration::from_secs(2),
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and fills in derived fields (notably a freshly
    /// generated `local_uuid` when the caller omitted one).
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(!self.bridge.host.is_empty(), "bridge.Host must not be empty");

        if let Some(uuid) = &self.bridge.uuid {
            ensure!(uuid.len() == 32, "bridge.Uuid must be a 32-char hex string");
        }

        ensure!(
            !self.app.device_name.is_empty() && self.app.device_name.chars().count() <= 32,
            "app.DeviceName must be 1..=32 characters"
        );
        ensure!(self.app.pin <= 9999, "app.Pin must be in 0..=9999");

        if self.app.local_uuid.is_none() {
            let (_, hex) = generate_local_uuid();
            self.app.local_uuid = Some(hex);
        }
        if let Some(uuid) = &self.app.local_uuid {
            ensure!(uuid.len() == 32, "app.LocalUuid must be a 32-char hex string");
        }

        let mut seen = std::collections::HashSet::with_capacity(self.sensors.len());
        for sensor in &self.sensors {
            ensure!(
                seen.insert(sensor.pdid),
                "duplicate sensor subscription for pdid {}",
                sensor.pdid
            );
        }

        Ok(())
    }
}

/// Serde helper representing a `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
bridge:
  Host: "192.168.1.100"
app:
  DeviceName: "comfoconnect-rs"
  Pin: 1234
sensors:
  - Pdid: 16
    PdoType: 1
runtime:
  ConnectTimeout: 5
  RequestTimeout: 5
  DiscoveryTimeout: 1
  SensorHoldTimeout: 2
"#
    }

    #[test]
    fn parses_and_generates_missing_local_uuid() {
        let mut cfg: Config = serde_yaml::from_str(sample_yaml()).expect("parse");
        cfg.validate_and_normalize().expect("validate");
        assert_eq!(cfg.app.local_uuid.as_ref().map(String::len), Some(32));
        assert_eq!(cfg.sensors.len(), 1);
    }

    #[test]
    fn rejects_empty_host() {
        let mut cfg: Config = serde_yaml::from_str(sample_yaml()).expect("parse");
        cfg.bridge.host.clear();
        assert!(cfg.validate_and_normalize().is_err());
    }

    #[test]
    fn rejects_pin_out_of_range() {
        let mut cfg: Config = serde_yaml::from_str(sample_yaml()).expect("parse");
        cfg.app.pin = 10000;
        assert!(cfg.validate_and_normalize().is_err());
    }

    #[test]
    fn rejects_duplicate_sensor_pdid() {
        let mut cfg: Config = serde_yaml::from_str(sample_yaml()).expect("parse");
        cfg.sensors.push(SensorSubscription { pdid: 16, pdo_type: 6 });
        assert!(cfg.validate_and_normalize().is_err());
    }
}
