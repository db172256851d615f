// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use comfoconnect_rs::{
    cfg::{cli::resolve_config_path, config::Config, logger::init_logger},
    discovery, rmi,
    sensors::{AlarmCallback, SensorCallback, SensorSpec, SensorValue},
    supervisor,
};
use tracing::{info, warn};

/// Logs every decoded PDO reading at info level. A real integration would
/// forward these into whatever telemetry sink the embedding application
/// uses instead.
struct LoggingSensorCallback;

impl SensorCallback for LoggingSensorCallback {
    fn on_sensor(&self, sensor: &SensorSpec, value: SensorValue) {
        match sensor.unit {
            Some(unit) => info!("{}: {:?} {unit}", sensor.name, value),
            None => info!("{}: {:?}", sensor.name, value),
        }
    }
}

/// Logs alarm notifications at warn level.
struct LoggingAlarmCallback;

impl AlarmCallback for LoggingAlarmCallback {
    fn on_alarm(&self, node_id: u32, errors: HashMap<u32, &'static str>) {
        if errors.is_empty() {
            return;
        }
        warn!("node {node_id} reported {} active error(s): {:?}", errors.len(), errors.values());
    }
}

fn parse_uuid(hex_str: &str, field: &'static str) -> Result<[u8; 16]> {
    let bytes = hex::decode(hex_str).with_context(|| format!("{field} is not valid hex"))?;
    bytes.try_into().map_err(|_| anyhow::anyhow!("{field} must decode to exactly 16 bytes"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_logger("config/logger.yaml")?;

    let cfg = resolve_config_path("config/comfoconnect.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let bridge_uuid_hex = match &cfg.bridge.uuid {
        Some(uuid) => uuid.clone(),
        None => {
            info!("no bridge uuid configured, discovering on {}", cfg.bridge.host);
            let bridge = discovery::discover_one(Some(&cfg.bridge.host), cfg.runtime.discovery_timeout)
                .await
                .context("discovery failed")?;
            bridge.uuid
        },
    };
    let bridge_uuid = parse_uuid(&bridge_uuid_hex, "bridge.Uuid")?;

    let local_uuid_hex = cfg.app.local_uuid.as_deref().context("app.LocalUuid should have been normalized")?;
    let local_uuid = parse_uuid(local_uuid_hex, "app.LocalUuid")?;

    info!("connecting to ComfoConnect bridge at {}", cfg.bridge.host);
    let handle = supervisor::connect(
        &cfg,
        bridge_uuid,
        local_uuid,
        Arc::new(LoggingSensorCallback),
        Arc::new(LoggingAlarmCallback),
    )
    .await
    .context("initial connect failed")?;

    let conn = handle.current().await?;
    match rmi::ventilation::get_speed(&conn).await {
        Ok(speed) => info!("current ventilation speed: {speed}"),
        Err(e) => warn!("get_speed failed: {e}"),
    }

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutting down");
    handle.disconnect().await;

    Ok(())
}
