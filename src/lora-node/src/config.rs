// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for lora-at-node.
//!
//! Config is loaded from the `[lora-node]` section of `lora-at.toml`.
//! Default search order:
//! 1. Path specified via `--config` CLI argument
//! 2. `./lora-at.toml`
//! 3. `~/.config/lora-at/lora-at.toml`
//! 4. `/etc/lora-at/lora-at.toml`

use std::time::Duration;

use serde::{Deserialize, Serialize};

use lora_at_app::ConfigFile;
use lora_at_core::dialect::{is_hex_payload, MAX_DATA_RATE, MAX_PORT, MIN_PORT};
use lora_at_core::{DeviceFamily, ModemResult, OtaaCredentials, ParamValue, PolicySet};

/// Top-level node configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Modem attachment
    pub modem: ModemConfig,
    /// OTAA credentials and radio settings
    pub credentials: OtaaCredentials,
    /// Listen windows, delays and attempt budgets
    pub behavior: BehaviorConfig,
    /// Periodic uplink
    pub uplink: UplinkConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

/// How the modem is attached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    /// Modem family ("rak4200" or "rak3172")
    pub family: Option<String>,
    /// Serial port path
    pub port: Option<String>,
    /// Baud rate
    pub baud: Option<u32>,
    /// Optional serial port receiving a copy of diagnostic lines
    pub debug_port: Option<String>,
    /// Baud rate for the debug port (defaults to `baud`)
    pub debug_baud: Option<u32>,
}

/// Timing and retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// How long each attempt listens for its response, in milliseconds
    pub listen_window_ms: u64,
    /// Pause before re-sending after a miss, in milliseconds
    pub retry_delay_ms: u64,
    /// Settle time after join/send commands (RX1 delay), in milliseconds
    pub rx_delay_ms: u64,
    /// Interval between serial reads while listening, in milliseconds
    pub poll_interval_ms: u64,
    /// Attempts for a network join
    pub join_attempts: u32,
    /// Attempts per uplink
    pub send_attempts: u32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            listen_window_ms: 5000,
            retry_delay_ms: 6000,
            rx_delay_ms: 4500,
            poll_interval_ms: 50,
            join_attempts: 8,
            send_attempts: 1,
        }
    }
}

impl BehaviorConfig {
    pub fn policies(&self) -> ModemResult<PolicySet> {
        PolicySet::from_timing(
            Duration::from_millis(self.listen_window_ms),
            Duration::from_millis(self.retry_delay_ms),
            Duration::from_millis(self.rx_delay_ms),
            Duration::from_millis(self.poll_interval_ms),
            self.join_attempts,
            self.send_attempts,
        )
    }
}

/// Periodic uplink after a successful join.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UplinkConfig {
    /// Data rate to set before joining
    pub data_rate: Option<u8>,
    /// Query modem status before joining
    pub query_status: bool,
    /// Application port
    pub port: u8,
    /// Hex-encoded payload; no uplinks are sent when unset
    pub payload: Option<String>,
    /// Seconds between uplinks
    pub interval_secs: u64,
    /// Number of uplinks to send, 0 for no limit
    pub count: u32,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            data_rate: None,
            query_status: true,
            port: 1,
            payload: None,
            interval_secs: 300,
            count: 0,
        }
    }
}

impl NodeConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        validate_log_level(self.general.log_level.as_deref())?;
        validate_modem(&self.modem)?;
        validate_behavior(&self.behavior)?;
        validate_uplink(&self.uplink)?;
        Ok(())
    }

    /// Generate an example configuration as a combined `lora-at.toml`.
    pub fn example_combined_toml() -> String {
        #[derive(serde::Serialize)]
        struct Wrapper {
            #[serde(rename = "lora-node")]
            inner: NodeConfig,
        }
        let example = NodeConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            modem: ModemConfig {
                family: Some("rak4200".to_string()),
                port: Some("/dev/ttyUSB0".to_string()),
                baud: Some(115_200),
                debug_port: None,
                debug_baud: None,
            },
            credentials: OtaaCredentials {
                dev_eui: Some("AC1F09FFFE000001".to_string()),
                app_eui: Some("70B3D57ED0000001".to_string()),
                app_key: Some("00112233445566778899AABBCCDDEEFF".to_string()),
                region: Some(ParamValue::text("EU868")),
                class: Some(ParamValue::text("A")),
            },
            behavior: BehaviorConfig::default(),
            uplink: UplinkConfig {
                data_rate: Some(3),
                payload: Some("AABBCCDD".to_string()),
                ..UplinkConfig::default()
            },
        };
        toml::to_string_pretty(&Wrapper { inner: example }).unwrap_or_default()
    }
}

fn validate_log_level(level: Option<&str>) -> Result<(), String> {
    if let Some(level) = level {
        match level {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(format!(
                    "[general].log_level '{}' is invalid (expected one of: trace, debug, info, warn, error)",
                    level
                ))
            }
        }
    }
    Ok(())
}

fn validate_modem(modem: &ModemConfig) -> Result<(), String> {
    if let Some(family) = modem.family.as_deref() {
        family
            .parse::<DeviceFamily>()
            .map_err(|_| format!("[modem].family '{}' is invalid (expected rak4200 or rak3172)", family))?;
    }
    if modem.port.as_deref().is_some_and(|p| p.trim().is_empty()) {
        return Err("[modem].port must not be empty".to_string());
    }
    if modem.baud == Some(0) {
        return Err("[modem].baud must be > 0".to_string());
    }
    if modem.debug_port.as_deref().is_some_and(|p| p.trim().is_empty()) {
        return Err("[modem].debug_port must not be empty".to_string());
    }
    if modem.debug_baud == Some(0) {
        return Err("[modem].debug_baud must be > 0".to_string());
    }
    Ok(())
}

fn validate_behavior(behavior: &BehaviorConfig) -> Result<(), String> {
    if behavior.listen_window_ms == 0 {
        return Err("[behavior].listen_window_ms must be > 0".to_string());
    }
    if behavior.poll_interval_ms == 0 {
        return Err("[behavior].poll_interval_ms must be > 0".to_string());
    }
    if behavior.join_attempts == 0 {
        return Err("[behavior].join_attempts must be > 0".to_string());
    }
    if behavior.send_attempts == 0 {
        return Err("[behavior].send_attempts must be > 0".to_string());
    }
    Ok(())
}

fn validate_uplink(uplink: &UplinkConfig) -> Result<(), String> {
    if uplink.data_rate.is_some_and(|dr| dr > MAX_DATA_RATE) {
        return Err(format!("[uplink].data_rate must be in range 0..={}", MAX_DATA_RATE));
    }
    if !(MIN_PORT..=MAX_PORT).contains(&uplink.port) {
        return Err(format!(
            "[uplink].port must be in range {}..={}",
            MIN_PORT, MAX_PORT
        ));
    }
    if uplink.interval_secs == 0 {
        return Err("[uplink].interval_secs must be > 0".to_string());
    }
    if uplink.payload.as_deref().is_some_and(|p| !is_hex_payload(p)) {
        return Err("[uplink].payload must be a non-empty hex string".to_string());
    }
    Ok(())
}

impl ConfigFile for NodeConfig {
    fn section_key() -> &'static str {
        "lora-node"
    }
}
