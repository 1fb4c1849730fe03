// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;
mod mirror;
mod serial;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use lora_at_app::{config_search_paths, init_logging, ConfigFile};
use lora_at_core::{DeviceFamily, Session};

use config::NodeConfig;
use mirror::SerialMirror;
use serial::SerialTransport;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - LoRaWAN AT modem node");
const JOIN_FAILED_HINT: &str = "Join failed: are your keys correct? Is there a gateway in range?";

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// Modem family (rak4200, rak3172)
    #[arg(short = 'f', long = "family")]
    family: Option<String>,
    /// Modem serial address: <path> <baud>
    #[arg(value_name = "MODEM_ADDR")]
    modem_addr: Option<String>,
    /// Hex payload to send after joining
    #[arg(long = "payload")]
    payload: Option<String>,
    /// Application port for uplinks
    #[arg(short = 'p', long = "port")]
    port: Option<u8>,
    /// Number of uplinks to send, 0 for no limit
    #[arg(short = 'n', long = "count")]
    count: Option<u32>,
}

/// Parse a serial modem address of the form "<path> <baud>".
fn parse_serial_addr(addr: &str) -> DynResult<(String, u32)> {
    let mut parts = addr.split_whitespace();
    let path = parts
        .next()
        .ok_or("Serial modem address must be '<path> <baud>'")?;
    let baud_str = parts
        .next()
        .ok_or("Serial modem address must be '<path> <baud>'")?;
    if parts.next().is_some() {
        return Err("Serial modem address must be '<path> <baud>' (got extra data)".into());
    }
    let baud: u32 = baud_str
        .parse()
        .map_err(|e| format!("Invalid baud '{}': {}", baud_str, e))?;
    Ok((path.to_string(), baud))
}

/// Resolved configuration after merging config file and CLI arguments.
#[derive(Debug)]
struct ResolvedConfig {
    family: DeviceFamily,
    path: String,
    baud: u32,
    payload: Option<String>,
    port: u8,
    count: u32,
}

fn resolve_config(cli: &Cli, cfg: &NodeConfig) -> DynResult<ResolvedConfig> {
    let family = match cli.family.as_deref().or(cfg.modem.family.as_deref()) {
        Some(name) => name.parse::<DeviceFamily>()?,
        None => {
            return Err(
                "Modem family not specified. Use --family or set [modem].family in config.".into(),
            )
        }
    };

    let (path, baud) = if let Some(ref addr) = cli.modem_addr {
        parse_serial_addr(addr)?
    } else if let (Some(port), Some(baud)) = (&cfg.modem.port, cfg.modem.baud) {
        (port.clone(), baud)
    } else {
        return Err("Serial access requires port and baud. Use '<path> <baud>' argument or set [modem].port and .baud in config.".into());
    };

    Ok(ResolvedConfig {
        family,
        path,
        baud,
        payload: cli.payload.clone().or_else(|| cfg.uplink.payload.clone()),
        port: cli.port.unwrap_or(cfg.uplink.port),
        count: cli.count.unwrap_or(cfg.uplink.count),
    })
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", NodeConfig::example_combined_toml());
        return Ok(());
    }

    let (cfg, config_path) = if let Some(ref path) = cli.config {
        let cfg = NodeConfig::load_from_file(path)?;
        (cfg, Some(path.clone()))
    } else {
        NodeConfig::load_from_default_paths()?
    };
    cfg.validate()
        .map_err(|e| format!("Invalid node configuration: {}", e))?;

    init_logging(cfg.general.log_level.as_deref());

    match config_path {
        Some(ref path) => info!("Loaded configuration from {}", path.display()),
        None => info!(
            "No configuration file found (searched {:?}), using defaults",
            config_search_paths()
        ),
    }

    let resolved = resolve_config(&cli, &cfg)?;
    let policies = cfg.behavior.policies()?;

    info!(
        "Starting lora-at-node (modem: {}, serial {} @ {} baud)",
        resolved.family, resolved.path, resolved.baud
    );

    let mut transport = SerialTransport::open(&resolved.path, resolved.baud)?;
    let mut session = Session::new(resolved.family, &mut transport).with_policies(policies);

    if let Some(ref debug_port) = cfg.modem.debug_port {
        let debug_baud = cfg.modem.debug_baud.unwrap_or(resolved.baud);
        match SerialMirror::open(debug_port, debug_baud) {
            Ok(mirror) => {
                info!("Mirroring diagnostics to {} @ {} baud", debug_port, debug_baud);
                session = session.with_diagnostics(Box::new(mirror));
            }
            Err(e) => warn!("Debug mirror on {} disabled: {}", debug_port, e),
        }
    }

    let report = session.configure(&cfg.credentials).await?;
    for step in &report.steps {
        if step.outcome.is_success() {
            info!("{}: {} ({})", step.operation, step.command, step.outcome);
        } else {
            warn!("{}: {} ({})", step.operation, step.command, step.outcome);
        }
    }

    if let Some(data_rate) = cfg.uplink.data_rate {
        let outcome = session.set_data_rate(data_rate).await?;
        info!("Data rate {}: {}", data_rate, outcome);
    }

    if cfg.uplink.query_status {
        if resolved.family.supports_status() {
            let outcome = session.status().await?;
            info!("Status {}: {:?}", outcome, outcome.response().trim());
        } else {
            info!("Status query skipped: not available on {}", resolved.family);
        }
    }

    let state = session.join().await?;
    if !state.is_joined() {
        error!("{}", JOIN_FAILED_HINT);
        return Err(JOIN_FAILED_HINT.into());
    }
    info!("Joined network ({})", state);

    let Some(payload) = resolved.payload else {
        info!("No uplink payload configured, exiting");
        return Ok(());
    };
    let interval = Duration::from_secs(cfg.uplink.interval_secs);

    let mut sent: u32 = 0;
    loop {
        let outcome = session.send_payload(&payload, resolved.port).await?;
        sent += 1;
        if outcome.is_success() {
            info!("Uplink {} on port {}: {}", sent, resolved.port, outcome);
        } else {
            warn!("Uplink {} on port {}: {}", sent, resolved.port, outcome);
        }
        if resolved.count != 0 && sent >= resolved.count {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = signal::ctrl_c() => {
                result?;
                info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }
    Ok(())
}
