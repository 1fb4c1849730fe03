// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Dialect table: translation of logical modem operations into the AT
//! command text of a specific device family.
//!
//! Rendering is a pure function of `(family, operation)`. Every parameter
//! check happens here, so a rendered command is always safe to put on the
//! wire and an invalid one never reaches the transport.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModemError, ModemResult};

mod rak3172;
mod rak4200;

/// Highest LoRaWAN data rate index accepted by either family.
pub const MAX_DATA_RATE: u8 = 15;

/// Valid application port range for uplinks.
pub const MIN_PORT: u8 = 1;
pub const MAX_PORT: u8 = 223;

/// Supported modem families. Selected once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFamily {
    /// RAK4200-class modules (`at+set_config=lora:<key>:<value>` grammar).
    Rak4200,
    /// RAK3172-class modules (RUI3 `AT+<VERB>=<value>` set).
    Rak3172,
}

impl DeviceFamily {
    pub const ALL: [DeviceFamily; 2] = [DeviceFamily::Rak4200, DeviceFamily::Rak3172];

    /// Stable lowercase name, as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rak4200 => "rak4200",
            Self::Rak3172 => "rak3172",
        }
    }

    /// Render `operation` in this family's dialect.
    pub fn render(&self, operation: &Operation) -> ModemResult<RenderedCommand> {
        render(*self, operation)
    }

    /// Number of sub-commands issued by an OTAA configuration sequence.
    pub fn configure_steps(&self) -> usize {
        match self {
            Self::Rak4200 => 6,
            Self::Rak3172 => 4,
        }
    }

    /// Whether the dialect can answer a status query.
    pub fn supports_status(&self) -> bool {
        matches!(self, Self::Rak4200)
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rak4200 => write!(f, "RAK4200"),
            Self::Rak3172 => write!(f, "RAK3172"),
        }
    }
}

impl FromStr for DeviceFamily {
    type Err = ModemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        DeviceFamily::ALL
            .into_iter()
            .find(|family| family.name() == key)
            .ok_or_else(|| ModemError::InvalidDeviceFamily(s.to_string()))
    }
}

/// Network activation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinMode {
    #[default]
    Otaa,
    Abp,
}

/// A configuration value that may be written as text or as a number.
///
/// Families disagree on which form they expect for class and region, so the
/// caller's choice is kept until rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(i64),
    Text(String),
}

impl ParamValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Text(_) => "string",
        }
    }

    pub(crate) fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// Logical, dialect-independent modem operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    SetJoinMode(JoinMode),
    SetDeviceClass(ParamValue),
    SetRegion(ParamValue),
    /// Device EUI.
    SetDeviceIdentity(String),
    /// Application (join) EUI.
    SetNetworkIdentity(String),
    /// Application key.
    SetNetworkKey(String),
    SetDataRate(u8),
    Join,
    /// Hex-encoded payload sent on an application port.
    SendPayload { data: String, port: u8 },
    GetStatus,
}

impl Operation {
    /// Short name used in logs and configuration reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetJoinMode(_) => "join_mode",
            Self::SetDeviceClass(_) => "class",
            Self::SetRegion(_) => "region",
            Self::SetDeviceIdentity(_) => "dev_eui",
            Self::SetNetworkIdentity(_) => "app_eui",
            Self::SetNetworkKey(_) => "app_key",
            Self::SetDataRate(_) => "data_rate",
            Self::Join => "join",
            Self::SendPayload { .. } => "send",
            Self::GetStatus => "status",
        }
    }
}

/// A command ready for the wire together with the text that marks success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCommand {
    command: String,
    expect: &'static str,
}

impl RenderedCommand {
    fn new(command: String, expect: &'static str) -> Self {
        debug_assert!(!expect.is_empty());
        Self { command, expect }
    }

    /// Command text without line terminator.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Fragment whose presence in the response stream means success.
    pub fn expect(&self) -> &'static str {
        self.expect
    }
}

/// Translate `operation` into `family`'s command text.
pub fn render(family: DeviceFamily, operation: &Operation) -> ModemResult<RenderedCommand> {
    check_common(family, operation)?;
    match family {
        DeviceFamily::Rak4200 => rak4200::render(operation),
        DeviceFamily::Rak3172 => rak3172::render(operation),
    }
}

/// Checks shared by both dialects.
fn check_common(family: DeviceFamily, operation: &Operation) -> ModemResult<()> {
    match operation {
        Operation::SetDeviceIdentity(v)
        | Operation::SetNetworkIdentity(v)
        | Operation::SetNetworkKey(v)
            if v.trim().is_empty() =>
        {
            Err(ModemError::IncompleteConfiguration {
                missing: vec![operation.name()],
            })
        }
        Operation::SetDeviceClass(v) | Operation::SetRegion(v) if v.is_blank() => {
            Err(ModemError::IncompleteConfiguration {
                missing: vec![operation.name()],
            })
        }
        Operation::SetDataRate(dr) if *dr > MAX_DATA_RATE => Err(ModemError::unsupported(
            family,
            format!("data rate {} out of range 0..={}", dr, MAX_DATA_RATE),
        )),
        Operation::SendPayload { data, .. } if data.is_empty() => {
            Err(ModemError::IncompleteConfiguration {
                missing: vec!["payload"],
            })
        }
        Operation::SendPayload { port, .. } if !(MIN_PORT..=MAX_PORT).contains(port) => {
            Err(ModemError::unsupported(
                family,
                format!("port {} out of range {}..={}", port, MIN_PORT, MAX_PORT),
            ))
        }
        Operation::SendPayload { data, .. } if !is_hex_payload(data) => Err(
            ModemError::unsupported(family, format!("payload '{}' is not a hex string", data)),
        ),
        _ => Ok(()),
    }
}

/// Whether `data` is a non-empty hex string with whole bytes.
pub fn is_hex_payload(data: &str) -> bool {
    !data.is_empty() && hex::decode(data).is_ok()
}

/// Region values must be given as text in every dialect.
fn region_name(family: DeviceFamily, value: &ParamValue) -> ModemResult<String> {
    match value {
        ParamValue::Text(name) => Ok(name.trim().to_ascii_uppercase()),
        ParamValue::Number(_) => Err(ModemError::unsupported(
            family,
            format!("region must be a string, got {} {}", value.kind(), value),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_unsupported(result: ModemResult<RenderedCommand>) {
        match result {
            Err(ModemError::UnsupportedParameter { .. }) => {}
            other => panic!("expected UnsupportedParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_family_from_str() {
        assert_eq!("rak4200".parse::<DeviceFamily>().unwrap(), DeviceFamily::Rak4200);
        assert_eq!("RAK-3172".parse::<DeviceFamily>().unwrap(), DeviceFamily::Rak3172);
        assert!(matches!(
            "rak811".parse::<DeviceFamily>(),
            Err(ModemError::InvalidDeviceFamily(_))
        ));
    }

    #[test]
    fn test_render_is_deterministic() {
        let ops = [
            Operation::SetJoinMode(JoinMode::Otaa),
            Operation::SetDeviceClass("A".into()),
            Operation::SetRegion("EU868".into()),
            Operation::SetDeviceIdentity("0011223344556677".into()),
            Operation::SetDataRate(3),
            Operation::Join,
            Operation::SendPayload {
                data: "AABBCCDD".into(),
                port: 1,
            },
        ];
        for family in DeviceFamily::ALL {
            for op in &ops {
                assert_eq!(render(family, op).unwrap(), render(family, op).unwrap());
            }
        }
    }

    #[test]
    fn test_success_fragment_never_empty() {
        let ops = [
            Operation::SetJoinMode(JoinMode::Otaa),
            Operation::SetJoinMode(JoinMode::Abp),
            Operation::SetDeviceClass("A".into()),
            Operation::SetRegion("EU868".into()),
            Operation::SetDeviceIdentity("0011223344556677".into()),
            Operation::SetNetworkIdentity("8899AABBCCDDEEFF".into()),
            Operation::SetNetworkKey("00112233445566778899AABBCCDDEEFF".into()),
            Operation::SetDataRate(0),
            Operation::Join,
            Operation::SendPayload {
                data: "00".into(),
                port: 2,
            },
            Operation::GetStatus,
        ];
        let mut rendered = 0;
        for family in DeviceFamily::ALL {
            for op in &ops {
                match render(family, op) {
                    Ok(cmd) => {
                        assert!(!cmd.expect().is_empty(), "{} {}", family, op.name());
                        assert!(!cmd.command().is_empty(), "{} {}", family, op.name());
                        rendered += 1;
                    }
                    Err(e) => assert!(e.is_validation(), "{} {}: {}", family, op.name(), e),
                }
            }
        }
        // 11 on RAK4200, 8 on RAK3172
        assert_eq!(rendered, 19);
    }

    #[test]
    fn test_status_unsupported_on_rak3172() {
        assert_unsupported(render(DeviceFamily::Rak3172, &Operation::GetStatus));
        assert!(render(DeviceFamily::Rak4200, &Operation::GetStatus).is_ok());
        for family in DeviceFamily::ALL {
            assert_eq!(
                family.supports_status(),
                render(family, &Operation::GetStatus).is_ok()
            );
        }
    }

    #[test]
    fn test_is_hex_payload() {
        assert!(is_hex_payload("AABBCCDD"));
        assert!(is_hex_payload("0a0B"));
        assert!(!is_hex_payload(""));
        assert!(!is_hex_payload("ABC"));
        assert!(!is_hex_payload("GG"));
    }

    #[test]
    fn test_numeric_region_is_type_mismatch() {
        for family in DeviceFamily::ALL {
            assert_unsupported(render(family, &Operation::SetRegion(ParamValue::Number(4))));
        }
    }

    #[test]
    fn test_data_rate_range() {
        for family in DeviceFamily::ALL {
            assert!(render(family, &Operation::SetDataRate(15)).is_ok());
            assert_unsupported(render(family, &Operation::SetDataRate(16)));
        }
    }

    #[test]
    fn test_payload_checks() {
        let family = DeviceFamily::Rak4200;
        let send = |data: &str, port| Operation::SendPayload {
            data: data.to_string(),
            port,
        };
        assert!(matches!(
            render(family, &send("", 1)),
            Err(ModemError::IncompleteConfiguration { ref missing }) if missing == &["payload"]
        ));
        assert_unsupported(render(family, &send("ABC", 1)));
        assert_unsupported(render(family, &send("ZZ", 1)));
        assert_unsupported(render(family, &send("AA", 0)));
        assert_unsupported(render(family, &send("AA", 224)));
        assert!(render(family, &send("aabb", 223)).is_ok());
    }

    #[test]
    fn test_blank_identity_is_missing_field() {
        let result = render(
            DeviceFamily::Rak3172,
            &Operation::SetDeviceIdentity("  ".into()),
        );
        assert!(matches!(
            result,
            Err(ModemError::IncompleteConfiguration { ref missing }) if missing == &["dev_eui"]
        ));
    }

    #[test]
    fn test_param_value_from_toml() {
        #[derive(Deserialize)]
        struct Sample {
            a: ParamValue,
            b: ParamValue,
        }
        let sample: Sample = toml::from_str("a = \"EU868\"\nb = 0\n").unwrap();
        assert_eq!(sample.a, ParamValue::text("EU868"));
        assert_eq!(sample.b, ParamValue::Number(0));
    }
}
