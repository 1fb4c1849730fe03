// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! RAK3172-class dialect (RUI3 AT command set).
//!
//! Each setting has its own verb. Network identity and key are expected to
//! be provisioned on the module already, and there is no status query.

use super::{region_name, JoinMode, Operation, ParamValue, RenderedCommand};
use crate::dialect::DeviceFamily;
use crate::error::{ModemError, ModemResult};

const FAMILY: DeviceFamily = DeviceFamily::Rak3172;
const OK: &str = "OK";

/// Join once per command (`join:auto-join:interval:attempts`); retries are
/// driven by the executor.
const JOIN_COMMAND: &str = "AT+JOIN=1:0:10:1";
const JOINED_EVENT: &str = "+EVT:JOINED";

/// Region names in `AT+BAND` index order.
pub(super) const BANDS: [&str; 13] = [
    "EU433", "CN470", "RU864", "IN865", "EU868", "US915", "AU915", "KR920", "AS923-1",
    "AS923-2", "AS923-3", "AS923-4", "LA915",
];

pub(super) fn render(operation: &Operation) -> ModemResult<RenderedCommand> {
    let rendered = match operation {
        Operation::SetJoinMode(mode) => {
            let code = match mode {
                JoinMode::Otaa => 1,
                JoinMode::Abp => 0,
            };
            verb("NJM", code)
        }
        Operation::SetDeviceClass(class) => verb("CLASS", class_letter(class)?),
        Operation::SetRegion(region) => verb("BAND", band_index(region)?),
        Operation::SetDeviceIdentity(eui) => verb("DEVEUI", eui),
        Operation::SetDataRate(dr) => verb("DR", dr),
        Operation::Join => RenderedCommand::new(JOIN_COMMAND.to_string(), JOINED_EVENT),
        Operation::SendPayload { data, port } => {
            RenderedCommand::new(format!("AT+SEND={}:{}", port, data), OK)
        }
        Operation::SetNetworkIdentity(_) | Operation::SetNetworkKey(_) => {
            return Err(ModemError::unsupported(
                FAMILY,
                format!("{} is provisioned on the module, not set over AT", operation.name()),
            ))
        }
        Operation::GetStatus => {
            return Err(ModemError::unsupported(FAMILY, "status query not supported"))
        }
    };
    Ok(rendered)
}

fn verb(name: &str, value: impl std::fmt::Display) -> RenderedCommand {
    RenderedCommand::new(format!("AT+{}={}", name, value), OK)
}

/// Class is sent as its letter; numeric classes are a caller error.
fn class_letter(class: &ParamValue) -> ModemResult<char> {
    match class {
        ParamValue::Text(letter) => match letter.trim().to_ascii_uppercase().as_str() {
            "A" => Ok('A'),
            "B" => Ok('B'),
            "C" => Ok('C'),
            other => Err(ModemError::unsupported(
                FAMILY,
                format!("class '{}' not in catalog (A, B, C)", other),
            )),
        },
        ParamValue::Number(_) => Err(ModemError::unsupported(
            FAMILY,
            format!("class must be a letter, got {} {}", class.kind(), class),
        )),
    }
}

fn band_index(region: &ParamValue) -> ModemResult<usize> {
    let name = region_name(FAMILY, region)?;
    BANDS
        .iter()
        .position(|band| *band == name)
        .ok_or_else(|| ModemError::unsupported(FAMILY, format!("region '{}' not in catalog", name)))
}
