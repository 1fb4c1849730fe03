// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! RAK4200-class dialect.
//!
//! Every setting goes through one grammar,
//! `at+set_config=lora:<key>:<value>`, answered with `OK`.

use super::{region_name, JoinMode, Operation, ParamValue, RenderedCommand};
use crate::dialect::DeviceFamily;
use crate::error::{ModemError, ModemResult};

const FAMILY: DeviceFamily = DeviceFamily::Rak4200;
const SET_CONFIG: &str = "at+set_config=lora";
const OK: &str = "OK";

/// Region names accepted by the firmware.
pub(super) const REGIONS: [&str; 9] = [
    "EU433", "CN470", "RU864", "IN865", "EU868", "US915", "AU915", "KR920", "AS923",
];

pub(super) fn render(operation: &Operation) -> ModemResult<RenderedCommand> {
    let rendered = match operation {
        Operation::SetJoinMode(mode) => {
            let code = match mode {
                JoinMode::Otaa => 0,
                JoinMode::Abp => 1,
            };
            set_config("join_mode", code)
        }
        Operation::SetDeviceClass(class) => set_config("class", class_code(class)?),
        Operation::SetRegion(region) => set_config("region", region_code(region)?),
        Operation::SetDeviceIdentity(eui) => set_config("dev_eui", eui),
        Operation::SetNetworkIdentity(eui) => set_config("app_eui", eui),
        Operation::SetNetworkKey(key) => set_config("app_key", key),
        Operation::SetDataRate(dr) => set_config("dr", dr),
        Operation::Join => RenderedCommand::new("at+join".to_string(), "OK Join Success"),
        Operation::SendPayload { data, port } => {
            RenderedCommand::new(format!("at+send=lora:{}:{}", port, data), OK)
        }
        Operation::GetStatus => RenderedCommand::new(
            "at+get_config=lora:status".to_string(),
            "DownLinkCounter",
        ),
    };
    Ok(rendered)
}

fn set_config(key: &str, value: impl std::fmt::Display) -> RenderedCommand {
    RenderedCommand::new(format!("{}:{}:{}", SET_CONFIG, key, value), OK)
}

/// Class is sent as a small integer; class B is not offered by this firmware.
fn class_code(class: &ParamValue) -> ModemResult<u8> {
    match class {
        ParamValue::Text(letter) => match letter.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(0),
            "C" => Ok(2),
            other => Err(ModemError::unsupported(
                FAMILY,
                format!("class '{}' not in catalog (A, C)", other),
            )),
        },
        ParamValue::Number(0) => Ok(0),
        ParamValue::Number(2) => Ok(2),
        ParamValue::Number(n) => Err(ModemError::unsupported(
            FAMILY,
            format!("class {} not in catalog (0, 2)", n),
        )),
    }
}

fn region_code(region: &ParamValue) -> ModemResult<String> {
    let name = region_name(FAMILY, region)?;
    if REGIONS.contains(&name.as_str()) {
        Ok(name)
    } else {
        Err(ModemError::unsupported(
            FAMILY,
            format!("region '{}' not in catalog", name),
        ))
    }
}
