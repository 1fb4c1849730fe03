// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::io::Write;

use tokio_serial::SerialPort;
use tracing::debug;

use lora_at_core::DiagnosticSink;

use crate::DynResult;

/// Copies diagnostic lines to a secondary serial port, e.g. a debug UART.
pub struct SerialMirror {
    port: Box<dyn SerialPort>,
}

impl SerialMirror {
    pub fn open(path: &str, baud: u32) -> DynResult<Self> {
        let port = tokio_serial::new(path, baud).open()?;
        Ok(Self { port })
    }
}

impl DiagnosticSink for SerialMirror {
    fn write_line(&mut self, line: &str) {
        let result = self
            .port
            .write_all(line.as_bytes())
            .and_then(|_| self.port.write_all(b"\r\n"));
        if let Err(e) = result {
            debug!("Debug mirror write failed: {}", e);
        }
    }
}
