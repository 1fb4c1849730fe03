// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Serial transport for AT modems.

use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::debug;

use lora_at_core::transport::{ModemTransport, TransportFuture};

use crate::DynResult;

/// Modem attached to a local serial port.
pub struct SerialTransport {
    port: SerialStream,
}

impl SerialTransport {
    pub fn open(path: &str, baud: u32) -> DynResult<Self> {
        let port = tokio_serial::new(path, baud).open_native_async()?;
        // Drop boot banners and anything left over from a previous run.
        if let Err(e) = port.clear(ClearBuffer::Input) {
            debug!("Could not clear input buffer on {}: {}", path, e);
        }
        Ok(Self { port })
    }
}

impl ModemTransport for SerialTransport {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read_available<'a>(&'a mut self) -> TransportFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let available = self.port.bytes_to_read()? as usize;
            let mut buf = vec![0u8; available];
            if available > 0 {
                self.port.read_exact(&mut buf).await?;
            }
            Ok(buf)
        })
    }

    fn write_all<'a>(&'a mut self, bytes: &'a [u8]) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            self.port.write_all(bytes).await?;
            self.port.flush().await
        })
    }
}
