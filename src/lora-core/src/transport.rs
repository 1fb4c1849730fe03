// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Byte-serial link to the modem.

use std::future::Future;
use std::io;
use std::pin::Pin;

/// Alias to reduce type complexity in `ModemTransport`.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = io::Result<T>> + Send + 'a>>;

/// Duplex byte channel to a modem.
///
/// Reads never wait for data: `read_available` returns only what the link
/// already holds. Writes complete once the bytes are handed to the link.
pub trait ModemTransport: Send {
    /// Number of bytes that can be read right now.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read the currently available bytes, possibly none.
    fn read_available<'a>(&'a mut self) -> TransportFuture<'a, Vec<u8>>;

    /// Write all of `bytes` to the link.
    fn write_all<'a>(&'a mut self, bytes: &'a [u8]) -> TransportFuture<'a, ()>;
}
