// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

/// Receiver for timestamped diagnostic lines (e.g. a debug UART).
pub trait DiagnosticSink: Send {
    fn write_line(&mut self, line: &str);
}

/// Diagnostic fan-out: every message goes to `tracing`, and to the attached
/// sink if there is one.
#[derive(Default)]
pub struct Diagnostics {
    sink: Option<Box<dyn DiagnosticSink>>,
}

impl Diagnostics {
    pub fn new(sink: Option<Box<dyn DiagnosticSink>>) -> Self {
        Self { sink }
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub fn log(&mut self, message: impl fmt::Display) {
        debug!("{}", message);
        if let Some(sink) = self.sink.as_mut() {
            sink.write_line(&format!("{} : {}", timestamp(), message));
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// Unix time as `<secs>.<millis>`.
fn timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:03}", now.as_secs(), now.subsec_millis())
}
