// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod controller;
pub mod diagnostics;
pub mod dialect;
pub mod error;
pub mod session;
pub mod transport;

pub use controller::{CommandExecutor, CommandOutcome, PolicySet, RetryPolicy, SessionState};
pub use diagnostics::{DiagnosticSink, Diagnostics};
pub use dialect::{DeviceFamily, JoinMode, Operation, ParamValue, RenderedCommand};
pub use error::{ModemError, ModemResult};
pub use session::{ConfigStep, ConfigureReport, OtaaCredentials, Session, SessionFlags};
pub use transport::ModemTransport;
