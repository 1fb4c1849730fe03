// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use thiserror::Error;

use crate::dialect::DeviceFamily;

/// Errors raised by the modem core.
///
/// Everything except [`ModemError::Transport`] is detected before the
/// transport is touched. An exhausted retry budget is not an error; it is
/// reported as [`crate::CommandOutcome::Failure`].
#[derive(Debug, Error)]
pub enum ModemError {
    #[error("incomplete configuration, missing: {}", .missing.join(", "))]
    IncompleteConfiguration { missing: Vec<&'static str> },

    #[error("unsupported parameter for {family}: {detail}")]
    UnsupportedParameter {
        family: DeviceFamily,
        detail: String,
    },

    #[error("invalid device family '{0}' (expected rak4200 or rak3172)")]
    InvalidDeviceFamily(String),

    #[error("invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    #[error("session is not configured; call configure before join")]
    NotConfigured,

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl ModemError {
    pub(crate) fn unsupported(family: DeviceFamily, detail: impl Into<String>) -> Self {
        Self::UnsupportedParameter {
            family,
            detail: detail.into(),
        }
    }

    /// True for errors detected before any transport I/O.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }
}

pub type ModemResult<T> = Result<T, ModemError>;
