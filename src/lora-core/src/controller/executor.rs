// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Command executor: sends a rendered command and listens for its success
//! fragment under a retry policy.

use std::fmt;

use tokio::time::{sleep, Instant};
use tracing::warn;

use crate::diagnostics::Diagnostics;
use crate::dialect::RenderedCommand;
use crate::error::ModemResult;
use crate::transport::ModemTransport;

use super::policies::RetryPolicy;

const LINE_TERMINATOR: &str = "\r\n";

/// Result of executing one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The success fragment was seen on attempt `attempts`.
    Success { response: String, attempts: u32 },
    /// Every attempt missed; `last_response` is what the final attempt heard.
    Failure {
        last_response: String,
        attempts: u32,
    },
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Text accumulated by the deciding attempt.
    pub fn response(&self) -> &str {
        match self {
            Self::Success { response, .. } => response,
            Self::Failure { last_response, .. } => last_response,
        }
    }

    /// Number of times the command was written.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } | Self::Failure { attempts, .. } => *attempts,
        }
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { attempts, .. } => write!(f, "success after {} attempt(s)", attempts),
            Self::Failure { attempts, .. } => write!(f, "failed after {} attempt(s)", attempts),
        }
    }
}

/// What one listen phase produced.
enum Heard {
    Matched(String),
    Missed(String),
}

/// Executor bound to one transport. Only one command is in flight at a time
/// because `execute` holds the transport mutably until it returns.
pub struct CommandExecutor<'a> {
    transport: &'a mut dyn ModemTransport,
    diagnostics: Diagnostics,
}

impl<'a> CommandExecutor<'a> {
    pub fn new(transport: &'a mut dyn ModemTransport) -> Self {
        Self {
            transport,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_diagnostics(transport: &'a mut dyn ModemTransport, diagnostics: Diagnostics) -> Self {
        Self {
            transport,
            diagnostics,
        }
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Run `rendered` until its fragment is heard or the policy's attempts
    /// are used up.
    ///
    /// Only transport I/O failures are errors; a miss is a
    /// [`CommandOutcome::Failure`].
    pub async fn execute(
        &mut self,
        rendered: &RenderedCommand,
        policy: &RetryPolicy,
    ) -> ModemResult<CommandOutcome> {
        self.diagnostics.log(format_args!(
            "Command: {}, wanted response: {}, attempts: {}",
            rendered.command(),
            rendered.expect(),
            policy.attempts()
        ));

        let mut last_response = String::new();
        for attempt in 1..=policy.attempts() {
            self.send(rendered, policy).await?;
            match self.listen(rendered.expect(), policy).await? {
                Heard::Matched(response) => {
                    self.diagnostics.log(format_args!(
                        "Command: {} attempt {}/{} response: {:?}, found: true",
                        rendered.command(),
                        attempt,
                        policy.attempts(),
                        response
                    ));
                    return Ok(CommandOutcome::Success {
                        response,
                        attempts: attempt,
                    });
                }
                Heard::Missed(response) => {
                    self.diagnostics.log(format_args!(
                        "Command: {} attempt {}/{} response: {:?}, found: false",
                        rendered.command(),
                        attempt,
                        policy.attempts(),
                        response
                    ));
                    last_response = response;
                }
            }
            if attempt < policy.attempts() {
                self.diagnostics.log(format_args!(
                    "Retrying in {:?}",
                    policy.inter_attempt_delay()
                ));
                sleep(policy.inter_attempt_delay()).await;
            }
        }

        warn!(
            "'{}' did not answer '{}' after {} attempt(s)",
            rendered.command(),
            rendered.expect(),
            policy.attempts()
        );
        Ok(CommandOutcome::Failure {
            last_response,
            attempts: policy.attempts(),
        })
    }

    async fn send(&mut self, rendered: &RenderedCommand, policy: &RetryPolicy) -> ModemResult<()> {
        let mut line = String::with_capacity(rendered.command().len() + LINE_TERMINATOR.len());
        line.push_str(rendered.command());
        line.push_str(LINE_TERMINATOR);
        self.transport.write_all(line.as_bytes()).await?;
        if !policy.post_write_delay().is_zero() {
            sleep(policy.post_write_delay()).await;
        }
        Ok(())
    }

    /// Poll the transport until `expect` shows up or the listen window ends.
    async fn listen(&mut self, expect: &str, policy: &RetryPolicy) -> ModemResult<Heard> {
        let deadline = Instant::now() + policy.listen_window();
        let mut raw = Vec::new();
        loop {
            self.drain(&mut raw, deadline).await?;
            match decode_response(&raw) {
                Ok(text) if text.contains(expect) => return Ok(Heard::Matched(text.to_string())),
                Ok(text) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(Heard::Missed(text.to_string()));
                    }
                    sleep(policy.poll_interval().min(deadline - now)).await;
                }
                Err(placeholder) => {
                    self.diagnostics.log(&placeholder);
                    return Ok(Heard::Missed(placeholder));
                }
            }
        }
    }

    /// Append everything the transport currently holds to `raw`. A link
    /// that keeps streaming is cut off at `deadline`.
    async fn drain(&mut self, raw: &mut Vec<u8>, deadline: Instant) -> ModemResult<()> {
        while Instant::now() < deadline && self.transport.bytes_available()? > 0 {
            let chunk = self.transport.read_available().await?;
            if chunk.is_empty() {
                break;
            }
            raw.extend_from_slice(&chunk);
        }
        Ok(())
    }
}

/// Decode accumulated bytes as UTF-8.
///
/// A sequence cut off at the end of the buffer is left for the next drain.
/// Invalid bytes turn the whole attempt into a placeholder naming them.
fn decode_response(raw: &[u8]) -> Result<&str, String> {
    match std::str::from_utf8(raw) {
        Ok(text) => Ok(text),
        Err(e) if e.error_len().is_none() => {
            Ok(std::str::from_utf8(&raw[..e.valid_up_to()]).unwrap_or_default())
        }
        Err(e) => Err(format!(
            "invalid UTF-8 in modem response ({}), the response was: {:?}",
            e, raw
        )),
    }
}
