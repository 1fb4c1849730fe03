// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Retry and timing policies for command execution.
//!
//! A policy fixes how many times a command is sent, how long each attempt
//! listens for its success fragment, and the fixed pauses around it. There
//! is no backoff: the delay between attempts is constant.

use std::time::Duration;

use crate::error::{ModemError, ModemResult};

/// Default time to accumulate a response per attempt.
pub const DEFAULT_LISTEN_WINDOW: Duration = Duration::from_secs(5);
/// Default pause before re-sending after a miss.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(6);
/// Default settle time for commands that go over the air (RX1 delay).
pub const DEFAULT_RX_DELAY: Duration = Duration::from_millis(4500);
/// Default interval between transport drains while listening.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Default attempts for a network join.
pub const DEFAULT_JOIN_ATTEMPTS: u32 = 8;

/// Timing and attempt budget for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    listen_window: Duration,
    inter_attempt_delay: Duration,
    post_write_delay: Duration,
    poll_interval: Duration,
}

impl RetryPolicy {
    /// Create a policy. `attempts` must be at least 1.
    pub fn new(
        attempts: u32,
        listen_window: Duration,
        inter_attempt_delay: Duration,
        post_write_delay: Duration,
    ) -> ModemResult<Self> {
        check_attempts(attempts)?;
        Ok(Self {
            attempts,
            listen_window,
            inter_attempt_delay,
            post_write_delay,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Local configuration commands: one attempt, no settle time.
    pub fn config() -> Self {
        Self {
            attempts: 1,
            listen_window: DEFAULT_LISTEN_WINDOW,
            inter_attempt_delay: DEFAULT_RETRY_DELAY,
            post_write_delay: Duration::ZERO,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Network join: several attempts, each after the RX1 delay.
    pub fn join() -> Self {
        Self {
            attempts: DEFAULT_JOIN_ATTEMPTS,
            post_write_delay: DEFAULT_RX_DELAY,
            ..Self::config()
        }
    }

    /// Uplink: one attempt by default, after the RX1 delay.
    pub fn send() -> Self {
        Self {
            post_write_delay: DEFAULT_RX_DELAY,
            ..Self::config()
        }
    }

    /// Status query: answered locally, one attempt.
    pub fn status() -> Self {
        Self::config()
    }

    /// Same policy with a different attempt budget.
    pub fn with_attempts(self, attempts: u32) -> ModemResult<Self> {
        check_attempts(attempts)?;
        Ok(Self { attempts, ..self })
    }

    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..self
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn listen_window(&self) -> Duration {
        self.listen_window
    }

    pub fn inter_attempt_delay(&self) -> Duration {
        self.inter_attempt_delay
    }

    pub fn post_write_delay(&self) -> Duration {
        self.post_write_delay
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Longest time a full execution under this policy can block.
    pub fn worst_case(&self) -> Duration {
        (self.post_write_delay + self.listen_window + self.inter_attempt_delay)
            .saturating_mul(self.attempts)
    }
}

fn check_attempts(attempts: u32) -> ModemResult<()> {
    if attempts == 0 {
        return Err(ModemError::InvalidRetryPolicy(
            "attempts must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Policies used by a session, one per kind of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicySet {
    pub config: RetryPolicy,
    pub join: RetryPolicy,
    pub send: RetryPolicy,
    pub status: RetryPolicy,
}

impl PolicySet {
    /// Build a set sharing one timing profile.
    ///
    /// Configuration and status commands keep their single attempt and
    /// zero settle time; `rx_delay` applies to join and send only.
    pub fn from_timing(
        listen_window: Duration,
        retry_delay: Duration,
        rx_delay: Duration,
        poll_interval: Duration,
        join_attempts: u32,
        send_attempts: u32,
    ) -> ModemResult<Self> {
        let local = RetryPolicy::new(1, listen_window, retry_delay, Duration::ZERO)?
            .with_poll_interval(poll_interval);
        let air = RetryPolicy::new(1, listen_window, retry_delay, rx_delay)?
            .with_poll_interval(poll_interval);
        Ok(Self {
            config: local,
            join: air.with_attempts(join_attempts)?,
            send: air.with_attempts(send_attempts)?,
            status: local,
        })
    }
}

impl Default for PolicySet {
    fn default() -> Self {
        Self {
            config: RetryPolicy::config(),
            join: RetryPolicy::join(),
            send: RetryPolicy::send(),
            status: RetryPolicy::status(),
        }
    }
}
