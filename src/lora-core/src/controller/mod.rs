// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Modem controller components.
//!
//! Command execution under retry policies, and the state machine that
//! tracks session bring-up.

pub mod executor;
pub mod machine;
pub mod policies;

pub use executor::{CommandExecutor, CommandOutcome};
pub use machine::{SessionEvent, SessionState, SessionStateMachine};
pub use policies::{PolicySet, RetryPolicy};
