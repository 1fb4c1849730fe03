// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Session controller: the bring-up sequence (configure, join) and uplinks
//! for one attached modem.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::controller::{
    CommandExecutor, CommandOutcome, PolicySet, RetryPolicy, SessionEvent, SessionState,
    SessionStateMachine,
};
use crate::diagnostics::{DiagnosticSink, Diagnostics};
use crate::dialect::{DeviceFamily, JoinMode, Operation, ParamValue, RenderedCommand};
use crate::error::{ModemError, ModemResult};
use crate::transport::ModemTransport;

/// OTAA credentials and radio settings handed to [`Session::configure`].
///
/// Values are only checked for presence and catalog membership; their
/// format is the modem's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtaaCredentials {
    /// Device EUI
    pub dev_eui: Option<String>,
    /// Application (join) EUI
    pub app_eui: Option<String>,
    /// Application key
    pub app_key: Option<String>,
    /// Region name, e.g. "EU868"
    pub region: Option<ParamValue>,
    /// Device class, "A"/"B"/"C" (or 0/2 on RAK4200)
    pub class: Option<ParamValue>,
}

impl OtaaCredentials {
    /// Names of every absent or blank field, in declaration order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let text = [
            ("dev_eui", &self.dev_eui),
            ("app_eui", &self.app_eui),
            ("app_key", &self.app_key),
        ];
        let params = [("region", &self.region), ("class", &self.class)];

        let mut missing: Vec<&'static str> = text
            .iter()
            .filter(|(_, v)| v.as_deref().map(str::trim).unwrap_or("").is_empty())
            .map(|(name, _)| *name)
            .collect();
        missing.extend(
            params
                .iter()
                .filter(|(_, v)| v.as_ref().map(ParamValue::is_blank).unwrap_or(true))
                .map(|(name, _)| *name),
        );
        missing
    }
}

/// One configuration sub-command and how it went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStep {
    pub operation: &'static str,
    pub command: String,
    pub outcome: CommandOutcome,
}

/// Ordered outcomes of every configuration sub-command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigureReport {
    pub steps: Vec<ConfigStep>,
}

impl ConfigureReport {
    pub fn all_succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.outcome.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ConfigStep> {
        self.steps.iter().filter(|s| !s.outcome.is_success())
    }

    fn succeeded(&self, names: &[&str]) -> bool {
        self.steps
            .iter()
            .filter(|s| names.contains(&s.operation))
            .all(|s| s.outcome.is_success())
    }
}

/// What the session has established on the modem so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionFlags {
    /// Device/network identity sub-commands all succeeded
    pub identity_set: bool,
    /// Join mode, class and region sub-commands all succeeded
    pub radio_set: bool,
    /// Last data rate acknowledged by the modem
    pub data_rate: Option<u8>,
    /// Last join succeeded
    pub joined: bool,
}

/// One session per attached modem. The transport is borrowed for the
/// session's lifetime, which keeps a single command in flight at a time.
pub struct Session<'a> {
    family: DeviceFamily,
    executor: CommandExecutor<'a>,
    policies: PolicySet,
    machine: SessionStateMachine,
    flags: SessionFlags,
}

impl<'a> Session<'a> {
    pub fn new(family: DeviceFamily, transport: &'a mut dyn ModemTransport) -> Self {
        Self {
            family,
            executor: CommandExecutor::new(transport),
            policies: PolicySet::default(),
            machine: SessionStateMachine::new(),
            flags: SessionFlags::default(),
        }
    }

    pub fn with_policies(mut self, policies: PolicySet) -> Self {
        self.policies = policies;
        self
    }

    /// Mirror diagnostics to `sink` in addition to `tracing`.
    pub fn with_diagnostics(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        *self.executor.diagnostics_mut() = Diagnostics::new(Some(sink));
        self
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    pub fn flags(&self) -> SessionFlags {
        self.flags
    }

    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    /// Write OTAA credentials and radio settings to the modem.
    ///
    /// Every field is checked, and every sub-command rendered, before the
    /// first write. All sub-commands are then attempted once each, in order,
    /// whatever their individual outcomes.
    pub async fn configure(&mut self, creds: &OtaaCredentials) -> ModemResult<ConfigureReport> {
        let missing = creds.missing_fields();
        if !missing.is_empty() {
            return Err(ModemError::IncompleteConfiguration { missing });
        }
        let plan = self.configure_plan(creds)?;

        self.transition(SessionEvent::ConfigureStarted);
        self.executor
            .diagnostics_mut()
            .log(format_args!("Configure {} modem:", self.family));

        let mut report = ConfigureReport::default();
        for (operation, rendered) in plan {
            let outcome = match self.executor.execute(&rendered, &self.policies.config).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.transition(SessionEvent::ConfigureAborted);
                    return Err(e);
                }
            };
            if !outcome.is_success() {
                warn!(
                    "{} configuration step '{}' failed: {:?}",
                    self.family,
                    operation.name(),
                    outcome.response()
                );
            }
            report.steps.push(ConfigStep {
                operation: operation.name(),
                command: rendered.command().to_string(),
                outcome,
            });
        }

        self.flags = SessionFlags {
            identity_set: report.succeeded(&["dev_eui", "app_eui", "app_key"]),
            radio_set: report.succeeded(&["join_mode", "class", "region"]),
            data_rate: None,
            joined: false,
        };
        self.transition(SessionEvent::ConfigureFinished);
        Ok(report)
    }

    /// Set the uplink data rate (0-15).
    pub async fn set_data_rate(&mut self, data_rate: u8) -> ModemResult<CommandOutcome> {
        let policy = self.policies.config;
        let outcome = self.run(&Operation::SetDataRate(data_rate), &policy).await?;
        if outcome.is_success() {
            self.flags.data_rate = Some(data_rate);
        }
        Ok(outcome)
    }

    /// Join the network. Returns the resulting state, `Joined` or
    /// `JoinFailed`; a failed join can be retried by calling this again.
    pub async fn join(&mut self) -> ModemResult<SessionState> {
        if !self.machine.state().is_configured() {
            return Err(ModemError::NotConfigured);
        }
        let rendered = self.family.render(&Operation::Join)?;

        self.transition(SessionEvent::JoinStarted);
        self.executor.diagnostics_mut().log("Join network:");
        let result = self.executor.execute(&rendered, &self.policies.join).await;

        let joined = matches!(result, Ok(ref outcome) if outcome.is_success());
        self.flags.joined = joined;
        self.transition(if joined {
            SessionEvent::JoinAccepted
        } else {
            SessionEvent::JoinRejected
        });
        result?;
        Ok(self.machine.state())
    }

    /// Send a hex payload on `port` with the session's send policy.
    ///
    /// Not gated on a successful join.
    pub async fn send_payload(&mut self, data: &str, port: u8) -> ModemResult<CommandOutcome> {
        let policy = self.policies.send;
        self.send(data, port, policy).await
    }

    /// Send a hex payload on `port`, overriding the attempt budget.
    pub async fn send_payload_with_attempts(
        &mut self,
        data: &str,
        port: u8,
        attempts: u32,
    ) -> ModemResult<CommandOutcome> {
        let policy = self.policies.send.with_attempts(attempts)?;
        self.send(data, port, policy).await
    }

    /// Query the modem status. Families without a status command return
    /// `UnsupportedParameter` without touching the transport.
    pub async fn status(&mut self) -> ModemResult<CommandOutcome> {
        let policy = self.policies.status;
        self.run(&Operation::GetStatus, &policy).await
    }

    async fn send(
        &mut self,
        data: &str,
        port: u8,
        policy: RetryPolicy,
    ) -> ModemResult<CommandOutcome> {
        let operation = Operation::SendPayload {
            data: data.to_string(),
            port,
        };
        self.run(&operation, &policy).await
    }

    async fn run(
        &mut self,
        operation: &Operation,
        policy: &RetryPolicy,
    ) -> ModemResult<CommandOutcome> {
        let rendered = self.family.render(operation)?;
        self.executor.execute(&rendered, policy).await
    }

    fn configure_plan(
        &self,
        creds: &OtaaCredentials,
    ) -> ModemResult<Vec<(Operation, RenderedCommand)>> {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        let param = |v: &Option<ParamValue>| v.clone().unwrap_or(ParamValue::Text(String::new()));

        let mut operations = vec![
            Operation::SetJoinMode(JoinMode::Otaa),
            Operation::SetDeviceClass(param(&creds.class)),
            Operation::SetRegion(param(&creds.region)),
            Operation::SetDeviceIdentity(text(&creds.dev_eui)),
        ];
        // RAK3172 keeps app EUI/key in its own provisioning
        if self.family == DeviceFamily::Rak4200 {
            operations.push(Operation::SetNetworkIdentity(text(&creds.app_eui)));
            operations.push(Operation::SetNetworkKey(text(&creds.app_key)));
        }
        debug_assert_eq!(operations.len(), self.family.configure_steps());

        operations
            .into_iter()
            .map(|op| self.family.render(&op).map(|rendered| (op, rendered)))
            .collect()
    }

    fn transition(&mut self, event: SessionEvent) {
        let from = self.machine.state();
        if self.machine.process_event(event) {
            info!("{} session: {} -> {}", self.family, from, self.machine.state());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::controller::policies::{DEFAULT_LISTEN_WINDOW, DEFAULT_RETRY_DELAY, DEFAULT_RX_DELAY};
    use crate::diagnostics::tests::MemorySink;
    use crate::transport::mock::ScriptedTransport;

    fn creds(region: &str, class: &str) -> OtaaCredentials {
        OtaaCredentials {
            dev_eui: Some("AC1F09FFFE000001".to_string()),
            app_eui: Some("70B3D57ED0000001".to_string()),
            app_key: Some("00112233445566778899AABBCCDDEEFF".to_string()),
            region: Some(region.into()),
            class: Some(class.into()),
        }
    }

    /// Modem answering OK to everything and `join_reply` to join commands.
    fn modem(join_reply: &'static str) -> ScriptedTransport {
        ScriptedTransport::new(move |line| {
            if line.to_ascii_lowercase().starts_with("at+join") {
                Some(join_reply.as_bytes().to_vec())
            } else {
                Some(b"OK\r\n".to_vec())
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_rak4200_configure_and_join() {
        let mut transport = modem("OK Join Success\r\n");
        {
            let mut session = Session::new(DeviceFamily::Rak4200, &mut transport);
            let report = session.configure(&creds("EU868", "A")).await.unwrap();
            assert_eq!(report.steps.len(), 6);
            assert!(report.all_succeeded());
            assert_eq!(session.state(), SessionState::Configured);
            assert!(session.flags().identity_set && session.flags().radio_set);

            assert_eq!(session.join().await.unwrap(), SessionState::Joined);
            assert!(session.flags().joined);
        }
        assert_eq!(
            transport.writes,
            vec![
                "at+set_config=lora:join_mode:0",
                "at+set_config=lora:class:0",
                "at+set_config=lora:region:EU868",
                "at+set_config=lora:dev_eui:AC1F09FFFE000001",
                "at+set_config=lora:app_eui:70B3D57ED0000001",
                "at+set_config=lora:app_key:00112233445566778899AABBCCDDEEFF",
                "at+join",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rak3172_join_on_third_attempt() {
        let mut joins = 0;
        let mut transport = ScriptedTransport::new(move |line| {
            if line.starts_with("AT+JOIN") {
                joins += 1;
                (joins == 3).then(|| b"+EVT:JOINED\r\n".to_vec())
            } else {
                Some(b"OK\r\n".to_vec())
            }
        });
        {
            let mut session = Session::new(DeviceFamily::Rak3172, &mut transport);
            let report = session.configure(&creds("EU868", "A")).await.unwrap();
            assert_eq!(report.steps.len(), 4);
            assert!(report.all_succeeded());
            assert_eq!(session.join().await.unwrap(), SessionState::Joined);
        }
        assert_eq!(
            &transport.writes[..4],
            ["AT+NJM=1", "AT+CLASS=A", "AT+BAND=4", "AT+DEVEUI=AC1F09FFFE000001"]
        );
        let join_writes = transport
            .writes
            .iter()
            .filter(|w| w.starts_with("AT+JOIN"))
            .count();
        assert_eq!(join_writes, 3);
    }

    #[tokio::test]
    async fn test_missing_fields_reported_together_without_io() {
        let mut transport = modem("OK Join Success");
        let mut partial = creds("EU868", "A");
        partial.app_key = None;
        partial.region = Some(ParamValue::text(" "));
        {
            let mut session = Session::new(DeviceFamily::Rak4200, &mut transport);
            match session.configure(&partial).await {
                Err(ModemError::IncompleteConfiguration { missing }) => {
                    assert_eq!(missing, vec!["app_key", "region"]);
                }
                other => panic!("unexpected result: {:?}", other),
            }
            assert_eq!(session.state(), SessionState::Unconfigured);
        }
        assert_eq!(transport.write_count(), 0);
    }

    #[tokio::test]
    async fn test_single_missing_field_named() {
        let mut transport = modem("OK Join Success");
        let mut partial = creds("EU868", "A");
        partial.dev_eui = None;
        let mut session = Session::new(DeviceFamily::Rak3172, &mut transport);
        let err = session.configure(&partial).await.unwrap_err();
        assert_eq!(err.to_string(), "incomplete configuration, missing: dev_eui");
    }

    #[tokio::test]
    async fn test_catalog_errors_surface_before_io() {
        let mut transport = modem("OK Join Success");
        {
            let mut session = Session::new(DeviceFamily::Rak4200, &mut transport);
            assert!(matches!(
                session.configure(&creds("EU868", "B")).await,
                Err(ModemError::UnsupportedParameter { .. })
            ));
            assert!(matches!(
                session.configure(&creds("AS923-1", "A")).await,
                Err(ModemError::UnsupportedParameter { .. })
            ));
            assert_eq!(session.state(), SessionState::Unconfigured);
        }
        assert_eq!(transport.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_steps_do_not_stop_configuration() {
        let mut transport = ScriptedTransport::new(|line| {
            if line.contains("region") {
                Some(b"ERROR: 5\r\n".to_vec())
            } else {
                Some(b"OK\r\n".to_vec())
            }
        });
        let mut session = Session::new(DeviceFamily::Rak4200, &mut transport);
        let report = session.configure(&creds("EU868", "C")).await.unwrap();

        assert_eq!(report.steps.len(), 6);
        assert!(!report.all_succeeded());
        let failed: Vec<_> = report.failed().map(|s| s.operation).collect();
        assert_eq!(failed, vec!["region"]);
        assert_eq!(report.steps[2].outcome.response(), "ERROR: 5\r\n");
        assert_eq!(session.state(), SessionState::Configured);
        assert!(session.flags().identity_set);
        assert!(!session.flags().radio_set);
    }

    #[tokio::test]
    async fn test_join_requires_configure() {
        let mut transport = modem("OK Join Success");
        {
            let mut session = Session::new(DeviceFamily::Rak4200, &mut transport);
            assert!(matches!(
                session.join().await,
                Err(ModemError::NotConfigured)
            ));
        }
        assert_eq!(transport.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_modem_join_fails_after_eight_attempts() {
        let mut transport = ScriptedTransport::silent();
        let elapsed = {
            let mut session = Session::new(DeviceFamily::Rak4200, &mut transport);
            let report = session.configure(&creds("EU868", "A")).await.unwrap();
            assert_eq!(report.failed().count(), 6);

            let started = Instant::now();
            assert_eq!(session.join().await.unwrap(), SessionState::JoinFailed);
            assert!(!session.flags().joined);
            started.elapsed()
        };
        assert_eq!(transport.write_count(), 6 + 8);

        let per_attempt = DEFAULT_RX_DELAY + DEFAULT_LISTEN_WINDOW;
        let expected = per_attempt * 8 + DEFAULT_RETRY_DELAY * 7;
        assert!(elapsed >= expected);
        assert!(elapsed <= expected + Duration::from_secs(1));
        assert!(elapsed <= RetryPolicy::join().worst_case());
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_retry_after_failure() {
        let mut joins = 0;
        let mut transport = ScriptedTransport::new(move |line| {
            if line == "at+join" {
                joins += 1;
                (joins > 1).then(|| b"OK Join Success".to_vec())
            } else {
                Some(b"OK".to_vec())
            }
        });
        let join_once = RetryPolicy::join().with_attempts(1).unwrap();
        let policies = PolicySet {
            join: join_once,
            ..PolicySet::default()
        };
        let mut session = Session::new(DeviceFamily::Rak4200, &mut transport).with_policies(policies);
        session.configure(&creds("EU868", "A")).await.unwrap();
        assert_eq!(session.join().await.unwrap(), SessionState::JoinFailed);
        assert_eq!(session.join().await.unwrap(), SessionState::Joined);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_payload_renders_port_and_data() {
        let mut transport = modem("OK Join Success");
        {
            let mut session = Session::new(DeviceFamily::Rak4200, &mut transport);
            // Sending is allowed before any join
            let outcome = session.send_payload("AABBCCDD", 1).await.unwrap();
            assert!(outcome.is_success());
            assert_eq!(session.state(), SessionState::Unconfigured);
        }
        assert_eq!(transport.writes, vec!["at+send=lora:1:AABBCCDD"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_attempt_override() {
        let mut transport = ScriptedTransport::silent();
        {
            let mut session = Session::new(DeviceFamily::Rak3172, &mut transport);
            let outcome = session
                .send_payload_with_attempts("0102", 2, 3)
                .await
                .unwrap();
            assert_eq!(outcome.attempts(), 3);
            assert!(!outcome.is_success());
            assert!(matches!(
                session.send_payload_with_attempts("0102", 2, 0).await,
                Err(ModemError::InvalidRetryPolicy(_))
            ));
        }
        assert_eq!(transport.writes, vec!["AT+SEND=2:0102"; 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status() {
        let mut transport = ScriptedTransport::echo("DownLinkCounter: 0\r\n");
        {
            let mut session = Session::new(DeviceFamily::Rak4200, &mut transport);
            assert!(session.status().await.unwrap().is_success());
        }
        assert_eq!(transport.writes, vec!["at+get_config=lora:status"]);

        let mut transport = ScriptedTransport::echo("OK");
        {
            let mut session = Session::new(DeviceFamily::Rak3172, &mut transport);
            assert!(matches!(
                session.status().await,
                Err(ModemError::UnsupportedParameter { .. })
            ));
        }
        assert_eq!(transport.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_data_rate_records_flag() {
        let mut transport = ScriptedTransport::echo("OK");
        let mut session = Session::new(DeviceFamily::Rak3172, &mut transport);
        assert!(session.set_data_rate(3).await.unwrap().is_success());
        assert_eq!(session.flags().data_rate, Some(3));
        assert!(session.set_data_rate(16).await.is_err());
        assert_eq!(session.flags().data_rate, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_diagnostics_mirror() {
        let sink = MemorySink::default();
        let mut transport = modem("OK Join Success");
        let mut session =
            Session::new(DeviceFamily::Rak4200, &mut transport).with_diagnostics(Box::new(sink.clone()));
        session.configure(&creds("EU868", "A")).await.unwrap();

        let lines = sink.0.lock().unwrap();
        assert!(lines[0].ends_with("Configure RAK4200 modem:"));
        assert_eq!(
            lines.iter().filter(|l| l.contains("found: true")).count(),
            6
        );
    }
}
