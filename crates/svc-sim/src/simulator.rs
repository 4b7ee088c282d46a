//! The simulated array and its command dispatcher.

use std::collections::HashMap;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::{debug, warn};

use crate::command::Command;
use crate::config::SimulatorConfig;
use crate::error::{Error, Result};
use crate::handlers::{self, Handler};
use crate::inject::{ErrorInjector, FaultTag};
use crate::log::CommandLog;
use crate::store::Store;
use crate::types::{
    ClusterRef, FcConsistGrp, FcMapping, Host, HostMapping, Partnership, Pool, RcConsistGrp,
    RcRelationship, Volume,
};

static HANDLERS: Lazy<HashMap<&'static str, Handler>> = Lazy::new(|| handlers::all().collect());

/// What a command printed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error; non-empty on failure.
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.stderr.is_empty()
    }

    /// The exit code a shell would report.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_success())
    }
}

/// An in-memory Storwize/SVC array.
///
/// Commands run one at a time through [`Simulator::execute_command`]. Time
/// only passes when a listing polls an object, so behavior is fully
/// deterministic.
#[derive(Debug)]
pub struct Simulator {
    pub(crate) config: SimulatorConfig,
    pub(crate) pools: Vec<Pool>,
    pub(crate) volumes: Store<Volume>,
    pub(crate) hosts: Store<Host>,
    pub(crate) mappings: Store<HostMapping>,
    pub(crate) fc_mappings: Store<FcMapping>,
    pub(crate) fc_groups: Store<FcConsistGrp>,
    pub(crate) rc_relationships: Store<RcRelationship>,
    pub(crate) rc_groups: Store<RcConsistGrp>,
    pub(crate) partnerships: IndexMap<String, Partnership>,
    injector: ErrorInjector,
    log: Option<CommandLog>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::build(SimulatorConfig::default())
    }
}

impl Simulator {
    /// Create a simulator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is inconsistent.
    pub fn new(config: SimulatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SimulatorConfig) -> Self {
        let pools = config
            .pools
            .iter()
            .enumerate()
            .map(|(id, p)| Pool {
                id: id as u32,
                name: p.name.clone(),
                site_id: p.site_id,
                capacity: p.capacity_bytes,
            })
            .collect();
        Self {
            config,
            pools,
            volumes: Store::new(),
            hosts: Store::new(),
            mappings: Store::new(),
            fc_mappings: Store::new(),
            fc_groups: Store::new(),
            rc_relationships: Store::new(),
            rc_groups: Store::new(),
            partnerships: IndexMap::new(),
            injector: ErrorInjector::new(),
            log: None,
        }
    }

    /// Record every executed command in `log`.
    #[must_use]
    pub fn with_command_log(mut self, log: CommandLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Arm a one-shot fault for the next execution of `verb`.
    pub fn error_injection(&mut self, verb: impl Into<String>, tag: FaultTag) {
        self.injector.arm(verb, tag);
    }

    /// Run one CLI command.
    ///
    /// Catalogued array failures come back as an [`CommandOutput`] with
    /// stderr set, unless `check_exit_code` is true, in which case they
    /// become [`Error::ProcessExecution`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unparseable argument list or
    /// an unknown verb, and [`Error::ProcessExecution`] as described above.
    pub fn execute_command<S: AsRef<str>>(
        &mut self,
        argv: &[S],
        check_exit_code: bool,
    ) -> Result<CommandOutput> {
        let cmd = Command::parse(argv)?;
        let handler = HANDLERS.get(cmd.verb()).copied().ok_or_else(|| {
            Error::invalid_input(format!("unrecognized command {}", cmd.verb()))
        })?;

        let fault = self.injector.consume(cmd.verb());
        if let Some(tag) = fault {
            warn!(verb = cmd.verb(), fault = %tag, "injecting fault");
        }

        let output = match handler(self, &cmd, fault) {
            Ok(stdout) => CommandOutput {
                stdout,
                stderr: String::new(),
            },
            Err(Error::Cli(code)) => CommandOutput {
                stdout: String::new(),
                stderr: code.stderr(),
            },
            Err(other) => return Err(other),
        };

        debug!(
            verb = cmd.verb(),
            exit_code = output.exit_code(),
            "executed command"
        );
        if let Some(log) = &self.log {
            log.record(cmd.verb(), cmd.line(), &output.stdout, &output.stderr);
        }

        if check_exit_code && !output.is_success() {
            return Err(Error::ProcessExecution {
                exit_code: 1,
                stdout: output.stdout,
                stderr: output.stderr,
                cmd: cmd.line().to_string(),
            });
        }
        Ok(output)
    }

    /// Run a command given as one whitespace-separated line.
    pub fn execute_line(&mut self, line: &str, check_exit_code: bool) -> Result<CommandOutput> {
        let argv: Vec<&str> = line.split_whitespace().collect();
        self.execute_command(&argv, check_exit_code)
    }

    /// Whether `verb` names a known command.
    #[must_use]
    pub fn supports(verb: &str) -> bool {
        HANDLERS.contains_key(verb)
    }

    /// The configuration this simulator was built from.
    #[must_use]
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Volumes, in creation order.
    #[must_use]
    pub fn volumes(&self) -> &Store<Volume> {
        &self.volumes
    }

    /// Hosts, in creation order.
    #[must_use]
    pub fn hosts(&self) -> &Store<Host> {
        &self.hosts
    }

    /// Volume-to-host mappings.
    #[must_use]
    pub fn host_mappings(&self) -> &Store<HostMapping> {
        &self.mappings
    }

    /// FlashCopy mappings.
    #[must_use]
    pub fn fc_mappings(&self) -> &Store<FcMapping> {
        &self.fc_mappings
    }

    /// FlashCopy consistency groups.
    #[must_use]
    pub fn fc_consist_groups(&self) -> &Store<FcConsistGrp> {
        &self.fc_groups
    }

    /// Remote-copy relationships.
    #[must_use]
    pub fn rc_relationships(&self) -> &Store<RcRelationship> {
        &self.rc_relationships
    }

    /// Remote-copy consistency groups.
    #[must_use]
    pub fn rc_consist_groups(&self) -> &Store<RcConsistGrp> {
        &self.rc_groups
    }

    /// Partnerships, keyed by remote system name.
    #[must_use]
    pub fn partnerships(&self) -> &IndexMap<String, Partnership> {
        &self.partnerships
    }

    pub(crate) fn local_cluster(&self) -> ClusterRef {
        ClusterRef {
            id: self.config.local_system.id.clone(),
            name: self.config.local_system.name.clone(),
        }
    }

    pub(crate) fn aux_cluster(&self) -> ClusterRef {
        ClusterRef {
            id: self.config.aux_system.id.clone(),
            name: self.config.aux_system.name.clone(),
        }
    }

    /// Resolve a cluster by name or id.
    pub(crate) fn find_cluster(&self, key: &str) -> Option<ClusterRef> {
        [self.local_cluster(), self.aux_cluster()]
            .into_iter()
            .find(|c| c.name == key || c.id == key)
    }

    pub(crate) fn pool(&self, name: &str) -> Option<&Pool> {
        self.pools
            .iter()
            .find(|p| p.name == name)
            .or_else(|| {
                let id: u32 = name.parse().ok()?;
                self.pools.iter().find(|p| p.id == id)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn unknown_verb_is_invalid_input() {
        let mut sim = Simulator::default();
        let err = sim.execute_command(&["svctask", "explode"], false).expect_err("unknown");
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn cli_failure_is_returned_as_stderr() {
        let mut sim = Simulator::default();
        let out = sim.execute_command(&["rmvdisk", "nope"], false).expect("raw output");
        assert_eq!(out.stdout, "");
        assert_eq!(out.stderr, ErrorCode::Cmmvc5753e.stderr());
        assert_eq!(out.exit_code(), 1);
    }

    #[test]
    fn check_exit_code_raises_process_execution() {
        let mut sim = Simulator::default();
        let err = sim
            .execute_command(&["svctask", "rmvdisk", "nope"], true)
            .expect_err("should raise");
        match err {
            Error::ProcessExecution {
                exit_code,
                stderr,
                cmd,
                ..
            } => {
                assert_eq!(exit_code, 1);
                assert!(stderr.starts_with("CMMVC5753E"));
                assert_eq!(cmd, "svctask rmvdisk nope");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn injected_fault_is_consumed_once() {
        let mut sim = Simulator::default();
        sim.execute_line("mkhost -name h1 -iscsiname iqn.1", true).expect("mkhost");
        sim.error_injection("lshost", FaultTag::MissingHost);
        let out = sim.execute_line("lshost h1", false).expect("lshost");
        assert!(out.stderr.starts_with("CMMVC5754E"));
        let out = sim.execute_line("lshost h1", false).expect("lshost");
        assert!(out.is_success());
    }

    #[test]
    fn command_log_records_executions() {
        let log = CommandLog::new();
        let mut sim = Simulator::default().with_command_log(log.clone());
        sim.execute_line("lssystem", false).expect("lssystem");
        sim.execute_line("rmvdisk nope", false).expect("rmvdisk");
        assert_eq!(log.len(), 2);
        let rm = log.query("rmvdisk");
        assert_eq!(rm.len(), 1);
        assert!(rm[0].failed());
        assert_eq!(rm[0].line, "rmvdisk nope");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SimulatorConfig::default().with_pools(Vec::<String>::new());
        assert!(matches!(Simulator::new(config), Err(Error::Config { .. })));
    }

    #[test]
    fn output_serializes_as_json() {
        let out = CommandOutput {
            stdout: "a".to_string(),
            stderr: String::new(),
        };
        let json = serde_json::to_value(&out).expect("json");
        assert_eq!(json["stdout"], "a");
        assert_eq!(json["stderr"], "");
    }
}
