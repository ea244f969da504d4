//! docker-compose backed lifecycle.
//!
//! Runs the orchestration program with the service directory as its working
//! directory, so each service's own compose file is picked up.

use super::{Lifecycle, LifecycleAction, LifecycleError};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use svcbench_types::ServiceIdentity;

/// Lifecycle implementation that shells out to `docker-compose` (or any
/// program accepting the same subcommands).
#[derive(Debug, Clone)]
pub struct ComposeLifecycle {
    program: String,
    base_args: Vec<String>,
    timeout: Duration,
}

impl ComposeLifecycle {
    /// Create a lifecycle for `program`, e.g. `docker-compose`.
    pub fn new(program: &str, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            timeout,
        }
    }

    /// Arguments placed before every subcommand, e.g. `["compose"]` for
    /// `docker compose`.
    pub fn base_args(mut self, args: Vec<String>) -> Self {
        self.base_args = args;
        self
    }

    /// Orchestration program.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build the arguments for an action.
    ///
    /// - start: `up -d`
    /// - stop: `down`
    /// - restart: `up -d --force-recreate --scale <handle>=<replicas>`
    pub fn command_args(&self, identity: &ServiceIdentity, action: LifecycleAction) -> Vec<String> {
        let mut args = self.base_args.clone();
        match action {
            LifecycleAction::Start => {
                args.push("up".into());
                args.push("-d".into());
            }
            LifecycleAction::Stop => {
                args.push("down".into());
            }
            LifecycleAction::RestartScaled(replicas) => {
                args.push("up".into());
                args.push("-d".into());
                args.push("--force-recreate".into());
                args.push("--scale".into());
                args.push(format!("{}={}", identity.lifecycle_handle(), replicas));
            }
        }
        args
    }

    async fn run(
        &self,
        identity: &ServiceIdentity,
        action: LifecycleAction,
    ) -> Result<(), LifecycleError> {
        let args = self.command_args(identity, action);
        let started = Instant::now();
        tracing::debug!(
            service = identity.name(),
            directory = %identity.directory().display(),
            program = self.program(),
            args = ?args,
            "running lifecycle command"
        );

        let child = tokio::process::Command::new(self.program())
            .args(&args)
            .current_dir(identity.directory())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(LifecycleError::Spawn {
                    service: identity.name().to_string(),
                    action,
                    source: e,
                })
            }
            Err(_) => {
                return Err(LifecycleError::Timeout {
                    service: identity.name().to_string(),
                    action,
                    secs: self.timeout.as_secs_f64(),
                })
            }
        };

        if !output.status.success() {
            return Err(LifecycleError::Failed {
                service: identity.name().to_string(),
                action,
                exit_code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::debug!(
            service = identity.name(),
            action = %action,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "lifecycle command finished"
        );
        Ok(())
    }
}

#[async_trait]
impl Lifecycle for ComposeLifecycle {
    async fn start(&self, identity: &ServiceIdentity) -> Result<(), LifecycleError> {
        self.run(identity, LifecycleAction::Start).await
    }

    async fn stop(&self, identity: &ServiceIdentity) -> Result<(), LifecycleError> {
        self.run(identity, LifecycleAction::Stop).await
    }

    async fn restart_scaled(
        &self,
        identity: &ServiceIdentity,
        replicas: u32,
    ) -> Result<(), LifecycleError> {
        self.run(identity, LifecycleAction::RestartScaled(replicas))
            .await
    }
}
