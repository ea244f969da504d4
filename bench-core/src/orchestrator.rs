//! Run orchestration.
//!
//! A run checks the discovery registry, resolves the service set once, then
//! executes the configured number of trials for one metric family. Every
//! trial writes its own report and ends by stopping every service. Between
//! trials the orchestrator sleeps for the cooldown.
//!
//! Interrupts arrive through a [`CancellationToken`]. The trial loop is raced
//! against the token; on cancellation the in-flight work is dropped, every
//! service is stopped and the run returns with `interrupted` set.

use crate::config::HarnessConfig;
use crate::discovery::DiscoveryClient;
use crate::error::{HarnessError, MeasurementError};
use crate::health::HealthProbe;
use crate::lifecycle::{stop_all, ComposeLifecycle, Lifecycle};
use crate::load::{summarize, Endpoint, LoadGenerator};
use crate::readiness::ReadinessMonitor;
use crate::report::{RecoveryRow, ReportError, ReportRow, ReportWriter, StartupRow};
use crate::resolver::resolve;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use svcbench_types::{MetricFamily, ReadinessOutcome, ServiceIdentity, Trial};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// What happened in one trial.
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    /// The trial.
    pub trial: Trial,
    /// Report file, if the trial completed with a closed report.
    pub report: Option<PathBuf>,
    /// Data rows written.
    pub rows: usize,
    /// Services skipped because of a lifecycle failure or readiness timeout.
    pub failed_services: Vec<String>,
    /// The report could not be created or written.
    pub aborted: bool,
}

impl TrialOutcome {
    fn new(trial: Trial) -> Self {
        Self {
            trial,
            report: None,
            rows: 0,
            failed_services: Vec::new(),
            aborted: false,
        }
    }
}

/// What happened in one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Metric family measured.
    pub family: MetricFamily,
    /// Number of services resolved.
    pub services: usize,
    /// Trials that ran to the end, in order.
    pub trials: Vec<TrialOutcome>,
    /// The run stopped early because of an interrupt.
    pub interrupted: bool,
}

impl RunSummary {
    /// Report files produced by completed trials.
    pub fn reports(&self) -> Vec<PathBuf> {
        self.trials.iter().filter_map(|t| t.report.clone()).collect()
    }
}

/// Drives trials for one metric family.
pub struct Orchestrator {
    config: HarnessConfig,
    discovery: DiscoveryClient,
    health: HealthProbe,
    lifecycle: Arc<dyn Lifecycle>,
    monitor: ReadinessMonitor,
    load: LoadGenerator,
}

impl Orchestrator {
    /// Build an orchestrator using `lifecycle` to control services.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or an HTTP client cannot be built.
    pub fn new(config: HarnessConfig, lifecycle: Arc<dyn Lifecycle>) -> Result<Self, HarnessError> {
        config.validate()?;

        let discovery =
            DiscoveryClient::new(&config.registry.base_url, config.registry.request_timeout())?;
        let health = HealthProbe::new(config.readiness.health_timeout())?;
        let monitor =
            ReadinessMonitor::new(config.readiness.poll_interval(), config.readiness.timeout());
        let load = LoadGenerator::new(config.load.request_timeout());

        Ok(Self {
            config,
            discovery,
            health,
            lifecycle,
            monitor,
            load,
        })
    }

    /// Build an orchestrator driving services through the configured compose
    /// program.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::new`].
    pub fn with_compose(config: HarnessConfig) -> Result<Self, HarnessError> {
        let lifecycle = ComposeLifecycle::new(
            &config.services.compose_program,
            config.services.command_timeout(),
        )
        .base_args(config.services.compose_args.clone());
        Self::new(config, Arc::new(lifecycle))
    }

    /// Active configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Check that the discovery registry answers.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::RegistryUnreachable`] otherwise.
    pub async fn preflight(&self) -> Result<(), HarnessError> {
        if self.discovery.leader_reachable().await {
            info!(registry = self.discovery.base_url(), "discovery registry reachable");
            Ok(())
        } else {
            Err(HarnessError::RegistryUnreachable {
                url: self.discovery.leader_url(),
            })
        }
    }

    /// Resolve the service set under the configured root.
    ///
    /// # Errors
    ///
    /// Fails if the root cannot be enumerated.
    pub fn resolve_services(&self) -> Result<Vec<ServiceIdentity>, HarnessError> {
        let services = resolve(
            &self.config.services.root,
            &self.config.services.health_url_template,
        )?;
        info!(
            root = %self.config.services.root.display(),
            count = services.len(),
            "resolved services"
        );
        Ok(services)
    }

    /// Execute a full run for `family`.
    ///
    /// Nothing is started and no report is written unless the registry
    /// answers first.
    ///
    /// # Errors
    ///
    /// Fails on an unreachable registry or an unreadable services root.
    /// Per-service and per-trial failures are recorded in the summary.
    pub async fn run(
        &self,
        family: MetricFamily,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, HarnessError> {
        self.preflight().await?;
        let services = self.resolve_services()?;
        if services.is_empty() {
            warn!(root = %self.config.services.root.display(), "no services found");
        }

        let output_dir = &self.config.report.output_dir;
        if let Err(e) = std::fs::create_dir_all(output_dir) {
            error!(dir = %output_dir.display(), error = %e, "cannot create report directory");
        }

        info!(
            family = family.as_str(),
            trials = self.config.trials.count,
            services = services.len(),
            "starting run"
        );

        let mut trials = Vec::new();
        let interrupted = tokio::select! {
            biased;
            _ = cancel.cancelled() => true,
            completed = self.run_trials(family, &services, cancel, &mut trials) => !completed,
        };

        if interrupted {
            warn!("run interrupted, stopping all services");
            stop_all(self.lifecycle.as_ref(), &services).await;
        } else {
            info!(family = family.as_str(), trials = trials.len(), "run complete");
        }

        Ok(RunSummary {
            family,
            services: services.len(),
            trials,
            interrupted,
        })
    }

    /// Returns false if the loop stopped because of cancellation.
    async fn run_trials(
        &self,
        family: MetricFamily,
        services: &[ServiceIdentity],
        cancel: &CancellationToken,
        outcomes: &mut Vec<TrialOutcome>,
    ) -> bool {
        let count = self.config.trials.count;
        for index in 1..=count {
            if cancel.is_cancelled() {
                return false;
            }

            let trial = Trial::begin(index);
            info!(trial = index, of = count, family = family.as_str(), "starting trial");
            let outcome = self.run_trial(family, trial, services, cancel).await;
            info!(
                trial = index,
                rows = outcome.rows,
                failed = outcome.failed_services.len(),
                aborted = outcome.aborted,
                "trial finished"
            );
            outcomes.push(outcome);

            stop_all(self.lifecycle.as_ref(), services).await;

            if cancel.is_cancelled() {
                return false;
            }
            if index < count {
                let cooldown = self.config.trials.cooldown();
                info!(secs = cooldown.as_secs_f64(), "cooling down");
                tokio::time::sleep(cooldown).await;
            }
        }
        true
    }

    async fn run_trial(
        &self,
        family: MetricFamily,
        trial: Trial,
        services: &[ServiceIdentity],
        cancel: &CancellationToken,
    ) -> TrialOutcome {
        let path = self
            .config
            .report
            .output_dir
            .join(family.file_name(trial.index));
        let mut outcome = TrialOutcome::new(trial);

        let opened = ReportWriter::open(&path).and_then(|mut writer| {
            writer.write_header(family.columns())?;
            Ok(writer)
        });
        let mut writer = match opened {
            Ok(writer) => writer,
            Err(e) => {
                error!(trial = trial.index, error = %e, "cannot create report, skipping trial");
                discard(&path);
                outcome.aborted = true;
                return outcome;
            }
        };

        let measured = match family {
            MetricFamily::FailureRecovery => {
                self.measure_recovery(services, &mut writer, &mut outcome, cancel)
                    .await
            }
            MetricFamily::Startup => {
                self.measure_startup(services, &mut writer, &mut outcome, cancel)
                    .await
            }
            MetricFamily::Load => {
                self.measure_load(services, &mut writer, &mut outcome, cancel)
                    .await
            }
        };

        outcome.rows = writer.rows();
        match measured.and_then(|()| writer.close()) {
            Ok(report) => outcome.report = Some(report),
            Err(e) => {
                error!(trial = trial.index, error = %e, "report write failed, aborting trial");
                discard(&path);
                outcome.aborted = true;
            }
        }
        outcome
    }

    async fn measure_recovery(
        &self,
        services: &[ServiceIdentity],
        writer: &mut ReportWriter,
        outcome: &mut TrialOutcome,
        cancel: &CancellationToken,
    ) -> Result<(), ReportError> {
        for identity in services {
            if cancel.is_cancelled() {
                break;
            }
            info!(service = identity.name(), "measuring failure recovery");
            let measuring = Instant::now();
            match self.recovery_time(identity).await {
                Ok(row) => {
                    info!(
                        service = identity.name(),
                        recovery_secs = row.recovery_time.as_secs_f64(),
                        detection_secs = row.detection_time.as_secs_f64(),
                        "recovered"
                    );
                    writer.write_row(&row.fields())?;
                }
                Err(e) => skip(identity, e, measuring.elapsed(), outcome),
            }
        }
        Ok(())
    }

    async fn recovery_time(&self, identity: &ServiceIdentity) -> Result<RecoveryRow, MeasurementError> {
        self.lifecycle.start(identity).await?;
        tokio::time::sleep(self.config.trials.settle()).await;

        let started = Instant::now();
        self.lifecycle
            .restart_scaled(identity, self.config.services.replicas)
            .await?;

        let (discovery_ready_at, _, total) = self.wait_ready(identity, started).await?;
        Ok(RecoveryRow {
            service: identity.name().to_string(),
            recovery_time: total,
            detection_time: discovery_ready_at,
        })
    }

    async fn measure_startup(
        &self,
        services: &[ServiceIdentity],
        writer: &mut ReportWriter,
        outcome: &mut TrialOutcome,
        cancel: &CancellationToken,
    ) -> Result<(), ReportError> {
        for identity in services {
            if cancel.is_cancelled() {
                break;
            }
            info!(service = identity.name(), "measuring startup");
            let measuring = Instant::now();
            match self.startup_time(identity).await {
                Ok(row) => {
                    info!(
                        service = identity.name(),
                        total_secs = row.total.as_secs_f64(),
                        container_secs = row.container_start_time.as_secs_f64(),
                        "started"
                    );
                    writer.write_row(&row.fields())?;
                }
                Err(e) => skip(identity, e, measuring.elapsed(), outcome),
            }
        }
        Ok(())
    }

    async fn startup_time(&self, identity: &ServiceIdentity) -> Result<StartupRow, MeasurementError> {
        if let Err(e) = self.lifecycle.stop(identity).await {
            warn!(service = identity.name(), error = %e, "stop before startup measurement failed");
        }

        let started = Instant::now();
        self.lifecycle.start(identity).await?;
        let container_start_time = started.elapsed();

        let (discovery_time, health_time, total) = self.wait_ready(identity, started).await?;
        Ok(StartupRow {
            service: identity.name().to_string(),
            total,
            discovery_time,
            health_time,
            discovery_passed: true,
            container_start_time,
        })
    }

    async fn measure_load(
        &self,
        services: &[ServiceIdentity],
        writer: &mut ReportWriter,
        outcome: &mut TrialOutcome,
        cancel: &CancellationToken,
    ) -> Result<(), ReportError> {
        let mut running = Vec::with_capacity(services.len());
        for identity in services {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let starting = Instant::now();
            match self.lifecycle.start(identity).await {
                Ok(()) => running.push(identity),
                Err(e) => skip(
                    identity,
                    MeasurementError::from(e),
                    starting.elapsed(),
                    outcome,
                ),
            }
        }

        let endpoints = self.load_endpoints(&running);
        if endpoints.is_empty() {
            warn!("no endpoints to load");
            return Ok(());
        }

        let warmup = self.config.load.warmup();
        info!(secs = warmup.as_secs_f64(), "warming up");
        tokio::time::sleep(warmup).await;

        for &level in &self.config.load.stress_levels {
            if cancel.is_cancelled() {
                break;
            }
            let results = self.load.run(&endpoints, level).await;
            for summary in summarize(&results) {
                info!(
                    service = %summary.service_name,
                    concurrency = level,
                    requests = summary.requests,
                    success_rate = summary.success_rate(),
                    p50_ms = summary.p50_ms,
                    p95_ms = summary.p95_ms,
                    max_ms = summary.max_ms,
                    "load batch summary"
                );
            }
            for result in &results {
                writer.write_row(&result.fields())?;
            }
        }
        Ok(())
    }

    /// Configured endpoints, or the health URL of every running service.
    fn load_endpoints(&self, running: &[&ServiceIdentity]) -> Vec<Endpoint> {
        if self.config.load.endpoints.is_empty() {
            running
                .iter()
                .map(|identity| Endpoint::new(identity.name(), identity.health_url()))
                .collect()
        } else {
            self.config
                .load
                .endpoints
                .iter()
                .map(|endpoint| Endpoint::new(&endpoint.name, &endpoint.url))
                .collect()
        }
    }

    /// Returns (discovery time, health time, total), all from `started`.
    async fn wait_ready(
        &self,
        identity: &ServiceIdentity,
        started: Instant,
    ) -> Result<(Duration, Duration, Duration), MeasurementError> {
        match self
            .monitor
            .wait_until_ready(identity, started, &self.discovery, &self.health)
            .await
        {
            ReadinessOutcome::Ready {
                discovery_ready_at,
                health_ready_at,
                total,
            } => Ok((discovery_ready_at, health_ready_at, total)),
            ReadinessOutcome::TimedOut { partial, waited } => Err(MeasurementError::NotReady {
                service: identity.name().to_string(),
                waited_secs: waited.as_secs_f64(),
                discovery_ready: partial.discovery_ready(),
                health_ready: partial.health_ready(),
            }),
        }
    }
}

fn skip(
    identity: &ServiceIdentity,
    error: MeasurementError,
    elapsed: Duration,
    outcome: &mut TrialOutcome,
) {
    warn!(
        service = identity.name(),
        directory = %identity.directory().display(),
        error = %error,
        elapsed_ms = elapsed.as_millis() as u64,
        "skipping service"
    );
    outcome.failed_services.push(identity.name().to_string());
}

fn discard(path: &std::path::Path) {
    match std::fs::remove_file(path) {
        Ok(()) => info!(path = %path.display(), "removed partial report"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "cannot remove partial report"),
    }
}
