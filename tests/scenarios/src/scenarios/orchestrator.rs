//! Full runs against the fakes with a mock lifecycle.

#[cfg(test)]
mod tests {
    use crate::assertions::{all_stopped_last, report_well_formed};
    use crate::fixtures::{fast_config, link_registry, service_tree, FakeRegistry, FakeServices};
    use std::sync::Arc;
    use svcbench_core::config::HarnessConfig;
    use std::time::Duration;
    use svcbench_core::{
        read_report, LifecycleAction, LoadResult, MetricFamily, MockLifecycle, Orchestrator,
        ReportRow, RunSummary,
    };
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    const SERVICES: [&str; 3] = ["alpha", "bravo", "charlie"];

    struct Rig {
        registry: FakeRegistry,
        services: FakeServices,
        lifecycle: MockLifecycle,
        root: TempDir,
        reports: TempDir,
    }

    impl Rig {
        async fn new() -> Self {
            let registry = FakeRegistry::start().await;
            let services = FakeServices::start().await;
            let lifecycle = MockLifecycle::new();
            link_registry(&lifecycle, &registry.state());
            Self {
                registry,
                services,
                lifecycle,
                root: service_tree(&SERVICES),
                reports: tempfile::tempdir().unwrap(),
            }
        }

        fn config(&self) -> HarnessConfig {
            fast_config(
                &self.registry,
                &self.services,
                self.root.path(),
                self.reports.path(),
            )
        }

        fn orchestrator(&self, config: HarnessConfig) -> Orchestrator {
            Orchestrator::new(config, Arc::new(self.lifecycle.clone())).unwrap()
        }

        async fn run(&self, family: MetricFamily) -> RunSummary {
            self.orchestrator(self.config())
                .run(family, &CancellationToken::new())
                .await
                .unwrap()
        }
    }

    fn assert_passed(result: crate::assertions::AssertionResult) {
        assert!(
            result.passed,
            "{}: {:?}",
            result.description, result.failure_details
        );
    }

    #[tokio::test]
    async fn startup_run_writes_one_report_per_trial() {
        let rig = Rig::new().await;

        let summary = rig.run(MetricFamily::Startup).await;

        assert!(!summary.interrupted);
        assert_eq!(summary.services, 3);
        assert_eq!(summary.trials.len(), 2);
        for (i, outcome) in summary.trials.iter().enumerate() {
            let expected = rig
                .reports
                .path()
                .join(format!("startup_trial_{}.csv", i + 1));
            assert_eq!(outcome.report.as_deref(), Some(expected.as_path()));
            assert_eq!(outcome.rows, 3);
            assert!(outcome.failed_services.is_empty());
            assert_passed(report_well_formed(&expected, MetricFamily::Startup, 3));
        }

        let report = read_report(&rig.reports.path().join("startup_trial_1.csv")).unwrap();
        let names: Vec<&str> = report.rows.iter().map(|row| row[0].as_str()).collect();
        assert_eq!(names, SERVICES);
        assert!(report.rows.iter().all(|row| row[4] == "true"));
        assert_passed(all_stopped_last(&rig.lifecycle.calls(), &SERVICES));
    }

    #[tokio::test]
    async fn every_trial_ends_with_every_service_stopped() {
        let rig = Rig::new().await;

        rig.run(MetricFamily::Startup).await;

        // Per trial: a pre-start stop for each service, then teardown of all.
        let stopped = rig.lifecycle.stopped_services();
        assert_eq!(stopped.len(), 2 * (3 + 3));
        let teardown: Vec<&str> = stopped[3..6].iter().map(String::as_str).collect();
        assert_eq!(teardown, SERVICES);
    }

    #[tokio::test]
    async fn unhealthy_service_is_skipped_others_measured() {
        let rig = Rig::new().await;
        rig.services.set_status("bravo", 503);

        let summary = rig.run(MetricFamily::Startup).await;

        for outcome in &summary.trials {
            assert_eq!(outcome.failed_services, vec!["bravo".to_string()]);
            assert_eq!(outcome.rows, 2);
            let report = read_report(outcome.report.as_ref().unwrap()).unwrap();
            assert!(report.rows.iter().all(|row| row[0] != "bravo"));
        }
    }

    #[tokio::test]
    async fn failure_recovery_restarts_scaled() {
        let rig = Rig::new().await;
        let mut config = rig.config();
        config.trials.count = 1;

        let summary = rig
            .orchestrator(config)
            .run(MetricFamily::FailureRecovery, &CancellationToken::new())
            .await
            .unwrap();

        let path = rig.reports.path().join("failure_recovery_trial_1.csv");
        assert_eq!(summary.reports(), vec![path.clone()]);
        assert_passed(report_well_formed(&path, MetricFamily::FailureRecovery, 3));

        let restarts: Vec<_> = rig
            .lifecycle
            .calls()
            .into_iter()
            .filter(|call| matches!(call.action, LifecycleAction::RestartScaled(_)))
            .collect();
        assert_eq!(restarts.len(), 3);
        assert!(restarts
            .iter()
            .all(|call| call.action == LifecycleAction::RestartScaled(2)));

        let report = read_report(&path).unwrap();
        for row in &report.rows {
            let recovery: f64 = row[1].parse().unwrap();
            let detection: f64 = row[2].parse().unwrap();
            assert!(detection <= recovery, "detection after recovery in {row:?}");
        }
    }

    #[tokio::test]
    async fn failed_restart_skips_service() {
        let rig = Rig::new().await;
        rig.lifecycle.fail_service("charlie");
        let mut config = rig.config();
        config.trials.count = 1;

        let summary = rig
            .orchestrator(config)
            .run(MetricFamily::FailureRecovery, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.trials[0].failed_services, vec!["charlie".to_string()]);
        assert_eq!(summary.trials[0].rows, 2);
        assert!(!summary.trials[0].aborted);
    }

    #[tokio::test]
    async fn load_run_excludes_services_that_fail_to_start() {
        let rig = Rig::new().await;
        rig.lifecycle.fail_service("bravo");
        let mut config = rig.config();
        config.trials.count = 1;

        let summary = rig
            .orchestrator(config)
            .run(MetricFamily::Load, &CancellationToken::new())
            .await
            .unwrap();

        let outcome = &summary.trials[0];
        assert_eq!(outcome.failed_services, vec!["bravo".to_string()]);
        // Stress levels 2 and 3 over alpha and charlie.
        assert_eq!(outcome.rows, (2 + 3) * 2);
        let path = rig.reports.path().join("load_trial_1.csv");
        assert_passed(report_well_formed(&path, MetricFamily::Load, 10));
        assert_eq!(rig.services.hits("bravo"), 0);

        let report = read_report(&path).unwrap();
        let groups: Vec<&str> = report.rows.iter().map(|row| row[4].as_str()).collect();
        assert_eq!(groups.iter().filter(|g| **g == "2").count(), 4);
        assert_eq!(groups.iter().filter(|g| **g == "3").count(), 6);

        // Every row reads back into a LoadResult that renders to the same fields.
        for row in &report.rows {
            let issued_at = chrono::DateTime::parse_from_rfc3339(&row[1])
                .unwrap()
                .with_timezone(&chrono::Utc);
            assert!(row[1].ends_with('Z'), "{row:?}");
            let (_, decimals) = row[2].split_once('.').unwrap();
            assert_eq!(decimals.len(), 2, "{row:?}");
            let latency_ms: f64 = row[2].parse().unwrap();
            let result = LoadResult {
                service_name: row[0].clone(),
                issued_at,
                latency: Duration::from_secs_f64(latency_ms / 1000.0),
                success: row[3].parse().unwrap(),
                status: None,
                concurrency_group: row[4].parse().unwrap(),
            };
            assert!(["alpha", "charlie"].contains(&result.service_name.as_str()));
            assert_eq!(&result.fields(), row);
        }
    }

    #[tokio::test]
    async fn interrupt_mid_trial_stops_everything() {
        let rig = Rig::new().await;
        let mut config = rig.config();
        config.trials.count = 3;
        let cancel = CancellationToken::new();

        // Interrupt as soon as the second service is started.
        let registry = rig.registry.state();
        let trigger = cancel.clone();
        rig.lifecycle.on_call(move |call| match call.action {
            LifecycleAction::Start => {
                registry.set_passing(&call.service);
                if call.service == "bravo" {
                    trigger.cancel();
                }
            }
            LifecycleAction::RestartScaled(_) => registry.set_passing(&call.service),
            LifecycleAction::Stop => registry.set_critical(&call.service),
        });

        let summary = rig
            .orchestrator(config)
            .run(MetricFamily::Startup, &cancel)
            .await
            .unwrap();

        assert!(summary.interrupted);
        assert!(summary.trials.is_empty());
        assert_eq!(rig.lifecycle.started_services(), vec!["alpha", "bravo"]);
        let calls = rig.lifecycle.calls();
        let tail: Vec<_> = calls[calls.len() - 3..]
            .iter()
            .map(|call| (call.service.as_str(), call.action))
            .collect();
        assert_eq!(
            tail,
            vec![
                ("alpha", LifecycleAction::Stop),
                ("bravo", LifecycleAction::Stop),
                ("charlie", LifecycleAction::Stop),
            ]
        );
        assert!(!rig.reports.path().join("startup_trial_2.csv").exists());
    }

    #[tokio::test]
    async fn cancelled_before_start_touches_nothing_but_teardown() {
        let rig = Rig::new().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = rig
            .orchestrator(rig.config())
            .run(MetricFamily::Load, &cancel)
            .await
            .unwrap();

        assert!(summary.interrupted);
        assert!(summary.trials.is_empty());
        assert!(rig.lifecycle.started_services().is_empty());
        assert_eq!(rig.lifecycle.stopped_services(), SERVICES);
    }

    #[tokio::test]
    async fn unwritable_report_aborts_trial_but_run_continues() {
        let rig = Rig::new().await;
        let blocker = rig.reports.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let mut config = rig.config();
        config.report.output_dir = blocker;

        let summary = rig
            .orchestrator(config)
            .run(MetricFamily::Startup, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.trials.len(), 2);
        assert!(summary.trials.iter().all(|t| t.aborted && t.report.is_none()));
        assert!(rig.lifecycle.started_services().is_empty());
        assert_eq!(rig.lifecycle.stopped_services().len(), 2 * 3);
    }

    #[tokio::test]
    async fn empty_service_root_still_produces_reports() {
        let rig = Rig::new().await;
        let empty = tempfile::tempdir().unwrap();
        let mut config = rig.config();
        config.services.root = empty.path().to_path_buf();
        config.trials.count = 1;

        let summary = rig
            .orchestrator(config)
            .run(MetricFamily::Startup, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.services, 0);
        let path = rig.reports.path().join("startup_trial_1.csv");
        assert_passed(report_well_formed(&path, MetricFamily::Startup, 0));
        assert!(rig.lifecycle.calls().is_empty());
    }
}
