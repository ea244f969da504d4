//! Dual-signal readiness against live HTTP endpoints.

#[cfg(test)]
mod tests {
    use crate::fixtures::{FakeRegistry, FakeServices, FAST_POLL};
    use std::path::Path;
    use std::time::{Duration, Instant};
    use svcbench_core::{DiscoveryClient, HealthProbe, ReadinessMonitor, ReadinessOutcome};
    use svcbench_types::ServiceIdentity;

    struct Rig {
        registry: FakeRegistry,
        services: FakeServices,
        discovery: DiscoveryClient,
        health: HealthProbe,
    }

    async fn rig() -> Rig {
        let registry = FakeRegistry::start().await;
        let services = FakeServices::start().await;
        let discovery =
            DiscoveryClient::new(&registry.base_url(), Duration::from_millis(500)).unwrap();
        let health = HealthProbe::new(Duration::from_millis(40)).unwrap();
        Rig {
            registry,
            services,
            discovery,
            health,
        }
    }

    fn identity(rig: &Rig, name: &str) -> ServiceIdentity {
        ServiceIdentity::new(name, rig.services.health_url(name), Path::new(name)).unwrap()
    }

    fn monitor(timeout: Duration) -> ReadinessMonitor {
        ReadinessMonitor::new(FAST_POLL, timeout)
    }

    #[tokio::test]
    async fn registered_and_healthy_service_is_ready() {
        let rig = rig().await;
        rig.registry.state().set_passing("weather");
        let weather = identity(&rig, "weather");

        let outcome = monitor(Duration::from_secs(2))
            .wait_until_ready(&weather, Instant::now(), &rig.discovery, &rig.health)
            .await;

        assert!(outcome.is_ready(), "got {outcome:?}");
        assert!(rig.discovery.leader_reachable().await);
    }

    #[tokio::test]
    async fn unavailable_service_times_out_with_discovery_passed() {
        let rig = rig().await;
        rig.registry.state().set_passing("parking");
        rig.services.set_status("parking", 503);
        let parking = identity(&rig, "parking");

        let started = Instant::now();
        let outcome = monitor(Duration::from_millis(400))
            .wait_until_ready(&parking, started, &rig.discovery, &rig.health)
            .await;

        let ReadinessOutcome::TimedOut { partial, .. } = outcome else {
            panic!("expected TimedOut, got {outcome:?}");
        };
        assert!(partial.discovery_ready());
        assert!(!partial.health_ready());
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn warning_check_is_not_passing() {
        let rig = rig().await;
        rig.registry.state().set_checks("traffic", &["passing", "warning"]);
        let traffic = identity(&rig, "traffic");

        let outcome = monitor(Duration::from_millis(400))
            .wait_until_ready(&traffic, Instant::now(), &rig.discovery, &rig.health)
            .await;

        let partial = outcome.result();
        assert!(!outcome.is_ready());
        assert!(!partial.discovery_ready());
        assert!(partial.health_ready());
    }

    #[tokio::test]
    async fn unregistered_service_is_not_discoverable() {
        let rig = rig().await;
        assert!(!rig.discovery.is_service_healthy("ghost").await);
    }

    #[tokio::test]
    async fn health_signal_can_flip_before_discovery() {
        let rig = rig().await;
        let state = rig.registry.state();
        let weather = identity(&rig, "weather");

        // Registry catches up a few polls after the service is already healthy.
        let flip = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            state.set_passing("weather");
        });

        let outcome = monitor(Duration::from_secs(3))
            .wait_until_ready(&weather, Instant::now(), &rig.discovery, &rig.health)
            .await;
        flip.await.unwrap();

        let ReadinessOutcome::Ready {
            discovery_ready_at,
            health_ready_at,
            total,
        } = outcome
        else {
            panic!("expected Ready, got {outcome:?}");
        };
        assert!(health_ready_at < discovery_ready_at);
        assert!(discovery_ready_at >= Duration::from_millis(250));
        assert!(total >= discovery_ready_at);
        // Health passed on the first poll and was not probed again.
        assert_eq!(rig.services.hits("weather"), 1);
    }
}
