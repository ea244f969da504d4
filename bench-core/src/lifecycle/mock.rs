//! Mock lifecycle for testing.
//!
//! Records every invocation and can be told to fail for chosen services.

use super::{Lifecycle, LifecycleAction, LifecycleError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use svcbench_types::ServiceIdentity;

/// One recorded lifecycle invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleCall {
    /// Service name.
    pub service: String,
    /// Requested action.
    pub action: LifecycleAction,
}

type CallHook = Arc<dyn Fn(&LifecycleCall) + Send + Sync>;

/// Mock lifecycle for testing.
///
/// Clones share state, so a test can keep a handle while the orchestrator
/// owns another.
#[derive(Clone, Default)]
pub struct MockLifecycle {
    inner: Arc<Mutex<MockLifecycleInner>>,
}

#[derive(Default)]
struct MockLifecycleInner {
    calls: Vec<LifecycleCall>,
    failing: HashSet<String>,
    failing_stops: HashSet<String>,
    hook: Option<CallHook>,
}

impl std::fmt::Debug for MockLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("MockLifecycle")
            .field("calls", &inner.calls)
            .field("failing", &inner.failing)
            .field("failing_stops", &inner.failing_stops)
            .finish()
    }
}

impl MockLifecycle {
    /// Create a new mock lifecycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `start` and `restart_scaled` for `service` fail.
    ///
    /// `stop` still succeeds so teardown paths stay observable.
    pub fn fail_service(&self, service: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.failing.insert(service.to_string());
    }

    /// Make every `stop` for `service` fail.
    pub fn fail_stop(&self, service: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.failing_stops.insert(service.to_string());
    }

    /// Run `hook` on every invocation, after it is recorded.
    pub fn on_call(&self, hook: impl Fn(&LifecycleCall) + Send + Sync + 'static) {
        let mut inner = self.inner.lock().unwrap();
        inner.hook = Some(Arc::new(hook));
    }

    /// All recorded invocations, in order.
    pub fn calls(&self) -> Vec<LifecycleCall> {
        let inner = self.inner.lock().unwrap();
        inner.calls.clone()
    }

    /// Names of services that received `stop`, in order.
    pub fn stopped_services(&self) -> Vec<String> {
        self.services_for(|action| action == LifecycleAction::Stop)
    }

    /// Names of services that received `start`, in order.
    pub fn started_services(&self) -> Vec<String> {
        self.services_for(|action| action == LifecycleAction::Start)
    }

    /// Clear recorded calls and failures.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.clear();
        inner.failing.clear();
        inner.failing_stops.clear();
    }

    fn services_for(&self, matches: impl Fn(LifecycleAction) -> bool) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .calls
            .iter()
            .filter(|call| matches(call.action))
            .map(|call| call.service.clone())
            .collect()
    }

    fn record(
        &self,
        identity: &ServiceIdentity,
        action: LifecycleAction,
    ) -> Result<(), LifecycleError> {
        let call = LifecycleCall {
            service: identity.name().to_string(),
            action,
        };

        let (hook, fail) = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(call.clone());
            let fail = match action {
                LifecycleAction::Stop => inner.failing_stops.contains(identity.name()),
                _ => inner.failing.contains(identity.name()),
            };
            (inner.hook.clone(), fail)
        };

        if let Some(hook) = hook {
            hook(&call);
        }

        if fail {
            return Err(LifecycleError::Failed {
                service: identity.name().to_string(),
                action,
                exit_code: 1,
                stderr: "mock failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Lifecycle for MockLifecycle {
    async fn start(&self, identity: &ServiceIdentity) -> Result<(), LifecycleError> {
        self.record(identity, LifecycleAction::Start)
    }

    async fn stop(&self, identity: &ServiceIdentity) -> Result<(), LifecycleError> {
        self.record(identity, LifecycleAction::Stop)
    }

    async fn restart_scaled(
        &self,
        identity: &ServiceIdentity,
        replicas: u32,
    ) -> Result<(), LifecycleError> {
        self.record(identity, LifecycleAction::RestartScaled(replicas))
    }
}
