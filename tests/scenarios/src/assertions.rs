//! Assertion helpers for report files and lifecycle call logs.
//!
//! Pure functions: they take what a run left behind and return pass/fail.

use std::path::Path;
use svcbench_core::{read_report, LifecycleAction, LifecycleCall, MetricFamily};

/// Result of an assertion check.
#[derive(Debug, Clone)]
pub struct AssertionResult {
    /// Whether the assertion passed.
    pub passed: bool,
    /// What was checked.
    pub description: String,
    /// Details on failure.
    pub failure_details: Option<String>,
}

impl AssertionResult {
    /// A passing result.
    pub fn pass(description: &str) -> Self {
        Self {
            passed: true,
            description: description.into(),
            failure_details: None,
        }
    }

    /// A failing result.
    pub fn fail(description: &str, details: impl Into<String>) -> Self {
        Self {
            passed: false,
            description: description.into(),
            failure_details: Some(details.into()),
        }
    }
}

/// The report has the family's header, `rows` data rows, and every row the
/// header's width.
pub fn report_well_formed(path: &Path, family: MetricFamily, rows: usize) -> AssertionResult {
    let description = format!("{} is a well-formed {} report", path.display(), family.as_str());
    let report = match read_report(path) {
        Ok(report) => report,
        Err(e) => return AssertionResult::fail(&description, e.to_string()),
    };

    if report.header != family.columns() {
        return AssertionResult::fail(
            &description,
            format!("header {:?}, expected {:?}", report.header, family.columns()),
        );
    }
    if report.rows.len() != rows {
        return AssertionResult::fail(
            &description,
            format!("{} rows, expected {}", report.rows.len(), rows),
        );
    }
    if let Some(row) = report.rows.iter().find(|row| row.len() != report.header.len()) {
        return AssertionResult::fail(&description, format!("ragged row {row:?}"));
    }
    AssertionResult::pass(&description)
}

/// Every service in `services` was stopped after the last start or restart
/// it received.
pub fn all_stopped_last(calls: &[LifecycleCall], services: &[&str]) -> AssertionResult {
    let description = "every service ends stopped";
    for service in services {
        let last = calls.iter().rev().find(|call| call.service == *service);
        match last {
            Some(call) if call.action == LifecycleAction::Stop => {}
            Some(call) => {
                return AssertionResult::fail(
                    description,
                    format!("{service} last received {}", call.action),
                )
            }
            None => {
                return AssertionResult::fail(description, format!("{service} never received a call"))
            }
        }
    }
    AssertionResult::pass(description)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(service: &str, action: LifecycleAction) -> LifecycleCall {
        LifecycleCall {
            service: service.into(),
            action,
        }
    }

    #[test]
    fn stopped_last_detects_running_service() {
        let calls = vec![
            call("alpha", LifecycleAction::Start),
            call("bravo", LifecycleAction::Start),
            call("alpha", LifecycleAction::Stop),
        ];
        assert!(!all_stopped_last(&calls, &["alpha", "bravo"]).passed);
        assert!(all_stopped_last(&calls, &["alpha"]).passed);
    }

    #[test]
    fn missing_report_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = report_well_formed(&dir.path().join("nope.csv"), MetricFamily::Load, 0);
        assert!(!result.passed);
    }
}
