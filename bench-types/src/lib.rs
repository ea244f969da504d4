//! # svcbench-types
//!
//! Data model shared by the svc-bench crates:
//! - [`ServiceIdentity`] - a service resolved from the service directory tree
//! - [`ReadinessResult`], [`ReadinessOutcome`] - the result of one readiness cycle
//! - [`LoadResult`] - one issued load-test probe
//! - [`Trial`], [`MetricFamily`] - trial bookkeeping and report families
//! - [`IdentityError`] - error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod family;
mod identity;
mod results;

pub use error::IdentityError;
pub use family::MetricFamily;
pub use identity::{ServiceIdentity, NAME_PLACEHOLDER};
pub use results::{LoadResult, ReadinessOutcome, ReadinessResult, Trial};
