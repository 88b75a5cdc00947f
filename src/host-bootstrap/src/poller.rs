// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Waits for zonal Compute Engine operations.
//!
//! Compute Engine uses an older form of long-running operations: the
//! operation resource carries a `status` field, and an `error` field when it
//! completes unsuccessfully. The [Poller] queries the operation on a fixed
//! interval until the status is `DONE`.

use crate::client::ComputeService;
use crate::config::Config;
use crate::errors::OperationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The terminal status of a Compute Engine operation.
pub const STATUS_DONE: &str = "DONE";

/// The time between status queries.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(10);

/// A Compute Engine operation resource.
///
/// Only the fields used by the poller are named, all other fields are kept in
/// `other` so the resource is returned as the service sent it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// The error payload, exactly as reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl Operation {
    /// Returns true if the operation reached its terminal state, with or
    /// without an error.
    pub fn is_done(&self) -> bool {
        self.status.as_deref() == Some(STATUS_DONE)
    }
}

/// Blocks the calling thread between polling attempts.
#[cfg_attr(test, mockall::automock)]
pub trait Sleeper {
    fn sleep(&self, period: Duration);
}

/// Sleeps with [std::thread::sleep].
#[derive(Clone, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, period: Duration) {
        std::thread::sleep(period)
    }
}

/// Polls zonal operations in the configured project and zone.
///
/// By default the poller waits [DEFAULT_POLLING_INTERVAL] between queries and
/// never gives up: an operation that never completes blocks forever. Use
/// [with_attempt_limit][Poller::with_attempt_limit] to bound the loop.
pub struct Poller<'a> {
    config: &'a Config,
    interval: Duration,
    sleeper: Box<dyn Sleeper + 'a>,
    attempt_limit: Option<u32>,
}

impl<'a> Poller<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            interval: DEFAULT_POLLING_INTERVAL,
            sleeper: Box::new(ThreadSleeper),
            attempt_limit: None,
        }
    }

    /// Changes the time between status queries.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Changes how the poller waits between status queries.
    pub fn with_sleeper<S: Sleeper + 'a>(mut self, sleeper: S) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// Stops polling after `limit` status queries that did not find the
    /// operation completed.
    ///
    /// The poller always sends at least one query, a `limit` of 0 behaves
    /// like a `limit` of 1.
    pub fn with_attempt_limit(mut self, limit: u32) -> Self {
        self.attempt_limit = Some(limit.max(1));
        self
    }

    /// Blocks until `operation` completes.
    ///
    /// Returns the final operation resource if it completed successfully. If
    /// it completed with an error the [OperationError] wraps the error payload.
    /// Failures to query the status are not retried.
    pub fn wait_for_operation<C>(
        &self,
        client: &C,
        operation: &str,
    ) -> Result<Operation, OperationError>
    where
        C: ComputeService + ?Sized,
    {
        tracing::info!("Waiting for GCE operation {operation} to finish...");
        let mut attempt_count = 0_u32;
        loop {
            attempt_count = attempt_count.saturating_add(1);
            let result = client
                .get_zone_operation(
                    &self.config.gce_project_name,
                    &self.config.gce_project_zone,
                    operation,
                )
                .map_err(|e| OperationError::query(operation, e))?;
            if result.is_done() {
                return match &result.error {
                    Some(payload) => Err(OperationError::service(operation, payload.clone())),
                    None => Ok(result),
                };
            }
            if self.attempt_limit.is_some_and(|limit| attempt_count >= limit) {
                return Err(OperationError::exhausted(operation, attempt_count));
            }
            tracing::debug!(
                "operation {operation} has status {:?} after {attempt_count} attempts",
                result.status
            );
            self.sleeper.sleep(self.interval);
        }
    }
}

impl std::fmt::Debug for Poller<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("project", &self.config.gce_project_name)
            .field("zone", &self.config.gce_project_zone)
            .field("interval", &self.interval)
            .field("attempt_limit", &self.attempt_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxError;
    use crate::client::MockComputeService;
    use crate::config::tests::test_config;
    use mockall::predicate::eq;
    use serde_json::json;
    use test_case::test_case;

    fn running() -> Operation {
        Operation {
            name: Some("op-123".into()),
            status: Some("RUNNING".into()),
            ..Operation::default()
        }
    }

    fn done() -> Operation {
        let other = json!({
            "kind": "compute#operation",
            "operationType": "insert",
            "targetLink": "https://www.googleapis.com/compute/v1/projects/test-project/zones/us-central1-f/instances/rancher-server",
            "progress": 100
        });
        Operation {
            name: Some("op-123".into()),
            status: Some(STATUS_DONE.into()),
            other: other.as_object().cloned().unwrap_or_default(),
            ..Operation::default()
        }
    }

    #[test]
    fn operation_parse() -> anyhow::Result<()> {
        let input = json!({
            "kind": "compute#operation",
            "name": "operation-1234",
            "zone": "https://www.googleapis.com/compute/v1/projects/test-project/zones/us-central1-f",
            "operationType": "insert",
            "status": "DONE",
            "error": {"errors": [{"code": "QUOTA_EXCEEDED", "message": "quota"}]}
        });
        let got: Operation = serde_json::from_value(input.clone())?;
        assert_eq!(got.name.as_deref(), Some("operation-1234"));
        assert!(got.is_done(), "{got:?}");
        assert_eq!(
            got.error,
            Some(json!({"errors": [{"code": "QUOTA_EXCEEDED", "message": "quota"}]}))
        );
        assert_eq!(got.other.get("operationType"), Some(&json!("insert")));
        assert_eq!(serde_json::to_value(&got)?, input);
        Ok(())
    }

    #[test]
    fn is_done() {
        assert!(!Operation::default().is_done());
        assert!(!running().is_done());
        assert!(done().is_done());
        let pending = Operation {
            status: Some("PENDING".into()),
            ..Operation::default()
        };
        assert!(!pending.is_done());
    }

    #[test]
    fn done_after_two_polls() -> anyhow::Result<()> {
        let config = test_config();
        let mut client = MockComputeService::new();
        let mut count = 0;
        client
            .expect_get_zone_operation()
            .times(3)
            .returning(move |project: &str, zone: &str, operation: &str| {
                assert_eq!(project, "test-project");
                assert_eq!(zone, "us-central1-f");
                assert_eq!(operation, "op-123");
                count += 1;
                if count < 3 { Ok(running()) } else { Ok(done()) }
            });
        let mut sleeper = MockSleeper::new();
        sleeper
            .expect_sleep()
            .with(eq(DEFAULT_POLLING_INTERVAL))
            .times(2)
            .return_const(());

        let poller = Poller::new(&config).with_sleeper(sleeper);
        let got = poller.wait_for_operation(&client, "op-123")?;
        assert_eq!(got, done());
        Ok(())
    }

    #[test]
    fn done_with_error() {
        let config = test_config();
        let mut client = MockComputeService::new();
        client
            .expect_get_zone_operation()
            .times(1)
            .returning(|_: &str, _: &str, _: &str| {
                Ok(Operation {
                    status: Some(STATUS_DONE.into()),
                    error: Some(json!({"code": 500, "message": "x"})),
                    ..Operation::default()
                })
            });
        let mut sleeper = MockSleeper::new();
        sleeper.expect_sleep().never();

        let poller = Poller::new(&config).with_sleeper(sleeper);
        let err = poller.wait_for_operation(&client, "op-123").unwrap_err();
        assert!(err.is_service(), "{err:?}");
        assert_eq!(err.payload(), Some(&json!({"code": 500, "message": "x"})));
        assert_eq!(err.operation(), "op-123");
    }

    #[test]
    fn never_done_keeps_polling() {
        const LIMIT: u32 = 1000;
        let config = test_config();
        let mut client = MockComputeService::new();
        client
            .expect_get_zone_operation()
            .times(LIMIT as usize)
            .returning(|_: &str, _: &str, _: &str| Ok(running()));
        let mut sleeper = MockSleeper::new();
        sleeper
            .expect_sleep()
            .times(LIMIT as usize - 1)
            .return_const(());

        let poller = Poller::new(&config)
            .with_sleeper(sleeper)
            .with_attempt_limit(LIMIT);
        let err = poller.wait_for_operation(&client, "op-123").unwrap_err();
        assert!(err.is_exhausted(), "{err:?}");
        assert_eq!(err.attempts(), Some(LIMIT));
    }

    #[test_case(0; "zero")]
    #[test_case(1; "one")]
    fn single_attempt_limit(limit: u32) {
        let config = test_config();
        let mut client = MockComputeService::new();
        client
            .expect_get_zone_operation()
            .times(1)
            .returning(|_: &str, _: &str, _: &str| Ok(running()));
        let mut sleeper = MockSleeper::new();
        sleeper.expect_sleep().never();

        let poller = Poller::new(&config)
            .with_sleeper(sleeper)
            .with_attempt_limit(limit);
        assert_eq!(poller.attempt_limit, Some(1), "{poller:?}");
        let err = poller.wait_for_operation(&client, "op-123").unwrap_err();
        assert!(err.is_exhausted(), "{err:?}");
        assert_eq!(err.attempts(), Some(1));
    }

    #[test]
    fn default_is_unbounded() {
        let config = test_config();
        let poller = Poller::new(&config);
        assert!(poller.attempt_limit.is_none(), "{poller:?}");
        assert_eq!(poller.interval, DEFAULT_POLLING_INTERVAL);
    }

    #[test]
    fn custom_interval() -> anyhow::Result<()> {
        let config = test_config();
        let mut client = MockComputeService::new();
        let mut count = 0;
        client
            .expect_get_zone_operation()
            .times(2)
            .returning(move |_: &str, _: &str, _: &str| {
                count += 1;
                if count < 2 { Ok(running()) } else { Ok(done()) }
            });
        let mut sleeper = MockSleeper::new();
        sleeper
            .expect_sleep()
            .with(eq(Duration::from_millis(5)))
            .times(1)
            .return_const(());

        let poller = Poller::new(&config)
            .with_interval(Duration::from_millis(5))
            .with_sleeper(sleeper);
        let got = poller.wait_for_operation(&client, "op-123")?;
        assert!(got.is_done(), "{got:?}");
        Ok(())
    }

    #[test]
    fn query_error_is_not_retried() {
        let config = test_config();
        let mut client = MockComputeService::new();
        client
            .expect_get_zone_operation()
            .times(1)
            .returning(|_: &str, _: &str, _: &str| -> Result<Operation, BoxError> {
                Err("service unavailable".into())
            });
        let mut sleeper = MockSleeper::new();
        sleeper.expect_sleep().never();

        let poller = Poller::new(&config).with_sleeper(sleeper);
        let err = poller.wait_for_operation(&client, "op-123").unwrap_err();
        assert!(err.is_query(), "{err:?}");
        assert!(err.to_string().contains("service unavailable"), "{err}");
    }

    #[test]
    fn thread_sleeper() {
        let start = std::time::Instant::now();
        ThreadSleeper.sleep(Duration::from_millis(10));
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
