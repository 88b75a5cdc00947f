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

//! Errors reported while loading configuration, bootstrapping the host, and
//! waiting for operations.

use crate::BoxError;
use std::process::ExitStatus;

/// A required configuration value is missing or unusable.
///
/// Configuration errors are fatal: the process should stop before any file,
/// network, or subprocess work starts.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct ConfigError(ConfigErrorKind);

impl ConfigError {
    /// The environment variable is not set.
    pub fn is_missing(&self) -> bool {
        matches!(self.0, ConfigErrorKind::Missing(_))
    }

    /// The environment variable is set, but it is not valid unicode.
    pub fn is_not_unicode(&self) -> bool {
        matches!(self.0, ConfigErrorKind::NotUnicode(_))
    }

    /// The name of the offending environment variable.
    pub fn variable(&self) -> &'static str {
        match self.0 {
            ConfigErrorKind::Missing(v) | ConfigErrorKind::NotUnicode(v) => v,
        }
    }

    pub(crate) fn missing(variable: &'static str) -> Self {
        Self(ConfigErrorKind::Missing(variable))
    }

    pub(crate) fn not_unicode(variable: &'static str) -> Self {
        Self(ConfigErrorKind::NotUnicode(variable))
    }
}

#[derive(thiserror::Error, Debug)]
enum ConfigErrorKind {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("environment variable {0} is not valid unicode")]
    NotUnicode(&'static str),
}

/// A bootstrap step failed.
///
/// The error names the failing step, its `Display` output is `failed to
/// <step>`. Use [source()][std::error::Error::source] to find the underlying
/// cause. No later step runs after a `SetupError`, and nothing is cleaned up.
#[derive(thiserror::Error, Debug)]
#[error("failed to {step}")]
pub struct SetupError {
    step: String,
    #[source]
    kind: SetupErrorKind,
}

impl SetupError {
    /// The description of the step that failed.
    pub fn step(&self) -> &str {
        &self.step
    }

    /// A local filesystem operation failed.
    pub fn is_io(&self) -> bool {
        matches!(self.kind, SetupErrorKind::Io(_))
    }

    /// Downloading the SDK archive failed.
    pub fn is_download(&self) -> bool {
        matches!(self.kind, SetupErrorKind::Download(_))
    }

    /// Unpacking the SDK archive failed.
    pub fn is_unpack(&self) -> bool {
        matches!(self.kind, SetupErrorKind::Unpack(_))
    }

    /// A command ran, but did not exit with status zero.
    pub fn is_exit_status(&self) -> bool {
        matches!(self.kind, SetupErrorKind::ExitStatus { .. })
    }

    /// A command could not be started.
    pub fn is_spawn(&self) -> bool {
        matches!(self.kind, SetupErrorKind::Spawn { .. })
    }

    /// The default credentials could not be created.
    pub fn is_credentials(&self) -> bool {
        matches!(self.kind, SetupErrorKind::Credentials(_))
    }

    /// The service client could not be created.
    pub fn is_client(&self) -> bool {
        matches!(self.kind, SetupErrorKind::Client(_))
    }

    /// The exit status of the failed command, if the step ran a command.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        match &self.kind {
            SetupErrorKind::ExitStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn io<S: Into<String>>(step: S, source: std::io::Error) -> Self {
        Self::new(step, SetupErrorKind::Io(source))
    }

    pub(crate) fn download<S: Into<String>>(step: S, source: BoxError) -> Self {
        Self::new(step, SetupErrorKind::Download(source))
    }

    pub(crate) fn unpack<S: Into<String>>(step: S, source: std::io::Error) -> Self {
        Self::new(step, SetupErrorKind::Unpack(source))
    }

    pub(crate) fn exit_status_failure<S, C>(step: S, command: C, status: ExitStatus) -> Self
    where
        S: Into<String>,
        C: Into<String>,
    {
        Self::new(
            step,
            SetupErrorKind::ExitStatus {
                command: command.into(),
                status,
            },
        )
    }

    pub(crate) fn spawn<S, C>(step: S, command: C, source: std::io::Error) -> Self
    where
        S: Into<String>,
        C: Into<String>,
    {
        Self::new(
            step,
            SetupErrorKind::Spawn {
                command: command.into(),
                source,
            },
        )
    }

    pub(crate) fn credentials<S: Into<String>>(step: S, source: BoxError) -> Self {
        Self::new(step, SetupErrorKind::Credentials(source))
    }

    pub(crate) fn client<S: Into<String>>(step: S, source: BoxError) -> Self {
        Self::new(step, SetupErrorKind::Client(source))
    }

    fn new<S: Into<String>>(step: S, kind: SetupErrorKind) -> Self {
        Self {
            step: step.into(),
            kind,
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum SetupErrorKind {
    #[error("local filesystem error: {0}")]
    Io(#[source] std::io::Error),
    #[error("cannot download the archive: {0}")]
    Download(#[source] BoxError),
    #[error("cannot unpack the archive: {0}")]
    Unpack(#[source] std::io::Error),
    #[error("command `{command}` exited with {status}")]
    ExitStatus { command: String, status: ExitStatus },
    #[error("cannot start command `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("cannot obtain default credentials: {0}")]
    Credentials(#[source] BoxError),
    #[error("cannot build the service client: {0}")]
    Client(#[source] BoxError),
}

/// Waiting for a Compute Engine operation failed.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct OperationError(OperationErrorKind);

impl OperationError {
    /// The operation completed, and the service reported an error.
    pub fn is_service(&self) -> bool {
        matches!(self.0, OperationErrorKind::Service { .. })
    }

    /// The request to query the operation status failed.
    pub fn is_query(&self) -> bool {
        matches!(self.0, OperationErrorKind::Query { .. })
    }

    /// The polling loop reached its attempt limit before the operation
    /// completed.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.0, OperationErrorKind::Exhausted { .. })
    }

    /// The name of the operation.
    pub fn operation(&self) -> &str {
        match &self.0 {
            OperationErrorKind::Service { operation, .. }
            | OperationErrorKind::Query { operation, .. }
            | OperationErrorKind::Exhausted { operation, .. } => operation,
        }
    }

    /// The error payload reported by the service, exactly as received.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match &self.0 {
            OperationErrorKind::Service { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// The number of status queries issued before the loop gave up.
    pub fn attempts(&self) -> Option<u32> {
        match &self.0 {
            OperationErrorKind::Exhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    pub(crate) fn service<O: Into<String>>(operation: O, payload: serde_json::Value) -> Self {
        Self(OperationErrorKind::Service {
            operation: operation.into(),
            payload,
        })
    }

    pub(crate) fn query<O: Into<String>>(operation: O, source: BoxError) -> Self {
        Self(OperationErrorKind::Query {
            operation: operation.into(),
            source,
        })
    }

    pub(crate) fn exhausted<O: Into<String>>(operation: O, attempts: u32) -> Self {
        Self(OperationErrorKind::Exhausted {
            operation: operation.into(),
            attempts,
        })
    }
}

#[derive(thiserror::Error, Debug)]
enum OperationErrorKind {
    #[error("operation {operation} completed with error {payload}")]
    Service {
        operation: String,
        payload: serde_json::Value,
    },
    #[error("cannot query the status of operation {operation}: {source}")]
    Query { operation: String, source: BoxError },
    #[error("operation {operation} is still running after {attempts} polling attempts")]
    Exhausted { operation: String, attempts: u32 },
}
