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

//! The package manager commands that install the client library.

use crate::command::Invocation;

/// Prepended to package commands when the process is not the superuser.
pub(crate) const ESCALATION_WRAPPER: &str = "sudo";

/// A command and the step description reported when it fails.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PackageStep {
    pub invocation: Invocation,
    pub step: &'static str,
}

/// Returns the commands to refresh the package index, install pip, upgrade
/// pip, and install or upgrade `client_library`, in that order.
///
/// When `escalate` is true every command runs through [ESCALATION_WRAPPER].
pub(crate) fn client_library_steps(client_library: &str, escalate: bool) -> Vec<PackageStep> {
    let steps = [
        (
            Invocation::new("apt-get").arg("update"),
            "apt-get update",
        ),
        (
            Invocation::new("apt-get").args(["install", "-y", "python-pip"]),
            "apt-get install -y python-pip",
        ),
        (
            Invocation::new("pip").args(["install", "--upgrade", "pip"]),
            "pip install --upgrade pip",
        ),
        (
            Invocation::new("pip").args(["install", "--upgrade", client_library]),
            "pip install python client",
        ),
    ];
    steps
        .into_iter()
        .map(|(invocation, step)| PackageStep {
            invocation: if escalate {
                invocation.wrapped_by(ESCALATION_WRAPPER)
            } else {
                invocation
            },
            step,
        })
        .collect()
}
