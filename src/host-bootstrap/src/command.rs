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

//! Seams for the host effects of the bootstrap: running commands, checking
//! the current user, and updating the process environment.

use std::ffi::OsString;
use std::path::Path;
use std::process::ExitStatus;

/// A command line: a program and its arguments.
///
/// Invocations are executed directly, not through a shell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new<P: Into<OsString>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Creates an invocation for an executable at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self::new(path.as_ref().as_os_str())
    }

    pub fn arg<A: Into<OsString>>(mut self, arg: A) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        args.into_iter().fold(self, |i, a| i.arg(a))
    }

    /// Runs the same command line through `wrapper`, e.g. `sudo`.
    pub fn wrapped_by<W: Into<OsString>>(self, wrapper: W) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: wrapper.into(),
            args,
        }
    }

    pub fn program(&self) -> &OsString {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for a in &self.args {
            write!(f, " {}", a.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Runs external commands.
///
/// Only the exit status is reported, the bootstrap does not inspect the
/// output of any command.
pub trait CommandRunner: std::fmt::Debug {
    /// Runs `invocation` to completion.
    ///
    /// Returns an error only if the command could not be started or waited
    /// on. A command that runs and fails is reported through its exit status.
    fn run(&self, invocation: &Invocation) -> std::io::Result<ExitStatus>;
}

/// Runs commands as child processes with inherited stdio.
#[derive(Clone, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<ExitStatus> {
        std::process::Command::new(invocation.program())
            .args(invocation.get_args())
            .status()
    }
}

/// Determines the privileges of the current process.
pub trait UserIdentity: std::fmt::Debug {
    /// Returns true if the process already runs as the superuser.
    fn is_superuser(&self) -> bool;
}

/// Checks the effective user id of the process.
#[derive(Clone, Debug, Default)]
pub struct EffectiveUser;

impl UserIdentity for EffectiveUser {
    fn is_superuser(&self) -> bool {
        nix::unistd::Uid::effective().is_root()
    }
}

/// Updates the environment observed by later steps and child processes.
pub trait Environment: std::fmt::Debug {
    fn set_var(&self, key: &str, value: &std::ffi::OsStr);
}

/// Updates the environment of the current process.
///
/// Child processes started afterwards inherit the new values.
#[derive(Clone, Debug, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn set_var(&self, key: &str, value: &std::ffi::OsStr) {
        // SAFETY: the bootstrap is the only code running while it sets
        // variables; no other thread reads or writes the environment.
        unsafe { std::env::set_var(key, value) }
    }
}
