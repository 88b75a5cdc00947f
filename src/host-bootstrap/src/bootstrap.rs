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

//! The host bootstrap sequence.

use crate::client::{ComputeServiceFactory, CredentialProvider, ServiceId};
use crate::command::{
    CommandRunner, EffectiveUser, Environment, Invocation, ProcessEnvironment, SystemRunner,
    UserIdentity,
};
use crate::config::Config;
use crate::errors::SetupError;
use crate::packages::{ESCALATION_WRAPPER, client_library_steps};
use crate::poller::{Sleeper, ThreadSleeper};
use crate::sdk::{
    DEFAULT_SDK_ARCHIVE, DEFAULT_SDK_BASE_URL, DEFAULT_SDK_DIRECTORY, Downloader, HttpDownloader,
    SdkLayout, TarGzUnpacker, Unpacker,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Disables interactive prompts in the Cloud SDK installer and `gcloud`.
pub const DISABLE_PROMPTS_VAR: &str = "CLOUDSDK_CORE_DISABLE_PROMPTS";

/// Points application default credentials at a key file.
pub const CREDENTIALS_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

pub const DEFAULT_KEY_FILE: &str = "servicekey.json";

pub const DEFAULT_CLIENT_LIBRARY: &str = "google-api-python-client";

/// How long to wait after the client library is installed, before it is used.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(10);

const WRITE_KEY_STEP: &str = "write service account key";

/// Prepares the host and returns an authenticated Compute Engine client.
///
/// Create instances with [Bootstrapper::builder]. The defaults run the real
/// commands on the current host, in the current directory.
pub struct Bootstrapper<'a, P, F> {
    config: &'a Config,
    credential_provider: P,
    service_factory: F,
    work_dir: PathBuf,
    sdk_base_url: String,
    sdk_archive: String,
    sdk_directory: String,
    key_file_name: String,
    client_library: String,
    settle_delay: Duration,
    runner: Box<dyn CommandRunner + 'a>,
    downloader: Box<dyn Downloader + 'a>,
    unpacker: Box<dyn Unpacker + 'a>,
    identity: Box<dyn UserIdentity + 'a>,
    environment: Box<dyn Environment + 'a>,
    sleeper: Box<dyn Sleeper + 'a>,
}

impl<'a, P, F> Bootstrapper<'a, P, F>
where
    P: CredentialProvider,
    F: ComputeServiceFactory<P::Credentials>,
{
    /// Starts building a bootstrapper for `config`.
    ///
    /// `credential_provider` discovers the credentials once the key file is in
    /// place, and `service_factory` creates the client returned by
    /// [initialize()][Bootstrapper::initialize].
    pub fn builder(
        config: &'a Config,
        credential_provider: P,
        service_factory: F,
    ) -> BootstrapperBuilder<'a, P, F> {
        BootstrapperBuilder::new(config, credential_provider, service_factory)
    }

    /// Runs the bootstrap sequence.
    ///
    /// Each step must succeed before the next one starts. On failure the
    /// sequence stops, the error names the failed step, and any files
    /// created so far are left in place. Nothing is retried.
    pub fn initialize(&self) -> Result<F::Service, SetupError> {
        let key_file = self.write_key_file()?;

        tracing::info!("install gcloud ...");
        self.install_sdk(&key_file)?;

        tracing::info!("install {} ...", self.client_library);
        self.install_client_library()?;

        self.environment.set_var(CREDENTIALS_VAR, key_file.as_os_str());
        let credentials = self
            .credential_provider
            .default_credentials()
            .map_err(|e| SetupError::credentials("obtain the default credentials", e))?;

        tracing::info!("getting gce compute service ...");
        let service = ServiceId::COMPUTE_V1;
        self.service_factory
            .build(service, credentials)
            .map_err(|e| SetupError::client(format!("build the {service} service client"), e))
    }

    /// The location of the service account key file.
    pub fn key_file(&self) -> PathBuf {
        self.work_dir.join(&self.key_file_name)
    }

    /// The URL of the Cloud SDK archive.
    pub fn sdk_url(&self) -> String {
        format!("{}{}", self.sdk_base_url, self.sdk_archive)
    }

    fn write_key_file(&self) -> Result<PathBuf, SetupError> {
        let path =
            std::path::absolute(self.key_file()).map_err(|e| SetupError::io(WRITE_KEY_STEP, e))?;
        std::fs::write(&path, self.config.service_key_json.as_bytes())
            .map_err(|e| SetupError::io(WRITE_KEY_STEP, e))?;
        tracing::debug!("service account key written to {}", path.display());
        Ok(path)
    }

    fn install_sdk(&self, key_file: &Path) -> Result<(), SetupError> {
        let url = self.sdk_url();
        let archive = self.work_dir.join(&self.sdk_archive);
        self.downloader
            .download(&url, &archive)
            .map_err(|e| SetupError::download(format!("download {url}"), e))?;

        self.unpacker
            .unpack(&archive, &self.work_dir)
            .map_err(|e| SetupError::unpack(format!("unpack {}", archive.display()), e))?;
        tracing::info!("Extracted to {}", self.work_dir.display());

        let sdk = SdkLayout::new(self.work_dir.join(&self.sdk_directory));
        self.environment.set_var(DISABLE_PROMPTS_VAR, OsStr::new("1"));
        self.run_step(
            Invocation::from_path(sdk.install_script()),
            &format!("{}/install.sh", self.sdk_directory),
        )?;

        let gcloud = sdk.gcloud();
        self.run_step(
            Invocation::from_path(&gcloud)
                .args(["auth", "activate-service-account", "--key-file"])
                .arg(key_file.as_os_str()),
            "gcloud auth activate-service-account",
        )?;
        self.run_step(
            Invocation::from_path(&gcloud)
                .args(["config", "set", "project"])
                .arg(&self.config.gce_project_name),
            "gcloud config set project",
        )?;
        self.run_step(
            Invocation::from_path(&gcloud).args(["components", "update"]),
            "gcloud components update",
        )
    }

    fn install_client_library(&self) -> Result<(), SetupError> {
        let escalate = !self.identity.is_superuser();
        if escalate {
            tracing::info!("not running as the superuser, package commands use {ESCALATION_WRAPPER}");
        }
        for s in client_library_steps(&self.client_library, escalate) {
            self.run_step(s.invocation, s.step)?;
        }
        self.sleeper.sleep(self.settle_delay);
        Ok(())
    }

    // Success is determined by the exit status alone.
    fn run_step(&self, invocation: Invocation, step: &str) -> Result<(), SetupError> {
        tracing::debug!("running {invocation}");
        let status = self
            .runner
            .run(&invocation)
            .map_err(|e| SetupError::spawn(step, invocation.to_string(), e))?;
        if status.success() {
            return Ok(());
        }
        tracing::warn!("{invocation} exited with {status}");
        Err(SetupError::exit_status_failure(
            step,
            invocation.to_string(),
            status,
        ))
    }
}

impl<P, F> std::fmt::Debug for Bootstrapper<'_, P, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrapper")
            .field("config", &self.config)
            .field("work_dir", &self.work_dir)
            .field("sdk_base_url", &self.sdk_base_url)
            .field("sdk_archive", &self.sdk_archive)
            .field("sdk_directory", &self.sdk_directory)
            .field("key_file_name", &self.key_file_name)
            .field("client_library", &self.client_library)
            .field("settle_delay", &self.settle_delay)
            .finish_non_exhaustive()
    }
}

/// Configures a [Bootstrapper].
///
/// # Example
/// ```
/// # use gce_host_bootstrap::*;
/// # fn sample(config: &Config) {
/// let factory = GoogleComputeFactory::new();
/// let bootstrapper = Bootstrapper::builder(config, AdcCredentialProvider, factory)
///     .with_work_dir("/var/lib/rancher-tests")
///     .with_client_library("google-api-python-client")
///     .build();
/// assert_eq!(
///     bootstrapper.key_file(),
///     std::path::Path::new("/var/lib/rancher-tests/servicekey.json")
/// );
/// # }
/// ```
pub struct BootstrapperBuilder<'a, P, F> {
    inner: Bootstrapper<'a, P, F>,
}

impl<'a, P, F> BootstrapperBuilder<'a, P, F>
where
    P: CredentialProvider,
    F: ComputeServiceFactory<P::Credentials>,
{
    fn new(config: &'a Config, credential_provider: P, service_factory: F) -> Self {
        Self {
            inner: Bootstrapper {
                config,
                credential_provider,
                service_factory,
                work_dir: PathBuf::from("."),
                sdk_base_url: DEFAULT_SDK_BASE_URL.to_string(),
                sdk_archive: DEFAULT_SDK_ARCHIVE.to_string(),
                sdk_directory: DEFAULT_SDK_DIRECTORY.to_string(),
                key_file_name: DEFAULT_KEY_FILE.to_string(),
                client_library: DEFAULT_CLIENT_LIBRARY.to_string(),
                settle_delay: DEFAULT_SETTLE_DELAY,
                runner: Box::new(SystemRunner),
                downloader: Box::new(HttpDownloader),
                unpacker: Box::new(TarGzUnpacker),
                identity: Box::new(EffectiveUser),
                environment: Box::new(ProcessEnvironment),
                sleeper: Box::new(ThreadSleeper),
            },
        }
    }

    /// The directory receiving the key file, the archive, and the SDK.
    pub fn with_work_dir<D: Into<PathBuf>>(mut self, v: D) -> Self {
        self.inner.work_dir = v.into();
        self
    }

    /// The URL prefix for the SDK archive, including the trailing `/`.
    pub fn with_sdk_base_url<V: Into<String>>(mut self, v: V) -> Self {
        self.inner.sdk_base_url = v.into();
        self
    }

    pub fn with_sdk_archive<V: Into<String>>(mut self, v: V) -> Self {
        self.inner.sdk_archive = v.into();
        self
    }

    /// The name of the directory created by unpacking the SDK archive.
    pub fn with_sdk_directory<V: Into<String>>(mut self, v: V) -> Self {
        self.inner.sdk_directory = v.into();
        self
    }

    pub fn with_key_file_name<V: Into<String>>(mut self, v: V) -> Self {
        self.inner.key_file_name = v.into();
        self
    }

    /// The package installed with `pip`.
    pub fn with_client_library<V: Into<String>>(mut self, v: V) -> Self {
        self.inner.client_library = v.into();
        self
    }

    pub fn with_settle_delay(mut self, v: Duration) -> Self {
        self.inner.settle_delay = v;
        self
    }

    pub fn with_runner<R: CommandRunner + 'a>(mut self, v: R) -> Self {
        self.inner.runner = Box::new(v);
        self
    }

    pub fn with_downloader<D: Downloader + 'a>(mut self, v: D) -> Self {
        self.inner.downloader = Box::new(v);
        self
    }

    pub fn with_unpacker<U: Unpacker + 'a>(mut self, v: U) -> Self {
        self.inner.unpacker = Box::new(v);
        self
    }

    pub fn with_identity<U: UserIdentity + 'a>(mut self, v: U) -> Self {
        self.inner.identity = Box::new(v);
        self
    }

    pub fn with_environment<E: Environment + 'a>(mut self, v: E) -> Self {
        self.inner.environment = Box::new(v);
        self
    }

    pub fn with_sleeper<S: Sleeper + 'a>(mut self, v: S) -> Self {
        self.inner.sleeper = Box::new(v);
        self
    }

    pub fn build(self) -> Bootstrapper<'a, P, F> {
        self.inner
    }
}
