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

//! Prepares a test host with the Google Cloud SDK and an authenticated
//! Compute Engine client.
//!
//! The host bootstrap runs once, in a single flow of control:
//!
//! 1. the service account key from [Config] is written to a credential file,
//! 2. the Cloud SDK archive is downloaded, unpacked, installed and
//!    authenticated with `gcloud`,
//! 3. the client library is installed with the OS package manager,
//! 4. application default credentials are pointed at the key file and used to
//!    build a `compute` (`v1`) client.
//!
//! The client returned by [Bootstrapper::initialize] can then be used with a
//! [Poller] to block until a zonal Compute Engine operation completes.
//!
//! Every external effect goes through a small trait ([CommandRunner],
//! [Downloader], [Unpacker], [UserIdentity], [Environment], [Sleeper],
//! [CredentialProvider], [ComputeServiceFactory]) so the sequence can be
//! exercised without touching the host.
//!
//! # Example
//! ```no_run
//! use gce_host_bootstrap::{AdcCredentialProvider, Bootstrapper, Config, GoogleComputeFactory, Poller};
//! # fn sample() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let factory = GoogleComputeFactory::new();
//! let compute = Bootstrapper::builder(&config, AdcCredentialProvider, factory)
//!     .build()
//!     .initialize()?;
//! let operation = Poller::new(&config).wait_for_operation(&compute, "operation-123")?;
//! println!("{operation:?}");
//! # Ok(()) }
//! ```

pub mod bootstrap;
pub mod client;
pub mod command;
pub mod config;
pub mod errors;
pub mod poller;
pub mod sdk;

pub(crate) mod packages;

pub use bootstrap::{Bootstrapper, BootstrapperBuilder};
pub use client::{
    AdcCredentialProvider, ComputeCredentials, ComputeService, ComputeServiceFactory,
    CredentialProvider, GoogleCompute, GoogleComputeFactory, ServiceId,
};
pub use command::{
    CommandRunner, EffectiveUser, Environment, Invocation, ProcessEnvironment, SystemRunner,
    UserIdentity,
};
pub use config::Config;
pub use errors::{ConfigError, OperationError, SetupError};
pub use poller::{Operation, Poller, Sleeper, ThreadSleeper};
pub use sdk::{Downloader, HttpDownloader, TarGzUnpacker, Unpacker};

/// The error type used by the service seams.
///
/// The crate does not interpret these errors, it wraps them in [SetupError]
/// or [OperationError].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
