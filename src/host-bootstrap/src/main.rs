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

//! Bootstraps the current host, then waits for Compute Engine operations.

const DESCRIPTION: &str = concat!(
    "Installs the Google Cloud SDK and a client library on the current host,",
    " authenticates both with the service account key in GCE_SERVICE_KEY_JSON,",
    " and creates a Compute Engine client. Optionally waits for zonal operations",
    " to finish, printing each operation as a JSON line."
);

use clap::Parser;
use gce_host_bootstrap::{AdcCredentialProvider, Bootstrapper, Config, GoogleComputeFactory, Poller};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    enable_tracing();

    let args = Args::parse();
    tracing::info!("{args:?}");
    let config = Config::from_env()?;

    let factory = GoogleComputeFactory::new();
    let compute = Bootstrapper::builder(&config, AdcCredentialProvider, factory)
        .with_work_dir(&args.work_dir)
        .with_client_library(&args.client_library)
        .build()
        .initialize()?;

    let poller = Poller::new(&config).with_interval(Duration::from_secs(args.poll_interval));
    for name in &args.wait_for {
        let operation = poller.wait_for_operation(&compute, name)?;
        println!("{}", serde_json::to_string(&operation)?);
    }
    tracing::info!("DONE");
    Ok(())
}

fn enable_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Prepares a GCE test host.
#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = DESCRIPTION)]
struct Args {
    /// The directory receiving the key file, the SDK archive, and the SDK.
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// The client library installed with `pip`.
    #[arg(long, default_value = gce_host_bootstrap::bootstrap::DEFAULT_CLIENT_LIBRARY)]
    client_library: String,

    /// The name of a zonal operation to wait for.
    ///
    /// The operation must be in the project and zone of the configuration.
    /// Repeat the flag to wait for several operations, in order.
    #[arg(long)]
    wait_for: Vec<String>,

    /// The number of seconds between operation status queries.
    #[arg(long, default_value_t = 10)]
    poll_interval: u64,
}
