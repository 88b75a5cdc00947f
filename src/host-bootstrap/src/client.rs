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

//! Capabilities to authenticate and talk to Compute Engine.
//!
//! The bootstrap depends on these traits rather than on the client libraries
//! directly. The real implementations use [google_cloud_auth] and
//! [google_cloud_compute_v1]; tests use fakes.

use crate::BoxError;
use crate::poller::Operation;
use google_cloud_auth::credentials::Credentials;
use google_cloud_compute_v1::client::{Instances, ZoneOperations};

/// Identifies a versioned Google Cloud service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceId {
    pub name: &'static str,
    pub version: &'static str,
}

impl ServiceId {
    /// The Compute Engine API, version `v1`.
    pub const COMPUTE_V1: ServiceId = ServiceId {
        name: "compute",
        version: "v1",
    };
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// Obtains credentials through the standard discovery mechanism.
pub trait CredentialProvider {
    type Credentials;

    /// Returns the application default credentials.
    ///
    /// This is called after `GOOGLE_APPLICATION_CREDENTIALS` points to the
    /// service account key file.
    fn default_credentials(&self) -> Result<Self::Credentials, BoxError>;
}

/// Builds service clients bound to some credentials.
pub trait ComputeServiceFactory<C> {
    type Service: ComputeService;

    fn build(&self, service: ServiceId, credentials: C) -> Result<Self::Service, BoxError>;
}

/// The Compute Engine requests used by this crate.
#[cfg_attr(test, mockall::automock)]
pub trait ComputeService {
    /// Fetches the current state of a zonal operation.
    fn get_zone_operation(
        &self,
        project: &str,
        zone: &str,
        operation: &str,
    ) -> Result<Operation, BoxError>;
}

/// Credentials bound to the runtime that refreshes their tokens.
///
/// The credentials spawn their token refresh task when they are created, so
/// they must be created inside a runtime and used by clients driven on that
/// same runtime. [GoogleComputeFactory] moves the runtime into the
/// [GoogleCompute] it builds.
pub struct ComputeCredentials {
    runtime: tokio::runtime::Runtime,
    credentials: Credentials,
}

impl ComputeCredentials {
    /// Creates a private runtime and calls `builder` inside it.
    ///
    /// # Example
    /// ```
    /// # use gce_host_bootstrap::ComputeCredentials;
    /// use google_cloud_auth::credentials::anonymous::Builder;
    /// let credentials = ComputeCredentials::with_runtime(|| Ok(Builder::new().build()))?;
    /// # Ok::<(), gce_host_bootstrap::BoxError>(())
    /// ```
    pub fn with_runtime<F>(builder: F) -> Result<Self, BoxError>
    where
        F: FnOnce() -> Result<Credentials, BoxError>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let credentials = {
            let _guard = runtime.enter();
            builder()?
        };
        Ok(Self {
            runtime,
            credentials,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

impl std::fmt::Debug for ComputeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeCredentials")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

/// Uses [google_cloud_auth] application default credentials.
#[derive(Clone, Debug, Default)]
pub struct AdcCredentialProvider;

impl CredentialProvider for AdcCredentialProvider {
    type Credentials = ComputeCredentials;

    fn default_credentials(&self) -> Result<Self::Credentials, BoxError> {
        ComputeCredentials::with_runtime(|| {
            let credentials = google_cloud_auth::credentials::Builder::default().build()?;
            Ok(credentials)
        })
    }
}

/// Builds [GoogleCompute] clients.
#[derive(Clone, Debug, Default)]
pub struct GoogleComputeFactory {
    endpoint: Option<String>,
}

impl GoogleComputeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends the requests to `v` instead of the default Compute Engine
    /// endpoint.
    pub fn with_endpoint<V: Into<String>>(mut self, v: V) -> Self {
        self.endpoint = Some(v.into());
        self
    }
}

impl ComputeServiceFactory<ComputeCredentials> for GoogleComputeFactory {
    type Service = GoogleCompute;

    fn build(
        &self,
        service: ServiceId,
        credentials: ComputeCredentials,
    ) -> Result<Self::Service, BoxError> {
        if service != ServiceId::COMPUTE_V1 {
            return Err(format!(
                "unsupported service {service}, only {} is available",
                ServiceId::COMPUTE_V1
            )
            .into());
        }
        let ComputeCredentials {
            runtime,
            credentials,
        } = credentials;
        let mut zone_operations = ZoneOperations::builder().with_credentials(credentials.clone());
        let mut instances = Instances::builder().with_credentials(credentials.clone());
        if let Some(endpoint) = &self.endpoint {
            zone_operations = zone_operations.with_endpoint(endpoint);
            instances = instances.with_endpoint(endpoint);
        }
        let zone_operations = runtime.block_on(zone_operations.build())?;
        let instances = runtime.block_on(instances.build())?;
        Ok(GoogleCompute {
            runtime,
            credentials,
            zone_operations,
            instances,
        })
    }
}

/// A blocking, authenticated Compute Engine client.
///
/// The underlying client libraries are asynchronous. Each call is driven to
/// completion on a private, single-threaded runtime, the same runtime that
/// refreshes the credentials.
///
/// The [instances()][GoogleCompute::instances] and
/// [zone_operations()][GoogleCompute::zone_operations] clients are ready to
/// use. Other Compute Engine clients can be built with
/// [credentials()][GoogleCompute::credentials] and driven with
/// [block_on()][GoogleCompute::block_on].
///
/// # Example
/// ```no_run
/// # use gce_host_bootstrap::{GoogleCompute, Poller};
/// # fn sample(compute: &GoogleCompute, poller: &Poller) -> anyhow::Result<()> {
/// use google_cloud_compute_v1::model::Instance;
/// let operation = compute.block_on(
///     compute
///         .instances()
///         .insert()
///         .set_project("my-project")
///         .set_zone("us-central1-f")
///         .set_body(Instance::new().set_name("rancher-server"))
///         .send(),
/// )?;
/// if let Some(name) = operation.name {
///     poller.wait_for_operation(compute, &name)?;
/// }
/// # Ok(()) }
/// ```
pub struct GoogleCompute {
    runtime: tokio::runtime::Runtime,
    credentials: Credentials,
    zone_operations: ZoneOperations,
    instances: Instances,
}

impl GoogleCompute {
    /// The credentials used by all the clients.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn instances(&self) -> &Instances {
        &self.instances
    }

    /// The zone operations client, for requests not covered by
    /// [ComputeService].
    pub fn zone_operations(&self) -> &ZoneOperations {
        &self.zone_operations
    }

    /// Runs `future` to completion, e.g. a request built with
    /// [instances()][GoogleCompute::instances].
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

impl std::fmt::Debug for GoogleCompute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCompute")
            .field("service", &ServiceId::COMPUTE_V1)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl ComputeService for GoogleCompute {
    fn get_zone_operation(
        &self,
        project: &str,
        zone: &str,
        operation: &str,
    ) -> Result<Operation, BoxError> {
        let response = self.runtime.block_on(
            self.zone_operations
                .get()
                .set_project(project)
                .set_zone(zone)
                .set_operation(operation)
                .send(),
        )?;
        let json = serde_json::to_value(&response)?;
        Ok(serde_json::from_value(json)?)
    }
}
