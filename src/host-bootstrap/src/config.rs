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

//! Process configuration for the host bootstrap.

use crate::errors::ConfigError;

pub const PACKET_AUTH_TOKEN_VAR: &str = "PACKET_RANCHER_AUTH_TOKEN";
pub const PACKET_PROJECT_ID_VAR: &str = "PACKET_RANCHER_PROJECT_ID";
pub const SERVICE_KEY_JSON_VAR: &str = "GCE_SERVICE_KEY_JSON";
pub const GCE_PROJECT_NAME_VAR: &str = "GCE_RANCHER_PROJECT_NAME";
pub const GCE_PROJECT_ZONE_VAR: &str = "GCE_RANCHER_PROJECT_ZONE";
pub const NFS_SERVER_NAME_VAR: &str = "GCE_NFS_SERVER_NAME";
pub const RANCHER_SERVER_NAME_VAR: &str = "GCE_RANCHER_SERVER_NAME";
pub const PACKET_HOST_NAMES_VAR: &str = "PACKET_HOST_NAMES";

/// All the variables that must be present, in the order they are checked.
pub const REQUIRED_VARS: [&str; 8] = [
    PACKET_AUTH_TOKEN_VAR,
    PACKET_PROJECT_ID_VAR,
    SERVICE_KEY_JSON_VAR,
    GCE_PROJECT_NAME_VAR,
    GCE_PROJECT_ZONE_VAR,
    NFS_SERVER_NAME_VAR,
    RANCHER_SERVER_NAME_VAR,
    PACKET_HOST_NAMES_VAR,
];

/// The settings shared by the bootstrapper, the poller, and the code that
/// drives the test environment.
///
/// Build it once at process entry, with [Config::from_env], and pass it by
/// reference. All fields are required; the values never change after the
/// configuration is loaded.
#[derive(Clone, PartialEq)]
pub struct Config {
    /// The auth token for the Packet API.
    pub packet_auth_token: String,
    /// The Packet project hosting the bare-metal test hosts.
    pub packet_project_id: String,
    /// The JSON service account key, as raw (possibly multi-line) text.
    pub service_key_json: String,
    /// The GCE project used by the Rancher test environment.
    pub gce_project_name: String,
    /// The GCE zone used by the Rancher test environment.
    pub gce_project_zone: String,
    /// The name of the GCE VM serving NFS volumes.
    pub nfs_server_name: String,
    /// The name of the GCE VM running the Rancher server.
    pub rancher_server_name: String,
    /// The Packet host names, in the order they were listed.
    pub packet_host_names: Vec<String>,
}

impl Config {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|name| match std::env::var(name) {
            Ok(v) => Ok(Some(v)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::not_unicode(name)),
        })
    }

    /// Loads the configuration using `lookup` to find each variable.
    ///
    /// # Example
    /// ```
    /// # use gce_host_bootstrap::Config;
    /// use std::collections::HashMap;
    /// let vars = HashMap::from([
    ///     ("PACKET_RANCHER_AUTH_TOKEN", "token"),
    ///     ("PACKET_RANCHER_PROJECT_ID", "packet-project"),
    ///     ("GCE_SERVICE_KEY_JSON", "{}"),
    ///     ("GCE_RANCHER_PROJECT_NAME", "gce-project"),
    ///     ("GCE_RANCHER_PROJECT_ZONE", "us-central1-f"),
    ///     ("GCE_NFS_SERVER_NAME", "nfs"),
    ///     ("GCE_RANCHER_SERVER_NAME", "rancher"),
    ///     ("PACKET_HOST_NAMES", "host-1,host-2"),
    /// ]);
    /// let config = Config::from_lookup(|name| vars.get(name).map(|v| v.to_string()))?;
    /// assert_eq!(config.packet_host_names, vec!["host-1", "host-2"]);
    /// # Ok::<(), gce_host_bootstrap::ConfigError>(())
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        Self::load(|name| Ok(lookup(name)))
    }

    fn load<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Result<Option<String>, ConfigError>,
    {
        let required = |name: &'static str| lookup(name)?.ok_or_else(|| ConfigError::missing(name));
        Ok(Self {
            packet_auth_token: required(PACKET_AUTH_TOKEN_VAR)?,
            packet_project_id: required(PACKET_PROJECT_ID_VAR)?,
            service_key_json: required(SERVICE_KEY_JSON_VAR)?,
            gce_project_name: required(GCE_PROJECT_NAME_VAR)?,
            gce_project_zone: required(GCE_PROJECT_ZONE_VAR)?,
            nfs_server_name: required(NFS_SERVER_NAME_VAR)?,
            rancher_server_name: required(RANCHER_SERVER_NAME_VAR)?,
            packet_host_names: split_host_names(&required(PACKET_HOST_NAMES_VAR)?),
        })
    }
}

// Empty segments are kept, "a,,b" is three host names.
fn split_host_names(value: &str) -> Vec<String> {
    value.split(',').map(str::to_string).collect()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("packet_auth_token", &"[censored]")
            .field("packet_project_id", &self.packet_project_id)
            .field("service_key_json", &"[censored]")
            .field("gce_project_name", &self.gce_project_name)
            .field("gce_project_zone", &self.gce_project_zone)
            .field("nfs_server_name", &self.nfs_server_name)
            .field("rancher_server_name", &self.rancher_server_name)
            .field("packet_host_names", &self.packet_host_names)
            .finish()
    }
}
