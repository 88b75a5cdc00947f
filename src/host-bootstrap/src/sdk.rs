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

//! Downloading and unpacking the Google Cloud SDK.

use crate::BoxError;
use std::path::{Path, PathBuf};

/// The download location for Cloud SDK release archives.
pub const DEFAULT_SDK_BASE_URL: &str =
    "https://dl.google.com/dl/cloudsdk/channels/rapid/downloads/";

/// The Cloud SDK release installed on the host.
pub const DEFAULT_SDK_ARCHIVE: &str = "google-cloud-sdk-119.0.0-linux-x86_64.tar.gz";

/// The directory created when the SDK archive is unpacked.
pub const DEFAULT_SDK_DIRECTORY: &str = "google-cloud-sdk";

/// Where the SDK lives once it is unpacked.
#[derive(Clone, Debug, PartialEq)]
pub struct SdkLayout {
    root: PathBuf,
}

impl SdkLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The installer script shipped with the SDK.
    pub fn install_script(&self) -> PathBuf {
        self.root.join("install.sh")
    }

    /// The `gcloud` command line tool.
    pub fn gcloud(&self) -> PathBuf {
        self.root.join("bin").join("gcloud")
    }
}

/// Fetches a URL into a local file.
pub trait Downloader: std::fmt::Debug {
    /// Downloads `url` into `destination`, replacing any existing file.
    fn download(&self, url: &str, destination: &Path) -> Result<(), BoxError>;
}

/// Downloads over HTTP(S) with a blocking [reqwest] client.
///
/// Responses with a non-success HTTP status are errors.
#[derive(Clone, Debug, Default)]
pub struct HttpDownloader;

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, destination: &Path) -> Result<(), BoxError> {
        // The client, and its background thread, only live for this call.
        let client = reqwest::blocking::Client::builder().build()?;
        let mut response = client.get(url).send()?.error_for_status()?;
        let mut file = std::fs::File::create(destination)?;
        let bytes = response.copy_to(&mut file)?;
        tracing::debug!("downloaded {bytes} bytes from {url} to {}", destination.display());
        Ok(())
    }
}

/// Unpacks an archive.
pub trait Unpacker: std::fmt::Debug {
    /// Unpacks `archive` into the `destination` directory.
    fn unpack(&self, archive: &Path, destination: &Path) -> std::io::Result<()>;
}

/// Unpacks gzip-compressed tarballs.
#[derive(Clone, Debug, Default)]
pub struct TarGzUnpacker;

impl Unpacker for TarGzUnpacker {
    fn unpack(&self, archive: &Path, destination: &Path) -> std::io::Result<()> {
        let file = std::fs::File::open(archive)?;
        let decoder = flate2::read::GzDecoder::new(file);
        let mut archive = tar::Archive::new(decoder);
        archive.unpack(destination)
    }
}
