// src/catalogue/remote.rs

//! Update-site backed catalogue
//!
//! The update site does not publish plugin metadata as a separate artifact,
//! so the full archive is fetched and only its manifest entry is kept. The
//! archive body is consumed as a stream; nothing but the manifest is ever
//! buffered. Extracted manifests are cached on disk as
//! `<cache-root>/<name>/MANIFEST-<version>.mf`, so each (name, version)
//! pair is fetched at most once across runs.

use super::manifest::record_from_manifest;
use super::Catalogue;
use crate::error::{Error, Result};
use crate::record::{ArtifactSource, PluginRecord};
use crate::spec::PluginSpec;
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default update site base URL
pub const DEFAULT_UPDATE_SITE: &str = "https://plugins.capstan.dev";

/// Plugin archive file extension
pub const ARCHIVE_EXT: &str = "cpk";

/// Well-known manifest entry path inside a plugin archive
pub const MANIFEST_ENTRY: &str = "META/MANIFEST.mf";

/// Defensive timeout for update-site requests; fetches stay blocking and
/// synchronous
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Catalogue resolving plugin metadata from an update site, with a
/// persistent on-disk manifest cache
pub struct RemoteCatalogue {
    cache_root: PathBuf,
    site: String,
    client: Client,
    memo: RefCell<HashMap<String, PluginRecord>>,
}

impl RemoteCatalogue {
    pub fn new(cache_root: impl Into<PathBuf>, site: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Fetch(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            cache_root: cache_root.into(),
            site: site.into().trim_end_matches('/').to_string(),
            client,
            memo: RefCell::new(HashMap::new()),
        })
    }

    pub fn with_default_site(cache_root: impl Into<PathBuf>) -> Result<Self> {
        Self::new(cache_root, DEFAULT_UPDATE_SITE)
    }

    /// Archive URL for one pinned plugin version
    pub fn archive_url(&self, spec: &PluginSpec) -> String {
        format!(
            "{}/download/plugins/{}/{}/{}.{}",
            self.site, spec.name, spec.version, spec.name, ARCHIVE_EXT
        )
    }

    fn cache_path(&self, spec: &PluginSpec) -> PathBuf {
        self.cache_root
            .join(&spec.name)
            .join(format!("MANIFEST-{}.mf", spec.version))
    }

    /// Fetch the plugin archive and persist its manifest entry at `dest`.
    ///
    /// Redirects are followed transparently. The manifest is streamed out
    /// of the decoding reader into a temp file, then renamed into place.
    fn fetch_manifest(&self, spec: &PluginSpec, dest: &Path) -> Result<()> {
        let url = self.archive_url(spec);
        debug!("fetching {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| Error::Fetch(format!("failed to fetch {url}: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::UnknownPlugin(spec.to_string()));
        }
        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        let mut archive = tar::Archive::new(GzDecoder::new(response));
        let entries = archive
            .entries()
            .map_err(|e| Error::Fetch(format!("failed to read archive from {url}: {e}")))?;

        for entry in entries {
            let mut entry = entry
                .map_err(|e| Error::Fetch(format!("failed to read archive from {url}: {e}")))?;
            let is_manifest = entry
                .path()
                .map(|p| p.as_ref() == Path::new(MANIFEST_ENTRY))
                .unwrap_or(false);
            if !is_manifest {
                continue;
            }

            let temp = dest.with_extension("tmp");
            let mut file = File::create(&temp)?;
            io::copy(&mut entry, &mut file)
                .map_err(|e| Error::Fetch(format!("failed to stream manifest from {url}: {e}")))?;
            fs::rename(&temp, dest)?;
            return Ok(());
        }

        Err(Error::MetadataParse(format!(
            "archive for {spec} has no {MANIFEST_ENTRY} entry"
        )))
    }
}

impl Catalogue for RemoteCatalogue {
    fn resolve(&self, spec: &PluginSpec) -> Result<PluginRecord> {
        let key = spec.to_string();
        if let Some(record) = self.memo.borrow().get(&key) {
            return Ok(record.clone());
        }

        let path = self.cache_path(spec);
        if !path.exists() {
            info!("downloading metadata for {}", key);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            self.fetch_manifest(spec, &path)?;
        }

        let text = fs::read_to_string(&path)?;
        let record = record_from_manifest(
            &text,
            Some(ArtifactSource {
                url: self.archive_url(spec),
            }),
        )?;
        self.memo.borrow_mut().insert(key, record.clone());
        Ok(record)
    }
}
