//! Serialisable snapshot of a registry and its on-disk cache.
//!
//! A [`RegistryManifest`] records which bootstrappers a deployment declares:
//! the eager list and the lazy binding table. [`ManifestCache`] persists the
//! manifest as JSON so a later start can tell whether the declared set
//! changed and rebuild a catalog without re-running discovery.

use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tempfile::Builder;
use thiserror::Error;
use tracing::debug;

use crate::bootstrapper::BootstrapperId;
use crate::registry::{BootstrapperRegistry, LazyBindingTable};

const MANIFEST_TARGET: &str = "kindle_bootstrap::manifest";

/// Declared eager bootstrappers and lazy bindings of a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryManifest {
    /// Bootstrappers dispatched unconditionally, in order.
    #[serde(default)]
    pub eager: Vec<BootstrapperId>,
    /// Lazily bound keys and the bootstrappers behind them.
    #[serde(default)]
    pub lazy: LazyBindingTable,
}

impl RegistryManifest {
    /// Captures the declarations of any registry.
    #[must_use]
    pub fn capture<R: BootstrapperRegistry + ?Sized>(registry: &R) -> Self {
        Self {
            eager: registry.eager_bootstrappers(),
            lazy: registry.lazy_bootstrapper_bindings(),
        }
    }
}

/// Errors raised while reading or writing the manifest cache.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The cache file exists but could not be read.
    #[error("failed to read manifest cache {path}: {source}")]
    Read {
        /// Cache location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The cache file or its directory could not be written.
    #[error("failed to write manifest cache {path}: {source}")]
    Write {
        /// Cache location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The cache file does not hold a valid manifest.
    #[error("manifest cache {path} is malformed: {source}")]
    Parse {
        /// Cache location.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The manifest could not be encoded.
    #[error("failed to encode manifest: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// JSON file holding the last stored [`RegistryManifest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestCache {
    path: Utf8PathBuf,
}

impl ManifestCache {
    /// Creates a cache backed by `path`. Nothing is touched on disk.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the cache file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Reads the stored manifest, returning `None` when no cache exists.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Read`] or [`ManifestError::Parse`].
    pub fn load(&self) -> Result<Option<RegistryManifest>, ManifestError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ManifestError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| ManifestError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Replaces the stored manifest, creating parent directories as needed.
    ///
    /// The file is written to a temporary sibling and renamed into place, so
    /// readers never observe a partial manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Serialize`] or [`ManifestError::Write`].
    pub fn store(&self, manifest: &RegistryManifest) -> Result<(), ManifestError> {
        let encoded = serde_json::to_vec_pretty(manifest).map_err(ManifestError::Serialize)?;
        self.write_atomically(&encoded)
            .map_err(|source| ManifestError::Write {
                path: self.path.clone(),
                source,
            })?;
        debug!(
            target: MANIFEST_TARGET,
            path = %self.path,
            eager = manifest.eager.len(),
            lazy = manifest.lazy.len(),
            "manifest stored"
        );
        Ok(())
    }

    /// Whether the stored manifest equals `manifest`. A missing cache never
    /// matches.
    ///
    /// # Errors
    ///
    /// See [`ManifestCache::load`].
    pub fn matches(&self, manifest: &RegistryManifest) -> Result<bool, ManifestError> {
        Ok(self.load()?.as_ref() == Some(manifest))
    }

    /// Stores `manifest` unless the cache already holds it. Returns whether
    /// the file was written.
    ///
    /// # Errors
    ///
    /// See [`ManifestCache::load`] and [`ManifestCache::store`].
    pub fn refresh(&self, manifest: &RegistryManifest) -> Result<bool, ManifestError> {
        if self.matches(manifest)? {
            return Ok(false);
        }
        self.store(manifest)?;
        Ok(true)
    }

    /// Deletes the cache file. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Write`] when removal fails.
    pub fn clear(&self) -> Result<(), ManifestError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ManifestError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_atomically(&self, contents: &[u8]) -> io::Result<()> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        fs::create_dir_all(directory)?;

        let mut builder = Builder::new();
        builder.prefix(self.path.file_name().unwrap_or("manifest"));
        let mut file = builder.tempfile_in(directory)?;
        file.write_all(contents)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|error| error.error)?;
        Ok(())
    }
}
