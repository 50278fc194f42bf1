/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Vault loader: reads GDF files from disk into a [`Registry`].
//!
//! Every candidate file passes the same gates, in order, before its content
//! is parsed:
//!
//! 1. plain file name (no separators, no `..`, not hidden, no control bytes);
//! 2. `symlink_metadata`: symlinks and non-regular entries refused;
//! 3. canonical path must stay under the canonical vault root;
//! 4. size ceiling, checked on the open handle and again by a bounded read;
//! 5. path-like glyph ids refused by the parser.
//!
//! Rejections are file scoped and collected in a [`LoadReport`]. Only a vault
//! root that cannot be opened aborts the load.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::VaultConfig;
use crate::error::{ConfigError, LoadError, SecurityRejection, VaultError};
use crate::glyph::GlyphDef;
use crate::parser::parse_gdf_bytes;
use crate::registry::Registry;

/// One file that did not make it into the registry.
#[derive(Debug)]
pub struct Rejection {
    /// File as found in the vault.
    pub path: PathBuf,
    /// Why it was refused.
    pub error: LoadError,
}

/// Outcome of a vault or file load.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Ids registered, in load order.
    pub loaded: Vec<String>,
    /// Files refused, in scan order.
    pub rejected: Vec<Rejection>,
    /// Directory entries ignored for not matching the extension.
    pub skipped: usize,
}

impl LoadReport {
    /// Rejections raised by a security gate.
    pub fn security_rejections(&self) -> impl Iterator<Item = &Rejection> {
        self.rejected.iter().filter(|r| r.error.is_security())
    }

    /// `true` when nothing was rejected.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    fn reject(&mut self, path: PathBuf, error: LoadError) {
        if error.is_security() {
            tracing::warn!(
                target: "glyph_core::security",
                path = %path.display(),
                %error,
                "file rejected"
            );
        } else {
            tracing::warn!(path = %path.display(), %error, "file rejected");
        }
        self.rejected.push(Rejection { path, error });
    }
}

/// Loads glyph definitions from a vault directory.
#[derive(Clone, Debug, Default)]
pub struct Vault {
    config: VaultConfig,
}

impl Vault {
    /// Loader with a validated configuration.
    pub fn new(config: VaultConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Load every matching file under `root` (non-recursive), in file-name order.
    pub fn load_dir(&self, root: &Path, registry: &mut Registry) -> Result<LoadReport, VaultError> {
        let canonical_root = canonical_dir(root)?;
        let entries = fs::read_dir(&canonical_root).map_err(|source| VaultError::Unreadable {
            path: root.to_path_buf(),
            source,
        })?;

        let mut report = LoadReport::default();
        let mut candidates: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(vault = %root.display(), error = %err, "unreadable directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if self.has_extension(&path) {
                candidates.push(path);
            } else {
                tracing::debug!(path = %path.display(), "skipping non-definition entry");
                report.skipped += 1;
            }
        }
        candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        for path in candidates {
            self.load_one(&canonical_root, path, registry, &mut report);
        }

        tracing::info!(
            vault = %root.display(),
            loaded = report.loaded.len(),
            rejected = report.rejected.len(),
            skipped = report.skipped,
            "vault loaded"
        );
        Ok(report)
    }

    /// Load a single file; its parent directory acts as the vault root.
    pub fn load_file(&self, path: &Path, registry: &mut Registry) -> Result<LoadReport, VaultError> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let canonical_root = canonical_dir(parent)?;
        let mut report = LoadReport::default();
        let candidate = match path.file_name() {
            Some(name) => canonical_root.join(name),
            None => path.to_path_buf(),
        };
        self.load_one(&canonical_root, candidate, registry, &mut report);
        Ok(report)
    }

    /// Run every gate on one file and parse it.
    pub fn read_definition(&self, root: &Path, path: &Path) -> Result<GlyphDef, LoadError> {
        check_file_name(path)?;

        let io_err = |source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        };

        let meta = fs::symlink_metadata(path).map_err(io_err)?;
        if meta.file_type().is_symlink() {
            return Err(SecurityRejection::Symlink { path: path.to_path_buf() }.into());
        }
        if !meta.is_file() {
            return Err(SecurityRejection::NotRegularFile { path: path.to_path_buf() }.into());
        }

        let canonical = fs::canonicalize(path).map_err(io_err)?;
        if !canonical.starts_with(root) {
            return Err(SecurityRejection::PathTraversal { path: path.to_path_buf() }.into());
        }

        let max = self.config.max_file_size;
        let file = File::open(&canonical).map_err(io_err)?;
        let size = file.metadata().map_err(io_err)?.len();
        if size > max {
            return Err(SecurityRejection::Oversized {
                path: path.to_path_buf(),
                size,
                max,
            }
            .into());
        }
        // The file may grow between the metadata check and the read.
        let mut bytes = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
        file.take(max + 1).read_to_end(&mut bytes).map_err(io_err)?;
        if bytes.len() as u64 > max {
            return Err(SecurityRejection::Oversized {
                path: path.to_path_buf(),
                size: bytes.len() as u64,
                max,
            }
            .into());
        }

        parse_gdf_bytes(&bytes)
    }

    fn load_one(&self, root: &Path, path: PathBuf, registry: &mut Registry, report: &mut LoadReport) {
        let def = match self.read_definition(root, &path) {
            Ok(def) => def,
            Err(error) => return report.reject(path, error),
        };
        let id = def.glyph_id.clone();
        match registry.insert(def) {
            Ok(_) => {
                tracing::debug!(glyph_id = %id, path = %path.display(), "glyph registered");
                report.loaded.push(id);
            }
            Err(err) => report.reject(path, err.into()),
        }
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext == self.config.extension)
    }
}

fn canonical_dir(root: &Path) -> Result<PathBuf, VaultError> {
    let canonical = fs::canonicalize(root).map_err(|source| VaultError::Unreadable {
        path: root.to_path_buf(),
        source,
    })?;
    if !canonical.is_dir() {
        return Err(VaultError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    Ok(canonical)
}

fn check_file_name(path: &Path) -> Result<(), SecurityRejection> {
    let unsafe_name = |name: String| SecurityRejection::UnsafeFileName { name };
    let name = path
        .file_name()
        .ok_or_else(|| unsafe_name(path.display().to_string()))?;
    let name = name
        .to_str()
        .ok_or_else(|| unsafe_name(name.to_string_lossy().into_owned()))?;
    if name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.contains("..")
        || name.chars().any(char::is_control)
    {
        return Err(unsafe_name(name.to_string()));
    }
    Ok(())
}
