use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;
use crate::catalog::VersionCatalog;
use crate::error::{GvmError, IoContext, Result};

/// File name of the catalog inside the config directory.
pub const CATALOG_FILE_NAME: &str = "config.json";

/// Reads and writes the [`VersionCatalog`] at one fixed path.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    /// A store for `<config_dir>/config.json`.
    pub fn in_dir<P: AsRef<Path>>(config_dir: P) -> Self {
        Self::at(config_dir.as_ref().join(CATALOG_FILE_NAME))
    }

    pub fn at<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the catalog file is present and can be opened for reading.
    pub fn exists(&self) -> bool {
        self.path.is_file() && fs::File::open(&self.path).is_ok()
    }

    /// Loads the whole catalog.
    ///
    /// # Errors
    /// [`GvmError::NotFound`] if there is no file, [`GvmError::Corruption`] if
    /// it does not hold a well-formed catalog, [`GvmError::Io`] otherwise.
    pub fn load(&self) -> Result<VersionCatalog> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(GvmError::NotFound(self.path.clone()));
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(self.corrupt(e.to_string()));
            }
            Err(e) => return Err(GvmError::io(format!("could not read {}", self.path.display()), e)),
        };
        let catalog: VersionCatalog =
            serde_json::from_str(&content).map_err(|e| self.corrupt(e.to_string()))?;
        catalog.check_invariants().map_err(|reason| self.corrupt(reason))?;
        debug!(
            path = %self.path.display(),
            available = catalog.available_versions.len(),
            downloaded = catalog.downloaded_versions.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    /// Writes the whole catalog, replacing the previous file.
    ///
    /// The JSON goes to a temporary file next to the catalog first and is
    /// renamed over it, so a crash mid-write never leaves a truncated file.
    pub fn save(&self, catalog: &VersionCatalog) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).io_context(|| format!("could not create {}", dir.display()))?;

        let mut content = serde_json::to_string_pretty(catalog)
            .map_err(|e| GvmError::io("could not serialize catalog", e.into()))?;
        content.push('\n');

        let mut tmp = NamedTempFile::new_in(dir)
            .io_context(|| format!("could not create temporary file in {}", dir.display()))?;
        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .io_context(|| format!("could not write {}", tmp.path().display()))?;
        tmp.persist(&self.path)
            .map_err(|e| GvmError::io(format!("could not replace {}", self.path.display()), e.error))?;
        debug!(path = %self.path.display(), "saved catalog");
        Ok(())
    }

    fn corrupt(&self, reason: String) -> GvmError {
        GvmError::Corruption { path: self.path.clone(), reason }
    }
}
