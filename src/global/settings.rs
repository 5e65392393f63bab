use std::ffi::OsString;
use std::path::PathBuf;
use crate::catalog::VersionCatalog;
use crate::error::Result;
use crate::global::dirs::{active_dir_for, create_install_root, default_config_dir};
use crate::registry::GO_RELEASES_URL;
use crate::store::CatalogStore;

pub const ENV_CONFIG_DIR: &str = "GVM_CONFIG_DIR";
pub const ENV_INSTALL_DIR: &str = "GVM_INSTALL_DIR";
pub const ENV_ACTIVE_DIR: &str = "GVM_ACTIVE_DIR";
pub const ENV_RELEASES_URL: &str = "GVM_RELEASES_URL";

/// File name of the shell snippet that puts the active toolchain on `PATH`.
pub const ENV_SCRIPT_NAME: &str = "env";

/// Where gvm keeps its state and installs toolchains.
///
/// Built once in `main` and handed to every command; every field can be
/// overridden through a `GVM_*` environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory holding `config.json`, the lock file and the env script.
    pub config_dir: PathBuf,
    /// Install root to use at setup instead of the system/user default.
    pub install_dir: Option<PathBuf>,
    /// Active slot to use instead of the one derived from the install root.
    pub active_dir: Option<PathBuf>,
    /// Release index the remote lister reads.
    pub releases_url: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Resolves settings through `lookup` instead of the process environment.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let config_dir = match var(ENV_CONFIG_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => default_config_dir()?,
        };
        Ok(Self {
            config_dir,
            install_dir: var(ENV_INSTALL_DIR).map(PathBuf::from),
            active_dir: var(ENV_ACTIVE_DIR).map(PathBuf::from),
            releases_url: var(ENV_RELEASES_URL)
                .map(|url| url.to_string_lossy().into_owned())
                .unwrap_or_else(|| GO_RELEASES_URL.to_string()),
        })
    }

    pub fn store(&self) -> CatalogStore {
        CatalogStore::in_dir(&self.config_dir)
    }

    pub fn env_script_path(&self) -> PathBuf {
        self.config_dir.join(ENV_SCRIPT_NAME)
    }

    /// Creates the install root used by a fresh catalog.
    pub fn create_install_root(&self) -> Result<PathBuf> {
        create_install_root(self.install_dir.as_deref())
    }

    /// The active slot for `catalog`.
    pub fn active_dir(&self, catalog: &VersionCatalog) -> PathBuf {
        self.active_dir
            .clone()
            .unwrap_or_else(|| active_dir_for(&catalog.download_path))
    }
}
