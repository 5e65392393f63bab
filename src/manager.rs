use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use crate::catalog::{DownloadedVersion, RemoteVersion, VersionCatalog};
use crate::error::{GvmError, Result};
use crate::fetch::ArtifactFetcher;
use crate::installer::SystemInstaller;
use crate::process::{go_binary, parse_go_version, ProcessRunner};
use crate::store::CatalogStore;
use crate::version::{normalize, requested_key, validate_version};

/// What occupies the active slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveSlot {
    Empty,
    /// Installed toolchain, by normalized version (`1.25.5`).
    Installed(String),
}

/// Result of a successful [`InstallManager::activate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub slot: ActiveSlot,
    pub record: DownloadedVersion,
    /// Whether the archive had to be downloaded first.
    pub fetched: bool,
}

impl ActiveSlot {
    /// The normalized version, if a toolchain is installed.
    pub fn version(&self) -> Option<&str> {
        match self {
            ActiveSlot::Empty => None,
            ActiveSlot::Installed(version) => Some(version),
        }
    }
}

/// Inspects the slot at `active_dir` by asking its `go` binary for its version.
///
/// Only the slot itself counts: a `go` found elsewhere on `PATH` is not
/// managed by gvm and leaves the slot [`ActiveSlot::Empty`].
pub fn read_active_slot(runner: &dyn ProcessRunner, active_dir: &Path) -> Result<ActiveSlot> {
    let binary = go_binary(active_dir);
    if !binary.exists() {
        return Ok(ActiveSlot::Empty);
    }
    let output = runner.output(&binary, &["version"])?;
    Ok(parse_go_version(&output)
        .map(|version| ActiveSlot::Installed(normalize(&version).to_string()))
        .unwrap_or(ActiveSlot::Empty))
}

/// Drives downloads and the swap of the active toolchain.
///
/// Owns no state of its own: the catalog is passed in by the caller and
/// saved through `store` whenever a download completes.
pub struct InstallManager<'a> {
    store: &'a CatalogStore,
    fetcher: &'a dyn ArtifactFetcher,
    installer: &'a dyn SystemInstaller,
    active_dir: PathBuf,
}

impl<'a> InstallManager<'a> {
    pub fn new<P: AsRef<Path>>(
        store: &'a CatalogStore,
        fetcher: &'a dyn ArtifactFetcher,
        installer: &'a dyn SystemInstaller,
        active_dir: P,
    ) -> Self {
        Self {
            store,
            fetcher,
            installer,
            active_dir: active_dir.as_ref().to_path_buf(),
        }
    }

    pub fn active_dir(&self) -> &Path {
        &self.active_dir
    }

    /// Sibling directory new toolchains are extracted into before they
    /// replace the active slot, e.g. `/usr/local/.go-staging`.
    pub fn staging_dir(&self) -> PathBuf {
        let mut name = OsString::from(".");
        name.push(self.active_dir.file_name().unwrap_or_else(|| "go".as_ref()));
        name.push("-staging");
        self.active_dir.with_file_name(name)
    }

    /// Makes sure `requested` is downloaded, fetching it if needed.
    ///
    /// Already downloaded versions are returned as recorded, even when they
    /// aged out of the available list.
    pub fn download(
        &self,
        catalog: &mut VersionCatalog,
        requested: &str,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<(DownloadedVersion, bool)> {
        validate_version(requested)?;
        if let Some(downloaded) = catalog.find_downloaded(requested) {
            info!(version = %downloaded.version, "already downloaded");
            return Ok((downloaded.clone(), false));
        }
        let remote = catalog
            .find_available(requested)
            .cloned()
            .ok_or_else(|| GvmError::NotAvailable(requested.to_string()))?;
        let record = self.fetch_and_record(catalog, &remote, progress)?;
        Ok((record, true))
    }

    /// Switches the active slot to `requested`.
    ///
    /// Validates the version, downloads it if it isn't yet (persisting the
    /// record right away), extracts it into the staging directory and only
    /// then replaces the active slot. A failed extraction leaves the
    /// previous toolchain in place. If the process dies between purging the
    /// slot and moving the staged tree in, the slot is left empty.
    pub fn activate(
        &self,
        catalog: &mut VersionCatalog,
        requested: &str,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<Activation> {
        let (record, fetched) = self.download(catalog, requested, progress)?;

        let staging = self.staging_dir();
        self.installer.purge(&staging)?;
        if let Err(e) = self.installer.extract(&record.tar_path, &staging) {
            if let Err(cleanup) = self.installer.purge(&staging) {
                warn!(path = %staging.display(), error = %cleanup, "could not clean up staging directory");
            }
            return Err(e);
        }

        info!(version = %record.version, slot = %self.active_dir.display(), "replacing active toolchain");
        self.installer.purge(&self.active_dir)?;
        self.installer.promote(&staging, &self.active_dir)?;

        Ok(Activation {
            slot: ActiveSlot::Installed(requested_key(requested).to_string()),
            record,
            fetched,
        })
    }

    pub fn active_slot(&self, runner: &dyn ProcessRunner) -> Result<ActiveSlot> {
        read_active_slot(runner, &self.active_dir)
    }

    fn fetch_and_record(
        &self,
        catalog: &mut VersionCatalog,
        remote: &RemoteVersion,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<DownloadedVersion> {
        let archive = self.fetcher.fetch(remote, &catalog.download_path, progress)?;
        let record = catalog.mark_downloaded(&remote.version, &archive).clone();
        self.store.save(catalog)?;
        Ok(record)
    }
}
