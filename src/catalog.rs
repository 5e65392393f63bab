use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::version::{compare_versions, is_release_candidate, matches_requested};

/// Size of the retained window of remote versions.
pub const MAX_AVAILABLE_VERSIONS: usize = 10;

/// A version published by the remote source, together with where to get it.
///
/// Two descriptors are equal when their identifiers are equal; the link is
/// not part of the identity.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RemoteVersion {
    /// Canonical identifier, e.g. `go1.25.5` or `go1.26rc1`.
    pub version: String,
    /// Where the archive for this version can be downloaded.
    pub download_link: String,
}

impl RemoteVersion {
    pub fn new(version: impl Into<String>, download_link: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            download_link: download_link.into(),
        }
    }
}

impl PartialEq for RemoteVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for RemoteVersion {}

/// A version whose archive has been fully retrieved to local storage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DownloadedVersion {
    pub version: String,
    /// Location of the downloaded archive.
    pub tar_path: PathBuf,
}

/// The persisted state of gvm: known remote versions and local downloads.
///
/// Loaded whole on every invocation, mutated in memory and saved back whole
/// by [`crate::store::CatalogStore`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VersionCatalog {
    /// Catalog format tag. Written verbatim, never interpreted.
    pub version: String,
    /// Directory archives are downloaded into.
    pub download_path: PathBuf,
    /// Unix millis of the last successful reconciliation.
    pub last_remote_fetch: i64,
    /// Most recent first, at most [`MAX_AVAILABLE_VERSIONS`] entries.
    pub available_versions: Vec<RemoteVersion>,
    pub downloaded_versions: BTreeMap<String, DownloadedVersion>,
}

impl VersionCatalog {
    /// Creates an empty catalog rooted at `download_path`.
    pub fn new<P: AsRef<Path>>(schema: &str, download_path: P) -> Self {
        Self {
            version: schema.to_string(),
            download_path: download_path.as_ref().to_path_buf(),
            last_remote_fetch: 0,
            available_versions: Vec::new(),
            downloaded_versions: BTreeMap::new(),
        }
    }

    /// Looks up an available version by user input (`1.25.5`, `v1.25.5` or `go1.25.5`).
    pub fn find_available(&self, requested: &str) -> Option<&RemoteVersion> {
        self.available_versions
            .iter()
            .find(|remote| matches_requested(&remote.version, requested))
    }

    /// Looks up a downloaded version by user input.
    pub fn find_downloaded(&self, requested: &str) -> Option<&DownloadedVersion> {
        self.downloaded_versions
            .values()
            .find(|downloaded| matches_requested(&downloaded.version, requested))
    }

    pub fn is_downloaded(&self, identifier: &str) -> bool {
        self.downloaded_versions.contains_key(identifier)
    }

    /// Records a finished download. Marking the same identifier twice keeps
    /// the first record and succeeds.
    pub fn mark_downloaded<P: AsRef<Path>>(&mut self, identifier: &str, archive: P) -> &DownloadedVersion {
        self.downloaded_versions
            .entry(identifier.to_string())
            .or_insert_with(|| {
                debug!(version = identifier, path = %archive.as_ref().display(), "marking version as downloaded");
                DownloadedVersion {
                    version: identifier.to_string(),
                    tar_path: archive.as_ref().to_path_buf(),
                }
            })
    }

    /// The newest available version that is not a release candidate.
    pub fn latest_stable(&self) -> Option<&RemoteVersion> {
        self.available_versions
            .iter()
            .find(|remote| !is_release_candidate(&remote.version))
    }

    /// Downloaded versions, oldest version first.
    pub fn downloaded_sorted(&self) -> Vec<&DownloadedVersion> {
        let mut downloaded: Vec<_> = self.downloaded_versions.values().collect();
        downloaded.sort_by(|a, b| compare_versions(&a.version, &b.version));
        downloaded
    }

    /// Checks the structural invariants a loaded catalog must satisfy.
    /// Returns a description of the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.available_versions.len() > MAX_AVAILABLE_VERSIONS {
            return Err(format!(
                "{} available versions, at most {} allowed",
                self.available_versions.len(),
                MAX_AVAILABLE_VERSIONS
            ));
        }
        let mut seen = HashSet::new();
        for remote in &self.available_versions {
            if !seen.insert(remote.version.as_str()) {
                return Err(format!("duplicate available version {}", remote.version));
            }
        }
        for (key, downloaded) in &self.downloaded_versions {
            if key != &downloaded.version {
                return Err(format!(
                    "downloaded entry {} records version {}",
                    key, downloaded.version
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> VersionCatalog {
        let mut catalog = VersionCatalog::new("1.2.0", "/tmp/gvm");
        catalog.available_versions = vec![
            RemoteVersion::new("go1.26rc1", "https://go.dev/dl/go1.26rc1.linux-amd64.tar.gz"),
            RemoteVersion::new("go1.25.5", "https://go.dev/dl/go1.25.5.linux-amd64.tar.gz"),
            RemoteVersion::new("go1.24.11", "https://go.dev/dl/go1.24.11.linux-amd64.tar.gz"),
        ];
        catalog
    }

    #[test]
    fn test_remote_version_equality_by_identifier() {
        let a = RemoteVersion::new("go1.25.5", "https://a");
        let b = RemoteVersion::new("go1.25.5", "https://b");
        assert_eq!(a, b);
        assert_ne!(a, RemoteVersion::new("go1.25.4", "https://a"));
    }

    #[test]
    fn test_find_available_normalizes() {
        let catalog = catalog();
        assert_eq!(catalog.find_available("1.25.5").unwrap().version, "go1.25.5");
        assert_eq!(catalog.find_available("v1.25.5").unwrap().version, "go1.25.5");
        assert!(catalog.find_available("1.25").is_none());
    }

    #[test]
    fn test_mark_downloaded_is_idempotent() {
        let mut catalog = catalog();
        catalog.mark_downloaded("go1.25.5", "/tmp/gvm/go1.25.5.tar.gz");
        let second = catalog.mark_downloaded("go1.25.5", "/elsewhere.tar.gz").clone();
        assert_eq!(catalog.downloaded_versions.len(), 1);
        assert_eq!(second.tar_path, PathBuf::from("/tmp/gvm/go1.25.5.tar.gz"));
        assert!(catalog.find_downloaded("1.25.5").is_some());
    }

    #[test]
    fn test_latest_stable_skips_release_candidates() {
        assert_eq!(catalog().latest_stable().unwrap().version, "go1.25.5");
    }

    #[test]
    fn test_downloaded_sorted_numeric() {
        let mut catalog = catalog();
        catalog.mark_downloaded("go1.10", "/a");
        catalog.mark_downloaded("go1.9", "/b");
        let order: Vec<_> = catalog.downloaded_sorted().iter().map(|d| d.version.as_str()).collect();
        assert_eq!(order, vec!["go1.9", "go1.10"]);
    }

    #[test]
    fn test_check_invariants_rejects_duplicates() {
        let mut catalog = catalog();
        assert!(catalog.check_invariants().is_ok());
        catalog.available_versions.push(RemoteVersion::new("go1.25.5", "x"));
        assert!(catalog.check_invariants().unwrap_err().contains("duplicate"));
    }

    #[test]
    fn test_json_field_names() {
        let mut catalog = catalog();
        catalog.mark_downloaded("go1.25.5", "/tmp/gvm/go1.25.5.tar.gz");
        let json = serde_json::to_value(&catalog).unwrap();
        assert!(json.get("download_path").is_some());
        assert!(json.get("last_remote_fetch").is_some());
        assert_eq!(json["available_versions"][1]["download_link"], "https://go.dev/dl/go1.25.5.linux-amd64.tar.gz");
        assert_eq!(json["downloaded_versions"]["go1.25.5"]["tar_path"], "/tmp/gvm/go1.25.5.tar.gz");
    }
}
