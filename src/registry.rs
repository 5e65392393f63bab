use serde::Deserialize;
use tracing::{debug, info};
use crate::catalog::RemoteVersion;
use crate::error::{GvmError, Result};
use crate::util::{go_arch, go_os};

/// Official Go release index, newest release first.
pub const GO_RELEASES_URL: &str = "https://go.dev/dl/?mode=json&include=all";

/// Base URL archives listed in the release index are served from.
pub const GO_DOWNLOAD_BASE: &str = "https://go.dev/dl/";

/// Produces the most recent remote versions, newest first.
pub trait RemoteLister {
    /// Returns at most `limit` descriptors, newest first.
    fn list(&self, limit: usize) -> Result<Vec<RemoteVersion>>;
}

/// One release in the go.dev index.
#[derive(Debug, Deserialize)]
pub struct GoRelease {
    /// e.g. `go1.25.5`
    pub version: String,
    #[serde(default)]
    pub stable: bool,
    #[serde(default)]
    pub files: Vec<GoFile>,
}

/// One downloadable file of a release.
#[derive(Debug, Deserialize)]
pub struct GoFile {
    pub filename: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub kind: String,
}

/// Lists versions from the go.dev release index for the host platform.
#[derive(Debug, Clone)]
pub struct GoDevLister {
    url: String,
    os: String,
    arch: String,
}

impl GoDevLister {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            os: go_os().to_string(),
            arch: go_arch().to_string(),
        }
    }

    /// Lists for a platform other than the host, using Go's `GOOS`/`GOARCH` names.
    pub fn for_platform(url: impl Into<String>, os: &str, arch: &str) -> Self {
        Self {
            url: url.into(),
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }

    fn fetch_index(&self) -> Result<Vec<GoRelease>> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("gvm/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GvmError::Lister(e.to_string()))?;
        let response = client
            .get(&self.url)
            .send()
            .map_err(|e| GvmError::Lister(format!("request to {} failed: {e}", self.url)))?;
        if !response.status().is_success() {
            return Err(GvmError::Lister(format!(
                "{} answered with status {}",
                self.url,
                response.status()
            )));
        }
        let body = response
            .text()
            .map_err(|e| GvmError::Lister(format!("could not read release index: {e}")))?;
        parse_release_index(&body)
    }

    /// Picks the archives for this lister's platform out of `releases`.
    pub fn select(&self, releases: Vec<GoRelease>, limit: usize) -> Vec<RemoteVersion> {
        releases
            .into_iter()
            .filter_map(|release| {
                let file = release
                    .files
                    .iter()
                    .find(|f| f.kind == "archive" && f.os == self.os && f.arch == self.arch)?;
                Some(RemoteVersion::new(
                    release.version.clone(),
                    format!("{GO_DOWNLOAD_BASE}{}", file.filename),
                ))
            })
            .take(limit)
            .collect()
    }
}

impl Default for GoDevLister {
    fn default() -> Self {
        Self::new(GO_RELEASES_URL)
    }
}

impl RemoteLister for GoDevLister {
    fn list(&self, limit: usize) -> Result<Vec<RemoteVersion>> {
        info!(url = %self.url, os = %self.os, arch = %self.arch, "fetching go release index");
        let releases = self.fetch_index()?;
        debug!(releases = releases.len(), "parsed release index");
        let versions = self.select(releases, limit);
        if versions.is_empty() {
            return Err(GvmError::Lister(format!(
                "no go releases found for {}/{}",
                self.os, self.arch
            )));
        }
        Ok(versions)
    }
}

/// Parses the JSON body of the go.dev release index.
pub fn parse_release_index(body: &str) -> Result<Vec<GoRelease>> {
    serde_json::from_str(body).map_err(|e| GvmError::Lister(format!("unexpected release index format: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"[
        {"version": "go1.26rc1", "stable": false, "files": [
            {"filename": "go1.26rc1.src.tar.gz", "os": "", "arch": "", "kind": "source"},
            {"filename": "go1.26rc1.linux-amd64.tar.gz", "os": "linux", "arch": "amd64", "kind": "archive"}
        ]},
        {"version": "go1.25.5", "stable": true, "files": [
            {"filename": "go1.25.5.linux-amd64.tar.gz", "os": "linux", "arch": "amd64", "kind": "archive"},
            {"filename": "go1.25.5.windows-amd64.zip", "os": "windows", "arch": "amd64", "kind": "archive"},
            {"filename": "go1.25.5.windows-amd64.msi", "os": "windows", "arch": "amd64", "kind": "installer"}
        ]},
        {"version": "go1.25.4", "stable": true, "files": [
            {"filename": "go1.25.4.windows-amd64.zip", "os": "windows", "arch": "amd64", "kind": "archive"}
        ]}
    ]"#;

    #[test]
    fn test_select_linux_archives() {
        let lister = GoDevLister::for_platform(GO_RELEASES_URL, "linux", "amd64");
        let versions = lister.select(parse_release_index(INDEX).unwrap(), 10);
        let ids: Vec<_> = versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(ids, vec!["go1.26rc1", "go1.25.5"]);
        assert_eq!(versions[1].download_link, "https://go.dev/dl/go1.25.5.linux-amd64.tar.gz");
    }

    #[test]
    fn test_select_prefers_archive_over_installer() {
        let lister = GoDevLister::for_platform(GO_RELEASES_URL, "windows", "amd64");
        let versions = lister.select(parse_release_index(INDEX).unwrap(), 1);
        assert_eq!(versions.len(), 1);
        assert!(versions[0].download_link.ends_with("go1.25.5.windows-amd64.zip"));
    }

    #[test]
    fn test_parse_rejects_html() {
        let err = parse_release_index("<html></html>").unwrap_err();
        assert!(matches!(err, GvmError::Lister(_)));
    }
}
