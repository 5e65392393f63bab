use std::path::Path;

/// Go's `GOOS` name for the host operating system.
pub fn go_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// Go's `GOARCH` name for the host architecture.
pub fn go_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "arm" => "armv6l",
        "powerpc64" => "ppc64",
        "powerpc64le" => "ppc64le",
        "s390x" => "s390x",
        "loongarch64" => "loong64",
        other => other,
    }
}

/// Supported archive formats for Go toolchains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    /// Guesses the format from a file name or URL.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else {
            None
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_name(&path.to_string_lossy())
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArchiveKind::TarGz => "tar.gz",
            ArchiveKind::Zip => "zip",
        }
    }
}

/// File name the archive of `version` is stored under, e.g. `go1.25.5.tar.gz`.
pub fn archive_file_name(version: &str, download_link: &str) -> String {
    let kind = ArchiveKind::from_name(download_link).unwrap_or(ArchiveKind::TarGz);
    format!("{}.{}", version, kind.extension())
}

/// Formats a byte count as MB with two decimals.
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

/// Whether `dir` is one of the entries of the `PATH` environment variable.
pub fn is_on_path(dir: &Path) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|entry| entry == dir))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_kind_from_name() {
        assert_eq!(ArchiveKind::from_name("go1.25.5.linux-amd64.tar.gz"), Some(ArchiveKind::TarGz));
        assert_eq!(ArchiveKind::from_name("go1.25.5.windows-amd64.ZIP"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_name("go1.25.5.windows-amd64.msi"), None);
    }

    #[test]
    fn test_archive_file_name() {
        assert_eq!(
            archive_file_name("go1.25.5", "https://go.dev/dl/go1.25.5.windows-amd64.zip"),
            "go1.25.5.zip"
        );
        assert_eq!(
            archive_file_name("go1.25.5", "https://go.dev/dl/go1.25.5.linux-amd64.tar.gz"),
            "go1.25.5.tar.gz"
        );
    }

    #[test]
    fn test_go_platform_names() {
        #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
        {
            assert_eq!(go_os(), "linux");
            assert_eq!(go_arch(), "amd64");
        }
        assert!(!go_os().is_empty());
        assert!(!go_arch().is_empty());
    }

    #[test]
    fn test_format_megabytes() {
        assert_eq!(format_megabytes(1024 * 1024 * 3 / 2), "1.50 MB");
    }
}
