use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};
use flate2::read::GzDecoder;
use tracing::{debug, info};
use crate::error::{GvmError, IoContext, Result};
use crate::util::ArchiveKind;

/// Filesystem side effects of switching toolchains.
///
/// [`crate::manager::InstallManager`] drives the state machine through this
/// trait so it can be exercised without touching real system paths.
pub trait SystemInstaller {
    /// Removes the directory tree at `path`. A missing path is not an error.
    fn purge(&self, path: &Path) -> Result<()>;
    /// Unpacks `archive` so that `dest` becomes the toolchain root.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
    /// Moves a fully extracted tree from `staged` to `dest`.
    fn promote(&self, staged: &Path, dest: &Path) -> Result<()>;
}

/// [`SystemInstaller`] working on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsInstaller;

impl SystemInstaller for FsInstaller {
    fn purge(&self, path: &Path) -> Result<()> {
        match fs::symlink_metadata(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GvmError::io(format!("could not inspect {}", path.display()), e)),
            Ok(meta) => {
                info!(path = %path.display(), "removing installation");
                let removed = if meta.is_dir() {
                    fs::remove_dir_all(path)
                } else {
                    fs::remove_file(path)
                };
                removed.io_context(|| format!("could not remove {}", path.display()))
            }
        }
    }

    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let kind = ArchiveKind::from_path(archive).ok_or_else(|| {
            GvmError::io(
                format!("could not extract {}", archive.display()),
                io::Error::new(io::ErrorKind::InvalidInput, "unsupported archive format"),
            )
        })?;
        info!(archive = %archive.display(), dest = %dest.display(), "extracting");
        fs::create_dir_all(dest).io_context(|| format!("could not create {}", dest.display()))?;
        let unpacked = match kind {
            ArchiveKind::TarGz => extract_tar_gz(archive, dest),
            ArchiveKind::Zip => extract_zip(archive, dest),
        };
        unpacked.io_context(|| format!("could not extract {}", archive.display()))
    }

    fn promote(&self, staged: &Path, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).io_context(|| format!("could not create {}", parent.display()))?;
        }
        debug!(from = %staged.display(), to = %dest.display(), "promoting staged toolchain");
        fs::rename(staged, dest)
            .io_context(|| format!("could not move {} to {}", staged.display(), dest.display()))
    }
}

/// Drops the archive's single top-level directory (`go/`) from `path`.
///
/// Returns `None` for the top-level directory itself, and an error for
/// entries that would land outside the destination.
pub fn strip_top_level(path: &Path) -> io::Result<Option<PathBuf>> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("archive entry {} escapes the destination", path.display()),
                ));
            }
        }
    }
    if parts.len() < 2 {
        return Ok(None);
    }
    Ok(Some(parts[1..].iter().collect()))
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> io::Result<()> {
    let file = File::open(archive)?;
    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.set_preserve_permissions(true);
    let mut count = 0usize;
    for entry in tar.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let Some(relative) = strip_top_level(&path)? else {
            continue;
        };
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&target)?;
        count += 1;
    }
    debug!(entries = count, "unpacked tar archive");
    Ok(())
}

fn extract_zip(archive: &Path, dest: &Path) -> io::Result<()> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(io::Error::other)?;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(io::Error::other)?;
        let path = entry.enclosed_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("archive entry {} escapes the destination", entry.name()),
            )
        })?;
        let Some(relative) = strip_top_level(&path)? else {
            continue;
        };
        let target = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode))?;
        }
    }
    debug!(entries = zip.len(), "unpacked zip archive");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_tar_gz(path: &Path, files: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_strip_top_level() {
        assert_eq!(strip_top_level(Path::new("go/bin/go")).unwrap(), Some(PathBuf::from("bin/go")));
        assert_eq!(strip_top_level(Path::new("./go/VERSION")).unwrap(), Some(PathBuf::from("VERSION")));
        assert_eq!(strip_top_level(Path::new("go/")).unwrap(), None);
        assert!(strip_top_level(Path::new("go/../../etc/passwd")).is_err());
    }

    #[test]
    fn test_extract_tar_gz_strips_go_dir() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("go1.24.0.tar.gz");
        write_tar_gz(&archive, &[("go/VERSION", "go1.24.0\n"), ("go/bin/go", "#!/bin/sh\n")]);
        let dest = dir.path().join("active");
        FsInstaller.extract(&archive, &dest).unwrap();
        assert_eq!(fs::read_to_string(dest.join("VERSION")).unwrap(), "go1.24.0\n");
        assert!(dest.join("bin").join("go").exists());
    }

    #[test]
    fn test_extract_zip() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("go1.24.0.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("go/VERSION", options).unwrap();
            zip.write_all(b"go1.24.0").unwrap();
            zip.finish().unwrap();
        }
        let dest = dir.path().join("active");
        FsInstaller.extract(&archive, &dest).unwrap();
        assert_eq!(fs::read_to_string(dest.join("VERSION")).unwrap(), "go1.24.0");
    }

    #[test]
    fn test_extract_corrupt_archive_fails() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("broken.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();
        let err = FsInstaller.extract(&archive, &dir.path().join("dest")).unwrap_err();
        assert!(matches!(err, GvmError::Io { .. }));
    }

    #[test]
    fn test_purge_missing_path_is_ok() {
        let dir = tempdir().unwrap();
        FsInstaller.purge(&dir.path().join("nothing")).unwrap();
    }

    #[test]
    fn test_purge_and_promote() {
        let dir = tempdir().unwrap();
        let active = dir.path().join("go");
        fs::create_dir_all(active.join("bin")).unwrap();
        FsInstaller.purge(&active).unwrap();
        assert!(!active.exists());

        let staged = dir.path().join(".go-staging");
        fs::create_dir_all(&staged).unwrap();
        fs::write(staged.join("VERSION"), "go1.25.5").unwrap();
        FsInstaller.promote(&staged, &active).unwrap();
        assert!(active.join("VERSION").exists());
        assert!(!staged.exists());
    }
}
