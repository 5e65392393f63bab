use std::fs;
use std::path::{Path, PathBuf};
use directories::BaseDirs;
use tracing::{debug, warn};
use crate::error::{GvmError, IoContext, Result};

/// Name of gvm's directory under the user config dir and the install roots.
pub const APP_NAME: &str = "gvm";

/// System-wide prefix the install root and active slot live under.
#[cfg(unix)]
pub const SYSTEM_PREFIX: &str = "/usr/local";

fn base_dirs() -> Result<BaseDirs> {
    BaseDirs::new().ok_or_else(|| {
        GvmError::io(
            "could not determine the home directory",
            std::io::ErrorKind::NotFound.into(),
        )
    })
}

/// `<user-config-dir>/gvm`, e.g. `~/.config/gvm` on Linux.
pub fn default_config_dir() -> Result<PathBuf> {
    Ok(base_dirs()?.config_dir().join(APP_NAME))
}

/// `~/.local`, the fallback prefix when the system prefix is not writable.
pub fn user_prefix() -> Result<PathBuf> {
    Ok(base_dirs()?.home_dir().join(".local"))
}

/// `<prefix>/gvm/go-versions`
pub fn install_root_under<P: AsRef<Path>>(prefix: P) -> PathBuf {
    prefix.as_ref().join(APP_NAME).join("go-versions")
}

/// Creates and returns the directory downloaded archives are stored in.
///
/// An explicit `configured` path wins. Otherwise the system prefix is tried
/// first and the user prefix is used when it can't be created or written.
pub fn create_install_root(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        fs::create_dir_all(path).io_context(|| format!("could not create {}", path.display()))?;
        return Ok(path.to_path_buf());
    }
    #[cfg(unix)]
    {
        let system = install_root_under(SYSTEM_PREFIX);
        match fs::create_dir_all(&system).and_then(|_| probe_writable(&system)) {
            Ok(()) => return Ok(system),
            Err(e) => warn!(path = %system.display(), error = %e, "system directory not writable, using user directory"),
        }
    }
    let user = install_root_under(user_prefix()?);
    fs::create_dir_all(&user).io_context(|| format!("could not create {}", user.display()))?;
    debug!(path = %user.display(), "using user install root");
    Ok(user)
}

#[cfg(unix)]
fn probe_writable(dir: &Path) -> std::io::Result<()> {
    tempfile::NamedTempFile::new_in(dir).map(|_| ())
}

/// The active slot belonging to an install root: the `go` directory next to
/// the `gvm` directory, so `/usr/local/gvm/go-versions` maps to `/usr/local/go`.
pub fn active_dir_for(install_root: &Path) -> PathBuf {
    install_root
        .parent()
        .and_then(Path::parent)
        .unwrap_or(install_root)
        .join("go")
}
