use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use crate::error::{IoContext, Result};
use crate::process::go_binary;

/// Directory holding the `go` binary of the toolchain at `active_dir`.
pub fn active_bin_dir(active_dir: &Path) -> PathBuf {
    go_binary(active_dir)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| active_dir.join("bin"))
}

/// Contents of the POSIX shell snippet that puts `active_dir/bin` on `PATH`.
///
/// Sourcing it twice does not add the directory twice.
pub fn env_script(active_dir: &Path) -> String {
    let bin = active_bin_dir(active_dir);
    format!(
        r#"#!/bin/sh
# gvm shell setup
case ":${{PATH}}:" in
    *:"{bin}":*)
        ;;
    *)
        export PATH="{bin}:$PATH"
        ;;
esac
"#,
        bin = bin.display()
    )
}

/// Writes the env snippet to `script_path`.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use gvm::write_env_script;
///
/// write_env_script(Path::new("/home/dev/.config/gvm/env"), Path::new("/usr/local/go")).unwrap();
/// ```
pub fn write_env_script(script_path: &Path, active_dir: &Path) -> Result<()> {
    if let Some(parent) = script_path.parent() {
        fs::create_dir_all(parent).io_context(|| format!("could not create {}", parent.display()))?;
    }
    fs::write(script_path, env_script(active_dir))
        .io_context(|| format!("could not write {}", script_path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(script_path, fs::Permissions::from_mode(0o755))
            .io_context(|| format!("could not mark {} executable", script_path.display()))?;
    }
    debug!(path = %script_path.display(), "wrote env script");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_env_script_exports_bin_dir() {
        let script = env_script(Path::new("/usr/local/go"));
        assert!(script.contains(r#"export PATH="/usr/local/go/bin:$PATH""#));
        assert!(script.contains(r#"*:"/usr/local/go/bin":*)"#));
    }

    #[test]
    fn test_write_env_script() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gvm").join("env");
        write_env_script(&path, Path::new("/opt/go")).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("/opt/go/bin"));
    }
}
