use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use reqwest::blocking::Client;
use tracing::{debug, info};
use crate::catalog::RemoteVersion;
use crate::error::{GvmError, IoContext, Result};
use crate::util::archive_file_name;

/// Minimum time between two progress reports.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// Longest a single connect, read or write may block. The blocking client
/// applies it per operation, so large downloads are not cut off.
pub const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Prefix of in-progress download files inside the download directory.
pub const PARTIAL_PREFIX: &str = ".gvm-download-";

const CHUNK_SIZE: usize = 64 * 1024;

/// Retrieves the archive of a remote version to local storage.
pub trait ArtifactFetcher {
    /// Downloads `remote` into `dest_dir` and returns the archive path.
    ///
    /// `progress` receives `(bytes_transferred, total_bytes)`; the total is
    /// `None` when the source does not announce it. Nothing is left behind
    /// in `dest_dir` unless the download completes.
    fn fetch(
        &self,
        remote: &RemoteVersion,
        dest_dir: &Path,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<PathBuf>;
}

/// Shared flag used to abort a running download, e.g. from a Ctrl-C handler.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Rate limiter for progress callbacks.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    /// True at most once per interval; the first call is always true.
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Downloads archives over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    cancel: CancelToken,
}

impl HttpFetcher {
    pub fn new(cancel: CancelToken) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gvm/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(IO_TIMEOUT)
            .timeout(IO_TIMEOUT)
            .build()
            .map_err(|e| GvmError::Fetch(e.to_string()))?;
        Ok(Self { client, cancel })
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(
        &self,
        remote: &RemoteVersion,
        dest_dir: &Path,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<PathBuf> {
        fs::create_dir_all(dest_dir).io_context(|| format!("could not create {}", dest_dir.display()))?;
        remove_partial_downloads(dest_dir)?;
        info!(version = %remote.version, url = %remote.download_link, "downloading");

        let mut response = self
            .client
            .get(&remote.download_link)
            .send()
            .map_err(|e| GvmError::Fetch(format!("{} ({}): {e}", remote.version, remote.download_link)))?;
        if !response.status().is_success() {
            return Err(GvmError::Fetch(format!(
                "{} ({}): server answered {}",
                remote.version,
                remote.download_link,
                response.status()
            )));
        }
        let total = response.content_length();

        let mut tmp = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .tempfile_in(dest_dir)
            .io_context(|| format!("could not create temporary file in {}", dest_dir.display()))?;
        let transferred = copy_with_progress(&mut response, tmp.as_file_mut(), total, &self.cancel, progress)?;
        if let Some(expected) = total {
            if transferred != expected {
                return Err(GvmError::Fetch(format!(
                    "{}: connection closed after {transferred} of {expected} bytes",
                    remote.version
                )));
            }
        }
        tmp.as_file()
            .sync_all()
            .io_context(|| format!("could not flush {}", tmp.path().display()))?;

        let dest = dest_dir.join(archive_file_name(&remote.version, &remote.download_link));
        tmp.persist(&dest)
            .map_err(|e| GvmError::io(format!("could not move archive to {}", dest.display()), e.error))?;
        info!(version = %remote.version, path = %dest.display(), bytes = transferred, "download complete");
        Ok(dest)
    }
}

/// Deletes download files a killed process left behind in `dir`.
pub fn remove_partial_downloads(dir: &Path) -> Result<()> {
    let entries = fs::read_dir(dir).io_context(|| format!("could not read {}", dir.display()))?;
    for entry in entries {
        let entry = entry.io_context(|| format!("could not read {}", dir.display()))?;
        if !entry.file_name().to_string_lossy().starts_with(PARTIAL_PREFIX) {
            continue;
        }
        let path = entry.path();
        debug!(path = %path.display(), "removing partial download");
        fs::remove_file(&path).io_context(|| format!("could not remove {}", path.display()))?;
    }
    Ok(())
}

/// Copies `reader` to `writer`, reporting progress through a
/// [`ProgressThrottle`] and stopping with [`GvmError::Cancelled`] as soon as
/// `cancel` is set. Always reports once more when the copy finishes.
pub fn copy_with_progress<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    total: Option<u64>,
    cancel: &CancelToken,
    progress: &mut dyn FnMut(u64, Option<u64>),
) -> Result<u64> {
    let mut throttle = ProgressThrottle::new(PROGRESS_INTERVAL);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut transferred = 0u64;
    loop {
        if cancel.is_cancelled() {
            debug!(transferred, "download cancelled");
            return Err(GvmError::Cancelled);
        }
        let n = match reader.read(&mut buf) {
            Ok(n) => n,
            Err(_) if cancel.is_cancelled() => {
                debug!(transferred, "download cancelled while waiting for data");
                return Err(GvmError::Cancelled);
            }
            Err(e) => {
                return Err(GvmError::Fetch(format!("connection error after {transferred} bytes: {e}")));
            }
        };
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).io_context(|| "could not write archive")?;
        transferred += n as u64;
        if throttle.ready() {
            progress(transferred, total);
        }
    }
    progress(transferred, total);
    Ok(transferred)
}
