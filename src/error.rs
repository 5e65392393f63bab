use std::path::PathBuf;
use thiserror::Error;

/// Every failure the core can report.
///
/// Collaborators (store, lister, fetcher, installer, process runner) surface
/// their failures as one of these kinds unchanged; only the binary turns
/// them into an exit code.
#[derive(Debug, Error)]
pub enum GvmError {
    /// Malformed version string supplied by the user.
    #[error("'{0}' is not a valid go version")]
    Validation(String),

    /// The version is neither in the available list nor downloaded.
    #[error("go version {0} is neither available nor downloaded. Run `gvm list update` to refresh the list")]
    NotAvailable(String),

    /// The catalog file does not exist.
    #[error("gvm is not configured ({}). Run `gvm configure` first", .0.display())]
    NotFound(PathBuf),

    /// The catalog file exists but is not a well-formed catalog.
    #[error("catalog at {} is corrupt: {reason}. Run `gvm configure` again", path.display())]
    Corruption { path: PathBuf, reason: String },

    /// The remote version source failed or produced nothing.
    #[error("could not list remote versions: {0}")]
    Lister(String),

    /// Retrieving an archive failed.
    #[error("download failed: {0}")]
    Fetch(String),

    /// The user interrupted a download.
    #[error("download cancelled")]
    Cancelled,

    /// Running an external program failed.
    #[error("{0}")]
    Process(String),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl GvmError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        GvmError::Io { context: context.into(), source }
    }
}

pub type Result<T, E = GvmError> = std::result::Result<T, E>;

/// Adds a context string to `std::io::Result`s, turning them into [`GvmError::Io`].
pub trait IoContext<T> {
    fn io_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| GvmError::io(context(), source))
    }
}
