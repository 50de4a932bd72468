use thiserror::Error;

/// Errors surfaced by resolution, TLS construction, and the RPC client.
///
/// Gateway failures are deliberately absent: the sync loop absorbs them by
/// restarting with a full resync and they never cross an API boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// The current context, or a cluster/user it references, cannot be found.
    #[error("config error: {0}")]
    Config(String),

    /// Home-directory expansion failed or a referenced file cannot be read.
    #[error("path error: {0}")]
    Path(String),

    /// PEM material could not be parsed into usable TLS configuration.
    #[error("certificate error: {0}")]
    Cert(String),

    /// A kind outside the canonical set reached resolution or the mirror.
    #[error("unsupported resource kind: {0}")]
    UnsupportedKind(String),

    /// RPC-level failure on the calling side, surfaced verbatim.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
