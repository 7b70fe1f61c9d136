//! Unified error type.

use std::path::PathBuf;

/// The error type returned by voltdoor's fallible operations.
///
/// Request-level outcomes (redirects, 404, 500) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: bad configuration, an unreadable asset
/// directory, binding to a port or accepting a connection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot read asset directory {}: {source}", path.display())]
    AssetScan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration: {0}")]
    Config(String),

    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),
}
