use std::io;
use thiserror::Error;

/// Failures surfaced by the mount sequence and the read paths. Open aborts at
/// the first failure; none of these are retried at this layer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to open volume")]
    VolumeOpen(#[source] io::Error),

    #[error("invalid on-disk format: {0}")]
    InvalidFormat(String),

    #[error("file system does not belong to the underlying volume")]
    InconsistentVolume,

    #[error("descriptor bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("unable to bind root directory: {0}")]
    Bind(String),

    #[error("unable to open meta file {name}")]
    AllocatorOpen {
        name: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}
