use thiserror::Error;

/// Ambient failures outside the codec's own error kind: everything that can
/// go wrong starting and running the relay process itself.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("relay server exited: {0}")]
    Serve(String),
}
