//! Persistence errors

use std::fmt;

/// Failure while reading or writing durable state
#[derive(Debug)]
pub enum PersistenceError {
    /// Filesystem failure underneath the store
    Io(std::io::Error),
    /// The fjall keyspace rejected an operation
    Storage(fjall::Error),
    /// A record could not be bincode-encoded
    Encode(bincode::error::EncodeError),
    /// The stored value under `key` in `partition` could not be decoded
    Decode {
        partition: &'static str,
        key: String,
        source: bincode::error::DecodeError,
    },
    /// The background writer stopped before draining its queue
    WriterStopped(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Storage(e) => write!(f, "storage error: {}", e),
            Self::Encode(e) => write!(f, "encode error: {}", e),
            Self::Decode {
                partition,
                key,
                source,
            } => write!(f, "cannot decode {}/{}: {}", partition, key, source),
            Self::WriterStopped(reason) => write!(f, "persistence writer stopped: {}", reason),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Storage(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Decode { source, .. } => Some(source),
            Self::WriterStopped(_) => None,
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<fjall::Error> for PersistenceError {
    fn from(err: fjall::Error) -> Self {
        Self::Storage(err)
    }
}

impl From<bincode::error::EncodeError> for PersistenceError {
    fn from(err: bincode::error::EncodeError) -> Self {
        Self::Encode(err)
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
