// ABOUTME: Error kinds raised by the SSH config model and host store
// ABOUTME: Callers decide presentation; nothing here is retried or swallowed

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} is already in your sshconfig. use storm edit or storm update to modify.")]
    HostAlreadyExists(String),

    #[error("{0} doesn't exist in your sshconfig. use storm add command to add.")]
    HostNotFound(String),

    #[error("invalid host pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StoreError::HostNotFound("web".to_string()).to_string(),
            "web doesn't exist in your sshconfig. use storm add command to add."
        );
        assert!(StoreError::HostAlreadyExists("web".to_string()).to_string().starts_with("web is already in"));

        let io = StoreError::io("/tmp/config", std::io::Error::other("denied"));
        assert_eq!(io.to_string(), "I/O error on /tmp/config: denied");
    }

    #[test]
    fn test_invalid_pattern_keeps_source() {
        let source = regex::Regex::new("worker-[").unwrap_err();
        let error = StoreError::InvalidPattern {
            pattern: "worker-[".to_string(),
            source,
        };

        assert!(error.to_string().starts_with("invalid host pattern 'worker-['"));
        assert!(std::error::Error::source(&error).is_some());
    }
}
