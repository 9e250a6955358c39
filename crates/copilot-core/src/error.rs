//! Error types shared by the core components

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A read or write against one of the backing stores failed
#[derive(Debug, Error)]
#[error("{store} store unavailable: {source}")]
pub struct StoreError {
    pub store: &'static str,
    #[source]
    pub source: BoxError,
}

impl StoreError {
    pub fn new(store: &'static str, source: impl Into<BoxError>) -> Self {
        Self {
            store,
            source: source.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),

    #[error("agent id must not be empty")]
    InvalidAgent,
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn ensure_agent(agent_id: &str) -> Result<()> {
    if agent_id.trim().is_empty() {
        return Err(Error::InvalidAgent);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_message_names_store() {
        let err = StoreError::new("rollup", "disk I/O error");
        assert_eq!(err.to_string(), "rollup store unavailable: disk I/O error");

        let wrapped: Error = err.into();
        assert!(matches!(wrapped, Error::StoreUnavailable(ref e) if e.store == "rollup"));
    }

    #[test]
    fn test_ensure_agent() {
        assert!(ensure_agent("a1").is_ok());
        assert!(matches!(ensure_agent("  "), Err(Error::InvalidAgent)));
    }
}
