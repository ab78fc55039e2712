//! Error types
//!
//! Nothing in the simulation core is fatal. These types describe the few
//! boundaries that can fail (storage, config files) so callers can log and
//! carry on with in-memory state.

use thiserror::Error;

/// Failure reading or writing the save blob
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store cannot be reached (no window, private mode, ...)
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the write (quota exceeded, read-only, ...)
    #[error("storage write rejected: {0}")]
    Rejected(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("save serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure loading an engine configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is outside its usable range
    #[error("config value '{name}' = {value} is outside {range}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        range: &'static str,
    },
}

/// Convenience alias for storage results
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message() {
        let err = ConfigError::OutOfRange {
            name: "drop_range",
            value: -1.0,
            range: "(0, table half-width]",
        };
        assert_eq!(
            err.to_string(),
            "config value 'drop_range' = -1 is outside (0, table half-width]"
        );
    }

    #[test]
    fn test_json_error_converts() {
        fn encode(bad: &str) -> StorageResult<u32> {
            Ok(serde_json::from_str::<u32>(bad)?)
        }
        let err = encode("not json").unwrap_err();
        assert!(matches!(err, StorageError::Serialize(_)));
        assert!(err.to_string().starts_with("save serialization failed"));
    }
}
