use thiserror::Error;

/// Top-level error type for threadcard.
///
/// Subsystem crates define their own error enums and convert into this one
/// where a failure has to cross a crate boundary (the binary, mostly).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ThreadcardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel configuration store error: {0}")]
    ChannelStore(String),

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Chat platform error: {0}")]
    Chat(String),

    #[error("Webhook error: {0}")]
    Webhook(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ThreadcardError {
    fn from(err: toml::de::Error) -> Self {
        ThreadcardError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ThreadcardError {
    fn from(err: toml::ser::Error) -> Self {
        ThreadcardError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ThreadcardError {
    fn from(err: serde_json::Error) -> Self {
        ThreadcardError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for threadcard operations.
pub type Result<T> = std::result::Result<T, ThreadcardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let cases: Vec<(ThreadcardError, &str)> = vec![
            (
                ThreadcardError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                ThreadcardError::ChannelStore("locked".to_string()),
                "Channel configuration store error: locked",
            ),
            (
                ThreadcardError::Store("401".to_string()),
                "Record store error: 401",
            ),
            (
                ThreadcardError::Chat("gone".to_string()),
                "Chat platform error: gone",
            ),
            (
                ThreadcardError::Webhook("bind".to_string()),
                "Webhook error: bind",
            ),
            (
                ThreadcardError::Serialization("eof".to_string()),
                "Serialization error: eof",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ThreadcardError = io_err.into();
        assert!(matches!(err, ThreadcardError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let converted: ThreadcardError = err.unwrap_err().into();
        assert!(matches!(converted, ThreadcardError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let converted: ThreadcardError = err.unwrap_err().into();
        assert!(matches!(converted, ThreadcardError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
