//! Error types for Civicast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CivicastError>;

#[derive(Error, Debug)]
pub enum CivicastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A published post was targeted by an update or delete
    #[error("Post is immutable: {0}")]
    Immutable(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl CivicastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CivicastError::InvalidInput(_)
            | CivicastError::NotFound(_)
            | CivicastError::Immutable(_)
            | CivicastError::Conflict(_) => 3,
            CivicastError::Scheduling(SchedulingError::AccountMissing(_)) => 2,
            CivicastError::Config(ConfigError::MissingField(_)) => 2,
            CivicastError::Media(MediaError::TooLarge { .. })
            | CivicastError::Media(MediaError::UnsupportedType(_)) => 3,
            CivicastError::Config(_)
            | CivicastError::Database(_)
            | CivicastError::Generation(_)
            | CivicastError::Scheduling(_)
            | CivicastError::Media(_) => 1,
        }
    }

    /// True for errors caused by the caller's request rather than by
    /// this system or one of its collaborators
    pub fn is_client_error(&self) -> bool {
        self.exit_code() == 3
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failures talking to the text-generation provider
///
/// Malformed model output is not an error: it is recovered locally by
/// fallback synthesis and never reaches the caller.
#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Provider returned an empty completion")]
    EmptyResponse,
}

/// Failures resolving accounts or talking to the scheduling provider
#[derive(Error, Debug, Clone)]
pub enum SchedulingError {
    #[error("No active account connected for platform '{0}'")]
    AccountMissing(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Scheduling API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("File size {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("File type not supported: {0}")]
    UnsupportedType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = CivicastError::InvalidInput("Content is required".to_string());
        assert_eq!(error.exit_code(), 3);
        assert!(error.is_client_error());
    }

    #[test]
    fn test_exit_code_account_missing() {
        let error: CivicastError = SchedulingError::AccountMissing("instagram".to_string()).into();
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_upstream_failures() {
        let generation: CivicastError = GenerationError::EmptyResponse.into();
        assert_eq!(generation.exit_code(), 1);

        let scheduling: CivicastError = SchedulingError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        }
        .into();
        assert_eq!(scheduling.exit_code(), 1);
        assert!(!scheduling.is_client_error());
    }

    #[test]
    fn test_exit_code_immutable_and_not_found() {
        assert_eq!(CivicastError::Immutable("p1".to_string()).exit_code(), 3);
        assert_eq!(CivicastError::NotFound("p1".to_string()).exit_code(), 3);
        assert_eq!(CivicastError::Conflict("p1".to_string()).exit_code(), 3);
    }

    #[test]
    fn test_error_message_formatting_scheduling_api() {
        let error: CivicastError = SchedulingError::Api {
            status: 401,
            message: "Invalid API key".to_string(),
        }
        .into();
        assert_eq!(
            error.to_string(),
            "Scheduling error: Scheduling API error: 401 - Invalid API key"
        );
    }

    #[test]
    fn test_error_message_formatting_account_missing() {
        let error = SchedulingError::AccountMissing("linkedin".to_string());
        assert_eq!(
            error.to_string(),
            "No active account connected for platform 'linkedin'"
        );
    }

    #[test]
    fn test_error_message_formatting_media() {
        let error = MediaError::TooLarge {
            size: 11,
            limit: 10,
        };
        assert_eq!(error.to_string(), "File size 11 bytes exceeds the 10 byte limit");
        let wrapped: CivicastError = error.into();
        assert_eq!(wrapped.exit_code(), 3);
    }

    #[test]
    fn test_error_conversion_from_db_error() {
        let db_error = DbError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "test",
        ));
        let error: CivicastError = db_error.into();
        assert!(matches!(error, CivicastError::Database(_)));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_generation_error_clone() {
        let original = GenerationError::Timeout("60s elapsed".to_string());
        let cloned = original.clone();
        assert_eq!(original.to_string(), cloned.to_string());
    }
}
