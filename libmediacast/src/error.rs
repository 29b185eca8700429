//! Error types for Mediacast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MediacastError>;

#[derive(Error, Debug)]
pub enum MediacastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Posting error: {0}")]
    Posting(#[from] PostingError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl MediacastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            MediacastError::InvalidInput(_) => 3,
            MediacastError::Posting(err) => err.exit_code(),
            MediacastError::Config(_) => 1,
            MediacastError::Database(_) => 1,
        }
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

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to decode column {column}: {reason}")]
    Decode { column: String, reason: String },
}

/// Errors returned by platform HTTP clients
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Request rejected with status {status}: {body}")]
    Request { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}

impl ClientError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => ClientError::Authentication(body),
            429 => ClientError::RateLimit(body),
            _ => ClientError::Request { status, body },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::MalformedResponse(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComposeError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Template error: {0}")]
    Template(String),
}

/// Failures of a single posting run
#[derive(Error, Debug)]
pub enum PostingError {
    #[error("No media items match the candidate filter")]
    EmptyCandidatePool,

    #[error("No eligible media found after {attempts} attempts")]
    NoEligibleMedia { attempts: u32 },

    #[error("Media item {0:?} belongs to no group")]
    NoGroup(String),

    #[error("Caption composition failed: {0}")]
    Compose(#[from] ComposeError),

    #[error("Platform request failed: {0}")]
    Client(#[from] ClientError),

    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] DbError),
}

impl PostingError {
    pub fn exit_code(&self) -> i32 {
        match self {
            PostingError::Client(ClientError::Authentication(_)) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = MediacastError::InvalidInput("unknown platform".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_authentication_error() {
        let error = MediacastError::Posting(PostingError::Client(ClientError::Authentication(
            "token expired".to_string(),
        )));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_publish_failed() {
        let error =
            MediacastError::Posting(PostingError::PublishFailed("no containers".to_string()));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_config_error() {
        let error = MediacastError::Config(ConfigError::MissingField("x.consumer_key".to_string()));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting_config() {
        let config_error = ConfigError::MissingField("instagram.account_id".to_string());
        let error = MediacastError::Config(config_error);
        assert_eq!(
            error.to_string(),
            "Configuration error: Missing required field: instagram.account_id"
        );
    }

    #[test]
    fn test_error_message_formatting_no_eligible_media() {
        let error = PostingError::NoEligibleMedia { attempts: 5 };
        assert_eq!(error.to_string(), "No eligible media found after 5 attempts");
    }

    #[test]
    fn test_client_error_from_status() {
        assert!(matches!(
            ClientError::from_status(401, "bad token".to_string()),
            ClientError::Authentication(_)
        ));
        assert!(matches!(
            ClientError::from_status(429, "slow down".to_string()),
            ClientError::RateLimit(_)
        ));
        match ClientError::from_status(400, "{\"error\":{}}".to_string()) {
            ClientError::Request { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("error"));
            }
            other => panic!("Expected ClientError::Request, got {:?}", other),
        }
    }

    #[test]
    fn test_error_chain_preserves_context() {
        let client_error = ClientError::Request {
            status: 500,
            body: "container expired".to_string(),
        };
        let error: MediacastError = PostingError::from(client_error).into();

        let message = error.to_string();
        assert!(message.contains("Posting error"));
        assert!(message.contains("500"));
        assert!(message.contains("container expired"));
    }

    #[test]
    fn test_error_conversion_from_db_error() {
        let db_error = DbError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "test",
        ));
        let error: PostingError = db_error.into();

        match error {
            PostingError::Catalog(_) => {}
            _ => panic!("Expected PostingError::Catalog"),
        }
    }

    #[test]
    fn test_client_error_clone() {
        let original = ClientError::Network("Connection reset".to_string());
        let cloned = original.clone();

        assert_eq!(original.to_string(), cloned.to_string());
    }
}
