// Error handling for fixero-seed

use std::fmt;

/// Seeder error type
#[derive(Debug)]
pub enum SeedError {
    Config(String),
    Credentials(String),
    Fixture(String),
    Http(String),
    Backend { status: u16, message: String },
    AlreadyExists(String),
}

impl fmt::Display for SeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedError::Config(msg) => write!(f, "Configuration error: {}", msg),
            SeedError::Credentials(msg) => write!(f, "Credentials error: {}", msg),
            SeedError::Fixture(msg) => write!(f, "Fixture error: {}", msg),
            SeedError::Http(msg) => write!(f, "HTTP error: {}", msg),
            SeedError::Backend { status, message } => {
                write!(f, "Backend error ({}): {}", status, message)
            }
            SeedError::AlreadyExists(email) => write!(f, "User already exists: {}", email),
        }
    }
}

impl std::error::Error for SeedError {}

impl SeedError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, SeedError::AlreadyExists(_))
    }
}

impl From<reqwest::Error> for SeedError {
    fn from(err: reqwest::Error) -> Self {
        SeedError::Http(err.to_string())
    }
}

impl From<serde_yaml::Error> for SeedError {
    fn from(err: serde_yaml::Error) -> Self {
        SeedError::Fixture(err.to_string())
    }
}

// Extension trait for configuration result handling
pub trait ConfigResultExt<T> {
    /// Convert errors to SeedError::Config with the given prefix
    fn config_err(self, what: &str) -> Result<T, SeedError>;
}

impl<T, E: std::fmt::Display> ConfigResultExt<T> for Result<T, E> {
    fn config_err(self, what: &str) -> Result<T, SeedError> {
        self.map_err(|e| SeedError::Config(format!("{}: {}", what, e)))
    }
}
