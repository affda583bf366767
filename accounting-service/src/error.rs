use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccountingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error calling {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Accounting API returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),
}

pub type AccountingResult<T> = Result<T, AccountingError>;
