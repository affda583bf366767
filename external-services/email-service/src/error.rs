use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Email configuration error: {0}")]
    Config(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),
}

pub type EmailResult<T> = Result<T, EmailError>;
