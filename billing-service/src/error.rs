use crate::settings::SettingsBlobError;
use crate::tenants::TenantParseError;
use accounting_service::{AccountingError, AccountingResult, ApiResponse};
use email_service::EmailError;
use std::fmt;
use thiserror::Error;

/// Remote write the engine performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    SaveSettings,
    AddLateFee,
    TransferItem,
    VoidSourceItem,
    DisablePayments,
    RefreshBankConnection,
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteOperation::SaveSettings => "save customer settings",
            WriteOperation::AddLateFee => "add late fee",
            WriteOperation::TransferItem => "transfer invoice item",
            WriteOperation::VoidSourceItem => "void source invoice item",
            WriteOperation::DisablePayments => "disable invoice payments",
            WriteOperation::RefreshBankConnection => "refresh bank connection",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A post/patch did not report success. Aborts the batch.
    #[error("Remote write failed ({operation}) at {url}: HTTP {status}")]
    RemoteWriteFailed {
        operation: WriteOperation,
        url: String,
        status: u16,
    },

    /// The write request never got a response
    #[error("Remote write failed ({operation}) at {url}: {source}")]
    RemoteWriteUnreachable {
        operation: WriteOperation,
        url: String,
        #[source]
        source: AccountingError,
    },

    #[error("Remote read failed: {0}")]
    RemoteReadFailed(#[from] AccountingError),

    #[error("Malformed tenant encoding: {0}")]
    MalformedTenantEncoding(#[from] TenantParseError),

    #[error("Settings blob error: {0}")]
    Settings(#[from] SettingsBlobError),

    #[error("Notification failed: {0}")]
    Notification(#[from] EmailError),
}

impl BillingError {
    pub fn write_failed(operation: WriteOperation, url: &str, status: u16) -> Self {
        BillingError::RemoteWriteFailed {
            operation,
            url: url.to_string(),
            status,
        }
    }
}

/// Apply the write failure policy: anything but a success status is fatal
pub(crate) fn ensure_written<T>(
    operation: WriteOperation,
    url: &str,
    result: AccountingResult<ApiResponse<T>>,
) -> BillingResult<ApiResponse<T>> {
    match result {
        Ok(response) if response.is_success() => Ok(response),
        Ok(response) => Err(BillingError::write_failed(operation, url, response.status)),
        Err(source) => Err(BillingError::RemoteWriteUnreachable {
            operation,
            url: url.to_string(),
            source,
        }),
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
