//! Conversions from external infrastructure errors into domain errors.

use docket_core::StoreError;
use docket_domain::DocketError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct InfraError(pub DocketError);

impl From<InfraError> for DocketError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DocketError> for InfraError {
    fn from(value: DocketError) -> Self {
        InfraError(value)
    }
}

impl InfraError {
    /// Re-express as a backend failure of the named store.
    pub fn into_store_error(self, backend: &str) -> StoreError {
        StoreError::backend(backend, self.0)
    }
}

fn sqlite_to_docket(err: SqlError) -> DocketError {
    use rusqlite::ffi::ErrorCode;

    let message = match err {
        SqlError::SqliteFailure(failure, detail) => match failure.code {
            ErrorCode::DatabaseBusy => "database is busy".to_owned(),
            ErrorCode::DatabaseLocked => "database is locked".to_owned(),
            ErrorCode::DiskFull => "disk is full".to_owned(),
            ErrorCode::ReadOnly => "database is read-only".to_owned(),
            ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt => {
                format!("database file is unusable: {}", detail.unwrap_or_default())
            }
            code => format!(
                "sqlite {code:?} (extended {}): {}",
                failure.extended_code,
                detail.unwrap_or_default()
            ),
        },
        SqlError::FromSqlConversionFailure(column, _, cause) => {
            format!("column {column} holds an unreadable value: {cause}")
        }
        SqlError::InvalidColumnType(_, name, ty) => format!("column '{name}' has type {ty}"),
        SqlError::InvalidPath(path) => format!("bad database path {}", path.display()),
        other => other.to_string(),
    };
    DocketError::Storage(message)
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(sqlite_to_docket(value))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(DocketError::Storage(format!("connection pool unavailable: {value}")))
    }
}

/// Health-probe failures. Client errors other than 408/429 will not heal on
/// retry, so they surface as invalid input rather than a network fault.
fn http_to_docket(err: HttpError) -> DocketError {
    if err.is_timeout() {
        return DocketError::Network("health check timed out".into());
    }
    if err.is_connect() {
        return DocketError::Network("health endpoint unreachable".into());
    }
    match err.status() {
        Some(status) => {
            let message = format!("health endpoint returned {status}");
            match status.as_u16() {
                408 | 429 => DocketError::Network(message),
                400..=499 => DocketError::InvalidInput(message),
                _ => DocketError::Network(message),
            }
        }
        None => DocketError::Network(err.to_string()),
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(http_to_docket(value))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let message = match value.kind() {
            ErrorKind::PermissionDenied => format!("permission denied: {value}"),
            ErrorKind::NotFound => format!("path not found: {value}"),
            _ => value.to_string(),
        };
        InfraError(DocketError::Storage(message))
    }
}
