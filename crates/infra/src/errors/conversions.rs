//! Conversions from external infrastructure errors into domain errors.

use mailsync_domain::MailsyncError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub MailsyncError);

impl From<InfraError> for MailsyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<MailsyncError> for InfraError {
    fn from(value: MailsyncError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoMailsyncError {
    fn into_mailsync(self) -> MailsyncError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → MailsyncError */
/* -------------------------------------------------------------------------- */

impl IntoMailsyncError for SqlError {
    fn into_mailsync(self) -> MailsyncError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        MailsyncError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        MailsyncError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        MailsyncError::Database(format!("unique constraint violation: {message}"))
                    }
                    _ => MailsyncError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => MailsyncError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                MailsyncError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                MailsyncError::Database(format!("invalid column type for '{name}': {ty}"))
            }
            RE::InvalidPath(path) => MailsyncError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => MailsyncError::Database("invalid SQL query".into()),
            other => MailsyncError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_mailsync())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → MailsyncError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(MailsyncError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → MailsyncError */
/* -------------------------------------------------------------------------- */

impl IntoMailsyncError for HttpError {
    fn into_mailsync(self) -> MailsyncError {
        if self.is_timeout() {
            return MailsyncError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return MailsyncError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => MailsyncError::Auth(message),
                404 => MailsyncError::NotFound(message),
                429 | 500..=599 => MailsyncError::Remote(message),
                400..=499 => MailsyncError::InvalidInput(message),
                _ => MailsyncError::Network(message),
            };
        }

        if self.is_decode() {
            return MailsyncError::Remote(format!("undecodable response body: {self}"));
        }

        MailsyncError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_mailsync())
    }
}

/* -------------------------------------------------------------------------- */
/* I/O and document parse errors → MailsyncError */
/* -------------------------------------------------------------------------- */

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        let error = match value.kind() {
            std::io::ErrorKind::NotFound => MailsyncError::NotFound(value.to_string()),
            _ => MailsyncError::Internal(format!("I/O error: {value}")),
        };
        InfraError(error)
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(MailsyncError::Config(format!("Invalid JSON format: {value}")))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(MailsyncError::Config(format!("Invalid TOML format: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
