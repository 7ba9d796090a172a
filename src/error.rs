use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ReportId, ReportStatus, Role};
use crate::projection::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Forbidden,
    InvalidTransition,
    Conflict,
    NotFound,
    Unauthorized,
    Network,
    Storage,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Forbidden => "FORBIDDEN",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::Conflict => "CONFLICT",
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Network => "NETWORK_ERROR",
            Self::Storage => "STORAGE_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Conflict | Self::Storage => ErrorSeverity::Transient,
            Self::Validation
            | Self::Forbidden
            | Self::InvalidTransition
            | Self::NotFound
            | Self::Unauthorized
            | Self::Internal => ErrorSeverity::Permanent,
        }
    }

    /// Validation errors are never retried; the caller has to fix the input.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Storage)
    }

    /// The local view is known to be stale and must be refetched.
    #[must_use]
    pub const fn requires_resync(self) -> bool {
        matches!(self, Self::Conflict | Self::NotFound)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("field must not be empty: {0}")]
    EmptyField(&'static str),
    #[error("field is not a valid id: {0}")]
    InvalidId(&'static str),
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error("unknown status: {0}")]
    UnknownStatus(String),
    #[error("unknown severity: {0}")]
    UnknownSeverity(String),
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("unknown notification channel: {0}")]
    UnknownChannel(String),
    #[error("a report needs an address or coordinates")]
    MissingLocation,
    #[error("latitude and longitude must be given together")]
    IncompleteCoordinates,
    #[error("coordinate ({lat}, {lon}) is out of range")]
    InvalidCoordinate { lat: f64, lon: f64 },
    #[error("responder count cannot be negative: {0}")]
    NegativeResponders(i64),
    #[error("responder count out of range: {0}")]
    ResponderCountOverflow(i64),
    #[error("a {status} report cannot have a responder")]
    ResponderOnUnassignedReport { status: ReportStatus },
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Failure of a single backend round trip, as carried back on an event.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("network error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("unreadable response body: {0}")]
    InvalidBody(String),
    #[error("request could not be built: {0}")]
    Request(String),
}

impl ApiError {
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// On lifecycle endpoints (assign and status change) the backend reports a
    /// lost race as 400, 409 or 422, so those map to a conflict there.
    #[must_use]
    pub const fn kind(&self, lifecycle_endpoint: bool) -> ErrorKind {
        match self {
            Self::Status { status, .. } => match *status {
                400 | 409 | 422 if lifecycle_endpoint => ErrorKind::Conflict,
                400 | 422 => ErrorKind::Validation,
                401 => ErrorKind::Unauthorized,
                403 => ErrorKind::Forbidden,
                404 => ErrorKind::NotFound,
                409 => ErrorKind::Conflict,
                500..=599 => ErrorKind::Network,
                _ => ErrorKind::Internal,
            },
            Self::Transport(_) | Self::Timeout => ErrorKind::Network,
            Self::InvalidBody(_) | Self::Request(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("{role} may not {action}")]
    Forbidden { role: Role, action: Action },
    #[error("cannot {action} a report that is {from}")]
    InvalidTransition { from: ReportStatus, action: Action },
    #[error("report was changed by someone else: {message}")]
    Conflict { id: Option<ReportId>, message: String },
    #[error("report {0} no longer exists")]
    NotFound(ReportId),
    #[error("not signed in")]
    Unauthorized,
    #[error("backend unavailable: {0}")]
    Network(String),
    #[error("local cache failure: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    #[must_use]
    pub fn conflict(id: ReportId, message: impl Into<String>) -> Self {
        Self::Conflict {
            id: Some(id),
            message: message.into(),
        }
    }

    /// Classifies a failed round trip. `report` is the report the request was
    /// about, if any.
    #[must_use]
    pub fn from_api(error: &ApiError, report: Option<ReportId>, lifecycle_endpoint: bool) -> Self {
        match error.kind(lifecycle_endpoint) {
            ErrorKind::Conflict => Self::Conflict {
                id: report,
                message: error.to_string(),
            },
            ErrorKind::NotFound => match report {
                Some(id) => Self::NotFound(id),
                None => Self::Internal(error.to_string()),
            },
            ErrorKind::Unauthorized => Self::Unauthorized,
            ErrorKind::Forbidden => Self::Internal(format!("backend refused request: {error}")),
            ErrorKind::Validation => Self::Internal(format!("backend rejected payload: {error}")),
            ErrorKind::Network => Self::Network(error.to_string()),
            ErrorKind::Storage | ErrorKind::InvalidTransition | ErrorKind::Internal => {
                Self::Internal(error.to_string())
            }
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::Network(_) => ErrorKind::Network,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Forbidden { .. } => "You don't have permission to perform this action.".into(),
            Self::InvalidTransition { from, action } => {
                format!("This report is {from} and cannot be {}.", action.past_tense())
            }
            Self::Conflict { .. } => {
                "This report was changed by someone else. The latest version has been loaded."
                    .into()
            }
            Self::NotFound(_) => "This report no longer exists.".into(),
            Self::Unauthorized => "Your session has expired. Please sign in again.".into(),
            Self::Network(_) => {
                "Unable to reach the server. Showing the last known reports.".into()
            }
            Self::Storage(_) => "Unable to save reports on this device.".into(),
            Self::Internal(_) => {
                "An unexpected error occurred. Please try again or contact support.".into()
            }
        }
    }
}

impl From<crate::offline_store::StoreError> for CoreError {
    fn from(e: crate::offline_store::StoreError) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub is_retryable: bool,
    pub error_code: String,
}

impl From<&CoreError> for UserFacingError {
    fn from(e: &CoreError) -> Self {
        let kind = e.kind();
        Self {
            message: e.user_facing_message(),
            is_transient: kind.default_severity() == ErrorSeverity::Transient,
            is_retryable: kind.is_retryable(),
            error_code: kind.code().to_string(),
        }
    }
}
