use serde::Serialize;
use thiserror::Error;

/// PostgREST: single-row mode matched zero (or several) rows.
pub const NOT_FOUND_CODE: &str = "PGRST116";
/// PostgREST: JWT rejected or row-level security denied the request.
pub const FORBIDDEN_CODE: &str = "PGRST301";
/// PostgREST: payload references columns the table does not have.
pub const MALFORMED_PAYLOAD_CODE: &str = "PGRST204";

/// Local codes raised on this side of the wire.
pub const NULL_RESULT_CODE: &str = "DATA_NULL";
pub const DECODE_CODE: &str = "PAYLOAD_DECODE";
pub const ENCODE_CODE: &str = "PAYLOAD_ENCODE";
pub const SESSION_MISSING_CODE: &str = "NO_SESSION";
pub const TRANSPORT_CODE: &str = "TRANSPORT";
pub const UNKNOWN_CODE: &str = "UNKNOWN_ERROR";

/// Raw error as reported by the backend (or by the transport underneath it).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub code: Option<String>,
    pub message: String,
    pub details: Option<String>,
    pub status: Option<u16>,
}

impl BackendError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            details: None,
            status: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(NOT_FOUND_CODE, message).with_status(406)
    }

    pub fn null_result() -> Self {
        Self::new(NULL_RESULT_CODE, "backend returned no data")
    }

    pub fn session_missing() -> Self {
        Self::new(SESSION_MISSING_CODE, "no signed-in user")
    }

    pub fn encode(err: serde_json::Error) -> Self {
        Self::new(ENCODE_CODE, "could not encode request payload").with_details(err.to_string())
    }

    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::new(TRANSPORT_CODE, "request to backend failed").with_details(err.to_string())
    }
}

/// Closed set of failure kinds surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    MalformedPayload,
    NullResult,
    Unknown,
}

impl ErrorKind {
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some(NOT_FOUND_CODE) => Self::NotFound,
            Some(FORBIDDEN_CODE) | Some(SESSION_MISSING_CODE) => Self::Forbidden,
            Some(MALFORMED_PAYLOAD_CODE) | Some(DECODE_CODE) | Some(ENCODE_CODE) => {
                Self::MalformedPayload
            }
            Some(NULL_RESULT_CODE) => Self::NullResult,
            _ => Self::Unknown,
        }
    }

    pub fn user_message(self) -> &'static str {
        match self {
            Self::NotFound => "The requested data was not found",
            Self::Forbidden => "You do not have permission to perform this action",
            Self::MalformedPayload => "Invalid data format",
            Self::NullResult => "Data not found",
            Self::Unknown => "Something went wrong",
        }
    }
}

/// Normalized error returned by every service call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub code: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn from_backend(err: &BackendError) -> Self {
        let kind = ErrorKind::from_code(err.code.as_deref());
        let details = match (&err.details, err.message.is_empty()) {
            (Some(details), _) => Some(details.clone()),
            (None, false) => Some(err.message.clone()),
            (None, true) => None,
        };

        Self {
            kind,
            message: kind.user_message().to_string(),
            code: err.code.clone().unwrap_or_else(|| UNKNOWN_CODE.to_string()),
            details,
        }
    }

    pub fn null_result() -> Self {
        Self::from_backend(&BackendError::null_result())
    }

    pub fn decode(err: serde_json::Error) -> Self {
        Self::from_backend(
            &BackendError::new(DECODE_CODE, "unexpected response shape").with_details(err.to_string()),
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_to_fixed_messages() {
        let cases = [
            (NOT_FOUND_CODE, ErrorKind::NotFound, "The requested data was not found"),
            (FORBIDDEN_CODE, ErrorKind::Forbidden, "You do not have permission to perform this action"),
            (MALFORMED_PAYLOAD_CODE, ErrorKind::MalformedPayload, "Invalid data format"),
        ];

        for (code, kind, message) in cases {
            let err = ApiError::from_backend(&BackendError::new(code, "raw"));
            assert_eq!(err.kind, kind);
            assert_eq!(err.message, message);
            assert_eq!(err.code, code);
        }
    }

    #[test]
    fn unknown_and_missing_codes_fall_back_to_generic_message() {
        let err = ApiError::from_backend(&BackendError::new("42P01", "relation does not exist"));
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.message, "Something went wrong");
        assert_eq!(err.details.as_deref(), Some("relation does not exist"));

        let bare = BackendError {
            code: None,
            message: String::new(),
            details: None,
            status: None,
        };
        let err = ApiError::from_backend(&bare);
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.code, UNKNOWN_CODE);
        assert!(err.details.is_none());
    }

    #[test]
    fn null_result_has_its_own_kind() {
        let err = ApiError::null_result();
        assert_eq!(err.kind, ErrorKind::NullResult);
        assert_eq!(err.code, NULL_RESULT_CODE);
        assert_eq!(err.to_string(), "Data not found");
    }

    #[test]
    fn missing_session_is_forbidden() {
        let err = ApiError::from_backend(&BackendError::session_missing());
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }
}
