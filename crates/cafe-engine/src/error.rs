//! Error taxonomy shared by the chat and upload widgets.
//!
//! Nothing here is fatal: validation errors are shown inline next to the
//! widget that raised them, transport errors become a fallback message in
//! the transcript or an error line under the upload form.

/// Input rejected before any state change or network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Chat input was empty or whitespace only.
    #[error("Please type a question first")]
    EmptyInput,

    /// The selected file does not carry an `image/*` MIME type.
    #[error("Please select a valid image ({mime} is not an image)")]
    NotAnImage {
        /// MIME type that was rejected.
        mime: String,
    },

    /// Submit was pressed with nothing selected.
    #[error("Please select an image")]
    NoFileSelected,

    /// Submit was pressed while an analysis is still running.
    #[error("An analysis is already in progress")]
    Busy,
}

/// Failure while talking to one of the remote endpoints.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, reset, and so on.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("Server returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, kept for logging.
        body: String,
    },

    /// The body was not the JSON we expected.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The request could not be built (bad MIME string, bad URL).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_are_user_facing() {
        let err = ValidationError::NotAnImage {
            mime: "text/plain".into(),
        };
        assert_eq!(
            err.to_string(),
            "Please select a valid image (text/plain is not an image)"
        );
        assert_eq!(
            ValidationError::NoFileSelected.to_string(),
            "Please select an image"
        );
    }

    #[test]
    fn test_json_error_maps_to_malformed() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let transport: TransportError = err.into();
        assert!(matches!(transport, TransportError::Malformed(_)));
    }

    #[test]
    fn test_status_display() {
        let err = TransportError::Status {
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "Server returned HTTP 502");
    }
}
