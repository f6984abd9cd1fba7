//! # Store Error Types
//!
//! Error types for catalog mirror and bill log operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Store Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Transport    │  │    Response     │  │       Local Log         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Http           │  │  Status         │  │  Io                     │ │
//! │  │  Timeout        │  │  InvalidBody    │  │  Serde                  │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Catalog callers never see these as failures: a load error degrades    │
//! │  to the default catalog, a mutation error parks on the outbox.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store error type covering mirror and bill-log failures.
#[derive(Debug, Error)]
pub enum StoreError {
    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// HTTP request failed before a response arrived (DNS, connect, TLS).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request timed out.
    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    // =========================================================================
    // Response Errors
    // =========================================================================
    /// The mirror answered with a non-success status.
    #[error("Mirror returned status {code}")]
    Status { code: u16 },

    /// Response body did not parse as the expected shape.
    #[error("Invalid mirror response: {0}")]
    InvalidBody(String),

    // =========================================================================
    // Local Log Errors
    // =========================================================================
    /// Bill log file I/O failed.
    #[error("Bill log I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bill log content did not parse.
    #[error("Bill log parse error: {0}")]
    Serde(#[from] serde_json::Error),

    /// No usable data directory on this platform.
    #[error("No data directory available for the bill log")]
    NoDataDir,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return StoreError::Timeout(30);
        }
        if let Some(status) = err.status() {
            return StoreError::Status {
                code: status.as_u16(),
            };
        }
        if err.is_decode() {
            return StoreError::InvalidBody(err.to_string());
        }
        StoreError::Http(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for outbox retry logic)
// =============================================================================

impl StoreError {
    /// Returns true if this error is transient and the mirror op can be
    /// retried.
    ///
    /// ## Retryable
    /// - Network/connect failures and timeouts
    /// - 429 and 5xx responses
    ///
    /// ## Non-Retryable
    /// - 4xx responses other than 429 (the op itself is bad)
    /// - Malformed response bodies
    /// - Local log failures
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Http(_) | StoreError::Timeout(_) => true,
            StoreError::Status { code } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(StoreError::Http("connection refused".into()).is_retryable());
        assert!(StoreError::Timeout(30).is_retryable());
        assert!(StoreError::Status { code: 503 }.is_retryable());
        assert!(StoreError::Status { code: 429 }.is_retryable());

        assert!(!StoreError::Status { code: 400 }.is_retryable());
        assert!(!StoreError::Status { code: 404 }.is_retryable());
        assert!(!StoreError::InvalidBody("not json".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::Status { code: 503 };
        assert_eq!(err.to_string(), "Mirror returned status 503");
    }
}
