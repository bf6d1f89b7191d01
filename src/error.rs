//! Error types for vehicle-link operations.
//!
//! Everything the session surfaces to callers is a [`LinkError`]. Malformed or
//! unauthenticated wire frames are not errors at this level: the codec drops them
//! and the ingest task keeps going.
//!
//! ## Error Categories
//!
//! - **Transport Errors**: the byte stream could not be opened, written or read
//! - **Link Errors**: no vehicle is connected, or the session was never started
//! - **Operation Errors**: timeouts, cancellation, missions rejected by the vehicle
//! - **Configuration Errors**: invalid YAML config, duplicate message handlers
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use gcslink::LinkError;
//!
//! let error = LinkError::transport("connection refused");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::time::Duration;
use thiserror::Error;

/// Result type alias for link operations.
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

/// Main error type for link operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LinkError {
    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("No vehicle connected")]
    NotConnected,

    #[error("Session is not running")]
    NotStarted,

    /// Reserved for callers that put their own deadline around a session operation.
    /// The session reports its timeouts in-band: [`CommandAckResult::Timeout`] for
    /// commands and an empty list for mission downloads.
    ///
    /// [`CommandAckResult::Timeout`]: crate::CommandAckResult::Timeout
    #[error("{operation} timed out after {duration:?}")]
    Timeout { operation: String, duration: Duration },

    #[error("{operation} was cancelled")]
    Cancelled { operation: String },

    #[error("Mission transfer rejected by vehicle: {reason} (code {code})")]
    MissionRejected { code: u8, reason: String },

    #[error("Mission has {items} items, more than the {max} one transfer can carry")]
    MissionTooLarge { items: usize, max: usize },

    #[error("A handler for message id {message_id} is already registered")]
    DuplicateHandler { message_id: u32 },

    #[error("Invalid configuration: {details}")]
    Config {
        details: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error during {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl LinkError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            LinkError::Transport { .. } => true,
            LinkError::NotConnected => true,
            LinkError::Timeout { .. } => true,
            LinkError::Io { .. } => true,
            LinkError::NotStarted => false,
            LinkError::Cancelled { .. } => false,
            LinkError::MissionRejected { .. } => false,
            LinkError::MissionTooLarge { .. } => false,
            LinkError::DuplicateHandler { .. } => false,
            LinkError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            LinkError::Transport { .. } => vec![
                "Check that the autopilot or telemetry radio is powered",
                "Verify the host, port or serial bridge address",
                "Restart the session to reopen the transport",
            ],
            LinkError::NotConnected => vec![
                "Wait for the vehicle heartbeat before sending commands",
                "Check the link quality indicator",
            ],
            LinkError::NotStarted => vec!["Start the session before issuing commands"],
            LinkError::Timeout { .. } => vec![
                "Retry the operation",
                "Increase the configured timeout",
                "Check for packet loss on the link",
            ],
            LinkError::Cancelled { .. } => vec!["Reissue the operation if it is still needed"],
            LinkError::MissionRejected { .. } => vec![
                "Check waypoint coordinates and sequence numbers",
                "Reduce the number of mission items",
                "Disarm the vehicle before replacing the mission",
            ],
            LinkError::MissionTooLarge { .. } => {
                vec!["Split the mission or remove items before uploading"]
            }
            LinkError::DuplicateHandler { .. } => {
                vec!["Register exactly one handler per message id"]
            }
            LinkError::Config { .. } => vec![
                "Check the YAML syntax of the configuration file",
                "Compare the file against the documented defaults",
            ],
            LinkError::Io { .. } => vec![
                "Check file permissions",
                "Verify the path exists",
            ],
        }
    }

    /// Helper constructor for transport errors.
    pub fn transport(reason: impl Into<String>) -> Self {
        LinkError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_with_source(
        reason: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        LinkError::Transport { reason: reason.into(), source: Some(Box::new(source)) }
    }

    /// Helper constructor for caller-side deadlines, e.g. around `tokio::time::timeout`.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        LinkError::Timeout { operation: operation.into(), duration }
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        LinkError::Cancelled { operation: operation.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(details: impl Into<String>) -> Self {
        LinkError::Config { details: details.into(), source: None }
    }

    pub fn config_with_source(
        details: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        LinkError::Config { details: details.into(), source: Some(Box::new(source)) }
    }

    /// Helper constructor for I/O errors with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        LinkError::Io { context: context.into(), source }
    }
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Io { context: "transport I/O".to_string(), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn messages_carry_their_context(
            reason in ".*",
            operation in "\\w+",
            code in any::<u8>(),
            duration_ms in 1u64..60000u64
          ) {
            let transport = LinkError::transport(reason.clone());
            prop_assert!(transport.to_string().contains(&reason));

            let timeout = LinkError::timeout(operation.clone(), Duration::from_millis(duration_ms));
            prop_assert!(timeout.to_string().contains(&operation));

            let rejected = LinkError::MissionRejected { code, reason: reason.clone() };
            let rejected_msg = rejected.to_string();
            prop_assert!(rejected_msg.contains(&code.to_string()));
            prop_assert!(rejected_msg.contains(&reason));
          }

          #[test]
          fn source_chain_is_preserved(
            base_message in ".*",
            layers in prop::collection::vec(".*", 1..4)
          ) {
            let mut current: Box<dyn std::error::Error + Send + Sync> =
              Box::new(std::io::Error::other(base_message.clone()));
            for reason in &layers {
              current = Box::new(LinkError::Transport { reason: reason.clone(), source: Some(current) });
            }

            let mut depth = 0;
            let mut found_base = false;
            let mut cursor: Option<&(dyn std::error::Error + 'static)> = Some(current.as_ref());
            while let Some(err) = cursor {
              depth += 1;
              if err.to_string().contains(&base_message) {
                found_base = true;
              }
              cursor = err.source();
            }

            prop_assert_eq!(depth, layers.len() + 1);
            prop_assert!(found_base);
          }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<LinkError>();

        let error = LinkError::NotConnected;
        let _: &dyn std::error::Error = &error;
    }

    #[tokio::test(start_paused = true)]
    async fn caller_deadline_maps_to_timeout() {
        let limit = Duration::from_secs(2);
        let err = tokio::time::timeout(limit, std::future::pending::<()>())
            .await
            .map_err(|_| LinkError::timeout("parameter sync", limit))
            .expect_err("never resolves");
        assert_eq!(err.to_string(), "parameter sync timed out after 2s");
        assert!(err.is_retryable());
    }

    #[test]
    fn retry_classification() {
        assert!(LinkError::transport("refused").is_retryable());
        assert!(LinkError::NotConnected.is_retryable());
        assert!(LinkError::timeout("command", Duration::from_secs(3)).is_retryable());
        assert!(!LinkError::cancelled("download").is_retryable());
        assert!(!LinkError::DuplicateHandler { message_id: 0 }.is_retryable());
        assert!(!LinkError::config("bad").is_retryable());
        assert!(!LinkError::MissionTooLarge { items: 70_000, max: 65_535 }.is_retryable());

        for err in [LinkError::NotConnected, LinkError::NotStarted, LinkError::config("x")] {
            let suggestions = err.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn io_errors_convert() {
        let err: LinkError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        match err {
            LinkError::Io { source, .. } => assert_eq!(source.to_string(), "gone"),
            other => panic!("expected Io, got {other:?}"),
        }
    }
}
