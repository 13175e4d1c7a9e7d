//! Dispatch configuration

use std::time::Duration;

/// Configuration for the dispatch engine
///
/// The acknowledgement deadline is platform-mandated; the default matches
/// the platform's published budget. Lower it in tests to keep timeout
/// paths fast.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// How long a handler has to acknowledge before the interaction is
    /// force-closed and reported as timed out
    pub ack_deadline: Duration,

    /// Message text of the generic error acknowledgement emitted when a
    /// handler faults before acknowledging
    pub error_message: String,

    /// Whether the generic error acknowledgement is only visible to the
    /// invoking user
    pub error_ephemeral: bool,
}

/// Wire flag marking a message as visible only to the invoker
const EPHEMERAL_FLAG: u64 = 1 << 6;

impl DispatchConfig {
    /// The opaque payload of the generic error acknowledgement
    pub(crate) fn error_data(&self) -> serde_json::Value {
        if self.error_ephemeral {
            serde_json::json!({"content": self.error_message, "flags": EPHEMERAL_FLAG})
        } else {
            serde_json::json!({"content": self.error_message})
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            ack_deadline: Duration::from_secs(3),
            error_message: "Something went wrong while running this command.".to_string(),
            error_ephemeral: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.ack_deadline, Duration::from_secs(3));
        assert!(config.error_ephemeral);
    }

    #[test]
    fn test_error_data_flags() {
        let config = DispatchConfig::default();
        assert_eq!(config.error_data()["flags"], 64);

        let loud = DispatchConfig {
            error_ephemeral: false,
            ..DispatchConfig::default()
        };
        assert!(loud.error_data().get("flags").is_none());
    }
}
