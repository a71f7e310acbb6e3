//! Session configuration.

use crate::core::{MAX_MESSAGE_SIZE, MESSAGE_OVERHEAD};
use crate::crypto::{CounterMode, ReplayPolicy};

/// Per-session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MtpConfig {
    /// Per-direction or shared sequence counter.
    pub counter_mode: CounterMode,

    /// Whether equal sequence numbers are accepted.
    pub replay_policy: ReplayPolicy,

    /// Largest payload accepted by `send_msg`.
    ///
    /// Capped per message type by what fits in the 16-bit length field.
    pub max_payload_len: usize,
}

impl MtpConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> MtpConfigBuilder {
        MtpConfigBuilder::default()
    }

    /// Settings that match a deployed SiFT v1.0 peer on the wire.
    pub fn legacy() -> Self {
        Self {
            counter_mode: CounterMode::Shared,
            ..Self::default()
        }
    }
}

impl Default for MtpConfig {
    fn default() -> Self {
        Self {
            counter_mode: CounterMode::PerDirection,
            replay_policy: ReplayPolicy::AllowEqual,
            max_payload_len: MAX_MESSAGE_SIZE - MESSAGE_OVERHEAD,
        }
    }
}

/// Builder for [`MtpConfig`].
#[derive(Debug, Default)]
pub struct MtpConfigBuilder {
    config: MtpConfig,
}

impl MtpConfigBuilder {
    /// Set the counter mode.
    pub fn counter_mode(mut self, mode: CounterMode) -> Self {
        self.config.counter_mode = mode;
        self
    }

    /// Set the replay policy.
    pub fn replay_policy(mut self, policy: ReplayPolicy) -> Self {
        self.config.replay_policy = policy;
        self
    }

    /// Set the largest outgoing payload.
    pub fn max_payload_len(mut self, len: usize) -> Self {
        self.config.max_payload_len = len;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MtpConfig {
        self.config
    }
}
