//! Sequence-number tracking and anti-replay.
//!
//! Senders number their messages 1, 2, 3, ... and the receiver refuses any
//! message whose number falls below the highest one already accepted. Two
//! policies are layered on top:
//!
//! - [`CounterMode`]: one counter per direction, or the single counter shared
//!   by both directions that SiFT v1.0 peers use on the wire
//! - [`ReplayPolicy`]: whether a number equal to the last accepted one passes

use crate::core::ProtocolError;

/// How send and receive sequence numbers relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterMode {
    /// Independent counters: `next_send` only tracks what we sent, the
    /// receive check only tracks what we accepted.
    #[default]
    PerDirection,
    /// One counter advanced by both sending and receiving (SiFT v1.0
    /// behaviour). Outgoing numbers continue from the last accepted one.
    Shared,
}

/// What to do with a sequence number equal to the last accepted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayPolicy {
    /// Accept equal numbers, reject only regressions.
    ///
    /// A captured message can be replayed once with the same number; only the
    /// AEAD check stands between it and the caller.
    #[default]
    AllowEqual,
    /// Require every accepted number to be strictly greater.
    StrictIncrease,
}

/// Per-connection sequence state.
#[derive(Debug, Clone)]
pub struct SequenceGuard {
    mode: CounterMode,
    policy: ReplayPolicy,
    /// Last sequence number we sent.
    last_sent: u16,
    /// Highest sequence number we accepted.
    last_received: u16,
}

impl SequenceGuard {
    /// Create a guard with both counters at zero.
    pub fn new(mode: CounterMode, policy: ReplayPolicy) -> Self {
        Self {
            mode,
            policy,
            last_sent: 0,
            last_received: 0,
        }
    }

    /// Counter mode in effect.
    pub fn mode(&self) -> CounterMode {
        self.mode
    }

    /// Replay policy in effect.
    pub fn policy(&self) -> ReplayPolicy {
        self.policy
    }

    /// Last sequence number sent (zero before the first message).
    pub fn last_sent(&self) -> u16 {
        self.last_sent
    }

    /// Highest sequence number accepted (zero before the first message).
    pub fn last_received(&self) -> u16 {
        self.last_received
    }

    /// Advance the send counter and return the number for the next message.
    ///
    /// The first message gets 1. Fails once the 16-bit space is used up
    /// rather than wrapping, since a wrapped number would be rejected by the
    /// peer and could repeat a nonce.
    pub fn next_send(&mut self) -> Result<u16, ProtocolError> {
        let sqn = self
            .last_sent
            .checked_add(1)
            .ok_or(ProtocolError::SequenceExhausted)?;

        self.last_sent = sqn;
        if self.mode == CounterMode::Shared {
            self.last_received = sqn;
        }
        Ok(sqn)
    }

    /// Check an incoming sequence number without recording it.
    pub fn check(&self, sqn: u16) -> Result<(), ProtocolError> {
        let last = self.last_received;
        let accepted = match self.policy {
            ReplayPolicy::AllowEqual => sqn >= last,
            ReplayPolicy::StrictIncrease => sqn > last,
        };

        if accepted {
            Ok(())
        } else {
            Err(ProtocolError::BadSequence {
                received: sqn,
                last,
            })
        }
    }

    /// Record an incoming sequence number after the message authenticated.
    pub fn commit(&mut self, sqn: u16) {
        self.last_received = self.last_received.max(sqn);
        if self.mode == CounterMode::Shared {
            self.last_sent = self.last_received;
        }
    }

    /// Check and record in one step.
    pub fn accept(&mut self, sqn: u16) -> Result<(), ProtocolError> {
        self.check(sqn)?;
        self.commit(sqn);
        Ok(())
    }
}

impl Default for SequenceGuard {
    fn default() -> Self {
        Self::new(CounterMode::default(), ReplayPolicy::default())
    }
}
