use std::time::Duration;

/// Fixed-interval, bounded reconnect configuration.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ReconnectPolicy {
    pub(crate) interval: Duration,
    pub(crate) max_attempts: u32,
}

impl ReconnectPolicy {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.interval.is_zero() {
            return Err("Reconnect interval must be > 0".to_string());
        }
        Ok(())
    }
}

/// What the scheduler decided after an unexpected close.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ReconnectDecision {
    /// Arm the reconnect timer for `delay`; this is attempt number `attempt`.
    Retry { attempt: u32, delay: Duration },
    /// The attempt budget is spent; stay closed until the caller connects again.
    Exhausted { attempts: u32 },
    /// A timer is already armed; the close is ignored.
    AlreadyScheduled,
}

/// Bounded-attempt reconnection bookkeeping.
///
/// Owns the attempt counter and the "timer armed" flag; the actor owns the
/// timer itself.
#[derive(Debug)]
pub(crate) struct ReconnectScheduler {
    policy: ReconnectPolicy,
    attempt: u32,
    armed: bool,
}

impl ReconnectScheduler {
    pub(crate) fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            armed: false,
        }
    }

    /// Decide what to do about an unexpected close.
    pub(crate) fn on_close(&mut self) -> ReconnectDecision {
        if self.armed {
            return ReconnectDecision::AlreadyScheduled;
        }
        if self.attempt >= self.policy.max_attempts {
            return ReconnectDecision::Exhausted {
                attempts: self.attempt,
            };
        }

        self.attempt += 1;
        self.armed = true;
        ReconnectDecision::Retry {
            attempt: self.attempt,
            delay: self.policy.interval,
        }
    }

    /// The armed timer fired or was cancelled.
    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }

    /// Forget all attempts, e.g. after a successful open.
    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
        self.armed = false;
    }

    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }
}
