//! Per-keyspace retry state machine
//!
//! ```text
//! Attempting(n) --ok--> Succeeded
//! Attempting(n) --err, n < max--> Attempting(n + 1)
//! Attempting(n) --err, n == max--> Failed
//! ```
//!
//! `Succeeded` and `Failed` are terminal.

/// Retry state of one keyspace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Running attempt `n` (1-based)
    Attempting(u32),
    /// Migrated
    Succeeded,
    /// Gave up after the last attempt
    Failed,
}

impl AttemptState {
    /// Initial state
    #[inline]
    #[must_use]
    pub const fn start() -> Self {
        Self::Attempting(1)
    }

    /// Transition after a successful attempt
    #[inline]
    #[must_use]
    pub const fn on_success(self) -> Self {
        match self {
            Self::Attempting(_) | Self::Succeeded => Self::Succeeded,
            Self::Failed => Self::Failed,
        }
    }

    /// Transition after a failed attempt, bounded by `max_attempts`
    #[inline]
    #[must_use]
    pub const fn on_failure(self, max_attempts: u32) -> Self {
        match self {
            Self::Attempting(n) if n < max_attempts => Self::Attempting(n + 1),
            Self::Attempting(_) | Self::Failed => Self::Failed,
            Self::Succeeded => Self::Succeeded,
        }
    }

    /// No further attempts will be made
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Attempting(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn three_failures_exhaust_attempts() {
        let state = AttemptState::start();
        let state = state.on_failure(3);
        assert_eq!(state, AttemptState::Attempting(2));
        let state = state.on_failure(3);
        assert_eq!(state, AttemptState::Attempting(3));
        assert_eq!(state.on_failure(3), AttemptState::Failed);
    }

    #[test]
    fn success_on_third_attempt() {
        let state = AttemptState::start().on_failure(3).on_failure(3).on_success();
        assert_eq!(state, AttemptState::Succeeded);
        assert!(state.is_terminal());
    }

    #[test]
    fn terminal_states_absorb() {
        assert_eq!(AttemptState::Failed.on_success(), AttemptState::Failed);
        assert_eq!(AttemptState::Succeeded.on_failure(3), AttemptState::Succeeded);
    }

    proptest! {
        #[test]
        fn prop_failures_reach_failed_after_exactly_max(max in 1u32..10) {
            let mut state = AttemptState::start();
            let mut attempts = 0;
            while !state.is_terminal() {
                attempts += 1;
                state = state.on_failure(max);
            }
            prop_assert_eq!(attempts, max);
            prop_assert_eq!(state, AttemptState::Failed);
        }
    }
}
