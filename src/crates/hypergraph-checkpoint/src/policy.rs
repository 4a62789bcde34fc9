//! Durability and retention knobs for a checkpointer.

use crate::error::{CheckpointError, Result};
use std::time::Duration;

/// When a checkpointer commits a step to durable storage relative to the
/// scheduler advancing to the next superstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Block until the step is written before the scheduler continues.
    Sync,
    /// Dispatch the write in the background; gathered at run end.
    Async,
    /// Buffer in memory and flush once, when the run completes.
    Exit,
}

/// How much step history a checkpointer keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Every step, enabling replay/time-travel.
    Full,
    /// Only the materialized terminal state.
    Latest,
    /// The last `N` supersteps' worth of steps.
    Windowed(u32),
}

/// Controls checkpoint durability and retention.
///
/// `durability = Exit` requires `retention = Latest`: with exit-mode
/// durability nothing is persisted mid-run, so windowed/full retention
/// (which assume steps are durable as the run progresses) cannot be
/// satisfied.
#[derive(Debug, Clone)]
pub struct CheckpointPolicy {
    durability: Durability,
    retention: Retention,
    ttl: Option<Duration>,
}

impl CheckpointPolicy {
    /// Build a policy, rejecting the `Exit` + non-`Latest` combination.
    pub fn new(durability: Durability, retention: Retention) -> Result<Self> {
        if durability == Durability::Exit && retention != Retention::Latest {
            return Err(CheckpointError::InvalidPolicy(
                "durability=Exit requires retention=Latest: steps are not persisted mid-run"
                    .to_string(),
            ));
        }
        Ok(Self {
            durability,
            retention,
            ttl: None,
        })
    }

    /// Attach a TTL after which completed runs become eligible for purging.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// The configured durability mode.
    pub fn durability(&self) -> Durability {
        self.durability
    }

    /// The configured retention mode.
    pub fn retention(&self) -> Retention {
        self.retention
    }

    /// The configured TTL, if any.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

impl Default for CheckpointPolicy {
    fn default() -> Self {
        Self {
            durability: Durability::Async,
            retention: Retention::Full,
            ttl: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_durability_requires_latest_retention() {
        let err = CheckpointPolicy::new(Durability::Exit, Retention::Full).unwrap_err();
        assert!(matches!(err, CheckpointError::InvalidPolicy(_)));
    }

    #[test]
    fn exit_durability_with_latest_retention_is_valid() {
        assert!(CheckpointPolicy::new(Durability::Exit, Retention::Latest).is_ok());
    }

    #[test]
    fn default_policy_is_async_full() {
        let policy = CheckpointPolicy::default();
        assert_eq!(policy.durability(), Durability::Async);
        assert_eq!(policy.retention(), Retention::Full);
    }
}
