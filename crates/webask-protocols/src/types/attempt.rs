//! Attempt history and terminal run outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BlockVerdict, ExtractionResult};

/// Result of a single inject-poll-classify-extract cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Blocked(BlockVerdict),
    TimedOut,
    NoTargetFound,
    NoActiveTarget,
    ExtractionEmpty,
    Cancelled,
    InjectionFailed(String),
    CaptureFailed(String),
}

impl AttemptOutcome {
    /// The failure this outcome represents, if any.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::Success => None,
            Self::Blocked(verdict) => Some(FailureReason::BlockDetected(*verdict)),
            Self::TimedOut => Some(FailureReason::PollTimeout),
            Self::NoTargetFound => Some(FailureReason::TargetNotFound),
            Self::NoActiveTarget => Some(FailureReason::NoActiveTarget),
            Self::ExtractionEmpty => Some(FailureReason::ExtractionEmpty),
            Self::Cancelled => Some(FailureReason::Cancelled),
            Self::InjectionFailed(msg) => Some(FailureReason::InjectionFailed(msg.clone())),
            Self::CaptureFailed(msg) => Some(FailureReason::CaptureFailed(msg.clone())),
        }
    }
}

impl From<FailureReason> for AttemptOutcome {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::TargetNotFound => Self::NoTargetFound,
            FailureReason::NoActiveTarget => Self::NoActiveTarget,
            FailureReason::BlockDetected(verdict) => Self::Blocked(verdict),
            FailureReason::PollTimeout => Self::TimedOut,
            FailureReason::ExtractionEmpty => Self::ExtractionEmpty,
            FailureReason::Cancelled => Self::Cancelled,
            FailureReason::InjectionFailed(msg) => Self::InjectionFailed(msg),
            FailureReason::CaptureFailed(msg) => Self::CaptureFailed(msg),
        }
    }
}

/// One recorded attempt. Attempts are append-only; a failed attempt is
/// never re-run in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// 1-based attempt number within the run.
    pub attempt_number: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
}

/// Terminal failure classification reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    TargetNotFound,
    NoActiveTarget,
    BlockDetected(BlockVerdict),
    PollTimeout,
    ExtractionEmpty,
    Cancelled,
    InjectionFailed(String),
    CaptureFailed(String),
}

impl FailureReason {
    /// Whether another attempt may follow this failure.
    ///
    /// Blocking is retryable only when the caller opts in; cancellation
    /// never is.
    pub fn is_retryable(&self, retry_on_block: bool) -> bool {
        match self {
            Self::TargetNotFound
            | Self::PollTimeout
            | Self::ExtractionEmpty
            | Self::NoActiveTarget
            | Self::InjectionFailed(_)
            | Self::CaptureFailed(_) => true,
            Self::BlockDetected(_) => retry_on_block,
            Self::Cancelled => false,
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::TargetNotFound | Self::NoActiveTarget => 2,
            Self::BlockDetected(_) => 3,
            Self::PollTimeout => 4,
            Self::ExtractionEmpty => 5,
            Self::Cancelled => 130,
            Self::InjectionFailed(_) | Self::CaptureFailed(_) => 1,
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TargetNotFound => write!(f, "no open tab matches the target pattern"),
            Self::NoActiveTarget => write!(f, "no focused target for input injection"),
            Self::BlockDetected(verdict) => write!(f, "blocked by target site ({})", verdict),
            Self::PollTimeout => write!(f, "response did not complete before the timeout"),
            Self::ExtractionEmpty => write!(f, "response contained no structured JSON"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::InjectionFailed(msg) => write!(f, "input injection failed: {}", msg),
            Self::CaptureFailed(msg) => write!(f, "page capture failed: {}", msg),
        }
    }
}

/// Terminal result of a whole run. Produced exactly once per run and always
/// carries the full, non-empty attempt history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success {
        result: ExtractionResult,
        attempts: Vec<Attempt>,
    },
    Failure {
        reason: FailureReason,
        attempts: Vec<Attempt>,
    },
}

impl Outcome {
    pub fn attempts(&self) -> &[Attempt] {
        match self {
            Self::Success { attempts, .. } | Self::Failure { attempts, .. } => attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason, .. } => Some(reason),
        }
    }

    /// Process exit code distinguishing success, block, timeout and not-found.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success { .. } => 0,
            Self::Failure { reason, .. } => reason.exit_code(),
        }
    }
}

#[cfg(test)]
#[path = "attempt_tests.rs"]
mod tests;
