//! Orchestrator states.

use std::fmt;

use serde::Serialize;

/// Phase of an ask run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    Locating,
    Injecting,
    Polling,
    Classifying,
    Extracting,
    Retrying,
    Succeeded,
    Failed,
}

impl OrchestratorState {
    /// Whether the run has ended.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(self, next: OrchestratorState) -> bool {
        use OrchestratorState::*;
        match (self, next) {
            (Idle, Locating) | (Idle, Injecting) => true,
            (Locating, Injecting) | (Locating, Retrying) | (Locating, Failed) => true,
            (Injecting, Polling) | (Injecting, Retrying) | (Injecting, Failed) => true,
            (Polling, Classifying) | (Polling, Retrying) | (Polling, Failed) => true,
            (Classifying, Extracting) | (Classifying, Retrying) | (Classifying, Failed) => true,
            (Extracting, Succeeded) | (Extracting, Retrying) | (Extracting, Failed) => true,
            (Retrying, Locating) | (Retrying, Injecting) | (Retrying, Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Locating => "locating",
            Self::Injecting => "injecting",
            Self::Polling => "polling",
            Self::Classifying => "classifying",
            Self::Extracting => "extracting",
            Self::Retrying => "retrying",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
