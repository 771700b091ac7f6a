//! Per-request analysis state machine
//!
//! `received -> guided -> executing -> priced -> done`, with `failed`
//! reachable from every non-terminal state. Terminal states accept no
//! further transitions.

use serde::{Deserialize, Serialize};
use sdk::errors::EngineError;
use std::fmt;

use super::checklist::StepChecklist;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Received,
    Guided,
    Executing,
    Priced,
    Done,
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Guided => "guided",
            Self::Executing => "executing",
            Self::Priced => "priced",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn can_transition_to(&self, next: SessionState) -> bool {
        match (self, next) {
            (from, Self::Failed) => !from.is_terminal(),
            (Self::Received, Self::Guided)
            | (Self::Guided, Self::Executing)
            | (Self::Executing, Self::Priced)
            | (Self::Priced, Self::Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State owned by a single orchestration run
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    state: SessionState,
    history: Vec<SessionState>,
    pub task_kind: Option<String>,
    pub checklist: StepChecklist,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Received,
            history: vec![SessionState::Received],
            task_kind: None,
            checklist: StepChecklist::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state visited, in order
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    pub fn transition(&mut self, next: SessionState) -> Result<(), EngineError> {
        if !self.state.can_transition_to(next) {
            return Err(EngineError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Abort the session
    pub fn fail(&mut self) -> Result<(), EngineError> {
        self.transition(SessionState::Failed)
    }

    pub fn completed_steps(&self) -> Vec<String> {
        self.checklist.completed().to_vec()
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}
