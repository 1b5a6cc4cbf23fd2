//! Finite State Machine for the deployment resource
//!
//! Tracks the resource's current `(action, status)`. Handlers begin an
//! action, completion checks settle it.

use rpc_models::{Action, DeploymentStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current action and its status; no action means INIT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    pub action: Option<Action>,
    pub status: DeploymentStatus,
}

impl ResourceState {
    /// State before any action has run
    pub const INIT: ResourceState = ResourceState {
        action: None,
        status: DeploymentStatus::Complete,
    };

    pub fn new(action: Action, status: DeploymentStatus) -> Self {
        Self {
            action: Some(action),
            status,
        }
    }

    pub fn is_init(&self) -> bool {
        self.action.is_none()
    }

    pub fn is_settled(&self) -> bool {
        self.status != DeploymentStatus::InProgress
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            Some(action) => write!(f, "{}_{}", action, self.status),
            None => f.write_str("INIT_COMPLETE"),
        }
    }
}

/// Resource event
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceEvent {
    /// A handler started an action
    Begin(Action),

    /// The action's completion check reported done
    Complete,

    /// The action failed
    Fail(String),
}

/// Resource FSM
#[derive(Debug, Clone)]
pub struct ResourceFsm {
    state: ResourceState,
    error: Option<String>,
}

impl ResourceFsm {
    /// Create a new FSM in INIT state
    pub fn new() -> Self {
        Self {
            state: ResourceState::INIT,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// Current action, if any has begun
    pub fn action(&self) -> Option<Action> {
        self.state.action
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Force the state, e.g. when restoring a persisted resource
    pub fn state_set(&mut self, action: Action, status: DeploymentStatus) {
        self.state = ResourceState::new(action, status);
        if status != DeploymentStatus::Failed {
            self.error = None;
        }
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: ResourceEvent) -> Result<(), String> {
        use DeploymentStatus::*;

        let state = self.state;
        let new_state = match (state.action, state.status, &event) {
            // Delete may interrupt anything
            (_, _, ResourceEvent::Begin(Action::Delete)) => {
                ResourceState::new(Action::Delete, InProgress)
            }

            // Create
            (None, _, ResourceEvent::Begin(Action::Create))
            | (Some(Action::Create), Failed, ResourceEvent::Begin(Action::Create)) => {
                ResourceState::new(Action::Create, InProgress)
            }

            // Update
            (Some(action), status, ResourceEvent::Begin(Action::Update))
                if action != Action::Delete && status != InProgress =>
            {
                ResourceState::new(Action::Update, InProgress)
            }

            // Suspend
            (Some(Action::Create | Action::Update | Action::Resume), Complete, ResourceEvent::Begin(Action::Suspend))
            | (Some(Action::Suspend), Failed, ResourceEvent::Begin(Action::Suspend)) => {
                ResourceState::new(Action::Suspend, InProgress)
            }

            // Resume
            (Some(Action::Suspend), Complete, ResourceEvent::Begin(Action::Resume))
            | (Some(Action::Resume), Failed, ResourceEvent::Begin(Action::Resume)) => {
                ResourceState::new(Action::Resume, InProgress)
            }

            // Settle
            (Some(action), InProgress | Complete, ResourceEvent::Complete) => {
                ResourceState::new(action, Complete)
            }
            (Some(action), InProgress, ResourceEvent::Fail(reason)) => {
                self.error = Some(reason.clone());
                ResourceState::new(action, Failed)
            }

            // Invalid transitions
            (_, _, event) => {
                return Err(format!("Invalid transition: {} -> {:?}", state, event));
            }
        };

        if matches!(event, ResourceEvent::Begin(_)) {
            self.error = None;
        }
        self.state = new_state;
        Ok(())
    }
}

impl Default for ResourceFsm {
    fn default() -> Self {
        Self::new()
    }
}
