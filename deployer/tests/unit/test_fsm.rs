//! FSM unit tests

use rpc_models::{Action, DeploymentStatus};
use swdeployer::deploy::fsm::{ResourceEvent, ResourceFsm, ResourceState};

#[test]
fn test_fsm_initial_state() {
    let fsm = ResourceFsm::new();
    assert_eq!(fsm.state(), ResourceState::INIT);
    assert_eq!(fsm.state().to_string(), "INIT_COMPLETE");
    assert!(fsm.action().is_none());
    assert!(fsm.error().is_none());
}

#[test]
fn test_fsm_create_success_flow() {
    let mut fsm = ResourceFsm::new();

    // INIT -> CREATE_IN_PROGRESS
    fsm.process(ResourceEvent::Begin(Action::Create)).unwrap();
    assert_eq!(fsm.state().to_string(), "CREATE_IN_PROGRESS");
    assert!(!fsm.state().is_settled());

    // CREATE_IN_PROGRESS -> CREATE_COMPLETE
    fsm.process(ResourceEvent::Complete).unwrap();
    assert_eq!(fsm.state(), ResourceState::new(Action::Create, DeploymentStatus::Complete));

    // Completing twice is harmless
    fsm.process(ResourceEvent::Complete).unwrap();
    assert_eq!(fsm.state().to_string(), "CREATE_COMPLETE");
}

#[test]
fn test_fsm_create_retry_after_failure() {
    let mut fsm = ResourceFsm::new();
    fsm.process(ResourceEvent::Begin(Action::Create)).unwrap();
    fsm.process(ResourceEvent::Fail("Deployment to server failed".to_string()))
        .unwrap();
    assert_eq!(fsm.state().to_string(), "CREATE_FAILED");
    assert_eq!(fsm.error(), Some("Deployment to server failed"));

    fsm.process(ResourceEvent::Begin(Action::Create)).unwrap();
    assert!(fsm.error().is_none());

    // Create only starts once it has succeeded
    fsm.process(ResourceEvent::Complete).unwrap();
    assert!(fsm.process(ResourceEvent::Begin(Action::Create)).is_err());
}

#[test]
fn test_fsm_suspend_resume() {
    let mut fsm = ResourceFsm::new();
    assert!(fsm.process(ResourceEvent::Begin(Action::Suspend)).is_err());
    assert!(fsm.process(ResourceEvent::Begin(Action::Resume)).is_err());

    fsm.process(ResourceEvent::Begin(Action::Create)).unwrap();
    fsm.process(ResourceEvent::Complete).unwrap();
    assert!(fsm.process(ResourceEvent::Begin(Action::Resume)).is_err());

    fsm.process(ResourceEvent::Begin(Action::Suspend)).unwrap();
    fsm.process(ResourceEvent::Fail("timeout".to_string())).unwrap();
    fsm.process(ResourceEvent::Begin(Action::Suspend)).unwrap();
    fsm.process(ResourceEvent::Complete).unwrap();
    assert_eq!(fsm.state().to_string(), "SUSPEND_COMPLETE");

    fsm.process(ResourceEvent::Begin(Action::Resume)).unwrap();
    fsm.process(ResourceEvent::Complete).unwrap();
    assert_eq!(fsm.action(), Some(Action::Resume));
}

#[test]
fn test_fsm_update_requires_settled_state() {
    let mut fsm = ResourceFsm::new();
    assert!(fsm.process(ResourceEvent::Begin(Action::Update)).is_err());

    fsm.process(ResourceEvent::Begin(Action::Create)).unwrap();
    assert!(fsm.process(ResourceEvent::Begin(Action::Update)).is_err());

    fsm.process(ResourceEvent::Fail("boom".to_string())).unwrap();
    fsm.process(ResourceEvent::Begin(Action::Update)).unwrap();
    assert_eq!(fsm.state().to_string(), "UPDATE_IN_PROGRESS");
}

#[test]
fn test_fsm_delete_from_any_state() {
    let mut fsm = ResourceFsm::new();
    fsm.process(ResourceEvent::Begin(Action::Delete)).unwrap();
    fsm.process(ResourceEvent::Complete).unwrap();
    assert_eq!(fsm.state().to_string(), "DELETE_COMPLETE");

    // Nothing but another delete follows a delete
    assert!(fsm.process(ResourceEvent::Begin(Action::Update)).is_err());

    let mut fsm = ResourceFsm::new();
    fsm.process(ResourceEvent::Begin(Action::Create)).unwrap();
    fsm.process(ResourceEvent::Begin(Action::Delete)).unwrap();
    assert_eq!(fsm.action(), Some(Action::Delete));
}

#[test]
fn test_fsm_invalid_settle() {
    let mut fsm = ResourceFsm::new();
    assert!(fsm.process(ResourceEvent::Complete).is_err());
    assert!(fsm.process(ResourceEvent::Fail("x".to_string())).is_err());

    fsm.process(ResourceEvent::Begin(Action::Create)).unwrap();
    fsm.process(ResourceEvent::Complete).unwrap();
    let err = fsm.process(ResourceEvent::Fail("late".to_string())).unwrap_err();
    assert!(err.starts_with("Invalid transition: CREATE_COMPLETE"));
}

#[test]
fn test_fsm_state_set() {
    let mut fsm = ResourceFsm::new();
    fsm.state_set(Action::Update, DeploymentStatus::Complete);
    assert_eq!(fsm.state().to_string(), "UPDATE_COMPLETE");
    fsm.process(ResourceEvent::Begin(Action::Suspend)).unwrap();
}
