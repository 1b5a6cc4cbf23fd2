//! Deployment module

pub mod actions;
pub mod data;
pub mod derivation;
pub mod fsm;
pub mod group;
pub mod lifecycle;
pub mod properties;
pub mod resource;

pub use group::SoftwareDeploymentGroup;
pub use lifecycle::SoftwareDeployment;
