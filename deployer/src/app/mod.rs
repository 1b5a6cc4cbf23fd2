//! Application layer for the `swdeployer` binary

pub mod definition;
pub mod options;
pub mod run;
pub mod settings;
