//! Software deployment engine
//!
//! Applies software configs to servers, tracks each deployment through its
//! lifecycle and receives completion signals over a pluggable transport.

pub mod app;
pub mod clients;
pub mod deploy;
pub mod errors;
pub mod http;
pub mod logs;
pub mod signal;
pub mod utils;
pub mod workers;
