//! Backend wire models
//!
//! Records and request bodies exchanged with the software config and
//! deployment backend.

pub mod models;

pub use models::*;
