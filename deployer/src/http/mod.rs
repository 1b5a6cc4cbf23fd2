//! REST backend client

pub mod backend;
pub mod client;
pub mod configs;
pub mod deployments;

pub use client::HttpClient;
