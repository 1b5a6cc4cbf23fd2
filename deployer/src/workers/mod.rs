//! Background workers

pub mod poller;
