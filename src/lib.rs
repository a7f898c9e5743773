//! Clipgate - batch media validation against format/codec/size policy
//!
//! This library crate exposes the core functionality for integration testing.

pub mod bridge;
pub mod classify;
pub mod config;
pub mod probe;
pub mod record;
pub mod report;
pub mod scheduler;
pub mod timeline;
