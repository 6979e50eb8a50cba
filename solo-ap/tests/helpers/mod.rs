//! Test helper modules for solo-ap integration tests
//!
//! - FakeBackend: scripted in-memory media backend with a monitor for
//!   inspecting what the coordinator asked of it

#![allow(dead_code)]

pub mod fake_backend;

pub use fake_backend::{BackendCall, FakeBackend, FakeMonitor};
