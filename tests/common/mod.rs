//! Common test utilities and helper modules
//!
//! Fakes for the HTTP transport and the game socket, plus wire fixtures
//! shared by the integration tests.
#![allow(dead_code)]

pub mod fake_socket;
pub mod fake_transport;
pub mod fixtures;
