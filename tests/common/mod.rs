//! Common test utilities for hull-server integration tests
//!
//! This module provides:
//! - `TestServer` for running a server on an ephemeral port with a chosen strategy
//! - `LineClient` for speaking the line protocol in tests

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod line_client;
pub mod test_server;

pub use line_client::LineClient;
pub use test_server::{for_each_strategy, TestServer};
