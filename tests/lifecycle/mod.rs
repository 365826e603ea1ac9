//! Startup, shutdown, monitor and binary tests

pub mod binary_tests;
pub mod monitor_tests;
pub mod shutdown_tests;
