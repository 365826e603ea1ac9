//! Protocol scenarios over real sockets

pub mod protocol_tests;
