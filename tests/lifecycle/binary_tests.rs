//! End-to-end runs of the built binaries

use std::io::Write;
use std::process::{Command, Stdio};

use hull_server::{Strategy, BANNER};

use crate::common::TestServer;

#[test]
fn test_server_rejects_missing_config_file() {
    let output = Command::new(env!("CARGO_BIN_EXE_hull-server"))
        .args(["--config", "/definitely/not/here.toml"])
        .output()
        .expect("Failed to run hull-server");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid configuration"), "{}", stderr);
}

#[test]
fn test_server_rejects_taken_port() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port().to_string();

    let output = Command::new(env!("CARGO_BIN_EXE_hull-server"))
        .args(["--host", "127.0.0.1", "--port", &port])
        .output()
        .expect("Failed to run hull-server");

    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_client_session_against_server() {
    let server = TestServer::start(Strategy::Threaded);

    let mut child = Command::new(env!("CARGO_BIN_EXE_hull-client"))
        .args(["--port", &server.addr().port().to_string()])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to run hull-client");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(b"Newpoint 1,2\nHello\nExit\nNewpoint 3,4\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with(BANNER), "{}", stdout);
    assert!(stdout.contains("Point (1,2) added."));
    assert!(stdout.contains("Unknown command."));
    assert_eq!(server.store().len(), 1);
}
