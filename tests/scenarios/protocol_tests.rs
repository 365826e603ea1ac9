//! Line protocol behavior, checked under every dispatch strategy

use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream};
use std::thread;
use std::time::Duration;

use hull_server::BANNER;

use crate::common::{for_each_strategy, TestServer};

// ============================================================================
// COMMANDS
// ============================================================================

#[test]
fn test_unknown_command_keeps_connection() {
    for_each_strategy(|server| {
        let mut client = server.connect();
        assert_eq!(client.send("Hello"), "Unknown command.", "{}", server.strategy());
        assert_eq!(client.send("ch"), "Unknown command.");
        assert_eq!(
            client.send("CH"),
            "Need at least 3 points to compute convex hull."
        );
    });
}

#[test]
fn test_empty_lines_get_no_reply() {
    for_each_strategy(|server| {
        let mut client = server.connect();
        client.send_raw(b"\n\r\n\n");
        // The next reply must belong to this command, not the blank lines
        assert_eq!(client.send("Bogus"), "Unknown command.", "{}", server.strategy());
    });
}

#[test]
fn test_square_with_interior_point() {
    for_each_strategy(|server| {
        let mut client = server.connect();
        assert_eq!(client.send("Newgraph 5"), "OK. Send 5 points (x,y per line):");
        assert_eq!(client.send("0,0"), "Point added. 4 more to go.");
        assert_eq!(client.send("4,0"), "Point added. 3 more to go.");
        assert_eq!(client.send("4,4"), "Point added. 2 more to go.");
        assert_eq!(client.send("0,4"), "Point added. 1 more to go.");
        assert_eq!(client.send("2,2"), "Graph updated with 5 points.");
        assert_eq!(client.send("CH"), "Convex hull area: 16", "{}", server.strategy());
    });
}

#[test]
fn test_partial_transfer_blocks_commands() {
    for_each_strategy(|server| {
        let mut loader = server.connect();
        assert_eq!(loader.send("Newgraph 2"), "OK. Send 2 points (x,y per line):");
        assert_eq!(loader.send("1,1"), "Point added. 1 more to go.");
        assert_eq!(server.store().len(), 1);
        assert_eq!(server.store().pending_connections(), 1);

        // Commands are read as coordinates until the transfer completes
        assert_eq!(loader.send("CH"), "Invalid point format. Example: 1,2");

        let mut other = server.connect();
        assert_eq!(
            other.send("CH"),
            "Need at least 3 points to compute convex hull.",
            "{}",
            server.strategy()
        );
    });
}

#[test]
fn test_malformed_point_does_not_consume_slot() {
    for_each_strategy(|server| {
        let mut client = server.connect();
        client.send("Newgraph 2");
        assert_eq!(client.send("abc"), "Invalid point format. Example: 1,2");
        assert_eq!(client.send("7"), "Invalid point format. Example: 1,2");
        assert!(server.store().is_empty());
        assert_eq!(client.send("1 2"), "Point added. 1 more to go.");
        assert_eq!(client.send("3,4"), "Graph updated with 2 points.");
        assert_eq!(server.store().pending_connections(), 0);
    });
}

#[test]
fn test_newpoint_then_removepoint() {
    for_each_strategy(|server| {
        let mut client = server.connect();
        assert_eq!(client.send("Newpoint 1,2"), "Point (1,2) added.");
        assert_eq!(server.store().len(), 1);
        assert_eq!(client.send("Removepoint 1,2"), "Point (1,2) removed.");
        assert!(server.store().is_empty());
        assert_eq!(
            client.send("Removepoint 1,2"),
            "Point (1,2) not found.",
            "{}",
            server.strategy()
        );
    });
}

#[test]
fn test_usage_errors() {
    for_each_strategy(|server| {
        let mut client = server.connect();
        assert_eq!(client.send("Newgraph"), "Invalid usage. Example: Newgraph 4");
        assert_eq!(client.send("Newgraph 0"), "Invalid usage. Example: Newgraph 4");
        assert_eq!(client.send("Newgraph -3"), "Invalid usage. Example: Newgraph 4");
        assert_eq!(client.send("Newpoint"), "Invalid usage. Example: Newpoint 1,2");
        assert_eq!(client.send("Newpoint x,y"), "Invalid usage. Example: Newpoint 1,2");
        assert_eq!(
            client.send("Removepoint"),
            "Invalid usage. Example: Removepoint 1,2"
        );
        // Still in command mode after every rejection
        assert_eq!(client.send("Newpoint 5,5"), "Point (5,5) added.");
    });
}

#[test]
fn test_newgraph_replaces_points() {
    for_each_strategy(|server| {
        let mut client = server.connect();
        client.send("Newpoint 100,100");
        client.send("Newpoint 200,200");
        client.send("Newgraph 1");
        assert!(server.store().is_empty());
        assert_eq!(client.send("0,0"), "Graph updated with 1 points.");
    });
}

// ============================================================================
// FRAMING
// ============================================================================

#[test]
fn test_split_writes_and_crlf() {
    for_each_strategy(|server| {
        let mut client = server.connect();
        client.send_raw(b"Newpo");
        thread::sleep(Duration::from_millis(30));
        client.send_raw(b"int 3,4\r");
        thread::sleep(Duration::from_millis(30));
        client.send_raw(b"\n");
        assert_eq!(
            client.read_line().as_deref(),
            Some("Point (3,4) added."),
            "{}",
            server.strategy()
        );
    });
}

#[test]
fn test_pipelined_commands_answered_in_order() {
    for_each_strategy(|server| {
        let mut client = server.connect();
        client.send_raw(b"Newpoint 0,0\nNewpoint 6,0\nNewpoint 0,6\nCH\n");
        assert_eq!(client.read_line().as_deref(), Some("Point (0,0) added."));
        assert_eq!(client.read_line().as_deref(), Some("Point (6,0) added."));
        assert_eq!(client.read_line().as_deref(), Some("Point (0,6) added."));
        assert_eq!(client.read_line().as_deref(), Some("Convex hull area: 18"));
    });
}

#[test]
fn test_half_close_still_gets_every_reply() {
    // Replies far exceed the socket buffers, so the server is still writing
    // when it sees EOF
    const COMMANDS: usize = 100_000;
    const REPLY: &str = "Need at least 3 points to compute convex hull.";

    for_each_strategy(|server| {
        let stream = TcpStream::connect(server.addr()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();

        let mut writer = stream.try_clone().unwrap();
        let sender = thread::spawn(move || {
            writer.write_all("CH\n".repeat(COMMANDS).as_bytes()).unwrap();
            writer.shutdown(Shutdown::Write).unwrap();
        });
        thread::sleep(Duration::from_millis(300));

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, BANNER);

        let mut replies = 0;
        loop {
            line.clear();
            if reader.read_line(&mut line).unwrap() == 0 {
                break;
            }
            assert_eq!(line.trim_end(), REPLY);
            replies += 1;
        }
        sender.join().unwrap();
        assert_eq!(replies, COMMANDS, "{} dropped replies", server.strategy());
    });
}

#[test]
fn test_single_strategy_server_reports_its_strategy() {
    let server = TestServer::start(hull_server::Strategy::Threaded);
    assert_eq!(server.strategy().to_string(), "threaded");
}
