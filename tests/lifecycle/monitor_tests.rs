//! Threshold crossings driven through the protocol

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use hull_server::{Crossing, ServerContext, Strategy, ThresholdMonitor};

use crate::common::TestServer;

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn test_crossings_reported_once_each_way() {
    let ctx = Arc::new(ServerContext::new());
    let (tx, rx) = mpsc::channel();
    let monitor = ThresholdMonitor::new(ctx.store())
        .with_sink(tx)
        .spawn()
        .expect("Failed to spawn monitor");

    let server = TestServer::start_with_context(Strategy::Reactor, Arc::clone(&ctx));
    let mut client = server.connect();

    client.send("Newpoint 0,0");
    client.send("Newpoint 20,0");
    client.send("Newpoint 20,20");
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), Crossing::Entered { area: 200.0 });

    // Still above the threshold; nothing to report
    client.send("Newpoint 0,20");
    client.send("Removepoint 20,20");
    client.send("Removepoint 7,7");

    client.send("Removepoint 20,0");
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), Crossing::Left { area: 0.0 });

    monitor.stop();
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_transfer_crossing_reported() {
    let ctx = Arc::new(ServerContext::new());
    let (tx, rx) = mpsc::channel();
    let _monitor = ThresholdMonitor::new(ctx.store())
        .with_sink(tx)
        .spawn()
        .expect("Failed to spawn monitor");

    let server = TestServer::start_with_context(Strategy::Proactor, Arc::clone(&ctx));
    let mut client = server.connect();
    client.send("Newgraph 3");
    client.send("0,0");
    client.send("10,0");
    client.send("10,10");

    // Area 50 stays below the threshold
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    client.send("Newpoint 0,20");
    assert!(matches!(
        rx.recv_timeout(WAIT).unwrap(),
        Crossing::Entered { .. }
    ));
}
