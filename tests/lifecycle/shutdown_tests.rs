//! Server shutdown closes every connection and leaves nothing behind

use std::net::TcpStream;

use hull_server::Strategy;

use crate::common::TestServer;

#[test]
fn test_shutdown_closes_clients_and_forgets_transfers() {
    for strategy in Strategy::ALL {
        let mut server = TestServer::start(strategy);
        let addr = server.addr();

        let mut idle = server.connect();
        let mut loading = server.connect();
        assert_eq!(loading.send("Newgraph 4"), "OK. Send 4 points (x,y per line):");
        assert_eq!(server.store().pending_connections(), 1);

        server.shutdown();

        assert!(idle.is_closed(), "{} left a client open", strategy);
        assert!(loading.is_closed(), "{} left a client open", strategy);
        assert_eq!(
            server.store().pending_connections(),
            0,
            "{} kept pending counts after shutdown",
            strategy
        );
        assert!(
            TcpStream::connect(addr).is_err(),
            "{} still accepting after shutdown",
            strategy
        );
    }
}

#[test]
fn test_shutdown_with_no_clients() {
    for strategy in Strategy::ALL {
        let mut server = TestServer::start(strategy);
        server.shutdown();
        assert!(server.store().is_empty());
    }
}

#[test]
fn test_points_survive_client_churn() {
    for strategy in Strategy::ALL {
        let server = TestServer::start(strategy);
        for i in 0..5 {
            let mut client = server.connect();
            client.send(&format!("Newpoint {},0", i));
        }
        assert_eq!(server.store().len(), 5, "{}", strategy);
    }
}
