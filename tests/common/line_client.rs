//! Minimal blocking client for the line protocol

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use hull_server::BANNER;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub struct LineClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl LineClient {
    /// Connect and check the banner arrives first
    pub fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("Failed to connect to test server");
        stream
            .set_read_timeout(Some(READ_TIMEOUT))
            .expect("Failed to set read timeout");
        let writer = stream.try_clone().expect("Failed to clone stream");

        let mut client = Self {
            reader: BufReader::new(stream),
            writer,
        };
        let banner = client.read_line().expect("Server closed before banner");
        assert_eq!(format!("{}\n", banner), BANNER);
        client
    }

    /// Send one line and return the single reply line, without its newline
    pub fn send(&mut self, line: &str) -> String {
        self.send_raw(format!("{}\n", line).as_bytes());
        self.read_line()
            .unwrap_or_else(|| panic!("No reply to {:?}", line))
    }

    /// Write bytes exactly as given; no reply is read
    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).expect("Failed to write");
        self.writer.flush().expect("Failed to flush");
    }

    /// Next reply line, or `None` once the server has closed the connection
    pub fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches('\n').to_string()),
            Err(e) if is_reset(&e) => None,
            Err(e) => panic!("Read failed: {}", e),
        }
    }

    /// True once the server has closed its side
    pub fn is_closed(&mut self) -> bool {
        self.read_line().is_none()
    }
}

fn is_reset(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted
    )
}
