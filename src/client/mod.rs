//! Interactive line client
//!
//! Prints the server banner, then forwards each input line and prints the
//! reply. `Exit` ends the session locally; it is never sent.

use std::io::{self, BufRead, BufReader, Read, Write};

/// Typed locally to leave the session
pub const EXIT_COMMAND: &str = "Exit";

const PROMPT: &str = "> ";

/// Drive one client session over `conn`, reading commands from `input` and
/// echoing everything the server says to `output`.
///
/// Every non-empty line the server receives produces exactly one reply line,
/// so the client waits for one line per command. Blank input lines are not
/// sent since they get no reply.
pub fn run_session<C, I, O>(conn: C, input: I, mut output: O) -> io::Result<()>
where
    C: Read + Write,
    I: BufRead,
    O: Write,
{
    let mut server = BufReader::new(conn);
    let mut reply = String::new();

    if server.read_line(&mut reply)? == 0 {
        writeln!(output, "Server closed connection.")?;
        return Ok(());
    }
    write!(output, "{}", reply)?;

    let mut lines = input.lines();
    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let line = line.trim_end_matches('\r');
        if line == EXIT_COMMAND {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let sent = server
            .get_mut()
            .write_all(format!("{}\n", line).as_bytes());
        if let Err(e) = sent {
            tracing::debug!("send failed: {}", e);
            writeln!(output, "Send failed.")?;
            break;
        }

        reply.clear();
        match server.read_line(&mut reply) {
            Ok(0) | Err(_) => {
                writeln!(output, "Server closed connection.")?;
                break;
            }
            Ok(_) => write!(output, "{}", reply)?,
        }
    }
    Ok(())
}
