//! Scripted stand-in for the OpenOCD telnet server
//!
//! Listens on an ephemeral local port and serves exactly one client. Each
//! command line is answered the way OpenOCD does: the echoed line, the
//! command output, then the prompt.

use crossbeam_channel::{bounded, Receiver};
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Greeting with the option offers OpenOCD sends on connect
const GREETING: &[u8] = b"\xff\xfb\x01\xff\xfb\x03\xff\xfd\x03Open On-Chip Debugger\r\n> ";

const IAC: u8 = 0xff;

/// How the server answers one command line
pub enum Reply {
    /// Output printed between the echoed line and the prompt
    Output(String),
    /// Drop the connection without answering
    Hangup,
}

/// A running fake server
pub struct FakeOpenOcd {
    port: u16,
    commands: Arc<Mutex<Vec<String>>>,
    closed: Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

impl FakeOpenOcd {
    /// Start serving with a custom responder
    pub fn start<F>(mut respond: F) -> Self
    where
        F: FnMut(&str) -> Reply + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let (closed_tx, closed_rx) = bounded(1);

        let log = commands.clone();
        let thread = std::thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let _ = stream.set_read_timeout(Some(Duration::from_secs(10)));
            serve(&mut stream, &mut respond, &log);
            let _ = stream.shutdown(Shutdown::Both);
            let _ = closed_tx.send(());
        });

        Self {
            port,
            commands,
            closed: closed_rx,
            thread: Some(thread),
        }
    }

    /// Answer `reset` and word reads of any address with `hex`
    pub fn with_word(hex: &'static str) -> Self {
        Self::start(move |line| match line.split_whitespace().next() {
            Some("reset") => Reply::Output(String::new()),
            Some("mdw") => {
                let address = line.split_whitespace().nth(1).unwrap_or("0x0");
                Reply::Output(format!("{}: {} \r\n", address, hex))
            }
            _ => Reply::Output(format!("invalid command name \"{}\"\r\n", line)),
        })
    }

    /// Port to connect to
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Command lines received so far
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Wait for the client to close its end
    pub fn wait_closed(&self, timeout: Duration) -> bool {
        self.closed.recv_timeout(timeout).is_ok()
    }
}

impl Drop for FakeOpenOcd {
    fn drop(&mut self) {
        // Unblock a server still waiting in accept().
        let _ = TcpStream::connect(("127.0.0.1", self.port));
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn serve<F>(stream: &mut TcpStream, respond: &mut F, log: &Mutex<Vec<String>>)
where
    F: FnMut(&str) -> Reply,
{
    if stream.write_all(GREETING).is_err() {
        return;
    }

    let mut pending = Vec::new();
    let mut buf = [0u8; 512];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        pending.extend_from_slice(&buf[..n]);
        strip_negotiation(&mut pending);

        while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            log.lock().unwrap().push(line.clone());

            match respond(&line) {
                Reply::Output(output) => {
                    let response = format!("{}\r\n{}\r> ", line, output);
                    if stream.write_all(response.as_bytes()).is_err() {
                        return;
                    }
                }
                Reply::Hangup => return,
            }
        }
    }
}

/// Remove the client's three-byte option replies
fn strip_negotiation(bytes: &mut Vec<u8>) {
    while let Some(pos) = bytes.iter().position(|&b| b == IAC) {
        if bytes.len() < pos + 3 {
            return;
        }
        bytes.drain(pos..pos + 3);
    }
}
