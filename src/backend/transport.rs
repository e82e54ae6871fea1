//! Transport trait and the telnet stream implementation
//!
//! The debug server speaks a half-duplex text protocol: one command line is
//! written, then output is read until the prompt `"> "` appears. Exactly one
//! command is in flight at any time.

use crate::backend::parser::find;
use crate::backend::telnet::TelnetFilter;
use crate::config::TargetConfig;
use crate::error::{OcdError, Result};
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Prompt that terminates every response, including the greeting
pub const PROMPT: &[u8] = b"> ";

const READ_CHUNK: usize = 1024;

/// Unified interface for the command channel to the debug server
///
/// Implementations must be `Send` so a session can be driven from a
/// worker thread.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Write one command line (including its trailing newline)
    fn send(&mut self, command: &[u8]) -> Result<()>;

    /// Block until the prompt arrives
    ///
    /// Returns everything received since the previous prompt, up to and
    /// including the new prompt. A broken stream is an error, never an
    /// empty response.
    fn read_until_prompt(&mut self) -> Result<Vec<u8>>;

    /// Release the underlying stream; calling again has no effect
    fn close(&mut self);

    /// Check whether the stream is still held
    fn is_open(&self) -> bool;
}

/// Telnet transport over any byte stream
pub struct TelnetTransport<S: Read + Write + Send> {
    stream: Option<S>,
    filter: TelnetFilter,
    /// Filtered bytes received but not yet returned
    pending: Vec<u8>,
    peer: String,
}

/// Telnet transport over TCP, the usual way to reach OpenOCD
pub type TcpTransport = TelnetTransport<TcpStream>;

impl TelnetTransport<TcpStream> {
    /// Connect to the debug server and consume its greeting
    pub fn open(config: &TargetConfig) -> Result<Self> {
        let peer = format!("{}:{}", config.host, config.port);
        tracing::info!("Connecting to debug server at {}", peer);

        let addrs = (config.host.as_str(), config.port)
            .to_socket_addrs()
            .map_err(|e| OcdError::Connect(format!("cannot resolve {}: {}", peer, e)))?;

        let connect_timeout = Duration::from_millis(config.connect_timeout_ms);
        let mut last_error = None;
        let mut stream = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, connect_timeout) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }

        let stream = stream.ok_or_else(|| {
            OcdError::Connect(match last_error {
                Some(e) => format!("{}: {}", peer, e),
                None => format!("{}: no address to connect to", peer),
            })
        })?;

        stream
            .set_read_timeout(config.read_timeout())
            .map_err(|e| OcdError::Connect(format!("{}: {}", peer, e)))?;
        // Commands are tiny; don't let Nagle hold them back.
        let _ = stream.set_nodelay(true);

        Self::from_stream(stream, peer)
    }
}

impl<S: Read + Write + Send> TelnetTransport<S> {
    /// Wrap an already connected stream and consume the greeting
    pub fn from_stream(stream: S, peer: impl Into<String>) -> Result<Self> {
        let mut transport = Self {
            stream: Some(stream),
            filter: TelnetFilter::new(),
            pending: Vec::new(),
            peer: peer.into(),
        };

        match transport.read_until_prompt() {
            Ok(greeting) => {
                tracing::debug!(
                    "Greeting from {}: {:?}",
                    transport.peer,
                    String::from_utf8_lossy(&greeting)
                );
                Ok(transport)
            }
            Err(e) => {
                transport.close();
                Err(OcdError::Connect(format!(
                    "{}: no greeting from debug server ({})",
                    transport.peer, e
                )))
            }
        }
    }

    /// Address of the remote end, as given at open time
    pub fn peer(&self) -> &str {
        &self.peer
    }

    fn stream_mut(&mut self) -> Result<&mut S> {
        self.stream
            .as_mut()
            .ok_or_else(|| OcdError::Transport("connection already closed".to_string()))
    }

    /// Read one chunk from the stream into `pending`
    fn fill(&mut self) -> Result<()> {
        let mut buf = [0u8; READ_CHUNK];
        let n = loop {
            match self.stream_mut()?.read(&mut buf) {
                Ok(0) => return Err(OcdError::ConnectionClosed),
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(OcdError::Transport(format!(
                        "timed out waiting for prompt from {}",
                        self.peer
                    )));
                }
                Err(e) => return Err(OcdError::Transport(format!("read failed: {}", e))),
            }
        };

        let mut replies = Vec::new();
        self.filter
            .feed(&buf[..n], &mut self.pending, &mut replies);

        if !replies.is_empty() {
            self.stream_mut()?
                .write_all(&replies)
                .map_err(|e| OcdError::Transport(format!("negotiation failed: {}", e)))?;
        }

        Ok(())
    }
}

impl<S: Read + Write + Send> Transport for TelnetTransport<S> {
    fn send(&mut self, command: &[u8]) -> Result<()> {
        tracing::trace!("-> {:?}", String::from_utf8_lossy(command));
        let stream = self.stream_mut()?;
        stream
            .write_all(command)
            .and_then(|_| stream.flush())
            .map_err(|e| OcdError::Transport(format!("write failed: {}", e)))
    }

    fn read_until_prompt(&mut self) -> Result<Vec<u8>> {
        loop {
            if let Some(pos) = find(&self.pending, PROMPT) {
                let response: Vec<u8> = self.pending.drain(..pos + PROMPT.len()).collect();
                tracing::trace!("<- {:?}", String::from_utf8_lossy(&response));
                return Ok(response);
            }
            self.fill()?;
        }
    }

    fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.flush();
            self.pending.clear();
            tracing::info!("Closed connection to {}", self.peer);
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl<S: Read + Write + Send> Drop for TelnetTransport<S> {
    fn drop(&mut self) {
        self.close();
    }
}
