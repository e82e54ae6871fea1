//! Backend module for talking to the OpenOCD telnet server
//!
//! This module contains the protocol client and runs the sampling loop in a
//! separate thread so a presentation layer stays responsive. It uses
//! crossbeam channels for thread-safe communication with the consumer.
//!
//! # Architecture
//!
//! - [`SessionCommand`] - Messages sent from the consumer to the sampler (stop, stats)
//! - [`SessionMessage`] - Messages sent from the sampler to the consumer (samples, lifecycle)
//! - [`SessionHandle`] - Consumer-side handle for sending commands and receiving messages
//! - [`SamplerBackend`] - Entry point that connects and runs the worker loop
//!
//! # Components
//!
//! - [`Transport`] / [`TcpTransport`] - Half-duplex telnet command channel
//! - [`OpenOcdClient`] - Command framing for `reset`, `mdw`, `mdh`, `mdb`
//! - [`parser`] - Value extraction from memory display responses
//! - [`decoder`] - Hex to float32/int32/uint32 bit reinterpretation
//! - [`SessionWorker`] - Interval-driven loop around a [`crate::session::SamplingSession`]
//! - [`MockTarget`] - Simulated debug server for testing (feature-gated)
//!
//! # Example
//!
//! ```ignore
//! use ocdplot_rs::backend::{SamplerBackend, SessionMessage};
//! use ocdplot_rs::config::AppConfig;
//!
//! let (backend, handle) = SamplerBackend::new(AppConfig::default());
//! std::thread::spawn(move || backend.run());
//!
//! for msg in handle.iter() {
//!     match msg {
//!         SessionMessage::Sample(update) => {
//!             println!("{} -> {}", update.sample.frame, update.sample.value);
//!         }
//!         SessionMessage::Stopped { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

pub mod client;
pub mod decoder;
#[cfg(any(test, feature = "mock-target"))]
pub mod mock_target;
pub mod parser;
pub mod telnet;
pub mod transport;
pub mod worker;

pub use client::OpenOcdClient;
#[cfg(any(test, feature = "mock-target"))]
pub use mock_target::{MockDataPattern, MockTarget};
pub use transport::{TcpTransport, TelnetTransport, Transport, PROMPT};
pub use worker::SessionWorker;

use crate::config::AppConfig;
use crate::error::Result;
use crate::session::{SampleRecorder, SampleUpdate, SamplingSession, SessionSettings};
use crate::types::{Representation, SessionStats};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Message sent from the consumer to the sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Stop sampling at the next tick boundary
    Stop,
    /// Request current statistics
    RequestStats,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `stop()` was requested
    Requested,
    /// The shutdown flag was cleared or the consumer went away
    Shutdown,
    /// Connect or target reset failed
    StartFailed,
    /// The connection broke mid-session
    TransportFailed,
    /// A value could not be decoded in the configured representation
    DecodeFailed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Requested => write!(f, "stop requested"),
            StopReason::Shutdown => write!(f, "shutdown"),
            StopReason::StartFailed => write!(f, "start failed"),
            StopReason::TransportFailed => write!(f, "connection lost"),
            StopReason::DecodeFailed => write!(f, "decode failed"),
        }
    }
}

/// Message sent from the sampler to the consumer
#[derive(Debug, Clone)]
pub enum SessionMessage {
    /// Target reset done, sampling begins
    Started {
        address: String,
        representation: Representation,
    },
    /// New sample with the current window and range
    Sample(SampleUpdate),
    /// Statistics update (response to RequestStats)
    Stats(SessionStats),
    /// A fatal error; always followed by `Stopped`
    Error(String),
    /// The session ended and the connection was released
    Stopped { reason: StopReason, frames: u64 },
}

/// Consumer-side handle to a running session
pub struct SessionHandle {
    /// Receiver for sampler messages
    pub receiver: Receiver<SessionMessage>,
    /// Sender for commands to the sampler
    pub command_sender: Sender<SessionCommand>,
    running: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<SessionMessage> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next message
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SessionMessage> {
        match self.receiver.recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Receive all pending messages
    pub fn drain(&self) -> Vec<SessionMessage> {
        self.receiver.try_iter().collect()
    }

    /// Blocking iterator over messages until the sampler goes away
    pub fn iter(&self) -> crossbeam_channel::Iter<'_, SessionMessage> {
        self.receiver.iter()
    }

    /// Request the session to stop at the next tick boundary
    pub fn stop(&self) {
        let _ = self.command_sender.send(SessionCommand::Stop);
    }

    /// Request a statistics update
    pub fn request_stats(&self) {
        let _ = self.command_sender.send(SessionCommand::RequestStats);
    }

    /// Check whether the sampler is still meant to be running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// The sampler backend that runs in a separate thread
pub struct SamplerBackend {
    config: AppConfig,
    command_receiver: Receiver<SessionCommand>,
    message_sender: Sender<SessionMessage>,
    running: Arc<AtomicBool>,
}

impl SamplerBackend {
    /// Create a new backend with communication channels
    pub fn new(config: AppConfig) -> (Self, SessionHandle) {
        let (cmd_tx, cmd_rx) = bounded(64);
        // Bounded for backpressure; samples are dropped rather than queued forever.
        let (msg_tx, msg_rx) = bounded(config.sampling.channel_buffer_size.max(16));
        let running = Arc::new(AtomicBool::new(true));

        let backend = Self {
            config,
            command_receiver: cmd_rx,
            message_sender: msg_tx,
            running: running.clone(),
        };

        let handle = SessionHandle {
            receiver: msg_rx,
            command_sender: cmd_tx,
            running,
        };

        (backend, handle)
    }

    /// Get a handle to signal shutdown from outside the consumer
    ///
    /// Clearing the flag stops the session at the next tick boundary.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Connect to the configured debug server and run the session
    pub fn run(self) -> StopReason {
        let transport = match self.validate().and_then(|_| TcpTransport::open(&self.config.target)) {
            Ok(transport) => transport,
            Err(e) => return self.fail_start(e.to_string()),
        };
        self.run_with_transport(transport)
    }

    /// Run the session over an already opened transport
    pub fn run_with_transport<T: Transport>(self, transport: T) -> StopReason {
        let settings = match SessionSettings::from_config(&self.config) {
            Ok(settings) => settings,
            Err(e) => return self.fail_start(e.to_string()),
        };

        let recorder = if self.config.recording.enabled {
            match SampleRecorder::from_config(&self.config) {
                Ok(recorder) => Some(recorder),
                Err(e) => {
                    tracing::warn!("Recording disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let session = SamplingSession::new(transport, settings);
        let mut worker = SessionWorker::new(
            session,
            self.command_receiver,
            self.message_sender,
            self.running,
        );
        if let Some(recorder) = recorder {
            worker = worker.with_recorder(recorder);
        }
        worker.run()
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()
    }

    fn fail_start(&self, error: String) -> StopReason {
        tracing::error!("Session start failed: {}", error);
        let _ = self.message_sender.send(SessionMessage::Error(error));
        let _ = self.message_sender.send(SessionMessage::Stopped {
            reason: StopReason::StartFailed,
            frames: 0,
        });
        StopReason::StartFailed
    }
}
