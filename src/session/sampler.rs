//! Sampling session state machine
//!
//! A [`SamplingSession`] ties one connection, one read command and one
//! [`SampleWindow`] together. It is driven synchronously: [`SamplingSession::start`]
//! resets the target, every [`SamplingSession::tick`] performs one blocking
//! round-trip and yields one sample. Timing is left to the caller (see
//! [`crate::backend::worker`]) so tests can drive ticks directly.
//!
//! ```text
//!   Idle --start()--> Sampling --stop() / transport error / decode error--> Stopped
//!     \__________________________ stop() / reset error ______________________/
//! ```
//!
//! Entering `Stopped` closes the connection. It is closed exactly once no
//! matter which path leads there, including dropping the session.

use crate::backend::client::OpenOcdClient;
use crate::backend::decoder::decode;
use crate::backend::parser::{try_parse_response, FALLBACK_VALUE};
use crate::backend::transport::{TcpTransport, Transport};
use crate::config::AppConfig;
use crate::error::{OcdError, Result};
use crate::types::{ReadCommand, Representation, Sample, SessionState, SessionStats};
use std::time::{Duration, Instant};

use super::window::SampleWindow;

/// Immutable parameters of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Memory read issued on every tick
    pub command: ReadCommand,
    /// How the read value is interpreted
    pub representation: Representation,
    /// Time between ticks
    pub interval: Duration,
    /// Window size in sample indices
    pub horizon: u64,
    /// Reset the target before the first tick
    pub reset_on_start: bool,
}

impl SessionSettings {
    /// Derive session settings from the application config
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            command: config.variable.read_command()?,
            representation: config.variable.representation,
            interval: config.sampling.interval(),
            horizon: config.sampling.horizon,
            reset_on_start: config.sampling.reset_on_start,
        })
    }

    /// Word read of `address` every second, with the default horizon
    pub fn new(address: &str, representation: Representation) -> Result<Self> {
        Ok(Self {
            command: ReadCommand::word(address)?,
            representation,
            interval: Duration::from_millis(crate::config::DEFAULT_INTERVAL_MS),
            horizon: crate::config::DEFAULT_HORIZON,
            reset_on_start: true,
        })
    }

    /// Set the tick interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the window horizon
    pub fn with_horizon(mut self, horizon: u64) -> Self {
        self.horizon = horizon;
        self
    }

    /// Enable or disable the reset before sampling
    pub fn with_reset_on_start(mut self, reset: bool) -> Self {
        self.reset_on_start = reset;
        self
    }
}

/// Everything a presentation layer needs after one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleUpdate {
    /// The new sample
    pub sample: Sample,
    /// Current x window `(xmin, xmax)`
    pub x_range: (u64, u64),
    /// Current y range `(ymin, ymax)`
    pub y_range: Option<(f64, f64)>,
    /// The window history was cleared by this sample
    pub rolled_over: bool,
}

/// A live sampling session over one connection
pub struct SamplingSession<T: Transport> {
    client: Option<OpenOcdClient<T>>,
    settings: SessionSettings,
    state: SessionState,
    next_frame: u64,
    window: SampleWindow,
    stats: SessionStats,
}

impl SamplingSession<TcpTransport> {
    /// Open a TCP connection to the configured debug server
    ///
    /// The session starts in `Idle`; call [`SamplingSession::start`] next.
    pub fn connect(config: &AppConfig) -> Result<Self> {
        let settings = SessionSettings::from_config(config)?;
        let transport = TcpTransport::open(&config.target)?;
        Ok(Self::new(transport, settings))
    }
}

impl<T: Transport> SamplingSession<T> {
    /// Create an idle session over an open transport
    pub fn new(transport: T, settings: SessionSettings) -> Self {
        let window = SampleWindow::new(settings.horizon);
        Self {
            client: Some(OpenOcdClient::new(transport)),
            settings,
            state: SessionState::Idle,
            next_frame: 0,
            window,
            stats: SessionStats::default(),
        }
    }

    /// Reset the target (if configured) and begin sampling
    ///
    /// A failed reset stops the session and releases the connection.
    pub fn start(&mut self) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(OcdError::Session(format!(
                "cannot start a session in state {}",
                self.state
            )));
        }

        if self.settings.reset_on_start {
            let result = match self.client.as_mut() {
                Some(client) => client.reset_target(),
                None => Err(OcdError::Session("connection already released".to_string())),
            };
            if let Err(e) = result {
                tracing::error!("Session start failed: {}", e);
                self.teardown();
                return Err(e);
            }
        }

        self.state = SessionState::Sampling;
        tracing::info!(
            "Sampling {} as {} every {:?}",
            self.settings.command,
            self.settings.representation,
            self.settings.interval
        );
        Ok(())
    }

    /// Perform one read round-trip and emit the resulting sample
    ///
    /// A response that does not match the value grammar yields a zero sample
    /// flagged `stale`. Transport and decode failures stop the session.
    pub fn tick(&mut self) -> Result<SampleUpdate> {
        if self.state != SessionState::Sampling {
            return Err(OcdError::Session(format!(
                "cannot sample in state {}",
                self.state
            )));
        }

        let started = Instant::now();
        let raw = match self.client.as_mut() {
            Some(client) => client.memory_display(&self.settings.command),
            None => Err(OcdError::Session("connection already released".to_string())),
        };
        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => return Err(self.fail(e)),
        };
        let round_trip_us = started.elapsed().as_micros() as u64;

        let (hex, stale) = match try_parse_response(&raw) {
            Some(hex) => (hex, false),
            None => {
                tracing::warn!(
                    "Unexpected response to '{}', using 0: {:?}",
                    self.settings.command,
                    String::from_utf8_lossy(&raw)
                );
                (FALLBACK_VALUE, true)
            }
        };

        let value = match decode(hex, self.settings.representation) {
            Ok(value) => value,
            Err(e) => return Err(self.fail(e)),
        };

        let frame = self.next_frame;
        self.next_frame += 1;

        let sample = Sample {
            frame,
            value,
            stale,
        };
        let update = self.window.push(frame, value.as_f64());
        self.stats.record(round_trip_us, stale);

        tracing::debug!("Sample: {}; Value: {}", frame, value);
        if update.rolled_over {
            tracing::trace!("Window advanced to {:?}", self.window.x_range());
        }

        Ok(SampleUpdate {
            sample,
            x_range: self.window.x_range(),
            y_range: self.window.y_range(),
            rolled_over: update.rolled_over,
        })
    }

    /// Stop sampling and release the connection
    ///
    /// Stopping an already stopped session does nothing.
    pub fn stop(&mut self) {
        if self.state != SessionState::Stopped {
            tracing::info!("Stopping session after {} samples", self.next_frame);
        }
        self.teardown();
    }

    fn fail(&mut self, error: OcdError) -> OcdError {
        tracing::error!("Sampling stopped: {}", error);
        self.teardown();
        error
    }

    fn teardown(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.close();
        }
        self.state = SessionState::Stopped;
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session parameters
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Display window
    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    /// Current x window `(xmin, xmax)`
    pub fn x_range(&self) -> (u64, u64) {
        self.window.x_range()
    }

    /// Current y range
    pub fn y_range(&self) -> Option<(f64, f64)> {
        self.window.y_range()
    }

    /// Round-trip and fallback statistics
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Number of samples emitted so far
    pub fn frames_emitted(&self) -> u64 {
        self.next_frame
    }

    /// Check whether the connection is still held
    pub fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(|c| c.is_open())
    }
}

impl<T: Transport> Drop for SamplingSession<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}
