//! Session Worker Thread Implementation
//!
//! This module contains the loop that drives a [`SamplingSession`] at its
//! configured interval in a separate thread and reports to the presentation
//! layer through crossbeam channels.
//!
//! # Tick discipline
//!
//! Each tick is one blocking round-trip. The wait for the next tick is a
//! `recv_timeout` on the command channel, so a stop request ends the wait
//! immediately while ticks never overlap. The shared running flag (the
//! external shutdown signal) is checked at every tick boundary.

use crate::backend::{SessionCommand, SessionMessage, StopReason};
use crate::backend::transport::Transport;
use crate::session::{SampleRecorder, SamplingSession};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// The worker that runs the sampling loop
pub struct SessionWorker<T: Transport> {
    session: SamplingSession<T>,
    command_rx: Receiver<SessionCommand>,
    message_tx: Sender<SessionMessage>,
    running: Arc<AtomicBool>,
    recorder: Option<SampleRecorder>,
    /// Messages dropped because the presentation layer fell behind
    dropped_messages: u64,
}

impl<T: Transport> SessionWorker<T> {
    /// Create a new session worker
    pub fn new(
        session: SamplingSession<T>,
        command_rx: Receiver<SessionCommand>,
        message_tx: Sender<SessionMessage>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            session,
            command_rx,
            message_tx,
            running,
            recorder: None,
            dropped_messages: 0,
        }
    }

    /// Record every emitted sample
    pub fn with_recorder(mut self, recorder: SampleRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Run the session to completion
    ///
    /// Always ends with the connection released and a
    /// [`SessionMessage::Stopped`] sent.
    pub fn run(mut self) -> StopReason {
        tracing::info!("Session worker started");

        let reason = match self.session.start() {
            Ok(()) => {
                let settings = self.session.settings();
                let _ = self.message_tx.send(SessionMessage::Started {
                    address: settings.command.address().to_string(),
                    representation: settings.representation,
                });
                self.sample_loop()
            }
            Err(e) => {
                let _ = self.message_tx.send(SessionMessage::Error(e.to_string()));
                StopReason::StartFailed
            }
        };

        self.session.stop();
        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.flush() {
                tracing::warn!("Failed to flush recording: {}", e);
            }
        }
        if self.dropped_messages > 0 {
            tracing::warn!(
                "{} sample messages were dropped (consumer too slow)",
                self.dropped_messages
            );
        }

        let _ = self.message_tx.send(SessionMessage::Stopped {
            reason,
            frames: self.session.frames_emitted(),
        });
        tracing::info!("Session worker stopped ({})", reason);
        reason
    }

    fn sample_loop(&mut self) -> StopReason {
        loop {
            if let Some(reason) = self.process_commands() {
                return reason;
            }
            if !self.running.load(Ordering::SeqCst) {
                return StopReason::Shutdown;
            }

            let tick_started = Instant::now();
            match self.session.tick() {
                Ok(update) => {
                    if let Some(recorder) = self.recorder.as_mut() {
                        if let Err(e) = recorder.record(&update.sample) {
                            tracing::warn!("Recording disabled: {}", e);
                            self.recorder = None;
                        }
                    }
                    self.try_send_message(SessionMessage::Sample(update));
                }
                Err(e) => {
                    let reason = if e.is_transport_failure() {
                        StopReason::TransportFailed
                    } else {
                        StopReason::DecodeFailed
                    };
                    let _ = self.message_tx.send(SessionMessage::Error(e.to_string()));
                    return reason;
                }
            }

            let interval = self.session.settings().interval;
            let remaining = interval.saturating_sub(tick_started.elapsed());
            if let Some(reason) = self.wait_for_next_tick(remaining) {
                return reason;
            }
        }
    }

    /// Drain pending commands without blocking
    fn process_commands(&mut self) -> Option<StopReason> {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => {
                    if let Some(reason) = self.handle_command(cmd) {
                        return Some(reason);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => return Some(StopReason::Shutdown),
            }
        }
    }

    /// Sleep until the next tick is due, waking early for commands
    fn wait_for_next_tick(&mut self, remaining: std::time::Duration) -> Option<StopReason> {
        let deadline = Instant::now() + remaining;
        loop {
            let timeout = deadline.saturating_duration_since(Instant::now());
            match self.command_rx.recv_timeout(timeout) {
                Ok(cmd) => {
                    if let Some(reason) = self.handle_command(cmd) {
                        return Some(reason);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => return Some(StopReason::Shutdown),
            }
        }
    }

    fn handle_command(&mut self, cmd: SessionCommand) -> Option<StopReason> {
        match cmd {
            SessionCommand::Stop => {
                self.running.store(false, Ordering::SeqCst);
                Some(StopReason::Requested)
            }
            SessionCommand::RequestStats => {
                let stats = self.session.stats().clone();
                self.try_send_message(SessionMessage::Stats(stats));
                None
            }
        }
    }

    /// Try to send a message, counting it as dropped if the queue is full
    fn try_send_message(&mut self, msg: SessionMessage) {
        if self.message_tx.try_send(msg).is_err() {
            self.dropped_messages += 1;
        }
    }
}
