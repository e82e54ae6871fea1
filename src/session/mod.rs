//! Sampling session module
//!
//! This module drives one observed variable from reset to teardown and keeps
//! the display bookkeeping for the emitted samples.
//!
//! # Features
//!
//! - Reset the target, then read the variable once per tick
//! - Keep a fixed-horizon window of recent points with a grow-only value range
//! - Release the connection exactly once on every stop path
//! - Optionally record emitted samples to CSV or JSON Lines

pub mod recorder;
pub mod sampler;
pub mod window;

pub use recorder::SampleRecorder;
pub use sampler::{SampleUpdate, SamplingSession, SessionSettings};
pub use window::{SampleWindow, WindowUpdate};
