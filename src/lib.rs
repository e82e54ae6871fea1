//! # ocdplot-rs: OpenOCD Variable Monitor
//!
//! Samples one variable in the memory of a running embedded target through
//! the OpenOCD telnet interface and maintains a live window of the values
//! for display. The target is reset once, then the variable is read at a
//! fixed interval and each raw 32-bit word is reinterpreted as `float`,
//! `int32_t` or `uint32_t`.
//!
//! ## Architecture
//!
//! - **Backend**: Telnet transport, OpenOCD command client, response parser
//!   and decoder, plus the worker thread that drives a session
//! - **Session**: The Idle/Sampling/Stopped state machine, the fixed-horizon
//!   display window and the optional sample recorder
//! - **Communication**: Crossbeam channels between the sampler thread and
//!   whatever presents the samples
//!
//! ## Configuration
//!
//! The session configuration is a TOML file stored in the platform config
//! directory under `ocdplot-rs` (see [`config`]).
//!
//! ## Example
//!
//! ```ignore
//! use ocdplot_rs::{AppConfig, SamplingSession};
//!
//! let config = AppConfig::default();
//! let mut session = SamplingSession::connect(&config)?;
//! session.start()?;
//! for _ in 0..3 {
//!     let update = session.tick()?;
//!     println!("Sample: {}; Value: {}", update.sample.frame, update.sample.value);
//! }
//! session.stop();
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use backend::{SamplerBackend, SessionCommand, SessionHandle, SessionMessage, StopReason};
pub use config::AppConfig;
pub use error::{OcdError, Result};
pub use session::{SampleUpdate, SampleWindow, SamplingSession, SessionSettings};
pub use types::{DecodedValue, Representation, Sample, SessionState};
