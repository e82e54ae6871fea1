//! Mock OpenOCD Target for Testing
//!
//! This module provides an in-process [`Transport`] that answers the
//! supported commands the way the OpenOCD telnet server does, so sessions
//! can run without a debug server or hardware.
//!
//! # Features
//!
//! - **Pattern-based data generation**: each address produces values from a
//!   [`MockDataPattern`], advanced once per read
//! - **Representation-aware encoding**: values are written out as the bit
//!   pattern of the variable's representation, truncated to the access width
//! - **Fault injection**: periodic garbled responses and a dropped connection
//!   after a fixed number of reads
//! - **Lifecycle counters**: how many times the connection was closed, for
//!   teardown assertions
//!
//! # Example
//!
//! ```ignore
//! use ocdplot_rs::backend::mock_target::{MockDataPattern, MockTarget};
//! use ocdplot_rs::types::Representation;
//!
//! let target = MockTarget::new().with_variable(
//!     0x2000_0000,
//!     Representation::Float32,
//!     MockDataPattern::Constant(std::f64::consts::PI),
//! );
//! let mut session = SamplingSession::new(target, settings);
//! ```
//!
//! # Enabling
//!
//! The mock target is only available when the `mock-target` feature is enabled:
//!
//! ```bash
//! cargo run --features mock-target
//! ```

use crate::backend::transport::Transport;
use crate::error::{OcdError, Result};
use crate::types::{parse_address, AccessWidth, Representation};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Pattern for generating mock data, indexed by read count
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockDataPattern {
    /// Constant value
    Constant(f64),
    /// Counter that increments by `step` and wraps from `max` to `min`
    Counter { step: f64, min: f64, max: f64 },
    /// Sine wave with a period measured in reads
    Sine {
        period: f64,
        amplitude: f64,
        offset: f64,
    },
    /// Linear ramp from 0 to `amplitude` over `period` reads
    Sawtooth { period: f64, amplitude: f64 },
}

impl Default for MockDataPattern {
    fn default() -> Self {
        MockDataPattern::Sine {
            period: 30.0,
            amplitude: 100.0,
            offset: 0.0,
        }
    }
}

impl MockDataPattern {
    /// Value produced by the `n`-th read
    pub fn value_at(&self, n: u64) -> f64 {
        let n = n as f64;
        match *self {
            MockDataPattern::Constant(v) => v,
            MockDataPattern::Counter { step, min, max } => {
                let span = max - min + step;
                if span <= 0.0 {
                    min
                } else {
                    min + (n * step) % span
                }
            }
            MockDataPattern::Sine {
                period,
                amplitude,
                offset,
            } => offset + amplitude * (2.0 * std::f64::consts::PI * n / period).sin(),
            MockDataPattern::Sawtooth { period, amplitude } => {
                amplitude * ((n % period) / period)
            }
        }
    }
}

/// A variable mapped into mock target memory
#[derive(Debug, Clone)]
pub struct MockVariable {
    /// Binary representation used to encode generated values
    pub representation: Representation,
    /// Data generation pattern
    pub pattern: MockDataPattern,
    reads: u64,
}

impl MockVariable {
    /// Create a mapped variable
    pub fn new(representation: Representation, pattern: MockDataPattern) -> Self {
        Self {
            representation,
            pattern,
            reads: 0,
        }
    }

    /// Bit pattern for the next read
    fn next_bits(&mut self) -> u32 {
        let value = self.pattern.value_at(self.reads);
        self.reads += 1;
        encode(value, self.representation)
    }
}

/// Encode a value as the bit pattern of `representation`
pub fn encode(value: f64, representation: Representation) -> u32 {
    match representation {
        Representation::Float32 => (value as f32).to_bits(),
        Representation::Int32 => (value as i32) as u32,
        Representation::Uint32 => value as u32,
    }
}

/// Simulated OpenOCD telnet endpoint
#[derive(Debug)]
pub struct MockTarget {
    memory: HashMap<u32, MockVariable>,
    /// Response to the command in flight
    in_flight: Option<Vec<u8>>,
    open: bool,
    reads: u64,
    resets: u64,
    garble_every: Option<u64>,
    disconnect_after: Option<u64>,
    fail_reset: bool,
    closes: Arc<AtomicUsize>,
}

impl Default for MockTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTarget {
    /// Create a target with empty memory; unmapped addresses read as zero
    pub fn new() -> Self {
        Self {
            memory: HashMap::new(),
            in_flight: None,
            open: true,
            reads: 0,
            resets: 0,
            garble_every: None,
            disconnect_after: None,
            fail_reset: false,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Map a variable at `address`
    pub fn with_variable(
        mut self,
        address: u32,
        representation: Representation,
        pattern: MockDataPattern,
    ) -> Self {
        self.memory
            .insert(address, MockVariable::new(representation, pattern));
        self
    }

    /// Answer every `n`-th memory read with error text instead of a value
    pub fn with_garble_every(mut self, n: u64) -> Self {
        self.garble_every = (n > 0).then_some(n);
        self
    }

    /// Drop the connection once `n` memory reads have been answered
    pub fn with_disconnect_after(mut self, n: u64) -> Self {
        self.disconnect_after = Some(n);
        self
    }

    /// Make the reset command fail with a dropped connection
    pub fn with_failing_reset(mut self) -> Self {
        self.fail_reset = true;
        self
    }

    /// Shared counter of `close()` calls that stayed valid after the target
    /// has been moved into a session
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        self.closes.clone()
    }

    /// Number of memory reads answered
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Number of resets performed
    pub fn resets(&self) -> u64 {
        self.resets
    }

    fn respond(&mut self, line: &str) -> Result<Vec<u8>> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default();

        let body = match verb {
            "reset" => {
                if self.fail_reset {
                    self.open = false;
                    return Err(OcdError::ConnectionClosed);
                }
                self.resets += 1;
                String::new()
            }
            "mdw" | "mdh" | "mdb" => {
                let width = match verb {
                    "mdw" => AccessWidth::Word,
                    "mdh" => AccessWidth::Halfword,
                    _ => AccessWidth::Byte,
                };
                let address = words.next().unwrap_or_default();
                self.memory_display(address, width)?
            }
            "" => String::new(),
            other => format!("invalid command name \"{}\"\r\n", other),
        };

        Ok(format!("{}\r\n{}\r> ", line, body).into_bytes())
    }

    fn memory_display(&mut self, address: &str, width: AccessWidth) -> Result<String> {
        if let Some(limit) = self.disconnect_after {
            if self.reads >= limit {
                self.open = false;
                return Err(OcdError::ConnectionClosed);
            }
        }
        self.reads += 1;

        if let Some(n) = self.garble_every {
            if self.reads % n == 0 {
                return Ok("Error: Failed to read memory at 0xdeadbeef\r\n".to_string());
            }
        }

        let addr = match parse_address(address) {
            Ok(addr) => addr,
            Err(_) => return Ok(format!("invalid address \"{}\"\r\n", address)),
        };

        let bits = self
            .memory
            .get_mut(&addr)
            .map(|var| var.next_bits())
            .unwrap_or(0);

        Ok(match width {
            AccessWidth::Word => format!("0x{:08x}: {:08x} \r\n", addr, bits),
            AccessWidth::Halfword => format!("0x{:08x}: {:04x} \r\n", addr, bits & 0xffff),
            AccessWidth::Byte => format!("0x{:08x}: {:02x} \r\n", addr, bits & 0xff),
        })
    }
}

impl Transport for MockTarget {
    fn send(&mut self, command: &[u8]) -> Result<()> {
        if !self.open {
            return Err(OcdError::Transport("connection already closed".to_string()));
        }
        if self.in_flight.is_some() {
            return Err(OcdError::Transport(
                "command sent before the previous response was read".to_string(),
            ));
        }

        let line = String::from_utf8_lossy(command).trim_end().to_string();
        self.in_flight = Some(self.respond(&line)?);
        Ok(())
    }

    fn read_until_prompt(&mut self) -> Result<Vec<u8>> {
        if !self.open {
            return Err(OcdError::ConnectionClosed);
        }
        self.in_flight
            .take()
            .ok_or_else(|| OcdError::Transport("no command in flight".to_string()))
    }

    fn close(&mut self) {
        self.open = false;
        self.in_flight = None;
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::parser::parse_response;

    fn roundtrip(target: &mut MockTarget, command: &[u8]) -> Result<Vec<u8>> {
        target.send(command)?;
        target.read_until_prompt()
    }

    #[test]
    fn test_word_read_matches_openocd_format() {
        let mut target = MockTarget::new().with_variable(
            0x2000_0000,
            Representation::Float32,
            MockDataPattern::Constant(1.0),
        );
        let response = roundtrip(&mut target, b"mdw 0x20000000\n").unwrap();
        assert_eq!(
            response,
            b"mdw 0x20000000\r\n0x20000000: 3f800000 \r\n\r> ".to_vec()
        );
        assert_eq!(parse_response(&response), b"3f800000");
    }

    #[test]
    fn test_narrow_reads_truncate() {
        let mut target = MockTarget::new().with_variable(
            0x2000_0000,
            Representation::Int32,
            MockDataPattern::Constant(-1.0),
        );
        let half = roundtrip(&mut target, b"mdh 0x20000000\n").unwrap();
        assert_eq!(parse_response(&half), b"ffff");
        let byte = roundtrip(&mut target, b"mdb 0x20000000\n").unwrap();
        assert_eq!(parse_response(&byte), b"ff");
    }

    #[test]
    fn test_counter_pattern_wraps() {
        let pattern = MockDataPattern::Counter {
            step: 1.0,
            min: 0.0,
            max: 2.0,
        };
        let values: Vec<f64> = (0..5).map(|n| pattern.value_at(n)).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_half_duplex_is_enforced() {
        let mut target = MockTarget::new();
        target.send(b"mdw 0x20000000\n").unwrap();
        assert!(target.send(b"mdw 0x20000000\n").is_err());
        target.read_until_prompt().unwrap();
        assert!(target.read_until_prompt().is_err());
    }

    #[test]
    fn test_garble_and_disconnect() {
        let mut target = MockTarget::new()
            .with_garble_every(2)
            .with_disconnect_after(3);

        let first = roundtrip(&mut target, b"mdw 0x20000000\n").unwrap();
        assert_eq!(parse_response(&first), b"00000000");
        let second = roundtrip(&mut target, b"mdw 0x20000000\n").unwrap();
        assert_eq!(parse_response(&second), b"0");
        assert!(second.starts_with(b"mdw 0x20000000\r\nError"));
        roundtrip(&mut target, b"mdw 0x20000000\n").unwrap();

        let err = roundtrip(&mut target, b"mdw 0x20000000\n").unwrap_err();
        assert!(err.is_transport_failure());
        assert!(!target.is_open());
    }

    #[test]
    fn test_reset_and_close_counters() {
        let mut target = MockTarget::new();
        let closes = target.close_counter();
        roundtrip(&mut target, b"reset\n").unwrap();
        assert_eq!(target.resets(), 1);
        target.close();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(target.send(b"reset\n").is_err());
    }

    #[test]
    fn test_unknown_command() {
        let mut target = MockTarget::new();
        let response = roundtrip(&mut target, b"halt\n").unwrap();
        assert_eq!(
            response,
            b"halt\r\ninvalid command name \"halt\"\r\n\r> ".to_vec()
        );
    }
}
