//! Core data types for ocdplot-rs
//!
//! This module contains the fundamental data structures shared by the
//! protocol client, the decoder and the sampler.
//!
//! # Main Types
//!
//! - [`Representation`] - Binary representation of the observed variable
//! - [`AccessWidth`] - Memory display width (word, halfword, byte)
//! - [`ReadCommand`] - An address plus access width, rendered as an OpenOCD command
//! - [`DecodedValue`] - A numeric value tagged with its representation
//! - [`Sample`] - One emitted `(frame, value)` pair
//! - [`SessionStats`] - Round-trip and fallback counters for a session

use crate::error::{OcdError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::str::FromStr;

/// Size of the rolling window for recent round-trip times
const RECENT_WINDOW_SIZE: usize = 100;

/// Binary representation of the variable being observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Representation {
    /// IEEE-754 binary32
    #[default]
    #[serde(rename = "float")]
    Float32,
    /// Two's-complement 32-bit signed integer
    #[serde(rename = "int32_t")]
    Int32,
    /// 32-bit unsigned integer
    #[serde(rename = "uint32_t")]
    Uint32,
}

impl Representation {
    /// Get all supported representations
    pub fn all() -> &'static [Representation] {
        &[
            Representation::Float32,
            Representation::Int32,
            Representation::Uint32,
        ]
    }

    /// Width of the representation in bits
    pub fn bit_width(&self) -> u32 {
        32
    }

    /// The C type name used on the target side
    pub fn c_name(&self) -> &'static str {
        match self {
            Representation::Float32 => "float",
            Representation::Int32 => "int32_t",
            Representation::Uint32 => "uint32_t",
        }
    }
}

impl std::fmt::Display for Representation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.c_name())
    }
}

impl FromStr for Representation {
    type Err = OcdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "float" | "f32" | "float32" => Ok(Representation::Float32),
            "int32_t" | "i32" | "int32" => Ok(Representation::Int32),
            "uint32_t" | "u32" | "uint32" => Ok(Representation::Uint32),
            other => Err(OcdError::Config(format!(
                "unknown variable type '{}', expected one of float, int32_t, uint32_t",
                other
            ))),
        }
    }
}

/// Memory display access width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessWidth {
    /// 32-bit word (`mdw`)
    #[default]
    Word,
    /// 16-bit halfword (`mdh`)
    Halfword,
    /// 8-bit byte (`mdb`)
    Byte,
}

impl AccessWidth {
    /// OpenOCD memory display command for this width
    pub fn mnemonic(&self) -> &'static str {
        match self {
            AccessWidth::Word => "mdw",
            AccessWidth::Halfword => "mdh",
            AccessWidth::Byte => "mdb",
        }
    }

    /// Returns the size in bytes of one access
    pub fn size_bytes(&self) -> usize {
        match self {
            AccessWidth::Word => 4,
            AccessWidth::Halfword => 2,
            AccessWidth::Byte => 1,
        }
    }
}

impl std::fmt::Display for AccessWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessWidth::Word => write!(f, "word"),
            AccessWidth::Halfword => write!(f, "halfword"),
            AccessWidth::Byte => write!(f, "byte"),
        }
    }
}

/// A memory display request for one address
///
/// The address is kept as the hex text the user supplied so the command
/// sent on the wire is exactly what was configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCommand {
    address: String,
    width: AccessWidth,
}

impl ReadCommand {
    /// Create a read command, validating the address literal
    pub fn new(address: impl Into<String>, width: AccessWidth) -> Result<Self> {
        let address = address.into().trim().to_string();
        parse_address(&address)?;
        Ok(Self { address, width })
    }

    /// Word read at `address`
    pub fn word(address: impl Into<String>) -> Result<Self> {
        Self::new(address, AccessWidth::Word)
    }

    /// The address text
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Numeric value of the address
    pub fn address_value(&self) -> u32 {
        // validated in new()
        parse_address(&self.address).unwrap_or_default()
    }

    /// The access width
    pub fn width(&self) -> AccessWidth {
        self.width
    }

    /// Wire form of the command, newline terminated
    pub fn to_command_line(&self) -> Vec<u8> {
        format!("{} {}\n", self.width.mnemonic(), self.address).into_bytes()
    }
}

impl std::fmt::Display for ReadCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.width.mnemonic(), self.address)
    }
}

/// Parse an address literal of the form `0x1234abcd`
pub fn parse_address(text: &str) -> Result<u32> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .ok_or_else(|| OcdError::InvalidAddress(text.to_string()))?;

    if digits.is_empty() || digits.len() > 8 {
        return Err(OcdError::InvalidAddress(text.to_string()));
    }

    u32::from_str_radix(digits, 16).map_err(|_| OcdError::InvalidAddress(text.to_string()))
}

/// A numeric value tagged with the representation it was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DecodedValue {
    Float32(f32),
    Int32(i32),
    Uint32(u32),
}

impl DecodedValue {
    /// Zero in the given representation (the parse fallback value)
    pub fn zero(representation: Representation) -> Self {
        match representation {
            Representation::Float32 => DecodedValue::Float32(0.0),
            Representation::Int32 => DecodedValue::Int32(0),
            Representation::Uint32 => DecodedValue::Uint32(0),
        }
    }

    /// The representation this value was decoded as
    pub fn representation(&self) -> Representation {
        match self {
            DecodedValue::Float32(_) => Representation::Float32,
            DecodedValue::Int32(_) => Representation::Int32,
            DecodedValue::Uint32(_) => Representation::Uint32,
        }
    }

    /// Widen to f64 for plotting and range tracking (lossless for all variants)
    pub fn as_f64(&self) -> f64 {
        match *self {
            DecodedValue::Float32(v) => v as f64,
            DecodedValue::Int32(v) => v as f64,
            DecodedValue::Uint32(v) => v as f64,
        }
    }

    /// The raw 32-bit pattern behind the value
    pub fn to_bits(&self) -> u32 {
        match *self {
            DecodedValue::Float32(v) => v.to_bits(),
            DecodedValue::Int32(v) => v as u32,
            DecodedValue::Uint32(v) => v,
        }
    }
}

impl std::fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodedValue::Float32(v) => write!(f, "{}", v),
            DecodedValue::Int32(v) => write!(f, "{}", v),
            DecodedValue::Uint32(v) => write!(f, "{}", v),
        }
    }
}

/// One emitted sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Sample index, starting at 0 for the first tick of a session
    pub frame: u64,
    /// The decoded value
    pub value: DecodedValue,
    /// Set when the response did not match the value grammar and `value`
    /// is the zero fallback rather than data read from the target
    pub stale: bool,
}

impl Sample {
    /// Create a sample from a successfully parsed response
    pub fn new(frame: u64, value: DecodedValue) -> Self {
        Self {
            frame,
            value,
            stale: false,
        }
    }

    /// `(frame, value)` as plot coordinates
    pub fn as_point(&self) -> [f64; 2] {
        [self.frame as f64, self.value.as_f64()]
    }
}

/// State of a sampling session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Connected, target not yet reset
    #[default]
    Idle,
    /// Ticks are being issued
    Sampling,
    /// Terminal: the connection has been released
    Stopped,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Sampling => write!(f, "Sampling"),
            SessionState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Statistics for one sampling session
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Ticks that produced a sample
    pub samples: u64,
    /// Samples whose response did not match the value grammar
    pub fallback_samples: u64,
    /// Total round-trip time in microseconds
    pub total_round_trip_us: u64,
    /// Last round-trip time in microseconds
    pub last_round_trip_us: u64,
    /// Minimum round-trip observed (microseconds)
    pub min_round_trip_us: u64,
    /// Maximum round-trip observed (microseconds)
    pub max_round_trip_us: u64,
    /// Rolling window of recent round-trip times for jitter calculation
    pub recent_round_trips: VecDeque<u64>,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            samples: 0,
            fallback_samples: 0,
            total_round_trip_us: 0,
            last_round_trip_us: 0,
            min_round_trip_us: u64::MAX,
            max_round_trip_us: 0,
            recent_round_trips: VecDeque::with_capacity(RECENT_WINDOW_SIZE),
        }
    }
}

impl SessionStats {
    /// Record one completed tick
    pub fn record(&mut self, round_trip_us: u64, fallback: bool) {
        self.samples += 1;
        if fallback {
            self.fallback_samples += 1;
        }
        self.total_round_trip_us += round_trip_us;
        self.last_round_trip_us = round_trip_us;
        self.min_round_trip_us = self.min_round_trip_us.min(round_trip_us);
        self.max_round_trip_us = self.max_round_trip_us.max(round_trip_us);

        self.recent_round_trips.push_back(round_trip_us);
        if self.recent_round_trips.len() > RECENT_WINDOW_SIZE {
            self.recent_round_trips.pop_front();
        }
    }

    /// Average round-trip in microseconds
    pub fn avg_round_trip_us(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.total_round_trip_us as f64 / self.samples as f64
        }
    }

    /// Share of samples that were parse fallbacks, as a percentage
    pub fn fallback_rate(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            (self.fallback_samples as f64 / self.samples as f64) * 100.0
        }
    }

    /// Jitter (max - min) over the recent window in microseconds
    pub fn jitter_us(&self) -> u64 {
        let min = self.recent_round_trips.iter().min().copied().unwrap_or(0);
        let max = self.recent_round_trips.iter().max().copied().unwrap_or(0);
        max.saturating_sub(min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_representation_from_str() {
        assert_eq!(
            "float".parse::<Representation>().unwrap(),
            Representation::Float32
        );
        assert_eq!(
            "int32_t".parse::<Representation>().unwrap(),
            Representation::Int32
        );
        assert_eq!(
            "uint32_t".parse::<Representation>().unwrap(),
            Representation::Uint32
        );
        assert!("double".parse::<Representation>().is_err());
    }

    #[test]
    fn test_representation_serde_names() {
        let json = serde_json::to_string(&Representation::Int32).unwrap();
        assert_eq!(json, "\"int32_t\"");
        let parsed: Representation = serde_json::from_str("\"float\"").unwrap();
        assert_eq!(parsed, Representation::Float32);
    }

    #[test]
    fn test_read_command_line() {
        let cmd = ReadCommand::word("0x12345678").unwrap();
        assert_eq!(cmd.to_command_line(), b"mdw 0x12345678\n");
        assert_eq!(cmd.address_value(), 0x1234_5678);

        let cmd = ReadCommand::new("0x20000004", AccessWidth::Halfword).unwrap();
        assert_eq!(cmd.to_command_line(), b"mdh 0x20000004\n");

        let cmd = ReadCommand::new(" 0x20000008 ", AccessWidth::Byte).unwrap();
        assert_eq!(cmd.to_string(), "mdb 0x20000008");
    }

    #[test]
    fn test_read_command_rejects_bad_address() {
        assert!(ReadCommand::word("20000000").is_err());
        assert!(ReadCommand::word("0x").is_err());
        assert!(ReadCommand::word("0x1_0000_0000").is_err());
        assert!(ReadCommand::word("0x123456789").is_err());
        assert!(ReadCommand::word("0xzz").is_err());
    }

    #[test]
    fn test_decoded_value_bits() {
        assert_eq!(DecodedValue::Float32(1.0).to_bits(), 0x3f80_0000);
        assert_eq!(DecodedValue::Int32(-1).to_bits(), 0xffff_ffff);
        assert_eq!(DecodedValue::Uint32(42).as_f64(), 42.0);
        assert_eq!(
            DecodedValue::zero(Representation::Int32),
            DecodedValue::Int32(0)
        );
    }

    #[test]
    fn test_session_stats() {
        let mut stats = SessionStats::default();
        stats.record(100, false);
        stats.record(300, true);
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.fallback_samples, 1);
        assert_eq!(stats.avg_round_trip_us(), 200.0);
        assert_eq!(stats.fallback_rate(), 50.0);
        assert_eq!(stats.jitter_us(), 200);
        assert_eq!(stats.min_round_trip_us, 100);
        assert_eq!(stats.max_round_trip_us, 300);
    }
}
