//! Minimal telnet layer for the OpenOCD command port
//!
//! OpenOCD opens the telnet session with option negotiation (`IAC WILL ECHO`,
//! `IAC WILL SGA`, ...). The filter strips every IAC sequence from the data
//! stream and produces replies refusing each option, so the remaining bytes
//! are plain command output.

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const NUL: u8 = 0;
const XON: u8 = 0x11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum FilterState {
    #[default]
    Data,
    Iac,
    Option(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Incremental IAC filter; sequences may be split across reads
#[derive(Debug, Default)]
pub struct TelnetFilter {
    state: FilterState,
}

impl TelnetFilter {
    /// Create a new filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed received bytes
    ///
    /// Data bytes are appended to `data`, negotiation replies to `replies`.
    pub fn feed(&mut self, input: &[u8], data: &mut Vec<u8>, replies: &mut Vec<u8>) {
        for &byte in input {
            self.state = match (self.state, byte) {
                (FilterState::Data, IAC) => FilterState::Iac,
                (FilterState::Data, NUL | XON) => FilterState::Data,
                (FilterState::Data, b) => {
                    data.push(b);
                    FilterState::Data
                }
                (FilterState::Iac, IAC) => {
                    data.push(IAC);
                    FilterState::Data
                }
                (FilterState::Iac, cmd @ (DO | DONT | WILL | WONT)) => FilterState::Option(cmd),
                (FilterState::Iac, SB) => FilterState::Subnegotiation,
                // NOP, GA and the other two-byte commands carry no data
                (FilterState::Iac, _) => FilterState::Data,
                (FilterState::Option(cmd), option) => {
                    match cmd {
                        DO | DONT => replies.extend_from_slice(&[IAC, WONT, option]),
                        _ => replies.extend_from_slice(&[IAC, DONT, option]),
                    }
                    tracing::trace!("Refused telnet option {} (command {})", option, cmd);
                    FilterState::Data
                }
                (FilterState::Subnegotiation, IAC) => FilterState::SubnegotiationIac,
                (FilterState::Subnegotiation, _) => FilterState::Subnegotiation,
                (FilterState::SubnegotiationIac, SE) => FilterState::Data,
                (FilterState::SubnegotiationIac, _) => FilterState::Subnegotiation,
            };
        }
    }
}
