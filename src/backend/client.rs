//! OpenOCD command client
//!
//! Frames the supported commands (`reset`, `mdw`, `mdh`, `mdb`) over a
//! [`Transport`] and hands back either the raw response or the parsed value
//! text.

use crate::backend::parser::parse_response;
use crate::backend::transport::Transport;
use crate::error::{OcdError, Result, ResultExt};
use crate::types::{AccessWidth, ReadCommand};

/// Command client for the OpenOCD telnet interface
///
/// Owns the transport; closing the client releases the connection.
pub struct OpenOcdClient<T: Transport> {
    transport: T,
}

impl<T: Transport> OpenOcdClient<T> {
    /// Wrap a transport whose greeting has already been consumed
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Send one command line and return everything up to the next prompt
    pub fn execute(&mut self, command: &[u8]) -> Result<Vec<u8>> {
        if !self.transport.is_open() {
            return Err(OcdError::Transport("connection already closed".to_string()));
        }
        self.transport.send(command)?;
        self.transport.read_until_prompt()
    }

    /// Reset the target, as hard as the adapter allows
    ///
    /// Waits for the post-reset prompt before returning.
    pub fn reset_target(&mut self) -> Result<()> {
        tracing::info!("Resetting target");
        let response = self
            .execute(b"reset\n")
            .map_err(|e| OcdError::Reset(e.to_string()))?;
        tracing::debug!("Reset output: {:?}", String::from_utf8_lossy(&response));
        Ok(())
    }

    /// Issue a memory display command and return the raw response
    pub fn memory_display(&mut self, command: &ReadCommand) -> Result<Vec<u8>> {
        self.execute(&command.to_command_line())
            .with_context(|| command.to_string())
    }

    /// Display contents of `address` as a 32-bit word
    pub fn mdw(&mut self, address: &str) -> Result<Vec<u8>> {
        self.read_value(address, AccessWidth::Word)
    }

    /// Display contents of `address` as a 16-bit halfword
    pub fn mdh(&mut self, address: &str) -> Result<Vec<u8>> {
        self.read_value(address, AccessWidth::Halfword)
    }

    /// Display contents of `address` as a byte
    pub fn mdb(&mut self, address: &str) -> Result<Vec<u8>> {
        self.read_value(address, AccessWidth::Byte)
    }

    /// Read and parse one value; unparsable output yields `"0"`
    fn read_value(&mut self, address: &str, width: AccessWidth) -> Result<Vec<u8>> {
        let command = ReadCommand::new(address, width)?;
        let raw = self.memory_display(&command)?;
        Ok(parse_response(&raw).to_vec())
    }

    /// Check whether the connection is still held
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Release the connection; later commands fail
    pub fn close(&mut self) {
        self.transport.close();
    }

    /// Access the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
}
