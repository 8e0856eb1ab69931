//! RTT: the buffer-based streaming channel over the debug connection.
//!
//! RTT works by polling ring buffers anchored by a control block in target
//! memory. The native library performs the discovery scan; this layer tracks
//! the sub-protocol phase (started or not) because the native side does not
//! gate streaming calls itself. The flow is: optionally register a control
//! block address, [`rtt_start`](crate::Session::rtt_start), check
//! [`rtt_is_control_block_found`](crate::Session::rtt_is_control_block_found),
//! then poll with reads and writes until
//! [`rtt_stop`](crate::Session::rtt_stop).
//!
//! Reads and writes move raw bytes. Text convenience wrappers encode and
//! decode UTF-8 at the edges; a read length that cuts a multi-byte sequence
//! surfaces as a decode error that keeps the raw bytes, because the ring
//! buffer boundary knows nothing about character boundaries.

use crate::dll::Library;
use crate::error::{buffer_len, check, DecodeError, Error, StateError};
use crate::session::Session;
use crate::types::enum_codes;

enum_codes! {
    /// Direction of an RTT channel, from the target's point of view.
    pub enum RttChannelDirection: "RTT channel direction" {
        "UP_DIRECTION" => Up = 0,
        "DOWN_DIRECTION" => Down = 1,
    }
}

/// Number of channels declared in the control block, per direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RttChannelCount {
    /// Host-to-target channels.
    pub down: u32,
    /// Target-to-host channels.
    pub up: u32,
}

/// Name and buffer geometry of one RTT channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RttChannelInfo {
    /// The channel name the target declared, trimmed at the first NUL of
    /// its fixed 32-byte field.
    pub name: String,
    /// Size of the channel's ring buffer in bytes.
    pub buffer_size: u32,
}

impl<L: Library> Session<L> {
    fn require_rtt(&self) -> Result<(), StateError> {
        self.require_emu()?;
        if self.rtt_started {
            Ok(())
        } else {
            Err(StateError::RttNotStarted)
        }
    }

    /// Whether the native library has an RTT session running.
    pub fn is_rtt_started(&mut self) -> Result<bool, Error> {
        self.require_emu()?;
        let mut started = false;
        check("is_rtt_started", self.lib.is_rtt_started(&mut started))?;
        Ok(started)
    }

    /// Tells the native library where the control block lives, instead of
    /// letting [`rtt_start`](Session::rtt_start) scan target RAM for it.
    ///
    /// Must be called before starting.
    pub fn rtt_set_control_block_address(&mut self, addr: u32) -> Result<(), Error> {
        self.require_emu()?;
        if self.rtt_started {
            return Err(StateError::RttAlreadyStarted.into());
        }
        tracing::debug!("RTT control block registered at {addr:#010x}");
        check(
            "rtt_set_control_block_address",
            self.lib.rtt_set_control_block_address(addr),
        )
        .map_err(Error::from)
    }

    /// Starts RTT, triggering the control block scan on the native side.
    ///
    /// Returns once the native layer has located the control block or
    /// exhausted its search; use
    /// [`rtt_is_control_block_found`](Session::rtt_is_control_block_found)
    /// for the outcome.
    pub fn rtt_start(&mut self) -> Result<(), Error> {
        self.require_emu()?;
        if self.rtt_started {
            return Err(StateError::RttAlreadyStarted.into());
        }
        check("rtt_start", self.lib.rtt_start())?;
        self.rtt_started = true;
        Ok(())
    }

    /// Whether the discovery scan located a control block. No side effects.
    pub fn rtt_is_control_block_found(&mut self) -> Result<bool, Error> {
        self.require_rtt()?;
        let mut found = false;
        check(
            "rtt_is_control_block_found",
            self.lib.rtt_is_control_block_found(&mut found),
        )?;
        Ok(found)
    }

    /// Stops RTT. Streaming operations fail with a [`StateError`] until a
    /// new [`rtt_start`](Session::rtt_start) succeeds.
    pub fn rtt_stop(&mut self) -> Result<(), Error> {
        self.require_rtt()?;
        check("rtt_stop", self.lib.rtt_stop())?;
        self.rtt_started = false;
        Ok(())
    }

    /// Reads up to `len` bytes from an up channel.
    ///
    /// A short (or empty) result just means the ring buffer held less than
    /// `len` bytes; poll again for more.
    pub fn rtt_read(&mut self, channel_index: u32, len: u32) -> Result<Vec<u8>, Error> {
        self.require_rtt()?;
        let mut data = vec![0u8; len as usize];
        let mut read = 0;
        check(
            "rtt_read",
            self.lib.rtt_read(channel_index, &mut data, &mut read),
        )?;
        data.truncate(read as usize);
        Ok(data)
    }

    /// Reads up to `len` bytes from an up channel and decodes them as UTF-8.
    ///
    /// The `len` boundary can cut a multi-byte sequence; that surfaces as
    /// [`DecodeError::Utf8`] with the raw bytes retained, so the caller can
    /// keep the valid prefix and carry the remainder into the next read.
    pub fn rtt_read_str(&mut self, channel_index: u32, len: u32) -> Result<String, Error> {
        let data = self.rtt_read(channel_index, len)?;
        Ok(String::from_utf8(data).map_err(DecodeError::Utf8)?)
    }

    /// Writes bytes to a down channel, returning how many the channel
    /// accepted.
    ///
    /// A partial write is a normal outcome when the ring buffer is nearly
    /// full, not an error.
    pub fn rtt_write(&mut self, channel_index: u32, data: &[u8]) -> Result<u32, Error> {
        self.require_rtt()?;
        buffer_len("data", data)?;
        let mut written = 0;
        check(
            "rtt_write",
            self.lib.rtt_write(channel_index, data, &mut written),
        )?;
        Ok(written)
    }

    /// Writes a string to a down channel as UTF-8 bytes. The returned count
    /// is in bytes, not characters.
    pub fn rtt_write_str(&mut self, channel_index: u32, text: &str) -> Result<u32, Error> {
        self.rtt_write(channel_index, text.as_bytes())
    }

    /// Number of channels the control block declares, per direction.
    pub fn rtt_read_channel_count(&mut self) -> Result<RttChannelCount, Error> {
        self.require_rtt()?;
        let mut down = 0;
        let mut up = 0;
        check(
            "rtt_read_channel_count",
            self.lib.rtt_read_channel_count(&mut down, &mut up),
        )?;
        Ok(RttChannelCount { down, up })
    }

    /// Name and buffer size of one channel.
    pub fn rtt_read_channel_info(
        &mut self,
        channel_index: u32,
        direction: RttChannelDirection,
    ) -> Result<RttChannelInfo, Error> {
        self.require_rtt()?;
        let mut name = [0u8; 32];
        let mut size = 0;
        check(
            "rtt_read_channel_info",
            self.lib
                .rtt_read_channel_info(channel_index, direction as i32, &mut name, &mut size),
        )?;
        let len = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        Ok(RttChannelInfo {
            name: String::from_utf8_lossy(&name[..len]).into_owned(),
            buffer_size: size,
        })
    }
}
