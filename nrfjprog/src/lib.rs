//! # Host-side control of Nordic nRF devices
//!
//! This crate drives the nrfjprog shared library — Nordic's native control
//! layer for their nRF5x devices — from Rust: probe and target connection
//! management, memory and register access, flash erase, RTT streaming and
//! the external QSPI memory peripheral, all over a SEGGER J-Link debug
//! probe.
//!
//! # Prerequisites
//!
//! - The nrfjprog shared library (shipped with Nordic's command line tools)
//! - A SEGGER J-Link library for it to drive
//!
//! Locating the two libraries on disk is left to the caller; a [`Session`]
//! consumes resolved, absolute paths.
//!
//! # Examples
//!
//! ## Reading memory over the probe
//!
//! ```no_run
//! use nrfjprog::{Config, DeviceFamily, Session, DEFAULT_SPEED_KHZ};
//!
//! let config = Config::new(
//!     "/opt/nrf-command-line-tools/lib/libnrfjprogdll.so",
//!     "/opt/SEGGER/JLink/libjlinkarm.so",
//! );
//! let mut session = Session::new(DeviceFamily::Nrf52, config)?;
//! session.open()?;
//! session.connect_to_emu_with_snr(683441800, DEFAULT_SPEED_KHZ)?;
//! session.connect_to_device()?;
//!
//! let word = session.read_u32(0x2000_0000)?;
//! println!("word at 0x20000000: {word:#010x}");
//! # Ok::<(), nrfjprog::Error>(())
//! ```
//!
//! ## Draining an RTT channel
//!
//! ```no_run
//! # use nrfjprog::{Config, DeviceFamily, Session, DEFAULT_SPEED_KHZ};
//! # let mut session = Session::new(
//! #     DeviceFamily::Nrf52,
//! #     Config::new("libnrfjprogdll.so", "libjlinkarm.so"),
//! # )?;
//! # session.open()?;
//! # session.connect_to_emu_without_snr(DEFAULT_SPEED_KHZ)?;
//! session.rtt_start()?;
//! if session.rtt_is_control_block_found()? {
//!     let text = session.rtt_read_str(0, 1024)?;
//!     print!("{text}");
//! }
//! session.rtt_stop()?;
//! # Ok::<(), nrfjprog::Error>(())
//! ```
//!
//! A session is fully synchronous and owns its library load exclusively;
//! share it between threads only behind external serialization. It closes
//! itself on drop.

pub mod dll;
mod error;
#[cfg(test)]
mod fake;
mod memory;
mod qspi;
mod rtt;
mod session;
mod types;

pub use crate::dll::{Library, LogSink, NrfjprogDll};
pub use crate::error::{
    DecodeError, Error, ErrorCategory, ErrorCode, ParameterError, ProtocolError, ResourceError,
    StateError,
};
pub use crate::qspi::{
    QspiAddressMode, QspiConfig, QspiEraseLen, QspiFrequency, QspiLevelIo, QspiReadMode,
    QspiSpiMode, QspiWriteMode,
};
pub use crate::rtt::{RttChannelCount, RttChannelDirection, RttChannelInfo};
pub use crate::session::{Config, RamPowerStatus, Session, SessionState, DEFAULT_SPEED_KHZ};
pub use crate::types::{
    CpuRegister, DeviceFamily, DeviceVersion, DllVersion, RamPower, ReadbackProtection,
    Region0Source,
};
