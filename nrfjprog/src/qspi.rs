//! QSPI: the external quad-SPI memory peripheral behind the probe.
//!
//! The peripheral is configured once with a 21-field record whose layout is
//! an ABI contract (see [`QspiInitParamsRaw`](crate::dll::QspiInitParamsRaw));
//! [`QspiConfig`] is the caller-facing form with the documented defaults.
//! Data operations are only meaningful between a successful
//! [`qspi_init`](crate::Session::qspi_init) and
//! [`qspi_uninit`](crate::Session::qspi_uninit); that phase is tracked here
//! and enforced before any native call.

use crate::dll::{Library, QspiInitParamsRaw};
use crate::error::{buffer_len, check, Error, ParameterError, StateError};
use crate::session::Session;
use crate::types::enum_codes;

enum_codes! {
    /// Read opcode issued to the external memory.
    pub enum QspiReadMode: "QSPI read mode" {
        "FASTREAD" => FastRead = 0,
        "READ2O" => Read2o = 1,
        "READ2IO" => Read2io = 2,
        "READ4O" => Read4o = 3,
        "READ4IO" => Read4io = 4,
    }
}

enum_codes! {
    /// Page program opcode issued to the external memory.
    pub enum QspiWriteMode: "QSPI write mode" {
        "PP" => Pp = 0,
        "PP2O" => Pp2o = 1,
        "PP4O" => Pp4o = 2,
        "PP4IO" => Pp4io = 3,
    }
}

enum_codes! {
    /// Addressing width used on the external memory.
    pub enum QspiAddressMode: "QSPI address mode" {
        "BIT24" => Bit24 = 0,
        "BIT32" => Bit32 = 1,
    }
}

enum_codes! {
    /// SCK frequency. The codes are the peripheral's divider settings, which
    /// is why they are not ordered by frequency.
    pub enum QspiFrequency: "QSPI frequency" {
        "M2" => M2 = 15,
        "M4" => M4 = 7,
        "M8" => M8 = 3,
        "M16" => M16 = 1,
        "M32" => M32 = 0,
    }
}

enum_codes! {
    /// SPI clock phase/polarity mode.
    pub enum QspiSpiMode: "QSPI SPI mode" {
        "MODE0" => Mode0 = 0,
        "MODE3" => Mode3 = 1,
    }
}

enum_codes! {
    /// Level driven on the IO2/IO3 lines during a custom instruction.
    pub enum QspiLevelIo: "QSPI IO level" {
        "LEVEL_LOW" => Low = 0,
        "LEVEL_HIGH" => High = 1,
    }
}

enum_codes! {
    /// Erase granularity for [`qspi_erase`](crate::Session::qspi_erase).
    pub enum QspiEraseLen: "QSPI erase length" {
        "ERASE4KB" => Erase4kb = 0,
        "ERASE32KB" => Erase32kb = 3,
        "ERASE64KB" => Erase64kb = 1,
        "ERASEALL" => EraseAll = 2,
    }
}

/// Configuration for [`qspi_init`](crate::Session::qspi_init).
///
/// The defaults configure 4-bit I/O in both directions, 24-bit addressing
/// and 16 MHz on the pin assignment of the nRF52840 development kit; any
/// field can be overridden with struct update syntax:
///
/// ```
/// use nrfjprog::{QspiConfig, QspiFrequency};
///
/// let config = QspiConfig {
///     frequency: QspiFrequency::M32,
///     ..QspiConfig::default()
/// };
/// # assert_eq!(config.sck_delay, 0x80);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QspiConfig {
    pub read_mode: QspiReadMode,
    pub write_mode: QspiWriteMode,
    pub address_mode: QspiAddressMode,
    pub frequency: QspiFrequency,
    pub spi_mode: QspiSpiMode,
    /// Delay between CSN deassertions, in units of 62.5 ns.
    pub sck_delay: u32,
    pub custom_instruction_io2_level: QspiLevelIo,
    pub custom_instruction_io3_level: QspiLevelIo,
    pub csn_pin: u32,
    pub csn_port: u32,
    pub sck_pin: u32,
    pub sck_port: u32,
    pub dio0_pin: u32,
    pub dio0_port: u32,
    pub dio1_pin: u32,
    pub dio1_port: u32,
    pub dio2_pin: u32,
    pub dio2_port: u32,
    pub dio3_pin: u32,
    pub dio3_port: u32,
    /// Bit index of the write-in-progress flag in the memory's status
    /// register.
    pub wip_index: u32,
}

impl Default for QspiConfig {
    fn default() -> Self {
        Self {
            read_mode: QspiReadMode::Read4io,
            write_mode: QspiWriteMode::Pp4io,
            address_mode: QspiAddressMode::Bit24,
            frequency: QspiFrequency::M16,
            spi_mode: QspiSpiMode::Mode0,
            sck_delay: 0x80,
            custom_instruction_io2_level: QspiLevelIo::Low,
            custom_instruction_io3_level: QspiLevelIo::High,
            csn_pin: 17,
            csn_port: 0,
            sck_pin: 19,
            sck_port: 0,
            dio0_pin: 20,
            dio0_port: 0,
            dio1_pin: 21,
            dio1_port: 0,
            dio2_pin: 22,
            dio2_port: 0,
            dio3_pin: 23,
            dio3_port: 0,
            wip_index: 0,
        }
    }
}

impl QspiConfig {
    /// Marshals into the fixed-layout record the native library consumes.
    pub(crate) fn to_raw(self) -> QspiInitParamsRaw {
        QspiInitParamsRaw {
            read_mode: self.read_mode as i32,
            write_mode: self.write_mode as i32,
            address_mode: self.address_mode as i32,
            frequency: self.frequency as i32,
            spi_mode: self.spi_mode as i32,
            sck_delay: self.sck_delay,
            custom_instruction_io2_level: self.custom_instruction_io2_level as i32,
            custom_instruction_io3_level: self.custom_instruction_io3_level as i32,
            csn_pin: self.csn_pin,
            csn_port: self.csn_port,
            sck_pin: self.sck_pin,
            sck_port: self.sck_port,
            dio0_pin: self.dio0_pin,
            dio0_port: self.dio0_port,
            dio1_pin: self.dio1_pin,
            dio1_port: self.dio1_port,
            dio2_pin: self.dio2_pin,
            dio2_port: self.dio2_port,
            dio3_pin: self.dio3_pin,
            dio3_port: self.dio3_port,
            wip_index: self.wip_index,
        }
    }
}

impl<L: Library> Session<L> {
    fn require_qspi(&self) -> Result<(), StateError> {
        self.require_emu()?;
        if self.qspi_initialized {
            Ok(())
        } else {
            Err(StateError::QspiNotInitialized)
        }
    }

    /// Whether the native library has the QSPI peripheral initialized.
    pub fn is_qspi_init(&mut self) -> Result<bool, Error> {
        self.require_emu()?;
        let mut initialized = false;
        check("is_qspi_init", self.lib.is_qspi_init(&mut initialized))?;
        Ok(initialized)
    }

    /// Initializes the QSPI peripheral with the given configuration.
    ///
    /// With `retain_ram` set, the device RAM the peripheral borrows is
    /// snapshotted and restored on [`qspi_uninit`](Session::qspi_uninit).
    pub fn qspi_init(&mut self, retain_ram: bool, config: &QspiConfig) -> Result<(), Error> {
        self.require_emu()?;
        if self.qspi_initialized {
            return Err(StateError::QspiAlreadyInitialized.into());
        }
        tracing::debug!(
            "Initializing QSPI ({} read, {} write, {})",
            config.read_mode,
            config.write_mode,
            config.frequency
        );
        check("qspi_init", self.lib.qspi_init(retain_ram, &config.to_raw()))?;
        self.qspi_initialized = true;
        Ok(())
    }

    /// Uninitializes the QSPI peripheral, restoring snapshotted RAM when
    /// init requested retention.
    pub fn qspi_uninit(&mut self) -> Result<(), Error> {
        self.require_qspi()?;
        check("qspi_uninit", self.lib.qspi_uninit())?;
        self.qspi_initialized = false;
        Ok(())
    }

    /// Reads `len` bytes from the external memory starting at `addr`.
    pub fn qspi_read(&mut self, addr: u32, len: u32) -> Result<Vec<u8>, Error> {
        self.require_qspi()?;
        let mut data = vec![0u8; len as usize];
        check("qspi_read", self.lib.qspi_read(addr, &mut data))?;
        Ok(data)
    }

    /// Writes a byte span to the external memory starting at `addr`.
    pub fn qspi_write(&mut self, addr: u32, data: &[u8]) -> Result<(), Error> {
        self.require_qspi()?;
        buffer_len("data", data)?;
        check("qspi_write", self.lib.qspi_write(addr, data)).map_err(Error::from)
    }

    /// Erases external memory at `addr` with the given granularity.
    pub fn qspi_erase(&mut self, addr: u32, length: QspiEraseLen) -> Result<(), Error> {
        self.require_qspi()?;
        tracing::debug!("QSPI erase {length} at {addr:#010x}");
        check("qspi_erase", self.lib.qspi_erase(addr, length as i32)).map_err(Error::from)
    }

    /// Sends a custom instruction to the external memory.
    ///
    /// The exchange always moves a fixed 8-byte frame in each direction;
    /// `data_in` (at most 8 bytes) is zero-padded into the outgoing frame
    /// and `length` tells the peripheral how much of the instruction is
    /// live. The incoming frame is returned only when `want_output` is set.
    pub fn qspi_custom(
        &mut self,
        code: u8,
        length: u8,
        data_in: Option<&[u8]>,
        want_output: bool,
    ) -> Result<Option<[u8; 8]>, Error> {
        self.require_qspi()?;
        let mut input = [0u8; 8];
        if let Some(data) = data_in {
            if data.is_empty() {
                return Err(ParameterError::EmptyBuffer("data_in").into());
            }
            if data.len() > input.len() {
                return Err(ParameterError::BufferTooLong {
                    name: "data_in",
                    len: data.len(),
                    max: input.len(),
                }
                .into());
            }
            input[..data.len()].copy_from_slice(data);
        }
        let mut output = [0u8; 8];
        check(
            "qspi_custom",
            self.lib.qspi_custom(code, length, &input, &mut output),
        )?;
        Ok(want_output.then_some(output))
    }
}
