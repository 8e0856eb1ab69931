//! The session layer: connection phase tracking and the operations that do
//! not belong to a sub-protocol.
//!
//! A [`Session`] owns one loaded nrfjprog library and walks it through the
//! connection phases:
//!
//! ```text
//! Unopened ──open()──▶ Opened ──connect_to_emu_*()──▶ EmulatorConnected
//!                        ▲                                   │
//!                        └────disconnect_from_emu()──────────┤
//!                                                            ▼
//!                  DeviceConnected ◀──connect_to_device()────┘
//! ```
//!
//! plus the terminal `Closed` state reached from anywhere via
//! [`Session::close`] (or `Drop`). The phase graph is enforced locally: an
//! out-of-phase operation fails with a [`StateError`] before the native
//! library is invoked, rather than relying on the native side to reject the
//! misuse. RTT and QSPI are orthogonal peripheral sessions layered on top of
//! a connection; their sub-state lives here as well and is reset whenever
//! the underlying connection goes away.

use std::ffi::CString;
use std::fmt;
use std::path::PathBuf;

use crate::dll::{self, Library, LogSink, NrfjprogDll};
use crate::error::{check, native_enum, Error, StateError};
use crate::types::{
    DeviceFamily, DeviceVersion, DllVersion, RamPower, ReadbackProtection, Region0Source,
};

/// Default SWD clock speed used when connecting to an emulator, in kHz.
pub const DEFAULT_SPEED_KHZ: u32 = 2000;

/// How a [`Session`] finds and reports on its native libraries.
///
/// Locating the libraries on disk is deliberately not handled here; the
/// paths must already be resolved and absolute.
pub struct Config {
    /// Path to the nrfjprog shared library.
    pub dll_path: PathBuf,
    /// Path to the SEGGER J-Link library the nrfjprog library drives.
    pub jlink_path: PathBuf,
    /// Receives the log lines the native library emits. When `None`, lines
    /// are forwarded to `tracing` under the `nrfjprog::dll` target.
    pub log_sink: Option<LogSink>,
}

impl Config {
    pub fn new(dll_path: impl Into<PathBuf>, jlink_path: impl Into<PathBuf>) -> Self {
        Self {
            dll_path: dll_path.into(),
            jlink_path: jlink_path.into(),
            log_sink: None,
        }
    }

    /// Installs a sink for the native library's log output.
    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.log_sink = Some(sink);
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("dll_path", &self.dll_path)
            .field("jlink_path", &self.jlink_path)
            .field("log_sink", &self.log_sink.is_some())
            .finish()
    }
}

/// The connection phase of a [`Session`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// The library is loaded but not opened.
    Unopened,
    /// The library is open; no emulator connection yet.
    Opened,
    /// Connected to an emulator.
    EmulatorConnected,
    /// Connected to an emulator and a target device.
    DeviceConnected,
    /// The session has been closed. Terminal.
    Closed,
}

/// RAM power report of the connected device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RamPowerStatus {
    /// Power state of each RAM section.
    pub sections: Vec<RamPower>,
    /// Number of RAM sections in the device.
    pub section_count: u32,
    /// Size in bytes of one RAM section.
    pub section_size: u32,
}

/// A live connection to the nrfjprog shared library.
///
/// One `Session` owns one library load. All calls are synchronous and
/// blocking; the underlying probe connection is stateful and non-reentrant,
/// so a session must not be shared between threads without external
/// serialization.
///
/// The session closes itself on `Drop`; [`close`](Session::close) can be
/// called earlier and is idempotent.
pub struct Session<L: Library = NrfjprogDll> {
    pub(crate) lib: L,
    pub(crate) family: DeviceFamily,
    pub(crate) state: SessionState,
    pub(crate) rtt_started: bool,
    pub(crate) qspi_initialized: bool,
    jlink_path: CString,
    log_sink: Option<LogSink>,
}

impl Session<NrfjprogDll> {
    /// Loads the nrfjprog shared library and prepares a session for the
    /// given device family.
    ///
    /// The session starts in [`SessionState::Unopened`]; call
    /// [`open`](Session::open) next.
    pub fn new(family: DeviceFamily, config: Config) -> Result<Self, Error> {
        let lib = NrfjprogDll::load(&config.dll_path)?;
        Ok(Self::from_parts(
            lib,
            family,
            &config.jlink_path,
            config.log_sink,
        )?)
    }
}

impl<L: Library> Session<L> {
    /// Builds a session over a custom [`Library`] implementation.
    ///
    /// This is how the test suite substitutes an in-memory binding; it is
    /// public because instrumenting or proxying the native surface is useful
    /// beyond this crate's own tests.
    pub fn with_library(lib: L, family: DeviceFamily) -> Self {
        Self {
            lib,
            family,
            state: SessionState::Unopened,
            rtt_started: false,
            qspi_initialized: false,
            jlink_path: CString::default(),
            log_sink: None,
        }
    }

    fn from_parts(
        lib: L,
        family: DeviceFamily,
        jlink_path: &std::path::Path,
        log_sink: Option<LogSink>,
    ) -> Result<Self, crate::error::ResourceError> {
        let jlink_path = jlink_path
            .to_str()
            .and_then(|s| CString::new(s).ok())
            .ok_or_else(|| crate::error::ResourceError::InvalidPath(jlink_path.to_path_buf()))?;
        Ok(Self {
            lib,
            family,
            state: SessionState::Unopened,
            rtt_started: false,
            qspi_initialized: false,
            jlink_path,
            log_sink,
        })
    }

    /// The device family this session was created for.
    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    /// The current connection phase.
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn require_open(&self) -> Result<(), StateError> {
        match self.state {
            SessionState::Closed => Err(StateError::Closed),
            SessionState::Unopened => Err(StateError::NotOpen),
            _ => Ok(()),
        }
    }

    /// Target-level operations need an emulator connection; the native
    /// library connects to the device on its own when necessary.
    pub(crate) fn require_emu(&self) -> Result<(), StateError> {
        self.require_open()?;
        match self.state {
            SessionState::Opened => Err(StateError::NotConnectedToEmulator),
            _ => Ok(()),
        }
    }

    fn require_loaded(&self) -> Result<(), StateError> {
        if self.state == SessionState::Closed {
            Err(StateError::Closed)
        } else {
            Ok(())
        }
    }

    /// Version of the J-Link library the native side has loaded.
    pub fn dll_version(&mut self) -> Result<DllVersion, Error> {
        self.require_loaded()?;
        let (mut major, mut minor, mut revision) = (0, 0, 0u8);
        check(
            "dll_version",
            self.lib.dll_version(&mut major, &mut minor, &mut revision),
        )?;
        Ok(DllVersion {
            major,
            minor,
            revision: revision as char,
        })
    }

    /// Asks the native library whether it considers itself open.
    pub fn is_open(&mut self) -> Result<bool, Error> {
        self.require_loaded()?;
        let mut opened = false;
        check("is_dll_open", self.lib.is_dll_open(&mut opened))?;
        Ok(opened)
    }

    /// Opens the native library and prepares it for the session's device
    /// family.
    pub fn open(&mut self) -> Result<(), Error> {
        match self.state {
            SessionState::Closed => return Err(StateError::Closed.into()),
            SessionState::Unopened => {}
            _ => return Err(StateError::AlreadyOpen.into()),
        }
        tracing::debug!("Opening nrfjprog library for family {}", self.family);
        dll::install_log_sink(self.log_sink.take());
        let code = self.lib.open_dll(&self.jlink_path, self.family as i32);
        if let Err(error) = check("open_dll", code) {
            // The sink must not outlive a failed open; keep it for a retry.
            self.log_sink = dll::take_log_sink();
            return Err(error.into());
        }
        self.state = SessionState::Opened;
        Ok(())
    }

    /// Closes the native library and releases the log sink.
    ///
    /// Idempotent; also runs on `Drop`, so every exit path closes exactly
    /// once.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        tracing::debug!("Closing nrfjprog session");
        self.lib.close_dll();
        dll::take_log_sink();
        self.state = SessionState::Closed;
        self.rtt_started = false;
        self.qspi_initialized = false;
    }

    /// Serial numbers of the connected USB emulators.
    pub fn enum_emu_snr(&mut self) -> Result<Vec<u32>, Error> {
        self.require_open()?;
        let mut serial_numbers = [0u32; 127];
        let mut available = 0;
        check(
            "enum_emu_snr",
            self.lib.enum_emu_snr(&mut serial_numbers, &mut available),
        )?;
        let count = (available as usize).min(serial_numbers.len());
        Ok(serial_numbers[..count].to_vec())
    }

    /// Whether an emulator connection is established.
    pub fn is_connected_to_emu(&mut self) -> Result<bool, Error> {
        self.require_open()?;
        let mut connected = false;
        check(
            "is_connected_to_emu",
            self.lib.is_connected_to_emu(&mut connected),
        )?;
        Ok(connected)
    }

    /// Connects to the emulator with the given serial number.
    pub fn connect_to_emu_with_snr(
        &mut self,
        serial_number: u32,
        speed_khz: u32,
    ) -> Result<(), Error> {
        self.require_open()?;
        if self.state != SessionState::Opened {
            return Err(StateError::AlreadyConnectedToEmulator.into());
        }
        tracing::debug!("Connecting to emulator {serial_number} at {speed_khz} kHz");
        check(
            "connect_to_emu_with_snr",
            self.lib.connect_to_emu_with_snr(serial_number, speed_khz),
        )?;
        self.state = SessionState::EmulatorConnected;
        Ok(())
    }

    /// Connects to the only connected emulator.
    pub fn connect_to_emu_without_snr(&mut self, speed_khz: u32) -> Result<(), Error> {
        self.require_open()?;
        if self.state != SessionState::Opened {
            return Err(StateError::AlreadyConnectedToEmulator.into());
        }
        tracing::debug!("Connecting to emulator at {speed_khz} kHz");
        check(
            "connect_to_emu_without_snr",
            self.lib.connect_to_emu_without_snr(speed_khz),
        )?;
        self.state = SessionState::EmulatorConnected;
        Ok(())
    }

    /// Serial number of the connected emulator.
    pub fn read_connected_emu_snr(&mut self) -> Result<u32, Error> {
        self.require_emu()?;
        let mut serial_number = 0;
        check(
            "read_connected_emu_snr",
            self.lib.read_connected_emu_snr(&mut serial_number),
        )?;
        Ok(serial_number)
    }

    /// Firmware identification string of the connected emulator.
    pub fn read_connected_emu_fwstr(&mut self) -> Result<String, Error> {
        self.require_emu()?;
        let mut buffer = [0u8; 255];
        check(
            "read_connected_emu_fwstr",
            self.lib.read_connected_emu_fwstr(&mut buffer),
        )?;
        let len = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
        Ok(String::from_utf8_lossy(&buffer[..len]).into_owned())
    }

    /// Disconnects from the emulator, dropping any device connection and
    /// peripheral sub-sessions with it.
    pub fn disconnect_from_emu(&mut self) -> Result<(), Error> {
        self.require_emu()?;
        check("disconnect_from_emu", self.lib.disconnect_from_emu())?;
        self.state = SessionState::Opened;
        self.rtt_started = false;
        self.qspi_initialized = false;
        Ok(())
    }

    /// Erases all user flash and disables readback protection, recovering a
    /// protected device.
    pub fn recover(&mut self) -> Result<(), Error> {
        self.require_emu()?;
        tracing::debug!("Recovering device");
        check("recover", self.lib.recover())
            .map_err(Error::from)
    }

    /// Whether the emulator has an established connection to the device.
    pub fn is_connected_to_device(&mut self) -> Result<bool, Error> {
        self.require_emu()?;
        let mut connected = false;
        check(
            "is_connected_to_device",
            self.lib.is_connected_to_device(&mut connected),
        )?;
        Ok(connected)
    }

    /// Connects to the target device.
    pub fn connect_to_device(&mut self) -> Result<(), Error> {
        self.require_emu()?;
        if self.state == SessionState::DeviceConnected {
            return Err(StateError::AlreadyConnectedToDevice.into());
        }
        check("connect_to_device", self.lib.connect_to_device())?;
        self.state = SessionState::DeviceConnected;
        Ok(())
    }

    /// Disconnects from the target device, keeping the emulator connection.
    pub fn disconnect_from_device(&mut self) -> Result<(), Error> {
        self.require_emu()?;
        if self.state != SessionState::DeviceConnected {
            return Err(StateError::NotConnectedToDevice.into());
        }
        check("disconnect_from_device", self.lib.disconnect_from_device())?;
        self.state = SessionState::EmulatorConnected;
        self.rtt_started = false;
        self.qspi_initialized = false;
        Ok(())
    }

    /// Sets the readback protection level of the target.
    pub fn readback_protect(&mut self, level: ReadbackProtection) -> Result<(), Error> {
        self.require_emu()?;
        check("readback_protect", self.lib.readback_protect(level as i32)).map_err(Error::from)
    }

    /// Current readback protection level of the target.
    pub fn readback_status(&mut self) -> Result<ReadbackProtection, Error> {
        self.require_emu()?;
        let mut status = 0;
        check("readback_status", self.lib.readback_status(&mut status))?;
        Ok(native_enum("readback protection level", status)?)
    }

    /// Size and configuration source of protection region 0 (nRF51 only).
    pub fn read_region_0_size_and_source(&mut self) -> Result<(u32, Region0Source), Error> {
        self.require_emu()?;
        let mut size = 0;
        let mut source = 0;
        check(
            "read_region_0_size_and_source",
            self.lib.read_region_0_size_and_source(&mut size, &mut source),
        )?;
        Ok((size, native_enum("region 0 source", source)?))
    }

    /// Family of the connected device. Meaningful when the session was
    /// opened with [`DeviceFamily::Unknown`].
    pub fn read_device_family(&mut self) -> Result<DeviceFamily, Error> {
        self.require_emu()?;
        let mut family = 0;
        check("read_device_family", self.lib.read_device_family(&mut family))?;
        Ok(native_enum("device family", family)?)
    }

    /// Hardware version of the connected device.
    pub fn read_device_version(&mut self) -> Result<DeviceVersion, Error> {
        self.require_emu()?;
        let mut version = 0;
        check(
            "read_device_version",
            self.lib.read_device_version(&mut version),
        )?;
        Ok(native_enum("device version", version)?)
    }

    /// Soft reset through the CTRL-AP. nRF52 and onward.
    pub fn debug_reset(&mut self) -> Result<(), Error> {
        self.require_emu()?;
        check("debug_reset", self.lib.debug_reset()).map_err(Error::from)
    }

    /// System reset request.
    pub fn sys_reset(&mut self) -> Result<(), Error> {
        self.require_emu()?;
        check("sys_reset", self.lib.sys_reset()).map_err(Error::from)
    }

    /// Hardware reset through the reset pin.
    pub fn pin_reset(&mut self) -> Result<(), Error> {
        self.require_emu()?;
        check("pin_reset", self.lib.pin_reset()).map_err(Error::from)
    }

    /// Disables BPROT, ACL or NVM protection blocks as appropriate for the
    /// device.
    pub fn disable_bprot(&mut self) -> Result<(), Error> {
        self.require_emu()?;
        check("disable_bprot", self.lib.disable_bprot()).map_err(Error::from)
    }

    /// Erases all code and UICR flash.
    pub fn erase_all(&mut self) -> Result<(), Error> {
        self.require_emu()?;
        tracing::debug!("Erasing all flash");
        check("erase_all", self.lib.erase_all()).map_err(Error::from)
    }

    /// Erases the code flash page containing `addr`.
    pub fn erase_page(&mut self, addr: u32) -> Result<(), Error> {
        self.require_emu()?;
        check("erase_page", self.lib.erase_page(addr)).map_err(Error::from)
    }

    /// Erases the UICR info page.
    pub fn erase_uicr(&mut self) -> Result<(), Error> {
        self.require_emu()?;
        check("erase_uicr", self.lib.erase_uicr()).map_err(Error::from)
    }

    /// Whether the device CPU is halted.
    pub fn is_halted(&mut self) -> Result<bool, Error> {
        self.require_emu()?;
        let mut halted = false;
        check("is_halted", self.lib.is_halted(&mut halted))?;
        Ok(halted)
    }

    /// Halts the device CPU.
    pub fn halt(&mut self) -> Result<(), Error> {
        self.require_emu()?;
        check("halt", self.lib.halt()).map_err(Error::from)
    }

    /// Starts the device CPU with the given program counter and stack
    /// pointer.
    pub fn run(&mut self, pc: u32, sp: u32) -> Result<(), Error> {
        self.require_emu()?;
        check("run", self.lib.run(pc, sp)).map_err(Error::from)
    }

    /// Resumes the device CPU.
    pub fn go(&mut self) -> Result<(), Error> {
        self.require_emu()?;
        check("go", self.lib.go()).map_err(Error::from)
    }

    /// Executes one instruction on the device CPU.
    pub fn step(&mut self) -> Result<(), Error> {
        self.require_emu()?;
        check("step", self.lib.step()).map_err(Error::from)
    }

    /// Number of RAM sections in the device.
    pub fn read_ram_sections_count(&mut self) -> Result<u32, Error> {
        self.require_emu()?;
        let mut count = 0;
        check(
            "read_ram_sections_count",
            self.lib.read_ram_sections_count(&mut count),
        )?;
        Ok(count)
    }

    /// Size in bytes of each RAM section.
    pub fn read_ram_sections_size(&mut self) -> Result<Vec<u32>, Error> {
        let count = self.read_ram_sections_count()?;
        let mut sizes = vec![0u32; count as usize];
        check(
            "read_ram_sections_size",
            self.lib.read_ram_sections_size(&mut sizes),
        )?;
        Ok(sizes)
    }

    /// Power state of each RAM section.
    pub fn read_ram_sections_power_status(&mut self) -> Result<Vec<RamPower>, Error> {
        let count = self.read_ram_sections_count()?;
        let mut status = vec![0u32; count as usize];
        check(
            "read_ram_sections_power_status",
            self.lib.read_ram_sections_power_status(&mut status),
        )?;
        status
            .into_iter()
            .map(|raw| Ok(native_enum("RAM power state", raw as i32)?))
            .collect()
    }

    /// RAM power report: per-section state plus the section geometry.
    pub fn is_ram_powered(&mut self) -> Result<RamPowerStatus, Error> {
        self.require_emu()?;
        let mut status = [0u32; 64];
        let mut count = 0;
        let mut size = 0;
        check(
            "is_ram_powered",
            self.lib.is_ram_powered(&mut status, &mut count, &mut size),
        )?;
        let reported = (count as usize).min(status.len());
        let sections = status[..reported]
            .iter()
            .map(|&raw| Ok(native_enum("RAM power state", raw as i32)?))
            .collect::<Result<_, Error>>()?;
        Ok(RamPowerStatus {
            sections,
            section_count: count,
            section_size: size,
        })
    }

    /// Powers up every RAM section.
    pub fn power_ram_all(&mut self) -> Result<(), Error> {
        self.require_emu()?;
        check("power_ram_all", self.lib.power_ram_all()).map_err(Error::from)
    }

    /// Powers down one RAM section.
    pub fn unpower_ram_section(&mut self, section_index: u32) -> Result<(), Error> {
        self.require_emu()?;
        check(
            "unpower_ram_section",
            self.lib.unpower_ram_section(section_index),
        )
        .map_err(Error::from)
    }
}

impl<L: Library> fmt::Debug for Session<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("family", &self.family)
            .field("state", &self.state)
            .field("rtt_started", &self.rtt_started)
            .field("qspi_initialized", &self.qspi_initialized)
            .finish_non_exhaustive()
    }
}

impl<L: Library> Drop for Session<L> {
    fn drop(&mut self) {
        self.close();
    }
}
