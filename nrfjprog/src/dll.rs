//! The binding to the nrfjprog shared library.
//!
//! [`Library`] is the seam between the session layer and the native code:
//! one method per `NRFJPROG_*` entry point, each taking and returning only
//! fixed-width integers, booleans, fixed-layout records and caller-provided
//! buffers, and each reporting the raw `i32` result code of the native call.
//! Translation of those codes into the crate's error taxonomy happens above
//! this trait, in the session layer.
//!
//! [`NrfjprogDll`] is the production implementation. It loads the shared
//! library from a caller-resolved absolute path and resolves every entry
//! point eagerly, so a library that is present but incomplete fails at load
//! time instead of in the middle of a debugging session.

use std::ffi::{c_char, CStr};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::error::ResourceError;

/// Receives the text lines the native library emits while it works.
///
/// The sink is invoked synchronously from inside whatever native call
/// triggered the logging, so it must not block and must not call back into
/// the session.
pub type LogSink = Box<dyn FnMut(&str) + Send>;

/// The process-wide slot the C trampoline reads its sink from.
///
/// The native callback carries no context pointer, so the sink cannot live
/// inside the session object. There is only one live library load per
/// process (the native side is a singleton), which makes a single slot
/// sufficient: the owning session installs its sink on `open` and clears it
/// on `close`.
static LOG_SINK: Lazy<Mutex<Option<LogSink>>> = Lazy::new(|| Mutex::new(None));

pub(crate) fn install_log_sink(sink: Option<LogSink>) {
    if let Ok(mut slot) = LOG_SINK.lock() {
        *slot = sink;
    }
}

pub(crate) fn take_log_sink() -> Option<LogSink> {
    LOG_SINK.lock().ok().and_then(|mut slot| slot.take())
}

/// The callback handed to `NRFJPROG_open_dll`.
///
/// Must never unwind into the native caller and must never block; a line
/// arriving while no sink is installed goes to `tracing` instead of being
/// dropped.
unsafe extern "C" fn log_trampoline(msg: *const c_char) {
    let _ = panic::catch_unwind(AssertUnwindSafe(|| {
        if msg.is_null() {
            return;
        }
        let text = unsafe { CStr::from_ptr(msg) }.to_string_lossy();
        let line = text.trim_end();
        let Ok(mut slot) = LOG_SINK.lock() else {
            return;
        };
        match slot.as_mut() {
            Some(sink) => sink(line),
            None => tracing::debug!(target: "nrfjprog::dll", "{line}"),
        }
    }));
}

/// The QSPI peripheral configuration record, in the exact layout the native
/// library expects.
///
/// The field order and widths are an ABI contract; this struct is the single
/// definition of that layout and is passed to the native side by reference.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct QspiInitParamsRaw {
    pub read_mode: i32,
    pub write_mode: i32,
    pub address_mode: i32,
    pub frequency: i32,
    pub spi_mode: i32,
    pub sck_delay: u32,
    pub custom_instruction_io2_level: i32,
    pub custom_instruction_io3_level: i32,
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
    pub wip_index: u32,
}

// 21 fields of 4 bytes each; a packing surprise here would corrupt every
// field after the first mismatch.
static_assertions::const_assert_eq!(std::mem::size_of::<QspiInitParamsRaw>(), 84);

/// The native call surface consumed by the session layer.
///
/// Implemented by [`NrfjprogDll`] for the real shared library; tests
/// substitute an in-memory fake. Implementations take `&self` because the
/// native library keeps all its state on its own side of the boundary.
pub trait Library: fmt::Debug {
    fn dll_version(&self, major: &mut u32, minor: &mut u32, revision: &mut u8) -> i32;
    fn is_dll_open(&self, opened: &mut bool) -> i32;
    fn open_dll(&self, jlink_path: &CStr, family: i32) -> i32;
    fn close_dll(&self);

    fn enum_emu_snr(&self, serial_numbers: &mut [u32], num_available: &mut u32) -> i32;
    fn is_connected_to_emu(&self, connected: &mut bool) -> i32;
    fn connect_to_emu_with_snr(&self, serial_number: u32, speed_khz: u32) -> i32;
    fn connect_to_emu_without_snr(&self, speed_khz: u32) -> i32;
    fn read_connected_emu_snr(&self, serial_number: &mut u32) -> i32;
    fn read_connected_emu_fwstr(&self, buffer: &mut [u8]) -> i32;
    fn disconnect_from_emu(&self) -> i32;

    fn recover(&self) -> i32;
    fn is_connected_to_device(&self, connected: &mut bool) -> i32;
    fn connect_to_device(&self) -> i32;
    fn disconnect_from_device(&self) -> i32;

    fn readback_protect(&self, level: i32) -> i32;
    fn readback_status(&self, status: &mut i32) -> i32;
    fn read_region_0_size_and_source(&self, size: &mut u32, source: &mut i32) -> i32;
    fn read_device_version(&self, version: &mut i32) -> i32;
    fn read_device_family(&self, family: &mut i32) -> i32;

    fn debug_reset(&self) -> i32;
    fn sys_reset(&self) -> i32;
    fn pin_reset(&self) -> i32;
    fn disable_bprot(&self) -> i32;
    fn erase_all(&self) -> i32;
    fn erase_page(&self, addr: u32) -> i32;
    fn erase_uicr(&self) -> i32;

    fn write_u32(&self, addr: u32, data: u32, nvmc_control: bool) -> i32;
    fn read_u32(&self, addr: u32, data: &mut u32) -> i32;
    fn write(&self, addr: u32, data: &[u8], nvmc_control: bool) -> i32;
    fn read(&self, addr: u32, data: &mut [u8]) -> i32;

    fn is_halted(&self, halted: &mut bool) -> i32;
    fn halt(&self) -> i32;
    fn run(&self, pc: u32, sp: u32) -> i32;
    fn go(&self) -> i32;
    fn step(&self) -> i32;

    fn read_ram_sections_count(&self, count: &mut u32) -> i32;
    fn read_ram_sections_size(&self, sizes: &mut [u32]) -> i32;
    fn read_ram_sections_power_status(&self, status: &mut [u32]) -> i32;
    fn is_ram_powered(&self, status: &mut [u32], count: &mut u32, size: &mut u32) -> i32;
    fn power_ram_all(&self) -> i32;
    fn unpower_ram_section(&self, index: u32) -> i32;

    fn read_cpu_register(&self, register: i32, value: &mut u32) -> i32;
    fn write_cpu_register(&self, register: i32, value: u32) -> i32;

    fn read_debug_port_register(&self, addr: u8, data: &mut u32) -> i32;
    fn write_debug_port_register(&self, addr: u8, data: u32) -> i32;
    fn read_access_port_register(&self, ap_index: u8, addr: u8, data: &mut u32) -> i32;
    fn write_access_port_register(&self, ap_index: u8, addr: u8, data: u32) -> i32;

    fn is_rtt_started(&self, started: &mut bool) -> i32;
    fn rtt_set_control_block_address(&self, addr: u32) -> i32;
    fn rtt_start(&self) -> i32;
    fn rtt_is_control_block_found(&self, found: &mut bool) -> i32;
    fn rtt_stop(&self) -> i32;
    fn rtt_read(&self, channel_index: u32, data: &mut [u8], read: &mut u32) -> i32;
    fn rtt_write(&self, channel_index: u32, data: &[u8], written: &mut u32) -> i32;
    fn rtt_read_channel_count(&self, down: &mut u32, up: &mut u32) -> i32;
    fn rtt_read_channel_info(
        &self,
        channel_index: u32,
        direction: i32,
        name: &mut [u8; 32],
        size: &mut u32,
    ) -> i32;

    fn is_qspi_init(&self, initialized: &mut bool) -> i32;
    fn qspi_init(&self, retain_ram: bool, params: &QspiInitParamsRaw) -> i32;
    fn qspi_uninit(&self) -> i32;
    fn qspi_read(&self, addr: u32, data: &mut [u8]) -> i32;
    fn qspi_write(&self, addr: u32, data: &[u8]) -> i32;
    fn qspi_erase(&self, addr: u32, length: i32) -> i32;
    fn qspi_custom(&self, code: u8, length: u8, data_in: &[u8; 8], data_out: &mut [u8; 8]) -> i32;
}

type LogCallback = unsafe extern "C" fn(*const c_char);

/// The resolved `NRFJPROG_*` entry points.
#[allow(clippy::type_complexity)]
struct Vtable {
    dll_version: unsafe extern "C" fn(*mut u32, *mut u32, *mut u8) -> i32,
    is_dll_open: unsafe extern "C" fn(*mut bool) -> i32,
    open_dll: unsafe extern "C" fn(*const c_char, Option<LogCallback>, i32) -> i32,
    close_dll: unsafe extern "C" fn(),
    enum_emu_snr: unsafe extern "C" fn(*mut u32, u32, *mut u32) -> i32,
    is_connected_to_emu: unsafe extern "C" fn(*mut bool) -> i32,
    connect_to_emu_with_snr: unsafe extern "C" fn(u32, u32) -> i32,
    connect_to_emu_without_snr: unsafe extern "C" fn(u32) -> i32,
    read_connected_emu_snr: unsafe extern "C" fn(*mut u32) -> i32,
    read_connected_emu_fwstr: unsafe extern "C" fn(*mut c_char, u32) -> i32,
    disconnect_from_emu: unsafe extern "C" fn() -> i32,
    recover: unsafe extern "C" fn() -> i32,
    is_connected_to_device: unsafe extern "C" fn(*mut bool) -> i32,
    connect_to_device: unsafe extern "C" fn() -> i32,
    disconnect_from_device: unsafe extern "C" fn() -> i32,
    readback_protect: unsafe extern "C" fn(i32) -> i32,
    readback_status: unsafe extern "C" fn(*mut i32) -> i32,
    read_region_0_size_and_source: unsafe extern "C" fn(*mut u32, *mut i32) -> i32,
    read_device_version: unsafe extern "C" fn(*mut i32) -> i32,
    read_device_family: unsafe extern "C" fn(*mut i32) -> i32,
    debug_reset: unsafe extern "C" fn() -> i32,
    sys_reset: unsafe extern "C" fn() -> i32,
    pin_reset: unsafe extern "C" fn() -> i32,
    disable_bprot: unsafe extern "C" fn() -> i32,
    erase_all: unsafe extern "C" fn() -> i32,
    erase_page: unsafe extern "C" fn(u32) -> i32,
    erase_uicr: unsafe extern "C" fn() -> i32,
    write_u32: unsafe extern "C" fn(u32, u32, bool) -> i32,
    read_u32: unsafe extern "C" fn(u32, *mut u32) -> i32,
    write: unsafe extern "C" fn(u32, *const u8, u32, bool) -> i32,
    read: unsafe extern "C" fn(u32, *mut u8, u32) -> i32,
    is_halted: unsafe extern "C" fn(*mut bool) -> i32,
    halt: unsafe extern "C" fn() -> i32,
    run: unsafe extern "C" fn(u32, u32) -> i32,
    go: unsafe extern "C" fn() -> i32,
    step: unsafe extern "C" fn() -> i32,
    read_ram_sections_count: unsafe extern "C" fn(*mut u32) -> i32,
    read_ram_sections_size: unsafe extern "C" fn(*mut u32, u32) -> i32,
    read_ram_sections_power_status: unsafe extern "C" fn(*mut u32, u32) -> i32,
    is_ram_powered: unsafe extern "C" fn(*mut u32, u32, *mut u32, *mut u32) -> i32,
    power_ram_all: unsafe extern "C" fn() -> i32,
    unpower_ram_section: unsafe extern "C" fn(u32) -> i32,
    read_cpu_register: unsafe extern "C" fn(i32, *mut u32) -> i32,
    write_cpu_register: unsafe extern "C" fn(i32, u32) -> i32,
    read_debug_port_register: unsafe extern "C" fn(u8, *mut u32) -> i32,
    write_debug_port_register: unsafe extern "C" fn(u8, u32) -> i32,
    read_access_port_register: unsafe extern "C" fn(u8, u8, *mut u32) -> i32,
    write_access_port_register: unsafe extern "C" fn(u8, u8, u32) -> i32,
    is_rtt_started: unsafe extern "C" fn(*mut bool) -> i32,
    rtt_set_control_block_address: unsafe extern "C" fn(u32) -> i32,
    rtt_start: unsafe extern "C" fn() -> i32,
    rtt_is_control_block_found: unsafe extern "C" fn(*mut bool) -> i32,
    rtt_stop: unsafe extern "C" fn() -> i32,
    rtt_read: unsafe extern "C" fn(u32, *mut u8, u32, *mut u32) -> i32,
    rtt_write: unsafe extern "C" fn(u32, *const u8, u32, *mut u32) -> i32,
    rtt_read_channel_count: unsafe extern "C" fn(*mut u32, *mut u32) -> i32,
    rtt_read_channel_info: unsafe extern "C" fn(u32, i32, *mut u8, u32, *mut u32) -> i32,
    is_qspi_init: unsafe extern "C" fn(*mut bool) -> i32,
    qspi_init: unsafe extern "C" fn(bool, *const QspiInitParamsRaw) -> i32,
    qspi_uninit: unsafe extern "C" fn() -> i32,
    qspi_read: unsafe extern "C" fn(u32, *mut u8, u32) -> i32,
    qspi_write: unsafe extern "C" fn(u32, *const u8, u32) -> i32,
    qspi_erase: unsafe extern "C" fn(u32, i32) -> i32,
    qspi_custom: unsafe extern "C" fn(u8, u8, *const u8, *mut u8) -> i32,
}

/// Resolves one entry point, failing with the symbol name so an incomplete
/// or mismatched library is diagnosable.
unsafe fn sym<T: Copy>(
    lib: &libloading::Library,
    path: &Path,
    symbol: &'static str,
) -> Result<T, ResourceError> {
    let resolved = unsafe {
        lib.get::<T>(symbol.as_bytes())
            .map_err(|source| ResourceError::MissingEntryPoint {
                path: path.to_path_buf(),
                symbol,
                source,
            })?
    };
    Ok(*resolved)
}

impl Vtable {
    unsafe fn resolve(lib: &libloading::Library, path: &Path) -> Result<Self, ResourceError> {
        macro_rules! resolve {
            ($name:ident, $symbol:literal) => {
                let $name = unsafe { sym(lib, path, $symbol)? };
            };
        }

        resolve!(dll_version, "NRFJPROG_dll_version");
        resolve!(is_dll_open, "NRFJPROG_is_dll_open");
        resolve!(open_dll, "NRFJPROG_open_dll");
        resolve!(close_dll, "NRFJPROG_close_dll");
        resolve!(enum_emu_snr, "NRFJPROG_enum_emu_snr");
        resolve!(is_connected_to_emu, "NRFJPROG_is_connected_to_emu");
        resolve!(connect_to_emu_with_snr, "NRFJPROG_connect_to_emu_with_snr");
        resolve!(
            connect_to_emu_without_snr,
            "NRFJPROG_connect_to_emu_without_snr"
        );
        resolve!(read_connected_emu_snr, "NRFJPROG_read_connected_emu_snr");
        resolve!(read_connected_emu_fwstr, "NRFJPROG_read_connected_emu_fwstr");
        resolve!(disconnect_from_emu, "NRFJPROG_disconnect_from_emu");
        resolve!(recover, "NRFJPROG_recover");
        resolve!(is_connected_to_device, "NRFJPROG_is_connected_to_device");
        resolve!(connect_to_device, "NRFJPROG_connect_to_device");
        resolve!(disconnect_from_device, "NRFJPROG_disconnect_from_device");
        resolve!(readback_protect, "NRFJPROG_readback_protect");
        resolve!(readback_status, "NRFJPROG_readback_status");
        resolve!(
            read_region_0_size_and_source,
            "NRFJPROG_read_region_0_size_and_source"
        );
        resolve!(read_device_version, "NRFJPROG_read_device_version");
        resolve!(read_device_family, "NRFJPROG_read_device_family");
        resolve!(debug_reset, "NRFJPROG_debug_reset");
        resolve!(sys_reset, "NRFJPROG_sys_reset");
        resolve!(pin_reset, "NRFJPROG_pin_reset");
        resolve!(disable_bprot, "NRFJPROG_disable_bprot");
        resolve!(erase_all, "NRFJPROG_erase_all");
        resolve!(erase_page, "NRFJPROG_erase_page");
        resolve!(erase_uicr, "NRFJPROG_erase_uicr");
        resolve!(write_u32, "NRFJPROG_write_u32");
        resolve!(read_u32, "NRFJPROG_read_u32");
        resolve!(write, "NRFJPROG_write");
        resolve!(read, "NRFJPROG_read");
        resolve!(is_halted, "NRFJPROG_is_halted");
        resolve!(halt, "NRFJPROG_halt");
        resolve!(run, "NRFJPROG_run");
        resolve!(go, "NRFJPROG_go");
        resolve!(step, "NRFJPROG_step");
        resolve!(read_ram_sections_count, "NRFJPROG_read_ram_sections_count");
        resolve!(read_ram_sections_size, "NRFJPROG_read_ram_sections_size");
        resolve!(
            read_ram_sections_power_status,
            "NRFJPROG_read_ram_sections_power_status"
        );
        resolve!(is_ram_powered, "NRFJPROG_is_ram_powered");
        resolve!(power_ram_all, "NRFJPROG_power_ram_all");
        resolve!(unpower_ram_section, "NRFJPROG_unpower_ram_section");
        resolve!(read_cpu_register, "NRFJPROG_read_cpu_register");
        resolve!(write_cpu_register, "NRFJPROG_write_cpu_register");
        resolve!(
            read_debug_port_register,
            "NRFJPROG_read_debug_port_register"
        );
        resolve!(
            write_debug_port_register,
            "NRFJPROG_write_debug_port_register"
        );
        resolve!(
            read_access_port_register,
            "NRFJPROG_read_access_port_register"
        );
        resolve!(
            write_access_port_register,
            "NRFJPROG_write_access_port_register"
        );
        resolve!(is_rtt_started, "NRFJPROG_is_rtt_started");
        resolve!(
            rtt_set_control_block_address,
            "NRFJPROG_rtt_set_control_block_address"
        );
        resolve!(rtt_start, "NRFJPROG_rtt_start");
        resolve!(
            rtt_is_control_block_found,
            "NRFJPROG_rtt_is_control_block_found"
        );
        resolve!(rtt_stop, "NRFJPROG_rtt_stop");
        resolve!(rtt_read, "NRFJPROG_rtt_read");
        resolve!(rtt_write, "NRFJPROG_rtt_write");
        resolve!(rtt_read_channel_count, "NRFJPROG_rtt_read_channel_count");
        resolve!(rtt_read_channel_info, "NRFJPROG_rtt_read_channel_info");
        resolve!(is_qspi_init, "NRFJPROG_is_qspi_init");
        resolve!(qspi_init, "NRFJPROG_qspi_init");
        resolve!(qspi_uninit, "NRFJPROG_qspi_uninit");
        resolve!(qspi_read, "NRFJPROG_qspi_read");
        resolve!(qspi_write, "NRFJPROG_qspi_write");
        resolve!(qspi_erase, "NRFJPROG_qspi_erase");
        resolve!(qspi_custom, "NRFJPROG_qspi_custom");

        Ok(Self {
            dll_version,
            is_dll_open,
            open_dll,
            close_dll,
            enum_emu_snr,
            is_connected_to_emu,
            connect_to_emu_with_snr,
            connect_to_emu_without_snr,
            read_connected_emu_snr,
            read_connected_emu_fwstr,
            disconnect_from_emu,
            recover,
            is_connected_to_device,
            connect_to_device,
            disconnect_from_device,
            readback_protect,
            readback_status,
            read_region_0_size_and_source,
            read_device_version,
            read_device_family,
            debug_reset,
            sys_reset,
            pin_reset,
            disable_bprot,
            erase_all,
            erase_page,
            erase_uicr,
            write_u32,
            read_u32,
            write,
            read,
            is_halted,
            halt,
            run,
            go,
            step,
            read_ram_sections_count,
            read_ram_sections_size,
            read_ram_sections_power_status,
            is_ram_powered,
            power_ram_all,
            unpower_ram_section,
            read_cpu_register,
            write_cpu_register,
            read_debug_port_register,
            write_debug_port_register,
            read_access_port_register,
            write_access_port_register,
            is_rtt_started,
            rtt_set_control_block_address,
            rtt_start,
            rtt_is_control_block_found,
            rtt_stop,
            rtt_read,
            rtt_write,
            rtt_read_channel_count,
            rtt_read_channel_info,
            is_qspi_init,
            qspi_init,
            qspi_uninit,
            qspi_read,
            qspi_write,
            qspi_erase,
            qspi_custom,
        })
    }
}

/// The nrfjprog shared library, loaded at runtime.
///
/// Keeps the [`libloading::Library`] alive for as long as any resolved entry
/// point may be called.
pub struct NrfjprogDll {
    vtable: Vtable,
    _lib: libloading::Library,
}

impl NrfjprogDll {
    /// Loads the shared library from a resolved, absolute path and resolves
    /// every entry point.
    ///
    /// Locating the library on disk is the caller's concern; this only
    /// consumes the result of that search.
    pub fn load(path: &Path) -> Result<Self, ResourceError> {
        tracing::debug!("Loading nrfjprog shared library from {}", path.display());
        let lib = unsafe {
            libloading::Library::new(path).map_err(|source| ResourceError::Load {
                path: path.to_path_buf(),
                source,
            })?
        };
        let vtable = unsafe { Vtable::resolve(&lib, path)? };
        Ok(Self { vtable, _lib: lib })
    }
}

impl fmt::Debug for NrfjprogDll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NrfjprogDll").finish_non_exhaustive()
    }
}

impl Library for NrfjprogDll {
    fn dll_version(&self, major: &mut u32, minor: &mut u32, revision: &mut u8) -> i32 {
        unsafe { (self.vtable.dll_version)(major, minor, revision) }
    }

    fn is_dll_open(&self, opened: &mut bool) -> i32 {
        unsafe { (self.vtable.is_dll_open)(opened) }
    }

    fn open_dll(&self, jlink_path: &CStr, family: i32) -> i32 {
        unsafe { (self.vtable.open_dll)(jlink_path.as_ptr(), Some(log_trampoline), family) }
    }

    fn close_dll(&self) {
        unsafe { (self.vtable.close_dll)() }
    }

    fn enum_emu_snr(&self, serial_numbers: &mut [u32], num_available: &mut u32) -> i32 {
        unsafe {
            (self.vtable.enum_emu_snr)(
                serial_numbers.as_mut_ptr(),
                serial_numbers.len() as u32,
                num_available,
            )
        }
    }

    fn is_connected_to_emu(&self, connected: &mut bool) -> i32 {
        unsafe { (self.vtable.is_connected_to_emu)(connected) }
    }

    fn connect_to_emu_with_snr(&self, serial_number: u32, speed_khz: u32) -> i32 {
        unsafe { (self.vtable.connect_to_emu_with_snr)(serial_number, speed_khz) }
    }

    fn connect_to_emu_without_snr(&self, speed_khz: u32) -> i32 {
        unsafe { (self.vtable.connect_to_emu_without_snr)(speed_khz) }
    }

    fn read_connected_emu_snr(&self, serial_number: &mut u32) -> i32 {
        unsafe { (self.vtable.read_connected_emu_snr)(serial_number) }
    }

    fn read_connected_emu_fwstr(&self, buffer: &mut [u8]) -> i32 {
        unsafe {
            (self.vtable.read_connected_emu_fwstr)(
                buffer.as_mut_ptr().cast::<c_char>(),
                buffer.len() as u32,
            )
        }
    }

    fn disconnect_from_emu(&self) -> i32 {
        unsafe { (self.vtable.disconnect_from_emu)() }
    }

    fn recover(&self) -> i32 {
        unsafe { (self.vtable.recover)() }
    }

    fn is_connected_to_device(&self, connected: &mut bool) -> i32 {
        unsafe { (self.vtable.is_connected_to_device)(connected) }
    }

    fn connect_to_device(&self) -> i32 {
        unsafe { (self.vtable.connect_to_device)() }
    }

    fn disconnect_from_device(&self) -> i32 {
        unsafe { (self.vtable.disconnect_from_device)() }
    }

    fn readback_protect(&self, level: i32) -> i32 {
        unsafe { (self.vtable.readback_protect)(level) }
    }

    fn readback_status(&self, status: &mut i32) -> i32 {
        unsafe { (self.vtable.readback_status)(status) }
    }

    fn read_region_0_size_and_source(&self, size: &mut u32, source: &mut i32) -> i32 {
        unsafe { (self.vtable.read_region_0_size_and_source)(size, source) }
    }

    fn read_device_version(&self, version: &mut i32) -> i32 {
        unsafe { (self.vtable.read_device_version)(version) }
    }

    fn read_device_family(&self, family: &mut i32) -> i32 {
        unsafe { (self.vtable.read_device_family)(family) }
    }

    fn debug_reset(&self) -> i32 {
        unsafe { (self.vtable.debug_reset)() }
    }

    fn sys_reset(&self) -> i32 {
        unsafe { (self.vtable.sys_reset)() }
    }

    fn pin_reset(&self) -> i32 {
        unsafe { (self.vtable.pin_reset)() }
    }

    fn disable_bprot(&self) -> i32 {
        unsafe { (self.vtable.disable_bprot)() }
    }

    fn erase_all(&self) -> i32 {
        unsafe { (self.vtable.erase_all)() }
    }

    fn erase_page(&self, addr: u32) -> i32 {
        unsafe { (self.vtable.erase_page)(addr) }
    }

    fn erase_uicr(&self) -> i32 {
        unsafe { (self.vtable.erase_uicr)() }
    }

    fn write_u32(&self, addr: u32, data: u32, nvmc_control: bool) -> i32 {
        unsafe { (self.vtable.write_u32)(addr, data, nvmc_control) }
    }

    fn read_u32(&self, addr: u32, data: &mut u32) -> i32 {
        unsafe { (self.vtable.read_u32)(addr, data) }
    }

    fn write(&self, addr: u32, data: &[u8], nvmc_control: bool) -> i32 {
        unsafe { (self.vtable.write)(addr, data.as_ptr(), data.len() as u32, nvmc_control) }
    }

    fn read(&self, addr: u32, data: &mut [u8]) -> i32 {
        unsafe { (self.vtable.read)(addr, data.as_mut_ptr(), data.len() as u32) }
    }

    fn is_halted(&self, halted: &mut bool) -> i32 {
        unsafe { (self.vtable.is_halted)(halted) }
    }

    fn halt(&self) -> i32 {
        unsafe { (self.vtable.halt)() }
    }

    fn run(&self, pc: u32, sp: u32) -> i32 {
        unsafe { (self.vtable.run)(pc, sp) }
    }

    fn go(&self) -> i32 {
        unsafe { (self.vtable.go)() }
    }

    fn step(&self) -> i32 {
        unsafe { (self.vtable.step)() }
    }

    fn read_ram_sections_count(&self, count: &mut u32) -> i32 {
        unsafe { (self.vtable.read_ram_sections_count)(count) }
    }

    fn read_ram_sections_size(&self, sizes: &mut [u32]) -> i32 {
        unsafe { (self.vtable.read_ram_sections_size)(sizes.as_mut_ptr(), sizes.len() as u32) }
    }

    fn read_ram_sections_power_status(&self, status: &mut [u32]) -> i32 {
        unsafe {
            (self.vtable.read_ram_sections_power_status)(status.as_mut_ptr(), status.len() as u32)
        }
    }

    fn is_ram_powered(&self, status: &mut [u32], count: &mut u32, size: &mut u32) -> i32 {
        unsafe {
            (self.vtable.is_ram_powered)(status.as_mut_ptr(), status.len() as u32, count, size)
        }
    }

    fn power_ram_all(&self) -> i32 {
        unsafe { (self.vtable.power_ram_all)() }
    }

    fn unpower_ram_section(&self, index: u32) -> i32 {
        unsafe { (self.vtable.unpower_ram_section)(index) }
    }

    fn read_cpu_register(&self, register: i32, value: &mut u32) -> i32 {
        unsafe { (self.vtable.read_cpu_register)(register, value) }
    }

    fn write_cpu_register(&self, register: i32, value: u32) -> i32 {
        unsafe { (self.vtable.write_cpu_register)(register, value) }
    }

    fn read_debug_port_register(&self, addr: u8, data: &mut u32) -> i32 {
        unsafe { (self.vtable.read_debug_port_register)(addr, data) }
    }

    fn write_debug_port_register(&self, addr: u8, data: u32) -> i32 {
        unsafe { (self.vtable.write_debug_port_register)(addr, data) }
    }

    fn read_access_port_register(&self, ap_index: u8, addr: u8, data: &mut u32) -> i32 {
        unsafe { (self.vtable.read_access_port_register)(ap_index, addr, data) }
    }

    fn write_access_port_register(&self, ap_index: u8, addr: u8, data: u32) -> i32 {
        unsafe { (self.vtable.write_access_port_register)(ap_index, addr, data) }
    }

    fn is_rtt_started(&self, started: &mut bool) -> i32 {
        unsafe { (self.vtable.is_rtt_started)(started) }
    }

    fn rtt_set_control_block_address(&self, addr: u32) -> i32 {
        unsafe { (self.vtable.rtt_set_control_block_address)(addr) }
    }

    fn rtt_start(&self) -> i32 {
        unsafe { (self.vtable.rtt_start)() }
    }

    fn rtt_is_control_block_found(&self, found: &mut bool) -> i32 {
        unsafe { (self.vtable.rtt_is_control_block_found)(found) }
    }

    fn rtt_stop(&self) -> i32 {
        unsafe { (self.vtable.rtt_stop)() }
    }

    fn rtt_read(&self, channel_index: u32, data: &mut [u8], read: &mut u32) -> i32 {
        unsafe {
            (self.vtable.rtt_read)(channel_index, data.as_mut_ptr(), data.len() as u32, read)
        }
    }

    fn rtt_write(&self, channel_index: u32, data: &[u8], written: &mut u32) -> i32 {
        unsafe { (self.vtable.rtt_write)(channel_index, data.as_ptr(), data.len() as u32, written) }
    }

    fn rtt_read_channel_count(&self, down: &mut u32, up: &mut u32) -> i32 {
        unsafe { (self.vtable.rtt_read_channel_count)(down, up) }
    }

    fn rtt_read_channel_info(
        &self,
        channel_index: u32,
        direction: i32,
        name: &mut [u8; 32],
        size: &mut u32,
    ) -> i32 {
        unsafe {
            (self.vtable.rtt_read_channel_info)(
                channel_index,
                direction,
                name.as_mut_ptr(),
                name.len() as u32,
                size,
            )
        }
    }

    fn is_qspi_init(&self, initialized: &mut bool) -> i32 {
        unsafe { (self.vtable.is_qspi_init)(initialized) }
    }

    fn qspi_init(&self, retain_ram: bool, params: &QspiInitParamsRaw) -> i32 {
        unsafe { (self.vtable.qspi_init)(retain_ram, params) }
    }

    fn qspi_uninit(&self) -> i32 {
        unsafe { (self.vtable.qspi_uninit)() }
    }

    fn qspi_read(&self, addr: u32, data: &mut [u8]) -> i32 {
        unsafe { (self.vtable.qspi_read)(addr, data.as_mut_ptr(), data.len() as u32) }
    }

    fn qspi_write(&self, addr: u32, data: &[u8]) -> i32 {
        unsafe { (self.vtable.qspi_write)(addr, data.as_ptr(), data.len() as u32) }
    }

    fn qspi_erase(&self, addr: u32, length: i32) -> i32 {
        unsafe { (self.vtable.qspi_erase)(addr, length) }
    }

    fn qspi_custom(&self, code: u8, length: u8, data_in: &[u8; 8], data_out: &mut [u8; 8]) -> i32 {
        unsafe { (self.vtable.qspi_custom)(code, length, data_in.as_ptr(), data_out.as_mut_ptr()) }
    }
}
