//! An in-memory stand-in for the nrfjprog shared library, used to test the
//! session layer without a probe attached.
//!
//! The fake models just enough device behavior for round-trip tests (a
//! byte-addressed memory, CPU/DP/AP registers, RTT buffers, QSPI memory) and
//! records every call by name, so tests can assert that locally rejected
//! operations never reach the binding. Any call can be forced to fail with a
//! chosen native result code.

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::ffi::CStr;
use std::rc::Rc;

use crate::dll::{Library, QspiInitParamsRaw};

#[derive(Debug)]
pub(crate) struct FakeState {
    calls: Vec<&'static str>,
    forced: Option<i32>,

    open: bool,
    emu_connected: Option<u32>,
    device_connected: bool,
    halted: bool,

    snr_list: Vec<u32>,
    fwstr: String,
    family: i32,
    version: i32,
    readback: i32,
    region_0: (u32, i32),

    memory: HashMap<u32, u8>,
    registers: [u32; 19],
    dp_registers: HashMap<u8, u32>,
    ap_registers: HashMap<(u8, u8), u32>,

    ram_section_sizes: Vec<u32>,
    ram_power: Vec<u32>,

    rtt_started: bool,
    rtt_found: bool,
    rtt_control_block: Option<u32>,
    rtt_up_data: VecDeque<u8>,
    rtt_down_data: Vec<u8>,
    rtt_down_capacity: usize,

    qspi_initialized: bool,
    qspi_memory: HashMap<u32, u8>,
    qspi_last_init: Option<(bool, QspiInitParamsRaw)>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            forced: None,
            open: false,
            emu_connected: None,
            device_connected: false,
            halted: false,
            snr_list: vec![683_441_800],
            fwstr: "J-Link OB-SAM3U128-V2-NordicSemi compiled Jan 12 2018".to_string(),
            family: 1,
            version: 9,
            readback: 0,
            region_0: (0x1000, 1),
            memory: HashMap::new(),
            registers: [0; 19],
            dp_registers: HashMap::new(),
            ap_registers: HashMap::new(),
            ram_section_sizes: vec![0x8000, 0x8000],
            ram_power: vec![1, 1],
            rtt_started: false,
            rtt_found: false,
            rtt_control_block: None,
            rtt_up_data: VecDeque::new(),
            rtt_down_data: Vec::new(),
            rtt_down_capacity: usize::MAX,
            qspi_initialized: false,
            qspi_memory: HashMap::new(),
            qspi_last_init: None,
        }
    }
}

/// A fake [`Library`] backed by shared state, so the test keeps a handle
/// after the session takes ownership of its clone.
#[derive(Clone, Debug, Default)]
pub(crate) struct FakeDll {
    state: Rc<RefCell<FakeState>>,
}

impl FakeDll {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the call and returns the forced result, if one is pending.
    fn begin(&self, name: &'static str) -> i32 {
        let mut state = self.state.borrow_mut();
        state.calls.push(name);
        state.forced.take().unwrap_or(0)
    }

    /// Forces the next recorded call to return `code`.
    pub fn force_result(&self, code: i32) {
        self.state.borrow_mut().forced = Some(code);
    }

    pub fn call_count(&self) -> usize {
        self.state.borrow().calls.len()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.borrow().calls.clone()
    }

    pub fn push_rtt_up_data(&self, data: &[u8]) {
        self.state.borrow_mut().rtt_up_data.extend(data);
    }

    pub fn rtt_down_data(&self) -> Vec<u8> {
        self.state.borrow().rtt_down_data.clone()
    }

    pub fn set_rtt_down_capacity(&self, capacity: usize) {
        self.state.borrow_mut().rtt_down_capacity = capacity;
    }

    pub fn set_family(&self, family: i32) {
        self.state.borrow_mut().family = family;
    }

    pub fn rtt_control_block(&self) -> Option<u32> {
        self.state.borrow().rtt_control_block
    }

    pub fn qspi_last_init(&self) -> Option<(bool, QspiInitParamsRaw)> {
        self.state.borrow().qspi_last_init
    }
}

impl Library for FakeDll {
    fn dll_version(&self, major: &mut u32, minor: &mut u32, revision: &mut u8) -> i32 {
        let code = self.begin("dll_version");
        if code != 0 {
            return code;
        }
        *major = 6;
        *minor = 88;
        *revision = b'a';
        0
    }

    fn is_dll_open(&self, opened: &mut bool) -> i32 {
        let code = self.begin("is_dll_open");
        if code != 0 {
            return code;
        }
        *opened = self.state.borrow().open;
        0
    }

    fn open_dll(&self, _jlink_path: &CStr, _family: i32) -> i32 {
        let code = self.begin("open_dll");
        if code != 0 {
            return code;
        }
        self.state.borrow_mut().open = true;
        0
    }

    fn close_dll(&self) {
        let _ = self.begin("close_dll");
        let mut state = self.state.borrow_mut();
        state.open = false;
        state.emu_connected = None;
        state.device_connected = false;
    }

    fn enum_emu_snr(&self, serial_numbers: &mut [u32], num_available: &mut u32) -> i32 {
        let code = self.begin("enum_emu_snr");
        if code != 0 {
            return code;
        }
        let state = self.state.borrow();
        *num_available = state.snr_list.len() as u32;
        for (slot, snr) in serial_numbers.iter_mut().zip(&state.snr_list) {
            *slot = *snr;
        }
        0
    }

    fn is_connected_to_emu(&self, connected: &mut bool) -> i32 {
        let code = self.begin("is_connected_to_emu");
        if code != 0 {
            return code;
        }
        *connected = self.state.borrow().emu_connected.is_some();
        0
    }

    fn connect_to_emu_with_snr(&self, serial_number: u32, _speed_khz: u32) -> i32 {
        let code = self.begin("connect_to_emu_with_snr");
        if code != 0 {
            return code;
        }
        self.state.borrow_mut().emu_connected = Some(serial_number);
        0
    }

    fn connect_to_emu_without_snr(&self, _speed_khz: u32) -> i32 {
        let code = self.begin("connect_to_emu_without_snr");
        if code != 0 {
            return code;
        }
        let mut state = self.state.borrow_mut();
        let snr = state.snr_list.first().copied().unwrap_or(0);
        state.emu_connected = Some(snr);
        0
    }

    fn read_connected_emu_snr(&self, serial_number: &mut u32) -> i32 {
        let code = self.begin("read_connected_emu_snr");
        if code != 0 {
            return code;
        }
        match self.state.borrow().emu_connected {
            Some(snr) => {
                *serial_number = snr;
                0
            }
            None => -10,
        }
    }

    fn read_connected_emu_fwstr(&self, buffer: &mut [u8]) -> i32 {
        let code = self.begin("read_connected_emu_fwstr");
        if code != 0 {
            return code;
        }
        let state = self.state.borrow();
        let bytes = state.fwstr.as_bytes();
        let len = bytes.len().min(buffer.len().saturating_sub(1));
        buffer[..len].copy_from_slice(&bytes[..len]);
        buffer[len] = 0;
        0
    }

    fn disconnect_from_emu(&self) -> i32 {
        let code = self.begin("disconnect_from_emu");
        if code != 0 {
            return code;
        }
        let mut state = self.state.borrow_mut();
        state.emu_connected = None;
        state.device_connected = false;
        0
    }

    fn recover(&self) -> i32 {
        self.begin("recover")
    }

    fn is_connected_to_device(&self, connected: &mut bool) -> i32 {
        let code = self.begin("is_connected_to_device");
        if code != 0 {
            return code;
        }
        *connected = self.state.borrow().device_connected;
        0
    }

    fn connect_to_device(&self) -> i32 {
        let code = self.begin("connect_to_device");
        if code != 0 {
            return code;
        }
        self.state.borrow_mut().device_connected = true;
        0
    }

    fn disconnect_from_device(&self) -> i32 {
        let code = self.begin("disconnect_from_device");
        if code != 0 {
            return code;
        }
        self.state.borrow_mut().device_connected = false;
        0
    }

    fn readback_protect(&self, level: i32) -> i32 {
        let code = self.begin("readback_protect");
        if code != 0 {
            return code;
        }
        self.state.borrow_mut().readback = level;
        0
    }

    fn readback_status(&self, status: &mut i32) -> i32 {
        let code = self.begin("readback_status");
        if code != 0 {
            return code;
        }
        *status = self.state.borrow().readback;
        0
    }

    fn read_region_0_size_and_source(&self, size: &mut u32, source: &mut i32) -> i32 {
        let code = self.begin("read_region_0_size_and_source");
        if code != 0 {
            return code;
        }
        let state = self.state.borrow();
        *size = state.region_0.0;
        *source = state.region_0.1;
        0
    }

    fn read_device_version(&self, version: &mut i32) -> i32 {
        let code = self.begin("read_device_version");
        if code != 0 {
            return code;
        }
        *version = self.state.borrow().version;
        0
    }

    fn read_device_family(&self, family: &mut i32) -> i32 {
        let code = self.begin("read_device_family");
        if code != 0 {
            return code;
        }
        *family = self.state.borrow().family;
        0
    }

    fn debug_reset(&self) -> i32 {
        self.begin("debug_reset")
    }

    fn sys_reset(&self) -> i32 {
        self.begin("sys_reset")
    }

    fn pin_reset(&self) -> i32 {
        self.begin("pin_reset")
    }

    fn disable_bprot(&self) -> i32 {
        self.begin("disable_bprot")
    }

    fn erase_all(&self) -> i32 {
        let code = self.begin("erase_all");
        if code != 0 {
            return code;
        }
        self.state.borrow_mut().memory.clear();
        0
    }

    fn erase_page(&self, addr: u32) -> i32 {
        let code = self.begin("erase_page");
        if code != 0 {
            return code;
        }
        let mut state = self.state.borrow_mut();
        state.memory.retain(|&a, _| a < addr || a >= addr + 0x1000);
        0
    }

    fn erase_uicr(&self) -> i32 {
        self.begin("erase_uicr")
    }

    fn write_u32(&self, addr: u32, data: u32, _nvmc_control: bool) -> i32 {
        let code = self.begin("write_u32");
        if code != 0 {
            return code;
        }
        let mut state = self.state.borrow_mut();
        for (i, byte) in data.to_le_bytes().iter().enumerate() {
            state.memory.insert(addr + i as u32, *byte);
        }
        0
    }

    fn read_u32(&self, addr: u32, data: &mut u32) -> i32 {
        let code = self.begin("read_u32");
        if code != 0 {
            return code;
        }
        let state = self.state.borrow();
        let mut bytes = [0u8; 4];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = state.memory.get(&(addr + i as u32)).copied().unwrap_or(0);
        }
        *data = u32::from_le_bytes(bytes);
        0
    }

    fn write(&self, addr: u32, data: &[u8], _nvmc_control: bool) -> i32 {
        let code = self.begin("write");
        if code != 0 {
            return code;
        }
        let mut state = self.state.borrow_mut();
        for (i, byte) in data.iter().enumerate() {
            state.memory.insert(addr + i as u32, *byte);
        }
        0
    }

    fn read(&self, addr: u32, data: &mut [u8]) -> i32 {
        let code = self.begin("read");
        if code != 0 {
            return code;
        }
        let state = self.state.borrow();
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = state.memory.get(&(addr + i as u32)).copied().unwrap_or(0);
        }
        0
    }

    fn is_halted(&self, halted: &mut bool) -> i32 {
        let code = self.begin("is_halted");
        if code != 0 {
            return code;
        }
        *halted = self.state.borrow().halted;
        0
    }

    fn halt(&self) -> i32 {
        let code = self.begin("halt");
        if code != 0 {
            return code;
        }
        self.state.borrow_mut().halted = true;
        0
    }

    fn run(&self, _pc: u32, _sp: u32) -> i32 {
        let code = self.begin("run");
        if code != 0 {
            return code;
        }
        self.state.borrow_mut().halted = false;
        0
    }

    fn go(&self) -> i32 {
        let code = self.begin("go");
        if code != 0 {
            return code;
        }
        self.state.borrow_mut().halted = false;
        0
    }

    fn step(&self) -> i32 {
        self.begin("step")
    }

    fn read_ram_sections_count(&self, count: &mut u32) -> i32 {
        let code = self.begin("read_ram_sections_count");
        if code != 0 {
            return code;
        }
        *count = self.state.borrow().ram_section_sizes.len() as u32;
        0
    }

    fn read_ram_sections_size(&self, sizes: &mut [u32]) -> i32 {
        let code = self.begin("read_ram_sections_size");
        if code != 0 {
            return code;
        }
        let state = self.state.borrow();
        for (slot, size) in sizes.iter_mut().zip(&state.ram_section_sizes) {
            *slot = *size;
        }
        0
    }

    fn read_ram_sections_power_status(&self, status: &mut [u32]) -> i32 {
        let code = self.begin("read_ram_sections_power_status");
        if code != 0 {
            return code;
        }
        let state = self.state.borrow();
        for (slot, power) in status.iter_mut().zip(&state.ram_power) {
            *slot = *power;
        }
        0
    }

    fn is_ram_powered(&self, status: &mut [u32], count: &mut u32, size: &mut u32) -> i32 {
        let code = self.begin("is_ram_powered");
        if code != 0 {
            return code;
        }
        let state = self.state.borrow();
        *count = state.ram_power.len() as u32;
        *size = state.ram_section_sizes.first().copied().unwrap_or(0);
        for (slot, power) in status.iter_mut().zip(&state.ram_power) {
            *slot = *power;
        }
        0
    }

    fn power_ram_all(&self) -> i32 {
        let code = self.begin("power_ram_all");
        if code != 0 {
            return code;
        }
        let mut state = self.state.borrow_mut();
        for section in &mut state.ram_power {
            *section = 1;
        }
        0
    }

    fn unpower_ram_section(&self, index: u32) -> i32 {
        let code = self.begin("unpower_ram_section");
        if code != 0 {
            return code;
        }
        let mut state = self.state.borrow_mut();
        match state.ram_power.get_mut(index as usize) {
            Some(section) => {
                *section = 0;
                0
            }
            None => -3,
        }
    }

    fn read_cpu_register(&self, register: i32, value: &mut u32) -> i32 {
        let code = self.begin("read_cpu_register");
        if code != 0 {
            return code;
        }
        match self.state.borrow().registers.get(register as usize) {
            Some(stored) => {
                *value = *stored;
                0
            }
            None => -3,
        }
    }

    fn write_cpu_register(&self, register: i32, value: u32) -> i32 {
        let code = self.begin("write_cpu_register");
        if code != 0 {
            return code;
        }
        match self.state.borrow_mut().registers.get_mut(register as usize) {
            Some(stored) => {
                *stored = value;
                0
            }
            None => -3,
        }
    }

    fn read_debug_port_register(&self, addr: u8, data: &mut u32) -> i32 {
        let code = self.begin("read_debug_port_register");
        if code != 0 {
            return code;
        }
        *data = self
            .state
            .borrow()
            .dp_registers
            .get(&addr)
            .copied()
            .unwrap_or(0);
        0
    }

    fn write_debug_port_register(&self, addr: u8, data: u32) -> i32 {
        let code = self.begin("write_debug_port_register");
        if code != 0 {
            return code;
        }
        self.state.borrow_mut().dp_registers.insert(addr, data);
        0
    }

    fn read_access_port_register(&self, ap_index: u8, addr: u8, data: &mut u32) -> i32 {
        let code = self.begin("read_access_port_register");
        if code != 0 {
            return code;
        }
        *data = self
            .state
            .borrow()
            .ap_registers
            .get(&(ap_index, addr))
            .copied()
            .unwrap_or(0);
        0
    }

    fn write_access_port_register(&self, ap_index: u8, addr: u8, data: u32) -> i32 {
        let code = self.begin("write_access_port_register");
        if code != 0 {
            return code;
        }
        self.state
            .borrow_mut()
            .ap_registers
            .insert((ap_index, addr), data);
        0
    }

    fn is_rtt_started(&self, started: &mut bool) -> i32 {
        let code = self.begin("is_rtt_started");
        if code != 0 {
            return code;
        }
        *started = self.state.borrow().rtt_started;
        0
    }

    fn rtt_set_control_block_address(&self, addr: u32) -> i32 {
        let code = self.begin("rtt_set_control_block_address");
        if code != 0 {
            return code;
        }
        self.state.borrow_mut().rtt_control_block = Some(addr);
        0
    }

    fn rtt_start(&self) -> i32 {
        let code = self.begin("rtt_start");
        if code != 0 {
            return code;
        }
        let mut state = self.state.borrow_mut();
        state.rtt_started = true;
        state.rtt_found = true;
        0
    }

    fn rtt_is_control_block_found(&self, found: &mut bool) -> i32 {
        let code = self.begin("rtt_is_control_block_found");
        if code != 0 {
            return code;
        }
        *found = self.state.borrow().rtt_found;
        0
    }

    fn rtt_stop(&self) -> i32 {
        let code = self.begin("rtt_stop");
        if code != 0 {
            return code;
        }
        let mut state = self.state.borrow_mut();
        state.rtt_started = false;
        state.rtt_found = false;
        0
    }

    fn rtt_read(&self, _channel_index: u32, data: &mut [u8], read: &mut u32) -> i32 {
        let code = self.begin("rtt_read");
        if code != 0 {
            return code;
        }
        let mut state = self.state.borrow_mut();
        let mut count = 0;
        for slot in data.iter_mut() {
            match state.rtt_up_data.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }
        *read = count;
        0
    }

    fn rtt_write(&self, _channel_index: u32, data: &[u8], written: &mut u32) -> i32 {
        let code = self.begin("rtt_write");
        if code != 0 {
            return code;
        }
        let mut state = self.state.borrow_mut();
        let room = state.rtt_down_capacity.saturating_sub(state.rtt_down_data.len());
        let accepted = data.len().min(room);
        state.rtt_down_data.extend_from_slice(&data[..accepted]);
        *written = accepted as u32;
        0
    }

    fn rtt_read_channel_count(&self, down: &mut u32, up: &mut u32) -> i32 {
        let code = self.begin("rtt_read_channel_count");
        if code != 0 {
            return code;
        }
        *down = 1;
        *up = 1;
        0
    }

    fn rtt_read_channel_info(
        &self,
        _channel_index: u32,
        direction: i32,
        name: &mut [u8; 32],
        size: &mut u32,
    ) -> i32 {
        let code = self.begin("rtt_read_channel_info");
        if code != 0 {
            return code;
        }
        *name = [0; 32];
        name[..8].copy_from_slice(b"Terminal");
        *size = if direction == 0 { 1024 } else { 16 };
        0
    }

    fn is_qspi_init(&self, initialized: &mut bool) -> i32 {
        let code = self.begin("is_qspi_init");
        if code != 0 {
            return code;
        }
        *initialized = self.state.borrow().qspi_initialized;
        0
    }

    fn qspi_init(&self, retain_ram: bool, params: &QspiInitParamsRaw) -> i32 {
        let code = self.begin("qspi_init");
        if code != 0 {
            return code;
        }
        let mut state = self.state.borrow_mut();
        state.qspi_initialized = true;
        state.qspi_last_init = Some((retain_ram, *params));
        0
    }

    fn qspi_uninit(&self) -> i32 {
        let code = self.begin("qspi_uninit");
        if code != 0 {
            return code;
        }
        self.state.borrow_mut().qspi_initialized = false;
        0
    }

    fn qspi_read(&self, addr: u32, data: &mut [u8]) -> i32 {
        let code = self.begin("qspi_read");
        if code != 0 {
            return code;
        }
        let state = self.state.borrow();
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = state
                .qspi_memory
                .get(&(addr + i as u32))
                .copied()
                .unwrap_or(0xFF);
        }
        0
    }

    fn qspi_write(&self, addr: u32, data: &[u8]) -> i32 {
        let code = self.begin("qspi_write");
        if code != 0 {
            return code;
        }
        let mut state = self.state.borrow_mut();
        for (i, byte) in data.iter().enumerate() {
            state.qspi_memory.insert(addr + i as u32, *byte);
        }
        0
    }

    fn qspi_erase(&self, addr: u32, length: i32) -> i32 {
        let code = self.begin("qspi_erase");
        if code != 0 {
            return code;
        }
        let span: u32 = match length {
            0 => 0x1000,
            3 => 0x8000,
            1 => 0x10000,
            2 => {
                self.state.borrow_mut().qspi_memory.clear();
                return 0;
            }
            _ => return -3,
        };
        let mut state = self.state.borrow_mut();
        state.qspi_memory.retain(|&a, _| a < addr || a >= addr + span);
        0
    }

    fn qspi_custom(&self, code: u8, _length: u8, data_in: &[u8; 8], data_out: &mut [u8; 8]) -> i32 {
        let result = self.begin("qspi_custom");
        if result != 0 {
            return result;
        }
        *data_out = *data_in;
        data_out[0] = code;
        0
    }
}
