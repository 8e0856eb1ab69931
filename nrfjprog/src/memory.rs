//! Memory and register access over the debug connection.
//!
//! Word accesses and byte-span accesses are distinct native operations with
//! different alignment and flash-controller behavior, so they stay distinct
//! here. Byte spans are marshaled length-prefixed; on a successful span read
//! the native layer has filled exactly the requested number of bytes.

use crate::dll::Library;
use crate::error::{buffer_len, check, Error};
use crate::session::Session;
use crate::types::CpuRegister;

impl<L: Library> Session<L> {
    /// Reads one 32-bit word from `addr`.
    pub fn read_u32(&mut self, addr: u32) -> Result<u32, Error> {
        self.require_emu()?;
        let mut data = 0;
        check("read_u32", self.lib.read_u32(addr, &mut data))?;
        Ok(data)
    }

    /// Writes one 32-bit word to `addr`.
    ///
    /// With `nvmc_control` set, the native library drives the non-volatile
    /// memory controller itself, so the word may target flash; without it
    /// the caller is responsible for the controller state.
    pub fn write_u32(&mut self, addr: u32, data: u32, nvmc_control: bool) -> Result<(), Error> {
        self.require_emu()?;
        check("write_u32", self.lib.write_u32(addr, data, nvmc_control)).map_err(Error::from)
    }

    /// Reads `len` bytes starting at `addr`.
    ///
    /// The returned buffer is exactly `len` bytes long; the native layer
    /// fills all of it or fails.
    pub fn read(&mut self, addr: u32, len: u32) -> Result<Vec<u8>, Error> {
        self.require_emu()?;
        let mut data = vec![0u8; len as usize];
        check("read", self.lib.read(addr, &mut data))?;
        Ok(data)
    }

    /// Writes a byte span starting at `addr`. See
    /// [`write_u32`](Session::write_u32) for `nvmc_control`.
    pub fn write(&mut self, addr: u32, data: &[u8], nvmc_control: bool) -> Result<(), Error> {
        self.require_emu()?;
        buffer_len("data", data)?;
        check("write", self.lib.write(addr, data, nvmc_control)).map_err(Error::from)
    }

    /// Reads a CPU register.
    pub fn read_cpu_register(&mut self, register: CpuRegister) -> Result<u32, Error> {
        self.require_emu()?;
        let mut value = 0;
        check(
            "read_cpu_register",
            self.lib.read_cpu_register(register as i32, &mut value),
        )?;
        Ok(value)
    }

    /// Writes a CPU register.
    pub fn write_cpu_register(&mut self, register: CpuRegister, value: u32) -> Result<(), Error> {
        self.require_emu()?;
        check(
            "write_cpu_register",
            self.lib.write_cpu_register(register as i32, value),
        )
        .map_err(Error::from)
    }

    /// Reads a debug port register. `addr` is the 8-bit DP register address.
    pub fn read_debug_port_register(&mut self, addr: u8) -> Result<u32, Error> {
        self.require_emu()?;
        let mut data = 0;
        check(
            "read_debug_port_register",
            self.lib.read_debug_port_register(addr, &mut data),
        )?;
        Ok(data)
    }

    /// Writes a debug port register.
    pub fn write_debug_port_register(&mut self, addr: u8, data: u32) -> Result<(), Error> {
        self.require_emu()?;
        check(
            "write_debug_port_register",
            self.lib.write_debug_port_register(addr, data),
        )
        .map_err(Error::from)
    }

    /// Reads an access port register. `ap_index` selects the access port,
    /// `addr` the 8-bit register address within it.
    pub fn read_access_port_register(&mut self, ap_index: u8, addr: u8) -> Result<u32, Error> {
        self.require_emu()?;
        let mut data = 0;
        check(
            "read_access_port_register",
            self.lib.read_access_port_register(ap_index, addr, &mut data),
        )?;
        Ok(data)
    }

    /// Writes an access port register.
    pub fn write_access_port_register(
        &mut self,
        ap_index: u8,
        addr: u8,
        data: u32,
    ) -> Result<(), Error> {
        self.require_emu()?;
        check(
            "write_access_port_register",
            self.lib.write_access_port_register(ap_index, addr, data),
        )
        .map_err(Error::from)
    }
}

#[cfg(test)]
mod test {
    use crate::error::{Error, ParameterError};
    use crate::fake::FakeDll;
    use crate::session::test::connected_session;
    use crate::session::Session;
    use crate::types::{CpuRegister, DeviceFamily};

    #[test]
    fn word_write_read_round_trip() {
        let (_, mut session) = connected_session();
        session.write_u32(0x2000_0000, 0xDEAD_BEEF, true).unwrap();
        assert_eq!(session.read_u32(0x2000_0000).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn byte_span_write_read_round_trip() {
        let (_, mut session) = connected_session();
        let data = [1u8, 2, 3, 4, 5, 6, 7];
        session.write(0x2000_0100, &data, false).unwrap();
        assert_eq!(session.read(0x2000_0100, data.len() as u32).unwrap(), data);
    }

    #[test]
    fn word_and_span_views_agree() {
        let (_, mut session) = connected_session();
        session.write_u32(0x2000_0200, 0x0403_0201, false).unwrap();
        assert_eq!(
            session.read(0x2000_0200, 4).unwrap(),
            vec![0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn span_read_returns_exactly_the_requested_length() {
        let (_, mut session) = connected_session();
        assert_eq!(session.read(0x2000_0300, 64).unwrap().len(), 64);
    }

    #[test]
    fn empty_write_is_rejected_without_a_native_call() {
        let (dll, mut session) = connected_session();
        let calls_before = dll.call_count();
        let error = session.write(0x2000_0000, &[], true).unwrap_err();
        assert!(matches!(
            error,
            Error::Parameter(ParameterError::EmptyBuffer("data"))
        ));
        assert_eq!(dll.call_count(), calls_before);
    }

    #[test]
    fn cpu_registers_round_trip() {
        let (_, mut session) = connected_session();
        session
            .write_cpu_register(CpuRegister::Msp, 0x2001_0000)
            .unwrap();
        assert_eq!(
            session.read_cpu_register(CpuRegister::Msp).unwrap(),
            0x2001_0000
        );
        assert_eq!(session.read_cpu_register(CpuRegister::R0).unwrap(), 0);
    }

    #[test]
    fn register_names_parse_to_the_same_registers() {
        let register: CpuRegister = "XPSR".parse().unwrap();
        assert_eq!(register, CpuRegister::Xpsr);
        assert_eq!(CpuRegister::from_code(16).unwrap(), CpuRegister::Xpsr);
    }

    #[test]
    fn debug_port_and_access_port_registers_are_distinct_spaces() {
        let (_, mut session) = connected_session();
        session.write_debug_port_register(0x08, 0x0000_00F0).unwrap();
        session
            .write_access_port_register(1, 0x08, 0x1234_5678)
            .unwrap();
        assert_eq!(session.read_debug_port_register(0x08).unwrap(), 0x0000_00F0);
        assert_eq!(
            session.read_access_port_register(1, 0x08).unwrap(),
            0x1234_5678
        );
        assert_eq!(session.read_access_port_register(0, 0x08).unwrap(), 0);
    }

    #[test]
    fn memory_access_requires_a_connection() {
        let dll = FakeDll::new();
        let mut session = Session::with_library(dll.clone(), DeviceFamily::Nrf52);
        session.open().unwrap();
        let calls_after_open = dll.call_count();
        assert!(session.read_u32(0x2000_0000).is_err());
        assert!(session.write(0x2000_0000, &[1], false).is_err());
        assert_eq!(dll.call_count(), calls_after_open);
    }
}
