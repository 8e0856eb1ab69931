//! The error taxonomy of the crate and the translation of native result
//! codes into it.
//!
//! Every fallible operation reports exactly one of five kinds of failure:
//!
//! * [`ParameterError`] — an argument failed local validation. Raised before
//!   anything crosses the native boundary, so zero side effects are
//!   guaranteed.
//! * [`StateError`] — the operation was attempted outside its required
//!   session or peripheral phase. Also raised locally, before any native
//!   call.
//! * [`ProtocolError`] — the native library returned a non-zero result code.
//!   The raw code is always preserved, even when it is not one of the known
//!   symbolic results.
//! * [`ResourceError`] — the nrfjprog shared library could not be loaded or
//!   is missing an entry point.
//! * [`DecodeError`] — data returned by the native library could not be
//!   represented (unknown enumeration value, RTT text that is not valid
//!   UTF-8 at the requested cut).
//!
//! Nothing is retried internally and nothing is swallowed; retry policy
//! belongs to the caller.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The error type returned by every fallible operation of this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// An argument failed validation before the native boundary was crossed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParameterError {
    /// Byte spans are marshaled length-prefixed; an empty span is never a
    /// meaningful request.
    #[error("the {0} buffer must contain at least one byte")]
    EmptyBuffer(&'static str),
    #[error("the {name} buffer is {len} bytes, but at most {max} can cross the probe boundary")]
    BufferTooLong {
        name: &'static str,
        len: usize,
        max: usize,
    },
    #[error("{value} is not a valid {what}")]
    InvalidEnumValue { what: &'static str, value: i32 },
    #[error("{name:?} is not a valid {what}")]
    InvalidEnumName { what: &'static str, name: String },
}

/// An operation was attempted outside its required phase.
///
/// The session enforces the connection phase graph locally: an out-of-phase
/// call fails with one of these before the native library is invoked at all.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("the session has been closed")]
    Closed,
    #[error("the nrfjprog library has not been opened")]
    NotOpen,
    #[error("the nrfjprog library is already open")]
    AlreadyOpen,
    #[error("not connected to an emulator")]
    NotConnectedToEmulator,
    #[error("already connected to an emulator")]
    AlreadyConnectedToEmulator,
    #[error("not connected to a device")]
    NotConnectedToDevice,
    #[error("already connected to a device")]
    AlreadyConnectedToDevice,
    #[error("RTT has not been started")]
    RttNotStarted,
    #[error("RTT is already started")]
    RttAlreadyStarted,
    #[error("the QSPI peripheral has not been initialized")]
    QspiNotInitialized,
    #[error("the QSPI peripheral is already initialized")]
    QspiAlreadyInitialized,
}

/// The nrfjprog shared library or one of its entry points could not be
/// loaded.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("could not load the nrfjprog shared library from {}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("the nrfjprog shared library at {} has no entry point named {symbol}", .path.display())]
    MissingEntryPoint {
        path: PathBuf,
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },
    /// Paths are handed to the native layer as NUL-terminated strings, which
    /// an interior NUL byte cannot survive.
    #[error("the library path {} cannot be passed to the native layer", .0.display())]
    InvalidPath(PathBuf),
}

/// Data returned by the native library could not be represented.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Bytes read from an RTT up channel were not valid UTF-8.
    ///
    /// This happens legitimately when a read length cuts a multi-byte
    /// sequence at the buffer boundary. The raw bytes are retained inside
    /// the source error: `utf8_error().valid_up_to()` delimits the decodable
    /// prefix and [`std::string::FromUtf8Error::into_bytes`] recovers the
    /// whole buffer, so no data is lost.
    #[error("RTT data is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("the nrfjprog library returned {value}, which is not a recognized {what}")]
    UnknownValue { what: &'static str, value: i32 },
}

/// The symbolic result codes of the nrfjprog shared library.
///
/// The native result space is a signed integer with `0` meaning success;
/// these are the non-zero results the library is documented to produce.
/// Codes outside this set still translate into a [`ProtocolError`] carrying
/// the raw value, so newer library versions remain usable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    OutOfMemory,
    InvalidOperation,
    InvalidParameter,
    InvalidDeviceForOperation,
    WrongFamilyForDevice,
    EmulatorNotConnected,
    CannotConnect,
    LowVoltage,
    NoEmulatorConnected,
    NvmcError,
    RecoverFailed,
    NotAvailableBecauseProtection,
    NotAvailableBecauseMpuConfig,
    JlinkarmDllNotFound,
    JlinkarmDllCouldNotBeOpened,
    JlinkarmDllError,
    JlinkarmDllTooOld,
    NrfjprogSubDllNotFound,
    NrfjprogSubDllCouldNotBeOpened,
    NotImplemented,
}

/// Broad classification of an [`ErrorCode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Memory or resource exhaustion on the host side of the native layer.
    OutOfMemory,
    /// The request itself was rejected: invalid operation, parameter, or
    /// device for the session's family.
    InvalidRequest,
    /// The emulator or target connection is absent or unusable.
    Connectivity,
    /// The non-volatile memory controller reported a failure.
    Nvm,
    /// A device recovery attempt failed.
    Recovery,
    /// The device's protection state forbids the operation.
    Protection,
    /// A native sub-library could not be located or loaded.
    LibraryLoad,
    /// The native library does not implement the operation.
    NotImplemented,
}

impl ErrorCode {
    /// Maps a raw native result to its symbolic code, if it is a known one.
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            -1 => Self::OutOfMemory,
            -2 => Self::InvalidOperation,
            -3 => Self::InvalidParameter,
            -4 => Self::InvalidDeviceForOperation,
            -5 => Self::WrongFamilyForDevice,
            -10 => Self::EmulatorNotConnected,
            -11 => Self::CannotConnect,
            -12 => Self::LowVoltage,
            -13 => Self::NoEmulatorConnected,
            -20 => Self::NvmcError,
            -21 => Self::RecoverFailed,
            -90 => Self::NotAvailableBecauseProtection,
            -91 => Self::NotAvailableBecauseMpuConfig,
            -100 => Self::JlinkarmDllNotFound,
            -101 => Self::JlinkarmDllCouldNotBeOpened,
            -102 => Self::JlinkarmDllError,
            -103 => Self::JlinkarmDllTooOld,
            -150 => Self::NrfjprogSubDllNotFound,
            -151 => Self::NrfjprogSubDllCouldNotBeOpened,
            -255 => Self::NotImplemented,
            _ => return None,
        })
    }

    /// The raw native value of this code.
    pub fn code(self) -> i32 {
        match self {
            Self::OutOfMemory => -1,
            Self::InvalidOperation => -2,
            Self::InvalidParameter => -3,
            Self::InvalidDeviceForOperation => -4,
            Self::WrongFamilyForDevice => -5,
            Self::EmulatorNotConnected => -10,
            Self::CannotConnect => -11,
            Self::LowVoltage => -12,
            Self::NoEmulatorConnected => -13,
            Self::NvmcError => -20,
            Self::RecoverFailed => -21,
            Self::NotAvailableBecauseProtection => -90,
            Self::NotAvailableBecauseMpuConfig => -91,
            Self::JlinkarmDllNotFound => -100,
            Self::JlinkarmDllCouldNotBeOpened => -101,
            Self::JlinkarmDllError => -102,
            Self::JlinkarmDllTooOld => -103,
            Self::NrfjprogSubDllNotFound => -150,
            Self::NrfjprogSubDllCouldNotBeOpened => -151,
            Self::NotImplemented => -255,
        }
    }

    /// The canonical identifier of this code in the native library's header.
    pub fn name(self) -> &'static str {
        match self {
            Self::OutOfMemory => "OUT_OF_MEMORY",
            Self::InvalidOperation => "INVALID_OPERATION",
            Self::InvalidParameter => "INVALID_PARAMETER",
            Self::InvalidDeviceForOperation => "INVALID_DEVICE_FOR_OPERATION",
            Self::WrongFamilyForDevice => "WRONG_FAMILY_FOR_DEVICE",
            Self::EmulatorNotConnected => "EMULATOR_NOT_CONNECTED",
            Self::CannotConnect => "CANNOT_CONNECT",
            Self::LowVoltage => "LOW_VOLTAGE",
            Self::NoEmulatorConnected => "NO_EMULATOR_CONNECTED",
            Self::NvmcError => "NVMC_ERROR",
            Self::RecoverFailed => "RECOVER_FAILED",
            Self::NotAvailableBecauseProtection => "NOT_AVAILABLE_BECAUSE_PROTECTION",
            Self::NotAvailableBecauseMpuConfig => "NOT_AVAILABLE_BECAUSE_MPU_CONFIG",
            Self::JlinkarmDllNotFound => "JLINKARM_DLL_NOT_FOUND",
            Self::JlinkarmDllCouldNotBeOpened => "JLINKARM_DLL_COULD_NOT_BE_OPENED",
            Self::JlinkarmDllError => "JLINKARM_DLL_ERROR",
            Self::JlinkarmDllTooOld => "JLINKARM_DLL_TOO_OLD",
            Self::NrfjprogSubDllNotFound => "NRFJPROG_SUB_DLL_NOT_FOUND",
            Self::NrfjprogSubDllCouldNotBeOpened => "NRFJPROG_SUB_DLL_COULD_NOT_BE_OPENED",
            Self::NotImplemented => "NOT_IMPLEMENTED_ERROR",
        }
    }

    /// The category this code belongs to.
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::OutOfMemory => ErrorCategory::OutOfMemory,
            Self::InvalidOperation
            | Self::InvalidParameter
            | Self::InvalidDeviceForOperation
            | Self::WrongFamilyForDevice => ErrorCategory::InvalidRequest,
            Self::EmulatorNotConnected
            | Self::CannotConnect
            | Self::LowVoltage
            | Self::NoEmulatorConnected => ErrorCategory::Connectivity,
            Self::NvmcError => ErrorCategory::Nvm,
            Self::RecoverFailed => ErrorCategory::Recovery,
            Self::NotAvailableBecauseProtection | Self::NotAvailableBecauseMpuConfig => {
                ErrorCategory::Protection
            }
            Self::JlinkarmDllNotFound
            | Self::JlinkarmDllCouldNotBeOpened
            | Self::JlinkarmDllError
            | Self::JlinkarmDllTooOld
            | Self::NrfjprogSubDllNotFound
            | Self::NrfjprogSubDllCouldNotBeOpened => ErrorCategory::LibraryLoad,
            Self::NotImplemented => ErrorCategory::NotImplemented,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A non-zero result reported by the nrfjprog shared library.
///
/// The raw code is preserved unconditionally; [`kind`](Self::kind) and
/// [`category`](Self::category) are available when the code is a recognized
/// one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolError {
    code: i32,
}

impl ProtocolError {
    pub(crate) fn new(code: i32) -> Self {
        Self { code }
    }

    /// The raw result code.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// The symbolic result, if the code is a known one.
    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }

    /// The category of the symbolic result, if the code is a known one.
    pub fn category(&self) -> Option<ErrorCategory> {
        self.kind().map(ErrorCode::category)
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(
                f,
                "the nrfjprog library reported error {} ({})",
                self.code, kind
            ),
            None => write!(f, "the nrfjprog library reported error {}", self.code),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Translates a raw native result into a `Result`, preserving the code.
pub(crate) fn check(op: &'static str, code: i32) -> Result<(), ProtocolError> {
    if code == 0 {
        Ok(())
    } else {
        let error = ProtocolError::new(code);
        tracing::debug!("{op}: {error}");
        Err(error)
    }
}

/// Decodes an enumeration value reported by the native library, surfacing
/// unknown codes as a decode failure rather than a caller error.
pub(crate) fn native_enum<E: num_traits::FromPrimitive>(
    what: &'static str,
    value: i32,
) -> Result<E, DecodeError> {
    E::from_i32(value).ok_or(DecodeError::UnknownValue { what, value })
}

/// Validates a caller-supplied byte span before it is marshaled
/// length-prefixed across the boundary. Returns the span length as the
/// `u32` the native layer expects.
pub(crate) fn buffer_len(name: &'static str, data: &[u8]) -> Result<u32, ParameterError> {
    if data.is_empty() {
        return Err(ParameterError::EmptyBuffer(name));
    }
    u32::try_from(data.len()).map_err(|_| ParameterError::BufferTooLong {
        name,
        len: data.len(),
        max: u32::MAX as usize,
    })
}
