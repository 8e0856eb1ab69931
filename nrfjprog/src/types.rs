//! Enumerations and small value types shared across the session, memory and
//! peripheral modules.
//!
//! Every enumeration in this module crosses the native boundary as a fixed
//! integer code. Decoding is total in both directions: an integer code or a
//! case-sensitive symbolic name either maps to a declared member, or the
//! decode fails — there is no silent fallback.

use std::fmt;

/// Defines a boundary-crossing enumeration together with its total decoders.
///
/// Each member is declared as `"SYMBOLIC_NAME" => Variant = code`. The
/// symbolic names are the canonical identifiers of the native library's
/// header and are what [`std::str::FromStr`] accepts and [`fmt::Display`]
/// prints.
macro_rules! enum_codes {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: $what:literal {
            $($(#[$vmeta:meta])* $sym:literal => $variant:ident = $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::enum_primitive_derive::Primitive)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl $name {
            /// Every declared member, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Decodes the integer representation of this enumeration.
            pub fn from_code(code: i32) -> Result<Self, $crate::error::ParameterError> {
                <Self as ::num_traits::FromPrimitive>::from_i32(code).ok_or(
                    $crate::error::ParameterError::InvalidEnumValue {
                        what: $what,
                        value: code,
                    },
                )
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::error::ParameterError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($sym => Ok(Self::$variant),)+
                    _ => Err($crate::error::ParameterError::InvalidEnumName {
                        what: $what,
                        name: s.to_string(),
                    }),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(match self {
                    $(Self::$variant => $sym),+
                })
            }
        }
    };
}
pub(crate) use enum_codes;

enum_codes! {
    /// Family of the nRF device a session operates on.
    ///
    /// A session opened with [`Unknown`](Self::Unknown) can query the actual
    /// family of the connected target with
    /// [`Session::read_device_family`](crate::Session::read_device_family).
    pub enum DeviceFamily: "device family" {
        "NRF51" => Nrf51 = 0,
        "NRF52" => Nrf52 = 1,
        "UNKNOWN" => Unknown = 99,
    }
}

enum_codes! {
    /// Hardware revision of the connected device.
    pub enum DeviceVersion: "device version" {
        "UNKNOWN" => Unknown = 0,
        "NRF51xxx_xxAA_REV1" => Nrf51xxxXxaaRev1 = 1,
        "NRF51xxx_xxAA_REV2" => Nrf51xxxXxaaRev2 = 2,
        "NRF51xxx_xxAA_REV3" => Nrf51xxxXxaaRev3 = 3,
        "NRF51xxx_xxAB_REV3" => Nrf51xxxXxabRev3 = 4,
        "NRF51xxx_xxAC_REV3" => Nrf51xxxXxacRev3 = 5,
        "NRF51802_xxAA_REV3" => Nrf51802XxaaRev3 = 6,
        "NRF51801_xxAB_REV3" => Nrf51801XxabRev3 = 17,
        "NRF52832_xxAA_ENGA" => Nrf52832XxaaEngA = 7,
        "NRF52832_xxAA_ENGB" => Nrf52832XxaaEngB = 8,
        "NRF52832_xxAA_REV1" => Nrf52832XxaaRev1 = 9,
        "NRF52832_xxAB_REV1" => Nrf52832XxabRev1 = 15,
        "NRF52832_xxAA_FUTURE" => Nrf52832XxaaFuture = 11,
        "NRF52832_xxAB_FUTURE" => Nrf52832XxabFuture = 16,
        "NRF52840_xxAA_ENGA" => Nrf52840XxaaEngA = 10,
        "NRF52840_xxAA_FUTURE" => Nrf52840XxaaFuture = 12,
    }
}

enum_codes! {
    /// Readback protection level of the target.
    pub enum ReadbackProtection: "readback protection level" {
        "NONE" => None = 0,
        "REGION_0" => Region0 = 1,
        "ALL" => All = 2,
        "BOTH" => Both = 3,
    }
}

enum_codes! {
    /// Origin of the region 0 protection configuration on nRF51 devices.
    pub enum Region0Source: "region 0 source" {
        "NO_REGION_0" => NoRegion0 = 0,
        "FACTORY" => Factory = 1,
        "USER" => User = 2,
    }
}

enum_codes! {
    /// Power state of one RAM section.
    pub enum RamPower: "RAM power state" {
        "OFF" => Off = 0,
        "ON" => On = 1,
    }
}

enum_codes! {
    /// The CPU registers reachable over the debug connection.
    ///
    /// R13 is the currently banked stack pointer; [`Msp`](Self::Msp) and
    /// [`Psp`](Self::Psp) address the two banked values directly.
    pub enum CpuRegister: "CPU register" {
        "R0" => R0 = 0,
        "R1" => R1 = 1,
        "R2" => R2 = 2,
        "R3" => R3 = 3,
        "R4" => R4 = 4,
        "R5" => R5 = 5,
        "R6" => R6 = 6,
        "R7" => R7 = 7,
        "R8" => R8 = 8,
        "R9" => R9 = 9,
        "R10" => R10 = 10,
        "R11" => R11 = 11,
        "R12" => R12 = 12,
        "R13" => R13 = 13,
        "R14" => R14 = 14,
        "R15" => R15 = 15,
        "XPSR" => Xpsr = 16,
        "MSP" => Msp = 17,
        "PSP" => Psp = 18,
    }
}

/// Version triple of the J-Link transport library, as reported through the
/// nrfjprog shared library.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DllVersion {
    pub major: u32,
    pub minor: u32,
    pub revision: char,
}

impl fmt::Display for DllVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}{}", self.major, self.minor, self.revision)
    }
}
