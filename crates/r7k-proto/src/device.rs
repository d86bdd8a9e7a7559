//! Sonar device targets.
//!
//! Control records are addressed through the DRF `device_id` and
//! `sys_enumerator` fields. A 7125 is reached through the 7k center, with the
//! enumerator selecting its 200 kHz or 400 kHz head; a T50 is addressed
//! directly.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// Device ID of the 7k center
pub const DEVID_7KCENTER: u32 = 7000;

/// Device ID of a T50 sonar
pub const DEVID_T50: u32 = 14000;

/// Default system enumerator
pub const SYS_ENUM_DEFAULT: u16 = 0;

/// System enumerator of a 7125 200 kHz head
pub const SYS_ENUM_200KHZ: u16 = 0;

/// System enumerator of a 7125 400 kHz head
pub const SYS_ENUM_400KHZ: u16 = 1;

/// A sonar the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Device {
    /// Reson 7125, 200 kHz head
    Reson7125Low,
    /// Reson 7125, 400 kHz head
    #[default]
    Reson7125High,
    /// Reson T50
    T50,
}

impl Device {
    /// Mnemonic used on command lines and in logs.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Reson7125Low => "7125_200",
            Self::Reson7125High => "7125_400",
            Self::T50 => "T50",
        }
    }

    /// DRF `device_id` used when addressing this device.
    #[must_use]
    pub const fn device_id(self) -> u32 {
        match self {
            Self::Reson7125Low | Self::Reson7125High => DEVID_7KCENTER,
            Self::T50 => DEVID_T50,
        }
    }

    /// DRF `sys_enumerator` used when addressing this device.
    #[must_use]
    pub const fn sys_enumerator(self) -> u16 {
        match self {
            Self::Reson7125Low => SYS_ENUM_200KHZ,
            Self::Reson7125High => SYS_ENUM_400KHZ,
            Self::T50 => SYS_ENUM_DEFAULT,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl FromStr for Device {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Reson7125Low, Self::Reson7125High, Self::T50]
            .into_iter()
            .find(|device| device.mnemonic().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProtocolError::UnknownDevice(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mnemonics_case_insensitive() {
        assert_eq!("7125_200".parse::<Device>(), Ok(Device::Reson7125Low));
        assert_eq!("7125_400".parse::<Device>(), Ok(Device::Reson7125High));
        assert_eq!("t50".parse::<Device>(), Ok(Device::T50));
    }

    #[test]
    fn unknown_mnemonic() {
        assert_eq!(
            "7160".parse::<Device>(),
            Err(ProtocolError::UnknownDevice("7160".to_string()))
        );
    }

    #[test]
    fn reson_7125_goes_through_center() {
        assert_eq!(Device::Reson7125Low.device_id(), DEVID_7KCENTER);
        assert_eq!(Device::Reson7125High.device_id(), DEVID_7KCENTER);
        assert_ne!(Device::Reson7125Low.sys_enumerator(), Device::Reson7125High.sys_enumerator());
        assert_eq!(Device::T50.device_id(), DEVID_T50);
    }
}
