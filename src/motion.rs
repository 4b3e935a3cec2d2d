//! Types and functionality related to manual motion of the mount axes

use crate::{protocol::DeviceId, Error, Result};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Passthrough motion direction byte for the positive sense of an axis
pub(crate) const DIR_POSITIVE: u8 = 0x24;
/// Passthrough motion direction byte for the negative sense of an axis
pub(crate) const DIR_NEGATIVE: u8 = 0x25;

/// Physical axis of the mount
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "strum", derive(strum_macros::EnumIter))]
#[allow(missing_docs)]
pub enum Axis {
    Ra,
    Dec,
}

impl Axis {
    /// Motor controller that drives this axis
    pub const fn device(self) -> DeviceId {
        match self {
            Self::Ra => DeviceId::RaMotor,
            Self::Dec => DeviceId::DecMotor,
        }
    }
}

/// Jog direction. North/south move the declination axis, west/east the
/// right ascension axis.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "strum", derive(strum_macros::EnumIter))]
#[allow(missing_docs)]
pub enum Direction {
    North,
    South,
    West,
    East,
}

impl Direction {
    pub const fn axis(self) -> Axis {
        match self {
            Self::North | Self::South => Axis::Dec,
            Self::West | Self::East => Axis::Ra,
        }
    }

    /// Whether this direction drives its axis in the positive sense
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::North | Self::West)
    }

    pub(crate) const fn wire_byte(self) -> u8 {
        if self.is_positive() {
            DIR_POSITIVE
        } else {
            DIR_NEGATIVE
        }
    }
}

/// Fixed motor speeds offered by the hand controller, slowest first
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, FromPrimitive)]
#[cfg_attr(feature = "strum", derive(strum_macros::EnumIter))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum SlewRate {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    #[default]
    Nine = 9,
}

impl TryFrom<u8> for SlewRate {
    type Error = Error;
    fn try_from(code: u8) -> Result<Self> {
        Self::from_u8(code).ok_or(Error::Parse("Invalid SlewRate"))
    }
}

/// Sidereal tracking mode
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive)]
#[cfg_attr(feature = "strum", derive(strum_macros::EnumIter))]
#[repr(u8)]
pub enum TrackingMode {
    /// Motors hold position
    #[default]
    Off = 0,
    /// Track on both altitude and azimuth axes
    AltAz = 1,
    /// Equatorial wedge, northern hemisphere
    EqNorth = 2,
    /// Equatorial wedge, southern hemisphere
    EqSouth = 3,
}

impl TryFrom<u8> for TrackingMode {
    type Error = Error;
    fn try_from(code: u8) -> Result<Self> {
        Self::from_u8(code).ok_or(Error::Parse("Invalid TrackingMode"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn directions_pair_onto_axes() {
        assert_eq!(Direction::North.axis(), Axis::Dec);
        assert_eq!(Direction::South.axis(), Axis::Dec);
        assert_eq!(Direction::West.axis(), Axis::Ra);
        assert_eq!(Direction::East.axis(), Axis::Ra);
        assert_eq!(Direction::North.wire_byte(), DIR_POSITIVE);
        assert_eq!(Direction::South.wire_byte(), DIR_NEGATIVE);
        assert_eq!(Direction::West.wire_byte(), DIR_POSITIVE);
        assert_eq!(Direction::East.wire_byte(), DIR_NEGATIVE);
    }

    #[test]
    fn slew_rate_codes() {
        assert_eq!(SlewRate::try_from(1).unwrap(), SlewRate::One);
        assert_eq!(SlewRate::try_from(9).unwrap(), SlewRate::Nine);
        SlewRate::try_from(0).unwrap_err();
        SlewRate::try_from(10).unwrap_err();
        assert!(SlewRate::One < SlewRate::Nine);
    }
}
