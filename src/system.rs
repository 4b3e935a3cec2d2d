use crate::{coord::Sexagesimal, Error, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::fmt::{self, Display, Formatter};

/// Version and model strings reported by the hand controller and the
/// motor/GPS boards behind it. Each field is filled by its own query and
/// stays empty until that query succeeds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct FirmwareInfo {
    pub model: String,
    pub model_id: Option<u8>,
    pub version: String,
    pub gps_firmware: String,
    pub ra_firmware: String,
    pub dec_firmware: String,
}

/// Mount models known to the hand controller's `m` query
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum MountModel {
    GpsSeries = 1,
    ISeries = 3,
    ISeriesSe = 4,
    Cge = 5,
    AdvancedGt = 6,
    Slt = 7,
    Cpc = 9,
    Gt = 10,
    Se45 = 11,
    Se68 = 12,
    CgePro = 13,
    CgemDx = 14,
    Lcm = 15,
    SkyProdigy = 16,
    CpcDeluxe = 17,
    Gt16 = 18,
    StarSeeker = 19,
    Avx = 20,
    Cosmos = 21,
    Evolution = 22,
    Cgx = 23,
    Cgxl = 24,
    Astrofi = 25,
    SkyWatcher = 26,
}

impl MountModel {
    pub fn from_id(id: u8) -> Option<Self> {
        Self::from_u8(id)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::GpsSeries => "GPS Series",
            Self::ISeries => "i-Series",
            Self::ISeriesSe => "i-Series SE",
            Self::Cge => "CGE",
            Self::AdvancedGt => "Advanced GT",
            Self::Slt => "SLT",
            Self::Cpc => "CPC",
            Self::Gt => "GT",
            Self::Se45 => "4/5 SE",
            Self::Se68 => "6/8 SE",
            Self::CgePro => "CGE Pro",
            Self::CgemDx => "CGEM DX",
            Self::Lcm => "LCM",
            Self::SkyProdigy => "Sky Prodigy",
            Self::CpcDeluxe => "CPC Deluxe",
            Self::Gt16 => "GT 16",
            Self::StarSeeker => "StarSeeker",
            Self::Avx => "Advanced VX",
            Self::Cosmos => "Cosmos",
            Self::Evolution => "Evolution",
            Self::Cgx => "CGX",
            Self::Cgxl => "CGX-L",
            Self::Astrofi => "AstroFi",
            Self::SkyWatcher => "SkyWatcher",
        }
    }

    /// Display name for a raw model byte, including ones not in the table
    pub fn describe(id: u8) -> String {
        Self::from_id(id).map_or_else(
            || format!("Unknown model ({id})"),
            |model| model.name().to_string(),
        )
    }
}

impl Display for MountModel {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        write!(fmt, "{}", self.name())
    }
}

/// Whether the GPS module reports a fix. Only the simulator consults this.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum GpsStatus {
    Off,
    #[default]
    On,
}

/// Clock of the hand controller
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeviceTime {
    /// The instant, in UTC
    pub utc: NaiveDateTime,
    /// Configured offset of local standard time from UTC, in hours
    pub utc_offset: i8,
    /// Whether daylight saving is applied on top of the offset
    pub dst: bool,
}

impl DeviceTime {
    /// The controller's wall-clock reading
    pub fn local(&self) -> NaiveDateTime {
        self.utc + self.local_offset()
    }

    pub(crate) fn local_offset(&self) -> Duration {
        Duration::hours(i64::from(self.utc_offset) + i64::from(self.dst))
    }

    /// Encode as the eight bytes of the `H` command: local hour, minute,
    /// second, month, day, year since 2000, UTC offset and DST flag
    pub fn to_wire(&self) -> Result<[u8; 8]> {
        let local = self.local();
        let year = u8::try_from(local.year() - 2000)
            .map_err(|_| Error::InvalidArgument("Year outside 2000-2255"))?;
        Ok([
            local.hour() as u8,
            local.minute() as u8,
            local.second() as u8,
            local.month() as u8,
            local.day() as u8,
            year,
            self.utc_offset.to_le_bytes()[0],
            u8::from(self.dst),
        ])
    }

    /// Decode the eight bytes of an `h` reply
    pub fn from_wire(bytes: [u8; 8]) -> Result<Self> {
        let [hour, minute, second, month, day, year, offset, dst] = bytes;
        let local = NaiveDate::from_ymd_opt(
            2000 + i32::from(year),
            u32::from(month),
            u32::from(day),
        )
        .and_then(|date| {
            date.and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second))
        })
        .ok_or(Error::Parse("Invalid date/time"))?;
        let mut time = Self {
            utc: local,
            utc_offset: i8::from_le_bytes([offset]),
            dst: dst != 0,
        };
        time.utc = local - time.local_offset();
        Ok(time)
    }
}

/// Observing site. Longitude is east-positive in `[-180, 180]`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Build a location, accepting longitude either east-positive in
    /// `[-180, 180]` or as `[0, 360)` east of Greenwich
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::InvalidArgument("Latitude outside [-90, 90]"));
        }
        if !longitude.is_finite() {
            return Err(Error::InvalidArgument("Longitude is not finite"));
        }
        let mut longitude = longitude.rem_euclid(360.0);
        if longitude > 180.0 {
            longitude -= 360.0;
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Encode as the eight bytes of the `W` command: latitude degrees,
    /// minutes, seconds, 0 north/1 south, then the same for longitude with
    /// 0 east/1 west. The fields are public, so the ranges `new` enforces
    /// are checked again here.
    pub fn to_wire(&self) -> Result<[u8; 8]> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::InvalidArgument("Latitude outside [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::InvalidArgument("Longitude outside [-180, 180]"));
        }
        let lat = Sexagesimal::from_degrees(self.latitude)
            .ok_or(Error::InvalidArgument("Latitude out of range"))?;
        let lon = Sexagesimal::from_degrees(self.longitude)
            .ok_or(Error::InvalidArgument("Longitude out of range"))?;
        Ok([
            lat.degrees,
            lat.minutes,
            lat.seconds,
            u8::from(lat.negative),
            lon.degrees,
            lon.minutes,
            lon.seconds,
            u8::from(lon.negative),
        ])
    }

    /// Decode the eight bytes of a `w` reply
    pub fn from_wire(bytes: [u8; 8]) -> Self {
        let [lat_d, lat_m, lat_s, south, lon_d, lon_m, lon_s, west] = bytes;
        let lat = Sexagesimal {
            degrees: lat_d,
            minutes: lat_m,
            seconds: lat_s,
            negative: south != 0,
        };
        let lon = Sexagesimal {
            degrees: lon_d,
            minutes: lon_m,
            seconds: lon_s,
            negative: west != 0,
        };
        Self {
            latitude: lat.to_degrees(),
            longitude: lon.to_degrees(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn model_names() {
        assert_eq!(MountModel::from_id(20), Some(MountModel::Avx));
        assert_eq!(MountModel::describe(20), "Advanced VX");
        assert_eq!(MountModel::describe(2), "Unknown model (2)");
        assert_eq!(MountModel::Cgx.to_string(), "CGX");
    }

    #[test]
    fn local_time_applies_offset_and_dst() {
        let utc = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(2, 0, 0)
            .unwrap();
        let time = DeviceTime {
            utc,
            utc_offset: -5,
            dst: true,
        };
        assert_eq!(
            time.local(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
                .unwrap()
                .and_hms_opt(22, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn time_wire_bytes() {
        let utc = NaiveDate::from_ymd_opt(2024, 7, 14)
            .unwrap()
            .and_hms_opt(3, 30, 15)
            .unwrap();
        let time = DeviceTime {
            utc,
            utc_offset: -7,
            dst: false,
        };
        // 20:30:15 local on the 13th, offset -7 as two's complement
        let wire = time.to_wire().unwrap();
        assert_eq!(wire, [20, 30, 15, 7, 13, 24, 249, 0]);
        assert_eq!(DeviceTime::from_wire(wire).unwrap(), time);

        DeviceTime::from_wire([25, 0, 0, 1, 1, 24, 0, 0]).unwrap_err();
        DeviceTime::from_wire([0, 0, 0, 2, 30, 24, 0, 0]).unwrap_err();
    }

    #[test]
    fn time_before_2000_rejected() {
        let utc = NaiveDate::from_ymd_opt(1999, 12, 31)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let time = DeviceTime {
            utc,
            utc_offset: 0,
            dst: false,
        };
        assert_eq!(
            time.to_wire().unwrap_err().kind(),
            crate::ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn location_wire_bytes() {
        // Sydney, with longitude given as degrees east of Greenwich
        let loc = Location::new(-33.8675, 151.2070).unwrap();
        assert_eq!(loc.to_wire().unwrap(), [33, 52, 3, 1, 151, 12, 25, 0]);

        // west longitude given on the 0..360 convention
        let loc = Location::new(40.0, 360.0 - 105.25).unwrap();
        assert!((loc.longitude + 105.25).abs() < 1e-9);
        assert_eq!(loc.to_wire().unwrap(), [40, 0, 0, 0, 105, 15, 0, 1]);

        let back = Location::from_wire([40, 0, 0, 0, 105, 15, 0, 1]);
        assert_eq!(back.latitude, 40.0);
        assert!((back.longitude + 105.25).abs() < 1e-9);
    }

    #[test]
    fn location_rejects_bad_latitude() {
        Location::new(90.5, 0.0).unwrap_err();
        Location::new(f64::NAN, 0.0).unwrap_err();
        Location::new(0.0, f64::INFINITY).unwrap_err();
        assert_eq!(Location::new(0.0, -180.0).unwrap().longitude, 180.0);
    }

    #[test]
    fn location_built_by_hand_is_checked_before_encoding() {
        let loc = Location {
            latitude: 120.0,
            longitude: 0.0,
        };
        assert_eq!(loc.to_wire().unwrap_err().kind(), crate::ErrorKind::InvalidArgument);
        let loc = Location {
            latitude: 0.0,
            longitude: 200.0,
        };
        loc.to_wire().unwrap_err();
        let loc = Location {
            latitude: f64::NAN,
            longitude: 0.0,
        };
        loc.to_wire().unwrap_err();
    }
}
