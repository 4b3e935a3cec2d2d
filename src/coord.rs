//! Conversions between floating point sky coordinates and the fixed-point
//! turn fractions used on the wire

/// Hours in one full turn of right ascension
pub const RA_SPAN: f64 = 24.0;

/// Degrees in one full turn of declination
pub const DEC_SPAN: f64 = 360.0;

/// Number of steps in one full turn
const FRACTION_STEPS: f64 = 65536.0;

/// Encode `value` as a 16-bit fraction of a turn spanning `turn_span`
/// units. Out-of-range values wrap around the turn rather than being
/// rejected, so `encode_fraction(24.0, 24.0) == encode_fraction(0.0, 24.0)`.
pub fn encode_fraction(value: f64, turn_span: f64) -> u16 {
    let turn = (value / turn_span).rem_euclid(1.0);
    // rounding can land exactly on a full turn, which is zero again
    ((turn * FRACTION_STEPS).round() as u32 % 0x1_0000) as u16
}

/// Inverse of [`encode_fraction`]; the result is in `[0, turn_span)`
pub fn decode_fraction(fraction: u16, turn_span: f64) -> f64 {
    f64::from(fraction) / FRACTION_STEPS * turn_span
}

/// Right ascension in hours to a wire fraction
pub fn ra_fraction(ra: f64) -> u16 {
    encode_fraction(ra, RA_SPAN)
}

/// Declination in degrees to a wire fraction
pub fn dec_fraction(dec: f64) -> u16 {
    encode_fraction(dec, DEC_SPAN)
}

/// Wire fraction to right ascension in hours, `[0, 24)`
pub fn ra_from_fraction(fraction: u16) -> f64 {
    decode_fraction(fraction, RA_SPAN)
}

/// Wire fraction to declination in degrees, folded into `[-90, 90]`.
///
/// The mount reports declination as a position on a full circle; the
/// half of the circle past the pole reflects back through 180°.
pub fn dec_from_fraction(fraction: u16) -> f64 {
    let dec = decode_fraction(fraction, DEC_SPAN);
    if dec > 270.0 {
        dec - 360.0
    } else if dec > 90.0 {
        180.0 - dec
    } else {
        dec
    }
}

/// An equatorial position: right ascension in hours, declination in
/// degrees
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RaDec {
    pub ra: f64,
    pub dec: f64,
}

impl RaDec {
    pub fn from_fractions(ra: u16, dec: u16) -> Self {
        Self {
            ra: ra_from_fraction(ra),
            dec: dec_from_fraction(dec),
        }
    }
}

/// Size of one encoding step, in the units of `turn_span`
pub fn quantum(turn_span: f64) -> f64 {
    turn_span / FRACTION_STEPS
}

/// Whole degrees, minutes and seconds of `|value|`, rounded to the
/// nearest second
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Sexagesimal {
    pub degrees: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub negative: bool,
}

impl Sexagesimal {
    /// Split an angle; fails if the whole part doesn't fit a byte
    pub fn from_degrees(value: f64) -> Option<Self> {
        let total = (value.abs() * 3600.0).round() as u64;
        let degrees = u8::try_from(total / 3600).ok()?;
        Some(Self {
            degrees,
            minutes: ((total % 3600) / 60) as u8,
            seconds: (total % 60) as u8,
            negative: value < 0.0 && total != 0,
        })
    }

    pub fn to_degrees(self) -> f64 {
        let abs = f64::from(self.degrees)
            + f64::from(self.minutes) / 60.0
            + f64::from(self.seconds) / 3600.0;
        if self.negative {
            -abs
        } else {
            abs
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Shortest distance between two positions on a circle of `span`
    fn circular_diff(a: f64, b: f64, span: f64) -> f64 {
        let d = (a - b).rem_euclid(span);
        d.min(span - d)
    }

    #[test]
    fn ra_round_trip_within_one_step() {
        for ra in [0.0, 0.5, 1.234_567, 6.0, 11.999, 12.5, 18.75, 23.95] {
            let back = ra_from_fraction(ra_fraction(ra));
            assert!(
                circular_diff(back, ra, RA_SPAN) <= quantum(RA_SPAN),
                "{ra} -> {back}"
            );
        }
    }

    #[test]
    fn dec_round_trip_within_one_step() {
        for dec in [-90.0, -45.5, -0.001, 0.0, 10.0, 45.0, 89.99, 90.0] {
            let back = dec_from_fraction(dec_fraction(dec));
            assert!((back - dec).abs() <= quantum(DEC_SPAN), "{dec} -> {back}");
        }
    }

    #[test]
    fn full_turn_wraps_to_zero() {
        assert_eq!(encode_fraction(24.0, RA_SPAN), encode_fraction(0.0, RA_SPAN));
        assert_eq!(encode_fraction(-90.0, DEC_SPAN), encode_fraction(270.0, DEC_SPAN));
        assert_eq!(encode_fraction(-90.0, DEC_SPAN), 0xC000);
        assert_eq!(encode_fraction(48.5, RA_SPAN), encode_fraction(0.5, RA_SPAN));
        // just short of a full turn rounds up onto zero
        assert_eq!(encode_fraction(23.999_999, RA_SPAN), 0);
    }

    #[test]
    fn known_fractions() {
        assert_eq!(ra_fraction(12.0), 0x8000);
        assert_eq!(ra_fraction(6.0), 0x4000);
        assert_eq!(dec_fraction(45.0), 0x2000);
        assert_eq!(ra_from_fraction(0x8000), 12.0);
        assert_eq!(dec_from_fraction(0xE000), -45.0);
    }

    #[test]
    fn dec_past_pole_folds_back() {
        // 100° on the circle is 80° on the far side of the pole
        let frac = encode_fraction(100.0, DEC_SPAN);
        assert!((dec_from_fraction(frac) - 80.0).abs() <= quantum(DEC_SPAN));
    }

    #[test]
    fn sexagesimal_split() {
        let s = Sexagesimal::from_degrees(-33.8675).unwrap();
        assert_eq!(
            s,
            Sexagesimal {
                degrees: 33,
                minutes: 52,
                seconds: 3,
                negative: true
            }
        );
        assert!((s.to_degrees() + 33.8675).abs() < 1.0 / 3600.0);

        // sign survives a zero whole-degree part
        let s = Sexagesimal::from_degrees(-0.5).unwrap();
        assert_eq!(s.degrees, 0);
        assert!(s.negative);

        assert!(Sexagesimal::from_degrees(300.0).is_none());
    }
}
