//! A 128-bit decimal fixed point value with multiple wire representations.

use std::fmt;
use std::str::FromStr;

use crate::bson::Bson;
use crate::error::{Error, Result};
use crate::options::RepresentationOptions;
use crate::spec::ElementType;

const POW10: [u128; 29] = {
    let mut table = [1u128; 29];
    let mut i = 1;
    while i < 29 {
        table[i] = table[i - 1] * 10;
        i += 1;
    }
    table
};

/// A high-precision decimal value: a sign, a 96-bit integer mantissa and a
/// decimal scale in `0..=28`. The represented value is
/// `(-1)^sign * mantissa * 10^-scale`.
///
/// The in-memory layout is bit-compatible with the four 32-bit word wire form
/// (see [`Decimal128::bits`]): words 0..=2 hold the mantissa, word 3 holds the
/// scale in bits 16-23 and the sign in bit 31.
///
/// `Decimal128` has no dedicated element type on the wire; it is encoded as an
/// array of words, a double, an integer or a string depending on
/// [`RepresentationOptions`](crate::RepresentationOptions).
#[derive(Clone, Copy)]
pub struct Decimal128 {
    negative: bool,
    scale: u8,
    mantissa: u128,
}

impl Decimal128 {
    /// The largest supported scale.
    pub const MAX_SCALE: u8 = 28;

    /// The largest supported mantissa (2^96 - 1).
    pub const MAX_MANTISSA: u128 = (1 << 96) - 1;

    /// Zero with scale 0.
    pub const ZERO: Decimal128 = Decimal128 {
        negative: false,
        scale: 0,
        mantissa: 0,
    };

    /// Construct a decimal from its parts. Fails if the mantissa exceeds 96
    /// bits or the scale exceeds [`MAX_SCALE`](Decimal128::MAX_SCALE).
    pub fn from_parts(negative: bool, mantissa: u128, scale: u8) -> Result<Self> {
        if mantissa > Self::MAX_MANTISSA {
            return Err(Error::argument("decimal mantissa exceeds 96 bits"));
        }
        if scale > Self::MAX_SCALE {
            return Err(Error::argument(format!(
                "decimal scale {} exceeds maximum of {}",
                scale,
                Self::MAX_SCALE
            )));
        }
        Ok(Decimal128 {
            negative,
            scale,
            mantissa,
        })
    }

    /// Reassemble a decimal from its four 32-bit word form: words 0..=2 are the
    /// low, middle and high mantissa words, word 3 carries the scale (bits
    /// 16-23) and the sign (bit 31). All other bits of word 3 must be zero.
    pub fn from_bits(bits: [i32; 4]) -> Result<Self> {
        let flags = bits[3] as u32;
        if flags & 0x7F00_FFFF != 0 {
            return Err(Error::format(format!(
                "invalid decimal flags word {flags:#010x}"
            )));
        }
        let scale = ((flags >> 16) & 0xFF) as u8;
        if scale > Self::MAX_SCALE {
            return Err(Error::format(format!(
                "decimal scale {} exceeds maximum of {}",
                scale,
                Self::MAX_SCALE
            )));
        }
        let mantissa = (bits[0] as u32 as u128)
            | ((bits[1] as u32 as u128) << 32)
            | ((bits[2] as u32 as u128) << 64);
        Ok(Decimal128 {
            negative: flags >> 31 != 0,
            scale,
            mantissa,
        })
    }

    /// The four 32-bit word form of this decimal. See [`Decimal128::from_bits`].
    pub fn bits(&self) -> [i32; 4] {
        let mut flags = (self.scale as u32) << 16;
        if self.negative {
            flags |= 1 << 31;
        }
        [
            self.mantissa as u32 as i32,
            (self.mantissa >> 32) as u32 as i32,
            (self.mantissa >> 64) as u32 as i32,
            flags as i32,
        ]
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    pub fn is_negative(&self) -> bool {
        self.negative && self.mantissa != 0
    }

    /// The number of digits to the right of the decimal point.
    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Whether any significant digit sits to the right of the decimal point.
    pub fn has_fraction(&self) -> bool {
        self.mantissa % POW10[self.scale as usize] != 0
    }

    /// The integral part of this decimal, discarding any fraction.
    pub fn truncate(&self) -> Decimal128 {
        Decimal128 {
            negative: self.negative,
            scale: 0,
            mantissa: self.mantissa / POW10[self.scale as usize],
        }
    }

    /// Convert to an `i64`. Fails if the value has a fractional part or does
    /// not fit; no silent truncation.
    pub fn to_int64(&self) -> Result<i64> {
        if self.has_fraction() {
            return Err(Error::argument(format!(
                "decimal {self} has a fractional part"
            )));
        }
        let magnitude = self.mantissa / POW10[self.scale as usize];
        if self.negative {
            if magnitude > i64::MAX as u128 + 1 {
                return Err(Error::argument(format!("decimal {self} out of i64 range")));
            }
            Ok((magnitude as i128).wrapping_neg() as i64)
        } else {
            if magnitude > i64::MAX as u128 {
                return Err(Error::argument(format!("decimal {self} out of i64 range")));
            }
            Ok(magnitude as i64)
        }
    }

    /// Convert to an `i32`. Fails if the value has a fractional part or does
    /// not fit; no silent truncation.
    pub fn to_int32(&self) -> Result<i32> {
        let v = self.to_int64()?;
        i32::try_from(v).map_err(|_| Error::argument(format!("decimal {self} out of i32 range")))
    }

    /// Convert to the nearest `f64`. This conversion is inherently lossy for
    /// mantissas wider than 53 bits; callers choose it explicitly.
    pub fn to_double(&self) -> f64 {
        let magnitude = self.mantissa as f64 / POW10[self.scale as usize] as f64;
        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Convert from an `f64`, going through the shortest round-trippable
    /// decimal form. Fails on NaN, infinities and values outside the decimal
    /// range; never rounds silently.
    pub fn try_from_double(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::argument(format!(
                "cannot convert {value} to a decimal"
            )));
        }
        format!("{value}")
            .parse()
            .map_err(|_| Error::argument(format!("double {value} out of decimal range")))
    }

    /// Encode this decimal as the `Bson` value dictated by
    /// `options.decimal_representation`.
    pub fn to_bson(&self, options: &RepresentationOptions) -> Result<Bson> {
        match options.decimal_representation {
            ElementType::Array => Ok(Bson::Array(
                self.bits().iter().map(|&w| Bson::Int32(w)).collect(),
            )),
            ElementType::Double => Ok(Bson::Double(self.to_double())),
            ElementType::Int32 => {
                let v = if options.allow_truncation {
                    self.truncate()
                } else {
                    *self
                };
                v.to_int32().map(Bson::Int32)
            }
            ElementType::Int64 => {
                let v = if options.allow_truncation {
                    self.truncate()
                } else {
                    *self
                };
                v.to_int64().map(Bson::Int64)
            }
            ElementType::String => Ok(Bson::String(self.to_string())),
            other => Err(Error::serialization(format!(
                "{other} is not a valid decimal representation"
            ))),
        }
    }

    /// Decode a decimal from whatever representation was actually found on the
    /// wire. Double and integer forms are narrowing conversions validated by
    /// the conversion helpers, never silent casts.
    pub fn from_bson(value: &Bson, _options: &RepresentationOptions) -> Result<Self> {
        match value {
            Bson::Array(words) => {
                if words.len() != 4 {
                    return Err(Error::format(format!(
                        "decimal word array has {} elements, expected 4",
                        words.len()
                    )));
                }
                let mut bits = [0i32; 4];
                for (i, word) in words.iter().enumerate() {
                    bits[i] = match word {
                        Bson::Int32(w) => *w,
                        other => {
                            return Err(Error::unexpected_type(other.type_name(), "int"));
                        }
                    };
                }
                Self::from_bits(bits)
            }
            Bson::Double(d) => {
                Self::try_from_double(*d).map_err(|e| Error::format(e.kind.to_string()))
            }
            Bson::Int32(v) => Ok(Self::from(*v)),
            Bson::Int64(v) => Ok(Self::from(*v)),
            Bson::String(s) => s
                .parse()
                .map_err(|e: Error| Error::format(e.kind.to_string())),
            other => Err(Error::unexpected_type(other.type_name(), "decimal")),
        }
    }
}

impl From<i32> for Decimal128 {
    fn from(value: i32) -> Self {
        Decimal128 {
            negative: value < 0,
            scale: 0,
            mantissa: value.unsigned_abs() as u128,
        }
    }
}

impl From<i64> for Decimal128 {
    fn from(value: i64) -> Self {
        Decimal128 {
            negative: value < 0,
            scale: 0,
            mantissa: value.unsigned_abs() as u128,
        }
    }
}

impl From<u32> for Decimal128 {
    fn from(value: u32) -> Self {
        Decimal128 {
            negative: false,
            scale: 0,
            mantissa: value as u128,
        }
    }
}

impl Default for Decimal128 {
    fn default() -> Self {
        Decimal128::ZERO
    }
}

fn normalized(d: &Decimal128) -> (bool, u8, u128) {
    let mut mantissa = d.mantissa;
    let mut scale = d.scale;
    while scale > 0 && mantissa % 10 == 0 {
        mantissa /= 10;
        scale -= 1;
    }
    (d.is_negative(), scale, mantissa)
}

// Numeric equality: trailing zeros and the sign of zero are insignificant.
impl PartialEq for Decimal128 {
    fn eq(&self, other: &Self) -> bool {
        normalized(self) == normalized(other)
    }
}

impl Eq for Decimal128 {}

impl FromStr for Decimal128 {
    type Err = Error;

    /// Parse a plain or exponent decimal form, e.g. `1.5`, `-0.25`, `.5`,
    /// `017.`, `4E+9`, `0.73e-7`.
    fn from_str(s: &str) -> Result<Decimal128> {
        let bad = || Error::argument(format!("\"{s}\" is not a valid decimal"));

        let rest = s.trim();
        let (negative, rest) = match rest.as_bytes().first() {
            Some(b'-') => (true, &rest[1..]),
            Some(b'+') => (false, &rest[1..]),
            _ => (false, rest),
        };

        let (digits, exponent) = match rest.split_once(['e', 'E']) {
            Some((digits, exp)) => (digits, exp.parse::<i32>().map_err(|_| bad())?),
            None => (rest, 0),
        };

        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(bad());
        }

        let mut mantissa: u128 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            if !b.is_ascii_digit() {
                return Err(bad());
            }
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add((b - b'0') as u128))
                .filter(|&m| m <= Decimal128::MAX_MANTISSA)
                .ok_or_else(|| Error::argument(format!("\"{s}\" exceeds the decimal range")))?;
        }

        let mut scale = frac_part.len() as i32 - exponent;
        if scale < 0 {
            while scale < 0 {
                mantissa = mantissa
                    .checked_mul(10)
                    .filter(|&m| m <= Decimal128::MAX_MANTISSA)
                    .ok_or_else(|| Error::argument(format!("\"{s}\" exceeds the decimal range")))?;
                scale += 1;
            }
        }
        while scale > Decimal128::MAX_SCALE as i32 && mantissa % 10 == 0 && mantissa != 0 {
            mantissa /= 10;
            scale -= 1;
        }
        if scale > Decimal128::MAX_SCALE as i32 {
            if mantissa == 0 {
                scale = Decimal128::MAX_SCALE as i32;
            } else {
                return Err(Error::argument(format!(
                    "\"{s}\" exceeds the maximum decimal scale"
                )));
            }
        }

        Decimal128::from_parts(negative, mantissa, scale as u8)
    }
}

impl fmt::Display for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative && self.mantissa != 0 {
            f.write_str("-")?;
        }
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let digits = format!("{:0>width$}", self.mantissa, width = self.scale as usize + 1);
        let split = digits.len() - self.scale as usize;
        write!(f, "{}.{}", &digits[..split], &digits[split..])
    }
}

impl fmt::Debug for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal128(\"{self}\")")
    }
}
