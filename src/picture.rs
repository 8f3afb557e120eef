// SPDX-License-Identifier: GPL-3.0-or-later

/*
 *  src/picture.rs - Picture clause interpreter for CNAB fields.
 *  Copyright (C) 2026  Forest Crossman <cyrozap@gmail.com>
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

/*!
 * # `picture` Module
 *
 * Every CNAB field is described by a COBOL-style picture clause:
 *
 * * `9(n)` - an unsigned integer, zero-padded on the left to `n` digits.
 * * `9(n)V9(m)` - a fixed-point number with `m` implied decimal places. The
 *   decimal point is never written to the file.
 * * `X(n)` - text, left-aligned and padded with spaces on the right.
 *
 * Repeated symbols are accepted as shorthand, so `999`, `9(3)V99` and `XX`
 * are all valid.
 *
 * ## Usage Example
 *
 * ```
 * use cnabparser::picture::{CodecOptions, Picture, Value};
 *
 * let options = CodecOptions::default();
 * let picture: Picture = "9(5)V9(2)".parse().unwrap();
 *
 * let value = picture.decode("0012345", "valor", &options).unwrap();
 * assert_eq!(value.to_string(), "123.45");
 *
 * let raw = picture.encode(&value, "valor", &options).unwrap();
 * assert_eq!(raw, "0012345");
 * ```
 */

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::trace;

use crate::error::{Error, Result};

/// Largest digit count an integer picture may declare (fits in a `u128`).
const MAX_INTEGER_DIGITS: usize = 38;

/// Largest digit count a picture with implied decimals may declare (fits in
/// a `Decimal` mantissa).
const MAX_DECIMAL_DIGITS: usize = 28;

/// What to do with a numeric slot holding something other than digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumericDecodePolicy {
    /// Treat the slot as zero. Blank numeric fields are common in real files.
    #[default]
    CoerceInvalidToZero,
    /// Fail the decode with [Error::NonNumeric].
    Strict,
}

/// What to do with text longer than its `X(n)` slot on encode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextOverflowPolicy {
    /// Keep the first `n` characters and drop the rest.
    #[default]
    Truncate,
    /// Fail the encode with [Error::ValueTooWide].
    Reject,
}

/// Lossy-behavior switches shared by every decode and encode call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecOptions {
    pub numeric: NumericDecodePolicy,
    pub overflow: TextOverflowPolicy,
}

impl CodecOptions {
    /// Options that reject malformed numbers and oversized text.
    pub fn strict() -> Self {
        Self {
            numeric: NumericDecodePolicy::Strict,
            overflow: TextOverflowPolicy::Reject,
        }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Content of a `9(n)` field.
    Integer(u128),
    /// Content of a `9(n)V9(m)` field, scaled by the implied decimals.
    Decimal(Decimal),
    /// Content of an `X(n)` field, without its trailing padding.
    Text(String),
}

impl Value {
    pub fn as_integer(&self) -> Option<u128> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Integer(n) => i128::try_from(*n)
                .ok()
                .and_then(|n| Decimal::try_from_i128_with_scale(n, 0).ok()),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// An empty value: encodes as zeros in numeric slots and spaces in text
    /// slots.
    pub fn blank() -> Self {
        Value::Text(String::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Integer(n.into())
    }
}

impl From<u128> for Value {
    fn from(n: u128) -> Self {
        Value::Integer(n)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

/// A parsed picture clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Picture {
    /// `9(digits)V9(decimals)`; `decimals` is zero for plain integers.
    Numeric { digits: usize, decimals: usize },
    /// `X(width)`.
    Alphanumeric { width: usize },
}

impl Picture {
    /// Number of columns the field occupies in a record.
    pub fn width(&self) -> usize {
        match self {
            Picture::Numeric { digits, decimals } => digits + decimals,
            Picture::Alphanumeric { width } => *width,
        }
    }

    /// Checks the limits of the underlying integer types: 38 digits for
    /// integers and 28 for implied-decimal numbers.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidPicture {
            picture: self.to_string(),
            reason: reason.to_string(),
        };
        match *self {
            Picture::Numeric { digits, decimals } => {
                if digits + decimals == 0 {
                    return Err(invalid("empty picture"));
                }
                if decimals == 0 && digits > MAX_INTEGER_DIGITS {
                    return Err(invalid("too many digits"));
                }
                if decimals > 0 && digits + decimals > MAX_DECIMAL_DIGITS {
                    return Err(invalid("too many digits for a decimal"));
                }
            }
            Picture::Alphanumeric { width } => {
                if width == 0 {
                    return Err(invalid("empty picture"));
                }
            }
        }
        Ok(())
    }

    /// Converts a raw slice of exactly [Picture::width] characters into a
    /// value. `field` is only used for error reporting.
    pub fn decode(&self, raw: &str, field: &str, options: &CodecOptions) -> Result<Value> {
        match self {
            Picture::Alphanumeric { .. } => Ok(Value::Text(raw.trim_end_matches(' ').to_string())),
            Picture::Numeric { decimals, .. } => {
                let n = if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
                    // At most 38 digits, so this always fits.
                    raw.parse::<u128>().map_err(|_| Error::NonNumeric {
                        field: field.to_string(),
                        raw: raw.to_string(),
                    })?
                } else {
                    match options.numeric {
                        NumericDecodePolicy::CoerceInvalidToZero => {
                            trace!(field, raw, "coercing non-numeric content to zero");
                            0
                        }
                        NumericDecodePolicy::Strict => {
                            return Err(Error::NonNumeric {
                                field: field.to_string(),
                                raw: raw.to_string(),
                            });
                        }
                    }
                };

                if *decimals == 0 {
                    Ok(Value::Integer(n))
                } else {
                    let mantissa = i128::try_from(n).map_err(|_| Error::NonNumeric {
                        field: field.to_string(),
                        raw: raw.to_string(),
                    })?;
                    Decimal::try_from_i128_with_scale(mantissa, *decimals as u32)
                        .map(Value::Decimal)
                        .map_err(|e| Error::InvalidPicture {
                            picture: self.to_string(),
                            reason: e.to_string(),
                        })
                }
            }
        }
    }

    /// Renders a value into exactly [Picture::width] characters.
    pub fn encode(&self, value: &Value, field: &str, options: &CodecOptions) -> Result<String> {
        match self {
            Picture::Alphanumeric { width } => {
                let text = value.to_string();
                let text = if text.chars().count() > *width {
                    match options.overflow {
                        TextOverflowPolicy::Truncate => {
                            trace!(field, width, "truncating text value");
                            text.chars().take(*width).collect()
                        }
                        TextOverflowPolicy::Reject => {
                            return Err(Error::ValueTooWide {
                                field: field.to_string(),
                                width: *width,
                                value: text,
                            });
                        }
                    }
                } else {
                    text
                };
                Ok(format!("{:<width$}", text, width = *width))
            }
            Picture::Numeric { decimals, .. } => {
                let width = self.width();
                let digits = self.scaled_digits(value, *decimals, field)?.to_string();
                if digits.len() > width {
                    return Err(Error::ValueTooWide {
                        field: field.to_string(),
                        width,
                        value: value.to_string(),
                    });
                }
                Ok(format!("{:0>width$}", digits, width = width))
            }
        }
    }

    /// The unsigned integer written to the file for `value`, i.e. the value
    /// multiplied by `10^decimals`.
    fn scaled_digits(&self, value: &Value, decimals: usize, field: &str) -> Result<u128> {
        let too_wide = || Error::ValueTooWide {
            field: field.to_string(),
            width: self.width(),
            value: value.to_string(),
        };
        let invalid = || Error::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        };

        let scale_integer = |n: u128| {
            10u128
                .checked_pow(decimals as u32)
                .and_then(|factor| n.checked_mul(factor))
                .ok_or_else(too_wide)
        };

        let scale_decimal = |d: Decimal| -> Result<u128> {
            if d.is_sign_negative() && !d.is_zero() {
                return Err(invalid());
            }
            let mut rounded =
                d.round_dp_with_strategy(decimals as u32, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(decimals as u32);
            // rescale lowers the scale instead of failing when the mantissa
            // would overflow 96 bits.
            if rounded.scale() != decimals as u32 {
                return Err(too_wide());
            }
            u128::try_from(rounded.mantissa()).map_err(|_| invalid())
        };

        match value {
            Value::Integer(n) => scale_integer(*n),
            Value::Decimal(d) => scale_decimal(*d),
            Value::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    Ok(0)
                } else if s.bytes().all(|b| b.is_ascii_digit()) {
                    scale_integer(s.parse::<u128>().map_err(|_| too_wide())?)
                } else {
                    let d = Decimal::from_str(s.replace(',', ".").as_str()).map_err(|_| invalid())?;
                    scale_decimal(d)
                }
            }
        }
    }
}

impl fmt::Display for Picture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Picture::Numeric {
                digits,
                decimals: 0,
            } => write!(f, "9({})", digits),
            Picture::Numeric { digits, decimals } => write!(f, "9({})V9({})", digits, decimals),
            Picture::Alphanumeric { width } => write!(f, "X({})", width),
        }
    }
}

impl FromStr for Picture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidPicture {
            picture: s.to_string(),
            reason: reason.to_string(),
        };

        let text = s.trim().to_ascii_uppercase();

        if text.starts_with('X') {
            let (width, rest) = parse_run(&text, 'X').ok_or_else(|| invalid("bad X run"))?;
            if !rest.is_empty() {
                return Err(invalid("trailing characters"));
            }
            return Ok(Picture::Alphanumeric { width });
        }

        if !text.starts_with('9') {
            return Err(invalid("must start with 9 or X"));
        }

        let (digits, rest) = parse_run(&text, '9').ok_or_else(|| invalid("bad 9 run"))?;
        let decimals = if rest.is_empty() {
            0
        } else {
            let rest = rest
                .strip_prefix('V')
                .ok_or_else(|| invalid("trailing characters"))?;
            let (decimals, rest) =
                parse_run(rest, '9').ok_or_else(|| invalid("bad decimal run"))?;
            if !rest.is_empty() {
                return Err(invalid("trailing characters"));
            }
            decimals
        };

        let picture = Picture::Numeric { digits, decimals };
        picture.validate()?;
        Ok(picture)
    }
}

/// Consumes a run of `symbol`, either repeated (`999`) or counted (`9(3)`),
/// or any mix of both. Returns the total count and the unparsed remainder.
fn parse_run(s: &str, symbol: char) -> Option<(usize, &str)> {
    let mut count = 0usize;
    let mut rest = s;

    while let Some(after) = rest.strip_prefix(symbol) {
        if let Some(inner) = after.strip_prefix('(') {
            let close = inner.find(')')?;
            let n: usize = inner[..close].trim().parse().ok()?;
            count = count.checked_add(n)?;
            rest = &inner[close + 1..];
        } else {
            count += 1;
            rest = after;
        }
    }

    (count > 0).then_some((count, rest))
}
