//! Fixed-point values and the host's binary decimal layout.
//!
//! The binary image splits the integer and fractional digits into groups of
//! nine, each stored as a 4-byte big-endian word. Leftover digits take the
//! smallest number of bytes able to hold them. Negative values are stored
//! bit-inverted and the top bit of the first byte is flipped, which makes the
//! images of one `(precision, scale)` compare like the numbers they encode.

use std::{fmt, str::FromStr};

use super::CodecError;

/// Largest precision the host supports.
pub const MAX_PRECISION: u32 = 65;
/// Largest scale the host supports.
pub const MAX_SCALE: u32 = 30;

const DIGITS_PER_WORD: usize = 9;
const WORD_BYTES: usize = 4;
const DIG2BYTES: [usize; DIGITS_PER_WORD + 1] = [0, 1, 1, 2, 2, 3, 3, 4, 4, 4];

/// Reject precision/scale pairs the binary layout cannot carry.
pub fn check_bounds(precision: u32, scale: u32) -> Result<(), CodecError> {
    if precision == 0 || precision > MAX_PRECISION || scale > MAX_SCALE || scale > precision {
        return Err(CodecError::DecimalBounds { precision, scale });
    }
    Ok(())
}

/// Width in bytes of the binary image for `(precision, scale)`.
pub fn bin_size(precision: u32, scale: u32) -> usize {
    let intg = (precision - scale) as usize;
    let frac = scale as usize;
    part_size(intg) + part_size(frac)
}

fn part_size(digits: usize) -> usize {
    (digits / DIGITS_PER_WORD) * WORD_BYTES + DIG2BYTES[digits % DIGITS_PER_WORD]
}

/// An exact decimal number.
///
/// Values are kept normalized (no leading integer zeros, no trailing
/// fractional zeros, no negative zero) so equality is numeric equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    negative: bool,
    integer: String,
    fraction: String,
}

impl Decimal {
    /// The value zero.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Parse a literal such as `-12.340`.
    pub fn parse(literal: &str) -> Result<Self, CodecError> {
        let invalid = || CodecError::InvalidDecimal(format!("`{literal}` is not a decimal"));

        let (negative, unsigned) = match literal.as_bytes().first() {
            Some(b'-') => (true, &literal[1..]),
            Some(b'+') => (false, &literal[1..]),
            _ => (false, literal),
        };
        let (integer, fraction) = match unsigned.split_once('.') {
            Some((integer, fraction)) => (integer, fraction),
            None => (unsigned, ""),
        };
        if integer.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !integer.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        Ok(Self::normalized(negative, integer, fraction))
    }

    fn normalized(negative: bool, integer: &str, fraction: &str) -> Self {
        let integer = integer.trim_start_matches('0').to_string();
        let fraction = fraction.trim_end_matches('0').to_string();
        let negative = negative && !(integer.is_empty() && fraction.is_empty());
        Self {
            negative,
            integer,
            fraction,
        }
    }

    /// Whether the value is below zero.
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Whether the value is zero.
    pub fn is_zero(&self) -> bool {
        self.integer.is_empty() && self.fraction.is_empty()
    }

    /// Encode into the host's binary layout for `(precision, scale)`.
    pub fn to_bin(&self, precision: u32, scale: u32) -> Result<Vec<u8>, CodecError> {
        check_bounds(precision, scale)?;
        let intg = (precision - scale) as usize;
        let frac = scale as usize;
        if self.integer.len() > intg {
            return Err(CodecError::InvalidDecimal(format!(
                "{self} has more than {intg} integer digits"
            )));
        }
        if self.fraction.len() > frac {
            return Err(CodecError::InvalidDecimal(format!(
                "{self} has more than {frac} fractional digits"
            )));
        }

        let mut integer = vec![b'0'; intg - self.integer.len()];
        integer.extend_from_slice(self.integer.as_bytes());
        let mut fraction = self.fraction.as_bytes().to_vec();
        fraction.resize(frac, b'0');

        let mut out = Vec::with_capacity(bin_size(precision, scale));
        let lead = intg % DIGITS_PER_WORD;
        push_group(&mut out, &integer[..lead], DIG2BYTES[lead]);
        for word in integer[lead..].chunks(DIGITS_PER_WORD) {
            push_group(&mut out, word, WORD_BYTES);
        }
        for word in fraction.chunks(DIGITS_PER_WORD) {
            let width = if word.len() == DIGITS_PER_WORD {
                WORD_BYTES
            } else {
                DIG2BYTES[word.len()]
            };
            push_group(&mut out, word, width);
        }

        if self.negative {
            out.iter_mut().for_each(|b| *b = !*b);
        }
        out[0] ^= 0x80;
        Ok(out)
    }

    /// Decode the host's binary layout for `(precision, scale)`.
    pub fn from_bin(bytes: &[u8], precision: u32, scale: u32) -> Result<Self, CodecError> {
        check_bounds(precision, scale)?;
        let expected = bin_size(precision, scale);
        if bytes.len() != expected {
            return Err(CodecError::InvalidDecimal(format!(
                "binary image must be {expected} bytes, found {}",
                bytes.len()
            )));
        }

        let mut image = bytes.to_vec();
        let negative = image[0] & 0x80 == 0;
        image[0] ^= 0x80;
        if negative {
            image.iter_mut().for_each(|b| *b = !*b);
        }

        let intg = (precision - scale) as usize;
        let frac = scale as usize;
        let mut reader = GroupReader {
            image: &image,
            offset: 0,
        };

        let mut integer = String::with_capacity(intg);
        let lead = intg % DIGITS_PER_WORD;
        reader.read(lead, DIG2BYTES[lead], &mut integer)?;
        for _ in 0..intg / DIGITS_PER_WORD {
            reader.read(DIGITS_PER_WORD, WORD_BYTES, &mut integer)?;
        }

        let mut fraction = String::with_capacity(frac);
        for _ in 0..frac / DIGITS_PER_WORD {
            reader.read(DIGITS_PER_WORD, WORD_BYTES, &mut fraction)?;
        }
        let tail = frac % DIGITS_PER_WORD;
        reader.read(tail, DIG2BYTES[tail], &mut fraction)?;

        Ok(Self::normalized(negative, &integer, &fraction))
    }
}

fn push_group(out: &mut Vec<u8>, digits: &[u8], width: usize) {
    if width == 0 {
        return;
    }
    let value = digits
        .iter()
        .fold(0u32, |acc, digit| acc * 10 + u32::from(digit - b'0'));
    out.extend_from_slice(&value.to_be_bytes()[WORD_BYTES - width..]);
}

struct GroupReader<'a> {
    image: &'a [u8],
    offset: usize,
}

impl GroupReader<'_> {
    fn read(&mut self, digits: usize, width: usize, out: &mut String) -> Result<(), CodecError> {
        if width == 0 {
            return Ok(());
        }
        let mut word = [0u8; WORD_BYTES];
        word[WORD_BYTES - width..].copy_from_slice(&self.image[self.offset..self.offset + width]);
        self.offset += width;

        let value = u32::from_be_bytes(word);
        if u64::from(value) >= 10u64.pow(digits as u32) {
            return Err(CodecError::InvalidDecimal(format!(
                "group value {value} exceeds {digits} digits"
            )));
        }
        out.push_str(&format!("{value:0digits$}"));
        Ok(())
    }
}

impl FromStr for Decimal {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::parse(s)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        if self.integer.is_empty() {
            f.write_str("0")?;
        } else {
            f.write_str(&self.integer)?;
        }
        if !self.fraction.is_empty() {
            write!(f, ".{}", self.fraction)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(literal: &str) -> Decimal {
        Decimal::parse(literal).unwrap()
    }

    #[test]
    fn parse_normalizes() {
        assert_eq!(dec("007.500").to_string(), "7.5");
        assert_eq!(dec("-0.000"), Decimal::zero());
        assert_eq!(dec(".25").to_string(), "0.25");
        assert!(Decimal::parse("").is_err());
        assert!(Decimal::parse("1.2.3").is_err());
        assert!(Decimal::parse("-").is_err());
    }

    #[test]
    fn matches_host_reference_image() {
        // 1234567890.1234 as DECIMAL(14,4)
        assert_eq!(
            dec("1234567890.1234").to_bin(14, 4).unwrap(),
            vec![0x81, 0x0D, 0xFB, 0x38, 0xD2, 0x04, 0xD2]
        );
        // -1234567890.1234 as DECIMAL(14,4)
        assert_eq!(
            dec("-1234567890.1234").to_bin(14, 4).unwrap(),
            vec![0x7E, 0xF2, 0x04, 0xC7, 0x2D, 0xFB, 0x2D]
        );
    }

    #[test]
    fn bin_round_trips_extremes() {
        let max = format!("{}.{}", "9".repeat(35), "9".repeat(30));
        for (literal, precision, scale) in [
            ("0", 1, 0),
            ("9", 1, 0),
            ("-9", 1, 0),
            ("0.1", 1, 1),
            ("123456789.987654321", 18, 9),
            ("-99999.99", 7, 2),
            (max.as_str(), 65, 30),
        ] {
            let value = dec(literal);
            let image = value.to_bin(precision, scale).unwrap();
            assert_eq!(image.len(), bin_size(precision, scale));
            assert_eq!(Decimal::from_bin(&image, precision, scale).unwrap(), value);
        }
    }

    #[test]
    fn images_order_like_numbers() {
        let ordered = ["-1000.5", "-999.99", "-1", "-0.01", "0", "0.01", "1", "999.99", "1000.5"];
        let images: Vec<Vec<u8>> = ordered
            .iter()
            .map(|literal| dec(literal).to_bin(10, 2).unwrap())
            .collect();
        assert!(images.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn rejects_values_that_do_not_fit() {
        assert!(dec("100").to_bin(4, 2).is_err());
        assert!(dec("1.234").to_bin(4, 2).is_err());
        assert_eq!(
            dec("1").to_bin(66, 0).unwrap_err(),
            CodecError::DecimalBounds {
                precision: 66,
                scale: 0
            }
        );
        assert!(Decimal::from_bin(&[0x80], 4, 2).is_err());
    }
}
