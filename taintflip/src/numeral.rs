//! ASCII numerals, as read by `strtoul` and friends and as written back into the input.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The bases a numeral can be re-encoded in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum NumeralBase {
    /// base 2
    Binary = 2,
    /// base 8
    Octal = 8,
    /// base 10
    Decimal = 10,
    /// base 16
    Hexadecimal = 16,
}

/// A numeral as found in the input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedNumeral {
    /// The parsed value; a leading `-` negates it modulo 2^64
    pub value: u64,
    /// The text started with `-`
    pub negative: bool,
}

/// Parses `text` the way `strtoul` does.
///
/// Leading whitespace and one `+` or `-` are accepted, as is a `0x` prefix in base 16. Parsing stops at the first
/// byte that is not a digit of `base`. Values that do not fit saturate to [`u64::MAX`].
#[must_use]
pub fn parse_numeral(text: &[u8], base: NumeralBase) -> ParsedNumeral {
    let radix: u32 = base.into();
    let negative = text.first() == Some(&b'-');

    let mut rest = text;
    while let [c, tail @ ..] = rest {
        if !matches!(c, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r') {
            break;
        }
        rest = tail;
    }
    let mut minus = false;
    if let [sign @ (b'+' | b'-'), tail @ ..] = rest {
        minus = *sign == b'-';
        rest = tail;
    }
    if base == NumeralBase::Hexadecimal {
        if let [b'0', b'x' | b'X', digit, ..] = rest {
            if digit.is_ascii_hexdigit() {
                rest = &rest[2..];
            }
        }
    }

    let mut value = 0_u64;
    let mut overflow = false;
    for digit in rest.iter().map_while(|c| char::from(*c).to_digit(radix)) {
        match value
            .checked_mul(u64::from(radix))
            .and_then(|v| v.checked_add(u64::from(digit)))
        {
            Some(v) => value = v,
            None => overflow = true,
        }
    }

    let value = if overflow {
        u64::MAX
    } else if minus {
        value.wrapping_neg()
    } else {
        value
    };
    ParsedNumeral { value, negative }
}

/// Formats `value` in `base`. Only decimal numerals are printed signed, and only if `signed` is set.
#[must_use]
pub fn format_numeral(value: u64, base: NumeralBase, signed: bool) -> String {
    match base {
        NumeralBase::Binary => format!("{value:b}"),
        NumeralBase::Octal => format!("{value:o}"),
        NumeralBase::Decimal if signed => format!("{}", value as i64),
        NumeralBase::Decimal => format!("{value}"),
        NumeralBase::Hexadecimal => format!("{value:x}"),
    }
}
