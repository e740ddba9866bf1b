//! Binary formatting: raw register and memory bytes to display strings.
//!
//! Everything here works on byte slices, never on pre-decoded integers.
//! The snapshot wire format hands us little-endian bytes; core dumps from
//! other machines may be big-endian, so every decoder is
//! endianness-parameterized.
//!
//! Decimal rendering of 64- and 128-bit fields goes through a base-10000
//! limb algorithm instead of float conversion, so no value ever loses
//! precision. 80-bit x87 extended floats are decoded by hand since Rust
//! has no native f80.

use std::fmt;

/// Byte order of the buffer being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signedness {
    Unsigned,
    Signed,
}

/// Integer field width in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
    W128,
}

impl Width {
    pub fn bits(self) -> usize {
        match self {
            Width::W8 => 8,
            Width::W16 => 16,
            Width::W32 => 32,
            Width::W64 => 64,
            Width::W128 => 128,
        }
    }

    pub fn bytes(self) -> usize {
        self.bits() / 8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Binary,
    Octal,
    Decimal,
    Hexadecimal,
}

impl Radix {
    /// Digits needed to render a full field of `bits` bits, for padding.
    pub fn digits_for(self, bits: usize) -> usize {
        match self {
            Radix::Binary => bits,
            Radix::Octal => bits.div_ceil(3),
            Radix::Decimal => 0,
            Radix::Hexadecimal => bits.div_ceil(4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    F32,
    F64,
    /// x87 double extended precision.
    F80,
}

impl FloatWidth {
    pub fn bytes(self) -> usize {
        match self {
            FloatWidth::F32 => 4,
            FloatWidth::F64 => 8,
            FloatWidth::F80 => 10,
        }
    }
}

/// Formatting error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("read of {len} bytes at offset {offset} is out of bounds ({available} available)")]
    OutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },
    #[error("unsupported memory format {kind:?} with size {size}")]
    UnsupportedMemoryFormat { kind: char, size: usize },
    #[error("unknown register {0:?}")]
    UnknownRegister(String),
}

/// Slice a fixed-size field out of a buffer, or fail with a descriptive
/// error.
pub fn field(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8], FormatError> {
    bytes
        .get(offset..offset + len)
        .ok_or(FormatError::OutOfBounds {
            offset,
            len,
            available: bytes.len(),
        })
}

// ═══════════════════════════════════════════════════════════════════════
// Integers
// ═══════════════════════════════════════════════════════════════════════

/// Format an integer field of 1, 2, 4, 8, or 16 bytes.
///
/// The result has no radix prefix and no padding; see
/// [`FormatSpec::decode`] for the decorated form.
pub fn format_integer(
    bytes: &[u8],
    offset: usize,
    endianness: Endianness,
    signedness: Signedness,
    width: Width,
    radix: Radix,
) -> Result<String, FormatError> {
    let field = field(bytes, offset, width.bytes())?;
    Ok(match signedness {
        Signedness::Unsigned => format_unsigned(field, endianness, radix),
        Signedness::Signed => format_signed(field, endianness, radix),
    })
}

fn format_unsigned(field: &[u8], endianness: Endianness, radix: Radix) -> String {
    if radix == Radix::Decimal && field.len() >= 8 {
        return format_big_decimal(field, endianness);
    }
    let n = assemble_u128(field, endianness);
    render_radix(n, radix)
}

/// Negative values render as a minus sign followed by the magnitude, in
/// every radix. The magnitude of the most negative value is computed by
/// two's complement negation of the raw bytes, which is exact at any
/// width.
fn format_signed(field: &[u8], endianness: Endianness, radix: Radix) -> String {
    let sign_byte = match endianness {
        Endianness::Little => field[field.len() - 1],
        Endianness::Big => field[0],
    };
    if sign_byte & 0x80 == 0 {
        return format_unsigned(field, endianness, radix);
    }

    // Narrow fields fit a u128, so the magnitude is plain arithmetic.
    if field.len() < 8 {
        let raw = assemble_u128(field, endianness);
        let magnitude = (1u128 << (field.len() * 8)) - raw;
        return format!("-{}", render_radix(magnitude, radix));
    }

    let mut magnitude = match endianness {
        Endianness::Little => field.to_vec(),
        Endianness::Big => field.iter().rev().copied().collect(),
    };
    twos_complement_negate(&mut magnitude);
    format!(
        "-{}",
        format_unsigned(&magnitude, Endianness::Little, radix)
    )
}

/// In-place two's complement negation of a little-endian buffer, in
/// 32-bit word steps: invert every word, then propagate a carry of one
/// from the bottom.
fn twos_complement_negate(le_bytes: &mut [u8]) {
    debug_assert_eq!(le_bytes.len() % 4, 0);
    let mut carry = true;
    for chunk in le_bytes.chunks_exact_mut(4) {
        let mut word = !u32::from_le_bytes(chunk.try_into().unwrap());
        if carry {
            let (sum, overflow) = word.overflowing_add(1);
            word = sum;
            carry = overflow;
        }
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}

/// Decimal conversion via base-10000 limbs.
///
/// Feed the field in 16-bit limbs from most to least significant; each
/// limb multiplies the digit accumulator by 0x10000 and adds itself. The
/// accumulator holds base-10000 digits least significant first, so every
/// intermediate product fits comfortably in a u32.
fn format_big_decimal(field: &[u8], endianness: Endianness) -> String {
    let limbs = field.len() / 2;
    let mut digits: Vec<u32> = Vec::new();
    for i in 0..limbs {
        let mut carry = limb16(field, endianness, i) as u32;
        for digit in digits.iter_mut() {
            let acc = *digit * 0x10000 + carry;
            carry = acc / 10000;
            *digit = acc % 10000;
        }
        while carry != 0 {
            digits.push(carry % 10000);
            carry /= 10000;
        }
    }
    if digits.is_empty() {
        return "0".to_string();
    }

    let mut out = String::new();
    for (i, digit) in digits.iter().rev().enumerate() {
        if i == 0 {
            out.push_str(&digit.to_string());
        } else {
            out.push_str(&format!("{:04}", digit));
        }
    }
    out
}

/// The `i`-th 16-bit limb of a field, counting from the most significant.
fn limb16(field: &[u8], endianness: Endianness, i: usize) -> u16 {
    match endianness {
        Endianness::Big => u16::from_be_bytes([field[2 * i], field[2 * i + 1]]),
        Endianness::Little => {
            let at = field.len() - 2 * (i + 1);
            u16::from_le_bytes([field[at], field[at + 1]])
        }
    }
}

fn assemble_u128(field: &[u8], endianness: Endianness) -> u128 {
    let mut n = 0u128;
    match endianness {
        Endianness::Big => {
            for &b in field {
                n = (n << 8) | b as u128;
            }
        }
        Endianness::Little => {
            for &b in field.iter().rev() {
                n = (n << 8) | b as u128;
            }
        }
    }
    n
}

fn render_radix(n: u128, radix: Radix) -> String {
    match radix {
        Radix::Binary => format!("{:b}", n),
        Radix::Octal => format!("{:o}", n),
        Radix::Decimal => format!("{}", n),
        Radix::Hexadecimal => format!("{:x}", n),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Floats
// ═══════════════════════════════════════════════════════════════════════

fn render_f64(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v.is_sign_negative() {
            "-Infinity".to_string()
        } else {
            "Infinity".to_string()
        }
    } else if v == 0.0 && v.is_sign_negative() {
        "-0".to_string()
    } else {
        format!("{}", v)
    }
}

pub fn format_float32(
    bytes: &[u8],
    offset: usize,
    endianness: Endianness,
) -> Result<String, FormatError> {
    let f = field(bytes, offset, 4)?;
    let raw: [u8; 4] = f.try_into().unwrap();
    let v = match endianness {
        Endianness::Little => f32::from_le_bytes(raw),
        Endianness::Big => f32::from_be_bytes(raw),
    };
    Ok(render_f64(v as f64))
}

pub fn format_float64(
    bytes: &[u8],
    offset: usize,
    endianness: Endianness,
) -> Result<String, FormatError> {
    let f = field(bytes, offset, 8)?;
    let raw: [u8; 8] = f.try_into().unwrap();
    let v = match endianness {
        Endianness::Little => f64::from_le_bytes(raw),
        Endianness::Big => f64::from_be_bytes(raw),
    };
    Ok(render_f64(v))
}

/// Decode an x87 80-bit extended precision float to its nearest f64 and
/// render it.
///
/// The 80-bit format has an explicit integer bit at the top of the 64-bit
/// significand, which is why pseudo-denormals and unnormals exist at all.
/// Values whose exponent underflows f64's range collapse to signed zero;
/// overflow collapses to signed infinity.
pub fn format_float80(
    bytes: &[u8],
    offset: usize,
    endianness: Endianness,
) -> Result<String, FormatError> {
    let f = field(bytes, offset, 10)?;
    let (lo, hi, exponent, negative) = match endianness {
        Endianness::Little => (
            u32::from_le_bytes(f[0..4].try_into().unwrap()),
            u32::from_le_bytes(f[4..8].try_into().unwrap()),
            u16::from_le_bytes(f[8..10].try_into().unwrap()) & 0x7fff,
            f[9] & 0x80 != 0,
        ),
        Endianness::Big => (
            u32::from_be_bytes(f[6..10].try_into().unwrap()),
            u32::from_be_bytes(f[2..6].try_into().unwrap()),
            u16::from_be_bytes(f[0..2].try_into().unwrap()) & 0x7fff,
            f[0] & 0x80 != 0,
        ),
    };

    if exponent == 0x7fff {
        // Infinity if the significand minus its explicit integer bit is
        // zero, NaN otherwise (this also covers the pseudo variants).
        return Ok(if lo == 0 && hi & 0x7fff_ffff == 0 {
            if negative { "-Infinity" } else { "Infinity" }.to_string()
        } else {
            "NaN".to_string()
        });
    }

    if lo == 0 && hi == 0 {
        return Ok(if negative { "-0" } else { "0" }.to_string());
    }

    let mut unbiased = exponent as i32 - 0x3fff;
    let (mut hi, mut lo) = (hi, lo);
    // Normalize so the integer bit is set; denormals and unnormals shift
    // left with a matching exponent adjustment.
    if hi & 0x8000_0000 == 0 {
        if hi != 0 {
            let shift = hi.leading_zeros();
            hi = (hi << shift) | (lo >> (32 - shift));
            lo <<= shift;
            unbiased -= shift as i32;
        } else {
            let shift = lo.leading_zeros();
            hi = lo << shift;
            lo = 0;
            unbiased -= 32 + shift as i32;
        }
    }

    if unbiased < -0x3ff {
        return Ok(if negative { "-0" } else { "0" }.to_string());
    }
    if unbiased > 0x3ff {
        return Ok(if negative { "-Infinity" } else { "Infinity" }.to_string());
    }

    // Repack as an f64: drop the integer bit, keep the top 52 significand
    // bits, re-bias the exponent.
    let lo_bits = (hi & 0x7ff) * 0x20_0000 + (lo >> 11);
    let hi_bits = ((hi & 0x7fff_f800) >> 11)
        + (((unbiased + 0x3ff) as u32) << 20)
        + if negative { 0x8000_0000 } else { 0 };
    let bits = ((hi_bits as u64) << 32) | lo_bits as u64;
    Ok(render_f64(f64::from_bits(bits)))
}

// ═══════════════════════════════════════════════════════════════════════
// Characters
// ═══════════════════════════════════════════════════════════════════════

/// Which printable characters [`escape_char`] should escape anyway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscapeFlags {
    pub double_quote: bool,
    pub single_quote: bool,
    pub backslash: bool,
}

/// Render one byte the way it would appear in a C character literal.
///
/// Total over all 256 byte values: bytes with a canonical C escape use
/// it, printable ASCII passes through, and everything else becomes
/// `\xHH`.
pub fn escape_char(c: u8, flags: EscapeFlags) -> String {
    match c {
        0x00 => "\\0".to_string(),
        0x07 => "\\a".to_string(),
        0x08 => "\\b".to_string(),
        0x09 => "\\t".to_string(),
        0x0a => "\\n".to_string(),
        0x0b => "\\v".to_string(),
        0x0c => "\\f".to_string(),
        0x0d => "\\r".to_string(),
        0x22 if flags.double_quote => "\\\"".to_string(),
        0x27 if flags.single_quote => "\\'".to_string(),
        0x5c if flags.backslash => "\\\\".to_string(),
        0x20..=0x7e => (c as char).to_string(),
        _ => format!("\\x{:02x}", c),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Format specifications
// ═══════════════════════════════════════════════════════════════════════

/// What a field holds, for [`FormatSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Integer {
        signedness: Signedness,
        width: Width,
        radix: Radix,
    },
    Float(FloatWidth),
    Char,
}

/// A complete recipe for decoding one field: byte order plus shape.
///
/// Integer fields decode to the register display form: binary and hex
/// are zero-padded to the field width, octal additionally gets a `0`
/// prefix, hex gets `0x`, decimal is unpadded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub endianness: Endianness,
    pub kind: FormatKind,
}

impl FormatSpec {
    pub const fn uint(endianness: Endianness, width: Width, radix: Radix) -> FormatSpec {
        FormatSpec {
            endianness,
            kind: FormatKind::Integer {
                signedness: Signedness::Unsigned,
                width,
                radix,
            },
        }
    }

    pub const fn int(endianness: Endianness, width: Width, radix: Radix) -> FormatSpec {
        FormatSpec {
            endianness,
            kind: FormatKind::Integer {
                signedness: Signedness::Signed,
                width,
                radix,
            },
        }
    }

    pub const fn float(endianness: Endianness, width: FloatWidth) -> FormatSpec {
        FormatSpec {
            endianness,
            kind: FormatKind::Float(width),
        }
    }

    /// Bytes this spec reads.
    pub fn len(&self) -> usize {
        match self.kind {
            FormatKind::Integer { width, .. } => width.bytes(),
            FormatKind::Float(width) => width.bytes(),
            FormatKind::Char => 1,
        }
    }

    /// Decode the field at `offset` in `bytes` to its display string.
    pub fn decode(&self, bytes: &[u8], offset: usize) -> Result<String, FormatError> {
        match self.kind {
            FormatKind::Integer {
                signedness,
                width,
                radix,
            } => {
                let raw = format_integer(bytes, offset, self.endianness, signedness, width, radix)?;
                Ok(decorate(raw, width.bits(), radix))
            }
            FormatKind::Float(FloatWidth::F32) => format_float32(bytes, offset, self.endianness),
            FormatKind::Float(FloatWidth::F64) => format_float64(bytes, offset, self.endianness),
            FormatKind::Float(FloatWidth::F80) => format_float80(bytes, offset, self.endianness),
            FormatKind::Char => {
                let f = field(bytes, offset, 1)?;
                let flags = EscapeFlags {
                    single_quote: true,
                    backslash: true,
                    ..EscapeFlags::default()
                };
                Ok(format!("'{}'", escape_char(f[0], flags)))
            }
        }
    }
}

fn decorate(raw: String, bits: usize, radix: Radix) -> String {
    match radix {
        Radix::Decimal => raw,
        Radix::Binary => zero_pad(raw, radix.digits_for(bits)),
        Radix::Octal => prefix(zero_pad(raw, radix.digits_for(bits)), "0"),
        Radix::Hexadecimal => prefix(zero_pad(raw, radix.digits_for(bits)), "0x"),
    }
}

/// Zero-pad the digits of `raw` to `digits`, keeping a leading minus sign
/// in front of the padding.
fn zero_pad(raw: String, digits: usize) -> String {
    let (sign, magnitude) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };
    if magnitude.len() >= digits {
        return raw;
    }
    let mut out = String::with_capacity(sign.len() + digits);
    out.push_str(sign);
    for _ in 0..digits - magnitude.len() {
        out.push('0');
    }
    out.push_str(magnitude);
    out
}

fn prefix(raw: String, prefix: &str) -> String {
    match raw.strip_prefix('-') {
        Some(rest) => format!("-{}{}", prefix, rest),
        None => format!("{}{}", prefix, raw),
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FormatKind::Integer {
                signedness,
                width,
                radix,
            } => {
                let sign = match signedness {
                    Signedness::Unsigned => "u",
                    Signedness::Signed => "i",
                };
                let radix = match radix {
                    Radix::Binary => "b",
                    Radix::Octal => "o",
                    Radix::Decimal => "d",
                    Radix::Hexadecimal => "x",
                };
                write!(f, "{}{}{}", sign, width.bits(), radix)
            }
            FormatKind::Float(width) => write!(f, "f{}", width.bytes() * 8),
            FormatKind::Char => write!(f, "char"),
        }
    }
}
