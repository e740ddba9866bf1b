//! Memory dump cell formatting for the `:memory` command.
//!
//! A dump is a grid: `columns(kind, size)` cells per row, each cell
//! rendered by [`format_cell`] with a fixed width so columns line up.
//! Reads are little-endian; the repeat kinds are the classic debugger
//! letters (`d`ecimal, `u`nsigned, he`x`, `o`ctal, binary `t`wo,
//! `c`haracter).

use crate::format::{escape_char, field, EscapeFlags, FormatError};

/// How to render each memory cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpKind {
    Decimal,
    Unsigned,
    Hexadecimal,
    Octal,
    Binary,
    Character,
}

impl DumpKind {
    /// The single-letter spelling used on the command line.
    pub fn from_letter(letter: char) -> Option<DumpKind> {
        match letter {
            'd' => Some(DumpKind::Decimal),
            'u' => Some(DumpKind::Unsigned),
            'x' => Some(DumpKind::Hexadecimal),
            'o' => Some(DumpKind::Octal),
            't' => Some(DumpKind::Binary),
            'c' => Some(DumpKind::Character),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            DumpKind::Decimal => 'd',
            DumpKind::Unsigned => 'u',
            DumpKind::Hexadecimal => 'x',
            DumpKind::Octal => 'o',
            DumpKind::Binary => 't',
            DumpKind::Character => 'c',
        }
    }
}

fn unsupported(kind: DumpKind, size: usize) -> FormatError {
    FormatError::UnsupportedMemoryFormat {
        kind: kind.letter(),
        size,
    }
}

/// Cells per output row for a kind/size combination, or `None` if the
/// combination is not supported (`c` only comes in size 1).
pub fn columns(kind: DumpKind, size: usize) -> Option<usize> {
    match (kind, size) {
        (DumpKind::Decimal | DumpKind::Unsigned, 1 | 2) => Some(8),
        (DumpKind::Decimal | DumpKind::Unsigned, 4) => Some(4),
        (DumpKind::Decimal | DumpKind::Unsigned, 8) => Some(2),
        (DumpKind::Hexadecimal, 1 | 2) => Some(8),
        (DumpKind::Hexadecimal, 4) => Some(4),
        (DumpKind::Hexadecimal, 8) => Some(2),
        (DumpKind::Octal, 1) => Some(8),
        (DumpKind::Octal, 2 | 4) => Some(4),
        (DumpKind::Octal, 8) => Some(2),
        (DumpKind::Binary, 1) => Some(4),
        (DumpKind::Binary, 2) => Some(2),
        (DumpKind::Binary, 4 | 8) => Some(1),
        (DumpKind::Character, 1) => Some(8),
        _ => None,
    }
}

/// Format the cell at `offset` in `memory`.
///
/// Every cell of a given kind/size has the same width, space-padded on
/// the left.
pub fn format_cell(
    memory: &[u8],
    offset: usize,
    kind: DumpKind,
    size: usize,
) -> Result<String, FormatError> {
    if columns(kind, size).is_none() {
        return Err(unsupported(kind, size));
    }
    let raw = field(memory, offset, size)?;
    let unsigned = read_unsigned(raw);

    Ok(match kind {
        DumpKind::Decimal => {
            let signed = sign_extend(unsigned, size);
            match size {
                1 | 2 => format!("{:>8}", signed),
                4 => format!("{:>14}", signed),
                _ => format!("{:>24}", signed),
            }
        }
        DumpKind::Unsigned => match size {
            1 | 2 => format!("{:>8}", unsigned),
            4 => format!("{:>14}", unsigned),
            _ => format!("{:>24}", unsigned),
        },
        DumpKind::Hexadecimal => match size {
            1 => format!("    0x{:02x}", unsigned),
            2 => format!("  0x{:04x}", unsigned),
            4 => format!("    0x{:08x}", unsigned),
            _ => format!("      0x{:016x}", unsigned),
        },
        DumpKind::Octal => match size {
            1 => format!("    0{:03o}", unsigned),
            2 => format!("    0{:06o}", unsigned),
            4 => format!("  0{:011o}", unsigned),
            _ => format!("  0{:022o}", unsigned),
        },
        DumpKind::Binary => match size {
            1 => format!("    {:08b}", unsigned),
            2 => format!("    {:016b}", unsigned),
            4 => format!("    {:032b}", unsigned),
            _ => format!("  {:064b}", unsigned),
        },
        DumpKind::Character => {
            let flags = EscapeFlags {
                single_quote: true,
                backslash: true,
                ..EscapeFlags::default()
            };
            format!("{:>8}", format!("'{}'", escape_char(raw[0], flags)))
        }
    })
}

fn read_unsigned(raw: &[u8]) -> u64 {
    let mut n = 0u64;
    for &b in raw.iter().rev() {
        n = (n << 8) | b as u64;
    }
    n
}

fn sign_extend(unsigned: u64, size: usize) -> i64 {
    match size {
        1 => unsigned as u8 as i8 as i64,
        2 => unsigned as u16 as i16 as i64,
        4 => unsigned as u32 as i32 as i64,
        _ => unsigned as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_kind_letters_round_trip() {
        for letter in ['d', 'u', 'x', 'o', 't', 'c'] {
            let kind = DumpKind::from_letter(letter).unwrap();
            assert_eq!(kind.letter(), letter);
        }
        assert_eq!(DumpKind::from_letter('z'), None);
    }

    #[rstest]
    #[case(DumpKind::Hexadecimal, 1, "    0x2a")]
    #[case(DumpKind::Hexadecimal, 2, "  0x002a")]
    #[case(DumpKind::Hexadecimal, 4, "    0x0000002a")]
    #[case(DumpKind::Hexadecimal, 8, "      0x000000000000002a")]
    #[case(DumpKind::Octal, 1, "    0052")]
    #[case(DumpKind::Unsigned, 1, "      42")]
    #[case(DumpKind::Binary, 1, "    00101010")]
    fn test_cell_widths(#[case] kind: DumpKind, #[case] size: usize, #[case] expected: &str) {
        let memory = [0x2au8, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(format_cell(&memory, 0, kind, size).unwrap(), expected);
    }

    #[test]
    fn test_decimal_is_signed() {
        let memory = [0xffu8; 8];
        assert_eq!(
            format_cell(&memory, 0, DumpKind::Decimal, 1).unwrap(),
            "      -1"
        );
        assert_eq!(
            format_cell(&memory, 0, DumpKind::Decimal, 8).unwrap(),
            "                      -1"
        );
        assert_eq!(
            format_cell(&memory, 0, DumpKind::Unsigned, 8).unwrap(),
            "    18446744073709551615"
        );
    }

    #[test]
    fn test_little_endian_reads() {
        let memory = [0x34, 0x12];
        assert_eq!(
            format_cell(&memory, 0, DumpKind::Hexadecimal, 2).unwrap(),
            "  0x1234"
        );
    }

    #[test]
    fn test_character_cells() {
        assert_eq!(
            format_cell(&[b'A'], 0, DumpKind::Character, 1).unwrap(),
            "     'A'"
        );
        assert_eq!(
            format_cell(&[0x00], 0, DumpKind::Character, 1).unwrap(),
            "    '\\0'"
        );
        assert_eq!(
            format_cell(&[b'\''], 0, DumpKind::Character, 1).unwrap(),
            "    '\\''"
        );
    }

    #[test]
    fn test_unsupported_combinations() {
        assert_eq!(columns(DumpKind::Character, 2), None);
        assert_eq!(
            format_cell(&[0u8; 2], 0, DumpKind::Character, 2).unwrap_err(),
            FormatError::UnsupportedMemoryFormat { kind: 'c', size: 2 }
        );
        assert_eq!(columns(DumpKind::Decimal, 3), None);
    }

    #[test]
    fn test_out_of_bounds_read() {
        assert!(format_cell(&[0u8; 4], 2, DumpKind::Hexadecimal, 4).is_err());
    }

    #[test]
    fn test_column_counts_match_row_width() {
        // Rows are 16 bytes for multi-byte numeric kinds.
        for (kind, size) in [
            (DumpKind::Hexadecimal, 2),
            (DumpKind::Hexadecimal, 4),
            (DumpKind::Hexadecimal, 8),
            (DumpKind::Decimal, 2),
            (DumpKind::Unsigned, 4),
        ] {
            assert_eq!(columns(kind, size).unwrap() * size, 16);
        }
    }
}
