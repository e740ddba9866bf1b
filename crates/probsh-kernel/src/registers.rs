//! Architecture-neutral register model.
//!
//! A [`Register`] names a field of the thread snapshot, a [`FormatSpec`]
//! to decode it with, the [`RegisterSet`]s it belongs to, and optionally a
//! list of status [`BitField`]s to break its value apart into flags.

use crate::format::{FormatError, FormatSpec};
use crate::x87;
use bitflags::bitflags;
use std::borrow::Cow;

bitflags! {
    /// Which display groups a register belongs to (`:registers general`,
    /// `:registers float status`, ...).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RegisterSet: u16 {
        const PROGRAM_COUNTER = 1;
        const GENERAL_PURPOSE = 1 << 1;
        const STATUS = 1 << 2;
        const FLOATING_POINT = 1 << 3;
        const FLOATING_POINT_STATUS = 1 << 4;
        const VECTOR = 1 << 5;
        const VECTOR_STATUS = 1 << 6;
        const SEGMENT = 1 << 7;
    }
}

/// A symbolic name for one value of a multi-bit field, e.g. the x87
/// rounding modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldValue {
    pub name: &'static str,
    pub description: &'static str,
}

/// One flag or small bit group inside a status register.
///
/// `mask` is applied after shifting, and the shifted mask must not
/// straddle a byte boundary: extraction reads exactly one byte of the
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub name: &'static str,
    pub description: &'static str,
    pub shift: u32,
    pub mask: u8,
    /// Symbolic names indexed by field value; fields without a table
    /// render numerically.
    pub values: Option<&'static [FieldValue]>,
}

impl BitField {
    /// A single-bit flag.
    pub const fn flag(name: &'static str, description: &'static str, shift: u32) -> BitField {
        BitField::with_mask(name, description, shift, 1)
    }

    pub const fn with_mask(
        name: &'static str,
        description: &'static str,
        shift: u32,
        mask: u8,
    ) -> BitField {
        assert!(
            (mask as u16) << (shift % 8) <= 0xff,
            "bit field straddles a byte boundary"
        );
        BitField {
            name,
            description,
            shift,
            mask,
            values: None,
        }
    }

    pub const fn with_values(
        name: &'static str,
        description: &'static str,
        shift: u32,
        mask: u8,
        values: &'static [FieldValue],
    ) -> BitField {
        let mut field = BitField::with_mask(name, description, shift, mask);
        field.values = Some(values);
        field
    }

    /// Extract this field's value from a register's raw bytes.
    pub fn extract(&self, raw: &[u8]) -> Result<u8, FormatError> {
        let byte = crate::format::field(raw, self.shift as usize / 8, 1)?[0];
        Ok((byte >> (self.shift % 8)) & self.mask)
    }
}

/// Where a register's bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// A fixed window of the snapshot.
    Fixed { offset: usize, len: usize },
    /// The x87 physical register `Ri`, addressed through the stack top.
    X87Stack { index: u8 },
    /// The full x87 tag word, reconstructed from the abridged tag byte
    /// and the register contents.
    X87TagWord,
}

/// One register of the target machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub name: &'static str,
    pub sets: RegisterSet,
    pub format: FormatSpec,
    pub location: Location,
    pub bits: &'static [BitField],
}

/// A decoded status field, ready for display or inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedField {
    pub field: &'static BitField,
    pub value: u8,
    /// The symbolic name for `value`, when the field has a value table
    /// and the value is in range.
    pub symbol: Option<&'static str>,
}

/// A register's rendered value plus its rendered flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterValue {
    pub value: String,
    pub flags: Vec<String>,
}

impl Register {
    pub const fn new(
        name: &'static str,
        sets: RegisterSet,
        format: FormatSpec,
        location: Location,
    ) -> Register {
        Register {
            name,
            sets,
            format,
            location,
            bits: &[],
        }
    }

    pub const fn with_bits(mut self, bits: &'static [BitField]) -> Register {
        self.bits = bits;
        self
    }

    /// The raw bytes backing this register in `snapshot`.
    pub fn raw<'a>(&self, snapshot: &'a [u8]) -> Result<Cow<'a, [u8]>, FormatError> {
        match self.location {
            Location::Fixed { offset, len } => {
                crate::format::field(snapshot, offset, len).map(Cow::Borrowed)
            }
            Location::X87Stack { index } => {
                x87::stack_slot(snapshot, index).map(Cow::Borrowed)
            }
            Location::X87TagWord => {
                let tag_word = x87::reconstruct_tag_word(snapshot)?;
                Ok(Cow::Owned(tag_word.to_le_bytes().to_vec()))
            }
        }
    }

    /// Decode this register's value to its display string.
    pub fn value(&self, snapshot: &[u8]) -> Result<String, FormatError> {
        let raw = self.raw(snapshot)?;
        self.format.decode(&raw, 0)
    }

    /// Decode every bit field of this register.
    pub fn decode_bits(&self, snapshot: &[u8]) -> Result<Vec<DecodedField>, FormatError> {
        let raw = self.raw(snapshot)?;
        let mut fields = Vec::with_capacity(self.bits.len());
        for field in self.bits {
            let value = field.extract(&raw)?;
            let symbol = field
                .values
                .and_then(|values| values.get(value as usize))
                .map(|v| v.name);
            fields.push(DecodedField {
                field,
                value,
                symbol,
            });
        }
        Ok(fields)
    }

    /// Render the flag list for display.
    ///
    /// Zero-valued single-bit flags are omitted; flags with a value table
    /// render as `NAME=SYMBOL`, multi-bit fields without one as
    /// `NAME=0xHEX`, and set single-bit flags as the bare name.
    pub fn format_bits(&self, snapshot: &[u8]) -> Result<Vec<String>, FormatError> {
        let decoded = self.decode_bits(snapshot)?;
        let mut out = Vec::new();
        for field in decoded {
            if field.value == 0 && field.field.mask == 1 {
                continue;
            }
            match field.symbol {
                Some(symbol) => out.push(format!("{}={}", field.field.name, symbol)),
                None if field.field.mask > 1 => {
                    out.push(format!("{}={:#x}", field.field.name, field.value))
                }
                None => out.push(field.field.name.to_string()),
            }
        }
        Ok(out)
    }

    /// Decode value and flags together.
    pub fn display(&self, snapshot: &[u8]) -> Result<RegisterValue, FormatError> {
        Ok(RegisterValue {
            value: self.value(snapshot)?,
            flags: self.format_bits(snapshot)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Endianness, Radix, Width};

    const CARRY: BitField = BitField::flag("CF", "Carry flag", 0);
    const LEVEL: BitField = BitField::with_mask("LVL", "Level", 12, 0x3);
    const MODE_VALUES: &[FieldValue] = &[
        FieldValue { name: "RN", description: "round to nearest" },
        FieldValue { name: "RD", description: "round down" },
        FieldValue { name: "RU", description: "round up" },
        FieldValue { name: "RZ", description: "round toward zero" },
    ];
    const MODE: BitField = BitField::with_values("MODE", "Rounding mode", 10, 0x3, MODE_VALUES);

    const STATUS_BITS: &[BitField] = &[CARRY, LEVEL, MODE];

    const STATUS: Register = Register::new(
        "status",
        RegisterSet::STATUS,
        FormatSpec::uint(Endianness::Little, Width::W16, Radix::Hexadecimal),
        Location::Fixed { offset: 0, len: 2 },
    )
    .with_bits(STATUS_BITS);

    #[test]
    fn test_bit_extraction_uses_one_byte() {
        // Bit 12 with mask 0x3 reads byte 1, shift 4.
        let snapshot = [0x01, 0x34];
        let fields = STATUS.decode_bits(&snapshot).unwrap();
        assert_eq!(fields[0].value, 1); // CF: bit 0 of byte 0
        assert_eq!(fields[1].value, 0x3); // LVL: bits 12-13
        assert_eq!(fields[2].value, 0); // MODE: bits 10-11
    }

    #[test]
    fn test_flag_rendering_rules() {
        let snapshot = [0x01, 0x3c];
        let flags = STATUS.format_bits(&snapshot).unwrap();
        // MODE=0b11 renders its symbol; LVL renders hex; CF renders bare.
        assert_eq!(flags, vec!["CF", "LVL=0x3", "MODE=RZ"]);
    }

    #[test]
    fn test_zero_flags_are_omitted_but_zero_fields_are_not() {
        let snapshot = [0x00, 0x00];
        let flags = STATUS.format_bits(&snapshot).unwrap();
        // CF=0 disappears; multi-bit fields always show.
        assert_eq!(flags, vec!["LVL=0x0", "MODE=RN"]);
    }

    #[test]
    fn test_register_value_decodes_with_format() {
        let snapshot = [0x34, 0x12];
        assert_eq!(STATUS.value(&snapshot).unwrap(), "0x1234");
    }

    #[test]
    fn test_out_of_bounds_register() {
        let snapshot = [0u8; 1];
        assert!(STATUS.value(&snapshot).is_err());
    }
}
