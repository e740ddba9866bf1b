//! x87 FPU stack addressing and tag word reconstruction.
//!
//! The snapshot carries the abridged tag word (one bit per physical
//! register: empty or not). The full two-bit-per-register tag word is
//! reconstructed from the register contents, following "Recreating FSAVE
//! format" in the Intel instruction set manual.

use crate::format::{field, FormatError};
use crate::x86_64::{FSW_OFFSET, FTW_ABRIDGED_OFFSET, ST_SLOT_SIZE, ST_SPACE_OFFSET};

/// Full tag word values, two bits per physical register.
pub const TAG_VALID: u16 = 0;
pub const TAG_ZERO: u16 = 1;
pub const TAG_SPECIAL: u16 = 2;
pub const TAG_EMPTY: u16 = 3;

/// The stack-top field of the floating point status word.
pub fn top(snapshot: &[u8]) -> Result<u8, FormatError> {
    let fsw = field(snapshot, FSW_OFFSET, 2)?;
    let fsw = u16::from_le_bytes([fsw[0], fsw[1]]);
    Ok(((fsw >> 11) & 0x7) as u8)
}

/// Map a physical register number to its position in st_space.
///
/// st_space is stored in logical (stack) order: entry 0 is `st(0)`, the
/// register TOP points at.
pub fn phys_to_logical(physical: u8, top: u8) -> u8 {
    (physical + 8 - top) % 8
}

/// The 10 bytes of physical register `Ri` within the snapshot.
pub fn stack_slot(snapshot: &[u8], physical: u8) -> Result<&[u8], FormatError> {
    let logical = phys_to_logical(physical, top(snapshot)?);
    let offset = ST_SPACE_OFFSET + ST_SLOT_SIZE * logical as usize;
    field(snapshot, offset, 10)
}

/// Reconstruct the full x87 tag word from the abridged one.
///
/// A register marked non-empty is classified by its contents: exponent
/// all ones or a clear integer bit means Special, an all-zero encoding
/// means Zero, otherwise Valid.
pub fn reconstruct_tag_word(snapshot: &[u8]) -> Result<u16, FormatError> {
    let top = top(snapshot)?;
    let abridged = field(snapshot, FTW_ABRIDGED_OFFSET, 2)?;
    let abridged = u16::from_le_bytes([abridged[0], abridged[1]]);

    let mut ftw = 0u16;
    for physical in 0..8u8 {
        let tag = if abridged & (1 << physical) == 0 {
            TAG_EMPTY
        } else {
            let logical = phys_to_logical(physical, top);
            let offset = ST_SPACE_OFFSET + ST_SLOT_SIZE * logical as usize;
            let slot = field(snapshot, offset, 10)?;
            classify(slot)
        };
        ftw |= tag << (2 * physical);
    }
    Ok(ftw)
}

fn classify(slot: &[u8]) -> u16 {
    let exponent = u16::from_le_bytes([slot[8], slot[9]]) & 0x7fff;
    if exponent == 0x7fff {
        TAG_SPECIAL
    } else if exponent == 0 {
        let significand = u64::from_le_bytes(slot[0..8].try_into().unwrap());
        if significand == 0 {
            TAG_ZERO
        } else {
            TAG_SPECIAL
        }
    } else if slot[7] & 0x80 != 0 {
        TAG_VALID
    } else {
        // A nonzero exponent with a clear integer bit is an unnormal.
        TAG_SPECIAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x86_64::SNAPSHOT_SIZE;

    fn snapshot_with_top(top: u8) -> Vec<u8> {
        let mut snapshot = vec![0u8; SNAPSHOT_SIZE];
        let fsw = (top as u16) << 11;
        snapshot[FSW_OFFSET..FSW_OFFSET + 2].copy_from_slice(&fsw.to_le_bytes());
        snapshot
    }

    fn set_slot(snapshot: &mut [u8], logical: u8, bytes: [u8; 10]) {
        let offset = ST_SPACE_OFFSET + ST_SLOT_SIZE * logical as usize;
        snapshot[offset..offset + 10].copy_from_slice(&bytes);
    }

    fn mark_in_use(snapshot: &mut [u8], physical: u8) {
        snapshot[FTW_ABRIDGED_OFFSET] |= 1 << physical;
    }

    fn encode_f80(exponent: u16, significand: u64) -> [u8; 10] {
        let mut bytes = [0u8; 10];
        bytes[0..8].copy_from_slice(&significand.to_le_bytes());
        bytes[8..10].copy_from_slice(&exponent.to_le_bytes());
        bytes
    }

    #[test]
    fn test_phys_to_logical() {
        assert_eq!(phys_to_logical(0, 0), 0);
        assert_eq!(phys_to_logical(7, 0), 7);
        // After one push TOP is 7 and physical 7 is st(0).
        assert_eq!(phys_to_logical(7, 7), 0);
        assert_eq!(phys_to_logical(6, 7), 7);
    }

    #[test]
    fn test_reset_state_is_all_empty() {
        let snapshot = snapshot_with_top(0);
        assert_eq!(reconstruct_tag_word(&snapshot).unwrap(), 0xffff);
    }

    #[test]
    fn test_valid_zero_and_special_tags() {
        let mut snapshot = snapshot_with_top(7);
        // Physical 7 is st(0): a normal 1.0.
        mark_in_use(&mut snapshot, 7);
        set_slot(&mut snapshot, 0, encode_f80(0x3fff, 0x8000_0000_0000_0000));
        // Physical 6 is st(1): +0.0.
        mark_in_use(&mut snapshot, 6);
        set_slot(&mut snapshot, 1, encode_f80(0, 0));
        // Physical 5 is st(2): infinity.
        mark_in_use(&mut snapshot, 5);
        set_slot(&mut snapshot, 2, encode_f80(0x7fff, 0x8000_0000_0000_0000));

        let ftw = reconstruct_tag_word(&snapshot).unwrap();
        assert_eq!((ftw >> 14) & 0x3, TAG_VALID);
        assert_eq!((ftw >> 12) & 0x3, TAG_ZERO);
        assert_eq!((ftw >> 10) & 0x3, TAG_SPECIAL);
        // Everything else stays empty.
        assert_eq!(ftw & 0x3, TAG_EMPTY);
    }

    #[test]
    fn test_denormal_is_special() {
        let mut snapshot = snapshot_with_top(0);
        mark_in_use(&mut snapshot, 0);
        set_slot(&mut snapshot, 0, encode_f80(0, 1));
        let ftw = reconstruct_tag_word(&snapshot).unwrap();
        assert_eq!(ftw & 0x3, TAG_SPECIAL);
    }

    #[test]
    fn test_unnormal_is_special() {
        let mut snapshot = snapshot_with_top(0);
        mark_in_use(&mut snapshot, 0);
        // Nonzero exponent, integer bit clear.
        set_slot(&mut snapshot, 0, encode_f80(0x4000, 0x4000_0000_0000_0000));
        let ftw = reconstruct_tag_word(&snapshot).unwrap();
        assert_eq!(ftw & 0x3, TAG_SPECIAL);
    }

    #[test]
    fn test_stack_slot_follows_top() {
        let mut snapshot = snapshot_with_top(7);
        let pattern = encode_f80(0x3fff, 0x8000_0000_0000_0000);
        set_slot(&mut snapshot, 0, pattern);
        // With TOP=7, physical register 7 lives in logical slot 0.
        assert_eq!(stack_slot(&snapshot, 7).unwrap(), &pattern[..]);
    }
}
