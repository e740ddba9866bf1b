//! The x86-64 register table and snapshot layout.
//!
//! The snapshot is the 728-byte buffer the tracee reports after every
//! step: `user_regs_struct` followed by `user_fpregs_struct`, as laid
//! out by ptrace on x86-64 Linux. All offsets below index into that
//! buffer.

use crate::format::{Endianness, FloatWidth, FormatError, FormatSpec, Radix, Width};
use crate::registers::{BitField, FieldValue, Location, Register, RegisterSet};

/// Total snapshot size in bytes.
pub const SNAPSHOT_SIZE: usize = 728;

/// Offset of the floating point status word.
pub const FSW_OFFSET: usize = 218;
/// Offset of the abridged floating point tag word.
pub const FTW_ABRIDGED_OFFSET: usize = 220;
/// Offset of the x87 register stack (st_space).
pub const ST_SPACE_OFFSET: usize = 248;
/// Stride of one st_space entry; only the first 10 bytes are the value.
pub const ST_SLOT_SIZE: usize = 16;
/// Offset of the SSE register file (xmm_space).
pub const XMM_SPACE_OFFSET: usize = 376;

const UINT16: FormatSpec = FormatSpec::uint(Endianness::Little, Width::W16, Radix::Hexadecimal);
const UINT32: FormatSpec = FormatSpec::uint(Endianness::Little, Width::W32, Radix::Hexadecimal);
const UINT64: FormatSpec = FormatSpec::uint(Endianness::Little, Width::W64, Radix::Hexadecimal);
const UINT128: FormatSpec = FormatSpec::uint(Endianness::Little, Width::W128, Radix::Hexadecimal);
const FLOAT80: FormatSpec = FormatSpec::float(Endianness::Little, FloatWidth::F80);

const EFLAGS_BITS: &[BitField] = &[
    BitField::flag("CF", "Carry flag", 0),
    BitField::flag("PF", "Parity flag", 2),
    BitField::flag("AF", "Adjust flag", 4),
    BitField::flag("ZF", "Zero flag", 6),
    BitField::flag("SF", "Sign flag", 7),
    BitField::flag("TF", "Trap flag", 8),
    BitField::flag("IF", "Interrupt flag", 9),
    BitField::flag("DF", "Direction flag", 10),
    BitField::flag("OF", "Overflow flag", 11),
    BitField::with_mask("IOPL", "I/O privilege level", 12, 0x3),
    BitField::flag("NT", "Nested task flag", 14),
    BitField::flag("RF", "Resume flag", 16),
    BitField::flag("VM", "Virtual-8086 mode", 17),
    BitField::flag("AC", "Alignment check", 18),
    BitField::flag("VIF", "Virtual interrupt flag", 19),
    BitField::flag("VIP", "Virtual interrupt pending flag", 20),
    BitField::flag("ID", "Identification flag", 21),
];

const ROUNDING_MODES: &[FieldValue] = &[
    FieldValue { name: "RN", description: "To nearest" },
    FieldValue { name: "R-", description: "Toward negative infinity" },
    FieldValue { name: "R+", description: "Toward positive infinity" },
    FieldValue { name: "RZ", description: "Toward zero" },
];

const PRECISION_MODES: &[FieldValue] = &[
    FieldValue { name: "SGL", description: "Single" },
    FieldValue { name: "", description: "(reserved)" },
    FieldValue { name: "DBL", description: "Double" },
    FieldValue { name: "EXT", description: "Extended" },
];

const FCW_BITS: &[BitField] = &[
    BitField::flag("EM=IM", "Invalid operation exception mask", 0),
    BitField::flag("EM=DM", "Denormalized operand exception mask", 1),
    BitField::flag("EM=ZM", "Zero-divide exception mask", 2),
    BitField::flag("EM=OM", "Overflow exception mask", 3),
    BitField::flag("EM=UM", "Underflow exception mask", 4),
    BitField::flag("EM=PM", "Precision exception mask", 5),
    BitField::with_values("PC", "Rounding precision", 8, 0x3, PRECISION_MODES),
    BitField::with_values("RC", "Rounding mode", 10, 0x3, ROUNDING_MODES),
];

const FSW_BITS: &[BitField] = &[
    BitField::flag("EF=IE", "Invalid operation exception flag", 0),
    BitField::flag("EF=DE", "Denormalized operand exception flag", 1),
    BitField::flag("EF=ZE", "Zero-divide exception flag", 2),
    BitField::flag("EF=OE", "Overflow exception flag", 3),
    BitField::flag("EF=UE", "Underflow exception flag", 4),
    BitField::flag("EF=PE", "Precision exception flag", 5),
    BitField::flag("SF", "Stack fault", 6),
    BitField::flag("ES", "Exception summary status", 7),
    BitField::flag("C0", "Condition 0", 8),
    BitField::flag("C1", "Condition 1", 9),
    BitField::flag("C2", "Condition 2", 10),
    BitField::flag("C3", "Condition 3", 14),
    BitField::with_mask("TOP", "Floating point stack top", 11, 0x7),
    BitField::flag("B", "FPU busy", 15),
];

const TAG_VALUES: &[FieldValue] = &[
    FieldValue { name: "Valid", description: "Valid" },
    FieldValue { name: "Zero", description: "Zero" },
    FieldValue { name: "Special", description: "Special" },
    FieldValue { name: "Empty", description: "Empty" },
];

const FTW_BITS: &[BitField] = &[
    BitField::with_values("TAG(0)", "Physical register 0 tag", 0, 0x3, TAG_VALUES),
    BitField::with_values("TAG(1)", "Physical register 1 tag", 2, 0x3, TAG_VALUES),
    BitField::with_values("TAG(2)", "Physical register 2 tag", 4, 0x3, TAG_VALUES),
    BitField::with_values("TAG(3)", "Physical register 3 tag", 6, 0x3, TAG_VALUES),
    BitField::with_values("TAG(4)", "Physical register 4 tag", 8, 0x3, TAG_VALUES),
    BitField::with_values("TAG(5)", "Physical register 5 tag", 10, 0x3, TAG_VALUES),
    BitField::with_values("TAG(6)", "Physical register 6 tag", 12, 0x3, TAG_VALUES),
    BitField::with_values("TAG(7)", "Physical register 7 tag", 14, 0x3, TAG_VALUES),
];

const MXCSR_BITS: &[BitField] = &[
    BitField::flag("EF=IE", "Invalid operation exception flag", 0),
    BitField::flag("EF=DE", "Denormalized operand exception flag", 1),
    BitField::flag("EF=ZE", "Zero-divide exception flag", 2),
    BitField::flag("EF=OE", "Overflow exception flag", 3),
    BitField::flag("EF=UE", "Underflow exception flag", 4),
    BitField::flag("EF=PE", "Precision exception flag", 5),
    BitField::flag("DAZ", "Denormals are zero", 6),
    BitField::flag("EM=IM", "Invalid operation exception mask", 7),
    BitField::flag("EM=DM", "Denormalized operand exception mask", 8),
    BitField::flag("EM=ZM", "Zero-divide exception mask", 9),
    BitField::flag("EM=OM", "Overflow exception mask", 10),
    BitField::flag("EM=UM", "Underflow exception mask", 11),
    BitField::flag("EM=PM", "Precision exception mask", 12),
    BitField::with_values("RC", "Rounding mode", 13, 0x3, ROUNDING_MODES),
    BitField::flag("FZ", "Flush to zero", 15),
];

const fn gp(name: &'static str, offset: usize) -> Register {
    Register::new(
        name,
        RegisterSet::GENERAL_PURPOSE,
        UINT64,
        Location::Fixed { offset, len: 8 },
    )
}

const fn x87(name: &'static str, index: u8) -> Register {
    Register::new(
        name,
        RegisterSet::FLOATING_POINT,
        FLOAT80,
        Location::X87Stack { index },
    )
}

const fn mmx(name: &'static str, index: usize) -> Register {
    Register::new(
        name,
        RegisterSet::VECTOR,
        UINT64,
        Location::Fixed {
            offset: ST_SPACE_OFFSET + ST_SLOT_SIZE * index,
            len: 8,
        },
    )
}

const fn xmm(name: &'static str, index: usize) -> Register {
    Register::new(
        name,
        RegisterSet::VECTOR,
        UINT128,
        Location::Fixed {
            offset: XMM_SPACE_OFFSET + 16 * index,
            len: 16,
        },
    )
}

const fn seg(name: &'static str, offset: usize) -> Register {
    Register::new(
        name,
        RegisterSet::SEGMENT,
        UINT16,
        Location::Fixed { offset, len: 2 },
    )
}

/// Every x86-64 register, in display order.
pub static REGISTERS: &[Register] = &[
    Register::new(
        "rip",
        RegisterSet::PROGRAM_COUNTER,
        UINT64,
        Location::Fixed { offset: 128, len: 8 },
    ),
    gp("rax", 80),
    gp("rcx", 88),
    gp("rdx", 96),
    gp("rbx", 40),
    gp("rsp", 152),
    gp("rbp", 32),
    gp("rsi", 104),
    gp("rdi", 112),
    gp("r8", 72),
    gp("r9", 64),
    gp("r10", 56),
    gp("r11", 48),
    gp("r12", 24),
    gp("r13", 16),
    gp("r14", 8),
    gp("r15", 0),
    Register::new(
        "eflags",
        RegisterSet::STATUS,
        UINT64,
        Location::Fixed { offset: 144, len: 8 },
    )
    .with_bits(EFLAGS_BITS),
    x87("R7", 7),
    x87("R6", 6),
    x87("R5", 5),
    x87("R4", 4),
    x87("R3", 3),
    x87("R2", 2),
    x87("R1", 1),
    x87("R0", 0),
    Register::new(
        "fcw",
        RegisterSet::FLOATING_POINT_STATUS,
        UINT16,
        Location::Fixed { offset: 216, len: 2 },
    )
    .with_bits(FCW_BITS),
    Register::new(
        "fsw",
        RegisterSet::FLOATING_POINT_STATUS,
        UINT16,
        Location::Fixed { offset: FSW_OFFSET, len: 2 },
    )
    .with_bits(FSW_BITS),
    Register::new(
        "ftw",
        RegisterSet::FLOATING_POINT_STATUS,
        UINT16,
        Location::X87TagWord,
    )
    .with_bits(FTW_BITS),
    Register::new(
        "fip",
        RegisterSet::FLOATING_POINT_STATUS,
        UINT64,
        Location::Fixed { offset: 224, len: 8 },
    ),
    Register::new(
        "fdp",
        RegisterSet::FLOATING_POINT_STATUS,
        UINT64,
        Location::Fixed { offset: 232, len: 8 },
    ),
    Register::new(
        "fop",
        RegisterSet::FLOATING_POINT_STATUS,
        UINT16,
        Location::Fixed { offset: 222, len: 2 },
    ),
    mmx("mm0", 0),
    mmx("mm1", 1),
    mmx("mm2", 2),
    mmx("mm3", 3),
    mmx("mm4", 4),
    mmx("mm5", 5),
    mmx("mm6", 6),
    mmx("mm7", 7),
    xmm("xmm0", 0),
    xmm("xmm1", 1),
    xmm("xmm2", 2),
    xmm("xmm3", 3),
    xmm("xmm4", 4),
    xmm("xmm5", 5),
    xmm("xmm6", 6),
    xmm("xmm7", 7),
    xmm("xmm8", 8),
    xmm("xmm9", 9),
    xmm("xmm10", 10),
    xmm("xmm11", 11),
    xmm("xmm12", 12),
    xmm("xmm13", 13),
    xmm("xmm14", 14),
    xmm("xmm15", 15),
    Register::new(
        "mxcsr",
        RegisterSet::VECTOR_STATUS,
        UINT32,
        Location::Fixed { offset: 240, len: 4 },
    )
    .with_bits(MXCSR_BITS),
    seg("cs", 136),
    seg("ss", 160),
    seg("ds", 184),
    seg("es", 192),
    seg("fs", 200),
    seg("gs", 208),
    Register::new(
        "fs_base",
        RegisterSet::SEGMENT,
        UINT64,
        Location::Fixed { offset: 168, len: 8 },
    ),
    Register::new(
        "gs_base",
        RegisterSet::SEGMENT,
        UINT64,
        Location::Fixed { offset: 176, len: 8 },
    ),
];

/// Look up a register by name.
pub fn register(name: &str) -> Option<&'static Register> {
    REGISTERS.iter().find(|r| r.name == name)
}

/// All registers belonging to any of `sets`, in display order.
pub fn registers_in(sets: RegisterSet) -> impl Iterator<Item = &'static Register> {
    REGISTERS.iter().filter(move |r| r.sets.intersects(sets))
}

/// Decode a named register from a snapshot.
pub fn format_register(
    name: &str,
    snapshot: &[u8],
) -> Result<crate::registers::RegisterValue, FormatError> {
    let register = register(name).ok_or_else(|| FormatError::UnknownRegister(name.to_string()))?;
    register.display(snapshot)
}
