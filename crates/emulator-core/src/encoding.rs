//! Deterministic mnemonic encoding table.
//!
//! One row per mnemonic: the opcode base byte (GR/XR fields zero, except
//! where the mnemonic itself occupies them) and the encoding class deciding
//! operand syntax and encoded size. The assembler resolves source mnemonics
//! against this table; the core's tests use it to keep the executor and the
//! table in agreement.

/// How an instruction's operands are written and encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingClass {
    /// No operands: `NO`, `EI`, `DI`, `RET`, `RETI`, `HALT`.
    Implied,
    /// One general register folded into the opcode byte: shifts, `PUSH`, `POP`.
    RegisterOnly,
    /// Register plus an I/O port address byte: `IN`, `OUT`.
    PortIo,
    /// Register plus an operand byte with a free addressing mode:
    /// `LD`, `ADD`, `SUB`, `CMP`, `AND`, `OR`, `XOR`.
    RegisterMemory,
    /// Register plus a store address; immediate mode is forbidden: `ST`.
    Store,
    /// Address byte with an optional index register in the XR field:
    /// jumps and `CALL`.
    Jump,
}

impl EncodingClass {
    /// Encoded size in bytes of an instruction of this class.
    #[must_use]
    pub const fn encoded_size(self) -> u8 {
        match self {
            Self::Implied | Self::RegisterOnly => 1,
            Self::PortIo | Self::RegisterMemory | Self::Store | Self::Jump => 2,
        }
    }
}

/// A mnemonic's encoding: base opcode byte plus operand class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeSpec {
    /// Uppercase mnemonic as written in source.
    pub mnemonic: &'static str,
    /// Opcode byte before operand fields are folded in.
    pub base: u8,
    /// Operand syntax and size class.
    pub class: EncodingClass,
}

const fn spec(mnemonic: &'static str, base: u8, class: EncodingClass) -> OpcodeSpec {
    OpcodeSpec {
        mnemonic,
        base,
        class,
    }
}

/// The complete mnemonic table.
pub const OPCODE_TABLE: &[OpcodeSpec] = &[
    spec("NO", 0x00, EncodingClass::Implied),
    spec("EI", 0xE0, EncodingClass::Implied),
    spec("DI", 0xE3, EncodingClass::Implied),
    spec("RET", 0xEC, EncodingClass::Implied),
    spec("RETI", 0xEF, EncodingClass::Implied),
    spec("HALT", 0xFF, EncodingClass::Implied),
    spec("SHLA", 0x90, EncodingClass::RegisterOnly),
    spec("SHLL", 0x91, EncodingClass::RegisterOnly),
    spec("SHRA", 0x92, EncodingClass::RegisterOnly),
    spec("SHRL", 0x93, EncodingClass::RegisterOnly),
    spec("PUSH", 0xD0, EncodingClass::RegisterOnly),
    spec("POP", 0xD2, EncodingClass::RegisterOnly),
    spec("IN", 0xC0, EncodingClass::PortIo),
    spec("OUT", 0xC3, EncodingClass::PortIo),
    spec("LD", 0x10, EncodingClass::RegisterMemory),
    spec("ADD", 0x30, EncodingClass::RegisterMemory),
    spec("SUB", 0x40, EncodingClass::RegisterMemory),
    spec("CMP", 0x50, EncodingClass::RegisterMemory),
    spec("AND", 0x60, EncodingClass::RegisterMemory),
    spec("OR", 0x70, EncodingClass::RegisterMemory),
    spec("XOR", 0x80, EncodingClass::RegisterMemory),
    spec("ST", 0x20, EncodingClass::Store),
    spec("JMP", 0xA0, EncodingClass::Jump),
    spec("JZ", 0xA4, EncodingClass::Jump),
    spec("JC", 0xA8, EncodingClass::Jump),
    spec("JM", 0xAC, EncodingClass::Jump),
    spec("CALL", 0xB0, EncodingClass::Jump),
    spec("JNZ", 0xB4, EncodingClass::Jump),
    spec("JNC", 0xB8, EncodingClass::Jump),
    spec("JNM", 0xBC, EncodingClass::Jump),
];

/// Looks up a mnemonic (already uppercased) in the table.
#[must_use]
pub fn lookup_mnemonic(mnemonic: &str) -> Option<&'static OpcodeSpec> {
    OPCODE_TABLE.iter().find(|s| s.mnemonic == mnemonic)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{lookup_mnemonic, EncodingClass, OPCODE_TABLE};

    #[test]
    fn table_mnemonics_are_unique() {
        let names: HashSet<_> = OPCODE_TABLE.iter().map(|s| s.mnemonic).collect();
        assert_eq!(names.len(), OPCODE_TABLE.len());
    }

    #[test]
    fn lookup_finds_every_row() {
        for row in OPCODE_TABLE {
            assert_eq!(lookup_mnemonic(row.mnemonic), Some(row));
        }
        assert_eq!(lookup_mnemonic("MOV"), None);
        assert_eq!(lookup_mnemonic("ld"), None);
    }

    #[test]
    fn base_bytes_match_the_instruction_format() {
        assert_eq!(lookup_mnemonic("LD").unwrap().base, 0x10);
        assert_eq!(lookup_mnemonic("ST").unwrap().base, 0x20);
        assert_eq!(lookup_mnemonic("SHRL").unwrap().base, 0x93);
        assert_eq!(lookup_mnemonic("CALL").unwrap().base, 0xB0);
        assert_eq!(lookup_mnemonic("JNM").unwrap().base, 0xBC);
        assert_eq!(lookup_mnemonic("OUT").unwrap().base, 0xC3);
        assert_eq!(lookup_mnemonic("POP").unwrap().base, 0xD2);
        assert_eq!(lookup_mnemonic("HALT").unwrap().base, 0xFF);
    }

    #[test]
    fn encoded_sizes_follow_the_class() {
        assert_eq!(EncodingClass::Implied.encoded_size(), 1);
        assert_eq!(EncodingClass::RegisterOnly.encoded_size(), 1);
        assert_eq!(EncodingClass::PortIo.encoded_size(), 2);
        assert_eq!(EncodingClass::RegisterMemory.encoded_size(), 2);
        assert_eq!(EncodingClass::Store.encoded_size(), 2);
        assert_eq!(EncodingClass::Jump.encoded_size(), 2);
    }
}
