//! Mnemonic resolution for the fixed shasm instruction set.
//!
//! The numeric codes are a contract shared with the spreadsheet VM. Changing
//! any of them requires a matching change to the VM's dispatch formula.

use std::fmt;

/// An instruction of the shasm VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// `lte dst a b`: store `a <= b` as 0/1.
    Lte = 0,
    /// `add dst a b`.
    Add = 1,
    /// `load dst row col`.
    Load = 2,
    /// Alternate-addressing form of `load`.
    LoadA = 3,
    /// `store row col value`.
    Store = 4,
    /// Alternate-addressing form of `store`.
    StoreA = 5,
    /// `jmp0 cond target`: jump when `cond` is zero.
    Jmp0 = 6,
    /// Alternate-addressing form of `jmp0`.
    Jmp0A = 7,
    /// `jmp target`.
    Jmp = 8,
    /// Alternate-addressing form of `jmp`.
    JmpA = 9,
    /// Stop execution.
    Halt = 10,
    /// `sub dst a b`.
    Sub = 11,
    /// `mul dst a b`.
    Mul = 12,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MnemonicEntry {
    name: &'static str,
    opcode: Opcode,
}

const MNEMONIC_ENTRIES: &[MnemonicEntry] = &[
    MnemonicEntry {
        name: "<=",
        opcode: Opcode::Lte,
    },
    MnemonicEntry {
        name: "lte",
        opcode: Opcode::Lte,
    },
    MnemonicEntry {
        name: "add",
        opcode: Opcode::Add,
    },
    MnemonicEntry {
        name: "sub",
        opcode: Opcode::Sub,
    },
    MnemonicEntry {
        name: "mul",
        opcode: Opcode::Mul,
    },
    MnemonicEntry {
        name: "load",
        opcode: Opcode::Load,
    },
    MnemonicEntry {
        name: "load_a",
        opcode: Opcode::LoadA,
    },
    MnemonicEntry {
        name: "store",
        opcode: Opcode::Store,
    },
    MnemonicEntry {
        name: "store_a",
        opcode: Opcode::StoreA,
    },
    MnemonicEntry {
        name: "jmp0",
        opcode: Opcode::Jmp0,
    },
    MnemonicEntry {
        name: "jmp0_a",
        opcode: Opcode::Jmp0A,
    },
    MnemonicEntry {
        name: "jmp",
        opcode: Opcode::Jmp,
    },
    MnemonicEntry {
        name: "jmp_a",
        opcode: Opcode::JmpA,
    },
    MnemonicEntry {
        name: "halt",
        opcode: Opcode::Halt,
    },
];

impl Opcode {
    /// Every opcode in code order.
    pub const ALL: [Self; 13] = [
        Self::Lte,
        Self::Add,
        Self::Load,
        Self::LoadA,
        Self::Store,
        Self::StoreA,
        Self::Jmp0,
        Self::Jmp0A,
        Self::Jmp,
        Self::JmpA,
        Self::Halt,
        Self::Sub,
        Self::Mul,
    ];

    /// The numeric code written into the first cell of an instruction row.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Canonical mnemonic used in listings.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Lte => "lte",
            Self::Add => "add",
            Self::Load => "load",
            Self::LoadA => "load_a",
            Self::Store => "store",
            Self::StoreA => "store_a",
            Self::Jmp0 => "jmp0",
            Self::Jmp0A => "jmp0_a",
            Self::Jmp => "jmp",
            Self::JmpA => "jmp_a",
            Self::Halt => "halt",
            Self::Sub => "sub",
            Self::Mul => "mul",
        }
    }

    /// Looks up a mnemonic. Matching is case-sensitive.
    #[must_use]
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        MNEMONIC_ENTRIES
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.opcode)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rstest::rstest;

    use super::{Opcode, MNEMONIC_ENTRIES};

    #[rstest]
    #[case("lte", 0)]
    #[case("<=", 0)]
    #[case("add", 1)]
    #[case("load", 2)]
    #[case("load_a", 3)]
    #[case("store", 4)]
    #[case("store_a", 5)]
    #[case("jmp0", 6)]
    #[case("jmp0_a", 7)]
    #[case("jmp", 8)]
    #[case("jmp_a", 9)]
    #[case("halt", 10)]
    #[case("sub", 11)]
    #[case("mul", 12)]
    fn mnemonic_resolves_to_vm_code(#[case] name: &str, #[case] code: u8) {
        let opcode = Opcode::from_mnemonic(name).expect("mnemonic should resolve");
        assert_eq!(opcode.code(), code);
    }

    #[test]
    fn unknown_mnemonic_returns_none() {
        assert_eq!(Opcode::from_mnemonic("nop"), None);
        assert_eq!(Opcode::from_mnemonic(""), None);
        assert_eq!(Opcode::from_mnemonic("set"), None);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(Opcode::from_mnemonic("ADD"), None);
        assert_eq!(Opcode::from_mnemonic("Halt"), None);
    }

    #[test]
    fn codes_are_unique_and_dense() {
        let codes: HashSet<u8> = Opcode::ALL.iter().map(|op| op.code()).collect();
        assert_eq!(codes.len(), Opcode::ALL.len());
        for (index, opcode) in Opcode::ALL.iter().enumerate() {
            assert_eq!(usize::from(opcode.code()), index);
        }
    }

    #[test]
    fn display_uses_canonical_mnemonic() {
        assert_eq!(Opcode::Lte.to_string(), "lte");
        assert_eq!(Opcode::Jmp0A.to_string(), "jmp0_a");
        assert_eq!(format!("{:>6}", Opcode::Halt.to_string()), "  halt");
    }

    #[test]
    fn every_opcode_has_a_table_entry() {
        let covered: HashSet<Opcode> = MNEMONIC_ENTRIES.iter().map(|e| e.opcode).collect();
        assert_eq!(covered.len(), Opcode::ALL.len());
        for opcode in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(opcode.mnemonic()), Some(opcode));
        }
    }
}
