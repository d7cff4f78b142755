//! Static mnemonic table used to label instruction words for display and logging.
//!
//! Execution never consults this table, it only answers "what would this word be called".

use crate::opcode::Instruction;

/// Four nibbles, most significant first. `None` matches any nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern(pub [Option<u8>; 4]);

impl Pattern {
    pub fn matches(&self, instruction: Instruction) -> bool {
        let (a, x, y, n) = instruction.nibbles();
        self.0
            .iter()
            .zip([a, x, y, n])
            .all(|(want, got)| want.map_or(true, |want| want == got))
    }

    /// How many nibbles are pinned to an exact value.
    pub fn specificity(&self) -> usize {
        self.0.iter().filter(|nibble| nibble.is_some()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeEntry {
    pub pattern: Pattern,
    pub mnemonic: &'static str,
}

const _X: Option<u8> = None;

const fn entry(pattern: [Option<u8>; 4], mnemonic: &'static str) -> OpcodeEntry {
    OpcodeEntry {
        pattern: Pattern(pattern),
        mnemonic,
    }
}

/// Priority ordered. More specific patterns sit ahead of the catch-alls that overlap them.
pub static OPCODES: [OpcodeEntry; 35] = [
    entry([Some(0x0), Some(0x0), Some(0xE), Some(0x0)], "CLS"),
    entry([Some(0x0), Some(0x0), Some(0xE), Some(0xE)], "RET"),
    entry([Some(0x0), _X, _X, _X], "SYS addr"),
    entry([Some(0x1), _X, _X, _X], "JP addr"),
    entry([Some(0x2), _X, _X, _X], "CALL addr"),
    entry([Some(0x3), _X, _X, _X], "SE Vx, byte"),
    entry([Some(0x4), _X, _X, _X], "SNE Vx, byte"),
    entry([Some(0x5), _X, _X, Some(0x0)], "SE Vx, Vy"),
    entry([Some(0x6), _X, _X, _X], "LD Vx, byte"),
    entry([Some(0x7), _X, _X, _X], "ADD Vx, byte"),
    entry([Some(0x8), _X, _X, Some(0x0)], "LD Vx, Vy"),
    entry([Some(0x8), _X, _X, Some(0x1)], "OR Vx, Vy"),
    entry([Some(0x8), _X, _X, Some(0x2)], "AND Vx, Vy"),
    entry([Some(0x8), _X, _X, Some(0x3)], "XOR Vx, Vy"),
    entry([Some(0x8), _X, _X, Some(0x4)], "ADD Vx, Vy"),
    entry([Some(0x8), _X, _X, Some(0x5)], "SUB Vx, Vy"),
    entry([Some(0x8), _X, _X, Some(0x6)], "SHR Vx {, Vy}"),
    entry([Some(0x8), _X, _X, Some(0x7)], "SUBN Vx, Vy"),
    entry([Some(0x8), _X, _X, Some(0xE)], "SHL Vx {, Vy}"),
    entry([Some(0x9), _X, _X, Some(0x0)], "SNE Vx, Vy"),
    entry([Some(0xA), _X, _X, _X], "LD I, addr"),
    entry([Some(0xB), _X, _X, _X], "JP V0, addr"),
    entry([Some(0xC), _X, _X, _X], "RND Vx, byte"),
    entry([Some(0xD), _X, _X, _X], "DRW Vx, Vy, nibble"),
    entry([Some(0xE), _X, Some(0x9), Some(0xE)], "SKP Vx"),
    entry([Some(0xE), _X, Some(0xA), Some(0x1)], "SKNP Vx"),
    entry([Some(0xF), _X, Some(0x0), Some(0x7)], "LD Vx, DT"),
    entry([Some(0xF), _X, Some(0x0), Some(0xA)], "LD Vx, K"),
    entry([Some(0xF), _X, Some(0x1), Some(0x5)], "LD DT, Vx"),
    entry([Some(0xF), _X, Some(0x1), Some(0x8)], "LD ST, Vx"),
    entry([Some(0xF), _X, Some(0x1), Some(0xE)], "ADD I, Vx"),
    entry([Some(0xF), _X, Some(0x2), Some(0x9)], "LD F, Vx"),
    entry([Some(0xF), _X, Some(0x3), Some(0x3)], "LD B, Vx"),
    entry([Some(0xF), _X, Some(0x5), Some(0x5)], "LD [I], Vx"),
    entry([Some(0xF), _X, Some(0x6), Some(0x5)], "LD Vx, [I]"),
];

/// First table entry whose pattern matches, if any.
pub fn lookup(instruction: Instruction) -> Option<&'static OpcodeEntry> {
    OPCODES
        .iter()
        .find(|entry| entry.pattern.matches(instruction))
}

/// Mnemonic for `instruction`, or `None` when the word is unrecognized.
pub fn classify(instruction: Instruction) -> Option<&'static str> {
    lookup(instruction).map(|entry| entry.mnemonic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;

    #[test]
    fn zero_family_priority() {
        assert_eq!(classify(Instruction(0x00E0)), Some("CLS"));
        assert_eq!(classify(Instruction(0x00EE)), Some("RET"));
        assert_eq!(classify(Instruction(0x00EF)), Some("SYS addr"));
        assert_eq!(classify(Instruction(0x0FFF)), Some("SYS addr"));
    }

    #[test]
    fn specific_entries_come_first() {
        // an entry may only be shadowed by an earlier entry that is at least as specific
        for (i, later) in OPCODES.iter().enumerate() {
            for earlier in &OPCODES[..i] {
                let overlaps = earlier
                    .pattern
                    .0
                    .iter()
                    .zip(later.pattern.0.iter())
                    .all(|(a, b)| a.is_none() || b.is_none() || a == b);
                if overlaps {
                    assert!(
                        earlier.pattern.specificity() >= later.pattern.specificity(),
                        "{} shadows {}",
                        earlier.mnemonic,
                        later.mnemonic
                    );
                }
            }
        }
    }

    #[test]
    fn unrecognized_words() {
        assert_eq!(classify(Instruction(0x5AB1)), None);
        assert_eq!(classify(Instruction(0x8AB8)), None);
        assert_eq!(classify(Instruction(0xE0FF)), None);
        assert_eq!(classify(Instruction(0xF0FF)), None);
    }

    #[test]
    fn agrees_with_decoder_for_every_word() {
        for word in 0..=u16::MAX {
            let ins = Instruction(word);
            let decoded = Opcode::decode(ins);
            assert_eq!(
                classify(ins).is_some(),
                decoded.is_some(),
                "{ins} classified differently"
            );
            if let (Some(mnemonic), Some(opcode)) = (classify(ins), decoded) {
                // Disassembly starts with the same operator as the table mnemonic.
                let op = mnemonic.split(' ').next().unwrap();
                assert!(opcode.to_string().starts_with(op), "{ins}: {mnemonic} vs {opcode}");
            }
        }
    }
}
