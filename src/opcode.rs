use std::fmt;

use crate::error::Chip8Error;

pub type Address = u16;
pub type Const8 = u8;
pub type Const4 = u8;
pub type RegId = u8;

macro_rules! join_nibbles {
    ($r0:ident) => {
        u8::from($r0)
    };
    ($r0:ident, $r1:ident) => {
        (u8::from($r0) << 4) | (u8::from($r1))
    };
    ($r0:ident, $r1:ident, $r2:ident) => {
        (u16::from($r0) << 8) | (u16::from($r1) << 4) | (u16::from($r2))
    };
}

/// A raw two byte instruction word, as fetched from memory at the program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Instruction(pub u16);

impl Instruction {
    /// Reads the big-endian word at `pc`. Both bytes must lie inside `memory`.
    pub fn fetch(memory: &[u8], pc: u16) -> Result<Self, Chip8Error> {
        let pc = usize::from(pc);
        match (memory.get(pc), memory.get(pc + 1)) {
            (Some(&hi), Some(&lo)) => Ok(Self(u16::from(hi) << 8 | u16::from(lo))),
            _ => Err(Chip8Error::MemoryOutOfBounds { address: pc + 1 }),
        }
    }

    /// Splits the word into its four nibbles, most significant first.
    pub fn nibbles(self) -> (u8, u8, u8, u8) {
        let value = self.0;
        (
            ((value >> 12) & 0xF) as u8,
            ((value >> 8) & 0xF) as u8,
            ((value >> 4) & 0xF) as u8,
            (value & 0xF) as u8,
        )
    }

    /// Top nibble, the operation family.
    pub fn family(self) -> u8 {
        self.nibbles().0
    }

    pub fn x(self) -> RegId {
        self.nibbles().1
    }

    pub fn y(self) -> RegId {
        self.nibbles().2
    }

    pub fn n(self) -> Const4 {
        self.nibbles().3
    }

    /// The low three nibbles.
    pub fn addr(self) -> Address {
        self.0 & 0x0FFF
    }

    /// The low byte.
    pub fn byte(self) -> Const8 {
        (self.0 & 0x00FF) as u8
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06X}", self.0)
    }
}

/// Every operation the machine knows about, with its operands already pulled out of the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `0NNN`: call a routine of the host machine. There is no host, so this does nothing.
    MachineCode(Address),
    ClearScreen,
    ReturnFromSub,
    Goto(Address),
    CallSub(Address),
    SkipEQ(RegId, Const8),
    SkipNEQ(RegId, Const8),
    SkipRegEQ(RegId, RegId),
    SetConst(RegId, Const8),
    AddConst(RegId, Const8),
    SetReg(RegId, RegId),
    Or(RegId, RegId),
    And(RegId, RegId),
    Xor(RegId, RegId),
    AddReg(RegId, RegId),
    SubReg(RegId, RegId),
    ShiftRight(RegId, RegId),
    DiffReg(RegId, RegId),
    ShiftLeft(RegId, RegId),
    SkipRegNEQ(RegId, RegId),
    SetAR(Address),
    JumpOffset(Address),
    Rand(RegId, Const8),
    Draw(RegId, RegId, Const4),
    KeyEQ(RegId),
    KeyNEQ(RegId),
    GetDelayTimer(RegId),
    GetKey(RegId),
    SetDelayTimer(RegId),
    SetSoundTimer(RegId),
    AddToI(RegId),
    SetISprite(RegId),
    BCD(RegId),
    RegDump(RegId),
    RegLoad(RegId),
}

impl Opcode {
    /// Turns a raw word into an operation. Arms are tried top to bottom, so the two fully
    /// specified `00E_` forms win over the `0NNN` catch-all. Returns `None` for words that
    /// name no operation.
    pub fn decode(instruction: Instruction) -> Option<Self> {
        use Opcode::*;

        let opcode = match instruction.nibbles() {
            (0x0, 0x0, 0xE, 0x0) => ClearScreen,
            (0x0, 0x0, 0xE, 0xE) => ReturnFromSub,
            (0x0, r2, r1, r0) => MachineCode(join_nibbles!(r2, r1, r0)),
            (0x1, r2, r1, r0) => Goto(join_nibbles!(r2, r1, r0)),
            (0x2, r2, r1, r0) => CallSub(join_nibbles!(r2, r1, r0)),
            (0x3, x, c1, c0) => SkipEQ(x, join_nibbles!(c1, c0)),
            (0x4, x, c1, c0) => SkipNEQ(x, join_nibbles!(c1, c0)),
            (0x5, x, y, 0x0) => SkipRegEQ(x, y),
            (0x6, x, c1, c0) => SetConst(x, join_nibbles!(c1, c0)),
            (0x7, x, c1, c0) => AddConst(x, join_nibbles!(c1, c0)),
            (0x8, x, y, 0x0) => SetReg(x, y),
            (0x8, x, y, 0x1) => Or(x, y),
            (0x8, x, y, 0x2) => And(x, y),
            (0x8, x, y, 0x3) => Xor(x, y),
            (0x8, x, y, 0x4) => AddReg(x, y),
            (0x8, x, y, 0x5) => SubReg(x, y),
            (0x8, x, y, 0x6) => ShiftRight(x, y),
            (0x8, x, y, 0x7) => DiffReg(x, y),
            (0x8, x, y, 0xE) => ShiftLeft(x, y),
            (0x9, x, y, 0x0) => SkipRegNEQ(x, y),
            (0xA, r2, r1, r0) => SetAR(join_nibbles!(r2, r1, r0)),
            (0xB, r2, r1, r0) => JumpOffset(join_nibbles!(r2, r1, r0)),
            (0xC, x, c1, c0) => Rand(x, join_nibbles!(c1, c0)),
            (0xD, x, y, c) => Draw(x, y, join_nibbles!(c)),
            (0xE, x, 0x9, 0xE) => KeyEQ(x),
            (0xE, x, 0xA, 0x1) => KeyNEQ(x),
            (0xF, x, 0x0, 0x7) => GetDelayTimer(x),
            (0xF, x, 0x0, 0xA) => GetKey(x),
            (0xF, x, 0x1, 0x5) => SetDelayTimer(x),
            (0xF, x, 0x1, 0x8) => SetSoundTimer(x),
            (0xF, x, 0x1, 0xE) => AddToI(x),
            (0xF, x, 0x2, 0x9) => SetISprite(x),
            (0xF, x, 0x3, 0x3) => BCD(x),
            (0xF, x, 0x5, 0x5) => RegDump(x),
            (0xF, x, 0x6, 0x5) => RegLoad(x),
            _ => return None,
        };
        Some(opcode)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Opcode::*;

        match *self {
            MachineCode(addr) => write!(f, "SYS {addr:#05X}"),
            ClearScreen => write!(f, "CLS"),
            ReturnFromSub => write!(f, "RET"),
            Goto(addr) => write!(f, "JP {addr:#05X}"),
            CallSub(addr) => write!(f, "CALL {addr:#05X}"),
            SkipEQ(x, c) => write!(f, "SE V{x:X}, {c:#04X}"),
            SkipNEQ(x, c) => write!(f, "SNE V{x:X}, {c:#04X}"),
            SkipRegEQ(x, y) => write!(f, "SE V{x:X}, V{y:X}"),
            SetConst(x, c) => write!(f, "LD V{x:X}, {c:#04X}"),
            AddConst(x, c) => write!(f, "ADD V{x:X}, {c:#04X}"),
            SetReg(x, y) => write!(f, "LD V{x:X}, V{y:X}"),
            Or(x, y) => write!(f, "OR V{x:X}, V{y:X}"),
            And(x, y) => write!(f, "AND V{x:X}, V{y:X}"),
            Xor(x, y) => write!(f, "XOR V{x:X}, V{y:X}"),
            AddReg(x, y) => write!(f, "ADD V{x:X}, V{y:X}"),
            SubReg(x, y) => write!(f, "SUB V{x:X}, V{y:X}"),
            ShiftRight(x, y) => write!(f, "SHR V{x:X}, V{y:X}"),
            DiffReg(x, y) => write!(f, "SUBN V{x:X}, V{y:X}"),
            ShiftLeft(x, y) => write!(f, "SHL V{x:X}, V{y:X}"),
            SkipRegNEQ(x, y) => write!(f, "SNE V{x:X}, V{y:X}"),
            SetAR(addr) => write!(f, "LD I, {addr:#05X}"),
            JumpOffset(addr) => write!(f, "JP V0, {addr:#05X}"),
            Rand(x, c) => write!(f, "RND V{x:X}, {c:#04X}"),
            Draw(x, y, n) => write!(f, "DRW V{x:X}, V{y:X}, {n}"),
            KeyEQ(x) => write!(f, "SKP V{x:X}"),
            KeyNEQ(x) => write!(f, "SKNP V{x:X}"),
            GetDelayTimer(x) => write!(f, "LD V{x:X}, DT"),
            GetKey(x) => write!(f, "LD V{x:X}, K"),
            SetDelayTimer(x) => write!(f, "LD DT, V{x:X}"),
            SetSoundTimer(x) => write!(f, "LD ST, V{x:X}"),
            AddToI(x) => write!(f, "ADD I, V{x:X}"),
            SetISprite(x) => write!(f, "LD F, V{x:X}"),
            BCD(x) => write!(f, "LD B, V{x:X}"),
            RegDump(x) => write!(f, "LD [I], V{x:X}"),
            RegLoad(x) => write!(f, "LD V{x:X}, [I]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_fields() {
        let ins = Instruction(0xD12F);
        assert_eq!(ins.nibbles(), (0xD, 0x1, 0x2, 0xF));
        assert_eq!(ins.family(), 0xD);
        assert_eq!(ins.x(), 0x1);
        assert_eq!(ins.y(), 0x2);
        assert_eq!(ins.n(), 0xF);
        assert_eq!(ins.addr(), 0x12F);
        assert_eq!(ins.byte(), 0x2F);
    }

    #[test]
    fn fetch_is_big_endian() {
        let mut memory = [0u8; 4096];
        memory[0x200] = 0xA2;
        memory[0x201] = 0x0A;
        assert_eq!(Instruction::fetch(&memory, 0x200).unwrap(), Instruction(0xA20A));
    }

    #[test]
    fn fetch_past_the_end() {
        let memory = [0u8; 4096];
        assert!(Instruction::fetch(&memory, 0xFFE).is_ok());
        assert!(matches!(
            Instruction::fetch(&memory, 0xFFF),
            Err(Chip8Error::MemoryOutOfBounds { address: 0x1000 })
        ));
    }

    #[test]
    fn specific_zero_forms_win() {
        assert_eq!(Opcode::decode(Instruction(0x00E0)), Some(Opcode::ClearScreen));
        assert_eq!(Opcode::decode(Instruction(0x00EE)), Some(Opcode::ReturnFromSub));
        assert_eq!(Opcode::decode(Instruction(0x00E1)), Some(Opcode::MachineCode(0x0E1)));
        assert_eq!(Opcode::decode(Instruction(0x0123)), Some(Opcode::MachineCode(0x123)));
    }

    #[test]
    fn operands() {
        assert_eq!(Opcode::decode(Instruction(0x1ABC)), Some(Opcode::Goto(0xABC)));
        assert_eq!(Opcode::decode(Instruction(0x3A42)), Some(Opcode::SkipEQ(0xA, 0x42)));
        assert_eq!(Opcode::decode(Instruction(0x8AB6)), Some(Opcode::ShiftRight(0xA, 0xB)));
        assert_eq!(Opcode::decode(Instruction(0xD345)), Some(Opcode::Draw(3, 4, 5)));
        assert_eq!(Opcode::decode(Instruction(0xF765)), Some(Opcode::RegLoad(7)));
    }

    #[test]
    fn unknown_words() {
        for word in [0x5121, 0x8008, 0x800F, 0x9001, 0xE000, 0xE19F, 0xF000, 0xF0FF] {
            assert_eq!(Opcode::decode(Instruction(word)), None, "{word:#06X}");
        }
    }

    #[test]
    fn disassembly() {
        let text = |word| Opcode::decode(Instruction(word)).unwrap().to_string();
        assert_eq!(text(0x6005), "LD V0, 0x05");
        assert_eq!(text(0xA20A), "LD I, 0x20A");
        assert_eq!(text(0xD125), "DRW V1, V2, 5");
        assert_eq!(text(0xFA55), "LD [I], VA");
        assert_eq!(text(0x00EE), "RET");
    }
}
