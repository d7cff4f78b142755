use std::ops::Range;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Chip8Error;
use crate::opcode::{Address, Const4, Const8, Instruction, Opcode, RegId};
use crate::table;

pub const MEMORY_SIZE: usize = 4096;
pub const PROGRAM_START: u16 = 0x200;
pub const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;
pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;
pub const STACK_DEPTH: usize = 16;
pub const KEY_COUNT: usize = 16;

/// Bytes per glyph in the built-in font.
pub const GLYPH_SIZE: usize = 5;
const FONT_END: usize = CHIP8_FONTSET.len();

pub type Screen = [bool; SCREEN_WIDTH * SCREEN_HEIGHT];

const CHIP8_FONTSET: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// What a single call to [`Chip8Emulator::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The operation ran and timers/pc moved on.
    Executed(Opcode),
    /// `LD Vx, K` found no key down. Nothing changed; the same instruction runs next tick.
    WaitingForKey,
    /// The word at pc names no operation. It was skipped like a no-op.
    Unrecognized(Instruction),
}

/// Where the program counter goes once an operation has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Skip,
    Jump(Address),
    Wait,
}

impl Flow {
    fn skip_if(condition: bool) -> Self {
        if condition {
            Flow::Skip
        } else {
            Flow::Next
        }
    }
}

pub struct Chip8Emulator<R = StdRng> {
    // 4K of memory. The interpreter used to live below 0x200; now only the font does, at
    // 0x000..0x050. Programs are loaded at 0x200.
    memory: [u8; MEMORY_SIZE],
    // V0 to VF. VF doubles as the carry, borrow and collision flag.
    v: [u8; 16],
    // Address register and program counter.
    i: u16,
    pc: u16,

    screen: Screen,

    // Both count down by one per tick until they reach zero. The buzzer is on while the sound
    // timer is nonzero.
    delay_timer: u8,
    sound_timer: u8,

    // Return addresses. `sp` is the number of slots in use.
    stack: [u16; STACK_DEPTH],
    sp: usize,

    // Hex keypad, written by the front end.
    keys: [bool; KEY_COUNT],

    // Last image passed to `load`, copied back in on `reset`.
    program: Vec<u8>,
    rng: R,
}

impl Chip8Emulator<StdRng> {
    /// A fresh machine with an entropy seeded RNG.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// A fresh machine whose `RND` results are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for Chip8Emulator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Chip8Emulator<R> {
    pub fn with_rng(rng: R) -> Self {
        let mut emu = Self {
            memory: [0; MEMORY_SIZE],
            v: [0; 16],
            i: 0,
            pc: PROGRAM_START,
            screen: [false; SCREEN_WIDTH * SCREEN_HEIGHT],
            delay_timer: 0,
            sound_timer: 0,
            stack: [0; STACK_DEPTH],
            sp: 0,
            keys: [false; KEY_COUNT],
            program: Vec::new(),
            rng,
        };
        emu.initialize();
        emu
    }

    /// Put memory and registers back to their power-on state. The program image is not
    /// touched here.
    fn initialize(&mut self) {
        self.pc = PROGRAM_START;
        self.i = 0;
        self.sp = 0;

        self.screen = [false; SCREEN_WIDTH * SCREEN_HEIGHT];
        self.stack = [0; STACK_DEPTH];
        self.v = [0; 16];
        self.memory = [0; MEMORY_SIZE];
        self.memory[..FONT_END].copy_from_slice(&CHIP8_FONTSET);

        self.delay_timer = 0;
        self.sound_timer = 0;
    }

    /// Copy a program image to 0x200 and remember it for [`reset`](Self::reset). Whatever
    /// was in the program region before is zeroed first.
    pub fn load(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        if program.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: program.len(),
                max_size: MAX_PROGRAM_SIZE,
            });
        }
        self.program = program.to_vec();
        self.copy_program();
        log::info!("Loaded {} byte program", program.len());
        Ok(())
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), Chip8Error> {
        let path = path.as_ref();
        let program = std::fs::read(path)?;
        log::debug!("Read {}", path.display());
        self.load(&program)
    }

    fn copy_program(&mut self) {
        let start = usize::from(PROGRAM_START);
        self.memory[start..].fill(0);
        self.memory[start..start + self.program.len()].copy_from_slice(&self.program);
    }

    /// Full restart: clears everything back to power-on and reloads the last program. The
    /// keypad is left alone since only the front end owns it.
    pub fn reset(&mut self) {
        self.initialize();
        self.copy_program();
        log::info!("Reset");
    }

    /// Fetch, decode and execute one instruction, then run the timers.
    ///
    /// On `Err` the machine is exactly as it was before the call.
    pub fn tick(&mut self) -> Result<Tick, Chip8Error> {
        let instruction = Instruction::fetch(&self.memory, self.pc)?;

        let Some(opcode) = Opcode::decode(instruction) else {
            log::error!(
                "{} is not a recognized opcode (pc: {:#05X})",
                instruction,
                self.pc
            );
            self.finish(Flow::Next);
            return Ok(Tick::Unrecognized(instruction));
        };
        log::trace!(
            "{:#05X}: {} {} ({})",
            self.pc,
            instruction,
            table::classify(instruction).unwrap_or("???"),
            opcode
        );

        match self.execute(opcode)? {
            Flow::Wait => Ok(Tick::WaitingForKey),
            flow => {
                self.finish(flow);
                Ok(Tick::Executed(opcode))
            }
        }
    }

    fn finish(&mut self, flow: Flow) {
        if self.delay_timer > 0 {
            self.delay_timer -= 1;
        }
        if self.sound_timer > 0 {
            self.sound_timer -= 1;
            if self.sound_timer == 0 {
                log::debug!("Sound timer expired");
            }
        }

        self.pc = match flow {
            Flow::Next => self.pc.wrapping_add(2),
            Flow::Skip => self.pc.wrapping_add(4),
            Flow::Jump(address) => address,
            Flow::Wait => self.pc,
        };
    }

    fn execute(&mut self, opcode: Opcode) -> Result<Flow, Chip8Error> {
        use Opcode::*;

        let flow = match opcode {
            MachineCode(address) => self.machine_code_routine(address),
            ClearScreen => self.clear_screen(),
            ReturnFromSub => self.return_subroutine()?,
            Goto(address) => Flow::Jump(address),
            CallSub(address) => self.call_subroutine(address)?,
            SkipEQ(x, c) => Flow::skip_if(self.reg(x) == c),
            SkipNEQ(x, c) => Flow::skip_if(self.reg(x) != c),
            SkipRegEQ(x, y) => Flow::skip_if(self.reg(x) == self.reg(y)),
            SetConst(x, c) => self.set_const(x, c),
            AddConst(x, c) => self.add_const(x, c),
            SetReg(x, y) => self.set(x, y),
            Or(x, y) => self.or(x, y),
            And(x, y) => self.and(x, y),
            Xor(x, y) => self.xor(x, y),
            AddReg(x, y) => self.add(x, y),
            SubReg(x, y) => self.sub(x, y),
            ShiftRight(x, _) => self.shift_right(x),
            DiffReg(x, y) => self.diff(x, y),
            ShiftLeft(x, _) => self.shift_left(x),
            SkipRegNEQ(x, y) => Flow::skip_if(self.reg(x) != self.reg(y)),
            SetAR(address) => self.set_i(address),
            JumpOffset(address) => Flow::Jump(address + u16::from(self.reg(0))),
            Rand(x, c) => self.rand(x, c),
            Draw(x, y, height) => self.draw(x, y, height)?,
            KeyEQ(x) => Flow::skip_if(self.key_for(x)?),
            KeyNEQ(x) => Flow::skip_if(!self.key_for(x)?),
            GetDelayTimer(x) => self.get_delay(x),
            GetKey(x) => self.get_key(x),
            SetDelayTimer(x) => self.set_delay(x),
            SetSoundTimer(x) => self.set_sound(x),
            AddToI(x) => self.inc_i(x),
            SetISprite(x) => self.set_i_sprite(x),
            BCD(x) => self.bcd(x)?,
            RegDump(x) => self.reg_dump(x)?,
            RegLoad(x) => self.reg_load(x)?,
        };
        Ok(flow)
    }

    fn reg(&self, reg: RegId) -> u8 {
        self.v[usize::from(reg)]
    }

    fn reg_mut(&mut self, reg: RegId) -> &mut u8 {
        &mut self.v[usize::from(reg)]
    }

    /// Memory range `start..start + len`, or the first address that falls outside memory.
    fn region(start: usize, len: usize) -> Result<Range<usize>, Chip8Error> {
        let end = start + len;
        if len > 0 && end > MEMORY_SIZE {
            return Err(Chip8Error::MemoryOutOfBounds {
                address: start.max(MEMORY_SIZE),
            });
        }
        Ok(start..end)
    }

    /// Like [`region`](Self::region) but also refuses to touch the font.
    fn writable_region(start: usize, len: usize) -> Result<Range<usize>, Chip8Error> {
        let range = Self::region(start, len)?;
        if len > 0 && range.start < FONT_END {
            return Err(Chip8Error::FontOverwrite {
                address: range.start,
            });
        }
        Ok(range)
    }

    fn machine_code_routine(&mut self, address: Address) -> Flow {
        log::warn!("Ignoring machine code routine at {:#05X}", address);
        Flow::Next
    }

    fn clear_screen(&mut self) -> Flow {
        self.screen = [false; SCREEN_WIDTH * SCREEN_HEIGHT];
        Flow::Next
    }

    fn return_subroutine(&mut self) -> Result<Flow, Chip8Error> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow { pc: self.pc });
        }
        self.sp -= 1;
        // Resume after the CALL that pushed this address.
        Ok(Flow::Jump(self.stack[self.sp].wrapping_add(2)))
    }

    fn call_subroutine(&mut self, address: Address) -> Result<Flow, Chip8Error> {
        if self.sp >= STACK_DEPTH {
            return Err(Chip8Error::StackOverflow { pc: self.pc });
        }
        self.stack[self.sp] = self.pc;
        self.sp += 1;
        Ok(Flow::Jump(address))
    }

    fn set_const(&mut self, reg: RegId, c: Const8) -> Flow {
        *self.reg_mut(reg) = c;
        Flow::Next
    }

    fn add_const(&mut self, reg: RegId, c: Const8) -> Flow {
        let vx = self.reg_mut(reg);
        *vx = vx.wrapping_add(c);
        Flow::Next
    }

    fn set(&mut self, reg: RegId, reg2: RegId) -> Flow {
        let vy = self.reg(reg2);
        *self.reg_mut(reg) = vy;
        Flow::Next
    }

    fn or(&mut self, reg: RegId, reg2: RegId) -> Flow {
        let vy = self.reg(reg2);
        *self.reg_mut(reg) |= vy;
        Flow::Next
    }

    fn and(&mut self, reg: RegId, reg2: RegId) -> Flow {
        let vy = self.reg(reg2);
        *self.reg_mut(reg) &= vy;
        Flow::Next
    }

    fn xor(&mut self, reg: RegId, reg2: RegId) -> Flow {
        let vy = self.reg(reg2);
        *self.reg_mut(reg) ^= vy;
        Flow::Next
    }

    /// Writes `value` to `reg` and then the flag to VF, so the flag wins when `reg` is VF.
    fn set_with_flag(&mut self, reg: RegId, value: u8, flag: bool) -> Flow {
        *self.reg_mut(reg) = value;
        self.v[0xF] = u8::from(flag);
        Flow::Next
    }

    fn add(&mut self, reg: RegId, reg2: RegId) -> Flow {
        let (val, carry) = self.reg(reg).overflowing_add(self.reg(reg2));
        self.set_with_flag(reg, val, carry)
    }

    fn sub(&mut self, reg: RegId, reg2: RegId) -> Flow {
        let (vx, vy) = (self.reg(reg), self.reg(reg2));
        self.set_with_flag(reg, vx.wrapping_sub(vy), vx > vy)
    }

    fn shift_right(&mut self, reg: RegId) -> Flow {
        let vx = self.reg(reg);
        self.set_with_flag(reg, vx >> 1, vx & 0x01 != 0)
    }

    fn diff(&mut self, reg: RegId, reg2: RegId) -> Flow {
        let (vx, vy) = (self.reg(reg), self.reg(reg2));
        self.set_with_flag(reg, vy.wrapping_sub(vx), vy > vx)
    }

    fn shift_left(&mut self, reg: RegId) -> Flow {
        let vx = self.reg(reg);
        self.set_with_flag(reg, vx << 1, vx & 0x80 != 0)
    }

    fn set_i(&mut self, address: Address) -> Flow {
        self.i = address;
        Flow::Next
    }

    fn rand(&mut self, reg: RegId, c: Const8) -> Flow {
        let value = self.rng.gen::<u8>() & c;
        *self.reg_mut(reg) = value;
        Flow::Next
    }

    fn draw(&mut self, x: RegId, y: RegId, height: Const4) -> Result<Flow, Chip8Error> {
        let sprite = Self::region(usize::from(self.i), usize::from(height))?;
        let x = usize::from(self.reg(x));
        let y = usize::from(self.reg(y));

        let mut collision = false;
        for (yline, addr) in sprite.enumerate() {
            let pixel = self.memory[addr];
            for xline in 0..8 {
                if pixel & (0x80 >> xline) != 0 {
                    let idx =
                        (x + xline) % SCREEN_WIDTH + ((y + yline) % SCREEN_HEIGHT) * SCREEN_WIDTH;
                    collision |= self.screen[idx];
                    self.screen[idx] ^= true;
                }
            }
        }
        self.v[0xF] = u8::from(collision);

        Ok(Flow::Next)
    }

    fn key_for(&self, reg: RegId) -> Result<bool, Chip8Error> {
        let key = self.reg(reg);
        self.keys
            .get(usize::from(key))
            .copied()
            .ok_or(Chip8Error::InvalidKey { key })
    }

    fn get_delay(&mut self, reg: RegId) -> Flow {
        let delay = self.delay_timer;
        *self.reg_mut(reg) = delay;
        Flow::Next
    }

    /// Stores the lowest pressed key. With nothing pressed the tick stops short and the same
    /// instruction is retried.
    fn get_key(&mut self, reg: RegId) -> Flow {
        match self.keys.iter().position(|&down| down) {
            Some(key) => {
                *self.reg_mut(reg) = key as u8;
                Flow::Next
            }
            None => Flow::Wait,
        }
    }

    fn set_delay(&mut self, reg: RegId) -> Flow {
        self.delay_timer = self.reg(reg);
        Flow::Next
    }

    fn set_sound(&mut self, reg: RegId) -> Flow {
        self.sound_timer = self.reg(reg);
        Flow::Next
    }

    fn inc_i(&mut self, reg: RegId) -> Flow {
        self.i = self.i.wrapping_add(u16::from(self.reg(reg)));
        Flow::Next
    }

    fn set_i_sprite(&mut self, reg: RegId) -> Flow {
        self.i = u16::from(self.reg(reg) & 0xF) * GLYPH_SIZE as u16;
        Flow::Next
    }

    fn bcd(&mut self, reg: RegId) -> Result<Flow, Chip8Error> {
        let dest = Self::writable_region(usize::from(self.i), 3)?;
        let vx = self.reg(reg);
        self.memory[dest].copy_from_slice(&[vx / 100, (vx / 10) % 10, vx % 10]);
        Ok(Flow::Next)
    }

    fn reg_dump(&mut self, reg: RegId) -> Result<Flow, Chip8Error> {
        let count = usize::from(reg) + 1;
        let dest = Self::writable_region(usize::from(self.i), count)?;
        self.memory[dest].copy_from_slice(&self.v[..count]);
        Ok(Flow::Next)
    }

    fn reg_load(&mut self, reg: RegId) -> Result<Flow, Chip8Error> {
        let count = usize::from(reg) + 1;
        let src = Self::region(usize::from(self.i), count)?;
        self.v[..count].copy_from_slice(&self.memory[src]);
        Ok(Flow::Next)
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Whether the pixel at column `x`, row `y` is lit. Coordinates wrap like sprites do.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.screen[(y % SCREEN_HEIGHT) * SCREEN_WIDTH + x % SCREEN_WIDTH]
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.v
    }

    /// Value of register `Vn`. Only the low nibble of `n` is used.
    pub fn v(&self, n: u8) -> u8 {
        self.v[usize::from(n & 0xF)]
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    /// Return addresses currently on the stack, oldest first.
    pub fn stack(&self) -> &[u16] {
        &self.stack[..self.sp]
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn is_beeping(&self) -> bool {
        self.sound_timer > 0
    }

    /// The word that the next tick will execute.
    pub fn current_instruction(&self) -> Option<Instruction> {
        Instruction::fetch(&self.memory, self.pc).ok()
    }

    pub fn current_opcode(&self) -> Option<Opcode> {
        self.current_instruction().and_then(Opcode::decode)
    }

    pub fn current_mnemonic(&self) -> Option<&'static str> {
        self.current_instruction().and_then(table::classify)
    }

    pub fn keys(&self) -> &[bool; KEY_COUNT] {
        &self.keys
    }

    pub fn keys_mut(&mut self) -> &mut [bool; KEY_COUNT] {
        &mut self.keys
    }

    /// Keys above 0xF are ignored.
    pub fn set_key(&mut self, key: usize, pressed: bool) {
        if let Some(slot) = self.keys.get_mut(key) {
            *slot = pressed;
        }
    }

    pub fn clear_keys(&mut self) {
        self.keys = [false; KEY_COUNT];
    }
}
