//! Core of a CHIP-8 interpreter: machine state, instruction decoding and the per-tick
//! execution engine. Loading files from disk, drawing the screen and reading the keyboard are
//! left to whoever drives [`Chip8Emulator::tick`].

pub mod chip8;
pub mod error;
pub mod opcode;
pub mod table;

pub use chip8::{Chip8Emulator, Tick, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use error::Chip8Error;
pub use opcode::{Instruction, Opcode};
