/// Everything that can stop a single tick or a program load from completing.
///
/// A failed tick leaves the machine exactly as it was before the tick started, so the driver
/// may inspect the state, fix it up (or reset) and carry on.
#[derive(Debug, thiserror::Error)]
pub enum Chip8Error {
    #[error("Program is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("Could not read program image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stack overflow: CALL at {pc:#05X} with all 16 stack slots in use")]
    StackOverflow { pc: u16 },

    #[error("Stack underflow: RET at {pc:#05X} with an empty call stack")]
    StackUnderflow { pc: u16 },

    #[error("Memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: usize },

    #[error("Refusing to overwrite the built-in font at address {address:#05X}")]
    FontOverwrite { address: usize },

    #[error("Register value {key:#04X} is not a key on the hex keypad")]
    InvalidKey { key: u8 },
}
