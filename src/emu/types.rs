/// Outcome of a single `execute_one` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chip8Result {
    /// The instruction ran; nothing the scheduler needs to know about.
    Continue,
    /// The instruction changed the framebuffer.
    Redraw,
    /// FX0A is suspended until a key is pressed and released.
    /// The program counter still points at the FX0A instruction.
    AwaitingKey,
}

/// Error types that can occur during CHIP-8 emulation
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("Memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: u16 },

    #[error("Stack overflow: call to {address:#05X} exceeds the 12-entry call stack")]
    StackOverflow { address: u16 },

    #[error("Stack underflow: attempted to return from a subroutine with empty call stack")]
    StackUnderflow,

    #[error("Corrupt state snapshot: got {size} bytes, expected {expected}")]
    CorruptState { size: usize, expected: usize },

    #[error("Corrupt state snapshot: invalid {field}")]
    InvalidStateField { field: &'static str },
}

pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;
pub const DISPLAY_SIZE: usize = DISPLAY_X * DISPLAY_Y;

/// Monochrome framebuffer, row-major: pixel (x, y) lives at `y * DISPLAY_X + x`.
pub type Display = [bool; DISPLAY_SIZE];
