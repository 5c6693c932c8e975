//! A headless CHIP-8 interpreter.
//!
//! The [`emu`] module holds the virtual machine. It owns no timing and does no
//! I/O: the caller feeds it key states, asks it to execute instructions and tick
//! its timers, and reads back the framebuffer. [`emu::Chip8Runner`] is a ready-made
//! frame scheduler for callers that don't want to write their own.
//!
//! ```
//! use chip8_vm::emu::{Chip8, Mode};
//!
//! // 6005: V0 = 0x05
//! let mut chip8 = Chip8::new(&[0x60, 0x05], Mode::Original).unwrap();
//! chip8.execute_one().unwrap();
//!
//! assert_eq!(chip8.v()[0], 0x05);
//! assert_eq!(chip8.pc(), 0x202);
//! ```

pub mod emu;
mod nibble;

pub use nibble::u4;
