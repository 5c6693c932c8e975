mod chip8;
mod execute;
mod font;
mod opcode;
mod quirks;
mod runner;
mod snapshot;
mod stack;
mod types;

pub use chip8::*;
pub use font::*;
pub use opcode::*;
pub use quirks::*;
pub use runner::*;
pub use snapshot::SNAPSHOT_SIZE;
pub use stack::*;
pub use types::*;
