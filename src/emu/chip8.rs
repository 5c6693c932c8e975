use rand::{SeedableRng, rngs::StdRng};

use super::{
    CallStack, Chip8Error, Chip8Result, DISPLAY_SIZE, DISPLAY_X, Display, FONT, FONT_END_ADDRESS,
    FONT_START_ADDRESS, Mode, Opcode,
};
use crate::u4;

// CHIP-8 memory map
pub const ROM_START_ADDRESS: usize = 0x200;
pub const MEMORY_SIZE: usize = 4096;
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - ROM_START_ADDRESS;

/// CHIP-8 virtual machine state
#[derive(Clone, Debug)]
pub struct Chip8 {
    /// 4KB memory array
    pub(crate) memory: [u8; MEMORY_SIZE],
    /// Display buffer: 64x32 monochrome pixels
    pub(crate) display: Display,

    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Index register: used for memory operations
    pub(crate) i: u16,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: [u8; 16],
    /// Call stack for subroutine returns
    pub(crate) stack: CallStack,

    /// Delay timer: decrements at 60Hz until it reaches 0
    pub(crate) delay_timer: u8,
    /// Sound timer: decrements at 60Hz, beeps while non-zero
    pub(crate) sound_timer: u8,

    /// Tracks which key is waiting to be released for the FX0A instruction
    pub(crate) wait_release_key: Option<u4>,
    /// Keypad state: 16 keys mapped as booleans (true = pressed)
    pub(crate) keypad: [bool; 16],

    /// Set whenever the display changes, cleared by the caller
    pub(crate) redraw: bool,
    pub(crate) mode: Mode,

    /// Source for CXNN. Not part of the machine state proper.
    pub(crate) rng: StdRng,
}

impl Chip8 {
    /// Builds a machine with the font installed, `rom` loaded at 0x200 and everything
    /// else zeroed.
    pub fn new(rom: &[u8], mode: Mode) -> Result<Self, Chip8Error> {
        let mut chip8 = Self::blank(mode);
        chip8.load(rom)?;
        Ok(chip8)
    }

    /// Rebuilds the machine from `rom` in the same mode. On error nothing changes.
    pub fn reset(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        *self = Self::new(rom, self.mode)?;
        Ok(())
    }

    pub(crate) fn blank(mode: Mode) -> Self {
        Chip8 {
            memory: [0; MEMORY_SIZE],
            display: [false; DISPLAY_SIZE],
            pc: ROM_START_ADDRESS as u16,
            i: 0,
            v: [0; 16],
            stack: CallStack::new(),
            delay_timer: 0,
            sound_timer: 0,
            wait_release_key: None,
            keypad: [false; 16],
            redraw: false,
            mode,
            rng: StdRng::from_os_rng(),
        }
    }

    fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        // Load font into memory
        self.memory[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);

        // Load ROM into memory
        let rom_end = ROM_START_ADDRESS + rom.len();
        self.memory
            .get_mut(ROM_START_ADDRESS..rom_end)
            .ok_or(Chip8Error::RomTooLarge {
                size: rom.len(),
                max_size: MAX_ROM_SIZE,
            })?
            .copy_from_slice(rom);

        self.pc = ROM_START_ADDRESS as u16;

        Ok(())
    }

    /// Executes a single CPU cycle (fetch, decode, execute).
    ///
    /// On error the machine is left exactly as it was before the call.
    pub fn execute_one(&mut self) -> Result<Chip8Result, Chip8Error> {
        let raw = self.fetch()?;
        let opcode = Opcode::decode(raw);
        log::trace!("{:#05X}: {raw:04X} {opcode:?}", self.pc);

        let pc = self.pc;
        self.pc = self.pc.wrapping_add(2);

        self.execute(opcode).inspect_err(|_| self.pc = pc)
    }

    /// Updates the delay and sound timers. Should be called at 60Hz.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Returns true if the sound timer is greater than zero, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.sound_timer > 0
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.keypad[key] = pressed;
    }

    pub fn is_key_pressed(&self, key: u4) -> bool {
        self.keypad[key]
    }

    pub fn keypad(&self) -> &[bool; 16] {
        &self.keypad
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    pub fn get_display_pixel(&self, y: usize, x: usize) -> bool {
        self.display[y * DISPLAY_X + x]
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    /// True if the display changed since the flag was last cleared.
    pub fn redraw_pending(&self) -> bool {
        self.redraw
    }

    pub fn clear_redraw(&mut self) {
        self.redraw = false;
    }

    /// Checks and clears the redraw flag.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn v(&self) -> &[u8; 16] {
        &self.v
    }

    pub fn stack(&self) -> &CallStack {
        &self.stack
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    /// The key FX0A saw pressed and is now waiting to see released.
    pub fn waiting_key(&self) -> Option<u4> {
        self.wait_release_key
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }

    /// Replaces the random source used by CXNN with a seeded one.
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Fetches the next 16-bit opcode from memory.
    fn fetch(&mut self) -> Result<u16, Chip8Error> {
        let high = *self.mem_get(self.pc)?;
        let low = *self.mem_get(self.pc.wrapping_add(1))?;

        Ok(u16::from_be_bytes([high, low]))
    }

    /// Helper to get a mutable reference to a memory location with bounds checking.
    pub(crate) fn mem_get(&mut self, addr: u16) -> Result<&mut u8, Chip8Error> {
        self.memory
            .get_mut(addr as usize)
            .ok_or(Chip8Error::MemoryOutOfBounds { address: addr })
    }

    /// Bounds-checked view of `len` bytes starting at `addr`.
    pub(crate) fn mem_range(&mut self, addr: u16, len: usize) -> Result<&mut [u8], Chip8Error> {
        let start = addr as usize;
        // Report the first address that falls outside memory
        let first_outside = start.max(MEMORY_SIZE) as u16;

        self.memory
            .get_mut(start..start + len)
            .ok_or(Chip8Error::MemoryOutOfBounds {
                address: first_outside,
            })
    }
}

// The random source is not machine state, so two machines are equal when
// everything a program can observe is equal.
impl PartialEq for Chip8 {
    fn eq(&self, other: &Self) -> bool {
        self.memory == other.memory
            && self.display == other.display
            && self.pc == other.pc
            && self.i == other.i
            && self.v == other.v
            && self.stack == other.stack
            && self.delay_timer == other.delay_timer
            && self.sound_timer == other.sound_timer
            && self.wait_release_key == other.wait_release_key
            && self.keypad == other.keypad
            && self.redraw == other.redraw
            && self.mode == other.mode
    }
}

impl Eq for Chip8 {}
