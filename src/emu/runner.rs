use super::{Chip8, Chip8Error, Chip8Result, Mode};
use crate::u4;

pub const DEFAULT_INSTRUCTIONS_PER_SECOND: u32 = 600;
pub const DEFAULT_FRAMES_PER_SECOND: u32 = 60;

/// Upper bound on frames `update` will catch up on in one call.
const MAX_FRAMES_PER_UPDATE: u32 = 4;

/// Scheduling knobs for [`Chip8Runner`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmulatorConfig {
    pub mode: Mode,
    pub instructions_per_second: u32,
    /// Rate of the timers, and of frames.
    pub frames_per_second: u32,
    /// End the frame after any instruction that touches the display.
    pub display_wait: bool,
}

impl EmulatorConfig {
    /// Defaults for `mode`. Display wait is on for the original interpreter only.
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            instructions_per_second: DEFAULT_INSTRUCTIONS_PER_SECOND,
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
            display_wait: mode == Mode::Original,
        }
    }

    pub fn instructions_per_frame(&self) -> u32 {
        (self.instructions_per_second / self.frames_per_second.max(1)).max(1)
    }

    pub fn frame_time_step(&self) -> f32 {
        1.0 / self.frames_per_second.max(1) as f32
    }
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}

/// Frame scheduler: runs a batch of instructions then ticks the timers, once per frame.
pub struct Chip8Runner {
    chip8: Chip8,
    config: EmulatorConfig,
    /// Kept for reset.
    rom: Vec<u8>,
    paused: bool,
    dt_accumulator: f32,
}

impl Chip8Runner {
    pub fn new(rom: &[u8], config: EmulatorConfig) -> Result<Self, Chip8Error> {
        Ok(Self {
            chip8: Chip8::new(rom, config.mode)?,
            config,
            rom: rom.to_vec(),
            paused: false,
            dt_accumulator: 0.0,
        })
    }

    /// Update emulator by delta time.
    ///
    /// Runs one frame per elapsed frame period. If the host fell far behind, the
    /// backlog is dropped instead of being run all at once.
    pub fn update(&mut self, dt: f32) -> Result<(), Chip8Error> {
        if self.paused {
            return Ok(());
        }

        self.dt_accumulator += dt;
        let step = self.config.frame_time_step();

        let mut frames = 0;
        while self.dt_accumulator >= step {
            self.dt_accumulator -= step;
            self.run_frame()?;

            frames += 1;
            if frames == MAX_FRAMES_PER_UPDATE {
                self.dt_accumulator = 0.0;
                break;
            }
        }

        Ok(())
    }

    /// Runs one frame's worth of instructions, then ticks the timers once.
    /// Returns how many instructions were executed.
    ///
    /// The batch ends early when the program is waiting for a key, or after a
    /// display update when display wait is enabled.
    pub fn run_frame(&mut self) -> Result<u32, Chip8Error> {
        if self.paused {
            return Ok(0);
        }

        let mut executed = 0;
        for _ in 0..self.config.instructions_per_frame() {
            let result = self.chip8.execute_one()?;
            executed += 1;

            match result {
                Chip8Result::AwaitingKey => break,
                Chip8Result::Redraw if self.config.display_wait => break,
                _ => {}
            }
        }

        self.chip8.tick_timers();
        Ok(executed)
    }

    /// Flips between paused and running, returning true if now paused.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.dt_accumulator = 0.0;
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Reloads the ROM into a fresh machine.
    pub fn reset(&mut self) -> Result<(), Chip8Error> {
        self.chip8.reset(&self.rom)?;
        self.dt_accumulator = 0.0;
        log::info!("Reset");
        Ok(())
    }

    pub fn save_state(&self) -> Vec<u8> {
        self.chip8.serialize()
    }

    /// Replaces the running machine with a snapshot. On error the running machine
    /// is left as it was.
    pub fn load_state(&mut self, bytes: &[u8]) -> Result<(), Chip8Error> {
        let chip8 = Chip8::deserialize(bytes)?;
        if chip8.mode() != self.config.mode {
            log::warn!(
                "Snapshot was taken in {:?} mode, running in {:?}",
                chip8.mode(),
                self.config.mode
            );
        }

        self.chip8 = chip8;
        log::info!("Restored state at pc {:#05X}", self.chip8.pc());
        Ok(())
    }

    /// Returns true if the sound timer is active, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.chip8.should_beep()
    }

    /// Checks and clears the machine's redraw flag.
    pub fn take_redraw(&mut self) -> bool {
        self.chip8.take_redraw()
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.chip8.set_key(key, pressed)
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    pub fn get_display_pixel(&self, y: usize, x: usize) -> bool {
        self.chip8.get_display_pixel(y, x)
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    pub fn chip8_ref(&self) -> &Chip8 {
        &self.chip8
    }

    pub fn chip8_mut(&mut self) -> &mut Chip8 {
        &mut self.chip8
    }
}
