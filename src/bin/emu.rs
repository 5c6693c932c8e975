use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use anyhow::Context;
use clap::Parser;
use pixels::{Pixels, SurfaceTexture};
use rodio::{OutputStream, OutputStreamBuilder, Sink, Source, source::SquareWave};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use chip8_vm::{
    emu::{
        Chip8Runner, DEFAULT_INSTRUCTIONS_PER_SECOND, DISPLAY_X, DISPLAY_Y, EmulatorConfig, Mode,
    },
    u4,
};

const COLOR_FOREGROUND: [u8; 4] = [0xFF, 0xD7, 0x00, 0xFF];
const COLOR_BACKGROUND: [u8; 4] = [0x00, 0x00, 0x80, 0xFF];

/// Mapping from physical keyboard keys to CHIP-8 hex keypad (0x0-0xF).
const KEY_MAP: [KeyCode; 16] = [
    KeyCode::KeyX,   // 0x00
    KeyCode::Digit1, // 0x01
    KeyCode::Digit2, // 0x02
    KeyCode::Digit3, // 0x03
    KeyCode::KeyQ,   // 0x04
    KeyCode::KeyW,   // 0x05
    KeyCode::KeyE,   // 0x06
    KeyCode::KeyA,   // 0x07
    KeyCode::KeyS,   // 0x08
    KeyCode::KeyD,   // 0x09
    KeyCode::KeyZ,   // 0x0A
    KeyCode::KeyC,   // 0x0B
    KeyCode::Digit4, // 0x0C
    KeyCode::KeyR,   // 0x0D
    KeyCode::KeyF,   // 0x0E
    KeyCode::KeyV,   // 0x0F
];

struct App {
    pixels: Option<Pixels<'static>>,
    window: Option<Arc<Window>>,
    scale: u32,

    /// Audio output stream (must be kept alive).
    _audio_stream: OutputStream,
    audio_sink: Sink,

    runner: Chip8Runner,
    state_file: PathBuf,
    /// Used for delta time calculation.
    last_frame_instant: Instant,

    /// Stores the result of the application to be returned from main.
    exit_result: anyhow::Result<()>,
}

impl App {
    fn new(rom: &[u8], args: &Args) -> anyhow::Result<Self> {
        // Initialize audio
        let mut _audio_stream = OutputStreamBuilder::open_default_stream()
            .context("Failed to open audio output stream")?;
        _audio_stream.log_on_drop(false);

        let audio_sink = Sink::connect_new(_audio_stream.mixer());
        audio_sink.pause();
        audio_sink.append(SquareWave::new(440.0).amplify(0.5));

        let config = EmulatorConfig {
            instructions_per_second: args.speed,
            ..EmulatorConfig::new(args.mode)
        };
        log::info!(
            "{:?} mode, {} instructions per frame",
            config.mode,
            config.instructions_per_frame()
        );

        let runner =
            Chip8Runner::new(rom, config).context("Failed to load ROM into CHIP-8 memory")?;

        Ok(Self {
            pixels: None,
            window: None,
            scale: args.scale,

            _audio_stream,
            audio_sink,

            runner,
            state_file: args.state_file.clone(),
            last_frame_instant: Instant::now(),
            exit_result: Ok(()),
        })
    }

    fn process_display(&mut self) -> anyhow::Result<()> {
        let pixels = self.pixels.as_mut().context("Pixels surface missing")?;

        for (i, pxl) in pixels.frame_mut().chunks_exact_mut(4).enumerate() {
            let lit = self.runner.get_display_pixel(i / DISPLAY_X, i % DISPLAY_X);
            pxl.copy_from_slice(if lit {
                &COLOR_FOREGROUND
            } else {
                &COLOR_BACKGROUND
            });
        }

        Ok(())
    }

    fn save_state(&self) -> anyhow::Result<()> {
        std::fs::write(&self.state_file, self.runner.save_state())
            .with_context(|| format!("Failed to write {}", self.state_file.display()))
    }

    fn load_state(&mut self) -> anyhow::Result<()> {
        let bytes = std::fs::read(&self.state_file)
            .with_context(|| format!("Failed to read {}", self.state_file.display()))?;
        self.runner
            .load_state(&bytes)
            .context("Snapshot rejected")?;
        self.process_display()
    }

    fn try_resumed(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = {
            let size = LogicalSize::new(
                DISPLAY_X as u32 * self.scale,
                DISPLAY_Y as u32 * self.scale,
            );
            let min_size = LogicalSize::new(DISPLAY_X as u32, DISPLAY_Y as u32);

            Arc::new(
                event_loop
                    .create_window(
                        Window::default_attributes()
                            .with_title("chip8-vm")
                            .with_inner_size(size)
                            .with_min_inner_size(min_size),
                    )
                    .context("Failed to create window")?,
            )
        };

        self.window = Some(window.clone());
        self.pixels = {
            let window_size = window.inner_size();
            let surface_texture =
                SurfaceTexture::new(window_size.width, window_size.height, window.clone());

            let pixels = Pixels::new(DISPLAY_X as u32, DISPLAY_Y as u32, surface_texture)
                .context("Failed to create pixels surface")?;

            window.request_redraw();
            Some(pixels)
        };
        self.process_display()?;

        // Avoid large dt on first frame
        self.last_frame_instant = Instant::now();
        Ok(())
    }

    fn handle_hotkey(&mut self, event_loop: &ActiveEventLoop, key: KeyCode) -> anyhow::Result<()> {
        match key {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => {
                let paused = self.runner.toggle_pause();
                log::info!("{}", if paused { "Paused" } else { "Resumed" });
            }
            KeyCode::Equal => {
                self.runner.reset().context("Failed to reset")?;
                self.process_display()?;
            }
            KeyCode::F5 => match self.save_state() {
                Ok(()) => log::info!("State saved to {}", self.state_file.display()),
                Err(e) => log::error!("Save failed: {e:#}"),
            },
            KeyCode::F9 => {
                if let Err(e) = self.load_state() {
                    log::error!("Load failed: {e:#}");
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn try_window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        event: WindowEvent,
    ) -> anyhow::Result<()> {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                self.pixels
                    .as_mut()
                    .context("Pixels surface missing")?
                    .resize_surface(size.width, size.height)
                    .context("Failed to resize pixels surface")?;
            }

            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - self.last_frame_instant).as_secs_f32();
                self.last_frame_instant = now;

                self.runner.update(dt).context("Chip8 Execution error")?;

                if self.runner.should_beep() && !self.runner.is_paused() {
                    self.audio_sink.play();
                } else {
                    self.audio_sink.pause();
                }

                if self.runner.take_redraw() {
                    self.process_display()?;
                }

                self.pixels
                    .as_ref()
                    .context("Pixels surface missing")?
                    .render()
                    .context("Pixels render error")?;

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                if let Some(key) = KEY_MAP.iter().position(|&k| k == code) {
                    self.runner
                        .set_key(u4::new(key as u8), state == ElementState::Pressed);
                } else if state == ElementState::Pressed && !repeat {
                    self.handle_hotkey(event_loop, code)?;
                }
            }

            _ => (),
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(e) = self.try_resumed(event_loop) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Err(e) = self.try_window_event(event_loop, event) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }
}

/// CHIP-8 emulator written in Rust.
///
/// Keys 1-4, Q-R, A-F, Z-V map to CHIP-8 keys.
/// Space pauses, = resets, F5 saves state, F9 restores it, Escape exits.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Path to the CHIP-8 ROM file
    rom_path: PathBuf,

    /// Which interpreter's quirks to follow
    #[arg(short, long, value_enum, default_value_t = Mode::Extended)]
    mode: Mode,

    /// Instructions executed per second
    #[arg(short, long, default_value_t = DEFAULT_INSTRUCTIONS_PER_SECOND)]
    speed: u32,

    /// Window pixels per CHIP-8 pixel
    #[arg(long, default_value_t = 10)]
    scale: u32,

    /// Where F5 saves and F9 restores state
    #[arg(long, default_value = "save_state.bin")]
    state_file: PathBuf,
}

fn read_rom(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read ROM file {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let rom = read_rom(&args.rom_path)?;
    log::info!("Loaded {} ({} bytes)", args.rom_path.display(), rom.len());

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(&rom, &args).context("Failed to initialize application")?;
    event_loop
        .run_app(&mut app)
        .context("Error occurred during event loop execution")?;

    // Return the result captured during the event loop
    app.exit_result
}
