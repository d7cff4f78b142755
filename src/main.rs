use std::error::Error;
use std::path::PathBuf;

use chip8emu::{Chip8Emulator, Tick, SCREEN_HEIGHT, SCREEN_WIDTH};
use clap::Parser;
use game_loop::game_loop;
use log::{debug, error, info};
use pixels::{Pixels, SurfaceTexture};
use rand::Rng;
use winit::dpi::LogicalSize;
use winit::event::VirtualKeyCode;
use winit::event_loop::EventLoop;
use winit::window::WindowBuilder;
use winit_input_helper::WinitInputHelper;

mod keymap;

/// Run a CHIP-8 program in a window.
///
/// Enter toggles run/pause, Space steps one instruction while paused, F5 resets and Escape
/// quits. Holding Left Ctrl runs while paused. The keypad is mapped onto 1234/QWER/ASDF/ZXCV.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Program image to load at 0x200
    rom: PathBuf,

    /// Instructions executed per second while running
    #[arg(long, default_value_t = 500)]
    ticks_per_second: u32,

    /// Window pixels per CHIP-8 pixel
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=64))]
    scale: u32,

    /// Start paused, single-stepping with Space
    #[arg(long)]
    paused: bool,

    /// Seed for the random number generator
    #[arg(long)]
    seed: Option<u64>,
}

struct Driver {
    chip8: Chip8Emulator,
    pixels: Pixels,
    input: WinitInputHelper,
    running: bool,
    step: bool,
    // Left Ctrl held: run while paused, one tick per update.
    held: bool,
    title: String,
}

impl Driver {
    fn update(&mut self) {
        let stepping = !self.running;
        if stepping && !self.step && !self.held {
            return;
        }
        self.step = false;

        match self.chip8.tick() {
            Ok(Tick::WaitingForKey) if stepping => debug!("Waiting for a key"),
            Ok(_) if stepping && !self.held => self.dump_state(),
            Ok(_) => {}
            Err(err) => {
                error!("{err}; pausing");
                self.running = false;
                self.held = false;
                self.dump_state();
            }
        }
    }

    fn dump_state(&self) {
        let chip8 = &self.chip8;
        info!(
            "pc: {:#05X}, I: {:#05X}, sp: {}, V: {:02X?}, DT: {}, ST: {}",
            chip8.pc(),
            chip8.i(),
            chip8.sp(),
            chip8.registers(),
            chip8.delay_timer(),
            chip8.sound_timer()
        );
    }

    fn draw(&mut self) {
        let frame = self.pixels.get_frame();
        for (pixel, &on) in frame.chunks_exact_mut(4).zip(self.chip8.screen().iter()) {
            let shade = if on { 0xFF } else { 0x00 };
            pixel.copy_from_slice(&[shade, shade, shade, 0xFF]);
        }
    }

    fn handle_keys(&mut self) {
        for (key, &host) in keymap::KEYPAD.iter().enumerate() {
            self.chip8.set_key(key, self.input.key_held(host));
        }

        if self.input.key_pressed(VirtualKeyCode::Return) {
            self.running = !self.running;
            info!("{}", if self.running { "Running" } else { "Paused" });
        }
        if self.input.key_pressed(VirtualKeyCode::Space) && !self.running {
            self.step = true;
        }
        self.held = self.input.key_held(VirtualKeyCode::LControl);
        if self.input.key_pressed(VirtualKeyCode::F5) {
            self.chip8.reset();
        }
    }
}

/// The window title doubles as the diagnostic readout: run state, pc, I, sp, the next
/// instruction word with its mnemonic and disassembly, then V0..VF.
fn status_line<R: Rng>(chip8: &Chip8Emulator<R>, running: bool) -> String {
    let word = chip8
        .current_instruction()
        .map(|ins| ins.to_string())
        .unwrap_or_else(|| "------".to_string());
    let mnemonic = chip8.current_mnemonic().unwrap_or("???");
    let disassembly = chip8
        .current_opcode()
        .map(|op| op.to_string())
        .unwrap_or_default();
    let registers = chip8
        .registers()
        .iter()
        .map(|v| format!("{v:02X}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "CHIP-8 [{}] pc={:#05X} I={:#05X} sp={} ins={} {} ({}) V=[{}]",
        if running { "run" } else { "pause" },
        chip8.pc(),
        chip8.i(),
        chip8.sp(),
        word,
        mnemonic,
        disassembly,
        registers,
    )
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut chip8 = match args.seed {
        Some(seed) => Chip8Emulator::with_seed(seed),
        None => Chip8Emulator::new(),
    };
    chip8.load_file(&args.rom)?;

    let event_loop = EventLoop::new();
    let size = LogicalSize::new(
        (SCREEN_WIDTH as u32 * args.scale) as f64,
        (SCREEN_HEIGHT as u32 * args.scale) as f64,
    );
    let window = WindowBuilder::new()
        .with_title("CHIP-8")
        .with_inner_size(size)
        .with_min_inner_size(LogicalSize::new(SCREEN_WIDTH as f64, SCREEN_HEIGHT as f64))
        .build(&event_loop)?;

    let pixels = {
        let window_size = window.inner_size();
        let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
        Pixels::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, surface_texture)?
    };

    let driver = Driver {
        chip8,
        pixels,
        input: WinitInputHelper::new(),
        running: !args.paused,
        step: false,
        held: false,
        title: String::new(),
    };

    game_loop(
        event_loop,
        window,
        driver,
        args.ticks_per_second.max(1),
        0.1,
        |g| g.game.update(),
        |g| {
            g.game.draw();
            if let Err(err) = g.game.pixels.render() {
                error!("pixels.render() failed: {err}");
                g.exit();
                return;
            }

            let status = status_line(&g.game.chip8, g.game.running);
            if status != g.game.title {
                g.window.set_title(&status);
                g.game.title = status;
            }
        },
        |g, event| {
            if !g.game.input.update(event) {
                return;
            }
            if g.game.input.key_pressed(VirtualKeyCode::Escape) || g.game.input.quit() {
                g.exit();
                return;
            }
            if let Some(size) = g.game.input.window_resized() {
                g.game.pixels.resize_surface(size.width, size.height);
            }
            g.game.handle_keys();
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn status_shows_registers_and_instruction() {
        let mut chip8 = Chip8Emulator::with_seed(0);
        chip8.load(&[0x60, 0x2A, 0xA3, 0x45]).unwrap();
        chip8.tick().unwrap();

        let line = status_line(&chip8, false);
        assert_eq!(
            line,
            "CHIP-8 [pause] pc=0x202 I=0x000 sp=0 ins=0xA345 LD I, addr (LD I, 0x345) \
             V=[2A 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00]"
        );
    }

    #[test]
    fn status_for_unknown_word() {
        let mut chip8 = Chip8Emulator::with_seed(0);
        chip8.load(&[0xF0, 0xFF]).unwrap();
        let line = status_line(&chip8, true);
        assert!(line.starts_with("CHIP-8 [run] pc=0x200"));
        assert!(line.contains("ins=0xF0FF ??? ()"));
    }

    #[test]
    fn scale_must_be_in_range() {
        let parse = |scale: &str| Args::try_parse_from(["chip8emu", "rom.ch8", "--scale", scale]);
        assert!(parse("0").is_err());
        assert!(parse("65").is_err());
        assert_eq!(parse("64").unwrap().scale, 64);
        Args::command().debug_assert();
    }
}
