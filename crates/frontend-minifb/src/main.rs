//! zterm desktop frontend.
//!
//! Provides two execution modes:
//!
//! - **GUI mode** (default): Scaled `minifb` window running the machine in
//!   real time, keyboard input to the serial line, ambient colour in the title.
//! - **Headless mode** (`--headless`): Runs a fixed number of ticks after
//!   queueing `--type` text, then prints the screen as text.
//!
//! With no ROMs configured a small built-in banner is installed at 0x0000 so
//! the stand-in monitor has something to print.

mod font;
mod raster;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use clap::Parser;
use minifb::{InputCallback, Key, KeyRepeat, Scale, ScaleMode, Window, WindowOptions};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use zterm_core::{EchoMonitor, FileRomSource, Machine, MachineConfig, RomDescriptor, Terminal};

use raster::Canvas;

const BUILTIN_BANNER: &[u8] = b"\x1b[2J\x1b[H\x1b[92mzterm monitor\x1b[0m\r\n\
\x1b[32mtype to echo; Esc quits\r\n\0";

#[derive(Parser, Debug)]
#[command(name = "zterm", about = "Serial terminal computer emulator")]
struct Args {
    /// Machine configuration (JSON).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Extra ROM image as NAME@START:SIZE=PATH (repeatable).
    #[arg(
        long = "rom",
        value_name = "NAME@START:SIZE=PATH",
        value_parser = RomDescriptor::parse_arg
    )]
    roms: Vec<RomDescriptor>,

    /// Run without a window.
    #[arg(long, default_value_t = false)]
    headless: bool,

    /// Ticks to run in headless mode.
    #[arg(long, default_value_t = 100)]
    ticks: u64,

    /// Text queued on the serial line before the first tick (headless).
    #[arg(long = "type", value_name = "TEXT")]
    type_text: Option<String>,

    /// Integer window scale, 1-4.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=4))]
    scale: u8,

    /// Debug logging plus a status line at exit.
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Print a memory hex dump after a headless run, as START:LEN (START in hex).
    #[arg(long, value_name = "START:LEN", value_parser = parse_dump)]
    dump: Option<(u16, usize)>,
}

fn parse_dump(s: &str) -> Result<(u16, usize), String> {
    let (start, len) = s.split_once(':').ok_or("expected START:LEN")?;
    let start = start.trim_start_matches("0x").trim_start_matches("0X");
    let start = u16::from_str_radix(start, 16).map_err(|e| format!("start: {}", e))?;
    let len = match len.strip_prefix("0x").or_else(|| len.strip_prefix("0X")) {
        Some(h) => usize::from_str_radix(h, 16),
        None => len.parse(),
    }
    .map_err(|e| format!("length: {}", e))?;
    Ok((start, len))
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("zterm: {}", e);
            ExitCode::FAILURE
        }
    }
}

type TermMachine = Machine<EchoMonitor, Terminal>;

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let (config, rom_dir) = match &args.config {
        Some(path) => (MachineConfig::load(path)?, path.parent().map(PathBuf::from)),
        None => (MachineConfig::default(), None),
    };
    let mut all = config.clone();
    all.roms.extend(args.roms.iter().cloned());
    all.validate()?;

    let term = Terminal::new(
        config.terminal.width,
        config.terminal.height,
        config.limits.max_escape_len,
    );
    let mut machine = Machine::new(&all, EchoMonitor::new(), term);

    let file_source = match rom_dir {
        Some(dir) => FileRomSource::relative_to(dir),
        None => FileRomSource::new(),
    };
    machine.install_roms(&config.roms, &file_source);
    machine.install_roms(&args.roms, &FileRomSource::new());
    if all.roms.is_empty() {
        let desc = RomDescriptor {
            name: "builtin".into(),
            start: 0,
            size: BUILTIN_BANNER.len() as u32,
            locator: String::new(),
        };
        machine.install_rom(&desc, BUILTIN_BANNER.to_vec());
    }

    if args.headless {
        run_headless(&args, &mut machine);
    } else {
        run_gui(&mut machine, args.scale as usize)?;
    }
    if args.debug {
        eprintln!("{}", machine.status());
    }
    Ok(())
}

// ─── GUI Mode ───────────────────────────────────────────────────────────────

/// Collects typed characters from the window's text input.
struct TypedChars(Arc<Mutex<Vec<u32>>>);

impl InputCallback for TypedChars {
    fn add_char(&mut self, uni_char: u32) {
        if let Ok(mut q) = self.0.lock() {
            q.push(uni_char);
        }
    }
}

fn run_gui(machine: &mut TermMachine, scale: usize) -> Result<(), minifb::Error> {
    let (sw, sh) = machine.sink().surface_size();
    let mut canvas = Canvas::new(sw as usize, sh as usize);
    let (win_w, win_h) = (canvas.width * scale, canvas.height * scale);
    let mut scaled_buf = vec![0u32; win_w * win_h];

    let mut window = Window::new(
        "zterm",
        win_w,
        win_h,
        WindowOptions {
            scale: Scale::X1,
            scale_mode: ScaleMode::AspectRatioStretch,
            resize: true,
            ..Default::default()
        },
    )?;
    window.set_target_fps(60);
    let typed = Arc::new(Mutex::new(Vec::new()));
    window.set_input_callback(Box::new(TypedChars(typed.clone())));

    machine.sink_mut().show_splash();
    let start_time = Instant::now();
    machine.start(start_time);
    let mut ambient = None;

    while window.is_open() && !window.is_key_down(Key::Escape) {
        // Printable text arrives through the callback, control keys here
        let chars: Vec<u32> = typed.lock().map(|mut q| std::mem::take(&mut *q)).unwrap_or_default();
        for c in chars.into_iter().filter(|&c| (0x20..=0xFF).contains(&c) && c != 0x7F) {
            machine.send_input(&[c as u8]);
        }
        for key in window.get_keys_pressed(KeyRepeat::Yes) {
            match key {
                Key::Enter | Key::NumPadEnter => {
                    machine.send_input(b"\r");
                }
                Key::Backspace => {
                    machine.send_input(&[0x08]);
                }
                Key::F1 => eprintln!("{}", machine.status()),
                _ => {}
            }
        }

        let now = Instant::now();
        let ran = machine.run_due(now);
        if ran > 0 {
            debug!(ticks = ran, "ran due ticks");
        }

        let frame = machine.sink().render(now.duration_since(start_time).as_millis() as u64);
        canvas.paint(&frame);
        canvas.scale_into(scale, &mut scaled_buf);
        window.update_with_buffer(&scaled_buf, win_w, win_h)?;

        if ambient != Some(frame.ambient) {
            ambient = Some(frame.ambient);
            window.set_title(&format!("zterm - #{:06X}", frame.ambient.to_u32()));
        }
    }
    machine.stop();
    info!("{} ticks in {:.1}s", machine.scheduler.ticks, start_time.elapsed().as_secs_f64());
    Ok(())
}

// ─── Headless Mode ──────────────────────────────────────────────────────────

fn run_headless(args: &Args, machine: &mut TermMachine) {
    if let Some(text) = &args.type_text {
        let text = text.replace('\n', "\r");
        machine.send_text(&text);
    }
    for _ in 0..args.ticks {
        let report = machine.tick();
        if report.stalled {
            break;
        }
    }
    if machine.serial.rx_pending() {
        eprintln!(
            "{} typed bytes still queued after {} ticks",
            machine.serial.rx_len(),
            args.ticks
        );
    }

    println!("{}", machine.sink().screen_text().trim_end_matches('\n'));

    if let Some((start, len)) = args.dump {
        print!("{}", machine.dump_memory(start, len));
    }
}
