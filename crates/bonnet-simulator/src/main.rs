//! Headless desktop simulator for the bonnet OLED UI runtime.
//!
//! Runs the demo screens against the real runtime and writes every
//! transmitted frame to a PNG, so screens can be exercised without hardware.
//!
//! # Input
//!
//! One button per stdin line:
//!
//! | Line | Button |
//! |------|--------|
//! | a    | A      |
//! | b    | B      |
//! | c    | C      |
//! | u    | Up     |
//! | d    | Down   |
//! | l    | Left   |
//! | r    | Right  |
//! | q    | Quit   |
//!
//! # Usage
//!
//! ```text
//! bonnet-simulator [CONFIG.toml] [--out DIR]
//! ```

mod png;
mod screens;

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::{env, fs, process};

use log::{error, info, warn};
use serde::Deserialize;

use bonnet_core::ui::{Button, ButtonEvent};
use bonnet_core::{BoxError, RuntimeConfig, ScreenManager};

use crate::png::PngTransport;
use crate::screens::RootScreen;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Top-level simulator settings; `[runtime]` is passed to the core as is.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct SimulatorConfig {
    output_dir: PathBuf,
    /// Pixel scale of the written PNGs.
    scale: u32,
    runtime: RuntimeConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("frames"),
            scale: 4,
            runtime: RuntimeConfig::default(),
        }
    }
}

impl SimulatorConfig {
    fn load(path: Option<&Path>) -> Result<Self, BoxError> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path)?;
                Ok(toml::from_str(&text)?)
            }
            None => Ok(Self::default()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--out" => {
                    let dir = args.next().ok_or("--out needs a directory")?;
                    parsed.output_dir = Some(dir.into());
                }
                flag if flag.starts_with("--") => return Err(format!("unknown flag `{flag}`")),
                _ if parsed.config.is_none() => parsed.config = Some(arg.into()),
                _ => return Err(format!("unexpected argument `{arg}`")),
            }
        }
        Ok(parsed)
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

enum Command {
    Press(Button),
    Quit,
}

fn parse_line(line: &str) -> Option<Command> {
    let mut chars = line.trim().chars();
    let key = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    if key.eq_ignore_ascii_case(&'q') {
        return Some(Command::Quit);
    }
    Button::from_key(key).map(Command::Press)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        error!("Simulator failed: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), BoxError> {
    let args = Args::parse(env::args().skip(1))?;
    let mut config = SimulatorConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    fs::create_dir_all(&config.output_dir)?;

    let display = config.runtime.display;
    info!(
        "Starting bonnet simulator ({}x{}), frames in {}",
        display.width,
        display.height,
        config.output_dir.display()
    );

    let manager = ScreenManager::new(config.runtime.clone())?;
    let root = manager.create_screen(None, RootScreen::default());
    let transport = PngTransport::new(&config.output_dir, display.width, display.height, config.scale);
    manager.start(root, transport)?;

    info!("Type a button letter (a b c u d l r) per line, q to quit");
    for line in io::stdin().lock().lines() {
        match parse_line(&line?) {
            Some(Command::Press(button)) => {
                manager.on_button_event(ButtonEvent::press(button))?;
                manager.on_button_event(ButtonEvent::release(button))?;
            }
            Some(Command::Quit) => break,
            None => warn!("Unknown input; expected one of a b c u d l r q"),
        }
    }

    manager.shutdown();
    info!(
        "Simulator stopped: {} frames written, {} failed",
        manager.frames_transmitted(),
        manager.frames_failed()
    );
    Ok(())
}
