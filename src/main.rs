//! Jump Assist CLI
//!
//! Loads settings, wires the screen and input backends to the controller,
//! starts the hotkey dispatcher and runs the console on stdin.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use jump_assist::config::Settings;
use jump_assist::console::{self, HELP};
use jump_assist::controller::spawn_hotkey_dispatcher;
use jump_assist::input::{hotkey_channel, hotkeys, InputDevice, SimulatedDevice};
use jump_assist::vision::{ScreenSource, StillImageSource};
use jump_assist::{AssistError, Controller};

#[derive(Parser, Debug)]
#[command(
    name = "jumper",
    version,
    about = "Vision-calibrated press timing assistant for jump games"
)]
struct Cli {
    /// Settings file (JSON); defaults are used for anything left out
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read frames from this screenshot instead of the live screen
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Record pointer actions instead of performing them
    #[arg(long)]
    dry_run: bool,

    /// Print the effective settings as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AssistError> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if cli.print_config {
        println!("{}", settings.to_json()?);
        return Ok(());
    }

    let source = screen_source(&cli, &settings)?;
    let device = input_device(&cli)?;
    let controller = Arc::new(Controller::from_backends(&settings, source, device));

    let (publisher, receiver) = hotkey_channel(hotkeys::DEFAULT_CAPACITY);
    // Detached: it ends with the last publisher or with the process
    spawn_hotkey_dispatcher(Arc::clone(&controller), receiver)?;
    start_key_listener(&controller, &settings, publisher)?;

    println!("Jump Assist");
    println!("===========");
    println!(
        "hotkeys: '{}' marks the start, '{}' marks the end",
        settings.hotkeys.start, settings.hotkeys.end
    );
    println!("{}", HELP);

    let stdin = io::stdin();
    console::run_console(&controller, stdin.lock(), io::stdout())?;

    controller.stop_automation();
    log::info!("Bye");
    Ok(())
}

fn screen_source(cli: &Cli, settings: &Settings) -> Result<Box<dyn ScreenSource>, AssistError> {
    if let Some(path) = &cli.screenshot {
        let source = StillImageSource::open(path)?;
        log::info!(
            "Reading frames from {} ({:?})",
            path.display(),
            source.dimensions()
        );
        return Ok(Box::new(source));
    }

    #[cfg(feature = "desktop")]
    {
        let _ = settings;
        return Ok(Box::new(jump_assist::desktop::XcapScreen::new()));
    }

    #[cfg(not(feature = "desktop"))]
    {
        log::warn!("No screen backend (build with --features desktop or pass --screenshot); vision modes will see a blank screen");
        let blank = image::RgbaImage::from_pixel(
            settings.screen.width_px,
            settings.screen.height_px,
            image::Rgba([0, 0, 0, 255]),
        );
        Ok(Box::new(StillImageSource::new(blank)))
    }
}

fn input_device(cli: &Cli) -> Result<Box<dyn InputDevice>, AssistError> {
    if cli.dry_run {
        log::info!("Dry run: pointer actions are only logged");
        return Ok(Box::new(SimulatedDevice::new()));
    }

    #[cfg(feature = "desktop")]
    {
        return Ok(Box::new(jump_assist::desktop::EnigoPointer::new()?));
    }

    #[cfg(not(feature = "desktop"))]
    {
        log::warn!("No input backend (build with --features desktop); pointer actions are only logged");
        Ok(Box::new(SimulatedDevice::new()))
    }
}

#[cfg(feature = "desktop")]
fn start_key_listener(
    controller: &Arc<Controller>,
    settings: &Settings,
    publisher: jump_assist::input::HotkeyPublisher,
) -> Result<(), AssistError> {
    let pointer = controller.pointer_position().unwrap_or(settings.press_point);
    jump_assist::desktop::spawn_key_listener(settings.hotkeys.clone(), publisher, pointer)?;
    Ok(())
}

#[cfg(not(feature = "desktop"))]
fn start_key_listener(
    _controller: &Arc<Controller>,
    _settings: &Settings,
    publisher: jump_assist::input::HotkeyPublisher,
) -> Result<(), AssistError> {
    log::info!("No global hotkeys without the desktop feature; use the start/end commands");
    drop(publisher);
    Ok(())
}
